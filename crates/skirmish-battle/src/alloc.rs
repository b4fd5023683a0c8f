//! Resource allocators: free team, ally, colour and start position.
//!
//! These are pure functions over the statuses of the participants that
//! count. Callers decide who counts (for example, excluding themselves);
//! spectators are always ignored here.

use skirmish_protocol::{BattleStatus, Colour, StartPosition};

use crate::MapInfo;

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// Hand-picked colours handed out first.
const BASE_PALETTE: [Colour; 16] = [
    Colour::new(255, 0, 0),
    Colour::new(0, 0, 255),
    Colour::new(0, 200, 0),
    Colour::new(255, 255, 0),
    Colour::new(255, 0, 255),
    Colour::new(0, 255, 255),
    Colour::new(255, 128, 0),
    Colour::new(128, 0, 255),
    Colour::new(128, 255, 0),
    Colour::new(0, 128, 255),
    Colour::new(255, 0, 128),
    Colour::new(0, 255, 128),
    Colour::new(128, 64, 0),
    Colour::new(255, 255, 255),
    Colour::new(128, 128, 128),
    Colour::new(0, 96, 96),
];

const GOLDEN_RATIO_CONJUGATE: f32 = 0.618_034;

/// Returns a palette of exactly `size` colours.
///
/// The first entries are the hand-picked base colours; the rest are spread
/// around the hue circle by golden-ratio steps, alternating saturation and
/// brightness so neighbours stay distinguishable.
pub fn fixed_palette(size: usize) -> Vec<Colour> {
    let mut palette: Vec<Colour> = BASE_PALETTE.iter().copied().take(size).collect();
    let mut hue = 0.0_f32;
    for i in BASE_PALETTE.len()..size {
        hue = (hue + GOLDEN_RATIO_CONJUGATE).fract();
        let saturation = if i % 2 == 0 { 0.85 } else { 0.6 };
        let value = if i % 3 == 0 { 0.7 } else { 0.95 };
        palette.push(hsv_to_rgb(hue, saturation, value));
    }
    palette
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Colour {
    let sector = h * 6.0;
    let i = sector.floor();
    let f = sector - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match i as u32 % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let channel = |x: f32| (x * 255.0).round().clamp(0.0, 255.0) as u8;
    Colour::new(channel(r), channel(g), channel(b))
}

// ---------------------------------------------------------------------------
// Teams and allies
// ---------------------------------------------------------------------------

/// Returns the smallest index not held by any non-spectator, where
/// `index` picks the field (team or ally) to look at.
///
/// Bumping past one taken index can land on another that an earlier
/// participant already holds, so the scan repeats until a full pass finds
/// no conflict.
pub fn lowest_free(statuses: &[&BattleStatus], index: impl Fn(&BattleStatus) -> u32) -> u32 {
    let mut lowest = 0;
    let mut changed = true;
    while changed {
        changed = false;
        for status in statuses.iter().filter(|s| !s.spectator) {
            if index(status) == lowest {
                lowest += 1;
                changed = true;
            }
        }
    }
    lowest
}

pub fn free_team(statuses: &[&BattleStatus]) -> u32 {
    lowest_free(statuses, |s| s.team)
}

pub fn free_ally(statuses: &[&BattleStatus]) -> u32 {
    lowest_free(statuses, |s| s.ally)
}

// ---------------------------------------------------------------------------
// Colours
// ---------------------------------------------------------------------------

/// Picks a colour not similar to any non-spectator's colour.
///
/// Starts with a palette one larger than `team_count` and grows it one
/// entry at a time, up to `growth_limit` extra entries. Near-identical
/// neighbours are merged and every entry close to a used colour is dropped;
/// the first survivor wins. If nothing survives even the largest palette,
/// the colour farthest from every used colour is returned; that colour may
/// still be within `threshold` of a used one.
pub fn free_colour(
    statuses: &[&BattleStatus],
    team_count: usize,
    threshold: u8,
    growth_limit: usize,
) -> Colour {
    let used: Vec<Colour> = statuses
        .iter()
        .filter(|s| !s.spectator)
        .map(|s| s.colour)
        .collect();

    for inc in 1..=growth_limit.max(1) {
        let mut palette = fixed_palette(team_count + inc);
        palette.dedup_by(|a, b| a.is_similar(b, threshold));
        palette.retain(|c| !used.iter().any(|u| u.is_similar(c, threshold)));
        if let Some(first) = palette.first() {
            return *first;
        }
    }

    tracing::warn!(used = used.len(), "colour palette exhausted");
    fixed_palette(team_count + growth_limit.max(1))
        .into_iter()
        .max_by_key(|c| used.iter().map(|u| u.difference(c)).min().unwrap_or(u8::MAX))
        .unwrap_or_default()
}

/// Index of the first palette entry within `tolerance` of `colour` that is
/// not marked in `excluded`; 0 when there is none.
pub fn closest_fixed_colour(
    colour: Colour,
    excluded: &[bool],
    tolerance: u8,
    palette_size: usize,
) -> usize {
    fixed_palette(palette_size)
        .iter()
        .enumerate()
        .find(|(i, candidate)| {
            !excluded.get(*i).copied().unwrap_or(false) && candidate.is_similar(&colour, tolerance)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Start positions
// ---------------------------------------------------------------------------

/// The first of the map's start positions no non-spectator stands on,
/// clamped into the map. Falls back to the map centre.
pub fn free_position(statuses: &[&BattleStatus], map: &MapInfo) -> StartPosition {
    let taken = |pos: &StartPosition| {
        statuses
            .iter()
            .filter(|s| !s.spectator)
            .any(|s| s.position == *pos)
    };
    match map.positions.iter().find(|pos| !taken(pos)) {
        Some(pos) => StartPosition::new(
            pos.x.min(map.width).max(0),
            pos.y.min(map.height).max(0),
        ),
        None => StartPosition::new(map.width / 2, map.height / 2),
    }
}
