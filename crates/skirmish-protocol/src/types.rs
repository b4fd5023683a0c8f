//! Core value types shared by every layer of Skirmish.
//!
//! These are the pieces of battle state that travel between the lobby
//! server, the game script, and the local session: a participant's
//! [`BattleStatus`], team colours, start positions, and the identity of the
//! map and game archive being played.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Colour
// ---------------------------------------------------------------------------

/// An RGB team colour.
///
/// Colours are compared with [`Colour::difference`], the largest absolute
/// difference over the three channels. Two colours whose difference is
/// below a threshold are considered "similar" and are never handed out to
/// two active players at once.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Colour {
    /// Creates a colour from its three channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Returns the maximum per-channel absolute difference.
    pub fn difference(&self, other: &Colour) -> u8 {
        let dr = self.r.abs_diff(other.r);
        let dg = self.g.abs_diff(other.g);
        let db = self.b.abs_diff(other.b);
        dr.max(dg).max(db)
    }

    /// Returns `true` if the two colours differ by less than `threshold`.
    pub fn is_similar(&self, other: &Colour, threshold: u8) -> bool {
        self.difference(other) < threshold
    }

    /// Parses the game script's `"r g b"` notation where every channel is a
    /// float in `0.0..=1.0`. Missing or unparsable channels read as 0.
    pub fn from_float_string(s: &str) -> Self {
        let mut channels = s.split_whitespace().map(|part| {
            let value = part.parse::<f32>().unwrap_or(0.0);
            (value.clamp(0.0, 1.0) * 255.0).round() as u8
        });
        let r = channels.next().unwrap_or(0);
        let g = channels.next().unwrap_or(0);
        let b = channels.next().unwrap_or(0);
        Self { r, g, b }
    }

    /// Formats the colour in the game script's `"r g b"` float notation.
    pub fn to_float_string(&self) -> String {
        format!(
            "{:.3} {:.3} {:.3}",
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0
        )
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

// ---------------------------------------------------------------------------
// SyncState
// ---------------------------------------------------------------------------

/// Whether a participant has the exact map and game archive the host uses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// The participant has not reported yet.
    #[default]
    Unknown,
    /// The participant is missing content or has a different version.
    Unsynced,
    /// The participant has everything needed to play.
    Synced,
}

impl SyncState {
    /// Returns `true` only for [`SyncState::Synced`].
    pub fn is_synced(self) -> bool {
        matches!(self, Self::Synced)
    }
}

impl From<bool> for SyncState {
    fn from(synced: bool) -> Self {
        if synced { Self::Synced } else { Self::Unsynced }
    }
}

// ---------------------------------------------------------------------------
// StartPosition
// ---------------------------------------------------------------------------

/// A start position in map coordinates. Negative coordinates mean "unset".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StartPosition {
    pub x: i32,
    pub y: i32,
}

impl StartPosition {
    /// The position of a participant nobody has placed yet.
    pub const UNSET: Self = Self { x: -1, y: -1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns `true` if both coordinates are non-negative.
    pub fn is_set(&self) -> bool {
        self.x >= 0 && self.y >= 0
    }
}

impl Default for StartPosition {
    fn default() -> Self {
        Self::UNSET
    }
}

// ---------------------------------------------------------------------------
// BotInfo / BattleStatus
// ---------------------------------------------------------------------------

/// The extra fields an AI participant carries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BotInfo {
    /// Nickname of the human that hosts the AI process.
    pub owner: String,
    /// Short name of the AI library (e.g. `"KAIK"`).
    pub short_name: String,
    /// AI library version.
    pub version: String,
}

/// Per-participant battle state.
///
/// Spectators keep their team and ally values but do not occupy them:
/// they are excluded from occupancy counts and from the ready/sync
/// aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BattleStatus {
    pub team: u32,
    pub ally: u32,
    pub spectator: bool,
    pub ready: bool,
    pub sync: SyncState,
    pub colour: Colour,
    /// Resource bonus in percent.
    pub handicap: u32,
    /// Index into the game archive's ordered side list.
    pub side: u32,
    pub position: StartPosition,
    /// Present iff the participant is an AI.
    pub bot: Option<BotInfo>,
}

impl BattleStatus {
    /// Returns `true` if this status belongs to an AI participant.
    pub fn is_bot(&self) -> bool {
        self.bot.is_some()
    }

    /// Returns `true` if the participant is both ready and synced.
    pub fn is_ok(&self) -> bool {
        self.ready && self.sync.is_synced()
    }
}

// ---------------------------------------------------------------------------
// ResourceId
// ---------------------------------------------------------------------------

/// Name and checksum of a map or game archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourceId {
    pub name: String,
    pub hash: String,
}

impl ResourceId {
    pub fn new(name: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hash: hash.into(),
        }
    }

    /// Returns `true` if no checksum is known. The lobby protocol uses
    /// `"0"` for "unknown" as well as the empty string.
    pub fn has_unknown_hash(&self) -> bool {
        self.hash.is_empty() || self.hash == "0"
    }
}

/// Normalizes an archive checksum to its unsigned 32-bit decimal form.
///
/// Game scripts written by older engines store checksums as signed
/// integers (`-1` instead of `4294967295`). Values that are not integers
/// are returned unchanged.
pub fn normalize_hash(hash: &str) -> String {
    let trimmed = hash.trim();
    match trimmed.parse::<i64>() {
        Ok(value) => (value as u32).to_string(),
        Err(_) => trimmed.to_string(),
    }
}

// ---------------------------------------------------------------------------
// HostInfo / OptionCategory
// ---------------------------------------------------------------------------

/// Which aspect of the session changed and must be broadcast by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostInfo {
    Spectators,
    Map,
    StartRects,
    Restrictions,
    SendAllOptions,
}

/// The categories of the open option set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OptionCategory {
    /// Engine settings (`startpostype`, `gamespeed`, ...).
    Engine,
    /// Options declared by the map archive.
    Map,
    /// Options declared by the game archive.
    Mod,
    /// Lobby-only settings never sent to the engine verbatim.
    Private,
}

impl OptionCategory {
    /// Every category, in storage order.
    pub const ALL: [Self; 4] = [Self::Engine, Self::Map, Self::Mod, Self::Private];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Engine => "engine",
            Self::Map => "map",
            Self::Mod => "mod",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for OptionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =========================================================================
// Tests
// =========================================================================
