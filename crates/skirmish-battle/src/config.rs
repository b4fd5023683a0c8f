//! Battle configuration and session metadata.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BattleConfig
// ---------------------------------------------------------------------------

/// Tunables for a battle's allocation behaviour.
///
/// Override single fields with struct update syntax:
///
/// ```rust
/// use skirmish_battle::BattleConfig;
///
/// let config = BattleConfig {
///     colour_threshold: 40,
///     ..BattleConfig::default()
/// };
/// assert_eq!(config.palette_growth_limit, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Two colours whose largest channel difference is below this value
    /// are too similar to hand out to two players.
    pub colour_threshold: u8,

    /// How many extra palette entries `free_colour` may generate beyond the
    /// current team count before giving up on finding a distinct colour.
    /// Past this limit the colour farthest from every used one is handed
    /// out, even if it is within `colour_threshold` of one of them.
    pub palette_growth_limit: usize,

    /// Player limit used until the host announces one.
    pub default_max_players: u32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            colour_threshold: 20,
            palette_growth_limit: 64,
            default_max_players: 16,
        }
    }
}

// ---------------------------------------------------------------------------
// BattleType
// ---------------------------------------------------------------------------

/// Where a battle's state comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleType {
    /// A live, hosted game. Only these get automatic team/ally/colour
    /// assignment.
    #[default]
    Played,
    /// Reconstructed from a recorded match.
    Replay,
    /// Reconstructed from a local save file.
    Savegame,
}

impl BattleType {
    /// Returns `true` for battles rebuilt from a file.
    pub fn is_playback(self) -> bool {
        matches!(self, Self::Replay | Self::Savegame)
    }
}

impl std::fmt::Display for BattleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Played => write!(f, "played"),
            Self::Replay => write!(f, "replay"),
            Self::Savegame => write!(f, "savegame"),
        }
    }
}

// ---------------------------------------------------------------------------
// BattleOptions
// ---------------------------------------------------------------------------

/// Negotiated session metadata.
///
/// Map and game identity live on the [`Battle`](crate::Battle) itself
/// because changing them has side effects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleOptions {
    /// Nickname of the player hosting the battle.
    pub founder: String,
    pub max_players: u32,
    /// Relay host running the battle on the founder's behalf, empty if
    /// none.
    pub proxy_host: String,
    /// A locked battle accepts no new players.
    pub locked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battle_config_default() {
        let config = BattleConfig::default();
        assert_eq!(config.colour_threshold, 20);
        assert_eq!(config.default_max_players, 16);
    }

    #[test]
    fn test_battle_config_deserialize_fills_missing_fields() {
        let config: BattleConfig =
            serde_json::from_str(r#"{ "colour_threshold": 32 }"#).unwrap();
        assert_eq!(config.colour_threshold, 32);
        assert_eq!(config.palette_growth_limit, 64);
    }

    #[test]
    fn test_battle_type_is_playback() {
        assert!(!BattleType::Played.is_playback());
        assert!(BattleType::Replay.is_playback());
        assert!(BattleType::Savegame.is_playback());
        assert_eq!(BattleType::Savegame.to_string(), "savegame");
    }
}
