//! Error types for the battle layer.
//!
//! Only precondition failures are errors here. Missing content and
//! malformed scripts are not: the battle degrades to defaults and reports
//! them through [`LoadState`](crate::LoadState) and the logs instead.

use skirmish_roster::RosterError;

/// Errors that can occur during battle operations.
#[derive(Debug, thiserror::Error)]
pub enum BattleError {
    /// A roster lookup or insertion failed (unknown or duplicate nick).
    #[error(transparent)]
    Roster(#[from] RosterError),

    /// Only the founder may do this to a human participant.
    #[error("only the battle founder may {action} {nick}")]
    NotPermitted { action: &'static str, nick: String },

    /// A map name is required here.
    #[error("battle with empty map name")]
    EmptyMapName,

    /// No stored preset matches this name, ignoring case.
    #[error("preset {0} not found")]
    PresetNotFound(String),

    /// The preset store could not be written.
    #[error("preset store: {0}")]
    Io(#[from] std::io::Error),
}
