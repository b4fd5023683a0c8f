//! Error types for the roster layer.

/// Errors that can occur while changing a battle's roster.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RosterError {
    /// A participant with this nickname is already in the battle.
    /// Nicknames are the roster's key, so a second entry would make every
    /// later lookup ambiguous.
    #[error("participant {0} is already in the battle")]
    AlreadyPresent(String),

    /// No participant with this nickname is in the battle.
    #[error("participant {0} is not in the battle")]
    NotFound(String),
}
