//! Unified error type for Skirmish.

use std::path::PathBuf;

use skirmish_battle::BattleError;
use skirmish_protocol::ProtocolError;
use skirmish_roster::RosterError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `skirmish` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant generates the `From` impls, so `?` converts
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum SkirmishError {
    /// A game script failed to parse.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A roster lookup or insertion failed.
    #[error(transparent)]
    Roster(#[from] RosterError),

    /// A battle operation was rejected.
    #[error(transparent)]
    Battle(#[from] BattleError),

    /// Reading or writing a file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The preset file is not valid JSON for a preset store.
    #[error("preset file: {0}")]
    Json(#[from] serde_json::Error),

    /// A replay or savegame holds no game script.
    #[error("no game script in {}", .0.display())]
    EmptyScript(PathBuf),

    /// A global tracing subscriber is already installed.
    #[error(transparent)]
    Logging(#[from] tracing_subscriber::util::TryInitError),
}
