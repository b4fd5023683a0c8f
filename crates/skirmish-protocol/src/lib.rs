//! Shared data formats for Skirmish.
//!
//! This crate defines what a battle session is made of and how it is
//! written down:
//!
//! - **Types** ([`BattleStatus`], [`Colour`], [`ResourceId`], etc.) —
//!   per-participant state and the identity of the map and game archive.
//! - **Script tree** ([`Section`]) — the in-memory form of a game script.
//! - **Codec** ([`Codec`] trait, [`TdfCodec`]) — how a script tree is
//!   converted to/from text.
//! - **Demo containers** ([`demo`]) — where the script lives inside replay
//!   and savegame files.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while parsing.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about rosters or sessions. It only
//! knows how to read and write the data those layers are built from.
//!
//! ```text
//! bytes → demo (script text) → Codec (Section tree) → battle state
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
pub mod demo;
mod error;
mod script;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{Codec, TdfCodec};
pub use demo::DemoHeader;
pub use error::ProtocolError;
pub use script::Section;
pub use types::{
    BattleStatus, BotInfo, Colour, HostInfo, OptionCategory, ResourceId, StartPosition,
    SyncState, normalize_hash,
};
