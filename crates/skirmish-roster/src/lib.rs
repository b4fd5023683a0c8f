//! Participant roster for Skirmish battles.
//!
//! This crate tracks who is in a battle and keeps the numbers the battle
//! needs to decide anything:
//!
//! 1. **Identity** — lobby users live in a [`UserDirectory`] owned by the
//!    transport; battles hold generation-checked [`UserHandle`]s into it.
//! 2. **Participants** — humans, AIs and script-reconstructed players
//!    ([`Participant`]) with their [`BattleStatus`](skirmish_protocol::BattleStatus).
//! 3. **Counts** — team/ally occupancy and readiness totals, maintained
//!    incrementally by the [`Roster`].
//!
//! # How it fits in the stack
//!
//! ```text
//! Battle Layer (above)  ← allocates teams and colours from roster counts
//!     ↕
//! Roster Layer (this crate)  ← participants and their aggregates
//!     ↕
//! Protocol Layer (below)  ← BattleStatus, Colour, SyncState
//! ```

mod directory;
mod error;
mod participant;
mod roster;

pub use directory::{User, UserDirectory, UserHandle};
pub use error::RosterError;
pub use participant::{Participant, ParticipantKind};
pub use roster::{Aggregates, Counts, Roster, StatusChange};
