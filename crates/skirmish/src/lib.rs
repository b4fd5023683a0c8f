//! # Skirmish
//!
//! Battle-session state engine for RTS lobby clients.
//!
//! Skirmish keeps the client-side model of one pre-game lobby session: who
//! is in it, which team, alliance, colour and start position each of them
//! gets, which start zones and unit restrictions apply, and which options
//! the game starts with. The same model is rebuilt from replays and
//! savegames, and hosting setups can be saved as named presets.
//!
//! ## Crates
//!
//! | Crate | Contents |
//! |-------|----------|
//! | `skirmish-protocol` | status types, game script tree and codec, replay headers |
//! | `skirmish-roster` | user directory, participants, occupancy and readiness counts |
//! | `skirmish-battle` | the [`Battle`] controller, allocators, start zones, presets |
//! | `skirmish` | this crate: unified error, playback files, JSON presets, logging |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skirmish::prelude::*;
//!
//! # fn main() -> Result<(), SkirmishError> {
//! init_tracing()?;
//! let presets = JsonPresetStore::open("presets.json")?;
//! let mut battle = Battle::builder("alice")
//!     .founder("alice")
//!     .presets(presets)
//!     .build();
//! battle.join(Participant::recorded("alice", BattleStatus::default()))?;
//! battle.save_preset("duel")?;
//! # Ok(())
//! # }
//! ```

mod error;
mod logging;
pub mod playback;
mod presets;

pub use error::SkirmishError;
pub use logging::{DEFAULT_FILTER, init_tracing};
pub use playback::{PlaybackList, StoredGame};
pub use presets::JsonPresetStore;

pub use skirmish_battle::{
    Battle, BattleBuilder, BattleConfig, BattleType, LoadState, StartRect, StartRects,
};

/// Everything needed to drive a battle session.
pub mod prelude {
    pub use crate::{
        JsonPresetStore, PlaybackList, SkirmishError, StoredGame, init_tracing,
    };
    pub use skirmish_battle::{
        AssetProvider, Battle, BattleConfig, BattleError, BattleType, Frontend, HostInfoSink,
        LoadState, MapInfo, ModInfo, PresetStore, StartRects,
    };
    pub use skirmish_protocol::{
        BattleStatus, BotInfo, Colour, HostInfo, OptionCategory, StartPosition, SyncState,
    };
    pub use skirmish_roster::{Participant, User, UserDirectory, UserHandle};
}
