//! Battle sessions for Skirmish.
//!
//! A battle is one pre-game lobby session: who is in it, which team and
//! alliance each of them plays, where they start, which map and game are
//! loaded, and which options the game will be started with. The same type
//! also describes finished games rebuilt from replays and savegames.
//!
//! # Key types
//!
//! - [`Battle`] — the session controller, built with [`Battle::builder`]
//! - [`StartRects`] — per-alliance start zones with pending-change flags
//! - [`OptionSet`] — engine, map, game and private options
//! - [`AssetProvider`], [`PresetStore`], [`HostInfoSink`], [`Frontend`] —
//!   the collaborators a battle is given at construction
//!
//! # How it fits in the stack
//!
//! ```text
//! Battle Layer (this crate)  ← allocation, start zones, scripts, presets
//!     ↕
//! Roster Layer (below)  ← participants and their aggregates
//!     ↕
//! Protocol Layer (below)  ← BattleStatus, script tree, replay headers
//! ```
//!
//! # Example
//!
//! ```rust
//! use skirmish_battle::Battle;
//! use skirmish_protocol::BattleStatus;
//! use skirmish_roster::Participant;
//!
//! let mut battle = Battle::builder("alice").founder("alice").build();
//! battle.join(Participant::recorded("alice", BattleStatus::default())).unwrap();
//! battle.join(Participant::recorded("bob", BattleStatus::default())).unwrap();
//!
//! assert_eq!(battle.participant("bob").unwrap().status.team, 1);
//! assert_eq!(battle.free_team(false), 2);
//! ```

pub mod alloc;
mod battle;
mod config;
mod error;
mod options;
mod preset;
mod script;
mod services;
mod start_rect;

pub use battle::{Battle, BattleBuilder, LoadState};
pub use config::{BattleConfig, BattleOptions, BattleType};
pub use error::BattleError;
pub use options::{ENGINE_DEFAULTS, OptionMap, OptionSet, StartType};
pub use services::{
    AssetProvider, Frontend, HostInfoLog, HostInfoSink, MapInfo, MemoryAssets,
    MemoryPresetStore, ModInfo, NoAssets, NullFrontend, NullSink, PresetStore,
};
pub use start_rect::{StartRect, StartRects};
