//! Collaborators a battle talks to.
//!
//! A [`Battle`](crate::Battle) never reaches for global state. Everything
//! outside the session is handed to it at construction through four
//! traits:
//!
//! - [`AssetProvider`] — which maps and games are installed locally.
//! - [`PresetStore`] — where named hosting presets are persisted.
//! - [`HostInfoSink`] — where "this changed, broadcast it" notices go.
//! - [`Frontend`] — questions and notices for the user interface.
//!
//! Each trait has a do-nothing or in-memory implementation in this module,
//! used by reconstructed battles and by tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::rc::Rc;

use skirmish_protocol::{HostInfo, OptionCategory, StartPosition};

use crate::OptionMap;

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// What the asset library knows about an installed map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapInfo {
    pub name: String,
    pub hash: String,
    pub width: i32,
    pub height: i32,
    /// Start positions defined by the map, in order.
    pub positions: Vec<StartPosition>,
    /// Default values of the map's own options.
    pub options: OptionMap,
}

/// What the asset library knows about an installed game archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModInfo {
    pub name: String,
    pub hash: String,
    /// Default values of the game's own options.
    pub options: OptionMap,
}

/// Local content lookup.
///
/// Every query is synchronous and idempotent; the battle caches the
/// results and only asks again after the map or game identity changes.
pub trait AssetProvider {
    /// Returns `true` if a map with this name (and hash, unless empty) is
    /// installed.
    fn map_exists(&self, name: &str, hash: &str) -> bool;

    fn map_info(&self, name: &str) -> Option<MapInfo>;

    /// Returns `true` if a game with this name (and hash, unless empty) is
    /// installed.
    fn mod_exists(&self, name: &str, hash: &str) -> bool;

    fn mod_info(&self, name: &str) -> Option<ModInfo>;

    /// The game's playable sides, in index order.
    fn sides(&self, _mod_name: &str) -> Vec<String> {
        Vec::new()
    }

    /// Releases whatever the library holds for the current game. Called
    /// when the local user leaves the battle. Default: no-op.
    fn release_current_mod(&self) {}
}

/// An asset library with nothing installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssets;

impl AssetProvider for NoAssets {
    fn map_exists(&self, _name: &str, _hash: &str) -> bool {
        false
    }

    fn map_info(&self, _name: &str) -> Option<MapInfo> {
        None
    }

    fn mod_exists(&self, _name: &str, _hash: &str) -> bool {
        false
    }

    fn mod_info(&self, _name: &str) -> Option<ModInfo> {
        None
    }
}

/// An in-memory asset library.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    maps: Vec<MapInfo>,
    mods: Vec<(ModInfo, Vec<String>)>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_map(mut self, map: MapInfo) -> Self {
        self.maps.push(map);
        self
    }

    pub fn with_mod(mut self, info: ModInfo, sides: Vec<String>) -> Self {
        self.mods.push((info, sides));
        self
    }
}

fn matches_identity(name: &str, hash: &str, want_name: &str, want_hash: &str) -> bool {
    name == want_name && (want_hash.is_empty() || hash == want_hash)
}

impl AssetProvider for MemoryAssets {
    fn map_exists(&self, name: &str, hash: &str) -> bool {
        self.maps
            .iter()
            .any(|m| matches_identity(&m.name, &m.hash, name, hash))
    }

    fn map_info(&self, name: &str) -> Option<MapInfo> {
        self.maps.iter().find(|m| m.name == name).cloned()
    }

    fn mod_exists(&self, name: &str, hash: &str) -> bool {
        self.mods
            .iter()
            .any(|(m, _)| matches_identity(&m.name, &m.hash, name, hash))
    }

    fn mod_info(&self, name: &str) -> Option<ModInfo> {
        self.mods
            .iter()
            .find(|(m, _)| m.name == name)
            .map(|(m, _)| m.clone())
    }

    fn sides(&self, mod_name: &str) -> Vec<String> {
        self.mods
            .iter()
            .find(|(m, _)| m.name == mod_name)
            .map(|(_, sides)| sides.clone())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Persistent storage for named hosting presets.
///
/// A preset holds one [`OptionMap`] per [`OptionCategory`]. Names are
/// stored with their original case.
pub trait PresetStore {
    /// Returns the stored options of `name` for `category`, empty when
    /// absent.
    fn preset(&self, name: &str, category: OptionCategory) -> OptionMap;

    fn set_preset(&mut self, name: &str, category: OptionCategory, options: OptionMap);

    /// Every stored preset name, in display order.
    fn preset_names(&self) -> Vec<String>;

    fn delete_preset(&mut self, name: &str);

    /// Writes pending changes to durable storage. Default: nothing to do.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A preset store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryPresetStore {
    presets: BTreeMap<String, HashMap<OptionCategory, OptionMap>>,
}

impl MemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresetStore for MemoryPresetStore {
    fn preset(&self, name: &str, category: OptionCategory) -> OptionMap {
        self.presets
            .get(name)
            .and_then(|p| p.get(&category))
            .cloned()
            .unwrap_or_default()
    }

    fn set_preset(&mut self, name: &str, category: OptionCategory, options: OptionMap) {
        self.presets
            .entry(name.to_string())
            .or_default()
            .insert(category, options);
    }

    fn preset_names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    fn delete_preset(&mut self, name: &str) {
        self.presets.remove(name);
    }
}

// ---------------------------------------------------------------------------
// Host info
// ---------------------------------------------------------------------------

/// Receives notices that part of the session changed and must be
/// broadcast by the host.
pub trait HostInfoSink {
    fn send_host_info(&mut self, kind: HostInfo);
}

/// Discards every notice.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl HostInfoSink for NullSink {
    fn send_host_info(&mut self, _kind: HostInfo) {}
}

/// Records notices in a shared list.
///
/// Clones share the same list, so one clone can be handed to the battle
/// while another is kept to inspect what was sent.
#[derive(Debug, Clone, Default)]
pub struct HostInfoLog {
    sent: Rc<RefCell<Vec<HostInfo>>>,
}

impl HostInfoLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns and forgets everything recorded so far.
    pub fn take(&self) -> Vec<HostInfo> {
        self.sent.take()
    }
}

impl HostInfoSink for HostInfoLog {
    fn send_host_info(&mut self, kind: HostInfo) {
        self.sent.borrow_mut().push(kind);
    }
}

// ---------------------------------------------------------------------------
// Frontend
// ---------------------------------------------------------------------------

/// The user interface, as far as the battle needs it.
pub trait Frontend {
    /// A preset names a map that is not installed. Returns `true` if the
    /// user chose to fetch it, `false` to drop the map from the preset.
    fn preset_requires_map(&mut self, _map: &str) -> bool {
        false
    }

    /// The stored preset list changed.
    fn preset_list_changed(&mut self) {}

    /// An AI was removed from the battle.
    fn bot_removed(&mut self, _nick: &str) {}
}

/// A frontend that declines every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFrontend;

impl Frontend for NullFrontend {}
