//! The battle session controller.
//!
//! A [`Battle`] owns everything about one lobby session: the roster, the
//! start zones, the option set, the map and game identity, and the
//! collaborators it reports to. Transport callbacks and UI actions call
//! into it one at a time; every call leaves the cached counts consistent
//! with the roster before it returns.
//!
//! ```text
//! join / leave / update_status / force_*
//!     → allocators (team, ally, colour, position)
//!     → roster (occupancy + aggregates)
//!     → HostInfoSink (what to broadcast)
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use skirmish_protocol::{
    BattleStatus, BotInfo, Colour, HostInfo, OptionCategory, ResourceId, StartPosition,
};
use skirmish_roster::{Aggregates, Participant, Roster, RosterError, StatusChange};

use crate::alloc;
use crate::{
    AssetProvider, BattleConfig, BattleError, BattleOptions, BattleType, Frontend,
    HostInfoSink, MapInfo, MemoryPresetStore, ModInfo, NoAssets, NullFrontend, NullSink,
    OptionSet, PresetStore, StartRects,
};

// ---------------------------------------------------------------------------
// LoadState
// ---------------------------------------------------------------------------

/// Whether the local copy of the host's map (or game) has been resolved.
///
/// The state is reset to `NotAttempted` whenever the host's identity
/// changes; `NotFound` is cached until then so a missing archive is not
/// looked up on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    NotAttempted,
    Loaded,
    NotFound,
}

impl LoadState {
    pub fn is_loaded(self) -> bool {
        matches!(self, Self::Loaded)
    }
}

// ---------------------------------------------------------------------------
// BattleBuilder
// ---------------------------------------------------------------------------

/// Builder for a [`Battle`].
///
/// Every collaborator has a stand-in default: no installed assets, an
/// in-memory preset store, and a sink and frontend that ignore everything.
///
/// # Example
///
/// ```rust
/// use skirmish_battle::{Battle, BattleType, HostInfoLog};
///
/// let log = HostInfoLog::new();
/// let battle = Battle::builder("alice")
///     .founder("alice")
///     .battle_type(BattleType::Played)
///     .max_players(4)
///     .host_info(log.clone())
///     .build();
/// assert!(battle.is_founder_me());
/// ```
pub struct BattleBuilder {
    me: String,
    battle_type: BattleType,
    config: BattleConfig,
    options: BattleOptions,
    max_players: Option<u32>,
    assets: Box<dyn AssetProvider>,
    presets: Box<dyn PresetStore>,
    sink: Box<dyn HostInfoSink>,
    frontend: Box<dyn Frontend>,
}

impl BattleBuilder {
    fn new(me: String) -> Self {
        Self {
            me,
            battle_type: BattleType::default(),
            config: BattleConfig::default(),
            options: BattleOptions::default(),
            max_players: None,
            assets: Box::new(NoAssets),
            presets: Box::new(MemoryPresetStore::new()),
            sink: Box::new(NullSink),
            frontend: Box::new(NullFrontend),
        }
    }

    pub fn battle_type(mut self, battle_type: BattleType) -> Self {
        self.battle_type = battle_type;
        self
    }

    pub fn config(mut self, config: BattleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn founder(mut self, nick: impl Into<String>) -> Self {
        self.options.founder = nick.into();
        self
    }

    /// Player limit. Defaults to [`BattleConfig::default_max_players`].
    pub fn max_players(mut self, max: u32) -> Self {
        self.max_players = Some(max);
        self
    }

    pub fn proxy(mut self, host: impl Into<String>) -> Self {
        self.options.proxy_host = host.into();
        self
    }

    pub fn assets(mut self, assets: impl AssetProvider + 'static) -> Self {
        self.assets = Box::new(assets);
        self
    }

    pub fn presets(mut self, presets: impl PresetStore + 'static) -> Self {
        self.presets = Box::new(presets);
        self
    }

    pub fn host_info(mut self, sink: impl HostInfoSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn frontend(mut self, frontend: impl Frontend + 'static) -> Self {
        self.frontend = Box::new(frontend);
        self
    }

    pub fn build(self) -> Battle {
        let mut options = self.options;
        options.max_players = self
            .max_players
            .unwrap_or(self.config.default_max_players);
        Battle {
            me: self.me,
            battle_type: self.battle_type,
            config: self.config,
            options,
            custom: OptionSet::with_engine_defaults(),
            roster: Roster::new(),
            rects: StartRects::new(),
            restrictions: BTreeMap::new(),
            host_map: ResourceId::default(),
            host_mod: ResourceId::default(),
            local_map: None,
            local_mod: None,
            map_state: LoadState::NotAttempted,
            mod_state: LoadState::NotAttempted,
            in_game: false,
            started_at: None,
            preset: None,
            script: String::new(),
            engine_version: String::new(),
            assets: self.assets,
            presets: self.presets,
            sink: self.sink,
            frontend: self.frontend,
        }
    }
}

// ---------------------------------------------------------------------------
// Battle
// ---------------------------------------------------------------------------

/// One battle session, seen from the local user `me`.
pub struct Battle {
    pub(crate) me: String,
    pub(crate) battle_type: BattleType,
    pub(crate) config: BattleConfig,
    pub(crate) options: BattleOptions,
    pub(crate) custom: OptionSet,
    pub(crate) roster: Roster,
    pub(crate) rects: StartRects,
    /// Unit name → maximum count allowed.
    pub(crate) restrictions: BTreeMap<String, u32>,
    pub(crate) host_map: ResourceId,
    pub(crate) host_mod: ResourceId,
    pub(crate) local_map: Option<MapInfo>,
    pub(crate) local_mod: Option<ModInfo>,
    pub(crate) map_state: LoadState,
    pub(crate) mod_state: LoadState,
    pub(crate) in_game: bool,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) preset: Option<String>,
    pub(crate) script: String,
    pub(crate) engine_version: String,
    pub(crate) assets: Box<dyn AssetProvider>,
    pub(crate) presets: Box<dyn PresetStore>,
    pub(crate) sink: Box<dyn HostInfoSink>,
    pub(crate) frontend: Box<dyn Frontend>,
}

impl std::fmt::Debug for Battle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Battle")
            .field("me", &self.me)
            .field("battle_type", &self.battle_type)
            .field("options", &self.options)
            .field("host_map", &self.host_map)
            .field("host_mod", &self.host_mod)
            .field("participants", &self.roster.len())
            .field("start_rects", &self.rects.len())
            .finish_non_exhaustive()
    }
}

impl Battle {
    /// Starts building a battle seen from the local user `me`.
    pub fn builder(me: impl Into<String>) -> BattleBuilder {
        BattleBuilder::new(me.into())
    }

    // =====================================================================
    // Identity
    // =====================================================================

    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn battle_type(&self) -> BattleType {
        self.battle_type
    }

    pub fn set_battle_type(&mut self, battle_type: BattleType) {
        self.battle_type = battle_type;
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn options(&self) -> &BattleOptions {
        &self.options
    }

    pub fn set_founder(&mut self, nick: impl Into<String>) {
        self.options.founder = nick.into();
    }

    /// The founder, if they are in the battle.
    pub fn founder(&self) -> Option<&Participant> {
        if self.options.founder.is_empty() {
            return None;
        }
        self.roster.get(&self.options.founder)
    }

    /// `true` if the local user hosts the battle, directly or through a
    /// relay. A battle without a founder has no host.
    pub fn is_founder_me(&self) -> bool {
        (!self.options.founder.is_empty() && self.options.founder == self.me) || self.is_proxy()
    }

    pub fn set_max_players(&mut self, max: u32) {
        self.options.max_players = max;
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.options.locked = locked;
    }

    pub fn is_locked(&self) -> bool {
        self.options.locked
    }

    pub fn set_proxy(&mut self, host: impl Into<String>) {
        self.options.proxy_host = host.into();
    }

    pub fn is_proxy(&self) -> bool {
        !self.options.proxy_host.is_empty()
    }

    pub fn proxy(&self) -> &str {
        &self.options.proxy_host
    }

    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    pub fn set_engine_version(&mut self, version: impl Into<String>) {
        self.engine_version = version.into();
    }

    // =====================================================================
    // Participants
    // =====================================================================

    /// Adds a participant.
    ///
    /// When the local user hosts a live game, humans get the lowest free
    /// team and ally and a distinct colour; everyone else keeps the status
    /// they arrive with. The host also places anyone without a start
    /// position.
    ///
    /// # Errors
    /// [`RosterError::AlreadyPresent`] if the nickname is taken.
    pub fn join(&mut self, mut participant: Participant) -> Result<&Participant, BattleError> {
        if self.roster.contains(&participant.nick) {
            return Err(RosterError::AlreadyPresent(participant.nick).into());
        }

        let founder_me = self.is_founder_me();
        if founder_me && self.battle_type == BattleType::Played && !participant.is_bot() {
            let exclude_self = participant.nick == self.me;
            participant.status.team = self.free_team(exclude_self);
            participant.status.ally = self.free_ally(exclude_self);
            participant.status.colour = self.free_colour();
        }
        if founder_me && !participant.status.position.is_set() {
            if let Some(position) = self.free_position() {
                participant.status.position = position;
            }
        }

        let joined = self.roster.insert(participant)?;
        tracing::info!(
            nick = %joined.nick,
            team = joined.status.team,
            ally = joined.status.ally,
            spectator = joined.status.spectator,
            bot = joined.is_bot(),
            "participant joined"
        );
        Ok(joined)
    }

    /// Adds an AI hosted by `bot.owner`.
    pub fn add_bot(
        &mut self,
        nick: impl Into<String>,
        bot: BotInfo,
        status: BattleStatus,
    ) -> Result<&Participant, BattleError> {
        self.join(Participant::bot(nick, bot, status))
    }

    /// Removes a participant. When the local user leaves, the whole
    /// session-local state is torn down.
    pub fn leave(&mut self, nick: &str) -> Result<Participant, BattleError> {
        let participant = self.roster.remove(nick)?;
        if participant.status.spectator && self.is_founder_me() {
            self.sink.send_host_info(HostInfo::Spectators);
        }
        tracing::info!(nick, "participant left");
        if nick == self.me {
            self.on_self_left();
        }
        Ok(participant)
    }

    fn on_self_left(&mut self) {
        for bot in self.roster.clear_bots() {
            self.frontend.bot_removed(&bot.nick);
        }
        self.rects.clear();
        self.roster.clear();
        self.assets.release_current_mod();
        tracing::info!("left battle, session state cleared");
    }

    /// Removes a participant on the host's authority. Anyone may kick an
    /// AI.
    ///
    /// # Errors
    /// [`BattleError::NotPermitted`] for a human when the local user is
    /// not the founder.
    pub fn kick(&mut self, nick: &str) -> Result<Participant, BattleError> {
        self.check_authority(nick, "kick")?;
        self.leave(nick)
    }

    /// Replaces a participant's whole status and recounts everything.
    ///
    /// AIs keep their AI details if `status` carries none.
    pub fn update_status(
        &mut self,
        nick: &str,
        mut status: BattleStatus,
    ) -> Result<StatusChange, BattleError> {
        if status.bot.is_none() {
            status.bot = self
                .roster
                .get(nick)
                .and_then(|p| p.status.bot.clone());
        }
        let change = self.roster.replace_status(nick, status)?;
        if change.spectators_changed && self.is_founder_me() {
            self.sink.send_host_info(HostInfo::Spectators);
        }
        Ok(change)
    }

    fn check_authority(&self, nick: &str, action: &'static str) -> Result<(), BattleError> {
        let participant = self
            .roster
            .get(nick)
            .ok_or_else(|| RosterError::NotFound(nick.to_string()))?;
        if self.is_founder_me() || participant.is_bot() {
            Ok(())
        } else {
            Err(BattleError::NotPermitted {
                action,
                nick: nick.to_string(),
            })
        }
    }

    fn force(
        &mut self,
        nick: &str,
        action: &'static str,
        edit: impl FnOnce(&mut BattleStatus),
    ) -> Result<(), BattleError> {
        self.check_authority(nick, action)?;
        self.roster.modify(nick, edit)?;
        tracing::debug!(nick, action, "status forced");
        Ok(())
    }

    pub fn force_team(&mut self, nick: &str, team: u32) -> Result<(), BattleError> {
        self.force(nick, "move", |s| s.team = team)
    }

    pub fn force_ally(&mut self, nick: &str, ally: u32) -> Result<(), BattleError> {
        self.force(nick, "move", |s| s.ally = ally)
    }

    pub fn force_colour(&mut self, nick: &str, colour: Colour) -> Result<(), BattleError> {
        self.force(nick, "recolour", |s| s.colour = colour)
    }

    pub fn force_side(&mut self, nick: &str, side: u32) -> Result<(), BattleError> {
        self.force(nick, "change the side of", |s| s.side = side)
    }

    pub fn set_handicap(&mut self, nick: &str, handicap: u32) -> Result<(), BattleError> {
        self.force(nick, "handicap", |s| s.handicap = handicap)
    }

    pub fn force_spectator(&mut self, nick: &str, spectator: bool) -> Result<(), BattleError> {
        let before = self.roster.aggregates().spectators;
        self.force(nick, "spectate", |s| s.spectator = spectator)?;
        if before != self.roster.aggregates().spectators && self.is_founder_me() {
            self.sink.send_host_info(HostInfo::Spectators);
        }
        Ok(())
    }

    pub fn participant(&self, nick: &str) -> Option<&Participant> {
        self.roster.get(nick)
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn aggregates(&self) -> Aggregates {
        self.roster.aggregates()
    }

    pub fn spectators(&self) -> u32 {
        self.roster.aggregates().spectators
    }

    pub fn num_bots(&self) -> usize {
        self.roster.num_bots()
    }

    pub fn num_players(&self) -> usize {
        self.roster.num_players()
    }

    pub fn num_active_players(&self) -> usize {
        self.roster.num_active_players()
    }

    /// When `nick` most recently became "not ready", if they still are.
    pub fn ready_since(&self, nick: &str) -> Option<DateTime<Utc>> {
        self.roster.ready_since(nick)
    }

    // =====================================================================
    // Allocation
    // =====================================================================

    fn statuses(&self, exclude: Option<&str>) -> Vec<&BattleStatus> {
        self.roster
            .iter()
            .filter(|p| Some(p.nick.as_str()) != exclude)
            .map(|p| &p.status)
            .collect()
    }

    /// The lowest team no non-spectator holds, optionally ignoring the
    /// local user.
    pub fn free_team(&self, exclude_self: bool) -> u32 {
        let exclude = exclude_self.then_some(self.me.as_str());
        alloc::free_team(&self.statuses(exclude))
    }

    /// The lowest alliance no non-spectator holds, optionally ignoring the
    /// local user.
    pub fn free_ally(&self, exclude_self: bool) -> u32 {
        let exclude = exclude_self.then_some(self.me.as_str());
        alloc::free_ally(&self.statuses(exclude))
    }

    /// A colour distinct from every non-spectator's colour.
    pub fn free_colour(&self) -> Colour {
        alloc::free_colour(
            &self.statuses(None),
            self.roster.teams().len(),
            self.config.colour_threshold,
            self.config.palette_growth_limit,
        )
    }

    /// The first unoccupied start position of the local map, or `None`
    /// if the map is not available.
    pub fn free_position(&mut self) -> Option<StartPosition> {
        self.load_map();
        let map = self.local_map.as_ref()?;
        Some(alloc::free_position(&self.statuses(None), map))
    }

    /// Index of the first palette colour within `tolerance` of `colour`
    /// that is not excluded; 0 when none is.
    pub fn closest_fixed_colour(&self, colour: Colour, excluded: &[bool], tolerance: u8) -> usize {
        alloc::closest_fixed_colour(colour, excluded, tolerance, self.roster.teams().len() + 1)
    }

    // =====================================================================
    // Readiness
    // =====================================================================

    /// `true` if the battle should start on its own: not yet running,
    /// full or locked, and every non-founder human player ready and
    /// synced.
    pub fn should_auto_start(&self) -> bool {
        if self.in_game {
            return false;
        }
        let full = self.num_active_players() >= self.options.max_players as usize;
        if !self.options.locked && !full {
            return false;
        }
        self.roster.everyone_ready(Some(self.options.founder.as_str()))
    }

    /// `true` if the local content matches the host's map and game.
    ///
    /// Resolves the local map and game first if that has not been tried
    /// since the host last changed them.
    pub fn is_synced(&mut self) -> bool {
        self.load_mod();
        self.load_map();

        let local_map = self.local_map.as_ref();
        let local_mod = self.local_mod.as_ref();
        let matches = |host: &ResourceId, name: Option<&str>, hash: Option<&str>| {
            (host.has_unknown_hash() || Some(host.hash.as_str()) == hash)
                && (host.name.is_empty() || Some(host.name.as_str()) == name)
        };

        matches(
            &self.host_map,
            local_map.map(|m| m.name.as_str()),
            local_map.map(|m| m.hash.as_str()),
        ) && matches(
            &self.host_mod,
            local_mod.map(|m| m.name.as_str()),
            local_mod.map(|m| m.hash.as_str()),
        ) && self.map_exists(false)
            && self.mod_exists(false)
    }

    // =====================================================================
    // Map and game
    // =====================================================================

    /// Sets the host's map. A different identity invalidates the local
    /// copy.
    pub fn set_host_map(&mut self, name: &str, hash: &str) -> Result<(), BattleError> {
        if name.is_empty() {
            return Err(BattleError::EmptyMapName);
        }
        if self.host_map.name != name || self.host_map.hash != hash {
            self.host_map = ResourceId::new(name, hash);
            self.map_state = LoadState::NotAttempted;
            tracing::debug!(map = name, hash, "host map changed");
        }
        Ok(())
    }

    /// Selects a locally installed map.
    pub fn set_local_map(&mut self, name: &str) -> Result<LoadState, BattleError> {
        if name.is_empty() {
            return Err(BattleError::EmptyMapName);
        }
        match self.assets.map_info(name) {
            Some(info) => {
                let changed = self
                    .local_map
                    .as_ref()
                    .is_none_or(|m| m.name != info.name || m.hash != info.hash);
                if changed {
                    self.local_map = Some(info);
                }
                self.map_state = LoadState::Loaded;
            }
            None => {
                tracing::warn!(map = name, "map not installed");
                self.map_state = LoadState::NotFound;
            }
        }
        Ok(self.map_state)
    }

    pub fn set_host_mod(&mut self, name: &str, hash: &str) {
        if self.host_mod.name != name || self.host_mod.hash != hash {
            self.host_mod = ResourceId::new(name, hash);
            self.mod_state = LoadState::NotAttempted;
            tracing::debug!(game = name, hash, "host game changed");
        }
    }

    pub fn set_local_mod(&mut self, info: ModInfo) {
        let changed = self
            .local_mod
            .as_ref()
            .is_none_or(|m| m.name != info.name || m.hash != info.hash);
        if changed {
            self.local_mod = Some(info);
        }
        self.mod_state = LoadState::Loaded;
    }

    pub fn host_map(&self) -> &ResourceId {
        &self.host_map
    }

    pub fn host_mod(&self) -> &ResourceId {
        &self.host_mod
    }

    pub fn local_map(&self) -> Option<&MapInfo> {
        self.local_map.as_ref()
    }

    pub fn local_mod(&self) -> Option<&ModInfo> {
        self.local_mod.as_ref()
    }

    pub fn map_state(&self) -> LoadState {
        self.map_state
    }

    pub fn mod_state(&self) -> LoadState {
        self.mod_state
    }

    /// Resolves the host's map against local assets, once per identity.
    ///
    /// On success the map's option defaults are added to the option set
    /// without overwriting values already there.
    pub fn load_map(&mut self) -> LoadState {
        if self.map_state != LoadState::NotAttempted || self.host_map.name.is_empty() {
            return self.map_state;
        }
        let found = if self.map_exists(false) {
            self.assets.map_info(&self.host_map.name)
        } else {
            None
        };
        self.map_state = match found {
            Some(info) => {
                seed_defaults(&mut self.custom, OptionCategory::Map, &info.options);
                self.local_map = Some(info);
                LoadState::Loaded
            }
            None => {
                tracing::warn!(map = %self.host_map.name, "map not available locally");
                LoadState::NotFound
            }
        };
        self.map_state
    }

    /// Resolves the host's game against local assets, once per identity.
    pub fn load_mod(&mut self) -> LoadState {
        if self.mod_state != LoadState::NotAttempted || self.host_mod.name.is_empty() {
            return self.mod_state;
        }
        let found = if self.mod_exists(false) {
            self.assets.mod_info(&self.host_mod.name)
        } else {
            None
        };
        self.mod_state = match found {
            Some(info) => {
                seed_defaults(&mut self.custom, OptionCategory::Mod, &info.options);
                self.local_mod = Some(info);
                LoadState::Loaded
            }
            None => {
                tracing::warn!(game = %self.host_mod.name, "game not available locally");
                LoadState::NotFound
            }
        };
        self.mod_state
    }

    /// Whether the host's map is installed, optionally matching its hash.
    pub fn map_exists(&self, compare_hash: bool) -> bool {
        let hash = if compare_hash { self.host_map.hash.as_str() } else { "" };
        self.assets.map_exists(&self.host_map.name, hash)
    }

    /// Whether the host's game is installed, optionally matching its hash.
    pub fn mod_exists(&self, compare_hash: bool) -> bool {
        let hash = if compare_hash { self.host_mod.hash.as_str() } else { "" };
        self.assets.mod_exists(&self.host_mod.name, hash)
    }

    // =====================================================================
    // Options, restrictions, start zones
    // =====================================================================

    pub fn custom_options(&self) -> &OptionSet {
        &self.custom
    }

    pub fn custom_options_mut(&mut self) -> &mut OptionSet {
        &mut self.custom
    }

    pub fn restrict_unit(&mut self, unit: impl Into<String>, count: u32) {
        self.restrictions.insert(unit.into(), count);
    }

    pub fn unrestrict_unit(&mut self, unit: &str) {
        self.restrictions.remove(unit);
    }

    pub fn unrestrict_all_units(&mut self) {
        self.restrictions.clear();
    }

    pub fn restricted_units(&self) -> &BTreeMap<String, u32> {
        &self.restrictions
    }

    pub fn start_rects(&self) -> &StartRects {
        &self.rects
    }

    pub fn start_rects_mut(&mut self) -> &mut StartRects {
        &mut self.rects
    }

    // =====================================================================
    // Game clock
    // =====================================================================

    pub fn in_game(&self) -> bool {
        self.in_game
    }

    /// Marks the game as running (recording the start time) or stopped.
    pub fn set_in_game(&mut self, in_game: bool) {
        self.in_game = in_game;
        self.started_at = in_game.then(Utc::now);
    }

    /// How long the game has been running; zero when it is not.
    pub fn running_time(&self) -> Duration {
        match (self.in_game, self.started_at) {
            (true, Some(start)) => Utc::now() - start,
            _ => Duration::zero(),
        }
    }

    // =====================================================================
    // Script
    // =====================================================================

    /// The raw game script this battle was last loaded from.
    pub fn script(&self) -> &str {
        &self.script
    }
}

/// Inserts every default of `defaults` the set does not already hold.
fn seed_defaults(set: &mut OptionSet, category: OptionCategory, defaults: &BTreeMap<String, String>) {
    for (key, value) in defaults {
        if set.get(category, key).is_none() {
            set.set(category, key.clone(), value.clone());
        }
    }
}
