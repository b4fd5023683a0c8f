//! Named hosting presets.
//!
//! A preset stores the engine, map and game options verbatim. The private
//! category holds what is not an option: the map name, the start zones
//! (only when players choose inside zones) and the unit restrictions.
//!
//! ```text
//! mapname       = Delta Siege Dry
//! numrects      = 2
//! rect_0_ally   = 1          (ally + 1; 0 means "no zone")
//! rect_0_left   = 0
//! ...
//! restrictions  = armcom=1<TAB>corcom=0<TAB>
//! ```

use skirmish_protocol::{HostInfo, OptionCategory};

use crate::{Battle, BattleError, OptionMap, StartType};

const STORED_CATEGORIES: [OptionCategory; 3] = [
    OptionCategory::Engine,
    OptionCategory::Map,
    OptionCategory::Mod,
];

impl Battle {
    /// Stores the current options under `name`. An existing preset whose
    /// name matches ignoring case is overwritten and keeps its stored
    /// spelling; otherwise `name` is used as given.
    ///
    /// # Errors
    /// [`BattleError::Io`] if the preset store cannot be flushed.
    pub fn save_preset(&mut self, name: &str) -> Result<(), BattleError> {
        let name = self
            .fix_preset_name(name)
            .unwrap_or_else(|| name.to_string());
        let name = name.as_str();
        for category in STORED_CATEGORIES {
            self.presets
                .set_preset(name, category, self.custom.category(category));
        }

        let mut private = OptionMap::new();
        private.insert("mapname".into(), self.host_map.name.clone());

        if self.custom.start_type() == Some(StartType::Choose) {
            let last = self.rects.last_index();
            for ally in 0..=last {
                let Some(rect) = self.rects.get(ally).filter(|r| r.is_ok()) else {
                    continue;
                };
                let prefix = format!("rect_{ally}");
                private.insert(format!("{prefix}_ally"), (rect.ally + 1).to_string());
                private.insert(format!("{prefix}_left"), rect.left.to_string());
                private.insert(format!("{prefix}_top"), rect.top.to_string());
                private.insert(format!("{prefix}_right"), rect.right.to_string());
                private.insert(format!("{prefix}_bottom"), rect.bottom.to_string());
            }
            private.insert("numrects".into(), (last + 1).to_string());
        }

        let restrictions: String = self
            .restrictions
            .iter()
            .map(|(unit, count)| format!("{unit}={count}\t"))
            .collect();
        private.insert("restrictions".into(), restrictions);

        self.presets
            .set_preset(name, OptionCategory::Private, private);
        self.presets.flush()?;
        self.frontend.preset_list_changed();
        tracing::info!(preset = name, "preset saved");
        Ok(())
    }

    /// Applies the preset matching `name`, ignoring case.
    ///
    /// # Errors
    /// [`BattleError::PresetNotFound`] if no stored preset matches; nothing
    /// is changed in that case.
    pub fn load_preset(&mut self, name: &str) -> Result<(), BattleError> {
        let name = self
            .fix_preset_name(name)
            .ok_or_else(|| BattleError::PresetNotFound(name.to_string()))?;

        for category in STORED_CATEGORIES {
            for (key, value) in self.presets.preset(&name, category) {
                self.custom.set(category, key, value);
            }
        }

        let mut private = self.presets.preset(&name, OptionCategory::Private);
        self.apply_preset_map(&name, &mut private)?;

        let stale: Vec<u32> = self.rects.iter().filter(|r| r.is_ok()).map(|r| r.ally).collect();
        for ally in stale {
            self.rects.remove(ally);
        }
        self.sink.send_host_info(HostInfo::StartRects);

        let stored: u32 = private
            .get("numrects")
            .and_then(|n| n.trim().parse().ok())
            .unwrap_or(0);
        for index in 0..stored {
            let field = |key: &str| -> i32 {
                private
                    .get(&format!("rect_{index}_{key}"))
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(0)
            };
            let ally = field("ally");
            if ally <= 0 {
                continue;
            }
            self.rects.add(
                (ally - 1) as u32,
                field("left"),
                field("top"),
                field("right"),
                field("bottom"),
            );
        }
        self.sink.send_host_info(HostInfo::StartRects);

        self.restrictions.clear();
        if let Some(list) = private.get("restrictions") {
            for token in list.split('\t').filter(|t| !t.is_empty()) {
                match token.split_once('=') {
                    Some((unit, count)) => {
                        let count = count.trim().parse().unwrap_or(0);
                        self.restrictions.insert(unit.to_string(), count);
                    }
                    None => tracing::warn!(preset = %name, token, "bad restriction entry"),
                }
            }
        }
        self.sink.send_host_info(HostInfo::Restrictions);
        self.sink.send_host_info(HostInfo::SendAllOptions);

        self.preset = Some(name.clone());
        self.frontend.preset_list_changed();
        tracing::info!(preset = %name, "preset loaded");
        Ok(())
    }

    /// Switches to the preset's map. A map that is not installed is either
    /// fetched by the frontend or dropped from the stored preset.
    fn apply_preset_map(&mut self, name: &str, private: &mut OptionMap) -> Result<(), BattleError> {
        let map = private.get("mapname").cloned().unwrap_or_default();
        if map.is_empty() {
            return Ok(());
        }
        if self.assets.map_exists(&map, "") {
            if let Some(info) = self.assets.map_info(&map) {
                self.set_host_map(&info.name, &info.hash)?;
                self.set_local_map(&map)?;
                self.sink.send_host_info(HostInfo::Map);
            }
        } else if !self.frontend.preset_requires_map(&map) {
            tracing::warn!(preset = name, map = %map, "preset map not installed, dropping it");
            private.insert("mapname".into(), String::new());
            self.presets
                .set_preset(name, OptionCategory::Private, private.clone());
            self.presets.flush()?;
        }
        Ok(())
    }

    /// Removes the preset matching `name`, ignoring case.
    pub fn delete_preset(&mut self, name: &str) -> Result<(), BattleError> {
        let name = self
            .fix_preset_name(name)
            .ok_or_else(|| BattleError::PresetNotFound(name.to_string()))?;
        self.presets.delete_preset(&name);
        if self.preset.as_deref() == Some(name.as_str()) {
            self.preset = None;
        }
        self.presets.flush()?;
        self.frontend.preset_list_changed();
        tracing::info!(preset = %name, "preset deleted");
        Ok(())
    }

    /// Stored preset names.
    pub fn preset_list(&self) -> Vec<String> {
        self.presets.preset_names()
    }

    /// The preset last loaded, if it still exists.
    pub fn current_preset(&self) -> Option<&str> {
        self.preset.as_deref()
    }

    /// The stored spelling of `name`, matched case-insensitively.
    fn fix_preset_name(&self, name: &str) -> Option<String> {
        self.presets
            .preset_names()
            .into_iter()
            .find(|stored| stored.eq_ignore_ascii_case(name))
    }
}
