//! The open option set that seeds the game.
//!
//! Options are plain string key/value pairs grouped by
//! [`OptionCategory`]. The battle never interprets map or game options; it
//! only stores and forwards them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use skirmish_protocol::OptionCategory;

/// One category's options.
pub type OptionMap = BTreeMap<String, String>;

/// Engine options every battle starts with.
pub const ENGINE_DEFAULTS: &[(&str, &str)] = &[
    ("startpostype", "0"),
    ("gamemode", "0"),
    ("maxunits", "500"),
    ("startmetal", "1000"),
    ("startenergy", "1000"),
    ("fixedallies", "1"),
    ("ghostedbuildings", "1"),
    ("disablemapdamage", "0"),
    ("limitdgun", "0"),
    ("diminishingmms", "0"),
];

/// How players are placed on the map (`startpostype`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartType {
    Fixed,
    Random,
    /// Players choose inside their alliance's start zone.
    Choose,
    /// Players pick a position in the lobby.
    Pick,
}

impl StartType {
    /// Parses an engine option value, `None` when it is not a known mode.
    pub fn from_option(value: &str) -> Option<Self> {
        match value.trim().parse::<i64>().ok()? {
            0 => Some(Self::Fixed),
            1 => Some(Self::Random),
            2 => Some(Self::Choose),
            3 => Some(Self::Pick),
            _ => None,
        }
    }
}

/// Options keyed by category, then by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSet {
    categories: BTreeMap<OptionCategory, OptionMap>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// An option set holding only [`ENGINE_DEFAULTS`].
    pub fn with_engine_defaults() -> Self {
        let mut set = Self::new();
        for (key, value) in ENGINE_DEFAULTS {
            set.set(OptionCategory::Engine, *key, *value);
        }
        set
    }

    pub fn get(&self, category: OptionCategory, key: &str) -> Option<&str> {
        self.categories
            .get(&category)
            .and_then(|map| map.get(key))
            .map(String::as_str)
    }

    pub fn set(
        &mut self,
        category: OptionCategory,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.categories
            .entry(category)
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn remove(&mut self, category: OptionCategory, key: &str) -> Option<String> {
        self.categories.get_mut(&category)?.remove(key)
    }

    /// Returns a copy of one category's options.
    pub fn category(&self, category: OptionCategory) -> OptionMap {
        self.categories.get(&category).cloned().unwrap_or_default()
    }

    /// Iterates over one category's options in key order.
    pub fn iter(&self, category: OptionCategory) -> impl Iterator<Item = (&str, &str)> {
        self.categories
            .get(&category)
            .into_iter()
            .flat_map(|map| map.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    pub fn clear_category(&mut self, category: OptionCategory) {
        self.categories.remove(&category);
    }

    /// The configured start mode, if `startpostype` holds a known value.
    pub fn start_type(&self) -> Option<StartType> {
        self.get(OptionCategory::Engine, "startpostype")
            .and_then(StartType::from_option)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_by_category() {
        let mut set = OptionSet::new();
        set.set(OptionCategory::Mod, "comm", "fixed");
        assert_eq!(set.get(OptionCategory::Mod, "comm"), Some("fixed"));
        assert_eq!(set.get(OptionCategory::Map, "comm"), None);
    }

    #[test]
    fn test_with_engine_defaults_sets_fixed_start() {
        let set = OptionSet::with_engine_defaults();
        assert_eq!(set.start_type(), Some(StartType::Fixed));
        assert_eq!(set.iter(OptionCategory::Engine).count(), ENGINE_DEFAULTS.len());
        assert_eq!(set.iter(OptionCategory::Private).count(), 0);
    }

    #[test]
    fn test_clear_category_leaves_others() {
        let mut set = OptionSet::with_engine_defaults();
        set.set(OptionCategory::Map, "waterlevel", "3");
        set.clear_category(OptionCategory::Map);
        assert!(set.category(OptionCategory::Map).is_empty());
        assert!(!set.category(OptionCategory::Engine).is_empty());
    }

    #[test]
    fn test_start_type_from_option() {
        assert_eq!(StartType::from_option("2"), Some(StartType::Choose));
        assert_eq!(StartType::from_option(" 3 "), Some(StartType::Pick));
        assert_eq!(StartType::from_option("9"), None);
        assert_eq!(StartType::from_option("x"), None);
    }
}
