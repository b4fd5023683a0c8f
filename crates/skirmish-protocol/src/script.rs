//! In-memory tree of a game script.
//!
//! A game script is a tree of named sections. Each section holds ordered
//! `key=value` pairs and nested child sections:
//!
//! ```text
//! [GAME]
//! {
//!     MapName=Delta Siege Dry;
//!     [PLAYER0]
//!     {
//!         Name=alice;
//!         Team=0;
//!     }
//! }
//! ```
//!
//! Section names and keys are case-insensitive, matching the engine's own
//! reader. The original spelling is kept so a tree writes back out the way
//! it was read.

/// A named section of a game script.
///
/// The root of a parsed script is a section with an empty name whose
/// children are the top-level sections (normally just `GAME`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    name: String,
    values: Vec<(String, String)>,
    children: Vec<Section>,
}

impl Section {
    /// Creates an empty section.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates the unnamed root of a script tree.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // -- Values -----------------------------------------------------------

    /// Returns the raw value stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns the value stored under `key`, or `default` when absent.
    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Returns the value under `key` parsed as an integer.
    ///
    /// Absent or unparsable values yield `default`. Float values are
    /// truncated, since some writers emit `Handicap=0.0`.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        let Some(raw) = self.get(key) else {
            return default;
        };
        let raw = raw.trim();
        raw.parse::<i64>()
            .ok()
            .or_else(|| raw.parse::<f64>().ok().map(|f| f as i64))
            .unwrap_or(default)
    }

    /// Sets `key` to `value`, replacing an existing entry with the same
    /// (case-insensitive) key in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self
            .values
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(entry) => entry.1 = value,
            None => self.values.push((key, value)),
        }
    }

    /// Iterates over the `key=value` pairs in insertion order.
    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    // -- Children ---------------------------------------------------------

    /// Finds a direct child section by (case-insensitive) name.
    pub fn find(&self, name: &str) -> Option<&Section> {
        self.children
            .iter()
            .find(|child| child.name.eq_ignore_ascii_case(name))
    }

    /// Appends a child section and returns a mutable reference to it.
    pub fn add_child(&mut self, child: Section) -> &mut Section {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Returns the child named `name`, creating it when missing.
    pub fn child_mut(&mut self, name: &str) -> &mut Section {
        match self
            .children
            .iter()
            .position(|child| child.name.eq_ignore_ascii_case(name))
        {
            Some(index) => &mut self.children[index],
            None => self.add_child(Section::new(name)),
        }
    }

    /// Iterates over the direct children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = &Section> {
        self.children.iter()
    }

    /// Returns the numeric suffix if this section is named `prefix<n>`,
    /// e.g. `ALLYTEAM3` with prefix `ALLYTEAM` gives `Some(3)`.
    pub fn indexed(&self, prefix: &str) -> Option<u32> {
        let name = self.name.as_str();
        if name.len() <= prefix.len() || !name.is_char_boundary(prefix.len()) {
            return None;
        }
        let (head, tail) = name.split_at(prefix.len());
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        tail.parse().ok()
    }

    /// Returns `true` if the section has neither values nor children.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.children.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Section {
        let mut s = Section::new("PLAYER0");
        s.set("Name", "alice");
        s.set("Team", 3);
        s.set("Handicap", "12.7");
        s
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let s = player();
        assert_eq!(s.get("name"), Some("alice"));
        assert_eq!(s.get("NAME"), Some("alice"));
        assert_eq!(s.get("missing"), None);
    }

    #[test]
    fn test_get_int_parses_and_falls_back() {
        let s = player();
        assert_eq!(s.get_int("team", -1), 3);
        assert_eq!(s.get_int("handicap", 0), 12);
        assert_eq!(s.get_int("name", 9), 9);
        assert_eq!(s.get_int("absent", 4), 4);
    }

    #[test]
    fn test_set_replaces_existing_key_in_place() {
        let mut s = player();
        s.set("TEAM", 5);
        assert_eq!(s.get_int("team", 0), 5);
        assert_eq!(s.values().count(), 3);
        // Original spelling of the key is kept.
        assert_eq!(s.values().nth(1).map(|(k, _)| k), Some("Team"));
    }

    #[test]
    fn test_find_and_child_mut() {
        let mut game = Section::new("GAME");
        game.add_child(player());
        assert!(game.find("player0").is_some());
        assert!(game.find("player1").is_none());

        game.child_mut("MODOPTIONS").set("maxunits", 500);
        game.child_mut("modoptions").set("comm", "fixed");
        assert_eq!(game.children().count(), 2);
        let opts = game.find("MODOPTIONS").unwrap();
        assert_eq!(opts.get("maxunits"), Some("500"));
        assert_eq!(opts.get("comm"), Some("fixed"));
    }

    #[test]
    fn test_indexed_extracts_suffix() {
        assert_eq!(Section::new("ALLYTEAM12").indexed("allyteam"), Some(12));
        assert_eq!(Section::new("TEAM3").indexed("TEAM"), Some(3));
        assert_eq!(Section::new("TEAM").indexed("TEAM"), None);
        assert_eq!(Section::new("TEAMx").indexed("TEAM"), None);
        assert_eq!(Section::new("PLAYER1").indexed("TEAM"), None);
    }
}
