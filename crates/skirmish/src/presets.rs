//! Presets persisted as a JSON document.
//!
//! ```json
//! {
//!   "duel": {
//!     "engine": { "startpostype": "2" },
//!     "private": { "mapname": "Tabula", "restrictions": "" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use skirmish_battle::{OptionMap, PresetStore};
use skirmish_protocol::OptionCategory;

use crate::SkirmishError;

type Document = BTreeMap<String, BTreeMap<String, OptionMap>>;

/// A [`PresetStore`] backed by one JSON file.
///
/// Changes stay in memory until [`flush`](PresetStore::flush), which the
/// battle calls after every save and delete.
#[derive(Debug)]
pub struct JsonPresetStore {
    path: PathBuf,
    presets: Document,
    dirty: bool,
}

impl JsonPresetStore {
    /// Opens the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    /// [`SkirmishError::Io`] if the file exists but cannot be read, and
    /// [`SkirmishError::Json`] if it is not a preset document.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SkirmishError> {
        let path = path.into();
        let presets = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Document::new(),
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(path = %path.display(), "preset store opened");
        Ok(Self {
            path,
            presets,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if there are changes not yet written.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl PresetStore for JsonPresetStore {
    fn preset(&self, name: &str, category: OptionCategory) -> OptionMap {
        self.presets
            .get(name)
            .and_then(|preset| preset.get(category.as_str()))
            .cloned()
            .unwrap_or_default()
    }

    fn set_preset(&mut self, name: &str, category: OptionCategory, options: OptionMap) {
        self.presets
            .entry(name.to_string())
            .or_default()
            .insert(category.as_str().to_string(), options);
        self.dirty = true;
    }

    fn preset_names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    fn delete_preset(&mut self, name: &str) {
        if self.presets.remove(name).is_some() {
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let text = serde_json::to_string_pretty(&self.presets)?;
        fs::write(&self.path, text)?;
        self.dirty = false;
        tracing::debug!(path = %self.path.display(), presets = self.presets.len(), "presets written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonPresetStore::open(dir.path().join("presets.json")).unwrap();
        assert!(store.preset_names().is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_flush_then_reopen_keeps_presets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");

        let mut store = JsonPresetStore::open(&path).unwrap();
        let mut engine = OptionMap::new();
        engine.insert("startpostype".into(), "2".into());
        store.set_preset("Duel", OptionCategory::Engine, engine.clone());
        assert!(store.is_dirty());
        store.flush().unwrap();
        assert!(!store.is_dirty());

        let reopened = JsonPresetStore::open(&path).unwrap();
        assert_eq!(reopened.preset("Duel", OptionCategory::Engine), engine);
        assert_eq!(reopened.preset_names(), vec!["Duel".to_string()]);
    }

    #[test]
    fn test_open_invalid_json_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonPresetStore::open(&path),
            Err(SkirmishError::Json(_))
        ));
    }
}
