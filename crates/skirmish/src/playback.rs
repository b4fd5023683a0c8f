//! Replays and savegames on disk.
//!
//! Each file becomes a [`StoredGame`]: the header metadata plus a
//! [`Battle`] rebuilt from the embedded game script. Replay file names
//! carry the recording date, the map and the engine version:
//!
//! ```text
//! 20240312_194501_Comet Catcher Redux_105.1.1.sdf
//! └── date ─────┘ └── map ──────────┘ └ engine┘
//! ```
//!
//! The date in the file name wins over the header timestamp, which older
//! engines leave at zero.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use skirmish_battle::{Battle, BattleType};
use skirmish_protocol::demo;

use crate::SkirmishError;

/// File extension of recorded replays.
pub const REPLAY_EXTENSION: &str = "sdf";
/// File extension of savegames.
pub const SAVEGAME_EXTENSION: &str = "ssf";

const FILE_DATE_FORMAT: &str = "%Y%m%d_%H%M%S";
const FILE_DATE_LEN: usize = 15;

// ---------------------------------------------------------------------------
// File names
// ---------------------------------------------------------------------------

/// What a replay's file name says about it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayName {
    pub date: Option<DateTime<Utc>>,
    pub map: String,
    pub engine_version: String,
}

/// Splits a replay file name into date, map and engine version.
///
/// Parts that are not there come back empty.
pub fn parse_replay_name(file_name: &str) -> ReplayName {
    let date = file_name
        .get(..FILE_DATE_LEN)
        .and_then(|prefix| NaiveDateTime::parse_from_str(prefix, FILE_DATE_FORMAT).ok())
        .map(|naive| naive.and_utc());

    let (head, tail) = file_name.rsplit_once('_').unwrap_or(("", file_name));
    let engine_version = tail.rsplit_once('.').map_or(tail, |(version, _)| version);

    let map = match date {
        Some(_) => head.get(FILE_DATE_LEN + 1..).unwrap_or_default(),
        None => head,
    };

    ReplayName {
        date,
        map: map.to_string(),
        engine_version: engine_version.to_string(),
    }
}

// ---------------------------------------------------------------------------
// StoredGame
// ---------------------------------------------------------------------------

/// A replay or savegame with its reconstructed battle.
#[derive(Debug)]
pub struct StoredGame {
    pub kind: BattleType,
    pub path: PathBuf,
    pub engine_version: String,
    pub date: Option<DateTime<Utc>>,
    /// Game duration in seconds; 0 for savegames.
    pub duration_secs: u32,
    /// File size in bytes.
    pub size: u64,
    pub battle: Battle,
}

impl StoredGame {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

fn script_or_err(script: String, path: &Path) -> Result<String, SkirmishError> {
    if script.trim().is_empty() {
        return Err(SkirmishError::EmptyScript(path.to_path_buf()));
    }
    Ok(script)
}

/// Loads a replay and rebuilds its battle.
///
/// # Errors
/// [`SkirmishError::Io`] if the file cannot be read and
/// [`SkirmishError::EmptyScript`] if it holds no game script.
pub fn load_replay(path: &Path) -> Result<StoredGame, SkirmishError> {
    let data = fs::read(path)?;
    let version = demo::replay_version(&data);
    let script = script_or_err(demo::script_from_replay(&data, version), path)?;
    let header = demo::header_info(&data, version);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = parse_replay_name(&file_name);

    let mut battle = Battle::builder("").battle_type(BattleType::Replay).build();
    battle.load_script(&script, false);
    battle.set_engine_version(name.engine_version.clone());
    if battle.host_map().name.is_empty() && !name.map.is_empty() {
        battle.set_host_map(&name.map, "")?;
    }

    tracing::debug!(path = %path.display(), version, "replay loaded");
    Ok(StoredGame {
        kind: BattleType::Replay,
        path: path.to_path_buf(),
        engine_version: name.engine_version,
        date: name.date.or(header.start_time),
        duration_secs: header.game_time_secs,
        size: header.size,
        battle,
    })
}

/// Loads a savegame and rebuilds its battle. The date is the file's
/// modification time.
pub fn load_savegame(path: &Path) -> Result<StoredGame, SkirmishError> {
    let data = fs::read(path)?;
    let script = script_or_err(demo::script_from_savegame(&data), path)?;
    let date = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .map(DateTime::<Utc>::from);

    let mut battle = Battle::builder("").battle_type(BattleType::Savegame).build();
    battle.load_script(&script, false);

    tracing::debug!(path = %path.display(), "savegame loaded");
    Ok(StoredGame {
        kind: BattleType::Savegame,
        path: path.to_path_buf(),
        engine_version: String::new(),
        date,
        duration_secs: 0,
        size: data.len() as u64,
        battle,
    })
}

/// Loads `path` as whichever kind its extension says.
pub fn load_stored_game(path: &Path) -> Result<StoredGame, SkirmishError> {
    let is_savegame = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SAVEGAME_EXTENSION));
    if is_savegame {
        load_savegame(path)
    } else {
        load_replay(path)
    }
}

// ---------------------------------------------------------------------------
// PlaybackList
// ---------------------------------------------------------------------------

/// A catalogue of stored games keyed by a numeric id.
///
/// Batch loading is best effort: files that fail are logged, counted in
/// [`failed`](Self::failed) and skipped.
#[derive(Debug, Default)]
pub struct PlaybackList {
    games: BTreeMap<u32, StoredGame>,
    next_id: u32,
    failed: usize,
}

impl PlaybackList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every path and returns how many were added.
    pub fn load_files<P: AsRef<Path>>(&mut self, paths: impl IntoIterator<Item = P>) -> usize {
        let mut added = 0;
        for path in paths {
            let path = path.as_ref();
            match load_stored_game(path) {
                Ok(game) => {
                    self.insert(game);
                    added += 1;
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping stored game");
                    self.failed += 1;
                }
            }
        }
        tracing::info!(added, failed = self.failed, "playback files loaded");
        added
    }

    /// Loads every replay and savegame directly inside `dir`.
    ///
    /// # Errors
    /// [`SkirmishError::Io`] if the directory cannot be listed.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, SkirmishError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| {
                    ext.eq_ignore_ascii_case(REPLAY_EXTENSION)
                        || ext.eq_ignore_ascii_case(SAVEGAME_EXTENSION)
                })
            })
            .collect();
        paths.sort();
        Ok(self.load_files(paths))
    }

    /// Adds a loaded game and returns its id.
    pub fn insert(&mut self, game: StoredGame) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.games.insert(id, game);
        id
    }

    pub fn get(&self, id: u32) -> Option<&StoredGame> {
        self.games.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut StoredGame> {
        self.games.get_mut(&id)
    }

    pub fn remove(&mut self, id: u32) -> Option<StoredGame> {
        self.games.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &StoredGame)> {
        self.games.iter().map(|(id, game)| (*id, game))
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Files that could not be loaded since the list was created.
    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn clear(&mut self) {
        self.games.clear();
        self.failed = 0;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_parse_replay_name_full() {
        let name = parse_replay_name("20240312_194501_Comet Catcher Redux_105.1.1.sdf");
        let date = name.date.unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 3, 12));
        assert_eq!((date.hour(), date.minute(), date.second()), (19, 45, 1));
        assert_eq!(name.map, "Comet Catcher Redux");
        assert_eq!(name.engine_version, "105.1.1");
    }

    #[test]
    fn test_parse_replay_name_map_with_underscores() {
        let name = parse_replay_name("20100101_000000_Small_Divide_0.82.5.sdf");
        assert_eq!(name.map, "Small_Divide");
        assert_eq!(name.engine_version, "0.82.5");
    }

    #[test]
    fn test_parse_replay_name_without_date() {
        let name = parse_replay_name("mygame.sdf");
        assert!(name.date.is_none());
        assert_eq!(name.map, "");
        assert_eq!(name.engine_version, "mygame");
    }

    #[test]
    fn test_load_files_missing_path_counts_failure() {
        let mut list = PlaybackList::new();
        assert_eq!(list.load_files(["/nonexistent/a.sdf"]), 0);
        assert_eq!(list.failed(), 1);
        assert!(list.is_empty());
    }
}
