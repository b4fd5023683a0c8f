//! Extraction of the embedded game script from replay and savegame files.
//!
//! Replays use a versioned little-endian container:
//!
//! ```text
//! offset  size  field
//!     16     4  container version
//!     20     4  header size (= offset of the script text)
//!     56     8  wall-clock start time, seconds since the epoch
//! 64|304     4  script length
//! 72|312     4  game duration in seconds
//! ```
//!
//! Versions 5 and later insert 240 bytes before the length and duration
//! fields. Savegames carry the script as a NUL-terminated run at the start of
//! the file.
//!
//! Every field is read independently: an offset past the end of the buffer
//! yields an empty or zero result for that field only.

use chrono::{DateTime, Utc};

/// Offset of the 32-bit container version.
pub const VERSION_OFFSET: usize = 16;
/// Offset of the 32-bit header size, which is where the script starts.
pub const HEADER_SIZE_OFFSET: usize = 20;
/// Offset of the 64-bit start timestamp.
pub const START_TIME_OFFSET: usize = 56;

const SCRIPT_SIZE_BASE: usize = 64;
const GAME_TIME_BASE: usize = 72;

/// Extra bytes newer containers insert before the length/duration fields.
pub const VERSION_5_SHIFT: usize = 240;

// ---------------------------------------------------------------------------
// Little-endian field readers
// ---------------------------------------------------------------------------

fn read_i32(data: &[u8], offset: usize) -> Option<i32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(i32::from_le_bytes(bytes.try_into().ok()?))
}

fn read_i64(data: &[u8], offset: usize) -> Option<i64> {
    let bytes = data.get(offset..offset.checked_add(8)?)?;
    Some(i64::from_le_bytes(bytes.try_into().ok()?))
}

fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_string()
}

// ---------------------------------------------------------------------------
// Replays
// ---------------------------------------------------------------------------

/// Returns the container version, or 0 when the file is too short.
pub fn replay_version(data: &[u8]) -> i32 {
    read_i32(data, VERSION_OFFSET).unwrap_or(0)
}

/// Returns the number of bytes containers of `version` insert before the
/// script length and duration fields.
pub fn header_shift(version: i32) -> usize {
    if version < 5 { 0 } else { VERSION_5_SHIFT }
}

/// Offset of the script length field for `version`.
pub fn script_size_offset(version: i32) -> usize {
    SCRIPT_SIZE_BASE + header_shift(version)
}

/// Offset of the game duration field for `version`.
pub fn game_time_offset(version: i32) -> usize {
    GAME_TIME_BASE + header_shift(version)
}

/// Extracts the game script embedded in a replay.
///
/// The declared length is clamped to `[0, data.len()]`. Returns an empty
/// string if any field lies outside the buffer or the buffer holds fewer
/// script bytes than declared.
pub fn script_from_replay(data: &[u8], version: i32) -> String {
    let Some(header_size) = read_i32(data, HEADER_SIZE_OFFSET) else {
        return String::new();
    };
    let Some(declared) = read_i32(data, script_size_offset(version)) else {
        return String::new();
    };

    let size = declared.clamp(0, i32::MAX) as usize;
    let size = size.min(data.len());
    let Ok(start) = usize::try_from(header_size) else {
        return String::new();
    };

    match start
        .checked_add(size)
        .and_then(|end| data.get(start..end))
    {
        Some(bytes) => decode_text(bytes),
        None => {
            tracing::debug!(start, size, len = data.len(), "replay script truncated");
            String::new()
        }
    }
}

/// Metadata read from a replay header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoHeader {
    pub version: i32,
    /// Game duration in seconds, 0 when unavailable.
    pub game_time_secs: u32,
    /// Wall-clock start, `None` when unavailable or out of range.
    pub start_time: Option<DateTime<Utc>>,
    /// Total size of the file in bytes.
    pub size: u64,
}

/// Reads the duration and start time fields of a replay header.
pub fn header_info(data: &[u8], version: i32) -> DemoHeader {
    let game_time_secs = read_i32(data, game_time_offset(version))
        .map(|secs| secs.max(0) as u32)
        .unwrap_or(0);
    let start_time = read_i64(data, START_TIME_OFFSET)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
    DemoHeader {
        version,
        game_time_secs,
        start_time,
        size: data.len() as u64,
    }
}

// ---------------------------------------------------------------------------
// Savegames
// ---------------------------------------------------------------------------

/// Extracts the NUL-terminated game script at the start of a savegame.
///
/// A file without a terminator yields everything it contains.
pub fn script_from_savegame(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    decode_text(&data[..end])
}
