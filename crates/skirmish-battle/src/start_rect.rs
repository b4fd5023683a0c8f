//! Per-alliance start zones with pending-change flags.
//!
//! Zone edits are optimistic: the local side records what it wants and
//! flags the zone, and the flag is cleared once the server acknowledges
//! the change.
//!
//! ```text
//! absent ──add──→ pending_add ──confirm_added──→ confirmed
//! confirmed ──remove──→ pending_delete ──confirm_removed──→ absent
//! confirmed ──resize──→ pending_resize ──confirm_resized──→ confirmed
//! ```
//!
//! A zone marked for deletion stays in the map (and is still returned by
//! [`StartRects::get`]) until `confirm_removed` erases it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A rectangular start zone for one alliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StartRect {
    pub ally: u32,
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub pending_add: bool,
    pub pending_delete: bool,
    pub pending_resize: bool,
    pub exists: bool,
}

impl StartRect {
    /// Returns `true` if the zone exists and is not on its way out.
    pub fn is_ok(&self) -> bool {
        self.exists && !self.pending_delete
    }
}

/// Start zones keyed by ally index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartRects {
    rects: BTreeMap<u32, StartRect>,
}

impl StartRects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the zone of `ally`, replacing any existing one, and marks it
    /// pending addition.
    pub fn add(&mut self, ally: u32, left: i32, top: i32, right: i32, bottom: i32) {
        tracing::debug!(ally, left, top, right, bottom, "start zone added");
        self.rects.insert(
            ally,
            StartRect {
                ally,
                left,
                top,
                right,
                bottom,
                pending_add: true,
                pending_delete: false,
                pending_resize: false,
                exists: true,
            },
        );
    }

    /// Marks the zone of `ally` for deletion. No-op if there is none.
    pub fn remove(&mut self, ally: u32) {
        if let Some(rect) = self.rects.get_mut(&ally) {
            rect.pending_delete = true;
        }
    }

    /// Marks the zone of `ally` as resized. No-op if there is none.
    pub fn resize(&mut self, ally: u32) {
        if let Some(rect) = self.rects.get_mut(&ally) {
            rect.pending_resize = true;
        }
    }

    pub fn confirm_added(&mut self, ally: u32) {
        if let Some(rect) = self.rects.get_mut(&ally) {
            rect.pending_add = false;
        }
    }

    /// Erases the zone of `ally` if it was marked for deletion.
    pub fn confirm_removed(&mut self, ally: u32) {
        if self.rects.get(&ally).is_some_and(|r| r.pending_delete) {
            self.rects.remove(&ally);
            tracing::debug!(ally, "start zone removed");
        }
    }

    pub fn confirm_resized(&mut self, ally: u32) {
        if let Some(rect) = self.rects.get_mut(&ally) {
            rect.pending_resize = false;
        }
    }

    /// The zone of `ally`, including zones pending deletion.
    pub fn get(&self, ally: u32) -> Option<&StartRect> {
        self.rects.get(&ally)
    }

    /// Returns `true` if `ally` has a zone that is not pending deletion.
    pub fn is_ok(&self, ally: u32) -> bool {
        self.get(ally).is_some_and(StartRect::is_ok)
    }

    pub fn iter(&self) -> impl Iterator<Item = &StartRect> {
        self.rects.values()
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Highest ally index with a zone, 0 when there are none.
    pub fn last_index(&self) -> u32 {
        self.rects.keys().next_back().copied().unwrap_or(0)
    }

    /// The smallest ally index in `0..=last_index()` without a usable
    /// zone, or `len()` when every one of them has one.
    pub fn next_free_index(&self) -> u32 {
        (0..=self.last_index())
            .find(|&ally| !self.is_ok(ally))
            .unwrap_or(self.rects.len() as u32)
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }
}
