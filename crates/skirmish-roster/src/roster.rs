//! The roster: who is in a battle and what they add up to.
//!
//! Besides the participants themselves the roster caches three derived
//! views, grouped in [`Counts`]:
//!
//! - **Team occupancy** — team index → number of non-spectators on it.
//! - **Ally occupancy** — ally index → number of non-spectators in it.
//! - **[`Aggregates`]** — spectator, ready, synced and ok totals.
//!
//! An occupancy entry exists iff its count is above zero, so "is team 3
//! taken?" is a plain `contains_key`.
//!
//! # Incremental vs. full recount
//!
//! Joins, leaves and single-field edits ([`Roster::modify`]) adjust the
//! cached counts by removing the old contribution and adding the new one.
//! A whole-status replacement ([`Roster::replace_status`]) recounts from
//! scratch. Both paths use the same contribution rule, so after any
//! sequence of operations the cache equals [`Counts::tally`] of the
//! participants.
//!
//! # Contribution rule
//!
//! ```text
//! spectator             → spectators += 1
//! not spectator         → teams[team] += 1, allies[ally] += 1
//! not spectator, human  → ready/synced/ok += 1 when the flag holds
//! ```

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use skirmish_protocol::BattleStatus;

use crate::{Participant, RosterError};

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

/// Spectator and readiness totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Aggregates {
    pub spectators: u32,
    /// Non-spectator humans flagged ready.
    pub ready: u32,
    /// Non-spectator humans in sync.
    pub synced: u32,
    /// Non-spectator humans both ready and in sync.
    pub ok: u32,
}

/// Every value the roster derives from its participants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counts {
    pub teams: BTreeMap<u32, u32>,
    pub allies: BTreeMap<u32, u32>,
    pub aggregates: Aggregates,
}

impl Counts {
    /// Computes the counts of `statuses` from scratch.
    pub fn tally<'a>(statuses: impl IntoIterator<Item = &'a BattleStatus>) -> Self {
        let mut counts = Self::default();
        for status in statuses {
            counts.add(status);
        }
        counts
    }

    fn add(&mut self, status: &BattleStatus) {
        if status.spectator {
            self.aggregates.spectators += 1;
            return;
        }
        *self.teams.entry(status.team).or_insert(0) += 1;
        *self.allies.entry(status.ally).or_insert(0) += 1;
        if status.is_bot() {
            return;
        }
        let sync = status.sync.is_synced();
        self.aggregates.ready += u32::from(status.ready);
        self.aggregates.synced += u32::from(sync);
        self.aggregates.ok += u32::from(status.ready && sync);
    }

    fn remove(&mut self, status: &BattleStatus) {
        if status.spectator {
            self.aggregates.spectators = self.aggregates.spectators.saturating_sub(1);
            return;
        }
        leave(&mut self.teams, status.team);
        leave(&mut self.allies, status.ally);
        if status.is_bot() {
            return;
        }
        let sync = status.sync.is_synced();
        let agg = &mut self.aggregates;
        agg.ready = agg.ready.saturating_sub(u32::from(status.ready));
        agg.synced = agg.synced.saturating_sub(u32::from(sync));
        agg.ok = agg.ok.saturating_sub(u32::from(status.ready && sync));
    }
}

/// Decrements an occupancy entry, dropping it when it reaches zero.
fn leave(map: &mut BTreeMap<u32, u32>, key: u32) {
    if let Entry::Occupied(mut entry) = map.entry(key) {
        *entry.get_mut() -= 1;
        if *entry.get() == 0 {
            entry.remove();
        }
    }
}

/// What [`Roster::replace_status`] changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub previous: BattleStatus,
    pub spectators_changed: bool,
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// The participants of one battle, in join order.
#[derive(Debug, Default)]
pub struct Roster {
    participants: Vec<Participant>,
    counts: Counts,
    /// Nick → when the player most recently became "not ok".
    ready_timers: HashMap<String, DateTime<Utc>>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Membership -------------------------------------------------------

    /// Adds a participant and accounts for its status.
    ///
    /// # Errors
    /// [`RosterError::AlreadyPresent`] if the nickname is taken.
    pub fn insert(&mut self, participant: Participant) -> Result<&Participant, RosterError> {
        if self.position(&participant.nick).is_some() {
            return Err(RosterError::AlreadyPresent(participant.nick));
        }
        self.counts.add(&participant.status);
        if is_waiting(&participant.status) {
            self.ready_timers
                .insert(participant.nick.clone(), Utc::now());
        }
        tracing::debug!(
            nick = %participant.nick,
            team = participant.status.team,
            ally = participant.status.ally,
            spectator = participant.status.spectator,
            "participant added to roster"
        );
        self.participants.push(participant);
        let last = self.participants.len() - 1;
        Ok(&self.participants[last])
    }

    /// Removes a participant and withdraws its contribution.
    ///
    /// # Errors
    /// [`RosterError::NotFound`] if no participant has this nickname.
    pub fn remove(&mut self, nick: &str) -> Result<Participant, RosterError> {
        let index = self
            .position(nick)
            .ok_or_else(|| RosterError::NotFound(nick.to_string()))?;
        let participant = self.participants.remove(index);
        self.counts.remove(&participant.status);
        self.ready_timers.remove(nick);
        Ok(participant)
    }

    /// Removes every AI participant and returns them.
    ///
    /// Bots are collected first and removed afterwards, so the roster is
    /// never mutated while it is being walked.
    pub fn clear_bots(&mut self) -> Vec<Participant> {
        let bots: Vec<String> = self
            .participants
            .iter()
            .filter(|p| p.is_bot())
            .map(|p| p.nick.clone())
            .collect();
        bots.iter().filter_map(|nick| self.remove(nick).ok()).collect()
    }

    /// Drops every participant and resets all counts.
    pub fn clear(&mut self) {
        self.participants.clear();
        self.counts = Counts::default();
        self.ready_timers.clear();
    }

    // -- Status changes ---------------------------------------------------

    /// Replaces a participant's whole status and recounts from scratch.
    ///
    /// # Errors
    /// [`RosterError::NotFound`] if no participant has this nickname.
    pub fn replace_status(
        &mut self,
        nick: &str,
        status: BattleStatus,
    ) -> Result<StatusChange, RosterError> {
        let index = self
            .position(nick)
            .ok_or_else(|| RosterError::NotFound(nick.to_string()))?;
        let previous = std::mem::replace(&mut self.participants[index].status, status);

        let old_spectators = self.counts.aggregates.spectators;
        self.recount();
        self.touch_timer(index);

        Ok(StatusChange {
            previous,
            spectators_changed: old_spectators != self.counts.aggregates.spectators,
        })
    }

    /// Edits a participant's status in place, adjusting counts
    /// incrementally.
    ///
    /// # Errors
    /// [`RosterError::NotFound`] if no participant has this nickname.
    pub fn modify(
        &mut self,
        nick: &str,
        edit: impl FnOnce(&mut BattleStatus),
    ) -> Result<&Participant, RosterError> {
        let index = self
            .position(nick)
            .ok_or_else(|| RosterError::NotFound(nick.to_string()))?;
        self.counts.remove(&self.participants[index].status);
        edit(&mut self.participants[index].status);
        self.counts.add(&self.participants[index].status);
        self.touch_timer(index);
        Ok(&self.participants[index])
    }

    /// Rebuilds the cached counts from the participants.
    pub fn recount(&mut self) {
        self.counts = Counts::tally(self.participants.iter().map(|p| &p.status));
    }

    fn touch_timer(&mut self, index: usize) {
        let participant = &self.participants[index];
        if participant.is_bot() {
            return;
        }
        if is_waiting(&participant.status) {
            self.ready_timers
                .entry(participant.nick.clone())
                .or_insert_with(Utc::now);
        } else {
            self.ready_timers.remove(&participant.nick);
        }
    }

    // -- Queries ----------------------------------------------------------

    pub fn get(&self, nick: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.nick == nick)
    }

    pub fn contains(&self, nick: &str) -> bool {
        self.position(nick).is_some()
    }

    fn position(&self, nick: &str) -> Option<usize> {
        self.participants.iter().position(|p| p.nick == nick)
    }

    /// Iterates over participants in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn counts(&self) -> &Counts {
        &self.counts
    }

    pub fn aggregates(&self) -> Aggregates {
        self.counts.aggregates
    }

    /// Team index → number of non-spectators on that team.
    pub fn teams(&self) -> &BTreeMap<u32, u32> {
        &self.counts.teams
    }

    /// Ally index → number of non-spectators in that alliance.
    pub fn allies(&self) -> &BTreeMap<u32, u32> {
        &self.counts.allies
    }

    pub fn num_bots(&self) -> usize {
        self.participants.iter().filter(|p| p.is_bot()).count()
    }

    /// Number of participants that are not AIs.
    pub fn num_players(&self) -> usize {
        self.len() - self.num_bots()
    }

    /// Non-AI participants minus spectators.
    pub fn num_active_players(&self) -> usize {
        self.num_players()
            .saturating_sub(self.counts.aggregates.spectators as usize)
    }

    /// When `nick` most recently became "not ok", if they still are.
    pub fn ready_since(&self, nick: &str) -> Option<DateTime<Utc>> {
        self.ready_timers.get(nick).copied()
    }

    /// `true` if every non-spectator human other than `except` is ready and
    /// in sync.
    pub fn everyone_ready(&self, except: Option<&str>) -> bool {
        self.participants
            .iter()
            .filter(|p| !p.is_bot() && !p.status.spectator)
            .filter(|p| Some(p.nick.as_str()) != except)
            .all(|p| p.status.is_ok())
    }
}

/// A human who should be getting ready: on a team but not ready and synced.
fn is_waiting(status: &BattleStatus) -> bool {
    !status.is_bot() && !status.spectator && !status.is_ok()
}
