//! Battle participants.

use skirmish_protocol::{BattleStatus, BotInfo};

use crate::{User, UserHandle};

/// Where a participant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantKind {
    /// A connected lobby user, referenced through the global directory.
    Human(UserHandle),
    /// An AI run by one of the humans. Lives only inside the battle.
    Bot,
    /// A player rebuilt from a game script (replay or savegame). There is no
    /// live user behind it.
    Recorded,
}

/// Someone taking part in a battle, with their current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub nick: String,
    pub kind: ParticipantKind,
    pub status: BattleStatus,
    pub country: String,
    pub rank: u32,
}

impl Participant {
    /// A connected user joining with `status`.
    pub fn human(handle: UserHandle, user: &User, status: BattleStatus) -> Self {
        Self {
            nick: user.nick.clone(),
            kind: ParticipantKind::Human(handle),
            status,
            country: user.country.clone(),
            rank: user.rank,
        }
    }

    /// An AI hosted by `bot.owner`. The bot fields of `status` are replaced
    /// by `bot`.
    pub fn bot(nick: impl Into<String>, bot: BotInfo, mut status: BattleStatus) -> Self {
        status.bot = Some(bot);
        Self {
            nick: nick.into(),
            kind: ParticipantKind::Bot,
            status,
            country: String::new(),
            rank: 0,
        }
    }

    /// A player reconstructed from a script.
    pub fn recorded(nick: impl Into<String>, status: BattleStatus) -> Self {
        Self {
            nick: nick.into(),
            kind: ParticipantKind::Recorded,
            status,
            country: String::new(),
            rank: 0,
        }
    }

    pub fn is_bot(&self) -> bool {
        self.status.is_bot()
    }

    /// The directory handle of a live human participant.
    pub fn handle(&self) -> Option<UserHandle> {
        match self.kind {
            ParticipantKind::Human(handle) => Some(handle),
            ParticipantKind::Bot | ParticipantKind::Recorded => None,
        }
    }

    /// Nickname of the human hosting this AI, if it is one.
    pub fn owner(&self) -> Option<&str> {
        self.status.bot.as_ref().map(|bot| bot.owner.as_str())
    }
}
