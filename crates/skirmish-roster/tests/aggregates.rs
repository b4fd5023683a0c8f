//! Property tests: cached roster counts never drift from a full recount.

use proptest::prelude::*;
use skirmish_protocol::{BattleStatus, BotInfo, SyncState};
use skirmish_roster::{Counts, Participant, Roster};

#[derive(Debug, Clone)]
enum Op {
    Join { slot: u8, bot: bool, status: BattleStatus },
    Leave { slot: u8 },
    Replace { slot: u8, status: BattleStatus },
    Spectate { slot: u8, spectator: bool },
    Ready { slot: u8, ready: bool },
}

fn arb_sync() -> impl Strategy<Value = SyncState> {
    prop_oneof![
        Just(SyncState::Unknown),
        Just(SyncState::Unsynced),
        Just(SyncState::Synced),
    ]
}

fn arb_status() -> impl Strategy<Value = BattleStatus> {
    (0u32..4, 0u32..3, any::<bool>(), any::<bool>(), arb_sync()).prop_map(
        |(team, ally, spectator, ready, sync)| BattleStatus {
            team,
            ally,
            spectator,
            ready,
            sync,
            ..BattleStatus::default()
        },
    )
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..6, any::<bool>(), arb_status())
            .prop_map(|(slot, bot, status)| Op::Join { slot, bot, status }),
        (0u8..6).prop_map(|slot| Op::Leave { slot }),
        (0u8..6, arb_status()).prop_map(|(slot, status)| Op::Replace { slot, status }),
        (0u8..6, any::<bool>()).prop_map(|(slot, spectator)| Op::Spectate { slot, spectator }),
        (0u8..6, any::<bool>()).prop_map(|(slot, ready)| Op::Ready { slot, ready }),
    ]
}

fn nick(slot: u8) -> String {
    format!("player{slot}")
}

fn apply(roster: &mut Roster, op: Op) {
    // Errors (duplicate joins, unknown nicks) are expected and leave the
    // roster unchanged.
    match op {
        Op::Join { slot, bot, status } => {
            let participant = if bot {
                let info = BotInfo {
                    owner: "host".into(),
                    short_name: "E323AI".into(),
                    version: "3.25".into(),
                };
                Participant::bot(nick(slot), info, status)
            } else {
                Participant::recorded(nick(slot), status)
            };
            let _ = roster.insert(participant);
        }
        Op::Leave { slot } => {
            let _ = roster.remove(&nick(slot));
        }
        Op::Replace { slot, status } => {
            let bot = roster.get(&nick(slot)).and_then(|p| p.status.bot.clone());
            let _ = roster.replace_status(&nick(slot), BattleStatus { bot, ..status });
        }
        Op::Spectate { slot, spectator } => {
            let _ = roster.modify(&nick(slot), |s| s.spectator = spectator);
        }
        Op::Ready { slot, ready } => {
            let _ = roster.modify(&nick(slot), |s| s.ready = ready);
        }
    }
}

proptest! {
    #[test]
    fn cached_counts_match_full_recount(ops in proptest::collection::vec(arb_op(), 0..60)) {
        let mut roster = Roster::new();
        for op in ops {
            apply(&mut roster, op);
            let fresh = Counts::tally(roster.iter().map(|p| &p.status));
            prop_assert_eq!(roster.counts(), &fresh);
        }
    }

    #[test]
    fn occupancy_never_holds_zero_entries(ops in proptest::collection::vec(arb_op(), 0..60)) {
        let mut roster = Roster::new();
        for op in ops {
            apply(&mut roster, op);
        }
        prop_assert!(roster.teams().values().all(|&n| n > 0));
        prop_assert!(roster.allies().values().all(|&n| n > 0));
    }

    #[test]
    fn waiting_humans_have_timers(ops in proptest::collection::vec(arb_op(), 0..60)) {
        let mut roster = Roster::new();
        for op in ops {
            apply(&mut roster, op);
        }
        for p in roster.iter().filter(|p| !p.is_bot()) {
            let waiting = !p.status.spectator && !p.status.is_ok();
            prop_assert_eq!(roster.ready_since(&p.nick).is_some(), waiting);
        }
    }
}
