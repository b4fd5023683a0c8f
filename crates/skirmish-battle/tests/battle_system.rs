//! Integration tests for battle sessions: hosting scenarios, presets and
//! allocator properties.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use skirmish_battle::{
    Battle, BattleType, Frontend, HostInfoLog, MapInfo, MemoryAssets, ModInfo, alloc,
};
use skirmish_protocol::{BattleStatus, BotInfo, Colour, HostInfo, OptionCategory, StartPosition};
use skirmish_roster::{Participant, User, UserDirectory};

// =========================================================================
// Helpers
// =========================================================================

/// Records AI removals so self-leave cleanup can be observed.
#[derive(Clone, Default)]
struct RemovedBots(Rc<RefCell<Vec<String>>>);

impl Frontend for RemovedBots {
    fn bot_removed(&mut self, nick: &str) {
        self.0.borrow_mut().push(nick.to_string());
    }
}

fn assets() -> MemoryAssets {
    MemoryAssets::new()
        .with_map(MapInfo {
            name: "Comet Catcher Redux".into(),
            hash: "3358".into(),
            width: 8192,
            height: 8192,
            positions: vec![
                StartPosition::new(800, 800),
                StartPosition::new(7400, 7400),
            ],
            ..MapInfo::default()
        })
        .with_mod(
            ModInfo {
                name: "Balanced Annihilation".into(),
                hash: "77".into(),
                ..ModInfo::default()
            },
            vec!["ARM".into(), "CORE".into()],
        )
}

fn join_user(battle: &mut Battle, users: &mut UserDirectory, nick: &str) {
    let mut user = User::new(nick);
    user.country = "SE".into();
    let handle = users.insert(user.clone());
    battle
        .join(Participant::human(handle, &user, BattleStatus::default()))
        .unwrap();
}

// =========================================================================
// Hosting scenarios
// =========================================================================

#[test]
fn test_hosting_two_players_then_spectate() {
    let log = HostInfoLog::new();
    let mut users = UserDirectory::new();
    let mut battle = Battle::builder("alice")
        .founder("alice")
        .host_info(log.clone())
        .build();

    join_user(&mut battle, &mut users, "alice");
    join_user(&mut battle, &mut users, "bob");

    let alice = battle.participant("alice").unwrap();
    let bob = battle.participant("bob").unwrap();
    assert_eq!((alice.status.team, alice.status.ally), (0, 0));
    assert_eq!((bob.status.team, bob.status.ally), (1, 1));
    assert!(alice.handle().is_some());
    assert_eq!(alice.country, "SE");

    battle.force_spectator("alice", true).unwrap();

    assert!(!battle.roster().allies().contains_key(&0));
    assert_eq!(battle.roster().allies().get(&1), Some(&1));
    assert_eq!(battle.spectators(), 1);
    assert_eq!(log.take(), vec![HostInfo::Spectators]);

    // The freed slot is handed to the next joiner.
    join_user(&mut battle, &mut users, "carol");
    let carol = battle.participant("carol").unwrap();
    assert_eq!((carol.status.team, carol.status.ally), (0, 0));
}

#[test]
fn test_hosting_assigns_distinct_colours() {
    let mut users = UserDirectory::new();
    let mut battle = Battle::builder("host").founder("host").build();
    for nick in ["host", "a", "b", "c", "d", "e"] {
        join_user(&mut battle, &mut users, nick);
    }
    let colours: Vec<Colour> = battle.roster().iter().map(|p| p.status.colour).collect();
    for (i, a) in colours.iter().enumerate() {
        for b in &colours[i + 1..] {
            assert!(!a.is_similar(b, battle.config().colour_threshold));
        }
    }
}

#[test]
fn test_leaving_own_battle_removes_bots_through_frontend() {
    let removed = RemovedBots::default();
    let mut users = UserDirectory::new();
    let mut battle = Battle::builder("alice")
        .founder("alice")
        .frontend(removed.clone())
        .build();
    join_user(&mut battle, &mut users, "alice");
    let owner = BotInfo {
        owner: "alice".into(),
        short_name: "RAI".into(),
        version: "0.601".into(),
    };
    battle
        .add_bot("rai1", owner.clone(), BattleStatus::default())
        .unwrap();
    battle.add_bot("rai2", owner, BattleStatus::default()).unwrap();

    battle.leave("alice").unwrap();

    assert_eq!(*removed.0.borrow(), vec!["rai1".to_string(), "rai2".to_string()]);
    assert!(battle.roster().is_empty());
}

#[test]
fn test_client_battle_syncs_after_host_content_resolves() {
    let mut battle = Battle::builder("bob")
        .founder("alice")
        .assets(assets())
        .build();
    battle.set_host_map("Comet Catcher Redux", "3358").unwrap();
    battle.set_host_mod("Balanced Annihilation", "77");

    assert!(battle.is_synced());
    assert_eq!(battle.local_map().map(|m| m.width), Some(8192));

    battle.set_host_map("Comet Catcher Redux", "9999").unwrap();
    assert!(!battle.is_synced());
}

// =========================================================================
// Presets
// =========================================================================

#[test]
fn test_preset_saved_lowercase_loads_by_any_case() {
    let log = HostInfoLog::new();
    let mut battle = Battle::builder("alice")
        .founder("alice")
        .assets(assets())
        .host_info(log.clone())
        .build();
    battle.set_host_map("Comet Catcher Redux", "3358").unwrap();
    let engine = battle.custom_options_mut();
    engine.set(OptionCategory::Engine, "startpostype", "2");
    engine.set(OptionCategory::Engine, "maxunits", "1500");
    engine.set(OptionCategory::Mod, "deathmode", "com");
    battle.start_rects_mut().add(0, 0, 0, 40, 200);
    battle.start_rects_mut().add(1, 160, 0, 200, 200);
    battle.save_preset("duel").unwrap();

    let options = battle.custom_options_mut();
    options.set(OptionCategory::Engine, "maxunits", "500");
    options.remove(OptionCategory::Mod, "deathmode");
    battle.start_rects_mut().clear();
    log.take();

    battle.load_preset("Duel").unwrap();

    let options = battle.custom_options();
    assert_eq!(options.get(OptionCategory::Engine, "startpostype"), Some("2"));
    assert_eq!(options.get(OptionCategory::Engine, "maxunits"), Some("1500"));
    assert_eq!(options.get(OptionCategory::Mod, "deathmode"), Some("com"));
    assert_eq!(battle.host_map().name, "Comet Catcher Redux");
    assert_eq!(battle.start_rects().len(), 2);
    assert_eq!(battle.start_rects().get(1).unwrap().left, 160);
    assert_eq!(battle.preset_list(), vec!["duel".to_string()]);
}

// =========================================================================
// Replays
// =========================================================================

#[test]
fn test_replay_script_reconstructs_without_assignment() {
    let script = "[GAME]{MapName=Tabula;GameType=BA;NumPlayers=2;\
        [PLAYER0]{Name=alice;Team=3;}[PLAYER1]{Name=bob;Team=3;Spectator=1;}\
        [TEAM3]{AllyTeam=2;RGBColor=0 1 0;}}";
    let mut battle = Battle::builder("viewer")
        .founder("viewer")
        .battle_type(BattleType::Replay)
        .build();
    battle.load_script(script, false);

    let alice = battle.participant("alice").unwrap();
    assert_eq!((alice.status.team, alice.status.ally), (3, 2));
    assert_eq!(alice.status.colour, Colour::new(0, 255, 0));
    assert_eq!(battle.spectators(), 1);
    assert_eq!(battle.roster().teams().get(&3), Some(&1));
}

// =========================================================================
// Allocator properties
// =========================================================================

fn arb_status() -> impl Strategy<Value = BattleStatus> {
    (0u32..6, 0u32..6, any::<bool>(), any::<[u8; 3]>()).prop_map(
        |(team, ally, spectator, [r, g, b])| BattleStatus {
            team,
            ally,
            spectator,
            colour: Colour::new(r, g, b),
            ..BattleStatus::default()
        },
    )
}

proptest! {
    #[test]
    fn free_team_is_smallest_unheld(statuses in proptest::collection::vec(arb_status(), 0..10)) {
        let refs: Vec<&BattleStatus> = statuses.iter().collect();
        let free = alloc::free_team(&refs);
        let held = |team: u32| statuses.iter().any(|s| !s.spectator && s.team == team);
        prop_assert!(!held(free));
        prop_assert!((0..free).all(held));
    }

    #[test]
    fn free_ally_is_smallest_unheld(statuses in proptest::collection::vec(arb_status(), 0..10)) {
        let refs: Vec<&BattleStatus> = statuses.iter().collect();
        let free = alloc::free_ally(&refs);
        let held = |ally: u32| statuses.iter().any(|s| !s.spectator && s.ally == ally);
        prop_assert!(!held(free));
        prop_assert!((0..free).all(held));
    }

    #[test]
    fn free_colour_is_not_similar_to_used(statuses in proptest::collection::vec(arb_status(), 0..8)) {
        let refs: Vec<&BattleStatus> = statuses.iter().collect();
        let colour = alloc::free_colour(&refs, statuses.len(), 20, 64);
        for status in statuses.iter().filter(|s| !s.spectator) {
            prop_assert!(!colour.is_similar(&status.colour, 20));
        }
    }
}
