//! Rebuilding a battle from a game script, and writing one back out.
//!
//! Reconstruction is best effort. Missing sections and keys fall back to
//! defaults, and a script that fails to parse part-way still yields
//! whatever was read before the error.

use std::collections::{BTreeMap, HashMap};

use skirmish_protocol::{
    BattleStatus, BotInfo, Codec, Colour, OptionCategory, ResourceId, Section, StartPosition,
    SyncState, TdfCodec, normalize_hash,
};
use skirmish_roster::Participant;

use crate::{Battle, ENGINE_DEFAULTS, LoadState};

/// Per-team fields shared by every player on that team.
#[derive(Debug, Clone, Default)]
struct TeamInfo {
    ally: u32,
    colour: Colour,
    side: u32,
    handicap: u32,
    position: StartPosition,
}

/// Start zone of an alliance, read once per ally index.
#[derive(Debug, Clone, Copy, Default)]
struct AllyInfo {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl Battle {
    /// Replaces the session state with the battle described by `text`.
    ///
    /// With `load_map_mod` the local map and game are resolved as well:
    /// side names are matched against the game's side list, and the
    /// `mapoptions`/`modoptions` sections are read. Engine options are
    /// always taken from the `GAME` section, keeping the current value for
    /// any key the script leaves out.
    pub fn load_script(&mut self, text: &str, load_map_mod: bool) {
        self.script = text.to_string();

        let (root, error) = TdfCodec.decode_partial(text);
        if let Some(err) = error {
            tracing::warn!(error = %err, "game script is malformed, using what was read");
        }
        let Some(game) = root.find("GAME") else {
            tracing::warn!("game script has no GAME section");
            return;
        };

        self.host_mod = ResourceId::new(
            game.get_string("GameType", ""),
            normalize_hash(&game.get_string("ModHash", "")),
        );
        self.host_map = ResourceId::new(
            game.get_string("MapName", ""),
            normalize_hash(&game.get_string("MapHash", "")),
        );
        self.map_state = LoadState::NotAttempted;
        self.mod_state = LoadState::NotAttempted;

        let mut player_count = game.get_int("NumPlayers", 0);
        let users = game.get_int("NumUsers", 0);
        if users > 0 {
            player_count = users;
        }
        self.options.max_players = u32::try_from(player_count).unwrap_or(0);

        let sides = if load_map_mod {
            self.load_mod();
            self.load_map();
            self.assets.sides(&self.host_mod.name)
        } else {
            Vec::new()
        };

        self.roster.clear();
        self.rects.clear();
        for participant in read_participants(game, &sides, &mut self.rects) {
            let nick = participant.nick.clone();
            if let Err(err) = self.roster.insert(participant) {
                tracing::warn!(%nick, error = %err, "skipping participant from script");
            }
        }
        self.restrictions = read_restrictions(game);

        if load_map_mod {
            for (section, category) in [
                ("mapoptions", OptionCategory::Map),
                ("modoptions", OptionCategory::Mod),
            ] {
                if let Some(options) = game.find(section) {
                    for (key, value) in options.values() {
                        self.custom.set(category, key, value);
                    }
                }
            }
        }
        for (key, _) in ENGINE_DEFAULTS {
            let current = self
                .custom
                .get(OptionCategory::Engine, key)
                .unwrap_or_default()
                .to_string();
            let value = game.get_string(key, &current);
            self.custom.set(OptionCategory::Engine, *key, value);
        }

        tracing::info!(
            map = %self.host_map.name,
            game = %self.host_mod.name,
            participants = self.roster.len(),
            start_rects = self.rects.len(),
            "battle reconstructed from script"
        );
    }

    /// Writes the session out as a game script.
    pub fn to_script(&self) -> String {
        let mut game = Section::new("GAME");
        game.set("GameType", &self.host_mod.name);
        game.set("ModHash", &self.host_mod.hash);
        game.set("MapName", &self.host_map.name);
        game.set("MapHash", &self.host_map.hash);
        for (key, value) in self.custom.iter(OptionCategory::Engine) {
            game.set(key, value);
        }

        let humans: Vec<&Participant> = self.roster.iter().filter(|p| !p.is_bot()).collect();
        let bots: Vec<&Participant> = self.roster.iter().filter(|p| p.is_bot()).collect();
        let player_index: HashMap<&str, usize> = humans
            .iter()
            .enumerate()
            .map(|(i, p)| (p.nick.as_str(), i))
            .collect();
        game.set("NumPlayers", humans.len());
        game.set("NumUsers", humans.len() + bots.len());

        for (i, player) in humans.iter().enumerate() {
            let section = game.add_child(Section::new(format!("PLAYER{i}")));
            section.set("Name", &player.nick);
            section.set("CountryCode", &player.country);
            section.set("Rank", player.rank);
            section.set("Spectator", u8::from(player.status.spectator));
            section.set("Team", player.status.team);
        }
        // AIs are numbered after the players, since an AI section shadows a
        // player section with the same index.
        for (i, bot) in bots.iter().enumerate() {
            let info = bot.status.bot.clone().unwrap_or_default();
            let index = humans.len() + i;
            let section = game.add_child(Section::new(format!("AI{index}")));
            section.set("Name", &bot.nick);
            section.set("ShortName", &info.short_name);
            section.set("Version", &info.version);
            section.set("Team", bot.status.team);
            if let Some(host) = player_index.get(info.owner.as_str()) {
                section.set("Host", host);
            }
        }

        let sides = self.assets.sides(&self.host_mod.name);
        let mut teams: BTreeMap<u32, &Participant> = BTreeMap::new();
        for participant in self.roster.iter().filter(|p| !p.status.spectator) {
            teams.entry(participant.status.team).or_insert(participant);
        }
        for (team, member) in &teams {
            let status = &member.status;
            let section = game.add_child(Section::new(format!("TEAM{team}")));
            let leader = member.owner().unwrap_or(member.nick.as_str());
            if let Some(index) = player_index.get(leader) {
                section.set("TeamLeader", index);
            }
            section.set("AllyTeam", status.ally);
            section.set("RGBColor", status.colour.to_float_string());
            match sides.get(status.side as usize) {
                Some(name) => section.set("Side", name),
                None => section.set("Side", status.side),
            }
            section.set("Handicap", status.handicap);
            if status.position.is_set() {
                section.set("StartPosX", status.position.x);
                section.set("StartPosY", status.position.y);
            }
        }

        let mut allies: BTreeMap<u32, Section> = self
            .roster
            .allies()
            .keys()
            .map(|ally| (*ally, Section::new(format!("ALLYTEAM{ally}"))))
            .collect();
        for rect in self.rects.iter().filter(|r| r.is_ok()) {
            let section = allies
                .entry(rect.ally)
                .or_insert_with(|| Section::new(format!("ALLYTEAM{}", rect.ally)));
            section.set("StartRectLeft", rect.left);
            section.set("StartRectTop", rect.top);
            section.set("StartRectRight", rect.right);
            section.set("StartRectBottom", rect.bottom);
        }
        for (_, mut section) in allies {
            section.set("NumAllies", 0);
            game.add_child(section);
        }

        if !self.restrictions.is_empty() {
            let section = game.add_child(Section::new("RESTRICT"));
            for (i, (unit, limit)) in self.restrictions.iter().enumerate() {
                section.set(format!("Unit{i}"), unit);
                section.set(format!("Limit{i}"), limit);
            }
            game.set("NumRestrictions", self.restrictions.len());
        }

        for (name, category) in [
            ("mapoptions", OptionCategory::Map),
            ("modoptions", OptionCategory::Mod),
        ] {
            let mut section = Section::new(name);
            for (key, value) in self.custom.iter(category) {
                section.set(key, value);
            }
            if !section.is_empty() {
                game.add_child(section);
            }
        }

        let mut root = Section::root();
        root.add_child(game);
        TdfCodec.encode(&root)
    }
}

// ---------------------------------------------------------------------------
// Section readers
// ---------------------------------------------------------------------------

fn read_u32(section: &Section, key: &str, default: u32) -> u32 {
    u32::try_from(section.get_int(key, i64::from(default))).unwrap_or(default)
}

fn read_i32(section: &Section, key: &str, default: i32) -> i32 {
    i32::try_from(section.get_int(key, i64::from(default))).unwrap_or(default)
}

/// Players and AIs by index. An `AIn` section replaces a `PLAYERn` with
/// the same index. Each alliance reached through a participant's team
/// gets a start zone in `rects`.
fn read_participants(
    game: &Section,
    sides: &[String],
    rects: &mut crate::StartRects,
) -> Vec<Participant> {
    let mut entries: BTreeMap<u32, (&Section, bool)> = BTreeMap::new();
    for child in game.children() {
        if let Some(index) = child.indexed("PLAYER") {
            entries.entry(index).or_insert((child, false));
        }
    }
    for child in game.children() {
        if let Some(index) = child.indexed("AI") {
            entries.insert(index, (child, true));
        }
    }

    let mut teams: HashMap<u32, Option<TeamInfo>> = HashMap::new();
    let mut allies: HashMap<u32, Option<AllyInfo>> = HashMap::new();
    let mut participants = Vec::with_capacity(entries.len());
    for (index, (section, is_ai)) in entries {
        let nick = section.get_string("Name", "");
        if nick.is_empty() {
            tracing::warn!(index, "participant without a name in script");
            continue;
        }

        let team = read_u32(section, "Team", 0);
        let team_info = teams
            .entry(team)
            .or_insert_with(|| read_team(game, team, sides))
            .clone();
        let info = match team_info {
            Some(info) => {
                allies.entry(info.ally).or_insert_with(|| {
                    let ally = read_ally(game, info.ally)?;
                    rects.add(info.ally, ally.left, ally.top, ally.right, ally.bottom);
                    Some(ally)
                });
                info
            }
            None => TeamInfo {
                position: StartPosition::UNSET,
                ..TeamInfo::default()
            },
        };
        let status = BattleStatus {
            team,
            ally: info.ally,
            spectator: section.get_int("Spectator", 0) != 0,
            ready: true,
            sync: SyncState::Synced,
            colour: info.colour,
            handicap: info.handicap,
            side: info.side,
            position: info.position,
            bot: None,
        };

        let participant = if is_ai {
            let owner = section
                .get("Host")
                .and_then(|host| game.find(&format!("PLAYER{host}")))
                .map(|player| player.get_string("Name", ""))
                .unwrap_or_default();
            let bot = BotInfo {
                owner,
                short_name: section.get_string("ShortName", ""),
                version: section.get_string("Version", ""),
            };
            Participant::bot(nick, bot, status)
        } else {
            let mut player = Participant::recorded(nick, status);
            player.country = section.get_string("CountryCode", "").to_uppercase();
            player.rank = read_u32(section, "Rank", 0);
            player
        };
        participants.push(participant);
    }
    participants
}

fn read_team(game: &Section, team: u32, sides: &[String]) -> Option<TeamInfo> {
    let section = game.find(&format!("TEAM{team}"))?;
    let side_name = section.get_string("Side", "");
    let side = sides
        .iter()
        .position(|s| s.eq_ignore_ascii_case(&side_name))
        .map(|i| i as u32)
        .or_else(|| side_name.trim().parse().ok())
        .unwrap_or(0);
    Some(TeamInfo {
        ally: read_u32(section, "AllyTeam", 0),
        colour: Colour::from_float_string(&section.get_string("RGBColor", "")),
        side,
        handicap: read_u32(section, "Handicap", 0),
        position: StartPosition::new(
            read_i32(section, "StartPosX", -1),
            read_i32(section, "StartPosY", -1),
        ),
    })
}

/// Missing zone edges default to 0, as long as the section exists.
fn read_ally(game: &Section, ally: u32) -> Option<AllyInfo> {
    let section = game.find(&format!("ALLYTEAM{ally}"))?;
    Some(AllyInfo {
        left: read_i32(section, "StartRectLeft", 0),
        top: read_i32(section, "StartRectTop", 0),
        right: read_i32(section, "StartRectRight", 0),
        bottom: read_i32(section, "StartRectBottom", 0),
    })
}

fn read_restrictions(game: &Section) -> BTreeMap<String, u32> {
    let Some(section) = game.find("RESTRICT") else {
        return BTreeMap::new();
    };
    let count = game.get_int("NumRestrictions", 0).max(0);
    (0..count)
        .filter_map(|i| {
            let unit = section.get(&format!("Unit{i}"))?;
            Some((unit.to_string(), read_u32(section, &format!("Limit{i}"), 0)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BattleType, MemoryAssets, ModInfo};

    const SCRIPT: &str = r#"
[GAME]
{
    GameType=Balanced Annihilation V7.72;
    ModHash=-1;
    MapName=Delta Siege Dry;
    MapHash=1234;
    NumPlayers=2;
    NumUsers=3;
    startpostype=2;
    [PLAYER0]
    {
        Name=alice;
        CountryCode=de;
        Spectator=0;
        Team=0;
        Rank=3;
    }
    [PLAYER1]
    {
        Name=bob;
        Spectator=0;
        Team=1;
    }
    [AI2]
    {
        Name=kaik;
        ShortName=KAIK;
        Version=0.13;
        Host=0;
        Team=2;
    }
    [TEAM0]
    {
        TeamLeader=0;
        AllyTeam=0;
        RGBColor=1 0 0;
        Side=CORE;
        Handicap=10;
        StartPosX=100;
        StartPosY=200;
    }
    [TEAM1]
    {
        TeamLeader=1;
        AllyTeam=1;
        RGBColor=0 0 1;
        Side=ARM;
    }
    [TEAM2]
    {
        TeamLeader=0;
        AllyTeam=1;
    }
    [ALLYTEAM0]
    {
        NumAllies=0;
        StartRectLeft=0;
        StartRectTop=10;
        StartRectRight=50;
        StartRectBottom=60;
    }
    [ALLYTEAM1]
    {
        NumAllies=0;
    }
    [modoptions]
    {
        comm=fixed;
    }
}
"#;

    fn replay() -> Battle {
        Battle::builder("viewer")
            .battle_type(BattleType::Replay)
            .build()
    }

    #[test]
    fn test_load_script_reads_identity_and_normalizes_hashes() {
        let mut battle = replay();
        battle.load_script(SCRIPT, false);

        assert_eq!(battle.host_mod().name, "Balanced Annihilation V7.72");
        assert_eq!(battle.host_mod().hash, "4294967295");
        assert_eq!(battle.host_map().name, "Delta Siege Dry");
        assert_eq!(battle.host_map().hash, "1234");
        assert_eq!(battle.options().max_players, 3);
        assert_eq!(battle.script(), SCRIPT);
    }

    #[test]
    fn test_load_script_builds_players_and_ai() {
        let mut battle = replay();
        battle.load_script(SCRIPT, false);

        let alice = battle.participant("alice").unwrap();
        assert_eq!(alice.country, "DE");
        assert_eq!(alice.rank, 3);
        assert_eq!(alice.status.handicap, 10);
        assert_eq!(alice.status.colour, Colour::new(255, 0, 0));
        assert_eq!(alice.status.position, StartPosition::new(100, 200));
        assert!(alice.status.ready);

        let bob = battle.participant("bob").unwrap();
        assert_eq!((bob.status.team, bob.status.ally), (1, 1));
        assert!(!bob.status.position.is_set());

        let kaik = battle.participant("kaik").unwrap();
        assert_eq!(kaik.owner(), Some("alice"));
        assert_eq!(kaik.status.bot.as_ref().unwrap().short_name, "KAIK");
        assert_eq!(battle.num_bots(), 1);
    }

    #[test]
    fn test_load_script_ai_replaces_player_with_same_index() {
        let text = "[GAME]{[PLAYER0]{Name=alice;}[PLAYER1]{Name=ghost;}[AI1]{Name=bot;Host=0;}}";
        let mut battle = replay();
        battle.load_script(text, false);
        assert!(battle.participant("ghost").is_none());
        assert_eq!(battle.participant("bot").unwrap().owner(), Some("alice"));
    }

    #[test]
    fn test_load_script_start_rects_use_left_edge() {
        let mut battle = replay();
        battle.load_script(SCRIPT, false);

        let rect = battle.start_rects().get(0).unwrap();
        assert_eq!(
            (rect.left, rect.top, rect.right, rect.bottom),
            (0, 10, 50, 60)
        );
        let rect = battle.start_rects().get(1).unwrap();
        assert_eq!((rect.left, rect.top, rect.right, rect.bottom), (0, 0, 0, 0));
        assert_eq!(battle.start_rects().len(), 2);
    }

    #[test]
    fn test_load_script_start_rects_only_for_referenced_allies() {
        let text = "[GAME]{[PLAYER0]{Name=alice;Team=0;}[PLAYER1]{Name=bob;Team=3;}\
            [TEAM0]{AllyTeam=1;}\
            [ALLYTEAM1]{NumAllies=0;}\
            [ALLYTEAM5]{StartRectLeft=1;StartRectTop=2;StartRectRight=3;StartRectBottom=4;}}";
        let mut battle = replay();
        battle.load_script(text, false);

        let allies: Vec<u32> = battle.start_rects().iter().map(|r| r.ally).collect();
        assert_eq!(allies, vec![1]);
        assert_eq!(battle.participant("bob").unwrap().status.ally, 0);
    }

    #[test]
    fn test_load_script_options_only_with_map_mod() {
        let mut battle = replay();
        battle.load_script(SCRIPT, false);
        assert_eq!(battle.custom_options().get(OptionCategory::Mod, "comm"), None);
        assert_eq!(
            battle.custom_options().get(OptionCategory::Engine, "startpostype"),
            Some("2")
        );
        assert_eq!(
            battle.custom_options().get(OptionCategory::Engine, "maxunits"),
            Some("500")
        );

        let mut battle = replay();
        battle.load_script(SCRIPT, true);
        assert_eq!(
            battle.custom_options().get(OptionCategory::Mod, "comm"),
            Some("fixed")
        );
    }

    #[test]
    fn test_load_script_resolves_side_names_from_game() {
        let game = ModInfo {
            name: "Balanced Annihilation V7.72".into(),
            ..ModInfo::default()
        };
        let assets = MemoryAssets::new().with_mod(game, vec!["ARM".into(), "CORE".into()]);
        let mut battle = Battle::builder("viewer")
            .battle_type(BattleType::Replay)
            .assets(assets)
            .build();
        battle.load_script(SCRIPT, true);

        assert_eq!(battle.participant("alice").unwrap().status.side, 1);
        assert_eq!(battle.participant("bob").unwrap().status.side, 0);
        assert_eq!(battle.mod_state(), LoadState::Loaded);
        assert_eq!(battle.map_state(), LoadState::NotFound);
    }

    #[test]
    fn test_load_script_truncated_keeps_partial_state() {
        let cut = &SCRIPT[..SCRIPT.find("[PLAYER1]").unwrap()];
        let mut battle = replay();
        battle.load_script(cut, false);
        assert_eq!(battle.host_map().name, "Delta Siege Dry");
        assert!(battle.participant("alice").is_some());
        assert!(battle.participant("bob").is_none());
    }

    #[test]
    fn test_load_script_without_game_section_is_noop() {
        let mut battle = replay();
        battle.load_script("[NOTGAME]{}", false);
        assert!(battle.roster().is_empty());
        assert!(battle.host_map().name.is_empty());
    }

    #[test]
    fn test_to_script_reloads_to_same_battle() {
        let mut original = replay();
        original.load_script(SCRIPT, false);
        original.restrict_unit("armcom", 1);

        let text = original.to_script();
        let mut copy = replay();
        copy.load_script(&text, false);

        assert_eq!(copy.host_map(), original.host_map());
        assert_eq!(copy.host_mod(), original.host_mod());
        let nicks = |b: &Battle| {
            let mut v: Vec<String> = b.roster().iter().map(|p| p.nick.clone()).collect();
            v.sort();
            v
        };
        assert_eq!(nicks(&copy), nicks(&original));
        assert_eq!(copy.start_rects().get(0), original.start_rects().get(0));
        assert_eq!(copy.participant("kaik").unwrap().owner(), Some("alice"));
        assert_eq!(copy.restricted_units().get("armcom"), Some(&1));
        assert_eq!(copy.participant("bob").unwrap().status.ally, 1);
    }
}
