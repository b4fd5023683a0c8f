//! Prints a summary of replay and savegame files.
//!
//! ```text
//! playback-inspect <file-or-directory>...
//! ```

use std::path::Path;
use std::process::ExitCode;

use skirmish::prelude::*;

fn main() -> ExitCode {
    if let Err(err) = init_tracing() {
        eprintln!("logging disabled: {err}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("usage: playback-inspect <file-or-directory>...");
        return ExitCode::from(2);
    }

    let mut list = PlaybackList::new();
    for arg in &args {
        let path = Path::new(arg);
        if path.is_dir() {
            if let Err(err) = list.load_dir(path) {
                tracing::error!(path = %path.display(), error = %err, "cannot read directory");
            }
        } else {
            list.load_files([path]);
        }
    }

    for (id, game) in list.iter() {
        print_summary(id, game);
    }
    println!("{} loaded, {} failed", list.len(), list.failed());

    if list.failed() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_summary(id: u32, game: &StoredGame) {
    let battle = &game.battle;
    let date = game
        .date
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown date".into());
    println!("#{id} {} [{}]", game.file_name(), game.kind);
    println!("    date:     {date}");
    println!(
        "    length:   {}:{:02}",
        game.duration_secs / 60,
        game.duration_secs % 60
    );
    println!("    engine:   {}", game.engine_version);
    println!("    map:      {}", battle.host_map().name);
    println!("    game:     {}", battle.host_mod().name);
    println!(
        "    players:  {} ({} AI, {} spectating)",
        battle.num_players(),
        battle.num_bots(),
        battle.spectators()
    );
    for participant in battle.roster().iter() {
        let status = &participant.status;
        let role = if status.spectator {
            "spectator".to_string()
        } else {
            format!("team {} ally {}", status.team, status.ally)
        };
        println!("      {:<20} {role}", participant.nick);
    }
}
