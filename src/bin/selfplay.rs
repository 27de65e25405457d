//! Self-play game generation CLI.
//!
//! Plays engine-vs-engine games and outputs game records as JSONL.
//!
//! Usage:
//!   cargo run --release --bin selfplay -- [OPTIONS]
//!
//! Options:
//!   --games N      Number of games to play (default: 10)
//!   --level N      Playing level 1-10 (default: 3)
//!   --max-moves N  Ply cap per game (default: 1000)
//!   --seed N       Random seed, 0 for entropy (default: 0)
//!   --output FILE  Output file path (default: stdout)
//!   --quiet        Suppress progress and summary output

use std::env;
use std::fs::File;
use std::io::{self, BufWriter};
use std::time::Instant;

use redoubt::selfplay::{self, SelfPlayConfig};

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut config = SelfPlayConfig::default();
    let mut output_path: Option<String> = None;
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--games" => {
                i += 1;
                config.num_games = args[i].parse().expect("invalid --games value");
            }
            "--level" => {
                i += 1;
                config.level = args[i].parse().expect("invalid --level value");
            }
            "--max-moves" => {
                i += 1;
                config.max_moves = args[i].parse().expect("invalid --max-moves value");
            }
            "--seed" => {
                i += 1;
                config.seed = args[i].parse().expect("invalid --seed value");
            }
            "--output" => {
                i += 1;
                output_path = Some(args[i].clone());
            }
            "--quiet" => {
                quiet = true;
            }
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config.quiet = quiet;

    if !quiet {
        eprintln!(
            "Self-play: {} games, level {}, max {} plies",
            config.num_games, config.level, config.max_moves
        );
    }

    let start = Instant::now();
    let games = selfplay::run_self_play(&config);
    let elapsed = start.elapsed();

    if !quiet {
        eprintln!(
            "Completed {} games in {:.1}s",
            games.len(),
            elapsed.as_secs_f64()
        );
        selfplay::print_summary(&games);
    }

    match output_path {
        Some(path) => {
            let file = File::create(&path).expect("failed to create output file");
            let mut writer = BufWriter::new(file);
            selfplay::write_jsonl(&games, &mut writer).expect("failed to write output");
            if !quiet {
                eprintln!("Wrote {} games to {}", games.len(), path);
            }
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            selfplay::write_jsonl(&games, &mut writer).expect("failed to write output");
        }
    }
}

fn print_usage() {
    eprintln!("Usage: selfplay [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --games N      Number of games to play (default: 10)");
    eprintln!("  --level N      Playing level 1-10 (default: 3)");
    eprintln!("  --max-moves N  Ply cap per game (default: 1000)");
    eprintln!("  --seed N       Random seed, 0 for entropy (default: 0)");
    eprintln!("  --output FILE  Output file path (default: stdout)");
    eprintln!("  --quiet        Suppress progress and summary output");
    eprintln!("  --help         Show this help");
}
