//! Self-play game generation.
//!
//! Plays full games between two engine instances, each seeing only its
//! own inference of the opponent's ranks, and records setups, moves,
//! and outcomes as JSONL for offline analysis and regression baselines.

use std::io::Write;
use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::board::Color;
use crate::engine::Engine;
use crate::setup::SetupRows;

/// Configuration for self-play generation.
#[derive(Clone)]
pub struct SelfPlayConfig {
    /// Number of games to play.
    pub num_games: usize,
    /// Playing level for both sides (1-10, search time is level² × 100 ms).
    pub level: u32,
    /// Ply cap before a game is scored as a draw.
    pub max_moves: usize,
    /// Random seed (0 = use entropy).
    pub seed: u64,
    /// Suppress per-game progress output.
    pub quiet: bool,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        SelfPlayConfig {
            num_games: 10,
            level: 3,
            max_moves: 1000,
            seed: 0,
            quiet: false,
        }
    }
}

/// A complete self-play game record.
#[derive(Clone, Serialize)]
pub struct GameRecord {
    /// Sequential game ID.
    pub game_id: usize,
    /// The winning side, or `None` for a draw at the ply cap.
    pub winner: Option<String>,
    /// Number of plies played.
    pub plies: usize,
    /// Red's setup, four rows of rank characters, back row first.
    pub red_setup: Vec<String>,
    /// Blue's setup, four rows of rank characters, back row first.
    pub blue_setup: Vec<String>,
    /// All moves in coordinate notation, in order.
    pub moves: Vec<String>,
}

fn color_name(color: Color) -> &'static str {
    match color {
        Color::Red => "red",
        Color::Blue => "blue",
    }
}

fn setup_strings(rows: &SetupRows) -> Vec<String> {
    rows.iter()
        .map(|row| row.iter().map(|r| r.to_char()).collect())
        .collect()
}

/// Plays a single game between two freshly seeded engines.
pub fn play_game(config: &SelfPlayConfig, game_id: usize, rng: &mut SmallRng) -> GameRecord {
    let mut red = Engine::with_seed(rng.gen());
    let mut blue = Engine::with_seed(rng.gen());
    red.set_option("Level".to_string(), Some(config.level.to_string()));
    blue.set_option("Level".to_string(), Some(config.level.to_string()));
    red.new_game(Color::Red);
    blue.new_game(Color::Blue);

    let red_rows = red.place_pieces().expect("red setup failed");
    let blue_rows = blue.place_pieces().expect("blue setup failed");
    red.load_opponent_setup(&blue_rows).expect("red load failed");
    blue.load_opponent_setup(&red_rows).expect("blue load failed");

    let mut moves: Vec<String> = Vec::new();
    let mut winner: Option<Color> = None;
    let mut out = std::io::sink();

    for ply in 0..config.max_moves {
        let to_move = if ply % 2 == 0 { Color::Red } else { Color::Blue };
        let (mover, other) = if to_move == Color::Red {
            (&mut red, &mut blue)
        } else {
            (&mut blue, &mut red)
        };
        match mover.request_move(&mut out).expect("move request failed") {
            Some(mv) => {
                other
                    .opponent_move(mv)
                    .expect("engines disagree on legality");
                moves.push(mv.to_string());
                if mover.game_over() {
                    // Only the defender's flag can fall, so the mover won.
                    winner = Some(to_move);
                    break;
                }
            }
            None => {
                winner = Some(to_move.opposite());
                break;
            }
        }
    }

    GameRecord {
        game_id,
        winner: winner.map(|c| color_name(c).to_string()),
        plies: moves.len(),
        red_setup: setup_strings(&red_rows),
        blue_setup: setup_strings(&blue_rows),
        moves,
    }
}

/// Runs self-play generation, producing one record per game.
pub fn run_self_play(config: &SelfPlayConfig) -> Vec<GameRecord> {
    let mut rng = if config.seed != 0 {
        SmallRng::seed_from_u64(config.seed)
    } else {
        SmallRng::from_entropy()
    };

    let mut games = Vec::with_capacity(config.num_games);
    for i in 0..config.num_games {
        let game_start = Instant::now();
        let game = play_game(config, i, &mut rng);
        if !config.quiet {
            let outcome = match &game.winner {
                Some(w) => format!("{} wins", w),
                None => "draw".to_string(),
            };
            eprintln!(
                "Game {}/{}: {} in {} plies ({:.1}s)",
                i + 1,
                config.num_games,
                outcome,
                game.plies,
                game_start.elapsed().as_secs_f64(),
            );
        }
        games.push(game);
    }
    games
}

/// Writes game records as JSONL, one JSON object per line.
pub fn write_jsonl<W: Write>(games: &[GameRecord], out: &mut W) -> std::io::Result<()> {
    for game in games {
        serde_json::to_writer(&mut *out, game)?;
        writeln!(out)?;
    }
    out.flush()
}

/// Prints a summary of self-play results to stderr.
pub fn print_summary(games: &[GameRecord]) {
    let total = games.len();
    let mut red_wins = 0usize;
    let mut blue_wins = 0usize;
    let mut draws = 0usize;
    let mut total_plies = 0usize;

    for game in games {
        total_plies += game.plies;
        match game.winner.as_deref() {
            Some("red") => red_wins += 1,
            Some("blue") => blue_wins += 1,
            _ => draws += 1,
        }
    }

    eprintln!("=== Self-Play Summary ===");
    eprintln!("Games: {}", total);
    eprintln!(
        "Avg plies/game: {:.1}",
        total_plies as f64 / total.max(1) as f64
    );
    eprintln!("Red wins: {}", red_wins);
    eprintln!("Blue wins: {}", blue_wins);
    eprintln!("Draws: {}", draws);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> SelfPlayConfig {
        SelfPlayConfig {
            num_games: 1,
            level: 1,
            max_moves: 12,
            seed: 42,
            quiet: true,
        }
    }

    #[test]
    fn play_single_game_completes() {
        let mut rng = SmallRng::seed_from_u64(42);
        let game = play_game(&fast_config(), 0, &mut rng);
        assert!(game.plies > 0);
        assert!(game.plies <= 12);
        assert_eq!(game.moves.len(), game.plies);
        assert_eq!(game.red_setup.len(), 4);
        assert!(game.red_setup.iter().all(|row| row.chars().count() == 10));
        assert_eq!(game.blue_setup.len(), 4);
    }

    #[test]
    fn run_produces_requested_count() {
        let config = SelfPlayConfig {
            num_games: 2,
            max_moves: 6,
            ..fast_config()
        };
        let games = run_self_play(&config);
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].game_id, 0);
        assert_eq!(games[1].game_id, 1);
    }

    #[test]
    fn jsonl_output_parses_back() {
        let mut rng = SmallRng::seed_from_u64(7);
        let config = SelfPlayConfig {
            max_moves: 6,
            ..fast_config()
        };
        let games = vec![play_game(&config, 0, &mut rng)];
        let mut buf = Vec::new();
        write_jsonl(&games, &mut buf).unwrap();
        let output = String::from_utf8(buf).unwrap();
        assert_eq!(output.lines().count(), 1);
        let v: serde_json::Value = serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert_eq!(v["game_id"], 0);
        assert!(v["moves"].is_array());
        assert_eq!(v["red_setup"].as_array().unwrap().len(), 4);
    }
}
