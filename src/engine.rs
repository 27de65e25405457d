//! Engine state management.
//!
//! Holds the game in progress (position, inference state, transposition
//! table), the engine options, and drives search for move requests.
//! The host loads both setups, so the position is full-information; the
//! engine's play is kept honest by routing all search through
//! prediction. Search time scales with the Level option as level
//! squared tenths of a second.

use std::collections::HashMap;
use std::io::Write;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::board::{Color, Move, MoveClass, Position, Rank};
use crate::eval::Evaluator;
use crate::infer::{self, InferState};
use crate::search::{self, TransTable};
use crate::setup::{self, SetupError, SetupRows};

/// Default playing level. The search deadline is level² × 100 ms.
const DEFAULT_LEVEL: u32 = 5;

/// Broad-search depth cap; the chase extension may go past it.
const MAX_DEPTH: i32 = 24;

#[derive(Debug, Error)]
pub enum MoveError {
    #[error("no game in progress")]
    NoGame,
    #[error("it is not {0:?}'s turn")]
    WrongTurn(Color),
    #[error("illegal move {0}: {1:?}")]
    Refused(Move, MoveClass),
    #[error("malformed move string {0:?}")]
    Parse(String),
    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// One game in progress.
pub struct Game {
    pub pos: Position,
    pub engine_color: Color,
    pub infer: InferState,
    pub tt: TransTable,
    /// Set when a real move captured a flag.
    pub over: bool,
}

/// Holds the mutable state of the engine between commands.
pub struct Engine {
    pub game: Option<Game>,
    pub options: HashMap<String, String>,
    rng: SmallRng,
}

impl Engine {
    pub fn new() -> Engine {
        Engine {
            game: None,
            options: HashMap::new(),
            rng: SmallRng::from_entropy(),
        }
    }

    /// A deterministic engine for tests and reproducible matches.
    pub fn with_seed(seed: u64) -> Engine {
        Engine {
            game: None,
            options: HashMap::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Starts a fresh game playing the given color. Hashes derive from
    /// the engine's rng, so seeded engines produce seeded games.
    pub fn new_game(&mut self, engine_color: Color) {
        let seed: u64 = self.rng.gen();
        self.game = Some(Game {
            pos: Position::new(seed),
            engine_color,
            infer: InferState::new(),
            tt: TransTable::new(),
            over: false,
        });
    }

    /// Sets an engine option.
    pub fn set_option(&mut self, name: String, value: Option<String>) {
        self.options.insert(name, value.unwrap_or_default());
    }

    fn level(&self) -> u32 {
        self.options
            .get("Level")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|&l| (1..=10).contains(&l))
            .unwrap_or(DEFAULT_LEVEL)
    }

    /// Search budget for one move request.
    fn budget(&self) -> Duration {
        let level = self.level() as u64;
        Duration::from_millis(level * level * 100)
    }

    /// Generates and places the engine's own setup, returning it so the
    /// host can render the board.
    pub fn place_pieces(&mut self) -> Result<SetupRows, MoveError> {
        let rows = setup::random_setup(&mut self.rng);
        let game = self.game.as_mut().ok_or(MoveError::NoGame)?;
        setup::place(&mut game.pos, game.engine_color, &rows)?;
        Ok(rows)
    }

    /// Loads the opponent's true setup. The engine never reads these
    /// ranks through prediction; they are what real combat resolves
    /// against.
    pub fn load_opponent_setup(&mut self, rows: &SetupRows) -> Result<(), MoveError> {
        let game = self.game.as_mut().ok_or(MoveError::NoGame)?;
        let opp = game.engine_color.opposite();
        setup::place(&mut game.pos, opp, rows)?;
        Ok(())
    }

    /// Commits a real move: resolves it, updates repetition history,
    /// ages the transposition table, and runs inference on what the
    /// move revealed.
    fn commit(game: &mut Game, mv: Move) {
        game.pos.apply(mv);
        game.pos.record_history();
        game.tt.new_root();
        infer::after_commit(&mut game.pos, &mut game.infer, mv);
        if let Some(u) = game.pos.last_undo() {
            if u.removed.iter().flatten().any(|p| p.rank() == Rank::Flag) {
                game.over = true;
            }
        }
    }

    /// Applies the opponent's committed move.
    pub fn opponent_move(&mut self, mv: Move) -> Result<(), MoveError> {
        let game = self.game.as_mut().ok_or(MoveError::NoGame)?;
        let opp = game.engine_color.opposite();
        if game.pos.turn != opp {
            return Err(MoveError::WrongTurn(opp));
        }
        match game.pos.classify(mv) {
            // Repetition is pruned inside search only; a human opponent
            // is free to recreate an earlier position.
            MoveClass::Ok | MoveClass::Repeated => {
                Engine::commit(game, mv);
                Ok(())
            }
            refused => Err(MoveError::Refused(mv, refused)),
        }
    }

    /// Parses and applies the opponent's move from coordinate notation.
    pub fn opponent_move_str(&mut self, s: &str) -> Result<(), MoveError> {
        let mv = Move::parse(s).ok_or_else(|| MoveError::Parse(s.to_string()))?;
        self.opponent_move(mv)
    }

    /// Searches for and commits the engine's move. Returns `None` when
    /// the engine has no legal move and loses. Info lines go to `out`.
    pub fn request_move<W: Write>(&mut self, out: &mut W) -> Result<Option<Move>, MoveError> {
        let budget = self.budget();
        let game = self.game.as_mut().ok_or(MoveError::NoGame)?;
        if game.pos.turn != game.engine_color {
            return Err(MoveError::WrongTurn(game.engine_color));
        }
        let eval = Evaluator::new(&mut game.pos, game.engine_color, &game.infer);
        let report = search::search(&mut game.pos, &eval, &mut game.tt, budget, MAX_DEPTH, out);
        match report.best {
            Some(mv) => {
                Engine::commit(game, mv);
                Ok(Some(mv))
            }
            None => Ok(None),
        }
    }

    /// Whether the current game has ended with a flag capture.
    pub fn game_over(&self) -> bool {
        self.game.as_ref().is_some_and(|g| g.over)
    }
}

impl Default for Engine {
    fn default() -> Engine {
        Engine::new()
    }
}

/// Runs a move request on a worker thread. The result arrives on the
/// returned channel, so a host can keep its own loop responsive while
/// the engine thinks.
pub fn spawn_move_request(
    engine: Arc<Mutex<Engine>>,
) -> mpsc::Receiver<Result<Option<Move>, String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = {
            let mut guard = match engine.lock() {
                Ok(g) => g,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard
                .request_move(&mut std::io::sink())
                .map_err(|e| e.to_string())
        };
        // The host may have dropped the receiver; nothing to do then.
        let _ = tx.send(result);
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{square, Rank};

    fn started_game() -> Engine {
        let mut engine = Engine::with_seed(99);
        engine.new_game(Color::Red);
        engine.place_pieces().unwrap();
        let mut rng = SmallRng::seed_from_u64(100);
        let rows = setup::random_setup(&mut rng);
        engine.load_opponent_setup(&rows).unwrap();
        engine
    }

    #[test]
    fn new_engine_has_no_game() {
        let engine = Engine::new();
        assert!(engine.game.is_none());
        assert!(engine.options.is_empty());
        assert!(!engine.game_over());
    }

    #[test]
    fn setup_fills_both_armies() {
        let engine = started_game();
        let game = engine.game.as_ref().unwrap();
        assert_eq!(game.pos.pieces(Color::Red).count(), 40);
        assert_eq!(game.pos.pieces(Color::Blue).count(), 40);
    }

    #[test]
    fn request_move_produces_and_commits_a_move() {
        let mut engine = started_game();
        engine.set_option("Level".to_string(), Some("1".to_string()));
        let mut out = Vec::new();
        let mv = engine.request_move(&mut out).unwrap().unwrap();
        let game = engine.game.as_ref().unwrap();
        assert_eq!(game.pos.turn, Color::Blue);
        assert_eq!(game.pos.last_move(), Some(mv));
    }

    #[test]
    fn request_move_out_of_turn_is_refused() {
        let mut engine = Engine::with_seed(5);
        engine.new_game(Color::Blue);
        // Red is to move first.
        let err = engine.request_move(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, MoveError::WrongTurn(Color::Blue)));
    }

    #[test]
    fn opponent_move_validates_notation_and_legality() {
        let mut engine = started_game();
        engine.set_option("Level".to_string(), Some("1".to_string()));
        let mut out = Vec::new();
        engine.request_move(&mut out).unwrap();
        assert!(engine.opponent_move_str("nonsense").is_err());
        // Moving from an empty square is refused.
        let err = engine
            .opponent_move(Move::new(square(4, 5), square(4, 4)))
            .unwrap_err();
        assert!(matches!(err, MoveError::Refused(..)));
    }

    #[test]
    fn opponent_may_recreate_an_earlier_position() {
        let mut engine = Engine::with_seed(7);
        engine.new_game(Color::Red);
        let (ra, rb) = (square(0, 0), square(0, 1));
        let (ba, bb) = (square(9, 9), square(9, 8));
        {
            let game = engine.game.as_mut().unwrap();
            game.pos.place(ra, Color::Red, Rank::Scout);
            game.pos.place(ba, Color::Blue, Rank::Scout);
        }
        fn red_step(engine: &mut Engine, from: usize, to: usize) {
            let game = engine.game.as_mut().unwrap();
            game.pos.apply(Move::new(from, to));
            game.pos.record_history();
        }
        red_step(&mut engine, ra, rb);
        engine.opponent_move(Move::new(ba, bb)).unwrap();
        red_step(&mut engine, rb, ra);
        engine.opponent_move(Move::new(bb, ba)).unwrap();
        red_step(&mut engine, ra, rb);
        // Blue's next leg recreates a recorded position. It is not an
        // oscillation, and the engine must take it.
        let leg = Move::new(ba, bb);
        assert_eq!(
            engine.game.as_mut().unwrap().pos.classify(leg),
            MoveClass::Repeated
        );
        engine.opponent_move(leg).unwrap();
    }

    #[test]
    fn flag_capture_ends_the_game() {
        let mut engine = Engine::with_seed(7);
        engine.new_game(Color::Blue);
        let game = engine.game.as_mut().unwrap();
        game.pos.place(square(4, 4), Color::Red, Rank::Sergeant);
        game.pos.place(square(4, 5), Color::Blue, Rank::Flag);
        game.pos.place(square(0, 0), Color::Blue, Rank::Scout);
        engine
            .opponent_move(Move::new(square(4, 4), square(4, 5)))
            .unwrap();
        assert!(engine.game_over());
    }

    #[test]
    fn spawned_request_delivers_on_the_channel() {
        let mut engine = started_game();
        engine.set_option("Level".to_string(), Some("1".to_string()));
        let shared = Arc::new(Mutex::new(engine));
        let rx = spawn_move_request(Arc::clone(&shared));
        let result = rx.recv().unwrap();
        assert!(matches!(result, Ok(Some(_))));
        let guard = shared.lock().unwrap();
        assert_eq!(guard.game.as_ref().unwrap().pos.turn, Color::Blue);
    }
}
