//! Board representation and game-state types.
//!
//! Contains the grid geometry, ranks, pieces, moves, per-observer
//! hashing, and the position with its undo stack and repetition rules.

pub mod grid;
pub mod moves;
pub mod piece;
pub mod position;
pub mod rank;
pub mod zobrist;

pub use grid::{
    in_back_three, in_setup_area, is_valid, square, step, steps, x_of, y_of, DIRS, GRID_SIZE,
};
pub use moves::{square_name, Move, MoveClass, Undo, NULL_MOVE};
pub use piece::{Color, Piece, Visibility, CHASE_STREAK_MATURE, SUSPECT_MATURITY};
pub use position::Position;
pub use rank::{combat, Outcome, Rank, ALL_RANKS, RANK_COUNT};
pub use zobrist::Zobrist;
