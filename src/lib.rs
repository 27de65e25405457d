//! Redoubt engine library.
//!
//! Exposes the board representation, rank inference, evaluation,
//! search, and engine modules for use by integration tests and the
//! self-play binary.

pub mod board;
pub mod engine;
pub mod eval;
pub mod infer;
pub mod movegen;
pub mod search;
pub mod selfplay;
pub mod setup;
