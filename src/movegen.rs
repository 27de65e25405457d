//! Move generation.
//!
//! Enumerates single steps for every movable piece and slides for
//! Scouts. Generation is full-information (a hidden Scout still
//! slides); what the mover is believed to be only matters to
//! valuation. The exception is suspicion-based immobility: a piece the
//! engine has classified as a suspected Bomb is left out of
//! enumeration entirely, so structural inference directly prunes the
//! opponent's move set.

use crate::board::{Color, Move, MoveClass, Piece, Position, Rank, DIRS, GRID_SIZE};

/// Whether a piece takes part in move enumeration.
pub fn is_movable_piece(p: &Piece) -> bool {
    if !p.rank().is_movable() {
        return false;
    }
    !(p.suspected_rank() == Some(Rank::Bomb) && !p.known && !p.moved)
}

/// Appends all moves for the piece on `sq`.
pub fn piece_moves(pos: &Position, sq: usize, out: &mut Vec<Move>) {
    let p = match pos.piece_at(sq) {
        Some(p) => p,
        None => return,
    };
    if !is_movable_piece(p) {
        return;
    }
    let slides = p.rank() == Rank::Scout;
    for &dir in &DIRS {
        let mut to = (sq as isize + dir) as usize;
        loop {
            if !crate::board::is_valid(to) {
                break;
            }
            match pos.piece_at(to) {
                None => {
                    out.push(Move::new(sq, to));
                    if !slides {
                        break;
                    }
                    to = (to as isize + dir) as usize;
                }
                Some(other) => {
                    if other.color != p.color {
                        out.push(Move::new(sq, to));
                    }
                    break;
                }
            }
        }
    }
}

/// All moves for one side, in square order.
pub fn side_moves(pos: &Position, color: Color) -> Vec<Move> {
    let mut out = Vec::with_capacity(64);
    for sq in 0..GRID_SIZE {
        if pos.piece_at(sq).is_some_and(|p| p.color == color) {
            piece_moves(pos, sq, &mut out);
        }
    }
    out
}

/// Move list for prediction at search nodes. The engine's own side is
/// enumerated in full; its ranks are all readable. An opponent piece
/// the engine cannot read that has never moved is assumed bomblike:
/// its steps onto open squares are dropped unless the step lands next
/// to an engine piece. Attacks always stay, and Scouts are exempt
/// since a slide outs them regardless.
pub fn search_moves(pos: &Position, color: Color, engine: Color) -> Vec<Move> {
    let mut out = side_moves(pos, color);
    if color == engine {
        return out;
    }
    out.retain(|&mv| {
        let Some(p) = pos.piece_at(mv.from()) else {
            return false;
        };
        if p.moved
            || p.rank() == Rank::Scout
            || p.apparent_rank(engine) != Rank::Unknown
            || pos.piece_at(mv.to()).is_some()
        {
            return true;
        }
        threatens_from(pos, mv.to(), color)
    });
    out
}

/// Whether a piece of `color` standing on `sq` would have an enemy
/// within one step.
fn threatens_from(pos: &Position, sq: usize, color: Color) -> bool {
    DIRS.iter().any(|&d| {
        let n = (sq as isize + d) as usize;
        crate::board::is_valid(n) && pos.piece_at(n).is_some_and(|q| q.color != color)
    })
}

/// Root move list: side-to-move moves with two-square oscillations and
/// repetitions filtered out.
pub fn root_moves(pos: &mut Position) -> Vec<Move> {
    let moves = side_moves(pos, pos.turn);
    moves
        .into_iter()
        .filter(|&mv| pos.classify(mv) == MoveClass::Ok)
        .collect()
}
