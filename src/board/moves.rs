//! Moves and undo records.
//!
//! A move packs its squares into a `u16` so it can index the history
//! table directly. Undo records carry full snapshots of both affected
//! pieces plus the pre-move hashes and evaluator value, making undo a
//! straight copy-back.

use std::fmt;

use super::grid::{square, x_of, y_of};
use super::piece::Piece;

/// A from/to square pair packed as `from << 8 | to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move(u16);

/// The null move: passes the turn without touching the board.
pub const NULL_MOVE: Move = Move(0);

impl Move {
    #[inline]
    pub fn new(from: usize, to: usize) -> Move {
        Move(((from as u16) << 8) | to as u16)
    }

    #[inline]
    pub fn from(self) -> usize {
        (self.0 >> 8) as usize
    }

    #[inline]
    pub fn to(self) -> usize {
        (self.0 & 0xff) as usize
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Index into the history table.
    #[inline]
    pub fn packed(self) -> usize {
        self.0 as usize
    }

    /// The reverse of this move.
    #[inline]
    pub fn reversed(self) -> Move {
        Move::new(self.to(), self.from())
    }

    /// Parses coordinate notation like "b3-b5". Files are a..j, rows
    /// 1..10 counted from Red's side.
    pub fn parse(s: &str) -> Option<Move> {
        let (from, to) = s.split_once('-')?;
        Some(Move::new(parse_square(from)?, parse_square(to)?))
    }
}

fn parse_square(s: &str) -> Option<usize> {
    let mut chars = s.chars();
    let file = chars.next()?;
    let x = (file as usize).checked_sub('a' as usize)?;
    if x >= 10 {
        return None;
    }
    let row: usize = chars.as_str().parse().ok()?;
    if !(1..=10).contains(&row) {
        return None;
    }
    Some(square(x, row - 1))
}

/// Formats a square in coordinate notation.
pub fn square_name(sq: usize) -> String {
    let file = (b'a' + x_of(sq) as u8) as char;
    format!("{}{}", file, y_of(sq) + 1)
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return write!(f, "(null)");
        }
        write!(f, "{}-{}", square_name(self.from()), square_name(self.to()))
    }
}

/// Why a candidate move is refused, or that it is fine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveClass {
    Ok,
    /// Fourth leg of a two-square oscillation.
    TwoSquares,
    /// Would recreate a position the mover already produced.
    Repeated,
    /// Source is a Bomb, Flag, or a piece held immobile by suspicion.
    Immobile,
}

/// Snapshot taken before a move is applied. `value` is the evaluator's
/// running total at that point; plain position replay stores 0 there.
/// Null-move records have `from_piece` unset.
#[derive(Clone, Debug)]
pub struct Undo {
    pub mv: Move,
    pub from_piece: Option<Piece>,
    pub to_piece: Option<Piece>,
    /// Pieces this move sent to the tray, at most two.
    pub removed: [Option<Piece>; 2],
    pub hash: [u64; 2],
    pub value: i32,
}
