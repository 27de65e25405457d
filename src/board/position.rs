//! The position: board occupancy, tray, undo stack, per-observer
//! hashes, and the repetition rules.
//!
//! The position holds full information (true ranks of both sides); the
//! information asymmetry the engine plays under is carried by the
//! known/suspected flags on each piece and enforced by everything that
//! predicts rather than resolves. Real-move application here resolves
//! combat with true ranks; the search layer applies moves through its
//! own prediction-based resolution using the primitives exposed here.

use std::collections::HashMap;

use super::grid::{self, GRID_SIZE};
use super::moves::{Move, MoveClass, Undo, NULL_MOVE};
use super::piece::{Color, Piece};
use super::rank::{combat, Outcome, Rank, RANK_COUNT};
use super::zobrist::Zobrist;

/// Board, tray, hashes, and move history for one game.
pub struct Position {
    board: [Option<Piece>; GRID_SIZE],
    pub turn: Color,
    hash: [u64; 2],
    zob: Zobrist,
    undo_stack: Vec<Undo>,
    captured: [[u8; RANK_COUNT]; 2],
    /// Occurrence counts of positions each player has produced, keyed
    /// by that player's observer hash after their move.
    history: [HashMap<u64, u32>; 2],
    next_id: [u8; 2],
}

impl Position {
    /// An empty board. Zobrist keys derive from the seed, so a fixed
    /// seed gives reproducible hashes.
    pub fn new(seed: u64) -> Position {
        Position {
            board: [None; GRID_SIZE],
            turn: Color::Red,
            hash: [0; 2],
            zob: Zobrist::new(seed),
            undo_stack: Vec::with_capacity(256),
            captured: [[0; RANK_COUNT]; 2],
            history: [HashMap::new(), HashMap::new()],
            next_id: [0; 2],
        }
    }

    /// Places a new piece during setup. Returns its assigned id.
    pub fn place(&mut self, sq: usize, color: Color, rank: Rank) -> u8 {
        debug_assert!(grid::is_valid(sq) && self.board[sq].is_none());
        let id = self.next_id[color as usize];
        self.next_id[color as usize] += 1;
        let p = Piece::new(color, id, rank);
        self.set_piece(sq, p);
        id
    }

    #[inline]
    pub fn piece_at(&self, sq: usize) -> Option<&Piece> {
        self.board[sq].as_ref()
    }

    #[inline]
    pub fn is_empty(&self, sq: usize) -> bool {
        grid::is_valid(sq) && self.board[sq].is_none()
    }

    /// The hash of the position as the given observer sees it.
    #[inline]
    pub fn hash(&self, observer: Color) -> u64 {
        self.hash[observer as usize]
    }

    /// Inserts a piece, maintaining both observer hashes.
    pub fn set_piece(&mut self, sq: usize, p: Piece) {
        debug_assert!(self.board[sq].is_none());
        self.hash[0] ^= self.zob.piece_key(Color::Red, &p, sq);
        self.hash[1] ^= self.zob.piece_key(Color::Blue, &p, sq);
        self.board[sq] = Some(p);
    }

    /// Removes and returns the piece on a square, maintaining hashes.
    pub fn clear_piece(&mut self, sq: usize) -> Option<Piece> {
        let p = self.board[sq].take()?;
        self.hash[0] ^= self.zob.piece_key(Color::Red, &p, sq);
        self.hash[1] ^= self.zob.piece_key(Color::Blue, &p, sq);
        Some(p)
    }

    /// Mutates the piece on a square through a closure, keeping both
    /// hashes consistent with the state change.
    pub fn update_piece<F: FnOnce(&mut Piece)>(&mut self, sq: usize, f: F) {
        if let Some(mut p) = self.clear_piece(sq) {
            f(&mut p);
            self.set_piece(sq, p);
        }
    }

    /// Sends a piece to the tray.
    fn capture(&mut self, p: &Piece) {
        self.captured[p.color as usize][p.rank() as usize] += 1;
    }

    /// Tray bookkeeping for the search layer, which resolves combat
    /// itself and must keep `undo` symmetric.
    pub fn note_capture(&mut self, p: &Piece) {
        self.capture(p);
    }

    /// How many pieces of a rank the given side has lost.
    #[inline]
    pub fn captured_count(&self, color: Color, rank: Rank) -> u8 {
        self.captured[color as usize][rank as usize]
    }

    /// How many pieces of a rank the given side still has on the board.
    #[inline]
    pub fn at_large(&self, color: Color, rank: Rank) -> u8 {
        rank.start_count() - self.captured_count(color, rank)
    }

    /// Iterates over (square, piece) for one side.
    pub fn pieces(&self, color: Color) -> impl Iterator<Item = (usize, &Piece)> {
        self.board
            .iter()
            .enumerate()
            .filter_map(move |(sq, p)| p.as_ref().filter(|p| p.color == color).map(|p| (sq, p)))
    }

    /// The most recent non-null applied move.
    pub fn last_move(&self) -> Option<Move> {
        self.undo_stack
            .iter()
            .rev()
            .find(|u| !u.mv.is_null())
            .map(|u| u.mv)
    }

    /// The most recent undo record.
    pub fn last_undo(&self) -> Option<&Undo> {
        self.undo_stack.last()
    }

    /// The n-th most recent non-null move, 0 being the latest.
    pub fn prior_move(&self, n: usize) -> Option<Move> {
        self.undo_stack
            .iter()
            .rev()
            .filter(|u| !u.mv.is_null())
            .nth(n)
            .map(|u| u.mv)
    }

    #[inline]
    pub fn ply(&self) -> usize {
        self.undo_stack.len()
    }

    /// Pushes an undo record. The search layer uses this together with
    /// `set_piece`/`clear_piece` for prediction-based application.
    pub fn push_undo(&mut self, u: Undo) {
        self.undo_stack.push(u);
    }

    fn snapshot(&self, mv: Move, value: i32) -> Undo {
        Undo {
            mv,
            from_piece: self.board[mv.from()],
            to_piece: self.board[mv.to()],
            removed: [None; 2],
            hash: self.hash,
            value,
        }
    }

    /// Applies a real move, resolving any combat with true ranks and
    /// revealing both fighters. Pushes an undo record.
    pub fn apply(&mut self, mv: Move) {
        let mut undo = self.snapshot(mv, 0);
        let mut p = match self.clear_piece(mv.from()) {
            Some(p) => p,
            None => {
                debug_assert!(false, "apply from empty square");
                return;
            }
        };
        p.note_moved();
        if grid::steps(mv.from(), mv.to()) > 1 {
            // Only a Scout moves more than one square; it is revealed.
            p.make_known();
        }
        match self.board[mv.to()] {
            None => self.set_piece(mv.to(), p),
            Some(_) => {
                let mut d = self.clear_piece(mv.to()).unwrap_or_else(|| unreachable!());
                p.make_known();
                d.make_known();
                match combat(p.rank(), d.rank()) {
                    Outcome::Wins => {
                        self.capture(&d);
                        undo.removed[0] = Some(d);
                        self.set_piece(mv.to(), p);
                    }
                    Outcome::Loses => {
                        self.capture(&p);
                        undo.removed[0] = Some(p);
                        self.set_piece(mv.to(), d);
                    }
                    Outcome::Even => {
                        self.capture(&p);
                        self.capture(&d);
                        undo.removed[0] = Some(p);
                        undo.removed[1] = Some(d);
                    }
                }
            }
        }
        self.undo_stack.push(undo);
        self.turn = self.turn.opposite();
    }

    /// Passes the turn without touching the board or hashes.
    pub fn apply_null(&mut self) {
        self.undo_stack.push(Undo {
            mv: NULL_MOVE,
            from_piece: None,
            to_piece: None,
            removed: [None; 2],
            hash: self.hash,
            value: 0,
        });
        self.turn = self.turn.opposite();
    }

    /// Reverts the last applied move exactly, returning its record.
    pub fn undo(&mut self) -> Option<Undo> {
        let u = self.undo_stack.pop()?;
        self.turn = self.turn.opposite();
        if !u.mv.is_null() {
            self.board[u.mv.to()] = u.to_piece;
            self.board[u.mv.from()] = u.from_piece;
            for r in u.removed.iter().flatten() {
                self.captured[r.color as usize][r.rank() as usize] -= 1;
            }
            self.hash = u.hash;
        }
        Some(u)
    }

    /// Records the just-applied move in the mover's repetition history.
    /// Call after `apply` for committed (real) moves only.
    pub fn record_history(&mut self) {
        let mover = self.turn.opposite();
        let h = self.hash(mover);
        *self.history[mover as usize].entry(h).or_insert(0) += 1;
    }

    /// Whether the candidate completes a two-square oscillation: the
    /// mover already played this back-and-forth twice and now tries the
    /// reversing leg a third time.
    pub fn is_two_squares(&self, mv: Move) -> bool {
        let n = self.undo_stack.len();
        if n < 6 {
            return false;
        }
        let prev = &self.undo_stack[n - 2];
        let prevprev = &self.undo_stack[n - 6];
        prev.mv == prevprev.mv && mv == prev.mv.reversed()
    }

    /// Whether the candidate would recreate a position the mover has
    /// already produced. Applies and reverts the move to probe the
    /// resulting hash.
    pub fn is_repetition(&mut self, mv: Move) -> bool {
        let mover = self.turn;
        self.apply(mv);
        let h = self.hash(mover);
        self.undo();
        self.history[mover as usize]
            .get(&h)
            .is_some_and(|&c| c > 0)
    }

    /// Classifies a candidate move for the side to move. `Immobile`
    /// covers true bombs and flags; suspicion-based immobility is the
    /// move generator's concern.
    pub fn classify(&mut self, mv: Move) -> MoveClass {
        let p = match self.board[mv.from()] {
            Some(p) if p.color == self.turn => p,
            _ => return MoveClass::Immobile,
        };
        if !p.rank().is_movable() {
            return MoveClass::Immobile;
        }
        if self.is_two_squares(mv) {
            return MoveClass::TwoSquares;
        }
        if self.is_repetition(mv) {
            return MoveClass::Repeated;
        }
        MoveClass::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::grid::square;

    fn sparring_position() -> Position {
        let mut pos = Position::new(1);
        pos.place(square(0, 0), Color::Red, Rank::Flag);
        pos.place(square(4, 1), Color::Red, Rank::Marshal);
        pos.place(square(4, 2), Color::Red, Rank::Scout);
        pos.place(square(9, 9), Color::Blue, Rank::Flag);
        pos.place(square(4, 8), Color::Blue, Rank::Sergeant);
        pos.place(square(5, 8), Color::Blue, Rank::Miner);
        pos
    }

    #[test]
    fn apply_undo_round_trips_board_and_hashes() {
        let mut pos = sparring_position();
        let h = [pos.hash(Color::Red), pos.hash(Color::Blue)];
        let mv = Move::new(square(4, 1), square(4, 0));
        pos.apply(mv);
        assert_ne!(pos.hash(Color::Red), h[0]);
        pos.undo();
        assert_eq!(pos.hash(Color::Red), h[0]);
        assert_eq!(pos.hash(Color::Blue), h[1]);
        let p = pos.piece_at(square(4, 1)).unwrap();
        assert_eq!(p.rank(), Rank::Marshal);
        assert!(!p.moved);
    }

    #[test]
    fn combat_apply_undo_restores_tray() {
        let mut pos2 = Position::new(1);
        pos2.place(square(4, 7), Color::Red, Rank::Marshal);
        pos2.place(square(4, 8), Color::Blue, Rank::Sergeant);
        let h = [pos2.hash(Color::Red), pos2.hash(Color::Blue)];
        let mv = Move::new(square(4, 7), square(4, 8));
        pos2.apply(mv);
        assert_eq!(pos2.captured_count(Color::Blue, Rank::Sergeant), 1);
        let winner = pos2.piece_at(square(4, 8)).unwrap();
        assert_eq!(winner.rank(), Rank::Marshal);
        assert!(winner.known);
        pos2.undo();
        assert_eq!(pos2.captured_count(Color::Blue, Rank::Sergeant), 0);
        assert_eq!(pos2.hash(Color::Red), h[0]);
        assert_eq!(pos2.hash(Color::Blue), h[1]);
        assert!(!pos2.piece_at(square(4, 8)).unwrap().known);
    }

    #[test]
    fn even_combat_clears_both() {
        let mut pos = Position::new(3);
        pos.place(square(2, 2), Color::Red, Rank::Captain);
        pos.place(square(2, 3), Color::Blue, Rank::Captain);
        pos.apply(Move::new(square(2, 2), square(2, 3)));
        assert!(pos.piece_at(square(2, 2)).is_none());
        assert!(pos.piece_at(square(2, 3)).is_none());
        assert_eq!(pos.captured_count(Color::Red, Rank::Captain), 1);
        assert_eq!(pos.captured_count(Color::Blue, Rank::Captain), 1);
        pos.undo();
        assert!(pos.piece_at(square(2, 3)).is_some());
        assert_eq!(pos.at_large(Color::Red, Rank::Captain), 4);
    }

    #[test]
    fn scout_slide_reveals() {
        let mut pos = Position::new(5);
        pos.place(square(0, 0), Color::Red, Rank::Scout);
        pos.apply(Move::new(square(0, 0), square(0, 5)));
        assert!(pos.piece_at(square(0, 5)).unwrap().known);
        pos.undo();
        assert!(!pos.piece_at(square(0, 0)).unwrap().known);
    }

    #[test]
    fn observer_hashes_differ_while_hidden() {
        let pos = sparring_position();
        assert_ne!(pos.hash(Color::Red), pos.hash(Color::Blue));
    }

    #[test]
    fn two_squares_blocks_fourth_leg() {
        let mut pos = Position::new(9);
        pos.place(square(0, 4), Color::Red, Rank::Captain);
        pos.place(square(9, 6), Color::Blue, Rank::Captain);
        let a = square(0, 4);
        let b = square(0, 3);
        let ba = square(9, 6);
        let bb = square(9, 7);
        // Red oscillates a-b while Blue shuffles on the far file.
        pos.apply(Move::new(a, b)); // leg 1
        pos.apply(Move::new(ba, bb));
        pos.apply(Move::new(b, a)); // leg 2
        pos.apply(Move::new(bb, ba));
        pos.apply(Move::new(a, b)); // leg 3
        pos.apply(Move::new(ba, bb));
        // Fourth leg b->a must now be refused.
        assert!(pos.is_two_squares(Move::new(b, a)));
        // Any other square is fine.
        assert!(!pos.is_two_squares(Move::new(b, square(1, 3))));
    }

    #[test]
    fn repetition_detected_on_second_recreation() {
        let mut pos = Position::new(11);
        pos.place(square(0, 4), Color::Red, Rank::Captain);
        pos.place(square(9, 6), Color::Blue, Rank::Captain);
        let a = square(0, 4);
        let b = square(0, 3);
        let ba = square(9, 6);
        let bb = square(9, 7);
        // Moved flags are hashed, so the earliest possible recreation is
        // the return leg of the second full round trip.
        pos.apply(Move::new(a, b));
        pos.record_history();
        pos.apply(Move::new(ba, bb));
        pos.record_history();
        pos.apply(Move::new(b, a));
        pos.record_history();
        pos.apply(Move::new(bb, ba));
        pos.record_history();
        assert!(!pos.is_repetition(Move::new(a, square(1, 4))));
        pos.apply(Move::new(a, b));
        pos.record_history();
        pos.apply(Move::new(ba, bb));
        pos.record_history();
        // b->a now recreates the position after the first return leg.
        assert!(pos.is_repetition(Move::new(b, a)));
        assert!(!pos.is_repetition(Move::new(b, square(1, 3))));
    }

    #[test]
    fn null_move_keeps_hash_and_flips_turn() {
        let mut pos = sparring_position();
        let h = pos.hash(Color::Red);
        pos.apply_null();
        assert_eq!(pos.turn, Color::Blue);
        assert_eq!(pos.hash(Color::Red), h);
        pos.undo();
        assert_eq!(pos.turn, Color::Red);
    }
}
