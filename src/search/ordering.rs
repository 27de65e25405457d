//! Move ordering.
//!
//! Moves sort into buckets by what they do to the nearest enemy
//! (attack, approach, flee, other), with the table move first, killers
//! promoted within their bucket, and a history score breaking ties.
//! Selection happens lazily: a cutoff on the first move never pays for
//! sorting the rest.

use crate::board::{steps, Color, Move, Position, GRID_SIZE, NULL_MOVE};

/// Deepest ply the killer slots cover.
pub const MAX_PLY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bucket {
    Attack,
    Approach,
    Flee,
    Other,
}

/// Buckets a move by its effect on the closest enemy piece.
pub fn bucket(pos: &Position, mv: Move, mover: Color) -> Bucket {
    if pos
        .piece_at(mv.to())
        .is_some_and(|p| p.color != mover)
    {
        return Bucket::Attack;
    }
    let nearest = |sq: usize| {
        pos.pieces(mover.opposite())
            .map(|(esq, _)| steps(sq, esq))
            .min()
            .unwrap_or(u8::MAX)
    };
    let before = nearest(mv.from());
    let after = nearest(mv.to());
    if after < before {
        Bucket::Approach
    } else if after > before {
        Bucket::Flee
    } else {
        Bucket::Other
    }
}

/// Butterfly history indexed by the packed move.
pub struct History {
    table: Box<[i32]>,
}

impl History {
    pub fn new() -> History {
        History {
            table: vec![0; 1 << 16].into_boxed_slice(),
        }
    }

    pub fn good(&mut self, mv: Move, depth: i32) {
        let slot = &mut self.table[mv.packed() as usize];
        *slot = slot.saturating_add(depth * depth);
    }

    #[inline]
    pub fn score(&self, mv: Move) -> i32 {
        self.table[mv.packed() as usize]
    }

    /// Halves every counter so old preferences fade between roots.
    pub fn decay(&mut self) {
        for v in self.table.iter_mut() {
            *v /= 2;
        }
    }
}

impl Default for History {
    fn default() -> History {
        History::new()
    }
}

/// Two killer moves per ply.
pub struct Killers {
    slots: [[Move; 2]; MAX_PLY],
}

impl Killers {
    pub fn new() -> Killers {
        Killers {
            slots: [[NULL_MOVE; 2]; MAX_PLY],
        }
    }

    pub fn note(&mut self, ply: usize, mv: Move) {
        if ply >= MAX_PLY {
            return;
        }
        let s = &mut self.slots[ply];
        if s[0] != mv {
            s[1] = s[0];
            s[0] = mv;
        }
    }

    pub fn is_killer(&self, ply: usize, mv: Move) -> bool {
        ply < MAX_PLY && (self.slots[ply][0] == mv || self.slots[ply][1] == mv)
    }
}

impl Default for Killers {
    fn default() -> Killers {
        Killers::new()
    }
}

const SCORE_TT: i32 = i32::MAX;
const SCORE_ATTACK: i32 = 3_000_000;
const SCORE_APPROACH: i32 = 2_000_000;
const SCORE_FLEE: i32 = 1_000_000;
const SCORE_KILLER: i32 = 500_000;

/// A scored move list with lazy best-first selection.
pub struct OrderedMoves {
    moves: Vec<(Move, i32)>,
    next: usize,
}

impl OrderedMoves {
    pub fn new(
        pos: &Position,
        moves: Vec<Move>,
        history: &History,
        killers: &Killers,
        tt_move: Move,
        ply: usize,
    ) -> OrderedMoves {
        let mover = pos.turn;
        let scored = moves
            .into_iter()
            .map(|mv| {
                let score = if mv == tt_move {
                    SCORE_TT
                } else {
                    let base = match bucket(pos, mv, mover) {
                        Bucket::Attack => SCORE_ATTACK,
                        Bucket::Approach => SCORE_APPROACH,
                        Bucket::Flee => SCORE_FLEE,
                        Bucket::Other => 0,
                    };
                    let killer = if killers.is_killer(ply, mv) {
                        SCORE_KILLER
                    } else {
                        0
                    };
                    base + killer + history.score(mv).min(SCORE_KILLER - 1)
                };
                (mv, score)
            })
            .collect();
        OrderedMoves {
            moves: scored,
            next: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl Iterator for OrderedMoves {
    type Item = Move;

    fn next(&mut self) -> Option<Move> {
        if self.next >= self.moves.len() {
            return None;
        }
        let mut best = self.next;
        for i in (self.next + 1)..self.moves.len() {
            if self.moves[i].1 > self.moves[best].1 {
                best = i;
            }
        }
        self.moves.swap(self.next, best);
        let (mv, _) = self.moves[self.next];
        self.next += 1;
        Some(mv)
    }
}

/// Region mask for chase-restricted search: only moves that start or
/// end inside the region are searched.
pub fn region_filter(moves: Vec<Move>, region: &[bool; GRID_SIZE]) -> Vec<Move> {
    moves
        .into_iter()
        .filter(|mv| region[mv.from()] || region[mv.to()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{square, Rank};

    fn duel() -> Position {
        let mut pos = Position::new(17);
        pos.place(square(4, 4), Color::Red, Rank::Captain);
        pos.place(square(4, 6), Color::Blue, Rank::Sergeant);
        pos
    }

    #[test]
    fn buckets_track_enemy_distance() {
        let mut pos = duel();
        pos.place(square(4, 5), Color::Blue, Rank::Scout);
        let attack = Move::new(square(4, 4), square(4, 5));
        assert_eq!(bucket(&pos, attack, Color::Red), Bucket::Attack);

        let pos = duel();
        let approach = Move::new(square(4, 4), square(4, 5));
        assert_eq!(bucket(&pos, approach, Color::Red), Bucket::Approach);
        let flee = Move::new(square(4, 4), square(4, 3));
        assert_eq!(bucket(&pos, flee, Color::Red), Bucket::Flee);

        // With no enemy on the board every quiet move is Other.
        let mut lone = Position::new(17);
        lone.place(square(4, 4), Color::Red, Rank::Captain);
        let sidestep = Move::new(square(4, 4), square(5, 4));
        assert_eq!(bucket(&lone, sidestep, Color::Red), Bucket::Other);
    }

    #[test]
    fn tt_move_comes_out_first() {
        let pos = duel();
        let moves = vec![
            Move::new(square(4, 4), square(4, 5)),
            Move::new(square(4, 4), square(4, 3)),
            Move::new(square(4, 4), square(3, 4)),
        ];
        let tt_move = Move::new(square(4, 4), square(3, 4));
        let mut om = OrderedMoves::new(
            &pos,
            moves,
            &History::new(),
            &Killers::new(),
            tt_move,
            0,
        );
        assert_eq!(om.next(), Some(tt_move));
        // Then the approach beats the retreat.
        assert_eq!(om.next(), Some(Move::new(square(4, 4), square(4, 5))));
    }

    #[test]
    fn history_orders_within_a_bucket() {
        let pos = duel();
        let a = Move::new(square(4, 4), square(4, 3));
        let b = Move::new(square(4, 4), square(5, 4));
        let mut history = History::new();
        history.good(b, 4);
        let mut om = OrderedMoves::new(
            &pos,
            vec![a, b],
            &history,
            &Killers::new(),
            NULL_MOVE,
            0,
        );
        assert_eq!(om.next(), Some(b));
    }

    #[test]
    fn decay_halves_history_scores() {
        let mut h = History::new();
        let mv = Move::new(7, 8);
        h.good(mv, 4);
        assert_eq!(h.score(mv), 16);
        h.decay();
        assert_eq!(h.score(mv), 8);
    }

    #[test]
    fn killers_rotate() {
        let mut k = Killers::new();
        let a = Move::new(1, 2);
        let b = Move::new(3, 4);
        let c = Move::new(5, 6);
        k.note(2, a);
        k.note(2, b);
        assert!(k.is_killer(2, a) && k.is_killer(2, b));
        k.note(2, c);
        assert!(k.is_killer(2, c) && k.is_killer(2, b));
        assert!(!k.is_killer(2, a));
    }
}
