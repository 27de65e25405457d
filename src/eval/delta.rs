//! Incremental evaluation during search.
//!
//! The search never resolves combat with true ranks; it applies moves
//! through [`SearchBoard`], which predicts exchanges with
//! [`Evaluator::win_fight`] and keeps a running value from the engine's
//! point of view. Board mutation goes through the position's hashed
//! primitives, so transposition keys stay valid, and every move pushes
//! an undo record that restores board, hashes, tray, and value exactly.

use crate::board::{is_valid, step, steps, Color, Move, Piece, Position, Rank, Undo, DIRS};

use super::plan::PRI_CHASE_ATTACK;
use super::{Evaluator, Fight, VALUE_WIN};

/// Position wrapper the search trees through.
pub struct SearchBoard<'a> {
    pub pos: &'a mut Position,
    pub eval: &'a Evaluator,
    /// Running value, positive when the engine stands better.
    pub value: i32,
}

impl<'a> SearchBoard<'a> {
    pub fn new(pos: &'a mut Position, eval: &'a Evaluator) -> SearchBoard<'a> {
        SearchBoard { pos, eval, value: 0 }
    }

    /// The running value from the side to move's point of view.
    #[inline]
    pub fn value_for_turn(&self) -> i32 {
        if self.pos.turn == self.eval.engine {
            self.value
        } else {
            -self.value
        }
    }

    #[inline]
    fn bump(&mut self, color: Color, gain: i32) {
        if color == self.eval.engine {
            self.value += gain;
        } else {
            self.value -= gain;
        }
    }

    /// Adjacent enemies of `color` at `sq` that the engine cannot read.
    fn unread_neighbors(&self, sq: usize, color: Color) -> i32 {
        DIRS.iter()
            .filter(|&&d| {
                let n = step(sq, d);
                is_valid(n)
                    && self.pos.piece_at(n).is_some_and(|e| {
                        e.color != color && self.eval.effective_rank(e).is_none()
                    })
            })
            .count() as i32
    }

    /// Applies a move with predicted combat resolution and updates the
    /// running value. The matching [`SearchBoard::unmake`] restores
    /// everything.
    pub fn make_move(&mut self, mv: Move, depth: i32) {
        let mut u = Undo {
            mv,
            from_piece: self.pos.piece_at(mv.from()).copied(),
            to_piece: self.pos.piece_at(mv.to()).copied(),
            removed: [None; 2],
            hash: [self.pos.hash(Color::Red), self.pos.hash(Color::Blue)],
            value: self.value,
        };
        let Some(mut p) = self.pos.clear_piece(mv.from()) else {
            debug_assert!(false, "make_move from empty square");
            return;
        };

        if !p.moved {
            self.bump(p.color, -self.eval.unmoved_value_at(mv.from()));
        }
        let slide = steps(mv.from(), mv.to()) > 1;
        if slide && !p.known {
            // A slide outs the Scout.
            self.bump(p.color, -self.eval.stealth_value(&p));
            p.make_known();
        }
        p.note_moved();

        let rank = self.eval.effective_rank(&p).unwrap_or(Rank::Unknown);
        let plan = self.eval.plan(p.color, rank);
        let mut d = plan.delta(mv.from(), mv.to(), depth);
        if slide {
            // A slide only earns one step of plan progress; the rest
            // is distance the Scout cannot hold.
            d = d.min(plan.priority_at(mv.from()));
        }
        self.bump(p.color, d);

        match self.pos.piece_at(mv.to()).copied() {
            None => {
                if self.eval.effective_rank(&p).is_none() || !p.known {
                    let before = self.unread_neighbors(mv.from(), p.color);
                    let after = self.unread_neighbors(mv.to(), p.color);
                    if after > before {
                        self.bump(p.color, -PRI_CHASE_ATTACK);
                    } else if after < before {
                        self.bump(p.color, PRI_CHASE_ATTACK);
                    }
                }
                self.pos.set_piece(mv.to(), p);
            }
            Some(def) => {
                self.resolve(&mut u, p, def);
            }
        }

        self.pos.push_undo(u);
        self.pos.turn = self.pos.turn.opposite();
    }

    /// Predicted combat at the destination square.
    fn resolve(&mut self, u: &mut Undo, mut p: Piece, def: Piece) {
        let to = u.mv.to();
        match self.eval.win_fight(self.pos, &p, &def) {
            Fight::Wins => {
                self.bump(def.color, -self.eval.piece_value(&def));
                if def.apparent_rank(p.color) == Rank::Flag {
                    self.bump(p.color, if def.known { VALUE_WIN } else { VALUE_WIN / 3 });
                }
                self.bump(p.color, -self.eval.stealth_value(&p));
                if !p.known {
                    p.known_unknown = true;
                }
                let removed = self
                    .pos
                    .clear_piece(to)
                    .unwrap_or(def);
                self.pos.note_capture(&removed);
                u.removed[0] = Some(removed);
                self.pos.set_piece(to, p);
            }
            Fight::Loses => {
                self.bump(p.color, -self.eval.piece_value(&p));
                self.bump(def.color, -self.eval.stealth_value(&def));
                self.pos.note_capture(&p);
                u.removed[0] = Some(p);
                if !def.known {
                    self.pos.update_piece(to, |d| d.known_unknown = true);
                }
            }
            Fight::Even => {
                self.bump(p.color, -self.eval.piece_value(&p));
                self.bump(def.color, -self.eval.piece_value(&def));
                let removed = self
                    .pos
                    .clear_piece(to)
                    .unwrap_or(def);
                self.pos.note_capture(&p);
                self.pos.note_capture(&removed);
                u.removed[0] = Some(p);
                u.removed[1] = Some(removed);
            }
            Fight::Unknown => {
                // Unpredictable fights are booked as an exchange: both
                // pieces off, each at its accounted value. A cheap
                // probe into an unknown pays, a Marshal plunge does
                // not.
                self.bump(p.color, -self.eval.piece_value(&p));
                self.bump(def.color, -self.eval.piece_value(&def));
                let removed = self
                    .pos
                    .clear_piece(to)
                    .unwrap_or(def);
                self.pos.note_capture(&p);
                self.pos.note_capture(&removed);
                u.removed[0] = Some(p);
                u.removed[1] = Some(removed);
            }
        }
    }

    /// Passes the turn. Value is unchanged.
    pub fn make_null(&mut self) {
        self.pos.apply_null();
    }

    /// Reverts the last made move, restoring the running value.
    pub fn unmake(&mut self) {
        if let Some(u) = self.pos.undo() {
            if !u.mv.is_null() {
                self.value = u.value;
            }
        }
    }

    /// Whether the last made move took a flag, apparent or real.
    pub fn flag_captured(&self) -> bool {
        self.pos.last_undo().is_some_and(|u| {
            let mover = self.pos.turn.opposite();
            u.removed
                .iter()
                .flatten()
                .any(|r| r.color != mover && r.apparent_rank(mover) == Rank::Flag)
        })
    }
}
