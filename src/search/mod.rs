//! Iterative-deepening alpha-beta search.
//!
//! The searcher deepens one ply at a time against a wall-clock
//! deadline. Cancellation is cooperative: running past the deadline
//! surfaces as an `Err` that unwinds the tree, with every frame
//! unmaking its move on the way out, so the position is intact no
//! matter where the clock fired. A partially searched ply is normally
//! discarded; it is kept when it confirms the previous best move or
//! lands within a small margin of its score, which blunts the horizon
//! flip-flop of abandoning a deep ply for a shallow one. The first two
//! plies are always kept.
//!
//! When the principal line settles into a chase, the search switches to
//! a restricted move set around the chase target and deepens further on
//! the same budget; the restriction is abandoned once the target is out
//! of reach.

pub mod ordering;
pub mod quiesce;
pub mod tt;

pub use tt::{Bound, Mode, TransTable};

use std::io::Write;
use std::time::{Duration, Instant};

use crate::board::{steps, Color, Move, Position, GRID_SIZE, NULL_MOVE};
use crate::eval::{Evaluator, SearchBoard, VALUE_WIN};
use crate::movegen;
use ordering::{History, Killers, OrderedMoves, MAX_PLY};
use quiesce::{quiesce, QsCache};

pub const INFINITY: i32 = 1_000_000;

/// Margin within which a partially searched ply displaces the previous
/// iteration's result.
const DISCARD_MARGIN: i32 = 15;

/// The chase restriction covers squares this close to the target and
/// is abandoned beyond it.
const CHASE_RADIUS: u8 = 4;

const NODE_CHECK_MASK: u64 = 0x3FF;

/// The wall clock ran out.
#[derive(Clone, Copy, Debug)]
pub struct Deadline;

type SearchStep<T> = Result<T, Deadline>;

/// Outcome of one search request.
pub struct SearchReport {
    pub best: Option<Move>,
    pub value: i32,
    pub depth: i32,
    pub nodes: u64,
}

/// Transposition key: both observer hashes folded with the side to
/// move. Prediction reads both sides' beliefs, so both hashes matter.
fn tt_key(pos: &Position) -> u64 {
    let mut k = pos.hash(Color::Red) ^ pos.hash(Color::Blue).rotate_left(32);
    if pos.turn == Color::Blue {
        k ^= 0x9E37_79B9_7F4A_7C15;
    }
    k
}

struct Searcher<'a, 'b> {
    sb: SearchBoard<'b>,
    tt: &'a mut TransTable,
    history: History,
    killers: Killers,
    qs: QsCache,
    deadline: Instant,
    nodes: u64,
    mode: Mode,
    region: Option<Box<[bool; GRID_SIZE]>>,
}

impl<'a, 'b> Searcher<'a, 'b> {
    fn tick(&mut self) -> SearchStep<()> {
        self.nodes += 1;
        if self.nodes & NODE_CHECK_MASK == 0 && Instant::now() >= self.deadline {
            return Err(Deadline);
        }
        Ok(())
    }

    fn moves_at(&mut self) -> Vec<Move> {
        let turn = self.sb.pos.turn;
        let mut moves = movegen::search_moves(self.sb.pos, turn, self.sb.eval.engine);
        moves.retain(|&mv| !self.sb.pos.is_two_squares(mv));
        if let Some(region) = &self.region {
            let restricted = ordering::region_filter(moves.clone(), region);
            // An empty restriction falls back to the full list rather
            // than declaring the side immobile.
            if !restricted.is_empty() {
                return restricted;
            }
        }
        moves
    }

    fn negamax(&mut self, depth: i32, mut alpha: i32, beta: i32, ply: usize) -> SearchStep<i32> {
        self.tick()?;
        if depth <= 0 || ply >= MAX_PLY - 1 {
            return Ok(quiesce(&mut self.sb, alpha, beta, 0, &mut self.qs));
        }

        let key = tt_key(self.sb.pos);
        let mut tt_move = NULL_MOVE;
        if let Some(hit) = self.tt.probe(key, self.mode) {
            tt_move = hit.mv;
            if hit.depth >= depth {
                match hit.bound {
                    Bound::Exact => return Ok(hit.value),
                    Bound::Lower if hit.value >= beta => return Ok(hit.value),
                    Bound::Upper if hit.value <= alpha => return Ok(hit.value),
                    _ => {}
                }
            }
        }

        let moves = self.moves_at();
        if moves.is_empty() && movegen::side_moves(self.sb.pos, self.sb.pos.turn).is_empty() {
            // No piece can move at all; the mover loses. A list emptied
            // by prediction pruning is not immobility, the pass below
            // covers it.
            return Ok(-VALUE_WIN + ply as i32);
        }

        let ordered = OrderedMoves::new(
            self.sb.pos,
            moves,
            &self.history,
            &self.killers,
            tt_move,
            ply,
        );

        let orig_alpha = alpha;
        let mut best = -INFINITY;
        let mut best_mv = NULL_MOVE;
        for mv in ordered {
            let quiet = self.sb.pos.is_empty(mv.to());
            self.sb.make_move(mv, ply as i32 + 1);
            let r = if self.sb.flag_captured() {
                Ok(VALUE_WIN - ply as i32)
            } else {
                self.negamax(depth - 1, -beta, -alpha, ply + 1).map(|v| -v)
            };
            self.sb.unmake();
            let v = r?;
            if v > best {
                best = v;
                best_mv = mv;
            }
            if v > alpha {
                alpha = v;
            }
            if alpha >= beta {
                if quiet {
                    self.killers.note(ply, mv);
                    self.history.good(mv, depth);
                }
                break;
            }
        }

        // The mover may also pass: board and hashes stay put, only the
        // turn flips. This stands in for opponent activity the pruned
        // move list does not enumerate.
        if best < beta {
            self.sb.make_null();
            let r = self.negamax(depth - 1, -beta, -alpha, ply + 1).map(|v| -v);
            self.sb.unmake();
            let v = r?;
            if v > best {
                best = v;
                best_mv = NULL_MOVE;
            }
        }

        let bound = if best >= beta {
            Bound::Lower
        } else if best <= orig_alpha {
            Bound::Upper
        } else {
            Bound::Exact
        };
        self.tt.store(key, depth, best, bound, self.mode, best_mv);
        Ok(best)
    }

    /// One full-width iteration over the root moves. Returns per-move
    /// scores; on deadline, whatever was finished plus the error.
    fn root_iteration(
        &mut self,
        depth: i32,
        moves: &[Move],
    ) -> (Vec<(Move, i32)>, Option<Deadline>) {
        let mut done = Vec::with_capacity(moves.len());
        let mut alpha = -INFINITY;
        for &mv in moves {
            if Instant::now() >= self.deadline {
                return (done, Some(Deadline));
            }
            self.sb.make_move(mv, 1);
            let r = if self.sb.flag_captured() {
                Ok(VALUE_WIN)
            } else {
                self.negamax(depth - 1, -INFINITY, -alpha, 1).map(|v| -v)
            };
            self.sb.unmake();
            match r {
                Ok(v) => {
                    alpha = alpha.max(v);
                    done.push((mv, v));
                }
                Err(e) => return (done, Some(e)),
            }
        }
        (done, None)
    }
}

/// Chooses the standing result when the clock cuts an iteration short.
/// The first two plies are cheap enough to trust outright; a deeper
/// partial ply must confirm the standing move or score within the
/// margin of it.
fn adopt_partial(
    depth: i32,
    partial: Option<(Move, i32)>,
    best: Option<(Move, i32)>,
) -> Option<(Move, i32)> {
    let Some((pmv, pv)) = partial else {
        return best;
    };
    let keep = depth <= 2
        || best.map_or(true, |(bmv, bv)| pmv == bmv || pv > bv - DISCARD_MARGIN);
    if keep {
        Some((pmv, pv))
    } else {
        best
    }
}

/// Highest-scoring entry, first one on ties so the incumbent ordering
/// stays stable.
fn best_of(scores: &[(Move, i32)]) -> Option<(Move, i32)> {
    let mut best = None;
    for &(mv, v) in scores {
        if best.map_or(true, |(_, bv)| v > bv) {
            best = Some((mv, v));
        }
    }
    best
}

/// Builds the restriction region when the best line is a chase: the
/// nearest enemy piece to the move's destination anchors a radius, and
/// a target already out of reach yields no region.
fn chase_region(pos: &Position, best: Move) -> Option<Box<[bool; GRID_SIZE]>> {
    let mover = pos.turn;
    let target = pos
        .pieces(mover.opposite())
        .map(|(sq, _)| sq)
        .min_by_key(|&sq| steps(best.to(), sq))?;
    if steps(best.to(), target) > CHASE_RADIUS {
        return None;
    }
    let mut region: Box<[bool; GRID_SIZE]> = vec![false; GRID_SIZE]
        .into_boxed_slice()
        .try_into()
        .unwrap_or_else(|_| unreachable!());
    for sq in 0..GRID_SIZE {
        region[sq] = steps(sq, target) <= CHASE_RADIUS;
    }
    Some(region)
}

/// Iterative-deepening search against a wall-clock budget. Writes one
/// info line per completed iteration.
pub fn search<W: Write>(
    pos: &mut Position,
    eval: &Evaluator,
    tt: &mut TransTable,
    budget: Duration,
    max_depth: i32,
    out: &mut W,
) -> SearchReport {
    let started = Instant::now();
    let deadline = started + budget;
    let root = movegen::root_moves(pos);
    if root.is_empty() {
        return SearchReport {
            best: None,
            value: -VALUE_WIN,
            depth: 0,
            nodes: 0,
        };
    }

    let mut searcher = Searcher {
        sb: SearchBoard::new(pos, eval),
        tt,
        history: History::new(),
        killers: Killers::new(),
        qs: QsCache::new(),
        deadline,
        nodes: 0,
        mode: Mode::Broad,
        region: None,
    };

    let mut ordered: Vec<Move> = root;
    let mut best: Option<(Move, i32)> = None;
    let mut completed_depth = 0;

    for depth in 1..=max_depth {
        let (scores, interrupted) = searcher.root_iteration(depth, &ordered);
        let partial = best_of(&scores);
        if interrupted.is_some() {
            best = adopt_partial(depth, partial, best);
            break;
        }
        best = partial;
        completed_depth = depth;
        searcher.history.decay();
        let mut by_score = scores;
        by_score.sort_by_key(|&(_, v)| -v);
        ordered = by_score.iter().map(|&(mv, _)| mv).collect();
        if let Some((mv, v)) = best {
            writeln!(
                out,
                "info depth {} score {} nodes {} time {} pv {}",
                depth,
                v,
                searcher.nodes,
                started.elapsed().as_millis(),
                mv
            )
            .ok();
            if v.abs() >= VALUE_WIN - MAX_PLY as i32 {
                break;
            }
        }
    }

    // Chase extension: restrict to the fight around the target and
    // spend whatever clock is left going deeper.
    if let Some((bmv, bv)) = best {
        if Instant::now() < searcher.deadline && completed_depth >= 2 {
            if let Some(region) = chase_region(searcher.sb.pos, bmv) {
                let deep_root = ordering::region_filter(ordered.clone(), &region);
                searcher.mode = Mode::Deep;
                searcher.region = Some(region);
                if !deep_root.is_empty() {
                    for depth in (completed_depth + 1)..=(max_depth + 6) {
                        let (scores, interrupted) = searcher.root_iteration(depth, &deep_root);
                        let partial = best_of(&scores);
                        if interrupted.is_some() {
                            if let Some((pmv, pv)) = partial {
                                if pmv == bmv || pv > bv - DISCARD_MARGIN {
                                    best = Some((pmv, pv));
                                }
                            }
                            break;
                        }
                        if let Some((mv, v)) = partial {
                            if v > bv - DISCARD_MARGIN {
                                best = Some((mv, v));
                            }
                            writeln!(
                                out,
                                "info depth {} score {} nodes {} time {} pv {} chase",
                                depth,
                                v,
                                searcher.nodes,
                                started.elapsed().as_millis(),
                                mv
                            )
                            .ok();
                        }
                    }
                }
            }
        }
    }

    let nodes = searcher.nodes;
    match best {
        Some((mv, v)) => SearchReport {
            best: Some(mv),
            value: v,
            depth: completed_depth,
            nodes,
        },
        None => SearchReport {
            best: None,
            value: 0,
            depth: 0,
            nodes,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{square, Rank};
    use crate::infer::InferState;

    fn arena() -> Position {
        let mut pos = Position::new(41);
        pos.place(square(0, 0), Color::Red, Rank::Flag);
        pos.place(square(9, 9), Color::Blue, Rank::Flag);
        pos
    }

    fn run(pos: &mut Position, depth: i32) -> SearchReport {
        let eval = Evaluator::new(pos, Color::Red, &InferState::new());
        let mut tt = TransTable::with_bits(14);
        let mut out = Vec::new();
        search(
            pos,
            &eval,
            &mut tt,
            Duration::from_secs(5),
            depth,
            &mut out,
        )
    }

    #[test]
    fn finds_the_hanging_capture() {
        let mut pos = arena();
        pos.place(square(4, 4), Color::Red, Rank::General);
        pos.update_piece(square(4, 4), |p| p.make_known());
        pos.place(square(4, 5), Color::Blue, Rank::Captain);
        pos.update_piece(square(4, 5), |p| p.make_known());
        let report = run(&mut pos, 3);
        assert_eq!(report.best, Some(Move::new(square(4, 4), square(4, 5))));
        assert!(report.value > 0);
    }

    #[test]
    fn takes_the_known_flag() {
        let mut pos = arena();
        pos.update_piece(square(9, 9), |p| p.make_known());
        pos.place(square(9, 8), Color::Red, Rank::Sergeant);
        pos.update_piece(square(9, 8), |p| p.make_known());
        pos.place(square(0, 9), Color::Blue, Rank::Scout);
        let report = run(&mut pos, 3);
        assert_eq!(report.best, Some(Move::new(square(9, 8), square(9, 9))));
        assert!(report.value >= VALUE_WIN - MAX_PLY as i32);
    }

    #[test]
    fn no_moves_reports_no_best() {
        let mut pos = arena();
        // Red has only its flag: nothing can move.
        let report = run(&mut pos, 3);
        assert!(report.best.is_none());
    }

    #[test]
    fn deadline_zero_still_terminates() {
        let mut pos = arena();
        pos.place(square(4, 4), Color::Red, Rank::Captain);
        pos.place(square(4, 7), Color::Blue, Rank::Captain);
        let eval = Evaluator::new(&mut pos, Color::Red, &InferState::new());
        let mut tt = TransTable::with_bits(12);
        let mut out = Vec::new();
        let report = search(
            &mut pos,
            &eval,
            &mut tt,
            Duration::from_millis(0),
            30,
            &mut out,
        );
        // Position must be untouched regardless of where the clock hit.
        assert!(pos.piece_at(square(4, 4)).is_some());
        let _ = report;
    }

    #[test]
    fn search_leaves_position_unchanged() {
        let mut pos = arena();
        pos.place(square(4, 4), Color::Red, Rank::General);
        pos.update_piece(square(4, 4), |p| p.make_known());
        pos.place(square(4, 6), Color::Blue, Rank::Captain);
        pos.update_piece(square(4, 6), |p| p.make_known());
        let h = [pos.hash(Color::Red), pos.hash(Color::Blue)];
        let ply = pos.ply();
        let _ = run(&mut pos, 4);
        assert_eq!(pos.hash(Color::Red), h[0]);
        assert_eq!(pos.hash(Color::Blue), h[1]);
        assert_eq!(pos.ply(), ply);
    }

    #[test]
    fn deeper_search_does_not_walk_into_a_guarded_trade() {
        let mut pos = arena();
        // Red Captain can grab a known Sergeant, but a known Blue
        // General guards it.
        pos.place(square(4, 4), Color::Red, Rank::Captain);
        pos.update_piece(square(4, 4), |p| p.make_known());
        pos.place(square(4, 5), Color::Blue, Rank::Sergeant);
        pos.update_piece(square(4, 5), |p| p.make_known());
        pos.place(square(4, 6), Color::Blue, Rank::General);
        pos.update_piece(square(4, 6), |p| p.make_known());
        let report = run(&mut pos, 4);
        assert_ne!(report.best, Some(Move::new(square(4, 4), square(4, 5))));
    }

    fn fixture<'a, 'b>(
        pos: &'b mut Position,
        eval: &'b Evaluator,
        tt: &'a mut TransTable,
    ) -> Searcher<'a, 'b> {
        Searcher {
            sb: SearchBoard::new(pos, eval),
            tt,
            history: History::new(),
            killers: Killers::new(),
            qs: QsCache::new(),
            deadline: Instant::now() + Duration::from_secs(600),
            nodes: 0,
            mode: Mode::Broad,
            region: None,
        }
    }

    /// Plain full-width minimax over the same move set, window-free.
    fn exhaustive(s: &mut Searcher, depth: i32, ply: usize) -> i32 {
        if depth <= 0 {
            return quiesce(&mut s.sb, -INFINITY, INFINITY, 0, &mut s.qs);
        }
        let moves = s.moves_at();
        if moves.is_empty() && movegen::side_moves(s.sb.pos, s.sb.pos.turn).is_empty() {
            return -VALUE_WIN + ply as i32;
        }
        let mut best = -INFINITY;
        for mv in moves {
            s.sb.make_move(mv, ply as i32 + 1);
            let v = if s.sb.flag_captured() {
                VALUE_WIN - ply as i32
            } else {
                -exhaustive(s, depth - 1, ply + 1)
            };
            s.sb.unmake();
            best = best.max(v);
        }
        s.sb.make_null();
        let v = -exhaustive(s, depth - 1, ply + 1);
        s.sb.unmake();
        best.max(v)
    }

    #[test]
    fn alpha_beta_matches_exhaustive_minimax_at_fixed_depth() {
        for depth in [2, 3] {
            let mut pos = arena();
            pos.place(square(2, 2), Color::Red, Rank::Captain);
            pos.update_piece(square(2, 2), |p| p.make_known());
            pos.place(square(7, 7), Color::Blue, Rank::Captain);
            pos.update_piece(square(7, 7), |p| p.make_known());
            let eval = Evaluator::new(&mut pos, Color::Red, &InferState::new());
            let wide = {
                let mut tt = TransTable::with_bits(12);
                let mut s = fixture(&mut pos, &eval, &mut tt);
                exhaustive(&mut s, depth, 0)
            };
            let narrow = {
                let mut tt = TransTable::with_bits(12);
                let mut s = fixture(&mut pos, &eval, &mut tt);
                s.negamax(depth, -INFINITY, INFINITY, 0).unwrap()
            };
            assert_eq!(narrow, wide, "depth {} diverged", depth);
        }
    }

    #[test]
    fn a_pruned_out_side_passes_instead_of_losing() {
        let mut pos = arena();
        // Blue's only movable piece is an unread unmoved Captain far
        // from everything; prediction gives it no moves, but Blue does
        // not lose for it.
        pos.place(square(4, 8), Color::Blue, Rank::Captain);
        pos.place(square(0, 5), Color::Red, Rank::Captain);
        pos.update_piece(square(0, 5), |p| p.make_known());
        pos.turn = Color::Blue;
        let eval = Evaluator::new(&mut pos, Color::Red, &InferState::new());
        let mut tt = TransTable::with_bits(12);
        let mut s = fixture(&mut pos, &eval, &mut tt);
        assert!(s.moves_at().is_empty());
        let v = s.negamax(2, -INFINITY, INFINITY, 0).unwrap();
        assert!(v > -VALUE_WIN / 2, "pass should avert a loss score, got {}", v);
    }

    #[test]
    fn early_partial_plies_are_always_adopted() {
        let a = Move::new(12, 13);
        let b = Move::new(24, 35);
        // The first two plies take even a much worse new move.
        assert_eq!(adopt_partial(1, Some((b, -500)), None), Some((b, -500)));
        assert_eq!(adopt_partial(2, Some((b, -500)), Some((a, 100))), Some((b, -500)));
        // Deeper plies demand confirmation or a near score.
        assert_eq!(adopt_partial(3, Some((b, -500)), Some((a, 100))), Some((a, 100)));
        assert_eq!(adopt_partial(3, Some((a, -500)), Some((a, 100))), Some((a, -500)));
        assert_eq!(adopt_partial(3, Some((b, 95)), Some((a, 100))), Some((b, 95)));
        // Nothing finished keeps the standing result.
        assert_eq!(adopt_partial(3, None, Some((a, 100))), Some((a, 100)));
    }
}
