//! Quiescence search.
//!
//! At the horizon only captures are searched, to a fixed extra depth,
//! so the static value is never read off a position with a piece
//! hanging. One escape hatch keeps it honest: when every capture fails
//! the side to move, its most endangered piece may try to step away
//! instead, so a merely attacked piece is not scored as already lost.
//! Results are cached as deltas over the stand-pat value; the observer
//! hashes cover everything prediction reads, so a hash pair plus the
//! side to move fully keys a quiescence outcome.

use std::collections::HashMap;

use crate::board::{is_valid, step, Color, Position, DIRS};
use crate::eval::{Fight, SearchBoard, VALUE_WIN};
use crate::movegen;

/// Extra plies of captures past the horizon.
pub const QS_MAX: i32 = 3;

#[derive(Clone, Copy, Hash, PartialEq, Eq)]
struct QsKey {
    red: u64,
    blue: u64,
    turn: Color,
}

#[derive(Clone, Copy)]
enum QsBound {
    Exact(i32),
    Lower(i32),
}

/// Per-root cache of quiescence deltas.
pub struct QsCache {
    map: HashMap<QsKey, QsBound>,
}

impl QsCache {
    pub fn new() -> QsCache {
        QsCache {
            map: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for QsCache {
    fn default() -> QsCache {
        QsCache::new()
    }
}

fn key(pos: &Position) -> QsKey {
    QsKey {
        red: pos.hash(Color::Red),
        blue: pos.hash(Color::Blue),
        turn: pos.turn,
    }
}

/// Capture-only search from the side to move's point of view.
pub fn quiesce(
    sb: &mut SearchBoard,
    mut alpha: i32,
    beta: i32,
    qs_depth: i32,
    cache: &mut QsCache,
) -> i32 {
    let stand = sb.value_for_turn();
    if qs_depth >= QS_MAX {
        return stand;
    }

    let k = key(sb.pos);
    if qs_depth == 0 {
        match cache.map.get(&k) {
            Some(QsBound::Exact(d)) => return stand + d,
            Some(QsBound::Lower(d)) if stand + d >= beta => return stand + d,
            _ => {}
        }
    }

    let mut best = stand;
    alpha = alpha.max(stand);
    let mut cut = false;

    let turn = sb.pos.turn;
    let captures: Vec<_> = movegen::side_moves(sb.pos, turn)
        .into_iter()
        .filter(|mv| {
            sb.pos
                .piece_at(mv.to())
                .is_some_and(|d| d.color != turn)
        })
        .collect();

    for mv in captures {
        // A predicted losing attack cannot raise the attacker's score.
        let skip = match (sb.pos.piece_at(mv.from()), sb.pos.piece_at(mv.to())) {
            (Some(a), Some(d)) => sb.eval.win_fight(sb.pos, a, d) == Fight::Loses,
            _ => true,
        };
        if skip {
            continue;
        }
        sb.make_move(mv, 1);
        let v = if sb.flag_captured() {
            VALUE_WIN - qs_depth
        } else {
            -quiesce(sb, -beta, -alpha, qs_depth + 1, cache)
        };
        sb.unmake();
        if v > best {
            best = v;
        }
        if v > alpha {
            alpha = v;
        }
        if alpha >= beta {
            cut = true;
            break;
        }
    }

    if !cut && best == stand {
        if let Some(escape) = flee_alternative(sb, alpha, beta, qs_depth, cache) {
            best = best.max(escape);
        }
    }

    if qs_depth == 0 {
        let bound = if cut {
            QsBound::Lower(best - stand)
        } else {
            QsBound::Exact(best - stand)
        };
        cache.map.insert(k, bound);
    }
    best
}

/// When captures do nothing for the mover, its most valuable piece
/// standing in a losing matchup gets to try stepping to an empty
/// square. Returns the best escape line, or None when nothing hangs.
fn flee_alternative(
    sb: &mut SearchBoard,
    mut alpha: i32,
    beta: i32,
    qs_depth: i32,
    cache: &mut QsCache,
) -> Option<i32> {
    let turn = sb.pos.turn;
    let mut hanging: Option<(usize, i32)> = None;
    for (sq, p) in sb.pos.pieces(turn) {
        let threatened = DIRS.iter().any(|&d| {
            let n = step(sq, d);
            is_valid(n)
                && sb.pos.piece_at(n).is_some_and(|e| {
                    e.color != turn && sb.eval.win_fight(sb.pos, e, p) == Fight::Wins
                })
        });
        if !threatened {
            continue;
        }
        let v = sb.eval.piece_value(p);
        if hanging.map_or(true, |(_, hv)| v > hv) {
            hanging = Some((sq, v));
        }
    }
    let (sq, _) = hanging?;

    let mut candidates = Vec::new();
    movegen::piece_moves(sb.pos, sq, &mut candidates);
    let escapes: Vec<_> = candidates
        .into_iter()
        .filter(|mv| sb.pos.is_empty(mv.to()))
        .collect();
    let mut best = None;
    for mv in escapes {
        sb.make_move(mv, 1);
        let v = -quiesce(sb, -beta, -alpha, qs_depth + 1, cache);
        sb.unmake();
        if best.map_or(true, |b| v > b) {
            best = Some(v);
        }
        alpha = alpha.max(v);
        if alpha >= beta {
            break;
        }
    }
    best
}
