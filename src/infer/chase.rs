//! Chase-rank acquisition.
//!
//! A piece that moves adjacent to exactly one enemy piece is read as
//! chasing it: it acquires the chased piece's apparent rank as its
//! acting chase rank, and an unknown chaser additionally picks up a
//! suspected rank one grade stronger than its prey. Two exceptions keep
//! the signal honest: a piece that was itself under threat is fleeing,
//! not chasing, and approaching a protected piece commits to nothing.
//!
//! The protector read runs the other way: a side that leaves a chased
//! piece in place under the cover of an unknown neighbor is telling us
//! what that neighbor must be.

use crate::board::{Color, Move, Position, Rank, DIRS};

use super::suspect;
use super::InferState;

/// Adjacent enemy squares of `sq`, from the perspective of `color`.
fn adjacent_enemies(pos: &Position, sq: usize, color: Color) -> Vec<usize> {
    DIRS.iter()
        .map(|&d| (sq as isize + d) as usize)
        .filter(|&n| {
            crate::board::is_valid(n) && pos.piece_at(n).is_some_and(|p| p.color != color)
        })
        .collect()
}

/// Whether the piece at `sq` (owned by `color`) stands next to a known
/// enemy whose rank beats its apparent rank. Such a piece moving away
/// is fleeing, and its arrival square says nothing about its strength.
fn is_threatened(pos: &Position, sq: usize, color: Color, apparent: Rank) -> bool {
    adjacent_enemies(pos, sq, color).into_iter().any(|e| {
        let p = pos.piece_at(e).unwrap_or_else(|| unreachable!());
        p.known && (p.rank() as u8) < (apparent as u8) && p.rank().is_numbered()
    })
}

/// Whether the enemy piece at `sq` has a known same-color neighbor at
/// least as strong as it is. Approaching a protected piece is not a
/// chase commitment.
fn is_protected(pos: &Position, sq: usize) -> bool {
    let Some(target) = pos.piece_at(sq) else {
        return false;
    };
    let color = target.color;
    let apparent = target.apparent_rank(color.opposite());
    DIRS.iter()
        .map(|&d| (sq as isize + d) as usize)
        .filter(|&n| crate::board::is_valid(n))
        .any(|n| {
            pos.piece_at(n).is_some_and(|p| {
                p.color == color && p.known && (p.rank() as u8) <= (apparent as u8)
            })
        })
}

/// Reads the committed move for a direct chase.
pub fn update(pos: &mut Position, mv: Move) {
    if mv.is_null() {
        return;
    }
    let mover_color = pos.turn.opposite();
    let Some(mover) = pos.piece_at(mv.to()) else {
        return; // traded off
    };
    if mover.color != mover_color || mover.known && !mover.rank().is_numbered() {
        return;
    }
    let mover_apparent = mover.apparent_rank(mover_color.opposite());

    let enemies = adjacent_enemies(pos, mv.to(), mover_color);
    if enemies.len() != 1 {
        return;
    }
    let chased_sq = enemies[0];
    if is_threatened(pos, mv.from(), mover_color, mover_apparent) {
        return;
    }
    if is_protected(pos, chased_sq) {
        return;
    }
    let chased = pos
        .piece_at(chased_sq)
        .unwrap_or_else(|| unreachable!());
    let chased_apparent = chased.apparent_rank(mover_color);

    pos.update_piece(mv.to(), |p| p.set_acting_chase(chased_apparent));
    suspect::apply_chase_suspicion(pos, mv.to(), chased_apparent);
}

/// Reads the committed move for a protected-piece tell: the mover's
/// side left a chased piece standing next to a single unknown
/// protector. The protector is suspected to be strong enough to punish
/// the chaser, and a protector shielding against a Marshal can only be
/// the Spy. Suppressed entirely while the opponent still rates as a
/// full bluffer.
pub fn infer_protector(pos: &mut Position, st: &InferState, mv: Move) {
    if mv.is_null() {
        return;
    }
    let defender = pos.turn.opposite(); // side that just moved
    let chaser_side = pos.turn;
    if st.bluffer_risk(chaser_side) >= 5 {
        return;
    }

    // The chase that is being answered: the chaser side's previous move.
    let Some(chaser_mv) = pos.prior_move(1) else {
        return;
    };
    let chaser_sq = chaser_mv.to();
    let Some(chaser) = pos.piece_at(chaser_sq) else {
        return;
    };
    if chaser.color != chaser_side || !chaser.known || !chaser.rank().is_numbered() {
        return;
    }
    let attacker_rank = chaser.rank();

    // A defender piece still adjacent to the chaser, beaten on apparent
    // rank, that the defender chose not to rescue.
    for target_sq in adjacent_enemies(pos, chaser_sq, chaser_side) {
        if target_sq == mv.to() {
            continue; // it was rescued by this very move
        }
        let target = pos.piece_at(target_sq).unwrap_or_else(|| unreachable!());
        if target.color != defender {
            continue;
        }
        let target_apparent = target.apparent_rank(chaser_side);
        if (target_apparent as u8) <= (attacker_rank as u8) {
            continue; // not actually losing the exchange
        }
        let protectors: Vec<usize> = DIRS
            .iter()
            .map(|&d| (target_sq as isize + d) as usize)
            .filter(|&n| {
                crate::board::is_valid(n)
                    && n != chaser_sq
                    && pos
                        .piece_at(n)
                        .is_some_and(|p| p.color == defender && !p.known)
            })
            .collect();
        if protectors.len() != 1 {
            continue;
        }
        let protector_sq = protectors[0];
        let guess = if attacker_rank == Rank::Marshal {
            Some(Rank::Spy)
        } else {
            suspect::next_stronger_at_large(pos, defender, attacker_rank)
        };
        if let Some(rank) = guess {
            pos.update_piece(protector_sq, |p| p.set_suspected(rank));
        }
    }
}
