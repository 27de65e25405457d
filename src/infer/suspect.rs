//! Suspected-rank assignment.
//!
//! Chasing a known rank marks the chaser as the weakest still
//! unaccounted rank that beats its prey: the opponent does not spend a
//! Marshal where a Major will do. Repeating the same chase read bumps
//! the maturation streak; three in a row make the suspicion usable
//! immediately instead of after the usual aging delay.

use crate::board::{Color, Position, Rank};

/// Pieces of a rank neither captured nor visibly on the board: the pool
/// a hidden piece could still be drawn from.
pub fn unaccounted(pos: &Position, color: Color, rank: Rank) -> u8 {
    let on_board_known = pos
        .pieces(color)
        .filter(|(_, p)| p.known && p.rank() == rank)
        .count() as u8;
    pos.at_large(color, rank).saturating_sub(on_board_known)
}

/// The weakest rank strictly stronger than `than` with unaccounted
/// pieces remaining for `color`. Skips ranks that are all captured or
/// all visible.
pub fn next_stronger_at_large(pos: &Position, color: Color, than: Rank) -> Option<Rank> {
    let mut n = than as u8;
    while n > 1 {
        n -= 1;
        let rank = Rank::from_index(n as usize)?;
        if unaccounted(pos, color, rank) > 0 {
            return Some(rank);
        }
    }
    None
}

/// Applies the suspicion earned by a direct chase. A chase of an
/// unknown carries no rank information beyond the acting rank itself.
pub fn apply_chase_suspicion(pos: &mut Position, chaser_sq: usize, chased_apparent: Rank) {
    let Some(chaser) = pos.piece_at(chaser_sq) else {
        return;
    };
    if chaser.known || chased_apparent == Rank::Unknown {
        return;
    }
    if !chased_apparent.is_numbered() {
        return;
    }
    let guess = if chased_apparent == Rank::Marshal {
        // Only the Spy profits from hunting a Marshal.
        Some(Rank::Spy)
    } else {
        next_stronger_at_large(pos, chaser.color, chased_apparent)
    };
    let Some(rank) = guess else {
        return;
    };
    pos.update_piece(chaser_sq, |p| {
        if p.suspected_rank() == Some(rank) {
            p.chase_streak = p.chase_streak.saturating_add(1);
        } else {
            p.set_suspected(rank);
            p.chase_streak = 1;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::square;

    #[test]
    fn unaccounted_excludes_known_and_captured() {
        let mut pos = Position::new(4);
        pos.place(square(0, 0), Color::Red, Rank::Colonel);
        pos.place(square(1, 0), Color::Red, Rank::Colonel);
        assert_eq!(unaccounted(&pos, Color::Red, Rank::Colonel), 2);
        pos.update_piece(square(0, 0), |p| p.make_known());
        assert_eq!(unaccounted(&pos, Color::Red, Rank::Colonel), 1);
    }

    #[test]
    fn next_stronger_skips_accounted_ranks() {
        let mut pos = Position::new(4);
        // Red's only General is visible, so a chaser of a Colonel must
        // be the Marshal.
        pos.place(square(0, 0), Color::Red, Rank::General);
        pos.update_piece(square(0, 0), |p| p.make_known());
        pos.place(square(1, 0), Color::Red, Rank::Marshal);
        assert_eq!(
            next_stronger_at_large(&pos, Color::Red, Rank::Colonel),
            Some(Rank::Marshal)
        );
    }

    #[test]
    fn repeated_chase_reads_build_a_streak() {
        let mut pos = Position::new(4);
        pos.place(square(4, 4), Color::Red, Rank::Major);
        apply_chase_suspicion(&mut pos, square(4, 4), Rank::Captain);
        apply_chase_suspicion(&mut pos, square(4, 4), Rank::Captain);
        apply_chase_suspicion(&mut pos, square(4, 4), Rank::Captain);
        let p = pos.piece_at(square(4, 4)).unwrap();
        assert_eq!(p.suspected_rank(), Some(Rank::Major));
        assert!(p.suspect_mature());
    }

    #[test]
    fn changing_prey_resets_the_streak() {
        let mut pos = Position::new(4);
        pos.place(square(4, 4), Color::Red, Rank::Colonel);
        apply_chase_suspicion(&mut pos, square(4, 4), Rank::Captain);
        apply_chase_suspicion(&mut pos, square(4, 4), Rank::Major);
        let p = pos.piece_at(square(4, 4)).unwrap();
        assert_eq!(p.suspected_rank(), Some(Rank::Colonel));
        assert_eq!(p.chase_streak, 1);
    }
}
