//! Flee-rank acquisition.
//!
//! A hidden piece that has its turn and leaves an adjacent enemy
//! unfought is telling us it does not like the matchup: it acquires the
//! enemy's apparent rank as an acting flee rank. The weakest rank fled
//! from is the most informative, so weaker reads displace stronger
//! ones. Recording is gated by the delay rank so that strong-rank
//! claims only circulate once weaker signals are established.

use crate::board::{Color, Move, Position, Rank, DIRS};

/// The strongest rank number already circulating in signals about
/// `color`: captured enemy ranks plus existing chase and flee reads.
/// New flee reads are only accepted at or below this strength.
pub fn delay_rank(pos: &Position, color: Color) -> u8 {
    let mut delay = Rank::Marshal as u8;
    let mut best: Option<u8> = None;
    let enemy = color.opposite();
    for r in 1..=(Rank::Scout as u8) {
        let rank = match Rank::from_index(r as usize) {
            Some(rank) => rank,
            None => continue,
        };
        if pos.captured_count(enemy, rank) > 0 {
            best = Some(best.map_or(r, |b| b.min(r)));
        }
    }
    for (_, p) in pos.pieces(color) {
        for rank in [p.acting_chase(), p.acting_flee()].into_iter().flatten() {
            if rank.is_numbered() {
                let r = rank as u8;
                best = Some(best.map_or(r, |b| b.min(r)));
            }
        }
    }
    if let Some(b) = best {
        delay = b;
    }
    delay
}

fn record_flee(pos: &mut Position, sq: usize, enemy_apparent: Rank, delay: u8) {
    let Some(p) = pos.piece_at(sq) else {
        return;
    };
    if p.known {
        return;
    }
    if enemy_apparent == Rank::Unknown {
        // Fleeing an unknown says little; keep any real read instead.
        if p.acting_flee().is_none() {
            pos.update_piece(sq, |p| p.set_acting_flee(Rank::Unknown));
        }
        return;
    }
    if !enemy_apparent.is_numbered() {
        return;
    }
    if (enemy_apparent as u8) < delay {
        return;
    }
    pos.update_piece(sq, |p| p.set_acting_flee(enemy_apparent));
}

/// Reads the committed move for flee signals on the mover's side.
pub fn update(pos: &mut Position, mv: Move) {
    if mv.is_null() {
        return;
    }
    let mover_color = pos.turn.opposite();
    let observer = mover_color.opposite();
    let delay = delay_rank(pos, mover_color);

    // The mover itself: enemies it walked away from.
    if let Some(mover) = pos.piece_at(mv.to()) {
        if mover.color == mover_color && !mover.known {
            let fled: Vec<Rank> = DIRS
                .iter()
                .map(|&d| (mv.from() as isize + d) as usize)
                .filter(|&n| crate::board::is_valid(n) && crate::board::steps(mv.to(), n) > 1)
                .filter_map(|n| pos.piece_at(n))
                .filter(|p| p.color != mover_color)
                .map(|p| p.apparent_rank(observer))
                .collect();
            for rank in fled {
                record_flee(pos, mv.to(), rank, delay);
            }
        }
    }

    // Bystanders: hidden pieces that kept standing next to an enemy
    // while their side spent the turn elsewhere.
    for sq in 0..crate::board::GRID_SIZE {
        if sq == mv.to() {
            continue;
        }
        let Some(p) = pos.piece_at(sq) else { continue };
        if p.color != mover_color || p.known {
            continue;
        }
        let adjacent: Vec<Rank> = DIRS
            .iter()
            .map(|&d| (sq as isize + d) as usize)
            .filter(|&n| crate::board::is_valid(n))
            .filter_map(|n| pos.piece_at(n))
            .filter(|e| e.color != mover_color)
            .map(|e| e.apparent_rank(observer))
            .collect();
        for rank in adjacent {
            record_flee(pos, sq, rank, delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::square;

    #[test]
    fn bystander_that_declines_a_fight_gets_flee_rank() {
        let mut pos = Position::new(6);
        pos.place(square(4, 4), Color::Red, Rank::Spy);
        pos.place(square(4, 5), Color::Blue, Rank::Sergeant);
        pos.update_piece(square(4, 5), |p| p.make_known());
        pos.place(square(0, 0), Color::Red, Rank::Scout);
        // Red moves the Scout instead of resolving the standoff.
        let mv = Move::new(square(0, 0), square(0, 1));
        pos.apply(mv);
        update(&mut pos, mv);
        let spy = pos.piece_at(square(4, 4)).unwrap();
        assert_eq!(spy.acting_flee(), Some(Rank::Sergeant));
    }

    #[test]
    fn mover_walking_away_gets_flee_rank() {
        let mut pos = Position::new(6);
        pos.place(square(4, 4), Color::Red, Rank::Spy);
        pos.place(square(4, 5), Color::Blue, Rank::Sergeant);
        pos.update_piece(square(4, 5), |p| p.make_known());
        let mv = Move::new(square(4, 4), square(3, 4));
        pos.apply(mv);
        update(&mut pos, mv);
        let spy = pos.piece_at(square(3, 4)).unwrap();
        assert_eq!(spy.acting_flee(), Some(Rank::Sergeant));
    }

    #[test]
    fn weaker_read_displaces_stronger() {
        let mut pos = Position::new(6);
        pos.place(square(4, 4), Color::Red, Rank::Spy);
        pos.place(square(4, 5), Color::Blue, Rank::Colonel);
        pos.update_piece(square(4, 5), |p| p.make_known());
        pos.place(square(0, 0), Color::Red, Rank::Scout);

        let mv = Move::new(square(0, 0), square(0, 1));
        pos.apply(mv);
        update(&mut pos, mv);
        assert_eq!(
            pos.piece_at(square(4, 4)).unwrap().acting_flee(),
            Some(Rank::Colonel)
        );

        // Same standoff against a Sergeant: the weaker read wins.
        let mut pos2 = Position::new(6);
        pos2.place(square(4, 4), Color::Red, Rank::Spy);
        pos2.update_piece(square(4, 4), |p| p.set_acting_flee(Rank::Colonel));
        pos2.place(square(4, 5), Color::Blue, Rank::Sergeant);
        pos2.update_piece(square(4, 5), |p| p.make_known());
        pos2.place(square(0, 0), Color::Red, Rank::Scout);
        let mv2 = Move::new(square(0, 0), square(0, 1));
        pos2.apply(mv2);
        update(&mut pos2, mv2);
        assert_eq!(
            pos2.piece_at(square(4, 4)).unwrap().acting_flee(),
            Some(Rank::Sergeant)
        );
    }

    #[test]
    fn delay_gate_blocks_premature_strong_reads() {
        let mut pos = Position::new(6);
        pos.place(square(4, 4), Color::Red, Rank::Spy);
        // Red already has a flee read from a Sergeant in circulation.
        pos.update_piece(square(4, 4), |p| p.set_acting_flee(Rank::Sergeant));
        pos.place(square(5, 5), Color::Red, Rank::Captain);
        pos.place(square(5, 6), Color::Blue, Rank::Colonel);
        pos.update_piece(square(5, 6), |p| p.make_known());
        pos.place(square(0, 0), Color::Red, Rank::Scout);

        let mv = Move::new(square(0, 0), square(0, 1));
        pos.apply(mv);
        update(&mut pos, mv);
        // Colonel (3) is stronger than the circulating Sergeant (7).
        assert_eq!(pos.piece_at(square(5, 5)).unwrap().acting_flee(), None);
    }
}
