//! Initial piece placement.
//!
//! Setups are four rows of ten ranks, ordered from the owner's back
//! row outward. The generator starts from a corner flag structure and
//! shuffles the rest under a few placement rules: Scouts forward,
//! Miners and spare Bombs back, the Marshal away from the flag so it
//! is not pinned to defense from move one.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::board::{square, Color, Position, Rank, ALL_RANKS};

/// Four rows of ten, back row first.
pub type SetupRows = [[Rank; 10]; 4];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("setup has {found} pieces of rank {rank:?}, expected {expected}")]
    BadCount {
        rank: Rank,
        found: usize,
        expected: usize,
    },
    #[error("setup area for {0:?} is not empty")]
    AreaOccupied(Color),
}

/// Checks that a setup uses exactly the standard army.
pub fn validate(rows: &SetupRows) -> Result<(), SetupError> {
    let unknown = rows
        .iter()
        .flatten()
        .filter(|&&r| r == Rank::Unknown)
        .count();
    if unknown > 0 {
        return Err(SetupError::BadCount {
            rank: Rank::Unknown,
            found: unknown,
            expected: 0,
        });
    }
    for rank in ALL_RANKS {
        let expected = rank.start_count() as usize;
        let found = rows
            .iter()
            .flatten()
            .filter(|&&r| r == rank)
            .count();
        if found != expected {
            return Err(SetupError::BadCount {
                rank,
                found,
                expected,
            });
        }
    }
    Ok(())
}

/// Places a validated setup on the board. Rows count outward from the
/// owner's edge, so Blue's setup lands mirrored.
pub fn place(pos: &mut Position, color: Color, rows: &SetupRows) -> Result<(), SetupError> {
    validate(rows)?;
    for row in 0..4 {
        for x in 0..10 {
            let (bx, by) = match color {
                Color::Red => (x, row),
                Color::Blue => (9 - x, 9 - row),
            };
            if !pos.is_empty(square(bx, by)) {
                return Err(SetupError::AreaOccupied(color));
            }
        }
    }
    for (row, ranks) in rows.iter().enumerate() {
        for (x, &rank) in ranks.iter().enumerate() {
            let (bx, by) = match color {
                Color::Red => (x, row),
                Color::Blue => (9 - x, 9 - row),
            };
            pos.place(square(bx, by), color, rank);
        }
    }
    Ok(())
}

/// Generates a randomized setup around a corner flag structure.
pub fn random_setup(rng: &mut SmallRng) -> SetupRows {
    let mut rows = [[Rank::Unknown; 10]; 4];

    // Flag in a corner behind a two-bomb shell.
    let fx = if rng.gen_bool(0.5) { 0 } else { 9 };
    let shell_x = if fx == 0 { 1 } else { 8 };
    rows[0][fx] = Rank::Flag;
    rows[0][shell_x] = Rank::Bomb;
    rows[1][fx] = Rank::Bomb;

    // Remaining army, to be dealt into the open slots.
    let mut pool: Vec<Rank> = Vec::with_capacity(37);
    for rank in ALL_RANKS {
        let mut n = rank.start_count() as usize;
        if rank == Rank::Flag {
            n -= 1;
        }
        if rank == Rank::Bomb {
            n -= 2;
        }
        for _ in 0..n {
            pool.push(rank);
        }
    }
    pool.shuffle(rng);

    // Scouts forward, Miners and spare Bombs toward the back.
    pool.sort_by_key(|&r| match r {
        Rank::Scout => 0,
        Rank::Sergeant | Rank::Lieutenant => 1,
        Rank::Miner => 3,
        Rank::Bomb => 4,
        _ => 2,
    });

    // Fill the front first from the head of the pool; ties were
    // shuffled above so equal ranks scatter.
    let mut slots: Vec<(usize, usize)> = Vec::with_capacity(37);
    for row in (0..4).rev() {
        let mut xs: Vec<usize> = (0..10).filter(|&x| rows[row][x] == Rank::Unknown).collect();
        xs.shuffle(rng);
        for x in xs {
            slots.push((row, x));
        }
    }
    for ((row, x), rank) in slots.into_iter().zip(pool) {
        rows[row][x] = rank;
    }

    // Keep the Marshal off the flag corner file.
    for row in 0..4 {
        for x in 0..10 {
            if rows[row][x] == Rank::Marshal && x.abs_diff(fx) <= 1 {
                let swap_x = 9 - x;
                let r = rows[row][swap_x];
                if r != Rank::Flag && r != Rank::Bomb {
                    rows[row][x] = r;
                    rows[row][swap_x] = Rank::Marshal;
                }
            }
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn random_setups_are_valid() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..20 {
            let rows = random_setup(&mut rng);
            assert_eq!(validate(&rows), Ok(()));
            // Flag sits in a back-row corner with its shell.
            let fx = rows[0].iter().position(|&r| r == Rank::Flag).unwrap();
            assert!(fx == 0 || fx == 9);
            assert_eq!(rows[1][fx], Rank::Bomb);
        }
    }

    #[test]
    fn place_mirrors_blue() {
        let mut rng = SmallRng::seed_from_u64(9);
        let rows = random_setup(&mut rng);
        let mut pos = Position::new(5);
        place(&mut pos, Color::Blue, &rows).unwrap();
        let fx = rows[0].iter().position(|&r| r == Rank::Flag).unwrap();
        let p = pos.piece_at(square(9 - fx, 9)).unwrap();
        assert_eq!(p.rank(), Rank::Flag);
        assert_eq!(p.color, Color::Blue);
        assert_eq!(pos.pieces(Color::Blue).count(), 40);
    }

    #[test]
    fn validate_rejects_bad_counts() {
        let mut rng = SmallRng::seed_from_u64(11);
        let mut rows = random_setup(&mut rng);
        // Swap the flag for an extra scout.
        for row in rows.iter_mut() {
            for r in row.iter_mut() {
                if *r == Rank::Flag {
                    *r = Rank::Scout;
                }
            }
        }
        assert!(matches!(
            validate(&rows),
            Err(SetupError::BadCount { .. })
        ));
    }

    #[test]
    fn place_refuses_occupied_area() {
        let mut rng = SmallRng::seed_from_u64(13);
        let rows = random_setup(&mut rng);
        let mut pos = Position::new(5);
        pos.place(square(4, 1), Color::Red, Rank::Scout);
        assert_eq!(
            place(&mut pos, Color::Red, &rows),
            Err(SetupError::AreaOccupied(Color::Red))
        );
    }
}
