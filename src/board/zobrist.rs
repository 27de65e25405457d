//! Dual-observer Zobrist hashing.
//!
//! One key table serves both observers: a piece hashes under the rank
//! and visibility it presents to that observer, so the same board state
//! produces two hashes, one per side's information. Revealing a piece
//! changes both hashes; a suspicion changes only the guesser's hash.
//!
//! Keys are generated per game from a seeded RNG rather than a global
//! table, so two concurrent games never share key material.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use super::grid::GRID_SIZE;
use super::piece::{Color, Piece, Visibility};
use super::rank::RANK_COUNT;

const VIS_COUNT: usize = 3;
const KEY_COUNT: usize = 2 * VIS_COUNT * 2 * RANK_COUNT * GRID_SIZE;

/// Per-game Zobrist key table.
pub struct Zobrist {
    keys: Box<[u64]>,
}

impl Zobrist {
    pub fn new(seed: u64) -> Zobrist {
        let mut rng = SmallRng::seed_from_u64(seed);
        let keys = (0..KEY_COUNT).map(|_| rng.gen()).collect();
        Zobrist { keys }
    }

    #[inline]
    fn index(color: Color, vis: Visibility, moved: bool, rank: usize, sq: usize) -> usize {
        let mut i = color as usize;
        i = i * VIS_COUNT + vis as usize;
        i = i * 2 + moved as usize;
        i = i * RANK_COUNT + rank;
        i * GRID_SIZE + sq
    }

    /// Hash contribution of a piece on a square, as seen by the given
    /// observer.
    #[inline]
    pub fn piece_key(&self, observer: Color, p: &Piece, sq: usize) -> u64 {
        let vis = p.visibility(observer);
        let rank = p.apparent_rank(observer) as usize;
        self.keys[Self::index(p.color, vis, p.moved, rank, sq)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::grid::square;
    use crate::board::rank::Rank;

    #[test]
    fn same_seed_same_keys() {
        let a = Zobrist::new(42);
        let b = Zobrist::new(42);
        let p = Piece::new(Color::Red, 0, Rank::Scout);
        let sq = square(3, 3);
        assert_eq!(a.piece_key(Color::Red, &p, sq), b.piece_key(Color::Red, &p, sq));
    }

    #[test]
    fn observers_disagree_on_hidden_pieces() {
        let z = Zobrist::new(7);
        let p = Piece::new(Color::Blue, 0, Rank::Marshal);
        let sq = square(5, 7);
        // Blue sees its own Marshal; Red sees an unknown.
        assert_ne!(z.piece_key(Color::Blue, &p, sq), z.piece_key(Color::Red, &p, sq));
    }

    #[test]
    fn reveal_changes_both_views() {
        let z = Zobrist::new(7);
        let mut p = Piece::new(Color::Blue, 0, Rank::Marshal);
        let sq = square(5, 7);
        let red_before = z.piece_key(Color::Red, &p, sq);
        let blue_before = z.piece_key(Color::Blue, &p, sq);
        p.make_known();
        assert_ne!(z.piece_key(Color::Red, &p, sq), red_before);
        assert_ne!(z.piece_key(Color::Blue, &p, sq), blue_before);
    }

    #[test]
    fn suspicion_changes_only_the_guessers_view() {
        let z = Zobrist::new(7);
        let mut p = Piece::new(Color::Blue, 0, Rank::Colonel);
        let sq = square(5, 7);
        let red_before = z.piece_key(Color::Red, &p, sq);
        let blue_before = z.piece_key(Color::Blue, &p, sq);
        p.set_suspected(Rank::Major);
        assert_ne!(z.piece_key(Color::Red, &p, sq), red_before);
        assert_eq!(z.piece_key(Color::Blue, &p, sq), blue_before);
    }
}
