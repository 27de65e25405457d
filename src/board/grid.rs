//! Board geometry.
//!
//! The 10×10 board is embedded in an 11-wide by 12-high mailbox array so
//! that every off-board step lands on a border cell, including the two
//! lake areas. Squares are addressed by a single index; the four
//! orthogonal directions are constant offsets.

use std::collections::VecDeque;
use std::sync::LazyLock;

use super::piece::Color;

/// Mailbox width (10 playable columns plus one border column).
pub const GRID_WIDTH: usize = 11;
/// Mailbox height (10 playable rows plus a border row top and bottom).
pub const GRID_HEIGHT: usize = 12;
/// Total mailbox cells.
pub const GRID_SIZE: usize = GRID_WIDTH * GRID_HEIGHT;

/// The four orthogonal direction offsets: up, left, right, down.
pub const DIRS: [isize; 4] = [-(GRID_WIDTH as isize), -1, 1, GRID_WIDTH as isize];

/// The eight lake cells, in (x, y) board coordinates.
const LAKES: [(usize, usize); 8] = [
    (2, 4),
    (3, 4),
    (2, 5),
    (3, 5),
    (6, 4),
    (7, 4),
    (6, 5),
    (7, 5),
];

/// Maps board coordinates (x, y in 0..10) to a mailbox square.
pub const fn square(x: usize, y: usize) -> usize {
    (y + 1) * GRID_WIDTH + (x + 1)
}

/// Board column of a mailbox square.
pub const fn x_of(sq: usize) -> usize {
    sq % GRID_WIDTH - 1
}

/// Board row of a mailbox square.
pub const fn y_of(sq: usize) -> usize {
    sq / GRID_WIDTH - 1
}

const fn build_valid() -> [bool; GRID_SIZE] {
    let mut valid = [false; GRID_SIZE];
    let mut y = 0;
    while y < 10 {
        let mut x = 0;
        while x < 10 {
            valid[square(x, y)] = true;
            x += 1;
        }
        y += 1;
    }
    let mut i = 0;
    while i < LAKES.len() {
        let (x, y) = LAKES[i];
        valid[square(x, y)] = false;
        i += 1;
    }
    valid
}

/// Passability mask: true for the 92 playable squares, false for border
/// and lake cells.
pub const VALID: [bool; GRID_SIZE] = build_valid();

/// Whether a mailbox square is playable.
#[inline]
pub fn is_valid(sq: usize) -> bool {
    VALID[sq]
}

/// Applies a direction offset. The mailbox border guarantees the result
/// stays in 0..GRID_SIZE for any playable source square.
#[inline]
pub fn step(sq: usize, dir: isize) -> usize {
    (sq as isize + dir) as usize
}

/// Whether the square lies in the given side's own three back rows,
/// where flags and bomb structures live.
#[inline]
pub fn in_back_three(color: Color, sq: usize) -> bool {
    let y = y_of(sq);
    match color {
        Color::Red => y <= 2,
        Color::Blue => y >= 7,
    }
}

/// Whether the square lies in the given side's setup area.
#[inline]
pub fn in_setup_area(color: Color, sq: usize) -> bool {
    let y = y_of(sq);
    match color {
        Color::Red => y <= 3,
        Color::Blue => y >= 6,
    }
}

/// All-pairs step counts across playable squares, ignoring pieces.
/// `u8::MAX` marks unreachable pairs (always involving a border or lake
/// cell).
static DIST: LazyLock<Box<[[u8; GRID_SIZE]; GRID_SIZE]>> = LazyLock::new(build_dist_matrix);

fn build_dist_matrix() -> Box<[[u8; GRID_SIZE]; GRID_SIZE]> {
    let mut dist: Box<[[u8; GRID_SIZE]; GRID_SIZE]> = vec![[u8::MAX; GRID_SIZE]; GRID_SIZE]
        .into_boxed_slice()
        .try_into()
        .unwrap_or_else(|_| unreachable!());
    for start in 0..GRID_SIZE {
        if !is_valid(start) {
            continue;
        }
        let row = &mut dist[start];
        row[start] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(sq) = queue.pop_front() {
            let d = row[sq];
            for &dir in &DIRS {
                let next = step(sq, dir);
                if is_valid(next) && row[next] == u8::MAX {
                    row[next] = d + 1;
                    queue.push_back(next);
                }
            }
        }
    }
    dist
}

/// Step count between two playable squares, ignoring pieces.
#[inline]
pub fn steps(a: usize, b: usize) -> u8 {
    DIST[a][b]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playable_square_count() {
        let count = VALID.iter().filter(|&&v| v).count();
        assert_eq!(count, 92);
    }

    #[test]
    fn border_and_lakes_invalid() {
        assert!(!is_valid(0));
        assert!(!is_valid(GRID_SIZE - 1));
        for &(x, y) in &LAKES {
            assert!(!is_valid(square(x, y)));
        }
    }

    #[test]
    fn coordinate_round_trip() {
        for y in 0..10 {
            for x in 0..10 {
                let sq = square(x, y);
                assert_eq!(x_of(sq), x);
                assert_eq!(y_of(sq), y);
            }
        }
    }

    #[test]
    fn steps_adjacent_is_one() {
        assert_eq!(steps(square(0, 0), square(1, 0)), 1);
        assert_eq!(steps(square(0, 0), square(0, 1)), 1);
    }

    #[test]
    fn steps_routes_around_lakes() {
        // (2,3) to (2,6) is blocked straight through the left lake.
        let d = steps(square(2, 3), square(2, 6));
        assert!(d > 3, "lake must force a detour, got {}", d);
    }

    #[test]
    fn steps_symmetric() {
        let a = square(4, 2);
        let b = square(9, 9);
        assert_eq!(steps(a, b), steps(b, a));
    }

    #[test]
    fn back_three_rows() {
        assert!(in_back_three(Color::Red, square(0, 0)));
        assert!(in_back_three(Color::Red, square(9, 2)));
        assert!(!in_back_three(Color::Red, square(0, 3)));
        assert!(in_back_three(Color::Blue, square(0, 9)));
        assert!(!in_back_three(Color::Blue, square(0, 6)));
    }
}
