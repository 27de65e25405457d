//! Structural inference: bombs and the flag.
//!
//! Bombs never move, so an unmoved unknown in the back rows whose
//! lateral company has melted away is probably one. The flag hides
//! behind bombs, so every back-area square anchors a candidate pattern
//! of its reachable neighbors; a pattern still fully intact (each
//! neighbor unmoved and plausibly a Bomb) dominates, breached ones are
//! scored by how much shell remains, with corner and back-row
//! structures preferred and chase-contaminated shells penalized.

use crate::board::{
    in_back_three, is_valid, square, steps, x_of, y_of, Color, Position, Rank, DIRS, GRID_SIZE,
};

use crate::movegen::is_movable_piece;

/// The engine's current read of where a side's flag hides.
#[derive(Clone, Debug)]
pub struct FlagGuess {
    pub sq: usize,
    /// Unmoved plausibly-Bomb neighbors read as the shell.
    pub shell: Vec<usize>,
    /// Attacking pressure near the guess: movable enemy pieces within
    /// two steps count double, adjacent attackers count once more.
    pub guard_pressure: i32,
    /// Whether the guess is the revealed flag rather than a pattern.
    pub certain: bool,
}

/// Marks isolated unmoved unknowns in both back areas as suspected
/// Bombs. The direction toward the side's own back edge is ignored:
/// bombs against the wall are isolated laterally, not from behind.
pub fn update(pos: &mut Position) {
    for color in [Color::Red, Color::Blue] {
        let backward = -color.forward();
        let mut found: Vec<usize> = Vec::new();
        for (sq, p) in pos.pieces(color) {
            if p.moved || p.known || p.suspected_rank().is_some() {
                continue;
            }
            if !in_back_three(color, sq) {
                continue;
            }
            let isolated = DIRS.iter().filter(|&&d| d != backward).all(|&d| {
                let n = (sq as isize + d) as usize;
                if !is_valid(n) {
                    return true;
                }
                match pos.piece_at(n) {
                    None => true,
                    Some(q) => q.color != color || q.moved || q.known,
                }
            });
            if isolated {
                found.push(sq);
            }
        }
        for sq in found {
            pos.update_piece(sq, |p| p.set_suspected(Rank::Bomb));
        }
    }
}

/// Score bonus for a pattern with no breach. An intact structure beats
/// any breached one regardless of shell size.
const INTACT_PATTERN: i32 = 50;

/// Scores a flag candidate: shell size dominates, back row and corner
/// placement add, suspicion of the shell being something else subtracts.
fn candidate_score(pos: &Position, color: Color, sq: usize, shell: &[usize]) -> i32 {
    let mut score = 2 * shell.len() as i32;
    let y = y_of(sq);
    let back_row = match color {
        Color::Red => y == 0,
        Color::Blue => y == 9,
    };
    if back_row {
        score += 2;
    }
    let x = x_of(sq);
    if x == 0 || x == 9 {
        score += 1;
    }
    for &s in shell {
        if let Some(p) = pos.piece_at(s) {
            if matches!(p.suspected_rank(), Some(r) if r != Rank::Bomb) {
                score -= 2;
            }
            if p.acting_chase().is_some() || p.acting_flee().is_some() {
                score -= 2;
            }
        }
    }
    score
}

/// Guesses where the given side's flag is. A revealed flag is reported
/// directly. Otherwise each unmoved unknown in the back area anchors a
/// pattern over its reachable neighbors; a neighbor counts toward the
/// shell while it is unmoved and still plausibly a Bomb (revealed
/// Bombs included), and a pattern whose every neighbor qualifies is
/// intact and outranks all breached ones. Returns `None` when nothing
/// plausible remains.
pub fn flag_guess(pos: &Position, owner: Color) -> Option<FlagGuess> {
    for (sq, p) in pos.pieces(owner) {
        if p.known && p.rank() == Rank::Flag {
            return Some(FlagGuess {
                sq,
                shell: Vec::new(),
                guard_pressure: guard_pressure(pos, owner.opposite(), sq),
                certain: true,
            });
        }
    }

    let mut best: Option<(i32, FlagGuess)> = None;
    for (sq, p) in pos.pieces(owner) {
        if p.moved || p.known {
            continue;
        }
        if !in_back_three(owner, sq) {
            continue;
        }
        let mut shell = Vec::new();
        let mut intact = true;
        for &d in &DIRS {
            let n = (sq as isize + d) as usize;
            if !is_valid(n) {
                continue;
            }
            let held = pos.piece_at(n).is_some_and(|q| {
                q.color == owner && !q.moved && (!q.known || q.rank() == Rank::Bomb)
            });
            if held {
                shell.push(n);
            } else {
                intact = false;
            }
        }
        let mut score = candidate_score(pos, owner, sq, &shell);
        if intact {
            score += INTACT_PATTERN;
        }
        if best.as_ref().map_or(true, |(b, _)| score > *b) {
            best = Some((
                score,
                FlagGuess {
                    sq,
                    shell,
                    guard_pressure: guard_pressure(pos, owner.opposite(), sq),
                    certain: false,
                },
            ));
        }
    }
    best.map(|(_, g)| g)
}

/// Attacking pressure the enemy can bring near a square.
pub fn guard_pressure(pos: &Position, attacker: Color, flag_sq: usize) -> i32 {
    let mut pressure = 0;
    for (sq, p) in pos.pieces(attacker) {
        if !is_movable_piece(p) {
            continue;
        }
        let d = steps(sq, flag_sq);
        if d <= 2 {
            pressure += 2;
        }
        if d <= 1 {
            pressure += 1;
        }
    }
    pressure
}

/// Marks the best flag guess and its shell as suspected Flag and Bombs.
/// Run at the search root so the evaluator's destination fields point
/// at concrete squares.
pub fn commit_flag_guess(pos: &mut Position, owner: Color) -> Option<FlagGuess> {
    let guess = flag_guess(pos, owner)?;
    if !guess.certain {
        pos.update_piece(guess.sq, |p| {
            if p.suspected_rank().is_none() {
                p.set_suspected(Rank::Flag);
            }
        });
        for &s in &guess.shell {
            pos.update_piece(s, |p| {
                if p.suspected_rank().is_none() {
                    p.set_suspected(Rank::Bomb);
                }
            });
        }
    }
    Some(guess)
}
