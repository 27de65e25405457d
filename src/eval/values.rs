//! Piece values, stealth, and invincibility.
//!
//! Rebuilt at every search root. Base values are bent by what is left
//! on the board: extinct opposing ranks promote survivors, a lurking
//! Spy taxes the Marshal, and the engine's own material is scaled by
//! the material ratio so a winning engine trades and a losing one
//! conserves. Stealth prices what a hidden piece gains by staying
//! hidden; invincibility marks ranks with no hidden superior left.

use crate::board::{Color, Piece, Position, Rank, RANK_COUNT};
use crate::infer::suspect::unaccounted;
use crate::infer::InferState;

/// Credit lost when an unmoved piece first moves.
pub const VALUE_MOVED: i32 = 5;

/// Base piece values by rank index.
pub const START_VALUES: [i32; RANK_COUNT] =
    [0, 1600, 800, 400, 200, 100, 50, 36, 30, 20, 300, 0, 1000, 0];

/// Per-root value tables for both sides.
pub struct Values {
    pub engine: Color,
    value: [[i32; RANK_COUNT]; 2],
    stealth: [[i32; RANK_COUNT]; 2],
    invincible: [[bool; RANK_COUNT]; 2],
    pub sum_values: [i32; 2],
    pub spy_at_large: [bool; 2],
}

impl Values {
    pub fn new(pos: &Position, engine: Color, infer: &InferState) -> Values {
        let mut v = Values {
            engine,
            value: [START_VALUES; 2],
            stealth: [[0; RANK_COUNT]; 2],
            invincible: [[false; RANK_COUNT]; 2],
            sum_values: [0; 2],
            spy_at_large: [false; 2],
        };
        for color in [Color::Red, Color::Blue] {
            v.spy_at_large[color as usize] = pos.at_large(color, Rank::Spy) > 0;
        }
        v.adjust_piece_values(pos);
        v.gen_sum_values(pos);
        v.scale_engine_values();
        v.gen_bomb_values(pos);
        v.gen_unknown_values(pos);
        v.gen_invincible(pos);
        v.gen_stealth(pos, infer);
        v
    }

    /// Value of a rank for a side.
    #[inline]
    pub fn value(&self, color: Color, rank: Rank) -> i32 {
        self.value[color as usize][rank as usize]
    }

    /// Stealth value of a rank for a side.
    #[inline]
    pub fn stealth(&self, color: Color, rank: Rank) -> i32 {
        self.stealth[color as usize][rank as usize]
    }

    /// Whether the rank has no hidden opposing superior left.
    #[inline]
    pub fn is_invincible(&self, color: Color, rank: Rank) -> bool {
        self.invincible[color as usize][rank as usize]
    }

    /// Extinct-rank promotion and the Spy tax. A numbered rank facing
    /// fewer surviving superiors plays at the value of its effective
    /// rank.
    fn adjust_piece_values(&mut self, pos: &Position) {
        for color in [Color::Red, Color::Blue] {
            let opp = color.opposite();
            for n in 1..=(Rank::Scout as usize) {
                let rank = match Rank::from_index(n) {
                    Some(r) => r,
                    None => continue,
                };
                let stronger_left = (1..n)
                    .filter(|&m| {
                        Rank::from_index(m).map_or(false, |r| pos.at_large(opp, r) > 0)
                    })
                    .count();
                let effective = stronger_left + 1;
                if effective < n {
                    let promoted = START_VALUES[effective];
                    let cell = &mut self.value[color as usize][n];
                    *cell = (*cell).max(promoted);
                }
            }
            if self.spy_at_large[opp as usize] {
                self.value[color as usize][Rank::Marshal as usize] =
                    self.value[color as usize][Rank::Marshal as usize] * 9 / 10;
            }
        }
    }

    fn gen_sum_values(&mut self, pos: &Position) {
        for color in [Color::Red, Color::Blue] {
            let mut sum = 0;
            for (_, p) in pos.pieces(color) {
                let r = p.rank();
                if r.is_movable() {
                    sum += self.value[color as usize][r as usize];
                }
            }
            self.sum_values[color as usize] = sum;
        }
    }

    /// Win-ratio scaling of the engine's own pieces: ahead in material,
    /// pieces cheapen and the engine trades; behind, they dear up and
    /// it conserves.
    fn scale_engine_values(&mut self) {
        let own = self.sum_values[self.engine as usize].max(1);
        let opp = self.sum_values[self.engine.opposite() as usize];
        for n in 1..RANK_COUNT {
            let v = self.value[self.engine as usize][n];
            self.value[self.engine as usize][n] = v / 2 + (v / 2) * opp / own;
        }
    }

    /// An opponent bomb is worth taking only when Miners can reach it.
    fn gen_bomb_values(&mut self, pos: &Position) {
        for color in [Color::Red, Color::Blue] {
            let opp = color.opposite();
            let bomb = if pos.at_large(opp, Rank::Miner) > 0 {
                self.value[opp as usize][Rank::Miner as usize] + 10
            } else {
                0
            };
            self.value[color as usize][Rank::Bomb as usize] = bomb;
        }
    }

    /// The Unknown pseudo-rank values at the average hidden piece.
    fn gen_unknown_values(&mut self, pos: &Position) {
        for color in [Color::Red, Color::Blue] {
            let mut sum = 0i32;
            let mut count = 0i32;
            for n in 1..(Rank::Bomb as usize) {
                if let Some(r) = Rank::from_index(n) {
                    let u = unaccounted(pos, color, r) as i32;
                    sum += u * self.value[color as usize][n];
                    count += u;
                }
            }
            self.value[color as usize][Rank::Unknown as usize] =
                if count > 0 { sum / count } else { 0 };
        }
    }

    /// A rank is invincible when every stronger opposing piece is
    /// captured, known, or carries a mature suspicion. The Marshal is
    /// withheld while the opposing Spy may be hidden.
    fn gen_invincible(&mut self, pos: &Position) {
        for color in [Color::Red, Color::Blue] {
            let opp = color.opposite();
            for n in 1..=(Rank::Scout as usize) {
                let rank = match Rank::from_index(n) {
                    Some(r) => r,
                    None => continue,
                };
                let hidden_superiors: u32 = (1..n)
                    .filter_map(Rank::from_index)
                    .map(|r| unaccounted(pos, opp, r) as u32)
                    .sum();
                let mut inv = hidden_superiors == 0;
                if rank == Rank::Marshal && self.spy_at_large[opp as usize] {
                    let spy_accounted = pos
                        .pieces(opp)
                        .any(|(_, p)| p.rank() == Rank::Spy && (p.known || p.suspect_mature()));
                    if !spy_accounted {
                        inv = false;
                    }
                }
                self.invincible[color as usize][n] = inv;
            }
        }
    }

    fn gen_stealth(&mut self, pos: &Position, infer: &InferState) {
        for color in [Color::Red, Color::Blue] {
            let opp = color.opposite();
            let is_engine = color == self.engine;
            for n in 1..=(Rank::Scout as usize) {
                let value = self.value[color as usize][n];
                let s = if !is_engine {
                    // Opponent stealth scales with how much of their
                    // behavior might be theater.
                    let risk = infer.bluffer_risk(self.engine);
                    (value as f64).sqrt() as i32 * risk * 3 / 2
                } else if self.invincible[color as usize][n] {
                    10 - n as i32
                } else if n <= Rank::Major as usize {
                    // A strong piece's stealth is what the opponent
                    // would keep risking against it unknowingly.
                    let mut sum = 0;
                    let mut taken = 0;
                    let mut m = n + 1;
                    while m <= Rank::Scout as usize && taken < 6 {
                        if let Some(r) = Rank::from_index(m) {
                            let c = pos.at_large(opp, r) as i32;
                            sum += c * self.value[opp as usize][m];
                            taken += c;
                        }
                        m += 1;
                    }
                    let mut s = sum / 10;
                    if hidden_outnumber_known(pos, opp) {
                        s += s / 3;
                    } else {
                        s -= s / 3;
                    }
                    s
                } else {
                    let div = match n {
                        5 => 6,
                        6 => 5,
                        7 => 2,
                        8 => 2,
                        _ => 1,
                    };
                    value / div
                };
                self.stealth[color as usize][n] = s.max(0);
            }
            // Bomb stealth rises as fewer hidden bombs remain.
            let hidden_bombs = unaccounted(pos, color, Rank::Bomb) as i32;
            self.stealth[color as usize][Rank::Bomb as usize] = (6 - hidden_bombs) * 5;
            // Spy stealth: worth nearly the Marshal kill it threatens.
            self.stealth[color as usize][Rank::Spy as usize] =
                self.value[opp as usize][Rank::Marshal as usize] / 4;
        }
    }
}

fn hidden_outnumber_known(pos: &Position, color: Color) -> bool {
    let mut hidden = 0;
    let mut known = 0;
    for (_, p) in pos.pieces(color) {
        if !p.rank().is_movable() {
            continue;
        }
        if p.known {
            known += 1;
        } else {
            hidden += 1;
        }
    }
    hidden > known
}
