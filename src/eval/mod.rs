//! Static evaluation.
//!
//! Built once per search root from the position and the inference
//! state: value and stealth tables, goal plans per side and rank, and
//! the combat predictor `win_fight` that judges exchanges on apparent
//! information. The incremental value bookkeeping during search lives
//! in [`delta`].

pub mod delta;
pub mod plan;
pub mod values;

pub use delta::SearchBoard;
pub use plan::{
    Plan, DEST_VALUE_NIL, PRI_ATTACK_FLAG, PRI_CHASE, PRI_CHASE_ATTACK, PRI_CHASE_DEFEND,
    PRI_DEFEND_FLAG, PRI_DEFEND_FLAG_AREA, PRI_DEFEND_FLAG_BOMBS, PRI_LANE,
};
pub use values::{Values, START_VALUES, VALUE_MOVED};

use crate::board::{
    combat, in_back_three, is_valid, square, step, steps, Color, Outcome, Piece, Position, Rank,
    DIRS, GRID_SIZE, RANK_COUNT,
};
use crate::infer::structure::{self, FlagGuess};
use crate::infer::suspect::unaccounted;
use crate::infer::InferState;

/// Value of capturing the opponent's flag, beyond every material swing.
pub const VALUE_WIN: i32 = 20_000;

/// Predicted outcome of an exchange, judged on apparent information.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fight {
    Wins,
    Loses,
    Even,
    /// Not predictable: one side is an unread unknown.
    Unknown,
}

/// Per-root evaluator state.
pub struct Evaluator {
    pub engine: Color,
    pub values: Values,
    plans: [[Plan; RANK_COUNT]; 2],
    pub flag_guess: [Option<FlagGuess>; 2],
    unmoved_value: [i32; GRID_SIZE],
}

impl Evaluator {
    /// Builds the evaluator, refreshing structural inference and
    /// committing the flag guess so destination fields aim at concrete
    /// squares.
    pub fn new(pos: &mut Position, engine: Color, infer: &InferState) -> Evaluator {
        structure::update(pos);
        let opp = engine.opposite();
        let opp_guess = structure::commit_flag_guess(pos, opp);
        let own_guess = own_flag(pos, engine);

        let values = Values::new(pos, engine, infer);
        let mut flag_guess: [Option<FlagGuess>; 2] = [None, None];
        flag_guess[opp as usize] = opp_guess;
        flag_guess[engine as usize] = own_guess;

        let mut ev = Evaluator {
            engine,
            values,
            plans: [
                std::array::from_fn(|_| Plan::default()),
                std::array::from_fn(|_| Plan::default()),
            ],
            flag_guess,
            unmoved_value: [0; GRID_SIZE],
        };
        ev.gen_chase_plans(pos);
        ev.gen_flag_plans(pos);
        ev.gen_lane_plans(pos);
        ev.gen_unmoved_values(pos);
        ev
    }

    #[inline]
    pub fn plan(&self, color: Color, rank: Rank) -> &Plan {
        &self.plans[color as usize][rank as usize]
    }

    #[inline]
    fn plan_mut(&mut self, color: Color, rank: Rank) -> &mut Plan {
        &mut self.plans[color as usize][rank as usize]
    }

    #[inline]
    pub fn unmoved_value_at(&self, sq: usize) -> i32 {
        self.unmoved_value[sq]
    }

    /// The rank this piece fights at, as far as prediction may know it.
    /// The engine's own pieces are transparent to it.
    pub fn effective_rank(&self, p: &Piece) -> Option<Rank> {
        if p.known || p.color == self.engine {
            Some(p.rank())
        } else if p.suspect_mature() {
            p.suspected_rank()
        } else {
            None
        }
    }

    /// Accounted value of a piece: true value when readable, suspicion
    /// value when mature (a suspected Spy is only priced as a Captain),
    /// otherwise the average hidden piece.
    pub fn piece_value(&self, p: &Piece) -> i32 {
        if p.color == self.engine || p.known {
            return self.values.value(p.color, p.rank());
        }
        match p.suspected_rank() {
            Some(Rank::Spy) if p.suspect_mature() => {
                self.values.value(p.color, Rank::Captain)
            }
            Some(r) if p.suspect_mature() => self.values.value(p.color, r),
            _ => self.values.value(p.color, Rank::Unknown),
        }
    }

    /// What the piece loses by being revealed. Acting ranks refine the
    /// guess for unread unknowns: a chaser of unknowns moves like a
    /// Captain, a piece that fled one like a Colonel's shadow.
    pub fn stealth_value(&self, p: &Piece) -> i32 {
        if p.known {
            return 0;
        }
        let rank = if p.color == self.engine {
            p.rank()
        } else if let Some(r) = p.suspected_rank().filter(|_| p.suspect_mature()) {
            r
        } else if p.acting_chase() == Some(Rank::Unknown) {
            Rank::Captain
        } else if p.acting_flee() == Some(Rank::Unknown) {
            Rank::Colonel
        } else {
            Rank::Major
        };
        self.values.stealth(p.color, rank)
    }

    /// Expected profit of a readable attacker of rank `att` beating an
    /// unread unknown: the stealth it strips plus a slice of the value
    /// of the next weaker rank.
    pub fn unknown_win_value(&self, att: Rank, def_color: Color) -> i32 {
        let n = (att as usize + 1).min(Rank::Scout as usize);
        let weaker = Rank::from_index(n).unwrap_or(Rank::Scout);
        self.values.stealth(def_color, weaker) + self.values.value(def_color, weaker) / 6
    }

    /// Whether the defender's flee history says it will not stand
    /// against this rank. The read is only trusted when the declined
    /// capture was worth more than the stealth a feint would protect.
    pub fn is_fleeing(&self, pos: &Position, def: &Piece, att_rank: Rank) -> bool {
        let Some(fled) = def.acting_flee() else {
            return false;
        };
        if fled == Rank::Unknown || !att_rank.is_numbered() {
            return false;
        }
        if (fled as u8) < (att_rank as u8) {
            return false;
        }
        let strongest_hidden = (1..=(Rank::Scout as usize))
            .filter_map(Rank::from_index)
            .find(|&r| unaccounted(pos, def.color, r) > 0);
        if let Some(sh) = strongest_hidden {
            let declined = self.values.value(def.color.opposite(), fled);
            if self.values.stealth(def.color, sh) * 5 / 4 > declined {
                return false;
            }
        }
        true
    }

    /// Predicts an exchange on apparent information. Resolution order
    /// follows the read strength: readable ranks fight the rank table,
    /// structure beats invincibility, flee reads beat raw unknowns.
    pub fn win_fight(&self, pos: &Position, att: &Piece, def: &Piece) -> Fight {
        let ar = self.effective_rank(att);
        let dr = self.effective_rank(def);
        match (ar, dr) {
            (Some(a), Some(d)) => match combat(a, d) {
                Outcome::Wins => Fight::Wins,
                Outcome::Loses => Fight::Loses,
                Outcome::Even => Fight::Even,
            },
            (Some(a), None) => self.fight_vs_unknown(pos, att, a, def),
            (None, Some(d)) => self.unknown_vs_fight(pos, att, def, d),
            (None, None) => Fight::Unknown,
        }
    }

    /// Readable attacker against an unread unknown defender.
    fn fight_vs_unknown(&self, pos: &Position, att: &Piece, a: Rank, def: &Piece) -> Fight {
        if !a.is_movable() {
            return Fight::Loses;
        }
        if a == Rank::Spy {
            // A Spy attacking an unknown dies to anything but the
            // Marshal it cannot identify.
            return Fight::Loses;
        }
        if def.maybe_miner && !def.moved && a != Rank::Miner && def.suspected_rank().is_none() {
            // Could be a bomb.
            return Fight::Unknown;
        }
        if def.suspected_rank() == Some(Rank::Bomb) {
            return if a == Rank::Miner { Fight::Wins } else { Fight::Loses };
        }
        if self.is_fleeing(pos, def, a) {
            return Fight::Wins;
        }
        if self.values.is_invincible(att.color, a) {
            return if unaccounted(pos, def.color, a) > 0 {
                Fight::Even
            } else {
                Fight::Wins
            };
        }
        Fight::Unknown
    }

    /// Unread unknown attacker against a readable defender.
    fn unknown_vs_fight(&self, pos: &Position, att: &Piece, def: &Piece, d: Rank) -> Fight {
        if d == Rank::Spy || d == Rank::Flag {
            return Fight::Wins;
        }
        if d == Rank::Bomb {
            // Only a Miner would attack; value-aware callers decide
            // whether the bomb was worth defusing.
            return if att.maybe_miner { Fight::Wins } else { Fight::Loses };
        }
        if self.is_fleeing(pos, att, d) {
            return Fight::Loses;
        }
        if self.values.is_invincible(def.color, d) {
            if d == Rank::Marshal && self.values.spy_at_large[att.color as usize] {
                return Fight::Unknown;
            }
            return if (d as u8) >= (Rank::Miner as u8) {
                Fight::Even
            } else {
                Fight::Loses
            };
        }
        Fight::Unknown
    }

    /// Chase plans: every readable enemy piece pulls the own ranks that
    /// beat it. Chases near the own flag defend at a higher priority.
    fn gen_chase_plans(&mut self, pos: &Position) {
        for color in [Color::Red, Color::Blue] {
            let opp = color.opposite();
            let own_flag_sq = self.flag_guess[color as usize].as_ref().map(|g| g.sq);
            let targets: Vec<(usize, Rank)> = pos
                .pieces(opp)
                .filter_map(|(sq, p)| {
                    let apparent = p.apparent_rank(color);
                    if p.known || p.suspect_mature() {
                        Some((sq, apparent))
                    } else {
                        None
                    }
                })
                .collect();
            for (sq, target_rank) in targets {
                if !target_rank.is_numbered() && target_rank != Rank::Spy {
                    continue;
                }
                let near_home = own_flag_sq.map_or(false, |f| steps(sq, f) <= 4);
                let pri = if near_home { PRI_CHASE_DEFEND } else { PRI_CHASE };
                for n in 1..=(Rank::Spy as usize) {
                    let rank = match Rank::from_index(n) {
                        Some(r) => r,
                        None => continue,
                    };
                    if pos.at_large(color, rank) == 0 {
                        continue;
                    }
                    if combat(rank, target_rank) != Outcome::Wins {
                        continue;
                    }
                    // Chasing with a much stronger piece wastes it.
                    if rank.is_numbered()
                        && target_rank.is_numbered()
                        && (target_rank as u8) - (rank as u8) > 2
                        && !near_home
                    {
                        continue;
                    }
                    let field = plan::dest_field(pos, &self.values, sq, color, rank, true);
                    self.plan_mut(color, rank).set_plan(&field, pri);
                }
            }
        }
    }

    /// Flag plans: Miners head for the guessed shell, expendables for
    /// the guessed flag; the defender answers pressure by pulling
    /// pieces home and parks guards on its bomb shell.
    fn gen_flag_plans(&mut self, pos: &Position) {
        for color in [Color::Red, Color::Blue] {
            let opp = color.opposite();
            let Some(guess) = self.flag_guess[opp as usize].clone() else {
                continue;
            };
            // Attack.
            if pos.at_large(color, Rank::Miner) > 0 {
                for &bomb_sq in &guess.shell {
                    let field =
                        plan::dest_field(pos, &self.values, bomb_sq, color, Rank::Miner, true);
                    self.plan_mut(color, Rank::Miner)
                        .set_plan(&field, PRI_ATTACK_FLAG);
                }
            }
            for n in (Rank::Captain as usize)..=(Rank::Scout as usize) {
                let rank = match Rank::from_index(n) {
                    Some(r) => r,
                    None => continue,
                };
                if pos.at_large(color, rank) == 0 {
                    continue;
                }
                let field = plan::dest_field(pos, &self.values, guess.sq, color, rank, true);
                self.plan_mut(color, rank).set_plan(&field, PRI_ATTACK_FLAG);
            }
        }
        // Defense.
        for color in [Color::Red, Color::Blue] {
            let Some(guess) = self.flag_guess[color as usize].clone() else {
                continue;
            };
            let attacker = color.opposite();
            let pressure = structure::guard_pressure(pos, attacker, guess.sq);
            let defenders = pos
                .pieces(color)
                .filter(|(sq, p)| p.rank().is_numbered() && steps(*sq, guess.sq) <= 4)
                .count() as i32;
            if pressure > defenders * 2 {
                for n in 1..=(Rank::Captain as usize) {
                    let rank = match Rank::from_index(n) {
                        Some(r) => r,
                        None => continue,
                    };
                    if pos.at_large(color, rank) == 0 {
                        continue;
                    }
                    let field =
                        plan::dest_field(pos, &self.values, guess.sq, color, rank, true);
                    self.plan_mut(color, rank)
                        .set_plan(&field, PRI_DEFEND_FLAG_AREA);
                }
            }
            // An attacker standing next to the flag or its shell must
            // be removed by whatever can reach it.
            let hot: Vec<usize> = std::iter::once(guess.sq)
                .chain(guess.shell.iter().copied())
                .flat_map(|s| DIRS.iter().map(move |&d| step(s, d)))
                .filter(|&n| {
                    is_valid(n) && pos.piece_at(n).is_some_and(|p| p.color == attacker)
                })
                .collect();
            for enemy_sq in hot {
                for n in 1..=(Rank::Scout as usize) {
                    let rank = match Rank::from_index(n) {
                        Some(r) => r,
                        None => continue,
                    };
                    if pos.at_large(color, rank) == 0 {
                        continue;
                    }
                    let field =
                        plan::dest_field(pos, &self.values, enemy_sq, color, rank, false);
                    self.plan_mut(color, rank).set_plan(&field, PRI_DEFEND_FLAG);
                }
            }
            // Miners threaten the shell: post expendable guards on it.
            if pos.at_large(attacker, Rank::Miner) > 0 {
                for &bomb_sq in &guess.shell {
                    for n in (Rank::Lieutenant as usize)..=(Rank::Scout as usize) {
                        let rank = match Rank::from_index(n) {
                            Some(r) => r,
                            None => continue,
                        };
                        if pos.at_large(color, rank) == 0 {
                            continue;
                        }
                        let field =
                            plan::dest_field(pos, &self.values, bomb_sq, color, rank, true);
                        self.plan_mut(color, rank)
                            .set_plan(&field, PRI_DEFEND_FLAG_BOMBS);
                    }
                }
            }
        }
    }

    /// Lane pressure for the engine: expendables push down the flank
    /// the opponent holds most thinly.
    fn gen_lane_plans(&mut self, pos: &Position) {
        let color = self.engine;
        let opp = color.opposite();
        let lanes: [(usize, usize); 3] = [(0, 1), (4, 5), (8, 9)];
        let mut thinnest = None;
        for (i, &(x0, x1)) in lanes.iter().enumerate() {
            let count = pos
                .pieces(opp)
                .filter(|(sq, _)| {
                    let x = crate::board::x_of(*sq);
                    x == x0 || x == x1
                })
                .count();
            if thinnest.map_or(true, |(_, c)| count < c) {
                thinnest = Some((i, count));
            }
        }
        let Some((lane, _)) = thinnest else { return };
        let (x0, x1) = lanes[lane];
        let far_y = match opp {
            Color::Red => 0,
            Color::Blue => 9,
        };
        for x in [x0, x1] {
            let goal = square(x, far_y);
            for n in (Rank::Lieutenant as usize)..=(Rank::Scout as usize) {
                let rank = match Rank::from_index(n) {
                    Some(r) => r,
                    None => continue,
                };
                if pos.at_large(color, rank) == 0 {
                    continue;
                }
                let field = plan::dest_field(pos, &self.values, goal, color, rank, true);
                self.plan_mut(color, rank).set_plan(&field, PRI_LANE);
            }
        }
    }

    /// Unmoved pieces carry a small credit for staying put; pieces in
    /// the flag structure carry a real defensive worth.
    fn gen_unmoved_values(&mut self, pos: &Position) {
        for color in [Color::Red, Color::Blue] {
            let flag_sq = self.flag_guess[color as usize].as_ref().map(|g| g.sq);
            for (sq, p) in pos.pieces(color) {
                if p.moved {
                    continue;
                }
                let mut v = VALUE_MOVED;
                if in_back_three(color, sq) {
                    if let Some(f) = flag_sq {
                        if steps(sq, f) <= 2 {
                            v += 30;
                        }
                    }
                }
                self.unmoved_value[sq] = v;
            }
        }
    }
}

/// The true square of a side's flag, wrapped as a certain guess.
fn own_flag(pos: &Position, color: Color) -> Option<FlagGuess> {
    let (sq, _) = pos
        .pieces(color)
        .find(|(_, p)| p.rank() == Rank::Flag)?;
    let shell: Vec<usize> = DIRS
        .iter()
        .map(|&d| step(sq, d))
        .filter(|&n| {
            is_valid(n)
                && pos
                    .piece_at(n)
                    .is_some_and(|p| p.color == color && p.rank() == Rank::Bomb)
        })
        .collect();
    Some(FlagGuess {
        sq,
        shell,
        guard_pressure: structure::guard_pressure(pos, color.opposite(), sq),
        certain: true,
    })
}
