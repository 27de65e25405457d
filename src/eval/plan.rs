//! Destination fields and plans.
//!
//! A destination field is a BFS flood from a goal square: each entry is
//! the step count to the goal, `DEST_VALUE_NIL` where unreachable.
//! Plans merge fields at fixed priorities, one plan per side and rank;
//! a move is then rewarded by how many priority-weighted steps it gains
//! toward its piece's strongest live goal.

use std::collections::VecDeque;

use crate::board::{is_valid, step, Color, Position, Rank, DIRS, GRID_SIZE};

use super::values::Values;

/// Step count marking an unreachable square in a destination field.
pub const DEST_VALUE_NIL: i32 = 9999;

/// Goal priorities, high to low.
pub const PRI_DEFEND_FLAG: i32 = 10;
pub const PRI_DEFEND_FLAG_BOMBS: i32 = 6;
pub const PRI_DEFEND_FLAG_AREA: i32 = 5;
pub const PRI_ATTACK_FLAG: i32 = 4;
pub const PRI_CHASE_ATTACK: i32 = 4;
pub const PRI_CHASE_DEFEND: i32 = 3;
pub const PRI_LANE: i32 = 2;
pub const PRI_CHASE: i32 = 1;

/// BFS step counts from a goal for a subject piece of the given color
/// and rank. Occupied squares block, except that in the cautious
/// variant moved non-invincible pieces are flooded through (they can be
/// made to step aside). Squares covered by an enemy guard that beats
/// the subject are avoided.
pub fn dest_field(
    pos: &Position,
    values: &Values,
    goal: usize,
    color: Color,
    rank: Rank,
    cautious: bool,
) -> Box<[i32; GRID_SIZE]> {
    let mut field: Box<[i32; GRID_SIZE]> = vec![DEST_VALUE_NIL; GRID_SIZE]
        .into_boxed_slice()
        .try_into()
        .unwrap_or_else(|_| unreachable!());
    if !is_valid(goal) {
        return field;
    }
    let invincible = values.is_invincible(color, rank);
    field[goal] = 0;
    let mut queue = VecDeque::new();
    queue.push_back(goal);
    while let Some(sq) = queue.pop_front() {
        let d = field[sq];
        for &dir in &DIRS {
            let next = step(sq, dir);
            if !is_valid(next) || field[next] != DEST_VALUE_NIL {
                continue;
            }
            if next != goal && guarded(pos, values, next, color, rank) && !invincible {
                continue;
            }
            match pos.piece_at(next) {
                None => {
                    field[next] = d + 1;
                    queue.push_back(next);
                }
                Some(p) => {
                    // Own moved pieces (or any moved non-invincible
                    // piece in the cautious flood) can be asked to step
                    // aside; the flood passes through at a step cost.
                    let passthrough = if cautious {
                        p.moved && !piece_invincible(values, p)
                    } else {
                        p.color == color && p.moved
                    };
                    if passthrough {
                        field[next] = d + 1;
                        queue.push_back(next);
                    }
                }
            }
        }
    }
    field
}

fn piece_invincible(values: &Values, p: &crate::board::Piece) -> bool {
    p.known && values.is_invincible(p.color, p.rank())
}

/// Whether stepping on `sq` walks into a losing exchange with an
/// adjacent enemy guard, judged on apparent ranks.
fn guarded(pos: &Position, _values: &Values, sq: usize, color: Color, rank: Rank) -> bool {
    DIRS.iter().any(|&d| {
        let n = step(sq, d);
        if !is_valid(n) {
            return false;
        }
        match pos.piece_at(n) {
            Some(g) if g.color != color => {
                let ga = g.apparent_rank(color);
                ga.is_numbered() && rank.is_numbered() && (ga as u8) < (rank as u8)
            }
            _ => false,
        }
    })
}

/// A merged goal field for one side and rank.
#[derive(Clone)]
pub struct Plan {
    priority: Box<[i32; GRID_SIZE]>,
    steps: Box<[i32; GRID_SIZE]>,
}

impl Default for Plan {
    fn default() -> Plan {
        Plan {
            priority: vec![0; GRID_SIZE]
                .into_boxed_slice()
                .try_into()
                .unwrap_or_else(|_| unreachable!()),
            steps: vec![DEST_VALUE_NIL; GRID_SIZE]
                .into_boxed_slice()
                .try_into()
                .unwrap_or_else(|_| unreachable!()),
        }
    }
}

impl Plan {
    /// Merges a destination field at a priority. Higher priority wins
    /// wherever the field reaches; at equal priority the shorter step
    /// count is kept.
    pub fn set_plan(&mut self, field: &[i32; GRID_SIZE], priority: i32) {
        for sq in 0..GRID_SIZE {
            if field[sq] == DEST_VALUE_NIL {
                continue;
            }
            if priority > self.priority[sq] {
                self.priority[sq] = priority;
                self.steps[sq] = field[sq];
            } else if priority == self.priority[sq] && field[sq] < self.steps[sq] {
                self.steps[sq] = field[sq];
            }
        }
    }

    /// Priority-weighted progress of moving from `from` to `to`.
    /// High-priority flag plans only pay off near the root; deeper in
    /// the tree they are noise the opponent can answer.
    pub fn delta(&self, from: usize, to: usize, depth: i32) -> i32 {
        if self.priority[from] != self.priority[to] {
            return 0;
        }
        let pri = self.priority[from];
        if pri == 0 || self.steps[from] == DEST_VALUE_NIL || self.steps[to] == DEST_VALUE_NIL {
            return 0;
        }
        if pri >= PRI_DEFEND_FLAG_AREA && depth > 1 {
            return 0;
        }
        (self.steps[from] - self.steps[to]) * pri
    }

    pub fn priority_at(&self, sq: usize) -> i32 {
        self.priority[sq]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::square;
    use crate::infer::InferState;

    fn empty_values(pos: &Position) -> Values {
        Values::new(pos, Color::Red, &InferState::new())
    }

    #[test]
    fn field_counts_steps_from_goal() {
        let pos = Position::new(20);
        let v = empty_values(&pos);
        let f = dest_field(&pos, &v, square(0, 0), Color::Red, Rank::Captain, false);
        assert_eq!(f[square(0, 0)], 0);
        assert_eq!(f[square(0, 1)], 1);
        assert_eq!(f[square(1, 1)], 2);
    }

    #[test]
    fn field_blocks_on_unmoved_pieces() {
        let mut pos = Position::new(20);
        // Wall off the goal column with unmoved own pieces.
        pos.place(square(0, 1), Color::Red, Rank::Bomb);
        pos.place(square(1, 0), Color::Red, Rank::Bomb);
        let v = empty_values(&pos);
        let f = dest_field(&pos, &v, square(0, 0), Color::Red, Rank::Captain, false);
        assert_eq!(f[square(0, 2)], DEST_VALUE_NIL);
        assert_eq!(f[square(2, 0)], DEST_VALUE_NIL);
    }

    #[test]
    fn field_avoids_guarded_squares() {
        let mut pos = Position::new(20);
        pos.place(square(5, 5), Color::Blue, Rank::Marshal);
        pos.update_piece(square(5, 5), |p| p.make_known());
        let v = empty_values(&pos);
        let f = dest_field(&pos, &v, square(0, 0), Color::Red, Rank::Captain, false);
        // Squares beside the known Marshal are walked around.
        assert_eq!(f[square(5, 4)], DEST_VALUE_NIL);
        assert_eq!(f[square(4, 5)], DEST_VALUE_NIL);
        assert!(f[square(0, 3)] < DEST_VALUE_NIL);
    }

    #[test]
    fn merge_prefers_higher_priority_then_fewer_steps() {
        let pos = Position::new(20);
        let v = empty_values(&pos);
        let far = dest_field(&pos, &v, square(9, 9), Color::Red, Rank::Captain, false);
        let near = dest_field(&pos, &v, square(0, 0), Color::Red, Rank::Captain, false);
        let mut plan = Plan::default();
        plan.set_plan(&far, PRI_CHASE);
        plan.set_plan(&near, PRI_ATTACK_FLAG);
        assert_eq!(plan.priority_at(square(1, 0)), PRI_ATTACK_FLAG);
        // Progress toward (0,0) is rewarded at the flag priority.
        let d = plan.delta(square(2, 0), square(1, 0), 1);
        assert_eq!(d, PRI_ATTACK_FLAG);
    }

    #[test]
    fn deep_flag_plans_are_muted() {
        let pos = Position::new(20);
        let v = empty_values(&pos);
        let f = dest_field(&pos, &v, square(0, 0), Color::Red, Rank::Captain, false);
        let mut plan = Plan::default();
        plan.set_plan(&f, PRI_DEFEND_FLAG_AREA);
        assert!(plan.delta(square(2, 0), square(1, 0), 1) > 0);
        assert_eq!(plan.delta(square(2, 0), square(1, 0), 3), 0);
    }

    #[test]
    fn regression_not_rewarded() {
        let pos = Position::new(20);
        let v = empty_values(&pos);
        let f = dest_field(&pos, &v, square(0, 0), Color::Red, Rank::Captain, false);
        let mut plan = Plan::default();
        plan.set_plan(&f, PRI_CHASE);
        assert!(plan.delta(square(1, 0), square(2, 0), 1) < 0);
    }
}
