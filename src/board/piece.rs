//! Piece state, including the inference bookkeeping attached to each
//! piece: suspected rank, acting chase/flee ranks, and the maturation
//! counter that decides when a suspicion is trusted in combat
//! prediction.

use super::rank::Rank;

/// A suspected rank becomes usable for combat prediction after the
/// piece makes this many further moves of its own.
pub const SUSPECT_MATURITY: u8 = 15;

/// Three successive confirming chases mature a suspicion immediately.
pub const CHASE_STREAK_MATURE: u8 = 3;

/// Side colors. Red sets up on rows 0..3, Blue on rows 6..9.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    Red = 0,
    Blue = 1,
}

impl Color {
    pub const fn opposite(self) -> Color {
        match self {
            Color::Red => Color::Blue,
            Color::Blue => Color::Red,
        }
    }

    /// Grid offset toward the enemy's side.
    pub const fn forward(self) -> isize {
        match self {
            Color::Red => 11,
            Color::Blue => -11,
        }
    }
}

/// How a piece appears to an observer, used for hashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Visibility {
    Hidden = 0,
    Known = 1,
    Suspected = 2,
}

/// One piece on the board. Small and `Copy`; undo records store whole
/// piece snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Piece {
    pub color: Color,
    /// Stable identity within the side, 0..39. Survives moves and lets
    /// inference track a piece across turns.
    pub id: u8,
    rank: Rank,
    suspected: Option<Rank>,
    pub known: bool,
    pub moved: bool,
    pub move_count: u8,
    chase: Option<Rank>,
    flee: Option<Rank>,
    /// An unknown piece that may still turn out to be a Miner. Cleared
    /// when its behavior precludes it.
    pub maybe_miner: bool,
    /// Own moves made since the current suspicion was acquired.
    pub suspect_age: u8,
    /// Successive chase confirmations of the current suspicion.
    pub chase_streak: u8,
    /// Won a fight without being fully identified: the observer knows
    /// it is at least the rank it beat, not which rank exactly.
    pub known_unknown: bool,
}

impl Piece {
    pub fn new(color: Color, id: u8, rank: Rank) -> Piece {
        Piece {
            color,
            id,
            rank,
            suspected: None,
            known: false,
            moved: false,
            move_count: 0,
            chase: None,
            flee: None,
            maybe_miner: true,
            suspect_age: 0,
            chase_streak: 0,
            known_unknown: false,
        }
    }

    /// The true rank. Combat resolution uses this; prediction must not.
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// The engine's current guess for this piece, if any.
    pub fn suspected_rank(&self) -> Option<Rank> {
        self.suspected
    }

    /// The rank this piece presents to the given observer: the true
    /// rank when known or owned, the suspicion otherwise, else Unknown.
    pub fn apparent_rank(&self, observer: Color) -> Rank {
        if self.known || self.color == observer {
            self.rank
        } else if let Some(s) = self.suspected {
            s
        } else {
            Rank::Unknown
        }
    }

    /// Visibility class for hashing, from the given observer's side.
    pub fn visibility(&self, observer: Color) -> Visibility {
        if self.known {
            Visibility::Known
        } else if self.color == observer {
            Visibility::Hidden
        } else if self.suspected.is_some() {
            Visibility::Suspected
        } else {
            Visibility::Hidden
        }
    }

    /// Assigns a suspected rank, restarting maturation. Re-assigning
    /// the same rank keeps the current age.
    pub fn set_suspected(&mut self, rank: Rank) {
        if self.suspected != Some(rank) {
            self.suspected = Some(rank);
            self.suspect_age = 0;
            self.chase_streak = 0;
        }
        if rank == Rank::Bomb || rank == Rank::Flag || rank == Rank::Spy {
            self.maybe_miner = false;
        }
    }

    pub fn clear_suspected(&mut self) {
        self.suspected = None;
        self.suspect_age = 0;
        self.chase_streak = 0;
    }

    /// Whether the suspicion is trusted for combat prediction.
    pub fn suspect_mature(&self) -> bool {
        self.suspected.is_some()
            && (self.suspect_age >= SUSPECT_MATURITY || self.chase_streak >= CHASE_STREAK_MATURE)
    }

    pub fn acting_chase(&self) -> Option<Rank> {
        self.chase
    }

    pub fn set_acting_chase(&mut self, rank: Rank) {
        self.chase = Some(rank);
    }

    pub fn clear_acting_chase(&mut self) {
        self.chase = None;
    }

    pub fn acting_flee(&self) -> Option<Rank> {
        self.flee
    }

    /// Records that this piece declined to attack the given rank. Keeps
    /// the weaker (higher-numbered) rank when one is already recorded:
    /// fleeing from a Scout says more than fleeing from a Marshal.
    pub fn set_acting_flee(&mut self, rank: Rank) {
        match self.flee {
            Some(f) if f >= rank => {}
            _ => self.flee = Some(rank),
        }
    }

    pub fn clear_acting_flee(&mut self) {
        self.flee = None;
    }

    /// Reveals the true rank (combat, or a Scout slide).
    pub fn make_known(&mut self) {
        self.known = true;
        self.suspected = None;
        self.maybe_miner = self.rank == Rank::Miner;
    }

    /// Marks a move made by this piece.
    pub fn note_moved(&mut self) {
        self.moved = true;
        self.move_count = self.move_count.saturating_add(1);
        if self.suspected == Some(Rank::Bomb) {
            // A moving piece is no bomb.
            self.suspected = None;
        }
        if self.suspected.is_some() {
            self.suspect_age = self.suspect_age.saturating_add(1);
        }
    }
}
