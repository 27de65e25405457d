//! Piece ranks and the combat table.
//!
//! Ranks are numbered the classic way: Marshal is 1 and beats everything
//! movable, Scout is 9. Spy, Bomb and Flag sit past the numbered ranks,
//! and `Unknown` is the pseudo-rank used for hashing hidden pieces and
//! for acting ranks acquired against hidden pieces.

/// Number of rank slots, including the unused index 0 and `Unknown`.
/// Arrays indexed by rank use this size so `rank as usize` indexes
/// directly.
pub const RANK_COUNT: usize = 14;

/// A piece rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Rank {
    Marshal = 1,
    General = 2,
    Colonel = 3,
    Major = 4,
    Captain = 5,
    Lieutenant = 6,
    Sergeant = 7,
    Miner = 8,
    Scout = 9,
    Spy = 10,
    Bomb = 11,
    Flag = 12,
    Unknown = 13,
}

/// All real ranks, strongest first. `Unknown` is not a real rank.
pub const ALL_RANKS: [Rank; 12] = [
    Rank::Marshal,
    Rank::General,
    Rank::Colonel,
    Rank::Major,
    Rank::Captain,
    Rank::Lieutenant,
    Rank::Sergeant,
    Rank::Miner,
    Rank::Scout,
    Rank::Spy,
    Rank::Bomb,
    Rank::Flag,
];

/// Outcome of combat from the attacker's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Attacker survives, defender is removed.
    Wins,
    /// Defender survives, attacker is removed.
    Loses,
    /// Both pieces are removed.
    Even,
}

impl Rank {
    /// Converts a rank index back to a rank. Index 0 and anything past
    /// `Unknown` are invalid.
    pub const fn from_index(i: usize) -> Option<Rank> {
        match i {
            1 => Some(Rank::Marshal),
            2 => Some(Rank::General),
            3 => Some(Rank::Colonel),
            4 => Some(Rank::Major),
            5 => Some(Rank::Captain),
            6 => Some(Rank::Lieutenant),
            7 => Some(Rank::Sergeant),
            8 => Some(Rank::Miner),
            9 => Some(Rank::Scout),
            10 => Some(Rank::Spy),
            11 => Some(Rank::Bomb),
            12 => Some(Rank::Flag),
            13 => Some(Rank::Unknown),
            _ => None,
        }
    }

    /// How many pieces of this rank each side starts with.
    pub const fn start_count(self) -> u8 {
        match self {
            Rank::Marshal => 1,
            Rank::General => 1,
            Rank::Colonel => 2,
            Rank::Major => 3,
            Rank::Captain => 4,
            Rank::Lieutenant => 4,
            Rank::Sergeant => 4,
            Rank::Miner => 5,
            Rank::Scout => 8,
            Rank::Spy => 1,
            Rank::Bomb => 6,
            Rank::Flag => 1,
            Rank::Unknown => 0,
        }
    }

    /// Whether pieces of this rank can ever move.
    pub const fn is_movable(self) -> bool {
        !matches!(self, Rank::Bomb | Rank::Flag)
    }

    /// Whether this is one of the numbered ranks 1..9.
    pub const fn is_numbered(self) -> bool {
        (self as u8) <= Rank::Scout as u8
    }

    /// Display character: '1'..'9', 'S', 'B', 'F', '?'.
    pub const fn to_char(self) -> char {
        match self {
            Rank::Marshal => '1',
            Rank::General => '2',
            Rank::Colonel => '3',
            Rank::Major => '4',
            Rank::Captain => '5',
            Rank::Lieutenant => '6',
            Rank::Sergeant => '7',
            Rank::Miner => '8',
            Rank::Scout => '9',
            Rank::Spy => 'S',
            Rank::Bomb => 'B',
            Rank::Flag => 'F',
            Rank::Unknown => '?',
        }
    }

    /// Parses a display character back to a rank.
    pub const fn from_char(c: char) -> Option<Rank> {
        match c {
            '1' => Some(Rank::Marshal),
            '2' => Some(Rank::General),
            '3' => Some(Rank::Colonel),
            '4' => Some(Rank::Major),
            '5' => Some(Rank::Captain),
            '6' => Some(Rank::Lieutenant),
            '7' => Some(Rank::Sergeant),
            '8' => Some(Rank::Miner),
            '9' => Some(Rank::Scout),
            'S' => Some(Rank::Spy),
            'B' => Some(Rank::Bomb),
            'F' => Some(Rank::Flag),
            '?' => Some(Rank::Unknown),
            _ => None,
        }
    }
}

/// Resolves combat between two known ranks. Pure function of the ranks:
/// the Spy wins only as the attacker against the Marshal, only the Miner
/// defuses a Bomb, any attacker captures the Flag, equal ranks remove
/// both. Otherwise the lower rank number wins.
pub const fn combat(attacker: Rank, defender: Rank) -> Outcome {
    match defender {
        Rank::Flag => Outcome::Wins,
        Rank::Bomb => {
            if matches!(attacker, Rank::Miner) {
                Outcome::Wins
            } else {
                Outcome::Loses
            }
        }
        Rank::Marshal if matches!(attacker, Rank::Spy) => Outcome::Wins,
        _ => {
            let a = attacker as u8;
            let d = defender as u8;
            if a == d {
                Outcome::Even
            } else if a < d {
                Outcome::Wins
            } else {
                Outcome::Loses
            }
        }
    }
}
