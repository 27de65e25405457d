//! Transposition table.
//!
//! Entries age by move root: a committed real move bumps the root
//! counter, and a probe discounts stored depth by how many roots ago
//! the entry was written, so stale analysis must be re-proven rather
//! than trusted outright. Entries also carry the search mode they were
//! produced under; an entry only ever answers probes from its own
//! mode.

use crate::board::{Move, NULL_MOVE};

/// Default table size, as a power of two.
pub const TT_BITS: u32 = 22;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

/// Which move set produced a value: the full move list or the
/// chase-restricted one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Broad,
    Deep,
}

#[derive(Clone, Copy)]
struct Entry {
    key: u64,
    value: i32,
    depth: i8,
    move_root: u16,
    bound: Bound,
    mode: Mode,
    mv: Move,
}

/// A successful probe, with depth already discounted for age.
pub struct TtHit {
    pub value: i32,
    pub depth: i32,
    pub bound: Bound,
    pub mv: Move,
}

pub struct TransTable {
    entries: Vec<Option<Entry>>,
    mask: usize,
    move_root: u16,
}

impl TransTable {
    pub fn new() -> TransTable {
        TransTable::with_bits(TT_BITS)
    }

    /// A smaller table for tests and fixed-memory hosts.
    pub fn with_bits(bits: u32) -> TransTable {
        let size = 1usize << bits;
        TransTable {
            entries: vec![None; size],
            mask: size - 1,
            move_root: 0,
        }
    }

    /// Bumps the root counter. Call once per committed real move.
    pub fn new_root(&mut self) {
        self.move_root = self.move_root.wrapping_add(1);
    }

    pub fn probe(&self, key: u64, mode: Mode) -> Option<TtHit> {
        let e = self.entries[(key as usize) & self.mask]?;
        if e.key != key {
            return None;
        }
        if e.mode != mode {
            // A value proven on one move set does not bind the other:
            // the restricted set omits moves the broad search must
            // consider, and a broad value can mask a line the deep
            // search is meant to refute.
            return None;
        }
        let age = self.move_root.wrapping_sub(e.move_root) as i32;
        Some(TtHit {
            value: e.value,
            depth: e.depth as i32 - age,
            bound: e.bound,
            mv: e.mv,
        })
    }

    /// Stores an entry, keeping the deeper of the incumbent and the
    /// newcomer once age is discounted.
    pub fn store(&mut self, key: u64, depth: i32, value: i32, bound: Bound, mode: Mode, mv: Move) {
        let slot = (key as usize) & self.mask;
        if let Some(e) = &self.entries[slot] {
            if e.key != key {
                let age = self.move_root.wrapping_sub(e.move_root) as i32;
                if (e.depth as i32 - age) > depth {
                    return;
                }
            }
        }
        self.entries[slot] = Some(Entry {
            key,
            value,
            depth: depth.clamp(i8::MIN as i32, i8::MAX as i32) as i8,
            move_root: self.move_root,
            bound,
            mode,
            mv,
        });
    }

    pub fn clear(&mut self) {
        self.entries.iter_mut().for_each(|e| *e = None);
        self.move_root = 0;
    }

    /// The stored best move for a key, if any survives.
    pub fn best_move(&self, key: u64, mode: Mode) -> Move {
        self.probe(key, mode).map_or(NULL_MOVE, |h| h.mv)
    }
}

impl Default for TransTable {
    fn default() -> TransTable {
        TransTable::new()
    }
}
