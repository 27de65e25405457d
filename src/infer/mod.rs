//! Rank inference.
//!
//! Watches committed moves and turns behavior into beliefs: a piece
//! that chases acquires an acting chase rank and a suspected rank, a
//! piece that declines a fight acquires an acting flee rank, isolated
//! unmoved pieces in the back rows become suspected Bombs, and the
//! opponent's flag is guessed from bomb structures. Beliefs are stored
//! on the pieces themselves and hashed into the guessing observer's
//! hash, so a changed belief is a changed position.

pub mod chase;
pub mod flee;
pub mod structure;
pub mod suspect;

pub use structure::FlagGuess;

use crate::board::{Color, Move, Position, Rank};

/// Cross-move inference state: how often each side's guesses about the
/// other have been confirmed by reveals.
#[derive(Clone, Debug, Default)]
pub struct InferState {
    guessed_correct: [u32; 2],
}

impl InferState {
    pub fn new() -> InferState {
        InferState::default()
    }

    /// How likely the opponent's behavior is theater, from the guesser's
    /// point of view: 5 (no confirmed guesses yet) down to 2. Scales
    /// opponent stealth and gates indirect inference.
    pub fn bluffer_risk(&self, guesser: Color) -> i32 {
        (5 - self.guessed_correct[guesser as usize] as i32).clamp(2, 5)
    }

    pub fn note_guess(&mut self, guesser: Color, correct: bool) {
        if correct {
            self.guessed_correct[guesser as usize] += 1;
        }
    }
}

/// Runs all inference passes after a committed real move. `mv` must be
/// the move just applied to `pos`.
pub fn after_commit(pos: &mut Position, st: &mut InferState, mv: Move) {
    confirm_guesses(pos, st);
    chase::update(pos, mv);
    chase::infer_protector(pos, st, mv);
    flee::update(pos, mv);
    structure::update(pos);
}

/// Checks combat reveals against outstanding suspicions and updates the
/// bluffer bookkeeping. Only guesses about strong ranks (Major and
/// better) count; reading a Scout correctly proves little.
fn confirm_guesses(pos: &mut Position, st: &mut InferState) {
    let undo = match pos.last_undo() {
        Some(u) => u.clone(),
        None => return,
    };
    if undo.to_piece.is_none() {
        // No combat, nothing was revealed.
        return;
    }
    for snap in [undo.from_piece, undo.to_piece].into_iter().flatten() {
        if snap.known {
            continue;
        }
        let Some(sus) = snap.suspected_rank() else {
            continue;
        };
        if (sus as u8) > Rank::Major as u8 {
            continue;
        }
        let guesser = snap.color.opposite();
        st.note_guess(guesser, sus == snap.rank());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bluffer_risk_starts_high_and_decays() {
        let mut st = InferState::new();
        assert_eq!(st.bluffer_risk(Color::Red), 5);
        st.note_guess(Color::Red, true);
        assert_eq!(st.bluffer_risk(Color::Red), 4);
        for _ in 0..10 {
            st.note_guess(Color::Red, true);
        }
        assert_eq!(st.bluffer_risk(Color::Red), 2);
        assert_eq!(st.bluffer_risk(Color::Blue), 5);
    }

    #[test]
    fn wrong_guesses_do_not_decay_risk() {
        let mut st = InferState::new();
        st.note_guess(Color::Blue, false);
        assert_eq!(st.bluffer_risk(Color::Blue), 5);
    }
}
