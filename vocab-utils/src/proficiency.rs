//! Mastery tracking for a single word.
//!
//! A word that has never been missed moves up one level on every correct
//! answer. Once it has been missed, it needs [`RECOVERY_STREAK`] correct
//! answers in a row before it moves up again, and the miss record is cleared
//! at that point.

use chrono::{DateTime, Utc};

use crate::Word;

pub const MAX_PROFICIENCY: u8 = 5;
pub const RECOVERY_STREAK: u32 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProficiencyState {
    pub proficiency: u8,
    pub error_count: u32,
    pub correct_streak: u32,
}

impl ProficiencyState {
    pub fn transition(self, correct: bool) -> Self {
        let proficiency = self.proficiency.min(MAX_PROFICIENCY);
        let promoted = (proficiency + 1).min(MAX_PROFICIENCY);

        if !correct {
            return Self {
                proficiency: proficiency.saturating_sub(1),
                error_count: self.error_count.saturating_add(1),
                correct_streak: 0,
            };
        }

        if self.error_count == 0 {
            return Self {
                proficiency: promoted,
                error_count: 0,
                correct_streak: 0,
            };
        }

        let correct_streak = self.correct_streak.saturating_add(1);
        if correct_streak >= RECOVERY_STREAK {
            Self {
                proficiency: promoted,
                error_count: 0,
                correct_streak: 0,
            }
        } else {
            Self {
                proficiency,
                error_count: self.error_count,
                correct_streak,
            }
        }
    }
}

impl Word {
    pub fn proficiency_state(&self) -> ProficiencyState {
        ProficiencyState {
            proficiency: self.proficiency,
            error_count: self.error_count,
            correct_streak: self.correct_streak,
        }
    }

    /// Returns the word as it stands after one graded answer.
    pub fn apply_answer(&self, correct: bool, now: DateTime<Utc>) -> Word {
        let next = self.proficiency_state().transition(correct);
        Word {
            proficiency: next.proficiency,
            error_count: next.error_count,
            correct_streak: next.correct_streak,
            updated_at: now,
            ..self.clone()
        }
    }
}
