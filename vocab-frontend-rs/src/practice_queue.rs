//! The self-extending practice queue.
//!
//! At the start of a session every word in scope is queued `initial_repeat`
//! times (the whole pool once, then again). Each answer advances the read
//! index by one. A wrong answer appends [`REQUEUE_COPIES`] more items for the
//! same word, so a session only ends once every word has been answered
//! correctly at least as many times as it was scheduled.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use vocab_utils::{Word, WordId};

use crate::progress::{ProgressSnapshot, QueueItem};

pub const INITIAL_REPEAT: u32 = 2;
pub const REQUEUE_COPIES: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueState {
    Active,
    Completed,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("the session is already complete")]
    Completed,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RestoreError {
    #[error("saved progress belongs to scope {saved}, the active scope is {active}")]
    ScopeMismatch { saved: String, active: String },

    #[error("saved progress refers to word {0}, which no longer exists")]
    MissingWord(WordId),
}

/// What happened to the queue after one answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnswerRecord {
    pub word_id: WordId,
    pub correct: bool,
    pub requeued: usize,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, tsify::Tsify)]
#[tsify(into_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct QueueProgress {
    pub current_index: usize,
    pub length: usize,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub accuracy: f64,
    pub completed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PracticeQueue {
    scope_id: String,
    items: Vec<QueueItem>,
    current_index: usize,
    total_attempts: u32,
    correct_attempts: u32,
}

impl PracticeQueue {
    pub fn build<'a>(
        scope_id: impl Into<String>,
        words: impl IntoIterator<Item = &'a Word>,
        initial_repeat: u32,
    ) -> Self {
        let pool: Vec<&WordId> = words
            .into_iter()
            .filter(|word| !word.archived)
            .map(|word| &word.id)
            .collect();

        let mut items = Vec::with_capacity(pool.len() * initial_repeat as usize);
        for _ in 0..initial_repeat {
            items.extend(pool.iter().map(|word_id| QueueItem {
                word_id: (*word_id).clone(),
                remaining_times: initial_repeat,
                error_count: 0,
            }));
        }

        Self {
            scope_id: scope_id.into(),
            items,
            current_index: 0,
            total_attempts: 0,
            correct_attempts: 0,
        }
    }

    /// Rehydrates a saved queue. Fails if the snapshot belongs to a different
    /// scope or mentions a word that is gone (or archived) since it was saved.
    pub fn restore<'a>(
        snapshot: ProgressSnapshot,
        active_scope_id: &str,
        live_words: impl IntoIterator<Item = &'a Word>,
    ) -> Result<Self, RestoreError> {
        if snapshot.scope_id != active_scope_id {
            return Err(RestoreError::ScopeMismatch {
                saved: snapshot.scope_id,
                active: active_scope_id.to_string(),
            });
        }

        let live: HashSet<&str> = live_words
            .into_iter()
            .filter(|word| !word.archived)
            .map(|word| word.id.as_str())
            .collect();
        if let Some(missing) = snapshot
            .queue
            .iter()
            .find(|item| !live.contains(item.word_id.as_str()))
        {
            return Err(RestoreError::MissingWord(missing.word_id.clone()));
        }

        Ok(Self {
            scope_id: snapshot.scope_id,
            items: snapshot.queue,
            current_index: snapshot.current_index,
            total_attempts: snapshot.total_attempts,
            correct_attempts: snapshot.correct_attempts,
        })
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> ProgressSnapshot {
        ProgressSnapshot {
            scope_id: self.scope_id.clone(),
            current_index: self.current_index,
            queue: self.items.clone(),
            total_attempts: self.total_attempts,
            correct_attempts: self.correct_attempts,
            saved_at: now,
        }
    }

    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn state(&self) -> QueueState {
        if self.current_index >= self.items.len() {
            QueueState::Completed
        } else {
            QueueState::Active
        }
    }

    pub fn current(&self) -> Option<&QueueItem> {
        self.items.get(self.current_index)
    }

    pub fn record_answer(&mut self, correct: bool) -> Result<AnswerRecord, QueueError> {
        let current = self.current().cloned().ok_or(QueueError::Completed)?;

        self.total_attempts += 1;
        let requeued = if correct {
            self.correct_attempts += 1;
            0
        } else {
            let copy = QueueItem {
                word_id: current.word_id.clone(),
                remaining_times: REQUEUE_COPIES as u32,
                error_count: current.error_count + 1,
            };
            self.items.extend(std::iter::repeat_n(copy, REQUEUE_COPIES));
            REQUEUE_COPIES
        };
        self.current_index += 1;

        Ok(AnswerRecord {
            word_id: current.word_id,
            correct,
            requeued,
        })
    }

    /// Share of correct answers so far, in `[0, 1]`; 0 before the first answer.
    pub fn accuracy(&self) -> f64 {
        if self.total_attempts == 0 {
            0.0
        } else {
            f64::from(self.correct_attempts) / f64::from(self.total_attempts)
        }
    }

    pub fn progress(&self) -> QueueProgress {
        QueueProgress {
            current_index: self.current_index.min(self.items.len()),
            length: self.items.len(),
            total_attempts: self.total_attempts,
            correct_attempts: self.correct_attempts,
            accuracy: self.accuracy(),
            completed: self.state() == QueueState::Completed,
        }
    }
}
