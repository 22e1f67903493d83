//! Ties the library, settings, backups and practice sessions to a store.
//!
//! Every mutating call is one synchronous read-modify-write: the in-memory
//! state is updated, then the affected records are written back before the
//! call returns.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use stash::{KeyValueStore, RecordStore as _, StoreError};
use vocab_utils::{AnswerMode, Enrichment, Word, Wordbook, WordbookId};

use crate::backup::{self, BackupError, BackupLog, BackupSummary};
use crate::challenges::{self, PracticeMode, PracticeQuestion};
use crate::library::{Library, LibraryError, NewWord, Scope, WordPatch};
use crate::next_cards::pick_next_word;
use crate::practice_queue::{PracticeQueue, QueueError, QueueProgress, QueueState};
use crate::progress::{ProgressSnapshot, SessionKind};
use crate::settings::Settings;
use crate::transfer::{self, ImportSummary, TransferError};
use crate::translation::TranslationConfig;
use crate::utils::{new_id, now};

pub const LIBRARY_KEY: &str = "vocab.library";
pub const SETTINGS_KEY: &str = "vocab.settings";
pub const BACKUPS_KEY: &str = "vocab.backups";
pub const TRANSLATION_KEY: &str = "vocab.translation";

#[derive(Debug, thiserror::Error)]
pub enum VocabError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error("no {0:?} session has been started")]
    NoSession(SessionKind),
}

/// The result of grading one answer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, tsify::Tsify)]
#[tsify(into_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub correct: bool,
    /// The answer that would have been accepted.
    pub expected: String,
    /// The word after its proficiency was updated.
    pub word: Word,
    /// Session progress, when the answer was part of a session.
    pub progress: Option<QueueProgress>,
}

pub struct VocabApp<S: KeyValueStore> {
    store: S,
    library: Library,
    settings: Settings,
    backups: BackupLog,
    translation: TranslationConfig,
    sessions: BTreeMap<SessionKind, PracticeQueue>,
    rng: ChaCha8Rng,
}

impl<S: KeyValueStore> VocabApp<S> {
    pub fn load(store: S) -> Result<Self, VocabError> {
        let seed = now().timestamp_millis() as u64;
        Self::load_with_seed(store, seed)
    }

    /// Loads persisted state. An unreadable library is an error, since
    /// replacing it would lose the user's words; unreadable settings and
    /// backups fall back to their defaults.
    pub fn load_with_seed(store: S, seed: u64) -> Result<Self, VocabError> {
        let library = store.load::<Library>(LIBRARY_KEY)?.unwrap_or_default();
        let settings = store
            .load_or_discard::<Settings>(SETTINGS_KEY)?
            .unwrap_or_default();
        let backups = store
            .load_or_discard::<BackupLog>(BACKUPS_KEY)?
            .unwrap_or_default();
        let translation = store
            .load_or_discard::<TranslationConfig>(TRANSLATION_KEY)?
            .unwrap_or_default();

        let mut app = Self {
            store,
            library,
            settings,
            backups,
            translation,
            sessions: BTreeMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        };

        let rng = &mut app.rng;
        if app.library.seed_if_empty(|| new_id(rng), now()) {
            log::info!("Seeded an empty library");
            app.save_library()?;
        }
        if app.forget_missing_selection() {
            app.save_settings()?;
        }
        log::info!(
            "Loaded {} words in {} wordbooks",
            app.library.words.len(),
            app.library.wordbooks.len()
        );
        Ok(app)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn word(&self, id: &str) -> Option<&Word> {
        self.library.word(id)
    }

    pub fn scope(&self) -> Scope {
        self.settings.scope()
    }

    pub fn words_in_scope(&self) -> Vec<Word> {
        let scope = self.scope();
        self.library.words_in_scope(&scope).cloned().collect()
    }

    fn save_library(&mut self) -> Result<(), StoreError> {
        self.store.save(LIBRARY_KEY, &self.library)
    }

    fn save_settings(&mut self) -> Result<(), StoreError> {
        self.store.save(SETTINGS_KEY, &self.settings)
    }

    fn save_backups(&mut self) -> Result<(), StoreError> {
        self.store.save(BACKUPS_KEY, &self.backups)
    }

    fn save_session(&mut self, kind: SessionKind) -> Result<(), StoreError> {
        match self.sessions.get(&kind) {
            Some(queue) => {
                let snapshot = queue.snapshot(now());
                self.store.save(kind.storage_key(), &snapshot)
            }
            None => self.store.remove(kind.storage_key()),
        }
    }

    /// Persists the library after a user edit, taking an automatic backup
    /// when the change is large enough.
    fn library_changed(&mut self) -> Result<(), StoreError> {
        if self.backups.auto_backup(&self.library, now()) {
            self.save_backups()?;
        }
        self.save_library()
    }

    /// Clears the selected wordbook if it no longer exists.
    fn forget_missing_selection(&mut self) -> bool {
        match &self.settings.current_wordbook_id {
            Some(id) if self.library.wordbook(id).is_none() => {
                log::warn!("Selected wordbook {id} no longer exists");
                self.settings.current_wordbook_id = None;
                true
            }
            _ => false,
        }
    }

    // Settings

    pub fn update_settings(&mut self, settings: Settings) -> Result<&Settings, VocabError> {
        self.settings = settings.sanitized();
        self.forget_missing_selection();
        self.save_settings()?;
        self.refresh_sessions()?;
        Ok(&self.settings)
    }

    pub fn translation_config(&self) -> &TranslationConfig {
        &self.translation
    }

    pub fn update_translation_config(
        &mut self,
        config: TranslationConfig,
    ) -> Result<&TranslationConfig, VocabError> {
        self.translation = config.sanitized();
        self.store.save(TRANSLATION_KEY, &self.translation)?;
        Ok(&self.translation)
    }

    pub fn select_wordbook(&mut self, wordbook_id: Option<WordbookId>) -> Result<(), VocabError> {
        if let Some(id) = &wordbook_id {
            if self.library.wordbook(id).is_none() {
                return Err(LibraryError::UnknownWordbook(id.clone()).into());
            }
        }
        self.settings.current_wordbook_id = wordbook_id;
        self.save_settings()?;
        self.refresh_sessions()
    }

    // Free quiz

    pub fn next_quiz_word(&mut self) -> Option<Word> {
        let scope = self.scope();
        pick_next_word(
            self.library.words_in_scope(&scope),
            self.settings.quiz_order,
            &mut self.rng,
        )
        .cloned()
    }

    pub fn submit_quiz_answer(
        &mut self,
        word_id: &str,
        input: &str,
    ) -> Result<AnswerOutcome, VocabError> {
        let word = self.require_word(word_id)?;
        let mode = self.settings.answer_mode;
        let correct = challenges::judge_answer(input, &word, mode);
        let expected = expected_answer(&word, mode);
        self.grade(word, correct, expected, None)
    }

    fn require_word(&self, word_id: &str) -> Result<Word, LibraryError> {
        self.library
            .word(word_id)
            .cloned()
            .ok_or_else(|| LibraryError::UnknownWord(word_id.to_string()))
    }

    /// Applies a graded answer to the word, and to a session when given.
    /// The word is stored first; the session only advances once that
    /// succeeded.
    fn grade(
        &mut self,
        word: Word,
        correct: bool,
        expected: String,
        session: Option<SessionKind>,
    ) -> Result<AnswerOutcome, VocabError> {
        if let Some(kind) = session {
            let queue = self.sessions.get(&kind).ok_or(VocabError::NoSession(kind))?;
            if queue.state() == QueueState::Completed {
                return Err(QueueError::Completed.into());
            }
        }

        let updated = word.apply_answer(correct, now());
        self.library.replace_word(updated.clone())?;
        if let Err(e) = self.save_library() {
            self.library.replace_word(word)?;
            return Err(e.into());
        }

        let progress = match session {
            Some(kind) => {
                let queue = self
                    .sessions
                    .get_mut(&kind)
                    .ok_or(VocabError::NoSession(kind))?;
                queue.record_answer(correct)?;
                let progress = queue.progress();
                self.save_session(kind)?;
                Some(progress)
            }
            None => None,
        };

        Ok(AnswerOutcome {
            correct,
            expected,
            word: updated,
            progress,
        })
    }

    // Sessions

    /// Resumes the saved session for the active scope, or starts a new one.
    pub fn start_session(&mut self, kind: SessionKind) -> Result<QueueProgress, VocabError> {
        let scope = self.scope();
        if let Some(queue) = self.sessions.get(&kind) {
            if queue.scope_id() == scope.id() {
                return Ok(queue.progress());
            }
        }

        let restored = self
            .store
            .load_or_discard::<ProgressSnapshot>(kind.storage_key())?
            .and_then(|snapshot| {
                PracticeQueue::restore(snapshot, scope.id(), self.library.words_in_scope(&scope))
                    .inspect_err(|e| log::info!("Not resuming {kind:?} session: {e}"))
                    .ok()
            });

        match restored {
            Some(queue) => {
                let progress = queue.progress();
                self.sessions.insert(kind, queue);
                Ok(progress)
            }
            None => self.rebuild_session(kind),
        }
    }

    /// Throws away the session's progress and starts over.
    pub fn restart_session(&mut self, kind: SessionKind) -> Result<QueueProgress, VocabError> {
        self.store.remove(kind.storage_key())?;
        self.rebuild_session(kind)
    }

    pub fn clear_progress(&mut self, kind: SessionKind) -> Result<QueueProgress, VocabError> {
        self.restart_session(kind)
    }

    pub fn end_session(&mut self, kind: SessionKind) {
        self.sessions.remove(&kind);
    }

    fn rebuild_session(&mut self, kind: SessionKind) -> Result<QueueProgress, VocabError> {
        let scope = self.scope();
        let queue = PracticeQueue::build(
            scope.id(),
            self.library.words_in_scope(&scope),
            self.settings.initial_repeat,
        );
        log::info!(
            "Built {kind:?} session of {} items for scope {}",
            queue.len(),
            scope.id()
        );
        let progress = queue.progress();
        self.sessions.insert(kind, queue);
        self.save_session(kind)?;
        Ok(progress)
    }

    /// Rebuilds any running session whose scope changed or that refers to a
    /// word that is no longer practicable.
    fn refresh_sessions(&mut self) -> Result<(), VocabError> {
        let scope = self.scope();
        let stale: Vec<SessionKind> = self
            .sessions
            .iter()
            .filter(|(_, queue)| {
                queue.scope_id() != scope.id()
                    || queue.items().iter().any(|item| {
                        self.library
                            .word(&item.word_id)
                            .is_none_or(|word| word.archived || !scope.contains(word))
                    })
            })
            .map(|(kind, _)| *kind)
            .collect();

        for kind in stale {
            log::info!("Rebuilding {kind:?} session after a library change");
            self.rebuild_session(kind)?;
        }
        Ok(())
    }

    pub fn session_progress(&self, kind: SessionKind) -> Option<QueueProgress> {
        self.sessions.get(&kind).map(PracticeQueue::progress)
    }

    pub fn current_session_word(&self, kind: SessionKind) -> Option<Word> {
        let item = self.sessions.get(&kind)?.current()?;
        self.library.word(&item.word_id).cloned()
    }

    pub fn submit_session_answer(
        &mut self,
        kind: SessionKind,
        input: &str,
    ) -> Result<AnswerOutcome, VocabError> {
        let queue = self.sessions.get(&kind).ok_or(VocabError::NoSession(kind))?;
        let item = queue.current().ok_or(QueueError::Completed)?;
        let word = self.require_word(&item.word_id)?;

        let mode = self.settings.answer_mode;
        let correct = challenges::judge_answer(input, &word, mode);
        let expected = expected_answer(&word, mode);
        self.grade(word, correct, expected, Some(kind))
    }

    // Multiple-choice practice

    /// The next multiple-choice question. While a practice session is active
    /// the question is about its current word; otherwise the word is picked
    /// the same way as in the free quiz.
    pub fn practice_question(&mut self, mode: PracticeMode) -> Option<PracticeQuestion> {
        let in_session = self
            .sessions
            .get(&SessionKind::Practice)
            .is_some_and(|queue| queue.state() == QueueState::Active);
        let word = if in_session {
            self.current_session_word(SessionKind::Practice)?
        } else {
            self.next_quiz_word()?
        };
        let pool = self.words_in_scope();
        Some(challenges::build_question(&word, &pool, mode, &mut self.rng))
    }

    pub fn submit_practice_answer(
        &mut self,
        question: &PracticeQuestion,
        choice: &str,
    ) -> Result<AnswerOutcome, VocabError> {
        let word = self.require_word(&question.word.id)?;
        let correct = challenges::judge_choice(choice, question);

        let in_session = self
            .sessions
            .get(&SessionKind::Practice)
            .and_then(PracticeQueue::current)
            .is_some_and(|item| item.word_id == word.id);
        let session = in_session.then_some(SessionKind::Practice);

        self.grade(word, correct, question.correct_answer.clone(), session)
    }

    // Library

    pub fn add_word(&mut self, new_word: NewWord) -> Result<Word, VocabError> {
        let id = new_id(&mut self.rng);
        let selected = self.settings.current_wordbook_id.clone();
        let word = self
            .library
            .add_word(id, new_word, selected.as_deref(), now())?
            .clone();
        self.library_changed()?;
        Ok(word)
    }

    pub fn update_word(&mut self, id: &str, patch: WordPatch) -> Result<Word, VocabError> {
        let word = self.library.update_word(id, patch, now())?.clone();
        self.library_changed()?;
        self.refresh_sessions()?;
        Ok(word)
    }

    pub fn set_archived(&mut self, id: &str, archived: bool) -> Result<Word, VocabError> {
        self.update_word(
            id,
            WordPatch {
                archived: Some(archived),
                ..Default::default()
            },
        )
    }

    pub fn remove_word(&mut self, id: &str) -> Result<Word, VocabError> {
        let removed = self.library.remove_word(id)?;
        self.library_changed()?;
        self.refresh_sessions()?;
        Ok(removed)
    }

    /// Stores lookup results on a word without overwriting anything the user
    /// entered.
    pub fn apply_enrichment(
        &mut self,
        id: &str,
        enrichment: &Enrichment,
    ) -> Result<Word, VocabError> {
        let mut word = self.require_word(id)?;
        word.apply_enrichment(enrichment);
        word.updated_at = now();
        self.library.replace_word(word.clone())?;
        self.save_library()?;
        Ok(word)
    }

    pub fn add_wordbook(
        &mut self,
        name: &str,
        description: Option<String>,
    ) -> Result<Wordbook, VocabError> {
        let id = new_id(&mut self.rng);
        let wordbook = self
            .library
            .add_wordbook(id, name, description, now())?
            .clone();
        self.library_changed()?;
        Ok(wordbook)
    }

    pub fn rename_wordbook(
        &mut self,
        id: &str,
        name: &str,
        description: Option<String>,
    ) -> Result<Wordbook, VocabError> {
        let wordbook = self
            .library
            .rename_wordbook(id, name, description, now())?
            .clone();
        self.save_library()?;
        Ok(wordbook)
    }

    /// Deletes a wordbook and its words. Returns how many words were removed.
    pub fn remove_wordbook(&mut self, id: &str) -> Result<usize, VocabError> {
        let removed = self.library.remove_wordbook(id)?;
        self.library_changed()?;
        if self.forget_missing_selection() {
            self.save_settings()?;
        }
        self.refresh_sessions()?;
        Ok(removed.len())
    }

    // Import / export

    pub fn export_wordbook(&self, id: &str) -> Result<String, VocabError> {
        Ok(transfer::export_wordbook(&self.library, id, now())?)
    }

    /// Imports an export file and selects the wordbook it went into.
    pub fn import_wordbook(
        &mut self,
        data: &str,
        target: Option<&str>,
    ) -> Result<ImportSummary, VocabError> {
        let rng = &mut self.rng;
        let summary =
            transfer::import_wordbook(&mut self.library, data, target, || new_id(rng), now())?;
        self.library_changed()?;
        self.select_wordbook(Some(summary.wordbook_id.clone()))?;
        Ok(summary)
    }

    // Backups

    pub fn backups(&self) -> Vec<BackupSummary> {
        self.backups.summaries()
    }

    pub fn create_backup(&mut self) -> Result<(), VocabError> {
        self.backups.create(&self.library, now());
        self.save_backups()?;
        Ok(())
    }

    /// Replaces the whole library with a backup.
    pub fn restore_backup(&mut self, index: usize) -> Result<(), VocabError> {
        self.library = self.backups.get(index)?.library.clone();
        self.save_library()?;
        if self.forget_missing_selection() {
            self.save_settings()?;
        }
        self.refresh_sessions()
    }

    /// Adds a backup's words as a new wordbook and selects it.
    pub fn restore_backup_as_new_wordbook(
        &mut self,
        index: usize,
    ) -> Result<WordbookId, VocabError> {
        let backup = self.backups.get(index)?.clone();
        let rng = &mut self.rng;
        let wordbook_id = backup::restore_as_new_wordbook(
            &mut self.library,
            &backup,
            index,
            || new_id(rng),
            now(),
        );
        self.save_library()?;
        self.select_wordbook(Some(wordbook_id.clone()))?;
        Ok(wordbook_id)
    }
}

fn expected_answer(word: &Word, mode: AnswerMode) -> String {
    match mode {
        AnswerMode::RecallTerm => word.term.clone(),
        AnswerMode::RecallMeaning => word.meaning_native.clone(),
    }
}
