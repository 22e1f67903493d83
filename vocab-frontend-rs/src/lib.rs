#![deny(clippy::string_slice)]

pub mod app;
pub mod backup;
pub mod challenges;
pub mod enrichment;
pub mod library;
pub mod next_cards;
pub mod practice_queue;
pub mod progress;
pub mod settings;
pub mod transfer;
pub mod translation;
mod utils;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;

use stash::KeyValueStore;
use vocab_utils::{Enrichment, Word, Wordbook};
use wasm_bindgen::prelude::*;

pub use app::{AnswerOutcome, VocabApp, VocabError};
pub use challenges::{PracticeMode, PracticeQuestion};
pub use enrichment::EnrichmentChain;
pub use library::{NewWord, WordPatch};
pub use practice_queue::QueueProgress;
pub use progress::SessionKind;
pub use settings::Settings;
pub use transfer::ImportSummary;
pub use translation::TranslationConfig;

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
pub fn get_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

impl From<VocabError> for JsValue {
    fn from(e: VocabError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e:?}")))
}

fn open_store(namespace: &str) -> Result<Box<dyn KeyValueStore>, VocabError> {
    #[cfg(target_arch = "wasm32")]
    {
        Ok(Box::new(stash::LocalStorage::new(namespace)?))
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = namespace;
        Ok(Box::new(stash::MemoryStore::new()))
    }
}

#[wasm_bindgen]
pub struct Vocab {
    // we never hold a borrow across an .await, which rules out "already borrowed" panics
    app: RefCell<VocabApp<Box<dyn KeyValueStore>>>,
    // rebuilt when the translation keys change; lookups keep their own handle
    enrichment: RefCell<Rc<EnrichmentChain>>,
}

// putting this inside LOGGER prevents us from accidentally initializing the logger more than once
#[allow(clippy::declare_interior_mutable_const)]
const LOGGER: LazyLock<()> = LazyLock::new(|| {
    utils::set_panic_hook();

    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Logging initialized");
});

#[cfg_attr(target_arch = "wasm32", wasm_bindgen)]
impl Vocab {
    /// `namespace` prefixes every storage key, so several independent
    /// libraries can share one origin.
    #[cfg_attr(target_arch = "wasm32", wasm_bindgen(constructor))]
    pub fn new(namespace: Option<String>) -> Result<Vocab, JsValue> {
        // used to only initialize the logger once
        #[allow(clippy::borrow_interior_mutable_const)]
        *LOGGER;

        let store = open_store(namespace.as_deref().unwrap_or_default())?;
        let app = VocabApp::load(store).inspect_err(|e| {
            log::error!("Error loading saved data: {e}");
        })?;

        let enrichment = EnrichmentChain::standard(app.translation_config());
        Ok(Self {
            app: RefCell::new(app),
            enrichment: RefCell::new(Rc::new(enrichment)),
        })
    }

    // Settings

    pub fn get_settings(&self) -> Settings {
        self.app.borrow().settings().clone()
    }

    pub fn update_settings(&self, settings: Settings) -> Result<Settings, JsValue> {
        Ok(self.app.borrow_mut().update_settings(settings)?.clone())
    }

    pub fn select_wordbook(&self, wordbook_id: Option<String>) -> Result<(), JsValue> {
        Ok(self.app.borrow_mut().select_wordbook(wordbook_id)?)
    }

    // Library

    pub fn get_wordbooks(&self) -> Result<JsValue, JsValue> {
        to_js(&self.app.borrow().library().wordbooks)
    }

    pub fn get_words(&self) -> Result<JsValue, JsValue> {
        to_js(&self.app.borrow().library().words)
    }

    /// Words of the selected wordbook, or every word when none is selected.
    pub fn get_words_in_scope(&self) -> Result<JsValue, JsValue> {
        to_js(&self.app.borrow().words_in_scope())
    }

    pub fn get_word(&self, id: String) -> Option<Word> {
        self.app.borrow().word(&id).cloned()
    }

    pub fn add_word(&self, new_word: NewWord) -> Result<Word, JsValue> {
        Ok(self.app.borrow_mut().add_word(new_word)?)
    }

    pub fn update_word(&self, id: String, patch: WordPatch) -> Result<Word, JsValue> {
        Ok(self.app.borrow_mut().update_word(&id, patch)?)
    }

    pub fn set_archived(&self, id: String, archived: bool) -> Result<Word, JsValue> {
        Ok(self.app.borrow_mut().set_archived(&id, archived)?)
    }

    pub fn remove_word(&self, id: String) -> Result<Word, JsValue> {
        Ok(self.app.borrow_mut().remove_word(&id)?)
    }

    pub fn add_wordbook(
        &self,
        name: String,
        description: Option<String>,
    ) -> Result<Wordbook, JsValue> {
        Ok(self.app.borrow_mut().add_wordbook(&name, description)?)
    }

    pub fn rename_wordbook(
        &self,
        id: String,
        name: String,
        description: Option<String>,
    ) -> Result<Wordbook, JsValue> {
        Ok(self
            .app
            .borrow_mut()
            .rename_wordbook(&id, &name, description)?)
    }

    pub fn remove_wordbook(&self, id: String) -> Result<usize, JsValue> {
        Ok(self.app.borrow_mut().remove_wordbook(&id)?)
    }

    // Free quiz

    pub fn next_quiz_word(&self) -> Option<Word> {
        self.app.borrow_mut().next_quiz_word()
    }

    pub fn submit_quiz_answer(
        &self,
        word_id: String,
        input: String,
    ) -> Result<AnswerOutcome, JsValue> {
        Ok(self.app.borrow_mut().submit_quiz_answer(&word_id, &input)?)
    }

    // Sessions

    pub fn start_session(&self, kind: SessionKind) -> Result<QueueProgress, JsValue> {
        Ok(self.app.borrow_mut().start_session(kind)?)
    }

    pub fn restart_session(&self, kind: SessionKind) -> Result<QueueProgress, JsValue> {
        Ok(self.app.borrow_mut().restart_session(kind)?)
    }

    pub fn clear_progress(&self, kind: SessionKind) -> Result<QueueProgress, JsValue> {
        Ok(self.app.borrow_mut().clear_progress(kind)?)
    }

    pub fn end_session(&self, kind: SessionKind) {
        self.app.borrow_mut().end_session(kind)
    }

    pub fn session_progress(&self, kind: SessionKind) -> Option<QueueProgress> {
        self.app.borrow().session_progress(kind)
    }

    pub fn current_session_word(&self, kind: SessionKind) -> Option<Word> {
        self.app.borrow().current_session_word(kind)
    }

    pub fn submit_session_answer(
        &self,
        kind: SessionKind,
        input: String,
    ) -> Result<AnswerOutcome, JsValue> {
        Ok(self.app.borrow_mut().submit_session_answer(kind, &input)?)
    }

    // Multiple-choice practice

    pub fn practice_question(&self, mode: PracticeMode) -> Option<PracticeQuestion> {
        self.app.borrow_mut().practice_question(mode)
    }

    pub fn submit_practice_answer(
        &self,
        question: PracticeQuestion,
        choice: String,
    ) -> Result<AnswerOutcome, JsValue> {
        Ok(self
            .app
            .borrow_mut()
            .submit_practice_answer(&question, &choice)?)
    }

    // Import / export

    pub fn export_wordbook(&self, id: String) -> Result<String, JsValue> {
        Ok(self.app.borrow().export_wordbook(&id)?)
    }

    pub fn export_file_name(&self, id: String) -> Option<String> {
        let app = self.app.borrow();
        let wordbook = app.library().wordbook(&id)?;
        Some(transfer::export_file_name(wordbook, chrono::Utc::now()))
    }

    pub fn import_wordbook(
        &self,
        data: String,
        target_wordbook_id: Option<String>,
    ) -> Result<ImportSummary, JsValue> {
        Ok(self
            .app
            .borrow_mut()
            .import_wordbook(&data, target_wordbook_id.as_deref())?)
    }

    // Backups

    pub fn get_backups(&self) -> Result<JsValue, JsValue> {
        to_js(&self.app.borrow().backups())
    }

    pub fn create_backup(&self) -> Result<(), JsValue> {
        Ok(self.app.borrow_mut().create_backup()?)
    }

    pub fn restore_backup(&self, index: usize) -> Result<(), JsValue> {
        Ok(self.app.borrow_mut().restore_backup(index)?)
    }

    pub fn restore_backup_as_new_wordbook(&self, index: usize) -> Result<String, JsValue> {
        Ok(self.app.borrow_mut().restore_backup_as_new_wordbook(index)?)
    }

    // Enrichment

    pub fn get_translation_config(&self) -> TranslationConfig {
        self.app.borrow().translation_config().clone()
    }

    pub fn update_translation_config(
        &self,
        config: TranslationConfig,
    ) -> Result<TranslationConfig, JsValue> {
        let config = self
            .app
            .borrow_mut()
            .update_translation_config(config)?
            .clone();
        *self.enrichment.borrow_mut() = Rc::new(EnrichmentChain::standard(&config));
        Ok(config)
    }

    fn enrichment(&self) -> Rc<EnrichmentChain> {
        self.enrichment.borrow().clone()
    }

    pub async fn lookup(&self, term: String) -> Enrichment {
        self.enrichment().lookup(&term).await
    }

    /// The English term for a Chinese meaning, if one can be found.
    pub async fn reverse_lookup(&self, meaning: String) -> Option<String> {
        let baidu = self.app.borrow().translation_config().baidu();
        translation::reverse_translate(&meaning, baidu.as_ref()).await
    }

    /// Looks the word up and fills in whatever it is missing.
    pub async fn enrich_word(&self, word_id: String) -> Result<Word, JsValue> {
        let term = self
            .app
            .borrow()
            .word(&word_id)
            .map(|word| word.term.clone())
            .ok_or_else(|| JsValue::from_str(&format!("unknown word {word_id}")))?;

        let found = self.enrichment().lookup(&term).await;
        if found.is_empty() {
            log::info!("Nothing found for {term}");
        }

        Ok(self.app.borrow_mut().apply_enrichment(&word_id, &found)?)
    }
}
