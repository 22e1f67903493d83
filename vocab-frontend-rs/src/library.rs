//! The user's words and wordbooks.
//!
//! New words and wordbooks are inserted at the front, so the library lists
//! newest first. A term may appear only once per wordbook, compared
//! case-insensitively.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use stash::Record;
use vocab_utils::proficiency::MAX_PROFICIENCY;
use vocab_utils::text_cleanup::term_key;
use vocab_utils::{Word, WordId, Wordbook, WordbookId};

pub const ALL_SCOPE_ID: &str = "all";

/// The words a session draws from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    All,
    Wordbook(WordbookId),
}

impl Scope {
    pub fn id(&self) -> &str {
        match self {
            Scope::All => ALL_SCOPE_ID,
            Scope::Wordbook(id) => id.as_str(),
        }
    }

    pub fn contains(&self, word: &Word) -> bool {
        match self {
            Scope::All => true,
            Scope::Wordbook(id) => word.wordbook_id == *id,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LibraryError {
    #[error("a word needs a term")]
    EmptyTerm,

    #[error("a word needs a meaning")]
    EmptyMeaning,

    #[error("\"{0}\" is already in this wordbook")]
    DuplicateWord(String),

    #[error("no wordbook is selected")]
    NoWordbookSelected,

    #[error("unknown wordbook {0}")]
    UnknownWordbook(WordbookId),

    #[error("unknown word {0}")]
    UnknownWord(WordId),

    #[error("a wordbook needs a name")]
    EmptyWordbookName,
}

/// Fields a user supplies when adding a word.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase", default)]
pub struct NewWord {
    pub term: String,
    #[serde(alias = "meaningZh")]
    pub meaning_native: String,
    #[serde(alias = "meaningEn")]
    pub meaning_foreign: Option<String>,
    #[serde(alias = "ipa")]
    pub phonetic_transcription: Option<String>,
    pub examples: Vec<String>,
    pub tags: Vec<String>,
    pub audio_urls: Vec<String>,
    /// Falls back to the selected wordbook.
    pub wordbook_id: Option<WordbookId>,
}

/// A partial update. Unset fields are left alone; an empty string clears an
/// optional text field.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase", default)]
pub struct WordPatch {
    pub term: Option<String>,
    pub meaning_native: Option<String>,
    pub meaning_foreign: Option<String>,
    pub phonetic_transcription: Option<String>,
    pub examples: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub audio_urls: Option<Vec<String>>,
    pub proficiency: Option<u8>,
    pub archived: Option<bool>,
    pub wordbook_id: Option<WordbookId>,
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Library {
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default)]
    pub wordbooks: Vec<Wordbook>,
}

impl Library {
    pub fn word(&self, id: &str) -> Option<&Word> {
        self.words.iter().find(|word| word.id == id)
    }

    pub fn wordbook(&self, id: &str) -> Option<&Wordbook> {
        self.wordbooks.iter().find(|wordbook| wordbook.id == id)
    }

    pub fn words_in_scope<'a>(&'a self, scope: &'a Scope) -> impl Iterator<Item = &'a Word> + 'a {
        self.words.iter().filter(move |word| scope.contains(word))
    }

    pub fn words_in_wordbook<'a>(
        &'a self,
        wordbook_id: &'a str,
    ) -> impl Iterator<Item = &'a Word> + 'a {
        self.words
            .iter()
            .filter(move |word| word.wordbook_id == wordbook_id)
    }

    fn require_wordbook(&self, id: &str) -> Result<(), LibraryError> {
        match self.wordbook(id) {
            Some(_) => Ok(()),
            None => Err(LibraryError::UnknownWordbook(id.to_string())),
        }
    }

    fn has_term(&self, wordbook_id: &str, term: &str, except: Option<&str>) -> bool {
        let key = term_key(term);
        self.words_in_wordbook(wordbook_id)
            .filter(|word| Some(word.id.as_str()) != except)
            .any(|word| term_key(&word.term) == key)
    }

    /// Term keys already used in a wordbook.
    pub fn term_keys(&self, wordbook_id: &str) -> HashSet<String> {
        self.words_in_wordbook(wordbook_id)
            .map(|word| term_key(&word.term))
            .collect()
    }

    pub fn add_word(
        &mut self,
        id: WordId,
        new_word: NewWord,
        selected_wordbook: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<&Word, LibraryError> {
        let term = new_word.term.trim().to_string();
        let meaning_native = new_word.meaning_native.trim().to_string();
        if term.is_empty() {
            return Err(LibraryError::EmptyTerm);
        }
        if meaning_native.is_empty() {
            return Err(LibraryError::EmptyMeaning);
        }

        let wordbook_id = new_word
            .wordbook_id
            .or_else(|| selected_wordbook.map(str::to_string))
            .ok_or(LibraryError::NoWordbookSelected)?;
        self.require_wordbook(&wordbook_id)?;
        if self.has_term(&wordbook_id, &term, None) {
            return Err(LibraryError::DuplicateWord(term));
        }

        let mut word = Word::new(id, term, meaning_native, wordbook_id, now);
        word.meaning_foreign = non_blank(new_word.meaning_foreign);
        word.phonetic_transcription = non_blank(new_word.phonetic_transcription);
        word.examples = new_word.examples;
        word.tags = new_word.tags;
        word.audio_urls = new_word.audio_urls;

        self.words.insert(0, word);
        Ok(&self.words[0])
    }

    pub fn update_word(
        &mut self,
        id: &str,
        patch: WordPatch,
        now: DateTime<Utc>,
    ) -> Result<&Word, LibraryError> {
        let index = self
            .words
            .iter()
            .position(|word| word.id == id)
            .ok_or_else(|| LibraryError::UnknownWord(id.to_string()))?;

        let mut word = self.words[index].clone();
        if let Some(term) = patch.term {
            word.term = term.trim().to_string();
        }
        if let Some(meaning) = patch.meaning_native {
            word.meaning_native = meaning.trim().to_string();
        }
        if let Some(wordbook_id) = patch.wordbook_id {
            self.require_wordbook(&wordbook_id)?;
            word.wordbook_id = wordbook_id;
        }
        if word.term.is_empty() {
            return Err(LibraryError::EmptyTerm);
        }
        if word.meaning_native.is_empty() {
            return Err(LibraryError::EmptyMeaning);
        }
        if self.has_term(&word.wordbook_id, &word.term, Some(id)) {
            return Err(LibraryError::DuplicateWord(word.term));
        }

        if patch.meaning_foreign.is_some() {
            word.meaning_foreign = non_blank(patch.meaning_foreign);
        }
        if patch.phonetic_transcription.is_some() {
            word.phonetic_transcription = non_blank(patch.phonetic_transcription);
        }
        if let Some(examples) = patch.examples {
            word.examples = examples;
        }
        if let Some(tags) = patch.tags {
            word.tags = tags;
        }
        if let Some(audio_urls) = patch.audio_urls {
            word.audio_urls = audio_urls;
        }
        if let Some(proficiency) = patch.proficiency {
            word.proficiency = proficiency.min(MAX_PROFICIENCY);
        }
        if let Some(archived) = patch.archived {
            word.archived = archived;
        }
        word.updated_at = now;

        self.words[index] = word;
        Ok(&self.words[index])
    }

    /// Stores a word that was changed outside the library, such as after a
    /// graded answer.
    pub fn replace_word(&mut self, word: Word) -> Result<(), LibraryError> {
        let slot = self
            .words
            .iter_mut()
            .find(|existing| existing.id == word.id)
            .ok_or_else(|| LibraryError::UnknownWord(word.id.clone()))?;
        *slot = word;
        Ok(())
    }

    pub fn remove_word(&mut self, id: &str) -> Result<Word, LibraryError> {
        let index = self
            .words
            .iter()
            .position(|word| word.id == id)
            .ok_or_else(|| LibraryError::UnknownWord(id.to_string()))?;
        Ok(self.words.remove(index))
    }

    pub fn add_wordbook(
        &mut self,
        id: WordbookId,
        name: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&Wordbook, LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::EmptyWordbookName);
        }
        self.wordbooks.insert(
            0,
            Wordbook {
                id,
                name: name.to_string(),
                description: non_blank(description),
                created_at: now,
                updated_at: now,
                is_default: false,
            },
        );
        Ok(&self.wordbooks[0])
    }

    pub fn rename_wordbook(
        &mut self,
        id: &str,
        name: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<&Wordbook, LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::EmptyWordbookName);
        }
        let wordbook = self
            .wordbooks
            .iter_mut()
            .find(|wordbook| wordbook.id == id)
            .ok_or_else(|| LibraryError::UnknownWordbook(id.to_string()))?;
        wordbook.name = name.to_string();
        wordbook.description = non_blank(description);
        wordbook.updated_at = now;
        Ok(&*wordbook)
    }

    /// Deletes a wordbook together with its words. Returns the removed words.
    pub fn remove_wordbook(&mut self, id: &str) -> Result<Vec<Word>, LibraryError> {
        self.require_wordbook(id)?;
        self.wordbooks.retain(|wordbook| wordbook.id != id);
        let (removed, kept): (Vec<Word>, Vec<Word>) = std::mem::take(&mut self.words)
            .into_iter()
            .partition(|word| word.wordbook_id == id);
        self.words = kept;
        Ok(removed)
    }

    /// Gives a fresh install something to look at: a default wordbook and one
    /// sample word. Returns true if anything was added.
    pub fn seed_if_empty(
        &mut self,
        mut new_id: impl FnMut() -> String,
        now: DateTime<Utc>,
    ) -> bool {
        let mut changed = false;
        if self.wordbooks.is_empty() {
            self.wordbooks.push(Wordbook {
                id: new_id(),
                name: "Default wordbook".to_string(),
                description: Some("Created automatically".to_string()),
                created_at: now,
                updated_at: now,
                is_default: true,
            });
            changed = true;
        }
        if self.words.is_empty() {
            let wordbook_id = self.wordbooks[0].id.clone();
            let mut apple = Word::new(new_id(), "apple", "苹果", wordbook_id, now);
            apple.phonetic_transcription = Some("/ˈæp.əl/".to_string());
            apple.meaning_foreign = Some("a round fruit".to_string());
            apple.examples = vec!["I eat an apple every day.".to_string()];
            apple.tags = vec!["fruit".to_string()];
            self.words.push(apple);
            changed = true;
        }
        changed
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "version")]
pub enum VersionedLibrary {
    V1(Library),
}

impl Record for Library {
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let versioned = VersionedLibrary::from(self.clone());
        serde_json::to_value(versioned)
    }

    fn from_json(json: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<VersionedLibrary>(json.clone()).map(|versioned| versioned.into())
    }
}

impl From<Library> for VersionedLibrary {
    fn from(library: Library) -> Self {
        VersionedLibrary::V1(library)
    }
}

impl From<VersionedLibrary> for Library {
    fn from(library: VersionedLibrary) -> Self {
        match library {
            VersionedLibrary::V1(library) => library,
        }
    }
}
