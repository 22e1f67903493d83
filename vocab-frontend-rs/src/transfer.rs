use chrono::{DateTime, Utc};
use vocab_utils::text_cleanup::term_key;
use vocab_utils::{Word, Wordbook, WordbookId};

use crate::library::Library;

pub const EXPORT_FORMAT_VERSION: &str = "1.0";

/// The file format for sharing a single wordbook.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordbookExport {
    #[serde(default = "default_format_version")]
    pub version: String,
    pub wordbook: Wordbook,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub export_time: DateTime<Utc>,
}

fn default_format_version() -> String {
    EXPORT_FORMAT_VERSION.to_string()
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, tsify::Tsify)]
#[tsify(into_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub wordbook_id: WordbookId,
    pub wordbook_name: String,
    pub new_count: usize,
    pub skipped_count: usize,
    pub is_append: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("not a wordbook export: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("could not write export: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("unknown wordbook {0}")]
    UnknownWordbook(WordbookId),
}

pub fn export_wordbook(
    library: &Library,
    wordbook_id: &str,
    now: DateTime<Utc>,
) -> Result<String, TransferError> {
    let wordbook = library
        .wordbook(wordbook_id)
        .ok_or_else(|| TransferError::UnknownWordbook(wordbook_id.to_string()))?;
    let words: Vec<Word> = library.words_in_wordbook(wordbook_id).cloned().collect();
    if words.is_empty() {
        log::warn!("Exporting wordbook {} with no words", wordbook.name);
    }

    let export = WordbookExport {
        version: EXPORT_FORMAT_VERSION.to_string(),
        wordbook: wordbook.clone(),
        words,
        export_time: now,
    };
    serde_json::to_string_pretty(&export).map_err(TransferError::Serialize)
}

/// Suggested file name for an export, e.g. `Animals_2024-05-01.json`.
pub fn export_file_name(wordbook: &Wordbook, now: DateTime<Utc>) -> String {
    format!("{}_{}.json", wordbook.name, now.format("%Y-%m-%d"))
}

/// Imports a wordbook export.
///
/// With a `target` the words are appended to that wordbook; otherwise a new
/// wordbook named `"<name> (imported)"` is created. Imported words get fresh
/// ids and keep their learning progress. Terms already present in the
/// destination, or repeated within the file, are skipped.
pub fn import_wordbook(
    library: &mut Library,
    data: &str,
    target: Option<&str>,
    mut new_id: impl FnMut() -> String,
    now: DateTime<Utc>,
) -> Result<ImportSummary, TransferError> {
    let export: WordbookExport = serde_json::from_str(data).map_err(TransferError::Parse)?;

    let (wordbook_id, wordbook_name, is_append) = match target {
        Some(target) => {
            let wordbook = library
                .wordbook(target)
                .ok_or_else(|| TransferError::UnknownWordbook(target.to_string()))?;
            (wordbook.id.clone(), wordbook.name.clone(), true)
        }
        None => {
            let wordbook = Wordbook {
                id: new_id(),
                name: format!("{} (imported)", export.wordbook.name),
                created_at: now,
                updated_at: now,
                is_default: false,
                ..export.wordbook
            };
            let summary = (wordbook.id.clone(), wordbook.name.clone(), false);
            library.wordbooks.insert(0, wordbook);
            summary
        }
    };

    let mut taken = library.term_keys(&wordbook_id);
    let total = export.words.len();
    let imported: Vec<Word> = export
        .words
        .into_iter()
        .filter(|word| !word.term.trim().is_empty() && taken.insert(term_key(&word.term)))
        .map(|word| Word {
            id: new_id(),
            wordbook_id: wordbook_id.clone(),
            created_at: now,
            updated_at: now,
            ..word
        })
        .collect();

    let new_count = imported.len();
    library.words.splice(0..0, imported);

    log::info!("Imported {new_count} of {total} words into {wordbook_name}");
    Ok(ImportSummary {
        wordbook_id,
        wordbook_name,
        new_count,
        skipped_count: total - new_count,
        is_append,
    })
}
