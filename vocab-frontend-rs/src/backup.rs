//! Rolling snapshots of the library.
//!
//! Automatic backups are throttled: at most one every
//! [`MIN_BACKUP_INTERVAL_MINUTES`], and only when the library changed
//! noticeably since the newest backup.

use chrono::{DateTime, TimeDelta, Utc};
use stash::Record;
use vocab_utils::text_cleanup::term_key;
use vocab_utils::{Word, Wordbook, WordbookId};

use crate::library::Library;

pub const MAX_BACKUPS: usize = 10;
pub const MIN_BACKUP_INTERVAL_MINUTES: i64 = 5;
pub const WORD_COUNT_THRESHOLD: usize = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BackupError {
    #[error("no backup at position {0}")]
    NotFound(usize),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub library: Library,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, tsify::Tsify)]
#[tsify(into_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
    pub index: usize,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[tsify(type = "number")]
    pub timestamp: DateTime<Utc>,
    pub word_count: usize,
    pub wordbook_count: usize,
}

/// Backups, newest first.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupLog {
    #[serde(default)]
    pub backups: Vec<Backup>,
}

impl BackupLog {
    pub fn get(&self, index: usize) -> Result<&Backup, BackupError> {
        self.backups.get(index).ok_or(BackupError::NotFound(index))
    }

    pub fn should_backup(&self, library: &Library, now: DateTime<Utc>) -> bool {
        let Some(newest) = self.backups.first() else {
            return true;
        };
        if now - newest.timestamp < TimeDelta::minutes(MIN_BACKUP_INTERVAL_MINUTES) {
            return false;
        }
        library.words.len().abs_diff(newest.library.words.len()) >= WORD_COUNT_THRESHOLD
            || library.wordbooks.len() != newest.library.wordbooks.len()
    }

    pub fn create(&mut self, library: &Library, now: DateTime<Utc>) {
        self.backups.insert(
            0,
            Backup {
                timestamp: now,
                library: library.clone(),
            },
        );
        self.backups.truncate(MAX_BACKUPS);
        log::info!(
            "Backed up {} words in {} wordbooks",
            library.words.len(),
            library.wordbooks.len()
        );
    }

    /// Creates a backup if [`BackupLog::should_backup`] allows it. Returns
    /// whether one was made.
    pub fn auto_backup(&mut self, library: &Library, now: DateTime<Utc>) -> bool {
        if self.should_backup(library, now) {
            self.create(library, now);
            true
        } else {
            false
        }
    }

    pub fn summaries(&self) -> Vec<BackupSummary> {
        self.backups
            .iter()
            .enumerate()
            .map(|(index, backup)| BackupSummary {
                index,
                timestamp: backup.timestamp,
                word_count: backup.library.words.len(),
                wordbook_count: backup.library.wordbooks.len(),
            })
            .collect()
    }
}

/// Copies a backup's words into a new wordbook, leaving the rest of the
/// library untouched. Returns the new wordbook's id.
pub fn restore_as_new_wordbook(
    library: &mut Library,
    backup: &Backup,
    index: usize,
    mut new_id: impl FnMut() -> String,
    now: DateTime<Utc>,
) -> WordbookId {
    let dated = backup
        .library
        .words
        .first()
        .map_or(now, |word| word.created_at);
    let wordbook = Wordbook {
        id: new_id(),
        name: format!("Restored wordbook ({})", dated.format("%Y-%m-%d")),
        description: Some(format!(
            "Restored from backup #{} on {}",
            index + 1,
            now.format("%Y-%m-%d %H:%M")
        )),
        created_at: now,
        updated_at: now,
        is_default: false,
    };
    let wordbook_id = wordbook.id.clone();

    // a backup spans several wordbooks, so the same term can appear twice
    let mut taken = std::collections::HashSet::new();
    let restored: Vec<Word> = backup
        .library
        .words
        .iter()
        .filter(|word| taken.insert(term_key(&word.term)))
        .map(|word| Word {
            id: new_id(),
            wordbook_id: wordbook_id.clone(),
            created_at: now,
            updated_at: now,
            ..word.clone()
        })
        .collect();

    library.wordbooks.insert(0, wordbook);
    library.words.splice(0..0, restored);
    wordbook_id
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "version")]
pub enum VersionedBackupLog {
    V1(BackupLog),
}

impl Record for BackupLog {
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let versioned = VersionedBackupLog::from(self.clone());
        serde_json::to_value(versioned)
    }

    fn from_json(json: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<VersionedBackupLog>(json.clone()).map(|versioned| versioned.into())
    }
}

impl From<BackupLog> for VersionedBackupLog {
    fn from(log: BackupLog) -> Self {
        VersionedBackupLog::V1(log)
    }
}

impl From<VersionedBackupLog> for BackupLog {
    fn from(log: VersionedBackupLog) -> Self {
        match log {
            VersionedBackupLog::V1(log) => log,
        }
    }
}
