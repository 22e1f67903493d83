use chrono::{DateTime, Utc};
use stash::Record;
use vocab_utils::WordId;

/// One slot of a practice queue.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub word_id: WordId,
    /// How many times the item was scheduled when it was queued. Display only.
    pub remaining_times: u32,
    /// Mistakes on this word earlier in the session.
    pub error_count: u32,
}

/// Everything needed to resume a practice queue after a reload.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub scope_id: String,
    pub current_index: usize,
    pub queue: Vec<QueueItem>,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub saved_at: DateTime<Utc>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "version")]
pub enum VersionedProgressSnapshot {
    V1(ProgressSnapshot),
}

impl Record for ProgressSnapshot {
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let versioned = VersionedProgressSnapshot::from(self.clone());
        serde_json::to_value(versioned)
    }

    fn from_json(json: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<VersionedProgressSnapshot>(json.clone())
            .map(|versioned| versioned.into())
    }
}

impl From<ProgressSnapshot> for VersionedProgressSnapshot {
    fn from(snapshot: ProgressSnapshot) -> Self {
        VersionedProgressSnapshot::V1(snapshot)
    }
}

impl From<VersionedProgressSnapshot> for ProgressSnapshot {
    fn from(snapshot: VersionedProgressSnapshot) -> Self {
        match snapshot {
            VersionedProgressSnapshot::V1(snapshot) => snapshot,
        }
    }
}

/// Quiz (typed answers) and practice (multiple choice) keep separate queues.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
    tsify::Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub enum SessionKind {
    Quiz,
    Practice,
}

impl SessionKind {
    pub const ALL: [SessionKind; 2] = [SessionKind::Quiz, SessionKind::Practice];

    pub fn storage_key(self) -> &'static str {
        match self {
            SessionKind::Quiz => "vocab.progress.quiz",
            SessionKind::Practice => "vocab.progress.practice",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_tagged_with_version() {
        let snapshot = ProgressSnapshot {
            scope_id: "all".to_string(),
            current_index: 1,
            queue: vec![QueueItem {
                word_id: "w1".to_string(),
                remaining_times: 2,
                error_count: 0,
            }],
            total_attempts: 1,
            correct_attempts: 1,
            saved_at: DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap(),
        };
        let json = snapshot.to_json().unwrap();
        assert_eq!(json["version"], "V1");
        assert_eq!(json["scopeId"], "all");
        assert_eq!(json["queue"][0]["wordId"], "w1");
        assert_eq!(json["savedAt"], 1_700_000_000_000i64);
        assert_eq!(ProgressSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_untagged_legacy_progress_is_rejected() {
        // the shape older builds kept inside the settings blob
        let legacy = serde_json::json!({
            "wordbookId": "wb",
            "currentIndex": 0,
            "wordQueue": [],
            "totalAttempts": 0,
            "correctAttempts": 0
        });
        assert!(ProgressSnapshot::from_json(&legacy).is_err());
    }
}
