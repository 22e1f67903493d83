pub mod proficiency;
pub mod text_cleanup;

use chrono::{DateTime, Utc};

pub type WordId = String;
pub type WordbookId = String;

/// A vocabulary entry.
///
/// Older exports used `meaningZh`, `meaningEn` and `ipa` for the meaning and
/// phonetic fields; those names are still accepted when reading.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: WordId,
    pub term: String,
    #[serde(alias = "meaningZh", default)]
    pub meaning_native: String,
    #[serde(alias = "meaningEn", default, skip_serializing_if = "Option::is_none")]
    pub meaning_foreign: Option<String>,
    #[serde(alias = "ipa", default, skip_serializing_if = "Option::is_none")]
    pub phonetic_transcription: Option<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub audio_urls: Vec<String>,
    #[serde(default)]
    pub proficiency: u8,
    #[serde(default)]
    pub error_count: u32,
    #[serde(default)]
    pub correct_streak: u32,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub wordbook_id: WordbookId,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    #[tsify(type = "number")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    #[tsify(type = "number")]
    pub updated_at: DateTime<Utc>,
}

impl Word {
    pub fn new(
        id: impl Into<WordId>,
        term: impl Into<String>,
        meaning_native: impl Into<String>,
        wordbook_id: impl Into<WordbookId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            term: term.into(),
            meaning_native: meaning_native.into(),
            meaning_foreign: None,
            phonetic_transcription: None,
            examples: Vec::new(),
            tags: Vec::new(),
            audio_urls: Vec::new(),
            proficiency: 0,
            error_count: 0,
            correct_streak: 0,
            archived: false,
            wordbook_id: wordbook_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The acceptable native-language meanings, normalized.
    pub fn meanings(&self) -> Vec<String> {
        text_cleanup::split_meanings(&self.meaning_native)
    }

    /// Fills fields that are still empty from a lookup result. Fields the
    /// user already filled in are never overwritten.
    pub fn apply_enrichment(&mut self, enrichment: &Enrichment) {
        if is_blank(&self.phonetic_transcription) {
            self.phonetic_transcription = enrichment.ipa.clone();
        }
        if is_blank(&self.meaning_foreign) && !enrichment.meanings.is_empty() {
            self.meaning_foreign = Some(enrichment.meanings.join("; "));
        }
        if self.meaning_native.trim().is_empty() {
            if let Some(native) = &enrichment.native_meaning {
                self.meaning_native = native.clone();
            }
        }
        if self.audio_urls.is_empty() {
            if let Some(url) = &enrichment.audio_url {
                self.audio_urls.push(url.clone());
            }
        }
    }
}

fn is_blank(field: &Option<String>) -> bool {
    field.as_deref().is_none_or(|value| value.trim().is_empty())
}

/// A named collection of words.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct Wordbook {
    pub id: WordbookId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    #[tsify(type = "number")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    #[tsify(type = "number")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_default: bool,
}

/// Which side of the card the learner has to produce.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub enum AnswerMode {
    /// Shown the meaning, type the term.
    #[default]
    RecallTerm,
    /// Shown the term, type one of its meanings.
    RecallMeaning,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub enum QuizOrder {
    #[default]
    Random,
    Sequential,
}

/// Data a dictionary lookup found for a term.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize, tsify::Tsify,
)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    #[serde(default)]
    pub ipa: Option<String>,
    /// Foreign-language definitions.
    #[serde(default)]
    pub meanings: Vec<String>,
    #[serde(default)]
    pub native_meaning: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
}

impl Enrichment {
    pub fn is_complete(&self) -> bool {
        self.ipa.is_some()
            && !self.meanings.is_empty()
            && self.native_meaning.is_some()
            && self.audio_url.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.ipa.is_none()
            && self.meanings.is_empty()
            && self.native_meaning.is_none()
            && self.audio_url.is_none()
    }

    /// Takes from `other` only the fields this one is still missing.
    pub fn fill_missing(&mut self, other: Enrichment) {
        let Enrichment {
            ipa,
            meanings,
            native_meaning,
            audio_url,
        } = other;
        if self.ipa.is_none() {
            self.ipa = ipa;
        }
        if self.meanings.is_empty() {
            self.meanings = meanings;
        }
        if self.native_meaning.is_none() {
            self.native_meaning = native_meaning;
        }
        if self.audio_url.is_none() {
            self.audio_url = audio_url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_reads_legacy_field_names() {
        let json = serde_json::json!({
            "id": "w1",
            "term": "apple",
            "ipa": "/ˈæp.əl/",
            "meaningZh": "苹果",
            "meaningEn": "a round fruit",
            "proficiency": 2,
            "createdAt": 1_700_000_000_000i64,
            "updatedAt": 1_700_000_000_000i64,
            "wordbookId": "default"
        });
        let word: Word = serde_json::from_value(json).unwrap();
        assert_eq!(word.meaning_native, "苹果");
        assert_eq!(word.meaning_foreign.as_deref(), Some("a round fruit"));
        assert_eq!(word.phonetic_transcription.as_deref(), Some("/ˈæp.əl/"));
        assert_eq!(word.error_count, 0);
        assert_eq!(word.correct_streak, 0);
        assert!(!word.archived);
        assert_eq!(word.created_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_word_writes_millisecond_timestamps() {
        let now = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_123).unwrap();
        let word = Word::new("w1", "cat", "猫", "wb", now);
        let json = serde_json::to_value(&word).unwrap();
        assert_eq!(json["createdAt"], 1_700_000_000_123i64);
        assert_eq!(json["meaningNative"], "猫");
        assert!(json.get("meaningForeign").is_none());
    }

    #[test]
    fn test_apply_enrichment_keeps_user_fields() {
        let now = Utc::now();
        let mut word = Word::new("w1", "cat", "猫", "wb", now);
        word.phonetic_transcription = Some("/kat/".to_string());

        word.apply_enrichment(&Enrichment {
            ipa: Some("/kæt/".to_string()),
            meanings: vec!["a small animal".to_string(), "a pet".to_string()],
            native_meaning: Some("猫咪".to_string()),
            audio_url: Some("https://audio.example/cat.mp3".to_string()),
        });

        assert_eq!(word.phonetic_transcription.as_deref(), Some("/kat/"));
        assert_eq!(word.meaning_native, "猫");
        assert_eq!(word.meaning_foreign.as_deref(), Some("a small animal; a pet"));
        assert_eq!(word.audio_urls, vec!["https://audio.example/cat.mp3"]);
    }

    #[test]
    fn test_fill_missing_only_fills_gaps() {
        let mut enrichment = Enrichment {
            ipa: Some("/a/".to_string()),
            ..Default::default()
        };
        assert!(!enrichment.is_complete());

        enrichment.fill_missing(Enrichment {
            ipa: Some("/b/".to_string()),
            meanings: vec!["m".to_string()],
            native_meaning: Some("n".to_string()),
            audio_url: Some("u".to_string()),
        });

        assert_eq!(enrichment.ipa.as_deref(), Some("/a/"));
        assert!(enrichment.is_complete());
    }
}
