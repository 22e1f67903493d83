use stash::Record;
use vocab_utils::{AnswerMode, QuizOrder, WordbookId};

use crate::library::Scope;
use crate::practice_queue::INITIAL_REPEAT;

pub const MIN_TTS_RATE: f64 = 0.5;
pub const MAX_TTS_RATE: f64 = 1.5;
pub const MAX_TTS_REPEAT: u32 = 10;
pub const MAX_INITIAL_REPEAT: u32 = 5;
pub const PAGE_SIZES: [u32; 2] = [50, 100];

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Speech rate for text-to-speech.
    pub tts_rate: f64,
    /// How many times a word is spoken.
    pub tts_repeat: u32,
    pub tts_voice_name: Option<String>,
    #[serde(alias = "showIPA")]
    pub show_phonetics: bool,
    pub quiz_order: QuizOrder,
    pub answer_mode: AnswerMode,
    pub current_wordbook_id: Option<WordbookId>,
    pub words_per_page: u32,
    /// How many times each word is queued at the start of a session.
    pub initial_repeat: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tts_rate: 1.0,
            tts_repeat: 2,
            tts_voice_name: None,
            show_phonetics: true,
            quiz_order: QuizOrder::default(),
            answer_mode: AnswerMode::default(),
            current_wordbook_id: None,
            words_per_page: PAGE_SIZES[0],
            initial_repeat: INITIAL_REPEAT,
        }
    }
}

impl Settings {
    /// Clamps every field into its allowed range.
    pub fn sanitized(self) -> Self {
        let tts_rate = if self.tts_rate.is_finite() {
            self.tts_rate.clamp(MIN_TTS_RATE, MAX_TTS_RATE)
        } else {
            1.0
        };
        let words_per_page = if self.words_per_page >= PAGE_SIZES[1] {
            PAGE_SIZES[1]
        } else {
            PAGE_SIZES[0]
        };
        Self {
            tts_rate,
            tts_repeat: self.tts_repeat.clamp(1, MAX_TTS_REPEAT),
            tts_voice_name: self.tts_voice_name.filter(|name| !name.trim().is_empty()),
            words_per_page,
            initial_repeat: self.initial_repeat.clamp(1, MAX_INITIAL_REPEAT),
            current_wordbook_id: self.current_wordbook_id.filter(|id| !id.is_empty()),
            ..self
        }
    }

    pub fn scope(&self) -> Scope {
        match &self.current_wordbook_id {
            Some(id) => Scope::Wordbook(id.clone()),
            None => Scope::All,
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "version")]
pub enum VersionedSettings {
    V1(Settings),
}

impl Record for Settings {
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        let versioned = VersionedSettings::from(self.clone());
        serde_json::to_value(versioned)
    }

    fn from_json(json: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<VersionedSettings>(json.clone())
            .map(|versioned| Settings::from(versioned).sanitized())
    }
}

impl From<Settings> for VersionedSettings {
    fn from(settings: Settings) -> Self {
        VersionedSettings::V1(settings)
    }
}

impl From<VersionedSettings> for Settings {
    fn from(settings: VersionedSettings) -> Self {
        match settings {
            VersionedSettings::V1(settings) => settings,
        }
    }
}
