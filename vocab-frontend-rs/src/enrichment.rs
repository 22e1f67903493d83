//! Dictionary lookups that fill in phonetics, definitions, translations and
//! pronunciation audio for a newly added word.
//!
//! Providers are tried in order by [`EnrichmentChain`]. Each one only
//! contributes the fields that are still missing, and the chain stops as soon
//! as everything is known. A failing provider is logged and skipped, so a
//! lookup never fails as a whole; at worst it comes back empty.

use futures::FutureExt as _;
use futures::future::LocalBoxFuture;
use vocab_utils::Enrichment;
use vocab_utils::text_cleanup::term_key;

use crate::translation::TranslationConfig;

#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("request failed")]
    Request(#[source] fetch_happen::Error),

    #[error("server returned {0}")]
    Status(String),

    #[error("unexpected response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("service error {code}: {message}")]
    Service { code: String, message: String },

    #[error("no entry for {0:?}")]
    NotFound(String),
}

pub trait EnrichmentProvider {
    fn name(&self) -> &'static str;

    fn lookup<'a>(&'a self, term: &'a str)
    -> LocalBoxFuture<'a, Result<Enrichment, EnrichmentError>>;
}

/// (term, IPA, native meaning) for common words, available offline.
const BUILTIN_ENTRIES: &[(&str, &str, &str)] = &[
    ("apple", "/ˈæp.əl/", "苹果"),
    ("book", "/bʊk/", "书"),
    ("cat", "/kæt/", "猫"),
    ("dog", "/dɔːɡ/", "狗"),
    ("water", "/ˈwɔː.tər/", "水"),
    ("food", "/fuːd/", "食物"),
    ("tree", "/triː/", "树"),
    ("flower", "/ˈflaʊ.ər/", "花"),
    ("house", "/haʊs/", "房子"),
    ("car", "/kɑːr/", "汽车"),
    ("bus", "/bʌs/", "公共汽车"),
    ("train", "/treɪn/", "火车"),
    ("ship", "/ʃɪp/", "船"),
    ("man", "/mæn/", "男人"),
    ("woman", "/ˈwʊm.ən/", "女人"),
    ("child", "/tʃaɪld/", "孩子"),
    ("friend", "/frend/", "朋友"),
    ("river", "/ˈrɪv.ər/", "河"),
    ("student", "/ˈstuː.dənt/", "学生"),
    ("doctor", "/ˈdɑːk.tər/", "医生"),
    ("people", "/ˈpiː.pəl/", "人们"),
    ("family", "/ˈfæm.əl.i/", "家庭"),
    ("home", "/hoʊm/", "家"),
    ("school", "/skuːl/", "学校"),
    ("work", "/wɜːrk/", "工作"),
    ("money", "/ˈmʌn.i/", "钱"),
    ("life", "/laɪf/", "生活"),
    ("time", "/taɪm/", "时间"),
    ("love", "/lʌv/", "爱"),
    ("happy", "/ˈhæp.i/", "快乐的"),
    ("sad", "/sæd/", "悲伤的"),
    ("beautiful", "/ˈbjuː.tɪ.fəl/", "美丽的"),
    ("hello", "/həˈloʊ/", "你好"),
];

/// Offline table of common words.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinDictionary;

impl BuiltinDictionary {
    pub fn find(&self, term: &str) -> Option<Enrichment> {
        let key = term_key(term);
        BUILTIN_ENTRIES
            .iter()
            .find(|(entry, _, _)| *entry == key)
            .map(|(_, ipa, meaning)| Enrichment {
                ipa: Some((*ipa).to_string()),
                native_meaning: Some((*meaning).to_string()),
                ..Default::default()
            })
    }

    /// The English term whose builtin meaning is exactly `meaning`.
    pub fn term_for(&self, meaning: &str) -> Option<&'static str> {
        let meaning = meaning.trim();
        BUILTIN_ENTRIES
            .iter()
            .find(|(_, _, native)| *native == meaning)
            .map(|(term, _, _)| *term)
    }
}

impl EnrichmentProvider for BuiltinDictionary {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn lookup<'a>(
        &'a self,
        term: &'a str,
    ) -> LocalBoxFuture<'a, Result<Enrichment, EnrichmentError>> {
        let found = self
            .find(term)
            .ok_or_else(|| EnrichmentError::NotFound(term.to_string()));
        futures::future::ready(found).boxed_local()
    }
}

const DICTIONARY_API_URL: &str = "https://api.dictionaryapi.dev";
const MAX_DEFINITIONS: usize = 3;

/// dictionaryapi.dev entries for one language variant.
#[derive(Clone, Debug)]
pub struct DictionaryApi {
    base_url: String,
    variant: &'static str,
}

impl DictionaryApi {
    pub const VARIANTS: [&'static str; 3] = ["en", "en_US", "en_GB"];

    pub fn new(variant: &'static str) -> Self {
        Self {
            base_url: DICTIONARY_API_URL.to_string(),
            variant,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn entry_url(&self, term: &str) -> String {
        format!(
            "{}/api/v2/entries/{}/{}",
            self.base_url,
            self.variant,
            urlencoding::encode(term)
        )
    }
}

#[derive(serde::Deserialize)]
struct DictionaryEntry {
    #[serde(default)]
    phonetic: Option<String>,
    #[serde(default)]
    phonetics: Vec<DictionaryPhonetic>,
    #[serde(default)]
    meanings: Vec<DictionaryMeaning>,
}

#[derive(serde::Deserialize)]
struct DictionaryPhonetic {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    audio: Option<String>,
}

#[derive(serde::Deserialize)]
struct DictionaryMeaning {
    #[serde(default)]
    definitions: Vec<DictionaryDefinition>,
}

#[derive(serde::Deserialize)]
struct DictionaryDefinition {
    definition: String,
}

fn non_empty(text: &Option<String>) -> Option<String> {
    text.as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Extracts phonetics, the first audio clip and a few definitions from a
/// dictionaryapi.dev response body.
pub fn parse_dictionary_entries(term: &str, body: &str) -> Result<Enrichment, EnrichmentError> {
    let entries: Vec<DictionaryEntry> = serde_json::from_str(body)?;

    let phonetics = entries.iter().flat_map(|entry| &entry.phonetics);
    let ipa = phonetics
        .clone()
        .find_map(|phonetic| non_empty(&phonetic.text))
        .or_else(|| entries.iter().find_map(|entry| non_empty(&entry.phonetic)));
    let audio_url = phonetics.clone().find_map(|phonetic| non_empty(&phonetic.audio));
    let meanings: Vec<String> = entries
        .iter()
        .flat_map(|entry| &entry.meanings)
        .flat_map(|meaning| &meaning.definitions)
        .map(|definition| definition.definition.trim().to_string())
        .filter(|definition| !definition.is_empty())
        .take(MAX_DEFINITIONS)
        .collect();

    let enrichment = Enrichment {
        ipa,
        meanings,
        native_meaning: None,
        audio_url,
    };
    if enrichment.is_empty() {
        Err(EnrichmentError::NotFound(term.to_string()))
    } else {
        Ok(enrichment)
    }
}

pub(crate) async fn fetch_text(url: String) -> Result<String, EnrichmentError> {
    let response = fetch_happen::Client
        .get(url)
        .send()
        .await
        .map_err(EnrichmentError::Request)?;
    if !response.ok() {
        return Err(EnrichmentError::Status(response.status().to_string()));
    }
    response.text().await.map_err(EnrichmentError::Request)
}

impl EnrichmentProvider for DictionaryApi {
    fn name(&self) -> &'static str {
        "dictionaryapi.dev"
    }

    fn lookup<'a>(
        &'a self,
        term: &'a str,
    ) -> LocalBoxFuture<'a, Result<Enrichment, EnrichmentError>> {
        async move {
            let body = fetch_text(self.entry_url(term)).await?;
            parse_dictionary_entries(term, &body)
        }
        .boxed_local()
    }
}

/// The app's own `/api/ipa` aggregator.
#[derive(Clone, Debug)]
pub struct PhoneticsEndpoint {
    base_url: String,
}

#[derive(serde::Deserialize)]
struct PhoneticsResponse {
    #[serde(default)]
    ipa: Option<String>,
    #[serde(default)]
    audios: Vec<String>,
}

impl PhoneticsEndpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn url(&self, term: &str) -> String {
        format!(
            "{}/api/ipa?q={}",
            self.base_url,
            urlencoding::encode(term)
        )
    }
}

pub fn parse_phonetics_response(term: &str, body: &str) -> Result<Enrichment, EnrichmentError> {
    let response: PhoneticsResponse = serde_json::from_str(body)?;
    let enrichment = Enrichment {
        ipa: non_empty(&response.ipa),
        audio_url: response
            .audios
            .into_iter()
            .map(|audio| audio.trim().to_string())
            .find(|audio| !audio.is_empty()),
        ..Default::default()
    };
    if enrichment.is_empty() {
        Err(EnrichmentError::NotFound(term.to_string()))
    } else {
        Ok(enrichment)
    }
}

impl EnrichmentProvider for PhoneticsEndpoint {
    fn name(&self) -> &'static str {
        "phonetics endpoint"
    }

    fn lookup<'a>(
        &'a self,
        term: &'a str,
    ) -> LocalBoxFuture<'a, Result<Enrichment, EnrichmentError>> {
        async move {
            let body = fetch_text(self.url(term)).await?;
            parse_phonetics_response(term, &body)
        }
        .boxed_local()
    }
}

#[derive(Default)]
pub struct EnrichmentChain {
    providers: Vec<Box<dyn EnrichmentProvider>>,
}

impl EnrichmentChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builtin table first, then Baidu translation when it is configured,
    /// then dictionaryapi.dev in each variant, then the app's own aggregator.
    pub fn standard(translation: &TranslationConfig) -> Self {
        let mut chain = Self::new().with_provider(BuiltinDictionary);
        if let Some(baidu) = translation.baidu() {
            chain = chain.with_provider(baidu);
        }
        for variant in DictionaryApi::VARIANTS {
            chain = chain.with_provider(DictionaryApi::new(variant));
        }
        chain.with_provider(PhoneticsEndpoint::new(crate::utils::backend_url()))
    }

    pub fn with_provider(mut self, provider: impl EnrichmentProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    pub async fn lookup(&self, term: &str) -> Enrichment {
        let term = term.trim();
        let mut result = Enrichment::default();
        if term.is_empty() {
            return result;
        }

        for provider in &self.providers {
            if result.is_complete() {
                break;
            }
            match provider.lookup(term).await {
                Ok(found) => {
                    log::debug!("{} found data for {term}", provider.name());
                    result.fill_missing(found);
                }
                Err(EnrichmentError::NotFound(_)) => {
                    log::debug!("{} has no entry for {term}", provider.name());
                }
                Err(e) => {
                    log::warn!("{} lookup for {term} failed: {e}", provider.name());
                }
            }
        }
        result
    }
}
