//! Machine translation between English terms and their Chinese meanings,
//! through the Baidu general translation API.
//!
//! Requests are signed with `md5(appid + query + salt + secret)`. The keys
//! are user supplied and live in a [`TranslationConfig`] record; without them
//! no translation provider is added to the enrichment chain.

use futures::FutureExt as _;
use futures::future::LocalBoxFuture;
use stash::Record;
use vocab_utils::Enrichment;

use crate::enrichment::{BuiltinDictionary, EnrichmentError, EnrichmentProvider, fetch_text};

/// Proxied through the app's own origin, since Baidu does not send CORS
/// headers.
pub const BAIDU_API_URL: &str = "/api/baidu/api/trans/vip/translate";

const MAX_TRANSLATION_CHARS: usize = 30;

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize, tsify::Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationConfig {
    pub baidu_app_id: Option<String>,
    pub baidu_secret: Option<String>,
    /// Overrides [`BAIDU_API_URL`].
    pub baidu_api_url: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl TranslationConfig {
    pub fn sanitized(self) -> Self {
        Self {
            baidu_app_id: non_blank(self.baidu_app_id),
            baidu_secret: non_blank(self.baidu_secret),
            baidu_api_url: non_blank(self.baidu_api_url),
        }
    }

    /// A Baidu client, when both keys are configured.
    pub fn baidu(&self) -> Option<BaiduTranslate> {
        let app_id = self.baidu_app_id.as_deref()?;
        let secret = self.baidu_secret.as_deref()?;
        let client = BaiduTranslate::new(app_id, secret);
        Some(match &self.baidu_api_url {
            Some(url) => client.with_api_url(url.clone()),
            None => client,
        })
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "version")]
pub enum VersionedTranslationConfig {
    V1(TranslationConfig),
}

impl Record for TranslationConfig {
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(VersionedTranslationConfig::from(self.clone()))
    }

    fn from_json(json: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value::<VersionedTranslationConfig>(json.clone())
            .map(|versioned| TranslationConfig::from(versioned).sanitized())
    }
}

impl From<TranslationConfig> for VersionedTranslationConfig {
    fn from(config: TranslationConfig) -> Self {
        VersionedTranslationConfig::V1(config)
    }
}

impl From<VersionedTranslationConfig> for TranslationConfig {
    fn from(config: VersionedTranslationConfig) -> Self {
        match config {
            VersionedTranslationConfig::V1(config) => config,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BaiduTranslate {
    app_id: String,
    secret: String,
    api_url: String,
}

#[derive(serde::Deserialize)]
struct BaiduResponse {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_msg: Option<String>,
    #[serde(default)]
    trans_result: Vec<BaiduTranslation>,
}

#[derive(serde::Deserialize)]
struct BaiduTranslation {
    dst: String,
}

impl BaiduTranslate {
    pub fn new(app_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            secret: secret.into(),
            api_url: BAIDU_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn sign(&self, query: &str, salt: &str) -> String {
        let digest = md5::compute(format!("{}{query}{salt}{}", self.app_id, self.secret));
        format!("{digest:x}")
    }

    fn request_url(&self, query: &str, from: &str, to: &str, salt: &str) -> String {
        format!(
            "{}?q={}&from={from}&to={to}&appid={}&salt={salt}&sign={}",
            self.api_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.app_id),
            self.sign(query, salt)
        )
    }

    pub async fn translate(
        &self,
        text: &str,
        from: &str,
        to: &str,
    ) -> Result<String, EnrichmentError> {
        let salt = crate::utils::now().timestamp_millis().to_string();
        let body = fetch_text(self.request_url(text, from, to, &salt)).await?;
        parse_translate_response(text, &body)
    }
}

/// A readable message for the documented Baidu error codes.
pub fn baidu_error_message(code: &str) -> Option<&'static str> {
    Some(match code {
        "52001" => "request timed out",
        "52002" => "system error",
        "52003" => "unauthorized user, check the app id",
        "54000" => "a required parameter is empty",
        "54001" => "invalid signature, check the secret",
        "54003" => "rate limited",
        "54004" => "insufficient account balance",
        "54005" => "too many long queries",
        "58000" => "client IP not allowed",
        "58001" => "unsupported language pair",
        "58002" => "service is turned off",
        "90107" => "authentication has not taken effect",
        _ => return None,
    })
}

pub fn parse_translate_response(text: &str, body: &str) -> Result<String, EnrichmentError> {
    let response: BaiduResponse = serde_json::from_str(body)?;
    // success responses may carry "52000"
    if let Some(code) = response.error_code.filter(|code| code != "52000") {
        let message = baidu_error_message(&code)
            .map(str::to_string)
            .or(response.error_msg)
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(EnrichmentError::Service { code, message });
    }
    response
        .trans_result
        .into_iter()
        .map(|translation| translation.dst.trim().to_string())
        .find(|translation| !translation.is_empty())
        .ok_or_else(|| EnrichmentError::NotFound(text.to_string()))
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// Trims trailing punctuation and rejects results that are not a plausible
/// Chinese meaning for `term`.
pub fn clean_translation(term: &str, translation: &str) -> Option<String> {
    let cleaned: String = translation
        .trim()
        .trim_end_matches(['，', '。', '！', '？', '的'])
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let length = cleaned.chars().count();
    let plausible = (1..=MAX_TRANSLATION_CHARS).contains(&length)
        && cleaned.chars().any(is_cjk)
        && !cleaned.eq_ignore_ascii_case(term.trim());
    plausible.then_some(cleaned)
}

impl EnrichmentProvider for BaiduTranslate {
    fn name(&self) -> &'static str {
        "baidu translate"
    }

    fn lookup<'a>(
        &'a self,
        term: &'a str,
    ) -> LocalBoxFuture<'a, Result<Enrichment, EnrichmentError>> {
        async move {
            let translated = self.translate(term, "en", "zh").await?;
            let native_meaning = clean_translation(term, &translated)
                .ok_or_else(|| EnrichmentError::NotFound(term.to_string()))?;
            Ok(Enrichment {
                native_meaning: Some(native_meaning),
                ..Default::default()
            })
        }
        .boxed_local()
    }
}

/// Finds the English term for a Chinese meaning: the builtin table first,
/// then Baidu when configured. Failures are logged and give `None`.
pub async fn reverse_translate(meaning: &str, baidu: Option<&BaiduTranslate>) -> Option<String> {
    let meaning = meaning.trim();
    if meaning.is_empty() {
        return None;
    }
    if let Some(term) = BuiltinDictionary.term_for(meaning) {
        return Some(term.to_string());
    }

    let baidu = baidu?;
    match baidu.translate(meaning, "zh", "en").await {
        Ok(term) => Some(term),
        Err(e) => {
            log::warn!("Reverse translation of {meaning} failed: {e}");
            None
        }
    }
}
