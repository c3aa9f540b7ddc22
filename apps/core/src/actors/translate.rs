//! Translation and language-detection collaborators.
//!
//! - `HttpTranslator`: LibreTranslate-compatible service (`POST /detect`,
//!   `POST /translate`) with an LRU cache of translations.
//! - `IdentityTranslator`: returns the input, used when no service is set.
//! - `HeuristicDetector`: offline detection from script and function words.

use async_trait::async_trait;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::traits::{LanguageDetector, Translator};
use crate::brain::{detect_language, Language};
use crate::error::{AppError, TranslateError};

#[derive(Serialize)]
struct DetectRequest<'a> {
    q: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct DetectCandidate {
    language: String,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

type CacheKey = (Language, Language, String);

pub struct HttpTranslator {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    cache: Mutex<LruCache<CacheKey, String>>,
}

impl HttpTranslator {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration, cache_capacity: usize) -> Result<Self, AppError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            client,
            base_url,
            api_key,
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    fn endpoint(&self, name: &str) -> Result<Url, TranslateError> {
        self.base_url
            .join(name)
            .map_err(|e| TranslateError::Http(e.to_string()))
    }

    fn cached(&self, key: &CacheKey) -> Option<String> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    fn remember(&self, key: CacheKey, value: String) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, value);
        }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    #[instrument(skip(self, text))]
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String, TranslateError> {
        if text.trim().is_empty() || source == target {
            return Ok(text.to_string());
        }
        if target == Language::Unknown {
            return Err(TranslateError::Unsupported(target.code().to_string()));
        }

        let key = (source, target, text.to_string());
        if let Some(hit) = self.cached(&key) {
            debug!("Translation cache hit");
            return Ok(hit);
        }

        let source_code = match source {
            Language::Unknown => "auto",
            lang => lang.code(),
        };
        let body = TranslateRequest {
            q: text,
            source: source_code,
            target: target.code(),
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response: TranslateResponse = self
            .client
            .post(self.endpoint("translate")?)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        self.remember(key, response.translated_text.clone());
        Ok(response.translated_text)
    }
}

#[async_trait]
impl LanguageDetector for HttpTranslator {
    #[instrument(skip(self, text))]
    async fn detect(&self, text: &str) -> Result<Language, TranslateError> {
        let body = DetectRequest {
            q: text,
            api_key: self.api_key.as_deref(),
        };

        let candidates: Vec<DetectCandidate> = self
            .client
            .post(self.endpoint("detect")?)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let best = candidates
            .into_iter()
            .next()
            .ok_or_else(|| TranslateError::Malformed("empty detection result".to_string()))?;
        match Language::from_code(&best.language) {
            Language::Unknown => Err(TranslateError::Unsupported(best.language)),
            lang => Ok(lang),
        }
    }
}

/// Pass-through translator.
pub struct IdentityTranslator;

#[async_trait]
impl Translator for IdentityTranslator {
    async fn translate(&self, text: &str, _source: Language, _target: Language) -> Result<String, TranslateError> {
        Ok(text.to_string())
    }
}

/// Offline detector backed by [`detect_language`].
pub struct HeuristicDetector;

#[async_trait]
impl LanguageDetector for HeuristicDetector {
    async fn detect(&self, text: &str) -> Result<Language, TranslateError> {
        Ok(detect_language(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn translator(server: &MockServer) -> HttpTranslator {
        HttpTranslator::new(&server.uri(), Some("secret".into()), Duration::from_secs(5), 8).unwrap()
    }

    #[tokio::test]
    async fn test_translate_and_cache() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .and(body_partial_json(serde_json::json!({
                "q": "学费是多少", "source": "zh", "target": "en", "api_key": "secret"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translatedText": "How much is the tuition"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let t = translator(&server);
        for _ in 0..2 {
            let out = t.translate("学费是多少", Language::Chinese, Language::English).await.unwrap();
            assert_eq!(out, "How much is the tuition");
        }
    }

    #[tokio::test]
    async fn test_same_language_skips_service() {
        let server = MockServer::start().await;
        let t = translator(&server);
        let out = t.translate("hello", Language::English, Language::English).await.unwrap();
        assert_eq!(out, "hello");
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = translator(&server)
            .translate("bonjour", Language::French, Language::English)
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::Status(503, _)));
    }

    #[tokio::test]
    async fn test_detect() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"language": "fr", "confidence": 92.0}
            ])))
            .mount(&server)
            .await;

        let lang = translator(&server).detect("bonjour").await.unwrap();
        assert_eq!(lang, Language::French);
    }

    #[tokio::test]
    async fn test_detect_unsupported_language() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/detect"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"language": "de", "confidence": 80.0}
            ])))
            .mount(&server)
            .await;

        let err = translator(&server).detect("guten tag").await.unwrap_err();
        assert_eq!(err, TranslateError::Unsupported("de".to_string()));
    }

    #[tokio::test]
    async fn test_offline_collaborators() {
        assert_eq!(HeuristicDetector.detect("学费").await, Ok(Language::Chinese));
        assert_eq!(
            IdentityTranslator.translate("hola", Language::Spanish, Language::English).await,
            Ok("hola".to_string())
        );
    }
}
