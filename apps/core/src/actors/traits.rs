use crate::brain::Language;
use crate::error::TranslateError;
use async_trait::async_trait;

/// Machine translation between display languages.
///
/// The supervisor translates user text into English before resolution and
/// the English response back into the user's language. Failures are reported,
/// never panicked on; the caller decides how to degrade.
#[async_trait]
pub trait Translator: Send + Sync + 'static {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String, TranslateError>;
}

/// Detects the language of a user utterance.
#[async_trait]
pub trait LanguageDetector: Send + Sync + 'static {
    async fn detect(&self, text: &str) -> Result<Language, TranslateError>;
}
