//! Resolver output and per-turn input context.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::lexicon::FALLBACK_RESPONSE;
use super::locale::Language;

/// Which cascade stage produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    PendingConfirmation,
    Greeting,
    Time,
    Fees,
    TopicDetail,
    TopicConfirmation,
    IntentModel,
    Knowledge,
    Fallback,
}

impl ResolutionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::PendingConfirmation => "pending_confirmation",
            ResolutionSource::Greeting => "greeting",
            ResolutionSource::Time => "time",
            ResolutionSource::Fees => "fees",
            ResolutionSource::TopicDetail => "topic_detail",
            ResolutionSource::TopicConfirmation => "topic_confirmation",
            ResolutionSource::IntentModel => "intent_model",
            ResolutionSource::Knowledge => "knowledge",
            ResolutionSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the fallback message was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Empty or whitespace-only utterance.
    EmptyUtterance,
    /// No knowledge entries were loaded.
    EmptyKnowledgeTable,
    /// Nothing cleared its threshold.
    NoMatch,
}

/// One resolved turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub response_text: String,
    /// In `[0, 1]`. 0.0 only for fallbacks, 1.0 only for rule and exact matches.
    pub confidence: f32,
    pub matched_label: Option<String>,
    pub source: ResolutionSource,
    /// Canonical key of the topic this turn was about, if any.
    pub topic: Option<String>,
    /// Already rendered in the display language; must not be translated again.
    pub localized: bool,
    pub fallback_reason: Option<FallbackReason>,
}

impl ResolutionResult {
    pub fn new(
        source: ResolutionSource,
        response_text: impl Into<String>,
        confidence: f32,
        matched_label: impl Into<String>,
    ) -> Self {
        Self {
            response_text: response_text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            matched_label: Some(matched_label.into()),
            source,
            topic: None,
            localized: false,
            fallback_reason: None,
        }
    }

    pub fn fallback(reason: FallbackReason) -> Self {
        Self {
            response_text: FALLBACK_RESPONSE.to_string(),
            confidence: 0.0,
            matched_label: None,
            source: ResolutionSource::Fallback,
            topic: None,
            localized: false,
            fallback_reason: Some(reason),
        }
    }

    pub fn with_topic(mut self, key: &str) -> Self {
        self.topic = Some(key.to_string());
        self
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ResolutionSource::Fallback
    }
}

/// Per-turn inputs that are not part of the dialogue state.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub display_language: Language,
    pub clock: NaiveTime,
    /// Topic selected earlier in the session, used to narrow fee answers.
    pub topic_context: Option<String>,
}

impl TurnContext {
    pub fn new(display_language: Language, clock: NaiveTime) -> Self {
        Self {
            display_language,
            clock,
            topic_context: None,
        }
    }

    pub fn with_topic_context(mut self, topic: Option<String>) -> Self {
        self.topic_context = topic;
        self
    }

    /// English display at the current local time.
    pub fn now() -> Self {
        Self::new(Language::English, chrono::Local::now().time())
    }
}
