//! Intent classification.
//!
//! [`IntentClassifier::classify`] is the standalone adapter contract: it
//! labels an utterance without dialogue state, lexicon rules first (greeting,
//! time, fees, programme names and keywords), then the optional statistical
//! predictor behind [`IntentPredictor`]. Rules follow the resolver cascade's
//! order but report the adapter's own scale: 1.0 for greeting and time, 0.9
//! for fee keywords and exact programme names, and 0.9 or 0.8 for programme
//! keywords depending on whether the keyword is shared. The resolver itself
//! only calls [`IntentClassifier::predict`] and scores its rule hits on its
//! own.
//!
//! Predictor failures surface as [`ClassifierError`] from `predict`;
//! `classify` folds them into the `fallback` label with confidence 0.0.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::knowledge::FALLBACK_TAG;
use super::lexicon::{fold, Lexicon};
use crate::error::ClassifierError;

/// A text-to-label predictor trained elsewhere.
pub trait IntentPredictor: Send + Sync {
    fn predict(&self, text: &str) -> Result<Prediction, ClassifierError>;

    /// Labels the predictor can emit.
    fn labels(&self) -> &[String];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

/// Detected intent type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    TimeQuery,
    FeeInquiry,
    CourseInquiry,
    /// Label produced by the statistical predictor.
    Statistical,
    Fallback,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::TimeQuery => "time",
            Intent::FeeInquiry => "fees",
            Intent::CourseInquiry => "course",
            Intent::Statistical => "statistical",
            Intent::Fallback => FALLBACK_TAG,
        }
    }
}

/// Result of intent classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: Intent,
    /// Rule name or predictor label.
    pub label: String,
    /// Confidence score (0.0 - 1.0)
    pub confidence: f32,
    /// Phrases or keywords that matched
    pub matched_patterns: Vec<String>,
}

/// Fee keywords and exact programme names.
const KEYWORD_RULE_CONFIDENCE: f32 = 0.9;

impl IntentResult {
    fn rule(intent: Intent, confidence: f32, matched_patterns: Vec<String>) -> Self {
        Self {
            intent,
            label: intent.label().to_string(),
            confidence,
            matched_patterns,
        }
    }

    pub fn fallback() -> Self {
        Self::rule(Intent::Fallback, 0.0, vec![])
    }
}

/// Rule layer plus optional statistical predictor.
#[derive(Clone)]
pub struct IntentClassifier {
    lexicon: Arc<Lexicon>,
    predictor: Option<Arc<dyn IntentPredictor>>,
}

impl fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("has_predictor", &self.predictor.is_some())
            .finish()
    }
}

impl IntentClassifier {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self {
            lexicon,
            predictor: None,
        }
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn IntentPredictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    pub fn has_predictor(&self) -> bool {
        self.predictor.is_some()
    }

    /// Rule layer only. `None` when no rule fires.
    pub fn pre_classify(&self, text: &str) -> Option<IntentResult> {
        let folded = fold(text);
        if folded.is_empty() {
            return None;
        }

        if self.lexicon.is_greeting(&folded) {
            return Some(IntentResult::rule(Intent::Greeting, 1.0, vec![folded]));
        }
        if self.lexicon.is_time_query(&folded) {
            return Some(IntentResult::rule(Intent::TimeQuery, 1.0, vec![folded]));
        }

        let fee_hits = self.lexicon.fee_keywords(&folded);
        if !fee_hits.is_empty() {
            return Some(IntentResult::rule(
                Intent::FeeInquiry,
                KEYWORD_RULE_CONFIDENCE,
                fee_hits.into_iter().map(String::from).collect(),
            ));
        }

        if let Some(topic) = self.lexicon.exact_topic(&folded) {
            return Some(IntentResult::rule(
                Intent::CourseInquiry,
                KEYWORD_RULE_CONFIDENCE,
                vec![topic.key.to_string()],
            ));
        }
        self.lexicon.topic_match(&folded).map(|m| {
            IntentResult::rule(
                Intent::CourseInquiry,
                m.confidence,
                m.matched_keywords.into_iter().map(String::from).collect(),
            )
        })
    }

    /// Statistical layer only, with explicit failure.
    pub fn predict(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let predictor = self
            .predictor
            .as_ref()
            .ok_or_else(|| ClassifierError::Unavailable("no intent model loaded".to_string()))?;
        if text.trim().is_empty() {
            return Err(ClassifierError::MalformedInput);
        }
        let prediction = predictor.predict(text)?;
        Ok(Prediction {
            confidence: prediction.confidence.clamp(0.0, 1.0),
            ..prediction
        })
    }

    /// Rules first, then the predictor. Never fails.
    pub fn classify(&self, text: &str) -> IntentResult {
        if let Some(result) = self.pre_classify(text) {
            return result;
        }

        match self.predict(text) {
            Ok(prediction) => IntentResult {
                intent: Intent::Statistical,
                label: prediction.label,
                confidence: prediction.confidence,
                matched_patterns: vec![],
            },
            Err(e) => {
                tracing::debug!("Classifier fallback: {}", e);
                IntentResult::fallback()
            }
        }
    }
}
