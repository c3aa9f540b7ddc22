use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// An interaction about to be appended to the log.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewInteraction {
    #[validate(length(min = 1))]
    pub turn_id: String,
    #[validate(length(min = 1))]
    pub session_id: String,
    /// Unix timestamp (seconds).
    pub timestamp: i64,
    pub raw_text: String,
    #[validate(length(min = 1))]
    pub detected_language: String,
    pub normalized_text: String,
    pub matched_label: Option<String>,
    pub response_text: String,
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence: f64,
    /// Cascade stage that answered (see `ResolutionSource`).
    #[validate(length(min = 1))]
    pub source: String,
}

/// One logged turn. Rows are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InteractionRecord {
    pub id: i64,
    pub turn_id: String,
    pub session_id: String,
    pub timestamp: i64,
    pub raw_text: String,
    pub detected_language: String,
    pub normalized_text: String,
    pub matched_label: Option<String>,
    pub response_text: String,
    pub confidence: f64,
    pub source: String,
}

/// User rating of one turn.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackRecord {
    pub id: i64,
    pub turn_id: String,
    pub session_id: String,
    pub helpful: bool,
    pub comment: Option<String>,
    pub created_at: i64,
}

/// Aggregates over the interaction and feedback tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionStats {
    pub total_turns: i64,
    pub fallback_turns: i64,
    /// `None` when no turns have been logged.
    pub mean_confidence: Option<f64>,
    pub helpful: i64,
    pub unhelpful: i64,
}

impl InteractionStats {
    pub fn fallback_rate(&self) -> f64 {
        if self.total_turns == 0 {
            0.0
        } else {
            self.fallback_turns as f64 / self.total_turns as f64
        }
    }
}
