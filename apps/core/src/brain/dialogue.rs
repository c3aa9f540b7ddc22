//! Per-conversation state.
//!
//! A [`Session`] is owned by exactly one conversation and passed into the
//! resolver on every turn; nothing here is shared between sessions.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::locale::Language;
use super::resolver::Resolver;
use super::result::{ResolutionResult, ResolutionSource, TurnContext};

/// Single-slot dialogue memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "topic", rename_all = "snake_case")]
pub enum DialogueState {
    #[default]
    Idle,
    /// A confirmation question was asked about this topic key.
    AwaitingCourseConfirmation(String),
}

impl DialogueState {
    pub fn pending_topic(&self) -> Option<&str> {
        match self {
            DialogueState::Idle => None,
            DialogueState::AwaitingCourseConfirmation(key) => Some(key),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, DialogueState::Idle)
    }
}

/// One exchanged turn, as shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub turn_id: String,
    pub user_text: String,
    pub response_text: String,
    pub confidence: f32,
    pub matched_label: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub state: DialogueState,
    /// Topic the user last asked about in detail.
    pub topic_context: Option<String>,
    pub history: Vec<ChatTurn>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: DialogueState::Idle,
            topic_context: None,
            history: Vec::new(),
        }
    }

    /// Resolve one English-normalized utterance and advance the session.
    pub fn respond(
        &mut self,
        resolver: &Resolver,
        normalized_text: &str,
        display_language: Language,
        clock: NaiveTime,
    ) -> ResolutionResult {
        let ctx = TurnContext::new(display_language, clock)
            .with_topic_context(self.topic_context.clone());
        let (result, next_state) = resolver.resolve(normalized_text, &self.state, &ctx);

        self.state = next_state;
        if matches!(
            result.source,
            ResolutionSource::TopicDetail | ResolutionSource::PendingConfirmation
        ) {
            if let Some(topic) = &result.topic {
                self.topic_context = Some(topic.clone());
            }
        }
        result
    }

    pub fn record(&mut self, turn_id: &str, user_text: &str, display_text: &str, result: &ResolutionResult) {
        self.history.push(ChatTurn {
            turn_id: turn_id.to_string(),
            user_text: user_text.to_string(),
            response_text: display_text.to_string(),
            confidence: result.confidence,
            matched_label: result.matched_label.clone(),
            timestamp: Utc::now(),
        });
    }

    pub fn last_turn(&self) -> Option<&ChatTurn> {
        self.history.last()
    }

    pub fn reset(&mut self) {
        self.state = DialogueState::Idle;
        self.topic_context = None;
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serializes_with_topic() {
        let state = DialogueState::AwaitingCourseConfirmation("nursing".to_string());
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"state":"awaiting_course_confirmation","topic":"nursing"}"#);
        assert_eq!(state.pending_topic(), Some("nursing"));
        assert_eq!(
            serde_json::to_string(&DialogueState::Idle).unwrap(),
            r#"{"state":"idle"}"#
        );
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = Session::new("s1");
        session.state = DialogueState::AwaitingCourseConfirmation("psychology".to_string());
        session.topic_context = Some("psychology".to_string());
        session.record("t1", "hi", "Hello!", &ResolutionResult::new(ResolutionSource::Greeting, "Hello!", 1.0, "greeting"));
        assert_eq!(session.last_turn().map(|t| t.turn_id.as_str()), Some("t1"));

        session.reset();
        assert!(session.state.is_idle());
        assert!(session.topic_context.is_none());
        assert!(session.history.is_empty());
    }
}
