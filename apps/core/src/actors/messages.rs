use serde::Serialize;
use tokio::sync::oneshot;

use crate::brain::{ChatTurn, Language, ResolutionResult};
use crate::models::FeedbackRecord;

/// Defines errors that can occur within the actor system.
#[derive(Debug, thiserror::Error, Serialize, Clone)]
pub enum ActorError {
    /// The supervisor mailbox is closed or the reply was dropped.
    #[error("Internal system error: {0}")]
    Internal(String),
    #[error("Unknown session: {0}")]
    SessionNotFound(String),
    /// A turn the feedback refers to does not exist.
    #[error("Unknown turn: {0}")]
    TurnNotFound(String),
}

// Re-export AppError for convenience
pub use crate::error::AppError;

/// What the integrator shows for one processed turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub turn_id: String,
    pub session_id: String,
    pub detected_language: Language,
    /// English form fed to the resolver.
    pub normalized_text: String,
    /// Response rendered in the detected language.
    pub display_text: String,
    pub result: ResolutionResult,
}

/// Messages that can be sent to the `SupervisorActor`.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Detect, normalize, resolve, render, and log one user turn.
    ProcessTurn {
        session_id: String,
        text: String,
        responder: oneshot::Sender<Result<TurnReply, AppError>>,
    },
    /// Rate a turn. `turn_id: None` rates the session's latest turn.
    RecordFeedback {
        session_id: String,
        turn_id: Option<String>,
        helpful: bool,
        comment: Option<String>,
        responder: oneshot::Sender<Result<FeedbackRecord, AppError>>,
    },
    History {
        session_id: String,
        responder: oneshot::Sender<Vec<ChatTurn>>,
    },
    /// Clear dialogue state, topic context and history. Replies whether the
    /// session existed.
    ResetSession {
        session_id: String,
        responder: oneshot::Sender<bool>,
    },
    /// A command to shut down the supervisor.
    Shutdown,
}
