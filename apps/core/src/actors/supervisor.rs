use crate::actors::messages::{ActorError, AppError, SupervisorMessage, TurnReply};
use crate::actors::traits::{LanguageDetector, Translator};
use crate::actors::translate::{HeuristicDetector, HttpTranslator, IdentityTranslator};
use crate::brain::{ChatTurn, Language, ResolutionResult, Resolver, Session};
use crate::config::BotConfig;
use crate::database;
use crate::models::{FeedbackRecord, NewInteraction};
use chrono::{Local, Utc};
use lru::LruCache;
use sqlx::sqlite::SqlitePool;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

const REPLY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SESSION_CAPACITY: usize = 1024;

fn mailbox_closed<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Actor(ActorError::Internal(e.to_string()))
}

/// A handle to the `SupervisorActor`.
///
/// The supervisor owns every conversation's [`Session`] and runs the turn
/// pipeline around the shared [`Resolver`]:
/// detect -> translate to English -> resolve -> translate back -> log.
#[derive(Clone)]
pub struct SupervisorHandle {
    sender: mpsc::Sender<SupervisorMessage>,
}

impl SupervisorHandle {
    /// Spawns the actor with explicit collaborators.
    pub fn new(
        resolver: Arc<Resolver>,
        translator: Arc<dyn Translator>,
        detector: Arc<dyn LanguageDetector>,
        db_pool: Option<SqlitePool>,
        default_language: Language,
    ) -> Self {
        Self::with_capacity(
            resolver,
            translator,
            detector,
            db_pool,
            default_language,
            DEFAULT_SESSION_CAPACITY,
        )
    }

    /// Keeps at most `max_sessions` conversations; the least recently active
    /// one is dropped when a new session arrives at capacity.
    pub fn with_capacity(
        resolver: Arc<Resolver>,
        translator: Arc<dyn Translator>,
        detector: Arc<dyn LanguageDetector>,
        db_pool: Option<SqlitePool>,
        default_language: Language,
        max_sessions: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let capacity = NonZeroUsize::new(max_sessions).unwrap_or(NonZeroUsize::MIN);
        let actor = SupervisorRunner {
            receiver,
            resolver,
            translator,
            detector,
            db_pool,
            default_language,
            sessions: LruCache::new(capacity),
        };
        tokio::spawn(async move { actor.run().await });
        Self { sender }
    }

    /// Remote translation when `FAQBOT_TRANSLATE_URL` is set, offline
    /// collaborators otherwise.
    pub fn from_config(config: &BotConfig, resolver: Arc<Resolver>, db_pool: Option<SqlitePool>) -> Result<Self, AppError> {
        let (translator, detector): (Arc<dyn Translator>, Arc<dyn LanguageDetector>) = match &config.translate_url {
            Some(url) => {
                let http = Arc::new(HttpTranslator::new(
                    url,
                    config.translate_api_key.clone(),
                    Duration::from_secs(config.translate_timeout_secs),
                    config.translate_cache,
                )?);
                info!("Using translation service at {}", url);
                (http.clone() as Arc<dyn Translator>, http as Arc<dyn LanguageDetector>)
            }
            None => {
                info!("No translation service configured, using offline detection");
                (
                    Arc::new(IdentityTranslator) as Arc<dyn Translator>,
                    Arc::new(HeuristicDetector) as Arc<dyn LanguageDetector>,
                )
            }
        };
        Ok(Self::with_capacity(
            resolver,
            translator,
            detector,
            db_pool,
            config.default_language,
            config.max_sessions,
        ))
    }

    async fn request<T>(&self, msg: SupervisorMessage, recv: oneshot::Receiver<T>) -> Result<T, AppError> {
        self.sender.send(msg).await.map_err(mailbox_closed)?;
        timeout(REPLY_TIMEOUT, recv).await?.map_err(mailbox_closed)
    }

    #[instrument(skip(self, text))]
    pub async fn process_turn(&self, session_id: String, text: String) -> Result<TurnReply, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::ProcessTurn {
            session_id,
            text,
            responder: send,
        };
        self.request(msg, recv).await?
    }

    #[instrument(skip(self, comment))]
    pub async fn record_feedback(
        &self,
        session_id: String,
        turn_id: Option<String>,
        helpful: bool,
        comment: Option<String>,
    ) -> Result<FeedbackRecord, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::RecordFeedback {
            session_id,
            turn_id,
            helpful,
            comment,
            responder: send,
        };
        self.request(msg, recv).await?
    }

    pub async fn history(&self, session_id: String) -> Result<Vec<ChatTurn>, AppError> {
        let (send, recv) = oneshot::channel();
        self.request(SupervisorMessage::History { session_id, responder: send }, recv)
            .await
    }

    pub async fn reset_session(&self, session_id: String) -> Result<bool, AppError> {
        let (send, recv) = oneshot::channel();
        self.request(SupervisorMessage::ResetSession { session_id, responder: send }, recv)
            .await
    }

    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.sender
            .send(SupervisorMessage::Shutdown)
            .await
            .map_err(mailbox_closed)
    }
}

// --- Actor Runner ---
struct SupervisorRunner {
    receiver: mpsc::Receiver<SupervisorMessage>,
    resolver: Arc<Resolver>,
    translator: Arc<dyn Translator>,
    detector: Arc<dyn LanguageDetector>,
    db_pool: Option<SqlitePool>,
    default_language: Language,
    sessions: LruCache<String, Session>,
}

impl SupervisorRunner {
    async fn run(mut self) {
        info!("Supervisor started");
        while let Some(msg) = self.receiver.recv().await {
            if matches!(msg, SupervisorMessage::Shutdown) {
                info!("Supervisor shutting down...");
                break;
            }
            self.handle_message(msg).await;
        }
        info!("Supervisor stopped");
    }

    async fn handle_message(&mut self, msg: SupervisorMessage) {
        match msg {
            SupervisorMessage::ProcessTurn {
                session_id,
                text,
                responder,
            } => {
                let reply = self.handle_turn(session_id, text).await;
                let _ = responder.send(Ok(reply));
            }
            SupervisorMessage::RecordFeedback {
                session_id,
                turn_id,
                helpful,
                comment,
                responder,
            } => {
                let result = self
                    .handle_feedback(&session_id, turn_id, helpful, comment.as_deref())
                    .await;
                if let Err(e) = &result {
                    error!("Error recording feedback: {}", e);
                }
                let _ = responder.send(result);
            }
            SupervisorMessage::History { session_id, responder } => {
                let history = self
                    .sessions
                    .peek(&session_id)
                    .map(|s| s.history.clone())
                    .unwrap_or_default();
                let _ = responder.send(history);
            }
            SupervisorMessage::ResetSession { session_id, responder } => {
                let existed = match self.sessions.get_mut(&session_id) {
                    Some(session) => {
                        session.reset();
                        true
                    }
                    None => false,
                };
                let _ = responder.send(existed);
            }
            SupervisorMessage::Shutdown => {}
        }
    }

    /// Always produces a reply; collaborator failures only degrade it.
    #[instrument(skip(self, text))]
    async fn handle_turn(&mut self, session_id: String, text: String) -> TurnReply {
        let detected = match self.detector.detect(&text).await {
            Ok(Language::Unknown) => self.default_language,
            Ok(lang) => lang,
            Err(e) => {
                warn!("Language detection failed, using {}: {}", self.default_language, e);
                self.default_language
            }
        };

        let normalized_text = if detected.is_english() {
            text.clone()
        } else {
            match self.translator.translate(&text, detected, Language::English).await {
                Ok(translated) => translated,
                Err(e) => {
                    warn!("Inbound translation failed, resolving raw text: {}", e);
                    text.clone()
                }
            }
        };

        let mut session = self
            .sessions
            .pop(&session_id)
            .unwrap_or_else(|| Session::new(session_id.clone()));
        let result = session.respond(&self.resolver, &normalized_text, detected, Local::now().time());

        let display_text = self.render(&result, detected).await;
        let turn_id = Uuid::new_v4().to_string();
        session.record(&turn_id, &text, &display_text, &result);

        if let Some((evicted, _)) = self.sessions.push(session_id.clone(), session) {
            info!("Session capacity reached, dropped idle session {}", evicted);
        }

        self.log_interaction(&turn_id, &session_id, &text, detected, &normalized_text, &result)
            .await;

        TurnReply {
            turn_id,
            session_id,
            detected_language: detected,
            normalized_text,
            display_text,
            result,
        }
    }

    async fn render(&self, result: &ResolutionResult, language: Language) -> String {
        if result.localized || language.is_english() {
            return result.response_text.clone();
        }
        match self
            .translator
            .translate(&result.response_text, Language::English, language)
            .await
        {
            Ok(translated) => translated,
            Err(e) => {
                warn!("Outbound translation failed, replying in English: {}", e);
                result.response_text.clone()
            }
        }
    }

    async fn log_interaction(
        &self,
        turn_id: &str,
        session_id: &str,
        raw_text: &str,
        detected: Language,
        normalized_text: &str,
        result: &ResolutionResult,
    ) {
        let Some(pool) = &self.db_pool else {
            return;
        };
        let record = NewInteraction {
            turn_id: turn_id.to_string(),
            session_id: session_id.to_string(),
            timestamp: Utc::now().timestamp(),
            raw_text: raw_text.to_string(),
            detected_language: detected.code().to_string(),
            normalized_text: normalized_text.to_string(),
            matched_label: result.matched_label.clone(),
            response_text: result.response_text.clone(),
            confidence: f64::from(result.confidence),
            source: result.source.as_str().to_string(),
        };
        if let Err(e) = database::insert_interaction(pool, &record).await {
            warn!("Failed to log interaction {}: {}", turn_id, e);
        }
    }

    async fn handle_feedback(
        &self,
        session_id: &str,
        turn_id: Option<String>,
        helpful: bool,
        comment: Option<&str>,
    ) -> Result<FeedbackRecord, AppError> {
        let pool = self
            .db_pool
            .as_ref()
            .ok_or(AppError::Config("Database not initialized".to_string()))?;

        let turn_id = match turn_id {
            Some(id) => id,
            None => self
                .sessions
                .peek(session_id)
                .ok_or_else(|| ActorError::SessionNotFound(session_id.to_string()))?
                .last_turn()
                .map(|t| t.turn_id.clone())
                .ok_or_else(|| ActorError::TurnNotFound("no turns yet".to_string()))?,
        };

        database::insert_feedback(pool, &turn_id, session_id, helpful, comment).await
    }
}
