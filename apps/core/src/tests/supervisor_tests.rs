//! Supervisor Tests
//!
//! The per-session turn pipeline with scripted translation collaborators.

use crate::actors::messages::{ActorError, AppError};
use crate::actors::supervisor::SupervisorHandle;
use crate::actors::traits::{LanguageDetector, Translator};
use crate::brain::lexicon::GREETING_RESPONSE;
use crate::brain::{KnowledgeBase, Language, Lexicon, ResolutionSource, Resolver};
use crate::database;
use crate::error::TranslateError;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

// --- Mock Components ---

/// French when the text contains a French marker word, English otherwise.
struct ScriptedDetector;

#[async_trait]
impl LanguageDetector for ScriptedDetector {
    async fn detect(&self, text: &str) -> Result<Language, TranslateError> {
        let lower = text.to_lowercase();
        if ["bonjour", "quelle", "frais"].iter().any(|w| lower.contains(w)) {
            Ok(Language::French)
        } else {
            Ok(Language::English)
        }
    }
}

struct BrokenDetector;

#[async_trait]
impl LanguageDetector for BrokenDetector {
    async fn detect(&self, _text: &str) -> Result<Language, TranslateError> {
        Err(TranslateError::Http("connection refused".to_string()))
    }
}

/// Fixed French phrasebook inbound, `[fr] ` prefix outbound.
#[derive(Default)]
struct PhrasebookTranslator {
    calls: AtomicUsize,
}

#[async_trait]
impl Translator for PhrasebookTranslator {
    async fn translate(&self, text: &str, _source: Language, target: Language) -> Result<String, TranslateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if target != Language::English {
            return Ok(format!("[{}] {}", target.code(), text));
        }
        let english = match text.to_lowercase().as_str() {
            "bonjour" => "hello",
            "quelle heure est-il" => "what time is it",
            "combien sont les frais" => "how much are the fees",
            other => return Ok(other.to_string()),
        };
        Ok(english.to_string())
    }
}

struct BrokenTranslator;

#[async_trait]
impl Translator for BrokenTranslator {
    async fn translate(&self, _text: &str, _source: Language, _target: Language) -> Result<String, TranslateError> {
        Err(TranslateError::Status(503, "unavailable".to_string()))
    }
}

fn resolver() -> Arc<Resolver> {
    Arc::new(Resolver::new(
        Lexicon::builtin(),
        KnowledgeBase::from_pairs([(
            "what are the admission requirements",
            "Admission requires a completed application form.",
        )]),
    ))
}

fn supervisor_with(
    translator: Arc<dyn Translator>,
    detector: Arc<dyn LanguageDetector>,
    pool: Option<SqlitePool>,
) -> SupervisorHandle {
    SupervisorHandle::new(resolver(), translator, detector, pool, Language::English)
}

fn supervisor() -> SupervisorHandle {
    supervisor_with(
        Arc::new(PhrasebookTranslator::default()),
        Arc::new(ScriptedDetector),
        None,
    )
}

async fn test_pool() -> (TempDir, SqlitePool) {
    let dir = tempdir().expect("Failed to create temp dir");
    let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("turns.sqlite").display());
    let pool = database::init_db(&db_url).await.expect("Failed to init database");
    (dir, pool)
}

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_english_turn_skips_translation() {
        let translator = Arc::new(PhrasebookTranslator::default());
        let handle = supervisor_with(translator.clone(), Arc::new(ScriptedDetector), None);

        let reply = handle.process_turn("s1".into(), "hello".into()).await.unwrap();
        assert_eq!(reply.detected_language, Language::English);
        assert_eq!(reply.normalized_text, "hello");
        assert_eq!(reply.display_text, GREETING_RESPONSE);
        assert_eq!(reply.result.source, ResolutionSource::Greeting);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_french_turn_round_trips_through_translator() {
        let reply = supervisor()
            .process_turn("s1".into(), "Bonjour".into())
            .await
            .unwrap();
        assert_eq!(reply.detected_language, Language::French);
        assert_eq!(reply.normalized_text, "hello");
        assert_eq!(reply.result.response_text, GREETING_RESPONSE);
        assert_eq!(reply.display_text, format!("[fr] {}", GREETING_RESPONSE));
    }

    #[tokio::test]
    async fn test_localized_time_is_not_translated_again() {
        let reply = supervisor()
            .process_turn("s1".into(), "quelle heure est-il".into())
            .await
            .unwrap();
        assert_eq!(reply.result.source, ResolutionSource::Time);
        assert!(reply.result.localized);
        assert!(reply.display_text.starts_with("Il est "));
    }

    #[tokio::test]
    async fn test_translation_failure_degrades_to_raw_text_and_english() {
        let handle = supervisor_with(Arc::new(BrokenTranslator), Arc::new(ScriptedDetector), None);
        let reply = handle.process_turn("s1".into(), "bonjour".into()).await.unwrap();
        assert_eq!(reply.detected_language, Language::French);
        assert_eq!(reply.normalized_text, "bonjour");
        assert!(reply.result.is_fallback());
        assert_eq!(reply.display_text, reply.result.response_text);
    }

    #[tokio::test]
    async fn test_detection_failure_uses_default_language() {
        let handle = supervisor_with(
            Arc::new(PhrasebookTranslator::default()),
            Arc::new(BrokenDetector),
            None,
        );
        let reply = handle.process_turn("s1".into(), "hi".into()).await.unwrap();
        assert_eq!(reply.detected_language, Language::English);
        assert_eq!(reply.display_text, GREETING_RESPONSE);
    }

    #[tokio::test]
    async fn test_confirmation_spans_turns_within_a_session() {
        let handle = supervisor();
        let first = handle
            .process_turn("s1".into(), "computer science program".into())
            .await
            .unwrap();
        assert_eq!(first.result.source, ResolutionSource::TopicConfirmation);

        let other = handle.process_turn("s2".into(), "yes".into()).await.unwrap();
        assert_ne!(other.result.source, ResolutionSource::PendingConfirmation);

        let second = handle.process_turn("s1".into(), "yes".into()).await.unwrap();
        assert_eq!(second.result.source, ResolutionSource::PendingConfirmation);
        assert_eq!(second.result.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_concurrent_sessions() {
        let handle = supervisor();
        let mut tasks = Vec::new();
        for i in 0..8 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                handle.process_turn(format!("s{}", i), "hello".into()).await
            }));
        }
        for task in tasks {
            let reply = task.await.unwrap().unwrap();
            assert_eq!(reply.result.confidence, 1.0);
        }
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;

    #[tokio::test]
    async fn test_history_and_reset() {
        let handle = supervisor();
        handle.process_turn("s1".into(), "hello".into()).await.unwrap();
        handle.process_turn("s1".into(), "Bonjour".into()).await.unwrap();

        let history = handle.history("s1".into()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].user_text, "Bonjour");
        assert!(history[1].response_text.starts_with("[fr] "));

        assert!(handle.reset_session("s1".into()).await.unwrap());
        assert!(handle.history("s1".into()).await.unwrap().is_empty());
        assert!(!handle.reset_session("unknown".into()).await.unwrap());
    }

    #[tokio::test]
    async fn test_reset_clears_pending_confirmation() {
        let handle = supervisor();
        handle
            .process_turn("s1".into(), "computer science program".into())
            .await
            .unwrap();
        handle.reset_session("s1".into()).await.unwrap();
        let reply = handle.process_turn("s1".into(), "yes".into()).await.unwrap();
        assert_ne!(reply.result.source, ResolutionSource::PendingConfirmation);
    }

    #[tokio::test]
    async fn test_least_recent_session_is_dropped_at_capacity() {
        let handle = SupervisorHandle::with_capacity(
            resolver(),
            Arc::new(PhrasebookTranslator::default()),
            Arc::new(ScriptedDetector),
            None,
            Language::English,
            2,
        );
        handle.process_turn("s1".into(), "hello".into()).await.unwrap();
        handle.process_turn("s2".into(), "hello".into()).await.unwrap();
        handle.process_turn("s1".into(), "what time is it".into()).await.unwrap();
        handle.process_turn("s3".into(), "hello".into()).await.unwrap();

        assert_eq!(handle.history("s1".into()).await.unwrap().len(), 2);
        assert!(handle.history("s2".into()).await.unwrap().is_empty());
        assert_eq!(handle.history("s3".into()).await.unwrap().len(), 1);
        assert!(!handle.reset_session("s2".into()).await.unwrap());
    }

    #[tokio::test]
    async fn test_requests_fail_after_shutdown() {
        let handle = supervisor();
        handle.shutdown().await.unwrap();
        tokio::task::yield_now().await;
        let err = handle.process_turn("s1".into(), "hello".into()).await.unwrap_err();
        assert!(matches!(err, AppError::Actor(ActorError::Internal(_))));
    }
}

#[cfg(test)]
mod logging_tests {
    use super::*;

    #[tokio::test]
    async fn test_turns_are_logged() {
        let (_dir, pool) = test_pool().await;
        let handle = supervisor_with(
            Arc::new(PhrasebookTranslator::default()),
            Arc::new(ScriptedDetector),
            Some(pool.clone()),
        );

        let reply = handle
            .process_turn("s1".into(), "combien sont les frais".into())
            .await
            .unwrap();

        let records = database::get_session_interactions(&pool, "s1").await.unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.turn_id, reply.turn_id);
        assert_eq!(record.raw_text, "combien sont les frais");
        assert_eq!(record.detected_language, "fr");
        assert_eq!(record.normalized_text, "how much are the fees");
        assert_eq!(record.source, "fees");
        assert_eq!(record.response_text, reply.result.response_text);
    }

    #[tokio::test]
    async fn test_feedback_defaults_to_last_turn() {
        let (_dir, pool) = test_pool().await;
        let handle = supervisor_with(
            Arc::new(PhrasebookTranslator::default()),
            Arc::new(ScriptedDetector),
            Some(pool.clone()),
        );
        handle.process_turn("s1".into(), "hello".into()).await.unwrap();
        let last = handle.process_turn("s1".into(), "what time is it".into()).await.unwrap();

        let feedback = handle
            .record_feedback("s1".into(), None, false, Some("wrong timezone".into()))
            .await
            .unwrap();
        assert_eq!(feedback.turn_id, last.turn_id);
        assert_eq!(feedback.comment.as_deref(), Some("wrong timezone"));

        let err = handle
            .record_feedback("nobody".into(), None, true, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Actor(ActorError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_feedback_without_database() {
        let handle = supervisor();
        handle.process_turn("s1".into(), "hello".into()).await.unwrap();
        let err = handle.record_feedback("s1".into(), None, true, None).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
