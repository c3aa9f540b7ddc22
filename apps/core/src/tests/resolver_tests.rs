//! Resolver Tests
//!
//! Cascade priority and dialogue state transitions, driven through
//! `Resolver::resolve` and `Session::respond`.

use crate::brain::lexicon::{FALLBACK_RESPONSE, GREETING_RESPONSE};
use crate::brain::{
    DialogueState, FallbackReason, Intent, IntentFile, IntentPredictor, KnowledgeBase, Language, Lexicon, Prediction,
    ResolutionSource, Resolver, ResolverSettings, ResponseSelection, ResponseTable, Session, TurnContext,
};
use crate::error::ClassifierError;
use chrono::NaiveTime;
use std::sync::Arc;

fn clock() -> NaiveTime {
    NaiveTime::from_hms_opt(14, 5, 0).unwrap()
}

fn ctx() -> TurnContext {
    TurnContext::new(Language::English, clock())
}

fn admissions_kb() -> KnowledgeBase {
    KnowledgeBase::from_pairs([
        (
            "what are the admission requirements",
            "Admission requires a completed application form, high school transcripts, and proof of English proficiency.",
        ),
        ("when are the exams", "Final exams run during the last two weeks of each semester."),
        ("where is the library", "The main library is next to the student union building."),
    ])
}

fn resolver() -> Resolver {
    Resolver::new(Lexicon::builtin(), admissions_kb())
}

fn awaiting_cs() -> DialogueState {
    DialogueState::AwaitingCourseConfirmation("computer science".to_string())
}

/// Predicts one label at a fixed confidence for every input.
struct FixedPredictor {
    labels: Vec<String>,
    confidence: f32,
}

impl FixedPredictor {
    fn new(label: &str, confidence: f32) -> Self {
        Self {
            labels: vec![label.to_string()],
            confidence,
        }
    }
}

impl IntentPredictor for FixedPredictor {
    fn predict(&self, _text: &str) -> Result<Prediction, ClassifierError> {
        Ok(Prediction {
            label: self.labels[0].clone(),
            confidence: self.confidence,
        })
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

fn scholarship_responses() -> ResponseTable {
    let intents = IntentFile::from_json_str(
        r#"{"intents": [
            {"tag": "scholarships", "patterns": ["any scholarships"], "responses": ["Merit scholarships cover up to half of tuition."]},
            {"tag": "fallback", "patterns": [], "responses": ["Sorry?"]}
        ]}"#,
    )
    .unwrap();
    ResponseTable::from_intents(&intents)
}

#[cfg(test)]
mod cascade_tests {
    use super::*;

    #[test]
    fn test_greeting_is_certain_and_idle() {
        let (result, state) = resolver().resolve("hello", &DialogueState::Idle, &ctx());
        assert_eq!(result.response_text, GREETING_RESPONSE);
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.source, ResolutionSource::Greeting);
        assert_eq!(state, DialogueState::Idle);
    }

    #[test]
    fn test_greeting_with_punctuation_and_case() {
        let (result, _) = resolver().resolve("  Good Morning!! ", &DialogueState::Idle, &ctx());
        assert_eq!(result.source, ResolutionSource::Greeting);
    }

    #[test]
    fn test_time_query_renders_in_display_language() {
        let english = resolver().resolve("what time is it", &DialogueState::Idle, &ctx()).0;
        assert_eq!(english.response_text, "The current time is 2:05 PM.");
        assert_eq!(english.confidence, 1.0);
        assert!(english.localized);

        let french_ctx = TurnContext::new(Language::French, clock());
        let french = resolver().resolve("what time is it", &DialogueState::Idle, &french_ctx).0;
        assert_eq!(french.response_text, "Il est 14h05.");
    }

    #[test]
    fn test_fees_without_topic_lists_full_table() {
        let (result, state) = resolver().resolve("how much is the tuition fee", &DialogueState::Idle, &ctx());
        assert_eq!(result.source, ResolutionSource::Fees);
        assert!(result.response_text.starts_with("Annual tuition fees:"));
        assert!(result.response_text.contains("Nursing: $8,600 per year"));
        assert!(result.topic.is_none());
        assert!(state.is_idle());
    }

    #[test]
    fn test_fees_beat_topic_confirmation() {
        let (result, state) = resolver().resolve("computer science tuition", &DialogueState::Idle, &ctx());
        assert_eq!(result.source, ResolutionSource::Fees);
        assert_eq!(result.response_text, "Tuition for Computer Science is $9,800 per year.");
        assert_eq!(result.topic.as_deref(), Some("computer science"));
        assert!(state.is_idle());
    }

    #[test]
    fn test_fees_on_shared_keyword_do_not_pick_a_programme() {
        for text in ["engineering fees", "software tuition"] {
            let (result, state) = resolver().resolve(text, &DialogueState::Idle, &ctx());
            assert_eq!(result.source, ResolutionSource::Fees, "{}", text);
            assert!(result.response_text.starts_with("Annual tuition fees:"), "{}", text);
            assert!(result.topic.is_none(), "{}", text);
            assert!(state.is_idle());
        }

        let (unique, _) = resolver().resolve("software engineering fees", &DialogueState::Idle, &ctx());
        assert_eq!(unique.topic.as_deref(), Some("software engineering"));
    }

    #[test]
    fn test_fees_on_shared_keyword_fall_back_to_topic_context() {
        let ctx = ctx().with_topic_context(Some("psychology".to_string()));
        let (result, _) = resolver().resolve("engineering fees", &DialogueState::Idle, &ctx);
        assert_eq!(result.response_text, "Tuition for Psychology is $7,900 per year.");
        assert_eq!(result.topic.as_deref(), Some("psychology"));
    }

    #[test]
    fn test_exact_topic_answers_without_confirmation() {
        let (result, state) = resolver().resolve("Computer Science", &DialogueState::Idle, &ctx());
        assert_eq!(result.source, ResolutionSource::TopicDetail);
        assert_eq!(result.confidence, 1.0);
        assert!(result.response_text.starts_with("Computer Science (4 years)"));
        assert!(state.is_idle());

        let (alias, _) = resolver().resolve("CS", &DialogueState::Idle, &ctx());
        assert_eq!(alias.topic.as_deref(), Some("computer science"));
    }

    #[test]
    fn test_keyword_topic_asks_for_confirmation() {
        let (result, state) = resolver().resolve("computer science program", &DialogueState::Idle, &ctx());
        assert_eq!(result.source, ResolutionSource::TopicConfirmation);
        assert!(result.confidence >= 0.6 && result.confidence < 1.0);
        assert!(result.response_text.contains("Computer Science"));
        assert_eq!(state, awaiting_cs());
    }

    #[test]
    fn test_knowledge_match_on_partial_question() {
        let (result, state) = resolver().resolve("admission requirements", &DialogueState::Idle, &ctx());
        assert_eq!(result.source, ResolutionSource::Knowledge);
        assert!(result.response_text.starts_with("Admission requires"));
        assert!(result.confidence > 0.3);
        assert!(result.confidence < 1.0);
        assert_eq!(result.matched_label.as_deref(), Some("what are the admission requirements"));
        assert!(state.is_idle());
    }

    #[test]
    fn test_exact_knowledge_question_scores_one() {
        let (result, _) = resolver().resolve("Where is the library?", &DialogueState::Idle, &ctx());
        assert_eq!(result.source, ResolutionSource::Knowledge);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_no_match_is_fallback_with_zero_confidence() {
        let (result, state) = resolver().resolve("quantum chromodynamics", &DialogueState::Idle, &ctx());
        assert_eq!(result.response_text, FALLBACK_RESPONSE);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.fallback_reason, Some(FallbackReason::NoMatch));
        assert!(result.matched_label.is_none());
        assert!(state.is_idle());
    }

    #[test]
    fn test_empty_knowledge_table_reason() {
        let resolver = Resolver::new(Lexicon::builtin(), KnowledgeBase::default());
        let (result, _) = resolver.resolve("admission requirements", &DialogueState::Idle, &ctx());
        assert_eq!(result.fallback_reason, Some(FallbackReason::EmptyKnowledgeTable));
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_blank_utterance_short_circuits() {
        for input in ["", "   ", "\t\n", "?!"] {
            let (result, state) = resolver().resolve(input, &awaiting_cs(), &ctx());
            assert_eq!(result.fallback_reason, Some(FallbackReason::EmptyUtterance), "input {:?}", input);
            assert!(state.is_idle());
        }
    }
}

#[cfg(test)]
mod confirmation_tests {
    use super::*;

    #[test]
    fn test_yes_confirms_pending_topic() {
        let (result, state) = resolver().resolve("yes", &awaiting_cs(), &ctx());
        assert_eq!(result.source, ResolutionSource::PendingConfirmation);
        assert_eq!(result.confidence, 1.0);
        assert!(result.response_text.contains("Curriculum:"));
        assert!(result.response_text.contains("Data Structures and Algorithms"));
        assert_eq!(result.topic.as_deref(), Some("computer science"));
        assert_eq!(state, DialogueState::Idle);
    }

    #[test]
    fn test_affirmative_variants() {
        for input in ["Yes", "y", "YES!", "是"] {
            let (result, _) = resolver().resolve(input, &awaiting_cs(), &ctx());
            assert_eq!(result.source, ResolutionSource::PendingConfirmation, "input {:?}", input);
        }
    }

    #[test]
    fn test_other_utterance_drops_pending_topic() {
        let (result, state) = resolver().resolve("what time is it", &awaiting_cs(), &ctx());
        assert_eq!(result.source, ResolutionSource::Time);
        assert_eq!(state, DialogueState::Idle);
    }

    #[test]
    fn test_rejection_falls_through_silently() {
        let (result, state) = resolver().resolve("no", &awaiting_cs(), &ctx());
        assert!(result.is_fallback());
        assert!(state.is_idle());
    }

    #[test]
    fn test_yes_without_pending_topic_is_not_a_confirmation() {
        let (result, _) = resolver().resolve("yes", &DialogueState::Idle, &ctx());
        assert_ne!(result.source, ResolutionSource::PendingConfirmation);
    }

    #[test]
    fn test_new_keyword_topic_replaces_pending_one() {
        let (result, state) = resolver().resolve("nurse training", &awaiting_cs(), &ctx());
        assert_eq!(result.source, ResolutionSource::TopicConfirmation);
        assert_eq!(state, DialogueState::AwaitingCourseConfirmation("nursing".to_string()));
    }
}

#[cfg(test)]
mod intent_model_tests {
    use super::*;

    #[test]
    fn test_standalone_classifier_follows_cascade_rule_order() {
        let resolver = resolver();
        let cases = [
            ("hello", Intent::Greeting, ResolutionSource::Greeting),
            ("what time is it", Intent::TimeQuery, ResolutionSource::Time),
            ("computer science tuition", Intent::FeeInquiry, ResolutionSource::Fees),
            ("Psychology", Intent::CourseInquiry, ResolutionSource::TopicDetail),
            ("computer science program", Intent::CourseInquiry, ResolutionSource::TopicConfirmation),
        ];
        for (text, intent, source) in cases {
            let (result, _) = resolver.resolve(text, &DialogueState::Idle, &ctx());
            let classified = resolver.classifier().classify(text);
            assert_eq!(classified.intent, intent, "{}", text);
            assert_eq!(result.source, source, "{}", text);
        }

        let (result, _) = resolver.resolve("computer science program", &DialogueState::Idle, &ctx());
        let classified = resolver.classifier().classify("computer science program");
        assert_eq!(classified.confidence, result.confidence);
    }

    fn with_model(confidence: f32, label: &str) -> Resolver {
        resolver()
            .with_responses(scholarship_responses())
            .with_predictor(Arc::new(FixedPredictor::new(label, confidence)))
            .with_settings(ResolverSettings {
                response_selection: ResponseSelection::First,
                ..Default::default()
            })
    }

    #[test]
    fn test_confident_prediction_answers_from_response_table() {
        let (result, state) = with_model(0.8, "scholarships").resolve("money for study", &DialogueState::Idle, &ctx());
        assert_eq!(result.source, ResolutionSource::IntentModel);
        assert_eq!(result.response_text, "Merit scholarships cover up to half of tuition.");
        assert_eq!(result.matched_label.as_deref(), Some("scholarships"));
        assert!(state.is_idle());
    }

    #[test]
    fn test_model_confidence_never_reaches_one() {
        let (result, _) = with_model(1.0, "scholarships").resolve("money for study", &DialogueState::Idle, &ctx());
        assert_eq!(result.source, ResolutionSource::IntentModel);
        assert!(result.confidence < 1.0);
    }

    #[test]
    fn test_low_confidence_falls_through_to_knowledge() {
        let (result, _) = with_model(0.2, "scholarships").resolve("admission requirements", &DialogueState::Idle, &ctx());
        assert_eq!(result.source, ResolutionSource::Knowledge);
    }

    #[test]
    fn test_fallback_label_is_never_answered() {
        let (result, _) = with_model(0.95, "fallback").resolve("quantum chromodynamics", &DialogueState::Idle, &ctx());
        assert!(result.is_fallback());
    }

    #[test]
    fn test_rules_outrank_the_model() {
        let (result, _) = with_model(0.95, "scholarships").resolve("hello", &DialogueState::Idle, &ctx());
        assert_eq!(result.source, ResolutionSource::Greeting);
    }
}

#[cfg(test)]
mod session_tests {
    use super::*;

    #[test]
    fn test_confirmation_flow_across_turns() {
        let resolver = resolver();
        let mut session = Session::new("s1");

        let first = session.respond(&resolver, "computer science program", Language::English, clock());
        assert_eq!(first.source, ResolutionSource::TopicConfirmation);
        assert_eq!(session.state, awaiting_cs());
        assert!(session.topic_context.is_none());

        let second = session.respond(&resolver, "yes", Language::English, clock());
        assert_eq!(second.source, ResolutionSource::PendingConfirmation);
        assert!(session.state.is_idle());
        assert_eq!(session.topic_context.as_deref(), Some("computer science"));

        let fees = session.respond(&resolver, "what are the fees", Language::English, clock());
        assert_eq!(fees.response_text, "Tuition for Computer Science is $9,800 per year.");
    }

    #[test]
    fn test_sessions_are_independent() {
        let resolver = resolver();
        let mut alice = Session::new("alice");
        let mut bob = Session::new("bob");

        alice.respond(&resolver, "computer science program", Language::English, clock());
        let reply = bob.respond(&resolver, "yes", Language::English, clock());

        assert_ne!(reply.source, ResolutionSource::PendingConfirmation);
        assert_eq!(alice.state, awaiting_cs());
        assert!(bob.state.is_idle());
    }
}
