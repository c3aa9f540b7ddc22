//! # Response Resolver
//!
//! Turns one English-normalized utterance into a [`ResolutionResult`] and the
//! next [`DialogueState`].
//!
//! Resolution order:
//! 1. empty utterance -> fallback
//! 2. pending course confirmation (affirmative -> topic detail, anything else
//!    drops the pending topic and continues below)
//! 3. the rule cascade in [`CASCADE`], first hit wins
//! 4. fallback
//!
//! Each cascade entry is a `(predicate, handler)` pair so rules can be
//! inspected and exercised one at a time through [`Resolver::try_rule`].

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::dialogue::DialogueState;
use super::intent::{IntentClassifier, IntentPredictor, Prediction};
use super::knowledge::{IntentFile, KnowledgeBase, ResponseSelection, ResponseTable, FALLBACK_TAG};
use super::lexicon::{fold, Lexicon, TopicMatch, TopicRecord, GREETING_RESPONSE, UNIQUE_KEYWORD_CONFIDENCE};
use super::locale::format_clock;
use super::model::{LinearIntentModel, MAX_MODEL_CONFIDENCE};
use super::result::{FallbackReason, ResolutionResult, ResolutionSource, TurnContext};
use super::similarity::{KnowledgeHit, SimilarityScorer};
use crate::config::BotConfig;
use crate::error::AppError;
use crate::fs_manager::DataLayout;

/// Tunable thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverSettings {
    /// Knowledge matches must score strictly above this.
    pub match_threshold: f32,
    /// Lowest keyword-match confidence that earns a confirmation question.
    pub confirm_floor: f32,
    /// Lowest model confidence answered from the response table.
    pub classifier_floor: f32,
    pub response_selection: ResponseSelection,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            match_threshold: 0.3,
            confirm_floor: 0.6,
            classifier_floor: 0.5,
            response_selection: ResponseSelection::Random,
        }
    }
}

impl From<&BotConfig> for ResolverSettings {
    fn from(config: &BotConfig) -> Self {
        Self {
            match_threshold: config.match_threshold,
            confirm_floor: config.confirm_floor,
            classifier_floor: config.classifier_floor,
            response_selection: config.response_selection,
        }
    }
}

/// One utterance under resolution.
struct Turn<'a> {
    text: &'a str,
    folded: String,
    ctx: &'a TurnContext,
}

/// What a predicate found, handed to its handler.
enum Evidence {
    Phrase,
    Fees(Option<&'static str>),
    Exact(&'static TopicRecord),
    Topic(TopicMatch),
    Prediction(Prediction),
    Knowledge(KnowledgeHit),
}

type Outcome = (ResolutionResult, DialogueState);

struct Rule {
    name: &'static str,
    predicate: fn(&Resolver, &Turn<'_>) -> Option<Evidence>,
    handler: fn(&Resolver, &Turn<'_>, Evidence) -> Outcome,
}

/// Priority order. Reordering changes observable behaviour.
static CASCADE: [Rule; 7] = [
    Rule {
        name: "greeting",
        predicate: |r, t| r.lexicon.is_greeting(&t.folded).then_some(Evidence::Phrase),
        handler: |_, _, _| idle(ResolutionResult::new(ResolutionSource::Greeting, GREETING_RESPONSE, 1.0, "greeting")),
    },
    Rule {
        name: "time",
        predicate: |r, t| r.lexicon.is_time_query(&t.folded).then_some(Evidence::Phrase),
        handler: |_, t, _| {
            let text = format_clock(t.ctx.clock, t.ctx.display_language);
            idle(ResolutionResult::new(ResolutionSource::Time, text, 1.0, "time").localized())
        },
    },
    Rule {
        name: "fees",
        predicate: Resolver::match_fees,
        handler: Resolver::answer_fees,
    },
    Rule {
        name: "exact_topic",
        predicate: |r, t| r.lexicon.exact_topic(&t.folded).map(Evidence::Exact),
        handler: |r, _, evidence| {
            let Evidence::Exact(topic) = evidence else {
                return r.no_match();
            };
            idle(ResolutionResult::new(ResolutionSource::TopicDetail, topic.detail(), 1.0, "course").with_topic(topic.key))
        },
    },
    Rule {
        name: "topic_confirmation",
        predicate: Resolver::match_topic_keyword,
        handler: Resolver::ask_confirmation,
    },
    Rule {
        name: "intent_model",
        predicate: Resolver::match_prediction,
        handler: Resolver::answer_prediction,
    },
    Rule {
        name: "knowledge",
        predicate: |r, t| {
            r.knowledge
                .best_match(&t.folded, &r.scorer, r.settings.match_threshold)
                .map(Evidence::Knowledge)
        },
        handler: Resolver::answer_knowledge,
    },
];

fn idle(result: ResolutionResult) -> Outcome {
    (result, DialogueState::Idle)
}

/// Read-only after construction; share one instance across sessions.
pub struct Resolver {
    lexicon: Arc<Lexicon>,
    knowledge: KnowledgeBase,
    responses: ResponseTable,
    classifier: IntentClassifier,
    scorer: SimilarityScorer,
    settings: ResolverSettings,
}

impl Resolver {
    pub fn new(lexicon: Lexicon, knowledge: KnowledgeBase) -> Self {
        let lexicon = Arc::new(lexicon);
        Self {
            classifier: IntentClassifier::new(lexicon.clone()),
            lexicon,
            knowledge,
            responses: ResponseTable::default(),
            scorer: SimilarityScorer::default(),
            settings: ResolverSettings::default(),
        }
    }

    pub fn with_responses(mut self, responses: ResponseTable) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_predictor(mut self, predictor: Arc<dyn IntentPredictor>) -> Self {
        self.classifier = self.classifier.with_predictor(predictor);
        self
    }

    pub fn with_settings(mut self, settings: ResolverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_scorer(mut self, scorer: SimilarityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Build from the data directory. Missing files degrade: no intents file
    /// means no response table, no model means no statistical stage.
    pub fn load(layout: &DataLayout, settings: ResolverSettings) -> Result<Self, AppError> {
        let intents = load_intents(&layout.intents_file())?;
        let knowledge = KnowledgeBase::load_dir(layout.root(), intents.as_ref())?;

        let mut resolver = Resolver::new(Lexicon::builtin(), knowledge).with_settings(settings);
        if let Some(intents) = &intents {
            resolver = resolver.with_responses(ResponseTable::from_intents(intents));
        }

        match LinearIntentModel::load(&layout.model_file()) {
            Ok(model) => resolver = resolver.with_predictor(Arc::new(model)),
            Err(e) => warn!("Intent model not loaded, statistical stage disabled: {}", e),
        }

        info!(
            "Resolver ready: {} knowledge entries, {} intent tags, model: {}",
            resolver.knowledge.len(),
            resolver.responses.len(),
            resolver.classifier.has_predictor()
        );
        Ok(resolver)
    }

    pub fn from_config(config: &BotConfig) -> Result<Self, AppError> {
        Self::load(&DataLayout::new(&config.data_dir), ResolverSettings::from(config))
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Rule names in evaluation order.
    pub fn rule_names() -> impl Iterator<Item = &'static str> {
        CASCADE.iter().map(|rule| rule.name)
    }

    pub fn resolve(
        &self,
        utterance: &str,
        state: &DialogueState,
        ctx: &TurnContext,
    ) -> (ResolutionResult, DialogueState) {
        let turn = Turn {
            text: utterance.trim(),
            folded: fold(utterance),
            ctx,
        };

        if turn.folded.is_empty() {
            info!(reason = ?FallbackReason::EmptyUtterance, "Fallback response");
            return idle(ResolutionResult::fallback(FallbackReason::EmptyUtterance));
        }

        if let Some(key) = state.pending_topic() {
            if let Some(outcome) = self.resume_confirmation(key, &turn) {
                return outcome;
            }
            debug!(topic = key, "Pending confirmation dropped");
        }

        for rule in CASCADE.iter() {
            if let Some(evidence) = (rule.predicate)(self, &turn) {
                let (result, next) = (rule.handler)(self, &turn, evidence);
                debug!(rule = rule.name, confidence = result.confidence, "Rule fired");
                return (result, next);
            }
        }

        self.no_match()
    }

    /// Evaluate a single cascade rule in isolation, ignoring dialogue state.
    pub fn try_rule(&self, name: &str, utterance: &str, ctx: &TurnContext) -> Option<(ResolutionResult, DialogueState)> {
        let rule = CASCADE.iter().find(|rule| rule.name == name)?;
        let turn = Turn {
            text: utterance.trim(),
            folded: fold(utterance),
            ctx,
        };
        let evidence = (rule.predicate)(self, &turn)?;
        Some((rule.handler)(self, &turn, evidence))
    }

    fn resume_confirmation(&self, key: &str, turn: &Turn<'_>) -> Option<Outcome> {
        if !self.lexicon.is_affirmative(&turn.folded) {
            return None;
        }
        let topic = self.lexicon.topic(key)?;
        debug!(topic = key, "Confirmation accepted");
        Some(idle(
            ResolutionResult::new(ResolutionSource::PendingConfirmation, topic.detail(), 1.0, "course_confirmed")
                .with_topic(topic.key),
        ))
    }

    fn no_match(&self) -> Outcome {
        let reason = if self.knowledge.is_empty() {
            FallbackReason::EmptyKnowledgeTable
        } else {
            FallbackReason::NoMatch
        };
        info!(reason = ?reason, "Fallback response");
        idle(ResolutionResult::fallback(reason))
    }

    /// Topic named unambiguously in the utterance, else the session's topic,
    /// else none.
    fn match_fees(&self, turn: &Turn<'_>) -> Option<Evidence> {
        if !self.lexicon.mentions_fees(&turn.folded) {
            return None;
        }
        // A keyword shared by several programmes does not pick one of them.
        let mentioned = self
            .lexicon
            .exact_topic(&turn.folded)
            .or_else(|| {
                self.lexicon
                    .topic_match(&turn.folded)
                    .filter(|m| m.confidence >= UNIQUE_KEYWORD_CONFIDENCE)
                    .map(|m| m.topic)
            })
            .map(|topic| topic.key);
        let from_context = turn
            .ctx
            .topic_context
            .as_deref()
            .and_then(|key| self.lexicon.topic(key))
            .map(|topic| topic.key);
        let narrowed = mentioned
            .or(from_context)
            .filter(|key| self.lexicon.fee_for(key).is_some());
        Some(Evidence::Fees(narrowed))
    }

    fn answer_fees(&self, _turn: &Turn<'_>, evidence: Evidence) -> Outcome {
        let Evidence::Fees(narrowed) = evidence else {
            return self.no_match();
        };
        let result = ResolutionResult::new(ResolutionSource::Fees, self.lexicon.fee_table(narrowed), 1.0, "fees");
        match narrowed {
            Some(key) => idle(result.with_topic(key)),
            None => idle(result),
        }
    }

    fn match_topic_keyword(&self, turn: &Turn<'_>) -> Option<Evidence> {
        self.lexicon
            .topic_match(&turn.folded)
            .filter(|m| m.confidence >= self.settings.confirm_floor && m.confidence < 1.0)
            .map(Evidence::Topic)
    }

    fn ask_confirmation(&self, _turn: &Turn<'_>, evidence: Evidence) -> Outcome {
        let Evidence::Topic(m) = evidence else {
            return self.no_match();
        };
        let result = ResolutionResult::new(
            ResolutionSource::TopicConfirmation,
            m.topic.confirmation_question(),
            m.confidence,
            "course_confirmation",
        )
        .with_topic(m.topic.key);
        (result, DialogueState::AwaitingCourseConfirmation(m.topic.key.to_string()))
    }

    fn match_prediction(&self, turn: &Turn<'_>) -> Option<Evidence> {
        match self.classifier.predict(turn.text) {
            Ok(p) if p.label != FALLBACK_TAG
                && p.confidence > 0.0
                && p.confidence >= self.settings.classifier_floor
                && self.responses.has(&p.label) =>
            {
                Some(Evidence::Prediction(p))
            }
            Ok(p) => {
                debug!(label = %p.label, confidence = p.confidence, "Prediction below floor or unanswerable");
                None
            }
            Err(e) => {
                debug!("Classifier unavailable for this turn: {}", e);
                None
            }
        }
    }

    fn answer_prediction(&self, _turn: &Turn<'_>, evidence: Evidence) -> Outcome {
        let Evidence::Prediction(p) = evidence else {
            return self.no_match();
        };
        let Some(text) = self.responses.pick(&p.label, self.settings.response_selection) else {
            return self.no_match();
        };
        let confidence = p.confidence.min(MAX_MODEL_CONFIDENCE);
        idle(ResolutionResult::new(ResolutionSource::IntentModel, text, confidence, p.label))
    }

    fn answer_knowledge(&self, _turn: &Turn<'_>, evidence: Evidence) -> Outcome {
        let Evidence::Knowledge(hit) = evidence else {
            return self.no_match();
        };
        let Some(entry) = self.knowledge.get(hit.index) else {
            return self.no_match();
        };
        idle(ResolutionResult::new(
            ResolutionSource::Knowledge,
            entry.answer.clone(),
            hit.score,
            entry.question.clone(),
        ))
    }
}

fn load_intents(path: &Path) -> Result<Option<IntentFile>, AppError> {
    if !path.exists() {
        warn!("No intents file at {:?}", path);
        return Ok(None);
    }
    IntentFile::from_path(path).map(Some)
}
