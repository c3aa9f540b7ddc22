//! # Brain Module
//!
//! Response resolution for the FAQ assistant. Everything here is synchronous
//! and free of I/O once loaded; translation, detection and persistence live in
//! the actors around it.
//!
//! ## Components
//! - `lexicon`: compiled programme records, fee table, fixed phrase sets
//! - `knowledge`: question/answer table, intent response table, datasets
//! - `similarity`: sequence ratio, Jaccard, combined score
//! - `tfidf` / `model`: serialized linear intent model
//! - `intent`: rule pre-classification + statistical predictor adapter
//! - `dialogue`: per-session dialogue state and history
//! - `locale`: display languages and localized clock
//! - `result`: resolver output types
//! - `resolver`: the ordered rule cascade
//! - `evaluate`: classifier evaluation report

pub mod dialogue;
pub mod evaluate;
pub mod intent;
pub mod knowledge;
pub mod lexicon;
pub mod locale;
pub mod model;
pub mod resolver;
pub mod result;
pub mod similarity;
pub mod tfidf;

pub use dialogue::{ChatTurn, DialogueState, Session};
pub use evaluate::{evaluate, EvaluationReport, LabelMetrics};
pub use intent::{Intent, IntentClassifier, IntentPredictor, IntentResult, Prediction};
pub use knowledge::{IntentDataset, IntentFile, KnowledgeBase, KnowledgeEntry, ResponseSelection, ResponseTable};
pub use lexicon::{Lexicon, TopicRecord, QUICK_QUESTIONS};
pub use locale::{detect_language, Language};
pub use model::LinearIntentModel;
pub use resolver::{Resolver, ResolverSettings};
pub use result::{FallbackReason, ResolutionResult, ResolutionSource, TurnContext};
pub use similarity::{similarity_score, SimilarityScorer};
