//! Serialized linear intent model.
//!
//! A one-vs-rest linear classifier over TF-IDF features, exported to JSON by
//! the training pipeline. Confidence is the softmax probability of the winning
//! class, capped below 1.0 since 1.0 is reserved for rule matches.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use super::intent::{IntentPredictor, Prediction};
use super::tfidf::TfidfVectorizer;
use crate::error::ClassifierError;

pub const MODEL_FILE: &str = "intent_model.json";

/// Upper bound on statistical confidence.
pub const MAX_MODEL_CONFIDENCE: f32 = 0.99;

/// On-disk shape of the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub classes: Vec<String>,
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f32>,
    /// One row per class, or a single row for a binary model.
    pub coef: Vec<Vec<f32>>,
    pub intercept: Vec<f32>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: [usize; 2],
}

fn default_ngram_range() -> [usize; 2] {
    [1, 2]
}

#[derive(Debug, Clone)]
pub struct LinearIntentModel {
    classes: Vec<String>,
    vectorizer: TfidfVectorizer,
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
}

impl LinearIntentModel {
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| ClassifierError::Unavailable(format!("{}: {}", path.display(), e)))?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)
            .map_err(|e| ClassifierError::Unavailable(format!("{}: {}", path.display(), e)))?;
        let model = Self::from_artifact(artifact)?;
        info!(
            "Loaded intent model from {:?} ({} classes, {} features)",
            path,
            model.classes.len(),
            model.vectorizer.dimension()
        );
        Ok(model)
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ClassifierError> {
        let ModelArtifact {
            classes,
            vocabulary,
            idf,
            coef,
            intercept,
            ngram_range,
        } = artifact;

        if classes.len() < 2 {
            return Err(ClassifierError::Unavailable(format!(
                "model needs at least two classes, found {}",
                classes.len()
            )));
        }

        let vectorizer = TfidfVectorizer::new(vocabulary, idf, (ngram_range[0], ngram_range[1]))?;

        let binary = classes.len() == 2 && coef.len() == 1;
        let expected_rows = if binary { 1 } else { classes.len() };
        if coef.len() != expected_rows || intercept.len() != expected_rows {
            return Err(ClassifierError::Unavailable(format!(
                "expected {} coefficient rows and intercepts, found {} and {}",
                expected_rows,
                coef.len(),
                intercept.len()
            )));
        }
        if let Some(row) = coef.iter().find(|row| row.len() != vectorizer.dimension()) {
            return Err(ClassifierError::Unavailable(format!(
                "coefficient row has {} columns, vocabulary has {}",
                row.len(),
                vectorizer.dimension()
            )));
        }

        Ok(Self {
            classes,
            vectorizer,
            coef,
            intercept,
        })
    }

    /// Raw decision value per class.
    pub fn decision_function(&self, text: &str) -> Result<Vec<f32>, ClassifierError> {
        let features = self.vectorizer.transform(text)?;
        let scores: Vec<f32> = self
            .coef
            .iter()
            .zip(self.intercept.iter())
            .map(|(row, b)| features.iter().map(|(idx, w)| row[*idx] * w).sum::<f32>() + b)
            .collect();

        // Binary models score the second class; the first is its negation.
        if scores.len() == 1 {
            return Ok(vec![-scores[0], scores[0]]);
        }
        Ok(scores)
    }
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

impl IntentPredictor for LinearIntentModel {
    fn predict(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let scores = self.decision_function(text)?;
        let probabilities = softmax(&scores);

        let (best, confidence) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |acc, (i, p)| if p > acc.1 { (i, p) } else { acc });

        Ok(Prediction {
            label: self.classes[best].clone(),
            confidence: confidence.clamp(0.0, MAX_MODEL_CONFIDENCE),
        })
    }

    fn labels(&self) -> &[String] {
        &self.classes
    }
}
