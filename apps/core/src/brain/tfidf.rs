//! TF-IDF feature extraction for the linear intent model.
//!
//! Tokens are lowercase runs of two or more word characters. Word n-grams in
//! the configured range are joined with a single space and looked up in a
//! fixed vocabulary; raw counts are weighted by IDF and the vector is
//! L2-normalised. Terms outside the vocabulary are ignored.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::error::ClassifierError;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("Invalid token regex"));

/// Sparse feature vector: `(feature index, weight)` sorted by index.
pub type SparseVector = Vec<(usize, f32)>;

pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// All word n-grams of `tokens` with `min_n <= n <= max_n`.
pub fn ngrams(tokens: &[String], min_n: usize, max_n: usize) -> Vec<String> {
    let mut out = Vec::new();
    let min_n = min_n.max(1);
    for n in min_n..=max_n {
        if n > tokens.len() {
            break;
        }
        for window in tokens.windows(n) {
            out.push(window.join(" "));
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    ngram_range: (usize, usize),
}

impl TfidfVectorizer {
    pub fn new(
        vocabulary: HashMap<String, usize>,
        idf: Vec<f32>,
        ngram_range: (usize, usize),
    ) -> Result<Self, ClassifierError> {
        if vocabulary.is_empty() {
            return Err(ClassifierError::EmptyVocabulary);
        }
        if let Some((term, idx)) = vocabulary.iter().find(|(_, &idx)| idx >= idf.len()) {
            return Err(ClassifierError::Unavailable(format!(
                "vocabulary term '{}' has index {} but only {} idf weights",
                term,
                idx,
                idf.len()
            )));
        }
        let (min_n, max_n) = ngram_range;
        if min_n == 0 || max_n < min_n {
            return Err(ClassifierError::Unavailable(format!(
                "invalid ngram range ({}, {})",
                min_n, max_n
            )));
        }
        Ok(Self {
            vocabulary,
            idf,
            ngram_range,
        })
    }

    /// Number of features (columns).
    pub fn dimension(&self) -> usize {
        self.idf.len()
    }

    pub fn transform(&self, text: &str) -> Result<SparseVector, ClassifierError> {
        if text.trim().is_empty() {
            return Err(ClassifierError::MalformedInput);
        }

        let tokens = tokenize(text);
        let mut counts: HashMap<usize, f32> = HashMap::new();
        for gram in ngrams(&tokens, self.ngram_range.0, self.ngram_range.1) {
            if let Some(&idx) = self.vocabulary.get(&gram) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        if counts.is_empty() {
            return Err(ClassifierError::OutOfVocabulary);
        }

        let mut features: SparseVector = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        features.sort_by_key(|(idx, _)| *idx);

        let norm = features.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in features.iter_mut() {
                *w /= norm;
            }
        }
        Ok(features)
    }
}
