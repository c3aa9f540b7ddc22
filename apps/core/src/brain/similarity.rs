//! Similarity scoring for fuzzy knowledge-base lookup.
//!
//! Two measures over case-folded text:
//! - sequence ratio `2*M / T`, where `M` is the total size of the matching
//!   blocks found by recursive longest-common-block alignment;
//! - Jaccard overlap of the whitespace-separated word sets.
//!
//! The combined score weights word overlap above character similarity.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::knowledge::KnowledgeEntry;

/// Default weight of the word-overlap measure.
pub const WORD_WEIGHT: f32 = 0.6;
/// Default weight of the sequence-ratio measure.
pub const SEQUENCE_WEIGHT: f32 = 0.4;

/// Sequence similarity ratio in `[0, 1]`.
///
/// Two empty strings are identical (1.0). The pair is put in a canonical order
/// before alignment so the result does not depend on argument order.
pub fn sequence_ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let (first, second) = if (a.len(), &a) <= (b.len(), &b) {
        (&a, &b)
    } else {
        (&b, &a)
    };

    let matched = matching_size(first, second);
    (2.0 * matched as f32 / total as f32).clamp(0.0, 1.0)
}

/// Jaccard similarity of the lowercase word sets. 0.0 when both are empty.
pub fn jaccard(a: &str, b: &str) -> f32 {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    let words_a: HashSet<&str> = a_lower.split_whitespace().collect();
    let words_b: HashSet<&str> = b_lower.split_whitespace().collect();

    let union = words_a.union(&words_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = words_a.intersection(&words_b).count();
    intersection as f32 / union as f32
}

/// Combined score with the default weights.
pub fn similarity_score(a: &str, b: &str) -> f32 {
    SimilarityScorer::default().score(a, b)
}

/// Total length of the matching blocks between `a` and `b`.
fn matching_size(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// Longest common block in `a[alo..ahi]` and `b[blo..bhi]`, earliest on ties.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // Length of the block ending at b[j] for the previous row of a.
    let mut run_lengths: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_run_lengths = HashMap::new();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j
                    .checked_sub(1)
                    .and_then(|prev| run_lengths.get(&prev))
                    .copied()
                    .unwrap_or(0)
                    + 1;
                next_run_lengths.insert(j, k);
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            }
        }
        run_lengths = next_run_lengths;
    }

    (best_i, best_j, best_size)
}

/// A knowledge entry with its combined score and table position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KnowledgeHit {
    pub index: usize,
    pub score: f32,
}

/// Weighted blend of word overlap and sequence similarity.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityScorer {
    word_weight: f32,
    sequence_weight: f32,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self {
            word_weight: WORD_WEIGHT,
            sequence_weight: SEQUENCE_WEIGHT,
        }
    }
}

impl SimilarityScorer {
    /// Weights are normalised to sum to 1 so scores stay in `[0, 1]`.
    pub fn new(word_weight: f32, sequence_weight: f32) -> Self {
        let sum = word_weight.max(0.0) + sequence_weight.max(0.0);
        if sum <= 0.0 {
            return Self::default();
        }
        Self {
            word_weight: word_weight.max(0.0) / sum,
            sequence_weight: sequence_weight.max(0.0) / sum,
        }
    }

    /// Combined score in `[0, 1]`; identical (case-folded) inputs score 1.0.
    pub fn score(&self, a: &str, b: &str) -> f32 {
        if a.to_lowercase() == b.to_lowercase() {
            return 1.0;
        }
        let combined = self.word_weight * jaccard(a, b) + self.sequence_weight * sequence_ratio(a, b);
        combined.clamp(0.0, 1.0)
    }

    /// Every entry scored against `query`, best first. The sort is stable so
    /// equal scores keep table order.
    pub fn rank(&self, query: &str, entries: &[KnowledgeEntry]) -> Vec<KnowledgeHit> {
        let mut hits: Vec<KnowledgeHit> = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| KnowledgeHit {
                index,
                score: self.score(query, &entry.question),
            })
            .collect();

        hits.sort_by(|x, y| {
            y.score
                .partial_cmp(&x.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits
    }
}
