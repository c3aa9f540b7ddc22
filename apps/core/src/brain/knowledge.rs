//! Knowledge and response tables.
//!
//! - `KnowledgeBase`: flat `(question, answer)` pairs searched by similarity.
//! - `ResponseTable`: `tag -> responses` from `intents.json`, answered when the
//!   statistical model predicts a tag.
//! - `IntentDataset`: `(text, label)` pairs from the same file, for evaluation.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

use super::lexicon::fold;
use super::similarity::{KnowledgeHit, SimilarityScorer};
use crate::error::AppError;

/// One question/answer pair. The question is stored folded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub question: String,
    pub answer: String,
}

impl KnowledgeEntry {
    pub fn new(question: &str, answer: &str) -> Self {
        Self {
            question: fold(question),
            answer: answer.trim().to_string(),
        }
    }
}

/// Read-only knowledge table.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    pub fn new(entries: Vec<KnowledgeEntry>) -> Self {
        let entries = entries
            .into_iter()
            .filter(|e| !e.question.is_empty() && !e.answer.is_empty())
            .collect();
        Self { entries }
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(q, a)| KnowledgeEntry::new(q, a))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&KnowledgeEntry> {
        self.entries.get(index)
    }

    /// Highest-scoring entry strictly above `threshold`; first entry wins ties.
    pub fn best_match(
        &self,
        query: &str,
        scorer: &SimilarityScorer,
        threshold: f32,
    ) -> Option<KnowledgeHit> {
        scorer
            .rank(query, &self.entries)
            .into_iter()
            .next()
            .filter(|hit| hit.score > threshold)
    }

    /// CSV with a header row containing `question` and `answer` columns.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, AppError> {
        #[derive(Deserialize)]
        struct Row {
            question: String,
            answer: String,
        }

        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut entries = Vec::new();
        for row in csv_reader.deserialize::<Row>() {
            let row = row?;
            entries.push(KnowledgeEntry::new(&row.question, &row.answer));
        }
        Ok(Self::new(entries))
    }

    /// JSON list of `{question, answer}` objects.
    pub fn from_json_str(json: &str) -> Result<Self, AppError> {
        let raw: Vec<KnowledgeEntry> = serde_json::from_str(json)?;
        Ok(Self::new(
            raw.iter()
                .map(|e| KnowledgeEntry::new(&e.question, &e.answer))
                .collect(),
        ))
    }

    /// One entry per pattern, answered with the tag's first response.
    /// Tags without responses and the `fallback` tag are skipped.
    pub fn from_intents(intents: &IntentFile) -> Self {
        let mut entries = Vec::new();
        for intent in &intents.intents {
            if intent.tag == FALLBACK_TAG {
                continue;
            }
            let Some(answer) = intent.responses.first() else {
                continue;
            };
            for pattern in &intent.patterns {
                entries.push(KnowledgeEntry::new(pattern, answer));
            }
        }
        Self::new(entries)
    }

    /// `knowledge.csv`, else `knowledge.json`, else derived from `intents`.
    /// A directory with none of these yields an empty table.
    pub fn load_dir(dir: &Path, intents: Option<&IntentFile>) -> Result<Self, AppError> {
        let csv_path = dir.join(KNOWLEDGE_CSV);
        if csv_path.exists() {
            let kb = Self::from_csv_reader(fs::File::open(&csv_path)?)?;
            info!("Loaded {} knowledge entries from {:?}", kb.len(), csv_path);
            return Ok(kb);
        }

        let json_path = dir.join(KNOWLEDGE_JSON);
        if json_path.exists() {
            let kb = Self::from_json_str(&fs::read_to_string(&json_path)?)?;
            info!("Loaded {} knowledge entries from {:?}", kb.len(), json_path);
            return Ok(kb);
        }

        match intents {
            Some(intents) => {
                let kb = Self::from_intents(intents);
                info!("Derived {} knowledge entries from intent patterns", kb.len());
                Ok(kb)
            }
            None => {
                warn!("No knowledge table found in {:?}", dir);
                Ok(Self::default())
            }
        }
    }
}

pub const KNOWLEDGE_CSV: &str = "knowledge.csv";
pub const KNOWLEDGE_JSON: &str = "knowledge.json";
pub const FALLBACK_TAG: &str = "fallback";

/// One intent block of `intents.json`. Accepts `intent` for `tag` and `text`
/// for `patterns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentSpec {
    #[serde(alias = "intent")]
    pub tag: String,
    #[serde(default, alias = "text")]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub responses: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentFile {
    pub intents: Vec<IntentSpec>,
}

impl IntentFile {
    pub fn from_json_str(json: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }
}

/// How a response is chosen when a tag has several.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSelection {
    First,
    #[default]
    Random,
}

impl FromStr for ResponseSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(Self::First),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown response selection '{}'", other)),
        }
    }
}

/// `tag -> responses`.
#[derive(Debug, Clone, Default)]
pub struct ResponseTable {
    by_tag: HashMap<String, Vec<String>>,
}

impl ResponseTable {
    pub fn from_intents(intents: &IntentFile) -> Self {
        let mut by_tag: HashMap<String, Vec<String>> = HashMap::new();
        for intent in &intents.intents {
            by_tag
                .entry(intent.tag.clone())
                .or_default()
                .extend(intent.responses.iter().cloned());
        }
        by_tag.retain(|_, responses| !responses.is_empty());
        Self { by_tag }
    }

    pub fn has(&self, tag: &str) -> bool {
        self.by_tag.contains_key(tag)
    }

    pub fn responses(&self, tag: &str) -> &[String] {
        self.by_tag.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pick(&self, tag: &str, selection: ResponseSelection) -> Option<&str> {
        let responses = self.by_tag.get(tag)?;
        let chosen = match selection {
            ResponseSelection::First => responses.first(),
            ResponseSelection::Random => responses.choose(&mut rand::thread_rng()),
        };
        chosen.map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tag.is_empty()
    }
}

/// Labelled training/evaluation texts.
#[derive(Debug, Clone, Default)]
pub struct IntentDataset {
    pub texts: Vec<String>,
    pub labels: Vec<String>,
}

impl IntentDataset {
    pub fn from_intents(intents: &IntentFile) -> Self {
        let mut dataset = Self::default();
        for intent in &intents.intents {
            for pattern in &intent.patterns {
                dataset.texts.push(pattern.clone());
                dataset.labels.push(intent.tag.clone());
            }
        }
        dataset
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.texts
            .iter()
            .zip(self.labels.iter())
            .map(|(t, l)| (t.as_str(), l.as_str()))
    }
}
