//! Lexicon and static tables.
//!
//! Compiled programme records, the keyword/alias maps built over them, the fee
//! table, and the fixed phrase sets used by the rule layer (greetings, time
//! queries, fee keywords, affirmatives). Everything here is read-only after
//! construction and safe to share across sessions.

use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// One academic programme.
#[derive(Debug, Clone, Serialize)]
pub struct TopicRecord {
    /// Canonical lowercase name, also the key used by dialogue state.
    pub key: &'static str,
    /// Display name.
    pub name: &'static str,
    pub description: &'static str,
    pub duration: &'static str,
    /// Membership keywords. A hit suggests the topic but never selects it outright.
    pub keywords: &'static [&'static str],
    /// Exact names that select the topic without a confirmation step.
    pub aliases: &'static [&'static str],
    /// Ordered term -> ordered subjects.
    pub curriculum: Option<&'static [(&'static str, &'static [&'static str])]>,
}

impl TopicRecord {
    /// Full detail response for this programme.
    pub fn detail(&self) -> String {
        let mut out = format!(
            "{} ({})\n{}",
            self.name, self.duration, self.description
        );
        if let Some(curriculum) = self.curriculum {
            out.push_str("\nCurriculum:");
            for (term, subjects) in curriculum {
                out.push_str(&format!("\n- {}: {}", term, subjects.join(", ")));
            }
        }
        out
    }

    /// Yes/no question asked when the topic was only suggested by a keyword.
    pub fn confirmation_question(&self) -> String {
        format!(
            "Did you mean the {} programme? Please reply \"yes\" to see its details.",
            self.name
        )
    }
}

/// Annual tuition for one programme.
#[derive(Debug, Clone, Serialize)]
pub struct FeeEntry {
    pub topic_key: &'static str,
    pub annual: &'static str,
}

/// Result of keyword membership matching against the topic table.
#[derive(Debug, Clone)]
pub struct TopicMatch {
    pub topic: &'static TopicRecord,
    /// 0.9 when a matched keyword belongs to this topic only, 0.8 when every
    /// matched keyword is shared with another topic.
    pub confidence: f32,
    pub matched_keywords: Vec<&'static str>,
}

pub const UNIQUE_KEYWORD_CONFIDENCE: f32 = 0.9;
const SHARED_KEYWORD_CONFIDENCE: f32 = 0.8;

pub const GREETING_PHRASES: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "hiya",
    "greetings",
    "hi there",
    "hello there",
    "good morning",
    "good afternoon",
    "good evening",
];

pub const TIME_PHRASES: &[&str] = &[
    "what time is it",
    "what's the time",
    "what is the time",
    "current time",
    "time now",
    "tell me the time",
];

pub const FEE_KEYWORDS: &[&str] = &["fee", "fees", "tuition", "cost", "costs", "price", "payment"];

pub const AFFIRMATIVES: &[&str] = &["yes", "y", "是"];

pub const GREETING_RESPONSE: &str = "Hello! I'm the university FAQ assistant. Ask me about our programmes, tuition fees, admissions, exams, the library, or scholarships.";

pub const FALLBACK_RESPONSE: &str = "Sorry, I don't have information about that. Please contact the university information office for further help.";

/// Questions offered as one-click shortcuts by the console integrator.
pub const QUICK_QUESTIONS: &[(&str, &str)] = &[
    ("Admission Requirements", "what are the admission requirements"),
    ("Tuition Fees", "how much is the tuition fee"),
    ("Exam Dates", "when are the exams"),
];

const COMPUTER_SCIENCE_CURRICULUM: &[(&str, &[&str])] = &[
    ("Year 1", &["Programming Fundamentals", "Discrete Mathematics", "Computer Organisation"]),
    ("Year 2", &["Data Structures and Algorithms", "Databases", "Operating Systems"]),
    ("Year 3", &["Computer Networks", "Software Engineering", "Artificial Intelligence"]),
    ("Year 4", &["Distributed Systems", "Security", "Capstone Project"]),
];

const SOFTWARE_ENGINEERING_CURRICULUM: &[(&str, &[&str])] = &[
    ("Year 1", &["Programming Fundamentals", "Engineering Mathematics"]),
    ("Year 2", &["Object-Oriented Design", "Requirements Engineering", "Databases"]),
    ("Year 3", &["Software Testing", "DevOps and Cloud", "Human-Computer Interaction"]),
    ("Year 4", &["Software Architecture", "Industry Placement", "Team Project"]),
];

const ELECTRICAL_ENGINEERING_CURRICULUM: &[(&str, &[&str])] = &[
    ("Year 1", &["Circuit Theory", "Engineering Mathematics", "Physics"]),
    ("Year 2", &["Analogue Electronics", "Digital Systems", "Signals and Systems"]),
    ("Year 3", &["Power Systems", "Control Engineering", "Embedded Systems"]),
    ("Year 4", &["Renewable Energy Systems", "Final Year Project"]),
];

const BUSINESS_CURRICULUM: &[(&str, &[&str])] = &[
    ("Year 1", &["Principles of Management", "Microeconomics", "Financial Accounting"]),
    ("Year 2", &["Marketing", "Corporate Finance", "Organisational Behaviour"]),
    ("Year 3", &["Strategic Management", "Entrepreneurship", "Business Research Project"]),
];

const PSYCHOLOGY_CURRICULUM: &[(&str, &[&str])] = &[
    ("Year 1", &["Introduction to Psychology", "Research Methods", "Statistics"]),
    ("Year 2", &["Cognitive Psychology", "Developmental Psychology", "Social Psychology"]),
    ("Year 3", &["Clinical Psychology", "Dissertation"]),
];

pub static BUILTIN_TOPICS: &[TopicRecord] = &[
    TopicRecord {
        key: "computer science",
        name: "Computer Science",
        description: "Covers algorithms, systems, software development and the theory of computation, with a final-year capstone project.",
        duration: "4 years",
        keywords: &["computer science", "computing", "programming", "coding", "software", "algorithms"],
        aliases: &["computer science", "cs", "bsc computer science", "computer science degree"],
        curriculum: Some(COMPUTER_SCIENCE_CURRICULUM),
    },
    TopicRecord {
        key: "software engineering",
        name: "Software Engineering",
        description: "Focuses on building reliable software at scale: requirements, design, testing, and team delivery practices.",
        duration: "4 years",
        keywords: &["software engineering", "software", "engineering", "devops"],
        aliases: &["software engineering", "swe", "bsc software engineering"],
        curriculum: Some(SOFTWARE_ENGINEERING_CURRICULUM),
    },
    TopicRecord {
        key: "electrical engineering",
        name: "Electrical Engineering",
        description: "Circuits, electronics, power and control systems, with laboratory work in every year.",
        duration: "4 years",
        keywords: &["electrical engineering", "electrical", "electronics", "engineering", "circuits"],
        aliases: &["electrical engineering", "ee", "beng electrical engineering"],
        curriculum: Some(ELECTRICAL_ENGINEERING_CURRICULUM),
    },
    TopicRecord {
        key: "business administration",
        name: "Business Administration",
        description: "A broad management degree covering accounting, marketing, finance, and organisational behaviour.",
        duration: "3 years",
        keywords: &["business administration", "business", "management", "marketing", "finance"],
        aliases: &["business administration", "bba", "business"],
        curriculum: Some(BUSINESS_CURRICULUM),
    },
    TopicRecord {
        key: "psychology",
        name: "Psychology",
        description: "The scientific study of mind and behaviour, from cognition and development to research methods.",
        duration: "3 years",
        keywords: &["psychology", "mental health", "behaviour", "behavior", "counselling"],
        aliases: &["psychology", "bsc psychology"],
        curriculum: Some(PSYCHOLOGY_CURRICULUM),
    },
    TopicRecord {
        key: "nursing",
        name: "Nursing",
        description: "Prepares registered nurses through a mix of classroom teaching and supervised clinical placements.",
        duration: "3 years",
        keywords: &["nursing", "nurse", "healthcare", "clinical"],
        aliases: &["nursing", "bsc nursing"],
        curriculum: None,
    },
];

pub static BUILTIN_FEES: &[FeeEntry] = &[
    FeeEntry { topic_key: "computer science", annual: "$9,800 per year" },
    FeeEntry { topic_key: "software engineering", annual: "$9,800 per year" },
    FeeEntry { topic_key: "electrical engineering", annual: "$10,400 per year" },
    FeeEntry { topic_key: "business administration", annual: "$8,200 per year" },
    FeeEntry { topic_key: "psychology", annual: "$7,900 per year" },
    FeeEntry { topic_key: "nursing", annual: "$8,600 per year" },
];

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}'\s]+").expect("Invalid regex: punctuation pattern"));

/// Lowercase, replace punctuation with spaces, and collapse whitespace.
pub fn fold(text: &str) -> String {
    let lowered = text.to_lowercase();
    PUNCTUATION
        .replace_all(&lowered, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whole-word phrase containment on folded text.
pub fn contains_phrase(folded: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    format!(" {} ", folded).contains(&format!(" {} ", phrase))
}

/// Keyword/alias index over a topic table plus the fixed phrase sets.
pub struct Lexicon {
    topics: &'static [TopicRecord],
    fees: &'static [FeeEntry],
    keyword_index: HashMap<&'static str, Vec<usize>>,
    alias_index: HashMap<&'static str, usize>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Lexicon {
    /// Lexicon over the compiled university tables.
    pub fn builtin() -> Self {
        Self::with_tables(BUILTIN_TOPICS, BUILTIN_FEES)
    }

    pub fn with_tables(topics: &'static [TopicRecord], fees: &'static [FeeEntry]) -> Self {
        let mut keyword_index: HashMap<&'static str, Vec<usize>> = HashMap::new();
        let mut alias_index = HashMap::new();

        for (idx, topic) in topics.iter().enumerate() {
            for keyword in topic.keywords {
                let owners = keyword_index.entry(*keyword).or_default();
                if !owners.contains(&idx) {
                    owners.push(idx);
                }
            }
            // First topic to claim an alias keeps it.
            alias_index.entry(topic.key).or_insert(idx);
            for alias in topic.aliases {
                alias_index.entry(*alias).or_insert(idx);
            }
        }

        Self {
            topics,
            fees,
            keyword_index,
            alias_index,
        }
    }

    pub fn topics(&self) -> &'static [TopicRecord] {
        self.topics
    }

    /// Look up a topic by canonical key.
    pub fn topic(&self, key: &str) -> Option<&'static TopicRecord> {
        self.topics.iter().find(|t| t.key == key)
    }

    /// Topic whose canonical name or alias equals the whole folded utterance.
    pub fn exact_topic(&self, folded: &str) -> Option<&'static TopicRecord> {
        self.alias_index.get(folded).map(|&idx| &self.topics[idx])
    }

    /// Best keyword-membership match. Ties on confidence go to the topic with
    /// more matched keywords, then to table order.
    pub fn topic_match(&self, folded: &str) -> Option<TopicMatch> {
        let mut best: Option<TopicMatch> = None;

        for (idx, topic) in self.topics.iter().enumerate() {
            let matched: Vec<&'static str> = topic
                .keywords
                .iter()
                .copied()
                .filter(|kw| contains_phrase(folded, kw))
                .collect();
            if matched.is_empty() {
                continue;
            }

            let has_unique = matched.iter().any(|kw| {
                self.keyword_index
                    .get(kw)
                    .map(|owners| owners.len() == 1 && owners[0] == idx)
                    .unwrap_or(false)
            });
            let confidence = if has_unique {
                UNIQUE_KEYWORD_CONFIDENCE
            } else {
                SHARED_KEYWORD_CONFIDENCE
            };

            let better = match &best {
                None => true,
                Some(current) => {
                    confidence > current.confidence
                        || (confidence == current.confidence
                            && matched.len() > current.matched_keywords.len())
                }
            };
            if better {
                best = Some(TopicMatch {
                    topic,
                    confidence,
                    matched_keywords: matched,
                });
            }
        }

        best
    }

    pub fn is_greeting(&self, folded: &str) -> bool {
        GREETING_PHRASES.contains(&folded)
    }

    pub fn is_time_query(&self, folded: &str) -> bool {
        folded == "time" || TIME_PHRASES.iter().any(|p| contains_phrase(folded, p))
    }

    /// Fee keywords present in the utterance.
    pub fn fee_keywords(&self, folded: &str) -> Vec<&'static str> {
        FEE_KEYWORDS
            .iter()
            .copied()
            .filter(|kw| contains_phrase(folded, kw))
            .collect()
    }

    pub fn mentions_fees(&self, folded: &str) -> bool {
        !self.fee_keywords(folded).is_empty()
    }

    pub fn is_affirmative(&self, folded: &str) -> bool {
        AFFIRMATIVES.contains(&folded)
    }

    pub fn fee_for(&self, topic_key: &str) -> Option<&'static FeeEntry> {
        self.fees.iter().find(|f| f.topic_key == topic_key)
    }

    /// Fee response, narrowed to one topic when it has a fee entry.
    pub fn fee_table(&self, narrowed_to: Option<&str>) -> String {
        if let Some(key) = narrowed_to {
            if let (Some(topic), Some(fee)) = (self.topic(key), self.fee_for(key)) {
                return format!("Tuition for {} is {}.", topic.name, fee.annual);
            }
        }

        let mut out = String::from("Annual tuition fees:");
        for fee in self.fees {
            let name = self.topic(fee.topic_key).map(|t| t.name).unwrap_or(fee.topic_key);
            out.push_str(&format!("\n- {}: {}", name, fee.annual));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_strips_punctuation() {
        assert_eq!(fold("  Hello,   World!! "), "hello world");
        assert_eq!(fold("What's the time?"), "what's the time");
        assert_eq!(fold("是"), "是");
        assert_eq!(fold("?!"), "");
    }

    #[test]
    fn test_contains_phrase_respects_word_boundaries() {
        assert!(contains_phrase("what are the fees", "fees"));
        assert!(!contains_phrase("a cup of coffee", "fee"));
        assert!(contains_phrase("computer science program", "computer science"));
        assert!(!contains_phrase("physics", "cs"));
    }

    #[test]
    fn test_exact_topic_via_alias() {
        let lexicon = Lexicon::builtin();
        assert_eq!(lexicon.exact_topic("cs").map(|t| t.key), Some("computer science"));
        assert_eq!(
            lexicon.exact_topic("computer science").map(|t| t.key),
            Some("computer science")
        );
        assert!(lexicon.exact_topic("computer science program").is_none());
    }

    #[test]
    fn test_unique_keyword_scores_higher_than_shared() {
        let lexicon = Lexicon::builtin();

        let unique = lexicon.topic_match("computer science program").unwrap();
        assert_eq!(unique.topic.key, "computer science");
        assert_eq!(unique.confidence, 0.9);

        let shared = lexicon.topic_match("engineering").unwrap();
        assert_eq!(shared.topic.key, "software engineering");
        assert_eq!(shared.confidence, 0.8);
    }

    #[test]
    fn test_more_keyword_hits_win_ties() {
        let lexicon = Lexicon::builtin();
        let m = lexicon.topic_match("electrical engineering and electronics").unwrap();
        assert_eq!(m.topic.key, "electrical engineering");
        assert!(m.matched_keywords.len() >= 2);
    }

    #[test]
    fn test_phrase_sets() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.is_greeting("hello"));
        assert!(!lexicon.is_greeting("hello can you help me"));
        assert!(lexicon.is_time_query("excuse me what time is it"));
        assert!(lexicon.is_time_query("time"));
        assert!(lexicon.mentions_fees("how much is the tuition"));
        assert!(lexicon.is_affirmative("yes"));
        assert!(lexicon.is_affirmative("是"));
        assert!(!lexicon.is_affirmative("yes please"));
    }

    #[test]
    fn test_fee_table_narrowing() {
        let lexicon = Lexicon::builtin();
        let narrowed = lexicon.fee_table(Some("psychology"));
        assert_eq!(narrowed, "Tuition for Psychology is $7,900 per year.");

        let full = lexicon.fee_table(None);
        assert!(full.starts_with("Annual tuition fees:"));
        assert_eq!(full.lines().count(), BUILTIN_FEES.len() + 1);
    }

    #[test]
    fn test_topic_detail_lists_curriculum() {
        let lexicon = Lexicon::builtin();
        let detail = lexicon.topic("computer science").unwrap().detail();
        assert!(detail.starts_with("Computer Science (4 years)"));
        assert!(detail.contains("Year 4: Distributed Systems, Security, Capstone Project"));

        let nursing = lexicon.topic("nursing").unwrap().detail();
        assert!(!nursing.contains("Curriculum"));
    }
}
