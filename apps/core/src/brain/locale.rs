//! Display languages, heuristic detection, and localized clock rendering.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Languages the assistant can render responses in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Chinese,
    French,
    Spanish,
    Malay,
    Unknown,
}

impl Language {
    /// Returns the ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Chinese => "zh",
            Language::French => "fr",
            Language::Spanish => "es",
            Language::Malay => "ms",
            Language::Unknown => "unknown",
        }
    }

    /// Region suffixes are ignored (`zh-CN` -> Chinese).
    pub fn from_code(code: &str) -> Self {
        let primary = code
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_lowercase();
        match primary.as_str() {
            "en" => Language::English,
            "zh" => Language::Chinese,
            "fr" => Language::French,
            "es" => Language::Spanish,
            "ms" => Language::Malay,
            _ => Language::Unknown,
        }
    }

    /// Languages whose text the engine consumes without translation.
    pub fn is_english(&self) -> bool {
        matches!(self, Language::English | Language::Unknown)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Language::from_code(s) {
            Language::Unknown => Err(format!("unsupported language code '{}'", s)),
            lang => Ok(lang),
        }
    }
}

const ENGLISH_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "be", "do", "does", "i", "you", "it", "we",
    "and", "or", "for", "with", "to", "in", "on", "of", "what", "why", "how", "when",
    "where", "who", "hello", "hi", "please", "thanks", "yes", "much",
];

const FRENCH_WORDS: &[&str] = &[
    "le", "la", "les", "un", "une", "des", "du", "de", "et", "est", "sont", "je", "vous",
    "nous", "pour", "dans", "avec", "comment", "pourquoi", "quand", "quel", "quelle",
    "bonjour", "salut", "merci", "oui",
];

const SPANISH_WORDS: &[&str] = &[
    "el", "los", "las", "una", "es", "son", "yo", "usted", "para", "con", "como", "cómo",
    "por", "qué", "cuándo", "cuánto", "hola", "gracias", "sí", "matrícula",
];

const MALAY_WORDS: &[&str] = &[
    "saya", "anda", "apa", "bila", "bagaimana", "berapa", "yuran", "ialah", "adalah",
    "dan", "untuk", "dengan", "boleh", "terima", "kasih", "selamat", "ya", "tidak",
];

fn word_hits(words: &[&str], vocabulary: &[&str]) -> usize {
    vocabulary.iter().filter(|w| words.contains(*w)).count()
}

fn is_han(c: char) -> bool {
    matches!(c as u32, 0x4E00..=0x9FFF | 0x3400..=0x4DBF | 0xF900..=0xFAFF)
}

/// Heuristic language detection used when no detection service is configured.
///
/// Any Han character selects Chinese. Otherwise function-word hits plus
/// language-specific accents are counted; English wins ties and text with no
/// evidence is `Unknown`.
pub fn detect_language(text: &str) -> Language {
    if text.chars().any(is_han) {
        return Language::Chinese;
    }

    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect();

    let french_chars = lower
        .chars()
        .filter(|&c| matches!(c, 'è' | 'ê' | 'ë' | 'à' | 'â' | 'ù' | 'û' | 'ô' | 'î' | 'ï' | 'ç' | 'œ'))
        .count();
    let spanish_chars = lower
        .chars()
        .filter(|&c| matches!(c, 'ñ' | '¿' | '¡' | 'á' | 'í' | 'ó' | 'ú'))
        .count();

    let scores = [
        (Language::English, word_hits(&words, ENGLISH_WORDS)),
        (Language::French, word_hits(&words, FRENCH_WORDS) + french_chars),
        (Language::Spanish, word_hits(&words, SPANISH_WORDS) + spanish_chars),
        (Language::Malay, word_hits(&words, MALAY_WORDS)),
    ];

    let mut best = (Language::Unknown, 0);
    for (lang, score) in scores {
        if score > best.1 {
            best = (lang, score);
        }
    }
    best.0
}

/// Wall-clock reply in the given display language.
pub fn format_clock(time: NaiveTime, language: Language) -> String {
    let (h, m) = (time.hour(), time.minute());
    match language {
        Language::Chinese => format!("现在时间是 {:02}:{:02}。", h, m),
        Language::French => format!("Il est {:02}h{:02}.", h, m),
        Language::Spanish => format!("Son las {:02}:{:02}.", h, m),
        Language::Malay => format!("Waktu sekarang ialah {:02}:{:02}.", h, m),
        Language::English | Language::Unknown => {
            let suffix = if h < 12 { "AM" } else { "PM" };
            let h12 = match h % 12 {
                0 => 12,
                other => other,
            };
            format!("The current time is {}:{:02} {}.", h12, m, suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Language::from_code("zh-CN"), Language::Chinese);
        assert_eq!(Language::from_code("EN"), Language::English);
        assert_eq!(Language::from_code("de"), Language::Unknown);
        assert_eq!("ms".parse::<Language>(), Ok(Language::Malay));
        assert!("xx".parse::<Language>().is_err());
        assert!(Language::Unknown.is_english());
        assert!(!Language::French.is_english());
    }

    #[test]
    fn test_detection() {
        assert_eq!(detect_language("学费是多少"), Language::Chinese);
        assert_eq!(detect_language("What are the admission requirements?"), Language::English);
        assert_eq!(detect_language("Bonjour, quels sont les frais?"), Language::French);
        assert_eq!(detect_language("¿Cuánto cuesta la matrícula?"), Language::Spanish);
        assert_eq!(detect_language("Berapa yuran untuk kursus ini"), Language::Malay);
        assert_eq!(detect_language("12345"), Language::Unknown);
    }

    #[test]
    fn test_clock_formats() {
        let t = NaiveTime::from_hms_opt(14, 5, 0).unwrap();
        assert_eq!(format_clock(t, Language::English), "The current time is 2:05 PM.");
        assert_eq!(format_clock(t, Language::Chinese), "现在时间是 14:05。");
        assert_eq!(format_clock(t, Language::French), "Il est 14h05.");

        let midnight = NaiveTime::from_hms_opt(0, 30, 0).unwrap();
        assert_eq!(format_clock(midnight, Language::Unknown), "The current time is 12:30 AM.");
    }
}
