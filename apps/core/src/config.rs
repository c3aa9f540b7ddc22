//! Runtime configuration from `FAQBOT_*` environment variables (and `.env`).

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use validator::Validate;

use crate::brain::{Language, ResponseSelection};
use crate::error::AppError;
use crate::fs_manager::{DataLayout, PortablePathManager};
use crate::telemetry::LogFormat;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BotConfig {
    pub data_dir: PathBuf,
    /// Knowledge matches must score strictly above this.
    #[validate(range(min = 0.0, max = 1.0))]
    pub match_threshold: f32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub confirm_floor: f32,
    #[validate(range(min = 0.0, max = 1.0))]
    pub classifier_floor: f32,
    pub response_selection: ResponseSelection,
    /// Used when language detection fails.
    pub default_language: Language,
    /// LibreTranslate-compatible base URL. Unset disables remote translation.
    #[validate(url)]
    pub translate_url: Option<String>,
    pub translate_api_key: Option<String>,
    #[validate(range(min = 1, max = 120))]
    pub translate_timeout_secs: u64,
    #[validate(range(min = 1))]
    pub translate_cache: usize,
    pub database_url: Option<String>,
    pub log_format: LogFormat,
    /// Conversations kept in memory; the least recently active is dropped.
    #[validate(range(min = 1))]
    pub max_sessions: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            data_dir: PortablePathManager::data_dir(),
            match_threshold: 0.3,
            confirm_floor: 0.6,
            classifier_floor: 0.5,
            response_selection: ResponseSelection::Random,
            default_language: Language::English,
            translate_url: None,
            translate_api_key: None,
            translate_timeout_secs: 10,
            translate_cache: 256,
            database_url: None,
            log_format: LogFormat::Pretty,
            max_sessions: 1024,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("{}: {}", key, e))),
        None => Ok(default),
    }
}

/// Like [`parse_var`], but rejects NaN and infinities, which would slip past
/// range validation.
fn parse_ratio(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: f32) -> Result<f32, AppError> {
    let value = parse_var(lookup, key, default)?;
    if !value.is_finite() {
        return Err(AppError::Config(format!("{}: not a finite number", key)));
    }
    Ok(value)
}

fn optional_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl BotConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();
        let config = Self {
            data_dir: optional_var(&lookup, "FAQBOT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            match_threshold: parse_ratio(&lookup, "FAQBOT_MATCH_THRESHOLD", defaults.match_threshold)?,
            confirm_floor: parse_ratio(&lookup, "FAQBOT_CONFIRM_FLOOR", defaults.confirm_floor)?,
            classifier_floor: parse_ratio(&lookup, "FAQBOT_CLASSIFIER_FLOOR", defaults.classifier_floor)?,
            response_selection: parse_var(&lookup, "FAQBOT_RESPONSE_SELECTION", defaults.response_selection)?,
            default_language: parse_var(&lookup, "FAQBOT_DEFAULT_LANGUAGE", defaults.default_language)?,
            translate_url: optional_var(&lookup, "FAQBOT_TRANSLATE_URL"),
            translate_api_key: optional_var(&lookup, "FAQBOT_TRANSLATE_API_KEY"),
            translate_timeout_secs: parse_var(
                &lookup,
                "FAQBOT_TRANSLATE_TIMEOUT_SECS",
                defaults.translate_timeout_secs,
            )?,
            translate_cache: parse_var(&lookup, "FAQBOT_TRANSLATE_CACHE", defaults.translate_cache)?,
            database_url: optional_var(&lookup, "FAQBOT_DATABASE_URL"),
            log_format: parse_var(&lookup, "FAQBOT_LOG_FORMAT", defaults.log_format)?,
            max_sessions: parse_var(&lookup, "FAQBOT_MAX_SESSIONS", defaults.max_sessions)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.data_dir)
    }

    pub fn database_url(&self) -> String {
        self.database_url
            .clone()
            .unwrap_or_else(|| self.layout().database_url())
    }
}
