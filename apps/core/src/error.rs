use std::io;
use thiserror::Error;

/// Application-wide error type, consolidating all possible errors into a single enum.
#[derive(Debug, Error)]
pub enum AppError {
    /// Errors from the interaction log database.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Standard input/output errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Supervisor mailbox failures.
    #[error("Actor error: {0}")]
    Actor(#[from] crate::actors::messages::ActorError),

    /// Malformed data files or out-of-range settings.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unparseable environment variables.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Translation error: {0}")]
    Translation(#[from] TranslateError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            AppError::Database(e) => AppError::Database(sqlx::Error::Protocol(e.to_string())),
            AppError::Io(e) => AppError::Io(io::Error::new(e.kind(), e.to_string())),
            AppError::Actor(e) => AppError::Actor(e.clone()),
            AppError::Validation(s) => AppError::Validation(s.clone()),
            AppError::Config(s) => AppError::Config(s.clone()),
            AppError::Timeout(s) => AppError::Timeout(s.clone()),
            AppError::Translation(e) => AppError::Translation(e.clone()),
            AppError::Classifier(e) => AppError::Classifier(e.clone()),
        }
    }
}

/// Why the statistical predictor could not produce a label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    #[error("classifier vocabulary is empty")]
    EmptyVocabulary,
    #[error("input has no known terms")]
    OutOfVocabulary,
    #[error("malformed input")]
    MalformedInput,
}

/// Failures of the translation and language-detection collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("service returned {0}: {1}")]
    Status(u16, String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("unsupported language: {0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for TranslateError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TranslateError::Status(status.as_u16(), err.to_string()),
            None if err.is_decode() => TranslateError::Malformed(err.to_string()),
            None => TranslateError::Http(err.to_string()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(format!("Operation timed out: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON error: {}", err))
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Validation(format!("CSV error: {}", err))
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        AppError::Validation(format!("URL parse error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("Validation errors: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Io(io::Error::other(format!("HTTP error: {}", err)))
    }
}
