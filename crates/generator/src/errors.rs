//! Generator error types

use quizforge_common::errors::{AppError, ErrorCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Unknown subject: {0}")]
    UnknownSubject(String),

    #[error("Invalid chapter {chapter} for {subject}: expected 1..={max}")]
    InvalidChapter {
        subject: String,
        chapter: u32,
        max: u32,
    },

    #[error("Invalid template for {subject} chapter {chapter}: {reason}")]
    InvalidTemplate {
        subject: String,
        chapter: u32,
        reason: String,
    },

    #[error("Invalid question set {set_number}: {reason}")]
    InvalidSet { set_number: u32, reason: String },

    #[error("Storage error: {0}")]
    Store(#[from] AppError),

    #[error("Template data error: {0}")]
    TemplateData(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl GeneratorError {
    /// Machine-readable code for structured logs
    pub fn code(&self) -> ErrorCode {
        match self {
            GeneratorError::Store(err) => err.code(),
            GeneratorError::UnknownSubject(_)
            | GeneratorError::InvalidChapter { .. }
            | GeneratorError::InvalidTemplate { .. }
            | GeneratorError::InvalidSet { .. } => ErrorCode::ValidationError,
            GeneratorError::TemplateData(_) => ErrorCode::SerializationError,
            GeneratorError::ConfigError(_) => ErrorCode::ConfigurationError,
            GeneratorError::IoError(_) => ErrorCode::InternalError,
        }
    }

    /// Whether retrying the failed storage call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, GeneratorError::Store(err) if err.is_transient())
    }
}
