//! QuizForge Common Library
//!
//! Shared code for the QuizForge tools including:
//! - Configuration management
//! - Error types and handling
//! - Database models and repository patterns
//! - Storage abstraction with an in-memory implementation
//! - Metrics helpers

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};
pub use store::{MemoryStore, QuestionStore, SetWriter};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of questions in one generated set
pub const DEFAULT_SET_SIZE: usize = 100;

/// Maximum number of question records per insert call
pub const DEFAULT_BATCH_SIZE: usize = 20;
