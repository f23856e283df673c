//! Storage abstraction for generated content
//!
//! The generator only ever looks topics up by name, inserts new topics, and
//! bulk-inserts questions. `QuestionStore` captures exactly that surface so the
//! pipeline can run against PostgreSQL or entirely in memory.

mod memory;

pub use memory::{FaultKind, MemoryStore};

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Matches question text produced by the generic synthesizer.
///
/// Written in the common subset of POSIX and `regex-lite` syntax so the same
/// pattern can be evaluated by PostgreSQL.
pub const PLACEHOLDER_PATTERN: &str = r"^(Physics|Chemistry|Botany|Zoology) Chapter [0-9]+ - Question [0-9]+ \((basic|intermediate|advanced) level\)";

/// A persisted topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: i32,
    pub subject: String,
    pub class_level: String,
    pub topic_name: String,
    pub ncert_chapter: Option<String>,
    pub reference_books: Vec<String>,
}

/// A topic to be inserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTopic {
    pub subject: String,
    pub class_level: String,
    pub topic_name: String,
    pub ncert_chapter: Option<String>,
    pub reference_books: Vec<String>,
}

/// Lookup key for topics.
///
/// `subject: None` matches on topic name alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicLookup {
    pub topic_name: String,
    pub subject: Option<String>,
}

/// One answer choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
}

/// A question record ready for insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuestion {
    pub topic_id: i32,
    pub question_text: String,
    pub options: Vec<AnswerOption>,
    pub correct_answer: String,
    pub solution_detail: String,
    pub solution_steps: Vec<String>,
    pub difficulty_level: i32,
    pub source_type: String,
    pub related_topics: Vec<String>,
}

impl NewQuestion {
    /// Number of options whose id equals the correct answer
    pub fn correct_option_count(&self) -> usize {
        self.options
            .iter()
            .filter(|o| o.id == self.correct_answer)
            .count()
    }
}

/// Question counts for one topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicStats {
    pub topic: Topic,
    pub total: u64,
    pub placeholders: u64,
}

impl TopicStats {
    /// Questions that are not generic placeholders
    pub fn curated(&self) -> u64 {
        self.total.saturating_sub(self.placeholders)
    }
}

/// Trait for topic and question persistence
#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Find the first topic matching the lookup
    async fn find_topic(&self, lookup: &TopicLookup) -> Result<Option<Topic>>;

    /// Insert a topic and return it with its assigned id
    async fn insert_topic(&self, topic: NewTopic) -> Result<Topic>;

    /// Count questions for a topic with the given source type
    async fn count_questions(&self, topic_id: i32, source_type: &str) -> Result<u64>;

    /// Start writing one question set atomically
    async fn begin_set(&self) -> Result<Box<dyn SetWriter>>;

    /// Per-topic question totals, ordered by topic id
    async fn topic_stats(&self) -> Result<Vec<TopicStats>>;
}

/// Atomic writer for one question set.
///
/// Nothing becomes visible until `commit` succeeds; dropping the writer
/// without committing discards every batch.
#[async_trait]
pub trait SetWriter: Send {
    /// Insert one batch of questions
    async fn insert_batch(&mut self, batch: &[NewQuestion]) -> Result<()>;

    /// Make all inserted batches visible
    async fn commit(&mut self) -> Result<()>;
}
