//! Topic resolution
//!
//! Finds the persisted topic for a (subject, chapter) pair, creating it on
//! first use.

use crate::errors::GeneratorError;
use crate::retry::RetryPolicy;
use crate::taxonomy::{Subject, Taxonomy};
use quizforge_common::config::{GeneratorConfig, TopicKeyMode};
use quizforge_common::metrics::record_topic_created;
use quizforge_common::store::{NewTopic, QuestionStore, Topic, TopicLookup};
use tracing::{debug, info, instrument};

/// Topic name used for a chapter
pub fn topic_name(chapter: u32) -> String {
    format!("Chapter {}", chapter)
}

/// Get-or-create for topics
#[derive(Debug, Clone)]
pub struct TopicResolver {
    mode: TopicKeyMode,
    class_level: String,
    reference_books: Vec<String>,
}

impl TopicResolver {
    pub fn new(mode: TopicKeyMode, class_level: impl Into<String>, reference_books: Vec<String>) -> Self {
        Self {
            mode,
            class_level: class_level.into(),
            reference_books,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(
            config.topic_key,
            config.class_level.clone(),
            config.reference_books.clone(),
        )
    }

    /// Lookup key for a chapter under the active keying mode
    pub fn lookup(&self, subject: Subject, chapter: u32) -> TopicLookup {
        TopicLookup {
            topic_name: topic_name(chapter),
            subject: match self.mode {
                TopicKeyMode::SubjectChapter => Some(subject.to_string()),
                TopicKeyMode::ChapterName => None,
            },
        }
    }

    /// Return the existing topic for the chapter or insert a new one
    #[instrument(skip(self, store, taxonomy, retry), fields(subject = %subject))]
    pub async fn resolve(
        &self,
        store: &dyn QuestionStore,
        taxonomy: &Taxonomy,
        retry: &RetryPolicy,
        subject: Subject,
        chapter: u32,
    ) -> Result<Topic, GeneratorError> {
        taxonomy.validate_chapter(subject, chapter)?;
        let lookup = self.lookup(subject, chapter);

        let existing = retry
            .run("find_topic", || async {
                store.find_topic(&lookup).await.map_err(GeneratorError::from)
            })
            .await?;

        if let Some(topic) = existing {
            debug!(topic_id = topic.id, "Topic already exists");
            return Ok(topic);
        }

        let new_topic = NewTopic {
            subject: subject.to_string(),
            class_level: self.class_level.clone(),
            topic_name: lookup.topic_name.clone(),
            ncert_chapter: Some(topic_name(chapter)),
            reference_books: self.reference_books.clone(),
        };

        // not retried: a lost acknowledgement could insert the topic twice
        let topic = store.insert_topic(new_topic).await?;

        record_topic_created(subject.name());
        info!(topic_id = topic.id, topic_name = %topic.topic_name, "Topic created");
        Ok(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizforge_common::config::RetryConfig;
    use quizforge_common::store::{FaultKind, MemoryStore};

    fn resolver(mode: TopicKeyMode) -> TopicResolver {
        TopicResolver::new(
            mode,
            "Class XI-XII",
            vec!["NCERT".to_string(), "Reference Books".to_string()],
        )
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let store = MemoryStore::new();
        let taxonomy = Taxonomy::neet();
        let resolver = resolver(TopicKeyMode::SubjectChapter);
        let retry = RetryPolicy::disabled();

        let first = resolver
            .resolve(&store, &taxonomy, &retry, Subject::Physics, 4)
            .await
            .unwrap();
        let second = resolver
            .resolve(&store, &taxonomy, &retry, Subject::Physics, 4)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.topics().await.len(), 1);
        assert_eq!(first.topic_name, "Chapter 4");
        assert_eq!(first.ncert_chapter.as_deref(), Some("Chapter 4"));
        assert_eq!(first.class_level, "Class XI-XII");
        assert_eq!(first.reference_books, vec!["NCERT", "Reference Books"]);
    }

    #[tokio::test]
    async fn test_subject_chapter_mode_separates_subjects() {
        let store = MemoryStore::new();
        let taxonomy = Taxonomy::neet();
        let resolver = resolver(TopicKeyMode::SubjectChapter);
        let retry = RetryPolicy::disabled();

        let physics = resolver
            .resolve(&store, &taxonomy, &retry, Subject::Physics, 1)
            .await
            .unwrap();
        let chemistry = resolver
            .resolve(&store, &taxonomy, &retry, Subject::Chemistry, 1)
            .await
            .unwrap();

        assert_ne!(physics.id, chemistry.id);
        assert_eq!(chemistry.subject, "Chemistry");
    }

    #[tokio::test]
    async fn test_chapter_name_mode_shares_topics() {
        let store = MemoryStore::new();
        let taxonomy = Taxonomy::neet();
        let resolver = resolver(TopicKeyMode::ChapterName);
        let retry = RetryPolicy::disabled();

        let physics = resolver
            .resolve(&store, &taxonomy, &retry, Subject::Physics, 1)
            .await
            .unwrap();
        let chemistry = resolver
            .resolve(&store, &taxonomy, &retry, Subject::Chemistry, 1)
            .await
            .unwrap();

        assert_eq!(physics.id, chemistry.id);
        assert_eq!(chemistry.subject, "Physics");
        assert_eq!(store.topics().await.len(), 1);
    }

    #[tokio::test]
    async fn test_chapter_out_of_range() {
        let store = MemoryStore::new();
        let taxonomy = Taxonomy::neet();
        let err = resolver(TopicKeyMode::SubjectChapter)
            .resolve(&store, &taxonomy, &RetryPolicy::disabled(), Subject::Physics, 23)
            .await
            .unwrap_err();

        assert!(matches!(err, GeneratorError::InvalidChapter { chapter: 23, max: 22, .. }));
        assert_eq!(store.topic_lookup_count().await, 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_propagates() {
        let store = MemoryStore::new();
        store.fail_topic_lookups(FaultKind::Permanent, 1).await;

        let result = resolver(TopicKeyMode::SubjectChapter)
            .resolve(&store, &Taxonomy::neet(), &RetryPolicy::disabled(), Subject::Botany, 2)
            .await;

        assert!(matches!(result, Err(GeneratorError::Store(_))));
        assert!(store.topics().await.is_empty());
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::from_config(&RetryConfig {
            initial_interval_ms: 1,
            max_interval_ms: 5,
            max_elapsed_ms: 2_000,
            multiplier: 2.0,
        })
    }

    #[tokio::test]
    async fn test_transient_lookup_is_retried() {
        let store = MemoryStore::new();
        store.fail_topic_lookups(FaultKind::Transient, 2).await;

        let topic = resolver(TopicKeyMode::SubjectChapter)
            .resolve(&store, &Taxonomy::neet(), &fast_retry(), Subject::Physics, 3)
            .await
            .unwrap();

        assert_eq!(topic.topic_name, "Chapter 3");
        assert_eq!(store.topics().await, vec![topic]);
        // the two failed lookups were never served
        assert_eq!(store.topic_lookup_count().await, 1);
        assert_eq!(store.topic_insert_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_insert_is_not_retried() {
        let store = MemoryStore::new();
        store.fail_topic_inserts(FaultKind::Transient, 1).await;

        let err = resolver(TopicKeyMode::SubjectChapter)
            .resolve(&store, &Taxonomy::neet(), &fast_retry(), Subject::Zoology, 5)
            .await
            .unwrap_err();

        assert!(err.is_transient());
        assert_eq!(store.topic_insert_count().await, 1);
        assert!(store.topics().await.is_empty());
    }
}
