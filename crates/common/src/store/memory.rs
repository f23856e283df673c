//! In-memory question store
//!
//! Used for dry runs and as the storage double in tests. Supports injecting
//! transient or permanent failures into topic lookups and inserts, question
//! counts, set batches and commit acknowledgements.

use super::{
    NewQuestion, NewTopic, QuestionStore, SetWriter, Topic, TopicLookup, TopicStats,
    PLACEHOLDER_PATTERN,
};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use regex_lite::Regex;
use sea_orm::DbErr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Kind of failure to inject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Connection-level failure, eligible for retry
    Transient,
    /// Query failure, never retried
    Permanent,
}

impl FaultKind {
    fn to_error(self, what: &str) -> AppError {
        match self {
            FaultKind::Transient => AppError::DatabaseConnection {
                message: format!("injected connection failure during {}", what),
            },
            FaultKind::Permanent => {
                AppError::Database(DbErr::Custom(format!("injected failure during {}", what)))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    kind: FaultKind,
    remaining: usize,
}

impl Fault {
    fn trip(&mut self, what: &str) -> Result<()> {
        if self.remaining > 0 {
            self.remaining -= 1;
            return Err(self.kind.to_error(what));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct StoredQuestion {
    id: i32,
    question: NewQuestion,
}

#[derive(Debug, Default)]
struct MemoryState {
    topics: Vec<Topic>,
    questions: Vec<StoredQuestion>,
    next_topic_id: i32,
    next_question_id: i32,
    batch_attempts: Vec<usize>,
    topic_lookups: usize,
    topic_inserts: usize,
    // (1-based batch position within a set, fault)
    batch_fault: Option<(usize, Fault)>,
    topic_fault: Option<Fault>,
    topic_insert_fault: Option<Fault>,
    count_fault: Option<Fault>,
    // trips after the commit has been applied
    commit_ack_fault: Option<Fault>,
}

/// Question store backed by process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `position`-th batch of a set (1-based) `times` times
    pub async fn fail_batch(&self, position: usize, kind: FaultKind, times: usize) {
        let mut state = self.state.lock().await;
        state.batch_fault = Some((position, Fault { kind, remaining: times }));
    }

    /// Fail the next `times` topic lookups
    pub async fn fail_topic_lookups(&self, kind: FaultKind, times: usize) {
        let mut state = self.state.lock().await;
        state.topic_fault = Some(Fault { kind, remaining: times });
    }

    /// Fail the next `times` topic inserts
    pub async fn fail_topic_inserts(&self, kind: FaultKind, times: usize) {
        let mut state = self.state.lock().await;
        state.topic_insert_fault = Some(Fault { kind, remaining: times });
    }

    /// Fail the next `times` question counts
    pub async fn fail_counts(&self, kind: FaultKind, times: usize) {
        let mut state = self.state.lock().await;
        state.count_fault = Some(Fault { kind, remaining: times });
    }

    /// Apply the next `times` commits but report them as failed
    pub async fn lose_commit_acks(&self, kind: FaultKind, times: usize) {
        let mut state = self.state.lock().await;
        state.commit_ack_fault = Some(Fault { kind, remaining: times });
    }

    /// All stored topics in insertion order
    pub async fn topics(&self) -> Vec<Topic> {
        self.state.lock().await.topics.clone()
    }

    /// All committed questions in insertion order
    pub async fn questions(&self) -> Vec<NewQuestion> {
        self.state
            .lock()
            .await
            .questions
            .iter()
            .map(|q| q.question.clone())
            .collect()
    }

    /// Ids assigned to committed questions, in insertion order
    pub async fn question_ids(&self) -> Vec<i32> {
        self.state.lock().await.questions.iter().map(|q| q.id).collect()
    }

    /// Sizes of every attempted batch, including failed ones
    pub async fn batch_sizes(&self) -> Vec<usize> {
        self.state.lock().await.batch_attempts.clone()
    }

    /// Number of topic lookups served
    pub async fn topic_lookup_count(&self) -> usize {
        self.state.lock().await.topic_lookups
    }

    /// Number of topic inserts attempted, including failed ones
    pub async fn topic_insert_count(&self) -> usize {
        self.state.lock().await.topic_inserts
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn find_topic(&self, lookup: &TopicLookup) -> Result<Option<Topic>> {
        let mut state = self.state.lock().await;
        if let Some(fault) = state.topic_fault.as_mut() {
            fault.trip("topic lookup")?;
        }
        state.topic_lookups += 1;

        Ok(state
            .topics
            .iter()
            .find(|t| {
                t.topic_name == lookup.topic_name
                    && lookup.subject.as_ref().map_or(true, |s| &t.subject == s)
            })
            .cloned())
    }

    async fn insert_topic(&self, topic: NewTopic) -> Result<Topic> {
        let mut state = self.state.lock().await;
        state.topic_inserts += 1;
        if let Some(fault) = state.topic_insert_fault.as_mut() {
            fault.trip("topic insert")?;
        }
        state.next_topic_id += 1;

        let stored = Topic {
            id: state.next_topic_id,
            subject: topic.subject,
            class_level: topic.class_level,
            topic_name: topic.topic_name,
            ncert_chapter: topic.ncert_chapter,
            reference_books: topic.reference_books,
        };
        state.topics.push(stored.clone());

        Ok(stored)
    }

    async fn count_questions(&self, topic_id: i32, source_type: &str) -> Result<u64> {
        let mut state = self.state.lock().await;
        if let Some(fault) = state.count_fault.as_mut() {
            fault.trip("question count")?;
        }
        Ok(state
            .questions
            .iter()
            .filter(|q| q.question.topic_id == topic_id && q.question.source_type == source_type)
            .count() as u64)
    }

    async fn begin_set(&self) -> Result<Box<dyn SetWriter>> {
        Ok(Box::new(MemorySetWriter {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
            batches: 0,
        }))
    }

    async fn topic_stats(&self) -> Result<Vec<TopicStats>> {
        let placeholder = Regex::new(PLACEHOLDER_PATTERN).map_err(|e| AppError::Internal {
            message: format!("invalid placeholder pattern: {}", e),
        })?;

        let state = self.state.lock().await;
        let mut stats: Vec<TopicStats> = state
            .topics
            .iter()
            .map(|topic| {
                let questions = state
                    .questions
                    .iter()
                    .filter(|q| q.question.topic_id == topic.id);
                let (total, placeholders) = questions.fold((0u64, 0u64), |(t, p), q| {
                    let is_placeholder = placeholder.is_match(&q.question.question_text);
                    (t + 1, p + u64::from(is_placeholder))
                });

                TopicStats {
                    topic: topic.clone(),
                    total,
                    placeholders,
                }
            })
            .collect();

        stats.sort_by_key(|s| s.topic.id);
        Ok(stats)
    }
}

struct MemorySetWriter {
    state: Arc<Mutex<MemoryState>>,
    staged: Vec<NewQuestion>,
    batches: usize,
}

#[async_trait]
impl SetWriter for MemorySetWriter {
    async fn insert_batch(&mut self, batch: &[NewQuestion]) -> Result<()> {
        let mut state = self.state.lock().await;
        self.batches += 1;
        state.batch_attempts.push(batch.len());

        let position = self.batches;
        if let Some((at, fault)) = state.batch_fault.as_mut() {
            if *at == position {
                fault.trip("question batch insert")?;
            }
        }

        self.staged.extend_from_slice(batch);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let mut state = self.state.lock().await;
        for question in self.staged.drain(..) {
            state.next_question_id += 1;
            let id = state.next_question_id;
            state.questions.push(StoredQuestion { id, question });
        }
        if let Some(fault) = state.commit_ack_fault.as_mut() {
            fault.trip("commit acknowledgement")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AnswerOption;

    fn question(topic_id: i32, text: &str) -> NewQuestion {
        NewQuestion {
            topic_id,
            question_text: text.to_string(),
            options: vec![
                AnswerOption { id: "A".into(), text: "yes".into() },
                AnswerOption { id: "B".into(), text: "no".into() },
            ],
            correct_answer: "A".into(),
            solution_detail: "because".into(),
            solution_steps: vec![],
            difficulty_level: 1,
            source_type: "Generated Set 1".into(),
            related_topics: vec![],
        }
    }

    fn new_topic(subject: &str, name: &str) -> NewTopic {
        NewTopic {
            subject: subject.into(),
            class_level: "Class XI-XII".into(),
            topic_name: name.into(),
            ncert_chapter: Some(name.into()),
            reference_books: vec!["NCERT".into()],
        }
    }

    #[test]
    fn test_find_topic_by_name_and_subject() {
        tokio_test::block_on(async {
            let store = MemoryStore::new();
            let physics = store.insert_topic(new_topic("Physics", "Chapter 1")).await.unwrap();

            let by_name = TopicLookup { topic_name: "Chapter 1".into(), subject: None };
            assert_eq!(store.find_topic(&by_name).await.unwrap(), Some(physics.clone()));

            let chemistry = TopicLookup {
                topic_name: "Chapter 1".into(),
                subject: Some("Chemistry".into()),
            };
            assert_eq!(store.find_topic(&chemistry).await.unwrap(), None);
            assert_eq!(store.topic_lookup_count().await, 2);
        });
    }

    #[tokio::test]
    async fn test_uncommitted_set_is_discarded() {
        let store = MemoryStore::new();
        {
            let mut writer = store.begin_set().await.unwrap();
            writer.insert_batch(&[question(1, "q1")]).await.unwrap();
        }
        assert!(store.questions().await.is_empty());
        assert_eq!(store.batch_sizes().await, vec![1]);
    }

    #[tokio::test]
    async fn test_commit_assigns_ids_in_order() {
        let store = MemoryStore::new();
        let mut writer = store.begin_set().await.unwrap();
        writer.insert_batch(&[question(1, "q1"), question(1, "q2")]).await.unwrap();
        writer.insert_batch(&[question(1, "q3")]).await.unwrap();
        writer.commit().await.unwrap();

        let texts: Vec<_> = store.questions().await.into_iter().map(|q| q.question_text).collect();
        assert_eq!(texts, vec!["q1", "q2", "q3"]);
        assert_eq!(store.question_ids().await, vec![1, 2, 3]);
        assert_eq!(store.count_questions(1, "Generated Set 1").await.unwrap(), 3);
        assert_eq!(store.count_questions(1, "Generated Set 2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_batch_fault_trips_once() {
        let store = MemoryStore::new();
        store.fail_batch(2, FaultKind::Transient, 1).await;

        let mut writer = store.begin_set().await.unwrap();
        writer.insert_batch(&[question(1, "q1")]).await.unwrap();
        let err = writer.insert_batch(&[question(1, "q2")]).await.unwrap_err();
        assert!(err.is_transient());

        let mut writer = store.begin_set().await.unwrap();
        writer.insert_batch(&[question(1, "q1")]).await.unwrap();
        writer.insert_batch(&[question(1, "q2")]).await.unwrap();
        writer.commit().await.unwrap();
        assert_eq!(store.questions().await.len(), 2);
    }

    #[tokio::test]
    async fn test_lost_commit_ack_still_stores_set() {
        let store = MemoryStore::new();
        store.lose_commit_acks(FaultKind::Transient, 1).await;

        let mut writer = store.begin_set().await.unwrap();
        writer.insert_batch(&[question(1, "q1"), question(1, "q2")]).await.unwrap();
        let err = writer.commit().await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.count_questions(1, "Generated Set 1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_topic_insert_is_counted() {
        let store = MemoryStore::new();
        store.fail_topic_inserts(FaultKind::Permanent, 1).await;

        assert!(store.insert_topic(new_topic("Botany", "Chapter 2")).await.is_err());
        let topic = store.insert_topic(new_topic("Botany", "Chapter 2")).await.unwrap();
        assert_eq!(topic.id, 1);
        assert_eq!(store.topic_insert_count().await, 2);
        assert_eq!(store.topics().await.len(), 1);
    }

    #[tokio::test]
    async fn test_topic_stats_counts_placeholders() {
        let store = MemoryStore::new();
        let topic = store.insert_topic(new_topic("Physics", "Chapter 1")).await.unwrap();

        let mut writer = store.begin_set().await.unwrap();
        writer
            .insert_batch(&[
                question(topic.id, "The dimensional formula for force is:"),
                question(
                    topic.id,
                    "Physics Chapter 1 - Question 7 (basic level): What is the force?",
                ),
            ])
            .await
            .unwrap();
        writer.commit().await.unwrap();

        let stats = store.topic_stats().await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total, 2);
        assert_eq!(stats[0].placeholders, 1);
        assert_eq!(stats[0].curated(), 1);
    }
}
