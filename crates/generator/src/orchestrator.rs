//! Generation orchestrator
//!
//! Walks subjects → chapters → sets, resolving each chapter's topic and
//! persisting every assembled set, until the global set number passes the
//! configured target.

use crate::assembler::{source_type, QuestionSet, SetAssembler};
use crate::batcher::{persist_set, BatchOutcome};
use crate::errors::GeneratorError;
use crate::retry::RetryPolicy;
use crate::taxonomy::{sets_per_chapter, Subject, Taxonomy};
use crate::templates::TemplateBank;
use crate::topics::TopicResolver;
use chrono::{DateTime, Utc};
use quizforge_common::config::{AppConfig, GeneratorConfig};
use quizforge_common::metrics::{record_set_skipped, SetTimer};
use quizforge_common::store::{QuestionStore, Topic};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Run limits taken from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationSettings {
    pub set_size: usize,
    pub total_sets_target: u32,
    pub batch_size: usize,
    pub resume: bool,
}

impl GenerationSettings {
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            set_size: config.set_size,
            total_sets_target: config.total_sets_target,
            batch_size: config.batch_size,
            resume: config.resume,
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }
}

/// Counters threaded through one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    /// Number the next set will receive
    pub next_set_number: u32,
    pub sets_created: u32,
    pub sets_skipped: u32,
    pub questions_generated: u64,
    pub batches_written: u64,
    pub topics_resolved: u32,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            next_set_number: 1,
            sets_created: 0,
            sets_skipped: 0,
            questions_generated: 0,
            batches_written: 0,
            topics_resolved: 0,
        }
    }

    /// True once the set counter has passed `target`
    pub fn exhausted(&self, target: u32) -> bool {
        self.next_set_number > target
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// Totals of a finished run
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub sets_created: u32,
    pub sets_skipped: u32,
    pub questions_generated: u64,
    pub batches_written: u64,
    pub topics_resolved: u32,
    pub elapsed: Duration,
}

impl GenerationReport {
    fn from_state(run_id: Uuid, started_at: DateTime<Utc>, state: &RunState, elapsed: Duration) -> Self {
        Self {
            run_id,
            started_at,
            sets_created: state.sets_created,
            sets_skipped: state.sets_skipped,
            questions_generated: state.questions_generated,
            batches_written: state.batches_written,
            topics_resolved: state.topics_resolved,
            elapsed,
        }
    }
}

fn plural(count: u32) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Created {} set{} ({} questions) in {:.2}s",
            self.sets_created,
            plural(self.sets_created),
            self.questions_generated,
            self.elapsed.as_secs_f64()
        )?;

        if self.sets_skipped > 0 {
            write!(
                f,
                "; skipped {} existing set{}",
                self.sets_skipped,
                plural(self.sets_skipped)
            )?;
        }
        Ok(())
    }
}

/// Drives a full generation run against a question store
pub struct Orchestrator {
    store: Arc<dyn QuestionStore>,
    taxonomy: Taxonomy,
    assembler: SetAssembler,
    resolver: TopicResolver,
    retry: RetryPolicy,
    settings: GenerationSettings,
    rng: StdRng,
}

impl Orchestrator {
    /// Orchestrator with default topic keying, no retries and an unseeded RNG
    pub fn new(
        store: Arc<dyn QuestionStore>,
        taxonomy: Taxonomy,
        bank: TemplateBank,
        settings: GenerationSettings,
    ) -> Self {
        let defaults = GeneratorConfig::default();
        Self {
            store,
            taxonomy,
            assembler: SetAssembler::new(bank, settings.set_size),
            resolver: TopicResolver::from_config(&defaults),
            retry: RetryPolicy::disabled(),
            settings,
            rng: StdRng::from_entropy(),
        }
    }

    /// Build everything from application configuration
    pub fn from_config(store: Arc<dyn QuestionStore>, config: &AppConfig) -> Result<Self, GeneratorError> {
        let generator = &config.generator;
        let taxonomy = Taxonomy::from_config(generator.taxonomy.as_deref())?;
        let bank = TemplateBank::load(generator.templates_path.as_deref())?;

        let mut orchestrator = Self::new(store, taxonomy, bank, GenerationSettings::from_config(generator))
            .with_resolver(TopicResolver::from_config(generator))
            .with_retry(RetryPolicy::from_config(&config.retry));

        if let Some(seed) = generator.seed {
            orchestrator = orchestrator.with_seed(seed);
        }
        Ok(orchestrator)
    }

    pub fn with_resolver(mut self, resolver: TopicResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Make generic question text reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Generate and persist sets until the target is passed or the taxonomy
    /// is exhausted
    #[instrument(skip(self), fields(target = self.settings.total_sets_target))]
    pub async fn run(&mut self) -> Result<GenerationReport, GeneratorError> {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let started = Instant::now();
        let target = self.settings.total_sets_target;

        info!(
            run_id = %run_id,
            set_size = self.settings.set_size,
            batch_size = self.settings.batch_size,
            resume = self.settings.resume,
            "Starting question set generation"
        );

        let mut state = RunState::new();
        let entries = self.taxonomy.entries().to_vec();

        'subjects: for (subject, chapters) in entries {
            let per_chapter = sets_per_chapter(self.settings.set_size, chapters);
            info!(subject = %subject, chapters, sets_per_chapter = per_chapter, "Generating subject");

            for chapter in 1..=chapters {
                let topic = self
                    .resolver
                    .resolve(self.store.as_ref(), &self.taxonomy, &self.retry, subject, chapter)
                    .await?;
                state.topics_resolved += 1;

                for _ in 0..per_chapter {
                    let set_number = state.next_set_number;
                    self.generate_set(&mut state, subject, chapter, &topic, set_number)
                        .await?;

                    state.next_set_number += 1;
                    if state.exhausted(target) {
                        break 'subjects;
                    }
                }
            }
        }

        let report = GenerationReport::from_state(run_id, started_at, &state, started.elapsed());
        info!(
            run_id = %run_id,
            sets_created = report.sets_created,
            sets_skipped = report.sets_skipped,
            questions = report.questions_generated,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Generation finished"
        );
        Ok(report)
    }

    async fn generate_set(
        &mut self,
        state: &mut RunState,
        subject: Subject,
        chapter: u32,
        topic: &Topic,
        set_number: u32,
    ) -> Result<(), GeneratorError> {
        // assembled before the resume check so a seeded run draws the same
        // sequence whether or not earlier sets are skipped
        let set = self
            .assembler
            .assemble(subject, chapter, topic.id, set_number, &mut self.rng)?;

        if self.settings.resume && self.already_stored(&set).await? {
            state.sets_skipped += 1;
            record_set_skipped(subject.name());
            info!(set_number, subject = %subject, chapter, "Set already stored, skipping");
            return Ok(());
        }

        let timer = SetTimer::start(subject.name());
        let store = self.store.as_ref();
        let batch_size = self.settings.batch_size;
        let source_type = set.source_type();
        let attempts = AtomicU32::new(0);
        let outcome = self
            .retry
            .run("persist_set", || async {
                // a commit whose acknowledgement was lost has already stored the set
                if attempts.fetch_add(1, Ordering::Relaxed) > 0 {
                    let stored = store.count_questions(set.topic_id, &source_type).await?;
                    if stored > 0 {
                        warn!(set_number, stored, "Set committed by an earlier attempt");
                        return Ok(BatchOutcome::committed(set.questions.len(), batch_size));
                    }
                }
                persist_set(store, &set.questions, batch_size).await
            })
            .await?;
        timer.finish(outcome.questions, outcome.batches);

        state.sets_created += 1;
        state.questions_generated += outcome.questions as u64;
        state.batches_written += outcome.batches as u64;

        info!(
            set_number,
            subject = %set.subject,
            chapter = set.chapter,
            topic_id = topic.id,
            questions = outcome.questions,
            "Set persisted"
        );
        Ok(())
    }

    async fn already_stored(&self, set: &QuestionSet) -> Result<bool, GeneratorError> {
        let store = self.store.as_ref();
        let source_type = source_type(set.set_number);
        let existing = self
            .retry
            .run("count_questions", || async {
                store
                    .count_questions(set.topic_id, &source_type)
                    .await
                    .map_err(GeneratorError::from)
            })
            .await?;

        debug!(set_number = set.set_number, existing, "Checked for stored set");
        Ok(existing > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizforge_common::config::TopicKeyMode;
    use quizforge_common::config::RetryConfig;
    use quizforge_common::store::{FaultKind, MemoryStore};

    fn settings(set_size: usize, target: u32, resume: bool) -> GenerationSettings {
        GenerationSettings {
            set_size,
            total_sets_target: target,
            batch_size: 20,
            resume,
        }
    }

    fn orchestrator(store: &MemoryStore, taxonomy: Vec<(Subject, u32)>, settings: GenerationSettings) -> Orchestrator {
        Orchestrator::new(
            Arc::new(store.clone()),
            Taxonomy::new(taxonomy).unwrap(),
            TemplateBank::builtin().unwrap(),
            settings,
        )
        .with_seed(2024)
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
    async fn test_single_set_end_to_end() {
        let store = MemoryStore::new();
        let report = orchestrator(&store, vec![(Subject::Physics, 1)], settings(100, 1, true))
            .run()
            .await
            .unwrap();

        assert_eq!(report.sets_created, 1);
        assert_eq!(report.questions_generated, 100);
        assert_eq!(report.batches_written, 5);

        let questions = store.questions().await;
        assert_eq!(questions.len(), 100);
        assert!(questions.iter().all(|q| q.source_type == "Generated Set 1"));
        assert_eq!(store.question_ids().await, (1..=100).collect::<Vec<i32>>());

        let topics = store.topics().await;
        assert_eq!(topics.len(), 1);
        assert!(questions.iter().all(|q| q.topic_id == topics[0].id));

        let summary = report.to_string();
        assert!(summary.contains("1 set "), "{}", summary);
        assert!(summary.contains("100 questions"), "{}", summary);
    }

    #[tokio::test]
    async fn test_stops_mid_chapter_at_target() {
        let store = MemoryStore::new();
        // ceil(10 / 4) = 3 sets per chapter; target 5 ends two sets into chapter 2
        let report = orchestrator(&store, vec![(Subject::Physics, 4)], settings(10, 5, true))
            .run()
            .await
            .unwrap();

        assert_eq!(report.sets_created, 5);
        assert_eq!(report.topics_resolved, 2);
        assert_eq!(store.topics().await.len(), 2);

        let questions = store.questions().await;
        assert_eq!(questions.len(), 50);
        assert_eq!(questions.last().unwrap().source_type, "Generated Set 5");
        assert!(report.to_string().starts_with("Created 5 sets (50 questions)"));
    }

    #[tokio::test]
    async fn test_taxonomy_exhausted_before_target() {
        let store = MemoryStore::new();
        let report = orchestrator(
            &store,
            vec![(Subject::Physics, 2), (Subject::Chemistry, 3)],
            settings(10, 500, true),
        )
        .run()
        .await
        .unwrap();

        // 2 chapters × 5 sets + 3 chapters × 4 sets
        assert_eq!(report.sets_created, 22);
        assert_eq!(report.topics_resolved, 5);
        assert_eq!(store.questions().await.len(), 220);
    }

    #[tokio::test]
    async fn test_failed_batch_aborts_run() {
        let store = MemoryStore::new();
        store.fail_batch(3, FaultKind::Permanent, 1).await;

        let result = orchestrator(&store, vec![(Subject::Physics, 1)], settings(100, 1, true))
            .run()
            .await;

        assert!(matches!(result, Err(GeneratorError::Store(_))));
        assert_eq!(store.batch_sizes().await, vec![20, 20, 20]);
        assert!(store.questions().await.is_empty());
    }

    #[tokio::test]
    async fn test_transient_batch_failure_is_retried() {
        let store = MemoryStore::new();
        store.fail_batch(2, FaultKind::Transient, 1).await;

        let report = orchestrator(&store, vec![(Subject::Zoology, 1)], settings(100, 1, true))
            .with_retry(fast_retry())
            .run()
            .await
            .unwrap();

        assert_eq!(report.sets_created, 1);
        assert_eq!(store.questions().await.len(), 100);
        // two attempts of the first set, the second one complete
        assert_eq!(store.batch_sizes().await.len(), 7);
    }

    #[tokio::test]
    async fn test_lost_commit_ack_does_not_rewrite_set() {
        let store = MemoryStore::new();
        store.lose_commit_acks(FaultKind::Transient, 1).await;

        let report = orchestrator(&store, vec![(Subject::Physics, 1)], settings(100, 1, true))
            .with_retry(fast_retry())
            .run()
            .await
            .unwrap();

        assert_eq!(report.sets_created, 1);
        assert_eq!(report.questions_generated, 100);
        assert_eq!(report.batches_written, 5);
        assert_eq!(store.questions().await.len(), 100);
        // the retry found the set stored and wrote no further batches
        assert_eq!(store.batch_sizes().await, vec![20; 5]);
    }

    #[tokio::test]
    async fn test_transient_resume_check_is_retried() {
        let store = MemoryStore::new();
        store.fail_counts(FaultKind::Transient, 2).await;

        let report = orchestrator(&store, vec![(Subject::Chemistry, 1)], settings(10, 1, true))
            .with_retry(fast_retry())
            .run()
            .await
            .unwrap();

        assert_eq!(report.sets_created, 1);
        assert_eq!(report.sets_skipped, 0);
        assert_eq!(store.questions().await.len(), 10);
    }

    #[tokio::test]
    async fn test_permanent_resume_check_failure_aborts() {
        let store = MemoryStore::new();
        store.fail_counts(FaultKind::Permanent, 1).await;

        let result = orchestrator(&store, vec![(Subject::Chemistry, 1)], settings(10, 1, true))
            .with_retry(fast_retry())
            .run()
            .await;

        assert!(matches!(result, Err(GeneratorError::Store(_))));
        assert!(store.batch_sizes().await.is_empty());
    }

    #[tokio::test]
    async fn test_same_seed_same_output() {
        let first = MemoryStore::new();
        let second = MemoryStore::new();

        for store in [&first, &second] {
            orchestrator(store, vec![(Subject::Botany, 3)], settings(20, 4, true))
                .run()
                .await
                .unwrap();
        }

        assert_eq!(first.questions().await, second.questions().await);
    }

    #[tokio::test]
    async fn test_resume_skips_stored_sets() {
        let store = MemoryStore::new();
        let taxonomy = vec![(Subject::Chemistry, 2)];

        orchestrator(&store, taxonomy.clone(), settings(10, 3, true))
            .run()
            .await
            .unwrap();
        let report = orchestrator(&store, taxonomy, settings(10, 7, true))
            .run()
            .await
            .unwrap();

        assert_eq!(report.sets_skipped, 3);
        assert_eq!(report.sets_created, 4);
        assert_eq!(store.questions().await.len(), 70);
        assert_eq!(store.topics().await.len(), 2);
        assert!(report.to_string().contains("skipped 3 existing sets"));
    }

    #[tokio::test]
    async fn test_resume_disabled_duplicates() {
        let store = MemoryStore::new();
        for _ in 0..2 {
            orchestrator(&store, vec![(Subject::Physics, 1)], settings(10, 1, false))
                .run()
                .await
                .unwrap();
        }

        let questions = store.questions().await;
        assert_eq!(questions.len(), 20);
        assert!(questions.iter().all(|q| q.source_type == "Generated Set 1"));
    }

    #[tokio::test]
    async fn test_chapter_name_mode_reuses_topics_across_subjects() {
        let store = MemoryStore::new();
        let resolver = TopicResolver::new(TopicKeyMode::ChapterName, "Class XI-XII", vec![]);

        let report = orchestrator(
            &store,
            vec![(Subject::Physics, 2), (Subject::Chemistry, 2)],
            settings(2, 500, true),
        )
        .with_resolver(resolver)
        .run()
        .await
        .unwrap();

        assert_eq!(report.topics_resolved, 4);
        assert_eq!(store.topics().await.len(), 2);
        assert_eq!(report.sets_created, 4);
    }
}
