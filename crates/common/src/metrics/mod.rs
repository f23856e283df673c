//! Metrics and observability utilities
//!
//! Provides Prometheus-style metrics for the generation pipeline with
//! standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all QuizForge metrics
pub const METRICS_PREFIX: &str = "quizforge";

/// Buckets for set persistence latency (in seconds)
pub const PERSIST_BUCKETS: &[f64] = &[
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_sets_persisted_total", METRICS_PREFIX),
        Unit::Count,
        "Total question sets written to storage"
    );

    describe_counter!(
        format!("{}_sets_skipped_total", METRICS_PREFIX),
        Unit::Count,
        "Total question sets skipped because they were already stored"
    );

    describe_counter!(
        format!("{}_questions_inserted_total", METRICS_PREFIX),
        Unit::Count,
        "Total question records written to storage"
    );

    describe_counter!(
        format!("{}_batches_written_total", METRICS_PREFIX),
        Unit::Count,
        "Total insert batches submitted"
    );

    describe_counter!(
        format!("{}_storage_retries_total", METRICS_PREFIX),
        Unit::Count,
        "Total storage operations retried after a transient failure"
    );

    describe_counter!(
        format!("{}_topics_created_total", METRICS_PREFIX),
        Unit::Count,
        "Total topics created"
    );

    describe_histogram!(
        format!("{}_set_persist_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Time to write one question set"
    );

    tracing::debug!("Metrics registered");
}

/// Helper to time one set write
pub struct SetTimer {
    start: Instant,
    subject: String,
}

impl SetTimer {
    /// Start timing a set write
    pub fn start(subject: &str) -> Self {
        Self {
            start: Instant::now(),
            subject: subject.to_string(),
        }
    }

    /// Record a successful write of `questions` records in `batches` batches
    pub fn finish(self, questions: usize, batches: usize) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_sets_persisted_total", METRICS_PREFIX),
            "subject" => self.subject.clone()
        )
        .increment(1);

        counter!(
            format!("{}_questions_inserted_total", METRICS_PREFIX),
            "subject" => self.subject.clone()
        )
        .increment(questions as u64);

        counter!(format!("{}_batches_written_total", METRICS_PREFIX)).increment(batches as u64);

        histogram!(
            format!("{}_set_persist_duration_seconds", METRICS_PREFIX),
            "subject" => self.subject
        )
        .record(duration);
    }
}

/// Helper to record a set skipped on resume
pub fn record_set_skipped(subject: &str) {
    counter!(
        format!("{}_sets_skipped_total", METRICS_PREFIX),
        "subject" => subject.to_string()
    )
    .increment(1);
}

/// Helper to record a retried storage operation
pub fn record_retry(operation: &str) {
    counter!(
        format!("{}_storage_retries_total", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Helper to record topic creation
pub fn record_topic_created(subject: &str) {
    counter!(
        format!("{}_topics_created_total", METRICS_PREFIX),
        "subject" => subject.to_string()
    )
    .increment(1);
}
