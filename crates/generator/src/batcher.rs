//! Batched persistence of question sets
//!
//! A set is written through one `SetWriter` in sequential batches and
//! committed only after every batch succeeds.

use crate::errors::GeneratorError;
use quizforge_common::errors::AppError;
use quizforge_common::store::{NewQuestion, QuestionStore};
use tracing::{debug, instrument, warn};

/// Result of writing one set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub questions: usize,
    pub batches: usize,
}

impl BatchOutcome {
    /// Outcome of a set of `questions` that is already committed
    pub fn committed(questions: usize, batch_size: usize) -> Self {
        Self {
            questions,
            batches: questions.div_ceil(batch_size.max(1)),
        }
    }
}

/// Write `questions` in batches of at most `batch_size`, then commit.
///
/// The first failed batch aborts the set: no later batch is attempted and
/// the uncommitted writer is dropped, discarding everything already sent.
#[instrument(skip(store, questions), fields(questions = questions.len()))]
pub async fn persist_set(
    store: &dyn QuestionStore,
    questions: &[NewQuestion],
    batch_size: usize,
) -> Result<BatchOutcome, GeneratorError> {
    if batch_size == 0 {
        return Err(AppError::Validation {
            message: "batch size must be at least 1".to_string(),
            field: Some("generator.batch_size".to_string()),
        }
        .into());
    }

    let mut writer = store.begin_set().await?;
    let mut outcome = BatchOutcome::default();

    for (index, batch) in questions.chunks(batch_size).enumerate() {
        debug!(batch = index + 1, size = batch.len(), "Writing batch");

        if let Err(e) = writer.insert_batch(batch).await {
            warn!(batch = index + 1, error = %e, "Batch insert failed, discarding set");
            return Err(e.into());
        }

        outcome.batches += 1;
        outcome.questions += batch.len();
    }

    writer.commit().await?;
    Ok(outcome)
}
