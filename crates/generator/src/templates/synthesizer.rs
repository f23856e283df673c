//! Generic question synthesizer
//!
//! Fills the template pool past the curated entries with placeholder
//! questions built from a subject's concept vocabulary.

use super::QuestionTemplate;
use crate::taxonomy::{Difficulty, Subject};
use quizforge_common::store::AnswerOption;
use rand::Rng;

/// Option labels, in display order
pub const OPTION_LABELS: [&str; 4] = ["A", "B", "C", "D"];

/// Correct label for the generic question at `index`
pub fn correct_label(index: usize) -> &'static str {
    OPTION_LABELS[index % OPTION_LABELS.len()]
}

/// Build the generic question at pool position `index` (0-based)
pub fn synthesize<R: Rng + ?Sized>(
    subject: Subject,
    chapter: u32,
    difficulty: Difficulty,
    index: usize,
    rng: &mut R,
) -> QuestionTemplate {
    let concepts = subject.concepts();
    let concept = concepts[rng.gen_range(0..concepts.len())];
    let number = index + 1;
    let lowercase = subject.name().to_lowercase();

    QuestionTemplate {
        question: format!(
            "{} Chapter {} - Question {} ({} level): {}",
            subject,
            chapter,
            number,
            difficulty.label(),
            subject.prompt(concept)
        ),
        options: OPTION_LABELS
            .iter()
            .map(|label| AnswerOption {
                id: label.to_string(),
                text: format!("Option {} for {} question {}", label, lowercase, number),
            })
            .collect(),
        correct: correct_label(index).to_string(),
        solution: format!("Detailed solution for {} Ch.{} Q.{}", subject, chapter, number),
        steps: vec!["Step 1".into(), "Step 2".into(), "Step 3".into()],
        related_topics: vec![format!("Chapter {}", chapter)],
    }
}
