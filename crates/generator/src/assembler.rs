//! Question set assembly
//!
//! A set is easy questions, then medium, then hard, in a fixed 30/50/20 mix.

use crate::errors::GeneratorError;
use crate::taxonomy::{Difficulty, Subject};
use crate::templates::TemplateBank;
use quizforge_common::store::NewQuestion;
use rand::Rng;

/// Percentage of a set drawn from each tier, in set order
pub const DIFFICULTY_MIX: [(Difficulty, usize); 3] = [
    (Difficulty::Easy, 30),
    (Difficulty::Medium, 50),
    (Difficulty::Hard, 20),
];

/// `source_type` stamped on every question of set `set_number`
pub fn source_type(set_number: u32) -> String {
    format!("Generated Set {}", set_number)
}

/// Questions per tier for a set of `set_size`.
///
/// Easy and hard are rounded down; medium takes the remainder.
pub fn tier_counts(set_size: usize) -> [(Difficulty, usize); 3] {
    let easy = set_size * DIFFICULTY_MIX[0].1 / 100;
    let hard = set_size * DIFFICULTY_MIX[2].1 / 100;
    [
        (Difficulty::Easy, easy),
        (Difficulty::Medium, set_size - easy - hard),
        (Difficulty::Hard, hard),
    ]
}

/// One assembled question set
#[derive(Debug, Clone)]
pub struct QuestionSet {
    pub set_number: u32,
    pub subject: Subject,
    pub chapter: u32,
    pub topic_id: i32,
    pub questions: Vec<NewQuestion>,
}

impl QuestionSet {
    pub fn source_type(&self) -> String {
        source_type(self.set_number)
    }

    /// Check size, tier order, answer keys and stamping
    pub fn validate(&self, set_size: usize) -> Result<(), GeneratorError> {
        let invalid = |reason: String| GeneratorError::InvalidSet {
            set_number: self.set_number,
            reason,
        };

        if self.questions.len() != set_size {
            return Err(invalid(format!(
                "expected {} questions, found {}",
                set_size,
                self.questions.len()
            )));
        }

        let expected_levels = tier_counts(set_size)
            .into_iter()
            .flat_map(|(difficulty, count)| std::iter::repeat(difficulty.level()).take(count));
        let source_type = self.source_type();

        for (position, (question, level)) in self.questions.iter().zip(expected_levels).enumerate() {
            if question.difficulty_level != level {
                return Err(invalid(format!(
                    "question {} has difficulty {}, expected {}",
                    position + 1,
                    question.difficulty_level,
                    level
                )));
            }
            if question.correct_option_count() != 1 {
                return Err(invalid(format!(
                    "question {} answer {} does not match exactly one option",
                    position + 1,
                    question.correct_answer
                )));
            }
            if question.topic_id != self.topic_id || question.source_type != source_type {
                return Err(invalid(format!(
                    "question {} is not stamped for topic {} / {}",
                    position + 1,
                    self.topic_id,
                    source_type
                )));
            }
        }

        Ok(())
    }
}

/// Builds question sets from the template bank
#[derive(Debug, Clone)]
pub struct SetAssembler {
    bank: TemplateBank,
    set_size: usize,
}

impl SetAssembler {
    pub fn new(bank: TemplateBank, set_size: usize) -> Self {
        Self { bank, set_size }
    }

    /// Assemble and validate one set
    pub fn assemble<R: Rng + ?Sized>(
        &self,
        subject: Subject,
        chapter: u32,
        topic_id: i32,
        set_number: u32,
        rng: &mut R,
    ) -> Result<QuestionSet, GeneratorError> {
        let source_type = source_type(set_number);
        let mut questions = Vec::with_capacity(self.set_size);

        for (difficulty, count) in tier_counts(self.set_size) {
            if count == 0 {
                continue;
            }
            let pool = self.bank.templates_for(subject, chapter, difficulty, rng);

            // question numbers are 1-based within a tier
            for question_num in 1..=count {
                let template = &pool[question_num % pool.len()];
                questions.push(NewQuestion {
                    topic_id,
                    question_text: template.question.clone(),
                    options: template.options.clone(),
                    correct_answer: template.correct.clone(),
                    solution_detail: template.solution.clone(),
                    solution_steps: template.steps.clone(),
                    difficulty_level: difficulty.level(),
                    source_type: source_type.clone(),
                    related_topics: template.related_topics.clone(),
                });
            }
        }

        let set = QuestionSet {
            set_number,
            subject,
            chapter,
            topic_id,
            questions,
        };
        set.validate(self.set_size)?;
        Ok(set)
    }
}
