//! Question template bank
//!
//! Curated templates are keyed by (subject, chapter, difficulty). A record
//! without a difficulty applies to every tier. Each lookup is padded with
//! synthesized questions up to [`TEMPLATE_POOL_SIZE`] entries.

mod synthesizer;

pub use synthesizer::synthesize;

use crate::errors::GeneratorError;
use crate::taxonomy::{Difficulty, Subject};
use quizforge_common::store::AnswerOption;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Entries per (subject, chapter, difficulty) pool
pub const TEMPLATE_POOL_SIZE: usize = 100;

const BUILTIN_TEMPLATES: &str = include_str!("../../data/curated_templates.json");

/// Blueprint for one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionTemplate {
    pub question: String,
    pub options: Vec<AnswerOption>,
    pub correct: String,
    pub solution: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub related_topics: Vec<String>,
}

impl QuestionTemplate {
    fn validate(&self) -> Result<(), String> {
        if self.question.trim().is_empty() {
            return Err("question text is empty".to_string());
        }
        if self.options.is_empty() {
            return Err("no options".to_string());
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(option.id.as_str()) {
                return Err(format!("duplicate option id {}", option.id));
            }
        }

        if !seen.contains(self.correct.as_str()) {
            return Err(format!("correct answer {} is not an option", self.correct));
        }
        Ok(())
    }
}

/// One record of the curated template file
#[derive(Debug, Clone, Deserialize)]
struct CuratedRecord {
    subject: Subject,
    chapter: u32,
    #[serde(default)]
    difficulty: Option<Difficulty>,
    #[serde(flatten)]
    template: QuestionTemplate,
}

/// Lookup table of curated templates
#[derive(Debug, Clone, Default)]
pub struct TemplateBank {
    curated: HashMap<(Subject, u32, Difficulty), Vec<QuestionTemplate>>,
    records: usize,
}

impl TemplateBank {
    /// Bank built from the curated data compiled into the binary
    pub fn builtin() -> Result<Self, GeneratorError> {
        Self::from_json(BUILTIN_TEMPLATES)
    }

    /// Parse and validate a JSON array of curated records
    pub fn from_json(json: &str) -> Result<Self, GeneratorError> {
        let records: Vec<CuratedRecord> = serde_json::from_str(json)?;
        let mut bank = Self::default();

        for record in records {
            if record.chapter == 0 {
                return Err(GeneratorError::InvalidTemplate {
                    subject: record.subject.to_string(),
                    chapter: 0,
                    reason: "chapters start at 1".to_string(),
                });
            }

            record
                .template
                .validate()
                .map_err(|reason| GeneratorError::InvalidTemplate {
                    subject: record.subject.to_string(),
                    chapter: record.chapter,
                    reason,
                })?;

            let tiers = match record.difficulty {
                Some(difficulty) => vec![difficulty],
                None => Difficulty::ALL.to_vec(),
            };
            for difficulty in tiers {
                bank.curated
                    .entry((record.subject, record.chapter, difficulty))
                    .or_default()
                    .push(record.template.clone());
            }
            bank.records += 1;
        }

        debug!(records = bank.records, "Curated templates parsed");
        Ok(bank)
    }

    /// Read curated records from a file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GeneratorError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    /// External file when configured, the compiled-in data otherwise
    pub fn load(path: Option<&str>) -> Result<Self, GeneratorError> {
        let bank = match path {
            Some(path) => {
                info!(path = %path, "Loading curated templates from file");
                Self::from_path(path)?
            }
            None => Self::builtin()?,
        };

        info!(records = bank.record_count(), "Template bank ready");
        Ok(bank)
    }

    /// Number of curated records loaded
    pub fn record_count(&self) -> usize {
        self.records
    }

    /// Curated templates for one tier of a chapter
    pub fn curated(&self, subject: Subject, chapter: u32, difficulty: Difficulty) -> &[QuestionTemplate] {
        self.curated
            .get(&(subject, chapter, difficulty))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Curated templates followed by synthesized ones, at least
    /// [`TEMPLATE_POOL_SIZE`] entries
    pub fn templates_for<R: Rng + ?Sized>(
        &self,
        subject: Subject,
        chapter: u32,
        difficulty: Difficulty,
        rng: &mut R,
    ) -> Vec<QuestionTemplate> {
        let curated = self.curated(subject, chapter, difficulty);
        let mut pool = Vec::with_capacity(TEMPLATE_POOL_SIZE.max(curated.len()));
        pool.extend_from_slice(curated);

        for index in pool.len()..TEMPLATE_POOL_SIZE {
            pool.push(synthesize(subject, chapter, difficulty, index, rng));
        }
        pool
    }
}
