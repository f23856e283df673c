//! Subject taxonomy
//!
//! Subjects, difficulty tiers, and the ordered subject → chapter-count table
//! the orchestrator walks.

use crate::errors::GeneratorError;
use quizforge_common::config::SubjectEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A NEET subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subject {
    Physics,
    Chemistry,
    Botany,
    Zoology,
}

impl Subject {
    pub const ALL: [Subject; 4] = [
        Subject::Physics,
        Subject::Chemistry,
        Subject::Botany,
        Subject::Zoology,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Botany => "Botany",
            Subject::Zoology => "Zoology",
        }
    }

    /// Vocabulary injected into generic question text
    pub fn concepts(&self) -> &'static [&'static str] {
        match self {
            Subject::Physics => &[
                "force",
                "energy",
                "momentum",
                "acceleration",
                "velocity",
                "displacement",
                "work",
                "power",
            ],
            Subject::Chemistry => &[
                "compound", "reaction", "element", "bond", "molecule", "ion", "acid", "base",
            ],
            Subject::Botany => &[
                "photosynthesis",
                "respiration",
                "cell division",
                "transpiration",
                "osmosis",
                "diffusion",
            ],
            Subject::Zoology => &[
                "digestion",
                "circulation",
                "respiration",
                "excretion",
                "reproduction",
                "nervous system",
            ],
        }
    }

    /// Question stem for a generic question about `concept`
    pub fn prompt(&self, concept: &str) -> String {
        match self {
            Subject::Physics => format!("What is the {}?", concept),
            Subject::Chemistry => format!("Identify the {}", concept),
            Subject::Botany => format!("Which of the following is true about {}?", concept),
            Subject::Zoology => format!("What is the function of {}?", concept),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Subject {
    type Err = GeneratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subject::ALL
            .into_iter()
            .find(|subject| subject.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| GeneratorError::UnknownSubject(s.to_string()))
    }
}

/// Difficulty tier of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Stored `difficulty_level` value
    pub fn level(&self) -> i32 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    /// Label used in generic question text
    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Easy => "basic",
            Difficulty::Medium => "intermediate",
            Difficulty::Hard => "advanced",
        }
    }
}

/// Ordered subject → chapter count table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    entries: Vec<(Subject, u32)>,
}

impl Taxonomy {
    /// The NEET syllabus: Physics 22, Chemistry 44, Botany 37, Zoology 37
    pub fn neet() -> Self {
        Self {
            entries: vec![
                (Subject::Physics, 22),
                (Subject::Chemistry, 44),
                (Subject::Botany, 37),
                (Subject::Zoology, 37),
            ],
        }
    }

    pub fn new(entries: Vec<(Subject, u32)>) -> Result<Self, GeneratorError> {
        if entries.is_empty() {
            return Err(GeneratorError::ConfigError(
                "taxonomy must list at least one subject".to_string(),
            ));
        }

        for (i, (subject, chapters)) in entries.iter().enumerate() {
            if *chapters == 0 {
                return Err(GeneratorError::ConfigError(format!(
                    "subject {} has no chapters",
                    subject
                )));
            }
            if entries[..i].iter().any(|(s, _)| s == subject) {
                return Err(GeneratorError::ConfigError(format!(
                    "subject {} listed twice",
                    subject
                )));
            }
        }

        Ok(Self { entries })
    }

    /// Build from configuration, falling back to the NEET syllabus
    pub fn from_config(entries: Option<&[SubjectEntry]>) -> Result<Self, GeneratorError> {
        match entries {
            None => Ok(Self::neet()),
            Some(entries) => {
                let parsed = entries
                    .iter()
                    .map(|e| Ok((e.name.parse::<Subject>()?, e.chapters)))
                    .collect::<Result<Vec<_>, GeneratorError>>()?;
                Self::new(parsed)
            }
        }
    }

    pub fn entries(&self) -> &[(Subject, u32)] {
        &self.entries
    }

    pub fn subjects(&self) -> impl Iterator<Item = Subject> + '_ {
        self.entries.iter().map(|(s, _)| *s)
    }

    pub fn chapter_count(&self, subject: Subject) -> Option<u32> {
        self.entries
            .iter()
            .find(|(s, _)| *s == subject)
            .map(|(_, c)| *c)
    }

    /// Check that `chapter` is within `1..=chapter_count(subject)`
    pub fn validate_chapter(&self, subject: Subject, chapter: u32) -> Result<(), GeneratorError> {
        let max = self.chapter_count(subject).unwrap_or(0);
        if chapter == 0 || chapter > max {
            return Err(GeneratorError::InvalidChapter {
                subject: subject.to_string(),
                chapter,
                max,
            });
        }
        Ok(())
    }
}

/// Sets generated per chapter: `ceil(set_size / chapters)`
pub fn sets_per_chapter(set_size: usize, chapters: u32) -> usize {
    set_size.div_ceil(chapters.max(1) as usize)
}
