//! Curation progress report
//!
//! Summarises how many stored questions are curated versus generic
//! placeholders, per subject and per topic.

use crate::errors::GeneratorError;
use crate::taxonomy::Subject;
use quizforge_common::store::{QuestionStore, TopicStats};
use std::fmt;

const RULE_WIDTH: usize = 70;
const FOCUS_COUNT: usize = 5;

/// Curated share of a question count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Completion {
    pub total: u64,
    pub curated: u64,
}

impl Completion {
    pub fn placeholders(&self) -> u64 {
        self.total.saturating_sub(self.curated)
    }

    /// Curated percentage; an empty count is 0%
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.curated as f64 * 100.0 / self.total as f64
    }

    fn add(&mut self, other: Completion) {
        self.total += other.total;
        self.curated += other.curated;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicProgress {
    pub topic_id: i32,
    pub subject: String,
    pub topic_name: String,
    pub completion: Completion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectProgress {
    pub subject: String,
    pub completion: Completion,
    pub topics: Vec<TopicProgress>,
}

/// Progress across every stored topic
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub overall: Completion,
    pub subjects: Vec<SubjectProgress>,
}

impl ProgressReport {
    /// Query the store and build the report
    pub async fn collect(store: &dyn QuestionStore, order: &[Subject]) -> Result<Self, GeneratorError> {
        let stats = store.topic_stats().await?;
        Ok(Self::from_stats(stats, order))
    }

    /// Group per-topic counts by subject.
    ///
    /// Subjects listed in `order` come first, in that order; any other
    /// stored subject follows alphabetically.
    pub fn from_stats(stats: Vec<TopicStats>, order: &[Subject]) -> Self {
        let mut names: Vec<String> = order.iter().map(|s| s.to_string()).collect();
        let mut extra: Vec<String> = stats
            .iter()
            .map(|s| s.topic.subject.clone())
            .filter(|name| !names.contains(name))
            .collect();
        extra.sort();
        extra.dedup();
        names.extend(extra);

        let mut overall = Completion::default();
        let subjects = names
            .into_iter()
            .map(|subject| {
                let topics: Vec<TopicProgress> = stats
                    .iter()
                    .filter(|s| s.topic.subject == subject)
                    .map(|s| TopicProgress {
                        topic_id: s.topic.id,
                        subject: s.topic.subject.clone(),
                        topic_name: s.topic.topic_name.clone(),
                        completion: Completion {
                            total: s.total,
                            curated: s.curated(),
                        },
                    })
                    .collect();

                let mut completion = Completion::default();
                for topic in &topics {
                    completion.add(topic.completion);
                }
                overall.add(completion);

                SubjectProgress {
                    subject,
                    completion,
                    topics,
                }
            })
            .collect();

        Self { overall, subjects }
    }

    /// Topics with the lowest curated share, lowest first
    pub fn lowest(&self, count: usize) -> Vec<&TopicProgress> {
        let mut topics: Vec<&TopicProgress> = self.subjects.iter().flat_map(|s| &s.topics).collect();
        topics.sort_by(|a, b| a.completion.percent().total_cmp(&b.completion.percent()));
        topics.truncate(count);
        topics
    }
}

/// `width`-cell bar filled to `percent`
pub fn bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).floor() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

fn status(percent: f64) -> char {
    if percent >= 100.0 {
        '✓'
    } else if percent > 50.0 {
        '~'
    } else {
        '✗'
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        let overall = self.overall;

        writeln!(f, "NEET Question Database Progress Report")?;
        writeln!(f, "{}", rule)?;
        writeln!(f)?;
        writeln!(f, "Overall Statistics:")?;
        writeln!(f, "   Total Questions: {}", overall.total)?;
        writeln!(
            f,
            "   Curated Questions: {} ({:.1}%)",
            overall.curated,
            overall.percent()
        )?;
        let placeholder_percent = if overall.total == 0 {
            0.0
        } else {
            100.0 - overall.percent()
        };
        writeln!(
            f,
            "   Placeholders: {} ({:.1}%)",
            overall.placeholders(),
            placeholder_percent
        )?;
        writeln!(f)?;
        writeln!(f, "   Progress: [{}] {:.1}%", bar(overall.percent(), 50), overall.percent())?;
        writeln!(f)?;
        writeln!(f, "{}", rule)?;

        for subject in &self.subjects {
            let completion = subject.completion;
            writeln!(f)?;
            writeln!(f, "{}", subject.subject.to_uppercase())?;
            writeln!(
                f,
                "   Total: {} | Curated: {} | Placeholders: {}",
                completion.total,
                completion.curated,
                completion.placeholders()
            )?;
            writeln!(f, "   [{}] {:.1}%", bar(completion.percent(), 20), completion.percent())?;

            for topic in &subject.topics {
                let percent = topic.completion.percent();
                writeln!(
                    f,
                    "   {} {:<30} [{}] {}/{}",
                    status(percent),
                    topic.topic_name,
                    bar(percent, 10),
                    topic.completion.curated,
                    topic.completion.total
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "{}", rule)?;

        let lowest = self.lowest(FOCUS_COUNT);
        if !lowest.is_empty() {
            writeln!(f)?;
            writeln!(f, "Lowest completion:")?;
            for (i, topic) in lowest.iter().enumerate() {
                writeln!(
                    f,
                    "   {}. {} - {} (topic {}): {}/{} ({:.1}%)",
                    i + 1,
                    topic.subject,
                    topic.topic_name,
                    topic.topic_id,
                    topic.completion.curated,
                    topic.completion.total,
                    topic.completion.percent()
                )?;
            }
        }

        Ok(())
    }
}
