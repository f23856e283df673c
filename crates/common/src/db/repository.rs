//! Repository pattern for database operations
//!
//! Implements `QuestionStore` on top of SeaORM. Every question set is written
//! inside a single transaction.

use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::store::{
    NewQuestion, NewTopic, QuestionStore, SetWriter, Topic, TopicLookup, TopicStats,
    PLACEHOLDER_PATTERN,
};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, NotSet, PaginatorTrait, QueryFilter, QueryOrder, Set, Statement,
    TransactionTrait,
};
use std::collections::HashMap;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}

#[async_trait]
impl QuestionStore for Repository {
    // Lookups go to the primary: a lagging replica would let the
    // lookup-then-insert sequence create duplicate topics.
    async fn find_topic(&self, lookup: &TopicLookup) -> Result<Option<Topic>> {
        let mut query = ContentTopicEntity::find()
            .filter(ContentTopicColumn::TopicName.eq(lookup.topic_name.as_str()));

        if let Some(ref subject) = lookup.subject {
            query = query.filter(ContentTopicColumn::Subject.eq(subject.as_str()));
        }

        query
            .order_by_asc(ContentTopicColumn::Id)
            .one(self.write_conn())
            .await?
            .map(topic_from_model)
            .transpose()
    }

    async fn insert_topic(&self, topic: NewTopic) -> Result<Topic> {
        let model = ContentTopicActiveModel {
            id: NotSet,
            subject: Set(topic.subject),
            class_level: Set(topic.class_level),
            topic_name: Set(topic.topic_name),
            ncert_chapter: Set(topic.ncert_chapter),
            reference_books: Set(Some(serde_json::to_value(&topic.reference_books)?)),
        };

        let inserted = model.insert(self.write_conn()).await?;
        topic_from_model(inserted)
    }

    async fn count_questions(&self, topic_id: i32, source_type: &str) -> Result<u64> {
        QuestionEntity::find()
            .filter(QuestionColumn::TopicId.eq(topic_id))
            .filter(QuestionColumn::SourceType.eq(source_type))
            .count(self.write_conn())
            .await
            .map_err(Into::into)
    }

    async fn begin_set(&self) -> Result<Box<dyn SetWriter>> {
        let txn = self.write_conn().begin().await?;
        Ok(Box::new(TransactionSetWriter { txn: Some(txn) }))
    }

    async fn topic_stats(&self) -> Result<Vec<TopicStats>> {
        let topics = ContentTopicEntity::find()
            .order_by_asc(ContentTopicColumn::Id)
            .all(self.read_conn())
            .await?;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT
                topic_id,
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE question_text ~ $1) AS placeholders
            FROM questions
            GROUP BY topic_id
            "#,
            vec![PLACEHOLDER_PATTERN.into()],
        );

        let mut counts: HashMap<i32, (u64, u64)> = HashMap::new();
        for row in self.read_conn().query_all(stmt).await? {
            let topic_id: i32 = row.try_get("", "topic_id")?;
            let total: i64 = row.try_get("", "total")?;
            let placeholders: i64 = row.try_get("", "placeholders")?;
            counts.insert(topic_id, (total.max(0) as u64, placeholders.max(0) as u64));
        }

        topics
            .into_iter()
            .map(|model| {
                let (total, placeholders) = counts.get(&model.id).copied().unwrap_or((0, 0));
                Ok(TopicStats {
                    topic: topic_from_model(model)?,
                    total,
                    placeholders,
                })
            })
            .collect()
    }
}

/// Writes one question set inside a database transaction.
///
/// Dropping the writer before `commit` rolls the transaction back.
struct TransactionSetWriter {
    txn: Option<DatabaseTransaction>,
}

impl TransactionSetWriter {
    fn txn(&self) -> Result<&DatabaseTransaction> {
        self.txn.as_ref().ok_or_else(|| AppError::Transaction {
            message: "question set already committed".to_string(),
        })
    }
}

#[async_trait]
impl SetWriter for TransactionSetWriter {
    async fn insert_batch(&mut self, batch: &[NewQuestion]) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let models = batch
            .iter()
            .map(question_active_model)
            .collect::<Result<Vec<_>>>()?;

        QuestionEntity::insert_many(models).exec(self.txn()?).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let txn = self.txn.take().ok_or_else(|| AppError::Transaction {
            message: "question set already committed".to_string(),
        })?;

        txn.commit().await.map_err(Into::into)
    }
}

fn topic_from_model(model: ContentTopic) -> Result<Topic> {
    let reference_books = match model.reference_books {
        Some(value) => serde_json::from_value(value)?,
        None => Vec::new(),
    };

    Ok(Topic {
        id: model.id,
        subject: model.subject,
        class_level: model.class_level,
        topic_name: model.topic_name,
        ncert_chapter: model.ncert_chapter,
        reference_books,
    })
}

fn question_active_model(question: &NewQuestion) -> Result<QuestionActiveModel> {
    Ok(QuestionActiveModel {
        id: NotSet,
        topic_id: Set(question.topic_id),
        question_text: Set(question.question_text.clone()),
        options: Set(serde_json::to_value(&question.options)?),
        correct_answer: Set(question.correct_answer.clone()),
        solution_detail: Set(question.solution_detail.clone()),
        solution_steps: Set(Some(serde_json::to_value(&question.solution_steps)?)),
        difficulty_level: Set(question.difficulty_level),
        source_type: Set(question.source_type.clone()),
        related_topics: Set(Some(serde_json::to_value(&question.related_topics)?)),
        pyq_year: Set(None),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AnswerOption;

    #[test]
    fn test_question_active_model_serializes_json_columns() {
        let question = NewQuestion {
            topic_id: 4,
            question_text: "Avogadro's number is:".into(),
            options: vec![
                AnswerOption { id: "A".into(), text: "6.022 × 10²³".into() },
                AnswerOption { id: "B".into(), text: "6.022 × 10²²".into() },
            ],
            correct_answer: "A".into(),
            solution_detail: "NA = 6.022 × 10²³ mol⁻¹".into(),
            solution_steps: vec!["NA = 6.022 × 10²³ mol⁻¹".into()],
            difficulty_level: 2,
            source_type: "Generated Set 9".into(),
            related_topics: vec![],
        };

        let model = question_active_model(&question).unwrap();
        assert_eq!(model.topic_id, Set(4));
        assert_eq!(
            model.options,
            Set(serde_json::json!([
                {"id": "A", "text": "6.022 × 10²³"},
                {"id": "B", "text": "6.022 × 10²²"}
            ]))
        );
        assert_eq!(model.related_topics, Set(Some(serde_json::json!([]))));
        assert_eq!(model.pyq_year, Set(None));
    }

    #[test]
    fn test_topic_from_model_defaults_missing_books() {
        let model = ContentTopic {
            id: 3,
            subject: "Botany".into(),
            class_level: "Class XI-XII".into(),
            topic_name: "Chapter 2".into(),
            ncert_chapter: Some("Chapter 2".into()),
            reference_books: None,
        };

        let topic = topic_from_model(model).unwrap();
        assert_eq!(topic.id, 3);
        assert!(topic.reference_books.is_empty());
    }
}
