//! Question entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "questions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub topic_id: i32,

    #[sea_orm(column_type = "Text")]
    pub question_text: String,

    /// Answer options as JSONB `[{id, text}]`
    #[sea_orm(column_type = "JsonBinary")]
    pub options: Json,

    pub correct_answer: String,

    #[sea_orm(column_type = "Text")]
    pub solution_detail: String,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub solution_steps: Option<Json>,

    /// 1 = easy, 2 = medium, 3 = hard
    pub difficulty_level: i32,

    pub source_type: String,

    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub related_topics: Option<Json>,

    pub pyq_year: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::content_topic::Entity",
        from = "Column::TopicId",
        to = "super::content_topic::Column::Id"
    )]
    Topic,
}

impl Related<super::content_topic::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Topic.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
