//! Content topic entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_topics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub subject: String,

    pub class_level: String,

    pub topic_name: String,

    #[sea_orm(nullable)]
    pub ncert_chapter: Option<String>,

    /// Reference book titles as a JSONB string array
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub reference_books: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::question::Entity")]
    Questions,
}

impl Related<super::question::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Questions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
