//! SeaORM entity models
//!
//! Database entities for the topic/question store

mod content_topic;
mod question;

pub use content_topic::{
    Entity as ContentTopicEntity,
    Model as ContentTopic,
    ActiveModel as ContentTopicActiveModel,
    Column as ContentTopicColumn,
};

pub use question::{
    Entity as QuestionEntity,
    Model as Question,
    ActiveModel as QuestionActiveModel,
    Column as QuestionColumn,
};
