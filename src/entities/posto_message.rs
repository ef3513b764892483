//! Posto message entity - a post on a posto's message board.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Posto message database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posto_messages")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Posto the message was posted to
    pub posto_id: i64,
    /// Posting user
    pub author_id: i64,
    /// Message text
    pub body: String,
    /// When the message was posted
    pub posted_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each message belongs to one posto
    #[sea_orm(
        belongs_to = "super::posto::Entity",
        from = "Column::PostoId",
        to = "super::posto::Column::Id"
    )]
    Posto,
}

impl ActiveModelBehavior for ActiveModel {}
