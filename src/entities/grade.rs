//! Grade entity - the final score of an approved registration and its certificate number.
//!
//! The certificate number is assigned once and reused on every later score update.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Grade database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "grades")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Graded registration (one grade per registration)
    #[sea_orm(unique)]
    pub registration_id: i64,
    /// Numeric score in `[0, 100]`
    pub score: f64,
    /// Letter grade derived from the score
    pub letter: String,
    /// Certificate number, immutable once set
    pub certificate_number: Option<String>,
    /// User who last recorded the score
    pub graded_by: Option<i64>,
    /// When the grade was first recorded
    pub graded_at: DateTimeUtc,
    /// When the score was last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Grade and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each grade belongs to one registration
    #[sea_orm(
        belongs_to = "super::registration::Entity",
        from = "Column::RegistrationId",
        to = "super::registration::Column::Id"
    )]
    Registration,
}

impl Related<super::registration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Registration.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
