//! Student profile entity - academic and contact details captured on registration.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "student_profiles")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// The student this profile describes
    #[sea_orm(unique)]
    pub user_id: i64,
    /// Student number assigned by the study program (NIM)
    pub nim: Option<String>,
    /// Study program
    pub program: Option<String>,
    /// Faculty
    pub faculty: Option<String>,
    /// Phone number
    pub phone: Option<String>,
    /// Last time the profile was written
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each profile belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl ActiveModelBehavior for ActiveModel {}
