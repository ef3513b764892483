//! Posto member entity - joins a student (and optionally their registration) to a posto
//! with a position.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Posto member database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "posto_members")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Posto the member belongs to
    pub posto_id: i64,
    /// Member student
    pub student_id: i64,
    /// Originating registration, `None` for manual assignments
    pub registration_id: Option<i64>,
    /// One of `kordes`, `sekretaris`, `bendahara`, `humas`, `publikasi`, `anggota`
    pub position: String,
    /// One of `active`, `inactive`, `withdrawn`
    pub status: String,
    /// When the member joined
    pub joined_at: DateTimeUtc,
    /// Free-text notes
    pub notes: Option<String>,
}

/// Defines relationships between `PostoMember` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each member row belongs to one posto
    #[sea_orm(
        belongs_to = "super::posto::Entity",
        from = "Column::PostoId",
        to = "super::posto::Column::Id"
    )]
    Posto,
    /// Each member row may reference its registration
    #[sea_orm(
        belongs_to = "super::registration::Entity",
        from = "Column::RegistrationId",
        to = "super::registration::Column::Id"
    )]
    Registration,
}

impl Related<super::posto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posto.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
