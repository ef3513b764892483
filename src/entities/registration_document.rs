//! Registration document entity - a named attachment captured at submission.
//!
//! Only the storage reference returned by the document store is kept, never the bytes.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Registration document database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "registration_documents")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning registration
    pub registration_id: i64,
    /// Document name (e.g. `"krs"`, `"health_certificate"`)
    pub name: String,
    /// Reference returned by the document store
    pub path: String,
    /// When the document was attached
    pub uploaded_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each document belongs to one registration
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
