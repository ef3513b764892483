//! Fiscal year entity - the administrative window (KKN period) scoping
//! registrations, locations and postos.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fiscal year database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fiscal_years")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name (e.g. `"KKN 2026/2027"`)
    pub name: String,
    /// Calendar year the period starts in
    pub year: i32,
    /// At most one fiscal year carries this flag
    pub is_active: bool,
    /// When the period was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `FiscalYear` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One fiscal year has many locations
    #[sea_orm(has_many = "super::location::Entity")]
    Locations,
    /// One fiscal year has many registrations
    #[sea_orm(has_many = "super::registration::Entity")]
    Registrations,
    /// One fiscal year has many registration waves
    #[sea_orm(has_many = "super::registration_wave::Entity")]
    Waves,
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Locations.def()
    }
}

impl Related<super::registration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Registrations.def()
    }
}

impl Related<super::registration_wave::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Waves.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
