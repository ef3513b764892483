//! Posto entity - a field unit tying one location to one fiscal year.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Posto database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "postos")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, derived from the location
    pub name: String,
    /// Location the unit is deployed to
    pub location_id: i64,
    /// Fiscal year of the deployment
    pub fiscal_year_id: i64,
    /// Supervising lecturer
    pub dpl_id: Option<i64>,
    /// One of `draft`, `active`, `completed`
    pub status: String,
    /// When the posto was created
    pub created_at: DateTimeUtc,
    /// Last status or supervisor change
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Posto and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each posto belongs to one location
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,
    /// Each posto belongs to one fiscal year
    #[sea_orm(
        belongs_to = "super::fiscal_year::Entity",
        from = "Column::FiscalYearId",
        to = "super::fiscal_year::Column::Id"
    )]
    FiscalYear,
    /// One posto has many members
    #[sea_orm(has_many = "super::posto_member::Entity")]
    Members,
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<super::posto_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
