//! Location entity - a placement site with a fixed registration quota.
//!
//! Domestic locations carry a full province → village region path; international
//! locations carry a free-text country and no region references.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Location database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Fiscal year this location is offered in
    pub fiscal_year_id: i64,
    /// Display name
    pub name: String,
    /// Maximum number of registrations accepted
    pub quota: i32,
    /// Whether this location is abroad
    pub is_international: bool,
    /// Province region (domestic only)
    pub province_id: Option<i64>,
    /// City region (domestic only)
    pub city_id: Option<i64>,
    /// District region (domestic only)
    pub district_id: Option<i64>,
    /// Village region (domestic only)
    pub village_id: Option<i64>,
    /// Country name (international only)
    pub country: Option<String>,
    /// Optional description shown to applicants
    pub description: Option<String>,
    /// When the location was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Location and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each location belongs to one fiscal year
    #[sea_orm(
        belongs_to = "super::fiscal_year::Entity",
        from = "Column::FiscalYearId",
        to = "super::fiscal_year::Column::Id"
    )]
    FiscalYear,
    /// One location has many registrations
    #[sea_orm(has_many = "super::registration::Entity")]
    Registrations,
}

impl Related<super::fiscal_year::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FiscalYear.def()
    }
}

impl Related<super::registration::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Registrations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
