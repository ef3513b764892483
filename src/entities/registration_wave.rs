//! Registration wave entity - a window inside a fiscal year during which
//! students may submit registrations.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Registration wave database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "registration_waves")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning fiscal year
    pub fiscal_year_id: i64,
    /// Display name (e.g. `"Gelombang 1"`)
    pub name: String,
    /// Start of the window (inclusive)
    pub opens_at: DateTimeUtc,
    /// End of the window (exclusive)
    pub closes_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each wave belongs to one fiscal year
    #[sea_orm(
        belongs_to = "super::fiscal_year::Entity",
        from = "Column::FiscalYearId",
        to = "super::fiscal_year::Column::Id"
    )]
    FiscalYear,
}

impl Related<super::fiscal_year::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FiscalYear.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
