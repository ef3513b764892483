//! Registration entity - one student's application to a fiscal year.
//!
//! Created on submission, then mutated only by administrative review (status,
//! DPL, notes) and by posto assignment (the `posto_id` link).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Registration database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "registrations")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Applying student
    pub student_id: i64,
    /// Fiscal year applied to
    pub fiscal_year_id: i64,
    /// Requested location, if any
    pub location_id: Option<i64>,
    /// Supervising lecturer assigned on review
    pub dpl_id: Option<i64>,
    /// One of `pending`, `approved`, `rejected`, `needs_revision`
    pub status: String,
    /// Reviewer notes
    pub notes: Option<String>,
    /// Posto the student has been assigned to
    pub posto_id: Option<i64>,
    /// Submission time
    pub created_at: DateTimeUtc,
    /// Last review or assignment change
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Registration and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each registration belongs to one fiscal year
    #[sea_orm(
        belongs_to = "super::fiscal_year::Entity",
        from = "Column::FiscalYearId",
        to = "super::fiscal_year::Column::Id"
    )]
    FiscalYear,
    /// Each registration may reference one location
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,
    /// Each registration may be linked to one posto
    #[sea_orm(
        belongs_to = "super::posto::Entity",
        from = "Column::PostoId",
        to = "super::posto::Column::Id"
    )]
    Posto,
    /// One registration has many attached documents
    #[sea_orm(has_many = "super::registration_document::Entity")]
    Documents,
    /// One registration has at most one grade
    #[sea_orm(has_one = "super::grade::Entity")]
    Grade,
}

impl Related<super::fiscal_year::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FiscalYear.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<super::registration_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Documents.def()
    }
}

impl Related<super::grade::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grade.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
