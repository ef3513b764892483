//! Region entity - Indonesian administrative regions.
//!
//! Regions form a tree: province → city → district → village. Domestic locations
//! point at one region of every level.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Region database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "regions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Official region code (e.g. `"33.74.10.1001"`)
    #[sea_orm(unique)]
    pub code: String,
    /// Region name
    pub name: String,
    /// One of `province`, `city`, `district`, `village`
    pub level: String,
    /// Parent region, `None` for provinces
    pub parent_id: Option<i64>,
}

/// Regions only reference each other through `parent_id`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
