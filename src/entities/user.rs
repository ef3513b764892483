//! User entity - local mirror of the identity provider's users and their role.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Identifier issued by the identity provider
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Full name, printed on certificates
    pub name: String,
    /// Login e-mail
    #[sea_orm(unique)]
    pub email: String,
    /// One of `student`, `lecturer`, `admin`, `staff`
    pub role: String,
}

/// Users are referenced by id from registrations, postos and members
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
