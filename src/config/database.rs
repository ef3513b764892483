//! Database configuration module for the KKN engine.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, then the composite and partial unique indexes
//! that back the engine's uniqueness invariants are added with plain SQL.

use crate::entities::{
    FiscalYear, Grade, Location, Posto, PostoMember, PostoMessage, Region, Registration,
    RegistrationDocument, RegistrationWave, StudentProfile, SystemState, User,
};
use crate::errors::{Error, Result};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use std::path::Path;
use tracing::{debug, info};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/kkn.sqlite?mode=rwc";

/// Unique indexes that cannot be expressed on a single entity column.
///
/// The leadership index only covers the three unique positions; `humas` and
/// `publikasi` allow two holders and are enforced in code.
const UNIQUE_INDEXES: &[&str] = &[
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_registrations_student_fiscal_year
        ON registrations(student_id, fiscal_year_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_postos_location_fiscal_year
        ON postos(location_id, fiscal_year_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_posto_members_posto_student
        ON posto_members(posto_id, student_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_posto_members_leadership
        ON posto_members(posto_id, position)
        WHERE position IN ('kordes', 'sekretaris', 'bendahara')",
];

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Creates the directory holding a file-backed `SQLite` database.
fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let file = rest.split('?').next().unwrap_or(rest);
    if let Some(parent) = Path::new(file).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| Error::Config {
            message: format!("Failed to create database directory {}: {e}", parent.display()),
        })?;
    }
    Ok(())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file when the variable is not set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    ensure_sqlite_dir(&database_url)?;
    debug!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E, C>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and unique indexes.
///
/// Tables are created parents first so the generated foreign keys resolve on
/// backends that check them eagerly.
pub async fn create_tables<C>(db: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Region).await?;
    create_table(db, &schema, FiscalYear).await?;
    create_table(db, &schema, RegistrationWave).await?;
    create_table(db, &schema, User).await?;
    create_table(db, &schema, StudentProfile).await?;
    create_table(db, &schema, Location).await?;
    create_table(db, &schema, Posto).await?;
    create_table(db, &schema, Registration).await?;
    create_table(db, &schema, RegistrationDocument).await?;
    create_table(db, &schema, PostoMember).await?;
    create_table(db, &schema, PostoMessage).await?;
    create_table(db, &schema, Grade).await?;
    create_table(db, &schema, SystemState).await?;

    for index in UNIQUE_INDEXES {
        db.execute_unprepared(index).await?;
    }

    info!("Database tables and unique indexes ensured");
    Ok(())
}
