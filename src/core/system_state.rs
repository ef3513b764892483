//! Key-value bookkeeping in the `system_state` table.

use crate::{
    entities::{SystemState, system_state},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use tracing::{debug, instrument};

/// Key recording when the registry seed file was last applied.
pub const REGISTRY_SEEDED_AT: &str = "registry_seeded_at";

/// Retrieves a value from the `system_state` table.
///
/// Returns `Ok(None)` if the key does not exist.
#[instrument(skip(db))]
pub async fn get_value<C>(db: &C, key: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    let value = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?
        .map(|row| row.value);
    debug!("System state for key '{key}': {value:?}");
    Ok(value)
}

/// Sets or updates a value in the `system_state` table.
#[instrument(skip(db))]
pub async fn set_value<C>(db: &C, key: &str, value: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let existing = SystemState::find()
        .filter(system_state::Column::Key.eq(key))
        .one(db)
        .await?;

    match existing {
        Some(row) => {
            let mut active: system_state::ActiveModel = row.into();
            active.value = Set(value.to_string());
            active.updated_at = Set(now);
            active.update(db).await?;
        }
        None => {
            system_state::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value.to_string()),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_set_and_get_value() -> Result<()> {
        let db = setup_test_db().await?;

        assert!(get_value(&db, REGISTRY_SEEDED_AT).await?.is_none());

        set_value(&db, REGISTRY_SEEDED_AT, "first").await?;
        set_value(&db, REGISTRY_SEEDED_AT, "second").await?;
        assert_eq!(
            get_value(&db, REGISTRY_SEEDED_AT).await?.as_deref(),
            Some("second")
        );
        assert_eq!(SystemState::find().count(&db).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_updated_at_is_utc() -> Result<()> {
        let db = setup_test_db().await?;
        let before = Utc::now() - chrono::Duration::seconds(1);

        set_value(&db, REGISTRY_SEEDED_AT, "now").await?;
        let row = SystemState::find().one(&db).await?.unwrap();
        let id: i64 = row.id;
        assert!(id > 0);
        assert!(row.updated_at >= before);
        assert!(row.updated_at <= Utc::now());
        Ok(())
    }
}
