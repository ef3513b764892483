//! User directory - the local mirror of the identity provider.
//!
//! The engine never manages credentials. It only needs to know who exists and which
//! role they hold so that role-restricted targets (students joining a posto, lecturers
//! supervising one) can be checked inside the same transaction as the write.

use crate::{
    entities::{User, user},
    errors::{Error, Result},
    models::Role,
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::debug;

/// Inserts or refreshes a user as reported by the identity provider.
///
/// The email is the natural key: an existing row with the same email keeps its id
/// and gets its name and role overwritten.
pub async fn upsert_user<C>(db: &C, name: &str, email: &str, role: Role) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    if name.trim().is_empty() {
        return Err(Error::validation("User name cannot be empty"));
    }
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(Error::validation(format!("Invalid email address: {email}")));
    }

    let existing = User::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;

    if let Some(found) = existing {
        debug!(user_id = found.id, %role, "Refreshing user");
        let mut active: user::ActiveModel = found.into();
        active.name = Set(name.trim().to_string());
        active.role = Set(role.as_str().to_string());
        return active.update(db).await.map_err(Into::into);
    }

    user::ActiveModel {
        name: Set(name.trim().to_string()),
        email: Set(email),
        role: Set(role.as_str().to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a user by id.
pub async fn get_user<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by id, failing with `NotFound` when absent.
pub async fn require_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    get_user(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))
}

/// Lists all users holding a role, ordered by name.
pub async fn list_users_with_role<C>(db: &C, role: Role) -> Result<Vec<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Role.eq(role.as_str()))
        .order_by_asc(user::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Returns the stored role of a user.
pub fn role_of(user: &user::Model) -> Result<Role> {
    user.role.parse()
}

/// Loads a user and checks they hold `role`.
///
/// A missing user or a different role both produce the error built by `mismatch`,
/// so callers decide whether that is a `Role` or a `Validation` failure.
pub async fn ensure_role<C, F>(db: &C, user_id: i64, role: Role, mismatch: F) -> Result<user::Model>
where
    C: ConnectionTrait,
    F: FnOnce(String) -> Error,
{
    let Some(found) = get_user(db, user_id).await? else {
        return Err(mismatch(format!("user {user_id} does not exist")));
    };
    if role_of(&found)? == role {
        Ok(found)
    } else {
        Err(mismatch(format!(
            "user {user_id} ({}) does not hold the {role} role",
            found.name
        )))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::ErrorKind;
    use crate::test_utils::setup_test_db;

    #[tokio::test]
    async fn test_upsert_user_keeps_id_for_same_email() -> Result<()> {
        let db = setup_test_db().await?;

        let first = upsert_user(&db, "Siti Aminah", "Siti@Kampus.ac.id", Role::Student).await?;
        assert_eq!(first.email, "siti@kampus.ac.id");

        let second = upsert_user(&db, "Siti Aminah", "siti@kampus.ac.id", Role::Staff).await?;
        assert_eq!(first.id, second.id);
        assert_eq!(role_of(&second)?, Role::Staff);
        Ok(())
    }

    #[tokio::test]
    async fn test_upsert_user_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let err = upsert_user(&db, "  ", "a@b.c", Role::Student).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = upsert_user(&db, "Budi", "not-an-email", Role::Student)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        Ok(())
    }

    #[tokio::test]
    async fn test_ensure_role() -> Result<()> {
        let db = setup_test_db().await?;
        let lecturer = upsert_user(&db, "Dr. Hartono", "hartono@kampus.ac.id", Role::Lecturer).await?;

        let ok = ensure_role(&db, lecturer.id, Role::Lecturer, Error::validation).await?;
        assert_eq!(ok.id, lecturer.id);

        let err = ensure_role(&db, lecturer.id, Role::Student, Error::role)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Role);

        let err = ensure_role(&db, 9_999, Role::Lecturer, Error::validation)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let lecturers = list_users_with_role(&db, Role::Lecturer).await?;
        assert_eq!(lecturers.len(), 1);
        Ok(())
    }
}
