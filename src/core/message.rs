//! Posto message board.

use crate::{
    core::posto,
    entities::{PostoMember, PostoMessage, posto_member, posto_message},
    errors::{Error, Result},
    models::MemberStatus,
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use tracing::debug;

/// A stored message and the users who should hear about it.
#[derive(Debug, Clone)]
pub struct PostedMessage {
    /// The stored message
    pub message: posto_message::Model,
    /// Active members and the DPL, without the author
    pub recipients: Vec<i64>,
}

/// Stores a message on a posto's board.
///
/// Recipients are computed in the same call so the caller can notify them once the
/// message is stored.
pub async fn post_message<C>(
    db: &C,
    posto_id: i64,
    author_id: i64,
    body: &str,
) -> Result<PostedMessage>
where
    C: ConnectionTrait,
{
    let body = body.trim();
    if body.is_empty() {
        return Err(Error::validation("Message body cannot be empty"));
    }
    let target = posto::require_posto(db, posto_id).await?;

    let message = posto_message::ActiveModel {
        posto_id: Set(posto_id),
        author_id: Set(author_id),
        body: Set(body.to_string()),
        posted_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let mut recipients: Vec<i64> = PostoMember::find()
        .select_only()
        .column(posto_member::Column::StudentId)
        .filter(posto_member::Column::PostoId.eq(posto_id))
        .filter(posto_member::Column::Status.eq(MemberStatus::Active.as_str()))
        .into_tuple()
        .all(db)
        .await?;
    if let Some(dpl_id) = target.dpl_id {
        recipients.push(dpl_id);
    }
    recipients.retain(|&id| id != author_id);
    recipients.sort_unstable();
    recipients.dedup();

    debug!(message_id = message.id, recipients = recipients.len(), "Message posted");
    Ok(PostedMessage {
        message,
        recipients,
    })
}

/// Lists a posto's messages, oldest first.
pub async fn messages<C>(db: &C, posto_id: i64) -> Result<Vec<posto_message::Model>>
where
    C: ConnectionTrait,
{
    PostoMessage::find()
        .filter(posto_message::Column::PostoId.eq(posto_id))
        .order_by_asc(posto_message::Column::PostedAt)
        .order_by_asc(posto_message::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::posto::{MemberUpdate, add_member, create_posto, update_member};
    use crate::errors::ErrorKind;
    use crate::models::MemberPosition;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_post_message_recipients() -> Result<()> {
        let db = setup_test_db().await?;
        let fixture = seed_basic(&db).await?;
        let target = create_posto(
            &db,
            fixture.location.id,
            fixture.fiscal_year.id,
            Some(fixture.lecturer.id),
        )
        .await?;
        add_member(&db, target.id, fixture.students[0].id, MemberPosition::Kordes).await?;
        add_member(&db, target.id, fixture.students[1].id, MemberPosition::Anggota).await?;
        let away = add_member(&db, target.id, fixture.students[2].id, MemberPosition::Anggota).await?;
        update_member(
            &db,
            target.id,
            away.id,
            MemberUpdate {
                status: Some(MemberStatus::Withdrawn),
                ..Default::default()
            },
        )
        .await?;

        let posted = post_message(&db, target.id, fixture.students[0].id, " Rapat jam 8 ").await?;
        assert_eq!(posted.message.body, "Rapat jam 8");
        let mut expected = vec![fixture.students[1].id, fixture.lecturer.id];
        expected.sort_unstable();
        assert_eq!(posted.recipients, expected);

        post_message(&db, target.id, fixture.lecturer.id, "Siap").await?;
        let listed = messages(&db, target.id).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].body, "Rapat jam 8");
        Ok(())
    }

    #[tokio::test]
    async fn test_post_message_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let fixture = seed_basic(&db).await?;
        let target = create_posto(&db, fixture.location.id, fixture.fiscal_year.id, None).await?;

        let err = post_message(&db, target.id, fixture.students[0].id, "   ")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = post_message(&db, 9_999, fixture.students[0].id, "Halo")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        Ok(())
    }
}
