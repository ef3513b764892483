//! Posto assignment engine.
//!
//! Groups approved registrations into field units, enforces the leadership slots
//! (`kordes`, `sekretaris`, `bendahara` unique; `humas`, `publikasi` at most two),
//! keeps the registration ↔ posto link in sync and drives the posto lifecycle
//! `draft → active → completed`.
//!
//! Every path that places a member in a position goes through
//! [`ensure_position_slot`], so single adds, updates and bulk assignment enforce the
//! same limits. The posto row is write-locked before any slot is counted.

use crate::{
    core::{registration, registry, user},
    entities::{
        Posto, PostoMember, PostoMessage, Registration, posto, posto_member, posto_message,
        registration as registration_entity,
    },
    errors::{Error, Result},
    models::{MemberPosition, MemberStatus, PostoStatus, RegistrationStatus, Role},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, instrument, warn};

/// Creates a draft posto for a location in a fiscal year.
///
/// Fails with `Conflict` if the pair already has a posto and with `Validation` if the
/// location belongs to another fiscal year or `dpl_id` is not a lecturer.
#[instrument(skip(db))]
pub async fn create_posto(
    db: &DatabaseConnection,
    location_id: i64,
    fiscal_year_id: i64,
    dpl_id: Option<i64>,
) -> Result<posto::Model> {
    let txn = db.begin().await?;

    registry::require_fiscal_year(&txn, fiscal_year_id).await?;
    let location = registry::require_location(&txn, location_id).await?;
    if location.fiscal_year_id != fiscal_year_id {
        return Err(Error::validation(format!(
            "Location {} is not offered in fiscal year {fiscal_year_id}",
            location.name
        )));
    }

    if posto_for_location(&txn, location_id, fiscal_year_id)
        .await?
        .is_some()
    {
        return Err(Error::conflict(format!(
            "A posto already exists for {} in fiscal year {fiscal_year_id}",
            location.name
        )));
    }

    if let Some(dpl_id) = dpl_id {
        user::ensure_role(&txn, dpl_id, Role::Lecturer, Error::validation).await?;
    }

    let now = Utc::now();
    let created = posto::ActiveModel {
        name: Set(format!("Posto {}", location.name)),
        location_id: Set(location_id),
        fiscal_year_id: Set(fiscal_year_id),
        dpl_id: Set(dpl_id),
        status: Set(PostoStatus::Draft.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    info!(posto_id = created.id, "Posto created");
    Ok(created)
}

/// Finds the posto of a location in a fiscal year.
pub async fn posto_for_location<C>(
    db: &C,
    location_id: i64,
    fiscal_year_id: i64,
) -> Result<Option<posto::Model>>
where
    C: ConnectionTrait,
{
    Posto::find()
        .filter(posto::Column::LocationId.eq(location_id))
        .filter(posto::Column::FiscalYearId.eq(fiscal_year_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a posto by id, failing with `NotFound` when absent.
pub async fn require_posto<C>(db: &C, posto_id: i64) -> Result<posto::Model>
where
    C: ConnectionTrait,
{
    Posto::find_by_id(posto_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Posto", posto_id))
}

/// Lists the postos of a fiscal year, ordered by name.
pub async fn list_postos<C>(db: &C, fiscal_year_id: i64) -> Result<Vec<posto::Model>>
where
    C: ConnectionTrait,
{
    Posto::find()
        .filter(posto::Column::FiscalYearId.eq(fiscal_year_id))
        .order_by_asc(posto::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Parses the stored status of a posto.
pub fn status_of(posto: &posto::Model) -> Result<PostoStatus> {
    posto.status.parse()
}

/// Takes the write lock on a posto row before role slots are counted.
async fn lock_posto<C>(db: &C, posto_id: i64) -> Result<posto::Model>
where
    C: ConnectionTrait,
{
    let result = Posto::update_many()
        .col_expr(posto::Column::Status, Expr::col(posto::Column::Status).into())
        .filter(posto::Column::Id.eq(posto_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Posto", posto_id));
    }
    require_posto(db, posto_id).await
}

fn ensure_editable(posto: &posto::Model) -> Result<()> {
    if status_of(posto)? == PostoStatus::Completed {
        return Err(Error::conflict(format!(
            "{} is completed, its members can no longer change",
            posto.name
        )));
    }
    Ok(())
}

/// Changes (or clears) the supervising lecturer of a posto.
#[instrument(skip(db))]
pub async fn assign_dpl(
    db: &DatabaseConnection,
    posto_id: i64,
    dpl_id: Option<i64>,
) -> Result<posto::Model> {
    let txn = db.begin().await?;
    let posto = require_posto(&txn, posto_id).await?;
    if let Some(dpl_id) = dpl_id {
        user::ensure_role(&txn, dpl_id, Role::Lecturer, Error::validation).await?;
    }

    let mut active: posto::ActiveModel = posto.into();
    active.dpl_id = Set(dpl_id);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Deletes a draft posto, releasing every member's registration.
#[instrument(skip(db))]
pub async fn delete_posto(db: &DatabaseConnection, posto_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let posto = lock_posto(&txn, posto_id).await?;
    if status_of(&posto)? != PostoStatus::Draft {
        return Err(Error::conflict(format!(
            "{} is {}, only draft postos can be deleted",
            posto.name, posto.status
        )));
    }

    Registration::update_many()
        .col_expr(
            registration_entity::Column::PostoId,
            Expr::value(Option::<i64>::None).into(),
        )
        .filter(registration_entity::Column::PostoId.eq(posto_id))
        .exec(&txn)
        .await?;
    PostoMember::delete_many()
        .filter(posto_member::Column::PostoId.eq(posto_id))
        .exec(&txn)
        .await?;
    PostoMessage::delete_many()
        .filter(posto_message::Column::PostoId.eq(posto_id))
        .exec(&txn)
        .await?;
    posto.delete(&txn).await?;

    txn.commit().await?;
    info!(posto_id, "Posto deleted");
    Ok(())
}

/// Whether another member may take `position` when `current_holders` already hold it.
#[must_use]
pub const fn position_slot_available(position: MemberPosition, current_holders: u64) -> bool {
    match position.limit() {
        Some(limit) => current_holders < limit,
        None => true,
    }
}

/// Counts members of a posto holding a position, optionally ignoring one member row.
async fn count_position_holders<C>(
    db: &C,
    posto_id: i64,
    position: MemberPosition,
    excluding_member_id: Option<i64>,
) -> Result<u64>
where
    C: ConnectionTrait,
{
    let mut query = PostoMember::find()
        .filter(posto_member::Column::PostoId.eq(posto_id))
        .filter(posto_member::Column::Position.eq(position.as_str()));
    if let Some(member_id) = excluding_member_id {
        query = query.filter(posto_member::Column::Id.ne(member_id));
    }
    query.count(db).await.map_err(Into::into)
}

/// Fails with `Capacity` when `position` has no free slot in the posto.
pub async fn ensure_position_slot<C>(
    db: &C,
    posto_id: i64,
    position: MemberPosition,
    excluding_member_id: Option<i64>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let holders = count_position_holders(db, posto_id, position, excluding_member_id).await?;
    if position_slot_available(position, holders) {
        Ok(())
    } else {
        Err(Error::capacity(format!(
            "Position {position} is full ({holders} of {})",
            position.limit().unwrap_or(holders)
        )))
    }
}

/// Finds the member row of a student in a posto.
pub async fn find_member<C>(db: &C, posto_id: i64, student_id: i64) -> Result<Option<posto_member::Model>>
where
    C: ConnectionTrait,
{
    PostoMember::find()
        .filter(posto_member::Column::PostoId.eq(posto_id))
        .filter(posto_member::Column::StudentId.eq(student_id))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_member_of<C>(db: &C, posto_id: i64, member_id: i64) -> Result<posto_member::Model>
where
    C: ConnectionTrait,
{
    PostoMember::find_by_id(member_id)
        .filter(posto_member::Column::PostoId.eq(posto_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Posto member", member_id))
}

/// Finds the approved registration that matches a posto's location and fiscal year.
async fn approved_registration_for<C>(
    db: &C,
    posto: &posto::Model,
    student_id: i64,
) -> Result<Option<registration_entity::Model>>
where
    C: ConnectionTrait,
{
    Registration::find()
        .filter(registration_entity::Column::StudentId.eq(student_id))
        .filter(registration_entity::Column::FiscalYearId.eq(posto.fiscal_year_id))
        .filter(registration_entity::Column::LocationId.eq(posto.location_id))
        .filter(registration_entity::Column::Status.eq(RegistrationStatus::Approved.as_str()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Shared body of single and bulk assignment. The caller holds the posto lock.
async fn place_member<C>(
    db: &C,
    posto: &posto::Model,
    student_id: i64,
    position: MemberPosition,
    require_registration: bool,
) -> Result<posto_member::Model>
where
    C: ConnectionTrait,
{
    user::ensure_role(db, student_id, Role::Student, Error::role).await?;

    if find_member(db, posto.id, student_id).await?.is_some() {
        return Err(Error::duplicate(format!(
            "Student {student_id} is already a member of {}",
            posto.name
        )));
    }

    ensure_position_slot(db, posto.id, position, None).await?;

    let linked = approved_registration_for(db, posto, student_id).await?;
    if linked.is_none() && require_registration {
        return Err(Error::not_found(
            "Approved registration",
            format!("student {student_id} at {}", posto.name),
        ));
    }

    let now = Utc::now();
    let member = posto_member::ActiveModel {
        posto_id: Set(posto.id),
        student_id: Set(student_id),
        registration_id: Set(linked.as_ref().map(|r| r.id)),
        position: Set(position.as_str().to_string()),
        status: Set(MemberStatus::Active.as_str().to_string()),
        joined_at: Set(now),
        notes: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    match linked {
        Some(found) => {
            let mut active: registration_entity::ActiveModel = found.into();
            active.posto_id = Set(Some(posto.id));
            active.updated_at = Set(now);
            active.update(db).await?;
        }
        None => {
            debug!(student_id, posto_id = posto.id, "Member added without a registration");
        }
    }

    Ok(member)
}

/// Adds a student to a posto in a position.
///
/// Fails with `Role`, `Duplicate` or `Capacity` before any write. The student's
/// approved registration for the posto's location and fiscal year is linked when one
/// exists; otherwise the member is created unlinked.
#[instrument(skip(db))]
pub async fn add_member(
    db: &DatabaseConnection,
    posto_id: i64,
    student_id: i64,
    position: MemberPosition,
) -> Result<posto_member::Model> {
    let txn = db.begin().await?;
    let posto = lock_posto(&txn, posto_id).await?;
    ensure_editable(&posto)?;

    let member = place_member(&txn, &posto, student_id, position, false).await?;

    txn.commit().await?;
    info!(member_id = member.id, %position, "Member added");
    Ok(member)
}

/// Changes applied by [`update_member`]. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct MemberUpdate {
    /// New position
    pub position: Option<MemberPosition>,
    /// New participation status
    pub status: Option<MemberStatus>,
    /// New notes
    pub notes: Option<String>,
}

/// Updates a member's position, status or notes.
///
/// A position change re-checks the slot limit, not counting the member's own row.
#[instrument(skip(db, update))]
pub async fn update_member(
    db: &DatabaseConnection,
    posto_id: i64,
    member_id: i64,
    update: MemberUpdate,
) -> Result<posto_member::Model> {
    let txn = db.begin().await?;
    let posto = lock_posto(&txn, posto_id).await?;
    ensure_editable(&posto)?;
    let member = require_member_of(&txn, posto_id, member_id).await?;

    let current_position: MemberPosition = member.position.parse()?;
    let mut active: posto_member::ActiveModel = member.into();

    if let Some(position) = update.position {
        if position != current_position {
            ensure_position_slot(&txn, posto_id, position, Some(member_id)).await?;
            active.position = Set(position.as_str().to_string());
        }
    }
    if let Some(status) = update.status {
        active.status = Set(status.as_str().to_string());
    }
    if let Some(notes) = update.notes {
        active.notes = Set(Some(notes).filter(|n| !n.trim().is_empty()));
    }
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Removes a member and releases their registration for reassignment.
#[instrument(skip(db))]
pub async fn remove_member(db: &DatabaseConnection, posto_id: i64, member_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let posto = lock_posto(&txn, posto_id).await?;
    ensure_editable(&posto)?;
    let member = require_member_of(&txn, posto_id, member_id).await?;
    let registration_id = member.registration_id;

    member.delete(&txn).await?;

    if let Some(registration_id) = registration_id {
        if let Some(found) = registration::get_registration(&txn, registration_id).await? {
            if found.posto_id == Some(posto_id) {
                let mut active: registration_entity::ActiveModel = found.into();
                active.posto_id = Set(None);
                active.updated_at = Set(Utc::now());
                active.update(&txn).await?;
            }
        }
    }

    txn.commit().await?;
    info!(member_id, "Member removed");
    Ok(())
}

/// One item of a bulk assignment that was not applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkAssignFailure {
    /// Student of the failed item
    pub student_id: i64,
    /// Requested position
    pub position: MemberPosition,
    /// Why the item was skipped
    pub reason: String,
}

impl fmt::Display for BulkAssignFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "student {} as {}: {}",
            self.student_id, self.position, self.reason
        )
    }
}

/// Outcome of [`bulk_assign`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkAssignResult {
    /// Number of members created
    pub assigned_count: usize,
    /// Members created, in input order
    pub assigned: Vec<posto_member::Model>,
    /// Items that were skipped, in input order
    pub errors: Vec<BulkAssignFailure>,
}

/// Assigns many students at once.
///
/// Each item runs in its own savepoint inside one transaction. Logical failures
/// (not a student, already a member, position full, no approved registration) are
/// recorded and the batch continues; the successful items commit together. Only a
/// storage failure aborts the whole batch.
#[instrument(skip(db, items), fields(items = items.len()))]
pub async fn bulk_assign(
    db: &DatabaseConnection,
    posto_id: i64,
    items: &[(i64, MemberPosition)],
) -> Result<BulkAssignResult> {
    let txn = db.begin().await?;
    let posto = lock_posto(&txn, posto_id).await?;
    ensure_editable(&posto)?;

    let mut result = BulkAssignResult::default();
    for &(student_id, position) in items {
        let item = txn.begin().await?;
        match place_member(&item, &posto, student_id, position, true).await {
            Ok(member) => {
                item.commit().await?;
                result.assigned_count += 1;
                result.assigned.push(member);
            }
            Err(err) if err.is_infrastructure() => return Err(err),
            Err(err) => {
                item.rollback().await?;
                warn!(student_id, %position, error = %err, "Bulk assignment item skipped");
                result.errors.push(BulkAssignFailure {
                    student_id,
                    position,
                    reason: err.to_string(),
                });
            }
        }
    }

    txn.commit().await?;
    info!(
        assigned = result.assigned_count,
        failed = result.errors.len(),
        "Bulk assignment finished"
    );
    Ok(result)
}

/// Approved registrations of a fiscal year whose student is in no posto of that year.
pub async fn list_available_students<C>(
    db: &C,
    fiscal_year_id: i64,
    location_id: Option<i64>,
) -> Result<Vec<registration_entity::Model>>
where
    C: ConnectionTrait,
{
    let assigned = registration::assigned_student_ids(db, fiscal_year_id).await?;

    let mut query = Registration::find()
        .filter(registration_entity::Column::FiscalYearId.eq(fiscal_year_id))
        .filter(registration_entity::Column::Status.eq(RegistrationStatus::Approved.as_str()));
    if let Some(location_id) = location_id {
        query = query.filter(registration_entity::Column::LocationId.eq(location_id));
    }
    if !assigned.is_empty() {
        query = query.filter(registration_entity::Column::StudentId.is_not_in(assigned));
    }

    query
        .order_by_asc(registration_entity::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the members of a posto in joining order.
pub async fn members<C>(db: &C, posto_id: i64) -> Result<Vec<posto_member::Model>>
where
    C: ConnectionTrait,
{
    PostoMember::find()
        .filter(posto_member::Column::PostoId.eq(posto_id))
        .order_by_asc(posto_member::Column::JoinedAt)
        .order_by_asc(posto_member::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// True iff the positions include every leadership position.
#[must_use]
pub fn covers_leadership<I>(positions: I) -> bool
where
    I: IntoIterator<Item = MemberPosition>,
{
    let held: HashSet<MemberPosition> = positions.into_iter().collect();
    MemberPosition::leadership()
        .iter()
        .all(|position| held.contains(position))
}

/// True iff active members hold `kordes`, `sekretaris` and `bendahara`.
pub async fn is_complete<C>(db: &C, posto_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let leadership: Vec<&str> = MemberPosition::leadership()
        .iter()
        .map(MemberPosition::as_str)
        .collect();
    let leaders = PostoMember::find()
        .filter(posto_member::Column::PostoId.eq(posto_id))
        .filter(posto_member::Column::Status.eq(MemberStatus::Active.as_str()))
        .filter(posto_member::Column::Position.is_in(leadership))
        .all(db)
        .await?;

    let positions = leaders
        .iter()
        .map(|member| member.position.parse::<MemberPosition>())
        .collect::<Result<Vec<_>>>()?;
    Ok(covers_leadership(positions))
}

/// Moves a posto forward in its lifecycle.
///
/// Illegal transitions fail with `Conflict`. Activation fails with `Validation` unless
/// the posto is complete at call time; the status is unchanged on failure.
#[instrument(skip(db))]
pub async fn set_status(
    db: &DatabaseConnection,
    posto_id: i64,
    target: PostoStatus,
) -> Result<posto::Model> {
    let txn = db.begin().await?;
    let posto = lock_posto(&txn, posto_id).await?;
    let current = status_of(&posto)?;

    if !current.can_transition_to(target) {
        return Err(Error::conflict(format!(
            "{} cannot move from {current} to {target}",
            posto.name
        )));
    }
    if target == PostoStatus::Active && !is_complete(&txn, posto_id).await? {
        return Err(Error::validation(format!(
            "{} needs an active kordes, sekretaris and bendahara before it can be activated",
            posto.name
        )));
    }

    let mut active: posto::ActiveModel = posto.into();
    active.status = Set(target.as_str().to_string());
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    info!(posto_id, from = %current, to = %target, "Posto status changed");
    Ok(updated)
}

/// A posto with its members.
#[derive(Debug, Clone, Serialize)]
pub struct PostoDetail {
    /// The posto
    pub posto: posto::Model,
    /// Its members
    pub members: Vec<posto_member::Model>,
    /// Whether the leadership is complete
    pub complete: bool,
}

/// Loads a posto together with its members and completeness.
pub async fn posto_detail<C>(db: &C, posto_id: i64) -> Result<PostoDetail>
where
    C: ConnectionTrait,
{
    let posto = require_posto(db, posto_id).await?;
    let members = members(db, posto_id).await?;
    let complete = is_complete(db, posto_id).await?;
    Ok(PostoDetail {
        posto,
        members,
        complete,
    })
}
