//! Registration workflow - submission, administrative review and role-scoped listing.
//!
//! Submission enforces one registration per student per fiscal year and the location
//! quota. The quota check locks the location row first so that the count and the
//! insert happen under the same write lock.

use crate::{
    core::{registry, user},
    entities::{
        Posto, PostoMember, Registration, RegistrationDocument, StudentProfile, posto,
        posto_member, registration, registration_document, student_profile,
    },
    errors::{Error, Result},
    models::{RegistrationStatus, Role},
};
use chrono::Utc;
use sea_orm::{
    Condition, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Query,
};
use tracing::{debug, info, instrument};

/// Profile fields captured with a registration. `None` leaves the stored value as is.
#[derive(Debug, Clone, Default)]
pub struct ProfileFields {
    /// Student number assigned by the study program (NIM)
    pub nim: Option<String>,
    /// Study program
    pub program: Option<String>,
    /// Faculty
    pub faculty: Option<String>,
    /// Phone number
    pub phone: Option<String>,
}

/// A document already placed in the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// Document name (e.g. `"krs"`)
    pub name: String,
    /// Reference returned by the document store
    pub path: String,
}

/// Everything a student submits.
#[derive(Debug, Clone, Default)]
pub struct NewRegistration {
    /// Applying student
    pub student_id: i64,
    /// Fiscal year applied to
    pub fiscal_year_id: i64,
    /// Requested location
    pub location_id: Option<i64>,
    /// Profile fields to upsert
    pub profile: ProfileFields,
    /// Attachments captured with the submission
    pub documents: Vec<DocumentRef>,
}

fn clean(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Writes the provided profile fields for a student, creating the profile if needed.
pub async fn upsert_profile<C>(
    db: &C,
    student_id: i64,
    fields: &ProfileFields,
) -> Result<student_profile::Model>
where
    C: ConnectionTrait,
{
    let existing = StudentProfile::find()
        .filter(student_profile::Column::UserId.eq(student_id))
        .one(db)
        .await?;

    let is_new = existing.is_none();
    let mut active = existing.map_or_else(
        || student_profile::ActiveModel {
            user_id: Set(student_id),
            nim: Set(None),
            program: Set(None),
            faculty: Set(None),
            phone: Set(None),
            ..Default::default()
        },
        Into::into,
    );

    if let Some(nim) = clean(fields.nim.as_ref()) {
        active.nim = Set(Some(nim));
    }
    if let Some(program) = clean(fields.program.as_ref()) {
        active.program = Set(Some(program));
    }
    if let Some(faculty) = clean(fields.faculty.as_ref()) {
        active.faculty = Set(Some(faculty));
    }
    if let Some(phone) = clean(fields.phone.as_ref()) {
        active.phone = Set(Some(phone));
    }
    active.updated_at = Set(Utc::now());

    let saved = if is_new {
        active.insert(db).await?
    } else {
        active.update(db).await?
    };
    Ok(saved)
}

/// Finds the profile of a student.
pub async fn get_profile<C>(db: &C, student_id: i64) -> Result<Option<student_profile::Model>>
where
    C: ConnectionTrait,
{
    StudentProfile::find()
        .filter(student_profile::Column::UserId.eq(student_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Submits a registration in `pending` status.
///
/// Fails with `Role` if the applicant is not a student, `Duplicate` if they already
/// registered for the fiscal year and `Capacity` if the location quota is reached.
/// The profile upsert, the registration and its documents commit together.
#[instrument(skip(db, input), fields(student_id = input.student_id, fiscal_year_id = input.fiscal_year_id))]
pub async fn submit(db: &DatabaseConnection, input: NewRegistration) -> Result<registration::Model> {
    if input
        .documents
        .iter()
        .any(|doc| doc.name.trim().is_empty() || doc.path.trim().is_empty())
    {
        return Err(Error::validation("Every document needs a name and a stored path"));
    }

    let txn = db.begin().await?;

    user::ensure_role(&txn, input.student_id, Role::Student, Error::role).await?;
    registry::require_fiscal_year(&txn, input.fiscal_year_id).await?;

    if registration_for(&txn, input.student_id, input.fiscal_year_id)
        .await?
        .is_some()
    {
        return Err(Error::duplicate(format!(
            "Student {} is already registered for fiscal year {}",
            input.student_id, input.fiscal_year_id
        )));
    }

    if let Some(location_id) = input.location_id {
        registry::lock_location(&txn, location_id).await?;
        let location = registry::require_location(&txn, location_id).await?;
        if location.fiscal_year_id != input.fiscal_year_id {
            return Err(Error::validation(format!(
                "Location {} is not offered in fiscal year {}",
                location.name, input.fiscal_year_id
            )));
        }
        let registered = registry::count_location_registrations(&txn, location_id).await?;
        if registered >= registry::quota_limit(location.quota) {
            return Err(Error::capacity(format!(
                "Location {} has reached its quota of {}",
                location.name, location.quota
            )));
        }
    }

    upsert_profile(&txn, input.student_id, &input.profile).await?;

    let now = Utc::now();
    let created = registration::ActiveModel {
        student_id: Set(input.student_id),
        fiscal_year_id: Set(input.fiscal_year_id),
        location_id: Set(input.location_id),
        dpl_id: Set(None),
        status: Set(RegistrationStatus::Pending.as_str().to_string()),
        notes: Set(None),
        posto_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for doc in input.documents {
        registration_document::ActiveModel {
            registration_id: Set(created.id),
            name: Set(doc.name.trim().to_string()),
            path: Set(doc.path),
            uploaded_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    info!(registration_id = created.id, "Registration submitted");
    Ok(created)
}

/// An administrative review decision.
#[derive(Debug, Clone)]
pub struct ReviewDecision {
    /// New status
    pub status: RegistrationStatus,
    /// Reviewer notes; replaces the previous notes
    pub notes: Option<String>,
    /// Supervising lecturer to assign; `None` keeps the current one
    pub dpl_id: Option<i64>,
}

/// Result of a review.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    /// The registration after review
    pub registration: registration::Model,
    /// Posto the student was released from because the registration left `approved`
    pub released_from_posto: Option<i64>,
}

/// Applies an administrative review.
///
/// Any status may follow any other so that admins can correct earlier decisions. When
/// a registration linked to a posto moves away from `approved`, the student's member
/// row in that posto is removed and the link cleared in the same transaction.
#[instrument(skip(db, decision), fields(status = %decision.status))]
pub async fn review(
    db: &DatabaseConnection,
    registration_id: i64,
    decision: ReviewDecision,
) -> Result<ReviewOutcome> {
    let txn = db.begin().await?;

    let current = require_registration(&txn, registration_id).await?;
    if let Some(dpl_id) = decision.dpl_id {
        user::ensure_role(&txn, dpl_id, Role::Lecturer, Error::validation).await?;
    }

    let released_from_posto = match current.posto_id {
        Some(posto_id) if decision.status != RegistrationStatus::Approved => {
            let removed = PostoMember::delete_many()
                .filter(posto_member::Column::PostoId.eq(posto_id))
                .filter(posto_member::Column::StudentId.eq(current.student_id))
                .exec(&txn)
                .await?;
            debug!(posto_id, rows = removed.rows_affected, "Released student from posto");
            Some(posto_id)
        }
        _ => None,
    };

    let notes = clean(decision.notes.as_ref());
    let mut active: registration::ActiveModel = current.into();
    active.status = Set(decision.status.as_str().to_string());
    active.notes = Set(notes);
    if let Some(dpl_id) = decision.dpl_id {
        active.dpl_id = Set(Some(dpl_id));
    }
    if released_from_posto.is_some() {
        active.posto_id = Set(None);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    info!(registration_id, "Registration reviewed");
    Ok(ReviewOutcome {
        registration: updated,
        released_from_posto,
    })
}

/// Finds a registration by id.
pub async fn get_registration<C>(db: &C, registration_id: i64) -> Result<Option<registration::Model>>
where
    C: ConnectionTrait,
{
    Registration::find_by_id(registration_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a registration by id, failing with `NotFound` when absent.
pub async fn require_registration<C>(db: &C, registration_id: i64) -> Result<registration::Model>
where
    C: ConnectionTrait,
{
    get_registration(db, registration_id)
        .await?
        .ok_or_else(|| Error::not_found("Registration", registration_id))
}

/// Finds a student's registration for a fiscal year.
pub async fn registration_for<C>(
    db: &C,
    student_id: i64,
    fiscal_year_id: i64,
) -> Result<Option<registration::Model>>
where
    C: ConnectionTrait,
{
    Registration::find()
        .filter(registration::Column::StudentId.eq(student_id))
        .filter(registration::Column::FiscalYearId.eq(fiscal_year_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists the documents attached to a registration.
pub async fn documents<C>(db: &C, registration_id: i64) -> Result<Vec<registration_document::Model>>
where
    C: ConnectionTrait,
{
    RegistrationDocument::find()
        .filter(registration_document::Column::RegistrationId.eq(registration_id))
        .order_by_asc(registration_document::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Which registrations a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationScope {
    /// Only the student's own registrations
    Own(i64),
    /// Registrations this lecturer supervises directly or through a posto
    Supervised(i64),
    /// Everything
    All,
}

/// Optional filters applied on top of the scope.
#[derive(Debug, Clone, Default)]
pub struct RegistrationFilter {
    /// Restrict to a fiscal year
    pub fiscal_year_id: Option<i64>,
    /// Restrict to a status
    pub status: Option<RegistrationStatus>,
    /// Restrict to a location
    pub location_id: Option<i64>,
    /// Restrict to a posto
    pub posto_id: Option<i64>,
    /// Restrict to students of a faculty
    pub faculty: Option<String>,
    /// Restrict to students of a study program
    pub program: Option<String>,
}

fn students_with_profile(column: student_profile::Column, value: &str) -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .column(student_profile::Column::UserId)
        .from(StudentProfile)
        .and_where(column.eq(value))
        .to_owned()
}

/// Lists registrations visible in `scope`, newest first.
pub async fn list_registrations<C>(
    db: &C,
    scope: RegistrationScope,
    filter: &RegistrationFilter,
) -> Result<Vec<registration::Model>>
where
    C: ConnectionTrait,
{
    let mut condition = Condition::all();

    match scope {
        RegistrationScope::Own(student_id) => {
            condition = condition.add(registration::Column::StudentId.eq(student_id));
        }
        RegistrationScope::Supervised(dpl_id) => {
            let supervised_postos = Query::select()
                .column(posto::Column::Id)
                .from(Posto)
                .and_where(posto::Column::DplId.eq(dpl_id))
                .to_owned();
            condition = condition.add(
                Condition::any()
                    .add(registration::Column::DplId.eq(dpl_id))
                    .add(registration::Column::PostoId.in_subquery(supervised_postos)),
            );
        }
        RegistrationScope::All => {}
    }

    if let Some(fiscal_year_id) = filter.fiscal_year_id {
        condition = condition.add(registration::Column::FiscalYearId.eq(fiscal_year_id));
    }
    if let Some(status) = filter.status {
        condition = condition.add(registration::Column::Status.eq(status.as_str()));
    }
    if let Some(location_id) = filter.location_id {
        condition = condition.add(registration::Column::LocationId.eq(location_id));
    }
    if let Some(posto_id) = filter.posto_id {
        condition = condition.add(registration::Column::PostoId.eq(posto_id));
    }
    if let Some(faculty) = &filter.faculty {
        condition = condition.add(
            registration::Column::StudentId
                .in_subquery(students_with_profile(student_profile::Column::Faculty, faculty)),
        );
    }
    if let Some(program) = &filter.program {
        condition = condition.add(
            registration::Column::StudentId
                .in_subquery(students_with_profile(student_profile::Column::Program, program)),
        );
    }

    Registration::find()
        .filter(condition)
        .order_by_desc(registration::Column::CreatedAt)
        .order_by_desc(registration::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Student ids already holding a member row in any posto of the fiscal year.
pub(crate) async fn assigned_student_ids<C>(db: &C, fiscal_year_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    let posto_ids: Vec<i64> = Posto::find()
        .select_only()
        .column(posto::Column::Id)
        .filter(posto::Column::FiscalYearId.eq(fiscal_year_id))
        .into_tuple()
        .all(db)
        .await?;
    if posto_ids.is_empty() {
        return Ok(Vec::new());
    }

    PostoMember::find()
        .select_only()
        .column(posto_member::Column::StudentId)
        .filter(posto_member::Column::PostoId.is_in(posto_ids))
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::ErrorKind;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_submit_creates_pending_registration_with_documents() -> Result<()> {
        let db = setup_test_db().await?;
        let fixture = seed_basic(&db).await?;
        let student = &fixture.students[0];

        let created = submit(
            &db,
            NewRegistration {
                student_id: student.id,
                fiscal_year_id: fixture.fiscal_year.id,
                location_id: Some(fixture.location.id),
                profile: ProfileFields {
                    nim: Some("A11.2022.14001".to_string()),
                    program: Some("Teknik Informatika".to_string()),
                    faculty: Some("Ilmu Komputer".to_string()),
                    phone: None,
                },
                documents: vec![
                    DocumentRef {
                        name: "krs".to_string(),
                        path: "registrations/krs-1.pdf".to_string(),
                    },
                    DocumentRef {
                        name: "health_certificate".to_string(),
                        path: "registrations/health-1.pdf".to_string(),
                    },
                ],
            },
        )
        .await?;

        assert_eq!(created.status, "pending");
        assert_eq!(created.location_id, Some(fixture.location.id));
        assert!(created.posto_id.is_none());

        let docs = documents(&db, created.id).await?;
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "krs");

        let profile = get_profile(&db, student.id).await?.unwrap();
        assert_eq!(profile.nim.as_deref(), Some("A11.2022.14001"));
        assert_eq!(profile.faculty.as_deref(), Some("Ilmu Komputer"));
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_twice_for_same_year_is_duplicate() -> Result<()> {
        let db = setup_test_db().await?;
        let fixture = seed_basic(&db).await?;
        let student = &fixture.students[0];

        submit(&db, new_registration(&fixture, 0)).await?;
        let err = submit(&db, new_registration(&fixture, 0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);

        let rows = Registration::find()
            .filter(registration::Column::StudentId.eq(student.id))
            .count(&db)
            .await?;
        assert_eq!(rows, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_respects_location_quota() -> Result<()> {
        let db = setup_test_db().await?;
        let fixture = seed_basic(&db).await?;
        registry::update_location_quota(&db, fixture.location.id, 2).await?;

        submit(&db, new_registration(&fixture, 0)).await?;
        submit(&db, new_registration(&fixture, 1)).await?;
        let err = submit(&db, new_registration(&fixture, 2)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);

        let registered = registry::count_location_registrations(&db, fixture.location.id).await?;
        assert_eq!(registered, 2);

        // The rejected student left no profile behind either
        assert!(get_profile(&db, fixture.students[2].id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_without_location_ignores_quota() -> Result<()> {
        let db = setup_test_db().await?;
        let fixture = seed_basic(&db).await?;
        registry::update_location_quota(&db, fixture.location.id, 0).await?;

        let mut input = new_registration(&fixture, 0);
        input.location_id = None;
        let created = submit(&db, input).await?;
        assert!(created.location_id.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_rejects_non_students_and_foreign_locations() -> Result<()> {
        let db = setup_test_db().await?;
        let fixture = seed_basic(&db).await?;

        let mut input = new_registration(&fixture, 0);
        input.student_id = fixture.lecturer.id;
        let err = submit(&db, input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Role);

        let other_year = registry::create_fiscal_year(&db, "KKN 2027", 2027).await?;
        let mut input = new_registration(&fixture, 0);
        input.fiscal_year_id = other_year.id;
        let err = submit(&db, input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let mut input = new_registration(&fixture, 0);
        input.documents = vec![DocumentRef {
            name: " ".to_string(),
            path: "x".to_string(),
        }];
        let err = submit(&db, input).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        Ok(())
    }

    #[tokio::test]
    async fn test_review_transitions_and_dpl() -> Result<()> {
        let db = setup_test_db().await?;
        let fixture = seed_basic(&db).await?;
        let created = submit(&db, new_registration(&fixture, 0)).await?;

        let outcome = review(
            &db,
            created.id,
            ReviewDecision {
                status: RegistrationStatus::NeedsRevision,
                notes: Some("KRS tidak terbaca".to_string()),
                dpl_id: None,
            },
        )
        .await?;
        assert_eq!(outcome.registration.status, "needs_revision");
        assert_eq!(outcome.registration.notes.as_deref(), Some("KRS tidak terbaca"));

        let outcome = review(
            &db,
            created.id,
            ReviewDecision {
                status: RegistrationStatus::Approved,
                notes: None,
                dpl_id: Some(fixture.lecturer.id),
            },
        )
        .await?;
        assert_eq!(outcome.registration.status, "approved");
        assert_eq!(outcome.registration.dpl_id, Some(fixture.lecturer.id));
        assert!(outcome.registration.notes.is_none());

        let err = review(
            &db,
            created.id,
            ReviewDecision {
                status: RegistrationStatus::Rejected,
                notes: None,
                dpl_id: Some(fixture.students[1].id),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = review(
            &db,
            9_999,
            ReviewDecision {
                status: RegistrationStatus::Rejected,
                notes: None,
                dpl_id: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        Ok(())
    }

    #[tokio::test]
    async fn test_review_away_from_approved_releases_posto() -> Result<()> {
        let db = setup_test_db().await?;
        let fixture = seed_basic(&db).await?;
        let registration = create_approved_registration(&db, &fixture, 0).await?;
        let posto = crate::core::posto::create_posto(
            &db,
            fixture.location.id,
            fixture.fiscal_year.id,
            None,
        )
        .await?;
        crate::core::posto::add_member(
            &db,
            posto.id,
            fixture.students[0].id,
            crate::models::MemberPosition::Anggota,
        )
        .await?;

        let outcome = review(
            &db,
            registration.id,
            ReviewDecision {
                status: RegistrationStatus::Rejected,
                notes: Some("Tidak memenuhi syarat".to_string()),
                dpl_id: None,
            },
        )
        .await?;
        assert_eq!(outcome.released_from_posto, Some(posto.id));
        assert!(outcome.registration.posto_id.is_none());
        assert!(crate::core::posto::members(&db, posto.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_registrations_is_scoped() -> Result<()> {
        let db = setup_test_db().await?;
        let fixture = seed_basic(&db).await?;

        let mut first = new_registration(&fixture, 0);
        first.profile.faculty = Some("Teknik".to_string());
        let first = submit(&db, first).await?;
        let mut second = new_registration(&fixture, 1);
        second.profile.faculty = Some("Ekonomi".to_string());
        submit(&db, second).await?;

        review(
            &db,
            first.id,
            ReviewDecision {
                status: RegistrationStatus::Approved,
                notes: None,
                dpl_id: Some(fixture.lecturer.id),
            },
        )
        .await?;

        let all = list_registrations(&db, RegistrationScope::All, &RegistrationFilter::default()).await?;
        assert_eq!(all.len(), 2);

        let own = list_registrations(
            &db,
            RegistrationScope::Own(fixture.students[1].id),
            &RegistrationFilter::default(),
        )
        .await?;
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].student_id, fixture.students[1].id);

        let supervised = list_registrations(
            &db,
            RegistrationScope::Supervised(fixture.lecturer.id),
            &RegistrationFilter::default(),
        )
        .await?;
        assert_eq!(supervised.len(), 1);
        assert_eq!(supervised[0].id, first.id);

        let by_faculty = list_registrations(
            &db,
            RegistrationScope::All,
            &RegistrationFilter {
                faculty: Some("Ekonomi".to_string()),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(by_faculty.len(), 1);
        assert_eq!(by_faculty[0].student_id, fixture.students[1].id);

        let approved = list_registrations(
            &db,
            RegistrationScope::All,
            &RegistrationFilter {
                status: Some(RegistrationStatus::Approved),
                fiscal_year_id: Some(fixture.fiscal_year.id),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(approved.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_posto_dpl_sees_linked_registrations() -> Result<()> {
        let db = setup_test_db().await?;
        let fixture = seed_basic(&db).await?;
        let other_lecturer =
            user::upsert_user(&db, "Dr. Wulan", "wulan@kampus.ac.id", Role::Lecturer).await?;

        let linked = create_approved_registration(&db, &fixture, 0).await?;
        create_approved_registration(&db, &fixture, 1).await?;
        assert!(linked.dpl_id.is_none());

        let unit = crate::core::posto::create_posto(
            &db,
            fixture.location.id,
            fixture.fiscal_year.id,
            Some(fixture.lecturer.id),
        )
        .await?;
        crate::core::posto::add_member(
            &db,
            unit.id,
            fixture.students[0].id,
            crate::models::MemberPosition::Anggota,
        )
        .await?;

        let supervised = list_registrations(
            &db,
            RegistrationScope::Supervised(fixture.lecturer.id),
            &RegistrationFilter::default(),
        )
        .await?;
        assert_eq!(supervised.len(), 1);
        assert_eq!(supervised[0].id, linked.id);

        let unrelated = list_registrations(
            &db,
            RegistrationScope::Supervised(other_lecturer.id),
            &RegistrationFilter::default(),
        )
        .await?;
        assert!(unrelated.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_submissions_respect_quota() -> Result<()> {
        let (db, path) = setup_file_db("submit-quota").await?;
        let fixture = seed_basic(&db).await?;
        let single = registry::create_location(
            &db,
            registry::NewLocation {
                fiscal_year_id: fixture.fiscal_year.id,
                name: "Desa Karanganyar".to_string(),
                quota: 1,
                province_id: Some(fixture.regions.province.id),
                city_id: Some(fixture.regions.city.id),
                district_id: Some(fixture.regions.district.id),
                village_id: Some(fixture.regions.village.id),
                ..Default::default()
            },
        )
        .await?;

        let mut first = new_registration(&fixture, 0);
        first.location_id = Some(single.id);
        let mut second = new_registration(&fixture, 1);
        second.location_id = Some(single.id);

        let (a, b) = tokio::join!(submit(&db, first), submit(&db, second));
        let availability = registry::location_availability(&db, single.id).await?;
        remove_file_db(&path);

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        let err = outcomes.into_iter().find_map(std::result::Result::err).unwrap();
        assert!(matches!(err.kind(), ErrorKind::Capacity | ErrorKind::Database));
        assert_eq!(availability.registered, 1);
        assert_eq!(availability.remaining, 0);
        Ok(())
    }
}
