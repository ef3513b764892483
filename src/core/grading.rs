//! Grading & certificate engine.
//!
//! Scores map to letters through fixed thresholds. Certificate numbers are issued once
//! per registration and reused on every later score update.

use crate::{
    core::{registration, registry, user},
    entities::{Grade, Registration, grade, registration as registration_entity},
    errors::{Error, Result},
    models::RegistrationStatus,
};
use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, info, instrument};

/// Letter thresholds, highest first. Scores below the last bound get `E`.
const LETTER_THRESHOLDS: &[(f64, &str)] = &[
    (85.0, "A"),
    (80.0, "A-"),
    (75.0, "B+"),
    (70.0, "B"),
    (65.0, "B-"),
    (60.0, "C+"),
    (55.0, "C"),
    (40.0, "D"),
];

const MONTHS_ID: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Maps a score in `[0, 100]` to its letter grade.
#[must_use]
pub fn letter_for(score: f64) -> &'static str {
    LETTER_THRESHOLDS
        .iter()
        .find(|(bound, _)| score >= *bound)
        .map_or("E", |&(_, letter)| letter)
}

/// Formats a date as an Indonesian long date, e.g. `18 Oktober 2026`.
#[must_use]
pub fn format_long_date(date: NaiveDate) -> String {
    let month = MONTHS_ID[date.month0() as usize];
    format!("{} {month} {}", date.day(), date.year())
}

fn validate_score(score: f64) -> Result<()> {
    if score.is_finite() && (0.0..=100.0).contains(&score) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "Score must be between 0 and 100, got {score}"
        )))
    }
}

/// The identifier printed on certificates: the NIM when known, else the internal id.
async fn student_identifier<C>(db: &C, student_id: i64) -> Result<String>
where
    C: ConnectionTrait,
{
    let nim = registration::get_profile(db, student_id)
        .await?
        .and_then(|profile| profile.nim)
        .filter(|nim| !nim.trim().is_empty());
    Ok(nim.unwrap_or_else(|| student_id.to_string()))
}

/// Finds the grade of a registration.
pub async fn grade_for<C>(db: &C, registration_id: i64) -> Result<Option<grade::Model>>
where
    C: ConnectionTrait,
{
    Grade::find()
        .filter(grade::Column::RegistrationId.eq(registration_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Records (or corrects) the score of an approved registration.
///
/// The existing certificate number is looked up first and reused verbatim when it is
/// non-empty; only a registration without one gets a fresh
/// `KKN-{year}-{identifier}` number. The grade row is updated in place, never
/// duplicated.
#[instrument(skip(db))]
pub async fn record_grade(
    db: &DatabaseConnection,
    registration_id: i64,
    score: f64,
    graded_by: Option<i64>,
) -> Result<grade::Model> {
    validate_score(score)?;

    let txn = db.begin().await?;
    let target = registration::require_registration(&txn, registration_id).await?;
    if target.status.parse::<RegistrationStatus>()? != RegistrationStatus::Approved {
        return Err(Error::validation(format!(
            "Registration {registration_id} is {}, only approved registrations can be graded",
            target.status
        )));
    }

    let existing = grade_for(&txn, registration_id).await?;
    let reused = existing
        .as_ref()
        .and_then(|g| g.certificate_number.clone())
        .filter(|number| !number.trim().is_empty());
    let certificate_number = match reused {
        Some(number) => {
            debug!(%number, "Reusing certificate number");
            number
        }
        None => {
            let identifier = student_identifier(&txn, target.student_id).await?;
            format!("KKN-{}-{identifier}", Utc::now().year())
        }
    };

    let now = Utc::now();
    let letter = letter_for(score).to_string();
    let saved = match existing {
        Some(found) => {
            let mut active: grade::ActiveModel = found.into();
            active.score = Set(score);
            active.letter = Set(letter);
            active.certificate_number = Set(Some(certificate_number));
            active.graded_by = Set(graded_by);
            active.updated_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            grade::ActiveModel {
                registration_id: Set(registration_id),
                score: Set(score),
                letter: Set(letter),
                certificate_number: Set(Some(certificate_number)),
                graded_by: Set(graded_by),
                graded_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;
    info!(registration_id, letter = %saved.letter, "Grade recorded");
    Ok(saved)
}

/// An approved registration together with its grade.
#[derive(Debug, Clone, Serialize)]
pub struct GradedRegistration {
    /// The approved registration
    pub registration: registration_entity::Model,
    /// Its grade
    pub grade: grade::Model,
}

/// Returns the student's approved and graded registration.
///
/// When the student has been graded in several fiscal years the most recent grade
/// wins. Fails with `NotFound` when nothing approved has been graded yet.
pub async fn my_grade<C>(db: &C, student_id: i64) -> Result<GradedRegistration>
where
    C: ConnectionTrait,
{
    let approved = Registration::find()
        .filter(registration_entity::Column::StudentId.eq(student_id))
        .filter(registration_entity::Column::Status.eq(RegistrationStatus::Approved.as_str()))
        .order_by_desc(registration_entity::Column::CreatedAt)
        .all(db)
        .await?;

    let mut graded = Vec::new();
    for candidate in approved {
        if let Some(found) = grade_for(db, candidate.id).await? {
            graded.push(GradedRegistration {
                registration: candidate,
                grade: found,
            });
        }
    }

    graded
        .into_iter()
        .max_by_key(|entry| entry.grade.graded_at)
        .ok_or_else(|| Error::not_found("Grade", format!("student {student_id}")))
}

/// Fields handed to the certificate renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificateData {
    /// Student name
    pub student_name: String,
    /// NIM, or the internal id when no NIM is known
    pub student_identifier: String,
    /// Name of the location served
    pub location_name: String,
    /// Letter grade
    pub letter: String,
    /// Numeric score
    pub score: f64,
    /// Certificate number
    pub certificate_number: String,
    /// Issue date as an Indonesian long date
    pub issued_on: String,
}

/// Collects the certificate fields of a graded registration.
///
/// The location comes from the registration, or from its posto when the registration
/// was placed without a requested location.
pub async fn certificate_data<C>(
    db: &C,
    registration_id: i64,
    issued_on: NaiveDate,
) -> Result<CertificateData>
where
    C: ConnectionTrait,
{
    let target = registration::require_registration(db, registration_id).await?;
    let found = grade_for(db, registration_id)
        .await?
        .ok_or_else(|| Error::not_found("Grade", format!("registration {registration_id}")))?;
    let certificate_number = found
        .certificate_number
        .clone()
        .filter(|number| !number.trim().is_empty())
        .ok_or_else(|| {
            Error::conflict(format!(
                "Registration {registration_id} has no certificate number"
            ))
        })?;

    let student = user::require_user(db, target.student_id).await?;
    let location_id = match (target.location_id, target.posto_id) {
        (Some(location_id), _) => Some(location_id),
        (None, Some(posto_id)) => Some(crate::core::posto::require_posto(db, posto_id).await?.location_id),
        (None, None) => None,
    };
    let location_name = match location_id {
        Some(location_id) => registry::require_location(db, location_id).await?.name,
        None => "-".to_string(),
    };

    Ok(CertificateData {
        student_name: student.name,
        student_identifier: student_identifier(db, target.student_id).await?,
        location_name,
        letter: found.letter,
        score: found.score,
        certificate_number,
        issued_on: format_long_date(issued_on),
    })
}
