//! Shared test utilities for the KKN engine.
//!
//! This module provides helpers for setting up in-memory test databases, a standard
//! fixture (active fiscal year, one domestic location, students and staff) and
//! in-memory fakes of the external collaborators.

use crate::{
    core::{
        grading::CertificateData,
        registration::{self, DocumentRef, NewRegistration, ProfileFields, ReviewDecision},
        registry::{self, NewLocation},
        user,
    },
    engine::{CertificateRenderer, CollaboratorError, DocumentStore, Event, Notifier},
    entities::{fiscal_year, location, region, registration as registration_entity, user as user_entity},
    errors::Result,
    models::{RegionLevel, RegistrationStatus, Role},
};
use sea_orm::{ConnectOptions, DatabaseConnection};
use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database with a pool of several connections, so
/// that transactions really run side by side. Returns the file path for cleanup
/// with [`remove_file_db`].
pub async fn setup_file_db(name: &str) -> Result<(DatabaseConnection, PathBuf)> {
    let path = std::env::temp_dir().join(format!("kkn-{name}-{}.sqlite", std::process::id()));
    remove_file_db(&path);

    let mut options = ConnectOptions::new(format!("sqlite://{}?mode=rwc", path.display()));
    options.max_connections(4).sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok((db, path))
}

/// Deletes a database file created by [`setup_file_db`] and its journal files.
pub fn remove_file_db(path: &Path) {
    for suffix in ["", "-journal", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}

/// A province → city → district → village chain.
pub struct RegionPathFixture {
    /// Province
    pub province: region::Model,
    /// City under the province
    pub city: region::Model,
    /// District under the city
    pub district: region::Model,
    /// Village under the district
    pub village: region::Model,
}

/// Creates a full region chain whose codes all start with `prefix`.
pub async fn create_region_path(db: &DatabaseConnection, prefix: &str) -> Result<RegionPathFixture> {
    let province = registry::create_region(
        db,
        prefix,
        &format!("Provinsi {prefix}"),
        RegionLevel::Province,
        None,
    )
    .await?;
    let city_code = format!("{prefix}.74");
    let city = registry::create_region(
        db,
        &city_code,
        &format!("Kota {prefix}"),
        RegionLevel::City,
        Some(province.id),
    )
    .await?;
    let district_code = format!("{city_code}.12");
    let district = registry::create_region(
        db,
        &district_code,
        &format!("Kecamatan {prefix}"),
        RegionLevel::District,
        Some(city.id),
    )
    .await?;
    let village = registry::create_region(
        db,
        &format!("{district_code}.1001"),
        &format!("Desa {prefix}"),
        RegionLevel::Village,
        Some(district.id),
    )
    .await?;

    Ok(RegionPathFixture {
        province,
        city,
        district,
        village,
    })
}

/// The standard test world.
pub struct Fixture {
    /// Active fiscal year
    pub fiscal_year: fiscal_year::Model,
    /// Domestic location in that year, quota 10
    pub location: location::Model,
    /// Region chain of the location
    pub regions: RegionPathFixture,
    /// Six students
    pub students: Vec<user_entity::Model>,
    /// A lecturer
    pub lecturer: user_entity::Model,
    /// An administrator
    pub admin: user_entity::Model,
}

/// Seeds the standard fixture.
///
/// # Defaults
/// * fiscal year `KKN 2026`, active
/// * location `Desa Sukamaju` with quota 10
/// * six students, one lecturer and one admin
pub async fn seed_basic(db: &DatabaseConnection) -> Result<Fixture> {
    let year = registry::create_fiscal_year(db, "KKN 2026", 2026).await?;
    let fiscal_year = registry::set_active_fiscal_year(db, year.id).await?;
    let regions = create_region_path(db, "33").await?;

    let location = registry::create_location(
        db,
        NewLocation {
            fiscal_year_id: fiscal_year.id,
            name: "Desa Sukamaju".to_string(),
            quota: 10,
            province_id: Some(regions.province.id),
            city_id: Some(regions.city.id),
            district_id: Some(regions.district.id),
            village_id: Some(regions.village.id),
            ..Default::default()
        },
    )
    .await?;

    let mut students = Vec::new();
    for index in 1..=6 {
        students.push(
            user::upsert_user(
                db,
                &format!("Mahasiswa {index}"),
                &format!("mhs{index}@kampus.ac.id"),
                Role::Student,
            )
            .await?,
        );
    }
    let lecturer = user::upsert_user(db, "Dr. Hartono", "hartono@kampus.ac.id", Role::Lecturer).await?;
    let admin = user::upsert_user(db, "Admin LPPM", "lppm@kampus.ac.id", Role::Admin).await?;

    Ok(Fixture {
        fiscal_year,
        location,
        regions,
        students,
        lecturer,
        admin,
    })
}

/// A second domestic location in the fixture's fiscal year.
pub async fn create_second_location(
    db: &DatabaseConnection,
    fixture: &Fixture,
) -> Result<location::Model> {
    registry::create_location(
        db,
        NewLocation {
            fiscal_year_id: fixture.fiscal_year.id,
            name: "Desa Mekarsari".to_string(),
            quota: 10,
            province_id: Some(fixture.regions.province.id),
            city_id: Some(fixture.regions.city.id),
            district_id: Some(fixture.regions.district.id),
            village_id: Some(fixture.regions.village.id),
            ..Default::default()
        },
    )
    .await
}

/// Registration input for `fixture.students[index]` at the fixture location.
pub fn new_registration(fixture: &Fixture, index: usize) -> NewRegistration {
    NewRegistration {
        student_id: fixture.students[index].id,
        fiscal_year_id: fixture.fiscal_year.id,
        location_id: Some(fixture.location.id),
        profile: ProfileFields {
            program: Some("Teknik Informatika".to_string()),
            ..Default::default()
        },
        documents: vec![DocumentRef {
            name: "krs".to_string(),
            path: format!("registrations/krs-{index}.pdf"),
        }],
    }
}

/// Submits a pending registration for `fixture.students[index]`.
pub async fn submit_registration(
    db: &DatabaseConnection,
    fixture: &Fixture,
    index: usize,
) -> Result<registration_entity::Model> {
    registration::submit(db, new_registration(fixture, index)).await
}

/// Submits and approves a registration for `fixture.students[index]`.
pub async fn create_approved_registration(
    db: &DatabaseConnection,
    fixture: &Fixture,
    index: usize,
) -> Result<registration_entity::Model> {
    let created = submit_registration(db, fixture, index).await?;
    let outcome = registration::review(
        db,
        created.id,
        ReviewDecision {
            status: RegistrationStatus::Approved,
            notes: None,
            dpl_id: None,
        },
    )
    .await?;
    Ok(outcome.registration)
}

/// Document store keeping files in memory.
#[derive(Default)]
pub struct MemoryDocumentStore {
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryDocumentStore {
    /// Number of stored files.
    #[allow(clippy::unwrap_used)]
    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

impl DocumentStore for MemoryDocumentStore {
    #[allow(clippy::unwrap_used)]
    fn store(
        &self,
        namespace: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> std::result::Result<String, CollaboratorError> {
        let mut files = self.files.lock().unwrap();
        let path = format!("{namespace}/{}-{file_name}", files.len() + 1);
        files.push((path.clone(), bytes.to_vec()));
        Ok(path)
    }
}

/// Notifier recording every event.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Vec<i64>, Event)>>,
}

impl RecordingNotifier {
    /// Events sent so far, with their recipients.
    #[allow(clippy::unwrap_used)]
    pub fn events(&self) -> Vec<(Vec<i64>, Event)> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    #[allow(clippy::unwrap_used)]
    fn notify(&self, recipients: &[i64], event: &Event) -> std::result::Result<(), CollaboratorError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipients.to_vec(), event.clone()));
        Ok(())
    }
}

/// Notifier that always fails.
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn notify(&self, _: &[i64], _: &Event) -> std::result::Result<(), CollaboratorError> {
        Err(CollaboratorError::new("notifier", "gateway unavailable"))
    }
}

/// Renderer producing a plain-text certificate.
pub struct TextRenderer;

impl CertificateRenderer for TextRenderer {
    fn render(&self, data: &CertificateData) -> std::result::Result<Vec<u8>, CollaboratorError> {
        Ok(format!(
            "{} | {} | {} | {} ({}) | {} | {}",
            data.student_name,
            data.student_identifier,
            data.location_name,
            data.letter,
            data.score,
            data.certificate_number,
            data.issued_on
        )
        .into_bytes())
    }
}
