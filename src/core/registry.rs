//! Period and location registry.
//!
//! Holds the leaf data every other component consumes: administrative regions, fiscal
//! years (KKN periods) with their registration waves, and locations with a fixed
//! quota. Exactly one fiscal year may be flagged active; the flag is moved with a
//! clear-then-set inside one transaction.

use crate::{
    entities::{
        FiscalYear, Location, Posto, Region, Registration, RegistrationWave, fiscal_year,
        location, posto, region, registration, registration_wave,
    },
    errors::{Error, Result},
    models::RegionLevel,
};
use chrono::{DateTime, Utc};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;
use tracing::{info, instrument};

/// Creates a region under `parent_id`.
///
/// Provinces take no parent; every other level must hang under a region of the level
/// directly above it.
pub async fn create_region<C>(
    db: &C,
    code: &str,
    name: &str,
    level: RegionLevel,
    parent_id: Option<i64>,
) -> Result<region::Model>
where
    C: ConnectionTrait,
{
    if code.trim().is_empty() || name.trim().is_empty() {
        return Err(Error::validation("Region code and name are required"));
    }

    match (level.parent_level(), parent_id) {
        (None, Some(_)) => {
            return Err(Error::validation("A province cannot have a parent region"));
        }
        (Some(expected), None) => {
            return Err(Error::validation(format!(
                "A {level} must belong to a {expected}"
            )));
        }
        (Some(expected), Some(parent_id)) => {
            let parent = require_region(db, parent_id).await?;
            if parent.level != expected.as_str() {
                return Err(Error::validation(format!(
                    "Region {} is a {}, a {level} must belong to a {expected}",
                    parent.code, parent.level
                )));
            }
        }
        (None, None) => {}
    }

    if Region::find()
        .filter(region::Column::Code.eq(code.trim()))
        .one(db)
        .await?
        .is_some()
    {
        return Err(Error::duplicate(format!("Region code {code} already exists")));
    }

    region::ActiveModel {
        code: Set(code.trim().to_string()),
        name: Set(name.trim().to_string()),
        level: Set(level.as_str().to_string()),
        parent_id: Set(parent_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a region by its official code.
pub async fn get_region_by_code<C>(db: &C, code: &str) -> Result<Option<region::Model>>
where
    C: ConnectionTrait,
{
    Region::find()
        .filter(region::Column::Code.eq(code))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_region<C>(db: &C, region_id: i64) -> Result<region::Model>
where
    C: ConnectionTrait,
{
    Region::find_by_id(region_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Region", region_id))
}

/// Lists the direct children of a region (or all provinces for `None`), ordered by name.
pub async fn list_child_regions<C>(db: &C, parent_id: Option<i64>) -> Result<Vec<region::Model>>
where
    C: ConnectionTrait,
{
    let query = match parent_id {
        Some(parent_id) => Region::find().filter(region::Column::ParentId.eq(parent_id)),
        None => Region::find().filter(region::Column::ParentId.is_null()),
    };
    query
        .order_by_asc(region::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates an inactive fiscal year.
pub async fn create_fiscal_year<C>(db: &C, name: &str, year: i32) -> Result<fiscal_year::Model>
where
    C: ConnectionTrait,
{
    if name.trim().is_empty() {
        return Err(Error::validation("Fiscal year name cannot be empty"));
    }
    if !(2000..=2100).contains(&year) {
        return Err(Error::validation(format!("Implausible fiscal year: {year}")));
    }

    fiscal_year::ActiveModel {
        name: Set(name.trim().to_string()),
        year: Set(year),
        is_active: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Finds a fiscal year by id, failing with `NotFound` when absent.
pub async fn require_fiscal_year<C>(db: &C, fiscal_year_id: i64) -> Result<fiscal_year::Model>
where
    C: ConnectionTrait,
{
    FiscalYear::find_by_id(fiscal_year_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Fiscal year", fiscal_year_id))
}

/// Returns the fiscal year currently flagged active.
pub async fn active_fiscal_year<C>(db: &C) -> Result<Option<fiscal_year::Model>>
where
    C: ConnectionTrait,
{
    FiscalYear::find()
        .filter(fiscal_year::Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists fiscal years, newest first.
pub async fn list_fiscal_years<C>(db: &C) -> Result<Vec<fiscal_year::Model>>
where
    C: ConnectionTrait,
{
    FiscalYear::find()
        .order_by_desc(fiscal_year::Column::Year)
        .order_by_desc(fiscal_year::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Marks exactly one fiscal year active.
///
/// All flags are cleared and the target's flag set in the same transaction, so no
/// reader ever observes two active periods.
#[instrument(skip(db))]
pub async fn set_active_fiscal_year(
    db: &DatabaseConnection,
    fiscal_year_id: i64,
) -> Result<fiscal_year::Model> {
    let txn = db.begin().await?;
    let updated = activate_fiscal_year(&txn, fiscal_year_id).await?;
    txn.commit().await?;
    info!(fiscal_year_id, name = %updated.name, "Active fiscal year changed");
    Ok(updated)
}

/// Clear-then-set body of [`set_active_fiscal_year`]; the caller owns the transaction.
pub(crate) async fn activate_fiscal_year<C>(db: &C, fiscal_year_id: i64) -> Result<fiscal_year::Model>
where
    C: ConnectionTrait,
{
    let target = require_fiscal_year(db, fiscal_year_id).await?;

    FiscalYear::update_many()
        .col_expr(fiscal_year::Column::IsActive, Expr::value(false).into())
        .filter(fiscal_year::Column::IsActive.eq(true))
        .exec(db)
        .await?;

    let mut active: fiscal_year::ActiveModel = target.into();
    active.is_active = Set(true);
    active.update(db).await.map_err(Into::into)
}

/// Deletes a fiscal year and its registration waves.
///
/// Fails with `Conflict` while any registration or location still references it.
#[instrument(skip(db))]
pub async fn delete_fiscal_year(db: &DatabaseConnection, fiscal_year_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let target = require_fiscal_year(&txn, fiscal_year_id).await?;

    let registrations = Registration::find()
        .filter(registration::Column::FiscalYearId.eq(fiscal_year_id))
        .count(&txn)
        .await?;
    let locations = Location::find()
        .filter(location::Column::FiscalYearId.eq(fiscal_year_id))
        .count(&txn)
        .await?;
    if registrations > 0 || locations > 0 {
        return Err(Error::conflict(format!(
            "Fiscal year {} is still referenced by {registrations} registration(s) and {locations} location(s)",
            target.name
        )));
    }

    RegistrationWave::delete_many()
        .filter(registration_wave::Column::FiscalYearId.eq(fiscal_year_id))
        .exec(&txn)
        .await?;
    target.delete(&txn).await?;

    txn.commit().await?;
    info!(fiscal_year_id, "Fiscal year deleted");
    Ok(())
}

/// Opens a registration wave inside a fiscal year.
pub async fn create_wave<C>(
    db: &C,
    fiscal_year_id: i64,
    name: &str,
    opens_at: DateTime<Utc>,
    closes_at: DateTime<Utc>,
) -> Result<registration_wave::Model>
where
    C: ConnectionTrait,
{
    if name.trim().is_empty() {
        return Err(Error::validation("Wave name cannot be empty"));
    }
    if opens_at >= closes_at {
        return Err(Error::validation(format!(
            "Wave {name} must open before it closes"
        )));
    }
    require_fiscal_year(db, fiscal_year_id).await?;

    registration_wave::ActiveModel {
        fiscal_year_id: Set(fiscal_year_id),
        name: Set(name.trim().to_string()),
        opens_at: Set(opens_at),
        closes_at: Set(closes_at),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Returns the wave of a fiscal year that is open at `at`, if any.
pub async fn open_wave<C>(
    db: &C,
    fiscal_year_id: i64,
    at: DateTime<Utc>,
) -> Result<Option<registration_wave::Model>>
where
    C: ConnectionTrait,
{
    RegistrationWave::find()
        .filter(registration_wave::Column::FiscalYearId.eq(fiscal_year_id))
        .filter(registration_wave::Column::OpensAt.lte(at))
        .filter(registration_wave::Column::ClosesAt.gt(at))
        .order_by_asc(registration_wave::Column::OpensAt)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Fields needed to create a location.
///
/// Domestic locations fill the four region ids; international ones fill `country`.
#[derive(Debug, Clone, Default)]
pub struct NewLocation {
    /// Fiscal year the location is offered in
    pub fiscal_year_id: i64,
    /// Display name
    pub name: String,
    /// Maximum number of registrations
    pub quota: i32,
    /// Whether the location is abroad
    pub is_international: bool,
    /// Province region id
    pub province_id: Option<i64>,
    /// City region id
    pub city_id: Option<i64>,
    /// District region id
    pub district_id: Option<i64>,
    /// Village region id
    pub village_id: Option<i64>,
    /// Country name
    pub country: Option<String>,
    /// Description shown to applicants
    pub description: Option<String>,
}

/// Region ids of a domestic location, from province down to village.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionPath {
    /// Province region id
    pub province_id: i64,
    /// City region id
    pub city_id: i64,
    /// District region id
    pub district_id: i64,
    /// Village region id
    pub village_id: i64,
}

/// Walks parent links up from a village code to build its full region path.
pub async fn region_path_from_village<C>(db: &C, village_code: &str) -> Result<RegionPath>
where
    C: ConnectionTrait,
{
    let village = get_region_by_code(db, village_code)
        .await?
        .ok_or_else(|| Error::not_found("Region", village_code))?;
    if village.level != RegionLevel::Village.as_str() {
        return Err(Error::validation(format!(
            "Region {} is a {}, expected a village",
            village.code, village.level
        )));
    }

    let mut ids = [0_i64; 3];
    let mut current = village.clone();
    for slot in &mut ids {
        let parent_id = current.parent_id.ok_or_else(|| {
            Error::validation(format!("Region {} has no parent region", current.code))
        })?;
        current = require_region(db, parent_id).await?;
        *slot = current.id;
    }

    Ok(RegionPath {
        province_id: ids[2],
        city_id: ids[1],
        district_id: ids[0],
        village_id: village.id,
    })
}

/// Checks a domestic path village → district → city → province against the ids given.
async fn resolve_region_path<C>(db: &C, input: &NewLocation) -> Result<()>
where
    C: ConnectionTrait,
{
    let (Some(province_id), Some(city_id), Some(district_id), Some(village_id)) = (
        input.province_id,
        input.city_id,
        input.district_id,
        input.village_id,
    ) else {
        return Err(Error::validation(
            "A domestic location needs province, city, district and village",
        ));
    };

    let chain = [
        (village_id, RegionLevel::Village, Some(district_id)),
        (district_id, RegionLevel::District, Some(city_id)),
        (city_id, RegionLevel::City, Some(province_id)),
        (province_id, RegionLevel::Province, None),
    ];
    for (region_id, level, expected_parent) in chain {
        let Some(found) = Region::find_by_id(region_id).one(db).await? else {
            return Err(Error::validation(format!(
                "Region {region_id} does not exist"
            )));
        };
        if found.level != level.as_str() {
            return Err(Error::validation(format!(
                "Region {} is a {}, expected a {level}",
                found.code, found.level
            )));
        }
        if found.parent_id != expected_parent {
            return Err(Error::validation(format!(
                "Region {} does not belong to the selected parent region",
                found.code
            )));
        }
    }
    Ok(())
}

/// Creates a location, validating its administrative path or country.
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_location<C>(db: &C, input: NewLocation) -> Result<location::Model>
where
    C: ConnectionTrait,
{
    if input.name.trim().is_empty() {
        return Err(Error::validation("Location name cannot be empty"));
    }
    if input.quota < 0 {
        return Err(Error::validation(format!(
            "Quota cannot be negative: {}",
            input.quota
        )));
    }

    let country = input
        .country
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(ToString::to_string);
    let has_region = input.province_id.is_some()
        || input.city_id.is_some()
        || input.district_id.is_some()
        || input.village_id.is_some();

    if input.is_international {
        if country.is_none() {
            return Err(Error::validation("An international location needs a country"));
        }
        if has_region {
            return Err(Error::validation(
                "An international location cannot reference domestic regions",
            ));
        }
    } else {
        if country.is_some() {
            return Err(Error::validation("A domestic location cannot carry a country"));
        }
        resolve_region_path(db, &input).await?;
    }

    require_fiscal_year(db, input.fiscal_year_id).await?;

    let created = location::ActiveModel {
        fiscal_year_id: Set(input.fiscal_year_id),
        name: Set(input.name.trim().to_string()),
        quota: Set(input.quota),
        is_international: Set(input.is_international),
        province_id: Set(input.province_id),
        city_id: Set(input.city_id),
        district_id: Set(input.district_id),
        village_id: Set(input.village_id),
        country: Set(country),
        description: Set(input.description),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(location_id = created.id, quota = created.quota, "Location created");
    Ok(created)
}

/// Finds a location by id, failing with `NotFound` when absent.
pub async fn require_location<C>(db: &C, location_id: i64) -> Result<location::Model>
where
    C: ConnectionTrait,
{
    Location::find_by_id(location_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Location", location_id))
}

/// Lists the locations of a fiscal year, ordered by name.
pub async fn list_locations<C>(db: &C, fiscal_year_id: i64) -> Result<Vec<location::Model>>
where
    C: ConnectionTrait,
{
    Location::find()
        .filter(location::Column::FiscalYearId.eq(fiscal_year_id))
        .order_by_asc(location::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Takes the write lock on a location row before a quota check.
///
/// The no-op update serialises concurrent writers on `SQLite` and row-locks on Postgres,
/// so two submissions cannot both pass the count.
pub(crate) async fn lock_location<C>(db: &C, location_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Location::update_many()
        .col_expr(location::Column::Quota, Expr::col(location::Column::Quota).into())
        .filter(location::Column::Id.eq(location_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Location", location_id));
    }
    Ok(())
}

/// Counts the registrations that reference a location.
pub async fn count_location_registrations<C>(db: &C, location_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    Registration::find()
        .filter(registration::Column::LocationId.eq(location_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Converts a stored quota into a comparable count. Negative quotas admit nobody.
pub(crate) fn quota_limit(quota: i32) -> u64 {
    u64::try_from(quota).unwrap_or(0)
}

/// Quota usage of a location.
#[derive(Debug, Clone, Serialize)]
pub struct LocationAvailability {
    /// The location
    pub location: location::Model,
    /// Configured quota
    pub quota: u64,
    /// Registrations referencing the location
    pub registered: u64,
    /// Free slots
    pub remaining: u64,
}

/// Reports how much of a location's quota is used.
pub async fn location_availability<C>(db: &C, location_id: i64) -> Result<LocationAvailability>
where
    C: ConnectionTrait,
{
    let location = require_location(db, location_id).await?;
    let registered = count_location_registrations(db, location_id).await?;
    let quota = quota_limit(location.quota);
    Ok(LocationAvailability {
        location,
        quota,
        registered,
        remaining: quota.saturating_sub(registered),
    })
}

/// Changes a location's quota.
///
/// The new quota may not drop below the registrations already holding a slot.
#[instrument(skip(db))]
pub async fn update_location_quota(
    db: &DatabaseConnection,
    location_id: i64,
    quota: i32,
) -> Result<location::Model> {
    if quota < 0 {
        return Err(Error::validation(format!("Quota cannot be negative: {quota}")));
    }

    let txn = db.begin().await?;
    lock_location(&txn, location_id).await?;
    let location = require_location(&txn, location_id).await?;

    let registered = count_location_registrations(&txn, location_id).await?;
    if quota_limit(quota) < registered {
        return Err(Error::conflict(format!(
            "Location {} already has {registered} registration(s), quota {quota} is too small",
            location.name
        )));
    }

    let mut active: location::ActiveModel = location.into();
    active.quota = Set(quota);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    Ok(updated)
}

/// Deletes a location. Fails with `Conflict` while registrations or postos reference it.
#[instrument(skip(db))]
pub async fn delete_location(db: &DatabaseConnection, location_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let location = require_location(&txn, location_id).await?;

    let registrations = count_location_registrations(&txn, location_id).await?;
    let postos = Posto::find()
        .filter(posto::Column::LocationId.eq(location_id))
        .count(&txn)
        .await?;
    if registrations > 0 || postos > 0 {
        return Err(Error::conflict(format!(
            "Location {} is still referenced by {registrations} registration(s) and {postos} posto(s)",
            location.name
        )));
    }

    location.delete(&txn).await?;
    txn.commit().await?;
    Ok(())
}
