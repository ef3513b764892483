//! Registry seed loading from kkn.toml
//!
//! The seed file lists the reference data an installation starts from: the
//! administrative regions, the fiscal years with their registration waves, and the
//! locations offered in each year. Applying it twice changes nothing; rows are matched
//! by region code, fiscal year, wave name and location name.

use crate::{
    core::{
        registry::{self, NewLocation},
        system_state,
    },
    entities::{FiscalYear, Location, RegistrationWave, fiscal_year, location, registration_wave},
    errors::{Error, Result},
    models::RegionLevel,
};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, instrument};

const DEFAULT_SEED_PATH: &str = "kkn.toml";

/// Structure of the whole kkn.toml file
#[derive(Debug, Deserialize, Default)]
pub struct SeedConfig {
    /// Regions, parents listed before their children
    #[serde(default)]
    pub regions: Vec<RegionSeed>,
    /// Fiscal years with their waves
    #[serde(default)]
    pub fiscal_years: Vec<FiscalYearSeed>,
    /// Locations
    #[serde(default)]
    pub locations: Vec<LocationSeed>,
}

/// A region entry
#[derive(Debug, Deserialize, Clone)]
pub struct RegionSeed {
    /// Official region code
    pub code: String,
    /// Region name
    pub name: String,
    /// Administrative level
    pub level: RegionLevel,
    /// Code of the parent region (absent for provinces)
    pub parent: Option<String>,
}

/// A fiscal year entry
#[derive(Debug, Deserialize, Clone)]
pub struct FiscalYearSeed {
    /// Period name
    pub name: String,
    /// Calendar year, also used to match existing rows
    pub year: i32,
    /// Whether this is the active period
    #[serde(default)]
    pub active: bool,
    /// Registration waves of the period
    #[serde(default)]
    pub waves: Vec<WaveSeed>,
}

/// A registration wave entry
#[derive(Debug, Deserialize, Clone)]
pub struct WaveSeed {
    /// Wave name
    pub name: String,
    /// Opening instant (RFC 3339 string)
    pub opens_at: DateTime<Utc>,
    /// Closing instant (RFC 3339 string)
    pub closes_at: DateTime<Utc>,
}

/// A location entry. Domestic locations name a village code, international ones a country.
#[derive(Debug, Deserialize, Clone)]
pub struct LocationSeed {
    /// Year of the fiscal year the location belongs to
    pub fiscal_year: i32,
    /// Location name
    pub name: String,
    /// Registration quota
    pub quota: i32,
    /// Village region code for domestic locations
    pub village: Option<String>,
    /// Country for international locations
    pub country: Option<String>,
    /// Description shown to applicants
    pub description: Option<String>,
}

/// Counts of rows created by [`seed_registry`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Regions created
    pub regions: usize,
    /// Fiscal years created
    pub fiscal_years: usize,
    /// Waves created
    pub waves: usize,
    /// Locations created
    pub locations: usize,
}

/// Loads the registry seed from a TOML file
///
/// # Errors
/// Returns `Error::Config` if the file cannot be read or parsed.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SeedConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read seed file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse seed file: {e}"),
    })
}

/// Path of the seed file: `KKN_SEED_PATH`, or ./kkn.toml
#[must_use]
pub fn seed_path() -> String {
    std::env::var("KKN_SEED_PATH").unwrap_or_else(|_| DEFAULT_SEED_PATH.to_string())
}

/// Loads the seed from [`seed_path`]
pub fn load_default_config() -> Result<SeedConfig> {
    load_config(seed_path())
}

async fn fiscal_year_by_year<C>(db: &C, year: i32) -> Result<Option<fiscal_year::Model>>
where
    C: ConnectionTrait,
{
    FiscalYear::find()
        .filter(fiscal_year::Column::Year.eq(year))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Applies the seed in one transaction, skipping rows that already exist.
///
/// Region parents must appear earlier in the file than their children. A location
/// naming an unknown fiscal year or village fails the whole seed.
#[instrument(skip(db, config))]
pub async fn seed_registry(db: &DatabaseConnection, config: &SeedConfig) -> Result<SeedReport> {
    let txn = db.begin().await?;
    let mut report = SeedReport::default();

    for entry in &config.regions {
        if registry::get_region_by_code(&txn, &entry.code).await?.is_some() {
            continue;
        }
        let parent_id = match &entry.parent {
            Some(code) => Some(
                registry::get_region_by_code(&txn, code)
                    .await?
                    .ok_or_else(|| Error::Config {
                        message: format!("Region {} names unknown parent {code}", entry.code),
                    })?
                    .id,
            ),
            None => None,
        };
        registry::create_region(&txn, &entry.code, &entry.name, entry.level, parent_id).await?;
        report.regions += 1;
    }

    for entry in &config.fiscal_years {
        let year = match fiscal_year_by_year(&txn, entry.year).await? {
            Some(existing) => existing,
            None => {
                report.fiscal_years += 1;
                registry::create_fiscal_year(&txn, &entry.name, entry.year).await?
            }
        };

        for wave in &entry.waves {
            let exists = RegistrationWave::find()
                .filter(registration_wave::Column::FiscalYearId.eq(year.id))
                .filter(registration_wave::Column::Name.eq(wave.name.as_str()))
                .one(&txn)
                .await?
                .is_some();
            if !exists {
                registry::create_wave(&txn, year.id, &wave.name, wave.opens_at, wave.closes_at)
                    .await?;
                report.waves += 1;
            }
        }

        if entry.active && !year.is_active {
            registry::activate_fiscal_year(&txn, year.id).await?;
        }
    }

    for entry in &config.locations {
        let year = fiscal_year_by_year(&txn, entry.fiscal_year)
            .await?
            .ok_or_else(|| Error::Config {
                message: format!(
                    "Location {} names unknown fiscal year {}",
                    entry.name, entry.fiscal_year
                ),
            })?;
        let exists = Location::find()
            .filter(location::Column::FiscalYearId.eq(year.id))
            .filter(location::Column::Name.eq(entry.name.trim()))
            .one(&txn)
            .await?
            .is_some();
        if exists {
            debug!(name = %entry.name, "Location already seeded");
            continue;
        }

        let mut input = NewLocation {
            fiscal_year_id: year.id,
            name: entry.name.clone(),
            quota: entry.quota,
            description: entry.description.clone(),
            ..Default::default()
        };
        match (&entry.village, &entry.country) {
            (Some(village), None) => {
                let path = registry::region_path_from_village(&txn, village).await?;
                input.province_id = Some(path.province_id);
                input.city_id = Some(path.city_id);
                input.district_id = Some(path.district_id);
                input.village_id = Some(path.village_id);
            }
            (None, Some(country)) => {
                input.is_international = true;
                input.country = Some(country.clone());
            }
            _ => {
                return Err(Error::Config {
                    message: format!(
                        "Location {} needs exactly one of village or country",
                        entry.name
                    ),
                });
            }
        }
        registry::create_location(&txn, input).await?;
        report.locations += 1;
    }

    system_state::set_value(&txn, system_state::REGISTRY_SEEDED_AT, &Utc::now().to_rfc3339())
        .await?;
    txn.commit().await?;

    info!(
        regions = report.regions,
        fiscal_years = report.fiscal_years,
        waves = report.waves,
        locations = report.locations,
        "Registry seed applied"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::setup_test_db;

    const SEED: &str = r#"
        [[regions]]
        code = "33"
        name = "Jawa Tengah"
        level = "province"

        [[regions]]
        code = "33.74"
        name = "Kota Semarang"
        level = "city"
        parent = "33"

        [[regions]]
        code = "33.74.12"
        name = "Tembalang"
        level = "district"
        parent = "33.74"

        [[regions]]
        code = "33.74.12.1001"
        name = "Bulusan"
        level = "village"
        parent = "33.74.12"

        [[fiscal_years]]
        name = "KKN 2026"
        year = 2026
        active = true

        [[fiscal_years.waves]]
        name = "Gelombang 1"
        opens_at = "2026-01-05T00:00:00Z"
        closes_at = "2026-02-05T00:00:00Z"

        [[locations]]
        fiscal_year = 2026
        name = "Desa Bulusan"
        quota = 25
        village = "33.74.12.1001"

        [[locations]]
        fiscal_year = 2026
        name = "KKN Kuala Lumpur"
        quota = 10
        country = "Malaysia"
        description = "Kerja sama dengan PPI Malaysia"
    "#;

    #[test]
    fn test_parse_seed_config() {
        let config: SeedConfig = toml::from_str(SEED).unwrap();
        assert_eq!(config.regions.len(), 4);
        assert_eq!(config.regions[0].level, RegionLevel::Province);
        assert!(config.regions[0].parent.is_none());
        assert_eq!(config.regions[3].parent.as_deref(), Some("33.74.12"));

        assert_eq!(config.fiscal_years.len(), 1);
        assert!(config.fiscal_years[0].active);
        assert_eq!(config.fiscal_years[0].waves.len(), 1);

        assert_eq!(config.locations.len(), 2);
        assert_eq!(config.locations[1].country.as_deref(), Some("Malaysia"));
    }

    #[test]
    fn test_load_default_config_reads_shipped_seed() {
        if std::env::var_os("KKN_SEED_PATH").is_some() {
            return;
        }
        let config = load_default_config().unwrap();
        assert_eq!(config.regions.len(), 4);
        assert!(config.fiscal_years.iter().any(|year| year.active));
        assert!(!config.locations.is_empty());
    }

    #[test]
    fn test_parse_rejects_unknown_level() {
        let bad = r#"
            [[regions]]
            code = "33"
            name = "Jawa Tengah"
            level = "kecamatan"
        "#;
        assert!(toml::from_str::<SeedConfig>(bad).is_err());
    }

    #[tokio::test]
    async fn test_seed_registry_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let config: SeedConfig = toml::from_str(SEED).unwrap();

        let first = seed_registry(&db, &config).await?;
        assert_eq!(
            first,
            SeedReport {
                regions: 4,
                fiscal_years: 1,
                waves: 1,
                locations: 2,
            }
        );

        let second = seed_registry(&db, &config).await?;
        assert_eq!(second, SeedReport::default());

        let active = registry::active_fiscal_year(&db).await?.unwrap();
        assert_eq!(active.year, 2026);
        let locations = registry::list_locations(&db, active.id).await?;
        assert_eq!(locations.len(), 2);
        assert!(locations.iter().any(|l| l.is_international));
        assert!(
            system_state::get_value(&db, system_state::REGISTRY_SEEDED_AT)
                .await?
                .is_some()
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_seed_registry_rolls_back_on_bad_location() -> Result<()> {
        let db = setup_test_db().await?;
        let mut config: SeedConfig = toml::from_str(SEED).unwrap();
        config.locations[0].village = Some("00.00".to_string());

        assert!(seed_registry(&db, &config).await.is_err());
        assert!(registry::get_region_by_code(&db, "33").await?.is_none());
        Ok(())
    }
}
