use kkn_engine::{
    config::{database, seed},
    core::registry,
    errors::Result,
};
use dotenvy::dotenv;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {e}"))?;

    // 4. Apply the registry seed when one is present
    let seed_path = seed::seed_path();
    if Path::new(&seed_path).exists() {
        let config = seed::load_default_config()?;
        seed::seed_registry(&db, &config)
            .await
            .inspect_err(|e| error!("Failed to apply seed {seed_path}: {e}"))?;
    } else {
        info!("No seed file at {seed_path}, skipping registry seed.");
    }

    // 5. Overview of the active period
    let Some(active) = registry::active_fiscal_year(&db).await? else {
        warn!("No active fiscal year configured.");
        return Ok(());
    };
    info!(fiscal_year = %active.name, "Active fiscal year");
    for location in registry::list_locations(&db, active.id).await? {
        let availability = registry::location_availability(&db, location.id).await?;
        info!(
            location = %location.name,
            quota = availability.quota,
            registered = availability.registered,
            remaining = availability.remaining,
            "Location capacity"
        );
    }

    Ok(())
}
