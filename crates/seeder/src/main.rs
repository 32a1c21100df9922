use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iching_seeder::{load_dataset, seed, DEFAULT_DATA_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iching_seeder=info,iching_db=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Dataset ---
    let data_path = PathBuf::from(
        std::env::var("HEXAGRAM_DATA_PATH").unwrap_or_else(|_| DEFAULT_DATA_PATH.into()),
    );
    let catalog = load_dataset(&data_path)?;
    tracing::info!(path = %data_path.display(), hexagrams = catalog.len(), "Hexagram dataset validated");

    let missing = catalog.missing_pairs();
    if !missing.is_empty() {
        tracing::warn!(
            missing = missing.len(),
            "Dataset is incomplete; casts landing on missing trigram pairs fall back to a random hexagram",
        );
    }

    if std::env::args().any(|arg| arg == "--check") {
        tracing::info!("Check only, database left untouched");
        return Ok(());
    }

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = iching_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    iching_db::health_check(&pool)
        .await
        .context("Database health check failed")?;

    iching_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Seed ---
    let report = seed(&pool, &catalog).await?;
    tracing::info!(
        upserted = report.upserted,
        total_rows = report.total_rows,
        missing_pairs = report.missing_pairs,
        "Hexagram reference data seeded",
    );

    Ok(())
}
