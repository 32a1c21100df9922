//! Load, validate and upsert the hexagram reference dataset.

use std::path::Path;

use anyhow::Context;
use iching_core::catalog::HexagramCatalog;
use iching_db::models::hexagram::UpsertHexagram;
use iching_db::repositories::HexagramRepo;
use iching_db::DbPool;

/// Default dataset location, relative to the working directory.
pub const DEFAULT_DATA_PATH: &str = "data/hexagrams.sample.json";

/// Outcome of a seeding run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub upserted: usize,
    pub total_rows: i64,
    pub missing_pairs: usize,
}

/// Read and validate a JSON dataset. Any invalid row fails the whole load.
pub fn load_dataset(path: &Path) -> anyhow::Result<HexagramCatalog> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read hexagram dataset at {}", path.display()))?;
    HexagramCatalog::from_json(&json)
        .with_context(|| format!("Invalid hexagram dataset at {}", path.display()))
}

/// Upsert every hexagram in `catalog` by sequence.
pub async fn seed(pool: &DbPool, catalog: &HexagramCatalog) -> anyhow::Result<SeedReport> {
    let mut upserted = 0;
    for hexagram in catalog.iter() {
        HexagramRepo::upsert(pool, &UpsertHexagram::from(hexagram))
            .await
            .with_context(|| format!("Failed to upsert hexagram #{}", hexagram.sequence))?;
        upserted += 1;
    }
    let total_rows = HexagramRepo::count(pool).await?;

    Ok(SeedReport {
        upserted,
        total_rows,
        missing_pairs: catalog.missing_pairs().len(),
    })
}
