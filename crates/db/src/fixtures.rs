use budtender_core::domain::catalog::CatalogItem;

use crate::connection::DbPool;
use crate::repositories::catalog::{SqlCatalogStore, UpsertOutcome};
use crate::repositories::RepositoryError;

/// Deterministic demo stock used by local runs, the CLI `seed` command and
/// integration tests.
pub struct CatalogSeedDataset;

impl CatalogSeedDataset {
    pub const JSON: &str = include_str!("../../../config/fixtures/demo_catalog.json");

    pub fn items() -> Result<Vec<CatalogItem>, RepositoryError> {
        parse_catalog_json(Self::JSON)
    }

    /// Upserts `items` in order; a later duplicate name replaces an earlier one.
    pub async fn load(pool: &DbPool, items: &[CatalogItem]) -> Result<SeedResult, RepositoryError> {
        let store = SqlCatalogStore::new(pool.clone());
        let mut result = SeedResult::default();
        for item in items {
            if item.name.trim().is_empty() {
                result.skipped += 1;
                continue;
            }
            match store.upsert(item).await? {
                UpsertOutcome::Inserted => result.inserted += 1,
                UpsertOutcome::Updated => result.updated += 1,
            }
        }
        Ok(result)
    }

    /// Checks that every item is present and active.
    pub async fn verify(pool: &DbPool, items: &[CatalogItem]) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::with_capacity(items.len());
        for item in items {
            let present: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM catalog_item WHERE name = ?1 AND active = 1)",
            )
            .bind(&item.name)
            .fetch_one(pool)
            .await?;
            checks.push((item.name.clone(), present == 1));
        }
        Ok(VerificationResult { all_present: checks.iter().all(|(_, ok)| *ok), checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM catalog_item").execute(pool).await?;
        Ok(())
    }
}

pub fn parse_catalog_json(raw: &str) -> Result<Vec<CatalogItem>, RepositoryError> {
    serde_json::from_str(raw).map_err(|e| RepositoryError::Decode(format!("catalog json: {e}")))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedResult {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}
