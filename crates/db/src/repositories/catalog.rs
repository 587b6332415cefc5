use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;

use budtender_core::catalog::CatalogStore;
use budtender_core::domain::catalog::{CatalogItem, StrainType, TierPrices};
use budtender_core::errors::UpstreamError;

use super::{decode, timestamp, RepositoryError};
use crate::DbPool;

const SERVICE: &str = "catalog_store";

pub struct SqlCatalogStore {
    pool: DbPool,
}

/// Whether an upsert created a row or replaced one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl SqlCatalogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_active(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT name, category, strain_type, thc, cbg, price_per_piece, price_per_gram,
                    price_per_5g, price_per_20g, in_house
             FROM catalog_item WHERE active = 1 ORDER BY category, name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_item).collect()
    }

    pub async fn upsert(&self, item: &CatalogItem) -> Result<UpsertOutcome, RepositoryError> {
        let existing: i64 = sqlx::query("SELECT COUNT(*) AS count FROM catalog_item WHERE name = ?")
            .bind(&item.name)
            .fetch_one(&self.pool)
            .await?
            .try_get("count")
            .map_err(decode)?;

        sqlx::query(
            "INSERT INTO catalog_item (name, category, strain_type, thc, cbg, price_per_piece,
                                       price_per_gram, price_per_5g, price_per_20g, in_house,
                                       active, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?)
             ON CONFLICT(name) DO UPDATE SET
                 category = excluded.category,
                 strain_type = excluded.strain_type,
                 thc = excluded.thc,
                 cbg = excluded.cbg,
                 price_per_piece = excluded.price_per_piece,
                 price_per_gram = excluded.price_per_gram,
                 price_per_5g = excluded.price_per_5g,
                 price_per_20g = excluded.price_per_20g,
                 in_house = excluded.in_house,
                 active = 1,
                 updated_at = excluded.updated_at",
        )
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.strain_type.as_str())
        .bind(item.thc.map(|value| value.to_string()))
        .bind(item.cbg.map(|value| value.to_string()))
        .bind(item.prices.per_piece.map(|value| value.to_string()))
        .bind(item.prices.per_gram.map(|value| value.to_string()))
        .bind(item.prices.per_5g.map(|value| value.to_string()))
        .bind(item.prices.per_20g.map(|value| value.to_string()))
        .bind(item.in_house)
        .bind(timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(if existing > 0 { UpsertOutcome::Updated } else { UpsertOutcome::Inserted })
    }

    /// Hides an item from every subsequent catalog snapshot.
    pub async fn deactivate(&self, name: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE catalog_item SET active = 0, updated_at = ? WHERE name = ?")
            .bind(timestamp(&Utc::now()))
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CatalogStore for SqlCatalogStore {
    async fn fetch_all(&self) -> Result<Vec<CatalogItem>, UpstreamError> {
        self.list_active().await.map_err(|error| error.into_upstream(SERVICE))
    }
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<CatalogItem, RepositoryError> {
    let name: String = row.try_get("name").map_err(decode)?;
    let category: String = row.try_get("category").map_err(decode)?;
    let strain_type: String = row.try_get("strain_type").map_err(decode)?;
    let in_house: bool = row.try_get("in_house").map_err(decode)?;

    Ok(CatalogItem {
        name,
        category,
        strain_type: StrainType::parse_lenient(&strain_type),
        thc: decimal_column(row, "thc")?,
        cbg: decimal_column(row, "cbg")?,
        prices: TierPrices {
            per_piece: decimal_column(row, "price_per_piece")?,
            per_gram: decimal_column(row, "price_per_gram")?,
            per_5g: decimal_column(row, "price_per_5g")?,
            per_20g: decimal_column(row, "price_per_20g")?,
        },
        in_house,
    })
}

fn decimal_column(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<Option<Decimal>, RepositoryError> {
    let raw: Option<String> = row.try_get(column).map_err(decode)?;
    raw.map(|value| {
        Decimal::from_str(value.trim())
            .map_err(|e| RepositoryError::Decode(format!("{column}: {e}")))
    })
    .transpose()
}
