//! # Product Catalog Repository
//!
//! The slice of the product catalog this ledger consumes: existence and
//! unit price. Catalog metadata (name, category, descriptions) is owned
//! by the catalog collaborator and never feeds allocation decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbResult, LedgerResult};
use lotledger_core::{Money, StockError};

/// A catalog product as stored locally.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CatalogProduct {
    /// Business identifier, referenced by batches and bill lines.
    pub code: String,
    pub name: String,
    /// Selling price in cents (cost/total calculations only).
    pub unit_price_cents: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl CatalogProduct {
    /// Returns the selling price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }
}

/// Repository for the catalog collaborator interface.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// True when the product exists and is active.
    pub async fn product_exists(&self, code: &str) -> DbResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM products WHERE code = ?1 AND is_active = 1")
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;

        Ok(found.is_some())
    }

    /// Unit selling price of an active product.
    pub async fn unit_price(&self, code: &str) -> LedgerResult<Money> {
        let cents: Option<i64> = sqlx::query_scalar(
            "SELECT unit_price_cents FROM products WHERE code = ?1 AND is_active = 1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(crate::error::DbError::from)?;

        cents
            .map(Money::from_cents)
            .ok_or_else(|| StockError::ProductNotFound(code.to_string()).into())
    }

    /// Gets a product by code.
    pub async fn get(&self, code: &str) -> DbResult<Option<CatalogProduct>> {
        let product = sqlx::query_as::<_, CatalogProduct>(
            r#"
            SELECT code, name, unit_price_cents, is_active, created_at
            FROM products WHERE code = ?1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Inserts or updates a product (seeding and catalog sync).
    pub async fn upsert(&self, code: &str, name: &str, unit_price_cents: i64) -> DbResult<()> {
        debug!(code = %code, "Upserting catalog product");

        sqlx::query(
            r#"
            INSERT INTO products (code, name, unit_price_cents, is_active, created_at)
            VALUES (?1, ?2, ?3, 1, ?4)
            ON CONFLICT (code) DO UPDATE SET
                name = excluded.name,
                unit_price_cents = excluded.unit_price_cents,
                is_active = 1
            "#,
        )
        .bind(code)
        .bind(name)
        .bind(unit_price_cents)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_exists_and_price() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.upsert("RICE-5KG", "Basmati Rice 5kg", 1899)
            .await
            .unwrap();

        assert!(repo.product_exists("RICE-5KG").await.unwrap());
        assert!(!repo.product_exists("NOPE").await.unwrap());

        assert_eq!(
            repo.unit_price("RICE-5KG").await.unwrap(),
            Money::from_cents(1899)
        );

        let err = repo.unit_price("NOPE").await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Stock(StockError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upsert_updates_price() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        repo.upsert("RICE-5KG", "Basmati Rice 5kg", 1899)
            .await
            .unwrap();
        repo.upsert("RICE-5KG", "Basmati Rice 5kg", 1999)
            .await
            .unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(
            repo.unit_price("RICE-5KG").await.unwrap(),
            Money::from_cents(1999)
        );
    }
}
