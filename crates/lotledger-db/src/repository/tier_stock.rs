//! # Tier Stock Repository
//!
//! Per-batch stock balances in the two sales tiers (physical shelf,
//! online warehouse), derived from the main batch ledger by issues.
//!
//! ## Conservation Law
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │   For every batch B:                                                 │
//! │                                                                     │
//! │   B.remaining + Σ tier_stock(B) + Σ sold(B)  ==  B.received         │
//! │                                                                     │
//! │   credit() and debit() below are the ONLY statements that move      │
//! │   tier quantities; both are always paired with the matching         │
//! │   main-ledger or bill mutation inside one transaction               │
//! │   (see crate::transfer).                                            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An entry debited to zero is retained as a zero row; every read here
//! treats a missing row and a zero row identically.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbResult, LedgerResult};
use lotledger_core::allocation::BatchCandidate;
use lotledger_core::{StockError, StockTier, TierStockEntry};

/// Repository for tier stock operations.
#[derive(Debug, Clone)]
pub struct TierStockRepository {
    pool: SqlitePool,
}

impl TierStockRepository {
    /// Creates a new TierStockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TierStockRepository { pool }
    }

    /// Increases (or creates) a tier entry. Always succeeds for
    /// positive quantities.
    pub async fn credit(
        &self,
        tier: StockTier,
        product_code: &str,
        batch_number: i64,
        qty: i64,
    ) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        credit(&mut conn, tier, product_code, batch_number, qty).await
    }

    /// Decreases a tier entry, failing with `InsufficientStock` if the
    /// entry holds fewer than `qty` units. Never leaves a negative
    /// balance.
    pub async fn debit(
        &self,
        tier: StockTier,
        product_code: &str,
        batch_number: i64,
        qty: i64,
    ) -> LedgerResult<()> {
        let mut tx = self.pool.begin().await.map_err(crate::error::DbError::from)?;
        debit(&mut tx, tier, product_code, batch_number, qty).await?;
        tx.commit().await.map_err(crate::error::DbError::from)?;
        Ok(())
    }

    /// Units of one batch held in a tier. Missing rows read as zero.
    pub async fn quantity(
        &self,
        tier: StockTier,
        product_code: &str,
        batch_number: i64,
    ) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        quantity(&mut conn, tier, product_code, batch_number).await
    }

    /// Total units of a product in a tier, summed across batches.
    ///
    /// This is the availability number exposed to the billing and
    /// catalog collaborators for pre-sale checks.
    pub async fn total_for_product(&self, tier: StockTier, product_code: &str) -> DbResult<i64> {
        let total: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(quantity) FROM tier_stock
            WHERE tier = ?1 AND product_code = ?2
            "#,
        )
        .bind(tier)
        .bind(product_code)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }

    /// All non-zero entries of a product in a tier (for reports).
    pub async fn entries_for_product(
        &self,
        tier: StockTier,
        product_code: &str,
    ) -> DbResult<Vec<TierStockEntry>> {
        let entries = sqlx::query_as::<_, TierStockEntry>(
            r#"
            SELECT product_code, batch_number, tier, quantity
            FROM tier_stock
            WHERE tier = ?1 AND product_code = ?2 AND quantity > 0
            ORDER BY batch_number
            "#,
        )
        .bind(tier)
        .bind(product_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================
// Shared with the transfer engine so tier mutations and ledger mutations
// commit or roll back together.

/// Upsert credit. `ON CONFLICT` keeps (product, batch, tier) unique.
pub(crate) async fn credit(
    conn: &mut SqliteConnection,
    tier: StockTier,
    product_code: &str,
    batch_number: i64,
    qty: i64,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO tier_stock (product_code, batch_number, tier, quantity)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (product_code, batch_number, tier)
        DO UPDATE SET quantity = quantity + excluded.quantity
        "#,
    )
    .bind(product_code)
    .bind(batch_number)
    .bind(tier)
    .bind(qty)
    .execute(&mut *conn)
    .await?;

    debug!(tier = %tier, product = %product_code, batch_number, qty, "Credited tier stock");
    Ok(())
}

/// Guarded debit: checks the balance first, then decrements.
pub(crate) async fn debit(
    conn: &mut SqliteConnection,
    tier: StockTier,
    product_code: &str,
    batch_number: i64,
    qty: i64,
) -> LedgerResult<()> {
    let held = quantity(&mut *conn, tier, product_code, batch_number).await?;

    if held < qty {
        return Err(StockError::InsufficientStock {
            product: product_code.to_string(),
            available: held,
            requested: qty,
        }
        .into());
    }

    sqlx::query(
        r#"
        UPDATE tier_stock SET quantity = quantity - ?4
        WHERE product_code = ?1 AND batch_number = ?2 AND tier = ?3
        "#,
    )
    .bind(product_code)
    .bind(batch_number)
    .bind(tier)
    .bind(qty)
    .execute(&mut *conn)
    .await
    .map_err(crate::error::DbError::from)?;

    debug!(tier = %tier, product = %product_code, batch_number, qty, "Debited tier stock");
    Ok(())
}

/// Per-batch quantity; missing row reads as zero.
pub(crate) async fn quantity(
    conn: &mut SqliteConnection,
    tier: StockTier,
    product_code: &str,
    batch_number: i64,
) -> DbResult<i64> {
    let held: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT quantity FROM tier_stock
        WHERE tier = ?1 AND product_code = ?2 AND batch_number = ?3
        "#,
    )
    .bind(tier)
    .bind(product_code)
    .bind(batch_number)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(held.unwrap_or(0))
}

/// Allocation candidates from a tier's balances, joined back to the
/// ledger for purchase/expiry dates.
pub(crate) async fn tier_candidates(
    conn: &mut SqliteConnection,
    tier: StockTier,
    product_code: &str,
) -> DbResult<Vec<BatchCandidate>> {
    let candidates = sqlx::query_as::<_, BatchCandidate>(
        r#"
        SELECT b.batch_number, b.purchase_date, b.expiry_date,
               t.quantity AS available
        FROM tier_stock t
        INNER JOIN batches b ON b.batch_number = t.batch_number
        WHERE t.tier = ?1 AND t.product_code = ?2 AND t.quantity > 0
        ORDER BY b.batch_number
        "#,
    )
    .bind(tier)
    .bind(product_code)
    .fetch_all(&mut *conn)
    .await?;

    Ok(candidates)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use lotledger_core::NewBatch;

    async fn seeded_db() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let batch = db
            .batches()
            .insert(&NewBatch {
                product_code: "RICE-5KG".to_string(),
                quantity: 100,
                purchase_price_cents: 1250,
                purchase_date: NaiveDate::from_ymd_opt(2024, 11, 3).unwrap(),
                expiry_date: None,
                supplier: None,
            })
            .await
            .unwrap();
        (db, batch.batch_number)
    }

    #[tokio::test]
    async fn test_credit_creates_then_accumulates() {
        let (db, batch) = seeded_db().await;
        let repo = db.tier_stock();

        repo.credit(StockTier::Physical, "RICE-5KG", batch, 10)
            .await
            .unwrap();
        repo.credit(StockTier::Physical, "RICE-5KG", batch, 15)
            .await
            .unwrap();

        assert_eq!(
            repo.quantity(StockTier::Physical, "RICE-5KG", batch)
                .await
                .unwrap(),
            25
        );
        // Other tier is unaffected.
        assert_eq!(
            repo.quantity(StockTier::Online, "RICE-5KG", batch)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_debit_never_goes_negative() {
        let (db, batch) = seeded_db().await;
        let repo = db.tier_stock();

        repo.credit(StockTier::Online, "RICE-5KG", batch, 10)
            .await
            .unwrap();

        let err = repo
            .debit(StockTier::Online, "RICE-5KG", batch, 11)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Stock(StockError::InsufficientStock {
                available: 10,
                requested: 11,
                ..
            })
        ));

        // Balance unchanged after the refused debit.
        assert_eq!(
            repo.quantity(StockTier::Online, "RICE-5KG", batch)
                .await
                .unwrap(),
            10
        );
    }

    #[tokio::test]
    async fn test_zero_entry_reads_as_zero() {
        let (db, batch) = seeded_db().await;
        let repo = db.tier_stock();

        repo.credit(StockTier::Physical, "RICE-5KG", batch, 10)
            .await
            .unwrap();
        repo.debit(StockTier::Physical, "RICE-5KG", batch, 10)
            .await
            .unwrap();

        // Row retained at zero: reads and listings treat it as absent.
        assert_eq!(
            repo.quantity(StockTier::Physical, "RICE-5KG", batch)
                .await
                .unwrap(),
            0
        );
        assert!(repo
            .entries_for_product(StockTier::Physical, "RICE-5KG")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            repo.total_for_product(StockTier::Physical, "RICE-5KG")
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_total_sums_across_batches() {
        let (db, b1) = seeded_db().await;
        let b2 = db
            .batches()
            .insert(&NewBatch {
                product_code: "RICE-5KG".to_string(),
                quantity: 50,
                purchase_price_cents: 1300,
                purchase_date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
                expiry_date: None,
                supplier: None,
            })
            .await
            .unwrap()
            .batch_number;

        let repo = db.tier_stock();
        repo.credit(StockTier::Physical, "RICE-5KG", b1, 10)
            .await
            .unwrap();
        repo.credit(StockTier::Physical, "RICE-5KG", b2, 7)
            .await
            .unwrap();

        assert_eq!(
            repo.total_for_product(StockTier::Physical, "RICE-5KG")
                .await
                .unwrap(),
            17
        );

        let entries = repo
            .entries_for_product(StockTier::Physical, "RICE-5KG")
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
    }
}
