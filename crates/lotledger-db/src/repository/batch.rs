//! # Batch Ledger Repository
//!
//! Database operations for the main inventory ledger.
//!
//! ## Ledger Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Batch Lifecycle                               │
//! │                                                                     │
//! │  add_batch (manager)                                                │
//! │      └── INSERT, batch_number assigned monotonically, never reused  │
//! │                                                                     │
//! │  issue to tier (transfer engine)                                    │
//! │      └── remaining_quantity -= qty  (reduce_remaining)              │
//! │                                                                     │
//! │  undo issue (transfer engine)                                       │
//! │      └── remaining_quantity += qty  (restore_remaining)             │
//! │                                                                     │
//! │  remove_batch (manager)                                             │
//! │      └── DELETE, only while untouched: remaining == received AND    │
//! │          no bill line ever referenced the batch                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `quantity_received` is immutable. `remaining_quantity` moves only
//! through the reduce/restore pair below, so the conservation law
//! (remaining + tier holdings + sold == received) is enforceable here
//! and in the tier table alone.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbResult, LedgerResult};
use lotledger_core::allocation::BatchCandidate;
use lotledger_core::validation::validate_new_batch;
use lotledger_core::{Batch, NewBatch, StockError};

/// Repository for batch ledger operations.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
}

impl BatchRepository {
    /// Creates a new BatchRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BatchRepository { pool }
    }

    /// Creates a batch in the main ledger.
    ///
    /// ## Rules
    /// - Input is validated first: positive quantity and price, purchase
    ///   date not in the future (`ValidationError` otherwise)
    /// - `batch_number` is assigned by the database, monotonic, never
    ///   reused (AUTOINCREMENT)
    /// - `remaining_quantity` starts at the received quantity
    pub async fn insert(&self, new_batch: &NewBatch) -> LedgerResult<Batch> {
        validate_new_batch(new_batch, Utc::now().date_naive()).map_err(StockError::from)?;

        debug!(
            product = %new_batch.product_code,
            quantity = new_batch.quantity,
            "Inserting batch"
        );

        let now = Utc::now();
        let batch = sqlx::query_as::<_, Batch>(
            r#"
            INSERT INTO batches (
                product_code, quantity_received, purchase_price_cents,
                purchase_date, expiry_date, supplier,
                remaining_quantity, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?2, ?7)
            RETURNING *
            "#,
        )
        .bind(&new_batch.product_code)
        .bind(new_batch.quantity)
        .bind(new_batch.purchase_price_cents)
        .bind(new_batch.purchase_date)
        .bind(new_batch.expiry_date)
        .bind(&new_batch.supplier)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(crate::error::DbError::from)?;

        debug!(batch_number = batch.batch_number, "Batch created");
        Ok(batch)
    }

    /// Gets a batch by number, failing with `BatchNotFound` when absent.
    pub async fn get(&self, batch_number: i64) -> LedgerResult<Batch> {
        let mut conn = self.pool.acquire().await.map_err(crate::error::DbError::from)?;
        get_batch(&mut conn, batch_number).await
    }

    /// Gets a batch by number, `None` when absent.
    pub async fn try_get(&self, batch_number: i64) -> DbResult<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(
            "SELECT * FROM batches WHERE batch_number = ?1",
        )
        .bind(batch_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(batch)
    }

    /// Removes an untouched batch, returning its prior state for undo.
    ///
    /// ## Fails with `BatchInUse` when
    /// - any unit has left the main ledger (`remaining != received`,
    ///   which also covers units currently sitting in a tier), or
    /// - any bill line ever referenced the batch (sold stock stays
    ///   traceable forever)
    pub async fn remove(&self, batch_number: i64) -> LedgerResult<Batch> {
        debug!(batch_number, "Removing batch");

        let mut tx = self.pool.begin().await.map_err(crate::error::DbError::from)?;

        let batch = get_batch(&mut tx, batch_number).await?;

        if !batch.is_untouched() {
            return Err(StockError::BatchInUse { batch_number }.into());
        }

        let bill_refs: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM bill_items WHERE batch_number = ?1")
                .bind(batch_number)
                .fetch_one(&mut *tx)
                .await
                .map_err(crate::error::DbError::from)?;

        if bill_refs > 0 {
            return Err(StockError::BatchInUse { batch_number }.into());
        }

        // Zero-quantity tier rows hold nothing; purge them so the batch
        // row can go. Non-zero rows are impossible here (the batch is
        // untouched), but the guard above is what enforces that.
        sqlx::query("DELETE FROM tier_stock WHERE batch_number = ?1 AND quantity = 0")
            .bind(batch_number)
            .execute(&mut *tx)
            .await
            .map_err(crate::error::DbError::from)?;

        sqlx::query("DELETE FROM batches WHERE batch_number = ?1")
            .bind(batch_number)
            .execute(&mut *tx)
            .await
            .map_err(crate::error::DbError::from)?;

        tx.commit().await.map_err(crate::error::DbError::from)?;

        debug!(batch_number, "Batch removed");
        Ok(batch)
    }

    /// Re-creates a previously removed batch under its original number.
    ///
    /// Used solely by the undo layer to invert `remove`. AUTOINCREMENT
    /// permits explicit ids, so the original batch number is preserved.
    pub async fn reinsert(&self, batch: &Batch) -> LedgerResult<()> {
        debug!(batch_number = batch.batch_number, "Re-inserting removed batch");

        sqlx::query(
            r#"
            INSERT INTO batches (
                batch_number, product_code, quantity_received,
                purchase_price_cents, purchase_date, expiry_date,
                supplier, remaining_quantity, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(batch.batch_number)
        .bind(&batch.product_code)
        .bind(batch.quantity_received)
        .bind(batch.purchase_price_cents)
        .bind(batch.purchase_date)
        .bind(batch.expiry_date)
        .bind(&batch.supplier)
        .bind(batch.remaining_quantity)
        .bind(batch.created_at)
        .execute(&self.pool)
        .await
        .map_err(crate::error::DbError::from)?;

        Ok(())
    }

    /// Reduces the main-ledger remaining quantity.
    ///
    /// Fails with `InsufficientStock` if `qty` exceeds what remains.
    pub async fn reduce_remaining(&self, batch_number: i64, qty: i64) -> LedgerResult<()> {
        let mut tx = self.pool.begin().await.map_err(crate::error::DbError::from)?;
        reduce_remaining(&mut tx, batch_number, qty).await?;
        tx.commit().await.map_err(crate::error::DbError::from)?;
        Ok(())
    }

    /// Restores previously reduced remaining quantity.
    ///
    /// Defensive: fails with `InsufficientStock` if the restore would
    /// push remaining past `quantity_received`.
    pub async fn restore_remaining(&self, batch_number: i64, qty: i64) -> LedgerResult<()> {
        let mut tx = self.pool.begin().await.map_err(crate::error::DbError::from)?;
        restore_remaining(&mut tx, batch_number, qty).await?;
        tx.commit().await.map_err(crate::error::DbError::from)?;
        Ok(())
    }

    /// Lists all batches of a product, oldest first.
    pub async fn list_for_product(&self, product_code: &str) -> DbResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(
            "SELECT * FROM batches WHERE product_code = ?1 ORDER BY batch_number",
        )
        .bind(product_code)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Lists batches across all products (for reports).
    pub async fn list_all(&self, limit: u32) -> DbResult<Vec<Batch>> {
        let batches =
            sqlx::query_as::<_, Batch>("SELECT * FROM batches ORDER BY batch_number LIMIT ?1")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;

        Ok(batches)
    }

    /// Low-stock report: batches whose main-ledger remaining quantity has
    /// fallen below `threshold` (but is not exhausted).
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(
            r#"
            SELECT * FROM batches
            WHERE remaining_quantity > 0 AND remaining_quantity < ?1
            ORDER BY remaining_quantity, batch_number
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Expiry-window report: batches expiring on or before the given date.
    /// Non-expiring batches never appear.
    pub async fn expiring_within(&self, on_or_before: chrono::NaiveDate) -> DbResult<Vec<Batch>> {
        let batches = sqlx::query_as::<_, Batch>(
            r#"
            SELECT * FROM batches
            WHERE expiry_date IS NOT NULL AND expiry_date <= ?1
            ORDER BY expiry_date, batch_number
            "#,
        )
        .bind(on_or_before)
        .fetch_all(&self.pool)
        .await?;

        Ok(batches)
    }

    /// Counts batches (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batches")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================
// These run on a borrowed connection so the transfer engine can compose
// them with tier mutations inside a single transaction.

/// Fetches a batch or fails with `BatchNotFound`.
pub(crate) async fn get_batch(
    conn: &mut SqliteConnection,
    batch_number: i64,
) -> LedgerResult<Batch> {
    let batch = sqlx::query_as::<_, Batch>("SELECT * FROM batches WHERE batch_number = ?1")
        .bind(batch_number)
        .fetch_optional(&mut *conn)
        .await
        .map_err(crate::error::DbError::from)?;

    batch.ok_or_else(|| StockError::BatchNotFound { batch_number }.into())
}

/// Reduces remaining quantity after checking the balance.
pub(crate) async fn reduce_remaining(
    conn: &mut SqliteConnection,
    batch_number: i64,
    qty: i64,
) -> LedgerResult<()> {
    let batch = get_batch(&mut *conn, batch_number).await?;

    if batch.remaining_quantity < qty {
        return Err(StockError::InsufficientStock {
            product: batch.product_code,
            available: batch.remaining_quantity,
            requested: qty,
        }
        .into());
    }

    sqlx::query(
        "UPDATE batches SET remaining_quantity = remaining_quantity - ?2 WHERE batch_number = ?1",
    )
    .bind(batch_number)
    .bind(qty)
    .execute(&mut *conn)
    .await
    .map_err(crate::error::DbError::from)?;

    debug!(batch_number, qty, "Reduced main-ledger remaining");
    Ok(())
}

/// Restores remaining quantity after the defensive ceiling check.
pub(crate) async fn restore_remaining(
    conn: &mut SqliteConnection,
    batch_number: i64,
    qty: i64,
) -> LedgerResult<()> {
    let batch = get_batch(&mut *conn, batch_number).await?;

    let headroom = batch.quantity_received - batch.remaining_quantity;
    if qty > headroom {
        return Err(StockError::InsufficientStock {
            product: batch.product_code,
            available: headroom,
            requested: qty,
        }
        .into());
    }

    sqlx::query(
        "UPDATE batches SET remaining_quantity = remaining_quantity + ?2 WHERE batch_number = ?1",
    )
    .bind(batch_number)
    .bind(qty)
    .execute(&mut *conn)
    .await
    .map_err(crate::error::DbError::from)?;

    debug!(batch_number, qty, "Restored main-ledger remaining");
    Ok(())
}

/// Allocation candidates from main-ledger remaining quantities.
pub(crate) async fn main_ledger_candidates(
    conn: &mut SqliteConnection,
    product_code: &str,
) -> DbResult<Vec<BatchCandidate>> {
    let candidates = sqlx::query_as::<_, BatchCandidate>(
        r#"
        SELECT batch_number, purchase_date, expiry_date,
               remaining_quantity AS available
        FROM batches
        WHERE product_code = ?1 AND remaining_quantity > 0
        ORDER BY batch_number
        "#,
    )
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
    use lotledger_core::ValidationError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_batch(product: &str, qty: i64) -> NewBatch {
        NewBatch {
            product_code: product.to_string(),
            quantity: qty,
            purchase_price_cents: 1250,
            purchase_date: date(2024, 11, 3),
            expiry_date: None,
            supplier: None,
        }
    }

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_monotonic_numbers() {
        let db = test_db().await;
        let repo = db.batches();

        let b1 = repo.insert(&new_batch("RICE-5KG", 100)).await.unwrap();
        let b2 = repo.insert(&new_batch("RICE-5KG", 50)).await.unwrap();

        assert!(b2.batch_number > b1.batch_number);
        assert_eq!(b1.remaining_quantity, 100);
        assert_eq!(b1.quantity_received, 100);
    }

    #[tokio::test]
    async fn test_batch_numbers_never_reused_after_removal() {
        let db = test_db().await;
        let repo = db.batches();

        let b1 = repo.insert(&new_batch("RICE-5KG", 100)).await.unwrap();
        repo.remove(b1.batch_number).await.unwrap();

        let b2 = repo.insert(&new_batch("RICE-5KG", 100)).await.unwrap();
        assert!(b2.batch_number > b1.batch_number);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_input() {
        let db = test_db().await;
        let repo = db.batches();

        let mut bad = new_batch("RICE-5KG", 0);
        let err = repo.insert(&bad).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Stock(StockError::Validation(ValidationError::MustBePositive { .. }))
        ));

        bad = new_batch("RICE-5KG", 10);
        bad.purchase_price_cents = -1;
        assert!(repo.insert(&bad).await.is_err());

        bad = new_batch("RICE-5KG", 10);
        bad.purchase_date = Utc::now().date_naive() + chrono::Duration::days(2);
        let err = repo.insert(&bad).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Stock(StockError::Validation(ValidationError::FutureDate { .. }))
        ));
    }

    #[tokio::test]
    async fn test_reduce_and_restore_remaining() {
        let db = test_db().await;
        let repo = db.batches();

        let b = repo.insert(&new_batch("RICE-5KG", 100)).await.unwrap();

        repo.reduce_remaining(b.batch_number, 40).await.unwrap();
        assert_eq!(
            repo.get(b.batch_number).await.unwrap().remaining_quantity,
            60
        );

        // Over-reduce fails with the actual balance in the payload.
        let err = repo.reduce_remaining(b.batch_number, 61).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Stock(StockError::InsufficientStock {
                available: 60,
                requested: 61,
                ..
            })
        ));

        repo.restore_remaining(b.batch_number, 40).await.unwrap();
        assert_eq!(
            repo.get(b.batch_number).await.unwrap().remaining_quantity,
            100
        );

        // Restore past quantity_received is refused (defensive).
        let err = repo.restore_remaining(b.batch_number, 1).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Stock(StockError::InsufficientStock { .. })
        ));
    }

    #[tokio::test]
    async fn test_remove_touched_batch_conflicts() {
        let db = test_db().await;
        let repo = db.batches();

        let b = repo.insert(&new_batch("RICE-5KG", 100)).await.unwrap();
        repo.reduce_remaining(b.batch_number, 5).await.unwrap();

        let err = repo.remove(b.batch_number).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Stock(StockError::BatchInUse { .. })
        ));

        // Restoring makes it untouched again; removal then succeeds and
        // hands back the prior state.
        repo.restore_remaining(b.batch_number, 5).await.unwrap();
        let removed = repo.remove(b.batch_number).await.unwrap();
        assert_eq!(removed.batch_number, b.batch_number);
        assert!(repo.try_get(b.batch_number).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_batch_is_reported() {
        let db = test_db().await;
        let repo = db.batches();

        let err = repo.get(42).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Stock(StockError::BatchNotFound { batch_number: 42 })
        ));
    }

    #[tokio::test]
    async fn test_report_filters() {
        let db = test_db().await;
        let repo = db.batches();

        let mut nb = new_batch("RICE-5KG", 100);
        nb.expiry_date = Some(date(2025, 3, 1));
        let expiring = repo.insert(&nb).await.unwrap();

        let stable = repo.insert(&new_batch("SALT-1KG", 8)).await.unwrap();
        repo.reduce_remaining(stable.batch_number, 3).await.unwrap();

        let low = repo.low_stock(10).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].batch_number, stable.batch_number);

        let soon = repo.expiring_within(date(2025, 6, 1)).await.unwrap();
        assert_eq!(soon.len(), 1);
        assert_eq!(soon[0].batch_number, expiring.batch_number);

        let later = repo.expiring_within(date(2025, 2, 1)).await.unwrap();
        assert!(later.is_empty());
    }
}
