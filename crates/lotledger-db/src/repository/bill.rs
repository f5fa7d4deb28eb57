//! # Bill Line Repository
//!
//! Batch-traceable sale lines. Each completed reservation writes exactly
//! one line naming the batch it consumed, so any sold unit can be traced
//! from the bill back to its purchase batch — this is why allocation
//! matters and a bare stock counter would not do.
//!
//! Lines are written inside the reservation transaction (see
//! [`crate::transfer::StockTransferEngine::reserve_for_sale`]); this
//! repository only provides the direct reads and the id generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::DbResult;
use lotledger_core::StockTier;

/// A persisted bill line.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BillItem {
    pub id: String,
    /// External billing document this line belongs to.
    pub bill_ref: String,
    pub product_code: String,
    /// The exact batch the sold units came from.
    pub batch_number: i64,
    pub tier: StockTier,
    pub quantity: i64,
    /// Selling price per unit at sale time (frozen).
    pub unit_price_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Repository for bill line reads.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Gets a bill line by id.
    pub async fn get(&self, id: &str) -> DbResult<Option<BillItem>> {
        let item = sqlx::query_as::<_, BillItem>("SELECT * FROM bill_items WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    /// All lines of one billing document, in insertion order.
    pub async fn lines_for_bill(&self, bill_ref: &str) -> DbResult<Vec<BillItem>> {
        let items = sqlx::query_as::<_, BillItem>(
            "SELECT * FROM bill_items WHERE bill_ref = ?1 ORDER BY created_at, id",
        )
        .bind(bill_ref)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// All lines that drew from one batch (traceability report).
    pub async fn lines_for_batch(&self, batch_number: i64) -> DbResult<Vec<BillItem>> {
        let items = sqlx::query_as::<_, BillItem>(
            "SELECT * FROM bill_items WHERE batch_number = ?1 ORDER BY created_at, id",
        )
        .bind(batch_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

/// Inserts a bill line inside the caller's transaction.
pub(crate) async fn insert_line(conn: &mut SqliteConnection, item: &BillItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bill_items (
            id, bill_ref, product_code, batch_number,
            tier, quantity, unit_price_cents, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(&item.bill_ref)
    .bind(&item.product_code)
    .bind(item.batch_number)
    .bind(item.tier)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Fetches a bill line inside the caller's transaction.
pub(crate) async fn get_line(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<BillItem>> {
    let item = sqlx::query_as::<_, BillItem>("SELECT * FROM bill_items WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(item)
}

/// Deletes a bill line inside the caller's transaction (sale reversal).
pub(crate) async fn delete_line(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM bill_items WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Generates a new bill line id.
pub fn generate_bill_item_id() -> String {
    Uuid::new_v4().to_string()
}
