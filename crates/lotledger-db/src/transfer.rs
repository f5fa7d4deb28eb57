//! # Stock Transfer Engine
//!
//! The compound operations that move units between the main batch ledger,
//! the sales tiers, and completed bills.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     Stock Transfer Engine                            │
//! │                                                                     │
//! │  issue_to_tier (manager)                                             │
//! │    allocate over main-ledger remaining                               │
//! │        └── reduce_remaining(batch) + credit(tier)     ← one tx       │
//! │                                                                     │
//! │  reserve_for_sale (billing)                                          │
//! │    allocate over tier balances                                        │
//! │        └── debit(tier) + insert bill line             ← one tx       │
//! │                                                                     │
//! │  reverse_issue / reverse_sale (undo & void paths)                     │
//! │        └── the exact inverses, defensive checks only  ← one tx       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity & Races
//! Each compound operation runs its read-select-write sequence inside a
//! single SQLite transaction, and all of them acquire one shared async
//! mutex first. Without the mutex, two concurrent reservations could both
//! select the same batch believing it has sufficient quantity (classic
//! check-then-act race); with it, allocation and mutation are a single
//! serialized step. Lock-contention retries belong to callers, never to
//! business-rule failures.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{DbError, LedgerResult};
use crate::repository::bill::{self, BillItem};
use crate::repository::{batch, tier_stock};
use lotledger_core::allocation::{self, AllocationPlan};
use lotledger_core::validation::{validate_product_code, validate_quantity};
use lotledger_core::{AllocationSource, BatchReference, StockError, StockIssue, StockTier};

/// Engine for atomic stock transfers.
///
/// Cheap to clone; clones obtained from the same [`crate::Database`]
/// share the operation lock.
#[derive(Debug, Clone)]
pub struct StockTransferEngine {
    pool: SqlitePool,
    /// Serializes compound operations across all clones.
    op_lock: Arc<Mutex<()>>,
}

impl StockTransferEngine {
    /// Creates an engine over the given pool and shared operation lock.
    pub fn new(pool: SqlitePool, op_lock: Arc<Mutex<()>>) -> Self {
        StockTransferEngine { pool, op_lock }
    }

    /// Side-effect-free allocation preview.
    ///
    /// Reproduces exactly the batch the committing call would choose:
    /// both paths run [`lotledger_core::allocation`] over the same
    /// candidate query.
    pub async fn analyze(
        &self,
        product_code: &str,
        quantity: i64,
        source: AllocationSource,
    ) -> LedgerResult<AllocationPlan> {
        validate_product_code(product_code).map_err(StockError::from)?;
        validate_quantity(quantity).map_err(StockError::from)?;

        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;
        let candidates = match source {
            AllocationSource::MainLedger => {
                batch::main_ledger_candidates(&mut conn, product_code).await?
            }
            AllocationSource::Tier(tier) => {
                tier_stock::tier_candidates(&mut conn, tier, product_code).await?
            }
        };

        Ok(allocation::plan(product_code, quantity, source, &candidates))
    }

    /// Issues `quantity` units of a product from the main ledger to a tier.
    ///
    /// Allocation picks one batch (FIFO + nearest expiry, never split);
    /// the ledger reduction and the tier credit commit together.
    pub async fn issue_to_tier(
        &self,
        product_code: &str,
        quantity: i64,
        tier: StockTier,
    ) -> LedgerResult<StockIssue> {
        validate_product_code(product_code).map_err(StockError::from)?;
        validate_quantity(quantity).map_err(StockError::from)?;

        let _guard = self.op_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let candidates = batch::main_ledger_candidates(&mut tx, product_code).await?;
        let selected = allocation::select(
            product_code,
            quantity,
            AllocationSource::MainLedger,
            &candidates,
        )?;

        batch::reduce_remaining(&mut tx, selected.batch_number, quantity).await?;
        tier_stock::credit(&mut tx, tier, product_code, selected.batch_number, quantity).await?;

        tx.commit().await.map_err(DbError::from)?;

        let issue = StockIssue {
            product_code: product_code.to_string(),
            batch_number: selected.batch_number,
            tier,
            quantity,
            remaining_after: selected.available - quantity,
        };

        info!(
            product = %issue.product_code,
            batch_number = issue.batch_number,
            tier = %issue.tier,
            quantity = issue.quantity,
            "Issued stock to tier"
        );
        Ok(issue)
    }

    /// Reserves `quantity` units from a tier for a sale, recording the
    /// batch-traceable bill line.
    ///
    /// Allocation runs over the tier's per-batch balances; the tier debit
    /// and the bill line commit together. Never arms the undo layer.
    pub async fn reserve_for_sale(
        &self,
        product_code: &str,
        quantity: i64,
        tier: StockTier,
        bill_ref: &str,
    ) -> LedgerResult<BatchReference> {
        validate_product_code(product_code).map_err(StockError::from)?;
        validate_quantity(quantity).map_err(StockError::from)?;

        let _guard = self.op_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let candidates = tier_stock::tier_candidates(&mut tx, tier, product_code).await?;
        let selected = allocation::select(
            product_code,
            quantity,
            AllocationSource::Tier(tier),
            &candidates,
        )?;

        tier_stock::debit(&mut tx, tier, product_code, selected.batch_number, quantity).await?;

        // Freeze the selling price on the line. Reservations are only
        // issued for cataloged products.
        let unit_price_cents: Option<i64> = sqlx::query_scalar(
            "SELECT unit_price_cents FROM products WHERE code = ?1 AND is_active = 1",
        )
        .bind(product_code)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DbError::from)?;
        let unit_price_cents = unit_price_cents
            .ok_or_else(|| StockError::ProductNotFound(product_code.to_string()))?;

        let item = BillItem {
            id: bill::generate_bill_item_id(),
            bill_ref: bill_ref.to_string(),
            product_code: product_code.to_string(),
            batch_number: selected.batch_number,
            tier,
            quantity,
            unit_price_cents,
            created_at: Utc::now(),
        };
        bill::insert_line(&mut tx, &item).await?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            product = %product_code,
            batch_number = selected.batch_number,
            tier = %tier,
            quantity,
            bill_ref = %bill_ref,
            "Reserved stock for sale"
        );

        Ok(BatchReference {
            product_code: product_code.to_string(),
            batch_number: selected.batch_number,
            tier,
            quantity,
            bill_item_id: item.id,
        })
    }

    /// Exact inverse of an issue: debit the tier, restore the main
    /// ledger. Used by the undo layer; defensive checks only.
    pub async fn reverse_issue(
        &self,
        product_code: &str,
        quantity: i64,
        tier: StockTier,
        batch_number: i64,
    ) -> LedgerResult<()> {
        let _guard = self.op_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        tier_stock::debit(&mut tx, tier, product_code, batch_number, quantity).await?;
        batch::restore_remaining(&mut tx, batch_number, quantity).await?;

        tx.commit().await.map_err(DbError::from)?;

        debug!(
            product = %product_code,
            batch_number,
            tier = %tier,
            quantity,
            "Reversed stock issue"
        );
        Ok(())
    }

    /// Exact inverse of a reservation: re-credit the tier and retract
    /// the bill line. Used by bill-void paths; defensive checks only.
    pub async fn reverse_sale(&self, bill_item_id: &str) -> LedgerResult<()> {
        let _guard = self.op_lock.lock().await;
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let item = bill::get_line(&mut tx, bill_item_id)
            .await?
            .ok_or_else(|| DbError::not_found("BillItem", bill_item_id))?;

        tier_stock::credit(
            &mut tx,
            item.tier,
            &item.product_code,
            item.batch_number,
            item.quantity,
        )
        .await?;
        bill::delete_line(&mut tx, bill_item_id).await?;

        tx.commit().await.map_err(DbError::from)?;

        debug!(bill_item_id = %bill_item_id, "Reversed sale reservation");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
