//! # Manager Session & Undo
//!
//! Per-session wrapper around the manager-facing mutations, with a
//! single-slot undo layer.
//!
//! ## Undo model
//! ```text
//!        ┌────────┐   reversible op    ┌────────┐
//!        │  Idle  │ ─────────────────► │ Armed  │◄─┐
//!        └────────┘                    └────────┘  │ reversible op
//!             ▲          undo ok           │ │     │ (overwrites slot)
//!             └────────────────────────────┘ └─────┘
//! ```
//! Exactly one operation can be undone: the most recent reversible one in
//! this session. A newer reversible operation silently overwrites the
//! slot. Undoing runs the inverse and returns to Idle; if the inverse
//! fails because the ledger moved underneath us, the slot stays armed and
//! the caller gets a conflict to resolve by hand. Sales flow through the
//! billing surface and never arm the slot.

use tracing::{info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::pool::Database;
use crate::transfer::StockTransferEngine;
use lotledger_core::allocation::AllocationPlan;
use lotledger_core::{AllocationSource, Batch, NewBatch, StockError, StockIssue, StockTier};

/// The most recent reversible operation, captured with everything its
/// inverse needs.
#[derive(Debug, Clone)]
pub enum ReversibleCommand {
    /// A batch was added; the inverse removes it.
    AddBatch { batch_number: i64 },
    /// A batch was removed; the full prior row is kept so the inverse
    /// can reinsert it under its original number.
    RemoveBatch { batch: Batch },
    /// Stock was issued to a tier; the inverse moves it back.
    IssueToTier {
        product_code: String,
        batch_number: i64,
        tier: StockTier,
        quantity: i64,
    },
}

impl ReversibleCommand {
    /// Short human-readable label, for "Undo: …" UI affordances.
    pub fn describe(&self) -> String {
        match self {
            ReversibleCommand::AddBatch { batch_number } => {
                format!("add batch #{batch_number}")
            }
            ReversibleCommand::RemoveBatch { batch } => {
                format!("remove batch #{}", batch.batch_number)
            }
            ReversibleCommand::IssueToTier {
                product_code,
                quantity,
                tier,
                ..
            } => format!("issue {quantity} x {product_code} to {tier}"),
        }
    }
}

/// One manager's working session over the ledger.
///
/// Sessions are independent: each carries its own undo slot, while all
/// of them share the database's operation lock underneath.
#[derive(Debug)]
pub struct ManagerSession {
    db: Database,
    engine: StockTransferEngine,
    pending: Option<ReversibleCommand>,
}

impl ManagerSession {
    pub fn new(db: &Database) -> Self {
        ManagerSession {
            engine: db.transfer_engine(),
            db: db.clone(),
            pending: None,
        }
    }

    /// Registers a new batch for a cataloged product and arms undo.
    pub async fn add_batch(&mut self, new_batch: &NewBatch) -> LedgerResult<Batch> {
        if !self.db.catalog().product_exists(&new_batch.product_code).await? {
            return Err(StockError::ProductNotFound(new_batch.product_code.clone()).into());
        }

        let batch = self.db.batches().insert(new_batch).await?;
        self.arm(ReversibleCommand::AddBatch {
            batch_number: batch.batch_number,
        });
        Ok(batch)
    }

    /// Removes an untouched batch and arms undo with its prior state.
    pub async fn remove_batch(&mut self, batch_number: i64) -> LedgerResult<Batch> {
        let removed = self.db.batches().remove(batch_number).await?;
        self.arm(ReversibleCommand::RemoveBatch {
            batch: removed.clone(),
        });
        Ok(removed)
    }

    /// Issues stock from the main ledger to a tier and arms undo.
    pub async fn issue_to_tier(
        &mut self,
        product_code: &str,
        quantity: i64,
        tier: StockTier,
    ) -> LedgerResult<StockIssue> {
        let issue = self.engine.issue_to_tier(product_code, quantity, tier).await?;
        self.arm(ReversibleCommand::IssueToTier {
            product_code: issue.product_code.clone(),
            batch_number: issue.batch_number,
            tier: issue.tier,
            quantity: issue.quantity,
        });
        Ok(issue)
    }

    /// Allocation preview; read-only, never arms undo.
    pub async fn analyze(
        &self,
        product_code: &str,
        quantity: i64,
        source: AllocationSource,
    ) -> LedgerResult<AllocationPlan> {
        self.engine.analyze(product_code, quantity, source).await
    }

    /// Undoes the armed operation, returning the session to idle.
    ///
    /// If the inverse hits a business-rule failure (the ledger changed
    /// since the operation ran), the slot stays armed and the error is
    /// surfaced as a conflict.
    pub async fn undo(&mut self) -> LedgerResult<()> {
        let command = self
            .pending
            .clone()
            .ok_or(LedgerError::Stock(StockError::NothingToUndo))?;

        let outcome = match &command {
            ReversibleCommand::AddBatch { batch_number } => self
                .db
                .batches()
                .remove(*batch_number)
                .await
                .map(|_| ()),
            ReversibleCommand::RemoveBatch { batch } => {
                self.db.batches().reinsert(batch).await.map(|_| ())
            }
            ReversibleCommand::IssueToTier {
                product_code,
                batch_number,
                tier,
                quantity,
            } => {
                self.engine
                    .reverse_issue(product_code, *quantity, *tier, *batch_number)
                    .await
            }
        };

        match outcome {
            Ok(()) => {
                info!(undone = %command.describe(), "Undid operation");
                self.pending = None;
                Ok(())
            }
            Err(LedgerError::Stock(cause)) => {
                warn!(
                    pending = %command.describe(),
                    %cause,
                    "Undo conflict; slot stays armed"
                );
                Err(StockError::UndoConflict {
                    reason: cause.to_string(),
                }
                .into())
            }
            // Infrastructure failures pass through untouched; the slot
            // also stays armed so the caller may retry.
            Err(other) => Err(other),
        }
    }

    /// Whether the session has an operation armed for undo.
    pub fn can_undo(&self) -> bool {
        self.pending.is_some()
    }

    /// Label of the armed operation, if any.
    pub fn pending_description(&self) -> Option<String> {
        self.pending.as_ref().map(ReversibleCommand::describe)
    }

    fn arm(&mut self, command: ReversibleCommand) {
        if let Some(stale) = &self.pending {
            info!(replaced = %stale.describe(), "Undo slot overwritten");
        }
        self.pending = Some(command);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_batch(qty: i64) -> NewBatch {
        NewBatch {
            product_code: "P".to_string(),
            quantity: qty,
            purchase_price_cents: 500,
            purchase_date: date(2024, 1, 1),
            expiry_date: None,
            supplier: None,
        }
    }

    async fn test_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.catalog().upsert("P", "Test Product", 999).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_undo_on_idle_session_fails() {
        let db = test_db().await;
        let mut session = ManagerSession::new(&db);

        assert!(!session.can_undo());
        let err = session.undo().await.unwrap_err();
        assert!(matches!(err, LedgerError::Stock(StockError::NothingToUndo)));
    }

    #[tokio::test]
    async fn test_undo_add_batch_removes_it() {
        let db = test_db().await;
        let mut session = ManagerSession::new(&db);

        let batch = session.add_batch(&new_batch(50)).await.unwrap();
        assert!(session.can_undo());

        session.undo().await.unwrap();
        assert!(!session.can_undo());
        assert!(db.batches().try_get(batch.batch_number).await.unwrap().is_none());

        // The slot is spent; a second undo has nothing to act on.
        let err = session.undo().await.unwrap_err();
        assert!(matches!(err, LedgerError::Stock(StockError::NothingToUndo)));
    }

    #[tokio::test]
    async fn test_undo_remove_batch_reinserts_original_row() {
        let db = test_db().await;
        let mut session = ManagerSession::new(&db);

        let batch = session.add_batch(&new_batch(50)).await.unwrap();
        session.remove_batch(batch.batch_number).await.unwrap();
        assert!(db.batches().try_get(batch.batch_number).await.unwrap().is_none());

        session.undo().await.unwrap();
        let restored = db.batches().get(batch.batch_number).await.unwrap();
        assert_eq!(restored.batch_number, batch.batch_number);
        assert_eq!(restored.quantity_received, 50);
        assert_eq!(restored.remaining_quantity, 50);
    }

    #[tokio::test]
    async fn test_undo_issue_restores_ledger_exactly() {
        let db = test_db().await;
        let mut session = ManagerSession::new(&db);

        let batch = session.add_batch(&new_batch(100)).await.unwrap();
        let issue = session
            .issue_to_tier("P", 30, StockTier::Physical)
            .await
            .unwrap();
        assert_eq!(issue.batch_number, batch.batch_number);
        assert_eq!(
            session.pending_description().unwrap(),
            "issue 30 x P to physical"
        );

        session.undo().await.unwrap();
        let after = db.batches().get(batch.batch_number).await.unwrap();
        assert_eq!(after.remaining_quantity, 100);
        assert_eq!(
            db.tier_stock()
                .quantity(StockTier::Physical, "P", batch.batch_number)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_newer_operation_overwrites_undo_slot() {
        let db = test_db().await;
        let mut session = ManagerSession::new(&db);

        let first = session.add_batch(&new_batch(10)).await.unwrap();
        let second = session.add_batch(&new_batch(20)).await.unwrap();

        session.undo().await.unwrap();
        // Only the second add was undone.
        assert!(db.batches().try_get(first.batch_number).await.unwrap().is_some());
        assert!(db.batches().try_get(second.batch_number).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_undo_conflict_keeps_slot_armed() {
        let db = test_db().await;
        let mut session = ManagerSession::new(&db);
        let engine = db.transfer_engine();

        session.add_batch(&new_batch(100)).await.unwrap();
        session
            .issue_to_tier("P", 30, StockTier::Physical)
            .await
            .unwrap();

        // A sale drains the shelf below the undoable amount.
        engine
            .reserve_for_sale("P", 25, StockTier::Physical, "BILL-X")
            .await
            .unwrap();

        let err = session.undo().await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Stock(StockError::UndoConflict { .. })
        ));
        // Still armed; the operator resolves the conflict out of band.
        assert!(session.can_undo());
    }

    #[tokio::test]
    async fn test_sales_never_arm_undo() {
        let db = test_db().await;
        let mut session = ManagerSession::new(&db);
        let engine = db.transfer_engine();

        session.add_batch(&new_batch(100)).await.unwrap();
        session
            .issue_to_tier("P", 50, StockTier::Online)
            .await
            .unwrap();
        let before = session.pending_description().unwrap();

        engine
            .reserve_for_sale("P", 10, StockTier::Online, "BILL-Y")
            .await
            .unwrap();

        // The slot still holds the issue, not the sale.
        assert_eq!(session.pending_description().unwrap(), before);
    }

    #[tokio::test]
    async fn test_remove_batch_with_tier_holdings_conflicts() {
        let db = test_db().await;
        let mut session = ManagerSession::new(&db);

        let batch = session.add_batch(&new_batch(100)).await.unwrap();
        session
            .issue_to_tier("P", 5, StockTier::Physical)
            .await
            .unwrap();

        let err = session.remove_batch(batch.batch_number).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Stock(StockError::BatchInUse { .. })
        ));
        // The failed removal did not overwrite the slot; undoing still
        // reverses the issue.
        session.undo().await.unwrap();
        assert_eq!(
            db.batches()
                .get(batch.batch_number)
                .await
                .unwrap()
                .remaining_quantity,
            100
        );
    }

    #[tokio::test]
    async fn test_add_batch_requires_cataloged_product() {
        let db = test_db().await;
        let mut session = ManagerSession::new(&db);

        let mut nb = new_batch(10);
        nb.product_code = "GHOST".to_string();
        let err = session.add_batch(&nb).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Stock(StockError::ProductNotFound(_))
        ));
        assert!(!session.can_undo());
    }

    #[tokio::test]
    async fn test_sessions_have_independent_slots() {
        let db = test_db().await;
        let mut a = ManagerSession::new(&db);
        let mut b = ManagerSession::new(&db);

        a.add_batch(&new_batch(10)).await.unwrap();
        assert!(a.can_undo());
        assert!(!b.can_undo());

        let err = b.undo().await.unwrap_err();
        assert!(matches!(err, LedgerError::Stock(StockError::NothingToUndo)));
        assert!(a.can_undo());
    }
}
