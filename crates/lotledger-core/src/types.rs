//! # Domain Types
//!
//! Core domain types used throughout LotLedger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                 │
//! │                                                                     │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌──────────────────┐ │
//! │  │     Batch       │   │  TierStockEntry  │   │  BatchReference  │ │
//! │  │  ─────────────  │   │  ──────────────  │   │  ──────────────  │ │
//! │  │  batch_number   │   │  product_code    │   │  product_code    │ │
//! │  │  product_code   │   │  batch_number    │   │  batch_number    │ │
//! │  │  qty_received   │   │  tier            │   │  quantity        │ │
//! │  │  remaining_qty  │   │  quantity        │   │  (bill line)     │ │
//! │  │  expiry_date?   │   └──────────────────┘   └──────────────────┘ │
//! │  └─────────────────┘                                                │
//! │                                                                     │
//! │  StockTier: Physical (shelf) | Online (warehouse)                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conservation Law
//! For every batch, units are never created or destroyed by transfers:
//! `remaining_quantity + sum(tier quantities) + sold units == quantity_received`

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Stock Tier
// =============================================================================

/// A sales channel holding stock drawn from batches.
///
/// Stock flows main ledger → tier → sale. Exactly two tiers exist;
/// everything beyond that (multi-warehouse topologies) is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum StockTier {
    /// Physical shelf in the store.
    Physical,
    /// Online fulfilment warehouse.
    Online,
}

impl StockTier {
    /// Stable label used in logs and plan descriptions.
    pub const fn label(&self) -> &'static str {
        match self {
            StockTier::Physical => "physical",
            StockTier::Online => "online",
        }
    }
}

impl std::fmt::Display for StockTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Batch
// =============================================================================

/// A purchase batch in the main inventory ledger.
///
/// Identity is `batch_number`: monotonic, assigned on insert, never reused.
/// `quantity_received` is immutable after creation; only
/// `remaining_quantity` moves, and only through issue/undo operations.
///
/// Invariant: `0 <= remaining_quantity <= quantity_received`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Batch {
    /// Monotonic batch identity.
    pub batch_number: i64,

    /// Product this batch belongs to (catalog code).
    pub product_code: String,

    /// Units received from the supplier. Immutable.
    pub quantity_received: i64,

    /// Purchase price per unit, in cents.
    pub purchase_price_cents: i64,

    /// Date the batch was purchased.
    pub purchase_date: NaiveDate,

    /// Expiry date, if the product expires.
    pub expiry_date: Option<NaiveDate>,

    /// Supplier name, if recorded.
    pub supplier: Option<String>,

    /// Units still sitting in the main ledger (not yet issued to a tier).
    pub remaining_quantity: i64,

    /// When the batch record was created.
    pub created_at: DateTime<Utc>,
}

impl Batch {
    /// Returns the per-unit purchase price as Money.
    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    /// Total purchase cost of the batch, if it fits in i64 cents.
    pub fn purchase_cost(&self) -> Option<Money> {
        self.purchase_price().checked_mul(self.quantity_received)
    }

    /// True when no unit has ever left this batch.
    ///
    /// Removal requires this: units only leave main via issue, so an
    /// untouched batch is exactly one with full remaining quantity.
    #[inline]
    pub fn is_untouched(&self) -> bool {
        self.remaining_quantity == self.quantity_received
    }
}

// =============================================================================
// Tier Stock Entry
// =============================================================================

/// Per-batch stock balance in a sales tier.
///
/// Identity is `(product_code, batch_number, tier)`. A zero-quantity
/// entry and a missing entry mean the same thing to every reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TierStockEntry {
    pub product_code: String,
    pub batch_number: i64,
    pub tier: StockTier,
    /// Units of this batch currently held in this tier. Never negative.
    pub quantity: i64,
}

// =============================================================================
// Batch Reference
// =============================================================================

/// Traceability handle returned by a sale-time reservation.
///
/// Every bill line records the exact batch it drew from, so a sold unit
/// can always be traced back to its purchase batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReference {
    pub product_code: String,
    pub batch_number: i64,
    pub tier: StockTier,
    pub quantity: i64,
    /// Id of the bill line recorded for this reservation.
    pub bill_item_id: String,
}

// =============================================================================
// Stock Issue
// =============================================================================

/// Result of a manager stock issue (main ledger → tier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockIssue {
    pub product_code: String,
    pub batch_number: i64,
    pub tier: StockTier,
    pub quantity: i64,
    /// Main-ledger remaining quantity after the issue.
    pub remaining_after: i64,
}

// =============================================================================
// New Batch Input
// =============================================================================

/// Caller input for creating a batch. Validated before it touches the
/// ledger (see [`crate::validation::validate_new_batch`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBatch {
    pub product_code: String,
    pub quantity: i64,
    pub purchase_price_cents: i64,
    pub purchase_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub supplier: Option<String>,
}

// =============================================================================
// Allocation Source
// =============================================================================

/// Where an allocation draws its candidate balances from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationSource {
    /// Main-ledger remaining quantities (store-issue operations).
    MainLedger,
    /// A tier's per-batch balances (sale-time reservations).
    Tier(StockTier),
}

impl std::fmt::Display for AllocationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationSource::MainLedger => f.write_str("main ledger"),
            AllocationSource::Tier(t) => write!(f, "{} tier", t),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
