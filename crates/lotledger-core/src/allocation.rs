//! # Allocation Policy
//!
//! The batch selection algorithm used whenever a consumer needs N units of
//! a product from a set of candidate batches — both for manager store-issue
//! (candidates come from main-ledger remaining quantities) and for
//! sale-time reservation (candidates come from a tier's balances).
//!
//! ## The Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                  FIFO + Nearest-Expiry Selection                     │
//! │                                                                     │
//! │  Candidates (available > 0)                                          │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  Rank by:                                                           │
//! │    1. expiry date ascending, no-expiry AFTER all dated batches      │
//! │    2. purchase date ascending (FIFO tie-break)                      │
//! │    3. batch number ascending (total order → determinism)            │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  Pick the FIRST ranked batch with available >= requested            │
//! │       │                                                             │
//! │       ├── found    → that single batch serves the whole request     │
//! │       └── not found → InsufficientStock, even if the SUM across     │
//! │                       batches would have sufficed                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Single-Batch Contract
//! A request is never split across batches: every bill line stays
//! traceable to exactly one purchase batch. When no single batch holds
//! enough, the error carries the largest single-batch availability so the
//! operator knows the biggest request that would have succeeded.
//!
//! ## Determinism
//! `plan()` is side-effect free and is the ONLY selection path: the
//! committing operations in the transfer engine call it too, so a manager
//! preview (`analyze`) always names the exact batch the commit will use.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{StockError, StockResult};
use crate::types::AllocationSource;

/// Strategy identifier reported in every plan.
pub const STRATEGY: &str = "nearest-expiry, FIFO tie-break, single batch";

// =============================================================================
// Candidate
// =============================================================================

/// A batch eligible for allocation, with its available quantity in the
/// relevant source (tier balance, or main-ledger remaining).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BatchCandidate {
    pub batch_number: i64,
    pub purchase_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub available: i64,
}

/// Ranking order: dated batches before undated, earliest expiry first,
/// then earliest purchase date, then lowest batch number.
fn rank(a: &BatchCandidate, b: &BatchCandidate) -> Ordering {
    let expiry = match (a.expiry_date, b.expiry_date) {
        (Some(ea), Some(eb)) => ea.cmp(&eb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    expiry
        .then_with(|| a.purchase_date.cmp(&b.purchase_date))
        .then_with(|| a.batch_number.cmp(&b.batch_number))
}

// =============================================================================
// Plan
// =============================================================================

/// Side-effect-free allocation decision.
///
/// Returned by the manager-facing `analyze` operation and consumed
/// internally by the committing transfer operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub product_code: String,
    pub requested: i64,
    pub source: AllocationSource,
    /// The batch that would serve the request, if any single batch can.
    pub selected: Option<BatchCandidate>,
    /// Name of the selection policy.
    pub strategy: String,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// Builds the allocation plan for `requested` units of `product_code`
/// from `candidates`.
///
/// Candidates with `available <= 0` are ignored. The ranking is total,
/// so identical candidate sets always produce identical plans.
pub fn plan(
    product_code: &str,
    requested: i64,
    source: AllocationSource,
    candidates: &[BatchCandidate],
) -> AllocationPlan {
    let mut ranked: Vec<&BatchCandidate> = candidates.iter().filter(|c| c.available > 0).collect();
    ranked.sort_by(|a, b| rank(a, b));

    let selected = ranked.iter().find(|c| c.available >= requested).copied();

    let reasoning = match &selected {
        Some(c) => {
            let rank_pos = ranked
                .iter()
                .position(|r| r.batch_number == c.batch_number)
                .unwrap_or(0)
                + 1;
            match c.expiry_date {
                Some(expiry) => format!(
                    "batch {} (expires {}, purchased {}) is the earliest-expiring \
                     batch in the {} with {} units available (>= {} requested); \
                     ranked {} of {} candidates",
                    c.batch_number,
                    expiry,
                    c.purchase_date,
                    source,
                    c.available,
                    requested,
                    rank_pos,
                    ranked.len(),
                ),
                None => format!(
                    "batch {} (no expiry, purchased {}) is the oldest qualifying \
                     batch in the {} with {} units available (>= {} requested); \
                     ranked {} of {} candidates",
                    c.batch_number,
                    c.purchase_date,
                    source,
                    c.available,
                    requested,
                    rank_pos,
                    ranked.len(),
                ),
            }
        }
        None if ranked.is_empty() => format!(
            "no batch of {} has available stock in the {}",
            product_code, source
        ),
        None => format!(
            "no single batch holds {} units in the {}; best candidate holds {} \
             (requests are never split across batches)",
            requested,
            source,
            ranked.iter().map(|c| c.available).max().unwrap_or(0),
        ),
    };

    AllocationPlan {
        product_code: product_code.to_string(),
        requested,
        source,
        selected: selected.cloned(),
        strategy: STRATEGY.to_string(),
        reasoning,
    }
}

/// Selects the batch that serves the request, or fails with
/// `InsufficientStock` carrying the largest single-batch availability.
///
/// This is the committing entry point; it delegates to [`plan`] so the
/// decision is bit-identical to what `analyze` previews.
pub fn select(
    product_code: &str,
    requested: i64,
    source: AllocationSource,
    candidates: &[BatchCandidate],
) -> StockResult<BatchCandidate> {
    let decision = plan(product_code, requested, source, candidates);
    match decision.selected {
        Some(candidate) => Ok(candidate),
        None => Err(StockError::InsufficientStock {
            product: product_code.to_string(),
            available: candidates
                .iter()
                .map(|c| c.available.max(0))
                .max()
                .unwrap_or(0),
            requested,
        }),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
