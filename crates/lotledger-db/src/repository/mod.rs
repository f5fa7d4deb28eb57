//! # Repository Module
//!
//! Data access repositories over the SQLite ledger tables.
//!
//! - [`batch`] - the main batch ledger
//! - [`tier_stock`] - per-batch balances in the two sales tiers
//! - [`bill`] - batch-traceable sale lines
//! - [`catalog`] - the consumed slice of the product catalog
//!
//! Repositories expose pool-bound methods for the single-table contracts;
//! the multi-table compound operations live in [`crate::transfer`] and
//! reuse the connection-level helpers defined alongside each repository.

pub mod batch;
pub mod bill;
pub mod catalog;
pub mod tier_stock;

pub use batch::BatchRepository;
pub use bill::{BillItem, BillRepository};
pub use catalog::{CatalogProduct, CatalogRepository};
pub use tier_stock::TierStockRepository;
