//! # lotledger-db: Persistence & Transfer Layer for LotLedger
//!
//! This crate provides database access and the atomic stock-movement
//! operations for the LotLedger inventory engine. It uses SQLite for
//! local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        LotLedger Data Flow                              │
//! │                                                                         │
//! │  Caller (manager session / billing surface)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   lotledger-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │   Transfer   │  │   │
//! │  │   │   (pool.rs)   │    │  (batch.rs,   │    │    Engine    │  │   │
//! │  │   │               │    │ tier_stock.rs,│    │ (transfer.rs)│  │   │
//! │  │   │ SqlitePool    │◄───│   bill.rs,    │───►│  atomic      │  │   │
//! │  │   │ op_lock       │    │  catalog.rs)  │    │  compound ops│  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   Allocation policy itself lives in lotledger-core (pure).      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │       batches · tier_stock · bill_items · products              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and combined error types
//! - [`repository`] - Repository implementations (batch, tier stock, bill, catalog)
//! - [`transfer`] - The atomic stock transfer engine
//! - [`session`] - Manager sessions with single-slot undo
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lotledger_db::{Database, DbConfig, ManagerSession};
//! use lotledger_core::StockTier;
//!
//! let db = Database::new(DbConfig::new("path/to/ledger.sqlite")).await?;
//!
//! // Manager surface: reversible operations
//! let mut session = ManagerSession::new(&db);
//! session.issue_to_tier("RICE-5KG", 24, StockTier::Physical).await?;
//! session.undo().await?;
//!
//! // Billing surface: never undoable
//! let engine = db.transfer_engine();
//! engine.reserve_for_sale("RICE-5KG", 2, StockTier::Physical, "BILL-0042").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod session;
pub mod transfer;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, LedgerError, LedgerResult};
pub use pool::{Database, DbConfig};
pub use session::{ManagerSession, ReversibleCommand};
pub use transfer::StockTransferEngine;

// Repository re-exports for convenience
pub use repository::batch::BatchRepository;
pub use repository::bill::{BillItem, BillRepository};
pub use repository::catalog::{CatalogProduct, CatalogRepository};
pub use repository::tier_stock::TierStockRepository;
