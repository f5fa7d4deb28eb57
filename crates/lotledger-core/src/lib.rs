//! # lotledger-core: Pure Business Logic for LotLedger
//!
//! This crate is the **heart** of LotLedger. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     LotLedger Architecture                           │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │           Controllers (CLI/menu, billing) — external           │ │
//! │  └─────────────────────────────┬─────────────────────────────────┘ │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼─────────────────────────────────┐ │
//! │  │              ★ lotledger-core (THIS CRATE) ★                   │ │
//! │  │                                                               │ │
//! │  │  ┌──────────┐ ┌────────────┐ ┌──────────┐ ┌────────────┐     │ │
//! │  │  │  types   │ │ allocation │ │  money   │ │ validation │     │ │
//! │  │  │  Batch   │ │ FIFO +     │ │  Money   │ │   rules    │     │ │
//! │  │  │  Tier    │ │ expiry     │ │  cents   │ │   checks   │     │ │
//! │  │  └──────────┘ └────────────┘ └──────────┘ └────────────┘     │ │
//! │  │                                                               │ │
//! │  │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │ │
//! │  └─────────────────────────────┬─────────────────────────────────┘ │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼─────────────────────────────────┐ │
//! │  │               lotledger-db (Database Layer)                    │ │
//! │  │   SQLite ledger tables, transfer engine, per-session undo      │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Batch, StockTier, TierStockEntry, ...)
//! - [`allocation`] - FIFO + nearest-expiry batch selection
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every allocation decision is deterministic -
//!    same candidates = same batch
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are in cents (i64)
//! 4. **Explicit Errors**: insufficient stock is a typed value, never a
//!    panic or a string

pub mod allocation;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// Re-exports for convenience: `use lotledger_core::Batch` instead of
// `use lotledger_core::types::Batch`.
pub use error::{StockError, StockResult, ValidationError};
pub use money::Money;
pub use types::*;
