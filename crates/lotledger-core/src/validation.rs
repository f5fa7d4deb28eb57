//! # Validation Module
//!
//! Input validation for ledger mutations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                               │
//! │                                                                     │
//! │  Layer 1: Controller (CLI/menu collaborator)                         │
//! │  ├── Basic format checks, immediate operator feedback               │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: THIS MODULE - business rule validation                     │
//! │  ├── positive quantities/prices, no future purchase dates           │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (SQLite)                                          │
//! │  ├── NOT NULL, CHECK, and foreign key constraints                   │
//! │                                                                     │
//! │  Defense in depth: multiple layers catch different errors           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::types::NewBatch;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "product_code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "product_code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "product_code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a stock quantity (received, issued, or reserved).
///
/// ## Rules
/// - Must be positive (> 0); zero-quantity operations are meaningless
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a purchase price in cents.
///
/// ## Rules
/// - Must be positive (> 0); free stock receipts are recorded elsewhere,
///   never as zero-price purchase batches
pub fn validate_purchase_price(cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "purchase_price".to_string(),
        });
    }

    Ok(())
}

/// Validates a purchase date against "today".
///
/// `today` is passed in rather than read from the clock so the rule stays
/// a pure function.
pub fn validate_purchase_date(purchase_date: NaiveDate, today: NaiveDate) -> ValidationResult<()> {
    if purchase_date > today {
        return Err(ValidationError::FutureDate {
            field: "purchase_date".to_string(),
        });
    }

    Ok(())
}

/// Validates a complete new-batch request.
///
/// The first failing rule wins; callers surface it as a
/// `StockError::Validation` before any ledger mutation runs.
pub fn validate_new_batch(batch: &NewBatch, today: NaiveDate) -> ValidationResult<()> {
    validate_product_code(&batch.product_code)?;
    validate_quantity(batch.quantity)?;
    validate_purchase_price(batch.purchase_price_cents)?;
    validate_purchase_date(batch.purchase_date, today)?;

    if let Some(supplier) = &batch.supplier {
        if supplier.len() > 100 {
            return Err(ValidationError::TooLong {
                field: "supplier".to_string(),
                max: 100,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_batch() -> NewBatch {
        NewBatch {
            product_code: "RICE-5KG".to_string(),
            quantity: 100,
            purchase_price_cents: 1250,
            purchase_date: date(2025, 1, 10),
            expiry_date: Some(date(2026, 1, 10)),
            supplier: Some("Acme Wholesale".to_string()),
        }
    }

    #[test]
    fn test_validate_product_code() {
        assert!(validate_product_code("RICE-5KG").is_ok());
        assert!(validate_product_code("sku_001").is_ok());

        assert!(validate_product_code("").is_err());
        assert!(validate_product_code("   ").is_err());
        assert!(validate_product_code("has space").is_err());
        assert!(validate_product_code(&"A".repeat(60)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(10_000).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
    }

    #[test]
    fn test_validate_purchase_price() {
        assert!(validate_purchase_price(1).is_ok());
        assert!(validate_purchase_price(0).is_err());
        assert!(validate_purchase_price(-100).is_err());
    }

    #[test]
    fn test_validate_purchase_date() {
        let today = date(2025, 6, 15);

        assert!(validate_purchase_date(date(2025, 6, 15), today).is_ok());
        assert!(validate_purchase_date(date(2025, 6, 14), today).is_ok());
        assert!(validate_purchase_date(date(2025, 6, 16), today).is_err());
    }

    #[test]
    fn test_validate_new_batch() {
        let today = date(2025, 6, 15);

        assert!(validate_new_batch(&new_batch(), today).is_ok());

        let mut bad = new_batch();
        bad.quantity = 0;
        assert!(validate_new_batch(&bad, today).is_err());

        let mut bad = new_batch();
        bad.purchase_date = date(2025, 7, 1);
        assert!(matches!(
            validate_new_batch(&bad, today),
            Err(ValidationError::FutureDate { .. })
        ));

        let mut bad = new_batch();
        bad.supplier = Some("S".repeat(200));
        assert!(validate_new_batch(&bad, today).is_err());
    }
}
