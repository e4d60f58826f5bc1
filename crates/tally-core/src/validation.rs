//! # Validation Module
//!
//! Input validation utilities for Tally POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Register / back-office frontend                              │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Engine entry points (Rust)                                   │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: request shape, before any row is touched             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (points >= 0, quantity >= 1)                                │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unknown ids are checked by the engine once it has looked them up; this
//! module only sees the request itself.
//!
//! ## Usage
//! ```rust
//! use tally_core::settlement::{CartLine, SettleRequest};
//! use tally_core::validation::validate_settle_request;
//!
//! let request = SettleRequest::cash(vec![CartLine::new("A", 2)]);
//! assert!(validate_settle_request(&request).is_ok());
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::settlement::SettleRequest;
use crate::types::{PaymentMode, Percentage};
use crate::{MAX_AMOUNT_CENTS, MAX_CART_ITEMS, MAX_ITEM_QUANTITY, MAX_REASON_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be between 1 and 50 characters
/// - Should contain only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_sku;
///
/// assert!(validate_sku("RIBEYE-MEAL").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (product, customer, reward, discount).
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a mobile contact number: 7 to 20 digits, optional leading `+`.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_contact_number;
///
/// assert!(validate_contact_number("09123456789").is_ok());
/// assert!(validate_contact_number("+639123456789").is_ok());
/// assert!(validate_contact_number("call me").is_err());
/// ```
pub fn validate_contact_number(contact: &str) -> ValidationResult<()> {
    let contact = contact.trim();
    if contact.is_empty() {
        return Err(ValidationError::Required {
            field: "contact_number".to_string(),
        });
    }

    let digits = contact.strip_prefix('+').unwrap_or(contact);
    if digits.len() < 7 || digits.len() > 20 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "contact_number".to_string(),
            reason: "must be 7 to 20 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a refund/cancel reason and returns it trimmed.
///
/// ## Rules
/// - Required (not blank)
/// - At most 255 characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_reason;
///
/// assert_eq!(validate_reason("  wrong order ").unwrap(), "wrong order");
/// assert!(validate_reason("   ").is_err());
/// ```
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LENGTH,
        });
    }

    Ok(reason.to_string())
}

/// Validates an entity id supplied by the caller.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Register: Add Item                                                     │
/// │                                                                         │
/// │  Cashier enters quantity: 5                                            │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity("lines[0].quantity", 5) ← THIS FUNCTION             │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "lines[0].quantity must be positive"      │
/// │       │                                                                 │
/// │       ├── qty > 999? → QuantityTooLarge { requested, max: 999 }        │
/// │       │                                                                 │
/// │       └── OK → line accepted                                           │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(field: &str, qty: i64) -> CoreResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        }
        .into());
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: qty,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates an amount in centavos: 0 to [`MAX_AMOUNT_CENTS`].
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_amount_cents;
///
/// assert!(validate_amount_cents("price", 47_900).is_ok());
/// assert!(validate_amount_cents("price", 0).is_ok());
/// assert!(validate_amount_cents("price", -100).is_err());
/// assert!(validate_amount_cents("price", i64::MAX).is_err());
/// ```
pub fn validate_amount_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_AMOUNT_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a discount or reward percentage: 0.01% to 100%.
pub fn validate_percentage(field: &str, rate: Percentage) -> ValidationResult<()> {
    if rate.bps() == 0 || rate.bps() > Percentage::MAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: Percentage::MAX_BPS as i64,
        });
    }

    Ok(())
}

/// Validates a manual point award.
pub fn validate_points_award(points: i64) -> ValidationResult<()> {
    if points <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "points".to_string(),
        });
    }
    Ok(())
}

/// Validates a reward's points cost.
pub fn validate_points_cost(points: i64) -> ValidationResult<()> {
    if points < 1 {
        return Err(ValidationError::MustBePositive {
            field: "points_needed".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Payment Validators
// =============================================================================

/// Validates the payment mode / reference number pairing.
///
/// ## Rules
/// - `ewallet` requires a non-blank reference number
/// - `cash` must not carry one
pub fn validate_payment(mode: PaymentMode, reference: Option<&str>) -> ValidationResult<()> {
    let reference = reference.map(str::trim).filter(|r| !r.is_empty());

    match (mode.requires_reference(), reference) {
        (true, None) => Err(ValidationError::Required {
            field: "reference_number".to_string(),
        }),
        (false, Some(_)) => Err(ValidationError::InvalidFormat {
            field: "reference_number".to_string(),
            reason: "only allowed for e-wallet payments".to_string(),
        }),
        (_, Some(r)) if r.chars().count() > 100 => Err(ValidationError::TooLong {
            field: "reference_number".to_string(),
            max: 100,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates a settle request before any lookup or mutation.
///
/// Errors name the offending field, e.g. `lines[2].quantity`.
pub fn validate_settle_request(request: &SettleRequest) -> CoreResult<()> {
    if request.lines.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        }
        .into());
    }

    if request.lines.len() > MAX_CART_ITEMS {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_ITEMS,
        });
    }

    for (i, line) in request.lines.iter().enumerate() {
        validate_id(&format!("lines[{i}].product_id"), &line.product_id)?;

        validate_quantity(&format!("lines[{i}].quantity"), line.quantity)?;
        if let Some(price) = line.unit_price_cents {
            validate_amount_cents(&format!("lines[{i}].unit_price_cents"), price)?;
        }
        validate_amount_cents(
            &format!("lines[{i}].line_discount_cents"),
            line.line_discount_cents,
        )?;
    }

    validate_payment(request.payment_mode, request.reference_number.as_deref())?;

    if let Some(id) = &request.customer_id {
        validate_id("customer_id", id)?;
    }
    if let Some(id) = &request.discount_id {
        validate_id("discount_id", id)?;
    }
    if let Some(id) = &request.reward_id {
        validate_id("reward_id", id)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::CartLine;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("RIBEYE-MEAL").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("iced_tea").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Caesar Salad").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", &"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity("quantity", 1).is_ok());
        assert!(validate_quantity("quantity", 999).is_ok());

        assert!(validate_quantity("quantity", 0).is_err());
        assert!(validate_quantity("quantity", -1).is_err());
        assert!(matches!(
            validate_quantity("quantity", 1000),
            Err(CoreError::QuantityTooLarge { requested: 1000, max: 999 })
        ));
    }

    #[test]
    fn test_validate_reason() {
        assert!(validate_reason(&"x".repeat(255)).is_ok());
        assert!(matches!(
            validate_reason(&"x".repeat(256)),
            Err(ValidationError::TooLong { max: 255, .. })
        ));
        assert!(matches!(
            validate_reason(""),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_payment_pairing() {
        assert!(validate_payment(PaymentMode::Cash, None).is_ok());
        assert!(validate_payment(PaymentMode::EWallet, Some("GC-12345")).is_ok());

        assert!(validate_payment(PaymentMode::EWallet, None).is_err());
        assert!(validate_payment(PaymentMode::EWallet, Some("  ")).is_err());
        assert!(validate_payment(PaymentMode::Cash, Some("GC-12345")).is_err());
        // a blank reference on a cash sale is treated as absent
        assert!(validate_payment(PaymentMode::Cash, Some("")).is_ok());
    }

    #[test]
    fn test_validate_percentage() {
        assert!(validate_percentage("value", Percentage::from_bps(1)).is_ok());
        assert!(validate_percentage("value", Percentage::from_bps(10_000)).is_ok());
        assert!(validate_percentage("value", Percentage::zero()).is_err());
        assert!(validate_percentage("value", Percentage::from_bps(10_001)).is_err());
    }

    #[test]
    fn test_validate_contact_number() {
        assert!(validate_contact_number("09091234567").is_ok());
        assert!(validate_contact_number("").is_err());
        assert!(validate_contact_number("12").is_err());
    }

    #[test]
    fn test_settle_request_rejects_empty_cart() {
        let request = SettleRequest::cash(vec![]);
        let err = validate_settle_request(&request).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::Required { ref field }) if field == "lines"
        ));
    }

    #[test]
    fn test_settle_request_names_the_bad_line() {
        let request = SettleRequest::cash(vec![CartLine::new("A", 1), CartLine::new("B", 0)]);
        let err = validate_settle_request(&request).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBePositive { ref field }) if field == "lines[1].quantity"
        ));

        let request = SettleRequest::cash(vec![CartLine::new("A", 1).with_line_discount(-5)]);
        assert!(validate_settle_request(&request).is_err());
    }

    #[test]
    fn test_settle_request_limits() {
        let request = SettleRequest::cash(vec![CartLine::new("A", 1000)]);
        assert!(matches!(
            validate_settle_request(&request),
            Err(CoreError::QuantityTooLarge { requested: 1000, .. })
        ));

        let lines = (0..=MAX_CART_ITEMS).map(|i| CartLine::new(format!("P{i}"), 1)).collect();
        assert!(matches!(
            validate_settle_request(&SettleRequest::cash(lines)),
            Err(CoreError::CartTooLarge { .. })
        ));

        let request = SettleRequest::cash(vec![CartLine::new("A", 3).with_unit_price(i64::MAX / 2)]);
        assert!(matches!(
            validate_settle_request(&request),
            Err(CoreError::Validation(ValidationError::OutOfRange { ref field, max: MAX_AMOUNT_CENTS, .. }))
                if field == "lines[0].unit_price_cents"
        ));

        let request = SettleRequest::cash(vec![CartLine::new("A", 1).with_line_discount(MAX_AMOUNT_CENTS + 1)]);
        assert!(validate_settle_request(&request).is_err());
    }

    #[test]
    fn test_settle_request_checks_payment() {
        let mut request = SettleRequest::cash(vec![CartLine::new("A", 1)]);
        request.payment_mode = PaymentMode::EWallet;
        assert!(validate_settle_request(&request).is_err());

        request.reference_number = Some("MAYA-778812".into());
        assert!(validate_settle_request(&request).is_ok());
    }
}
