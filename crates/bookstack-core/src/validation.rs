//! # Validation Rules
//!
//! Input validation applied before business logic runs.
//!
//! Validators return `ValidationError` so callers can surface the failing
//! field directly; they never panic.

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates an owner identity string.
///
/// Identity arrives already authenticated from the outer layer; all we
/// enforce here is that it is present.
pub fn validate_owner_id(owner_id: &str) -> ValidationResult<()> {
    if owner_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "owner_id".to_string(),
        });
    }
    Ok(())
}

/// Validates a book title.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 200 characters
pub fn validate_title(title: &str) -> ValidationResult<()> {
    let title = title.trim();

    if title.is_empty() {
        return Err(ValidationError::Required {
            field: "title".to_string(),
        });
    }

    if title.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "title".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a cart line quantity.
///
/// ## Rules
/// - At least 1
/// - At most [`MAX_LINE_QUANTITY`]
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 1 || quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a price in cents.
pub fn validate_price_cents(price_cents: i64) -> ValidationResult<()> {
    if price_cents < 0 {
        return Err(ValidationError::MustBePositive {
            field: "price_cents".to_string(),
        });
    }
    Ok(())
}
