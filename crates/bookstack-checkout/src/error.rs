//! # Checkout Error Types
//!
//! The error taxonomy flow callers see. Every failure is a typed variant so
//! the caller can distinguish "retry later" ([`CheckoutError::Db`]) from
//! "do not retry" (`InvalidSignature`, `AlreadySettled`) from
//! "user-actionable" (`InsufficientStock`, `EmptyCart`).
//!
//! Every path that mutates state either fully commits or fully rolls back
//! before one of these is returned.

use thiserror::Error;

use bookstack_core::{CoreError, OrderStatus};
use bookstack_db::DbError;

/// Errors returned by the checkout and settlement flows.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A referenced entity (order, book, payment session) is missing - or
    /// not visible to the calling owner.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Checkout was attempted with no cart lines.
    #[error("No items in cart")]
    EmptyCart,

    /// A stock check failed, naming the book the buyer will recognize.
    #[error("Not enough stock for '{title}': available {available}, requested {requested}")]
    InsufficientStock {
        title: String,
        available: i64,
        requested: i64,
    },

    /// The settlement callback signature did not verify.
    ///
    /// The message never includes the expected signature.
    #[error("Payment signature verification failed")]
    InvalidSignature,

    /// Idempotency guard: this order has already settled. A retried or
    /// duplicated callback lands here instead of double-charging.
    #[error("Order {order_id} is already paid")]
    AlreadySettled { order_id: String },

    /// A status change not on the order state machine.
    #[error("Order status cannot change from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Business rule violation from the core layer.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Underlying storage failure. The only retryable category.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl CheckoutError {
    /// Creates a NotFound error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CheckoutError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::Db(_))
    }
}

/// Result type for checkout flow operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(CheckoutError::Db(DbError::Timeout).is_retryable());
        assert!(!CheckoutError::InvalidSignature.is_retryable());
        assert!(!CheckoutError::AlreadySettled {
            order_id: "o".into()
        }
        .is_retryable());
        assert!(!CheckoutError::InsufficientStock {
            title: "t".into(),
            available: 0,
            requested: 1
        }
        .is_retryable());
    }

    #[test]
    fn test_invalid_signature_reveals_nothing() {
        let msg = CheckoutError::InvalidSignature.to_string();
        assert_eq!(msg, "Payment signature verification failed");
    }
}
