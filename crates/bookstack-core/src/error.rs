//! Domain error types.
//!
//! Two layers: [`ValidationError`] for malformed input caught at the flow
//! boundary, and [`CoreError`] for business rule violations. Both are typed
//! enums (thiserror) so callers match on variants instead of parsing
//! strings; messages carry the identifiers a buyer or operator would
//! recognize (titles, quantities, statuses).
//!
//! Storage errors live in `bookstack-db`; flow-level errors in
//! `bookstack-checkout`. Validation failures convert upward via `#[from]`.

use thiserror::Error;

use crate::types::OrderStatus;

/// Business rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The catalog has no such (purchasable) book.
    #[error("Book not found: {0}")]
    BookNotFound(String),

    /// No such order.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// A quantity the stock on hand cannot cover. Carries the title so the
    /// message is actionable for the buyer.
    #[error("Not enough stock for '{title}': available {available}, requested {requested}")]
    InsufficientStock {
        title: String,
        available: i64,
        requested: i64,
    },

    /// A status change that is not an edge of the order state machine.
    #[error("Order status cannot change from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// The cart is at its line limit.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// A single line asks for more copies than any order may hold.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Malformed input, rejected before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },
}

/// Convenience alias for core results.
pub type CoreResult<T> = Result<T, CoreError>;
