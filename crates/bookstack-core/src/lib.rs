//! # bookstack-core
//!
//! Pure business logic for the Bookstack order-and-settlement backend: the
//! money type, the domain model, the order status machine, the payment
//! signature construction, and validation rules. Nothing in this crate
//! performs I/O - no database, no network, no clock beyond timestamp fields
//! the callers fill in - which keeps every rule testable with plain unit
//! tests.
//!
//! ## Where this crate sits
//! ```text
//!        outer layer (HTTP, admin tools) - identity, routing
//!                          │
//!                          ▼
//!        bookstack-checkout - snapshots, placement, settlement
//!                  │                   │
//!                  ▼                   ▼
//!        bookstack-core ◄──── bookstack-db (SQLite, sqlx)
//!        (this crate)
//! ```
//!
//! ## Modules
//!
//! - [`money`] - exact integer-cents amounts
//! - [`types`] - Book, Order, Payment, the status machines
//! - [`signature`] - HMAC-SHA256 over gateway callback tokens
//! - [`validation`] - input rules applied at the flow boundary
//! - [`error`] - typed domain errors

pub mod error;
pub mod money;
pub mod signature;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

/// Cap on distinct lines in one cart; keeps orders a size a human intended.
pub const MAX_CART_LINES: usize = 100;

/// Cap on copies per line; guards against a typo like 1000-instead-of-10.
pub const MAX_LINE_QUANTITY: i64 = 999;
