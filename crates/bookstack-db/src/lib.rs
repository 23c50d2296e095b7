//! # bookstack-db: Database Layer for Bookstack
//!
//! This crate provides database access for the Bookstack backend.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (book, cart, order, payment, session)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bookstack_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/bookstack.db")).await?;
//! let book = db.books().get_by_id("uuid-here").await?;
//! ```
//!
//! ## Transactions
//!
//! Repositories expose two kinds of write helpers: pool-based methods for
//! standalone operations, and `*_in` associated functions taking a
//! `&mut SqliteConnection` so the checkout flows can compose several writes
//! into one atomic unit.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::book::BookRepository;
pub use repository::cart::CartRepository;
pub use repository::order::OrderRepository;
pub use repository::payment::PaymentRepository;
pub use repository::session::PaymentSessionRepository;
