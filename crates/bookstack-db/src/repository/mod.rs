//! # Repository Module
//!
//! Database repository implementations for Bookstack.
//!
//! The repository pattern keeps SQL in one place behind a typed API. Each
//! repository wraps the shared pool; write helpers that must participate in a
//! larger atomic unit are associated functions taking `&mut SqliteConnection`
//! (suffixed `_in`) so the checkout flows can run them inside one
//! transaction.
//!
//! ## Available Repositories
//!
//! - [`book::BookRepository`] - Catalog lookups + the inventory ledger
//! - [`cart::CartRepository`] - One cart per owner, upserted lines
//! - [`order::OrderRepository`] - Orders, order lines, status transitions
//! - [`payment::PaymentRepository`] - Payment records
//! - [`session::PaymentSessionRepository`] - Gateway token ↔ order bindings

pub mod book;
pub mod cart;
pub mod order;
pub mod payment;
pub mod session;
