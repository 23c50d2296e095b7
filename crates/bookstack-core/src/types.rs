//! # Domain Types
//!
//! Core domain types used throughout Bookstack.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────┐         │
//! │  │     Book      │   │     Order     │   │    Payment    │         │
//! │  │ ───────────── │   │ ───────────── │   │ ───────────── │         │
//! │  │ id (UUID)     │   │ id (UUID)     │   │ id (UUID)     │         │
//! │  │ price_cents   │   │ owner_id      │   │ order_id (FK) │         │
//! │  │ stock_quantity│   │ total_cents   │   │ amount_cents  │         │
//! │  │ is_active     │   │ status        │   │ status/method │         │
//! │  └───────────────┘   └───────┬───────┘   └───────────────┘         │
//! │                              │ owns (copied, not referenced)       │
//! │                      ┌───────▼───────┐   ┌───────────────────┐     │
//! │                      │   OrderItem   │   │  PaymentSession   │     │
//! │                      │ ───────────── │   │ ───────────────── │     │
//! │                      │ quantity      │   │ external token    │     │
//! │                      │ price at      │   │ bound order_id    │     │
//! │                      │  purchase     │   │ amount_cents      │     │
//! │                      └───────────────┘   └───────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `OrderItem` copies title and unit price out of the catalog at purchase
//! time. A later catalog price change can never alter a placed order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Book (catalog + inventory ledger)
// =============================================================================

/// A book in the catalog.
///
/// `stock_quantity` doubles as the inventory ledger entry for the book: it is
/// the authoritative available quantity, is never negative, and is only
/// changed through conditional delta updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Book {
    /// UUID v4 primary key.
    pub id: String,

    /// Title - unique across the catalog.
    pub title: String,

    /// Author display name.
    pub author: String,

    /// Category used for shelf grouping.
    pub category: String,

    /// Current catalog price, in cents.
    pub price_cents: i64,

    /// Available quantity. Never negative.
    pub stock_quantity: i64,

    /// Whether the book is purchasable (soft delete).
    pub is_active: bool,

    /// When the book was created.
    pub created_at: DateTime<Utc>,

    /// When the book was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// The catalog price as [`Money`].
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` copies could currently be sold.
    ///
    /// Informational only - the binding check is the conditional decrement
    /// performed inside the settlement transaction.
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        self.is_active && self.stock_quantity >= quantity
    }
}

// =============================================================================
// Cart
// =============================================================================

/// A stored cart line: which book, how many copies.
///
/// Prices are NOT stored on the cart. They are resolved from the catalog when
/// a snapshot is taken, so a cart left open overnight picks up price changes
/// while a placed order never does.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CartItem {
    pub id: String,
    pub cart_id: String,
    pub book_id: String,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Order Status
// =============================================================================

/// The lifecycle status of an order.
///
/// ## Legal transitions
/// ```text
/// pending ──► paid ──► shipped ──► delivered
///    │          │
///    └──────────┴────► cancelled
/// ```
/// `delivered` and `cancelled` are terminal. The settlement transaction is
/// the only writer of the `pending → paid` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Placed, awaiting payment.
    Pending,
    /// Payment settled.
    Paid,
    /// Handed to fulfilment.
    Shipped,
    /// Received by the buyer.
    Delivered,
    /// Cancelled before shipping.
    Cancelled,
}

impl OrderStatus {
    /// Lowercase name, matching the database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Terminal states admit no further transitions.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether `self → next` is on the transition table.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Paid)
                | (Pending, Cancelled)
                | (Paid, Shipped)
                | (Paid, Cancelled)
                | (Shipped, Delivered)
        )
    }

    /// Checks a transition, failing with `InvalidTransition` if illegal.
    pub fn ensure_transition(self, next: OrderStatus) -> CoreResult<()> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition { from: self, to: next })
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order: the authoritative record of what was purchased.
///
/// ## Invariant
/// `total_cents == Σ item.quantity × item.unit_price_cents` over its items,
/// always. The total is computed server-side at placement and never accepted
/// from a client.
///
/// Orders are never deleted - they only move along the status machine, which
/// keeps the purchase history append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,

    /// The authenticated owner this order belongs to.
    pub owner_id: String,

    /// Server-computed total in cents.
    pub total_cents: i64,

    pub status: OrderStatus,

    /// Non-owning reference to the successful payment, set at settlement.
    pub payment_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The order total as [`Money`].
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// An order line: an immutable snapshot of one cart line plus the catalog
/// price at order-creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub book_id: String,

    /// Title at purchase time (catalog renames don't rewrite history).
    pub title_snapshot: String,

    pub quantity: i64,

    /// Unit price at purchase time. Never recomputed.
    pub unit_price_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Line total: unit price at purchase × quantity.
    #[inline]
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}

/// Sums line totals for an order's items.
pub fn order_total(items: &[OrderItem]) -> Money {
    Money::from_cents(items.iter().map(OrderItem::line_total_cents).sum())
}

// =============================================================================
// Payment
// =============================================================================

/// The status of a payment attempt.
///
/// An order may accumulate many `Pending`/`Failed` attempts but at most one
/// `Success` - the settlement transaction enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

/// How a payment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// The built-in mock gateway (development and tests).
    Mock,
    /// External card gateway.
    Card,
}

/// A payment record tied to one order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub owner_id: String,

    /// Amount in cents. Always the order's server-computed total.
    pub amount_cents: i64,

    pub status: PaymentStatus,
    pub method: PaymentMethod,

    /// Gateway transaction identifier (the external payment token).
    pub transaction_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// A payment session: one minted gateway token bound to one order.
///
/// Created at initiation, consulted at settlement. The binding prevents a
/// validly-signed callback from settling an unrelated order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PaymentSession {
    pub external_order_token: String,
    pub order_id: String,
    pub method: PaymentMethod,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
