//! # bookstack-checkout: Checkout & Settlement Flows
//!
//! The orchestration layer of Bookstack, and the only writer of order,
//! payment, and stock state.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Checkout → Settlement                         │
//! │                                                                     │
//! │  CartService            cart lines (mutable until checkout)         │
//! │       │                                                             │
//! │       ▼ snapshot (prices resolved NOW, then frozen)                 │
//! │  CheckoutService        order + lines + cart clear, one txn         │
//! │       │                 status: pending                             │
//! │       ▼                                                             │
//! │  PaymentGateway         mint tokens, sign, store session            │
//! │       │                                                             │
//! │       ▼  [external gateway round-trip - outside our boundary]       │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SettlementService      verify signature (pure, no state touched)   │
//! │       │                 then ONE transaction:                       │
//! │       │                   payment row (success)                     │
//! │       │                   pending → paid (compare-and-set)          │
//! │       │                   per-line conditional stock decrement      │
//! │       ▼                 commit - or roll back everything            │
//! │  paid order + success payment + decremented stock                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`snapshot`] - Cart snapshots: immutable, price-resolved cart lines
//! - [`cart`] - Cart operations (add / view / remove)
//! - [`checkout`] - Order placement, cancellation, fulfilment transitions
//! - [`gateway`] - Payment initiation (mock external gateway)
//! - [`settlement`] - The atomic settlement unit of work
//! - [`error`] - The flow-level error taxonomy

pub mod cart;
pub mod checkout;
pub mod error;
pub mod gateway;
pub mod settlement;
pub mod snapshot;

pub use cart::CartService;
pub use checkout::{CheckoutService, PlacedOrder};
pub use error::{CheckoutError, CheckoutResult};
pub use gateway::{GatewayConfig, PaymentGateway, PaymentInitiation};
pub use settlement::{SettlementOutcome, SettlementRequest, SettlementService};
pub use snapshot::{CartSnapshot, SnapshotLine};
