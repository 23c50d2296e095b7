//! # Checkout Service
//!
//! Turns a cart into an order, and walks placed orders through their
//! lifecycle.
//!
//! ## Placement
//! ```text
//! snapshot cart (prices resolved now)
//!      │
//!      ▼
//! stock pre-check per line        ← informational; the binding check is
//!      │                            the settlement-time decrement
//!      ▼
//! ONE transaction:
//!     insert order (status pending, server-computed total)
//!     insert every order line (price at purchase frozen)
//!     clear the cart
//! ```
//! The cart is emptied in the same atomic unit that creates the order: if
//! the order insert fails the cart is untouched, and a created order always
//! leaves an empty cart behind.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use bookstack_core::{validation, CoreError, Order, OrderItem, OrderStatus, Payment};
use bookstack_db::{CartRepository, Database, DbError, OrderRepository};

use crate::error::{CheckoutError, CheckoutResult};
use crate::snapshot::snapshot_cart;

/// A freshly placed (or fully loaded) order with its lines.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Order placement and lifecycle operations.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
}

impl CheckoutService {
    /// Creates a new CheckoutService.
    pub fn new(db: Database) -> Self {
        CheckoutService { db }
    }

    /// Converts the owner's cart into a pending order.
    ///
    /// Fails with `EmptyCart` if there is nothing to buy, `NotFound` if a
    /// carted book vanished from the catalog, and `InsufficientStock` naming
    /// the first under-stocked title. On any failure the cart is untouched.
    pub async fn place_order(&self, owner_id: &str) -> CheckoutResult<PlacedOrder> {
        validation::validate_owner_id(owner_id).map_err(CoreError::from)?;

        let snapshot = snapshot_cart(&self.db, owner_id).await?;
        if snapshot.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // Stock pre-check. Stock can still move between here and settlement;
        // the decrement inside the settlement transaction is what binds.
        for line in &snapshot.lines {
            if line.available_stock < line.quantity {
                return Err(CheckoutError::InsufficientStock {
                    title: line.title.clone(),
                    available: line.available_stock,
                    requested: line.quantity,
                });
            }
        }

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            total_cents: snapshot.total_cents(),
            status: OrderStatus::Pending,
            payment_id: None,
            created_at: now,
            updated_at: now,
        };

        let items: Vec<OrderItem> = snapshot
            .lines
            .iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4().to_string(),
                order_id: order.id.clone(),
                book_id: line.book_id.clone(),
                title_snapshot: line.title.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                created_at: now,
            })
            .collect();

        // Order, lines, and cart clear land together or not at all.
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;
        OrderRepository::insert_in(&mut tx, &order).await?;
        for item in &items {
            OrderRepository::insert_item_in(&mut tx, item).await?;
        }
        CartRepository::clear_in(&mut tx, owner_id).await?;
        tx.commit().await.map_err(DbError::from)?;

        info!(
            order_id = %order.id,
            owner_id = %owner_id,
            total = %order.total_cents,
            lines = items.len(),
            "Order placed"
        );

        Ok(PlacedOrder { order, items })
    }

    /// Cancels an order the owner can still cancel (pending or paid).
    ///
    /// Cancellation after shipping is rejected by the status machine.
    pub async fn cancel_order(&self, owner_id: &str, order_id: &str) -> CheckoutResult<Order> {
        let order = self.owned_order(owner_id, order_id).await?;

        if !order.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(CheckoutError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }

        self.apply_transition(order_id, order.status, OrderStatus::Cancelled)
            .await
    }

    /// Fulfilment: marks a paid order as shipped.
    pub async fn mark_shipped(&self, order_id: &str) -> CheckoutResult<Order> {
        self.advance(order_id, OrderStatus::Paid, OrderStatus::Shipped)
            .await
    }

    /// Fulfilment: marks a shipped order as delivered.
    pub async fn mark_delivered(&self, order_id: &str) -> CheckoutResult<Order> {
        self.advance(order_id, OrderStatus::Shipped, OrderStatus::Delivered)
            .await
    }

    /// Loads an order with its lines, scoped to the owner.
    pub async fn order_details(&self, owner_id: &str, order_id: &str) -> CheckoutResult<PlacedOrder> {
        let order = self.owned_order(owner_id, order_id).await?;
        let items = self.db.orders().items(order_id).await?;
        Ok(PlacedOrder { order, items })
    }

    /// Lists the owner's orders, newest first.
    pub async fn my_orders(&self, owner_id: &str) -> CheckoutResult<Vec<Order>> {
        Ok(self.db.orders().list_for_owner(owner_id).await?)
    }

    /// Lists the owner's payments, newest first.
    pub async fn my_payments(&self, owner_id: &str) -> CheckoutResult<Vec<Payment>> {
        Ok(self.db.payments().list_for_owner(owner_id).await?)
    }

    async fn owned_order(&self, owner_id: &str, order_id: &str) -> CheckoutResult<Order> {
        self.db
            .orders()
            .get_by_id(order_id)
            .await?
            .filter(|o| o.owner_id == owner_id)
            .ok_or_else(|| CheckoutError::not_found("Order", order_id))
    }

    async fn advance(
        &self,
        order_id: &str,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> CheckoutResult<Order> {
        let order = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Order", order_id))?;

        if order.status != expected {
            return Err(CheckoutError::InvalidTransition {
                from: order.status,
                to: next,
            });
        }

        self.apply_transition(order_id, expected, next).await
    }

    /// Applies a CAS status update and reloads. Zero rows affected means the
    /// order moved underneath us; report the transition from where it
    /// actually is now.
    async fn apply_transition(
        &self,
        order_id: &str,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> CheckoutResult<Order> {
        let claimed = self.db.orders().transition(order_id, expected, next).await?;

        let current = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Order", order_id))?;

        if claimed == 0 {
            debug!(order_id = %order_id, status = %current.status, "Lost status transition race");
            return Err(CheckoutError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }

        Ok(current)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
