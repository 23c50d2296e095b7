//! # Settlement
//!
//! The all-or-nothing transition of an order from `pending` to `paid`.
//!
//! ## The unit of work
//! ```text
//! 1. Verify the callback signature       pure computation, NO state touched
//! 2. Load the session for the token      must be bound to the claimed order
//! 3. ONE transaction:
//!      load order                        NotFound if absent
//!      status guard                      paid → AlreadySettled
//!                                        anything else non-pending → InvalidTransition
//!      insert payment (status success,   amount = order total, server-computed
//!              txn id = payment token)
//!      pending → paid compare-and-set    0 rows → a concurrent callback won
//!      per line: conditional decrement   0 rows → InsufficientStock, abort all
//! 4. Commit
//! ```
//! Any failure inside step 3 drops the transaction, which rolls back every
//! write: no payment row, no status change, no decrement survives. Partial
//! application of those writes is the one outcome this module exists to make
//! impossible.
//!
//! ## Same-order races
//! Two callbacks for the same order can both pass the signature gate and
//! both load a `pending` order, but only one compare-and-set claims the
//! `pending → paid` edge. The loser's transaction rolls back (taking its
//! payment row with it) and the caller sees `AlreadySettled`: exactly one
//! charge, exactly one stock decrement, no matter how many retries arrive.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use bookstack_core::{
    signature, Order, OrderStatus, Payment, PaymentSession, PaymentStatus,
};
use bookstack_db::{BookRepository, Database, DbError, OrderRepository, PaymentRepository};

use crate::error::{CheckoutError, CheckoutResult};
use crate::gateway::GatewayConfig;

/// A settlement callback, as delivered by the (mock) external gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRequest {
    pub order_id: String,
    pub external_order_token: String,
    pub external_payment_token: String,
    pub signature: String,
}

/// The finalized state handed back after a successful settlement.
#[derive(Debug, Clone)]
pub struct SettlementOutcome {
    pub order: Order,
    pub payment: Payment,
}

/// Executes settlement callbacks.
#[derive(Debug, Clone)]
pub struct SettlementService {
    db: Database,
    config: GatewayConfig,
}

impl SettlementService {
    /// Creates a new SettlementService.
    pub fn new(db: Database, config: GatewayConfig) -> Self {
        SettlementService { db, config }
    }

    /// Settles one order, atomically, or changes nothing.
    pub async fn settle(&self, request: &SettlementRequest) -> CheckoutResult<SettlementOutcome> {
        // Authenticity gate. Runs before any state is read or written so a
        // forged callback leaves the system bit-for-bit unchanged.
        let authentic = signature::verify(
            self.config.secret_key.as_bytes(),
            &request.external_order_token,
            &request.external_payment_token,
            &request.signature,
        );
        if !authentic {
            warn!(order_id = %request.order_id, "Settlement callback rejected: signature mismatch");
            return Err(CheckoutError::InvalidSignature);
        }

        // The token must have been minted for the order the callback claims
        // to settle; a signed token for order A cannot settle order B.
        let session = self
            .db
            .payment_sessions()
            .get(&request.external_order_token)
            .await?
            .filter(|s| s.order_id == request.order_id)
            .ok_or_else(|| {
                CheckoutError::not_found("Payment session", request.external_order_token.clone())
            })?;

        match self.settle_in_tx(request, &session).await {
            Ok(outcome) => {
                info!(
                    order_id = %outcome.order.id,
                    payment_id = %outcome.payment.id,
                    amount = %outcome.payment.amount_cents,
                    "Order settled"
                );
                Ok(outcome)
            }
            Err(err) => {
                // A genuine (authenticated) attempt that died on stock is
                // worth an audit trail entry; the rolled-back transaction
                // left none.
                if matches!(err, CheckoutError::InsufficientStock { .. }) {
                    self.record_failed_attempt(&session, request).await;
                }
                Err(err)
            }
        }
    }

    /// The transactional body. Dropping the transaction on any error path
    /// rolls back every write made so far.
    async fn settle_in_tx(
        &self,
        request: &SettlementRequest,
        session: &PaymentSession,
    ) -> CheckoutResult<SettlementOutcome> {
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        let order = OrderRepository::get_by_id_in(&mut tx, &request.order_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Order", request.order_id.clone()))?;

        match order.status {
            OrderStatus::Pending => {}
            OrderStatus::Paid => {
                return Err(CheckoutError::AlreadySettled { order_id: order.id });
            }
            other => {
                return Err(CheckoutError::InvalidTransition {
                    from: other,
                    to: OrderStatus::Paid,
                });
            }
        }

        let items = OrderRepository::items_in(&mut tx, &order.id).await?;

        // Amount comes from the order row, never from the callback.
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            owner_id: order.owner_id.clone(),
            amount_cents: order.total_cents,
            status: PaymentStatus::Success,
            method: session.method,
            transaction_id: Some(request.external_payment_token.clone()),
            created_at: Utc::now(),
        };
        PaymentRepository::insert_in(&mut tx, &payment).await?;

        // Idempotency guard: exactly one callback claims this edge.
        let claimed = OrderRepository::mark_paid_in(&mut tx, &order.id, &payment.id).await?;
        if claimed == 0 {
            return Err(CheckoutError::AlreadySettled { order_id: order.id });
        }

        // The binding stock check. Stock may have moved since placement; a
        // conditional decrement that affects zero rows means this order can
        // no longer be fulfilled, and the whole unit of work aborts.
        for item in &items {
            let decremented =
                BookRepository::decrement_stock_in(&mut tx, &item.book_id, item.quantity).await?;
            if !decremented {
                let available = BookRepository::stock_in(&mut tx, &item.book_id)
                    .await?
                    .unwrap_or(0);
                return Err(CheckoutError::InsufficientStock {
                    title: item.title_snapshot.clone(),
                    available,
                    requested: item.quantity,
                });
            }
        }

        tx.commit().await.map_err(DbError::from)?;

        // Reload the committed row rather than patching the local copy.
        let order = self
            .db
            .orders()
            .get_by_id(&request.order_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Order", request.order_id.clone()))?;

        Ok(SettlementOutcome { order, payment })
    }

    /// Best-effort `failed` payment record after a rolled-back attempt.
    async fn record_failed_attempt(&self, session: &PaymentSession, request: &SettlementRequest) {
        let owner_id = match self.db.orders().get_by_id(&session.order_id).await {
            Ok(Some(order)) => order.owner_id,
            _ => String::new(),
        };

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            order_id: session.order_id.clone(),
            owner_id,
            amount_cents: session.amount_cents,
            status: PaymentStatus::Failed,
            method: session.method,
            transaction_id: Some(request.external_payment_token.clone()),
            created_at: Utc::now(),
        };

        if let Err(err) = self.db.payments().insert(&payment).await {
            warn!(
                order_id = %session.order_id,
                error = %err,
                "Could not record failed payment attempt"
            );
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CheckoutService, PaymentGateway};
    use bookstack_core::{Book, PaymentMethod};
    use bookstack_db::DbConfig;

    const SECRET: &str = "settlement-test-secret";

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn config() -> GatewayConfig {
        GatewayConfig::new("key_test", SECRET)
    }

    async fn seed_book(db: &Database, id: &str, title: &str, price_cents: i64, stock: i64) {
        let now = Utc::now();
        db.books()
            .insert(&Book {
                id: id.to_string(),
                title: title.to_string(),
                author: "Author".to_string(),
                category: "Fiction".to_string(),
                price_cents,
                stock_quantity: stock,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    async fn place_order(db: &Database, owner: &str, lines: &[(&str, i64)]) -> String {
        for (book_id, qty) in lines {
            db.carts().add_item(owner, book_id, *qty).await.unwrap();
        }
        CheckoutService::new(db.clone())
            .place_order(owner)
            .await
            .unwrap()
            .order
            .id
    }

    async fn initiate(db: &Database, order_id: &str) -> SettlementRequest {
        let init = PaymentGateway::new(db.clone(), config())
            .initiate(order_id, PaymentMethod::Mock)
            .await
            .unwrap();
        SettlementRequest {
            order_id: order_id.to_string(),
            external_order_token: init.external_order_token,
            external_payment_token: init.external_payment_token,
            signature: init.signature,
        }
    }

    async fn stock_of(db: &Database, book_id: &str) -> i64 {
        db.books()
            .get_by_id(book_id)
            .await
            .unwrap()
            .unwrap()
            .stock_quantity
    }

    /// End-to-end: cart [A×2 @ $10, B×1 @ $5] → total $25 → initiate →
    /// verify → settle. Order paid, stock decremented, exactly one success
    /// payment of $25.
    #[tokio::test]
    async fn test_full_settlement_scenario() {
        let db = test_db().await;
        seed_book(&db, "a", "Dune", 1000, 5).await;
        seed_book(&db, "b", "Hyperion", 500, 5).await;

        let order_id = place_order(&db, "user-1", &[("a", 2), ("b", 1)]).await;
        let request = initiate(&db, &order_id).await;

        let settlement = SettlementService::new(db.clone(), config());
        let outcome = settlement.settle(&request).await.unwrap();

        assert_eq!(outcome.order.status, OrderStatus::Paid);
        assert_eq!(outcome.order.payment_id.as_deref(), Some(outcome.payment.id.as_str()));
        assert_eq!(outcome.payment.status, PaymentStatus::Success);
        assert_eq!(outcome.payment.amount_cents, 2500);
        assert_eq!(
            outcome.payment.transaction_id.as_deref(),
            Some(request.external_payment_token.as_str())
        );

        assert_eq!(stock_of(&db, "a").await, 3);
        assert_eq!(stock_of(&db, "b").await, 4);

        let attempts = db.payments().list_for_order(&order_id).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, PaymentStatus::Success);

        let success = db
            .payments()
            .success_for_order(&order_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(success.id, outcome.payment.id);
        assert!(db
            .payments()
            .get_by_id(&success.id)
            .await
            .unwrap()
            .is_some());

        // Owner-scoped read model sees the payment too
        let mine = CheckoutService::new(db.clone())
            .my_payments("user-1")
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].amount_cents, 2500);
    }

    /// Idempotency guard: a duplicated callback neither double-charges nor
    /// double-decrements.
    #[tokio::test]
    async fn test_duplicate_callback_settles_once() {
        let db = test_db().await;
        seed_book(&db, "a", "Dune", 1000, 5).await;

        let order_id = place_order(&db, "user-1", &[("a", 2)]).await;
        let request = initiate(&db, &order_id).await;

        let settlement = SettlementService::new(db.clone(), config());
        settlement.settle(&request).await.unwrap();

        let err = settlement.settle(&request).await.unwrap_err();
        assert!(matches!(err, CheckoutError::AlreadySettled { .. }));

        // One decrement, one success payment
        assert_eq!(stock_of(&db, "a").await, 3);
        let attempts = db.payments().list_for_order(&order_id).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, PaymentStatus::Success);

        // Holds for a fresh session against the settled order too
        let err = SettlementService::new(db.clone(), config())
            .settle(&initiate_against_paid(&db, &order_id).await)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::AlreadySettled { .. }));
        assert_eq!(stock_of(&db, "a").await, 3);
    }

    /// Builds a validly-signed request for an order that is no longer
    /// pending (bypassing `initiate`'s pending check, as a retried gateway
    /// callback would).
    async fn initiate_against_paid(db: &Database, order_id: &str) -> SettlementRequest {
        let external_order_token = format!("order_{}", Uuid::new_v4().simple());
        let external_payment_token = format!("pay_{}", Uuid::new_v4().simple());
        let sig = signature::sign(
            SECRET.as_bytes(),
            &external_order_token,
            &external_payment_token,
        );
        db.payment_sessions()
            .insert(&PaymentSession {
                external_order_token: external_order_token.clone(),
                order_id: order_id.to_string(),
                method: PaymentMethod::Mock,
                amount_cents: 0,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        SettlementRequest {
            order_id: order_id.to_string(),
            external_order_token,
            external_payment_token,
            signature: sig,
        }
    }

    /// Concurrent duplicate callbacks: exactly one wins the pending → paid
    /// edge.
    #[tokio::test]
    async fn test_concurrent_duplicate_callbacks() {
        let db = test_db().await;
        seed_book(&db, "a", "Dune", 1000, 5).await;

        let order_id = place_order(&db, "user-1", &[("a", 1)]).await;
        let request = initiate(&db, &order_id).await;

        let settlement = SettlementService::new(db.clone(), config());
        let (first, second) = tokio::join!(settlement.settle(&request), settlement.settle(&request));

        let oks = [first.is_ok(), second.is_ok()]
            .iter()
            .filter(|ok| **ok)
            .count();
        assert_eq!(oks, 1);

        for result in [first, second] {
            if let Err(err) = result {
                assert!(matches!(err, CheckoutError::AlreadySettled { .. }));
            }
        }

        assert_eq!(stock_of(&db, "a").await, 4);
        assert_eq!(db.payments().list_for_order(&order_id).await.unwrap().len(), 1);
    }

    /// A forged signature must leave order, payments, and stock untouched.
    #[tokio::test]
    async fn test_forged_signature_mutates_nothing() {
        let db = test_db().await;
        seed_book(&db, "a", "Dune", 1000, 5).await;

        let order_id = place_order(&db, "user-1", &[("a", 2)]).await;
        let mut request = initiate(&db, &order_id).await;
        request.signature = signature::sign(
            b"attacker-key",
            &request.external_order_token,
            &request.external_payment_token,
        );

        let settlement = SettlementService::new(db.clone(), config());
        let err = settlement.settle(&request).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidSignature));

        // State before == state after
        let order = db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.payment_id.is_none());
        assert_eq!(stock_of(&db, "a").await, 5);
        assert!(db.payments().list_for_order(&order_id).await.unwrap().is_empty());
    }

    /// A signed token minted for order A cannot settle order B.
    #[tokio::test]
    async fn test_token_bound_to_wrong_order_rejected() {
        let db = test_db().await;
        seed_book(&db, "a", "Dune", 1000, 5).await;

        let order_a = place_order(&db, "user-1", &[("a", 1)]).await;
        let order_b = place_order(&db, "user-2", &[("a", 1)]).await;

        let mut request = initiate(&db, &order_a).await;
        request.order_id = order_b.clone();

        let settlement = SettlementService::new(db.clone(), config());
        let err = settlement.settle(&request).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::NotFound {
                entity: "Payment session",
                ..
            }
        ));

        let order = db.orders().get_by_id(&order_b).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(stock_of(&db, "a").await, 5);
    }

    /// Stock moved between placement and settlement: the whole unit of work
    /// rolls back and a failed attempt is recorded.
    #[tokio::test]
    async fn test_stock_shortfall_rolls_back_everything() {
        let db = test_db().await;
        seed_book(&db, "a", "Dune", 1000, 5).await;

        let order_id = place_order(&db, "user-1", &[("a", 2)]).await;
        let request = initiate(&db, &order_id).await;

        // Stock drains to 1 after placement
        db.books().restock("a", -4).await.unwrap();

        let settlement = SettlementService::new(db.clone(), config());
        let err = settlement.settle(&request).await.unwrap_err();

        match err {
            CheckoutError::InsufficientStock {
                title,
                available,
                requested,
            } => {
                assert_eq!(title, "Dune");
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Order still pending, stock untouched, no success payment
        let order = db.orders().get_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.payment_id.is_none());
        assert_eq!(stock_of(&db, "a").await, 1);

        let attempts = db.payments().list_for_order(&order_id).await.unwrap();
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].status, PaymentStatus::Failed);
    }

    /// Multi-line order: a shortfall on the SECOND line must also undo the
    /// first line's decrement.
    #[tokio::test]
    async fn test_partial_decrement_never_survives() {
        let db = test_db().await;
        seed_book(&db, "a", "Dune", 1000, 5).await;
        seed_book(&db, "b", "Hyperion", 500, 5).await;

        let order_id = place_order(&db, "user-1", &[("a", 1), ("b", 3)]).await;
        let request = initiate(&db, &order_id).await;

        db.books().restock("b", -4).await.unwrap();

        let settlement = SettlementService::new(db.clone(), config());
        let err = settlement.settle(&request).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientStock { .. }));

        // Line A's decrement was rolled back with the rest
        assert_eq!(stock_of(&db, "a").await, 5);
        assert_eq!(stock_of(&db, "b").await, 1);
    }

    /// Two orders racing for the last copy: exactly one settles, stock ends
    /// at zero.
    #[tokio::test]
    async fn test_race_for_last_copy() {
        let db = test_db().await;
        seed_book(&db, "a", "Dune", 1000, 1).await;

        let order_1 = place_order(&db, "user-1", &[("a", 1)]).await;
        let order_2 = place_order(&db, "user-2", &[("a", 1)]).await;

        let request_1 = initiate(&db, &order_1).await;
        let request_2 = initiate(&db, &order_2).await;

        let settlement = SettlementService::new(db.clone(), config());
        let (first, second) = tokio::join!(
            settlement.settle(&request_1),
            settlement.settle(&request_2)
        );

        let oks = [first.is_ok(), second.is_ok()]
            .iter()
            .filter(|ok| **ok)
            .count();
        assert_eq!(oks, 1);

        for result in [first, second] {
            if let Err(err) = result {
                assert!(matches!(err, CheckoutError::InsufficientStock { .. }));
            }
        }

        assert_eq!(stock_of(&db, "a").await, 0);
    }

    /// Settlement request DTO round-trips the gateway's camelCase JSON.
    #[test]
    fn test_request_deserializes_camel_case() {
        let json = r#"{
            "orderId": "o1",
            "externalOrderToken": "order_t",
            "externalPaymentToken": "pay_t",
            "signature": "ab12"
        }"#;

        let request: SettlementRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.order_id, "o1");
        assert_eq!(request.external_order_token, "order_t");
    }
}
