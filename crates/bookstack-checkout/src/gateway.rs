//! # Payment Gateway (mock)
//!
//! Initiation half of the two-phase external-payment protocol.
//!
//! ## Protocol
//! ```text
//! 1. initiate(order)  → mint external order/payment tokens
//!                       sign:  HMAC-SHA256(key, order_token | payment_token)
//!                       store: session binding token → order
//!                       return tokens + amount (minor units) + signature
//!
//! 2. [buyer completes payment at the gateway - out of scope]
//!
//! 3. settle(callback) → see crate::settlement
//! ```
//!
//! A real gateway integration replaces the token minting (the gateway mints
//! its own identifiers and signs its own callbacks) without touching the
//! settlement side: settlement only ever sees tokens, a signature, and the
//! stored session.

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use bookstack_core::{signature, OrderStatus, PaymentMethod, PaymentSession};
use bookstack_db::Database;

use crate::error::{CheckoutError, CheckoutResult};

/// Gateway credentials.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Public key identifier, echoed to clients.
    pub key_id: String,

    /// Shared secret for callback signatures. Never serialized, never logged.
    pub secret_key: String,
}

impl GatewayConfig {
    /// Creates a new gateway configuration.
    pub fn new(key_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        GatewayConfig {
            key_id: key_id.into(),
            secret_key: secret_key.into(),
        }
    }
}

/// What initiation hands back to the caller (and the mock "gateway").
///
/// `amount_minor_units` is the order's server-computed total in cents - the
/// amount is never taken from the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitiation {
    pub external_order_token: String,
    pub external_payment_token: String,
    pub amount_minor_units: i64,
    pub signature: String,
}

/// Payment initiation against the (mock) external gateway.
#[derive(Debug, Clone)]
pub struct PaymentGateway {
    db: Database,
    config: GatewayConfig,
}

impl PaymentGateway {
    /// Creates a new PaymentGateway.
    pub fn new(db: Database, config: GatewayConfig) -> Self {
        PaymentGateway { db, config }
    }

    /// Starts a payment for a pending order.
    ///
    /// Mints the token pair, signs it, and stores the session binding the
    /// order token to this order. Initiation never mutates the order itself,
    /// so it can be retried freely - each retry mints a fresh session.
    pub async fn initiate(
        &self,
        order_id: &str,
        method: PaymentMethod,
    ) -> CheckoutResult<PaymentInitiation> {
        let order = self
            .db
            .orders()
            .get_by_id(order_id)
            .await?
            .ok_or_else(|| CheckoutError::not_found("Order", order_id))?;

        if order.status != OrderStatus::Pending {
            return Err(CheckoutError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Paid,
            });
        }

        let external_order_token = mint_token("order");
        let external_payment_token = mint_token("pay");

        let sig = signature::sign(
            self.config.secret_key.as_bytes(),
            &external_order_token,
            &external_payment_token,
        );

        self.db
            .payment_sessions()
            .insert(&PaymentSession {
                external_order_token: external_order_token.clone(),
                order_id: order.id.clone(),
                method,
                amount_cents: order.total_cents,
                created_at: Utc::now(),
            })
            .await?;

        info!(
            order_id = %order.id,
            token = %external_order_token,
            amount = %order.total_cents,
            "Payment initiated"
        );

        Ok(PaymentInitiation {
            external_order_token,
            external_payment_token,
            amount_minor_units: order.total_cents,
            signature: sig,
        })
    }
}

/// Mints an opaque gateway-style token.
///
/// Stands in for the identifiers a real gateway would mint server-side.
fn mint_token(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

// =============================================================================
// Unit Tests
// =============================================================================
