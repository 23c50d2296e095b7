//! # Payment Session Repository
//!
//! Bindings from minted gateway tokens to orders. A settlement callback must
//! present a token minted for the order it claims to settle.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use bookstack_core::PaymentSession;

/// Repository for payment-session operations.
#[derive(Debug, Clone)]
pub struct PaymentSessionRepository {
    pool: SqlitePool,
}

impl PaymentSessionRepository {
    /// Creates a new PaymentSessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentSessionRepository { pool }
    }

    /// Stores a freshly minted session.
    pub async fn insert(&self, session: &PaymentSession) -> DbResult<()> {
        debug!(
            token = %session.external_order_token,
            order_id = %session.order_id,
            "Storing payment session"
        );

        sqlx::query(
            r#"
            INSERT INTO payment_sessions (
                external_order_token, order_id, method, amount_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&session.external_order_token)
        .bind(&session.order_id)
        .bind(session.method)
        .bind(session.amount_cents)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Looks up a session by its external order token.
    pub async fn get(&self, external_order_token: &str) -> DbResult<Option<PaymentSession>> {
        let session = sqlx::query_as::<_, PaymentSession>(
            r#"
            SELECT external_order_token, order_id, method, amount_cents, created_at
            FROM payment_sessions
            WHERE external_order_token = ?1
            "#,
        )
        .bind(external_order_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }
}
