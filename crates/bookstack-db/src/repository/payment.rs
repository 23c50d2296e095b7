//! # Payment Repository
//!
//! Payment records: many `pending`/`failed` attempts may accumulate against
//! an order, but a partial unique index (plus the settlement CAS) caps it at
//! one `success`.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use bookstack_core::{Payment, PaymentStatus};

const PAYMENT_COLUMNS: &str =
    "id, order_id, owner_id, amount_cents, status, method, transaction_id, created_at";

/// Repository for payment database operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Records a payment attempt (used for failed attempts outside the
    /// settlement transaction).
    pub async fn insert(&self, payment: &Payment) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::insert_in(&mut conn, payment).await
    }

    /// Records a payment inside an open transaction.
    pub async fn insert_in(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
        debug!(
            id = %payment.id,
            order_id = %payment.order_id,
            amount = %payment.amount_cents,
            "Recording payment"
        );

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, order_id, owner_id, amount_cents, status, method, transaction_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.order_id)
        .bind(&payment.owner_id)
        .bind(payment.amount_cents)
        .bind(payment.status)
        .bind(payment.method)
        .bind(&payment.transaction_id)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets a payment by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Lists an owner's payments, newest first.
    pub async fn list_for_owner(&self, owner_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE owner_id = ?1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Lists every attempt against an order, oldest first.
    pub async fn list_for_order(&self, order_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ?1 ORDER BY created_at, id"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Gets the successful payment for an order, if it has settled.
    pub async fn success_for_order(&self, order_id: &str) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = ?1 AND status = ?2"
        ))
        .bind(order_id)
        .bind(PaymentStatus::Success)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }
}
