//! # Order Repository
//!
//! Persistence for orders and their lines.
//!
//! ## Status writes are compare-and-set
//! Every status update carries `WHERE status = <expected>`; zero rows
//! affected means someone else moved the order first. The settlement flow
//! relies on this for its idempotency guard: two callbacks racing on the
//! same order can never both claim the `pending → paid` edge.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use bookstack_core::{Order, OrderItem, OrderStatus};

const ORDER_COLUMNS: &str =
    "id, owner_id, total_cents, status, payment_id, created_at, updated_at";

const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, book_id, title_snapshot, quantity, unit_price_cents, created_at";

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets an order by ID inside an open transaction.
    pub async fn get_by_id_in(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(order)
    }

    /// Gets all lines of an order, in insertion order.
    pub async fn items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY rowid"
        ))
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets all lines of an order inside an open transaction.
    pub async fn items_in(
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(&format!(
            "SELECT {ORDER_ITEM_COLUMNS} FROM order_items WHERE order_id = ?1 ORDER BY rowid"
        ))
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Lists an owner's orders, newest first.
    pub async fn list_for_owner(&self, owner_id: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE owner_id = ?1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Inserts an order row inside an open transaction.
    pub async fn insert_in(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, total = %order.total_cents, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, owner_id, total_cents, status, payment_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&order.id)
        .bind(&order.owner_id)
        .bind(order.total_cents)
        .bind(order.status)
        .bind(&order.payment_id)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts an order line inside an open transaction.
    pub async fn insert_item_in(conn: &mut SqliteConnection, item: &OrderItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO order_items (
                id, order_id, book_id, title_snapshot, quantity, unit_price_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.book_id)
        .bind(&item.title_snapshot)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Claims the `pending → paid` edge inside an open transaction.
    ///
    /// Returns the number of rows affected: 1 if this caller won the edge,
    /// 0 if the order was not in `pending` anymore (already settled,
    /// cancelled, or never existed).
    pub async fn mark_paid_in(
        conn: &mut SqliteConnection,
        order_id: &str,
        payment_id: &str,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'paid', payment_id = ?2, updated_at = ?3
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(order_id)
        .bind(payment_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Moves an order from `expected` to `next` status.
    ///
    /// Returns the number of rows affected; 0 means the order was not in the
    /// expected status when the write landed. Legality of the transition is
    /// the caller's business (checked against the status machine before
    /// calling).
    pub async fn transition(
        &self,
        order_id: &str,
        expected: OrderStatus,
        next: OrderStatus,
    ) -> DbResult<u64> {
        debug!(order_id = %order_id, from = %expected, to = %next, "Order status transition");

        let result = sqlx::query(
            r#"
            UPDATE orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2
            "#,
        )
        .bind(order_id)
        .bind(expected)
        .bind(next)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn order(owner: &str, total: i64, age_minutes: i64) -> Order {
        let at = Utc::now() - Duration::minutes(age_minutes);
        Order {
            id: Uuid::new_v4().to_string(),
            owner_id: owner.to_string(),
            total_cents: total,
            status: OrderStatus::Pending,
            payment_id: None,
            created_at: at,
            updated_at: at,
        }
    }

    async fn insert(db: &Database, order: &Order) {
        let mut tx = db.pool().begin().await.unwrap();
        OrderRepository::insert_in(&mut tx, order).await.unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let o = order("user-1", 2500, 0);
        insert(&db, &o).await;

        let found = db.orders().get_by_id(&o.id).await.unwrap().unwrap();
        assert_eq!(found.total_cents, 2500);
        assert_eq!(found.status, OrderStatus::Pending);
        assert!(found.payment_id.is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let db = test_db().await;
        let older = order("user-1", 100, 10);
        let newer = order("user-1", 200, 0);
        let other = order("user-2", 300, 0);
        insert(&db, &older).await;
        insert(&db, &newer).await;
        insert(&db, &other).await;

        let orders = db.orders().list_for_owner("user-1").await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, newer.id);
        assert_eq!(orders[1].id, older.id);
    }

    #[tokio::test]
    async fn test_mark_paid_is_single_shot() {
        let db = test_db().await;
        let o = order("user-1", 2500, 0);
        insert(&db, &o).await;

        let mut tx = db.pool().begin().await.unwrap();
        assert_eq!(
            OrderRepository::mark_paid_in(&mut tx, &o.id, "pay-1")
                .await
                .unwrap(),
            1
        );
        // Second claim inside or outside the transaction finds no pending row
        assert_eq!(
            OrderRepository::mark_paid_in(&mut tx, &o.id, "pay-2")
                .await
                .unwrap(),
            0
        );
        tx.commit().await.unwrap();

        let found = db.orders().get_by_id(&o.id).await.unwrap().unwrap();
        assert_eq!(found.status, OrderStatus::Paid);
        assert_eq!(found.payment_id.as_deref(), Some("pay-1"));
    }

    #[tokio::test]
    async fn test_transition_cas() {
        let db = test_db().await;
        let o = order("user-1", 100, 0);
        insert(&db, &o).await;

        let n = db
            .orders()
            .transition(&o.id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(n, 1);

        // Expected status no longer matches
        let n = db
            .orders()
            .transition(&o.id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(n, 0);

        let found = db.orders().get_by_id(&o.id).await.unwrap().unwrap();
        assert_eq!(found.status, OrderStatus::Cancelled);
    }
}
