//! # Cart Repository
//!
//! One cart per owner; lines are upserted by book so adding an already-carted
//! book bumps its quantity instead of duplicating the line.
//!
//! Carts are mutable right up until checkout. Prices are never stored here -
//! they are resolved from the catalog when a snapshot is taken.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use bookstack_core::CartItem;

/// Repository for cart database operations.
#[derive(Debug, Clone)]
pub struct CartRepository {
    pool: SqlitePool,
}

impl CartRepository {
    /// Creates a new CartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CartRepository { pool }
    }

    /// Adds `quantity` copies of a book to the owner's cart, creating the
    /// cart on first use. Re-adding a book increases the existing line.
    pub async fn add_item(&self, owner_id: &str, book_id: &str, quantity: i64) -> DbResult<()> {
        debug!(owner_id = %owner_id, book_id = %book_id, quantity = %quantity, "Adding cart line");

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO carts (id, owner_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(owner_id) DO UPDATE SET updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(owner_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO cart_items (id, cart_id, book_id, quantity, created_at)
            SELECT ?1, c.id, ?3, ?4, ?5 FROM carts c WHERE c.owner_id = ?2
            ON CONFLICT(cart_id, book_id)
            DO UPDATE SET quantity = cart_items.quantity + excluded.quantity
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(owner_id)
        .bind(book_id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the owner's cart lines, oldest first. An owner without a cart
    /// simply gets an empty list.
    pub async fn items(&self, owner_id: &str) -> DbResult<Vec<CartItem>> {
        let items = sqlx::query_as::<_, CartItem>(
            r#"
            SELECT ci.id, ci.cart_id, ci.book_id, ci.quantity, ci.created_at
            FROM cart_items ci
            INNER JOIN carts c ON ci.cart_id = c.id
            WHERE c.owner_id = ?1
            ORDER BY ci.rowid
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Counts the owner's cart lines.
    pub async fn line_count(&self, owner_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM cart_items ci
            INNER JOIN carts c ON ci.cart_id = c.id
            WHERE c.owner_id = ?1
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Removes one book's line from the owner's cart.
    ///
    /// Returns `true` if a line was removed.
    pub async fn remove_item(&self, owner_id: &str, book_id: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM cart_items
            WHERE book_id = ?2
              AND cart_id IN (SELECT id FROM carts WHERE owner_id = ?1)
            "#,
        )
        .bind(owner_id)
        .bind(book_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Empties the owner's cart.
    pub async fn clear(&self, owner_id: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::clear_in(&mut conn, owner_id).await
    }

    /// Empties the owner's cart inside an open transaction.
    ///
    /// Order placement uses this so the cart is emptied in the same atomic
    /// unit that creates the order - never before, and not at all if the
    /// order insert fails.
    pub async fn clear_in(conn: &mut SqliteConnection, owner_id: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            DELETE FROM cart_items
            WHERE cart_id IN (SELECT id FROM carts WHERE owner_id = ?1)
            "#,
        )
        .bind(owner_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
