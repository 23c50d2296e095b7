//! # Cart Snapshots
//!
//! An immutable copy of a mutable cart, taken at a specific instant.
//!
//! ## Price Freezing
//! The cart stores only (book, quantity). Taking a snapshot resolves each
//! line's unit price from the catalog *at call time*; order placement then
//! copies the snapshot into order lines. From that point on the price at
//! purchase is frozen - later catalog price changes never touch a placed
//! order, while a cart left open overnight always checks out at current
//! prices.
//!
//! A cart line whose book has vanished from the catalog (or was deactivated)
//! fails the whole snapshot with `NotFound` - lines are never silently
//! dropped, because the buyer would be charged for a different cart than the
//! one they saw.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bookstack_core::Money;
use bookstack_db::Database;

use crate::error::{CheckoutError, CheckoutResult};

/// One immutable snapshot line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotLine {
    pub book_id: String,
    pub title: String,
    pub quantity: i64,

    /// Unit price resolved from the catalog when the snapshot was taken.
    pub unit_price_cents: i64,

    /// Stock level observed when the snapshot was taken. Informational: the
    /// binding stock check happens inside the settlement transaction.
    pub available_stock: i64,
}

impl SnapshotLine {
    /// Line total: unit price × quantity.
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents * self.quantity)
    }
}

/// An immutable view of an owner's cart at one instant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub owner_id: String,
    pub lines: Vec<SnapshotLine>,
    pub taken_at: DateTime<Utc>,
}

impl CartSnapshot {
    /// No cart, or a cart with zero lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of line totals.
    pub fn total(&self) -> Money {
        self.lines.iter().map(SnapshotLine::line_total).sum()
    }

    /// Sum of line totals, in cents.
    pub fn total_cents(&self) -> i64 {
        self.total().cents()
    }
}

/// Reads the owner's current cart with prices resolved from the catalog.
///
/// Returns an empty snapshot for an owner without a cart. Fails with
/// `NotFound` if any carted book no longer exists in the catalog.
pub async fn snapshot_cart(db: &Database, owner_id: &str) -> CheckoutResult<CartSnapshot> {
    let items = db.carts().items(owner_id).await?;

    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let book = db
            .books()
            .get_by_id(&item.book_id)
            .await?
            .filter(|b| b.is_active)
            .ok_or_else(|| CheckoutError::not_found("Book", item.book_id.clone()))?;

        lines.push(SnapshotLine {
            book_id: book.id,
            title: book.title,
            quantity: item.quantity,
            unit_price_cents: book.price_cents,
            available_stock: book.stock_quantity,
        });
    }

    Ok(CartSnapshot {
        owner_id: owner_id.to_string(),
        lines,
        taken_at: Utc::now(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bookstack_core::Book;
    use bookstack_db::DbConfig;
    use chrono::Utc;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
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

    #[tokio::test]
    async fn test_empty_snapshot_for_unknown_owner() {
        let db = test_db().await;
        let snapshot = snapshot_cart(&db, "nobody").await.unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.total_cents(), 0);
    }

    #[tokio::test]
    async fn test_prices_resolved_at_snapshot_time() {
        let db = test_db().await;
        seed_book(&db, "b1", "Dune", 1000, 5).await;
        db.carts().add_item("user-1", "b1", 2).await.unwrap();

        let before = snapshot_cart(&db, "user-1").await.unwrap();
        assert_eq!(before.lines[0].unit_price_cents, 1000);
        assert_eq!(before.total_cents(), 2000);

        // Catalog price change lands in the next snapshot
        sqlx::query("UPDATE books SET price_cents = 1500 WHERE id = 'b1'")
            .execute(db.pool())
            .await
            .unwrap();

        let after = snapshot_cart(&db, "user-1").await.unwrap();
        assert_eq!(after.lines[0].unit_price_cents, 1500);
        assert_eq!(after.total_cents(), 3000);
    }

    #[tokio::test]
    async fn test_deactivated_book_fails_whole_snapshot() {
        let db = test_db().await;
        seed_book(&db, "b1", "Dune", 1000, 5).await;
        seed_book(&db, "b2", "Hyperion", 1200, 5).await;
        db.carts().add_item("user-1", "b1", 1).await.unwrap();
        db.carts().add_item("user-1", "b2", 1).await.unwrap();

        db.books().deactivate("b2").await.unwrap();

        let err = snapshot_cart(&db, "user-1").await.unwrap_err();
        assert!(matches!(err, CheckoutError::NotFound { entity: "Book", .. }));
    }
}
