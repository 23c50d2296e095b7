//! # Cart Service
//!
//! Cart operations for an authenticated owner: add, view, remove. Validation
//! happens here, at the flow boundary; the repository underneath stays dumb.

use tracing::debug;

use bookstack_core::{validation, CoreError, MAX_CART_LINES};
use bookstack_db::Database;

use crate::error::{CheckoutError, CheckoutResult};
use crate::snapshot::{snapshot_cart, CartSnapshot};

/// Cart operations for authenticated owners.
#[derive(Debug, Clone)]
pub struct CartService {
    db: Database,
}

impl CartService {
    /// Creates a new CartService.
    pub fn new(db: Database) -> Self {
        CartService { db }
    }

    /// Adds `quantity` copies of a book to the owner's cart and returns the
    /// updated cart view. Re-adding a carted book bumps its line quantity.
    pub async fn add_item(
        &self,
        owner_id: &str,
        book_id: &str,
        quantity: i64,
    ) -> CheckoutResult<CartSnapshot> {
        validation::validate_owner_id(owner_id).map_err(CoreError::from)?;
        validation::validate_quantity(quantity).map_err(CoreError::from)?;

        // The book must exist and be purchasable before it can be carted.
        self.db
            .books()
            .get_by_id(book_id)
            .await?
            .filter(|b| b.is_active)
            .ok_or_else(|| CheckoutError::not_found("Book", book_id))?;

        let lines = self.db.carts().line_count(owner_id).await?;
        if lines as usize >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            }
            .into());
        }

        self.db.carts().add_item(owner_id, book_id, quantity).await?;
        debug!(owner_id = %owner_id, book_id = %book_id, quantity = %quantity, "Cart line added");

        snapshot_cart(&self.db, owner_id).await
    }

    /// Returns the owner's current cart. An owner without a cart gets an
    /// empty view, not an error.
    pub async fn view(&self, owner_id: &str) -> CheckoutResult<CartSnapshot> {
        snapshot_cart(&self.db, owner_id).await
    }

    /// Removes one book's line from the cart. Removing a book that is not
    /// carted is a no-op.
    pub async fn remove_item(&self, owner_id: &str, book_id: &str) -> CheckoutResult<CartSnapshot> {
        self.db.carts().remove_item(owner_id, book_id).await?;
        snapshot_cart(&self.db, owner_id).await
    }
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

    async fn seed_book(db: &Database, id: &str, title: &str, active: bool) {
        let now = Utc::now();
        db.books()
            .insert(&Book {
                id: id.to_string(),
                title: title.to_string(),
                author: "Author".to_string(),
                category: "Fiction".to_string(),
                price_cents: 1000,
                stock_quantity: 10,
                is_active: active,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_add_and_view() {
        let db = test_db().await;
        seed_book(&db, "b1", "Dune", true).await;
        let carts = CartService::new(db);

        let view = carts.add_item("user-1", "b1", 2).await.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].quantity, 2);
        assert_eq!(view.total_cents(), 2000);

        let view = carts.add_item("user-1", "b1", 1).await.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_add_rejects_bad_quantity() {
        let db = test_db().await;
        seed_book(&db, "b1", "Dune", true).await;
        let carts = CartService::new(db);

        let err = carts.add_item("user-1", "b1", 0).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Core(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_add_rejects_unknown_or_inactive_book() {
        let db = test_db().await;
        seed_book(&db, "b1", "Dune", false).await;
        let carts = CartService::new(db);

        assert!(matches!(
            carts.add_item("user-1", "missing", 1).await.unwrap_err(),
            CheckoutError::NotFound { .. }
        ));
        assert!(matches!(
            carts.add_item("user-1", "b1", 1).await.unwrap_err(),
            CheckoutError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let db = test_db().await;
        seed_book(&db, "b1", "Dune", true).await;
        let carts = CartService::new(db);

        carts.add_item("user-1", "b1", 1).await.unwrap();
        let view = carts.remove_item("user-1", "b1").await.unwrap();
        assert!(view.is_empty());

        let view = carts.remove_item("user-1", "b1").await.unwrap();
        assert!(view.is_empty());
    }
}
