//! # Book Repository
//!
//! Catalog lookups plus the inventory ledger.
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: Absolute update (lost updates under concurrency)        │
//! │     UPDATE books SET stock_quantity = 7 WHERE id = ?               │
//! │                                                                     │
//! │  ✅ CORRECT: Conditional delta update                              │
//! │     UPDATE books SET stock_quantity = stock_quantity - ?           │
//! │     WHERE id = ? AND stock_quantity >= ?                           │
//! │                                                                     │
//! │  The decrement succeeds only if enough stock remains at the moment │
//! │  the row is written; zero rows affected means insufficient stock.  │
//! │  Two settlements racing for the last copy can never both win.      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use bookstack_core::Book;

const BOOK_COLUMNS: &str =
    "id, title, author, category, price_cents, stock_quantity, is_active, created_at, updated_at";

/// Repository for catalog and inventory operations.
#[derive(Debug, Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    /// Creates a new BookRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookRepository { pool }
    }

    /// Gets a book by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    /// Gets a book by its (unique) title.
    pub async fn get_by_title(&self, title: &str) -> DbResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE title = ?1"
        ))
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    /// Inserts a new book.
    pub async fn insert(&self, book: &Book) -> DbResult<()> {
        debug!(id = %book.id, title = %book.title, "Inserting book");

        sqlx::query(
            r#"
            INSERT INTO books (
                id, title, author, category,
                price_cents, stock_quantity, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.category)
        .bind(book.price_cents)
        .bind(book.stock_quantity)
        .bind(book.is_active)
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a batch of books, rejecting the whole batch if any title
    /// already exists.
    ///
    /// Returns the number of books inserted.
    pub async fn insert_many(&self, books: &[Book]) -> DbResult<usize> {
        if books.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; books.len()].join(", ");
        let sql = format!("SELECT title FROM books WHERE title IN ({placeholders})");

        let mut query = sqlx::query_scalar::<_, String>(&sql);
        for book in books {
            query = query.bind(&book.title);
        }
        let existing: Vec<String> = query.fetch_all(&self.pool).await?;

        if !existing.is_empty() {
            return Err(DbError::duplicate(format!(
                "books.title ({})",
                existing.join(", ")
            )));
        }

        let mut tx = self.pool.begin().await?;
        for book in books {
            sqlx::query(
                r#"
                INSERT INTO books (
                    id, title, author, category,
                    price_cents, stock_quantity, is_active,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&book.id)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.category)
            .bind(book.price_cents)
            .bind(book.stock_quantity)
            .bind(book.is_active)
            .bind(book.created_at)
            .bind(book.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(count = books.len(), "Inserted book batch");
        Ok(books.len())
    }

    /// Lists active books ordered by title.
    pub async fn list_active(&self, limit: i64) -> DbResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE is_active = 1 ORDER BY title LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Applies a stock delta (positive for restocking).
    ///
    /// Delta updates instead of absolute writes: two concurrent restocks both
    /// land, neither overwrites the other.
    pub async fn restock(&self, id: &str, delta: i64) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let result = sqlx::query(
            r#"
            UPDATE books
            SET stock_quantity = stock_quantity + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Book", id));
        }

        Ok(())
    }

    /// Soft-deletes a book by setting is_active = false.
    ///
    /// Historical order lines still reference the row, so it is never
    /// physically deleted.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating book");

        let result = sqlx::query(
            r#"
            UPDATE books SET is_active = 0, updated_at = ?2 WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Book", id));
        }

        Ok(())
    }

    /// Counts active books (for diagnostics).
    pub async fn count_active(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // In-transaction inventory helpers
    // =========================================================================

    /// Conditionally decrements stock inside an open transaction.
    ///
    /// Succeeds (returns `true`) only if the current stock covers `quantity`
    /// at write time; otherwise returns `false` and changes nothing. This is
    /// the binding stock check of the settlement unit of work.
    pub async fn decrement_stock_in(
        conn: &mut SqliteConnection,
        book_id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET stock_quantity = stock_quantity - ?2, updated_at = ?3
            WHERE id = ?1 AND stock_quantity >= ?2
            "#,
        )
        .bind(book_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reads current stock inside an open transaction.
    pub async fn stock_in(conn: &mut SqliteConnection, book_id: &str) -> DbResult<Option<i64>> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock_quantity FROM books WHERE id = ?1")
                .bind(book_id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(stock)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
