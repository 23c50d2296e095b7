//! Connection pool and the `Database` handle.
//!
//! File databases run in WAL journal mode (readers and writers don't block
//! each other) with foreign keys enabled. In-memory databases, used by the
//! test suites, are pinned to a single pooled connection: SQLite gives every
//! new `:memory:` connection its own private database, so a second pooled
//! connection would see empty tables.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::book::BookRepository;
use crate::repository::cart::CartRepository;
use crate::repository::order::OrderRepository;
use crate::repository::payment::PaymentRepository;
use crate::repository::session::PaymentSessionRepository;

const MEMORY_PATH: &str = ":memory:";

/// How to open the database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// File path, or `:memory:` for an ephemeral test database.
    pub database_path: PathBuf,

    /// Pool size. Forced to 1 for in-memory databases.
    pub max_connections: u32,

    /// How long an acquire may wait before failing with a timeout.
    pub acquire_timeout: Duration,

    /// Apply pending migrations when the pool opens.
    pub run_migrations: bool,
}

impl DbConfig {
    /// Configuration for a file database at `path` (created on first open).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// Configuration for an ephemeral in-memory database (tests).
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(MEMORY_PATH),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Overrides the pool size.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Overrides the acquire timeout.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Disables (or re-enables) migration on open.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }
}

/// Handle to the open database; hands out repositories.
///
/// Cloning is cheap (it clones the pool handle), so every service layer
/// holds its own copy.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the database, builds the pool, and (by default) applies any
    /// pending migrations.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::Connection(e.to_string()))?
                .foreign_keys(true)
        } else {
            let url = format!("sqlite://{}?mode=rwc", config.database_path.display());
            SqliteConnectOptions::from_str(&url)
                .map_err(|e| DbError::Connection(e.to_string()))?
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .foreign_keys(true)
        };

        // In-memory: one connection IS the database, so never let the pool
        // scale past it or retire it while idle.
        let (max, min) = if config.is_in_memory() {
            (1, 1)
        } else {
            (config.max_connections, 0)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max)
            .min_connections(min)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        info!(max_connections = max, "Database ready");
        Ok(db)
    }

    /// Applies pending migrations. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// The raw pool, for flows that need a multi-statement transaction.
    /// Everything else should go through a repository.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Catalog + inventory ledger operations.
    pub fn books(&self) -> BookRepository {
        BookRepository::new(self.pool.clone())
    }

    /// Cart operations.
    pub fn carts(&self) -> CartRepository {
        CartRepository::new(self.pool.clone())
    }

    /// Order operations.
    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone())
    }

    /// Payment record operations.
    pub fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.pool.clone())
    }

    /// Gateway payment-session operations.
    pub fn payment_sessions(&self) -> PaymentSessionRepository {
        PaymentSessionRepository::new(self.pool.clone())
    }

    /// Closes the pool. Further operations fail with a connection error.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// True if the database answers a trivial query.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
