//! # Key-Value Storage
//!
//! SQLite-backed key-value storage for cart snapshots.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Key-Value Storage                                   │
//! │                                                                         │
//! │  App Startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  KvConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  KvStore::connect(config).await ← Create pool + run migrations         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │              kv_store table              │                           │
//! │  │                                          │                           │
//! │  │  key (PK)            value               │                           │
//! │  │  ─────────────────   ─────────────────   │                           │
//! │  │  marketplace:cart    [{"id":"A",...}]    │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │                                                                         │
//! │  get(key) ──► Option<String>    (missing key is None, not an error)    │
//! │  set(key) ──► upsert, overwriting any prior value for the key          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! SQLite WAL (Write-Ahead Logging) mode is enabled for:
//! - Better concurrent read performance
//! - Readers don't block writers
//! - Better crash recovery

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{KvError, KvResult};

/// Embedded migrations from the `migrations/sqlite` directory.
///
/// The `sqlx::migrate!()` macro embeds all SQL files from the specified
/// directory into the binary at compile time. No runtime file access needed.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

// =============================================================================
// Configuration
// =============================================================================

/// Storage configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = KvConfig::new("/path/to/cart.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct KvConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5 (plenty for a local client app)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl KvConfig {
    /// Creates a new storage configuration with the given path.
    ///
    /// The database file will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        KvConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory storage configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let kv = KvStore::connect(KvConfig::in_memory()).await?;
    /// // Storage is isolated and vanishes with the pool, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        KvConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Key-value storage handle over a SQLite connection pool.
///
/// Cloning is cheap (the pool is internally reference-counted); clones share
/// the same underlying storage. `get` and `set` are both async and both
/// fallible - callers decide whether a failure is fatal (it never is for the
/// cart store, which treats hydration failure as "no data" and writes as
/// best-effort).
#[derive(Debug, Clone)]
pub struct KvStore {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl KvStore {
    /// Creates a new storage handle.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite (WAL mode, NORMAL synchronous)
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn connect(config: KvConfig) -> KvResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing key-value storage"
        );

        let connect_options = if config.database_path == Path::new(":memory:") {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else {
            // sqlite://path with mode=rwc creates the file if not exists
            SqliteConnectOptions::from_str(&format!(
                "sqlite://{}?mode=rwc",
                config.database_path.display()
            ))
        }
        .map_err(|e| KvError::ConnectionFailed(e.to_string()))?
        // WAL mode: readers don't block writers, writers don't block readers
        .journal_mode(SqliteJournalMode::Wal)
        // NORMAL synchronous: data is safe from corruption, may lose the
        // last transaction on crash - matching the "best-effort, no
        // fsync-equivalent guarantee" durability contract
        .synchronous(SqliteSynchronous::Normal)
        .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| KvError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Storage pool created"
        );

        let store = KvStore { pool };

        if config.run_migrations {
            store.run_migrations().await?;
        }

        Ok(store)
    }

    /// Runs all pending storage migrations.
    ///
    /// Idempotent: safe to run multiple times. Automatically called by
    /// [`KvStore::connect`] unless disabled in the config.
    pub async fn run_migrations(&self) -> KvResult<()> {
        info!("Checking for pending migrations");
        MIGRATOR.run(&self.pool).await?;
        info!("All migrations applied");
        Ok(())
    }

    /// Reads the value stored under a key.
    ///
    /// ## Returns
    /// * `Ok(Some(value))` - the key exists
    /// * `Ok(None)` - the key has never been written (not an error)
    /// * `Err(KvError)` - storage unavailable or query failed
    pub async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM kv_store WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    /// Writes a value under a key, overwriting any prior value.
    pub async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        debug!(key = %key, "Value stored");
        Ok(())
    }

    /// Removes a key from storage. Removing an absent key is not an error.
    pub async fn delete(&self, key: &str) -> KvResult<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// For advanced queries not covered by the key-value surface.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checks if the storage is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Closes the storage connection pool.
    ///
    /// After calling close, all storage operations will fail.
    pub async fn close(&self) {
        info!("Closing storage connection pool");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
