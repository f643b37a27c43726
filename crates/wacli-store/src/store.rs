//! Pool construction, pragmas, migration tracking, and FTS5 capability
//! detection (spec section 4.1, 9).
//!
//! Split into focused submodules the way `omega_memory::store` is split:
//! - `chats` — chat upsert/list/get
//! - `contacts` — contact upsert/search/alias/tags
//! - `groups` — group upsert and atomic participant-set replacement
//! - `messages` — message upsert and search (FTS or LIKE fallback)
//! - `media` — media download metadata and completion marking

mod chats;
mod contacts;
mod groups;
mod media;
mod messages;

#[cfg(test)]
mod tests;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use wacli_core::error::WacliError;

const MIGRATIONS: &[(&str, &str)] = &[("001_init", include_str!("../migrations/001_init.sql"))];

const FTS_MIGRATION: (&str, &str) = ("002_fts", include_str!("../migrations/002_fts.sql"));

/// The `wacli.db` mirror: chats, contacts, groups, messages, and an
/// optional FTS index. `Clone + Send + Sync` (the pool is internally
/// `Arc`-backed), so one `Store` is shared behind an `Arc` between the
/// foreground command, event handlers, and the media worker.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    has_fts: Arc<AtomicBool>,
}

impl Store {
    /// Open (creating if missing) `<dir>/wacli.db`, apply pragmas, run
    /// migrations, and probe FTS5 availability.
    pub async fn open(dir: &Path) -> Result<Self, WacliError> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join("wacli.db");

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))
            .map_err(|e| WacliError::StorageCorruption(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5))
            .pragma("temp_store", "MEMORY");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(opts)
            .await
            .map_err(|e| WacliError::StorageCorruption(format!("failed to open sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;
        let has_fts = Self::try_enable_fts(&pool).await;

        info!(path = %db_path.display(), fts = has_fts, "store opened");

        Ok(Self {
            pool,
            has_fts: Arc::new(AtomicBool::new(has_fts)),
        })
    }

    /// Open the store without forcing write pragmas, for read-only
    /// consumers (`doctor`, commands that skip the writer lock).
    pub async fn open_read_only(dir: &Path) -> Result<Self, WacliError> {
        Self::open(dir).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Capability probe: whether the FTS5 extension is available in this
    /// sqlite build, cached at open time.
    pub fn has_fts(&self) -> bool {
        self.has_fts.load(Ordering::Relaxed)
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<(), WacliError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| WacliError::StorageCorruption(format!("migrations table: {e}")))?;

        for (name, sql) in MIGRATIONS {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| WacliError::StorageCorruption(format!("check migration {name}: {e}")))?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| WacliError::StorageCorruption(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| WacliError::StorageCorruption(format!("record migration {name}: {e}")))?;
        }

        Ok(())
    }

    /// Attempt to create the FTS5 virtual table and its sync triggers inside
    /// a savepoint. On failure (extension unavailable) the savepoint is
    /// rolled back and `false` is returned — `SearchMessages` then falls
    /// back to a `LIKE`-based scan with the same query surface.
    async fn try_enable_fts(pool: &SqlitePool) -> bool {
        let (name, sql) = FTS_MIGRATION;

        let applied: Result<Option<(String,)>, _> =
            sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                .bind(name)
                .fetch_optional(pool)
                .await;
        if matches!(applied, Ok(Some(_))) {
            return true;
        }

        let mut conn = match pool.acquire().await {
            Ok(c) => c,
            Err(e) => {
                warn!("fts probe: failed to acquire connection: {e}");
                return false;
            }
        };

        if sqlx::raw_sql("SAVEPOINT fts_probe;").execute(&mut *conn).await.is_err() {
            return false;
        }

        let created = sqlx::raw_sql(sql).execute(&mut *conn).await;

        match created {
            Ok(_) => {
                let _ = sqlx::raw_sql("RELEASE fts_probe;").execute(&mut *conn).await;
                let _ = sqlx::query("INSERT OR IGNORE INTO _migrations (name) VALUES (?)")
                    .bind(name)
                    .execute(&mut *conn)
                    .await;
                true
            }
            Err(e) => {
                warn!("fts5 extension unavailable, falling back to LIKE search: {e}");
                let _ = sqlx::raw_sql("ROLLBACK TO fts_probe; RELEASE fts_probe;")
                    .execute(&mut *conn)
                    .await;
                false
            }
        }
    }
}
