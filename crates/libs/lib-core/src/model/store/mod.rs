//! # Database Store
//!
//! Database connection pool and repository implementations.

// region: --- Modules
pub mod models;
pub mod user_repository;
pub mod project_repository;
pub mod file_tree_store;
pub mod message_ledger;
// endregion: --- Modules

// region: --- Re-exports
pub use file_tree_store::FileTreeStore;
pub use message_ledger::{MessageLedger, MESSAGE_TTL_SECS};
pub use models::{MessageRecord, Project, SenderRef, User};
pub use project_repository::ProjectRepository;
pub use user_repository::UserRepository;
// endregion: --- Re-exports

// region: --- Types and Functions
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Type alias for SQLite connection pool.
pub type DbPool = SqlitePool;

/// Create a new SQLite connection pool for `database_url`.
pub async fn create_pool(database_url: &str) -> anyhow::Result<DbPool> {
    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;

    Ok(pool)
}

/// Apply the embedded schema migrations.
pub async fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Create a migrated in-memory database.
///
/// Single connection with no idle reaping: an in-memory SQLite database lives
/// exactly as long as its connection.
pub async fn create_test_pool() -> anyhow::Result<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}
// endregion: --- Types and Functions
