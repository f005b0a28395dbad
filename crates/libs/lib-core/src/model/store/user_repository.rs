//! # User Repository
//!
//! Provides database access layer for user lookups.
//!
//! Account management (signup, passwords, credential issuance) lives outside
//! this service. The repository only needs enough to resolve identities for
//! room membership and message hydration.
//!
//! ## Example
//!
//! ```rust,no_run
//! # use lib_core::model::store::UserRepository;
//! # use lib_core::create_test_pool;
//! # async fn example() -> lib_core::Result<()> {
//! let pool = create_test_pool().await?;
//!
//! let user = UserRepository::create(&pool, "alice@example.com").await?;
//!
//! let found = UserRepository::find_by_email(&pool, "alice@example.com").await?;
//! assert_eq!(found.map(|u| u.id), Some(user.id));
//! # Ok(())
//! # }
//! ```

use super::models::User;
use super::DbPool;
use crate::error::{AppError, Result};
use lib_utils::{from_millis, now_utc, to_millis, validate_email};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    created_at: i64,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: Uuid::parse_str(&row.id)
                .map_err(|_| AppError::Decoding(format!("Corrupt user id: {}", row.id)))?,
            email: row.email,
            created_at: from_millis(row.created_at),
        })
    }
}

/// User repository for database operations.
pub struct UserRepository;

impl UserRepository {
    /// Create a new user.
    ///
    /// The email is trimmed and lowercased before storage.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidInput`] for a malformed or already registered email
    /// - [`AppError::Internal`] if the database fails
    pub async fn create(pool: &DbPool, email: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        validate_email(&email).map_err(AppError::InvalidInput)?;

        let user = User {
            id: Uuid::new_v4(),
            email,
            created_at: now_utc(),
        };

        sqlx::query("INSERT INTO users (id, email, created_at) VALUES (?, ?, ?)")
            .bind(user.id.to_string())
            .bind(&user.email)
            .bind(to_millis(user.created_at))
            .execute(pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    AppError::InvalidInput("Email is already registered".to_string())
                }
                other => other.into(),
            })?;

        Ok(user)
    }

    /// Find a user by id.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(User))` - User found
    /// * `Ok(None)` - No user with that id
    pub async fn find_by_id(pool: &DbPool, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, email, created_at FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    /// Find a user by their email address (case-insensitive).
    pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, email, created_at FROM users WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    /// Check that every id in `ids` refers to an existing user.
    ///
    /// Returns the first unknown id, if any.
    pub async fn first_missing(pool: &DbPool, ids: &[Uuid]) -> Result<Option<Uuid>> {
        for id in ids {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
                .bind(id.to_string())
                .fetch_one(pool)
                .await?;
            if count == 0 {
                return Ok(Some(*id));
            }
        }
        Ok(None)
    }
}
