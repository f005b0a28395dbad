//! # Message Ledger
//!
//! Durable, expiring chat history for a project.
//!
//! Every message gets a server-assigned timestamp and a deadline
//! [`MESSAGE_TTL_SECS`] later. SQLite has no TTL index, so the deadline is
//! honoured here: reads skip expired rows and [`MessageLedger::purge_expired`]
//! deletes them.

use super::models::{MessageRecord, SenderRef};
use super::DbPool;
use crate::dto::{HydratedMessage, UserProfile};
use crate::error::{AppError, Result};
use chrono::{DateTime, Duration, Utc};
use lib_utils::{from_millis, now_utc, to_millis, validate_not_empty};
use sqlx::FromRow;
use tracing::{debug, info};
use uuid::Uuid;

/// Retention of a ledger message: two days.
pub const MESSAGE_TTL_SECS: i64 = 2 * 24 * 60 * 60;

#[derive(FromRow)]
struct MessageRow {
    id: String,
    project_id: String,
    sender_id: String,
    text: String,
    created_at: i64,
    expires_at: i64,
}

impl TryFrom<MessageRow> for MessageRecord {
    type Error = AppError;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(MessageRecord {
            id: parse_id(&row.id, "message")?,
            project_id: parse_id(&row.project_id, "project")?,
            sender: row.sender_id.parse().map_err(AppError::Decoding)?,
            text: row.text,
            created_at: from_millis(row.created_at),
            expires_at: from_millis(row.expires_at),
        })
    }
}

#[derive(FromRow)]
struct HydratedRow {
    id: String,
    sender_id: String,
    sender_email: Option<String>,
    text: String,
    created_at: i64,
    expires_at: i64,
}

impl TryFrom<HydratedRow> for HydratedMessage {
    type Error = AppError;

    fn try_from(row: HydratedRow) -> Result<Self> {
        let sender = match row.sender_id.parse::<SenderRef>().map_err(AppError::Decoding)? {
            SenderRef::Assistant => Some(UserProfile::assistant()),
            SenderRef::User(_) => row.sender_email.map(|email| UserProfile { id: row.sender_id, email }),
        };

        Ok(HydratedMessage {
            id: parse_id(&row.id, "message")?,
            sender,
            message: row.text,
            timestamp: from_millis(row.created_at),
            expires_at: from_millis(row.expires_at),
        })
    }
}

fn parse_id(raw: &str, kind: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::Decoding(format!("Corrupt {} id: {}", kind, raw)))
}

/// Message ledger operations.
pub struct MessageLedger;

impl MessageLedger {
    /// Append a message stamped with the current time.
    pub async fn append(
        pool: &DbPool,
        project_id: Uuid,
        sender: SenderRef,
        text: &str,
    ) -> Result<MessageRecord> {
        Self::append_at(pool, project_id, sender, text, now_utc()).await
    }

    /// Append a message stamped with `now`.
    ///
    /// # Errors
    ///
    /// - [`AppError::InvalidInput`] for empty text
    /// - [`AppError::NotFound`] for an unknown project or user sender
    pub async fn append_at(
        pool: &DbPool,
        project_id: Uuid,
        sender: SenderRef,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<MessageRecord> {
        validate_not_empty(text, "Message").map_err(AppError::InvalidInput)?;

        let project_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects WHERE id = ?")
            .bind(project_id.to_string())
            .fetch_one(pool)
            .await?;
        if project_count == 0 {
            return Err(AppError::NotFound("Project not found".to_string()));
        }

        if let SenderRef::User(user_id) = sender {
            let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
                .bind(user_id.to_string())
                .fetch_one(pool)
                .await?;
            if user_count == 0 {
                return Err(AppError::NotFound("User not found".to_string()));
            }
        }

        let record = MessageRecord {
            id: Uuid::new_v4(),
            project_id,
            sender,
            text: text.to_string(),
            created_at: now,
            expires_at: now + Duration::seconds(MESSAGE_TTL_SECS),
        };

        sqlx::query(
            r#"
            INSERT INTO messages (id, project_id, sender_id, text, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(project_id.to_string())
        .bind(sender.to_string())
        .bind(&record.text)
        .bind(to_millis(record.created_at))
        .bind(to_millis(record.expires_at))
        .execute(pool)
        .await?;

        debug!(project_id = %project_id, sender = %sender, message_id = %record.id, "[LEDGER] Appended message");
        Ok(record)
    }

    /// Live messages of a project, oldest first.
    pub async fn list_live(pool: &DbPool, project_id: Uuid) -> Result<Vec<MessageRecord>> {
        Self::list_live_at(pool, project_id, now_utc()).await
    }

    /// Messages of a project whose deadline is after `now`, oldest first.
    pub async fn list_live_at(
        pool: &DbPool,
        project_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<MessageRecord>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, project_id, sender_id, text, created_at, expires_at
            FROM messages
            WHERE project_id = ? AND expires_at > ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(project_id.to_string())
        .bind(to_millis(now))
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(MessageRecord::try_from).collect()
    }

    /// Live messages with each sender replaced by its profile.
    pub async fn list_hydrated_at(
        pool: &DbPool,
        project_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<HydratedMessage>> {
        let rows = sqlx::query_as::<_, HydratedRow>(
            r#"
            SELECT m.id, m.sender_id, u.email AS sender_email, m.text, m.created_at, m.expires_at
            FROM messages m
            LEFT JOIN users u ON u.id = m.sender_id
            WHERE m.project_id = ? AND m.expires_at > ?
            ORDER BY m.created_at ASC, m.rowid ASC
            "#,
        )
        .bind(project_id.to_string())
        .bind(to_millis(now))
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(HydratedMessage::try_from).collect()
    }

    /// Number of messages whose deadline has passed at `now`.
    pub async fn count_expired_at(pool: &DbPool, now: DateTime<Utc>) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE expires_at <= ?")
            .bind(to_millis(now))
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Delete every expired message. Returns the number removed.
    pub async fn purge_expired(pool: &DbPool) -> Result<u64> {
        Self::purge_expired_at(pool, now_utc()).await
    }

    /// Delete every message whose deadline is at or before `now`.
    pub async fn purge_expired_at(pool: &DbPool, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE expires_at <= ?")
            .bind(to_millis(now))
            .execute(pool)
            .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            info!(removed, "[LEDGER] Purged expired messages");
        }
        Ok(removed)
    }
}
