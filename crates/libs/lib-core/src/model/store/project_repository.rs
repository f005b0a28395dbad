//! # Project Repository
//!
//! Project lookups, membership, and the hydrated read model.
//!
//! A new project always starts with its creator as the only member. The
//! gateway can be configured to admit members only, so creator membership
//! decides who can enter a fresh project's room.

use super::message_ledger::MessageLedger;
use super::models::{Project, User};
use super::user_repository::UserRepository;
use super::DbPool;
use crate::dto::{FileTree, HydratedProject, UserProfile};
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use lib_utils::{from_millis, now_utc, to_millis, validate_not_empty};
use sqlx::FromRow;
use tracing::info;
use uuid::Uuid;

#[derive(FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    file_tree: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ProjectRow> for Project {
    type Error = AppError;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Project {
            id: Uuid::parse_str(&row.id)
                .map_err(|_| AppError::Decoding(format!("Corrupt project id: {}", row.id)))?,
            name: row.name,
            file_tree: FileTree::from_json(row.file_tree.as_bytes())?,
            created_at: from_millis(row.created_at),
            updated_at: from_millis(row.updated_at),
        })
    }
}

/// Project repository for database operations.
pub struct ProjectRepository;

impl ProjectRepository {
    /// Create a project owned by `creator`.
    ///
    /// The name is trimmed and lowercased and must be unique. The creator is
    /// inserted as the first member in the same transaction.
    pub async fn create(pool: &DbPool, name: &str, creator: Uuid) -> Result<Project> {
        validate_not_empty(name, "Project name").map_err(AppError::InvalidInput)?;
        if UserRepository::find_by_id(pool, creator).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let now = now_utc();
        let project = Project {
            id: Uuid::new_v4(),
            name: name.trim().to_lowercase(),
            file_tree: FileTree::new(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO projects (id, name, file_tree, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(project.id.to_string())
        .bind(&project.name)
        .bind(serde_json::to_string(&project.file_tree)?)
        .bind(to_millis(now))
        .bind(to_millis(now))
        .execute(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::InvalidInput("Project name must be unique".to_string())
            }
            other => other.into(),
        })?;

        sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES (?, ?)")
            .bind(project.id.to_string())
            .bind(creator.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(project_id = %project.id, creator = %creator, "[PROJECT] Created project '{}'", project.name);
        Ok(project)
    }

    /// Find a project by id.
    pub async fn find_by_id(pool: &DbPool, id: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            "SELECT id, name, file_tree, created_at, updated_at FROM projects WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

        row.map(Project::try_from).transpose()
    }

    /// Find a project by id or fail with [`AppError::NotFound`].
    pub async fn get(pool: &DbPool, id: Uuid) -> Result<Project> {
        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
    }

    /// Add users to a project. Users that are already members are skipped.
    ///
    /// Every id must refer to an existing user, otherwise nothing is added.
    pub async fn add_members(pool: &DbPool, project_id: Uuid, user_ids: &[Uuid]) -> Result<()> {
        Self::get(pool, project_id).await?;
        if let Some(missing) = UserRepository::first_missing(pool, user_ids).await? {
            return Err(AppError::NotFound(format!("User not found: {}", missing)));
        }

        let mut tx = pool.begin().await?;
        for user_id in user_ids {
            sqlx::query("INSERT OR IGNORE INTO project_members (project_id, user_id) VALUES (?, ?)")
                .bind(project_id.to_string())
                .bind(user_id.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        Ok(())
    }

    /// Whether `user_id` is a member of `project_id`.
    pub async fn is_member(pool: &DbPool, project_id: Uuid, user_id: Uuid) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM project_members WHERE project_id = ? AND user_id = ?",
        )
        .bind(project_id.to_string())
        .bind(user_id.to_string())
        .fetch_one(pool)
        .await?;

        Ok(count > 0)
    }

    /// Members of a project, ordered by email.
    pub async fn members(pool: &DbPool, project_id: Uuid) -> Result<Vec<User>> {
        #[derive(FromRow)]
        struct MemberRow {
            id: String,
            email: String,
            created_at: i64,
        }

        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT u.id, u.email, u.created_at
            FROM project_members pm
            JOIN users u ON u.id = pm.user_id
            WHERE pm.project_id = ?
            ORDER BY u.email ASC
            "#,
        )
        .bind(project_id.to_string())
        .fetch_all(pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(User {
                    id: Uuid::parse_str(&row.id)
                        .map_err(|_| AppError::Decoding(format!("Corrupt user id: {}", row.id)))?,
                    email: row.email,
                    created_at: from_millis(row.created_at),
                })
            })
            .collect()
    }

    /// Projects `user_id` is a member of, ordered by name.
    pub async fn list_for_user(pool: &DbPool, user_id: Uuid) -> Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT p.id, p.name, p.file_tree, p.created_at, p.updated_at
            FROM projects p
            JOIN project_members pm ON pm.project_id = p.id
            WHERE pm.user_id = ?
            ORDER BY p.name ASC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(Project::try_from).collect()
    }

    /// Load a project with members and live messages hydrated at `now`.
    ///
    /// Nothing here is written back; hydration is a read-time view.
    pub async fn fetch_hydrated_at(
        pool: &DbPool,
        project_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<HydratedProject> {
        let project = Self::get(pool, project_id).await?;
        let users = Self::members(pool, project_id)
            .await?
            .into_iter()
            .map(|user| UserProfile { id: user.id.to_string(), email: user.email })
            .collect();
        let messages = MessageLedger::list_hydrated_at(pool, project_id, now).await?;

        Ok(HydratedProject {
            id: project.id,
            name: project.name,
            users,
            messages,
            file_tree: project.file_tree,
        })
    }

    /// [`fetch_hydrated_at`](Self::fetch_hydrated_at) with the current time.
    pub async fn fetch_hydrated(pool: &DbPool, project_id: Uuid) -> Result<HydratedProject> {
        Self::fetch_hydrated_at(pool, project_id, now_utc()).await
    }
}
