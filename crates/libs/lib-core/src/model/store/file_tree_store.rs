//! # File Tree Store
//!
//! Authoritative storage for a project's file tree.
//!
//! - `save` replaces the whole tree with one `UPDATE`. There is no version
//!   check: concurrent saves race and the last one to commit wins.
//! - `delete_path` reads, edits, and writes the tree inside one transaction so
//!   a failed lookup leaves the stored tree untouched.

use super::project_repository::ProjectRepository;
use super::DbPool;
use crate::dto::{FileNode, FileTree};
use crate::error::{AppError, Result};
use lib_utils::{now_utc, to_millis};
use tracing::{debug, info};
use uuid::Uuid;

/// File tree persistence operations.
pub struct FileTreeStore;

impl FileTreeStore {
    /// Replace the stored tree of `project_id` with `tree`.
    pub async fn save(pool: &DbPool, project_id: Uuid, tree: &FileTree) -> Result<()> {
        let encoded = serde_json::to_string(tree)?;

        let result = sqlx::query("UPDATE projects SET file_tree = ?, updated_at = ? WHERE id = ?")
            .bind(&encoded)
            .bind(to_millis(now_utc()))
            .bind(project_id.to_string())
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Project not found".to_string()));
        }

        info!(
            project_id = %project_id,
            entries = tree.len(),
            bytes = encoded.len(),
            "[FILES] Saved file tree"
        );
        Ok(())
    }

    /// Load the stored tree of `project_id`.
    pub async fn load(pool: &DbPool, project_id: Uuid) -> Result<FileTree> {
        Ok(ProjectRepository::get(pool, project_id).await?.file_tree)
    }

    /// Remove the entry at `path` (`/`-separated) and return it.
    ///
    /// # Errors
    ///
    /// - [`AppError::NotFound`] if the project or any path segment is missing
    /// - [`AppError::InvalidInput`] if `path` has no segments
    pub async fn delete_path(pool: &DbPool, project_id: Uuid, path: &str) -> Result<FileNode> {
        let mut tx = pool.begin().await?;

        let raw: Option<String> = sqlx::query_scalar("SELECT file_tree FROM projects WHERE id = ?")
            .bind(project_id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        let raw = raw.ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

        let mut tree = FileTree::from_json(raw.as_bytes())?;
        let removed = tree.remove_path(path).inspect_err(|_| {
            debug!(project_id = %project_id, path = %path, "[FILES] Delete target not found");
        })?;

        sqlx::query("UPDATE projects SET file_tree = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(&tree)?)
            .bind(to_millis(now_utc()))
            .bind(project_id.to_string())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(project_id = %project_id, path = %path, "[FILES] Deleted file tree entry");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_test_pool;
    use crate::model::store::UserRepository;
    use std::sync::{Arc, Mutex};

    async fn seeded() -> (DbPool, Uuid) {
        let pool = create_test_pool().await.unwrap();
        let ada = UserRepository::create(&pool, "ada@example.com").await.unwrap();
        let project = ProjectRepository::create(&pool, "demo", ada.id).await.unwrap();
        (pool, project.id)
    }

    fn tree(contents: &str) -> FileTree {
        FileTree::new()
            .with("app.js", FileNode::file(contents))
            .with(
                "public",
                FileNode::Directory(FileTree::new().with("index.html", FileNode::file("<html></html>"))),
            )
    }

    #[tokio::test]
    async fn test_save_then_fetch_returns_same_tree() {
        let (pool, project_id) = seeded().await;

        FileTreeStore::save(&pool, project_id, &tree("v1")).await.unwrap();

        let hydrated = ProjectRepository::fetch_hydrated(&pool, project_id).await.unwrap();
        assert_eq!(hydrated.file_tree, tree("v1"));
    }

    #[tokio::test]
    async fn test_save_replaces_instead_of_merging() {
        let (pool, project_id) = seeded().await;
        FileTreeStore::save(&pool, project_id, &tree("v1")).await.unwrap();

        let replacement = FileTree::new().with("main.py", FileNode::file("print(1)"));
        FileTreeStore::save(&pool, project_id, &replacement).await.unwrap();

        assert_eq!(FileTreeStore::load(&pool, project_id).await.unwrap(), replacement);
    }

    #[tokio::test]
    async fn test_sequential_saves_last_commit_wins() {
        let (pool, project_id) = seeded().await;
        let first = tree("T1");
        let second = tree("T2");

        let (p1, t1) = (pool.clone(), first.clone());
        let h1 = tokio::spawn(async move { FileTreeStore::save(&p1, project_id, &t1).await });
        h1.await.unwrap().unwrap();
        let (p2, t2) = (pool.clone(), second.clone());
        let h2 = tokio::spawn(async move { FileTreeStore::save(&p2, project_id, &t2).await });
        h2.await.unwrap().unwrap();

        assert_eq!(FileTreeStore::load(&pool, project_id).await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_racing_saves_keep_one_whole_tree() {
        let (pool, project_id) = seeded().await;
        let committed = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = ["T1", "T2"]
            .into_iter()
            .map(|label| {
                let (pool, committed) = (pool.clone(), Arc::clone(&committed));
                tokio::spawn(async move {
                    FileTreeStore::save(&pool, project_id, &tree(label)).await.unwrap();
                    committed.lock().unwrap().push(label);
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let last = *committed.lock().unwrap().last().unwrap();
        assert_eq!(committed.lock().unwrap().len(), 2);
        assert_eq!(FileTreeStore::load(&pool, project_id).await.unwrap(), tree(last));
    }

    #[tokio::test]
    async fn test_deep_tree_survives_save_and_load() {
        let (pool, project_id) = seeded().await;
        let mut deep = FileTree::new().with("leaf.js", FileNode::file("1"));
        for depth in 0..120 {
            deep = FileTree::new().with(format!("d{}", depth), FileNode::Directory(deep));
        }

        FileTreeStore::save(&pool, project_id, &deep).await.unwrap();

        assert_eq!(FileTreeStore::load(&pool, project_id).await.unwrap(), deep);
    }

    #[tokio::test]
    async fn test_save_unknown_project_is_not_found() {
        let (pool, _) = seeded().await;
        let err = FileTreeStore::save(&pool, Uuid::new_v4(), &tree("x")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_nested_file() {
        let (pool, project_id) = seeded().await;
        FileTreeStore::save(&pool, project_id, &tree("v1")).await.unwrap();

        FileTreeStore::delete_path(&pool, project_id, "public/index.html").await.unwrap();

        let stored = FileTreeStore::load(&pool, project_id).await.unwrap();
        assert!(stored.lookup("public/index.html").is_none());
        assert!(stored.lookup("public").is_some(), "empty parent must not be pruned");
        assert!(stored.lookup("app.js").is_some());
    }

    #[tokio::test]
    async fn test_delete_missing_path_leaves_tree_unchanged() {
        let (pool, project_id) = seeded().await;
        FileTreeStore::save(&pool, project_id, &tree("v1")).await.unwrap();

        for _ in 0..2 {
            let err = FileTreeStore::delete_path(&pool, project_id, "src/missing.js").await.unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        }

        assert_eq!(FileTreeStore::load(&pool, project_id).await.unwrap(), tree("v1"));
    }
}
