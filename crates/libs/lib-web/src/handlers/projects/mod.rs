//! # Project Handlers
//!
//! HTTP surface of the operations the collaboration core offers to the CRUD
//! layer. Every route sits behind [`require_auth`](crate::middleware::require_auth).
//!
//! - `GET    /api/projects/{project_id}` - project with members and hydrated live messages
//! - `POST   /api/projects/{project_id}/messages` - append a message as the caller
//! - `PUT    /api/projects/{project_id}/file-tree` - replace the whole file tree
//! - `DELETE /api/projects/{project_id}/files/{*path}` - remove one tree entry
//!
//! A malformed project id is `400`, an unknown project `404`. The file-tree
//! route has no body size limit and decodes trees of any depth.

#[cfg(test)]
mod tests;

use axum::body::Bytes;
use axum::extract::{Extension, FromRequest, Path, Request, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use lib_auth::Identity;
use lib_core::dto::{decode_unbounded, FileTree, HydratedProject};
use lib_core::model::store::{FileTreeStore, MessageLedger, MessageRecord, ProjectRepository, SenderRef};
use lib_core::{AppError, Config, DbPool, Result};
use lib_utils::validate_identifier;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct AppendMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileTreeBody {
    pub file_tree: FileTree,
}

/// `Json<FileTreeBody>` without serde_json's nesting limit.
pub struct FileTreeJson(pub FileTreeBody);

impl<S: Send + Sync> FromRequest<S> for FileTreeJson {
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        decode_unbounded(&bytes).map(FileTreeJson).map_err(|e| {
            AppError::InvalidInput(format!("Invalid file tree body: {}", e)).into_response()
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub message: String,
}

fn parse_project_id(raw: &str) -> Result<Uuid> {
    validate_identifier(raw, "project id").map_err(AppError::InvalidInput)
}

/// Resolve the project and, when membership is enforced, check the caller.
async fn authorize(db: &DbPool, config: &Config, raw_id: &str, identity: &Identity) -> Result<Uuid> {
    let project_id = parse_project_id(raw_id)?;
    ProjectRepository::get(db, project_id).await?;

    if config.require_membership && !ProjectRepository::is_member(db, project_id, identity.user_id).await? {
        return Err(AppError::Forbidden("Not a member of this project".to_string()));
    }
    Ok(project_id)
}

pub async fn get_project(
    State(db): State<DbPool>,
    State(config): State<Config>,
    Extension(identity): Extension<Identity>,
    Path(project_id): Path<String>,
) -> Result<Json<HydratedProject>> {
    let project_id = authorize(&db, &config, &project_id, &identity).await?;
    let project = ProjectRepository::fetch_hydrated(&db, project_id).await?;
    Ok(Json(project))
}

pub async fn append_message(
    State(db): State<DbPool>,
    State(config): State<Config>,
    Extension(identity): Extension<Identity>,
    Path(project_id): Path<String>,
    Json(req): Json<AppendMessageRequest>,
) -> Result<Json<MessageRecord>> {
    let project_id = authorize(&db, &config, &project_id, &identity).await?;
    let record = MessageLedger::append(&db, project_id, SenderRef::User(identity.user_id), &req.message).await?;
    Ok(Json(record))
}

pub async fn save_file_tree(
    State(db): State<DbPool>,
    State(config): State<Config>,
    Extension(identity): Extension<Identity>,
    Path(project_id): Path<String>,
    FileTreeJson(body): FileTreeJson,
) -> Result<Json<FileTreeBody>> {
    let project_id = authorize(&db, &config, &project_id, &identity).await?;
    FileTreeStore::save(&db, project_id, &body.file_tree).await?;
    Ok(Json(body))
}

pub async fn delete_file(
    State(db): State<DbPool>,
    State(config): State<Config>,
    Extension(identity): Extension<Identity>,
    Path((project_id, path)): Path<(String, String)>,
) -> Result<Json<StatusResponse>> {
    let project_id = authorize(&db, &config, &project_id, &identity).await?;
    FileTreeStore::delete_path(&db, project_id, &path).await?;

    info!(project_id = %project_id, user_id = %identity.user_id, path = %path, "[FILES] File deleted by user");
    Ok(Json(StatusResponse {
        message: "File deleted successfully".to_string(),
    }))
}
