//! REST API module.
//!
//! Contains all API routes and handlers following the frontend contract.

mod auth;
mod dashboard;
mod datastore;
mod events;
mod files;
mod inspirations;
mod llm;
mod projects;
mod reports;
mod search;
mod tasks;
mod users;

pub use auth::*;
pub use dashboard::*;
pub use datastore::*;
pub use events::*;
pub use files::*;
pub use inspirations::*;
pub use llm::*;
pub use projects::*;
pub use reports::*;
pub use search::*;
pub use tasks::*;
pub use users::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{Project, User};
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: crate::errors::AppError, revision_id: i64) -> ApiResult<T> {
    Err(crate::errors::AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Load a project the caller may manage.
async fn managed_project(state: &AppState, user: &User, id: &str) -> Result<Project, AppError> {
    let project = state
        .repo
        .get_project(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))?;

    if !project.can_manage(user) {
        return Err(AppError::Forbidden(
            "Only project administrators may change this project".to_string(),
        ));
    }
    Ok(project)
}
