//! User directory endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{error, success, ApiResult};
use crate::auth::{hash_password, require_admin, CurrentUser};
use crate::errors::AppError;
use crate::models::{Role, UpdateUserRequest, User};
use crate::AppState;

/// GET /api/users - List all users.
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_users().await {
        Ok(users) => success(users, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/users/:id - Get a single user.
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_user(&id).await {
        Ok(Some(user)) => success(user, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("User {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/users/:id - Update a profile. Users edit themselves; admins edit anyone.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if caller.id != id && !caller.is_admin() {
        return error(
            AppError::Forbidden("You may only edit your own profile".to_string()),
            revision_id,
        );
    }
    if request.role.is_some() {
        if let Err(e) = require_admin(&caller) {
            return error(e, revision_id);
        }
    }
    if let Some(name) = &request.name {
        if name.trim().is_empty() {
            return error(
                AppError::Validation("Name cannot be empty".to_string()),
                revision_id,
            );
        }
    }

    let password_hash = match request.password.as_deref().filter(|p| !p.is_empty()) {
        Some(p) => match hash_password(p) {
            Ok(h) => Some(h),
            Err(e) => return error(e, revision_id),
        },
        None => None,
    };

    let result = state
        .repo
        .update_user(
            &id,
            request.name.as_deref().map(str::trim),
            request.avatar.as_deref(),
            request.skills.as_deref(),
            request.role,
            password_hash.as_deref(),
        )
        .await;

    match result {
        Ok(user) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(user, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/users/:id/promote - Grant the administrator role.
pub async fn promote_user(
    State(state): State<AppState>,
    Extension(CurrentUser(caller)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = require_admin(&caller) {
        return error(e, revision_id);
    }

    match state
        .repo
        .update_user(&id, None, None, None, Some(Role::Admin), None)
        .await
    {
        Ok(user) => {
            tracing::info!(user_id = %user.id, promoted_by = %caller.id, "User promoted");
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(user, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
