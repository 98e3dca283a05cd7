//! Login, registration and session endpoints.

use axum::{extract::State, Extension, Json};
use chrono::Utc;

use super::{error, success, ApiResult};
use crate::auth::{hash_password, verify_password, CurrentUser};
use crate::errors::AppError;
use crate::models::{LoginRequest, RegisterRequest, Role, TokenResponse, User};
use crate::AppState;

fn token_response(state: &AppState, user: User) -> Result<TokenResponse, AppError> {
    let access_token = state.tokens.issue(&user.id, Utc::now().timestamp())?;
    Ok(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        user,
    })
}

/// POST /api/auth/login - Exchange job number and password for a token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<TokenResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let credentials = match state.repo.find_credentials(request.job_number.trim()).await {
        Ok(c) => c,
        Err(e) => return error(e, revision_id),
    };

    match credentials {
        Some((user, hash)) if verify_password(&request.password, &hash) => {
            tracing::info!(user_id = %user.id, "User logged in");
            match token_response(&state, user) {
                Ok(body) => success(body, revision_id),
                Err(e) => error(e, revision_id),
            }
        }
        _ => error(
            AppError::Unauthorized("Incorrect job number or password".to_string()),
            revision_id,
        ),
    }
}

/// POST /api/auth/register - Create an employee account and sign in.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<TokenResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let name = request.name.trim();
    let job_number = request.job_number.trim();
    if name.is_empty() || job_number.is_empty() {
        return error(
            AppError::Validation("Name and job number are required".to_string()),
            revision_id,
        );
    }
    if request.password.len() < 4 {
        return error(
            AppError::Validation("Password must be at least 4 characters".to_string()),
            revision_id,
        );
    }

    let hash = match hash_password(&request.password) {
        Ok(h) => h,
        Err(e) => return error(e, revision_id),
    };

    let created = state
        .repo
        .create_user(job_number, name, &hash, Role::Employee, &[], state.clock.now())
        .await;

    match created.and_then(|user| token_response(&state, user)) {
        Ok(body) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(body, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/auth/me - The authenticated user.
pub async fn me(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    success(user, revision_id)
}
