//! Inspiration board endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::listing::{self, InspirationFilter};
use crate::models::{CreateInspirationRequest, Inspiration, UpdateInspirationRequest, User};
use crate::AppState;

async fn own_inspiration(state: &AppState, user: &User, id: &str) -> Result<(), AppError> {
    let inspiration = state
        .repo
        .get_inspiration(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Inspiration {} not found", id)))?;

    if inspiration.author_id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only the author may change this inspiration".to_string(),
        ));
    }
    Ok(())
}

/// Query parameters for the inspiration board.
#[derive(Debug, Default, Deserialize)]
pub struct InspirationListQuery {
    pub q: Option<String>,
    pub tag: Option<String>,
}

/// GET /api/inspirations - List inspirations, newest first.
pub async fn list_inspirations(
    State(state): State<AppState>,
    Query(query): Query<InspirationListQuery>,
) -> ApiResult<Vec<Inspiration>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let filter = InspirationFilter {
        search: query.q.unwrap_or_default(),
        tag: query.tag.filter(|t| !t.is_empty()),
    };

    match state.repo.list_inspirations().await {
        Ok(items) => success(listing::filter_inspirations(items, &filter), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/inspirations/tags - Sorted set of tags in use.
pub async fn inspiration_tags(State(state): State<AppState>) -> ApiResult<Vec<String>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_inspirations().await {
        Ok(items) => success(listing::all_tags(&items), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/inspirations - Pin a new inspiration.
pub async fn create_inspiration(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<CreateInspirationRequest>,
) -> ApiResult<Inspiration> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state
        .repo
        .create_inspiration(&user, &request, state.clock.now())
        .await
    {
        Ok(item) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(item, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/inspirations/:id - Update an inspiration.
pub async fn update_inspiration(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(request): Json<UpdateInspirationRequest>,
) -> ApiResult<Inspiration> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = own_inspiration(&state, &user, &id).await {
        return error(e, revision_id);
    }

    match state.repo.update_inspiration(&id, &request).await {
        Ok(item) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(item, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/inspirations/:id - Delete an inspiration.
pub async fn delete_inspiration(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = own_inspiration(&state, &user, &id).await {
        return error(e, revision_id);
    }

    match state.repo.delete_inspiration(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
