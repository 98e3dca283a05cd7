//! Timeline event endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::archive;
use crate::auth::CurrentUser;
use crate::clock::{parse_date, parse_local_datetime};
use crate::db::EventQuery;
use crate::errors::AppError;
use crate::models::{
    CreateEventRequest, MoveAttachmentRequest, TimelineEvent, UpdateEventRequest, User,
};
use crate::search::DocKind;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListQuery {
    pub project_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

fn optional_date(
    raw: Option<&str>,
    name: &str,
) -> Result<Option<chrono::NaiveDate>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Invalid {}: {}", name, s))),
    }
}

impl EventListQuery {
    fn to_query(&self) -> Result<EventQuery, AppError> {
        Ok(EventQuery {
            project_id: self.project_id.clone().filter(|p| !p.is_empty()),
            start: optional_date(self.start_date.as_deref(), "startDate")?,
            end: optional_date(self.end_date.as_deref(), "endDate")?,
        })
    }
}

/// Authors, project administrators and system administrators may edit an event.
async fn editable_event(
    state: &AppState,
    user: &User,
    id: &str,
) -> Result<TimelineEvent, AppError> {
    let event = state
        .repo
        .get_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", id)))?;

    if event.author_id == user.id || user.is_admin() {
        return Ok(event);
    }
    match state.repo.get_project(&event.project_id).await? {
        Some(project) if project.can_manage(user) => Ok(event),
        _ => Err(AppError::Forbidden(
            "Only the author or a project administrator may change this event".to_string(),
        )),
    }
}

async fn reindex(state: &AppState, event: &TimelineEvent) {
    let title = state
        .repo
        .get_project(&event.project_id)
        .await
        .ok()
        .flatten()
        .map(|p| p.title);
    if let Err(e) = state.search.index_event(event, title.as_deref()).await {
        tracing::warn!("Failed to index event {}: {}", event.id, e);
    }
}

/// GET /api/events - List events, newest first.
pub async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<EventListQuery>,
) -> ApiResult<Vec<TimelineEvent>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let query = match params.to_query() {
        Ok(q) => q,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.list_events(&query).await {
        Ok(events) => success(events, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/events - Record an event on a project timeline.
pub async fn create_event(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<CreateEventRequest>,
) -> ApiResult<TimelineEvent> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.content.trim().is_empty() && request.attachments.is_empty() {
        return error(
            AppError::Validation("Event content or attachments are required".to_string()),
            revision_id,
        );
    }

    let date = match request.date.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        None => state.clock.now(),
        Some(raw) => match parse_local_datetime(raw, state.clock.offset()) {
            Some(d) => d,
            None => {
                return error(
                    AppError::Validation(format!("Invalid date: {}", raw)),
                    revision_id,
                )
            }
        },
    };

    match state.repo.create_event(&user, &request, date).await {
        Ok(event) => {
            reindex(&state, &event).await;
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(event, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/events/:id - Update an event.
pub async fn update_event(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(request): Json<UpdateEventRequest>,
) -> ApiResult<TimelineEvent> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = editable_event(&state, &user, &id).await {
        return error(e, revision_id);
    }

    match state.repo.update_event(&id, &request).await {
        Ok(event) => {
            reindex(&state, &event).await;
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(event, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/events/:id - Delete an event.
pub async fn delete_event(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = editable_event(&state, &user, &id).await {
        return error(e, revision_id);
    }

    match state.repo.delete_event(&id).await {
        Ok(()) => {
            if let Err(e) = state.search.remove(DocKind::Event, &id).await {
                tracing::warn!("Failed to remove event from index: {}", e);
            }
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/events/:id/attachments/:index/folder - Re-folder one attachment.
pub async fn move_attachment(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path((id, index)): Path<(String, usize)>,
    Json(request): Json<MoveAttachmentRequest>,
) -> ApiResult<TimelineEvent> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let folder = request.folder.trim();
    if folder.is_empty() {
        return error(
            AppError::Validation("Folder name is required".to_string()),
            revision_id,
        );
    }

    let mut event = match editable_event(&state, &user, &id).await {
        Ok(event) => event,
        Err(e) => return error(e, revision_id),
    };

    if !archive::move_attachment(&mut event, index, folder) {
        return error(
            AppError::NotFound(format!("Attachment {} not found on event {}", index, id)),
            revision_id,
        );
    }

    match state
        .repo
        .save_event_attachments(&id, event.attachments, event.version)
        .await
    {
        Ok(event) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(event, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
