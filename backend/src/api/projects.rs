//! Project API endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::{error, managed_project, success, ApiResult};
use crate::archive;
use crate::auth::CurrentUser;
use crate::db::EventQuery;
use crate::errors::AppError;
use crate::listing::{self, ProjectFilter, ProjectTab};
use crate::models::{CreateProjectRequest, Project, UpdateProjectRequest};
use crate::search::DocKind;
use crate::AppState;

/// Query parameters for listing projects.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListQuery {
    /// `pre`, `formal` or `archived`.
    pub tab: Option<String>,
    pub q: Option<String>,
    pub business_scenario: Option<String>,
}

impl ProjectListQuery {
    fn filter(&self) -> Result<ProjectFilter, AppError> {
        let tab = match self.tab.as_deref().filter(|t| !t.is_empty()) {
            Some(raw) => Some(ProjectTab::from_str(raw).ok_or_else(|| {
                AppError::BadRequest(format!("Unknown project tab: {}", raw))
            })?),
            None => None,
        };
        Ok(ProjectFilter {
            tab,
            search: self.q.clone().unwrap_or_default(),
            business_scenario: self.business_scenario.clone().filter(|s| !s.is_empty()),
        })
    }
}

/// GET /api/projects - List projects, optionally by tab, text or scenario.
pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectListQuery>,
) -> ApiResult<Vec<Project>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.list_projects().await {
        Ok(projects) => success(listing::filter_projects(projects, &filter), revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/projects/:id - Get a single project.
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Project> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_project(&id).await {
        Ok(Some(project)) => success(project, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Project {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/projects - Create a project managed by the caller unless stated.
pub async fn create_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<CreateProjectRequest>,
) -> ApiResult<Project> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if request.title.trim().is_empty() {
        return error(
            AppError::Validation("Project title is required".to_string()),
            revision_id,
        );
    }

    match state.repo.create_project(&request, &user.id).await {
        Ok(project) => {
            tracing::info!(project_id = %project.id, "Project created");
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(project, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// PUT /api/projects/:id - Update a project.
pub async fn update_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(request): Json<UpdateProjectRequest>,
) -> ApiResult<Project> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = managed_project(&state, &user, &id).await {
        return error(e, revision_id);
    }

    match state.repo.update_project(&id, &request).await {
        Ok(project) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(project, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/projects/:id - Delete a project with its tasks and events.
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = managed_project(&state, &user, &id).await {
        return error(e, revision_id);
    }

    let query = EventQuery {
        project_id: Some(id.clone()),
        ..Default::default()
    };
    let events = match state.repo.list_events(&query).await {
        Ok(events) => events,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.delete_project(&id).await {
        Ok(()) => {
            for event in &events {
                if let Err(e) = state.search.remove(DocKind::Event, &event.id).await {
                    tracing::warn!("Failed to remove event {} from index: {}", event.id, e);
                }
            }

            tracing::info!(project_id = %id, events = events.len(), "Project deleted");
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/projects/:id/folders - Attachment folders used by a project.
pub async fn project_folders(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<String>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_project(&id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Project {} not found", id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    }

    let query = EventQuery {
        project_id: Some(id),
        ..Default::default()
    };
    match state.repo.list_events(&query).await {
        Ok(events) => success(archive::project_folders(&events), revision_id),
        Err(e) => error(e, revision_id),
    }
}
