//! Task assignment and board endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::{error, managed_project, success, ApiResult};
use crate::auth::CurrentUser;
use crate::board::{self, Board};
use crate::errors::AppError;
use crate::models::{
    CreateTaskRequest, ProgressUpdateRequest, TaskAssignment, TaskRemark, UpdateTaskRequest,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardQuery {
    /// Defaults to the caller
    pub user_id: Option<String>,
}

/// GET /api/tasks - List tasks, optionally for one project.
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<TaskListQuery>,
) -> ApiResult<Vec<TaskAssignment>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_tasks(params.project_id.as_deref()).await {
        Ok(tasks) => success(tasks, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/tasks/board - Kanban columns of a user's tasks.
pub async fn task_board(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(params): Query<BoardQuery>,
) -> ApiResult<Board> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let user_id = params.user_id.unwrap_or(user.id);

    let (tasks, projects) = match tokio::try_join!(
        state.repo.list_tasks(None),
        state.repo.list_projects()
    ) {
        Ok(loaded) => loaded,
        Err(e) => return error(e, revision_id),
    };

    success(
        board::build_board(&user_id, &tasks, &projects, state.clock.today()),
        revision_id,
    )
}

/// GET /api/tasks/:id - Get a single task.
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TaskAssignment> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_task(&id).await {
        Ok(Some(task)) => success(task, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Task {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/tasks - Assign a new task within a project.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<CreateTaskRequest>,
) -> ApiResult<TaskAssignment> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = managed_project(&state, &user, &request.project_id).await {
        return error(e, revision_id);
    }

    match state.repo.create_task(&request).await {
        Ok(task) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(task, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// Load a task together with a permission check on its project.
async fn managed_task(
    state: &AppState,
    user: &crate::models::User,
    id: &str,
) -> Result<TaskAssignment, AppError> {
    let task = state
        .repo
        .get_task(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))?;
    managed_project(state, user, &task.project_id).await?;
    Ok(task)
}

/// PUT /api/tasks/:id - Update a task.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTaskRequest>,
) -> ApiResult<TaskAssignment> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = managed_task(&state, &user, &id).await {
        return error(e, revision_id);
    }

    match state.repo.update_task(&id, &request).await {
        Ok(task) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(task, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/tasks/:id - Delete a task.
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = managed_task(&state, &user, &id).await {
        return error(e, revision_id);
    }

    match state.repo.delete_task(&id).await {
        Ok(()) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/tasks/:id/progress - Report progress, optionally with a remark.
///
/// Assignees and project administrators may report progress.
pub async fn update_progress(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(request): Json<ProgressUpdateRequest>,
) -> ApiResult<TaskAssignment> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let task = match state.repo.get_task(&id).await {
        Ok(Some(task)) => task,
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Task {} not found", id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    };

    if !task.is_assigned_to(&user.id) {
        if let Err(e) = managed_project(&state, &user, &task.project_id).await {
            return error(e, revision_id);
        }
    }

    let remark = request
        .remark
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|content| TaskRemark {
            author_id: user.id.clone(),
            author_name: user.username.clone(),
            content: content.to_string(),
            date: state.clock.now(),
        });

    match state.repo.record_progress(&id, request.progress, remark).await {
        Ok(task) => {
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(task, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
