//! Administrator dashboard endpoint.

use axum::{extract::State, Extension};

use super::{error, success, ApiResult};
use crate::auth::{require_admin, CurrentUser};
use crate::dashboard::{self, DashboardStats};
use crate::AppState;

/// GET /api/dashboard - Department-wide statistics. Admin only.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<DashboardStats> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = require_admin(&user) {
        return error(e, revision_id);
    }

    let loaded = tokio::try_join!(
        state.repo.list_projects(),
        state.repo.list_tasks(None),
        state.repo.list_users(),
        state.repo.list_reports(None),
    );

    match loaded {
        Ok((projects, tasks, users, reports)) => success(
            dashboard::compute(&projects, &tasks, &users, &reports, state.clock.now()),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}
