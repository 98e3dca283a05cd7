//! Weekly report endpoints: submission, filtered listing, grouping and export.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::auth::CurrentUser;
use crate::clock::parse_date;
use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::{CreateReportRequest, WeeklyReport};
use crate::reporting::{self, GroupMode, ReportFilter};
use crate::search::DocKind;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportListQuery {
    pub user_id: Option<String>,
    pub project_id: Option<String>,
    pub q: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub group_by: Option<String>,
}

/// A titled group of reports.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGroupView {
    pub key: String,
    pub title: String,
    pub reports: Vec<WeeklyReport>,
}

/// Either the flat filtered list or its groups, depending on `groupBy`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReportListing {
    Reports(Vec<WeeklyReport>),
    Groups(Vec<ReportGroupView>),
}

fn bound(raw: Option<&str>, name: &str) -> Result<Option<chrono::NaiveDate>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Invalid {}: {}", name, s))),
    }
}

impl ReportListQuery {
    fn filter(&self) -> Result<ReportFilter, AppError> {
        Ok(ReportFilter {
            search: self.q.as_deref().unwrap_or("").trim().to_string(),
            start: bound(self.start_date.as_deref(), "startDate")?,
            end: bound(self.end_date.as_deref(), "endDate")?,
        })
    }

    fn group_mode(&self) -> Result<Option<GroupMode>, AppError> {
        match self.group_by.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(raw) => GroupMode::from_str(raw)
                .map(Some)
                .ok_or_else(|| AppError::Validation(format!("Unknown groupBy: {}", raw))),
        }
    }
}

/// Reports matching the query, newest first.
async fn load_filtered(
    state: &AppState,
    params: &ReportListQuery,
) -> Result<Vec<WeeklyReport>, AppError> {
    let filter = params.filter()?;
    let reports = state.repo.list_reports(params.user_id.as_deref()).await?;

    Ok(reporting::filter_reports(&reports, &filter)
        .into_iter()
        .filter(|r| match params.project_id.as_deref() {
            Some(p) if !p.is_empty() => r.concerns_project(p),
            _ => true,
        })
        .cloned()
        .collect())
}

/// GET /api/reports - Filtered report list, optionally grouped.
pub async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<ReportListQuery>,
) -> ApiResult<ReportListing> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let mode = match params.group_mode() {
        Ok(mode) => mode,
        Err(e) => return error(e, revision_id),
    };
    let reports = match load_filtered(&state, &params).await {
        Ok(reports) => reports,
        Err(e) => return error(e, revision_id),
    };

    let Some(mode) = mode else {
        return success(ReportListing::Reports(reports), revision_id);
    };

    let users = match state.repo.list_users().await {
        Ok(users) => users,
        Err(e) => return error(e, revision_id),
    };

    let refs: Vec<&WeeklyReport> = reports.iter().collect();
    let groups = reporting::group_reports(&refs, mode)
        .into_iter()
        .map(|g| ReportGroupView {
            title: reporting::group_title(&g.key, mode, &users),
            key: g.key,
            reports: g.reports.into_iter().cloned().collect(),
        })
        .collect();

    success(ReportListing::Groups(groups), revision_id)
}

/// GET /api/reports/export - Plain-text export of the filtered reports.
pub async fn export_reports(
    State(state): State<AppState>,
    Query(params): Query<ReportListQuery>,
) -> Result<Response, AppErrorWithRevision> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let reports = load_filtered(&state, &params)
        .await
        .map_err(|error| AppErrorWithRevision { error, revision_id })?;
    let refs: Vec<&WeeklyReport> = reports.iter().collect();

    let file_name = format!(
        "attachment; filename=\"weekly_reports_{}.txt\"",
        state.clock.today().format("%Y%m%d")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, file_name),
        ],
        reporting::export_text(&refs),
    )
        .into_response())
}

/// POST /api/reports - Submit a weekly report as the caller.
pub async fn create_report(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<CreateReportRequest>,
) -> ApiResult<WeeklyReport> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let has_content = request
        .content
        .as_deref()
        .is_some_and(|c| !c.trim().is_empty());
    if !has_content && request.details.is_empty() {
        return error(
            AppError::Validation("Report content or project details are required".to_string()),
            revision_id,
        );
    }

    match state.repo.create_report(&user, &request, state.clock.now()).await {
        Ok(report) => {
            if let Err(e) = state.search.index_report(&report).await {
                tracing::warn!("Failed to index report: {}", e);
            }
            tracing::info!(report_id = %report.id, user_id = %user.id, "Weekly report submitted");
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success(report, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/reports/:id - Delete a report. Authors and admins only.
pub async fn delete_report(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_report(&id).await {
        Ok(Some(report)) if report.user_id == user.id || user.is_admin() => {}
        Ok(Some(_)) => {
            return error(
                AppError::Forbidden("Only the author may delete this report".to_string()),
                revision_id,
            )
        }
        Ok(None) => {
            return error(
                AppError::NotFound(format!("Report {} not found", id)),
                revision_id,
            )
        }
        Err(e) => return error(e, revision_id),
    }

    match state.repo.delete_report(&id).await {
        Ok(()) => {
            if let Err(e) = state.search.remove(DocKind::Report, &id).await {
                tracing::warn!("Failed to remove report from index: {}", e);
            }
            let new_revision = state.repo.get_revision_id().await.unwrap_or(revision_id);
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}
