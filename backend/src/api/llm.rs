//! AI report generation endpoints.
//!
//! Context is loaded server-side from the ids and date range in the request.
//! Generation never fails at the HTTP level once the context is loaded: an
//! unreachable or unconfigured model yields an "unavailable" text instead.

use axum::{extract::State, Extension, Json};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{error, success, ApiResult};
use crate::ai::ProjectActivity;
use crate::auth::CurrentUser;
use crate::clock::parse_date;
use crate::db::EventQuery;
use crate::errors::AppError;
use crate::models::{Project, User};
use crate::reporting::ReportFilter;
use crate::AppState;

/// Generation parameters shared by every report kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Only read by `/generate-report`
    #[serde(default, alias = "report_type")]
    pub report_type: Option<String>,
    #[serde(default, alias = "project_id")]
    pub project_id: Option<String>,
    #[serde(default, alias = "start_date")]
    pub start_date: Option<String>,
    #[serde(default, alias = "end_date")]
    pub end_date: Option<String>,
}

/// Generated prose.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedText {
    pub content: String,
}

/// Generated structured suggestions.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedData {
    pub data: Value,
}

/// Resolved inclusive date range.
struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    fn label(&self) -> (String, String) {
        (
            self.start.format("%Y-%m-%d").to_string(),
            self.end.format("%Y-%m-%d").to_string(),
        )
    }

    fn events_of(&self, project_id: Option<&str>) -> EventQuery {
        EventQuery {
            project_id: project_id.map(str::to_string),
            start: Some(self.start),
            end: Some(self.end),
        }
    }
}

fn parse_bound(raw: Option<&str>, name: &str) -> Result<Option<NaiveDate>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("Invalid {}: {}", name, s))),
    }
}

/// `end` defaults to today; `start` to the first of the month when `monthly`,
/// otherwise to six days before `end`.
fn resolve_period(
    request: &GenerateRequest,
    today: NaiveDate,
    monthly: bool,
) -> Result<Period, AppError> {
    let end = parse_bound(request.end_date.as_deref(), "endDate")?.unwrap_or(today);
    let start = match parse_bound(request.start_date.as_deref(), "startDate")? {
        Some(start) => start,
        None if monthly => end.with_day(1).unwrap_or(end),
        None => end.checked_sub_days(Days::new(6)).unwrap_or(end),
    };
    if start > end {
        return Err(AppError::Validation(
            "startDate must not be after endDate".to_string(),
        ));
    }
    Ok(Period { start, end })
}

async fn required_project(state: &AppState, request: &GenerateRequest) -> Result<Project, AppError> {
    let id = request
        .project_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("projectId is required".to_string()))?;
    state
        .repo
        .get_project(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))
}

async fn dept_monthly_text(state: &AppState, request: &GenerateRequest) -> Result<String, AppError> {
    let period = resolve_period(request, state.clock.today(), true)?;
    let projects = state.repo.list_projects().await?;
    let events = state.repo.list_events(&period.events_of(None)).await?;
    let (start, end) = period.label();

    tracing::info!(events = events.len(), "Generating department monthly report");
    Ok(state
        .ai
        .dept_monthly_report(&projects, &events, &start, &end)
        .await)
}

async fn project_weekly_text(
    state: &AppState,
    request: &GenerateRequest,
) -> Result<String, AppError> {
    let project = required_project(state, request).await?;
    let period = resolve_period(request, state.clock.today(), false)?;

    let filter = ReportFilter {
        start: Some(period.start),
        end: Some(period.end),
        ..Default::default()
    };
    let reports: Vec<_> = state
        .repo
        .list_reports(None)
        .await?
        .into_iter()
        .filter(|r| filter.matches(r))
        .collect();
    let (start, end) = period.label();

    Ok(state
        .ai
        .project_weekly_report(&project, &reports, &format!("{} ~ {}", start, end))
        .await)
}

async fn project_text(state: &AppState, request: &GenerateRequest) -> Result<String, AppError> {
    let project = required_project(state, request).await?;
    let period = resolve_period(request, state.clock.today(), false)?;
    let events = state
        .repo
        .list_events(&period.events_of(Some(&project.id)))
        .await?;
    let tasks = state.repo.list_tasks(Some(&project.id)).await?;
    let (start, end) = period.label();

    Ok(state
        .ai
        .project_report(&project, &events, &tasks, &start, &end)
        .await)
}

async fn personal_data(
    state: &AppState,
    user: &User,
    request: &GenerateRequest,
) -> Result<Value, AppError> {
    let period = resolve_period(request, state.clock.today(), false)?;
    let events_query = period.events_of(None);
    let (projects, tasks, events, inspirations) = tokio::try_join!(
        state.repo.list_projects(),
        state.repo.list_tasks(None),
        state.repo.list_events(&events_query),
        state.repo.list_inspirations(),
    )?;

    let activity: Vec<ProjectActivity<'_>> = projects
        .iter()
        .filter(|p| {
            p.is_project_admin(&user.id)
                || p.is_member(&user.id)
                || tasks
                    .iter()
                    .any(|t| t.project_id == p.id && t.is_assigned_to(&user.id))
        })
        .map(|project| ProjectActivity {
            project,
            events: events
                .iter()
                .filter(|e| e.project_id == project.id && e.author_id == user.id)
                .collect(),
            tasks: tasks
                .iter()
                .filter(|t| t.project_id == project.id && t.is_assigned_to(&user.id))
                .collect(),
        })
        .collect();

    let own_inspirations: Vec<_> = inspirations
        .into_iter()
        .filter(|i| i.author_id == user.id)
        .filter(|i| (period.start..=period.end).contains(&i.created_at.date()))
        .collect();

    Ok(state
        .ai
        .personal_report(&user.username, &activity, &own_inspirations)
        .await)
}

fn text_response(result: Result<String, AppError>, revision_id: i64) -> ApiResult<GeneratedText> {
    match result {
        Ok(content) => success(GeneratedText { content }, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/llm/dept-monthly-report
pub async fn dept_monthly_report(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<GeneratedText> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    text_response(dept_monthly_text(&state, &request).await, revision_id)
}

/// POST /api/llm/project-weekly-report
pub async fn project_weekly_report(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<GeneratedText> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    text_response(project_weekly_text(&state, &request).await, revision_id)
}

/// POST /api/llm/project-report
pub async fn project_report(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<GeneratedText> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    text_response(project_text(&state, &request).await, revision_id)
}

/// POST /api/llm/personal-report - Suggestions for the caller's weekly report.
pub async fn personal_report(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<GeneratedData> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match personal_data(&state, &user, &request).await {
        Ok(data) => success(GeneratedData { data }, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/llm/generate-report - Dispatch on `reportType`.
pub async fn generate_report(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Value> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let report_type = request.report_type.clone().unwrap_or_default();
    let result = match report_type.as_str() {
        "project" => project_text(&state, &request).await.map(Value::String),
        "dept_monthly" => dept_monthly_text(&state, &request).await.map(Value::String),
        "project_weekly" => project_weekly_text(&state, &request).await.map(Value::String),
        "personal" => personal_data(&state, &user, &request).await,
        other => Err(AppError::BadRequest(format!(
            "Unsupported report type: {}. Supported types: project, dept_monthly, project_weekly, personal",
            other
        ))),
    };

    match result {
        Ok(Value::String(content)) => success(
            serde_json::json!({ "content": content, "type": report_type }),
            revision_id,
        ),
        Ok(data) => success(
            serde_json::json!({ "data": data, "type": report_type }),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_period_defaults() {
        let today = date("2024-06-20");
        let request = GenerateRequest::default();

        let weekly = resolve_period(&request, today, false).unwrap();
        assert_eq!(weekly.start, date("2024-06-14"));
        assert_eq!(weekly.end, today);

        let monthly = resolve_period(&request, today, true).unwrap();
        assert_eq!(monthly.start, date("2024-06-01"));
    }

    #[test]
    fn test_period_rejects_inverted_range() {
        let request = GenerateRequest {
            start_date: Some("2024-06-10".into()),
            end_date: Some("2024-06-01".into()),
            ..Default::default()
        };
        assert!(resolve_period(&request, date("2024-06-20"), false).is_err());
    }

    #[test]
    fn test_snake_case_fields_accepted() {
        let request: GenerateRequest = serde_json::from_value(serde_json::json!({
            "report_type": "project",
            "project_id": "p1",
            "start_date": "2024-06-01"
        }))
        .unwrap();
        assert_eq!(request.report_type.as_deref(), Some("project"));
        assert_eq!(request.project_id.as_deref(), Some("p1"));
    }
}
