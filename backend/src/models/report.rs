//! Weekly report model matching the frontend WeeklyReport interface.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{lenient_date, Attachment};

/// Structured per-project entry of a weekly report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetail {
    pub project_id: String,
    pub project_title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub plan: Option<String>,
}

/// A personal, periodic work summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyReport {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub week_start_date: NaiveDate,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub details: Vec<ReportDetail>,
    #[serde(default)]
    pub linked_project_ids: Vec<String>,
    #[serde(default)]
    pub linked_inspiration_ids: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_at: NaiveDateTime,
}

impl WeeklyReport {
    /// Whether the report mentions the project, by link or by detail entry.
    pub fn concerns_project(&self, project_id: &str) -> bool {
        self.linked_project_ids.iter().any(|p| p == project_id)
            || self.details.iter().any(|d| d.project_id == project_id)
    }
}

/// Request body for submitting a weekly report. The author is the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[serde(deserialize_with = "lenient_date")]
    pub week_start_date: NaiveDate,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub details: Vec<ReportDetail>,
    #[serde(default)]
    pub linked_project_ids: Vec<String>,
    #[serde(default)]
    pub linked_inspiration_ids: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}
