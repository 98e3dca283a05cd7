//! Task assignment model matching the frontend TaskAssignment interface.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{lenient_date, lenient_date_opt};

/// Task status, a pure function of progress.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Board column order.
    pub const COLUMNS: [TaskStatus; 3] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
    ];

    pub fn from_progress(progress: i64) -> Self {
        if progress <= 0 {
            TaskStatus::Pending
        } else if progress >= 100 {
            TaskStatus::Completed
        } else {
            TaskStatus::InProgress
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Completed => "COMPLETED",
        }
    }
}

/// Timestamped feedback left on a task. Remarks are append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRemark {
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub date: NaiveDateTime,
}

/// A unit of work within a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignment {
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_ids: Vec<String>,
    pub deadline: NaiveDate,
    pub progress: i64,
    pub status: TaskStatus,
    #[serde(default)]
    pub remarks: Vec<TaskRemark>,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl TaskAssignment {
    pub fn is_assigned_to(&self, user_id: &str) -> bool {
        self.assignee_ids.iter().any(|a| a == user_id)
    }
}

/// Reject progress values outside 0..=100.
pub fn validate_progress(progress: i64) -> Result<i64, String> {
    if (0..=100).contains(&progress) {
        Ok(progress)
    } else {
        Err(format!("Progress must be between 0 and 100, got {}", progress))
    }
}

/// Request body for creating a new task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_ids: Vec<String>,
    #[serde(deserialize_with = "lenient_date")]
    pub deadline: NaiveDate,
    #[serde(default)]
    pub progress: i64,
}

/// Request body for updating an existing task.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_ids: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_date_opt")]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub progress: Option<i64>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Request body for reporting progress, optionally with a remark.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdateRequest {
    pub progress: i64,
    #[serde(default)]
    pub remark: Option<String>,
}
