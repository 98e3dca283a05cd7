//! Timeline event model matching the frontend TimelineEvent interface.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Attachment;

/// Typed category of a timeline event.
///
/// Older clients sent `WEEKLY_REPORT`, `MONTHLY_REPORT` and
/// `MEETING_MINUTES`; those are accepted and folded into the unified set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    #[default]
    Update,
    Milestone,
    Issue,
    #[serde(alias = "WEEKLY_REPORT", alias = "MONTHLY_REPORT")]
    Report,
    #[serde(alias = "MEETING_MINUTES")]
    Meeting,
    Deliverable,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Update => "UPDATE",
            EventType::Milestone => "MILESTONE",
            EventType::Issue => "ISSUE",
            EventType::Report => "REPORT",
            EventType::Meeting => "MEETING",
            EventType::Deliverable => "DELIVERABLE",
        }
    }

    /// Unknown values fall back to UPDATE.
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "MILESTONE" => EventType::Milestone,
            "ISSUE" => EventType::Issue,
            "REPORT" | "WEEKLY_REPORT" | "MONTHLY_REPORT" => EventType::Report,
            "MEETING" | "MEETING_MINUTES" => EventType::Meeting,
            "DELIVERABLE" => EventType::Deliverable,
            _ => EventType::Update,
        }
    }
}

/// A dated, typed activity record attached to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub project_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// Request body for creating a timeline event. The author is the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub project_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "type")]
    pub event_type: EventType,
    /// Defaults to the current local time
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// Request body for updating a timeline event.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "type")]
    pub event_type: Option<EventType>,
    #[serde(default)]
    pub attachments: Option<Vec<Attachment>>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Request body for re-foldering one attachment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveAttachmentRequest {
    pub folder: String,
}
