//! Project model matching the frontend Project interface.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{lenient_date, lenient_date_opt, User};

/// Project priority; drives task board ordering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectPriority {
    #[default]
    Normal,
    High,
    Urgent,
}

impl ProjectPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectPriority::Normal => "NORMAL",
            ProjectPriority::High => "HIGH",
            ProjectPriority::Urgent => "URGENT",
        }
    }

    /// Unknown values fall back to NORMAL.
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "URGENT" => ProjectPriority::Urgent,
            "HIGH" => ProjectPriority::High,
            _ => ProjectPriority::Normal,
        }
    }

    /// Sort weight, higher is more pressing.
    pub fn weight(&self) -> u8 {
        match self {
            ProjectPriority::Urgent => 3,
            ProjectPriority::High => 2,
            ProjectPriority::Normal => 1,
        }
    }
}

/// Project lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    #[default]
    Initiation,
    Execution,
    Acceptance,
    Closed,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 4] = [
        ProjectStatus::Initiation,
        ProjectStatus::Execution,
        ProjectStatus::Acceptance,
        ProjectStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Initiation => "INITIATION",
            ProjectStatus::Execution => "EXECUTION",
            ProjectStatus::Acceptance => "ACCEPTANCE",
            ProjectStatus::Closed => "CLOSED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "INITIATION" => Some(ProjectStatus::Initiation),
            "EXECUTION" => Some(ProjectStatus::Execution),
            "ACCEPTANCE" => Some(ProjectStatus::Acceptance),
            "CLOSED" => Some(ProjectStatus::Closed),
            _ => None,
        }
    }

    /// Counted as "in flight" on the dashboard.
    pub fn is_active(&self) -> bool {
        matches!(self, ProjectStatus::Execution | ProjectStatus::Acceptance)
    }
}

/// A tracked unit of work with lifecycle status and a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    pub priority: ProjectPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_scenario: Option<String>,
    pub status: ProjectStatus,
    pub start_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub manager_id: String,
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

impl Project {
    /// The manager is always an implicit project admin.
    pub fn is_project_admin(&self, user_id: &str) -> bool {
        self.manager_id == user_id || self.admins.iter().any(|a| a == user_id)
    }

    /// Whether `user` may edit the project and its tasks.
    pub fn can_manage(&self, user: &User) -> bool {
        user.is_admin() || self.is_project_admin(&user.id)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }
}

/// Request body for creating a new project.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub project_number: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub priority: ProjectPriority,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub business_scenario: Option<String>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(deserialize_with = "lenient_date")]
    pub start_date: NaiveDate,
    #[serde(default, deserialize_with = "lenient_date_opt")]
    pub end_date: Option<NaiveDate>,
    /// Defaults to the creating user
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub budget: Option<String>,
}

/// Request body for updating an existing project.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub project_number: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub priority: Option<ProjectPriority>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub business_scenario: Option<String>,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "lenient_date_opt")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_date_opt")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub admins: Option<Vec<String>>,
    #[serde(default)]
    pub members: Option<Vec<String>>,
    #[serde(default)]
    pub budget: Option<String>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn project() -> Project {
        Project {
            id: "p1".into(),
            title: "Q3 Launch".into(),
            project_number: None,
            customer_name: None,
            priority: ProjectPriority::High,
            description: None,
            business_scenario: None,
            status: ProjectStatus::Execution,
            start_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            end_date: None,
            manager_id: "mgr".into(),
            admins: vec!["deputy".into()],
            members: vec!["dev".into()],
            budget: None,
            version: 1,
        }
    }

    fn user(id: &str, role: Role) -> User {
        User {
            id: id.into(),
            job_number: id.into(),
            name: id.into(),
            username: id.into(),
            role,
            avatar: None,
            skills: vec![],
        }
    }

    #[test]
    fn test_manager_is_implicit_admin() {
        let p = project();
        assert!(p.is_project_admin("mgr"));
        assert!(p.is_project_admin("deputy"));
        assert!(!p.is_project_admin("dev"));
    }

    #[test]
    fn test_global_admin_can_manage() {
        let p = project();
        assert!(p.can_manage(&user("boss", Role::Admin)));
        assert!(!p.can_manage(&user("dev", Role::Employee)));
    }

    #[test]
    fn test_unknown_priority_is_normal() {
        assert_eq!(
            ProjectPriority::from_str_or_default("CRITICAL"),
            ProjectPriority::Normal
        );
        assert!(ProjectPriority::Urgent.weight() > ProjectPriority::High.weight());
    }

    #[test]
    fn test_create_request_accepts_timestamp_dates() {
        let req: CreateProjectRequest = serde_json::from_value(serde_json::json!({
            "title": "Q3 Launch",
            "startDate": "2024-06-01T08:00:00.000Z",
            "endDate": ""
        }))
        .unwrap();
        assert_eq!(req.start_date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert!(req.end_date.is_none());
        assert_eq!(req.priority, ProjectPriority::Normal);
        assert_eq!(req.status, ProjectStatus::Initiation);
    }
}
