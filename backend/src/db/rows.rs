// Helper functions for row conversion

use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::models::{
    EventType, Inspiration, Project, ProjectPriority, ProjectStatus, ReportDetail, Role,
    TaskAssignment, TaskStatus, TimelineEvent, User, WeeklyReport,
};

pub(super) const USER_COLUMNS: &str = "id, job_number, name, username, role, avatar, skills";

pub(super) const PROJECT_COLUMNS: &str = "id, title, project_number, customer_name, priority, \
    description, business_scenario, status, start_date, end_date, manager_id, admins, members, \
    budget, version";

pub(super) const TASK_COLUMNS: &str =
    "id, project_id, title, description, assignee_ids, deadline, progress, remarks, version";

pub(super) const EVENT_COLUMNS: &str =
    "id, project_id, author_id, author_name, content, event_type, date, attachments, version";

pub(super) const REPORT_COLUMNS: &str = "id, user_id, username, week_start_date, content, \
    linked_project_ids, linked_inspiration_ids, attachments, created_at";

pub(super) const INSPIRATION_COLUMNS: &str =
    "id, author_id, author_name, content, tags, color, created_at, version";

pub(super) fn user_from_row(row: &SqliteRow) -> User {
    let role: String = row.get("role");
    let skills: Option<String> = row.get("skills");
    User {
        id: row.get("id"),
        job_number: row.get("job_number"),
        name: row.get("name"),
        username: row.get("username"),
        role: Role::from_str(&role).unwrap_or_default(),
        avatar: row.get("avatar"),
        skills: skills.map(|s| parse_json_array(&s)).unwrap_or_default(),
    }
}

pub(super) fn project_from_row(row: &SqliteRow) -> Project {
    let priority: String = row.get("priority");
    let status: String = row.get("status");
    let admins: Option<String> = row.get("admins");
    let members: Option<String> = row.get("members");
    Project {
        id: row.get("id"),
        title: row.get("title"),
        project_number: row.get("project_number"),
        customer_name: row.get("customer_name"),
        priority: ProjectPriority::from_str_or_default(&priority),
        description: row.get("description"),
        business_scenario: row.get("business_scenario"),
        status: ProjectStatus::from_str(&status).unwrap_or_default(),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        manager_id: row.get("manager_id"),
        admins: admins.map(|s| parse_json_array(&s)).unwrap_or_default(),
        members: members.map(|s| parse_json_array(&s)).unwrap_or_default(),
        budget: row.get("budget"),
        version: row.get("version"),
    }
}

pub(super) fn task_from_row(row: &SqliteRow) -> TaskAssignment {
    let progress: i64 = row.get("progress");
    let assignees: Option<String> = row.get("assignee_ids");
    let remarks: Option<String> = row.get("remarks");
    TaskAssignment {
        id: row.get("id"),
        project_id: row.get("project_id"),
        title: row.get("title"),
        description: row.get("description"),
        assignee_ids: assignees.map(|s| parse_json_array(&s)).unwrap_or_default(),
        deadline: row.get("deadline"),
        progress,
        status: TaskStatus::from_progress(progress),
        remarks: remarks.map(|s| parse_json_list(&s)).unwrap_or_default(),
        version: row.get("version"),
    }
}

pub(super) fn event_from_row(row: &SqliteRow) -> TimelineEvent {
    let event_type: String = row.get("event_type");
    let attachments: Option<String> = row.get("attachments");
    TimelineEvent {
        id: row.get("id"),
        project_id: row.get("project_id"),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        content: row.get("content"),
        event_type: EventType::from_str_or_default(&event_type),
        date: row.get("date"),
        attachments: attachments.map(|s| parse_json_list(&s)).unwrap_or_default(),
        version: row.get("version"),
    }
}

/// Details live in their own table and are attached by the caller.
pub(super) fn report_from_row(row: &SqliteRow) -> WeeklyReport {
    let linked_projects: Option<String> = row.get("linked_project_ids");
    let linked_inspirations: Option<String> = row.get("linked_inspiration_ids");
    let attachments: Option<String> = row.get("attachments");
    WeeklyReport {
        id: row.get("id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        week_start_date: row.get("week_start_date"),
        content: row.get("content"),
        details: Vec::new(),
        linked_project_ids: linked_projects.map(|s| parse_json_array(&s)).unwrap_or_default(),
        linked_inspiration_ids: linked_inspirations
            .map(|s| parse_json_array(&s))
            .unwrap_or_default(),
        attachments: attachments.map(|s| parse_json_list(&s)).unwrap_or_default(),
        created_at: row.get("created_at"),
    }
}

pub(super) fn detail_from_row(row: &SqliteRow) -> (String, ReportDetail) {
    (
        row.get("report_id"),
        ReportDetail {
            project_id: row.get("project_id"),
            project_title: row.get("project_title"),
            content: row.get("content"),
            plan: row.get("plan"),
        },
    )
}

pub(super) fn inspiration_from_row(row: &SqliteRow) -> Inspiration {
    let tags: Option<String> = row.get("tags");
    Inspiration {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        content: row.get("content"),
        tags: tags.map(|s| parse_json_array(&s)).unwrap_or_default(),
        color: row.get("color"),
        created_at: row.get("created_at"),
        version: row.get("version"),
    }
}

pub(super) fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

pub(super) fn parse_json_list<T: DeserializeOwned>(s: &str) -> Vec<T> {
    serde_json::from_str(s).unwrap_or_default()
}

pub(super) fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}
