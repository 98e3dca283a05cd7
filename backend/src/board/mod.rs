//! Personal task board.
//!
//! Tasks assigned to a user are split into status columns; within a column
//! they are ordered by project priority (URGENT first) and then by deadline
//! (earliest, i.e. most overdue, first). The sort is stable so equal keys keep
//! their incoming order.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{Project, ProjectPriority, TaskAssignment, TaskStatus};

/// Projects looked up by id.
pub type ProjectIndex<'a> = HashMap<&'a str, &'a Project>;

pub fn index_projects(projects: &[Project]) -> ProjectIndex<'_> {
    projects.iter().map(|p| (p.id.as_str(), p)).collect()
}

/// Priority of the task's project; a missing project counts as NORMAL.
pub fn task_priority(task: &TaskAssignment, projects: &ProjectIndex<'_>) -> ProjectPriority {
    projects
        .get(task.project_id.as_str())
        .map(|p| p.priority)
        .unwrap_or_default()
}

/// Order one status column in place.
pub fn sort_column(tasks: &mut [&TaskAssignment], projects: &ProjectIndex<'_>) {
    tasks.sort_by_key(|t| (Reverse(task_priority(t, projects).weight()), t.deadline));
}

/// Whole days from `today` to the deadline; negative when overdue.
pub fn days_remaining(deadline: NaiveDate, today: NaiveDate) -> i64 {
    (deadline - today).num_days()
}

/// A task as rendered on the board.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardCard {
    pub task: TaskAssignment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_title: Option<String>,
    pub project_priority: ProjectPriority,
    pub days_remaining: i64,
    pub overdue: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardColumn {
    pub status: TaskStatus,
    pub cards: Vec<BoardCard>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub user_id: String,
    pub columns: Vec<BoardColumn>,
}

/// Build the board of tasks assigned to `user_id`.
pub fn build_board(
    user_id: &str,
    tasks: &[TaskAssignment],
    projects: &[Project],
    today: NaiveDate,
) -> Board {
    let index = index_projects(projects);
    let mine: Vec<&TaskAssignment> = tasks.iter().filter(|t| t.is_assigned_to(user_id)).collect();

    let columns = TaskStatus::COLUMNS
        .iter()
        .map(|status| {
            let mut column: Vec<&TaskAssignment> =
                mine.iter().copied().filter(|t| t.status == *status).collect();
            sort_column(&mut column, &index);

            let cards = column
                .into_iter()
                .map(|task| {
                    let project = index.get(task.project_id.as_str());
                    let days = days_remaining(task.deadline, today);
                    BoardCard {
                        task: task.clone(),
                        project_title: project.map(|p| p.title.clone()),
                        project_priority: task_priority(task, &index),
                        days_remaining: days,
                        overdue: days < 0 && task.status != TaskStatus::Completed,
                    }
                })
                .collect();

            BoardColumn {
                status: *status,
                cards,
            }
        })
        .collect();

    Board {
        user_id: user_id.to_string(),
        columns,
    }
}
