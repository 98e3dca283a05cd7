//! Admin dashboard aggregates.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::models::{Project, ProjectStatus, TaskAssignment, TaskStatus, User, WeeklyReport};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: ProjectStatus,
    pub count: usize,
}

/// Task load of one user.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserWorkload {
    pub user_id: String,
    pub name: String,
    pub total: usize,
    pub completed: usize,
    /// Completed share, rounded percentage
    pub ratio: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_projects: usize,
    pub active_projects: usize,
    pub closed_projects: usize,
    pub projects_by_status: Vec<StatusCount>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub reports_last_7_days: usize,
    pub workload: Vec<UserWorkload>,
}

fn rounded_ratio(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((completed * 200 + total) / (total * 2)) as u32
}

pub fn compute(
    projects: &[Project],
    tasks: &[TaskAssignment],
    users: &[User],
    reports: &[WeeklyReport],
    now: NaiveDateTime,
) -> DashboardStats {
    let projects_by_status = ProjectStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: projects.iter().filter(|p| p.status == *status).count(),
        })
        .collect();

    let since = now - Duration::days(7);

    let mut workload: Vec<UserWorkload> = users
        .iter()
        .filter_map(|user| {
            let mine: Vec<&TaskAssignment> =
                tasks.iter().filter(|t| t.is_assigned_to(&user.id)).collect();
            if mine.is_empty() {
                return None;
            }
            let completed = mine
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .count();
            Some(UserWorkload {
                user_id: user.id.clone(),
                name: user.name.clone(),
                total: mine.len(),
                completed,
                ratio: rounded_ratio(completed, mine.len()),
            })
        })
        .collect();
    workload.sort_by(|a, b| b.total.cmp(&a.total));

    DashboardStats {
        total_projects: projects.len(),
        active_projects: projects.iter().filter(|p| p.status.is_active()).count(),
        closed_projects: projects
            .iter()
            .filter(|p| p.status == ProjectStatus::Closed)
            .count(),
        projects_by_status,
        total_tasks: tasks.len(),
        completed_tasks: tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count(),
        reports_last_7_days: reports.iter().filter(|r| r.created_at >= since).count(),
        workload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProjectPriority, Role};
    use chrono::NaiveDate;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.into(),
            job_number: id.into(),
            name: name.into(),
            username: format!("{}({})", name, id),
            role: Role::Employee,
            avatar: None,
            skills: vec![],
        }
    }

    fn project(id: &str, status: ProjectStatus) -> Project {
        Project {
            id: id.into(),
            title: id.into(),
            project_number: None,
            customer_name: None,
            priority: ProjectPriority::Normal,
            description: None,
            business_scenario: None,
            status,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: None,
            manager_id: "u1".into(),
            admins: vec![],
            members: vec![],
            budget: None,
            version: 1,
        }
    }

    fn task(id: &str, assignees: &[&str], progress: i64) -> TaskAssignment {
        TaskAssignment {
            id: id.into(),
            project_id: "p1".into(),
            title: id.into(),
            description: None,
            assignee_ids: assignees.iter().map(|a| a.to_string()).collect(),
            deadline: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            progress,
            status: TaskStatus::from_progress(progress),
            remarks: vec![],
            version: 1,
        }
    }

    fn report(id: &str, created: &str) -> WeeklyReport {
        WeeklyReport {
            id: id.into(),
            user_id: "u1".into(),
            username: "Alice(u1)".into(),
            week_start_date: at(created).date(),
            content: String::new(),
            details: vec![],
            linked_project_ids: vec![],
            linked_inspiration_ids: vec![],
            attachments: vec![],
            created_at: at(created),
        }
    }

    #[test]
    fn test_project_and_task_counts() {
        let projects = vec![
            project("p1", ProjectStatus::Execution),
            project("p2", ProjectStatus::Acceptance),
            project("p3", ProjectStatus::Closed),
            project("p4", ProjectStatus::Initiation),
        ];
        let tasks = vec![task("t1", &["u1"], 100), task("t2", &["u1"], 10)];
        let reports = vec![
            report("r1", "2024-06-09 10:00:00"),
            report("r2", "2024-06-01 10:00:00"),
        ];

        let stats = compute(&projects, &tasks, &[], &reports, at("2024-06-10 12:00:00"));

        assert_eq!(stats.total_projects, 4);
        assert_eq!(stats.active_projects, 2);
        assert_eq!(stats.closed_projects, 1);
        assert_eq!(stats.projects_by_status.len(), 4);
        assert!(stats.projects_by_status.iter().all(|s| s.count == 1));
        assert_eq!(stats.total_tasks, 2);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.reports_last_7_days, 1);
        assert!(stats.workload.is_empty());
    }

    #[test]
    fn test_workload_ordering_and_ratio() {
        let users = vec![user("u1", "Alice"), user("u2", "Bob"), user("u3", "Idle")];
        let tasks = vec![
            task("t1", &["u1", "u2"], 100),
            task("t2", &["u2"], 100),
            task("t3", &["u2"], 0),
            task("t4", &["u1"], 50),
            task("t5", &["u1"], 0),
        ];

        let stats = compute(&[], &tasks, &users, &[], at("2024-06-10 12:00:00"));

        assert_eq!(stats.workload.len(), 2);
        // Equal totals keep user order.
        assert_eq!(stats.workload[0].user_id, "u1");
        assert_eq!(stats.workload[0].total, 3);
        assert_eq!(stats.workload[0].completed, 1);
        assert_eq!(stats.workload[0].ratio, 33);
        assert_eq!(stats.workload[1].ratio, 67);
    }

    #[test]
    fn test_rounded_ratio() {
        assert_eq!(rounded_ratio(0, 0), 0);
        assert_eq!(rounded_ratio(1, 2), 50);
        assert_eq!(rounded_ratio(2, 3), 67);
        assert_eq!(rounded_ratio(1, 8), 13);
    }
}
