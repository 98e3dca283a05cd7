//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. Every write
//! bumps the global revision id so clients can revalidate their caches.

use chrono::{NaiveDateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::rows::{
    project_from_row, task_from_row, to_json, user_from_row, PROJECT_COLUMNS, TASK_COLUMNS,
    USER_COLUMNS,
};
use crate::db::SCHEMA_VERSION;
use crate::errors::AppError;
use crate::models::{
    validate_progress, CreateProjectRequest, CreateTaskRequest, Datastore, Project, RevisionInfo,
    Role, TaskAssignment, TaskRemark, UpdateProjectRequest, UpdateTaskRequest, User,
};

/// Job number of the seeded administrator account.
pub const ADMIN_JOB_NUMBER: &str = "admin";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

/// Bump the revision inside an open transaction.
pub(super) async fn bump_revision(conn: &mut SqliteConnection) -> Result<(), AppError> {
    let now = Utc::now().to_rfc3339();
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(&now)
        .execute(conn)
        .await?;
    Ok(())
}

/// Reject a stale `expectedVersion`.
pub(super) fn check_version(
    entity: &str,
    id: &str,
    expected: Option<i64>,
    current: i64,
) -> Result<(), AppError> {
    match expected {
        Some(expected) if expected != current => {
            Err(AppError::version_mismatch(entity, id, expected, current))
        }
        _ => Ok(()),
    }
}

/// Conflict raised when a conditional UPDATE matched no row.
pub(super) fn concurrent_modification(current_version: i64) -> AppError {
    AppError::Conflict {
        message: "Concurrent modification detected".to_string(),
        current_version,
    }
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        let mut conn = self.pool.acquire().await?;
        bump_revision(&mut conn).await?;
        drop(conn);
        self.get_revision_id().await
    }

    /// Get the full datastore snapshot.
    pub async fn get_datastore(&self) -> Result<Datastore, AppError> {
        let meta = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(Datastore {
            schema_version: SCHEMA_VERSION,
            revision_id: meta.get("revision_id"),
            generated_at: meta.get("generated_at"),
            users: self.list_users().await?,
            projects: self.list_projects().await?,
            tasks: self.list_tasks(None).await?,
            events: self.list_events(&Default::default()).await?,
            reports: self.list_reports(None).await?,
            inspirations: self.list_inspirations().await?,
        })
    }

    // ==================== USER OPERATIONS ====================

    /// List all users.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let sql = format!("SELECT {} FROM users ORDER BY job_number", USER_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    /// Look up a user and their password hash by job number.
    pub async fn find_credentials(
        &self,
        job_number: &str,
    ) -> Result<Option<(User, String)>, AppError> {
        let sql = format!(
            "SELECT {}, password_hash FROM users WHERE job_number = ?",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(job_number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| (user_from_row(&r), r.get("password_hash"))))
    }

    /// Create a user. Job numbers are unique.
    pub async fn create_user(
        &self,
        job_number: &str,
        name: &str,
        password_hash: &str,
        role: Role,
        skills: &[String],
        now: NaiveDateTime,
    ) -> Result<User, AppError> {
        let exists = sqlx::query("SELECT 1 FROM users WHERE job_number = ?")
            .bind(job_number)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_some() {
            return Err(AppError::Validation(format!(
                "Job number {} is already registered",
                job_number
            )));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let username = User::display_name(name, job_number);

        sqlx::query(
            "INSERT INTO users (id, job_number, name, username, password_hash, role, avatar, skills, created_at) VALUES (?, ?, ?, ?, ?, ?, NULL, ?, ?)",
        )
        .bind(&id)
        .bind(job_number)
        .bind(name)
        .bind(&username)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(to_json(skills))
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(User {
            id,
            job_number: job_number.to_string(),
            name: name.to_string(),
            username,
            role,
            avatar: None,
            skills: skills.to_vec(),
        })
    }

    /// Update profile fields. `role` is applied as given; callers decide
    /// whether the requester may change it.
    pub async fn update_user(
        &self,
        id: &str,
        name: Option<&str>,
        avatar: Option<&str>,
        skills: Option<&[String]>,
        role: Option<Role>,
        password_hash: Option<&str>,
    ) -> Result<User, AppError> {
        let existing = self
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        let name = name.map(str::to_string).unwrap_or(existing.name);
        let username = User::display_name(&name, &existing.job_number);
        let avatar = avatar.map(str::to_string).or(existing.avatar);
        let skills = skills.map(<[String]>::to_vec).unwrap_or(existing.skills);
        let role = role.unwrap_or(existing.role);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE users SET name = ?, username = ?, avatar = ?, skills = ?, role = ? WHERE id = ?",
        )
        .bind(&name)
        .bind(&username)
        .bind(&avatar)
        .bind(to_json(&skills))
        .bind(role.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(hash) = password_hash {
            sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
                .bind(hash)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(User {
            id: id.to_string(),
            job_number: existing.job_number,
            name,
            username,
            role,
            avatar,
            skills,
        })
    }

    /// Create the administrator account if it does not exist yet.
    ///
    /// Returns whether an account was created.
    pub async fn ensure_admin(
        &self,
        password_hash: &str,
        now: NaiveDateTime,
    ) -> Result<bool, AppError> {
        if self.find_credentials(ADMIN_JOB_NUMBER).await?.is_some() {
            return Ok(false);
        }
        self.create_user(
            ADMIN_JOB_NUMBER,
            "Administrator",
            password_hash,
            Role::Admin,
            &["System administration".to_string()],
            now,
        )
        .await?;
        Ok(true)
    }

    // ==================== PROJECT OPERATIONS ====================

    /// List all projects, most recently started first.
    pub async fn list_projects(&self) -> Result<Vec<Project>, AppError> {
        let sql = format!(
            "SELECT {} FROM projects ORDER BY start_date DESC, title",
            PROJECT_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(project_from_row).collect())
    }

    /// Get a project by ID.
    pub async fn get_project(&self, id: &str) -> Result<Option<Project>, AppError> {
        let sql = format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(project_from_row))
    }

    /// Create a new project. The manager defaults to `creator_id`.
    pub async fn create_project(
        &self,
        request: &CreateProjectRequest,
        creator_id: &str,
    ) -> Result<Project, AppError> {
        if request.title.trim().is_empty() {
            return Err(AppError::Validation("Project title is required".to_string()));
        }

        let project = Project {
            id: uuid::Uuid::new_v4().to_string(),
            title: request.title.trim().to_string(),
            project_number: request.project_number.clone(),
            customer_name: request.customer_name.clone(),
            priority: request.priority,
            description: request.description.clone(),
            business_scenario: request.business_scenario.clone(),
            status: request.status,
            start_date: request.start_date,
            end_date: request.end_date,
            manager_id: request
                .manager_id
                .clone()
                .unwrap_or_else(|| creator_id.to_string()),
            admins: request.admins.clone(),
            members: request.members.clone(),
            budget: request.budget.clone(),
            version: 1,
        };

        sqlx::query(
            r#"INSERT INTO projects (id, title, project_number, customer_name, priority, description,
                business_scenario, status, start_date, end_date, manager_id, admins, members, budget, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"#,
        )
        .bind(&project.id)
        .bind(&project.title)
        .bind(&project.project_number)
        .bind(&project.customer_name)
        .bind(project.priority.as_str())
        .bind(&project.description)
        .bind(&project.business_scenario)
        .bind(project.status.as_str())
        .bind(project.start_date)
        .bind(project.end_date)
        .bind(&project.manager_id)
        .bind(to_json(&project.admins))
        .bind(to_json(&project.members))
        .bind(&project.budget)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(project)
    }

    /// Update a project with optimistic concurrency control.
    pub async fn update_project(
        &self,
        id: &str,
        request: &UpdateProjectRequest,
    ) -> Result<Project, AppError> {
        let existing = self
            .get_project(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", id)))?;

        check_version("project", id, request.expected_version, existing.version)?;

        let updated = Project {
            id: id.to_string(),
            title: request.title.clone().unwrap_or(existing.title),
            project_number: request.project_number.clone().or(existing.project_number),
            customer_name: request.customer_name.clone().or(existing.customer_name),
            priority: request.priority.unwrap_or(existing.priority),
            description: request.description.clone().or(existing.description),
            business_scenario: request.business_scenario.clone().or(existing.business_scenario),
            status: request.status.unwrap_or(existing.status),
            start_date: request.start_date.unwrap_or(existing.start_date),
            end_date: request.end_date.or(existing.end_date),
            manager_id: request.manager_id.clone().unwrap_or(existing.manager_id),
            admins: request.admins.clone().unwrap_or(existing.admins),
            members: request.members.clone().unwrap_or(existing.members),
            budget: request.budget.clone().or(existing.budget),
            version: existing.version + 1,
        };

        if updated.title.trim().is_empty() {
            return Err(AppError::Validation("Project title is required".to_string()));
        }

        // Use conditional UPDATE with version check to prevent race conditions
        let result = sqlx::query(
            r#"UPDATE projects SET
                title = ?, project_number = ?, customer_name = ?, priority = ?, description = ?,
                business_scenario = ?, status = ?, start_date = ?, end_date = ?, manager_id = ?,
                admins = ?, members = ?, budget = ?, version = ?
            WHERE id = ? AND version = ?"#,
        )
        .bind(&updated.title)
        .bind(&updated.project_number)
        .bind(&updated.customer_name)
        .bind(updated.priority.as_str())
        .bind(&updated.description)
        .bind(&updated.business_scenario)
        .bind(updated.status.as_str())
        .bind(updated.start_date)
        .bind(updated.end_date)
        .bind(&updated.manager_id)
        .bind(to_json(&updated.admins))
        .bind(to_json(&updated.members))
        .bind(&updated.budget)
        .bind(updated.version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_project(id).await?;
            return Err(concurrent_modification(
                current.map(|p| p.version).unwrap_or(0),
            ));
        }

        self.increment_revision().await?;

        Ok(updated)
    }

    /// Delete a project together with its tasks and timeline events.
    pub async fn delete_project(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Project {} not found", id)));
        }

        sqlx::query("DELETE FROM tasks WHERE project_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM events WHERE project_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    // ==================== TASK OPERATIONS ====================

    /// List tasks ordered by deadline, optionally for one project.
    pub async fn list_tasks(&self, project_id: Option<&str>) -> Result<Vec<TaskAssignment>, AppError> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE (? IS NULL OR project_id = ?) ORDER BY deadline, title",
            TASK_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(project_id)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(task_from_row).collect())
    }

    /// Get a task by ID.
    pub async fn get_task(&self, id: &str) -> Result<Option<TaskAssignment>, AppError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(task_from_row))
    }

    /// Create a new task.
    pub async fn create_task(&self, request: &CreateTaskRequest) -> Result<TaskAssignment, AppError> {
        if request.title.trim().is_empty() {
            return Err(AppError::Validation("Task title is required".to_string()));
        }
        let progress = validate_progress(request.progress).map_err(AppError::Validation)?;

        let task = TaskAssignment {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: request.project_id.clone(),
            title: request.title.trim().to_string(),
            description: request.description.clone(),
            assignee_ids: request.assignee_ids.clone(),
            deadline: request.deadline,
            progress,
            status: crate::models::TaskStatus::from_progress(progress),
            remarks: Vec::new(),
            version: 1,
        };

        sqlx::query(
            "INSERT INTO tasks (id, project_id, title, description, assignee_ids, deadline, progress, remarks, version) VALUES (?, ?, ?, ?, ?, ?, ?, '[]', 1)",
        )
        .bind(&task.id)
        .bind(&task.project_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(to_json(&task.assignee_ids))
        .bind(task.deadline)
        .bind(task.progress)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(task)
    }

    /// Update a task with optimistic concurrency control.
    pub async fn update_task(
        &self,
        id: &str,
        request: &UpdateTaskRequest,
    ) -> Result<TaskAssignment, AppError> {
        let existing = self
            .get_task(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))?;

        check_version("task", id, request.expected_version, existing.version)?;

        let progress = match request.progress {
            Some(p) => validate_progress(p).map_err(AppError::Validation)?,
            None => existing.progress,
        };

        let updated = TaskAssignment {
            id: id.to_string(),
            project_id: existing.project_id.clone(),
            title: request.title.clone().unwrap_or(existing.title.clone()),
            description: request.description.clone().or(existing.description.clone()),
            assignee_ids: request
                .assignee_ids
                .clone()
                .unwrap_or(existing.assignee_ids.clone()),
            deadline: request.deadline.unwrap_or(existing.deadline),
            progress,
            status: crate::models::TaskStatus::from_progress(progress),
            remarks: existing.remarks.clone(),
            version: existing.version + 1,
        };

        self.write_task(&updated, existing.version).await?;
        Ok(updated)
    }

    /// Record progress and append an optional remark.
    pub async fn record_progress(
        &self,
        id: &str,
        progress: i64,
        remark: Option<TaskRemark>,
    ) -> Result<TaskAssignment, AppError> {
        let progress = validate_progress(progress).map_err(AppError::Validation)?;
        let mut task = self
            .get_task(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Task {} not found", id)))?;

        let previous_version = task.version;
        task.progress = progress;
        task.status = crate::models::TaskStatus::from_progress(progress);
        task.remarks.extend(remark);
        task.version += 1;

        self.write_task(&task, previous_version).await?;
        Ok(task)
    }

    async fn write_task(&self, task: &TaskAssignment, previous_version: i64) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"UPDATE tasks SET
                title = ?, description = ?, assignee_ids = ?, deadline = ?, progress = ?,
                remarks = ?, version = ?
            WHERE id = ? AND version = ?"#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(to_json(&task.assignee_ids))
        .bind(task.deadline)
        .bind(task.progress)
        .bind(to_json(&task.remarks))
        .bind(task.version)
        .bind(&task.id)
        .bind(previous_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_task(&task.id).await?;
            return Err(concurrent_modification(
                current.map(|t| t.version).unwrap_or(0),
            ));
        }

        self.increment_revision().await?;
        Ok(())
    }

    /// Delete a task.
    pub async fn delete_task(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Task {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }
}
