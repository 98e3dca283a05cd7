//! Timeline events, weekly reports and inspirations.

use std::collections::HashMap;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

use super::repository::{bump_revision, check_version, concurrent_modification, Repository};
use super::rows::{
    detail_from_row, event_from_row, inspiration_from_row, report_from_row, to_json,
    EVENT_COLUMNS, INSPIRATION_COLUMNS, REPORT_COLUMNS,
};
use crate::errors::AppError;
use crate::models::{
    Attachment, CreateEventRequest, CreateInspirationRequest, CreateReportRequest, Inspiration,
    ReportDetail, TimelineEvent, UpdateEventRequest, UpdateInspirationRequest, User,
    WeeklyReport,
};

/// Filters for listing timeline events. Date bounds are inclusive days.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub project_id: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl EventQuery {
    fn lower(&self) -> Option<NaiveDateTime> {
        self.start.map(|d| d.and_time(NaiveTime::MIN))
    }

    fn upper(&self) -> Option<NaiveDateTime> {
        self.end
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .map(|d| d.and_time(NaiveTime::MIN))
    }
}

impl Repository {
    // ==================== EVENT OPERATIONS ====================

    /// List events, newest first.
    pub async fn list_events(&self, query: &EventQuery) -> Result<Vec<TimelineEvent>, AppError> {
        let sql = format!(
            r#"SELECT {} FROM events
            WHERE (? IS NULL OR project_id = ?)
              AND (? IS NULL OR date >= ?)
              AND (? IS NULL OR date < ?)
            ORDER BY date DESC"#,
            EVENT_COLUMNS
        );
        let lower = query.lower();
        let upper = query.upper();
        let rows = sqlx::query(&sql)
            .bind(&query.project_id)
            .bind(&query.project_id)
            .bind(lower)
            .bind(lower)
            .bind(upper)
            .bind(upper)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(event_from_row).collect())
    }

    /// Get an event by ID.
    pub async fn get_event(&self, id: &str) -> Result<Option<TimelineEvent>, AppError> {
        let sql = format!("SELECT {} FROM events WHERE id = ?", EVENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(event_from_row))
    }

    /// Create a timeline event authored by `author`.
    pub async fn create_event(
        &self,
        author: &User,
        request: &CreateEventRequest,
        date: NaiveDateTime,
    ) -> Result<TimelineEvent, AppError> {
        if self.get_project(&request.project_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Project {} not found",
                request.project_id
            )));
        }

        let event = TimelineEvent {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: request.project_id.clone(),
            author_id: author.id.clone(),
            author_name: author.username.clone(),
            content: request.content.clone(),
            event_type: request.event_type,
            date,
            attachments: request.attachments.clone(),
            version: 1,
        };

        sqlx::query(
            "INSERT INTO events (id, project_id, author_id, author_name, content, event_type, date, attachments, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(&event.id)
        .bind(&event.project_id)
        .bind(&event.author_id)
        .bind(&event.author_name)
        .bind(&event.content)
        .bind(event.event_type.as_str())
        .bind(event.date)
        .bind(to_json(&event.attachments))
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(event)
    }

    /// Update an event with optimistic concurrency control.
    pub async fn update_event(
        &self,
        id: &str,
        request: &UpdateEventRequest,
    ) -> Result<TimelineEvent, AppError> {
        let mut event = self
            .get_event(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", id)))?;

        check_version("event", id, request.expected_version, event.version)?;

        if let Some(content) = &request.content {
            event.content = content.clone();
        }
        if let Some(event_type) = request.event_type {
            event.event_type = event_type;
        }
        if let Some(attachments) = &request.attachments {
            event.attachments = attachments.clone();
        }

        self.write_event(event).await
    }

    /// Replace the attachments of an event, e.g. after re-foldering.
    pub async fn save_event_attachments(
        &self,
        id: &str,
        attachments: Vec<Attachment>,
        expected_version: i64,
    ) -> Result<TimelineEvent, AppError> {
        let mut event = self
            .get_event(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", id)))?;

        check_version("event", id, Some(expected_version), event.version)?;
        event.attachments = attachments;
        self.write_event(event).await
    }

    async fn write_event(&self, mut event: TimelineEvent) -> Result<TimelineEvent, AppError> {
        let previous_version = event.version;
        event.version += 1;

        let result = sqlx::query(
            "UPDATE events SET content = ?, event_type = ?, attachments = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(&event.content)
        .bind(event.event_type.as_str())
        .bind(to_json(&event.attachments))
        .bind(event.version)
        .bind(&event.id)
        .bind(previous_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_event(&event.id).await?;
            return Err(concurrent_modification(
                current.map(|e| e.version).unwrap_or(0),
            ));
        }

        self.increment_revision().await?;
        Ok(event)
    }

    /// Delete an event.
    pub async fn delete_event(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Event {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }

    // ==================== REPORT OPERATIONS ====================

    /// List reports, newest first, optionally for one author.
    pub async fn list_reports(&self, user_id: Option<&str>) -> Result<Vec<WeeklyReport>, AppError> {
        let sql = format!(
            "SELECT {} FROM reports WHERE (? IS NULL OR user_id = ?) ORDER BY created_at DESC",
            REPORT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        let mut reports: Vec<WeeklyReport> = rows.iter().map(report_from_row).collect();

        let detail_rows = sqlx::query(
            "SELECT report_id, project_id, project_title, content, plan FROM report_details ORDER BY report_id, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut details: HashMap<String, Vec<ReportDetail>> = HashMap::new();
        for row in &detail_rows {
            let (report_id, detail) = detail_from_row(row);
            details.entry(report_id).or_default().push(detail);
        }
        for report in &mut reports {
            if let Some(d) = details.remove(&report.id) {
                report.details = d;
            }
        }

        Ok(reports)
    }

    /// Get a report by ID, including its details.
    pub async fn get_report(&self, id: &str) -> Result<Option<WeeklyReport>, AppError> {
        let sql = format!("SELECT {} FROM reports WHERE id = ?", REPORT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut report = report_from_row(&row);

        let detail_rows = sqlx::query(
            "SELECT report_id, project_id, project_title, content, plan FROM report_details WHERE report_id = ? ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        report.details = detail_rows.iter().map(|r| detail_from_row(r).1).collect();

        Ok(Some(report))
    }

    /// Submit a report authored by `author` at `now`.
    pub async fn create_report(
        &self,
        author: &User,
        request: &CreateReportRequest,
        now: NaiveDateTime,
    ) -> Result<WeeklyReport, AppError> {
        let report = WeeklyReport {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: author.id.clone(),
            username: author.username.clone(),
            week_start_date: request.week_start_date,
            content: request.content.clone().unwrap_or_default(),
            details: request.details.clone(),
            linked_project_ids: request.linked_project_ids.clone(),
            linked_inspiration_ids: request.linked_inspiration_ids.clone(),
            attachments: request.attachments.clone(),
            created_at: now,
        };

        // Use a transaction for atomicity
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"INSERT INTO reports (id, user_id, username, week_start_date, content,
                linked_project_ids, linked_inspiration_ids, attachments, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&report.id)
        .bind(&report.user_id)
        .bind(&report.username)
        .bind(report.week_start_date)
        .bind(&report.content)
        .bind(to_json(&report.linked_project_ids))
        .bind(to_json(&report.linked_inspiration_ids))
        .bind(to_json(&report.attachments))
        .bind(report.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, detail) in report.details.iter().enumerate() {
            sqlx::query(
                "INSERT INTO report_details (report_id, position, project_id, project_title, content, plan) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&report.id)
            .bind(position as i64)
            .bind(&detail.project_id)
            .bind(&detail.project_title)
            .bind(&detail.content)
            .bind(&detail.plan)
            .execute(&mut *tx)
            .await?;
        }

        bump_revision(&mut tx).await?;
        tx.commit().await?;

        Ok(report)
    }

    /// Delete a report and its details.
    pub async fn delete_report(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM reports WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Report {} not found", id)));
        }

        sqlx::query("DELETE FROM report_details WHERE report_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        bump_revision(&mut tx).await?;
        tx.commit().await?;
        Ok(())
    }

    // ==================== INSPIRATION OPERATIONS ====================

    /// List inspirations, newest first.
    pub async fn list_inspirations(&self) -> Result<Vec<Inspiration>, AppError> {
        let sql = format!(
            "SELECT {} FROM inspirations ORDER BY created_at DESC",
            INSPIRATION_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(inspiration_from_row).collect())
    }

    /// Get an inspiration by ID.
    pub async fn get_inspiration(&self, id: &str) -> Result<Option<Inspiration>, AppError> {
        let sql = format!("SELECT {} FROM inspirations WHERE id = ?", INSPIRATION_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(inspiration_from_row))
    }

    /// Create an inspiration authored by `author`.
    pub async fn create_inspiration(
        &self,
        author: &User,
        request: &CreateInspirationRequest,
        now: NaiveDateTime,
    ) -> Result<Inspiration, AppError> {
        if request.content.trim().is_empty() {
            return Err(AppError::Validation("Inspiration content is required".to_string()));
        }

        let inspiration = Inspiration {
            id: uuid::Uuid::new_v4().to_string(),
            author_id: author.id.clone(),
            author_name: author.username.clone(),
            content: request.content.clone(),
            tags: request.tags.clone(),
            color: request.color.clone(),
            created_at: now,
            version: 1,
        };

        sqlx::query(
            "INSERT INTO inspirations (id, author_id, author_name, content, tags, color, created_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(&inspiration.id)
        .bind(&inspiration.author_id)
        .bind(&inspiration.author_name)
        .bind(&inspiration.content)
        .bind(to_json(&inspiration.tags))
        .bind(&inspiration.color)
        .bind(inspiration.created_at)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(inspiration)
    }

    /// Update an inspiration with optimistic concurrency control.
    pub async fn update_inspiration(
        &self,
        id: &str,
        request: &UpdateInspirationRequest,
    ) -> Result<Inspiration, AppError> {
        let existing = self
            .get_inspiration(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Inspiration {} not found", id)))?;

        check_version("inspiration", id, request.expected_version, existing.version)?;

        let updated = Inspiration {
            content: request.content.clone().unwrap_or(existing.content),
            tags: request.tags.clone().unwrap_or(existing.tags),
            color: request.color.clone().unwrap_or(existing.color),
            version: existing.version + 1,
            ..existing
        };

        let result = sqlx::query(
            "UPDATE inspirations SET content = ?, tags = ?, color = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(&updated.content)
        .bind(to_json(&updated.tags))
        .bind(&updated.color)
        .bind(updated.version)
        .bind(id)
        .bind(updated.version - 1)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_inspiration(id).await?;
            return Err(concurrent_modification(
                current.map(|i| i.version).unwrap_or(0),
            ));
        }

        self.increment_revision().await?;

        Ok(updated)
    }

    /// Delete an inspiration.
    pub async fn delete_inspiration(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM inspirations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Inspiration {} not found", id)));
        }

        self.increment_revision().await?;
        Ok(())
    }
}
