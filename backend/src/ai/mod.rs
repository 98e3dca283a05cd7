//! AI-assisted report generation.
//!
//! A [`ReportGenerator`] turns a prompt into text. [`ReportService`] builds
//! the prompts from entity snapshots and never fails: any generator error is
//! turned into an "unavailable" message so the UI always has something to
//! show.

mod client;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::models::{Inspiration, Project, TaskAssignment, TimelineEvent, WeeklyReport};

pub use client::OpenAiClient;
pub use prompts::{ProjectActivity, Prompt, NO_TEAM_UPDATES};

#[derive(Debug, Error)]
pub enum AiError {
    #[error("no API key configured")]
    NotConfigured,

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model returned an empty answer")]
    EmptyResponse,
}

/// A single request/response text generation capability.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AiError>;
}

fn unavailable(err: &AiError) -> String {
    format!("AI service unavailable: {}", err)
}

/// Parse a model answer as a JSON object, tolerating markdown fences.
///
/// Anything that is not an object comes back as `{"generalSummary": raw}`.
pub fn parse_json_best_effort(raw: &str) -> Value {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed)
        .trim();

    match serde_json::from_str::<Value>(unfenced) {
        Ok(Value::Object(map)) => Value::Object(map),
        _ => {
            let mut map = Map::new();
            map.insert("generalSummary".to_string(), Value::String(raw.to_string()));
            Value::Object(map)
        }
    }
}

/// Report generation over a pluggable generator.
#[derive(Clone)]
pub struct ReportService {
    generator: Arc<dyn ReportGenerator>,
}

impl ReportService {
    pub fn new(generator: Arc<dyn ReportGenerator>) -> Self {
        Self { generator }
    }

    async fn run(&self, prompt: Prompt) -> Result<String, AiError> {
        self.generator.complete(&prompt.system, &prompt.user).await
    }

    async fn run_text(&self, kind: &str, prompt: Prompt) -> String {
        match self.run(prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("AI {} generation failed: {}", kind, e);
                unavailable(&e)
            }
        }
    }

    pub async fn dept_monthly_report(
        &self,
        projects: &[Project],
        events: &[TimelineEvent],
        start: &str,
        end: &str,
    ) -> String {
        self.run_text("dept monthly", prompts::dept_monthly(projects, events, start, end))
            .await
    }

    pub async fn project_weekly_report(
        &self,
        project: &Project,
        reports: &[WeeklyReport],
        week_range: &str,
    ) -> String {
        match prompts::project_weekly(project, reports, week_range) {
            Some(prompt) => self.run_text("project weekly", prompt).await,
            None => NO_TEAM_UPDATES.to_string(),
        }
    }

    pub async fn project_report(
        &self,
        project: &Project,
        events: &[TimelineEvent],
        tasks: &[TaskAssignment],
        start: &str,
        end: &str,
    ) -> String {
        self.run_text(
            "project",
            prompts::project_report(project, events, tasks, start, end),
        )
        .await
    }

    /// Suggested per-project `{content, plan}` entries plus `generalSummary`.
    pub async fn personal_report(
        &self,
        username: &str,
        activity: &[ProjectActivity<'_>],
        inspirations: &[Inspiration],
    ) -> Value {
        match self.run(prompts::personal(username, activity, inspirations)).await {
            Ok(text) => parse_json_best_effort(&text),
            Err(e) => {
                tracing::warn!("AI personal generation failed: {}", e);
                json!({ "generalSummary": unavailable(&e) })
            }
        }
    }
}
