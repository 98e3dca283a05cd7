//! Datastore snapshot used by the SPA to seed its local cache.

use serde::{Deserialize, Serialize};

use super::{Inspiration, Project, TaskAssignment, TimelineEvent, User, WeeklyReport};

/// The root datastore containing all application data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datastore {
    pub schema_version: i32,
    pub generated_at: String,
    pub revision_id: i64,
    pub users: Vec<User>,
    pub projects: Vec<Project>,
    pub tasks: Vec<TaskAssignment>,
    pub events: Vec<TimelineEvent>,
    pub reports: Vec<WeeklyReport>,
    pub inspirations: Vec<Inspiration>,
}

/// Revision information for change detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionInfo {
    pub revision_id: i64,
    pub generated_at: String,
}
