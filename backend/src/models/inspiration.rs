//! Inspiration model matching the frontend Inspiration interface.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Sticky-note colour used when none is given.
pub const DEFAULT_INSPIRATION_COLOR: &str = "#fef3c7";

/// A shared free-form idea note, independent of any project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspiration {
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub color: String,
    pub created_at: NaiveDateTime,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// Request body for creating a new inspiration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInspirationRequest {
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    DEFAULT_INSPIRATION_COLOR.to_string()
}

/// Request body for updating an existing inspiration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInspirationRequest {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub color: Option<String>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}
