//! Data models for the DeptSync application.
//!
//! These models match the frontend TypeScript interfaces (camelCase on the wire).

mod attachment;
mod datastore;
mod event;
mod inspiration;
mod project;
mod report;
mod task;
mod user;

pub use attachment::*;
pub use datastore::*;
pub use event::*;
pub use inspiration::*;
pub use project::*;
pub use report::*;
pub use task::*;
pub use user::*;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Deserialize a calendar date from either `YYYY-MM-DD` or a full timestamp.
pub(crate) fn lenient_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    crate::clock::parse_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
}

/// Optional variant of [`lenient_date`].
pub(crate) fn lenient_date_opt<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => crate::clock::parse_date(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", s))),
    }
}
