//! Weekly report filtering, grouping and export.

use std::collections::HashMap;

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::{User, WeeklyReport};

/// Free-text and inclusive date-range filter.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub search: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ReportFilter {
    /// Author display name or content contains the term, case-insensitively.
    fn matches_search(&self, report: &WeeklyReport) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        report.username.to_lowercase().contains(&needle)
            || report.content.to_lowercase().contains(&needle)
    }

    /// `start 00:00:00 <= createdAt` and `createdAt` before the midnight
    /// following `end`, so the whole last second of the end day is included.
    fn matches_range(&self, created_at: NaiveDateTime) -> bool {
        if let Some(start) = self.start {
            if created_at < start.and_time(chrono::NaiveTime::MIN) {
                return false;
            }
        }
        if let Some(end) = self.end {
            if let Some(next_day) = end.checked_add_days(Days::new(1)) {
                if created_at >= next_day.and_time(chrono::NaiveTime::MIN) {
                    return false;
                }
            }
        }
        true
    }

    pub fn matches(&self, report: &WeeklyReport) -> bool {
        self.matches_search(report) && self.matches_range(report.created_at)
    }
}

/// Keep the reports matching the filter, in their original order.
pub fn filter_reports<'a>(reports: &'a [WeeklyReport], filter: &ReportFilter) -> Vec<&'a WeeklyReport> {
    reports.iter().filter(|r| filter.matches(r)).collect()
}

/// How reports are partitioned on the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    Author,
    Date,
}

impl GroupMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "author" | "user" => Some(GroupMode::Author),
            "date" => Some(GroupMode::Date),
            _ => None,
        }
    }

    fn key_of(&self, report: &WeeklyReport) -> String {
        match self {
            GroupMode::Author => report.user_id.clone(),
            GroupMode::Date => report.created_at.date().format("%Y-%m-%d").to_string(),
        }
    }
}

/// One partition of the filtered reports.
#[derive(Debug, Clone, Serialize)]
pub struct ReportGroup<'a> {
    pub key: String,
    pub reports: Vec<&'a WeeklyReport>,
}

/// Partition reports by author id or by calendar date of creation.
///
/// Groups appear in order of first occurrence; each group keeps the relative
/// order of its reports.
pub fn group_reports<'a>(reports: &[&'a WeeklyReport], mode: GroupMode) -> Vec<ReportGroup<'a>> {
    let mut groups: Vec<ReportGroup<'a>> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for report in reports {
        let key = mode.key_of(report);
        match positions.get(&key) {
            Some(&idx) => groups[idx].reports.push(report),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push(ReportGroup {
                    key,
                    reports: vec![report],
                });
            }
        }
    }

    groups
}

/// Human-readable title for a group key.
pub fn group_title(key: &str, mode: GroupMode, users: &[User]) -> String {
    match mode {
        GroupMode::Author => users
            .iter()
            .find(|u| u.id == key)
            .map(|u| u.username.clone())
            .unwrap_or_else(|| "Unknown user".to_string()),
        GroupMode::Date => key.to_string(),
    }
}

/// Plain-text export of a set of reports.
pub fn export_text(reports: &[&WeeklyReport]) -> String {
    reports
        .iter()
        .map(|r| {
            format!(
                "Employee: {}\nSubmitted: {}\nContent:\n{}\n-----------------------------------\n",
                r.username,
                r.created_at.format("%Y-%m-%d %H:%M:%S"),
                r.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
