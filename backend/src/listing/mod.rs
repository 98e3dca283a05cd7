//! List filters for the project catalogue and the inspiration board.

use std::collections::BTreeSet;

use crate::models::{Inspiration, Project, ProjectStatus};

/// Lifecycle tab of the project catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectTab {
    /// Still in initiation.
    Pre,
    /// Execution or acceptance.
    Formal,
    /// Closed.
    Archived,
}

impl ProjectTab {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pre" => Some(ProjectTab::Pre),
            "formal" => Some(ProjectTab::Formal),
            "archived" => Some(ProjectTab::Archived),
            _ => None,
        }
    }

    fn contains(&self, status: ProjectStatus) -> bool {
        match self {
            ProjectTab::Pre => status == ProjectStatus::Initiation,
            ProjectTab::Formal => status.is_active(),
            ProjectTab::Archived => status == ProjectStatus::Closed,
        }
    }
}

/// Tab, free-text and business-scenario filter over projects.
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub tab: Option<ProjectTab>,
    pub search: String,
    pub business_scenario: Option<String>,
}

impl ProjectFilter {
    /// Title, description, business scenario, customer or project number
    /// contains the term, case-insensitively.
    fn matches_search(&self, project: &Project) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        let contains = |field: Option<&str>| {
            field.is_some_and(|value| value.to_lowercase().contains(&needle))
        };

        contains(Some(project.title.as_str()))
            || contains(project.description.as_deref())
            || contains(project.business_scenario.as_deref())
            || contains(project.customer_name.as_deref())
            || contains(project.project_number.as_deref())
    }

    pub fn matches(&self, project: &Project) -> bool {
        let in_tab = self.tab.map_or(true, |tab| tab.contains(project.status));
        let in_scenario = self
            .business_scenario
            .as_deref()
            .map_or(true, |s| project.business_scenario.as_deref() == Some(s));
        in_tab && in_scenario && self.matches_search(project)
    }
}

/// Keep the projects matching the filter, in their original order.
pub fn filter_projects(projects: Vec<Project>, filter: &ProjectFilter) -> Vec<Project> {
    projects.into_iter().filter(|p| filter.matches(p)).collect()
}

/// Free-text and tag filter over inspirations.
#[derive(Debug, Clone, Default)]
pub struct InspirationFilter {
    pub search: String,
    pub tag: Option<String>,
}

impl InspirationFilter {
    pub fn matches(&self, inspiration: &Inspiration) -> bool {
        let needle = self.search.to_lowercase();
        let in_text = inspiration.content.to_lowercase().contains(&needle)
            || inspiration.author_name.to_lowercase().contains(&needle);
        let tagged = self
            .tag
            .as_ref()
            .map_or(true, |tag| inspiration.tags.contains(tag));
        in_text && tagged
    }
}

pub fn filter_inspirations(items: Vec<Inspiration>, filter: &InspirationFilter) -> Vec<Inspiration> {
    items.into_iter().filter(|i| filter.matches(i)).collect()
}

/// Every tag used on the board, deduplicated and sorted.
pub fn all_tags(items: &[Inspiration]) -> Vec<String> {
    items
        .iter()
        .flat_map(|i| i.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
