//! Prompt construction for the report generators.

use std::fmt::Write;

use crate::models::{Inspiration, Project, TaskAssignment, TimelineEvent, WeeklyReport};

/// A system/user message pair sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// One project's recent activity, as seen by a single employee.
#[derive(Debug, Clone)]
pub struct ProjectActivity<'a> {
    pub project: &'a Project,
    pub events: Vec<&'a TimelineEvent>,
    pub tasks: Vec<&'a TaskAssignment>,
}

/// Notice returned instead of a project weekly report when nobody wrote one.
pub const NO_TEAM_UPDATES: &str =
    "No team member submitted a weekly report for this project in the period; nothing to summarise.";

const LANGUAGE: &str = "Write the report in Simplified Chinese.";

fn event_line(event: &TimelineEvent) -> String {
    format!(
        "- [{}] {}: {}",
        event.date.format("%Y-%m-%d"),
        event.event_type.as_str(),
        event.content
    )
}

pub fn dept_monthly(projects: &[Project], events: &[TimelineEvent], start: &str, end: &str) -> Prompt {
    let mut context = format!("Reporting period: {} to {}\n\n", start, end);
    for project in projects {
        let _ = writeln!(context, "Project: {} (status: {})", project.title, project.status.as_str());
        let updates: Vec<&TimelineEvent> = events.iter().filter(|e| e.project_id == project.id).collect();
        if updates.is_empty() {
            context.push_str("No major updates in this period.\n");
        } else {
            context.push_str("Updates in this period:\n");
            for event in updates {
                context.push_str(&event_line(event));
                context.push('\n');
            }
        }
        context.push('\n');
    }

    Prompt {
        system: format!("You are a department project management expert. {}", LANGUAGE),
        user: format!(
            "Using the project data below, write a department project overview report.\n\n\
             Structure:\n\
             1. **Overview**: overall progress this period, conversion of earlier tasks, status of key projects.\n\
             2. **Key project progress**: 3-5 projects with real progress or milestones, in detail.\n\
             3. **Resources and collaboration**: resource investment as far as the updates mention it.\n\
             4. **Risks and warnings**: projects that are stalled or have problems.\n\
             5. **Next steps**: recommendations based on the current state.\n\n\
             Input data:\n{}",
            context
        ),
    }
}

/// Returns `None` when no report mentions the project.
pub fn project_weekly(project: &Project, reports: &[WeeklyReport], week_range: &str) -> Option<Prompt> {
    let mut team_updates = String::new();
    for report in reports {
        if let Some(detail) = report.details.iter().find(|d| d.project_id == project.id) {
            let _ = writeln!(
                team_updates,
                "- Member {}: {} (plan: {})",
                report.username,
                detail.content.as_deref().unwrap_or(""),
                detail.plan.as_deref().unwrap_or("")
            );
        } else if report.linked_project_ids.iter().any(|p| p == &project.id) {
            let _ = writeln!(team_updates, "- Member {}: {}", report.username, report.content);
        }
    }

    if team_updates.is_empty() {
        return None;
    }

    Some(Prompt {
        system: format!("You are the project lead. {}", LANGUAGE),
        user: format!(
            "You lead the project \"{}\". Combine the personal weekly reports of the team into the \
             project weekly report.\nPeriod: {}\n\nTeam updates:\n{}\n\
             Use this template:\n\
             1. **Progress this week**: consolidate what was finished; summarise rather than list.\n\
             2. **Issues**: difficulties or blockers mentioned in the updates.\n\
             3. **Plan for next week**: the combined plans.\n\
             4. **Effort overview**: where the team spent its time.",
            project.title, week_range, team_updates
        ),
    })
}

pub fn project_report(
    project: &Project,
    events: &[TimelineEvent],
    tasks: &[TaskAssignment],
    start: &str,
    end: &str,
) -> Prompt {
    let event_text = if events.is_empty() {
        "No timeline updates in this period.".to_string()
    } else {
        events
            .iter()
            .map(|e| {
                format!(
                    "- [{}] ({}) {}: {}",
                    e.date.format("%Y-%m-%d"),
                    e.event_type.as_str(),
                    e.author_name,
                    e.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let task_text = if tasks.is_empty() {
        "No task progress data yet.".to_string()
    } else {
        tasks
            .iter()
            .map(|t| {
                format!(
                    "- Task \"{}\": progress {}%, status {}, {} assignee(s)",
                    t.title,
                    t.progress,
                    t.status.as_str(),
                    t.assignee_ids.len()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    Prompt {
        system: format!(
            "You are a professional project management assistant. Answer in Markdown. {}",
            LANGUAGE
        ),
        user: format!(
            "Write a progress report for the project \"{title}\".\n\
             Period: {start} to {end}.\n\n\
             Project information:\n\
             - Description: {description}\n\
             - Current status: {status}\n\
             - Customer: {customer}\n\n\
             [Timeline]\n{event_text}\n\n\
             [Tasks]\n{task_text}\n\n\
             Use this structure (Markdown):\n\
             # Project progress report {start} to {end}\n\n\
             ## 1. Executive summary\n\
             ## 2. Detailed progress\n\
             ## 3. Risks and issues\n\
             (based on ISSUE events and tasks that are behind)\n\
             ## 4. Next steps and recommendations",
            title = project.title,
            start = start,
            end = end,
            description = project.description.as_deref().unwrap_or(""),
            status = project.status.as_str(),
            customer = project.customer_name.as_deref().unwrap_or("Internal"),
            event_text = event_text,
            task_text = task_text,
        ),
    }
}

pub fn personal(username: &str, activity: &[ProjectActivity<'_>], inspirations: &[Inspiration]) -> Prompt {
    let mut project_context = String::new();
    for item in activity {
        let _ = write!(
            project_context,
            "\nProject ID: {}\nTitle: {}\nRecent Activity:\n",
            item.project.id, item.project.title
        );
        if item.events.is_empty() && item.tasks.is_empty() {
            project_context.push_str("- No updates recorded in system.\n");
        }
        for event in &item.events {
            let _ = writeln!(project_context, "- (Timeline Event) {}", event.content);
        }
        for task in &item.tasks {
            let _ = writeln!(
                project_context,
                "- (Task) \"{}\": Status {}, Progress {}%",
                task.title,
                task.status.as_str(),
                task.progress
            );
        }
    }

    let inspiration_context = inspirations
        .iter()
        .map(|i| format!("- Shared Idea: {}", i.content))
        .collect::<Vec<_>>()
        .join("\n");

    Prompt {
        system: "You are an AI assistant that outputs valid JSON only.".to_string(),
        user: format!(
            "You are helping employee \"{}\" write their weekly report.\n\
             Based on the following activity logs, generate a JSON object.\n\n\
             DATA:\n{}\n\n\
             INSPIRATIONS/IDEAS SHARED:\n{}\n\n\
             OUTPUT FORMAT (Strict JSON):\n\
             {{\n   \"[PROJECT_ID_1]\": {{\n       \"content\": \"Summarize work done...\",\n       \
             \"plan\": \"Suggest next steps...\"\n   }},\n   \
             \"generalSummary\": \"A brief overall summary of the week.\"\n}}\n\n\
             Language: Chinese (Simplified).\n\
             Output raw JSON only, no markdown formatting.",
            username, project_context, inspiration_context
        ),
    }
}
