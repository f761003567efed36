// goal.rs - Goal subcommands: set, list, status, show.

use chrono::NaiveDate;
use clap::Subcommand;
use pm_goal::GoalStatus;
use pm_service::{GoalView, NewGoal, TrackerError};

use super::{parse_id, truncate, Session};

#[derive(Subcommand)]
pub enum GoalCommands {
    /// Set a goal for one of your employees.
    Set {
        /// The employee's username.
        employee: String,
        /// Goal title (e.g., "Own the release process").
        title: String,
        /// Due date (YYYY-MM-DD).
        #[arg(long)]
        due: NaiveDate,
        /// Longer description.
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List the goals you set or were assigned.
    List {
        /// Filter by status (e.g., "draft", "in_progress").
        #[arg(long)]
        status: Option<GoalStatus>,
    },
    /// Move a goal to a new status.
    Status {
        /// Goal ID.
        id: String,
        /// Target status: in_progress, completed, or cancelled.
        to: GoalStatus,
    },
    /// Show a goal with its tasks and feedback.
    Show {
        /// Goal ID.
        id: String,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

pub fn execute(cmd: &GoalCommands, session: &Session) -> anyhow::Result<()> {
    let actor = session.actor()?;
    let tracker = &session.tracker;

    match cmd {
        GoalCommands::Set {
            employee,
            title,
            due,
            description,
        } => {
            // Only your own reports can be named, so a stranger and a
            // missing username fail the same way.
            let Some(target) = tracker
                .employees_of(&actor, actor.user_id)?
                .into_iter()
                .find(|e| e.username.eq_ignore_ascii_case(employee))
            else {
                return Err(TrackerError::Authorization {
                    reason: format!("{} is not one of your employees", employee),
                }
                .into());
            };
            let goal = tracker.set_goal(
                &actor,
                NewGoal {
                    employee_id: target.user_id,
                    title: title.clone(),
                    description: description.clone(),
                    due_date: *due,
                },
            )?;
            println!("Goal set: {}", goal.goal_id);
            println!("  Title:    {}", goal.title);
            println!("  Employee: {}", target.display_name);
            println!("  Due:      {}", goal.due_date);
            println!("  Status:   {}", goal.status);
            Ok(())
        }
        GoalCommands::List { status } => {
            let goals: Vec<_> = tracker
                .list_goals(&actor)?
                .into_iter()
                .filter(|g| status.map_or(true, |s| g.status == s))
                .collect();

            if goals.is_empty() {
                println!("No goals found.");
                return Ok(());
            }

            println!(
                "{:<38} {:<32} {:<12} {:<10}",
                "ID", "TITLE", "STATUS", "DUE"
            );
            println!("{}", "-".repeat(94));
            for g in &goals {
                println!(
                    "{:<38} {:<32} {:<12} {:<10}",
                    g.goal_id,
                    truncate(&g.title, 30),
                    g.status.to_string(),
                    g.due_date,
                );
            }
            println!("\n{} goal(s) total.", goals.len());
            Ok(())
        }
        GoalCommands::Status { id, to } => {
            let goal_id = parse_id("goal", id)?;
            let goal = session.retrying(|| tracker.change_goal_status(&actor, goal_id, *to))?;
            println!("Goal {} is now {}.", goal.goal_id, goal.status);
            Ok(())
        }
        GoalCommands::Show { id, json } => {
            let goal_id = parse_id("goal", id)?;
            let view = tracker.goal_view(&actor, goal_id)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_goal_view(&view);
            }
            Ok(())
        }
    }
}

/// Shared with `pm dashboard`.
pub fn print_goal_view(view: &GoalView) {
    let g = &view.goal;
    println!("Goal:    {}", g.goal_id);
    println!("Title:   {}", g.title);
    if !g.description.is_empty() {
        println!("Details: {}", g.description);
    }
    println!("Status:  {}", g.status);
    println!("Due:     {}", g.due_date);
    println!("Updated: {}", g.updated_at.to_rfc3339());

    if view.tasks.is_empty() {
        println!("Tasks:   (none)");
    } else {
        println!("Tasks:");
        for t in &view.tasks {
            println!(
                "  {} [{} / {}] {}",
                t.task_id,
                t.status,
                t.progress,
                truncate(&t.description, 48)
            );
        }
    }

    if view.feedback.is_empty() {
        println!("Feedback: (none)");
    } else {
        println!("Feedback:");
        for f in &view.feedback {
            println!("  {}  {}", f.created_at.format("%Y-%m-%d %H:%M"), f.text);
        }
    }
}
