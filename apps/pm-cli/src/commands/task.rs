// task.rs - Task subcommands: add, approve, reject, progress, list.

use clap::Subcommand;
use pm_goal::{ReviewDecision, TaskProgress};
use pm_identity::Actor;

use super::{parse_id, truncate, Session};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Propose a task under one of your goals.
    Add {
        /// Goal ID.
        goal: String,
        /// What you plan to do.
        description: String,
    },
    /// Approve a pending task.
    Approve {
        /// Task ID.
        id: String,
    },
    /// Reject a pending task.
    Reject {
        /// Task ID.
        id: String,
    },
    /// Advance an approved task to the next stage.
    Progress {
        /// Task ID.
        id: String,
        /// Target stage: in_progress or completed.
        to: TaskProgress,
    },
    /// List the tasks under a goal.
    List {
        /// Goal ID.
        goal: String,
    },
}

pub fn execute(cmd: &TaskCommands, session: &Session) -> anyhow::Result<()> {
    let actor = session.actor()?;
    let tracker = &session.tracker;

    match cmd {
        TaskCommands::Add { goal, description } => {
            let goal_id = parse_id("goal", goal)?;
            let task = session.retrying(|| tracker.create_task(&actor, goal_id, description))?;
            println!("Task proposed: {}", task.task_id);
            println!("  Status: {} (awaiting review)", task.status);
            Ok(())
        }
        TaskCommands::Approve { id } => review(session, &actor, id, ReviewDecision::Approve),
        TaskCommands::Reject { id } => review(session, &actor, id, ReviewDecision::Reject),
        TaskCommands::Progress { id, to } => {
            let task_id = parse_id("task", id)?;
            let task =
                session.retrying(|| tracker.update_task_progress(&actor, task_id, *to))?;
            println!("Task {} is now {}.", task.task_id, task.progress);
            Ok(())
        }
        TaskCommands::List { goal } => {
            let goal_id = parse_id("goal", goal)?;
            let tasks = tracker.list_tasks(&actor, goal_id)?;

            if tasks.is_empty() {
                println!("No tasks under goal {}.", goal_id);
                return Ok(());
            }

            println!(
                "{:<38} {:<36} {:<10} {:<12}",
                "ID", "DESCRIPTION", "STATUS", "PROGRESS"
            );
            println!("{}", "-".repeat(98));
            for t in &tasks {
                println!(
                    "{:<38} {:<36} {:<10} {:<12}",
                    t.task_id,
                    truncate(&t.description, 34),
                    t.status.to_string(),
                    t.progress.to_string(),
                );
            }
            println!("\n{} task(s) total.", tasks.len());
            Ok(())
        }
    }
}

fn review(
    session: &Session,
    actor: &Actor,
    id: &str,
    decision: ReviewDecision,
) -> anyhow::Result<()> {
    let task_id = parse_id("task", id)?;
    let task = session.retrying(|| session.tracker.review_task(actor, task_id, decision))?;
    println!("Task {} {}.", task.task_id, task.status);
    Ok(())
}
