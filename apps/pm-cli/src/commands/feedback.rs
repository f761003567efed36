// feedback.rs - Feedback subcommands: add, list.

use clap::Subcommand;

use super::{parse_id, Session};

#[derive(Subcommand)]
pub enum FeedbackCommands {
    /// Append feedback to a goal you set.
    Add {
        /// Goal ID.
        goal: String,
        /// The feedback text.
        text: String,
    },
    /// Show all feedback on a goal, oldest first.
    List {
        /// Goal ID.
        goal: String,
    },
}

pub fn execute(cmd: &FeedbackCommands, session: &Session) -> anyhow::Result<()> {
    let actor = session.actor()?;

    match cmd {
        FeedbackCommands::Add { goal, text } => {
            let goal_id = parse_id("goal", goal)?;
            let fb = session.tracker.add_feedback(&actor, goal_id, text)?;
            println!("Feedback recorded: {}", fb.feedback_id);
        }
        FeedbackCommands::List { goal } => {
            let goal_id = parse_id("goal", goal)?;
            let entries = session.tracker.list_feedback(&actor, goal_id)?;
            if entries.is_empty() {
                println!("No feedback on goal {}.", goal_id);
                return Ok(());
            }
            for fb in &entries {
                println!("{}  {}", fb.created_at.to_rfc3339(), fb.text);
            }
            println!("\n{} feedback entry(ies).", entries.len());
        }
    }
    Ok(())
}
