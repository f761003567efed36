//! # pm-cli
//!
//! Command-line interface for the performance tracker.
//!
//! - `pm user add/passwd`: provision accounts, rotate credentials
//! - `pm team` / `pm manager`: who reports to whom
//! - `pm goal set/list/status/show`: manager-set goals
//! - `pm task add/approve/reject/progress/list`: employee-proposed tasks
//! - `pm feedback add/list`: append-only manager feedback
//! - `pm dashboard`: the role-scoped overview
//! - `pm verify`: check the feedback log's hash chain

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::Session;

/// Performance tracker: goals, tasks, and feedback between managers and employees.
#[derive(Parser)]
#[command(name = "pm", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".", global = true)]
    project_root: PathBuf,

    /// Username to act as.
    #[arg(long, env = "PM_USER", global = true)]
    user: Option<String>,

    /// Credential for --user.
    #[arg(long, env = "PM_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision users and rotate credentials.
    User {
        #[command(subcommand)]
        command: commands::user::UserCommands,
    },
    /// List the employees reporting to you.
    Team,
    /// Show your manager.
    Manager,
    /// Set and track goals.
    Goal {
        #[command(subcommand)]
        command: commands::goal::GoalCommands,
    },
    /// Propose, review, and progress tasks.
    Task {
        #[command(subcommand)]
        command: commands::task::TaskCommands,
    },
    /// Add and read goal feedback.
    Feedback {
        #[command(subcommand)]
        command: commands::feedback::FeedbackCommands,
    },
    /// Show everything you take part in.
    Dashboard {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Verify the feedback log hash chain.
    Verify,
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't mix with command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("pm_service=info".parse()?)
                .add_directive("pm_cli=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let session = Session::open(&project_root, cli.user, cli.password)?;

    match &cli.command {
        Commands::User { command } => commands::user::execute(command, &session),
        Commands::Team => commands::user::show_team(&session),
        Commands::Manager => commands::user::show_manager(&session),
        Commands::Goal { command } => commands::goal::execute(command, &session),
        Commands::Task { command } => commands::task::execute(command, &session),
        Commands::Feedback { command } => commands::feedback::execute(command, &session),
        Commands::Dashboard { json } => commands::dashboard::execute(&session, *json),
        Commands::Verify => commands::verify::execute(&session),
    }
}
