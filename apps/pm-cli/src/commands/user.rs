// user.rs - User subcommands: add, passwd. Plus `pm team` and `pm manager`.

use clap::Subcommand;
use pm_identity::Role;

use super::Session;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Provision a new account.
    Add {
        /// Login name.
        username: String,
        /// "manager" or "employee".
        #[arg(long)]
        role: Role,
        /// Username of the employee's manager (employees only).
        #[arg(long)]
        manager: Option<String>,
        /// Name shown in listings (defaults to the username).
        #[arg(long)]
        display_name: Option<String>,
        /// Initial credential for the new account.
        #[arg(long, env = "PM_NEW_PASSWORD", hide_env_values = true)]
        credential: String,
    },
    /// Change your own credential. --password must be the current one.
    Passwd {
        /// The new credential.
        #[arg(long, env = "PM_NEW_PASSWORD", hide_env_values = true)]
        new: String,
    },
}

pub fn execute(cmd: &UserCommands, session: &Session) -> anyhow::Result<()> {
    match cmd {
        UserCommands::Add {
            username,
            role,
            manager,
            display_name,
            credential,
        } => {
            let profile = session.tracker.provision_user(
                username,
                credential,
                *role,
                manager.as_deref(),
                display_name.as_deref(),
            )?;
            println!("User created: {}", profile.user_id);
            println!("  Username: {}", profile.username);
            println!("  Name:     {}", profile.display_name);
            println!("  Role:     {}", profile.role);
            if let Some(m) = manager {
                println!("  Manager:  {}", m);
            }
            Ok(())
        }
        UserCommands::Passwd { new } => {
            let actor = session.actor()?;
            let current = session.password().unwrap_or_default();
            session.tracker.rotate_credential(&actor, current, new)?;
            println!("Credential updated for {}.", actor.username);
            Ok(())
        }
    }
}

pub fn show_team(session: &Session) -> anyhow::Result<()> {
    let actor = session.actor()?;
    let team = session.tracker.employees_of(&actor, actor.user_id)?;

    if team.is_empty() {
        println!("No employees report to {}.", actor.username);
        return Ok(());
    }

    println!("{:<38} {:<20} {:<24}", "ID", "USERNAME", "NAME");
    println!("{}", "-".repeat(82));
    for e in &team {
        println!(
            "{:<38} {:<20} {:<24}",
            e.user_id,
            super::truncate(&e.username, 18),
            super::truncate(&e.display_name, 22),
        );
    }
    println!("\n{} employee(s).", team.len());
    Ok(())
}

pub fn show_manager(session: &Session) -> anyhow::Result<()> {
    let actor = session.actor()?;
    match session.tracker.manager_of(&actor, actor.user_id)? {
        Some(m) => {
            println!("Manager: {} ({})", m.display_name, m.username);
            println!("ID:      {}", m.user_id);
        }
        None => {
            if actor.role == Role::Manager {
                println!("{} is a manager and reports to no one.", actor.username);
            } else {
                println!("No manager on record for {}.", actor.username);
            }
        }
    }
    Ok(())
}
