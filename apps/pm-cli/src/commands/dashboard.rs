// dashboard.rs - `pm dashboard`: the role-scoped overview.

use pm_identity::Role;

use super::goal::print_goal_view;
use super::Session;

pub fn execute(session: &Session, json: bool) -> anyhow::Result<()> {
    let actor = session.actor()?;

    match actor.role {
        Role::Manager => {
            let board = session.tracker.manager_dashboard(&actor)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&board)?);
                return Ok(());
            }
            println!("Dashboard for {}", board.manager.display_name);
            if board.teams.is_empty() {
                println!("\nNo employees report to you yet.");
                return Ok(());
            }
            for team in &board.teams {
                println!();
                println!(
                    "== {} ({}): {} goal(s)",
                    team.employee.display_name,
                    team.employee.username,
                    team.goals.len()
                );
                for view in &team.goals {
                    println!();
                    print_goal_view(view);
                }
            }
            println!(
                "\n{} goal(s) across {} employee(s).",
                board.goal_count(),
                board.teams.len()
            );
        }
        Role::Employee => {
            let board = session.tracker.employee_dashboard(&actor)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&board)?);
                return Ok(());
            }
            println!("Dashboard for {}", board.employee.display_name);
            match &board.manager {
                Some(m) => println!("Manager: {}", m.display_name),
                None => println!("Manager: (none on record)"),
            }
            if board.goals.is_empty() {
                println!("\nNo goals assigned yet.");
                return Ok(());
            }
            for view in &board.goals {
                println!();
                print_goal_view(view);
            }
        }
    }
    Ok(())
}
