// views.rs - Role-scoped read models.
//
// Pure reads. Each view starts from the actor's own record, so a manager
// only ever sees goals they set and an employee only goals assigned to them.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use pm_goal::{Feedback, Goal, Task};
use pm_identity::{Actor, Role, UserProfile};
use pm_policy::{Action, Resource};

use crate::error::TrackerError;
use crate::tracker::Tracker;

/// A goal with its tasks and feedback.
#[derive(Debug, Clone, Serialize)]
pub struct GoalView {
    pub goal: Goal,
    pub tasks: Vec<Task>,
    pub feedback: Vec<Feedback>,
}

/// One employee's goals inside a manager's dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeGoals {
    pub employee: UserProfile,
    pub goals: Vec<GoalView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagerDashboard {
    pub manager: UserProfile,
    /// Ordered by employee name. Employees without goals are included.
    pub teams: Vec<EmployeeGoals>,
}

impl ManagerDashboard {
    pub fn goal_count(&self) -> usize {
        self.teams.iter().map(|t| t.goals.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmployeeDashboard {
    pub employee: UserProfile,
    pub manager: Option<UserProfile>,
    pub goals: Vec<GoalView>,
}

/// Display name first, username as the tiebreak.
pub(crate) fn by_name(a: &UserProfile, b: &UserProfile) -> Ordering {
    a.display_name
        .to_lowercase()
        .cmp(&b.display_name.to_lowercase())
        .then_with(|| a.username.cmp(&b.username))
}

impl Tracker {
    /// One goal with its tasks and feedback. The goal's manager or employee only.
    pub fn goal_view(&self, actor: &Actor, goal_id: Uuid) -> Result<GoalView, TrackerError> {
        let caller = self.resolve(actor)?.actor();
        let goal = self.repo.goal(goal_id)?;
        self.authorize(&caller, Action::View, Resource::goal(&goal))?;
        self.annotate(goal)
    }

    /// Every goal the manager set, grouped by employee.
    pub fn manager_dashboard(&self, actor: &Actor) -> Result<ManagerDashboard, TrackerError> {
        let manager = self.resolve(actor)?;
        if manager.role != Role::Manager {
            return Err(TrackerError::unauthorized(format!(
                "{} is not a manager",
                manager.username
            )));
        }
        let caller = manager.actor();

        let mut by_employee: BTreeMap<Uuid, Vec<GoalView>> = BTreeMap::new();
        for goal in self.repo.goals_for_manager(manager.user_id)? {
            self.authorize(&caller, Action::View, Resource::goal(&goal))?;
            by_employee
                .entry(goal.employee_id)
                .or_default()
                .push(self.annotate(goal)?);
        }

        // Current reports, plus anyone who still has goals from this manager.
        let mut employees: Vec<UserProfile> = self
            .repo
            .users()?
            .iter()
            .filter(|u| {
                u.role == Role::Employee
                    && (u.manager_id == Some(manager.user_id)
                        || by_employee.contains_key(&u.user_id))
            })
            .map(|u| u.profile())
            .collect();
        employees.sort_by(by_name);

        let teams = employees
            .into_iter()
            .map(|employee| EmployeeGoals {
                goals: by_employee.remove(&employee.user_id).unwrap_or_default(),
                employee,
            })
            .collect();

        Ok(ManagerDashboard {
            manager: manager.profile(),
            teams,
        })
    }

    /// Every goal assigned to the employee, plus their current manager.
    pub fn employee_dashboard(&self, actor: &Actor) -> Result<EmployeeDashboard, TrackerError> {
        let employee = self.resolve(actor)?;
        if employee.role != Role::Employee {
            return Err(TrackerError::unauthorized(format!(
                "{} is not an employee",
                employee.username
            )));
        }
        let caller = employee.actor();

        let manager = match employee.manager_id {
            Some(id) => Some(self.repo.user(id)?.profile()),
            None => None,
        };

        let mut goals = Vec::new();
        for goal in self.repo.goals_for_employee(employee.user_id)? {
            self.authorize(&caller, Action::View, Resource::goal(&goal))?;
            goals.push(self.annotate(goal)?);
        }

        Ok(EmployeeDashboard {
            employee: employee.profile(),
            manager,
            goals,
        })
    }

    fn annotate(&self, goal: Goal) -> Result<GoalView, TrackerError> {
        let tasks = self.repo.tasks_for_goal(goal.goal_id)?;
        let feedback = self.repo.feedback_for_goal(goal.goal_id)?;
        Ok(GoalView {
            goal,
            tasks,
            feedback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(username: &str, display: &str) -> UserProfile {
        UserProfile {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: display.to_string(),
            role: Role::Employee,
            manager_id: None,
        }
    }

    #[test]
    fn name_order_ignores_case_then_breaks_ties() {
        let mut people = vec![
            profile("zed", "bea"),
            profile("amy", "Bea"),
            profile("al", "Adam"),
        ];
        people.sort_by(by_name);
        let names: Vec<&str> = people.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, vec!["al", "amy", "zed"]);
    }
}
