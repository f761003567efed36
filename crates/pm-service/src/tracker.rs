// tracker.rs - The operations façade.
//
// Every mutating call follows the same order:
//   1. re-resolve the actor from the store
//   2. load the target and authorize against it
//   3. apply the lifecycle rule to a copy
//   4. write it back conditioned on the state observed in step 2
//   5. dispatch the lifecycle event
//
// Nothing is written until steps 1-3 pass.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use pm_goal::{
    EventDispatcher, Feedback, Goal, GoalStatus, LogSink, PmEvent, ReviewDecision, Task,
    TaskProgress,
};
use pm_identity::{Actor, Role, User, UserProfile};
use pm_policy::{Action, PolicyEngine, PolicyRequest, Resource};
use pm_store::{JsonFileRepository, Repository, StoreError, TaskState};

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::views::by_name;

/// Input for [`Tracker::set_goal`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoal {
    pub employee_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: NaiveDate,
}

pub struct Tracker {
    pub(crate) repo: Arc<dyn Repository>,
    pub(crate) policy: PolicyEngine,
    events: EventDispatcher,
}

impl Tracker {
    /// A tracker over `repo` with no event sinks.
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            repo,
            policy: PolicyEngine::new(),
            events: EventDispatcher::new(),
        }
    }

    pub fn with_dispatcher(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    /// Open the file-backed store described by `config`.
    pub fn open(config: &TrackerConfig) -> Result<Self, TrackerError> {
        let repo = JsonFileRepository::open(
            &config.users_dir,
            &config.goals_dir,
            &config.tasks_dir,
            &config.feedback_log,
            &config.lock_file,
        )?;
        let mut events = EventDispatcher::new();
        if config.log_events {
            events.add_sink(Box::new(LogSink::new(&config.events_log)));
        }
        Ok(Self::new(Arc::new(repo)).with_dispatcher(events))
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    // ── Identity ─────────────────────────────────────────────────

    /// Create an account. Employees must name an existing manager by
    /// username; managers must not name one. The display name defaults to
    /// the username.
    pub fn provision_user(
        &self,
        username: &str,
        credential: &str,
        role: Role,
        manager: Option<&str>,
        display_name: Option<&str>,
    ) -> Result<UserProfile, TrackerError> {
        let user = match (role, manager) {
            (Role::Manager, None) => User::new_manager(username, credential)?,
            (Role::Manager, Some(_)) => {
                return Err(TrackerError::invalid(
                    "manager",
                    "managers do not report to a manager",
                ))
            }
            (Role::Employee, None) => {
                return Err(TrackerError::invalid(
                    "manager",
                    "employees must name their manager",
                ))
            }
            (Role::Employee, Some(manager_name)) => {
                let boss = self.repo.user_by_username(manager_name)?.ok_or_else(|| {
                    TrackerError::NotFound {
                        entity: "manager",
                        id: manager_name.to_string(),
                    }
                })?;
                User::new_employee(username, credential, &boss)?
            }
        };
        let user = match display_name {
            Some(name) => user.with_display_name(name),
            None => user,
        };

        let stored = self.repo.insert_user(&user)?;
        tracing::info!(
            user_id = %stored.user_id,
            username = %stored.username,
            role = %stored.role,
            "user provisioned"
        );
        Ok(stored.profile())
    }

    /// Check a username/credential pair and return the request-scoped actor.
    pub fn login(&self, username: &str, credential: &str) -> Result<Actor, TrackerError> {
        let user = self.repo.user_by_username(username.trim())?;
        let accepted = match &user {
            Some(user) => user.verify_credential(credential),
            None => pm_identity::verify_unknown_user(credential),
        };
        let user = match user {
            Some(user) if accepted => user,
            _ => {
                tracing::warn!(username = %username.trim(), "login failed");
                return Err(TrackerError::InvalidCredentials);
            }
        };
        tracing::debug!(user_id = %user.user_id, "login succeeded");
        Ok(user.actor())
    }

    /// Replace the actor's own credential after checking the current one.
    pub fn rotate_credential(
        &self,
        actor: &Actor,
        current: &str,
        new_credential: &str,
    ) -> Result<(), TrackerError> {
        let mut user = self.resolve(actor)?;
        if !user.verify_credential(current) {
            return Err(TrackerError::InvalidCredentials);
        }
        let observed = user.credential_hash.clone();
        user.rotate_credential(new_credential)?;
        self.repo
            .update_credential(user.user_id, &observed, &user.credential_hash)?;
        tracing::info!(user_id = %user.user_id, "credential rotated");
        Ok(())
    }

    /// Employees reporting to `manager_id`, ordered by name. Only that
    /// manager may ask.
    pub fn employees_of(
        &self,
        actor: &Actor,
        manager_id: Uuid,
    ) -> Result<Vec<UserProfile>, TrackerError> {
        let caller = self.resolve(actor)?;
        if caller.role != Role::Manager || caller.user_id != manager_id {
            return Err(TrackerError::unauthorized(format!(
                "{} may only list their own employees",
                caller.username
            )));
        }
        let mut team: Vec<UserProfile> = self
            .repo
            .users()?
            .iter()
            .filter(|u| u.role == Role::Employee && u.manager_id == Some(manager_id))
            .map(User::profile)
            .collect();
        team.sort_by(by_name);
        Ok(team)
    }

    /// The current manager of `employee_id`. The employee and that manager
    /// may ask; a manager's own lookup returns `None`.
    pub fn manager_of(
        &self,
        actor: &Actor,
        employee_id: Uuid,
    ) -> Result<Option<UserProfile>, TrackerError> {
        let caller = self.resolve(actor)?;
        let subject = self.repo.user(employee_id)?;
        let manager_id = match subject.manager_id {
            Some(id) => id,
            None if caller.user_id == subject.user_id => return Ok(None),
            None => {
                return Err(TrackerError::unauthorized(format!(
                    "{} has no manager to look up",
                    subject.username
                )))
            }
        };
        if caller.user_id != subject.user_id && caller.user_id != manager_id {
            return Err(TrackerError::unauthorized(format!(
                "{} is not {} or their manager",
                caller.username, subject.username
            )));
        }
        Ok(Some(self.repo.user(manager_id)?.profile()))
    }

    // ── Goals ────────────────────────────────────────────────────

    /// Goals the actor takes part in: set by them (manager) or assigned to
    /// them (employee). Oldest first.
    pub fn list_goals(&self, actor: &Actor) -> Result<Vec<Goal>, TrackerError> {
        let caller = self.resolve(actor)?.actor();
        let goals = match caller.role {
            Role::Manager => self.repo.goals_for_manager(caller.user_id)?,
            Role::Employee => self.repo.goals_for_employee(caller.user_id)?,
        };
        Ok(goals
            .into_iter()
            .filter(|g| {
                self.policy
                    .evaluate(&PolicyRequest::new(&caller, Action::View, Resource::goal(g)))
                    .is_allowed()
            })
            .collect())
    }

    /// Create a goal in `Draft` for one of the actor's employees.
    pub fn set_goal(&self, actor: &Actor, new: NewGoal) -> Result<Goal, TrackerError> {
        let caller = self.resolve(actor)?.actor();
        let employee = self.repo.user(new.employee_id).map_err(|e| match e {
            StoreError::NotFound { id, .. } => TrackerError::NotFound {
                entity: "employee",
                id,
            },
            other => other.into(),
        })?;
        self.authorize(&caller, Action::CreateGoal, Resource::employee(&employee))?;

        let goal = Goal::new(
            employee.user_id,
            caller.user_id,
            &new.title,
            &new.description,
            new.due_date,
        )?;
        let goal = self.repo.insert_goal(&goal)?;

        self.events.dispatch(&PmEvent::goal_created(&goal));
        tracing::info!(
            goal_id = %goal.goal_id,
            employee = %employee.username,
            actor = %caller,
            "goal created"
        );
        Ok(goal)
    }

    /// Move a goal along its lifecycle. Only the goal's manager may.
    pub fn change_goal_status(
        &self,
        actor: &Actor,
        goal_id: Uuid,
        next: GoalStatus,
    ) -> Result<Goal, TrackerError> {
        let caller = self.resolve(actor)?.actor();
        let goal = self.repo.goal(goal_id)?;
        self.authorize(&caller, Action::ChangeGoalStatus, Resource::goal(&goal))?;

        let observed = goal.status;
        let mut updated = goal;
        updated.transition(next)?;
        let updated = self.repo.update_goal(&updated, observed)?;

        self.events
            .dispatch(&PmEvent::goal_status_changed(goal_id, observed, next));
        tracing::info!(
            goal_id = %goal_id,
            from = %observed,
            to = %next,
            actor = %caller,
            "goal status changed"
        );
        Ok(updated)
    }

    // ── Tasks ────────────────────────────────────────────────────

    /// Propose a task under an open goal. Only the goal's employee may.
    pub fn create_task(
        &self,
        actor: &Actor,
        goal_id: Uuid,
        description: &str,
    ) -> Result<Task, TrackerError> {
        let caller = self.resolve(actor)?.actor();
        let goal = self.repo.goal(goal_id)?;
        self.authorize(&caller, Action::CreateTask, Resource::goal(&goal))?;

        let task = Task::new(&goal, description)?;
        let task = self.repo.insert_task(&task, goal.status)?;

        self.events.dispatch(&PmEvent::task_created(&task));
        tracing::info!(
            task_id = %task.task_id,
            goal_id = %goal_id,
            actor = %caller,
            "task proposed"
        );
        Ok(task)
    }

    /// Approve or reject a pending task. Only the parent goal's manager may.
    pub fn review_task(
        &self,
        actor: &Actor,
        task_id: Uuid,
        decision: ReviewDecision,
    ) -> Result<Task, TrackerError> {
        let caller = self.resolve(actor)?.actor();
        let (task, goal) = self.task_with_goal(task_id)?;
        self.authorize(&caller, Action::ReviewTask, Resource::task(&task, &goal))?;

        let observed = TaskState::from(&task);
        let mut updated = task;
        updated.review(&goal, decision)?;
        let updated = self.repo.update_task(&updated, observed, goal.status)?;

        self.events.dispatch(&PmEvent::task_reviewed(&updated));
        tracing::info!(
            task_id = %task_id,
            status = %updated.status,
            actor = %caller,
            "task reviewed"
        );
        Ok(updated)
    }

    /// Advance an approved task's progress by one step. Only the parent
    /// goal's employee may.
    pub fn update_task_progress(
        &self,
        actor: &Actor,
        task_id: Uuid,
        next: TaskProgress,
    ) -> Result<Task, TrackerError> {
        let caller = self.resolve(actor)?.actor();
        let (task, goal) = self.task_with_goal(task_id)?;
        self.authorize(
            &caller,
            Action::UpdateTaskProgress,
            Resource::task(&task, &goal),
        )?;

        let observed = TaskState::from(&task);
        let mut updated = task;
        updated.advance(&goal, next)?;
        let updated = self.repo.update_task(&updated, observed, goal.status)?;

        self.events
            .dispatch(&PmEvent::task_progressed(&updated, observed.progress));
        tracing::info!(
            task_id = %task_id,
            from = %observed.progress,
            to = %next,
            actor = %caller,
            "task progress updated"
        );
        Ok(updated)
    }

    /// Tasks under a goal, oldest first. The goal's manager or employee only.
    pub fn list_tasks(&self, actor: &Actor, goal_id: Uuid) -> Result<Vec<Task>, TrackerError> {
        let caller = self.resolve(actor)?.actor();
        let goal = self.repo.goal(goal_id)?;
        self.authorize(&caller, Action::View, Resource::goal(&goal))?;
        Ok(self.repo.tasks_for_goal(goal_id)?)
    }

    // ── Feedback ─────────────────────────────────────────────────

    /// Append feedback to a goal. Only the goal's manager may. Closed goals
    /// still accept feedback.
    pub fn add_feedback(
        &self,
        actor: &Actor,
        goal_id: Uuid,
        text: &str,
    ) -> Result<Feedback, TrackerError> {
        let caller = self.resolve(actor)?.actor();
        let goal = self.repo.goal(goal_id)?;
        self.authorize(&caller, Action::AddFeedback, Resource::goal(&goal))?;

        let feedback = Feedback::new(&goal, text)?;
        let feedback = self.repo.append_feedback(&feedback)?;

        self.events.dispatch(&PmEvent::feedback_added(&feedback));
        tracing::info!(
            feedback_id = %feedback.feedback_id,
            goal_id = %goal_id,
            actor = %caller,
            "feedback added"
        );
        Ok(feedback)
    }

    /// Feedback on a goal in append order. The goal's manager or employee only.
    pub fn list_feedback(
        &self,
        actor: &Actor,
        goal_id: Uuid,
    ) -> Result<Vec<Feedback>, TrackerError> {
        let caller = self.resolve(actor)?.actor();
        let goal = self.repo.goal(goal_id)?;
        self.authorize(&caller, Action::View, Resource::goal(&goal))?;
        Ok(self.repo.feedback_for_goal(goal_id)?)
    }

    // ── Internals ────────────────────────────────────────────────

    /// Load the actor's stored record. A caller-supplied role or username
    /// that disagrees with the store is refused.
    pub(crate) fn resolve(&self, actor: &Actor) -> Result<User, TrackerError> {
        let user = match self.repo.user(actor.user_id) {
            Ok(user) => user,
            Err(StoreError::NotFound { .. }) => {
                return Err(TrackerError::unauthorized(format!(
                    "unknown actor {}",
                    actor.user_id
                )))
            }
            Err(e) => return Err(e.into()),
        };
        if user.role != actor.role || user.username != actor.username {
            tracing::warn!(
                user_id = %actor.user_id,
                claimed = %actor,
                "actor does not match stored user"
            );
            return Err(TrackerError::unauthorized(format!(
                "actor {} does not match the stored account",
                actor
            )));
        }
        Ok(user)
    }

    pub(crate) fn authorize(
        &self,
        actor: &Actor,
        action: Action,
        resource: Resource,
    ) -> Result<(), TrackerError> {
        self.policy
            .authorize(&PolicyRequest::new(actor, action, resource))?;
        Ok(())
    }

    fn task_with_goal(&self, task_id: Uuid) -> Result<(Task, Goal), TrackerError> {
        let task = self.repo.task(task_id)?;
        let goal = self.repo.goal(task.goal_id)?;
        Ok((task, goal))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or has been
/// attempted `max_attempts` times. `op` must refetch what it reads.
pub fn with_retry<T>(
    max_attempts: u32,
    mut op: impl FnMut() -> Result<T, TrackerError>,
) -> Result<T, TrackerError> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(attempt, max_attempts, "retrying after conflict: {}", e);
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pm_store::MemoryRepository;

    fn tracker() -> Tracker {
        Tracker::new(Arc::new(MemoryRepository::new()))
    }

    #[test]
    fn login_does_not_distinguish_unknown_user_from_bad_credential() {
        let t = tracker();
        t.provision_user("mia", "secret", Role::Manager, None, None).unwrap();

        let unknown = t.login("nobody", "secret").unwrap_err();
        let wrong = t.login("mia", "guess").unwrap_err();
        assert!(matches!(unknown, TrackerError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());

        let actor = t.login("mia", "secret").unwrap();
        assert_eq!(actor.role, Role::Manager);
    }

    #[test]
    fn unknown_username_pays_for_a_full_verification() {
        use std::time::Instant;

        let t = tracker();
        t.provision_user("mia", "secret", Role::Manager, None, None).unwrap();

        let started = Instant::now();
        t.login("mia", "guess").unwrap_err();
        let wrong_credential = started.elapsed();

        let started = Instant::now();
        t.login("nobody", "guess").unwrap_err();
        let unknown_user = started.elapsed();

        assert!(
            unknown_user * 4 >= wrong_credential,
            "unknown user answered in {:?}, wrong credential in {:?}",
            unknown_user,
            wrong_credential
        );
    }

    #[test]
    fn provisioning_checks_manager_link() {
        let t = tracker();
        assert!(matches!(
            t.provision_user("eli", "pw", Role::Employee, None, None),
            Err(TrackerError::Validation { .. })
        ));
        assert!(matches!(
            t.provision_user("eli", "pw", Role::Employee, Some("ghost"), None),
            Err(TrackerError::NotFound { entity: "manager", .. })
        ));
        t.provision_user("mia", "pw", Role::Manager, None, None).unwrap();
        assert!(matches!(
            t.provision_user("max", "pw", Role::Manager, Some("mia"), None),
            Err(TrackerError::Validation { .. })
        ));
        assert!(matches!(
            t.provision_user("mia", "pw", Role::Manager, None, None),
            Err(TrackerError::Validation { .. })
        ));
        assert!(matches!(
            t.provision_user("eli", "", Role::Employee, Some("mia"), None),
            Err(TrackerError::Validation { .. })
        ));
    }

    #[test]
    fn forged_role_is_refused() {
        let t = tracker();
        t.provision_user("mia", "pw", Role::Manager, None, None).unwrap();
        t.provision_user("eli", "pw", Role::Employee, Some("mia"), None)
            .unwrap();
        let mut forged = t.login("eli", "pw").unwrap();
        forged.role = Role::Manager;
        assert!(matches!(
            t.list_goals(&forged),
            Err(TrackerError::Authorization { .. })
        ));
    }

    #[test]
    fn rotate_requires_current_credential() {
        let t = tracker();
        t.provision_user("mia", "old", Role::Manager, None, None).unwrap();
        let mia = t.login("mia", "old").unwrap();

        assert!(matches!(
            t.rotate_credential(&mia, "wrong", "new"),
            Err(TrackerError::InvalidCredentials)
        ));
        t.rotate_credential(&mia, "old", "new").unwrap();
        assert!(t.login("mia", "old").is_err());
        assert!(t.login("mia", "new").is_ok());
    }

    #[test]
    fn team_listing_is_ordered_and_scoped() {
        let t = tracker();
        let mia = t.provision_user("mia", "pw", Role::Manager, None, None).unwrap();
        let omar = t.provision_user("omar", "pw", Role::Manager, None, None).unwrap();
        t.provision_user("zoe", "pw", Role::Employee, Some("mia"), None).unwrap();
        t.provision_user("ann", "pw", Role::Employee, Some("mia"), None).unwrap();
        t.provision_user("bob", "pw", Role::Employee, Some("omar"), None).unwrap();

        let mia_actor = t.login("mia", "pw").unwrap();
        let names: Vec<String> = t
            .employees_of(&mia_actor, mia.user_id)
            .unwrap()
            .into_iter()
            .map(|p| p.username)
            .collect();
        assert_eq!(names, vec!["ann", "zoe"]);

        assert!(matches!(
            t.employees_of(&mia_actor, omar.user_id),
            Err(TrackerError::Authorization { .. })
        ));
    }

    #[test]
    fn manager_of_visible_to_both_parties_only() {
        let t = tracker();
        let mia = t.provision_user("mia", "pw", Role::Manager, None, None).unwrap();
        t.provision_user("omar", "pw", Role::Manager, None, None).unwrap();
        let eli = t.provision_user("eli", "pw", Role::Employee, Some("mia"), None).unwrap();

        let eli_actor = t.login("eli", "pw").unwrap();
        let found = t.manager_of(&eli_actor, eli.user_id).unwrap().unwrap();
        assert_eq!(found.user_id, mia.user_id);

        let mia_actor = t.login("mia", "pw").unwrap();
        assert!(t.manager_of(&mia_actor, eli.user_id).unwrap().is_some());
        assert!(t.manager_of(&mia_actor, mia.user_id).unwrap().is_none());

        let omar_actor = t.login("omar", "pw").unwrap();
        assert!(matches!(
            t.manager_of(&omar_actor, eli.user_id),
            Err(TrackerError::Authorization { .. })
        ));
    }

    #[test]
    fn retry_gives_up_after_limit() {
        let mut calls = 0;
        let result: Result<(), TrackerError> = with_retry(3, || {
            calls += 1;
            Err(TrackerError::ConcurrentModification {
                entity: "goal",
                id: "g".to_string(),
            })
        });
        assert!(matches!(
            result,
            Err(TrackerError::ConcurrentModification { .. })
        ));
        assert_eq!(calls, 3);
    }

    #[test]
    fn retry_stops_on_non_retryable() {
        let mut calls = 0;
        let result: Result<(), TrackerError> = with_retry(5, || {
            calls += 1;
            Err(TrackerError::InvalidCredentials)
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn retry_returns_first_success() {
        let mut calls = 0;
        let result = with_retry(3, || {
            calls += 1;
            if calls < 2 {
                Err(TrackerError::ConcurrentModification {
                    entity: "task",
                    id: "t".to_string(),
                })
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result.unwrap(), 2);
    }
}
