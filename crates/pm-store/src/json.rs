// json.rs - File-backed repository.
//
// Layout under the configured directories:
//   users/<user_id>.json
//   goals/<goal_id>.json
//   tasks/<task_id>.json
//   feedback.jsonl            (hash-chained, append-only)
//   lock                      (flock target)
//
// Records are written to a temp file and renamed into place, so readers
// never see a half-written file. Every read-check-write runs under an
// exclusive lock on the lock file, so the compare-and-set holds across
// processes as well as threads.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use pm_goal::{Feedback, Goal, GoalStatus, Task};
use pm_identity::User;

use crate::error::StoreError;
use crate::feedback_log::FeedbackLog;
use crate::flock::StoreLock;
use crate::repository::{self, Repository, TaskState};

/// Persistent repository: one JSON file per record.
pub struct JsonFileRepository {
    users_dir: PathBuf,
    goals_dir: PathBuf,
    tasks_dir: PathBuf,
    feedback_path: PathBuf,
    lock_path: PathBuf,
    log: FeedbackLog,
}

impl JsonFileRepository {
    /// Open a repository over explicit directories, creating them if needed.
    pub fn open(
        users_dir: impl AsRef<Path>,
        goals_dir: impl AsRef<Path>,
        tasks_dir: impl AsRef<Path>,
        feedback_log: impl AsRef<Path>,
        lock_file: impl AsRef<Path>,
    ) -> Result<Self, StoreError> {
        let users_dir = users_dir.as_ref().to_path_buf();
        let goals_dir = goals_dir.as_ref().to_path_buf();
        let tasks_dir = tasks_dir.as_ref().to_path_buf();
        let feedback_path = feedback_log.as_ref().to_path_buf();
        let lock_path = lock_file.as_ref().to_path_buf();

        for dir in [&users_dir, &goals_dir, &tasks_dir] {
            fs::create_dir_all(dir).map_err(|source| StoreError::io(dir, source))?;
        }
        for file in [&feedback_path, &lock_path] {
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent).map_err(|source| StoreError::io(parent, source))?;
            }
        }
        let log = FeedbackLog::open(&feedback_path)?;

        Ok(Self {
            users_dir,
            goals_dir,
            tasks_dir,
            feedback_path,
            lock_path,
            log,
        })
    }

    /// Open a repository with the standard layout under `root`.
    pub fn in_dir(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref();
        Self::open(
            root.join("users"),
            root.join("goals"),
            root.join("tasks"),
            root.join("feedback.jsonl"),
            root.join("lock"),
        )
    }

    pub fn feedback_log_path(&self) -> &Path {
        &self.feedback_path
    }

    fn lock(&self) -> Result<StoreLock, StoreError> {
        StoreLock::acquire(&self.lock_path)
    }

    fn load_goal(&self, goal_id: Uuid) -> Result<Goal, StoreError> {
        read_record(&self.goals_dir, goal_id)?.ok_or_else(|| StoreError::not_found("goal", goal_id))
    }

    fn load_goals(&self, keep: impl Fn(&Goal) -> bool) -> Result<Vec<Goal>, StoreError> {
        let mut goals: Vec<Goal> = read_all(&self.goals_dir)?;
        goals.retain(|g| keep(g));
        goals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.goal_id.cmp(&b.goal_id)));
        Ok(goals)
    }
}

impl Repository for JsonFileRepository {
    fn insert_user(&self, user: &User) -> Result<User, StoreError> {
        let _guard = self.lock()?;
        let existing: Vec<User> = read_all(&self.users_dir)?;
        repository::check_new_user(&existing, user)?;
        write_record(&self.users_dir, user.user_id, user)?;
        tracing::debug!(user = %user.username, "user record written");
        Ok(user.clone())
    }

    fn user(&self, user_id: Uuid) -> Result<User, StoreError> {
        read_record(&self.users_dir, user_id)?.ok_or_else(|| StoreError::not_found("user", user_id))
    }

    fn user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let users: Vec<User> = read_all(&self.users_dir)?;
        Ok(users
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(username)))
    }

    fn users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = read_all(&self.users_dir)?;
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }

    fn update_credential(
        &self,
        user_id: Uuid,
        expected_hash: &str,
        new_hash: &str,
    ) -> Result<User, StoreError> {
        let _guard = self.lock()?;
        let mut user = self.user(user_id)?;
        repository::check_credential(&user, expected_hash)?;
        user.credential_hash = new_hash.to_string();
        write_record(&self.users_dir, user_id, &user)?;
        Ok(user)
    }

    fn insert_goal(&self, goal: &Goal) -> Result<Goal, StoreError> {
        let _guard = self.lock()?;
        if record_path(&self.goals_dir, goal.goal_id).exists() {
            return Err(StoreError::ConstraintViolation(format!(
                "goal id {} already exists",
                goal.goal_id
            )));
        }
        let employee: Option<User> = read_record(&self.users_dir, goal.employee_id)?;
        repository::check_goal_link(employee.as_ref(), goal)?;
        write_record(&self.goals_dir, goal.goal_id, goal)?;
        Ok(goal.clone())
    }

    fn goal(&self, goal_id: Uuid) -> Result<Goal, StoreError> {
        self.load_goal(goal_id)
    }

    fn goals_for_manager(&self, manager_id: Uuid) -> Result<Vec<Goal>, StoreError> {
        self.load_goals(|g| g.manager_id == manager_id)
    }

    fn goals_for_employee(&self, employee_id: Uuid) -> Result<Vec<Goal>, StoreError> {
        self.load_goals(|g| g.employee_id == employee_id)
    }

    fn update_goal(&self, goal: &Goal, expected: GoalStatus) -> Result<Goal, StoreError> {
        let _guard = self.lock()?;
        let stored = self.load_goal(goal.goal_id)?;
        repository::check_goal_status(&stored, expected)?;
        write_record(&self.goals_dir, goal.goal_id, goal)?;
        Ok(goal.clone())
    }

    fn insert_task(&self, task: &Task, goal_status: GoalStatus) -> Result<Task, StoreError> {
        let _guard = self.lock()?;
        let goal = self.load_goal(task.goal_id)?;
        repository::check_goal_status(&goal, goal_status)?;
        if record_path(&self.tasks_dir, task.task_id).exists() {
            return Err(StoreError::ConstraintViolation(format!(
                "task id {} already exists",
                task.task_id
            )));
        }
        write_record(&self.tasks_dir, task.task_id, task)?;
        Ok(task.clone())
    }

    fn task(&self, task_id: Uuid) -> Result<Task, StoreError> {
        read_record(&self.tasks_dir, task_id)?.ok_or_else(|| StoreError::not_found("task", task_id))
    }

    fn tasks_for_goal(&self, goal_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = read_all(&self.tasks_dir)?;
        tasks.retain(|t| t.goal_id == goal_id);
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.task_id.cmp(&b.task_id)));
        Ok(tasks)
    }

    fn update_task(
        &self,
        task: &Task,
        expected: TaskState,
        goal_status: GoalStatus,
    ) -> Result<Task, StoreError> {
        let _guard = self.lock()?;
        let goal = self.load_goal(task.goal_id)?;
        repository::check_goal_status(&goal, goal_status)?;
        let stored = self.task(task.task_id)?;
        repository::check_task_state(&stored, expected)?;
        write_record(&self.tasks_dir, task.task_id, task)?;
        Ok(task.clone())
    }

    fn append_feedback(&self, feedback: &Feedback) -> Result<Feedback, StoreError> {
        let _guard = self.lock()?;
        self.load_goal(feedback.goal_id)?;
        self.log.append(feedback)?;
        Ok(feedback.clone())
    }

    fn feedback_for_goal(&self, goal_id: Uuid) -> Result<Vec<Feedback>, StoreError> {
        // Appends hold the lock, so no half-written line is read.
        let _guard = self.lock()?;
        Ok(FeedbackLog::read_all(&self.feedback_path)?
            .into_iter()
            .map(|entry| entry.feedback)
            .filter(|f| f.goal_id == goal_id)
            .collect())
    }
}

fn record_path(dir: &Path, id: Uuid) -> PathBuf {
    dir.join(format!("{}.json", id))
}

fn write_record<T: Serialize>(dir: &Path, id: Uuid, record: &T) -> Result<(), StoreError> {
    let path = record_path(dir, id);
    let tmp = dir.join(format!(".{}.json.tmp", id));
    let json = serde_json::to_string_pretty(record)?;
    fs::write(&tmp, json).map_err(|source| StoreError::io(&tmp, source))?;
    fs::rename(&tmp, &path).map_err(|source| StoreError::io(&path, source))?;
    Ok(())
}

fn read_record<T: DeserializeOwned>(dir: &Path, id: Uuid) -> Result<Option<T>, StoreError> {
    let path = record_path(dir, id);
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(&path).map_err(|source| StoreError::io(&path, source))?;
    Ok(Some(serde_json::from_str(&json)?))
}

fn read_all<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StoreError> {
    let mut records = Vec::new();
    let entries = fs::read_dir(dir).map_err(|source| StoreError::io(dir, source))?;

    for entry in entries {
        let entry = entry.map_err(|source| StoreError::io(dir, source))?;
        let path = entry.path();
        let is_record = path.extension().is_some_and(|ext| ext == "json")
            && !path
                .file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if !is_record {
            continue;
        }
        let json = fs::read_to_string(&path).map_err(|source| StoreError::io(&path, source))?;
        match serde_json::from_str::<T>(&json) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(path = %path.display(), "skipping unreadable record: {}", e),
        }
    }

    Ok(records)
}
