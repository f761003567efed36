// events.rs - Lifecycle events and notification dispatch.
//
// Every successful mutation in the tracker emits a PmEvent. Sinks (a JSONL
// log file today) subscribe through the NotificationSink trait. Dispatch is
// synchronous and a failing sink never fails the mutation that emitted it.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LifecycleError;
use crate::feedback::Feedback;
use crate::goal::{Goal, GoalStatus};
use crate::task::{Task, TaskProgress, TaskStatus};

/// Events emitted at lifecycle points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PmEvent {
    /// A manager set a new goal.
    GoalCreated {
        goal_id: Uuid,
        employee_id: Uuid,
        manager_id: Uuid,
        title: String,
        timestamp: DateTime<Utc>,
    },

    /// A goal changed status.
    GoalStatusChanged {
        goal_id: Uuid,
        from_status: GoalStatus,
        to_status: GoalStatus,
        timestamp: DateTime<Utc>,
    },

    /// An employee proposed a task.
    TaskCreated {
        goal_id: Uuid,
        task_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A manager approved or rejected a task.
    TaskReviewed {
        goal_id: Uuid,
        task_id: Uuid,
        status: TaskStatus,
        timestamp: DateTime<Utc>,
    },

    /// An employee advanced task progress.
    TaskProgressed {
        goal_id: Uuid,
        task_id: Uuid,
        from_progress: TaskProgress,
        to_progress: TaskProgress,
        timestamp: DateTime<Utc>,
    },

    /// A manager appended feedback to a goal.
    FeedbackAdded {
        goal_id: Uuid,
        feedback_id: Uuid,
        manager_id: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl PmEvent {
    /// Get the event type name as a string.
    pub fn event_type(&self) -> &str {
        match self {
            PmEvent::GoalCreated { .. } => "goal_created",
            PmEvent::GoalStatusChanged { .. } => "goal_status_changed",
            PmEvent::TaskCreated { .. } => "task_created",
            PmEvent::TaskReviewed { .. } => "task_reviewed",
            PmEvent::TaskProgressed { .. } => "task_progressed",
            PmEvent::FeedbackAdded { .. } => "feedback_added",
        }
    }

    /// The goal every event is scoped to.
    pub fn goal_id(&self) -> Uuid {
        match self {
            PmEvent::GoalCreated { goal_id, .. }
            | PmEvent::GoalStatusChanged { goal_id, .. }
            | PmEvent::TaskCreated { goal_id, .. }
            | PmEvent::TaskReviewed { goal_id, .. }
            | PmEvent::TaskProgressed { goal_id, .. }
            | PmEvent::FeedbackAdded { goal_id, .. } => *goal_id,
        }
    }

    pub fn goal_created(goal: &Goal) -> Self {
        PmEvent::GoalCreated {
            goal_id: goal.goal_id,
            employee_id: goal.employee_id,
            manager_id: goal.manager_id,
            title: goal.title.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn goal_status_changed(goal_id: Uuid, from: GoalStatus, to: GoalStatus) -> Self {
        PmEvent::GoalStatusChanged {
            goal_id,
            from_status: from,
            to_status: to,
            timestamp: Utc::now(),
        }
    }

    pub fn task_created(task: &Task) -> Self {
        PmEvent::TaskCreated {
            goal_id: task.goal_id,
            task_id: task.task_id,
            timestamp: Utc::now(),
        }
    }

    pub fn task_reviewed(task: &Task) -> Self {
        PmEvent::TaskReviewed {
            goal_id: task.goal_id,
            task_id: task.task_id,
            status: task.status,
            timestamp: Utc::now(),
        }
    }

    pub fn task_progressed(task: &Task, from: TaskProgress) -> Self {
        PmEvent::TaskProgressed {
            goal_id: task.goal_id,
            task_id: task.task_id,
            from_progress: from,
            to_progress: task.progress,
            timestamp: Utc::now(),
        }
    }

    pub fn feedback_added(feedback: &Feedback) -> Self {
        PmEvent::FeedbackAdded {
            goal_id: feedback.goal_id,
            feedback_id: feedback.feedback_id,
            manager_id: feedback.manager_id,
            timestamp: Utc::now(),
        }
    }
}

/// Trait for receiving lifecycle events.
pub trait NotificationSink: Send + Sync {
    /// Handle an event. Errors are logged but don't stop the system.
    fn send(&self, event: &PmEvent) -> Result<(), LifecycleError>;
}

/// Logs events as JSONL to a file.
pub struct LogSink {
    path: PathBuf,
}

impl LogSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl NotificationSink for LogSink {
    fn send(&self, event: &PmEvent) -> Result<(), LifecycleError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| LifecycleError::IoError {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| LifecycleError::IoError {
                path: self.path.display().to_string(),
                source,
            })?;

        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json).map_err(|source| LifecycleError::IoError {
            path: self.path.display().to_string(),
            source,
        })?;

        Ok(())
    }
}

/// Dispatches events to multiple sinks.
///
/// Errors from individual sinks are logged (via tracing) but don't
/// prevent other sinks from receiving the event.
pub struct EventDispatcher {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl EventDispatcher {
    /// Create a new dispatcher with no sinks.
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn dispatch(&self, event: &PmEvent) {
        for sink in &self.sinks {
            if let Err(e) = sink.send(event) {
                tracing::warn!(event = event.event_type(), "notification sink error: {}", e);
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn goal(title: &str) -> Goal {
        Goal::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            title,
            "",
            NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn events_tagged_by_type() {
        let event = PmEvent::goal_created(&goal("Test Goal"));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"goal_created\""));
        let restored: PmEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.event_type(), "goal_created");
    }

    #[test]
    fn log_sink_appends_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("events.jsonl");
        let sink = LogSink::new(&path);

        sink.send(&PmEvent::goal_created(&goal("Goal 1"))).unwrap();
        sink.send(&PmEvent::goal_created(&goal("Goal 2"))).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn dispatcher_sends_to_all_sinks() {
        let dir = tempdir().unwrap();
        let path1 = dir.path().join("sink1.jsonl");
        let path2 = dir.path().join("sink2.jsonl");

        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_sink(Box::new(LogSink::new(&path1)));
        dispatcher.add_sink(Box::new(LogSink::new(&path2)));

        let g = goal("Test");
        dispatcher.dispatch(&PmEvent::goal_status_changed(
            g.goal_id,
            GoalStatus::Draft,
            GoalStatus::InProgress,
        ));

        assert!(fs::read_to_string(&path1).unwrap().contains("goal_status_changed"));
        assert!(fs::read_to_string(&path2).unwrap().contains("goal_status_changed"));
    }

    #[test]
    fn failing_sink_does_not_block_others() {
        let dir = tempdir().unwrap();
        // A directory path cannot be opened for append.
        let broken = LogSink::new(dir.path());
        let good_path = dir.path().join("good.jsonl");

        let mut dispatcher = EventDispatcher::new();
        dispatcher.add_sink(Box::new(broken));
        dispatcher.add_sink(Box::new(LogSink::new(&good_path)));

        let g = goal("Test");
        let task = Task::new(&g, "Do the thing").unwrap();
        dispatcher.dispatch(&PmEvent::task_created(&task));

        assert!(fs::read_to_string(&good_path).unwrap().contains("task_created"));
    }

    #[test]
    fn every_event_reports_its_goal() {
        let g = goal("Scoped");
        let task = Task::new(&g, "Step").unwrap();
        let fb = Feedback::new(&g, "Nice").unwrap();
        for event in [
            PmEvent::goal_created(&g),
            PmEvent::task_created(&task),
            PmEvent::task_reviewed(&task),
            PmEvent::task_progressed(&task, TaskProgress::NotStarted),
            PmEvent::feedback_added(&fb),
        ] {
            assert_eq!(event.goal_id(), g.goal_id);
        }
    }
}
