//! Task synchronizer: one server-sourced task list per session.
//!
//! Every request runs on its own worker thread and reports back over a channel.
//! `poll` applies completions on the UI thread. A finished write decides whether
//! to re-fetch the full list; the list is never patched locally, so `tasks`
//! always equals the last successful fetch. Requests are neither cancelled nor
//! ordered: when several fetches overlap, whichever completes last wins.

use crate::error::{ApiError, ValidationError};
use crate::integrations::backend::{Reply, TaskApi};
use crate::models::{Task, TaskId, TaskStatus};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use tracing::{error, info};

pub const FETCH_FAILED_MESSAGE: &str =
    "An error occurred while fetching tasks. Please try again later.";
const TITLE_REQUIRED: &str = "Task title is required";
const TITLE_REQUIRED_FOR_EDIT: &str = "Task title is required for editing";

/// Something the user should be told after a completion was applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// Blocks the UI until dismissed.
    Alert(String),
    Toast(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Create,
    Complete,
    Update,
    Remove,
}

impl WriteOp {
    fn label(self) -> &'static str {
        match self {
            WriteOp::Create => "adding task",
            WriteOp::Complete => "marking task as complete",
            WriteOp::Update => "updating task",
            WriteOp::Remove => "deleting task",
        }
    }

    /// Edits only re-fetch on success; every other write re-fetches on any reply.
    fn resyncs_after(self, reply: &Reply) -> bool {
        match self {
            WriteOp::Update => reply.is_success(),
            WriteOp::Create | WriteOp::Complete | WriteOp::Remove => true,
        }
    }
}

enum Completion {
    Fetched(Result<Vec<Task>, ApiError>),
    Wrote {
        op: WriteOp,
        result: Result<Reply, ApiError>,
    },
}

pub struct TaskSync {
    api: Arc<dyn TaskApi>,
    user_id: String,
    tasks: Vec<Task>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    in_flight: usize,
}

impl TaskSync {
    pub fn new(api: Arc<dyn TaskApi>, user_id: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            api,
            user_id: user_id.into(),
            tasks: Vec::new(),
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.with_status(TaskStatus::Pending)
    }

    pub fn completed(&self) -> impl Iterator<Item = &Task> {
        self.with_status(TaskStatus::Completed)
    }

    fn with_status(&self, status: TaskStatus) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(move |task| task.status == status)
    }

    /// Requests dispatched but not yet applied by `poll`.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn sync(&mut self) {
        let user_id = self.user_id.clone();
        self.dispatch(move |api| Completion::Fetched(api.list_tasks(&user_id)));
    }

    pub fn create(&mut self, title: &str, description: &str) -> Result<(), ValidationError> {
        if title.trim().is_empty() {
            return Err(ValidationError(TITLE_REQUIRED));
        }
        let user_id = self.user_id.clone();
        let title = title.to_string();
        let description = description.to_string();
        self.dispatch(move |api| Completion::Wrote {
            op: WriteOp::Create,
            result: api.create_task(&user_id, &title, &description),
        });
        Ok(())
    }

    pub fn complete(&mut self, task_id: TaskId) {
        self.dispatch(move |api| Completion::Wrote {
            op: WriteOp::Complete,
            result: api.complete_task(&task_id),
        });
    }

    pub fn update(
        &mut self,
        task_id: TaskId,
        title: &str,
        description: &str,
    ) -> Result<(), ValidationError> {
        if title.trim().is_empty() {
            return Err(ValidationError(TITLE_REQUIRED_FOR_EDIT));
        }
        let title = title.to_string();
        let description = description.to_string();
        self.dispatch(move |api| Completion::Wrote {
            op: WriteOp::Update,
            result: api.update_task(&task_id, &title, &description),
        });
        Ok(())
    }

    pub fn remove(&mut self, task_id: TaskId) {
        self.dispatch(move |api| Completion::Wrote {
            op: WriteOp::Remove,
            result: api.delete_task(&task_id),
        });
    }

    /// Applies every completion that has arrived, without blocking.
    pub fn poll(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(completion) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    notices.extend(self.apply(completion));
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        notices
    }

    /// Blocks until nothing is in flight, including follow-up fetches.
    #[cfg(test)]
    pub fn settle(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while self.in_flight > 0 {
            let Ok(completion) = self.rx.recv() else {
                break;
            };
            self.in_flight -= 1;
            notices.extend(self.apply(completion));
        }
        notices
    }

    fn dispatch<F>(&mut self, job: F)
    where
        F: FnOnce(&dyn TaskApi) -> Completion + Send + 'static,
    {
        self.in_flight += 1;
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        thread::spawn(move || {
            let _ = tx.send(job(api.as_ref()));
        });
    }

    fn apply(&mut self, completion: Completion) -> Option<Notice> {
        match completion {
            Completion::Fetched(Ok(tasks)) => {
                info!(user_id = %self.user_id, count = tasks.len(), "tasks synced");
                self.tasks = tasks;
                None
            }
            Completion::Fetched(Err(err)) => {
                error!(user_id = %self.user_id, %err, "error fetching tasks");
                Some(Notice::Alert(FETCH_FAILED_MESSAGE.to_string()))
            }
            Completion::Wrote {
                op,
                result: Ok(reply),
            } => {
                info!(status = reply.status, message = %reply.message, "backend replied to {}", op.label());
                if op.resyncs_after(&reply) {
                    self.sync();
                    None
                } else {
                    error!(status = reply.status, "error {}", op.label());
                    Some(Notice::Toast(format!(
                        "Error {}: HTTP {}",
                        op.label(),
                        reply.status
                    )))
                }
            }
            Completion::Wrote {
                op,
                result: Err(err),
            } => {
                error!(%err, "error {}", op.label());
                Some(Notice::Toast(format!("Error {}: {err}", op.label())))
            }
        }
    }
}
