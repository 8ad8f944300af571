use crate::error::ApiError;
use crate::integrations::backend::{Reply, TaskApi};
use crate::models::{Task, TaskId, TaskStatus};
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct FakeState {
    users: HashMap<String, String>,
    tasks: Vec<(String, Task)>,
    next_id: u64,
    calls: Vec<String>,
    list_fails: bool,
    update_status: Option<u16>,
    writes_unreachable: bool,
}

/// In-memory backend that records every call it receives.
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: 1,
                ..FakeState::default()
            }),
        }
    }

    pub fn with_user(self, user_id: &str, username: &str) -> Self {
        self.lock()
            .users
            .insert(user_id.to_string(), username.to_string());
        self
    }

    pub fn with_task(self, owner: &str, id: &str, title: &str, status: TaskStatus) -> Self {
        self.insert_task(owner, id, title, status);
        self
    }

    pub fn insert_task(&self, owner: &str, id: &str, title: &str, status: TaskStatus) {
        self.lock().tasks.push((
            owner.to_string(),
            Task {
                id: TaskId::new(id),
                title: title.to_string(),
                description: String::new(),
                status,
            },
        ));
    }

    /// Changes server-side state without going through the client.
    pub fn drop_task(&self, id: &str) {
        self.lock().tasks.retain(|(_, task)| task.id.as_str() != id);
    }

    pub fn set_list_fails(&self, fails: bool) {
        self.lock().list_fails = fails;
    }

    pub fn set_update_status(&self, status: u16) {
        self.lock().update_status = Some(status);
    }

    pub fn set_writes_unreachable(&self, unreachable: bool) {
        self.lock().writes_unreachable = unreachable;
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(state: &FakeState) -> Result<(), ApiError> {
        if state.writes_unreachable {
            return Err(ApiError::Decode("connection refused".to_string()));
        }
        Ok(())
    }
}

fn reply(status: u16, message: &str) -> Reply {
    Reply {
        status,
        message: message.to_string(),
    }
}

impl TaskApi for FakeApi {
    fn check_user(&self, user_id: &str) -> Result<String, ApiError> {
        let mut state = self.lock();
        state.calls.push(format!("check_user {user_id}"));
        state
            .users
            .get(user_id)
            .cloned()
            .ok_or(ApiError::Status {
                status: 404,
                body: "User not found".to_string(),
            })
    }

    fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>, ApiError> {
        let mut state = self.lock();
        state.calls.push(format!("list_tasks {user_id}"));
        if state.list_fails {
            return Err(ApiError::Status {
                status: 500,
                body: "database unavailable".to_string(),
            });
        }
        Ok(state
            .tasks
            .iter()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, task)| task.clone())
            .collect())
    }

    fn create_task(
        &self,
        user_id: &str,
        title: &str,
        description: &str,
    ) -> Result<Reply, ApiError> {
        let mut state = self.lock();
        state.calls.push(format!("create_task {user_id} {title}"));
        Self::write_guard(&state)?;
        let id = state.next_id;
        state.next_id += 1;
        state.tasks.push((
            user_id.to_string(),
            Task {
                id: TaskId::new(id.to_string()),
                title: title.to_string(),
                description: description.to_string(),
                status: TaskStatus::Pending,
            },
        ));
        Ok(reply(201, "Task added successfully"))
    }

    fn complete_task(&self, task_id: &TaskId) -> Result<Reply, ApiError> {
        let mut state = self.lock();
        state.calls.push(format!("complete_task {task_id}"));
        Self::write_guard(&state)?;
        match state.tasks.iter_mut().find(|(_, task)| &task.id == task_id) {
            Some((_, task)) => {
                task.status = TaskStatus::Completed;
                Ok(reply(200, "Task status updated"))
            }
            None => Ok(reply(404, "Task not found")),
        }
    }

    fn update_task(
        &self,
        task_id: &TaskId,
        title: &str,
        description: &str,
    ) -> Result<Reply, ApiError> {
        let mut state = self.lock();
        state.calls.push(format!("update_task {task_id}"));
        Self::write_guard(&state)?;
        if let Some(status) = state.update_status {
            return Ok(reply(status, "Error updating task"));
        }
        match state.tasks.iter_mut().find(|(_, task)| &task.id == task_id) {
            Some((_, task)) => {
                task.title = title.to_string();
                task.description = description.to_string();
                Ok(reply(200, "Task updated"))
            }
            None => Ok(reply(404, "Task not found")),
        }
    }

    fn delete_task(&self, task_id: &TaskId) -> Result<Reply, ApiError> {
        let mut state = self.lock();
        state.calls.push(format!("delete_task {task_id}"));
        Self::write_guard(&state)?;
        let before = state.tasks.len();
        state.tasks.retain(|(_, task)| &task.id != task_id);
        if state.tasks.len() < before {
            Ok(reply(200, "Task deleted"))
        } else {
            Ok(reply(404, "Task not found"))
        }
    }
}

/// Render into an in-memory buffer and return plain text (no styles).
pub fn render_to_string<F>(w: u16, h: u16, f: F) -> String
where
    F: FnOnce(&mut ratatui::Frame),
{
    let backend = TestBackend::new(w, h);
    let mut terminal = Terminal::new(backend).expect("test terminal");
    terminal.draw(f).expect("draw");

    let buf = terminal.backend().buffer().clone();
    let width = buf.area.width as usize;
    let lines: Vec<String> = buf
        .content
        .chunks(width)
        .map(|row| {
            let s: String = row.iter().map(|cell| cell.symbol()).collect();
            s.trim_end().to_string()
        })
        .collect();
    lines.join("\n")
}
