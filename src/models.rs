use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(PartialEq)]
pub enum InputMode {
    Navigate,
    Editing,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NavigateFocus {
    Pending,
    Completed,
}

impl NavigateFocus {
    pub fn toggle(self) -> Self {
        match self {
            NavigateFocus::Pending => NavigateFocus::Completed,
            NavigateFocus::Completed => NavigateFocus::Pending,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ComposerField {
    Title,
    Description,
}

/// Backend-assigned task identifier. The wire carries either a number or a string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    #[cfg(test)]
    pub fn new(id: impl Into<String>) -> Self {
        TaskId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(n) => TaskId(n.to_string()),
            RawId::Text(s) => TaskId(s),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    /// Any other backend value. Kept in the list but shown in neither view.
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
}

impl Task {
    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }
}

/// The authenticated visitor. Lives only as long as the running process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub username: String,
}
