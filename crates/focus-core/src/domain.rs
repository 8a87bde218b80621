//! Domain entities acted on by users and agents, plus the patch types used
//! by update operations. A patch carries only the fields the caller set;
//! its `changes_map` is what the action ledger records as the diff.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::{CommentId, GoalId, ProjectId, TaskId, UserId};

#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Todo => write!(f, "todo"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Review => write!(f, "review"),
            Self::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "done" => Ok(Self::Done),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    P1,
    P2,
    P3,
    P4,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P1 => write!(f, "p1"),
            Self::P2 => write!(f, "p2"),
            Self::P3 => write!(f, "p3"),
            Self::P4 => write!(f, "p4"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "p1" => Ok(Self::P1),
            "p2" => Ok(Self::P2),
            "p3" => Ok(Self::P3),
            "p4" => Ok(Self::P4),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub user_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub target_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    pub project_id: Option<ProjectId>,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub completed: bool,
    pub due_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub task_id: TaskId,
    pub content: String,
    pub created_at: String,
}

#[derive(Clone, Debug, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub project_id: Option<ProjectId>,
    pub due_date: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
    pub project_id: Option<ProjectId>,
    pub due_date: Option<String>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.completed.is_none()
            && self.project_id.is_none()
            && self.due_date.is_none()
    }

    /// The field-level diff recorded on the action ledger: exactly the
    /// fields the caller set, with their new values.
    pub fn changes_map(&self) -> Map<String, Value> {
        let mut m = Map::new();
        if let Some(v) = &self.title {
            m.insert("title".into(), Value::String(v.clone()));
        }
        if let Some(v) = &self.description {
            m.insert("description".into(), Value::String(v.clone()));
        }
        if let Some(v) = &self.status {
            m.insert("status".into(), Value::String(v.to_string()));
        }
        if let Some(v) = &self.priority {
            m.insert("priority".into(), Value::String(v.to_string()));
        }
        if let Some(v) = self.completed {
            m.insert("completed".into(), Value::Bool(v));
        }
        if let Some(v) = &self.project_id {
            m.insert("project_id".into(), Value::String(v.to_string()));
        }
        if let Some(v) = &self.due_date {
            m.insert("due_date".into(), Value::String(v.clone()));
        }
        m
    }
}

#[derive(Clone, Debug, Default)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }

    pub fn changes_map(&self) -> Map<String, Value> {
        let mut m = Map::new();
        if let Some(v) = &self.name {
            m.insert("name".into(), Value::String(v.clone()));
        }
        if let Some(v) = &self.description {
            m.insert("description".into(), Value::String(v.clone()));
        }
        m
    }
}

#[derive(Clone, Debug, Default)]
pub struct NewGoal {
    pub name: String,
    pub description: Option<String>,
    pub target_date: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct GoalPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_date: Option<String>,
}

impl GoalPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.target_date.is_none()
    }

    pub fn changes_map(&self) -> Map<String, Value> {
        let mut m = Map::new();
        if let Some(v) = &self.name {
            m.insert("name".into(), Value::String(v.clone()));
        }
        if let Some(v) = &self.description {
            m.insert("description".into(), Value::String(v.clone()));
        }
        if let Some(v) = &self.target_date {
            m.insert("target_date".into(), Value::String(v.clone()));
        }
        m
    }
}

/// A comment as submitted by a client during list synchronization. Entries
/// without an id are treated as new.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommentInput {
    pub id: Option<CommentId>,
    pub content: String,
}
