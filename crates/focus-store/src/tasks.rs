//! Task rows and their comment sub-resources.

use chrono::Utc;
use tracing::instrument;

use focus_core::domain::{Comment, NewTask, Priority, Task, TaskPatch, TaskStatus};
use focus_core::ids::{CommentId, ProjectId, TaskId, UserId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

/// Optional filters for task listing, combined conjunctively.
#[derive(Clone, Debug, Default)]
pub struct TaskFilter {
    pub project_id: Option<ProjectId>,
    pub status: Option<TaskStatus>,
    pub completed: Option<bool>,
}

pub struct TaskRepo {
    db: Database,
}

impl TaskRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, new), fields(user_id = %user_id))]
    pub fn create(&self, user_id: &UserId, new: &NewTask) -> Result<Task, StoreError> {
        let id = TaskId::new();
        let now = Utc::now().to_rfc3339();
        let status = new.status.unwrap_or(TaskStatus::Todo);
        let priority = new.priority.unwrap_or(Priority::P3);

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, user_id, project_id, title, description, status, priority,
                                    completed, due_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?10)",
                rusqlite::params![
                    id.as_str(),
                    user_id.as_str(),
                    new.project_id.as_ref().map(|p| p.as_str()),
                    new.title,
                    new.description,
                    status.to_string(),
                    priority.to_string(),
                    new.due_date,
                    now,
                    now,
                ],
            )?;
            Ok(Task {
                id: id.clone(),
                user_id: user_id.clone(),
                project_id: new.project_id.clone(),
                title: new.title.clone(),
                description: new.description.clone(),
                status,
                priority,
                completed: false,
                due_date: new.due_date.clone(),
                created_at: now.clone(),
                updated_at: now.clone(),
            })
        })
    }

    #[instrument(skip(self), fields(task_id = %id))]
    pub fn get(&self, id: &TaskId) -> Result<Task, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{TASK_SELECT} WHERE id = ?1"))?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_task(row),
                None => Err(StoreError::NotFound(format!("task {id}"))),
            }
        })
    }

    #[instrument(skip(self, filter), fields(user_id = %user_id))]
    pub fn list(&self, user_id: &UserId, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        self.db.with_conn(|conn| {
            let mut clauses: Vec<&str> = vec!["user_id = ?"];
            let mut params: Vec<Box<dyn rusqlite::types::ToSql>> =
                vec![Box::new(user_id.as_str().to_string())];

            if let Some(project_id) = &filter.project_id {
                clauses.push("project_id = ?");
                params.push(Box::new(project_id.as_str().to_string()));
            }
            if let Some(status) = &filter.status {
                clauses.push("status = ?");
                params.push(Box::new(status.to_string()));
            }
            if let Some(completed) = filter.completed {
                clauses.push("completed = ?");
                params.push(Box::new(completed as i64));
            }

            let sql = format!(
                "{TASK_SELECT} WHERE {} ORDER BY created_at DESC",
                clauses.join(" AND ")
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_task(row)?);
            }
            Ok(results)
        })
    }

    /// Apply a patch and return the fresh row. An empty patch is a no-op
    /// read.
    #[instrument(skip(self, patch), fields(task_id = %id))]
    pub fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, StoreError> {
        if patch.is_empty() {
            return self.get(id);
        }

        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let mut sets: Vec<&str> = Vec::new();
            let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if let Some(title) = &patch.title {
                sets.push("title = ?");
                params.push(Box::new(title.clone()));
            }
            if let Some(description) = &patch.description {
                sets.push("description = ?");
                params.push(Box::new(description.clone()));
            }
            if let Some(status) = &patch.status {
                sets.push("status = ?");
                params.push(Box::new(status.to_string()));
            }
            if let Some(priority) = &patch.priority {
                sets.push("priority = ?");
                params.push(Box::new(priority.to_string()));
            }
            if let Some(completed) = patch.completed {
                sets.push("completed = ?");
                params.push(Box::new(completed as i64));
            }
            if let Some(project_id) = &patch.project_id {
                sets.push("project_id = ?");
                params.push(Box::new(project_id.as_str().to_string()));
            }
            if let Some(due_date) = &patch.due_date {
                sets.push("due_date = ?");
                params.push(Box::new(due_date.clone()));
            }
            sets.push("updated_at = ?");
            params.push(Box::new(now.clone()));
            params.push(Box::new(id.as_str().to_string()));

            let sql = format!("UPDATE tasks SET {} WHERE id = ?", sets.join(", "));
            let updated = conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
            if updated == 0 {
                return Err(StoreError::NotFound(format!("task {id}")));
            }
            Ok(())
        })?;

        self.get(id)
    }

    /// Delete a task and its comments.
    #[instrument(skip(self), fields(task_id = %id))]
    pub fn delete(&self, id: &TaskId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM comments WHERE task_id = ?1", [id.as_str()])?;
            let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", [id.as_str()])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(format!("task {id}")));
            }
            Ok(())
        })
    }

    #[instrument(skip(self), fields(task_id = %task_id))]
    pub fn list_comments(&self, task_id: &TaskId) -> Result<Vec<Comment>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, task_id, content, created_at FROM comments
                 WHERE task_id = ?1 ORDER BY created_at ASC",
            )?;
            let mut rows = stmt.query([task_id.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_comment(row)?);
            }
            Ok(results)
        })
    }

    #[instrument(skip(self, content), fields(task_id = %task_id))]
    pub fn insert_comment(&self, task_id: &TaskId, content: &str) -> Result<Comment, StoreError> {
        let id = CommentId::new();
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, task_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id.as_str(), task_id.as_str(), content, now],
            )?;
            Ok(Comment {
                id: id.clone(),
                task_id: task_id.clone(),
                content: content.to_string(),
                created_at: now.clone(),
            })
        })
    }

    #[instrument(skip(self), fields(comment_id = %id))]
    pub fn delete_comment(&self, id: &CommentId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM comments WHERE id = ?1", [id.as_str()])?;
            Ok(())
        })
    }
}

const TASK_SELECT: &str = "SELECT id, user_id, project_id, title, description, status, priority,
                                  completed, due_date, created_at, updated_at
                           FROM tasks";

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<Task, StoreError> {
    let status_str: String = row_helpers::get(row, 5, "tasks", "status")?;
    let priority_str: String = row_helpers::get(row, 6, "tasks", "priority")?;

    Ok(Task {
        id: TaskId::from_raw(row_helpers::get::<String>(row, 0, "tasks", "id")?),
        user_id: UserId::from_raw(row_helpers::get::<String>(row, 1, "tasks", "user_id")?),
        project_id: row_helpers::get_opt::<String>(row, 2, "tasks", "project_id")?
            .map(ProjectId::from_raw),
        title: row_helpers::get(row, 3, "tasks", "title")?,
        description: row_helpers::get_opt(row, 4, "tasks", "description")?,
        status: row_helpers::parse_enum(&status_str, "tasks", "status")?,
        priority: row_helpers::parse_enum(&priority_str, "tasks", "priority")?,
        completed: row_helpers::get_bool(row, 7, "tasks", "completed")?,
        due_date: row_helpers::get_opt(row, 8, "tasks", "due_date")?,
        created_at: row_helpers::get(row, 9, "tasks", "created_at")?,
        updated_at: row_helpers::get(row, 10, "tasks", "updated_at")?,
    })
}

fn row_to_comment(row: &rusqlite::Row<'_>) -> Result<Comment, StoreError> {
    Ok(Comment {
        id: CommentId::from_raw(row_helpers::get::<String>(row, 0, "comments", "id")?),
        task_id: TaskId::from_raw(row_helpers::get::<String>(row, 1, "comments", "task_id")?),
        content: row_helpers::get(row, 2, "comments", "content")?,
        created_at: row_helpers::get(row, 3, "comments", "created_at")?,
    })
}
