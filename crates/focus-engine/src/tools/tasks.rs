use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use focus_core::domain::{NewTask, TaskPatch};
use focus_core::ids::{ProjectId, TaskId};
use focus_core::tools::{Tool, ToolContext, ToolError};
use focus_store::tasks::TaskFilter;

use crate::registry::ToolRegistry;
use crate::tasks::TaskService;
use crate::tools::{optional_bool, optional_enum, optional_str, require_str, store_err};
use crate::Services;

pub fn register(registry: &mut ToolRegistry, services: &Services) {
    registry.register(Arc::new(ListTasksTool { service: Arc::clone(&services.tasks) }));
    registry.register(Arc::new(CreateTaskTool { service: Arc::clone(&services.tasks) }));
    registry.register(Arc::new(UpdateTaskTool { service: Arc::clone(&services.tasks) }));
    registry.register(Arc::new(DeleteTaskTool { service: Arc::clone(&services.tasks) }));
    registry.register(Arc::new(AddTaskCommentTool { service: Arc::clone(&services.tasks) }));
}

const STATUS_ENUM: [&str; 4] = ["todo", "in_progress", "review", "done"];
const PRIORITY_ENUM: [&str; 4] = ["p1", "p2", "p3", "p4"];

pub struct ListTasksTool {
    service: Arc<TaskService>,
}

#[async_trait]
impl Tool for ListTasksTool {
    fn name(&self) -> &str {
        "focus_list_tasks"
    }

    fn description(&self) -> &str {
        "List the user's tasks, optionally filtered by project, status, or completion"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_id": { "type": "string", "description": "Only tasks in this project" },
                "status": { "type": "string", "enum": STATUS_ENUM },
                "completed": { "type": "boolean" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let filter = TaskFilter {
            project_id: optional_str(&args, "project_id")?.map(ProjectId::from_raw),
            status: optional_enum(&args, "status")?,
            completed: optional_bool(&args, "completed")?,
        };
        let tasks = self.service.list(&ctx.principal, &filter).map_err(store_err)?;
        Ok(json!(tasks))
    }
}

pub struct CreateTaskTool {
    service: Arc<TaskService>,
}

#[async_trait]
impl Tool for CreateTaskTool {
    fn name(&self) -> &str {
        "focus_create_task"
    }

    fn description(&self) -> &str {
        "Create a new task for the user"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["title"],
            "properties": {
                "title": { "type": "string", "description": "Task title" },
                "description": { "type": "string" },
                "status": { "type": "string", "enum": STATUS_ENUM },
                "priority": { "type": "string", "enum": PRIORITY_ENUM },
                "project_id": { "type": "string" },
                "due_date": { "type": "string", "description": "ISO date, e.g. 2026-09-01" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let new = NewTask {
            title: require_str(&args, "title")?.to_string(),
            description: optional_str(&args, "description")?.map(str::to_string),
            status: optional_enum(&args, "status")?,
            priority: optional_enum(&args, "priority")?,
            project_id: optional_str(&args, "project_id")?.map(ProjectId::from_raw),
            due_date: optional_str(&args, "due_date")?.map(str::to_string),
        };
        let task = self.service.create(&ctx.principal, new).map_err(store_err)?;
        Ok(json!(task))
    }
}

pub struct UpdateTaskTool {
    service: Arc<TaskService>,
}

#[async_trait]
impl Tool for UpdateTaskTool {
    fn name(&self) -> &str {
        "focus_update_task"
    }

    fn description(&self) -> &str {
        "Update fields on a task. Setting completed marks the task complete or uncomplete."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["task_id"],
            "properties": {
                "task_id": { "type": "string" },
                "title": { "type": "string" },
                "description": { "type": "string" },
                "status": { "type": "string", "enum": STATUS_ENUM },
                "priority": { "type": "string", "enum": PRIORITY_ENUM },
                "completed": { "type": "boolean" },
                "project_id": { "type": "string" },
                "due_date": { "type": "string" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let task_id = TaskId::from_raw(require_str(&args, "task_id")?);
        let patch = TaskPatch {
            title: optional_str(&args, "title")?.map(str::to_string),
            description: optional_str(&args, "description")?.map(str::to_string),
            status: optional_enum(&args, "status")?,
            priority: optional_enum(&args, "priority")?,
            completed: optional_bool(&args, "completed")?,
            project_id: optional_str(&args, "project_id")?.map(ProjectId::from_raw),
            due_date: optional_str(&args, "due_date")?.map(str::to_string),
        };
        if patch.is_empty() {
            return Err(ToolError::InvalidArguments("no fields to update".into()));
        }
        let task = self.service.update(&ctx.principal, &task_id, patch).map_err(store_err)?;
        Ok(json!(task))
    }
}

pub struct DeleteTaskTool {
    service: Arc<TaskService>,
}

#[async_trait]
impl Tool for DeleteTaskTool {
    fn name(&self) -> &str {
        "focus_delete_task"
    }

    fn description(&self) -> &str {
        "Delete a task and its comments"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["task_id"],
            "properties": {
                "task_id": { "type": "string" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let task_id = TaskId::from_raw(require_str(&args, "task_id")?);
        self.service.delete(&ctx.principal, &task_id).map_err(store_err)?;
        Ok(json!({"deleted": true, "task_id": task_id}))
    }
}

pub struct AddTaskCommentTool {
    service: Arc<TaskService>,
}

#[async_trait]
impl Tool for AddTaskCommentTool {
    fn name(&self) -> &str {
        "focus_add_task_comment"
    }

    fn description(&self) -> &str {
        "Add a comment to a task"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["task_id", "content"],
            "properties": {
                "task_id": { "type": "string" },
                "content": { "type": "string" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let task_id = TaskId::from_raw(require_str(&args, "task_id")?);
        let content = require_str(&args, "content")?;
        let comment = self
            .service
            .add_comment(&ctx.principal, &task_id, content)
            .map_err(store_err)?;
        Ok(json!(comment))
    }
}
