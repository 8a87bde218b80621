use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use focus_core::domain::{NewProject, ProjectPatch};
use focus_core::ids::ProjectId;
use focus_core::tools::{Tool, ToolContext, ToolError};

use crate::projects::ProjectService;
use crate::registry::ToolRegistry;
use crate::tools::{optional_str, require_str, store_err};
use crate::Services;

pub fn register(registry: &mut ToolRegistry, services: &Services) {
    registry.register(Arc::new(ListProjectsTool { service: Arc::clone(&services.projects) }));
    registry.register(Arc::new(CreateProjectTool { service: Arc::clone(&services.projects) }));
    registry.register(Arc::new(UpdateProjectTool { service: Arc::clone(&services.projects) }));
    registry.register(Arc::new(DeleteProjectTool { service: Arc::clone(&services.projects) }));
}

pub struct ListProjectsTool {
    service: Arc<ProjectService>,
}

#[async_trait]
impl Tool for ListProjectsTool {
    fn name(&self) -> &str {
        "focus_list_projects"
    }

    fn description(&self) -> &str {
        "List the user's projects"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let projects = self.service.list(&ctx.principal).map_err(store_err)?;
        Ok(json!(projects))
    }
}

pub struct CreateProjectTool {
    service: Arc<ProjectService>,
}

#[async_trait]
impl Tool for CreateProjectTool {
    fn name(&self) -> &str {
        "focus_create_project"
    }

    fn description(&self) -> &str {
        "Create a new project"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string", "description": "Project name" },
                "description": { "type": "string" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let new = NewProject {
            name: require_str(&args, "name")?.to_string(),
            description: optional_str(&args, "description")?.map(str::to_string),
        };
        let project = self.service.create(&ctx.principal, new).map_err(store_err)?;
        Ok(json!(project))
    }
}

pub struct UpdateProjectTool {
    service: Arc<ProjectService>,
}

#[async_trait]
impl Tool for UpdateProjectTool {
    fn name(&self) -> &str {
        "focus_update_project"
    }

    fn description(&self) -> &str {
        "Update a project's name or description"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["project_id"],
            "properties": {
                "project_id": { "type": "string" },
                "name": { "type": "string" },
                "description": { "type": "string" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let project_id = ProjectId::from_raw(require_str(&args, "project_id")?);
        let patch = ProjectPatch {
            name: optional_str(&args, "name")?.map(str::to_string),
            description: optional_str(&args, "description")?.map(str::to_string),
        };
        if patch.is_empty() {
            return Err(ToolError::InvalidArguments("no fields to update".into()));
        }
        let project = self
            .service
            .update(&ctx.principal, &project_id, patch)
            .map_err(store_err)?;
        Ok(json!(project))
    }
}

pub struct DeleteProjectTool {
    service: Arc<ProjectService>,
}

#[async_trait]
impl Tool for DeleteProjectTool {
    fn name(&self) -> &str {
        "focus_delete_project"
    }

    fn description(&self) -> &str {
        "Delete a project; its tasks are kept and detached"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["project_id"],
            "properties": {
                "project_id": { "type": "string" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let project_id = ProjectId::from_raw(require_str(&args, "project_id")?);
        self.service.delete(&ctx.principal, &project_id).map_err(store_err)?;
        Ok(json!({"deleted": true, "project_id": project_id}))
    }
}
