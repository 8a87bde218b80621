use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use focus_core::ids::ActionId;
use focus_core::tools::{Tool, ToolContext, ToolError};

use crate::actions::{ActionListRequest, ActionService};
use crate::registry::ToolRegistry;
use crate::tools::{optional_bool, optional_enum, optional_str, optional_u32, store_err};
use crate::Services;

pub fn register(registry: &mut ToolRegistry, services: &Services) {
    registry.register(Arc::new(ListActionsTool { service: Arc::clone(&services.actions) }));
    registry.register(Arc::new(MarkActionsReadTool { service: Arc::clone(&services.actions) }));
}

pub struct ListActionsTool {
    service: Arc<ActionService>,
}

#[async_trait]
impl Tool for ListActionsTool {
    fn name(&self) -> &str {
        "focus_list_actions"
    }

    fn description(&self) -> &str {
        "List recent activity-log entries, newest first. By default the \
         user's own manual actions are hidden and agent actions are shown."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": { "type": "integer", "minimum": 1, "maximum": 100 },
                "is_read": { "type": "boolean" },
                "entity_type": { "type": "string", "enum": ["task", "project", "goal"] },
                "entity_id": { "type": "string" },
                "actor_kind": { "type": "string", "enum": ["user", "agent", "system"] },
                "include_own": { "type": "boolean" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let request = ActionListRequest {
            actor_kind: optional_enum(&args, "actor_kind")?,
            entity_type: optional_enum(&args, "entity_type")?,
            entity_id: optional_str(&args, "entity_id")?.map(str::to_string),
            is_read: optional_bool(&args, "is_read")?,
            include_own: optional_bool(&args, "include_own")?.unwrap_or(false),
            limit: optional_u32(&args, "limit")?,
        };
        let records = self.service.list(&ctx.principal, request).map_err(store_err)?;
        Ok(json!(records))
    }
}

pub struct MarkActionsReadTool {
    service: Arc<ActionService>,
}

#[async_trait]
impl Tool for MarkActionsReadTool {
    fn name(&self) -> &str {
        "focus_mark_actions_read"
    }

    fn description(&self) -> &str {
        "Mark a batch of activity-log entries as read"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["ids"],
            "properties": {
                "ids": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Action record ids to mark read"
                }
            }
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let ids_value = args
            .get("ids")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ToolError::InvalidArguments("ids array is required".into()))?;

        let mut ids = Vec::with_capacity(ids_value.len());
        for entry in ids_value {
            let raw = entry
                .as_str()
                .ok_or_else(|| ToolError::InvalidArguments("ids must be strings".into()))?;
            ids.push(ActionId::from_raw(raw));
        }

        self.service.mark_read(&ids).map_err(store_err)?;
        Ok(json!({"marked": ids.len()}))
    }
}
