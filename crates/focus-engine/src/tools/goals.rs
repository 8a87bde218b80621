use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use focus_core::domain::{GoalPatch, NewGoal};
use focus_core::ids::GoalId;
use focus_core::tools::{Tool, ToolContext, ToolError};

use crate::goals::GoalService;
use crate::registry::ToolRegistry;
use crate::tools::{optional_str, require_str, store_err};
use crate::Services;

pub fn register(registry: &mut ToolRegistry, services: &Services) {
    registry.register(Arc::new(ListGoalsTool { service: Arc::clone(&services.goals) }));
    registry.register(Arc::new(CreateGoalTool { service: Arc::clone(&services.goals) }));
    registry.register(Arc::new(UpdateGoalTool { service: Arc::clone(&services.goals) }));
    registry.register(Arc::new(DeleteGoalTool { service: Arc::clone(&services.goals) }));
}

pub struct ListGoalsTool {
    service: Arc<GoalService>,
}

#[async_trait]
impl Tool for ListGoalsTool {
    fn name(&self) -> &str {
        "focus_list_goals"
    }

    fn description(&self) -> &str {
        "List the user's goals"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let goals = self.service.list(&ctx.principal).map_err(store_err)?;
        Ok(json!(goals))
    }
}

pub struct CreateGoalTool {
    service: Arc<GoalService>,
}

#[async_trait]
impl Tool for CreateGoalTool {
    fn name(&self) -> &str {
        "focus_create_goal"
    }

    fn description(&self) -> &str {
        "Create a new goal, optionally with a target date"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string", "description": "Goal name" },
                "description": { "type": "string" },
                "target_date": { "type": "string", "description": "ISO date, e.g. 2026-12-31" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let new = NewGoal {
            name: require_str(&args, "name")?.to_string(),
            description: optional_str(&args, "description")?.map(str::to_string),
            target_date: optional_str(&args, "target_date")?.map(str::to_string),
        };
        let goal = self.service.create(&ctx.principal, new).map_err(store_err)?;
        Ok(json!(goal))
    }
}

pub struct UpdateGoalTool {
    service: Arc<GoalService>,
}

#[async_trait]
impl Tool for UpdateGoalTool {
    fn name(&self) -> &str {
        "focus_update_goal"
    }

    fn description(&self) -> &str {
        "Update a goal's name, description, or target date"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["goal_id"],
            "properties": {
                "goal_id": { "type": "string" },
                "name": { "type": "string" },
                "description": { "type": "string" },
                "target_date": { "type": "string" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let goal_id = GoalId::from_raw(require_str(&args, "goal_id")?);
        let patch = GoalPatch {
            name: optional_str(&args, "name")?.map(str::to_string),
            description: optional_str(&args, "description")?.map(str::to_string),
            target_date: optional_str(&args, "target_date")?.map(str::to_string),
        };
        if patch.is_empty() {
            return Err(ToolError::InvalidArguments("no fields to update".into()));
        }
        let goal = self.service.update(&ctx.principal, &goal_id, patch).map_err(store_err)?;
        Ok(json!(goal))
    }
}

pub struct DeleteGoalTool {
    service: Arc<GoalService>,
}

#[async_trait]
impl Tool for DeleteGoalTool {
    fn name(&self) -> &str {
        "focus_delete_goal"
    }

    fn description(&self) -> &str {
        "Delete a goal"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["goal_id"],
            "properties": {
                "goal_id": { "type": "string" }
            }
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let goal_id = GoalId::from_raw(require_str(&args, "goal_id")?);
        self.service.delete(&ctx.principal, &goal_id).map_err(store_err)?;
        Ok(json!({"deleted": true, "goal_id": goal_id}))
    }
}
