use serde_json::{Map, Value};
use tracing::instrument;

use focus_core::action::{ActionInput, ActionKind, EntityType};
use focus_core::actor::AuthenticatedPrincipal;
use focus_core::domain::{Goal, GoalPatch, NewGoal};
use focus_core::ids::GoalId;
use focus_store::goals::GoalRepo;
use focus_store::{Database, StoreError};

use crate::ledger::ActionLogger;

pub struct GoalService {
    repo: GoalRepo,
    logger: ActionLogger,
}

impl GoalService {
    pub fn new(db: Database, logger: ActionLogger) -> Self {
        Self {
            repo: GoalRepo::new(db),
            logger,
        }
    }

    pub fn list(&self, principal: &AuthenticatedPrincipal) -> Result<Vec<Goal>, StoreError> {
        self.repo.list(&principal.user.id)
    }

    pub fn get(&self, id: &GoalId) -> Result<Goal, StoreError> {
        self.repo.get(id)
    }

    #[instrument(skip(self, principal, new), fields(actor = %principal.user.id))]
    pub fn create(
        &self,
        principal: &AuthenticatedPrincipal,
        new: NewGoal,
    ) -> Result<Goal, StoreError> {
        let goal = self.repo.create(&principal.user.id, &new)?;

        let mut changes = Map::new();
        changes.insert("name".into(), Value::String(goal.name.clone()));
        self.logger.record(ActionInput {
            entity_id: goal.id.to_string(),
            entity_type: EntityType::Goal,
            actor_id: principal.user.id.clone(),
            actor_kind: principal.actor_kind,
            action_kind: ActionKind::Create,
            changes: Some(changes),
            metadata: Some(goal_metadata(&goal, principal)),
        });

        Ok(goal)
    }

    #[instrument(skip(self, principal, patch), fields(goal_id = %id, actor = %principal.user.id))]
    pub fn update(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &GoalId,
        patch: GoalPatch,
    ) -> Result<Goal, StoreError> {
        if patch.is_empty() {
            return self.repo.get(id);
        }

        let goal = self.repo.update(id, &patch)?;

        self.logger.record(ActionInput {
            entity_id: goal.id.to_string(),
            entity_type: EntityType::Goal,
            actor_id: principal.user.id.clone(),
            actor_kind: principal.actor_kind,
            action_kind: ActionKind::Update,
            changes: Some(patch.changes_map()),
            metadata: Some(goal_metadata(&goal, principal)),
        });

        Ok(goal)
    }

    #[instrument(skip(self, principal), fields(goal_id = %id, actor = %principal.user.id))]
    pub fn delete(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &GoalId,
    ) -> Result<(), StoreError> {
        let goal = self.repo.get(id)?;
        self.repo.delete(id)?;

        self.logger.record(ActionInput {
            entity_id: id.to_string(),
            entity_type: EntityType::Goal,
            actor_id: principal.user.id.clone(),
            actor_kind: principal.actor_kind,
            action_kind: ActionKind::Delete,
            changes: None,
            metadata: Some(goal_metadata(&goal, principal)),
        });

        Ok(())
    }
}

fn goal_metadata(goal: &Goal, principal: &AuthenticatedPrincipal) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("name".into(), Value::String(goal.name.clone()));
    if principal.is_agent() {
        if let Some(label) = &principal.token_label {
            m.insert("token_name".into(), Value::String(label.clone()));
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_core::actor::ActorKind;
    use focus_store::actions::{ActionQuery, ActionRepo};
    use focus_store::users::UserRepo;

    #[tokio::test]
    async fn agent_goal_update_is_attributed_to_owner() {
        let db = Database::in_memory().unwrap();
        let user = UserRepo::new(db.clone()).create("a@example.com", "A").unwrap();
        let logger = ActionLogger::spawn(ActionRepo::new(db.clone()));
        let service = GoalService::new(db.clone(), logger.clone());
        let principal = AuthenticatedPrincipal::for_agent(user.clone(), "calendar-bot");

        let goal = service
            .create(&principal, NewGoal { name: "Ship v1".into(), ..Default::default() })
            .unwrap();
        service
            .update(
                &principal,
                &goal.id,
                GoalPatch { target_date: Some("2026-09-01".into()), ..Default::default() },
            )
            .unwrap();
        logger.flush().await;

        // Agent records stay visible in the owner's own default feed
        let records = ActionRepo::new(db)
            .query(&ActionQuery::for_viewer(user.id.clone()))
            .unwrap();
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record.actor_kind, ActorKind::Agent);
            assert_eq!(record.actor_id, user.id);
            assert_eq!(record.metadata.as_ref().unwrap()["token_name"], "calendar-bot");
        }
        assert_eq!(records[0].changes.as_ref().unwrap()["target_date"], "2026-09-01");
    }
}
