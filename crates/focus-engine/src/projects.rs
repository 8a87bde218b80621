use serde_json::{Map, Value};
use tracing::instrument;

use focus_core::action::{ActionInput, ActionKind, EntityType};
use focus_core::actor::AuthenticatedPrincipal;
use focus_core::domain::{NewProject, Project, ProjectPatch};
use focus_core::ids::ProjectId;
use focus_store::projects::ProjectRepo;
use focus_store::{Database, StoreError};

use crate::ledger::ActionLogger;

pub struct ProjectService {
    repo: ProjectRepo,
    logger: ActionLogger,
}

impl ProjectService {
    pub fn new(db: Database, logger: ActionLogger) -> Self {
        Self {
            repo: ProjectRepo::new(db),
            logger,
        }
    }

    pub fn list(&self, principal: &AuthenticatedPrincipal) -> Result<Vec<Project>, StoreError> {
        self.repo.list(&principal.user.id)
    }

    pub fn get(&self, id: &ProjectId) -> Result<Project, StoreError> {
        self.repo.get(id)
    }

    #[instrument(skip(self, principal, new), fields(actor = %principal.user.id))]
    pub fn create(
        &self,
        principal: &AuthenticatedPrincipal,
        new: NewProject,
    ) -> Result<Project, StoreError> {
        let project = self.repo.create(&principal.user.id, &new)?;

        let mut changes = Map::new();
        changes.insert("name".into(), Value::String(project.name.clone()));
        self.logger.record(ActionInput {
            entity_id: project.id.to_string(),
            entity_type: EntityType::Project,
            actor_id: principal.user.id.clone(),
            actor_kind: principal.actor_kind,
            action_kind: ActionKind::Create,
            changes: Some(changes),
            metadata: Some(project_metadata(&project, principal)),
        });

        Ok(project)
    }

    #[instrument(skip(self, principal, patch), fields(project_id = %id, actor = %principal.user.id))]
    pub fn update(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &ProjectId,
        patch: ProjectPatch,
    ) -> Result<Project, StoreError> {
        if patch.is_empty() {
            return self.repo.get(id);
        }

        let project = self.repo.update(id, &patch)?;

        self.logger.record(ActionInput {
            entity_id: project.id.to_string(),
            entity_type: EntityType::Project,
            actor_id: principal.user.id.clone(),
            actor_kind: principal.actor_kind,
            action_kind: ActionKind::Update,
            changes: Some(patch.changes_map()),
            metadata: Some(project_metadata(&project, principal)),
        });

        Ok(project)
    }

    #[instrument(skip(self, principal), fields(project_id = %id, actor = %principal.user.id))]
    pub fn delete(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &ProjectId,
    ) -> Result<(), StoreError> {
        let project = self.repo.get(id)?;
        self.repo.delete(id)?;

        self.logger.record(ActionInput {
            entity_id: id.to_string(),
            entity_type: EntityType::Project,
            actor_id: principal.user.id.clone(),
            actor_kind: principal.actor_kind,
            action_kind: ActionKind::Delete,
            changes: None,
            metadata: Some(project_metadata(&project, principal)),
        });

        Ok(())
    }
}

fn project_metadata(project: &Project, principal: &AuthenticatedPrincipal) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("name".into(), Value::String(project.name.clone()));
    if principal.is_agent() {
        if let Some(label) = &principal.token_label {
            m.insert("token_name".into(), Value::String(label.clone()));
        }
    }
    m
}
