//! Task mutations with ledger attribution. Display metadata is re-read from
//! the entity at log time, so historical entries show the entity's current
//! title after a rename.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::instrument;

use focus_core::action::{ActionInput, ActionKind, EntityType};
use focus_core::actor::AuthenticatedPrincipal;
use focus_core::domain::{Comment, CommentInput, NewTask, Task, TaskPatch};
use focus_core::ids::TaskId;
use focus_store::tasks::{TaskFilter, TaskRepo};
use focus_store::{Database, StoreError};

use crate::ledger::ActionLogger;

pub struct TaskService {
    repo: TaskRepo,
    logger: ActionLogger,
}

impl TaskService {
    pub fn new(db: Database, logger: ActionLogger) -> Self {
        Self {
            repo: TaskRepo::new(db),
            logger,
        }
    }

    pub fn list(
        &self,
        principal: &AuthenticatedPrincipal,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, StoreError> {
        self.repo.list(&principal.user.id, filter)
    }

    pub fn get(&self, id: &TaskId) -> Result<Task, StoreError> {
        self.repo.get(id)
    }

    #[instrument(skip(self, principal, new), fields(actor = %principal.user.id))]
    pub fn create(
        &self,
        principal: &AuthenticatedPrincipal,
        new: NewTask,
    ) -> Result<Task, StoreError> {
        let task = self.repo.create(&principal.user.id, &new)?;

        let mut changes = Map::new();
        changes.insert("title".into(), Value::String(task.title.clone()));
        self.logger.record(ActionInput {
            entity_id: task.id.to_string(),
            entity_type: EntityType::Task,
            actor_id: principal.user.id.clone(),
            actor_kind: principal.actor_kind,
            action_kind: ActionKind::Create,
            changes: Some(changes),
            metadata: Some(task_metadata(&task, principal)),
        });

        Ok(task)
    }

    /// Apply a patch. Setting `completed` relabels the logged action kind as
    /// complete/uncomplete; everything else logs as update with the patch as
    /// the diff. An empty patch mutates nothing and logs nothing.
    #[instrument(skip(self, principal, patch), fields(task_id = %id, actor = %principal.user.id))]
    pub fn update(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &TaskId,
        patch: TaskPatch,
    ) -> Result<Task, StoreError> {
        if patch.is_empty() {
            return self.repo.get(id);
        }

        let task = self.repo.update(id, &patch)?;

        let action_kind = match patch.completed {
            Some(true) => ActionKind::Complete,
            Some(false) => ActionKind::Uncomplete,
            None => ActionKind::Update,
        };
        self.logger.record(ActionInput {
            entity_id: task.id.to_string(),
            entity_type: EntityType::Task,
            actor_id: principal.user.id.clone(),
            actor_kind: principal.actor_kind,
            action_kind,
            changes: Some(patch.changes_map()),
            metadata: Some(task_metadata(&task, principal)),
        });

        Ok(task)
    }

    #[instrument(skip(self, principal), fields(task_id = %id, actor = %principal.user.id))]
    pub fn delete(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &TaskId,
    ) -> Result<(), StoreError> {
        let task = self.repo.get(id)?;
        self.repo.delete(id)?;

        self.logger.record(ActionInput {
            entity_id: id.to_string(),
            entity_type: EntityType::Task,
            actor_id: principal.user.id.clone(),
            actor_kind: principal.actor_kind,
            action_kind: ActionKind::Delete,
            changes: None,
            metadata: Some(task_metadata(&task, principal)),
        });

        Ok(())
    }

    pub fn list_comments(&self, id: &TaskId) -> Result<Vec<Comment>, StoreError> {
        self.repo.list_comments(id)
    }

    /// Add a single comment, logging one update entry on the parent task.
    #[instrument(skip(self, principal, content), fields(task_id = %id, actor = %principal.user.id))]
    pub fn add_comment(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &TaskId,
        content: &str,
    ) -> Result<Comment, StoreError> {
        let task = self.repo.get(id)?;
        let comment = self.repo.insert_comment(id, content)?;
        self.logger
            .record(comment_added_input(&task, &comment, principal));
        Ok(comment)
    }

    /// Reconcile a task's comment list against a submitted list. Comments
    /// present in the store but not in the submission are deleted with no
    /// ledger entry; each newly submitted comment is inserted and logs its
    /// own update entry on the parent task. A single call can therefore
    /// produce zero, one, or many ledger entries.
    #[instrument(skip(self, principal, submitted), fields(task_id = %id, actor = %principal.user.id))]
    pub fn sync_comments(
        &self,
        principal: &AuthenticatedPrincipal,
        id: &TaskId,
        submitted: Vec<CommentInput>,
    ) -> Result<Vec<Comment>, StoreError> {
        let task = self.repo.get(id)?;
        let existing = self.repo.list_comments(id)?;

        let submitted_ids: HashSet<&str> = submitted
            .iter()
            .filter_map(|c| c.id.as_ref().map(|i| i.as_str()))
            .collect();
        let existing_ids: HashSet<&str> = existing.iter().map(|c| c.id.as_str()).collect();

        for comment in &existing {
            if !submitted_ids.contains(comment.id.as_str()) {
                self.repo.delete_comment(&comment.id)?;
            }
        }

        for entry in &submitted {
            let is_new = match &entry.id {
                None => true,
                Some(id) => !existing_ids.contains(id.as_str()),
            };
            if is_new {
                let comment = self.repo.insert_comment(id, &entry.content)?;
                self.logger
                    .record(comment_added_input(&task, &comment, principal));
            }
        }

        self.repo.list_comments(id)
    }
}

fn task_metadata(task: &Task, principal: &AuthenticatedPrincipal) -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("title".into(), Value::String(task.title.clone()));
    if principal.is_agent() {
        if let Some(label) = &principal.token_label {
            m.insert("token_name".into(), Value::String(label.clone()));
        }
    }
    m
}

fn comment_added_input(
    task: &Task,
    comment: &Comment,
    principal: &AuthenticatedPrincipal,
) -> ActionInput {
    let mut changes = Map::new();
    changes.insert("comments".into(), Value::String("added".into()));
    let mut metadata = task_metadata(task, principal);
    metadata.insert("comment_id".into(), Value::String(comment.id.to_string()));

    ActionInput {
        entity_id: task.id.to_string(),
        entity_type: EntityType::Task,
        actor_id: principal.user.id.clone(),
        actor_kind: principal.actor_kind,
        action_kind: ActionKind::Update,
        changes: Some(changes),
        metadata: Some(metadata),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_core::actor::ActorKind;
    use focus_core::domain::User;
    use focus_core::ids::{CommentId, UserId};
    use focus_store::actions::{ActionQuery, ActionRepo};
    use focus_store::users::UserRepo;

    struct Fixture {
        db: Database,
        service: TaskService,
        logger: ActionLogger,
        user: User,
    }

    fn fixture() -> Fixture {
        let db = Database::in_memory().unwrap();
        let user = UserRepo::new(db.clone()).create("a@example.com", "A").unwrap();
        let logger = ActionLogger::spawn(ActionRepo::new(db.clone()));
        let service = TaskService::new(db.clone(), logger.clone());
        Fixture { db, service, logger, user }
    }

    fn all_records(db: &Database) -> Vec<focus_core::action::ActionRecord> {
        let mut query = ActionQuery::for_viewer(UserId::from_raw("user_other"));
        query.include_own = true;
        ActionRepo::new(db.clone()).query(&query).unwrap()
    }

    #[tokio::test]
    async fn create_logs_exactly_one_record() {
        let f = fixture();
        let principal = AuthenticatedPrincipal::for_user(f.user.clone());
        let task = f
            .service
            .create(&principal, NewTask { title: "Write report".into(), ..Default::default() })
            .unwrap();
        f.logger.flush().await;

        let records = all_records(&f.db);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action_kind, ActionKind::Create);
        assert_eq!(records[0].entity_id, task.id.to_string());
        assert_eq!(records[0].changes.as_ref().unwrap()["title"], "Write report");
        assert_eq!(records[0].metadata.as_ref().unwrap()["title"], "Write report");
    }

    #[tokio::test]
    async fn single_field_update_logs_that_field() {
        let f = fixture();
        let principal = AuthenticatedPrincipal::for_user(f.user.clone());
        let task = f
            .service
            .create(&principal, NewTask { title: "a".into(), ..Default::default() })
            .unwrap();

        let patch = TaskPatch { title: Some("b".into()), ..Default::default() };
        f.service.update(&principal, &task.id, patch).unwrap();
        f.logger.flush().await;

        let records = all_records(&f.db);
        assert_eq!(records.len(), 2);
        let update = &records[0];
        assert_eq!(update.action_kind, ActionKind::Update);
        let changes = update.changes.as_ref().unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes["title"], "b");
    }

    #[tokio::test]
    async fn completion_is_relabeled() {
        let f = fixture();
        let principal = AuthenticatedPrincipal::for_user(f.user.clone());
        let task = f
            .service
            .create(&principal, NewTask { title: "a".into(), ..Default::default() })
            .unwrap();

        f.service
            .update(&principal, &task.id, TaskPatch { completed: Some(true), ..Default::default() })
            .unwrap();
        f.service
            .update(&principal, &task.id, TaskPatch { completed: Some(false), ..Default::default() })
            .unwrap();
        f.logger.flush().await;

        let records = all_records(&f.db);
        assert_eq!(records[0].action_kind, ActionKind::Uncomplete);
        assert_eq!(records[1].action_kind, ActionKind::Complete);
    }

    #[tokio::test]
    async fn ledger_outage_does_not_fail_mutation() {
        let f = fixture();
        f.db.with_conn(|conn| {
            conn.execute("DROP TABLE actions", [])?;
            Ok(())
        })
        .unwrap();

        let principal = AuthenticatedPrincipal::for_user(f.user.clone());
        let task = f
            .service
            .create(&principal, NewTask { title: "still works".into(), ..Default::default() })
            .unwrap();
        assert_eq!(task.title, "still works");

        f.logger.flush().await;
        assert_eq!(f.logger.stats().failed(), 1);
    }

    #[tokio::test]
    async fn agent_actions_carry_token_name() {
        let f = fixture();
        let principal = AuthenticatedPrincipal::for_agent(f.user.clone(), "zapier");
        f.service
            .create(&principal, NewTask { title: "a".into(), ..Default::default() })
            .unwrap();
        f.logger.flush().await;

        let records = all_records(&f.db);
        assert_eq!(records[0].actor_kind, ActorKind::Agent);
        assert_eq!(records[0].actor_id, f.user.id);
        assert_eq!(records[0].metadata.as_ref().unwrap()["token_name"], "zapier");
    }

    #[tokio::test]
    async fn metadata_title_reflects_rename() {
        let f = fixture();
        let principal = AuthenticatedPrincipal::for_user(f.user.clone());
        let task = f
            .service
            .create(&principal, NewTask { title: "old".into(), ..Default::default() })
            .unwrap();
        f.service
            .update(&principal, &task.id, TaskPatch { title: Some("new".into()), ..Default::default() })
            .unwrap();
        f.logger.flush().await;

        let records = all_records(&f.db);
        assert_eq!(records[0].metadata.as_ref().unwrap()["title"], "new");
    }

    #[tokio::test]
    async fn delete_logs_metadata_without_changes() {
        let f = fixture();
        let principal = AuthenticatedPrincipal::for_user(f.user.clone());
        let task = f
            .service
            .create(&principal, NewTask { title: "doomed".into(), ..Default::default() })
            .unwrap();
        f.service.delete(&principal, &task.id).unwrap();
        f.logger.flush().await;

        let records = all_records(&f.db);
        assert_eq!(records[0].action_kind, ActionKind::Delete);
        assert!(records[0].changes.is_none());
        assert_eq!(records[0].metadata.as_ref().unwrap()["title"], "doomed");
    }

    #[tokio::test]
    async fn comment_sync_logs_one_entry_per_added_comment() {
        let f = fixture();
        let principal = AuthenticatedPrincipal::for_user(f.user.clone());
        let task = f
            .service
            .create(&principal, NewTask { title: "t".into(), ..Default::default() })
            .unwrap();

        let a = f.service.add_comment(&principal, &task.id, "A").unwrap();
        f.service.add_comment(&principal, &task.id, "B").unwrap();
        f.logger.flush().await;
        let before = all_records(&f.db).len();

        // [A, B] -> [A, C]: one entry for added C, none for removed B
        let synced = f
            .service
            .sync_comments(
                &principal,
                &task.id,
                vec![
                    CommentInput { id: Some(a.id.clone()), content: "A".into() },
                    CommentInput { id: None, content: "C".into() },
                ],
            )
            .unwrap();
        f.logger.flush().await;

        assert_eq!(synced.len(), 2);
        let records = all_records(&f.db);
        assert_eq!(records.len(), before + 1);
        let added = &records[0];
        assert_eq!(added.action_kind, ActionKind::Update);
        assert_eq!(added.changes.as_ref().unwrap()["comments"], "added");
        assert!(added.metadata.as_ref().unwrap().contains_key("comment_id"));

        let remaining: Vec<String> =
            f.service.list_comments(&task.id).unwrap().iter().map(|c| c.content.clone()).collect();
        assert_eq!(remaining, vec!["A".to_string(), "C".to_string()]);
    }

    #[tokio::test]
    async fn comment_sync_with_unknown_submitted_id_inserts_fresh_row() {
        let f = fixture();
        let principal = AuthenticatedPrincipal::for_user(f.user.clone());
        let task = f
            .service
            .create(&principal, NewTask { title: "t".into(), ..Default::default() })
            .unwrap();

        let synced = f
            .service
            .sync_comments(
                &principal,
                &task.id,
                vec![CommentInput {
                    id: Some(CommentId::from_raw("cmt_from_elsewhere")),
                    content: "imported".into(),
                }],
            )
            .unwrap();
        assert_eq!(synced.len(), 1);
        assert_eq!(synced[0].content, "imported");
    }

    #[tokio::test]
    async fn empty_patch_mutates_and_logs_nothing() {
        let f = fixture();
        let principal = AuthenticatedPrincipal::for_user(f.user.clone());
        let task = f
            .service
            .create(&principal, NewTask { title: "a".into(), ..Default::default() })
            .unwrap();
        f.logger.flush().await;
        let before = all_records(&f.db).len();

        let unchanged = f.service.update(&principal, &task.id, TaskPatch::default()).unwrap();
        f.logger.flush().await;

        assert_eq!(unchanged.title, "a");
        assert_eq!(all_records(&f.db).len(), before);
    }
}
