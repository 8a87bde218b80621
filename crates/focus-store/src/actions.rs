//! The action ledger: an append-only log of domain mutations with per-record
//! read state. Retrieval is ordered by creation time, newest first, and the
//! default visibility rule hides a viewer's own user-kind actions while
//! keeping agent actions visible — the feed exists to surface what
//! automation did.

use chrono::Utc;
use tracing::instrument;

use focus_core::action::{ActionInput, ActionRecord, EntityType};
use focus_core::actor::ActorKind;
use focus_core::ids::{ActionId, UserId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

pub const DEFAULT_LIMIT: u32 = 50;
pub const MAX_LIMIT: u32 = 100;

/// Filters for ledger retrieval. All present filters combine conjunctively.
#[derive(Clone, Debug)]
pub struct ActionQuery {
    pub viewer: UserId,
    pub actor_kind: Option<ActorKind>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub is_read: Option<bool>,
    /// When false (the default), records where the viewer acted as a plain
    /// user are excluded; agent records attributed to the viewer remain
    /// visible.
    pub include_own: bool,
    pub limit: Option<u32>,
}

impl ActionQuery {
    pub fn for_viewer(viewer: UserId) -> Self {
        Self {
            viewer,
            actor_kind: None,
            entity_type: None,
            entity_id: None,
            is_read: None,
            include_own: false,
            limit: None,
        }
    }
}

pub struct ActionRepo {
    db: Database,
}

impl ActionRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append a record. Assigns id, read flag, and timestamp.
    #[instrument(skip(self, input), fields(entity_id = %input.entity_id, kind = %input.action_kind))]
    pub fn insert(&self, input: &ActionInput) -> Result<ActionRecord, StoreError> {
        let id = ActionId::new();
        let now = Utc::now().to_rfc3339();

        let changes_json = input
            .changes
            .as_ref()
            .map(|m| serde_json::to_string(m))
            .transpose()?;
        let metadata_json = input
            .metadata
            .as_ref()
            .map(|m| serde_json::to_string(m))
            .transpose()?;

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO actions (id, entity_id, entity_type, actor_id, actor_kind,
                                      action_kind, changes, metadata, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)",
                rusqlite::params![
                    id.as_str(),
                    input.entity_id,
                    input.entity_type.to_string(),
                    input.actor_id.as_str(),
                    input.actor_kind.to_string(),
                    input.action_kind.to_string(),
                    changes_json,
                    metadata_json,
                    now,
                ],
            )?;
            Ok(ActionRecord {
                id: id.clone(),
                entity_id: input.entity_id.clone(),
                entity_type: input.entity_type,
                actor_id: input.actor_id.clone(),
                actor_kind: input.actor_kind,
                action_kind: input.action_kind,
                changes: input.changes.clone(),
                metadata: input.metadata.clone(),
                is_read: false,
                created_at: now.clone(),
            })
        })
    }

    /// Retrieve records, newest first, capped at the clamped limit.
    #[instrument(skip(self, query), fields(viewer = %query.viewer))]
    pub fn query(&self, query: &ActionQuery) -> Result<Vec<ActionRecord>, StoreError> {
        let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        self.db.with_conn(|conn| {
            let mut clauses: Vec<String> = Vec::new();
            let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

            if !query.include_own {
                clauses.push("NOT (actor_kind = 'user' AND actor_id = ?)".into());
                params.push(Box::new(query.viewer.as_str().to_string()));
            }
            if let Some(kind) = &query.actor_kind {
                clauses.push("actor_kind = ?".into());
                params.push(Box::new(kind.to_string()));
            }
            if let Some(entity_type) = &query.entity_type {
                clauses.push("entity_type = ?".into());
                params.push(Box::new(entity_type.to_string()));
            }
            if let Some(entity_id) = &query.entity_id {
                clauses.push("entity_id = ?".into());
                params.push(Box::new(entity_id.clone()));
            }
            if let Some(is_read) = query.is_read {
                clauses.push("is_read = ?".into());
                params.push(Box::new(is_read as i64));
            }

            let where_sql = if clauses.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", clauses.join(" AND "))
            };
            let sql = format!(
                "{ACTION_SELECT} {where_sql} ORDER BY created_at DESC, id DESC LIMIT {limit}"
            );

            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(rusqlite::params_from_iter(params.iter()))?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_action(row)?);
            }
            Ok(results)
        })
    }

    /// Set the read flag on exactly the given records. Empty input returns
    /// without touching the store.
    #[instrument(skip(self, ids))]
    pub fn mark_read(&self, ids: &[ActionId]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }

        self.db.with_conn(|conn| {
            let placeholders: Vec<&str> = ids.iter().map(|_| "?").collect();
            let sql = format!(
                "UPDATE actions SET is_read = 1 WHERE id IN ({})",
                placeholders.join(", ")
            );
            let params: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
            conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
            Ok(())
        })
    }

    /// Mark every unread record visible to the viewer under the default
    /// visibility rule.
    #[instrument(skip(self), fields(viewer = %viewer))]
    pub fn mark_all_read(&self, viewer: &UserId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE actions SET is_read = 1
                 WHERE is_read = 0 AND NOT (actor_kind = 'user' AND actor_id = ?1)",
                [viewer.as_str()],
            )?;
            Ok(())
        })
    }

    /// Count unread records under the default visibility rule.
    #[instrument(skip(self), fields(viewer = %viewer))]
    pub fn unread_count(&self, viewer: &UserId) -> Result<u32, StoreError> {
        self.db.with_conn(|conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*) FROM actions
                 WHERE is_read = 0 AND NOT (actor_kind = 'user' AND actor_id = ?1)",
                [viewer.as_str()],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

const ACTION_SELECT: &str = "SELECT id, entity_id, entity_type, actor_id, actor_kind,
                                    action_kind, changes, metadata, is_read, created_at
                             FROM actions";

fn row_to_action(row: &rusqlite::Row<'_>) -> Result<ActionRecord, StoreError> {
    let entity_type_str: String = row_helpers::get(row, 2, "actions", "entity_type")?;
    let actor_kind_str: String = row_helpers::get(row, 4, "actions", "actor_kind")?;
    let action_kind_str: String = row_helpers::get(row, 5, "actions", "action_kind")?;

    Ok(ActionRecord {
        id: ActionId::from_raw(row_helpers::get::<String>(row, 0, "actions", "id")?),
        entity_id: row_helpers::get(row, 1, "actions", "entity_id")?,
        entity_type: row_helpers::parse_enum(&entity_type_str, "actions", "entity_type")?,
        actor_id: UserId::from_raw(row_helpers::get::<String>(row, 3, "actions", "actor_id")?),
        actor_kind: row_helpers::parse_enum(&actor_kind_str, "actions", "actor_kind")?,
        action_kind: row_helpers::parse_enum(&action_kind_str, "actions", "action_kind")?,
        changes: row_helpers::parse_json_map(
            row_helpers::get_opt(row, 6, "actions", "changes")?,
            "actions",
            "changes",
        )?,
        metadata: row_helpers::parse_json_map(
            row_helpers::get_opt(row, 7, "actions", "metadata")?,
            "actions",
            "metadata",
        )?,
        is_read: row_helpers::get_bool(row, 8, "actions", "is_read")?,
        created_at: row_helpers::get(row, 9, "actions", "created_at")?,
    })
}
