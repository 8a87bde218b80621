//! Action-ledger types. A record is written once per logical mutation and is
//! immutable afterward except for its read flag, which only ever moves
//! false→true.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::actor::ActorKind;
use crate::ids::{ActionId, UserId};

#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Task,
    Project,
    Goal,
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::Project => write!(f, "project"),
            Self::Goal => write!(f, "goal"),
        }
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(Self::Task),
            "project" => Ok(Self::Project),
            "goal" => Ok(Self::Goal),
            other => Err(format!("unknown entity type: {other}")),
        }
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    Complete,
    Uncomplete,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Complete => write!(f, "complete"),
            Self::Uncomplete => write!(f, "uncomplete"),
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "complete" => Ok(Self::Complete),
            "uncomplete" => Ok(Self::Uncomplete),
            other => Err(format!("unknown action kind: {other}")),
        }
    }
}

/// Input to a ledger write. Id, read flag, and timestamp are assigned at
/// insert time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionInput {
    pub entity_id: String,
    pub entity_type: EntityType,
    /// Always the owning human user, also for agent-initiated actions.
    pub actor_id: UserId,
    pub actor_kind: ActorKind,
    pub action_kind: ActionKind,
    /// Field-level diff for update-family actions; the defining field for
    /// creates; absent for deletes.
    pub changes: Option<Map<String, Value>>,
    /// Denormalized display data: entity name/title, `token_name` for agent
    /// actions, `comment_id` for comment-sync entries.
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionRecord {
    pub id: ActionId,
    pub entity_id: String,
    pub entity_type: EntityType,
    pub actor_id: UserId,
    pub actor_kind: ActorKind,
    pub action_kind: ActionKind,
    pub changes: Option<Map<String, Value>>,
    pub metadata: Option<Map<String, Value>>,
    pub is_read: bool,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_type_round_trip() {
        for t in [EntityType::Task, EntityType::Project, EntityType::Goal] {
            let parsed: EntityType = t.to_string().parse().unwrap();
            assert_eq!(parsed, t);
        }
        assert!("comment".parse::<EntityType>().is_err());
    }

    #[test]
    fn action_kind_round_trip() {
        for k in [
            ActionKind::Create,
            ActionKind::Update,
            ActionKind::Delete,
            ActionKind::Complete,
            ActionKind::Uncomplete,
        ] {
            let parsed: ActionKind = k.to_string().parse().unwrap();
            assert_eq!(parsed, k);
        }
    }

    #[test]
    fn record_serializes_snake_case() {
        let record = ActionRecord {
            id: ActionId::from_raw("act_1"),
            entity_id: "task_1".into(),
            entity_type: EntityType::Task,
            actor_id: UserId::from_raw("user_1"),
            actor_kind: ActorKind::Agent,
            action_kind: ActionKind::Uncomplete,
            changes: None,
            metadata: None,
            is_read: false,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["actor_kind"], "agent");
        assert_eq!(json["action_kind"], "uncomplete");
        assert_eq!(json["entity_type"], "task");
    }
}
