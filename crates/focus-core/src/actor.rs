//! Actor attribution. Every mutation is credited to a principal resolved
//! fresh for the request that carried it; agents act on behalf of the human
//! user that owns their token and are never a separate identity.

use serde::{Deserialize, Serialize};

use crate::domain::User;

#[derive(Clone, Debug, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    User,
    Agent,
    System,
}

impl std::fmt::Display for ActorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent => write!(f, "agent"),
            Self::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for ActorKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "agent" => Ok(Self::Agent),
            "system" => Ok(Self::System),
            other => Err(format!("unknown actor kind: {other}")),
        }
    }
}

/// Output of actor resolution. Constructed per request, never cached or
/// persisted; `token_label` is the human-readable name of the API token an
/// agent authenticated with, carried so ledger entries can show which
/// integration acted.
#[derive(Clone, Debug)]
pub struct AuthenticatedPrincipal {
    pub user: User,
    pub actor_kind: ActorKind,
    pub token_label: Option<String>,
}

impl AuthenticatedPrincipal {
    pub fn for_user(user: User) -> Self {
        Self {
            user,
            actor_kind: ActorKind::User,
            token_label: None,
        }
    }

    pub fn for_agent(user: User, token_label: impl Into<String>) -> Self {
        Self {
            user,
            actor_kind: ActorKind::Agent,
            token_label: Some(token_label.into()),
        }
    }

    pub fn is_agent(&self) -> bool {
        self.actor_kind == ActorKind::Agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::UserId;

    fn user() -> User {
        User {
            id: UserId::new(),
            email: "o@example.com".into(),
            name: "Owner".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn actor_kind_round_trip() {
        for k in [ActorKind::User, ActorKind::Agent, ActorKind::System] {
            let parsed: ActorKind = k.to_string().parse().unwrap();
            assert_eq!(parsed, k);
        }
        assert!("robot".parse::<ActorKind>().is_err());
    }

    #[test]
    fn user_principal_has_no_label() {
        let p = AuthenticatedPrincipal::for_user(user());
        assert_eq!(p.actor_kind, ActorKind::User);
        assert!(p.token_label.is_none());
        assert!(!p.is_agent());
    }

    #[test]
    fn agent_principal_keeps_owning_user() {
        let u = user();
        let p = AuthenticatedPrincipal::for_agent(u.clone(), "zapier");
        assert_eq!(p.user.id, u.id);
        assert_eq!(p.token_label.as_deref(), Some("zapier"));
        assert!(p.is_agent());
    }
}
