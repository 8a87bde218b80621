//! Read and mark-read paths over the action ledger. Unlike the write path,
//! these propagate store errors to the caller — silent failure here would
//! hide bugs rather than protect a mutation.

use tracing::instrument;

use focus_core::action::{ActionRecord, EntityType};
use focus_core::actor::{ActorKind, AuthenticatedPrincipal};
use focus_core::ids::ActionId;
use focus_store::actions::{ActionQuery, ActionRepo};
use focus_store::{Database, StoreError};

/// Caller-supplied filters for a feed read; the viewer comes from the
/// resolved principal.
#[derive(Clone, Debug, Default)]
pub struct ActionListRequest {
    pub actor_kind: Option<ActorKind>,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub is_read: Option<bool>,
    pub include_own: bool,
    pub limit: Option<u32>,
}

pub struct ActionService {
    repo: ActionRepo,
}

impl ActionService {
    pub fn new(db: Database) -> Self {
        Self {
            repo: ActionRepo::new(db),
        }
    }

    #[instrument(skip(self, principal, request), fields(viewer = %principal.user.id))]
    pub fn list(
        &self,
        principal: &AuthenticatedPrincipal,
        request: ActionListRequest,
    ) -> Result<Vec<ActionRecord>, StoreError> {
        let query = ActionQuery {
            viewer: principal.user.id.clone(),
            actor_kind: request.actor_kind,
            entity_type: request.entity_type,
            entity_id: request.entity_id,
            is_read: request.is_read,
            include_own: request.include_own,
            limit: request.limit,
        };
        self.repo.query(&query)
    }

    pub fn mark_read(&self, ids: &[ActionId]) -> Result<(), StoreError> {
        self.repo.mark_read(ids)
    }

    pub fn mark_all_read(&self, principal: &AuthenticatedPrincipal) -> Result<(), StoreError> {
        self.repo.mark_all_read(&principal.user.id)
    }

    pub fn unread_count(&self, principal: &AuthenticatedPrincipal) -> Result<u32, StoreError> {
        self.repo.unread_count(&principal.user.id)
    }
}
