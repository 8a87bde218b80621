//! Actor resolution. Ordered, first match wins: a web session resolves to a
//! user principal, a bearer token to an agent principal acting on behalf of
//! the token's owner. Session-provider failures are swallowed so a broken
//! session check cannot lock out token-based agents.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use tracing::{debug, warn};

use focus_core::actor::AuthenticatedPrincipal;
use focus_core::domain::User;
use focus_store::tokens::TokenRepo;
use focus_store::users::UserRepo;
use focus_store::{Database, StoreError};

const SESSION_COOKIE: &str = "focus_session";

/// External session collaborator. The default implementation resolves the
/// session cookie against the web_sessions table; deployments with their own
/// auth stack swap this out.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session_user(&self, headers: &HeaderMap) -> Result<Option<User>, StoreError>;
}

pub struct StoreSessionProvider {
    users: UserRepo,
}

impl StoreSessionProvider {
    pub fn new(db: Database) -> Self {
        Self {
            users: UserRepo::new(db),
        }
    }
}

#[async_trait]
impl SessionProvider for StoreSessionProvider {
    async fn session_user(&self, headers: &HeaderMap) -> Result<Option<User>, StoreError> {
        let Some(token) = session_cookie(headers) else {
            return Ok(None);
        };
        self.users.find_session_user(token)
    }
}

pub struct ActorResolver {
    session_provider: Arc<dyn SessionProvider>,
    tokens: TokenRepo,
    users: UserRepo,
}

impl ActorResolver {
    pub fn new(db: Database, session_provider: Arc<dyn SessionProvider>) -> Self {
        Self {
            session_provider,
            tokens: TokenRepo::new(db.clone()),
            users: UserRepo::new(db),
        }
    }

    /// Resolve the acting principal for a request, or None when
    /// unauthenticated. Read-only; no state is cached across requests.
    pub async fn resolve(&self, headers: &HeaderMap) -> Option<AuthenticatedPrincipal> {
        match self.session_provider.session_user(headers).await {
            Ok(Some(user)) => return Some(AuthenticatedPrincipal::for_user(user)),
            Ok(None) => {}
            Err(e) => {
                debug!(error = %e, "session provider failed, falling through to bearer token");
            }
        }

        let raw = bearer_token(headers)?;
        let token = match self.tokens.find_by_token(raw) {
            Ok(Some(token)) => token,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "token lookup failed");
                return None;
            }
        };
        let user = match self.users.get(&token.user_id) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, token_id = %token.id, "token owner lookup failed");
                return None;
            }
        };

        Some(AuthenticatedPrincipal::for_agent(user, token.name))
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use focus_core::actor::ActorKind;

    struct FailingProvider;

    #[async_trait]
    impl SessionProvider for FailingProvider {
        async fn session_user(&self, _headers: &HeaderMap) -> Result<Option<User>, StoreError> {
            Err(StoreError::Database("session backend down".into()))
        }
    }

    fn setup() -> (Database, User) {
        let db = Database::in_memory().unwrap();
        let user = UserRepo::new(db.clone()).create("a@example.com", "A").unwrap();
        (db, user)
    }

    fn resolver(db: &Database) -> ActorResolver {
        ActorResolver::new(
            db.clone(),
            Arc::new(StoreSessionProvider::new(db.clone())),
        )
    }

    fn cookie_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, format!("theme=dark; focus_session={token}").parse().unwrap());
        headers
    }

    fn bearer_headers(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
        headers
    }

    #[tokio::test]
    async fn session_cookie_resolves_to_user_principal() {
        let (db, user) = setup();
        let session = UserRepo::new(db.clone()).create_session(&user.id).unwrap();

        let principal = resolver(&db).resolve(&cookie_headers(&session)).await.unwrap();
        assert_eq!(principal.actor_kind, ActorKind::User);
        assert_eq!(principal.user.id, user.id);
        assert!(principal.token_label.is_none());
    }

    #[tokio::test]
    async fn bearer_token_resolves_to_agent_principal() {
        let (db, user) = setup();
        let (_, raw) = TokenRepo::new(db.clone()).mint(&user.id, "zapier").unwrap();

        let principal = resolver(&db).resolve(&bearer_headers(&raw)).await.unwrap();
        assert_eq!(principal.actor_kind, ActorKind::Agent);
        assert_eq!(principal.user.id, user.id);
        assert_eq!(principal.token_label.as_deref(), Some("zapier"));
    }

    #[tokio::test]
    async fn session_wins_over_bearer_token() {
        let (db, user) = setup();
        let session = UserRepo::new(db.clone()).create_session(&user.id).unwrap();
        let (_, raw) = TokenRepo::new(db.clone()).mint(&user.id, "zapier").unwrap();

        let mut headers = cookie_headers(&session);
        headers.insert(AUTHORIZATION, format!("Bearer {raw}").parse().unwrap());

        let principal = resolver(&db).resolve(&headers).await.unwrap();
        assert_eq!(principal.actor_kind, ActorKind::User);
    }

    #[tokio::test]
    async fn broken_session_provider_falls_through_to_token() {
        let (db, user) = setup();
        let (_, raw) = TokenRepo::new(db.clone()).mint(&user.id, "zapier").unwrap();

        let resolver = ActorResolver::new(db, Arc::new(FailingProvider));
        let principal = resolver.resolve(&bearer_headers(&raw)).await.unwrap();
        assert_eq!(principal.actor_kind, ActorKind::Agent);
    }

    #[tokio::test]
    async fn unknown_token_fails_resolution() {
        let (db, _) = setup();
        assert!(resolver(&db).resolve(&bearer_headers("fct_bogus")).await.is_none());
    }

    #[tokio::test]
    async fn malformed_authorization_header_fails_resolution() {
        let (db, user) = setup();
        let (_, raw) = TokenRepo::new(db.clone()).mint(&user.id, "zapier").unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Basic {raw}").parse().unwrap());
        assert!(resolver(&db).resolve(&headers).await.is_none());
    }

    #[tokio::test]
    async fn no_credentials_fails_resolution() {
        let (db, _) = setup();
        assert!(resolver(&db).resolve(&HeaderMap::new()).await.is_none());
    }

    #[test]
    fn cookie_parsing_handles_multiple_pairs() {
        let headers = cookie_headers("abc123");
        assert_eq!(session_cookie(&headers), Some("abc123"));

        let mut other = HeaderMap::new();
        other.insert(COOKIE, "focus_session_old=zzz; theme=dark".parse().unwrap());
        assert_eq!(session_cookie(&other), None);
    }
}
