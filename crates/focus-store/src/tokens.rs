//! API bearer tokens for agent authentication. The raw token is returned
//! exactly once at mint time; only its SHA-256 hex digest is stored, so a
//! lookup hashes the presented token and matches on the digest.

use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::instrument;

use focus_core::ids::{ApiTokenId, UserId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

const TOKEN_PREFIX: &str = "fct";

#[derive(Clone, Debug)]
pub struct ApiToken {
    pub id: ApiTokenId,
    pub user_id: UserId,
    pub name: String,
    pub created_at: String,
}

pub struct TokenRepo {
    db: Database,
}

impl TokenRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Mint a token for a user. Returns the row and the raw token string,
    /// which is never recoverable afterward.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn mint(&self, user_id: &UserId, name: &str) -> Result<(ApiToken, String), StoreError> {
        let id = ApiTokenId::new();
        let now = Utc::now().to_rfc3339();

        let mut raw = [0u8; 24];
        rand::thread_rng().fill_bytes(&mut raw);
        let secret: String = raw.iter().map(|b| format!("{b:02x}")).collect();
        let token = format!("{TOKEN_PREFIX}_{secret}");
        let hash = hash_token(&token);

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO api_tokens (id, user_id, name, token_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id.as_str(), user_id.as_str(), name, hash, now],
            )?;
            Ok(())
        })?;

        Ok((
            ApiToken {
                id,
                user_id: user_id.clone(),
                name: name.to_string(),
                created_at: now,
            },
            token,
        ))
    }

    /// Look up a token by its raw value. Returns None for unknown tokens.
    #[instrument(skip(self, token))]
    pub fn find_by_token(&self, token: &str) -> Result<Option<ApiToken>, StoreError> {
        let hash = hash_token(token);
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, created_at FROM api_tokens WHERE token_hash = ?1",
            )?;
            let mut rows = stmt.query([hash])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_token(row)?)),
                None => Ok(None),
            }
        })
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn list(&self, user_id: &UserId) -> Result<Vec<ApiToken>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, created_at FROM api_tokens
                 WHERE user_id = ?1 ORDER BY created_at DESC",
            )?;
            let mut rows = stmt.query([user_id.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_token(row)?);
            }
            Ok(results)
        })
    }

    #[instrument(skip(self), fields(token_id = %id))]
    pub fn revoke(&self, id: &ApiTokenId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM api_tokens WHERE id = ?1", [id.as_str()])?;
            Ok(())
        })
    }
}

fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn row_to_token(row: &rusqlite::Row<'_>) -> Result<ApiToken, StoreError> {
    Ok(ApiToken {
        id: ApiTokenId::from_raw(row_helpers::get::<String>(row, 0, "api_tokens", "id")?),
        user_id: UserId::from_raw(row_helpers::get::<String>(row, 1, "api_tokens", "user_id")?),
        name: row_helpers::get(row, 2, "api_tokens", "name")?,
        created_at: row_helpers::get(row, 3, "api_tokens", "created_at")?,
    })
}
