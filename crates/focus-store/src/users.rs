//! User rows plus the web-session rows consumed by the cookie session
//! provider. Session tokens are opaque random strings handed to the browser;
//! the provider itself lives in focus-server behind a trait.

use chrono::Utc;
use rand::RngCore;
use tracing::instrument;

use focus_core::domain::User;
use focus_core::ids::UserId;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

pub struct UserRepo {
    db: Database,
}

impl UserRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub fn create(&self, email: &str, name: &str) -> Result<User, StoreError> {
        let id = UserId::new();
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id.as_str(), email, name, now],
            )?;
            Ok(User {
                id: id.clone(),
                email: email.to_string(),
                name: name.to_string(),
                created_at: now.clone(),
            })
        })
    }

    #[instrument(skip(self), fields(user_id = %id))]
    pub fn get(&self, id: &UserId) -> Result<User, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, email, name, created_at FROM users WHERE id = ?1")?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_user(row),
                None => Err(StoreError::NotFound(format!("user {id}"))),
            }
        })
    }

    /// Fetch by email, creating the user when absent. Used by bootstrap.
    #[instrument(skip(self))]
    pub fn get_or_create(&self, email: &str, name: &str) -> Result<User, StoreError> {
        let existing = self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, email, name, created_at FROM users WHERE email = ?1")?;
            let mut rows = stmt.query([email])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_user(row)?)),
                None => Ok(None),
            }
        })?;

        match existing {
            Some(user) => Ok(user),
            None => self.create(email, name),
        }
    }

    /// Mint a web session for a user. Returns the opaque session token.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn create_session(&self, user_id: &UserId) -> Result<String, StoreError> {
        let mut raw = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut raw);
        let token: String = raw.iter().map(|b| format!("{b:02x}")).collect();
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO web_sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![token, user_id.as_str(), now],
            )?;
            Ok(token.clone())
        })
    }

    /// Resolve a session token to its user, if the session exists.
    #[instrument(skip(self, token))]
    pub fn find_session_user(&self, token: &str) -> Result<Option<User>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.name, u.created_at
                 FROM web_sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1",
            )?;
            let mut rows = stmt.query([token])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_user(row)?)),
                None => Ok(None),
            }
        })
    }

    #[instrument(skip(self, token))]
    pub fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM web_sessions WHERE token = ?1", [token])?;
            Ok(())
        })
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<User, StoreError> {
    Ok(User {
        id: UserId::from_raw(row_helpers::get::<String>(row, 0, "users", "id")?),
        email: row_helpers::get(row, 1, "users", "email")?,
        name: row_helpers::get(row, 2, "users", "name")?,
        created_at: row_helpers::get(row, 3, "users", "created_at")?,
    })
}
