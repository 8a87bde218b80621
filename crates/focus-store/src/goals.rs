use chrono::Utc;
use tracing::instrument;

use focus_core::domain::{Goal, GoalPatch, NewGoal};
use focus_core::ids::{GoalId, UserId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

pub struct GoalRepo {
    db: Database,
}

impl GoalRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, new), fields(user_id = %user_id))]
    pub fn create(&self, user_id: &UserId, new: &NewGoal) -> Result<Goal, StoreError> {
        let id = GoalId::new();
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO goals (id, user_id, name, description, target_date, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id.as_str(),
                    user_id.as_str(),
                    new.name,
                    new.description,
                    new.target_date,
                    now,
                    now,
                ],
            )?;
            Ok(Goal {
                id: id.clone(),
                user_id: user_id.clone(),
                name: new.name.clone(),
                description: new.description.clone(),
                target_date: new.target_date.clone(),
                created_at: now.clone(),
                updated_at: now.clone(),
            })
        })
    }

    #[instrument(skip(self), fields(goal_id = %id))]
    pub fn get(&self, id: &GoalId) -> Result<Goal, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, description, target_date, created_at, updated_at
                 FROM goals WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_goal(row),
                None => Err(StoreError::NotFound(format!("goal {id}"))),
            }
        })
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn list(&self, user_id: &UserId) -> Result<Vec<Goal>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, description, target_date, created_at, updated_at
                 FROM goals WHERE user_id = ?1 ORDER BY created_at DESC",
            )?;
            let mut rows = stmt.query([user_id.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_goal(row)?);
            }
            Ok(results)
        })
    }

    #[instrument(skip(self, patch), fields(goal_id = %id))]
    pub fn update(&self, id: &GoalId, patch: &GoalPatch) -> Result<Goal, StoreError> {
        if patch.is_empty() {
            return self.get(id);
        }

        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let mut sets: Vec<&str> = Vec::new();
            let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
            if let Some(name) = &patch.name {
                sets.push("name = ?");
                params.push(Box::new(name.clone()));
            }
            if let Some(description) = &patch.description {
                sets.push("description = ?");
                params.push(Box::new(description.clone()));
            }
            if let Some(target_date) = &patch.target_date {
                sets.push("target_date = ?");
                params.push(Box::new(target_date.clone()));
            }
            sets.push("updated_at = ?");
            params.push(Box::new(now.clone()));
            params.push(Box::new(id.as_str().to_string()));

            let sql = format!("UPDATE goals SET {} WHERE id = ?", sets.join(", "));
            let updated = conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
            if updated == 0 {
                return Err(StoreError::NotFound(format!("goal {id}")));
            }
            Ok(())
        })?;

        self.get(id)
    }

    #[instrument(skip(self), fields(goal_id = %id))]
    pub fn delete(&self, id: &GoalId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM goals WHERE id = ?1", [id.as_str()])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(format!("goal {id}")));
            }
            Ok(())
        })
    }
}

fn row_to_goal(row: &rusqlite::Row<'_>) -> Result<Goal, StoreError> {
    Ok(Goal {
        id: GoalId::from_raw(row_helpers::get::<String>(row, 0, "goals", "id")?),
        user_id: UserId::from_raw(row_helpers::get::<String>(row, 1, "goals", "user_id")?),
        name: row_helpers::get(row, 2, "goals", "name")?,
        description: row_helpers::get_opt(row, 3, "goals", "description")?,
        target_date: row_helpers::get_opt(row, 4, "goals", "target_date")?,
        created_at: row_helpers::get(row, 5, "goals", "created_at")?,
        updated_at: row_helpers::get(row, 6, "goals", "updated_at")?,
    })
}
