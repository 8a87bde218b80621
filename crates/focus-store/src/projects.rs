use chrono::Utc;
use tracing::instrument;

use focus_core::domain::{NewProject, Project, ProjectPatch};
use focus_core::ids::{ProjectId, UserId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

pub struct ProjectRepo {
    db: Database,
}

impl ProjectRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self, new), fields(user_id = %user_id))]
    pub fn create(&self, user_id: &UserId, new: &NewProject) -> Result<Project, StoreError> {
        let id = ProjectId::new();
        let now = Utc::now().to_rfc3339();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (id, user_id, name, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id.as_str(), user_id.as_str(), new.name, new.description, now, now],
            )?;
            Ok(Project {
                id: id.clone(),
                user_id: user_id.clone(),
                name: new.name.clone(),
                description: new.description.clone(),
                created_at: now.clone(),
                updated_at: now.clone(),
            })
        })
    }

    #[instrument(skip(self), fields(project_id = %id))]
    pub fn get(&self, id: &ProjectId) -> Result<Project, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, description, created_at, updated_at
                 FROM projects WHERE id = ?1",
            )?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_project(row),
                None => Err(StoreError::NotFound(format!("project {id}"))),
            }
        })
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn list(&self, user_id: &UserId) -> Result<Vec<Project>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, description, created_at, updated_at
                 FROM projects WHERE user_id = ?1 ORDER BY created_at DESC",
            )?;
            let mut rows = stmt.query([user_id.as_str()])?;
            let mut results = Vec::new();
            while let Some(row) = rows.next()? {
                results.push(row_to_project(row)?);
            }
            Ok(results)
        })
    }

    /// Apply a patch and return the fresh row. An empty patch is a no-op
    /// read.
    #[instrument(skip(self, patch), fields(project_id = %id))]
    pub fn update(&self, id: &ProjectId, patch: &ProjectPatch) -> Result<Project, StoreError> {
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
            sets.push("updated_at = ?");
            params.push(Box::new(now.clone()));
            params.push(Box::new(id.as_str().to_string()));

            let sql = format!("UPDATE projects SET {} WHERE id = ?", sets.join(", "));
            let updated = conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?;
            if updated == 0 {
                return Err(StoreError::NotFound(format!("project {id}")));
            }
            Ok(())
        })?;

        self.get(id)
    }

    #[instrument(skip(self), fields(project_id = %id))]
    pub fn delete(&self, id: &ProjectId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            conn.execute("UPDATE tasks SET project_id = NULL WHERE project_id = ?1", [id.as_str()])?;
            let deleted = conn.execute("DELETE FROM projects WHERE id = ?1", [id.as_str()])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(format!("project {id}")));
            }
            Ok(())
        })
    }
}

fn row_to_project(row: &rusqlite::Row<'_>) -> Result<Project, StoreError> {
    Ok(Project {
        id: ProjectId::from_raw(row_helpers::get::<String>(row, 0, "projects", "id")?),
        user_id: UserId::from_raw(row_helpers::get::<String>(row, 1, "projects", "user_id")?),
        name: row_helpers::get(row, 2, "projects", "name")?,
        description: row_helpers::get_opt(row, 3, "projects", "description")?,
        created_at: row_helpers::get(row, 4, "projects", "created_at")?,
        updated_at: row_helpers::get(row, 5, "projects", "updated_at")?,
    })
}
