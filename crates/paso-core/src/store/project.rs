use chrono::Utc;

use crate::error::PasoError;
use crate::types::{ChangeDescriptor, ChangeKind, EntityKind, Project, ProjectId};

use super::{map_project, Store, PROJECT_COLUMNS};

/// Default columns seeded for every new project, in head-to-tail order,
/// paired with the distinguished flag each one carries (if any).
const DEFAULT_COLUMNS: &[(&str, Option<&str>)] =
    &[("Todo", Some("holds_ready_tasks")), ("In Progress", Some("holds_in_progress_tasks")), ("Done", Some("holds_completed_tasks"))];

impl Store {
    /// Creates a project, its ticket counter, and its three default
    /// columns (`Todo` / `In Progress` / `Done`, linked head to tail with
    /// their distinguished flags already set).
    pub async fn create_project(&self, name: &str) -> Result<(Project, ChangeDescriptor), PasoError> {
        self.create_project_with_description(name, None).await
    }

    pub async fn create_project_with_description(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<(Project, ChangeDescriptor), PasoError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(PasoError::validation("project name must not be empty"));
        }
        let description = description.map(|s| s.to_string());
        let created_at = Utc::now().to_rfc3339();
        let name_for_db = name.clone();

        let id: i64 = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO projects (name, description, created_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![name_for_db, description, created_at],
                )?;
                let project_id = tx.last_insert_rowid();
                tx.execute(
                    "INSERT INTO project_counters (project_id, next_ticket) VALUES (?1, 1)",
                    rusqlite::params![project_id],
                )?;

                let mut prev_id: Option<i64> = None;
                let mut column_ids = Vec::with_capacity(DEFAULT_COLUMNS.len());
                for (name, _) in DEFAULT_COLUMNS {
                    tx.execute(
                        "INSERT INTO columns (project_id, name, prev_id) VALUES (?1, ?2, ?3)",
                        rusqlite::params![project_id, name, prev_id],
                    )?;
                    let column_id = tx.last_insert_rowid();
                    if let Some(prev) = prev_id {
                        tx.execute("UPDATE columns SET next_id = ?1 WHERE id = ?2", rusqlite::params![column_id, prev])?;
                    }
                    column_ids.push(column_id);
                    prev_id = Some(column_id);
                }
                for ((_, flag), column_id) in DEFAULT_COLUMNS.iter().zip(column_ids.iter()) {
                    if let Some(flag) = flag {
                        tx.execute(&format!("UPDATE columns SET {flag} = 1 WHERE id = ?1"), rusqlite::params![column_id])?;
                    }
                }

                tx.commit()?;
                Ok(project_id)
            })
            .await
            .map_err(map_unique_violation)?;

        let project = self.get_project(ProjectId(id)).await?;
        let change = ChangeDescriptor {
            project_id: ProjectId(id),
            entity_kind: EntityKind::Project,
            entity_id: Some(id),
            kind: ChangeKind::Created,
        };
        Ok((project, change))
    }

    pub async fn get_project(&self, id: ProjectId) -> Result<Project, PasoError> {
        let raw = id.0;
        let found: Option<Project> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"))?;
                let mut rows = stmt.query(rusqlite::params![raw])?;
                match rows.next()? {
                    Some(row) => Ok(Some(map_project(row)?)),
                    None => Ok(None),
                }
            })
            .await?;
        found.ok_or_else(|| PasoError::not_found("project", raw.to_string()))
    }

    pub async fn get_project_by_name(&self, name: &str) -> Result<Project, PasoError> {
        let name = name.to_string();
        let name_for_err = name.clone();
        let found: Option<Project> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE name = ?1"))?;
                let mut rows = stmt.query(rusqlite::params![name])?;
                match rows.next()? {
                    Some(row) => Ok(Some(map_project(row)?)),
                    None => Ok(None),
                }
            })
            .await?;
        found.ok_or_else(|| PasoError::not_found("project", name_for_err))
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, PasoError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name"))?;
                let mut rows = stmt.query([])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(map_project(row)?);
                }
                Ok(out)
            })
            .await
            .map_err(PasoError::from)
    }

    /// Updates a project's name and/or description. Either field left as
    /// `None` is left unchanged.
    pub async fn update_project(
        &self,
        id: ProjectId,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> Result<(Project, ChangeDescriptor), PasoError> {
        if let Some(n) = name {
            if n.trim().is_empty() {
                return Err(PasoError::validation("project name must not be empty"));
            }
        }
        let raw = id.0;
        let name = name.map(|s| s.trim().to_string());
        let description = description.map(|d| d.map(|s| s.to_string()));

        self.conn
            .call(move |conn| {
                if let Some(name) = &name {
                    conn.execute("UPDATE projects SET name = ?1 WHERE id = ?2", rusqlite::params![name, raw])?;
                }
                if let Some(description) = &description {
                    conn.execute("UPDATE projects SET description = ?1 WHERE id = ?2", rusqlite::params![description, raw])?;
                }
                Ok(())
            })
            .await
            .map_err(map_unique_violation)?;

        let project = self.get_project(id).await?;
        let change = ChangeDescriptor { project_id: id, entity_kind: EntityKind::Project, entity_id: Some(raw), kind: ChangeKind::Updated };
        Ok((project, change))
    }

    /// Deletes a project. Foreign-key cascades remove its counter,
    /// columns, tasks, labels, and relations in the same transaction.
    pub async fn delete_project(&self, id: ProjectId) -> Result<ChangeDescriptor, PasoError> {
        let _project = self.get_project(id).await?;
        let raw = id.0;
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM projects WHERE id = ?1", rusqlite::params![raw])?;
                Ok(())
            })
            .await?;
        Ok(ChangeDescriptor { project_id: id, entity_kind: EntityKind::Project, entity_id: Some(raw), kind: ChangeKind::Deleted })
    }

    /// Allocates and returns the next monotonic ticket number for a project.
    /// Called from inside a `tokio_rusqlite` blocking closure, so this is a
    /// plain synchronous function, not `async`.
    pub(crate) fn next_ticket_number(
        tx: &rusqlite::Transaction<'_>,
        project_id: i64,
    ) -> rusqlite::Result<i64> {
        let ticket: i64 = tx.query_row(
            "UPDATE project_counters SET next_ticket = next_ticket + 1
             WHERE project_id = ?1 RETURNING next_ticket - 1",
            rusqlite::params![project_id],
            |r| r.get(0),
        )?;
        Ok(ticket)
    }
}

fn map_unique_violation(err: tokio_rusqlite::Error) -> PasoError {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)) = &err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation {
            return PasoError::validation("a project with that name already exists");
        }
    }
    PasoError::from(err)
}

#[cfg(test)]
mod tests {
    use super::super::Store;

    #[tokio::test]
    async fn create_and_fetch_project() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _change) = store.create_project("demo").await.unwrap();
        assert_eq!(project.name, "demo");
        let fetched = store.get_project(project.id).await.unwrap();
        assert_eq!(fetched.id, project.id);
    }

    #[tokio::test]
    async fn create_project_seeds_default_columns() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let columns = store.list_columns(project.id).await.unwrap();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "Todo");
        assert!(columns[0].holds_ready_tasks);
        assert_eq!(columns[1].name, "In Progress");
        assert!(columns[1].holds_in_progress_tasks);
        assert_eq!(columns[2].name, "Done");
        assert!(columns[2].holds_completed_tasks);
        assert!(columns[0].prev_id.is_none());
        assert!(columns[2].next_id.is_none());
    }

    #[tokio::test]
    async fn duplicate_project_name_is_rejected() {
        let store = Store::open_in_memory().await.unwrap();
        store.create_project("demo").await.unwrap();
        let err = store.create_project("demo").await.unwrap_err();
        assert!(matches!(err, super::PasoError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let store = Store::open_in_memory().await.unwrap();
        let err = store.create_project("   ").await.unwrap_err();
        assert!(matches!(err, super::PasoError::Validation(_)));
    }

    #[tokio::test]
    async fn delete_project_cascades_to_tasks() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let columns = store.list_columns(project.id).await.unwrap();
        let (task, _) = store.create_task(project.id, columns[0].id, "T1", None).await.unwrap();

        store.delete_project(project.id).await.unwrap();

        assert!(store.get_project(project.id).await.is_err());
        assert!(store.get_task(task.id).await.is_err());
    }

    #[tokio::test]
    async fn update_project_name_and_description() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let (updated, _) = store.update_project(project.id, Some("renamed"), Some(Some("a board"))).await.unwrap();
        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.description.as_deref(), Some("a board"));
    }
}
