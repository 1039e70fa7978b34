use crate::error::PasoError;
use crate::types::{ChangeDescriptor, ChangeKind, EntityKind, Label, LabelId, ProjectId};

use super::{map_label, Store, LABEL_COLUMNS};

const MAX_NAME_LEN: usize = 50;

/// Validates the `#rrggbb` hex format §3 requires for a label color.
fn is_valid_hex_color(color: &str) -> bool {
    let Some(hex) = color.strip_prefix('#') else { return false };
    hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit())
}

impl Store {
    pub async fn create_label(
        &self,
        project_id: ProjectId,
        name: &str,
        color: &str,
    ) -> Result<(Label, ChangeDescriptor), PasoError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(PasoError::validation("label name must not be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(PasoError::validation(format!("label name must be at most {MAX_NAME_LEN} characters")));
        }
        let color = color.trim().to_string();
        if !is_valid_hex_color(&color) {
            return Err(PasoError::validation("label color must be a '#' followed by 6 hex digits"));
        }
        let pid = project_id.0;

        let id: i64 = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO labels (project_id, name, color) VALUES (?1, ?2, ?3)",
                    rusqlite::params![pid, name, color],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(map_unique_violation)?;

        let label = self.get_label(LabelId(id)).await?;
        let change = ChangeDescriptor { project_id, entity_kind: EntityKind::Label, entity_id: Some(id), kind: ChangeKind::Created };
        Ok((label, change))
    }

    pub async fn get_label(&self, id: LabelId) -> Result<Label, PasoError> {
        let raw = id.0;
        let found: Option<Label> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("SELECT {LABEL_COLUMNS} FROM labels WHERE id = ?1"))?;
                let mut rows = stmt.query(rusqlite::params![raw])?;
                match rows.next()? {
                    Some(row) => Ok(Some(map_label(row)?)),
                    None => Ok(None),
                }
            })
            .await?;
        found.ok_or_else(|| PasoError::not_found("label", raw.to_string()))
    }

    pub async fn list_labels(&self, project_id: ProjectId) -> Result<Vec<Label>, PasoError> {
        let pid = project_id.0;
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("SELECT {LABEL_COLUMNS} FROM labels WHERE project_id = ?1 ORDER BY name"))?;
                let mut rows = stmt.query(rusqlite::params![pid])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(map_label(row)?);
                }
                Ok(out)
            })
            .await
            .map_err(PasoError::from)
    }

    pub async fn delete_label(&self, id: LabelId) -> Result<ChangeDescriptor, PasoError> {
        let label = self.get_label(id).await?;
        let raw = id.0;
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM labels WHERE id = ?1", rusqlite::params![raw])?;
                Ok(())
            })
            .await?;
        Ok(ChangeDescriptor { project_id: label.project_id, entity_kind: EntityKind::Label, entity_id: Some(raw), kind: ChangeKind::Deleted })
    }
}

fn map_unique_violation(err: tokio_rusqlite::Error) -> PasoError {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)) = &err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation {
            return PasoError::validation("a label with that name already exists in this project");
        }
    }
    PasoError::from(err)
}

#[cfg(test)]
mod tests {
    use super::super::Store;

    #[tokio::test]
    async fn create_list_delete_label() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let (label, _) = store.create_label(project.id, "bug", "#ff0000").await.unwrap();
        let labels = store.list_labels(project.id).await.unwrap();
        assert_eq!(labels.len(), 1);
        store.delete_label(label.id).await.unwrap();
        assert!(store.list_labels(project.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_malformed_color_and_overlong_name() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();

        assert!(store.create_label(project.id, "bug", "not-a-color").await.is_err());
        assert!(store.create_label(project.id, "bug", "ff0000").await.is_err());
        assert!(store.create_label(project.id, "bug", "#ff00zz").await.is_err());

        let long_name = "x".repeat(51);
        assert!(store.create_label(project.id, &long_name, "#ff0000").await.is_err());
    }
}
