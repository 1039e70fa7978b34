use crate::error::{InvariantViolation, PasoError};
use crate::types::{ChangeDescriptor, ChangeKind, Column, ColumnId, EntityKind, ProjectId};

use super::{map_column, Store, COLUMN_COLUMNS};

impl Store {
    /// Returns every column of a project in linked-list (left-to-right)
    /// order, starting from the single head (`prev_id IS NULL`).
    pub async fn list_columns(&self, project_id: ProjectId) -> Result<Vec<Column>, PasoError> {
        let pid = project_id.0;
        let all: Vec<Column> = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {COLUMN_COLUMNS} FROM columns WHERE project_id = ?1"))?;
                let mut rows = stmt.query(rusqlite::params![pid])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(map_column(row)?);
                }
                Ok(out)
            })
            .await?;
        Ok(order_by_links(all))
    }

    pub async fn get_column(&self, id: ColumnId) -> Result<Column, PasoError> {
        let raw = id.0;
        let found: Option<Column> = self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {COLUMN_COLUMNS} FROM columns WHERE id = ?1"))?;
                let mut rows = stmt.query(rusqlite::params![raw])?;
                match rows.next()? {
                    Some(row) => Ok(Some(map_column(row)?)),
                    None => Ok(None),
                }
            })
            .await?;
        found.ok_or_else(|| PasoError::not_found("column", raw.to_string()))
    }

    /// Creates a column at the tail of the project's column list, or
    /// immediately after `after` when given.
    pub async fn create_column(
        &self,
        project_id: ProjectId,
        name: &str,
        after: Option<ColumnId>,
    ) -> Result<(Column, ChangeDescriptor), PasoError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(PasoError::validation("column name must not be empty"));
        }
        let pid = project_id.0;
        let after_raw = after.map(|c| c.0);

        let id: i64 = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;

                let insert_after: Option<i64> = match after_raw {
                    Some(a) => Some(a),
                    None => {
                        // default: append at the current tail
                        tx.query_row(
                            "SELECT id FROM columns WHERE project_id = ?1 AND next_id IS NULL",
                            rusqlite::params![pid],
                            |r| r.get(0),
                        )
                        .ok()
                    }
                };

                tx.execute(
                    "INSERT INTO columns (project_id, name, prev_id, next_id,
                        holds_completed_tasks, holds_in_progress_tasks, holds_ready_tasks)
                     VALUES (?1, ?2, NULL, NULL, 0, 0, 0)",
                    rusqlite::params![pid, name],
                )?;
                let new_id = tx.last_insert_rowid();

                match insert_after {
                    Some(prev_id) => {
                        let old_next: Option<i64> = tx.query_row(
                            "SELECT next_id FROM columns WHERE id = ?1",
                            rusqlite::params![prev_id],
                            |r| r.get(0),
                        )?;
                        tx.execute(
                            "UPDATE columns SET next_id = ?1 WHERE id = ?2",
                            rusqlite::params![new_id, prev_id],
                        )?;
                        tx.execute(
                            "UPDATE columns SET prev_id = ?1, next_id = ?2 WHERE id = ?3",
                            rusqlite::params![prev_id, old_next, new_id],
                        )?;
                        if let Some(next_id) = old_next {
                            tx.execute(
                                "UPDATE columns SET prev_id = ?1 WHERE id = ?2",
                                rusqlite::params![new_id, next_id],
                            )?;
                        }
                    }
                    None => {
                        // first column in the project
                    }
                }

                tx.commit()?;
                Ok(new_id)
            })
            .await
            .map_err(PasoError::from)?;

        let column = self.get_column(ColumnId(id)).await?;
        let change = ChangeDescriptor {
            project_id,
            entity_kind: EntityKind::Column,
            entity_id: Some(id),
            kind: ChangeKind::Created,
        };
        Ok((column, change))
    }

    pub async fn rename_column(
        &self,
        id: ColumnId,
        name: &str,
    ) -> Result<(Column, ChangeDescriptor), PasoError> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(PasoError::validation("column name must not be empty"));
        }
        let raw = id.0;
        self.conn
            .call(move |conn| {
                conn.execute("UPDATE columns SET name = ?1 WHERE id = ?2", rusqlite::params![name, raw])?;
                Ok(())
            })
            .await?;
        let column = self.get_column(id).await?;
        let change = ChangeDescriptor {
            project_id: column.project_id,
            entity_kind: EntityKind::Column,
            entity_id: Some(id.0),
            kind: ChangeKind::Updated,
        };
        Ok((column, change))
    }

    /// Sets a column's distinguished flags. `holds_completed_tasks` and
    /// `holds_in_progress_tasks` are unique per project: setting either to
    /// `true` on a column fails with the matching `InvariantViolation`
    /// unless `force` is `true`, in which case any other column currently
    /// holding that flag has it cleared first. `holds_ready_tasks` has no
    /// such constraint and any number of columns may carry it.
    pub async fn set_column_flags(
        &self,
        id: ColumnId,
        holds_completed_tasks: Option<bool>,
        holds_in_progress_tasks: Option<bool>,
        holds_ready_tasks: Option<bool>,
        force: bool,
    ) -> Result<(Column, ChangeDescriptor), PasoError> {
        let column = self.get_column(id).await?;
        let project_id = column.project_id.0;
        let raw = id.0;

        if holds_completed_tasks == Some(true) && !column.holds_completed_tasks {
            let existing = self.find_flagged_column(column.project_id, "holds_completed_tasks").await?;
            if let Some(other) = existing {
                if other.id != id {
                    if !force {
                        return Err(PasoError::invariant(InvariantViolation::CompletedColumnExists));
                    }
                    self.clear_flag(other.id, "holds_completed_tasks").await?;
                }
            }
        }
        if holds_in_progress_tasks == Some(true) && !column.holds_in_progress_tasks {
            let existing = self.find_flagged_column(column.project_id, "holds_in_progress_tasks").await?;
            if let Some(other) = existing {
                if other.id != id {
                    if !force {
                        return Err(PasoError::invariant(InvariantViolation::InProgressColumnExists));
                    }
                    self.clear_flag(other.id, "holds_in_progress_tasks").await?;
                }
            }
        }

        self.conn
            .call(move |conn| {
                if let Some(v) = holds_completed_tasks {
                    conn.execute(
                        "UPDATE columns SET holds_completed_tasks = ?1 WHERE id = ?2",
                        rusqlite::params![v as i64, raw],
                    )?;
                }
                if let Some(v) = holds_in_progress_tasks {
                    conn.execute(
                        "UPDATE columns SET holds_in_progress_tasks = ?1 WHERE id = ?2",
                        rusqlite::params![v as i64, raw],
                    )?;
                }
                if let Some(v) = holds_ready_tasks {
                    conn.execute(
                        "UPDATE columns SET holds_ready_tasks = ?1 WHERE id = ?2",
                        rusqlite::params![v as i64, raw],
                    )?;
                }
                Ok(())
            })
            .await?;

        let column = self.get_column(id).await?;
        let change = ChangeDescriptor {
            project_id: ProjectId(project_id),
            entity_kind: EntityKind::Column,
            entity_id: Some(raw),
            kind: ChangeKind::Updated,
        };
        Ok((column, change))
    }

    async fn find_flagged_column(&self, project_id: ProjectId, flag: &'static str) -> Result<Option<Column>, PasoError> {
        let pid = project_id.0;
        let found: Option<i64> = self
            .conn
            .call(move |conn| {
                let result: rusqlite::Result<i64> = conn.query_row(
                    &format!("SELECT id FROM columns WHERE project_id = ?1 AND {flag} = 1"),
                    rusqlite::params![pid],
                    |r| r.get(0),
                );
                match result {
                    Ok(id) => Ok(Some(id)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await?;
        match found {
            Some(id) => Ok(Some(self.get_column(ColumnId(id)).await?)),
            None => Ok(None),
        }
    }

    async fn clear_flag(&self, id: ColumnId, flag: &'static str) -> Result<(), PasoError> {
        let raw = id.0;
        self.conn
            .call(move |conn| {
                conn.execute(&format!("UPDATE columns SET {flag} = 0 WHERE id = ?1"), rusqlite::params![raw])?;
                Ok(())
            })
            .await
            .map_err(PasoError::from)
    }

    /// Deletes a column. A non-empty column's tasks are first **moved** to
    /// the project's completed column, or failing that its first column
    /// (whichever exists and isn't the column being deleted), appended at
    /// the target's tail with re-densified positions — no silent data loss.
    /// If no such relocation target exists (this is the project's only
    /// column) the deletion fails with `ColumnHasTasks` unless `force` is
    /// set, in which case the tasks are dropped along with the column.
    /// Relinks the column's neighbours so the list remains a single
    /// unbroken chain.
    pub async fn delete_column(&self, id: ColumnId, force: bool) -> Result<ChangeDescriptor, PasoError> {
        let column = self.get_column(id).await?;
        let raw = id.0;

        let task_count: i64 = self
            .conn
            .call(move |conn| conn.query_row("SELECT COUNT(*) FROM tasks WHERE column_id = ?1", rusqlite::params![raw], |r| r.get(0)))
            .await?;

        if task_count > 0 {
            let target = self.relocation_target(column.project_id, id).await?;
            match target {
                Some(target_id) => self.relocate_tasks(id, target_id).await?,
                None if force => {}
                None => return Err(PasoError::invariant(InvariantViolation::ColumnHasTasks)),
            }
        }

        let prev_id = column.prev_id.map(|c| c.0);
        let next_id = column.next_id.map(|c| c.0);

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                if let Some(p) = prev_id {
                    tx.execute("UPDATE columns SET next_id = ?1 WHERE id = ?2", rusqlite::params![next_id, p])?;
                }
                if let Some(n) = next_id {
                    tx.execute("UPDATE columns SET prev_id = ?1 WHERE id = ?2", rusqlite::params![prev_id, n])?;
                }
                tx.execute("DELETE FROM columns WHERE id = ?1", rusqlite::params![raw])?;
                tx.commit()?;
                Ok(())
            })
            .await?;

        Ok(ChangeDescriptor {
            project_id: column.project_id,
            entity_kind: EntityKind::Column,
            entity_id: Some(raw),
            kind: ChangeKind::Deleted,
        })
    }

    /// Picks where a deleted column's tasks land: the project's completed
    /// column if one exists (and isn't `excluding`), else the project's
    /// first column (again, if it isn't `excluding`). `None` means there is
    /// no other column in the project to relocate into.
    async fn relocation_target(&self, project_id: ProjectId, excluding: ColumnId) -> Result<Option<ColumnId>, PasoError> {
        if let Some(completed) = self.find_flagged_column(project_id, "holds_completed_tasks").await? {
            if completed.id != excluding {
                return Ok(Some(completed.id));
            }
        }
        let ordered = self.list_columns(project_id).await?;
        Ok(ordered.into_iter().map(|c| c.id).find(|id| *id != excluding))
    }

    /// Moves every task out of `source` into `target`, in their existing
    /// order, appended to `target`'s tail with re-densified positions.
    async fn relocate_tasks(&self, source: ColumnId, target: ColumnId) -> Result<(), PasoError> {
        let source_raw = source.0;
        let target_raw = target.0;
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut next_position: i64 = tx.query_row(
                    "SELECT COALESCE(MAX(position) + 1, 0) FROM tasks WHERE column_id = ?1",
                    rusqlite::params![target_raw],
                    |r| r.get(0),
                )?;
                let mut stmt = tx.prepare("SELECT id FROM tasks WHERE column_id = ?1 ORDER BY position")?;
                let ids: Vec<i64> = stmt.query_map(rusqlite::params![source_raw], |r| r.get(0))?.collect::<Result<_, _>>()?;
                drop(stmt);
                for id in ids {
                    tx.execute(
                        "UPDATE tasks SET column_id = ?1, position = ?2 WHERE id = ?3",
                        rusqlite::params![target_raw, next_position, id],
                    )?;
                    next_position += 1;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(PasoError::from)
    }
}

/// Walks the `prev_id`/`next_id` chain starting from the single head
/// (`prev_id IS NULL`) to produce left-to-right order. Columns is assumed
/// to already satisfy the single-head/single-tail invariant.
fn order_by_links(columns: Vec<Column>) -> Vec<Column> {
    use std::collections::HashMap;
    let mut by_id: HashMap<i64, Column> = columns.into_iter().map(|c| (c.id.0, c)).collect();
    let mut ordered = Vec::with_capacity(by_id.len());
    let head_id = by_id.values().find(|c| c.prev_id.is_none()).map(|c| c.id.0);
    let mut current = head_id;
    while let Some(id) = current {
        if let Some(col) = by_id.remove(&id) {
            current = col.next_id.map(|c| c.0);
            ordered.push(col);
        } else {
            break;
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::super::Store;
    use crate::error::{InvariantViolation, PasoError};

    #[tokio::test]
    async fn columns_maintain_list_order() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let (a, _) = store.create_column(project.id, "Todo", None).await.unwrap();
        let (b, _) = store.create_column(project.id, "Doing", None).await.unwrap();
        let (c, _) = store.create_column(project.id, "Done", None).await.unwrap();

        let ordered = store.list_columns(project.id).await.unwrap();
        let names: Vec<_> = ordered.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["Todo", "Doing", "Done"]);
        assert!(ordered[0].prev_id.is_none());
        assert!(ordered.last().unwrap().next_id.is_none());
        assert_eq!(ordered[0].id, a.id);
        assert_eq!(ordered[2].id, c.id);
        let _ = b;
    }

    #[tokio::test]
    async fn insert_after_splices_into_the_middle() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let (a, _) = store.create_column(project.id, "Todo", None).await.unwrap();
        let (c, _) = store.create_column(project.id, "Done", None).await.unwrap();
        let (b, _) = store.create_column(project.id, "Doing", Some(a.id)).await.unwrap();

        let ordered = store.list_columns(project.id).await.unwrap();
        let names: Vec<_> = ordered.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["Todo", "Doing", "Done"]);
        let _ = (b, c);
    }

    #[tokio::test]
    async fn only_one_completed_column_allowed() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let (a, _) = store.create_column(project.id, "Done A", None).await.unwrap();
        let (b, _) = store.create_column(project.id, "Done B", None).await.unwrap();
        store.set_column_flags(a.id, Some(true), None, None, false).await.unwrap();

        let err = store.set_column_flags(b.id, Some(true), None, None, false).await.unwrap_err();
        assert!(matches!(err, PasoError::InvariantViolation(InvariantViolation::CompletedColumnExists)));

        store.set_column_flags(b.id, Some(true), None, None, true).await.unwrap();
        let a_after = store.get_column(a.id).await.unwrap();
        assert!(!a_after.holds_completed_tasks);
    }

    #[tokio::test]
    async fn deleting_column_with_tasks_requires_force() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let (col, _) = store.create_column(project.id, "Todo", None).await.unwrap();
        store.create_task(project.id, col.id, "write tests", None).await.unwrap();

        let err = store.delete_column(col.id, false).await.unwrap_err();
        assert!(matches!(err, PasoError::InvariantViolation(InvariantViolation::ColumnHasTasks)));

        store.delete_column(col.id, true).await.unwrap();
        let remaining = store.list_columns(project.id).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn deleting_column_relocates_tasks_to_completed_column() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let (todo, _) = store.create_column(project.id, "Todo", None).await.unwrap();
        let (done, _) = store.create_column(project.id, "Done", None).await.unwrap();
        store.set_column_flags(done.id, Some(true), None, None, false).await.unwrap();
        store.create_task(project.id, done.id, "already done", None).await.unwrap();
        let (task, _) = store.create_task(project.id, todo.id, "write tests", None).await.unwrap();

        store.delete_column(todo.id, false).await.unwrap();

        let remaining = store.list_columns(project.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, done.id);

        let tasks = store.list_tasks(done.id).await.unwrap();
        assert_eq!(tasks.len(), 2);
        let moved = tasks.iter().find(|t| t.id == task.id).unwrap();
        assert_eq!(moved.position, 1);
    }

    #[tokio::test]
    async fn deleting_column_relocates_tasks_to_first_column_without_completed() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let (first, _) = store.create_column(project.id, "Todo", None).await.unwrap();
        let (second, _) = store.create_column(project.id, "Doing", None).await.unwrap();
        let (task, _) = store.create_task(project.id, second.id, "in flight", None).await.unwrap();

        store.delete_column(second.id, false).await.unwrap();

        let remaining = store.list_columns(project.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, first.id);

        let tasks = store.list_tasks(first.id).await.unwrap();
        assert!(tasks.iter().any(|t| t.id == task.id));
    }
}
