use chrono::Utc;

use crate::error::PasoError;
use crate::types::{
    ChangeDescriptor, ChangeKind, ColumnId, EntityKind, Label, ProjectId, Task, TaskDetail, TaskId, TaskPriority,
    TaskReference, TaskSummary, TaskType,
};

use super::{map_label, map_task, Store, TASK_COLUMNS};

const MAX_TITLE_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 10_000;

fn check_title(title: &str) -> Result<(), PasoError> {
    if title.is_empty() {
        return Err(PasoError::validation("task title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(PasoError::validation(format!("task title must be at most {MAX_TITLE_LEN} characters")));
    }
    Ok(())
}

fn check_description(description: &str) -> Result<(), PasoError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(PasoError::validation(format!(
            "task description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

impl Store {
    pub async fn create_task(
        &self,
        project_id: ProjectId,
        column_id: ColumnId,
        title: &str,
        description: Option<&str>,
    ) -> Result<(Task, ChangeDescriptor), PasoError> {
        let title = title.trim().to_string();
        check_title(&title)?;
        if let Some(d) = description {
            check_description(d)?;
        }
        let pid = project_id.0;
        let cid = column_id.0;
        let description = description.map(|s| s.to_string());
        let now = Utc::now().to_rfc3339();

        let id: i64 = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let ticket = Store::next_ticket_number(&tx, pid)?;
                let position: i64 = tx.query_row(
                    "SELECT COALESCE(MAX(position) + 1, 0) FROM tasks WHERE column_id = ?1",
                    rusqlite::params![cid],
                    |r| r.get(0),
                )?;
                tx.execute(
                    "INSERT INTO tasks (project_id, column_id, ticket_number, title, description,
                        position, priority, task_type, created_at, updated_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?9)",
                    rusqlite::params![
                        pid, cid, ticket, title, description, position,
                        TaskPriority::Medium.as_str(), TaskType::Feature.as_str(), now,
                    ],
                )?;
                let id = tx.last_insert_rowid();
                tx.commit()?;
                Ok(id)
            })
            .await
            .map_err(PasoError::from)?;

        let task = self.get_task(TaskId(id)).await?;
        let change = ChangeDescriptor { project_id, entity_kind: EntityKind::Task, entity_id: Some(id), kind: ChangeKind::Created };
        Ok((task, change))
    }

    pub async fn get_task(&self, id: TaskId) -> Result<Task, PasoError> {
        let raw = id.0;
        let found: Option<Task> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;
                let mut rows = stmt.query(rusqlite::params![raw])?;
                match rows.next()? {
                    Some(row) => Ok(Some(map_task(row)?)),
                    None => Ok(None),
                }
            })
            .await?;
        found.ok_or_else(|| PasoError::not_found("task", raw.to_string()))
    }

    pub async fn list_tasks(&self, column_id: ColumnId) -> Result<Vec<TaskSummary>, PasoError> {
        let cid = column_id.0;
        let tasks: Vec<Task> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks WHERE column_id = ?1 ORDER BY position"
                ))?;
                let mut rows = stmt.query(rusqlite::params![cid])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(map_task(row)?);
                }
                Ok(out)
            })
            .await?;

        let mut summaries = Vec::with_capacity(tasks.len());
        for t in tasks {
            let labels = self.labels_for_task(t.id).await?;
            let is_blocked = self.has_unresolved_blockers(t.id).await?;
            summaries.push(TaskSummary {
                id: t.id,
                ticket_number: t.ticket_number,
                title: t.title,
                position: t.position,
                priority: t.priority,
                task_type: t.task_type,
                label_colors: labels.into_iter().map(|l| l.color).collect(),
                is_blocked,
            });
        }
        Ok(summaries)
    }

    pub async fn task_detail(&self, id: TaskId) -> Result<TaskDetail, PasoError> {
        let task = self.get_task(id).await?;
        let labels = self.labels_for_task(id).await?;
        let parents = self.related_tasks(id, "parent").await?;
        let children = self.related_tasks(id, "child").await?;
        let blockers = self.related_tasks(id, "blocked_by").await?;
        let blocked = self.related_tasks(id, "blocks").await?;
        Ok(TaskDetail { task, labels, parents, children, blockers, blocked })
    }

    pub async fn update_task(
        &self,
        id: TaskId,
        title: Option<&str>,
        description: Option<Option<&str>>,
        priority: Option<TaskPriority>,
        task_type: Option<TaskType>,
    ) -> Result<(Task, ChangeDescriptor), PasoError> {
        if let Some(t) = title {
            check_title(t.trim())?;
        }
        if let Some(Some(d)) = description {
            check_description(d)?;
        }
        let raw = id.0;
        let title = title.map(|s| s.trim().to_string());
        let description = description.map(|d| d.map(|s| s.to_string()));
        let priority_str = priority.map(|p| p.as_str());
        let type_str = task_type.map(|t| t.as_str());
        let now = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                if let Some(title) = &title {
                    conn.execute("UPDATE tasks SET title = ?1 WHERE id = ?2", rusqlite::params![title, raw])?;
                }
                if let Some(description) = &description {
                    conn.execute("UPDATE tasks SET description = ?1 WHERE id = ?2", rusqlite::params![description, raw])?;
                }
                if let Some(priority_str) = priority_str {
                    conn.execute("UPDATE tasks SET priority = ?1 WHERE id = ?2", rusqlite::params![priority_str, raw])?;
                }
                if let Some(type_str) = type_str {
                    conn.execute("UPDATE tasks SET task_type = ?1 WHERE id = ?2", rusqlite::params![type_str, raw])?;
                }
                conn.execute("UPDATE tasks SET updated_at = ?1 WHERE id = ?2", rusqlite::params![now, raw])?;
                Ok(())
            })
            .await?;

        let task = self.get_task(id).await?;
        let change = ChangeDescriptor { project_id: task.project_id, entity_kind: EntityKind::Task, entity_id: Some(raw), kind: ChangeKind::Updated };
        Ok((task, change))
    }

    /// Swaps position with the task immediately above in the same column.
    /// A no-op (returns `None`) when the task is already first.
    pub async fn swap_up(&self, id: TaskId) -> Result<(Task, Option<ChangeDescriptor>), PasoError> {
        self.swap(id, -1).await
    }

    /// Swaps position with the task immediately below in the same column.
    /// A no-op (returns `None`) when the task is already last.
    pub async fn swap_down(&self, id: TaskId) -> Result<(Task, Option<ChangeDescriptor>), PasoError> {
        self.swap(id, 1).await
    }

    async fn swap(&self, id: TaskId, direction: i64) -> Result<(Task, Option<ChangeDescriptor>), PasoError> {
        let task = self.get_task(id).await?;
        let raw = id.0;
        let column_id = task.column_id.0;
        let target_position = task.position + direction;

        let swapped: bool = self
            .conn
            .call(move |conn| {
                let neighbour: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM tasks WHERE column_id = ?1 AND position = ?2",
                        rusqlite::params![column_id, target_position],
                        |r| r.get(0),
                    )
                    .ok();
                match neighbour {
                    Some(neighbour_id) => {
                        let tx_position = target_position;
                        conn.execute(
                            "UPDATE tasks SET position = ?1 WHERE id = ?2",
                            rusqlite::params![tx_position, neighbour_id],
                        )?;
                        conn.execute(
                            "UPDATE tasks SET position = ?1 WHERE id = ?2",
                            rusqlite::params![tx_position - direction, raw],
                        )?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            })
            .await?;

        let task = self.get_task(id).await?;
        if !swapped {
            return Ok((task, None));
        }
        let change = ChangeDescriptor { project_id: task.project_id, entity_kind: EntityKind::Task, entity_id: Some(raw), kind: ChangeKind::Moved };
        Ok((task, Some(change)))
    }

    /// Moves a task to the column immediately following its current one in
    /// the project's column linked list, appending it at the target's tail
    /// and re-densifying the positions left behind in the source column. A
    /// no-op (returns `None`) when the current column is the tail.
    pub async fn move_to_next_column(&self, id: TaskId) -> Result<(Task, Option<ChangeDescriptor>), PasoError> {
        let task = self.get_task(id).await?;
        let column = self.get_column(task.column_id).await?;
        match column.next_id {
            Some(next) => self.move_task_to_column(id, next).await.map(|(t, c)| (t, Some(c))),
            None => Ok((task, None)),
        }
    }

    /// Mirror of [`Store::move_to_next_column`] toward the head of the list.
    pub async fn move_to_prev_column(&self, id: TaskId) -> Result<(Task, Option<ChangeDescriptor>), PasoError> {
        let task = self.get_task(id).await?;
        let column = self.get_column(task.column_id).await?;
        match column.prev_id {
            Some(prev) => self.move_task_to_column(id, prev).await.map(|(t, c)| (t, Some(c))),
            None => Ok((task, None)),
        }
    }

    pub async fn move_task_to_column(&self, id: TaskId, target: ColumnId) -> Result<(Task, ChangeDescriptor), PasoError> {
        let task = self.get_task(id).await?;
        let source_column = task.column_id.0;
        let target_column = target.0;
        let raw = id.0;

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let new_position: i64 = tx.query_row(
                    "SELECT COALESCE(MAX(position) + 1, 0) FROM tasks WHERE column_id = ?1",
                    rusqlite::params![target_column],
                    |r| r.get(0),
                )?;
                tx.execute(
                    "UPDATE tasks SET column_id = ?1, position = ?2 WHERE id = ?3",
                    rusqlite::params![target_column, new_position, raw],
                )?;
                densify(&tx, source_column)?;
                tx.commit()?;
                Ok(())
            })
            .await?;

        let task = self.get_task(id).await?;
        let change = ChangeDescriptor { project_id: task.project_id, entity_kind: EntityKind::Task, entity_id: Some(raw), kind: ChangeKind::Moved };
        Ok((task, change))
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<ChangeDescriptor, PasoError> {
        let task = self.get_task(id).await?;
        let raw = id.0;
        let column_id = task.column_id.0;

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM tasks WHERE id = ?1", rusqlite::params![raw])?;
                densify(&tx, column_id)?;
                tx.commit()?;
                Ok(())
            })
            .await?;

        Ok(ChangeDescriptor { project_id: task.project_id, entity_kind: EntityKind::Task, entity_id: Some(raw), kind: ChangeKind::Deleted })
    }

    pub async fn attach_label(&self, task_id: TaskId, label_id: crate::types::LabelId) -> Result<ChangeDescriptor, PasoError> {
        let raw = task_id.0;
        let lraw = label_id.0;
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO task_labels (task_id, label_id) VALUES (?1, ?2)",
                    rusqlite::params![raw, lraw],
                )?;
                Ok(())
            })
            .await?;
        let task = self.get_task(task_id).await?;
        Ok(ChangeDescriptor { project_id: task.project_id, entity_kind: EntityKind::Task, entity_id: Some(raw), kind: ChangeKind::Labelled })
    }

    pub async fn detach_label(&self, task_id: TaskId, label_id: crate::types::LabelId) -> Result<ChangeDescriptor, PasoError> {
        let raw = task_id.0;
        let lraw = label_id.0;
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM task_labels WHERE task_id = ?1 AND label_id = ?2", rusqlite::params![raw, lraw])?;
                Ok(())
            })
            .await?;
        let task = self.get_task(task_id).await?;
        Ok(ChangeDescriptor { project_id: task.project_id, entity_kind: EntityKind::Task, entity_id: Some(raw), kind: ChangeKind::Labelled })
    }

    pub(crate) async fn labels_for_task(&self, task_id: TaskId) -> Result<Vec<Label>, PasoError> {
        let raw = task_id.0;
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT l.id, l.project_id, l.name, l.color FROM labels l
                     JOIN task_labels tl ON tl.label_id = l.id WHERE tl.task_id = ?1
                     ORDER BY l.name"
                ))?;
                let mut rows = stmt.query(rusqlite::params![raw])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(map_label(row)?);
                }
                Ok(out)
            })
            .await
            .map_err(PasoError::from)
    }

    pub(crate) async fn has_unresolved_blockers(&self, task_id: TaskId) -> Result<bool, PasoError> {
        let raw = task_id.0;
        let count: i64 = self
            .conn
            .call(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM task_relations WHERE from_task = ?1 AND relation_type = 'blocked_by'",
                    rusqlite::params![raw],
                    |r| r.get(0),
                )
            })
            .await?;
        Ok(count > 0)
    }

    pub(crate) async fn related_tasks(&self, task_id: TaskId, relation: &'static str) -> Result<Vec<TaskReference>, PasoError> {
        let raw = task_id.0;
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT t.id, t.ticket_number, t.title FROM tasks t
                     JOIN task_relations r ON r.to_task = t.id
                     WHERE r.from_task = ?1 AND r.relation_type = ?2",
                )?;
                let mut rows = stmt.query(rusqlite::params![raw, relation])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(TaskReference { id: crate::types::TaskId(row.get(0)?), ticket_number: row.get(1)?, title: row.get(2)? });
                }
                Ok(out)
            })
            .await
            .map_err(PasoError::from)
    }

}

/// Re-packs a column's `position` values into a dense `0..n` permutation,
/// preserving relative order. Called after every delete or cross-column
/// move so positions never develop gaps.
fn densify(tx: &rusqlite::Transaction<'_>, column_id: i64) -> rusqlite::Result<()> {
    let mut stmt = tx.prepare("SELECT id FROM tasks WHERE column_id = ?1 ORDER BY position")?;
    let ids: Vec<i64> = stmt
        .query_map(rusqlite::params![column_id], |r| r.get(0))?
        .collect::<Result<_, _>>()?;
    drop(stmt);
    for (position, id) in ids.into_iter().enumerate() {
        tx.execute("UPDATE tasks SET position = ?1 WHERE id = ?2", rusqlite::params![position as i64, id])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::Store;

    #[tokio::test]
    async fn rejects_overlong_title_and_description() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let (col, _) = store.create_column(project.id, "Todo", None).await.unwrap();

        let long_title = "x".repeat(201);
        assert!(store.create_task(project.id, col.id, &long_title, None).await.is_err());

        let long_description = "x".repeat(10_001);
        assert!(store.create_task(project.id, col.id, "fine title", Some(&long_description)).await.is_err());

        let (task, _) = store.create_task(project.id, col.id, "fine title", None).await.unwrap();
        assert!(store.update_task(task.id, Some(&long_title), None, None, None).await.is_err());
        assert!(store.update_task(task.id, None, Some(Some(&long_description)), None, None).await.is_err());
    }
}
