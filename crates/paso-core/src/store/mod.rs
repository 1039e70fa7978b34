mod column;
mod label;
mod project;
mod relation;
mod schema;
mod task;

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio_rusqlite::Connection;

use crate::error::PasoError;
use crate::types::{Column, ColumnId, Label, LabelId, Project, ProjectId, Task, TaskId, TaskPriority, TaskType};

/// The embedded SQLite-backed store. Owns a single writer connection; all
/// mutation happens through one of its operation methods, each of which
/// returns the data changed plus an optional `ChangeDescriptor` to publish.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, PasoError> {
        let conn = Connection::open(path.as_ref()).await?;
        let store = Store { conn };
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn open_in_memory() -> Result<Self, PasoError> {
        let conn = Connection::open_in_memory().await?;
        let store = Store { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), PasoError> {
        self.conn
            .call(|conn| {
                schema::init_schema(conn)?;
                Ok(())
            })
            .await
            .map_err(PasoError::from)
    }
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("timestamps are always written by this process as rfc3339")
        .with_timezone(&Utc)
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    let created_at: String = row.get(3)?;
    Ok(Project {
        id: ProjectId(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: parse_rfc3339(&created_at),
    })
}

fn row_to_column(row: &rusqlite::Row<'_>) -> rusqlite::Result<Column> {
    let prev_id: Option<i64> = row.get(3)?;
    let next_id: Option<i64> = row.get(4)?;
    Ok(Column {
        id: ColumnId(row.get(0)?),
        project_id: ProjectId(row.get(1)?),
        name: row.get(2)?,
        prev_id: prev_id.map(ColumnId),
        next_id: next_id.map(ColumnId),
        holds_completed_tasks: row.get::<_, i64>(5)? != 0,
        holds_in_progress_tasks: row.get::<_, i64>(6)? != 0,
        holds_ready_tasks: row.get::<_, i64>(7)? != 0,
    })
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    let priority: String = row.get(7)?;
    let task_type: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    Ok(Task {
        id: TaskId(row.get(0)?),
        project_id: ProjectId(row.get(1)?),
        column_id: ColumnId(row.get(2)?),
        ticket_number: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        position: row.get(6)?,
        priority: TaskPriority::from_str(&priority).unwrap_or(TaskPriority::Medium),
        task_type: TaskType::from_str(&task_type).unwrap_or(TaskType::Feature),
        created_at: parse_rfc3339(&created_at),
        updated_at: parse_rfc3339(&updated_at),
    })
}

fn row_to_label(row: &rusqlite::Row<'_>) -> rusqlite::Result<Label> {
    Ok(Label { id: LabelId(row.get(0)?), project_id: ProjectId(row.get(1)?), name: row.get(2)?, color: row.get(3)? })
}

pub(crate) const TASK_COLUMNS: &str =
    "id, project_id, column_id, ticket_number, title, description, position, priority, task_type, created_at, updated_at";
pub(crate) const COLUMN_COLUMNS: &str = "id, project_id, name, prev_id, next_id, holds_completed_tasks, holds_in_progress_tasks, holds_ready_tasks";
pub(crate) const PROJECT_COLUMNS: &str = "id, name, description, created_at";
pub(crate) const LABEL_COLUMNS: &str = "id, project_id, name, color";

pub(crate) use row_to_column as map_column;
pub(crate) use row_to_label as map_label;
pub(crate) use row_to_project as map_project;
pub(crate) use row_to_task as map_task;
