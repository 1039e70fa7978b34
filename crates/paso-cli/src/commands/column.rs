use async_trait::async_trait;
use paso_core::error::PasoError;
use paso_core::store::Store;
use paso_core::types::{ColumnId, ProjectId};

use crate::handler::{Handler, HandlerOutput};

pub struct Create {
    pub project_id: ProjectId,
    pub name: String,
    pub after: Option<i64>,
}

#[async_trait]
impl Handler for Create {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let (column, change) = store.create_column(self.project_id, &self.name, self.after.map(ColumnId)).await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Column(column))
    }
}

pub struct List {
    pub project_id: ProjectId,
}

#[async_trait]
impl Handler for List {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        Ok(HandlerOutput::Columns(store.list_columns(self.project_id).await?))
    }
}

pub struct Update {
    pub id: i64,
    pub name: Option<String>,
    pub holds_ready_tasks: Option<bool>,
    pub holds_in_progress_tasks: Option<bool>,
    pub holds_completed_tasks: Option<bool>,
    pub force: bool,
}

#[async_trait]
impl Handler for Update {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let id = ColumnId(self.id);
        let mut column = store.get_column(id).await?;
        let mut last_change = None;

        if let Some(name) = &self.name {
            let (c, change) = store.rename_column(id, name).await?;
            column = c;
            last_change = Some(change);
        }

        if self.holds_ready_tasks.is_some() || self.holds_in_progress_tasks.is_some() || self.holds_completed_tasks.is_some() {
            let (c, change) = store
                .set_column_flags(
                    id,
                    self.holds_completed_tasks,
                    self.holds_in_progress_tasks,
                    self.holds_ready_tasks,
                    self.force,
                )
                .await?;
            column = c;
            last_change = Some(change);
        }

        if let Some(change) = last_change {
            crate::publish::publish_best_effort(change).await;
        }
        Ok(HandlerOutput::Column(column))
    }
}

pub struct Delete {
    pub id: i64,
    pub force: bool,
}

#[async_trait]
impl Handler for Delete {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let change = store.delete_column(ColumnId(self.id), self.force).await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Deleted { entity: "column", id: self.id })
    }
}
