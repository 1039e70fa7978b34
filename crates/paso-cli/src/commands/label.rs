use async_trait::async_trait;
use paso_core::error::PasoError;
use paso_core::store::Store;
use paso_core::types::{LabelId, ProjectId, TaskId};

use crate::handler::{Handler, HandlerOutput};

pub struct Create {
    pub project_id: ProjectId,
    pub name: String,
    pub color: String,
}

#[async_trait]
impl Handler for Create {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let (label, change) = store.create_label(self.project_id, &self.name, &self.color).await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Label(label))
    }
}

pub struct List {
    pub project_id: ProjectId,
}

#[async_trait]
impl Handler for List {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        Ok(HandlerOutput::Labels(store.list_labels(self.project_id).await?))
    }
}

pub struct Delete {
    pub id: i64,
}

#[async_trait]
impl Handler for Delete {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let change = store.delete_label(LabelId(self.id)).await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Deleted { entity: "label", id: self.id })
    }
}

pub struct Attach {
    pub task_id: i64,
    pub label_id: i64,
}

#[async_trait]
impl Handler for Attach {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let change = store.attach_label(TaskId(self.task_id), LabelId(self.label_id)).await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Message(format!("attached label {} to task {}", self.label_id, self.task_id)))
    }
}

pub struct Detach {
    pub task_id: i64,
    pub label_id: i64,
}

#[async_trait]
impl Handler for Detach {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let change = store.detach_label(TaskId(self.task_id), LabelId(self.label_id)).await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Message(format!("detached label {} from task {}", self.label_id, self.task_id)))
    }
}
