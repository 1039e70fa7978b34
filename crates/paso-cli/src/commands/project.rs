use async_trait::async_trait;
use paso_core::error::PasoError;
use paso_core::store::Store;
use paso_core::types::ProjectId;

use crate::handler::{Handler, HandlerOutput};

pub struct Create {
    pub name: String,
    pub description: Option<String>,
}

#[async_trait]
impl Handler for Create {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let (project, change) =
            store.create_project_with_description(&self.name, self.description.as_deref()).await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Project(project))
    }
}

pub struct List;

#[async_trait]
impl Handler for List {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        Ok(HandlerOutput::Projects(store.list_projects().await?))
    }
}

pub struct Update {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[async_trait]
impl Handler for Update {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let (project, change) = store
            .update_project(ProjectId(self.id), self.name.as_deref(), self.description.as_deref().map(Some))
            .await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Project(project))
    }
}

pub struct Delete {
    pub id: i64,
}

#[async_trait]
impl Handler for Delete {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let change = store.delete_project(ProjectId(self.id)).await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Deleted { entity: "project", id: self.id })
    }
}
