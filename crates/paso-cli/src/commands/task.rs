use async_trait::async_trait;
use paso_core::error::PasoError;
use paso_core::store::Store;
use paso_core::types::{ColumnId, ProjectId, RelationType, TaskId, TaskPriority, TaskType};

use crate::handler::{Handler, HandlerOutput};

pub struct Create {
    pub project_id: ProjectId,
    pub column_id: i64,
    pub title: String,
    pub description: Option<String>,
}

#[async_trait]
impl Handler for Create {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let (task, change) = store
            .create_task(self.project_id, ColumnId(self.column_id), &self.title, self.description.as_deref())
            .await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Task(task))
    }
}

pub struct List {
    pub column_id: i64,
}

#[async_trait]
impl Handler for List {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        Ok(HandlerOutput::TaskSummaries(store.list_tasks(ColumnId(self.column_id)).await?))
    }
}

pub struct Show {
    pub id: i64,
}

#[async_trait]
impl Handler for Show {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        Ok(HandlerOutput::TaskDetail(Box::new(store.task_detail(TaskId(self.id)).await?)))
    }
}

pub struct Update {
    pub id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub task_type: Option<String>,
}

#[async_trait]
impl Handler for Update {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let priority = self
            .priority
            .as_deref()
            .map(|s| TaskPriority::from_str(s).ok_or_else(|| PasoError::validation(format!("unknown priority: {s}"))))
            .transpose()?;
        let task_type = self
            .task_type
            .as_deref()
            .map(|s| TaskType::from_str(s).ok_or_else(|| PasoError::validation(format!("unknown task type: {s}"))))
            .transpose()?;

        let (task, change) = store
            .update_task(
                TaskId(self.id),
                self.title.as_deref(),
                self.description.as_deref().map(Some),
                priority,
                task_type,
            )
            .await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Task(task))
    }
}

pub struct Delete {
    pub id: i64,
}

#[async_trait]
impl Handler for Delete {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let change = store.delete_task(TaskId(self.id)).await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Deleted { entity: "task", id: self.id })
    }
}

pub struct Move {
    pub id: i64,
    pub to: Option<i64>,
    pub next: bool,
    pub prev: bool,
}

#[async_trait]
impl Handler for Move {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let (task, change) = if let Some(target) = self.to {
            let (task, change) = store.move_task_to_column(TaskId(self.id), ColumnId(target)).await?;
            (task, Some(change))
        } else if self.next {
            store.move_to_next_column(TaskId(self.id)).await?
        } else if self.prev {
            store.move_to_prev_column(TaskId(self.id)).await?
        } else {
            return Err(PasoError::usage("task move requires --to, --next, or --prev"));
        };

        if let Some(change) = change {
            crate::publish::publish_best_effort(change).await;
        }
        Ok(HandlerOutput::Task(task))
    }
}

pub struct SwapUp {
    pub id: i64,
}

#[async_trait]
impl Handler for SwapUp {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let (task, change) = store.swap_up(TaskId(self.id)).await?;
        if let Some(change) = change {
            crate::publish::publish_best_effort(change).await;
        }
        Ok(HandlerOutput::Task(task))
    }
}

pub struct SwapDown {
    pub id: i64,
}

#[async_trait]
impl Handler for SwapDown {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let (task, change) = store.swap_down(TaskId(self.id)).await?;
        if let Some(change) = change {
            crate::publish::publish_best_effort(change).await;
        }
        Ok(HandlerOutput::Task(task))
    }
}

pub struct Relate {
    pub from: i64,
    pub relation: String,
    pub to: i64,
}

#[async_trait]
impl Handler for Relate {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let relation_type = RelationType::from_str(&self.relation)
            .ok_or_else(|| PasoError::validation(format!("unknown relation type: {}", self.relation)))?;
        let change = store.add_relation(TaskId(self.from), TaskId(self.to), relation_type).await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Message(format!("related task {} {} task {}", self.from, self.relation, self.to)))
    }
}

pub struct Unrelate {
    pub from: i64,
    pub relation: String,
    pub to: i64,
}

#[async_trait]
impl Handler for Unrelate {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError> {
        let relation_type = RelationType::from_str(&self.relation)
            .ok_or_else(|| PasoError::validation(format!("unknown relation type: {}", self.relation)))?;
        let change = store.remove_relation(TaskId(self.from), TaskId(self.to), relation_type).await?;
        crate::publish::publish_best_effort(change).await;
        Ok(HandlerOutput::Message(format!("removed {} relation between task {} and task {}", self.relation, self.from, self.to)))
    }
}
