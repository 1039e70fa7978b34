//! The worker task: owns the `Store` and the `EventClient`, and is the only
//! place in the process that performs blocking I/O. The event loop never
//! touches either directly — it posts `WorkerRequest`s and receives
//! `WorkerResponse`s, generalizing the teacher's simpler poll-a-channel loop
//! into a full request/response pair since the TUI also issues mutations.

use paso_core::error::PasoError;
use paso_core::store::Store;
use paso_core::types::{
    Column, ColumnId, Label, LabelId, ProjectId, RelationType, TaskDetail, TaskId, TaskPriority, TaskSummary, TaskType,
};
use paso_ipc::{EventClient, EventEnvelope};

pub enum WorkerRequest {
    Reload { project_id: ProjectId },
    CreateColumn { project_id: ProjectId, name: String, after: Option<ColumnId> },
    RenameColumn { id: ColumnId, name: String },
    DeleteColumn { id: ColumnId, force: bool },
    CreateTask { project_id: ProjectId, column_id: ColumnId, title: String, description: Option<String> },
    UpdateTask {
        id: TaskId,
        title: Option<String>,
        description: Option<Option<String>>,
        priority: Option<TaskPriority>,
        task_type: Option<TaskType>,
    },
    DeleteTask { id: TaskId },
    MoveTaskNext { id: TaskId },
    MoveTaskPrev { id: TaskId },
    SwapUp { id: TaskId },
    SwapDown { id: TaskId },
    AddRelation { from: TaskId, to: TaskId, relation: RelationType },
    RemoveRelation { from: TaskId, to: TaskId, relation: RelationType },
    AttachLabel { task_id: TaskId, label_id: LabelId },
    DetachLabel { task_id: TaskId, label_id: LabelId },
    CreateLabel { project_id: ProjectId, name: String, color: String },
    ListLabels { project_id: ProjectId },
    TaskDetail { id: TaskId },
    Shutdown,
}

pub enum WorkerResponse {
    Reloaded { project_id: ProjectId, columns: Vec<(Column, Vec<TaskSummary>)> },
    MutationApplied,
    TaskDetailLoaded(Box<TaskDetail>),
    LabelsLoaded(Vec<Label>),
    Error(PasoError),
    RemoteEvent(EventEnvelope),
    Connected(bool),
}

/// Runs until a `WorkerRequest::Shutdown` or the request channel closes.
/// `to_loop` also receives forwarded `RemoteEvent` notices (via the
/// `EventClient`'s own callback) and periodic `Connected` transitions
/// polled from `EventClient::is_connected`.
pub async fn run(
    store: Store,
    event_client: EventClient,
    mut from_loop: tokio::sync::mpsc::Receiver<WorkerRequest>,
    to_loop: tokio::sync::mpsc::Sender<WorkerResponse>,
) {
    let mut connected = event_client.is_connected();
    let mut poll = tokio::time::interval(std::time::Duration::from_millis(500));

    loop {
        tokio::select! {
            request = from_loop.recv() => {
                match request {
                    None | Some(WorkerRequest::Shutdown) => break,
                    Some(other) => {
                        let response = handle(&store, &event_client, other).await;
                        if to_loop.send(response).await.is_err() {
                            break;
                        }
                    }
                }
            }
            _ = poll.tick() => {
                let now = event_client.is_connected();
                if now != connected {
                    connected = now;
                    if to_loop.send(WorkerResponse::Connected(connected)).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
    event_client.close().await;
}

async fn handle(store: &Store, event_client: &EventClient, request: WorkerRequest) -> WorkerResponse {
    match request {
        WorkerRequest::Shutdown => unreachable!("handled by caller"),
        WorkerRequest::Reload { project_id } => reload(store, project_id).await,
        WorkerRequest::CreateColumn { project_id, name, after } => {
            publish_or_error(event_client, store.create_column(project_id, &name, after).await.map(|(_, c)| c)).await
        }
        WorkerRequest::RenameColumn { id, name } => {
            publish_or_error(event_client, store.rename_column(id, &name).await.map(|(_, c)| c)).await
        }
        WorkerRequest::DeleteColumn { id, force } => {
            publish_or_error(event_client, store.delete_column(id, force).await).await
        }
        WorkerRequest::CreateTask { project_id, column_id, title, description } => {
            publish_or_error(
                event_client,
                store.create_task(project_id, column_id, &title, description.as_deref()).await.map(|(_, c)| c),
            )
            .await
        }
        WorkerRequest::UpdateTask { id, title, description, priority, task_type } => {
            let description = description.as_ref().map(|d| d.as_deref());
            let result = store.update_task(id, title.as_deref(), description, priority, task_type).await.map(|(_, c)| c);
            publish_or_error(event_client, result).await
        }
        WorkerRequest::DeleteTask { id } => publish_or_error(event_client, store.delete_task(id).await).await,
        WorkerRequest::MoveTaskNext { id } => {
            publish_option_or_error(event_client, store.move_to_next_column(id).await.map(|(_, c)| c)).await
        }
        WorkerRequest::MoveTaskPrev { id } => {
            publish_option_or_error(event_client, store.move_to_prev_column(id).await.map(|(_, c)| c)).await
        }
        WorkerRequest::SwapUp { id } => {
            publish_option_or_error(event_client, store.swap_up(id).await.map(|(_, c)| c)).await
        }
        WorkerRequest::SwapDown { id } => {
            publish_option_or_error(event_client, store.swap_down(id).await.map(|(_, c)| c)).await
        }
        WorkerRequest::AddRelation { from, to, relation } => {
            publish_or_error(event_client, store.add_relation(from, to, relation).await).await
        }
        WorkerRequest::RemoveRelation { from, to, relation } => {
            publish_or_error(event_client, store.remove_relation(from, to, relation).await).await
        }
        WorkerRequest::AttachLabel { task_id, label_id } => {
            publish_or_error(event_client, store.attach_label(task_id, label_id).await).await
        }
        WorkerRequest::DetachLabel { task_id, label_id } => {
            publish_or_error(event_client, store.detach_label(task_id, label_id).await).await
        }
        WorkerRequest::CreateLabel { project_id, name, color } => {
            publish_or_error(event_client, store.create_label(project_id, &name, &color).await.map(|(_, c)| c)).await
        }
        WorkerRequest::ListLabels { project_id } => match store.list_labels(project_id).await {
            Ok(labels) => WorkerResponse::LabelsLoaded(labels),
            Err(err) => WorkerResponse::Error(err),
        },
        WorkerRequest::TaskDetail { id } => match store.task_detail(id).await {
            Ok(detail) => WorkerResponse::TaskDetailLoaded(Box::new(detail)),
            Err(err) => WorkerResponse::Error(err),
        },
    }
}

async fn reload(store: &Store, project_id: ProjectId) -> WorkerResponse {
    let columns = match store.list_columns(project_id).await {
        Ok(columns) => columns,
        Err(err) => return WorkerResponse::Error(err),
    };
    let mut projection = Vec::with_capacity(columns.len());
    for column in columns {
        match store.list_tasks(column.id).await {
            Ok(tasks) => projection.push((column, tasks)),
            Err(err) => return WorkerResponse::Error(err),
        }
    }
    WorkerResponse::Reloaded { project_id, columns: projection }
}

async fn publish_or_error(
    event_client: &EventClient,
    result: Result<paso_core::types::ChangeDescriptor, PasoError>,
) -> WorkerResponse {
    match result {
        Ok(change) => {
            event_client.publish(EventEnvelope::unsequenced(change));
            WorkerResponse::MutationApplied
        }
        Err(err) => WorkerResponse::Error(err),
    }
}

async fn publish_option_or_error(
    event_client: &EventClient,
    result: Result<Option<paso_core::types::ChangeDescriptor>, PasoError>,
) -> WorkerResponse {
    match result {
        Ok(Some(change)) => {
            event_client.publish(EventEnvelope::unsequenced(change));
            WorkerResponse::MutationApplied
        }
        Ok(None) => WorkerResponse::MutationApplied,
        Err(err) => WorkerResponse::Error(err),
    }
}
