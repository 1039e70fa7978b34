//! The interactive board. A single-owner event loop holds the `BoardModel`
//! and blocks only on keystrokes or worker messages, grounded on the
//! teacher's `at-tui/src/main.rs` run loop, generalized to a worker task
//! since this TUI also issues mutations rather than only polling a read API.

pub mod keymap;
pub mod model;
pub mod theme;
pub mod ui;
pub mod worker;

use std::io;
use std::time::Duration;

use crossterm::event::{self as ct_event, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;

use paso_core::config::{Action, Config};
use paso_core::store::Store;
use paso_core::types::{ProjectId, RelationType, TaskPriority, TaskType};
use paso_ipc::EventClient;

use keymap::Keymap;
use model::{
    BoardModel, Buffer, ListViewState, Mode, NotificationLevel, Pending, PickerState, SearchState, SortField,
    TaskFormState,
};
use theme::Theme;
use worker::{WorkerRequest, WorkerResponse};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Entry point called by `paso-cli`'s `tui` subcommand. `project` is the
/// already-resolved `--project`/`PASO_PROJECT` value, if any; absent, the
/// first project on record is used.
pub async fn run(project: Option<ProjectId>) -> anyhow::Result<()> {
    let config = Config::load();
    let keymap = Keymap::from_config(&config);
    let theme = Theme::from_config(&config.theme);

    let store = Store::open(paso_core::logging::db_path()).await?;
    let project_id = match project {
        Some(id) => id,
        None => store
            .list_projects()
            .await?
            .into_iter()
            .next()
            .map(|p| p.id)
            .ok_or_else(|| anyhow::anyhow!("no projects exist yet; create one with `paso project create <name>`"))?,
    };

    let event_client = EventClient::connect(paso_core::logging::socket_path());
    event_client.subscribe(project_id.0);

    let (request_tx, request_rx) = mpsc::channel::<WorkerRequest>(32);
    let (response_tx, mut response_rx) = mpsc::channel::<WorkerResponse>(256);

    event_client.on_event({
        let response_tx = response_tx.clone();
        move |envelope| {
            let _ = response_tx.try_send(WorkerResponse::RemoteEvent(envelope));
        }
    });

    let worker_handle = tokio::spawn(worker::run(store, event_client, request_rx, response_tx));

    let (key_tx, mut key_rx) = mpsc::unbounded_channel::<KeyEvent>();
    let input_shutdown = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let input_handle = spawn_input_reader(key_tx, input_shutdown.clone());

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let mut model = BoardModel::new(project_id);
    request_tx.send(WorkerRequest::Reload { project_id }).await.ok();

    let result = event_loop(&mut terminal, &mut model, &keymap, &theme, &request_tx, &mut key_rx, &mut response_rx).await;

    restore_terminal()?;
    input_shutdown.store(true, std::sync::atomic::Ordering::SeqCst);
    let _ = input_handle.join();
    request_tx.send(WorkerRequest::Shutdown).await.ok();
    worker_handle.abort();

    result
}

fn setup_terminal() -> anyhow::Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal() -> anyhow::Result<()> {
    disable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen)?;
    Ok(())
}

/// `crossterm::event::poll`/`read` block the calling thread, so they cannot
/// live on the same task as the async `select!` loop below; a dedicated
/// thread forwards decoded key events over an unbounded channel instead.
fn spawn_input_reader(
    tx: mpsc::UnboundedSender<KeyEvent>,
    shutdown: std::sync::Arc<std::sync::atomic::AtomicBool>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        while !shutdown.load(std::sync::atomic::Ordering::Relaxed) {
            match ct_event::poll(Duration::from_millis(100)) {
                Ok(true) => {
                    if let Ok(Event::Key(key)) = ct_event::read() {
                        if key.kind == KeyEventKind::Press && tx.send(key).is_err() {
                            break;
                        }
                    }
                }
                Ok(false) => continue,
                Err(_) => break,
            }
        }
    })
}

async fn event_loop(
    terminal: &mut Term,
    model: &mut BoardModel,
    keymap: &Keymap,
    theme: &Theme,
    requests: &mpsc::Sender<WorkerRequest>,
    keys: &mut mpsc::UnboundedReceiver<KeyEvent>,
    responses: &mut mpsc::Receiver<WorkerResponse>,
) -> anyhow::Result<()> {
    loop {
        model.expire_notifications();
        terminal.draw(|frame| ui::render(frame, model, theme))?;

        tokio::select! {
            key = keys.recv() => {
                let Some(key) = key else { break };
                handle_key(model, keymap, key, requests).await;
            }
            response = responses.recv() => {
                let Some(response) = response else { break };
                apply_response(model, response, requests).await;
            }
        }

        if model.should_quit {
            break;
        }
    }
    Ok(())
}

async fn apply_response(model: &mut BoardModel, response: WorkerResponse, requests: &mpsc::Sender<WorkerRequest>) {
    match response {
        WorkerResponse::Reloaded { project_id, columns } => {
            if project_id == model.project_id {
                model.apply_reload(columns);
            }
        }
        WorkerResponse::MutationApplied => {
            requests.send(WorkerRequest::Reload { project_id: model.project_id }).await.ok();
        }
        WorkerResponse::TaskDetailLoaded(detail) => match model.pending.take() {
            Some(Pending::EditTaskForm(task_id)) if task_id == detail.task.id => {
                let mut form = TaskFormState::from_detail(&detail);
                form.labels = detail.labels.clone();
                model.task_detail = Some(*detail);
                model.mode = Mode::TaskForm(form);
            }
            other => {
                model.pending = other;
                model.task_detail = Some(*detail);
            }
        },
        WorkerResponse::LabelsLoaded(labels) => {
            model.cached_labels = labels;
            if let Some(Pending::LabelPicker(form)) = model.pending.take() {
                let selected = form.labels.iter().map(|l| l.id.0).collect();
                model.mode = Mode::LabelPicker(model::LabelPickerState {
                    items: model.cached_labels.clone(),
                    selected,
                    cursor: 0,
                    form,
                });
            }
        }
        WorkerResponse::Error(err) => {
            model.push_notification(NotificationLevel::Error, err.to_string());
        }
        WorkerResponse::RemoteEvent(envelope) => {
            if envelope.project_id == model.project_id.0 {
                requests.send(WorkerRequest::Reload { project_id: model.project_id }).await.ok();
            }
        }
        WorkerResponse::Connected(connected) => {
            model.connected = connected;
        }
    }
}

async fn handle_key(model: &mut BoardModel, keymap: &Keymap, key: KeyEvent, requests: &mpsc::Sender<WorkerRequest>) {
    let mode = std::mem::replace(&mut model.mode, Mode::Normal);
    model.mode = match mode {
        Mode::Normal => {
            handle_normal_key(model, keymap, key, requests).await;
            return;
        }
        Mode::AddColumn(mut buf) => match key.code {
            KeyCode::Enter => {
                if !buf.text.trim().is_empty() {
                    requests
                        .send(WorkerRequest::CreateColumn { project_id: model.project_id, name: buf.text.clone(), after: None })
                        .await
                        .ok();
                }
                Mode::Normal
            }
            KeyCode::Esc => Mode::Normal,
            _ => {
                edit_buffer(&mut buf, key);
                Mode::AddColumn(buf)
            }
        },
        Mode::EditColumn(id, mut buf) => match key.code {
            KeyCode::Enter => {
                if !buf.text.trim().is_empty() {
                    requests.send(WorkerRequest::RenameColumn { id, name: buf.text.clone() }).await.ok();
                }
                Mode::Normal
            }
            KeyCode::Esc => Mode::Normal,
            _ => {
                edit_buffer(&mut buf, key);
                Mode::EditColumn(id, buf)
            }
        },
        Mode::TaskForm(form) => handle_task_form_key(model, keymap, key, form, requests).await,
        Mode::LabelPicker(state) => handle_label_picker_key(key, state),
        Mode::ParentPicker(state) => handle_relation_picker_key(key, state, RelationType::Parent, requests).await,
        Mode::ChildPicker(state) => handle_relation_picker_key(key, state, RelationType::Child, requests).await,
        Mode::PriorityPicker(mut form) => match key.code {
            KeyCode::Esc => Mode::TaskForm(*form),
            KeyCode::Up | KeyCode::Char('k') => {
                form.priority = cycle_priority(form.priority, -1);
                Mode::PriorityPicker(form)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                form.priority = cycle_priority(form.priority, 1);
                Mode::PriorityPicker(form)
            }
            KeyCode::Enter => Mode::TaskForm(*form),
            _ => Mode::PriorityPicker(form),
        },
        Mode::TypePicker(mut form) => match key.code {
            KeyCode::Esc => Mode::TaskForm(*form),
            KeyCode::Up | KeyCode::Char('k') => {
                form.task_type = cycle_type(form.task_type, -1);
                Mode::TypePicker(form)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                form.task_type = cycle_type(form.task_type, 1);
                Mode::TypePicker(form)
            }
            KeyCode::Enter => Mode::TaskForm(*form),
            _ => Mode::TypePicker(form),
        },
        Mode::DeleteTaskConfirm(id) => match key.code {
            KeyCode::Char('y') => {
                requests.send(WorkerRequest::DeleteTask { id }).await.ok();
                Mode::Normal
            }
            _ => Mode::Normal,
        },
        Mode::DeleteColumnConfirm(id) => match key.code {
            KeyCode::Char('y') => {
                requests.send(WorkerRequest::DeleteColumn { id, force: false }).await.ok();
                Mode::Normal
            }
            _ => Mode::Normal,
        },
        Mode::DiscardConfirm(prior) => match key.code {
            KeyCode::Char('y') => Mode::Normal,
            _ => *prior,
        },
        Mode::TaskDetail(id) => match key.code {
            KeyCode::Esc | KeyCode::Char('q') => Mode::Normal,
            KeyCode::Char('e') => match &model.task_detail {
                Some(detail) if detail.task.id == id => Mode::TaskForm(TaskFormState::from_detail(detail)),
                _ => Mode::TaskDetail(id),
            },
            KeyCode::Char('L') => {
                requests.send(WorkerRequest::ListLabels { project_id: model.project_id }).await.ok();
                if let Some(detail) = &model.task_detail {
                    model.pending = Some(Pending::LabelPicker(Box::new(TaskFormState::from_detail(detail))));
                }
                Mode::TaskDetail(id)
            }
            _ => Mode::TaskDetail(id),
        },
        Mode::Help => Mode::Normal,
        Mode::ListView(state) => handle_list_view_key(model, key, state, requests).await,
        Mode::Search(state) => handle_search_key(model, key, state),
    };
}

async fn handle_normal_key(model: &mut BoardModel, keymap: &Keymap, key: KeyEvent, requests: &mpsc::Sender<WorkerRequest>) {
    let Some(action) = keymap.resolve(key) else { return };
    match action {
        Action::MoveUp | Action::SelectPrev => model.move_selection_up(),
        Action::MoveDown | Action::SelectNext => model.move_selection_down(),
        Action::MoveLeft => model.move_selection_left(),
        Action::MoveRight => model.move_selection_right(),
        Action::CreateTask => {
            if let Some(column) = model.selected_column_id() {
                model.mode = Mode::TaskForm(TaskFormState::new_create(column));
            } else {
                model.push_notification(NotificationLevel::Warning, "create a column first");
            }
        }
        Action::EditTask => {
            if let Some(task_id) = model.selected_task_id() {
                requests.send(WorkerRequest::TaskDetail { id: task_id }).await.ok();
                model.pending = Some(Pending::EditTaskForm(task_id));
            }
        }
        Action::DeleteTask => {
            if let Some(task_id) = model.selected_task_id() {
                model.mode = Mode::DeleteTaskConfirm(task_id);
            }
        }
        Action::CreateColumn => model.mode = Mode::AddColumn(Buffer::default()),
        Action::EditColumn => {
            if let Some(col) = model.columns.get(model.selection.column) {
                model.mode = Mode::EditColumn(col.column.id, Buffer::new(col.column.name.clone()));
            }
        }
        Action::DeleteColumn => {
            if let Some(column_id) = model.selected_column_id() {
                model.mode = Mode::DeleteColumnConfirm(column_id);
            }
        }
        Action::OpenDetail => {
            if let Some(task_id) = model.selected_task_id() {
                requests.send(WorkerRequest::TaskDetail { id: task_id }).await.ok();
                model.mode = Mode::TaskDetail(task_id);
            }
        }
        Action::ToggleListView => model.mode = Mode::ListView(ListViewState::default()),
        Action::Search => {
            model.mode = Mode::Search(SearchState {
                query: Buffer::default(),
                matches: Vec::new(),
                match_cursor: 0,
                prior_selection: model.selection,
            })
        }
        Action::Help => model.mode = Mode::Help,
        Action::Quit => model.should_quit = true,
        Action::MoveTaskNext => {
            if let Some(task_id) = model.selected_task_id() {
                requests.send(WorkerRequest::MoveTaskNext { id: task_id }).await.ok();
            }
        }
        Action::MoveTaskPrev => {
            if let Some(task_id) = model.selected_task_id() {
                requests.send(WorkerRequest::MoveTaskPrev { id: task_id }).await.ok();
            }
        }
        Action::SwapTaskUp => {
            if let Some(task_id) = model.selected_task_id() {
                requests.send(WorkerRequest::SwapUp { id: task_id }).await.ok();
            }
        }
        Action::SwapTaskDown => {
            if let Some(task_id) = model.selected_task_id() {
                requests.send(WorkerRequest::SwapDown { id: task_id }).await.ok();
            }
        }
        // Pickers are only reachable from within the task form; unbound here.
        Action::OpenLabelPicker
        | Action::OpenParentPicker
        | Action::OpenChildPicker
        | Action::OpenPriorityPicker
        | Action::OpenTypePicker
        | Action::Confirm
        | Action::Cancel => {}
    }
}

async fn handle_task_form_key(
    model: &mut BoardModel,
    _keymap: &Keymap,
    key: KeyEvent,
    mut form: TaskFormState,
    requests: &mpsc::Sender<WorkerRequest>,
) -> Mode {
    match key.code {
        KeyCode::Esc => Mode::DiscardConfirm(Box::new(Mode::TaskForm(form))),
        KeyCode::Tab | KeyCode::BackTab => {
            form.toggle_focus();
            Mode::TaskForm(form)
        }
        KeyCode::Enter => {
            save_task_form(model, &form, requests).await;
            Mode::Normal
        }
        // Ctrl-modified so the bare letters stay typable in the title/description fields.
        KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => Mode::PriorityPicker(Box::new(form)),
        KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => Mode::TypePicker(Box::new(form)),
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            requests.send(WorkerRequest::ListLabels { project_id: model.project_id }).await.ok();
            model.pending = Some(Pending::LabelPicker(Box::new(form)));
            Mode::Normal
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            open_relation_picker(model, form, RelationType::Parent)
        }
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            open_relation_picker(model, form, RelationType::Child)
        }
        _ => {
            edit_buffer(form.active_buffer_mut(), key);
            Mode::TaskForm(form)
        }
    }
}

/// Parent/child pickers need a persisted task id to relate against; an
/// in-progress create has none yet, so picking stays unavailable until the
/// task exists (it can be related afterwards via edit).
fn open_relation_picker(model: &BoardModel, form: TaskFormState, relation: RelationType) -> Mode {
    let model::TaskFormTarget::Edit { task } = form.target else {
        return Mode::TaskForm(form);
    };
    let candidates: Vec<paso_core::types::TaskReference> = model
        .columns
        .iter()
        .flat_map(|c| c.tasks.iter())
        .filter(|t| t.id != task)
        .map(|t| paso_core::types::TaskReference { id: t.id, ticket_number: t.ticket_number, title: t.title.clone() })
        .collect();
    let state = PickerState { items: candidates, cursor: 0, form: Box::new(form) };
    match relation {
        RelationType::Parent => Mode::ParentPicker(state),
        RelationType::Child => Mode::ChildPicker(state),
        _ => Mode::TaskForm(*state.form),
    }
}

async fn save_task_form(model: &BoardModel, form: &TaskFormState, requests: &mpsc::Sender<WorkerRequest>) {
    match form.target {
        model::TaskFormTarget::Create { column } => {
            let description = if form.description.text.is_empty() { None } else { Some(form.description.text.clone()) };
            requests
                .send(WorkerRequest::CreateTask {
                    project_id: model.project_id,
                    column_id: column,
                    title: form.title.text.clone(),
                    description,
                })
                .await
                .ok();
        }
        model::TaskFormTarget::Edit { task } => {
            let description = Some(if form.description.text.is_empty() { None } else { Some(form.description.text.clone()) });
            requests
                .send(WorkerRequest::UpdateTask {
                    id: task,
                    title: Some(form.title.text.clone()),
                    description,
                    priority: Some(form.priority),
                    task_type: Some(form.task_type),
                })
                .await
                .ok();
        }
    }
}

fn handle_label_picker_key(key: KeyEvent, mut state: model::LabelPickerState) -> Mode {
    match key.code {
        KeyCode::Esc => Mode::TaskForm(*state.form),
        KeyCode::Up | KeyCode::Char('k') => {
            state.cursor = state.cursor.saturating_sub(1);
            Mode::LabelPicker(state)
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.cursor = (state.cursor + 1).min(state.items.len().saturating_sub(1));
            Mode::LabelPicker(state)
        }
        KeyCode::Char(' ') => {
            if let Some(label) = state.items.get(state.cursor) {
                let id = label.id.0;
                if !state.selected.remove(&id) {
                    state.selected.insert(id);
                }
            }
            Mode::LabelPicker(state)
        }
        KeyCode::Enter => {
            let mut form = state.form;
            form.labels = state.items.into_iter().filter(|l| state.selected.contains(&l.id.0)).collect();
            Mode::TaskForm(*form)
        }
        _ => Mode::LabelPicker(state),
    }
}

async fn handle_relation_picker_key(
    key: KeyEvent,
    mut state: PickerState,
    relation: RelationType,
    requests: &mpsc::Sender<WorkerRequest>,
) -> Mode {
    match key.code {
        KeyCode::Esc => Mode::TaskForm(*state.form),
        KeyCode::Up | KeyCode::Char('k') => {
            state.cursor = state.cursor.saturating_sub(1);
            wrap_picker(state, relation)
        }
        KeyCode::Down | KeyCode::Char('j') => {
            state.cursor = (state.cursor + 1).min(state.items.len().saturating_sub(1));
            wrap_picker(state, relation)
        }
        KeyCode::Enter => {
            if let (Some(candidate), model::TaskFormTarget::Edit { task }) = (state.items.get(state.cursor), state.form.target) {
                requests.send(WorkerRequest::AddRelation { from: task, to: candidate.id, relation }).await.ok();
            }
            Mode::TaskForm(*state.form)
        }
        _ => wrap_picker(state, relation),
    }
}

fn wrap_picker(state: PickerState, relation: RelationType) -> Mode {
    match relation {
        RelationType::Parent => Mode::ParentPicker(state),
        RelationType::Child => Mode::ChildPicker(state),
        _ => Mode::TaskForm(*state.form),
    }
}

async fn handle_list_view_key(
    model: &mut BoardModel,
    key: KeyEvent,
    mut state: ListViewState,
    requests: &mpsc::Sender<WorkerRequest>,
) -> Mode {
    let total: usize = model.columns.iter().map(|c| c.tasks.len()).sum();
    match key.code {
        KeyCode::Esc | KeyCode::Char('v') => return Mode::Normal,
        KeyCode::Up | KeyCode::Char('k') => state.cursor = state.cursor.saturating_sub(1),
        KeyCode::Down | KeyCode::Char('j') => state.cursor = (state.cursor + 1).min(total.saturating_sub(1)),
        KeyCode::Char('s') => {
            state.sort = match state.sort {
                SortField::Created => SortField::Updated,
                SortField::Updated => SortField::Priority,
                SortField::Priority => SortField::Title,
                SortField::Title => SortField::Ticket,
                SortField::Ticket => SortField::Created,
            }
        }
        KeyCode::Char('r') => state.ascending = !state.ascending,
        KeyCode::Enter => {
            let task_id = model.columns.iter().flat_map(|c| c.tasks.iter()).nth(state.cursor).map(|t| t.id);
            if let Some(id) = task_id {
                requests.send(WorkerRequest::TaskDetail { id }).await.ok();
                return Mode::TaskDetail(id);
            }
        }
        _ => {}
    }
    Mode::ListView(state)
}

fn handle_search_key(model: &mut BoardModel, key: KeyEvent, mut state: SearchState) -> Mode {
    match key.code {
        KeyCode::Esc => {
            model.selection = state.prior_selection;
            Mode::Normal
        }
        KeyCode::Enter => {
            if let Some(&(col, task)) = state.matches.get(state.match_cursor) {
                model.selection = model::Selection { column: col, task: Some(task) };
            }
            Mode::Normal
        }
        KeyCode::Down | KeyCode::Tab => {
            if !state.matches.is_empty() {
                state.match_cursor = (state.match_cursor + 1) % state.matches.len();
            }
            Mode::Search(state)
        }
        KeyCode::Up | KeyCode::BackTab => {
            if !state.matches.is_empty() {
                state.match_cursor = (state.match_cursor + state.matches.len() - 1) % state.matches.len();
            }
            Mode::Search(state)
        }
        _ => {
            edit_buffer(&mut state.query, key);
            state.matches = model.search_matches(&state.query.text);
            state.match_cursor = 0;
            Mode::Search(state)
        }
    }
}

fn edit_buffer(buffer: &mut Buffer, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) => buffer.insert(c),
        KeyCode::Backspace => buffer.backspace(),
        KeyCode::Left => buffer.left(),
        KeyCode::Right => buffer.right(),
        _ => {}
    }
}

fn cycle_priority(current: TaskPriority, delta: i32) -> TaskPriority {
    let idx = TaskPriority::ALL.iter().position(|p| *p == current).unwrap_or(0) as i32;
    let len = TaskPriority::ALL.len() as i32;
    let next = ((idx + delta).rem_euclid(len)) as usize;
    TaskPriority::ALL[next]
}

fn cycle_type(current: TaskType, delta: i32) -> TaskType {
    let idx = TaskType::ALL.iter().position(|t| *t == current).unwrap_or(0) as i32;
    let len = TaskType::ALL.len() as i32;
    let next = ((idx + delta).rem_euclid(len)) as usize;
    TaskType::ALL[next]
}
