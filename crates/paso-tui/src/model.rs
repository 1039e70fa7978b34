//! The Board Model: in-memory projection of the selected project plus the
//! operating-mode state machine. Owned exclusively by the event loop; worker
//! tasks only ever hand back payloads for `BoardModel` methods to apply.

use std::time::{Duration, Instant};

use paso_core::types::{
    Column, ColumnId, Label, ProjectId, TaskDetail, TaskId, TaskPriority, TaskReference, TaskSummary, TaskType,
};

/// A column plus its cached task summaries and per-column scroll offset.
pub struct ColumnProjection {
    pub column: Column,
    pub tasks: Vec<TaskSummary>,
    pub scroll: usize,
}

/// `column` always indexes `BoardModel::columns`; `task` is `None` for an
/// empty column, otherwise an index into that column's `tasks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub column: usize,
    pub task: Option<usize>,
}

#[derive(Default)]
pub struct Viewport {
    pub leftmost_column: usize,
}

/// A single-line editable text field with a cursor position (byte offset).
#[derive(Debug, Clone, Default)]
pub struct Buffer {
    pub text: String,
    pub cursor: usize,
}

impl Buffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.len();
        Buffer { text, cursor }
    }

    pub fn insert(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let prev = self.text[..self.cursor].chars().next_back().map(|c| c.len_utf8()).unwrap_or(1);
        self.cursor -= prev;
        self.text.remove(self.cursor);
    }

    pub fn left(&mut self) {
        if self.cursor > 0 {
            let prev = self.text[..self.cursor].chars().next_back().map(|c| c.len_utf8()).unwrap_or(1);
            self.cursor -= prev;
        }
    }

    pub fn right(&mut self) {
        if let Some(c) = self.text[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }
}

/// Which field of the task form currently has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFormField {
    Title,
    Description,
}

#[derive(Debug, Clone, Copy)]
pub enum TaskFormTarget {
    Create { column: ColumnId },
    Edit { task: TaskId },
}

/// Accumulated state for the create/edit task form; survives trips through
/// the label/parent/child/priority/type pickers since those modes apply
/// their result here rather than to a transient local.
pub struct TaskFormState {
    pub target: TaskFormTarget,
    pub title: Buffer,
    pub description: Buffer,
    pub focus: TaskFormField,
    pub priority: TaskPriority,
    pub task_type: TaskType,
    pub labels: Vec<Label>,
}

impl TaskFormState {
    pub fn new_create(column: ColumnId) -> Self {
        TaskFormState {
            target: TaskFormTarget::Create { column },
            title: Buffer::default(),
            description: Buffer::default(),
            focus: TaskFormField::Title,
            priority: TaskPriority::Medium,
            task_type: TaskType::Task,
            labels: Vec::new(),
        }
    }

    pub fn from_detail(detail: &TaskDetail) -> Self {
        TaskFormState {
            target: TaskFormTarget::Edit { task: detail.task.id },
            title: Buffer::new(detail.task.title.clone()),
            description: Buffer::new(detail.task.description.clone().unwrap_or_default()),
            focus: TaskFormField::Title,
            priority: detail.task.priority,
            task_type: detail.task.task_type,
            labels: detail.labels.clone(),
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            TaskFormField::Title => TaskFormField::Description,
            TaskFormField::Description => TaskFormField::Title,
        };
    }

    pub fn active_buffer_mut(&mut self) -> &mut Buffer {
        match self.focus {
            TaskFormField::Title => &mut self.title,
            TaskFormField::Description => &mut self.description,
        }
    }
}

/// A pickable list with a cursor and the prior task-form state to resume.
pub struct PickerState {
    pub items: Vec<TaskReference>,
    pub cursor: usize,
    pub form: Box<TaskFormState>,
}

pub struct LabelPickerState {
    pub items: Vec<Label>,
    pub selected: std::collections::HashSet<i64>,
    pub cursor: usize,
    pub form: Box<TaskFormState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Created,
    Updated,
    Priority,
    Title,
    Ticket,
}

pub struct ListViewState {
    pub sort: SortField,
    pub ascending: bool,
    pub cursor: usize,
    pub scroll: usize,
}

impl Default for ListViewState {
    fn default() -> Self {
        ListViewState { sort: SortField::Created, ascending: true, cursor: 0, scroll: 0 }
    }
}

pub struct SearchState {
    pub query: Buffer,
    pub matches: Vec<(usize, usize)>,
    pub match_cursor: usize,
    pub prior_selection: Selection,
}

pub enum Mode {
    Normal,
    AddColumn(Buffer),
    EditColumn(ColumnId, Buffer),
    TaskForm(TaskFormState),
    LabelPicker(LabelPickerState),
    ParentPicker(PickerState),
    ChildPicker(PickerState),
    PriorityPicker(Box<TaskFormState>),
    TypePicker(Box<TaskFormState>),
    DeleteTaskConfirm(TaskId),
    DeleteColumnConfirm(ColumnId),
    DiscardConfirm(Box<Mode>),
    TaskDetail(TaskId),
    Help,
    ListView(ListViewState),
    Search(SearchState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub expires_at: Option<Instant>,
}

/// The full in-memory projection for the currently selected project, plus
/// the operating mode and notification queue. Everything here is mutated
/// only from the event loop; worker responses are applied via the `apply_*`
/// methods.
/// A picker that was requested but is waiting on its worker response
/// (project labels, or the candidate task list) before the mode can switch.
pub enum Pending {
    LabelPicker(Box<TaskFormState>),
    EditTaskForm(TaskId),
}

pub struct BoardModel {
    pub project_id: ProjectId,
    pub columns: Vec<ColumnProjection>,
    pub selection: Selection,
    pub viewport: Viewport,
    pub mode: Mode,
    pub notifications: Vec<Notification>,
    pub connected: bool,
    pub task_detail: Option<TaskDetail>,
    pub cached_labels: Vec<Label>,
    pub pending: Option<Pending>,
    pub should_quit: bool,
}

impl BoardModel {
    pub fn new(project_id: ProjectId) -> Self {
        BoardModel {
            project_id,
            columns: Vec::new(),
            selection: Selection { column: 0, task: None },
            viewport: Viewport::default(),
            mode: Mode::Normal,
            notifications: Vec::new(),
            connected: true,
            task_detail: None,
            cached_labels: Vec::new(),
            pending: None,
            should_quit: false,
        }
    }

    /// Applies a full project reload: replaces the column/task projection,
    /// re-derives selection by previously-selected task id (falling back to
    /// a clamped index), then re-clamps the viewport.
    pub fn apply_reload(&mut self, columns: Vec<(Column, Vec<TaskSummary>)>) {
        let previously_selected = self.selected_task_id();

        self.columns = columns
            .into_iter()
            .map(|(column, tasks)| ColumnProjection { column, tasks, scroll: 0 })
            .collect();

        if self.columns.is_empty() {
            self.selection = Selection { column: 0, task: None };
            self.viewport.leftmost_column = 0;
            return;
        }

        if let Some(task_id) = previously_selected {
            if let Some((col_idx, task_idx)) = self.locate_task(task_id) {
                self.selection = Selection { column: col_idx, task: Some(task_idx) };
                self.clamp_viewport();
                return;
            }
        }

        let column = self.selection.column.min(self.columns.len() - 1);
        let task = if self.columns[column].tasks.is_empty() {
            None
        } else {
            Some(self.selection.task.unwrap_or(0).min(self.columns[column].tasks.len() - 1))
        };
        self.selection = Selection { column, task };
        self.clamp_viewport();
    }

    pub fn locate_task(&self, task_id: TaskId) -> Option<(usize, usize)> {
        for (ci, col) in self.columns.iter().enumerate() {
            if let Some(ti) = col.tasks.iter().position(|t| t.id == task_id) {
                return Some((ci, ti));
            }
        }
        None
    }

    pub fn selected_task_id(&self) -> Option<TaskId> {
        let col = self.columns.get(self.selection.column)?;
        let idx = self.selection.task?;
        col.tasks.get(idx).map(|t| t.id)
    }

    pub fn selected_column_id(&self) -> Option<ColumnId> {
        self.columns.get(self.selection.column).map(|c| c.column.id)
    }

    /// Resolves "move to next column" from linked-list order, not index
    /// arithmetic: a no-op on the tail column yields a neutral notification
    /// rather than an error.
    pub fn next_column_of(&self, column_id: ColumnId) -> Option<ColumnId> {
        self.columns.iter().find(|c| c.column.id == column_id).and_then(|c| c.column.next_id)
    }

    pub fn prev_column_of(&self, column_id: ColumnId) -> Option<ColumnId> {
        self.columns.iter().find(|c| c.column.id == column_id).and_then(|c| c.column.prev_id)
    }

    pub fn move_selection_up(&mut self) {
        if let Some(idx) = self.selection.task {
            if idx > 0 {
                self.selection.task = Some(idx - 1);
                self.clamp_viewport();
            }
        }
    }

    pub fn move_selection_down(&mut self) {
        if let Some(col) = self.columns.get(self.selection.column) {
            if let Some(idx) = self.selection.task {
                if idx + 1 < col.tasks.len() {
                    self.selection.task = Some(idx + 1);
                    self.clamp_viewport();
                }
            }
        }
    }

    pub fn move_selection_left(&mut self) {
        if self.selection.column > 0 {
            self.selection.column -= 1;
            self.reclamp_task_index();
            self.clamp_viewport();
        }
    }

    pub fn move_selection_right(&mut self) {
        if self.selection.column + 1 < self.columns.len() {
            self.selection.column += 1;
            self.reclamp_task_index();
            self.clamp_viewport();
        }
    }

    fn reclamp_task_index(&mut self) {
        let len = self.columns[self.selection.column].tasks.len();
        self.selection.task = if len == 0 { None } else { Some(self.selection.task.unwrap_or(0).min(len - 1)) };
    }

    /// Clamps the leftmost-visible-column offset and the selected column's
    /// scroll offset so the selection stays on screen. `visible_columns` and
    /// `visible_rows` are supplied by the renderer each frame since they
    /// depend on terminal size.
    pub fn clamp_viewport_to(&mut self, visible_columns: usize, visible_rows: usize) {
        if self.columns.is_empty() {
            return;
        }
        if self.selection.column < self.viewport.leftmost_column {
            self.viewport.leftmost_column = self.selection.column;
        } else if visible_columns > 0 && self.selection.column >= self.viewport.leftmost_column + visible_columns {
            self.viewport.leftmost_column = self.selection.column + 1 - visible_columns;
        }

        if let Some(idx) = self.selection.task {
            let scroll = &mut self.columns[self.selection.column].scroll;
            if idx < *scroll {
                *scroll = idx;
            } else if visible_rows > 0 && idx >= *scroll + visible_rows {
                *scroll = idx + 1 - visible_rows;
            }
        }
    }

    /// Best-effort clamp without known terminal dimensions, used right after
    /// a reload before the next render pass recomputes with real sizes.
    fn clamp_viewport(&mut self) {
        self.clamp_viewport_to(usize::MAX, usize::MAX);
    }

    pub fn push_notification(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notifications.push(Notification {
            level,
            message: message.into(),
            expires_at: Some(Instant::now() + Duration::from_secs(5)),
        });
    }

    pub fn expire_notifications(&mut self) {
        let now = Instant::now();
        self.notifications.retain(|n| n.expires_at.map(|e| e > now).unwrap_or(true));
    }

    pub fn top_notification(&self) -> Option<&Notification> {
        self.notifications.last()
    }

    /// `(column_index, task_index)` pairs whose title or ticket number
    /// contains `query`, case-insensitively.
    pub fn search_matches(&self, query: &str) -> Vec<(usize, usize)> {
        if query.is_empty() {
            return Vec::new();
        }
        let needle = query.to_lowercase();
        let mut matches = Vec::new();
        for (ci, col) in self.columns.iter().enumerate() {
            for (ti, task) in col.tasks.iter().enumerate() {
                let ticket = format!("{}", task.ticket_number);
                if task.title.to_lowercase().contains(&needle) || ticket.contains(&needle) {
                    matches.push((ci, ti));
                }
            }
        }
        matches
    }
}
