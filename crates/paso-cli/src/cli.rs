use clap::{Parser, Subcommand};

/// paso -- a personal terminal-based Kanban system.
#[derive(Parser)]
#[command(name = "paso", version, about)]
pub struct Cli {
    /// Structured JSON output.
    #[arg(long, global = true)]
    pub json: bool,

    /// Print only the affected entity's id (for shell capture).
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Override a guarded transition (e.g. completed-column reassignment).
    #[arg(long, global = true)]
    pub force: bool,

    /// Project id. Falls back to `PASO_PROJECT` when a command needs one.
    #[arg(long, global = true)]
    pub project: Option<i64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Project management.
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Column management.
    Column {
        #[command(subcommand)]
        command: ColumnCommands,
    },
    /// Label management.
    Label {
        #[command(subcommand)]
        command: LabelCommands,
    },
    /// Task management.
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Launch the interactive terminal UI.
    Tui,
    /// Generate a shell completion script.
    Completion {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommands {
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum ColumnCommands {
    Create {
        name: String,
        /// Insert after this column id (defaults to the tail).
        #[arg(long)]
        after: Option<i64>,
    },
    List,
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        holds_ready_tasks: Option<bool>,
        #[arg(long)]
        holds_in_progress_tasks: Option<bool>,
        #[arg(long)]
        holds_completed_tasks: Option<bool>,
    },
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum LabelCommands {
    Create { name: String, color: String },
    List,
    Delete { id: i64 },
    Attach { task_id: i64, label_id: i64 },
    Detach { task_id: i64, label_id: i64 },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    Create {
        column_id: i64,
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    List { column_id: i64 },
    Show { id: i64 },
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// critical | high | medium | low | trivial
        #[arg(long)]
        priority: Option<String>,
        /// task | bug | feature
        #[arg(long = "type")]
        task_type: Option<String>,
    },
    Delete { id: i64 },
    Move {
        id: i64,
        #[arg(long, conflicts_with_all = ["next", "prev"])]
        to: Option<i64>,
        #[arg(long)]
        next: bool,
        #[arg(long)]
        prev: bool,
    },
    SwapUp { id: i64 },
    SwapDown { id: i64 },
    /// parent | child | blocks | blocked_by
    Relate { from: i64, relation: String, to: i64 },
    Unrelate { from: i64, relation: String, to: i64 },
}
