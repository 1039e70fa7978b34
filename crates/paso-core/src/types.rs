use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(v: i64) -> Self {
                $name(v)
            }
        }

        impl From<$name> for i64 {
            fn from(v: $name) -> Self {
                v.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ProjectId);
id_newtype!(ColumnId);
id_newtype!(TaskId);
id_newtype!(LabelId);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub id: ColumnId,
    pub project_id: ProjectId,
    pub name: String,
    pub prev_id: Option<ColumnId>,
    pub next_id: Option<ColumnId>,
    pub holds_completed_tasks: bool,
    pub holds_in_progress_tasks: bool,
    pub holds_ready_tasks: bool,
}

/// Mirrors the seeded `priorities` enum table: `Critical` is the highest
/// urgency, `Trivial` the lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Critical,
    High,
    Medium,
    Low,
    Trivial,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 5] = [
        TaskPriority::Critical,
        TaskPriority::High,
        TaskPriority::Medium,
        TaskPriority::Low,
        TaskPriority::Trivial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Critical => "critical",
            TaskPriority::High => "high",
            TaskPriority::Medium => "medium",
            TaskPriority::Low => "low",
            TaskPriority::Trivial => "trivial",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(TaskPriority::Critical),
            "high" => Some(TaskPriority::High),
            "medium" => Some(TaskPriority::Medium),
            "low" => Some(TaskPriority::Low),
            "trivial" => Some(TaskPriority::Trivial),
            _ => None,
        }
    }
}

/// Mirrors the seeded `types` enum table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Task,
    Bug,
    Feature,
}

impl TaskType {
    pub const ALL: [TaskType; 3] = [TaskType::Task, TaskType::Bug, TaskType::Feature];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Task => "task",
            TaskType::Bug => "bug",
            TaskType::Feature => "feature",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "task" => Some(TaskType::Task),
            "bug" => Some(TaskType::Bug),
            "feature" => Some(TaskType::Feature),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub column_id: ColumnId,
    pub ticket_number: i64,
    pub title: String,
    pub description: Option<String>,
    pub position: i64,
    pub priority: TaskPriority,
    pub task_type: TaskType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub project_id: ProjectId,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Parent,
    Child,
    Blocks,
    BlockedBy,
}

impl RelationType {
    /// The relation stored on the other side of the same edge.
    pub fn inverse(self) -> RelationType {
        match self {
            RelationType::Parent => RelationType::Child,
            RelationType::Child => RelationType::Parent,
            RelationType::Blocks => RelationType::BlockedBy,
            RelationType::BlockedBy => RelationType::Blocks,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Parent => "parent",
            RelationType::Child => "child",
            RelationType::Blocks => "blocks",
            RelationType::BlockedBy => "blocked_by",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "parent" => Some(RelationType::Parent),
            "child" => Some(RelationType::Child),
            "blocks" => Some(RelationType::Blocks),
            "blocked_by" => Some(RelationType::BlockedBy),
            _ => None,
        }
    }

    /// Cycle-checking only ever applies to the parent/child graph; blocks
    /// and blocked_by relations are not required to be acyclic.
    pub fn participates_in_hierarchy(&self) -> bool {
        matches!(self, RelationType::Parent | RelationType::Child)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRelation {
    pub from_task: TaskId,
    pub to_task: TaskId,
    pub relation_type: RelationType,
}

/// Lightweight projection of a task for board-rendering. Carries enough to
/// paint a card without a second query per card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub ticket_number: i64,
    pub title: String,
    pub position: i64,
    pub priority: TaskPriority,
    pub task_type: TaskType,
    pub label_colors: Vec<String>,
    pub is_blocked: bool,
}

/// Minimal id+ticket+title reference, used by pickers (parent/child).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReference {
    pub id: TaskId,
    pub ticket_number: i64,
    pub title: String,
}

/// Full joined view of a task for the detail pane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDetail {
    pub task: Task,
    pub labels: Vec<Label>,
    pub parents: Vec<TaskReference>,
    pub children: Vec<TaskReference>,
    pub blockers: Vec<TaskReference>,
    pub blocked: Vec<TaskReference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Column,
    Task,
    Label,
    Relation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
    Moved,
    Labelled,
}

/// Emitted by the store on every successful mutation; carried over the
/// event fabric so subscribers can decide whether to reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeDescriptor {
    pub project_id: ProjectId,
    pub entity_kind: EntityKind,
    pub entity_id: Option<i64>,
    pub kind: ChangeKind,
}
