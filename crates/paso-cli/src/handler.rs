use async_trait::async_trait;
use paso_core::error::PasoError;
use paso_core::store::Store;
use paso_core::types::{Column, Label, Project, Task, TaskDetail, TaskSummary};

/// What a subcommand produced, before a renderer turns it into text.
pub enum HandlerOutput {
    Project(Project),
    Projects(Vec<Project>),
    Column(Column),
    Columns(Vec<Column>),
    Task(Task),
    TaskSummaries(Vec<TaskSummary>),
    TaskDetail(Box<TaskDetail>),
    Label(Label),
    Labels(Vec<Label>),
    Deleted { entity: &'static str, id: i64 },
    Message(String),
}

impl HandlerOutput {
    /// The single id a `--quiet` invocation prints, when the output names
    /// exactly one entity.
    fn quiet_id(&self) -> Option<i64> {
        match self {
            HandlerOutput::Project(p) => Some(p.id.0),
            HandlerOutput::Column(c) => Some(c.id.0),
            HandlerOutput::Task(t) => Some(t.id.0),
            HandlerOutput::TaskDetail(d) => Some(d.task.id.0),
            HandlerOutput::Label(l) => Some(l.id.0),
            HandlerOutput::Deleted { id, .. } => Some(*id),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            HandlerOutput::Project(p) => serde_json::to_value(p).unwrap(),
            HandlerOutput::Projects(v) => serde_json::to_value(v).unwrap(),
            HandlerOutput::Column(c) => serde_json::to_value(c).unwrap(),
            HandlerOutput::Columns(v) => serde_json::to_value(v).unwrap(),
            HandlerOutput::Task(t) => serde_json::to_value(t).unwrap(),
            HandlerOutput::TaskSummaries(v) => serde_json::to_value(v).unwrap(),
            HandlerOutput::TaskDetail(d) => serde_json::to_value(d).unwrap(),
            HandlerOutput::Label(l) => serde_json::to_value(l).unwrap(),
            HandlerOutput::Labels(v) => serde_json::to_value(v).unwrap(),
            HandlerOutput::Deleted { entity, id } => {
                serde_json::json!({ "deleted": entity, "id": id })
            }
            HandlerOutput::Message(msg) => serde_json::json!({ "message": msg }),
        }
    }

    fn to_human(&self) -> String {
        match self {
            HandlerOutput::Project(p) => format!("project {} — {}", p.id, p.name),
            HandlerOutput::Projects(v) => {
                if v.is_empty() {
                    "no projects".to_string()
                } else {
                    v.iter().map(|p| format!("{}\t{}", p.id, p.name)).collect::<Vec<_>>().join("\n")
                }
            }
            HandlerOutput::Column(c) => format!("column {} — {}", c.id, c.name),
            HandlerOutput::Columns(v) => {
                if v.is_empty() {
                    "no columns".to_string()
                } else {
                    v.iter()
                        .map(|c| {
                            let mut flags = Vec::new();
                            if c.holds_ready_tasks {
                                flags.push("ready");
                            }
                            if c.holds_in_progress_tasks {
                                flags.push("in-progress");
                            }
                            if c.holds_completed_tasks {
                                flags.push("completed");
                            }
                            let suffix = if flags.is_empty() { String::new() } else { format!(" [{}]", flags.join(",")) };
                            format!("{}\t{}{}", c.id, c.name, suffix)
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            HandlerOutput::Task(t) => format!("#{} {} ({}, {})", t.ticket_number, t.title, t.priority.as_str(), t.task_type.as_str()),
            HandlerOutput::TaskSummaries(v) => {
                if v.is_empty() {
                    "no tasks".to_string()
                } else {
                    v.iter()
                        .map(|t| {
                            let blocked = if t.is_blocked { " [blocked]" } else { "" };
                            format!("#{}\t{}{}", t.ticket_number, t.title, blocked)
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            HandlerOutput::TaskDetail(d) => {
                let mut out = format!(
                    "#{} {}\n  priority: {}\n  type: {}\n",
                    d.task.ticket_number,
                    d.task.title,
                    d.task.priority.as_str(),
                    d.task.task_type.as_str()
                );
                if let Some(desc) = &d.task.description {
                    out.push_str(&format!("  description: {desc}\n"));
                }
                if !d.labels.is_empty() {
                    out.push_str(&format!("  labels: {}\n", d.labels.iter().map(|l| l.name.as_str()).collect::<Vec<_>>().join(", ")));
                }
                if !d.parents.is_empty() {
                    out.push_str(&format!("  parents: {}\n", refs_to_str(&d.parents)));
                }
                if !d.children.is_empty() {
                    out.push_str(&format!("  children: {}\n", refs_to_str(&d.children)));
                }
                if !d.blockers.is_empty() {
                    out.push_str(&format!("  blocked by: {}\n", refs_to_str(&d.blockers)));
                }
                if !d.blocked.is_empty() {
                    out.push_str(&format!("  blocks: {}\n", refs_to_str(&d.blocked)));
                }
                out
            }
            HandlerOutput::Label(l) => format!("label {} — {} ({})", l.id, l.name, l.color),
            HandlerOutput::Labels(v) => {
                if v.is_empty() {
                    "no labels".to_string()
                } else {
                    v.iter().map(|l| format!("{}\t{}\t{}", l.id, l.name, l.color)).collect::<Vec<_>>().join("\n")
                }
            }
            HandlerOutput::Deleted { entity, id } => format!("deleted {entity} {id}"),
            HandlerOutput::Message(msg) => msg.clone(),
        }
    }
}

fn refs_to_str(refs: &[paso_core::types::TaskReference]) -> String {
    refs.iter().map(|r| format!("#{}", r.ticket_number)).collect::<Vec<_>>().join(", ")
}

/// One subcommand invocation. `main.rs` parses flags into a concrete
/// `Handler` implementor, opens the `Store`, and runs it.
#[async_trait]
pub trait Handler {
    async fn run(&self, store: &Store) -> Result<HandlerOutput, PasoError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Human,
    Json,
    Quiet,
}

/// Renders a handler's output (or error) to stdout/stderr per the chosen
/// mode, returning the process exit code.
pub fn render_result(mode: RenderMode, result: Result<HandlerOutput, PasoError>) -> i32 {
    match result {
        Ok(output) => {
            render_output(mode, &output);
            0
        }
        Err(err) => {
            render_error(mode, &err);
            err.exit_code()
        }
    }
}

fn render_output(mode: RenderMode, output: &HandlerOutput) {
    match mode {
        RenderMode::Json => println!("{}", output.to_json()),
        RenderMode::Quiet => {
            if let Some(id) = output.quiet_id() {
                println!("{id}");
            }
        }
        RenderMode::Human => println!("{}", output.to_human()),
    }
}

fn render_error(mode: RenderMode, err: &PasoError) {
    match mode {
        RenderMode::Json => {
            eprintln!(
                "{}",
                serde_json::json!({
                    "code": err.code(),
                    "message": err.to_string(),
                    "suggestion": suggestion_for(err),
                })
            );
        }
        _ => {
            eprint!("error [{}]: {}", err.code(), err);
            if let Some(hint) = suggestion_for(err) {
                eprint!(" ({hint})");
            }
            eprintln!();
        }
    }
}

fn suggestion_for(err: &PasoError) -> Option<&'static str> {
    match err {
        PasoError::InvariantViolation(_) => Some("retry with --force to override"),
        PasoError::Usage(_) => Some("pass --project or set PASO_PROJECT"),
        _ => None,
    }
}
