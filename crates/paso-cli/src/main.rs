//! paso -- scripted and agent-driven mutation of a Paso board.

mod cli;
mod commands;
mod handler;
mod publish;

use clap::{CommandFactory, Parser};

use cli::{Cli, ColumnCommands, Commands, LabelCommands, ProjectCommands, TaskCommands};
use handler::{render_result, Handler, RenderMode};
use paso_core::logging;
use paso_core::store::Store;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let mode = if cli.json {
        RenderMode::Json
    } else if cli.quiet {
        RenderMode::Quiet
    } else {
        RenderMode::Human
    };

    if let Commands::Completion { shell } = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(*shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    if let Commands::Tui = &cli.command {
        let project = commands::resolve_project(cli.project).ok();
        if let Err(err) = paso_tui::run(project).await {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
        return;
    }

    let _ = logging::init("paso");
    let store = match Store::open(logging::db_path()).await {
        Ok(store) => store,
        Err(err) => {
            eprintln!("error: failed to open database: {err}");
            std::process::exit(err.exit_code());
        }
    };

    let result = dispatch(&cli, &store).await;
    std::process::exit(render_result(mode, result));
}

async fn dispatch(cli: &Cli, store: &Store) -> Result<handler::HandlerOutput, paso_core::PasoError> {
    match &cli.command {
        Commands::Project { command } => match command {
            ProjectCommands::Create { name, description } => {
                commands::project::Create { name: name.clone(), description: description.clone() }.run(store).await
            }
            ProjectCommands::List => commands::project::List.run(store).await,
            ProjectCommands::Update { id, name, description } => {
                commands::project::Update { id: *id, name: name.clone(), description: description.clone() }.run(store).await
            }
            ProjectCommands::Delete { id } => commands::project::Delete { id: *id }.run(store).await,
        },
        Commands::Column { command } => {
            let project_id = commands::resolve_project(cli.project)?;
            match command {
                ColumnCommands::Create { name, after } => {
                    commands::column::Create { project_id, name: name.clone(), after: *after }.run(store).await
                }
                ColumnCommands::List => commands::column::List { project_id }.run(store).await,
                ColumnCommands::Update { id, name, holds_ready_tasks, holds_in_progress_tasks, holds_completed_tasks } => {
                    commands::column::Update {
                        id: *id,
                        name: name.clone(),
                        holds_ready_tasks: *holds_ready_tasks,
                        holds_in_progress_tasks: *holds_in_progress_tasks,
                        holds_completed_tasks: *holds_completed_tasks,
                        force: cli.force,
                    }
                    .run(store)
                    .await
                }
                ColumnCommands::Delete { id } => commands::column::Delete { id: *id, force: cli.force }.run(store).await,
            }
        }
        Commands::Label { command } => match command {
            LabelCommands::Create { name, color } => {
                let project_id = commands::resolve_project(cli.project)?;
                commands::label::Create { project_id, name: name.clone(), color: color.clone() }.run(store).await
            }
            LabelCommands::List => {
                let project_id = commands::resolve_project(cli.project)?;
                commands::label::List { project_id }.run(store).await
            }
            LabelCommands::Delete { id } => commands::label::Delete { id: *id }.run(store).await,
            LabelCommands::Attach { task_id, label_id } => {
                commands::label::Attach { task_id: *task_id, label_id: *label_id }.run(store).await
            }
            LabelCommands::Detach { task_id, label_id } => {
                commands::label::Detach { task_id: *task_id, label_id: *label_id }.run(store).await
            }
        },
        Commands::Task { command } => match command {
            TaskCommands::Create { column_id, title, description } => {
                let project_id = commands::resolve_project(cli.project)?;
                commands::task::Create { project_id, column_id: *column_id, title: title.clone(), description: description.clone() }
                    .run(store)
                    .await
            }
            TaskCommands::List { column_id } => commands::task::List { column_id: *column_id }.run(store).await,
            TaskCommands::Show { id } => commands::task::Show { id: *id }.run(store).await,
            TaskCommands::Update { id, title, description, priority, task_type } => {
                commands::task::Update {
                    id: *id,
                    title: title.clone(),
                    description: description.clone(),
                    priority: priority.clone(),
                    task_type: task_type.clone(),
                }
                .run(store)
                .await
            }
            TaskCommands::Delete { id } => commands::task::Delete { id: *id }.run(store).await,
            TaskCommands::Move { id, to, next, prev } => {
                commands::task::Move { id: *id, to: *to, next: *next, prev: *prev }.run(store).await
            }
            TaskCommands::SwapUp { id } => commands::task::SwapUp { id: *id }.run(store).await,
            TaskCommands::SwapDown { id } => commands::task::SwapDown { id: *id }.run(store).await,
            TaskCommands::Relate { from, relation, to } => {
                commands::task::Relate { from: *from, relation: relation.clone(), to: *to }.run(store).await
            }
            TaskCommands::Unrelate { from, relation, to } => {
                commands::task::Unrelate { from: *from, relation: relation.clone(), to: *to }.run(store).await
            }
        },
        Commands::Tui | Commands::Completion { .. } => unreachable!("handled before dispatch"),
    }
}
