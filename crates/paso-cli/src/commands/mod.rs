pub mod column;
pub mod label;
pub mod project;
pub mod task;

use paso_core::error::PasoError;
use paso_core::types::ProjectId;

/// Resolves the active project: explicit `--project` flag, then
/// `PASO_PROJECT`, then `Usage` if neither is set.
pub fn resolve_project(flag: Option<i64>) -> Result<ProjectId, PasoError> {
    if let Some(id) = flag {
        return Ok(ProjectId(id));
    }
    std::env::var("PASO_PROJECT")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .map(ProjectId)
        .ok_or_else(|| PasoError::usage("no project specified: pass --project or set PASO_PROJECT"))
}
