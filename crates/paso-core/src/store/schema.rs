/// Schema statements applied in order on every open. Idempotent: every
/// statement is `IF NOT EXISTS` or `INSERT OR IGNORE`, so re-running this
/// against an already-initialized database is a no-op.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    "PRAGMA journal_mode=WAL",
    "PRAGMA foreign_keys=ON",
    "PRAGMA busy_timeout=5000",
    "CREATE TABLE IF NOT EXISTS projects (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL UNIQUE,
        description TEXT,
        created_at  TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS project_counters (
        project_id      INTEGER PRIMARY KEY REFERENCES projects(id) ON DELETE CASCADE,
        next_ticket     INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS columns (
        id                      INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id              INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        name                    TEXT NOT NULL,
        prev_id                 INTEGER REFERENCES columns(id) ON DELETE SET NULL,
        next_id                 INTEGER REFERENCES columns(id) ON DELETE SET NULL,
        holds_completed_tasks   INTEGER NOT NULL DEFAULT 0,
        holds_in_progress_tasks INTEGER NOT NULL DEFAULT 0,
        holds_ready_tasks       INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE INDEX IF NOT EXISTS idx_columns_project ON columns(project_id)",
    "CREATE TABLE IF NOT EXISTS tasks (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id      INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        column_id       INTEGER NOT NULL REFERENCES columns(id) ON DELETE CASCADE,
        ticket_number   INTEGER NOT NULL,
        title           TEXT NOT NULL,
        description     TEXT,
        position        INTEGER NOT NULL,
        priority        TEXT NOT NULL DEFAULT 'medium',
        task_type       TEXT NOT NULL DEFAULT 'feature',
        created_at      TEXT NOT NULL,
        updated_at      TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_tasks_column ON tasks(column_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_ticket ON tasks(project_id, ticket_number)",
    "CREATE TABLE IF NOT EXISTS labels (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id  INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        name        TEXT NOT NULL,
        color       TEXT NOT NULL,
        UNIQUE(project_id, name)
    )",
    "CREATE TABLE IF NOT EXISTS task_labels (
        task_id     INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        label_id    INTEGER NOT NULL REFERENCES labels(id) ON DELETE CASCADE,
        PRIMARY KEY (task_id, label_id)
    )",
    "CREATE TABLE IF NOT EXISTS task_relations (
        from_task       INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        to_task         INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
        relation_type   TEXT NOT NULL,
        PRIMARY KEY (from_task, to_task, relation_type)
    )",
    "CREATE INDEX IF NOT EXISTS idx_relations_from ON task_relations(from_task)",
    "CREATE INDEX IF NOT EXISTS idx_relations_to ON task_relations(to_task)",
];

pub fn init_schema(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    for stmt in SCHEMA_STATEMENTS {
        conn.execute_batch(stmt)?;
    }
    Ok(())
}
