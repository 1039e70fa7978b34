use thiserror::Error;

/// Kinds of invariant that the store refuses to violate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    CompletedColumnExists,
    InProgressColumnExists,
    ColumnHasTasks,
    RelationCycle,
    SelfRelation,
}

impl InvariantViolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvariantViolation::CompletedColumnExists => "COMPLETED_COLUMN_EXISTS",
            InvariantViolation::InProgressColumnExists => "IN_PROGRESS_COLUMN_EXISTS",
            InvariantViolation::ColumnHasTasks => "COLUMN_HAS_TASKS",
            InvariantViolation::RelationCycle => "RELATION_CYCLE",
            InvariantViolation::SelfRelation => "SELF_RELATION",
        }
    }
}

/// The complete error taxonomy for Paso (validation, not-found, invariant
/// violations, transient failures, disconnection, and fatal errors).
#[derive(Debug, Error)]
pub enum PasoError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {reference}")]
    NotFound { entity: &'static str, reference: String },

    #[error("invariant violated: {0:?}")]
    InvariantViolation(InvariantViolation),

    #[error("transient failure, retry: {0}")]
    Transient(String),

    #[error("disconnected: {0}")]
    Disconnection(String),

    #[error("fatal: {0}")]
    Fatal(String),

    #[error("usage error: {0}")]
    Usage(String),
}

impl PasoError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PasoError::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, reference: impl Into<String>) -> Self {
        PasoError::NotFound { entity, reference: reference.into() }
    }

    pub fn invariant(kind: InvariantViolation) -> Self {
        PasoError::InvariantViolation(kind)
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        PasoError::Transient(msg.into())
    }

    pub fn disconnection(msg: impl Into<String>) -> Self {
        PasoError::Disconnection(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        PasoError::Fatal(msg.into())
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        PasoError::Usage(msg.into())
    }

    /// Exit code used by `paso-cli`'s entry point, per the CLI contract.
    pub fn exit_code(&self) -> i32 {
        match self {
            PasoError::Usage(_) => 64,
            PasoError::NotFound { .. } => 66,
            PasoError::Validation(_) => 65,
            PasoError::InvariantViolation(_) => 65,
            _ => 1,
        }
    }

    /// Machine-readable code used in `--json` error output and over the wire.
    pub fn code(&self) -> String {
        match self {
            PasoError::Validation(_) => "VALIDATION".to_string(),
            PasoError::NotFound { .. } => "NOT_FOUND".to_string(),
            PasoError::InvariantViolation(kind) => kind.as_str().to_string(),
            PasoError::Transient(_) => "TRANSIENT".to_string(),
            PasoError::Disconnection(_) => "DISCONNECTION".to_string(),
            PasoError::Fatal(_) => "FATAL".to_string(),
            PasoError::Usage(_) => "USAGE".to_string(),
        }
    }
}

impl From<rusqlite::Error> for PasoError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref e, _) = err {
            if matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) {
                return PasoError::Transient(err.to_string());
            }
        }
        if matches!(err, rusqlite::Error::QueryReturnedNoRows) {
            return PasoError::NotFound { entity: "row", reference: "<query>".to_string() };
        }
        PasoError::Fatal(err.to_string())
    }
}

impl From<tokio_rusqlite::Error> for PasoError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(e) => e.into(),
            other => PasoError::Fatal(other.to_string()),
        }
    }
}

/// Classifies a raw I/O error the way the event client needs to: a broken
/// pipe or reset connection is an expected disconnection, not a hard error.
pub fn classify_io_error(err: &std::io::Error) -> PasoError {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::NotConnected => {
            PasoError::Disconnection(err.to_string())
        }
        _ => PasoError::Transient(err.to_string()),
    }
}
