use thiserror::Error;

/// Result type alias using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure a stage can record in a manifest maps to one of these kinds.
/// The stable code is what ends up in `error_type` fields, so tests and
/// downstream tooling can match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    InvalidRunId,
    NotFound,
    AlreadyExists,
    Config,

    // Data
    Parse,
    SchemaMismatch,
    RowCountDrift,
    MissingDependency,
    CycleDetected,

    // Integration/IO
    Io,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidRunId => "ERR_INVALID_RUN_ID",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Parse => "ERR_PARSE",
            ExErrorKind::SchemaMismatch => "ERR_SCHEMA_MISMATCH",
            ExErrorKind::RowCountDrift => "ERR_ROW_COUNT_DRIFT",
            ExErrorKind::MissingDependency => "ERR_MISSING_DEPENDENCY",
            ExErrorKind::CycleDetected => "ERR_CYCLE_DETECTED",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries the classification plus the run/item context the failure
/// happened in. Stages convert it into manifest `errors` entries.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    run_id: Option<String>,
    item: Option<String>,
    io_kind: Option<std::io::ErrorKind>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            run_id: None,
            item: None,
            io_kind: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add run ID context
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Add item context (file, table or mart name)
    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    /// Record the underlying OS error kind, used for retry decisions
    pub fn with_io_kind(mut self, io_kind: std::io::ErrorKind) -> Self {
        self.io_kind = Some(io_kind);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the run ID context, if any
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    /// Get the item context, if any
    pub fn item(&self) -> Option<&str> {
        self.item.as_deref()
    }

    /// Get the OS error kind, if any
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        self.io_kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether retrying the same operation could succeed.
    ///
    /// Only IO errors qualify, and not-found, permission and malformed-data
    /// conditions are excluded since they never clear on their own.
    pub fn is_transient(&self) -> bool {
        use std::io::ErrorKind as K;
        if self.kind != ExErrorKind::Io {
            return false;
        }
        !matches!(
            self.io_kind,
            Some(K::NotFound)
                | Some(K::PermissionDenied)
                | Some(K::AlreadyExists)
                | Some(K::InvalidInput)
                | Some(K::InvalidData)
                | Some(K::Unsupported)
        )
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(item) = &self.item {
            write!(f, " (item: {})", item)?;
        }
        if let Some(run_id) = &self.run_id {
            write!(f, " (run_id: {})", run_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain error taxonomy for pipeline operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Run id does not follow `YYYYMMDD_HHMMSS_#<suffix>`
    #[error("Invalid run id '{run_id}': {reason}")]
    InvalidRunId { run_id: String, reason: String },

    /// No run directory matched under the given root
    #[error("No run found under {root}")]
    RunNotFound { root: String },

    /// Run directory already exists (runs are immutable)
    #[error("Run directory already exists: {path}")]
    RunDirectoryExists { path: String },

    /// Two source systems hold a file with the same name
    #[error("{file} from {source_system} collides with the same name from {claimed_by}")]
    DuplicateSourceFile {
        file: String,
        source_system: String,
        claimed_by: String,
    },

    /// A configured source root is missing
    #[error("Source root for {source_system} does not exist: {path}")]
    SourceRootMissing { source_system: String, path: String },

    /// Upstream data directory is missing
    #[error("Upstream data directory not found: {path}")]
    UpstreamMissing { path: String },

    /// Glob pattern failed to compile
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    /// Table is missing columns a consumer requires
    #[error("Table {table} is missing required columns: {missing:?}")]
    SchemaMismatch { table: String, missing: Vec<String> },

    /// A transform changed the number of rows
    #[error("Row count drift in {table}: {rows_in} in, {rows_out} out")]
    RowCountDrift {
        table: String,
        rows_in: usize,
        rows_out: usize,
    },

    /// A mart's required upstream input is unavailable
    #[error("Mart {mart} is missing dependency {dependency}")]
    MissingDependency { mart: String, dependency: String },

    /// The mart dependency graph has a cycle
    #[error("Cycle detected in mart dependencies involving {mart}")]
    CycleDetected { mart: String },

    /// A CSV document could not be parsed
    #[error("CSV parse error in {path}: {reason}")]
    CsvParse { path: String, reason: String },

    /// Unknown mart named in a plan or lookup
    #[error("Unknown mart: {name}")]
    UnknownMart { name: String },

    /// Configuration could not be loaded
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Serialization failure
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Serialization(err.to_string())
    }
}

/// Convert PipelineError to ExError
///
/// This allows existing code using PipelineError to be converted to the
/// canonical ExError format for structured error handling.
impl From<PipelineError> for ExError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidRunId { run_id, reason } => {
                ExError::new(ExErrorKind::InvalidRunId)
                    .with_run_id(run_id)
                    .with_message(reason)
            }

            PipelineError::RunNotFound { root } => ExError::new(ExErrorKind::NotFound)
                .with_message(format!("No run found under {}", root)),

            PipelineError::RunDirectoryExists { path } => {
                ExError::new(ExErrorKind::AlreadyExists)
                    .with_item(path)
                    .with_message("Run directory already exists")
            }

            PipelineError::DuplicateSourceFile {
                file,
                source_system,
                claimed_by,
            } => ExError::new(ExErrorKind::AlreadyExists)
                .with_item(file)
                .with_message(format!(
                    "{} file name already taken by {} in this run",
                    source_system, claimed_by
                )),

            PipelineError::SourceRootMissing {
                source_system,
                path,
            } => ExError::new(ExErrorKind::Config)
                .with_item(source_system)
                .with_message(format!("Source root does not exist: {}", path)),

            PipelineError::UpstreamMissing { path } => ExError::new(ExErrorKind::NotFound)
                .with_item(path)
                .with_message("Upstream data directory not found"),

            PipelineError::InvalidGlob { pattern, reason } => ExError::new(ExErrorKind::Config)
                .with_item(pattern)
                .with_message(format!("Invalid glob: {}", reason)),

            PipelineError::SchemaMismatch { table, missing } => {
                ExError::new(ExErrorKind::SchemaMismatch)
                    .with_item(table)
                    .with_message(format!("Missing required columns: {}", missing.join(", ")))
            }

            PipelineError::RowCountDrift {
                table,
                rows_in,
                rows_out,
            } => ExError::new(ExErrorKind::RowCountDrift)
                .with_item(table)
                .with_message(format!("{} rows in, {} rows out", rows_in, rows_out)),

            PipelineError::MissingDependency { mart, dependency } => {
                ExError::new(ExErrorKind::MissingDependency)
                    .with_item(mart)
                    .with_message(format!("Missing dependency: {}", dependency))
            }

            PipelineError::CycleDetected { mart } => ExError::new(ExErrorKind::CycleDetected)
                .with_item(mart)
                .with_message("Cycle detected in mart dependencies"),

            PipelineError::CsvParse { path, reason } => ExError::new(ExErrorKind::Parse)
                .with_item(path)
                .with_message(reason),

            PipelineError::UnknownMart { name } => ExError::new(ExErrorKind::InvalidInput)
                .with_item(name)
                .with_message("Unknown mart"),

            PipelineError::Config { reason } => {
                ExError::new(ExErrorKind::Config).with_message(reason)
            }

            PipelineError::Serialization(msg) => {
                ExError::new(ExErrorKind::Serialization).with_message(msg)
            }
        }
    }
}
