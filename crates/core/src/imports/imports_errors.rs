use thiserror::Error;

/// Errors raised by the import pipeline before a job starts executing.
///
/// Row-level findings are never errors at this level; they travel inside
/// `ValidationReport.issues` and `ImportJob.errors`.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Invalid import data: {0}")]
    InvalidData(String),

    #[error("Uploaded file is empty or contains no data rows")]
    EmptyFile,

    #[error("Upload exceeds the row limit ({rows} rows, limit {limit})")]
    TooManyRows { rows: usize, limit: usize },

    #[error("Upload not found or expired: {0}")]
    UploadNotFound(String),

    #[error("Import job not found: {0}")]
    JobNotFound(String),

    #[error("Columns '{first}' and '{second}' are both mapped to '{field}'")]
    DuplicateTarget {
        first: String,
        second: String,
        field: String,
    },

    #[error("Mapping does not include an identifying key field")]
    UnusableMapping,

    #[error("Import was not confirmed by the operator")]
    NotConfirmed,

    #[error("A job for upload {0} is already in flight")]
    AlreadyRunning(String),
}
