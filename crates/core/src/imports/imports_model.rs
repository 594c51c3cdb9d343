//! Import pipeline domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use super::fields::SystemField;
use crate::constants::DEFAULT_CURRENCY;
use crate::licenses::LicenseStatus;

/// An immutable, server-retained parse of an uploaded spreadsheet.
///
/// Columns appear exactly as they did in the file, in file order; rows are
/// positionally aligned with `columns`. Referenced by `upload_id` in all
/// subsequent calls and safe for concurrent reads behind `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedDataset {
    pub upload_id: String,
    pub provider_id: String,
    pub source_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadedDataset {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// One entry of a column mapping: a file column and the system field it
/// feeds, or `None` to ignore the column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMappingEntry {
    pub file_column: String,
    pub system_field: Option<SystemField>,
}

/// Ordered mapping from file columns to system fields, one entry per file
/// column. Mutated by the operator in the wizard; frozen once execution is
/// requested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    pub entries: Vec<ColumnMappingEntry>,
}

impl ColumnMapping {
    /// Position of the file column feeding `field`, if any. Entry order is
    /// file-column order, so the index doubles as the cell index.
    pub fn column_index_of(&self, field: SystemField) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.system_field == Some(field))
    }

    /// Iterates the mapped (non-ignored) fields in column order.
    pub fn mapped_fields(&self) -> impl Iterator<Item = SystemField> + '_ {
        self.entries.iter().filter_map(|entry| entry.system_field)
    }
}

/// Error-handling policy for an import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorHandling {
    /// Continue past invalid rows and report them.
    #[default]
    Skip,
    /// Abort the entire import on the first invalid row.
    Fail,
}

/// Operator-chosen options for one import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    #[serde(default)]
    pub error_handling: ErrorHandling,
    /// Status assigned to rows lacking a mapped status value.
    #[serde(default)]
    pub default_status: LicenseStatus,
    /// Currency assigned to rows lacking a mapped currency value.
    #[serde(default = "default_currency")]
    pub default_currency: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            error_handling: ErrorHandling::default(),
            default_status: LicenseStatus::default(),
            default_currency: default_currency(),
        }
    }
}

/// Severity of a row-level finding. Only errors make a row invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueSeverity {
    Warning,
    Error,
}

/// A single row-level finding from pre-flight validation or execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowIssue {
    /// Zero-based position of the row in the uploaded dataset.
    pub row_index: usize,
    pub severity: IssueSeverity,
    pub field: Option<SystemField>,
    pub message: String,
}

impl RowIssue {
    pub fn error(row_index: usize, field: Option<SystemField>, message: impl Into<String>) -> Self {
        Self {
            row_index,
            severity: IssueSeverity::Error,
            field,
            message: message.into(),
        }
    }

    pub fn warning(
        row_index: usize,
        field: Option<SystemField>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            row_index,
            severity: IssueSeverity::Warning,
            field,
            message: message.into(),
        }
    }
}

/// Result of a pre-flight validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    /// Ordered by row, then by check order within the row.
    pub issues: Vec<RowIssue>,
    /// True iff the policy is `Skip` or no row is invalid.
    pub can_proceed: bool,
}

/// Status of an import job: `pending → processing → {completed, failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportJobStatus {
    /// Created, no row processed yet.
    #[default]
    Pending,
    /// Claimed by the worker; the only state in which counters change.
    Processing,
    /// All rows attempted (skip policy) or no hard error occurred.
    Completed,
    /// Aborted by the fail policy or by a system error.
    Failed,
}

impl ImportJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportJobStatus::Completed | ImportJobStatus::Failed)
    }
}

/// The asynchronous, trackable unit of work that performs the actual writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: String,
    pub provider_id: String,
    pub upload_id: String,
    pub mapping: ColumnMapping,
    pub options: ImportOptions,
    pub status: ImportJobStatus,
    pub created_count: u32,
    pub updated_count: u32,
    pub skipped_count: u32,
    pub failed_count: u32,
    pub errors: Vec<RowIssue>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ImportJob {
    /// Creates a new pending job for the given upload.
    pub fn new(
        provider_id: String,
        upload_id: String,
        mapping: ColumnMapping,
        options: ImportOptions,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            provider_id,
            upload_id,
            mapping,
            options,
            status: ImportJobStatus::Pending,
            created_count: 0,
            updated_count: 0,
            skipped_count: 0,
            failed_count: 0,
            errors: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Marks the job as claimed by the worker.
    pub fn begin(&mut self) {
        self.status = ImportJobStatus::Processing;
    }

    /// Marks the job as completed successfully.
    pub fn complete(&mut self) {
        self.status = ImportJobStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Marks the job as failed.
    pub fn fail(&mut self) {
        self.status = ImportJobStatus::Failed;
        self.finished_at = Some(Utc::now());
    }

    /// Rows accounted for so far, across all outcomes.
    pub fn rows_attempted(&self) -> u32 {
        self.created_count + self.updated_count + self.skipped_count + self.failed_count
    }
}

/// Response of a successful upload call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub upload_id: String,
    /// Header row exactly as it appeared in the file, in order.
    pub columns: Vec<String>,
    pub suggested_mapping: ColumnMapping,
}

/// Response of a successful execute call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub job_id: String,
}

/// Pipeline-level tunables, distinct from the operator-facing
/// `ImportOptions`. All knobs default to sensible deployment values.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportConfig {
    /// Interval between job status polls in milliseconds (default: 1000)
    pub poll_interval_ms: Option<u64>,
    /// Wall-clock bound on the poll loop in milliseconds (default: 300000)
    pub poll_timeout_ms: Option<u64>,
    /// Retention window for uploaded datasets in minutes (default: 30)
    pub upload_ttl_minutes: Option<i64>,
    /// Maximum accepted data rows per upload (default: 50000)
    pub max_rows: Option<usize>,
}

impl ImportConfig {
    /// Returns the effective poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(1_000))
    }

    /// Returns the effective poll wall-clock bound
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms.unwrap_or(300_000))
    }

    /// Returns the effective upload retention window
    pub fn upload_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.upload_ttl_minutes.unwrap_or(30))
    }

    /// Returns the effective row cap
    pub fn row_limit(&self) -> usize {
        self.max_rows.unwrap_or(50_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_transitions() {
        let mut job = ImportJob::new(
            "prov-1".to_string(),
            "upload-1".to_string(),
            ColumnMapping::default(),
            ImportOptions::default(),
        );
        assert_eq!(job.status, ImportJobStatus::Pending);
        assert!(!job.status.is_terminal());
        assert!(job.finished_at.is_none());

        job.begin();
        assert_eq!(job.status, ImportJobStatus::Processing);

        job.complete();
        assert_eq!(job.status, ImportJobStatus::Completed);
        assert!(job.status.is_terminal());
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_failed_job_is_terminal() {
        let mut job = ImportJob::new(
            "prov-1".to_string(),
            "upload-1".to_string(),
            ColumnMapping::default(),
            ImportOptions::default(),
        );
        job.begin();
        job.fail();
        assert!(job.status.is_terminal());
        assert!(job.finished_at.is_some());
    }

    #[test]
    fn test_job_ids_are_unique() {
        let make = || {
            ImportJob::new(
                "prov-1".to_string(),
                "upload-1".to_string(),
                ColumnMapping::default(),
                ImportOptions::default(),
            )
        };
        assert_ne!(make().id, make().id);
    }

    #[test]
    fn test_import_config_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(1_000));
        assert_eq!(config.poll_timeout(), Duration::from_millis(300_000));
        assert_eq!(config.upload_ttl(), chrono::Duration::minutes(30));
        assert_eq!(config.row_limit(), 50_000);
    }

    #[test]
    fn test_import_options_defaults() {
        let options = ImportOptions::default();
        assert_eq!(options.error_handling, ErrorHandling::Skip);
        assert_eq!(options.default_status, LicenseStatus::Active);
        assert_eq!(options.default_currency, "USD");
    }
}
