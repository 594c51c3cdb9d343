use async_trait::async_trait;
use std::sync::Arc;

use super::imports_model::*;
use crate::Result;

/// Trait defining the contract for retained-upload storage.
///
/// Datasets are immutable once stored; implementations may discard entries
/// after a bounded retention window, after which `get` reports them as
/// expired.
pub trait UploadStoreTrait: Send + Sync {
    /// Retains a dataset and returns the shared handle for it.
    fn put(&self, dataset: UploadedDataset) -> Result<Arc<UploadedDataset>>;

    /// Fetches a retained dataset by id.
    fn get(&self, upload_id: &str) -> Result<Arc<UploadedDataset>>;

    /// Drops datasets past their retention window; returns how many went.
    fn remove_expired(&self) -> usize;
}

/// Trait defining the contract for the import pipeline service.
///
/// This is the transport-agnostic surface the wizard (or a REST layer)
/// drives; every call is scoped to one provider.
#[async_trait]
pub trait ImportServiceTrait: Send + Sync {
    /// Parses an uploaded spreadsheet, retains it, and proposes a column
    /// mapping. Nothing is retained when parsing fails.
    async fn upload(
        &self,
        provider_id: &str,
        source_name: &str,
        content: &[u8],
    ) -> Result<UploadResponse>;

    /// Runs a pre-flight validation pass over a retained upload. Pure with
    /// respect to persisted data.
    async fn validate(
        &self,
        provider_id: &str,
        upload_id: &str,
        mapping: &ColumnMapping,
        options: &ImportOptions,
    ) -> Result<ValidationReport>;

    /// Starts the import job for a retained upload and returns its id. The
    /// job runs detached; progress is observed through `get_job_status`.
    async fn execute(
        &self,
        provider_id: &str,
        upload_id: &str,
        mapping: ColumnMapping,
        options: ImportOptions,
        confirmed: bool,
    ) -> Result<ExecuteResponse>;

    /// Snapshot of a job's current state.
    async fn get_job_status(&self, provider_id: &str, job_id: &str) -> Result<ImportJob>;

    /// Renders a CSV skeleton of the known system fields.
    fn download_template(&self, with_sample_row: bool) -> Result<Vec<u8>>;
}
