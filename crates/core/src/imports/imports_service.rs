//! Import pipeline service.
//!
//! The transport-agnostic facade behind the wizard: parses uploads, runs
//! pre-flight validation, launches executor jobs, and answers status polls.

use chrono::Utc;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use super::csv_parser;
use super::executor::ImportExecutor;
use super::fields;
use super::imports_errors::ImportError;
use super::imports_model::*;
use super::imports_traits::{ImportServiceTrait, UploadStoreTrait};
use super::job_store::ImportJobStore;
use super::preflight;
use super::template;
use crate::licenses::LicenseRepositoryTrait;
use crate::Result;

/// Service for running bulk imports
pub struct ImportService {
    uploads: Arc<dyn UploadStoreTrait>,
    licenses: Arc<dyn LicenseRepositoryTrait>,
    jobs: Arc<ImportJobStore>,
    config: ImportConfig,
}

impl ImportService {
    /// Creates a new ImportService instance with injected dependencies
    pub fn new(
        uploads: Arc<dyn UploadStoreTrait>,
        licenses: Arc<dyn LicenseRepositoryTrait>,
        config: ImportConfig,
    ) -> Self {
        Self {
            uploads,
            licenses,
            jobs: Arc::new(ImportJobStore::new()),
            config,
        }
    }

    /// The job status store backing this service.
    pub fn job_store(&self) -> Arc<ImportJobStore> {
        self.jobs.clone()
    }

    /// Fetches a retained dataset, enforcing provider scope.
    fn dataset(&self, provider_id: &str, upload_id: &str) -> Result<Arc<UploadedDataset>> {
        let dataset = self.uploads.get(upload_id)?;
        if dataset.provider_id != provider_id {
            return Err(ImportError::UploadNotFound(upload_id.to_string()).into());
        }
        Ok(dataset)
    }
}

#[async_trait::async_trait]
impl ImportServiceTrait for ImportService {
    async fn upload(
        &self,
        provider_id: &str,
        source_name: &str,
        content: &[u8],
    ) -> Result<UploadResponse> {
        let sheet = csv_parser::parse_sheet(content)?;
        if sheet.rows.is_empty() {
            return Err(ImportError::EmptyFile.into());
        }
        let limit = self.config.row_limit();
        if sheet.rows.len() > limit {
            return Err(ImportError::TooManyRows {
                rows: sheet.rows.len(),
                limit,
            }
            .into());
        }

        // Expiry housekeeping rides along on upload traffic.
        self.uploads.remove_expired();

        let dataset = UploadedDataset {
            upload_id: Uuid::new_v4().to_string(),
            provider_id: provider_id.to_string(),
            source_name: source_name.to_string(),
            columns: sheet.columns,
            rows: sheet.rows,
            uploaded_at: Utc::now(),
        };
        let suggested_mapping = fields::suggest_mapping(&dataset.columns);
        let stored = self.uploads.put(dataset)?;

        debug!(
            "Retained upload {} ({}, {} row(s))",
            stored.upload_id,
            source_name,
            stored.row_count()
        );

        Ok(UploadResponse {
            upload_id: stored.upload_id.clone(),
            columns: stored.columns.clone(),
            suggested_mapping,
        })
    }

    async fn validate(
        &self,
        provider_id: &str,
        upload_id: &str,
        mapping: &ColumnMapping,
        options: &ImportOptions,
    ) -> Result<ValidationReport> {
        fields::validate_mapping(mapping)?;
        let dataset = self.dataset(provider_id, upload_id)?;
        Ok(preflight::validate_upload(&dataset, mapping, options))
    }

    async fn execute(
        &self,
        provider_id: &str,
        upload_id: &str,
        mapping: ColumnMapping,
        options: ImportOptions,
        confirmed: bool,
    ) -> Result<ExecuteResponse> {
        if !confirmed {
            return Err(ImportError::NotConfirmed.into());
        }
        fields::validate_mapping(&mapping)?;
        if !fields::is_usable(&mapping, &fields::IDENTIFYING_FIELDS) {
            return Err(ImportError::UnusableMapping.into());
        }

        let dataset = self.dataset(provider_id, upload_id)?;

        // One live job per upload; re-execution is allowed once the previous
        // job reaches a terminal state.
        if self.jobs.has_active_job_for_upload(upload_id) {
            return Err(ImportError::AlreadyRunning(upload_id.to_string()).into());
        }

        let job = ImportJob::new(
            provider_id.to_string(),
            upload_id.to_string(),
            mapping,
            options,
        );
        let job_id = job.id.clone();
        self.jobs.insert(job);

        let executor = ImportExecutor::new(self.licenses.clone(), self.jobs.clone());
        let spawned_id = job_id.clone();
        tokio::spawn(async move {
            executor.run(&spawned_id, dataset).await;
        });

        debug!("Launched import job {} for upload {}", job_id, upload_id);
        Ok(ExecuteResponse { job_id })
    }

    async fn get_job_status(&self, provider_id: &str, job_id: &str) -> Result<ImportJob> {
        let job = self.jobs.get(job_id)?;
        if job.provider_id != provider_id {
            return Err(ImportError::JobNotFound(job_id.to_string()).into());
        }
        Ok(job)
    }

    fn download_template(&self, with_sample_row: bool) -> Result<Vec<u8>> {
        template::render_template(with_sample_row)
    }
}
