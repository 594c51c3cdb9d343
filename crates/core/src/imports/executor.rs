//! Import job executor.
//!
//! Performs the actual writes for one job, row by row in file order, and is
//! the single writer of that job's record in the status store. Runs as a
//! detached task; the initiating session observes it only by polling.

use log::{debug, error};
use std::sync::Arc;

use super::imports_model::{ErrorHandling, ImportJob, RowIssue, UploadedDataset};
use super::job_store::ImportJobStore;
use super::row_builder::{CandidateRecord, IdentifyingKey, RowCompiler};
use crate::licenses::{LicenseRecord, LicenseRecordUpdate, LicenseRepositoryTrait, NewLicenseRecord};
use crate::Result;

/// Outcome of applying one valid row to the license store.
enum RowOutcome {
    Created,
    Updated,
}

/// Executes import jobs against the license repository.
pub struct ImportExecutor {
    licenses: Arc<dyn LicenseRepositoryTrait>,
    jobs: Arc<ImportJobStore>,
}

impl ImportExecutor {
    pub fn new(licenses: Arc<dyn LicenseRepositoryTrait>, jobs: Arc<ImportJobStore>) -> Self {
        Self { licenses, jobs }
    }

    /// Runs the job with the given id to a terminal state.
    ///
    /// Every counter or status change goes through the store as one atomic
    /// update, so pollers never observe counters without a matching status.
    pub async fn run(&self, job_id: &str, dataset: Arc<UploadedDataset>) {
        let job = match self.jobs.get(job_id) {
            Ok(job) => job,
            Err(e) => {
                error!("Import job {} disappeared before execution: {}", job_id, e);
                return;
            }
        };

        self.update_job(job_id, ImportJob::begin);
        debug!(
            "Import job {} started: {} row(s), policy {:?}",
            job_id,
            dataset.row_count(),
            job.options.error_handling
        );

        let mut compiler = RowCompiler::new(&job.mapping, &job.options);

        for (row_index, row) in dataset.rows.iter().enumerate() {
            let (record, issues) = compiler.compile_row(row_index, row);

            let Some(record) = record else {
                match job.options.error_handling {
                    ErrorHandling::Skip => {
                        self.update_job(job_id, |job| {
                            job.errors.extend(issues.iter().cloned());
                            job.skipped_count += 1;
                        });
                        continue;
                    }
                    ErrorHandling::Fail => {
                        self.update_job(job_id, |job| {
                            job.errors.extend(issues.iter().cloned());
                            job.failed_count += 1;
                            job.fail();
                        });
                        debug!(
                            "Import job {} failed at row {} under fail policy",
                            job_id, row_index
                        );
                        return;
                    }
                }
            };

            match self.apply_row(&job.provider_id, record).await {
                Ok(RowOutcome::Created) => {
                    self.update_job(job_id, |job| job.created_count += 1);
                }
                Ok(RowOutcome::Updated) => {
                    self.update_job(job_id, |job| job.updated_count += 1);
                }
                Err(e) => {
                    // Storage-level failure: terminate, leaving counters at
                    // the rows processed before the interruption.
                    error!("Import job {} hit a system error: {}", job_id, e);
                    self.update_job(job_id, |job| {
                        job.errors.push(RowIssue::error(
                            row_index,
                            None,
                            format!("Import interrupted by a system error: {}", e),
                        ));
                        job.fail();
                    });
                    return;
                }
            }
        }

        self.update_job(job_id, ImportJob::complete);
        debug!("Import job {} completed", job_id);
    }

    /// Applies one atomic job mutation; the store never drops a live job, so
    /// a miss here is only ever a programming error worth logging.
    fn update_job<F>(&self, job_id: &str, mutate: F)
    where
        F: FnOnce(&mut ImportJob),
    {
        if let Err(e) = self.jobs.update(job_id, mutate) {
            error!("Failed to update import job {}: {}", job_id, e);
        }
    }

    /// Locates an existing record for the candidate and updates it, or
    /// creates a new one. Lookup prefers the license key, then falls back to
    /// the external user id.
    async fn apply_row(&self, provider_id: &str, record: CandidateRecord) -> Result<RowOutcome> {
        let existing = self.locate_existing(provider_id, &record)?;

        match existing {
            Some(found) => {
                let update = LicenseRecordUpdate {
                    id: found.id,
                    provider_id: provider_id.to_string(),
                    full_name: record.full_name,
                    department: record.department,
                    status: Some(record.status),
                    cost: record.cost,
                    currency: Some(record.currency),
                    seats: record.seats,
                    start_date: record.start_date,
                    renewal_date: record.renewal_date,
                    notes: record.notes,
                };
                self.licenses.update_license(update).await?;
                Ok(RowOutcome::Updated)
            }
            None => {
                let new_record = NewLicenseRecord {
                    id: None,
                    provider_id: provider_id.to_string(),
                    license_key: record.license_key,
                    external_user_id: record.external_user_id,
                    full_name: record.full_name,
                    department: record.department,
                    status: Some(record.status),
                    cost: record.cost,
                    currency: record.currency,
                    seats: record.seats,
                    start_date: record.start_date,
                    renewal_date: record.renewal_date,
                    notes: record.notes,
                };
                self.licenses.create_license(new_record).await?;
                Ok(RowOutcome::Created)
            }
        }
    }

    fn locate_existing(
        &self,
        provider_id: &str,
        record: &CandidateRecord,
    ) -> Result<Option<LicenseRecord>> {
        match record.identifying_key() {
            Some(IdentifyingKey::LicenseKey(key)) => {
                if let Some(found) = self.licenses.find_by_license_key(provider_id, &key)? {
                    return Ok(Some(found));
                }
                match &record.external_user_id {
                    Some(id) => self.licenses.find_by_external_user_id(provider_id, id),
                    None => Ok(None),
                }
            }
            Some(IdentifyingKey::ExternalUserId(id)) => {
                self.licenses.find_by_external_user_id(provider_id, &id)
            }
            None => Ok(None),
        }
    }
}
