//! In-memory job status store.
//!
//! Supports many polling readers and one writing worker per job. DashMap's
//! entry-level locking means a reader always clones a consistent snapshot:
//! counter updates and status changes applied through `update` are visible
//! as a unit, never field by field.

use dashmap::DashMap;

use super::imports_errors::ImportError;
use super::imports_model::ImportJob;
use crate::Result;

/// Holds every in-flight and completed import job, keyed by job id.
///
/// Jobs are never removed while `pending` or `processing`; terminal jobs are
/// retained for the life of the store.
#[derive(Default)]
pub struct ImportJobStore {
    jobs: DashMap<String, ImportJob>,
}

impl ImportJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly created job.
    pub fn insert(&self, job: ImportJob) {
        self.jobs.insert(job.id.clone(), job);
    }

    /// Snapshot of the job's current state.
    pub fn get(&self, job_id: &str) -> Result<ImportJob> {
        self.jobs
            .get(job_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| ImportError::JobNotFound(job_id.to_string()).into())
    }

    /// Applies a mutation to the job as a single atomic unit.
    ///
    /// The closure runs under the entry's exclusive lock; concurrent `get`
    /// calls observe either the state before or after it, never in between.
    pub fn update<F>(&self, job_id: &str, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut ImportJob),
    {
        match self.jobs.get_mut(job_id) {
            Some(mut entry) => {
                mutate(&mut entry);
                Ok(())
            }
            None => Err(ImportError::JobNotFound(job_id.to_string()).into()),
        }
    }

    /// True when a non-terminal job already references the given upload.
    pub fn has_active_job_for_upload(&self, upload_id: &str) -> bool {
        self.jobs
            .iter()
            .any(|entry| entry.upload_id == upload_id && !entry.status.is_terminal())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::imports_model::{ColumnMapping, ImportJobStatus, ImportOptions};

    fn sample_job() -> ImportJob {
        ImportJob::new(
            "prov-1".to_string(),
            "upload-1".to_string(),
            ColumnMapping::default(),
            ImportOptions::default(),
        )
    }

    #[test]
    fn test_get_returns_inserted_job() {
        let store = ImportJobStore::new();
        let job = sample_job();
        let job_id = job.id.clone();
        store.insert(job);

        let fetched = store.get(&job_id).unwrap();
        assert_eq!(fetched.id, job_id);
        assert_eq!(fetched.status, ImportJobStatus::Pending);
    }

    #[test]
    fn test_get_unknown_job_is_not_found() {
        let store = ImportJobStore::new();
        assert!(store.get("missing").is_err());
    }

    #[test]
    fn test_update_applies_mutation_as_a_unit() {
        let store = ImportJobStore::new();
        let job = sample_job();
        let job_id = job.id.clone();
        store.insert(job);

        store
            .update(&job_id, |job| {
                job.begin();
                job.created_count += 1;
            })
            .unwrap();

        let fetched = store.get(&job_id).unwrap();
        assert_eq!(fetched.status, ImportJobStatus::Processing);
        assert_eq!(fetched.created_count, 1);
    }

    #[test]
    fn test_active_job_detection_ignores_terminal_jobs() {
        let store = ImportJobStore::new();
        let mut job = sample_job();
        let job_id = job.id.clone();
        job.begin();
        store.insert(job);
        assert!(store.has_active_job_for_upload("upload-1"));

        store.update(&job_id, |job| job.complete()).unwrap();
        assert!(!store.has_active_job_for_upload("upload-1"));
    }
}
