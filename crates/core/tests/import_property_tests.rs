//! Property-based integration tests for the import pipeline.
//!
//! These tests verify that universal properties hold across all valid
//! inputs, using the `proptest` crate for random test case generation.

use async_trait::async_trait;
use chrono::Utc;
use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use licentia_core::errors::DatabaseError;
use licentia_core::imports::{
    suggest_mapping, validate_mapping, validate_upload, ErrorHandling, ImportExecutor, ImportJob,
    ImportJobStatus, ImportJobStore, ImportOptions, IssueSeverity, UploadedDataset,
};
use licentia_core::licenses::{
    LicenseRecord, LicenseRecordUpdate, LicenseRepositoryTrait, NewLicenseRecord,
};
use licentia_core::Result;

// =============================================================================
// Minimal in-memory repository
// =============================================================================

#[derive(Default)]
struct VecLicenseRepository {
    records: Mutex<Vec<LicenseRecord>>,
}

#[async_trait]
impl LicenseRepositoryTrait for VecLicenseRepository {
    fn get_license(&self, license_id: &str) -> Result<LicenseRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == license_id)
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound(license_id.to_string()).into())
    }

    fn get_licenses(&self, provider_id: &str) -> Result<Vec<LicenseRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.provider_id == provider_id)
            .cloned()
            .collect())
    }

    fn count_licenses(&self, provider_id: &str) -> Result<usize> {
        Ok(self.get_licenses(provider_id)?.len())
    }

    fn find_by_license_key(
        &self,
        provider_id: &str,
        license_key: &str,
    ) -> Result<Option<LicenseRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.provider_id == provider_id && r.license_key.as_deref() == Some(license_key))
            .cloned())
    }

    fn find_by_external_user_id(
        &self,
        provider_id: &str,
        external_user_id: &str,
    ) -> Result<Option<LicenseRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| {
                r.provider_id == provider_id
                    && r.external_user_id.as_deref() == Some(external_user_id)
            })
            .cloned())
    }

    async fn create_license(&self, new_license: NewLicenseRecord) -> Result<LicenseRecord> {
        new_license.validate()?;
        let now = Utc::now();
        let record = LicenseRecord {
            id: new_license.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            provider_id: new_license.provider_id,
            license_key: new_license.license_key,
            external_user_id: new_license.external_user_id,
            full_name: new_license.full_name,
            department: new_license.department,
            status: new_license.status.unwrap_or_default(),
            cost: new_license.cost,
            currency: new_license.currency,
            seats: new_license.seats,
            start_date: new_license.start_date,
            renewal_date: new_license.renewal_date,
            notes: new_license.notes,
            created_at: now,
            updated_at: now,
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update_license(&self, update: LicenseRecordUpdate) -> Result<LicenseRecord> {
        update.validate()?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == update.id)
            .ok_or_else(|| licentia_core::Error::from(DatabaseError::NotFound(update.id.clone())))?;
        if let Some(full_name) = update.full_name {
            record.full_name = Some(full_name);
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

// =============================================================================
// Generators
// =============================================================================

/// A plausible-or-broken email cell: present, blank, or whitespace.
fn arb_email_cell() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-c]{1,3}".prop_map(|s| format!("{}@acme.io", s)),
        1 => Just(String::new()),
        1 => Just("  ".to_string()),
    ]
}

/// A dataset over (email, full_name) columns. Short local parts make
/// duplicate keys common, which is exactly the interesting case.
fn arb_rows() -> impl Strategy<Value = Vec<Vec<String>>> {
    proptest::collection::vec(
        (arb_email_cell(), "[A-Za-z]{0,8}").prop_map(|(email, name)| vec![email, name]),
        1..16,
    )
}

/// Arbitrary operator-named headers, some of which happen to alias fields.
fn arb_headers() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(
        prop_oneof![
            Just("email".to_string()),
            Just("Full Name".to_string()),
            Just("License Key".to_string()),
            Just("dept".to_string()),
            Just("price".to_string()),
            "[A-Za-z _-]{0,12}",
        ],
        0..8,
    )
}

fn dataset_over(rows: Vec<Vec<String>>) -> UploadedDataset {
    UploadedDataset {
        upload_id: "upload-1".to_string(),
        provider_id: "prov-1".to_string(),
        source_name: "seats.csv".to_string(),
        columns: vec!["email".to_string(), "full_name".to_string()],
        rows,
        uploaded_at: Utc::now(),
    }
}

fn run_job_blocking(
    dataset: &UploadedDataset,
    options: ImportOptions,
) -> (ImportJob, Arc<VecLicenseRepository>) {
    let repository = Arc::new(VecLicenseRepository::default());
    let jobs = Arc::new(ImportJobStore::new());
    let mapping = suggest_mapping(&dataset.columns);
    let job = ImportJob::new(
        dataset.provider_id.clone(),
        dataset.upload_id.clone(),
        mapping,
        options,
    );
    let job_id = job.id.clone();
    jobs.insert(job);

    let executor = ImportExecutor::new(repository.clone(), jobs.clone());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");
    runtime.block_on(executor.run(&job_id, Arc::new(dataset.clone())));

    (jobs.get(&job_id).expect("job"), repository)
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Column inference is a pure function of the header row: repeated calls
    /// agree, and no system field is ever suggested for two columns.
    #[test]
    fn prop_inference_is_deterministic_and_duplicate_free(headers in arb_headers()) {
        let first = suggest_mapping(&headers);
        let second = suggest_mapping(&headers);
        prop_assert_eq!(&first, &second);

        prop_assert_eq!(first.entries.len(), headers.len());
        prop_assert!(validate_mapping(&first).is_ok());
    }

    /// Pre-flight validation partitions rows exactly and never changes its
    /// answer for the same inputs.
    #[test]
    fn prop_preflight_partitions_rows(rows in arb_rows()) {
        let dataset = dataset_over(rows);
        let mapping = suggest_mapping(&dataset.columns);
        let options = ImportOptions::default();

        let report = validate_upload(&dataset, &mapping, &options);

        prop_assert_eq!(report.total_rows, dataset.rows.len());
        prop_assert_eq!(report.valid_rows + report.invalid_rows, report.total_rows);
        prop_assert!(report.can_proceed); // skip policy always proceeds

        let again = validate_upload(&dataset, &mapping, &options);
        prop_assert_eq!(report, again);
    }

    /// Under the skip policy every row lands in exactly one counter and the
    /// job completes, however many rows were bad.
    #[test]
    fn prop_skip_policy_conserves_rows(rows in arb_rows()) {
        let dataset = dataset_over(rows);
        let (job, _) = run_job_blocking(&dataset, ImportOptions::default());

        prop_assert_eq!(job.status, ImportJobStatus::Completed);
        prop_assert_eq!(
            (job.created_count + job.updated_count + job.skipped_count) as usize,
            dataset.rows.len()
        );
        prop_assert_eq!(job.failed_count, 0);
    }

    /// Under the fail policy the executor writes exactly the valid prefix
    /// that pre-flight predicts: rows strictly before the first invalid row.
    #[test]
    fn prop_fail_policy_writes_the_preflight_prefix(rows in arb_rows()) {
        let dataset = dataset_over(rows);
        let mapping = suggest_mapping(&dataset.columns);
        let options = ImportOptions {
            error_handling: ErrorHandling::Fail,
            ..Default::default()
        };

        let report = validate_upload(&dataset, &mapping, &options);
        let first_invalid = report
            .issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Error)
            .map(|issue| issue.row_index)
            .min();

        let (job, repository) = run_job_blocking(&dataset, options);

        match first_invalid {
            None => {
                prop_assert_eq!(job.status, ImportJobStatus::Completed);
                prop_assert_eq!(
                    (job.created_count + job.updated_count) as usize,
                    dataset.rows.len()
                );
            }
            Some(stop_row) => {
                prop_assert_eq!(job.status, ImportJobStatus::Failed);
                prop_assert_eq!(
                    (job.created_count + job.updated_count) as usize,
                    stop_row
                );
                prop_assert_eq!(
                    repository.count_licenses("prov-1").unwrap(),
                    job.created_count as usize
                );
            }
        }
    }
}
