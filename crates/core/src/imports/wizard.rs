//! Import wizard controller.
//!
//! The client-facing step state machine that sequences upload, mapping,
//! options, pre-flight validation, and execution. Runs cooperatively on the
//! initiating session: one service call at a time, suspending until each
//! response arrives. All accumulated artifacts live in an explicit
//! `WizardState`, not in ad hoc flags.

use log::debug;
use std::sync::Arc;

use super::fields::{self, IDENTIFYING_FIELDS};
use super::imports_errors::ImportError;
use super::imports_model::*;
use super::imports_traits::ImportServiceTrait;
use crate::Result;

/// Steps of the import wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Upload,
    Mapping,
    Options,
    Validate,
    Execute,
    Result,
}

/// Artifacts accumulated while walking the wizard.
#[derive(Debug, Clone, Default)]
pub struct WizardState {
    pub upload: Option<UploadResponse>,
    pub mapping: Option<ColumnMapping>,
    pub options: ImportOptions,
    pub validation_report: Option<ValidationReport>,
    pub job_id: Option<String>,
    pub job: Option<ImportJob>,
}

/// Terminal outcome surfaced to the operator after execution.
#[derive(Debug, Clone)]
pub enum WizardOutcome {
    Completed(ImportJob),
    Failed(ImportJob),
    /// The poll wall-clock bound elapsed before the job settled. The job is
    /// still running server-side; this is not a failure.
    StillRunning { job_id: String },
}

/// Drives one import session against the service, enforcing the step
/// guards. Transitions are strictly forward except `back`; returning to the
/// upload step discards everything collected so far.
pub struct ImportWizard {
    service: Arc<dyn ImportServiceTrait>,
    provider_id: String,
    config: ImportConfig,
    step: WizardStep,
    state: WizardState,
    executed: bool,
}

impl ImportWizard {
    pub fn new(
        service: Arc<dyn ImportServiceTrait>,
        provider_id: impl Into<String>,
        config: ImportConfig,
    ) -> Self {
        Self {
            service,
            provider_id: provider_id.into(),
            config,
            step: WizardStep::Upload,
            state: WizardState::default(),
            executed: false,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// Uploads a file and advances to the mapping step.
    ///
    /// Entering the upload step discards all previously accumulated state,
    /// so a failed upload leaves the wizard empty at `Upload` rather than
    /// holding a stale dataset.
    pub async fn upload_file(&mut self, source_name: &str, content: &[u8]) -> Result<()> {
        self.discard();
        let response = self
            .service
            .upload(&self.provider_id, source_name, content)
            .await?;
        self.state.mapping = Some(response.suggested_mapping.clone());
        self.state.upload = Some(response);
        self.step = WizardStep::Mapping;
        Ok(())
    }

    /// Replaces the working mapping with the operator's edits.
    pub fn set_mapping(&mut self, mapping: ColumnMapping) -> Result<()> {
        if self.step != WizardStep::Mapping {
            return Err(ImportError::InvalidData(
                "Mapping can only be edited on the mapping step".to_string(),
            )
            .into());
        }
        self.state.mapping = Some(mapping);
        Ok(())
    }

    /// Whether the "next" action is available on the mapping step.
    pub fn mapping_is_usable(&self) -> bool {
        self.state
            .mapping
            .as_ref()
            .is_some_and(|mapping| {
                fields::validate_mapping(mapping).is_ok()
                    && fields::is_usable(mapping, &IDENTIFYING_FIELDS)
            })
    }

    /// Advances mapping → options; gated on a usable, duplicate-free mapping.
    pub fn confirm_mapping(&mut self) -> Result<()> {
        if self.step != WizardStep::Mapping {
            return Err(ImportError::InvalidData(
                "Not on the mapping step".to_string(),
            )
            .into());
        }
        let mapping = self
            .state
            .mapping
            .as_ref()
            .ok_or(ImportError::UnusableMapping)?;
        fields::validate_mapping(mapping)?;
        if !fields::is_usable(mapping, &IDENTIFYING_FIELDS) {
            return Err(ImportError::UnusableMapping.into());
        }
        self.step = WizardStep::Options;
        Ok(())
    }

    /// Records the operator's options; stays on the options step.
    pub fn set_options(&mut self, options: ImportOptions) -> Result<()> {
        if self.step != WizardStep::Options {
            return Err(ImportError::InvalidData(
                "Options can only be edited on the options step".to_string(),
            )
            .into());
        }
        self.state.options = options;
        Ok(())
    }

    /// Advances options → validate; always allowed, triggers the pre-flight
    /// call and stores its report.
    pub async fn run_validation(&mut self) -> Result<&ValidationReport> {
        if self.step != WizardStep::Options {
            return Err(ImportError::InvalidData(
                "Not on the options step".to_string(),
            )
            .into());
        }
        let upload = self
            .state
            .upload
            .as_ref()
            .ok_or_else(|| ImportError::InvalidData("No upload present".to_string()))?;
        let mapping = self
            .state
            .mapping
            .as_ref()
            .ok_or(ImportError::UnusableMapping)?;

        let report = self
            .service
            .validate(
                &self.provider_id,
                &upload.upload_id,
                mapping,
                &self.state.options,
            )
            .await?;
        self.step = WizardStep::Validate;
        Ok(&*self.state.validation_report.insert(report))
    }

    /// Advances validate → execute → result: issues exactly one execute
    /// request, then polls at a fixed interval until the job settles or the
    /// wall-clock bound elapses.
    pub async fn execute_and_wait(&mut self) -> Result<WizardOutcome> {
        if self.step != WizardStep::Validate {
            return Err(ImportError::InvalidData(
                "Not on the validation step".to_string(),
            )
            .into());
        }
        let report = self
            .state
            .validation_report
            .as_ref()
            .ok_or_else(|| ImportError::InvalidData("No validation report".to_string()))?;
        if !report.can_proceed {
            return Err(ImportError::InvalidData(format!(
                "Validation reported {} invalid row(s); import cannot proceed",
                report.invalid_rows
            ))
            .into());
        }
        if self.executed {
            return Err(ImportError::InvalidData(
                "This wizard session has already executed its import".to_string(),
            )
            .into());
        }

        let upload_id = self
            .state
            .upload
            .as_ref()
            .map(|upload| upload.upload_id.clone())
            .ok_or_else(|| ImportError::InvalidData("No upload present".to_string()))?;
        let mapping = self
            .state
            .mapping
            .clone()
            .ok_or(ImportError::UnusableMapping)?;

        self.step = WizardStep::Execute;
        let response = self
            .service
            .execute(
                &self.provider_id,
                &upload_id,
                mapping,
                self.state.options.clone(),
                true,
            )
            .await?;
        self.executed = true;
        debug!("Wizard launched import job {}", response.job_id);
        self.state.job_id = Some(response.job_id.clone());

        let outcome = self.poll_until_settled(&response.job_id).await?;
        self.step = WizardStep::Result;
        Ok(outcome)
    }

    async fn poll_until_settled(&mut self, job_id: &str) -> Result<WizardOutcome> {
        let deadline = tokio::time::Instant::now() + self.config.poll_timeout();

        loop {
            let job = self
                .service
                .get_job_status(&self.provider_id, job_id)
                .await?;
            let status = job.status;
            self.state.job = Some(job.clone());

            match status {
                ImportJobStatus::Completed => return Ok(WizardOutcome::Completed(job)),
                ImportJobStatus::Failed => return Ok(WizardOutcome::Failed(job)),
                ImportJobStatus::Pending | ImportJobStatus::Processing => {
                    if tokio::time::Instant::now() >= deadline {
                        debug!("Wizard poll bound elapsed for job {}", job_id);
                        return Ok(WizardOutcome::StillRunning {
                            job_id: job_id.to_string(),
                        });
                    }
                    tokio::time::sleep(self.config.poll_interval()).await;
                }
            }
        }
    }

    /// Returns to the immediately preceding step, preserving everything
    /// collected so far. Backing out of `Mapping` re-enters `Upload`, which
    /// discards all state. Once execution has been requested there is no
    /// step to return to.
    pub fn back(&mut self) {
        match self.step {
            WizardStep::Upload | WizardStep::Execute | WizardStep::Result => {}
            WizardStep::Mapping => {
                self.discard();
                self.step = WizardStep::Upload;
            }
            WizardStep::Options => self.step = WizardStep::Mapping,
            WizardStep::Validate => self.step = WizardStep::Options,
        }
    }

    /// Dialog close/reopen: discards all accumulated state and returns to
    /// the upload step.
    pub fn reset(&mut self) {
        self.discard();
        self.step = WizardStep::Upload;
    }

    fn discard(&mut self) {
        self.state = WizardState::default();
        self.executed = false;
    }
}
