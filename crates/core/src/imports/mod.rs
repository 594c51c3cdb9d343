//! Import pipeline - upload parsing, column inference, pre-flight
//! validation, and the tracked background import job.

mod csv_parser;
mod executor;
mod fields;
mod imports_errors;
mod imports_model;
mod imports_service;
mod imports_traits;
mod job_store;
mod preflight;
mod row_builder;
mod template;
mod wizard;



pub use csv_parser::{parse_sheet, ParsedSheet};
pub use executor::ImportExecutor;
pub use fields::{
    canonical_headers, is_usable, suggest_mapping, validate_mapping, SystemField,
    IDENTIFYING_FIELDS,
};
pub use imports_errors::ImportError;
pub use imports_model::{
    ColumnMapping, ColumnMappingEntry, ErrorHandling, ExecuteResponse, ImportConfig, ImportJob,
    ImportJobStatus, ImportOptions, IssueSeverity, RowIssue, UploadResponse, UploadedDataset,
    ValidationReport,
};
pub use imports_service::ImportService;
pub use imports_traits::{ImportServiceTrait, UploadStoreTrait};
pub use job_store::ImportJobStore;
pub use preflight::validate_upload;
pub use row_builder::{CandidateRecord, IdentifyingKey, RowCompiler};
pub use template::render_template;
pub use wizard::{ImportWizard, WizardOutcome, WizardState, WizardStep};
