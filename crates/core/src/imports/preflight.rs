//! Pre-flight validation.
//!
//! A non-persisting simulation of the import: every row runs through the
//! same `RowCompiler` the executor uses, and the findings are collected into
//! a `ValidationReport`. Single pass over the rows, no writes, idempotent.

use super::imports_model::{
    ColumnMapping, ErrorHandling, ImportOptions, RowIssue, UploadedDataset, ValidationReport,
};
use super::row_builder::RowCompiler;

/// Validates an uploaded dataset against a mapping and options.
pub fn validate_upload(
    dataset: &UploadedDataset,
    mapping: &ColumnMapping,
    options: &ImportOptions,
) -> ValidationReport {
    let mut compiler = RowCompiler::new(mapping, options);
    let mut issues: Vec<RowIssue> = Vec::new();
    let mut invalid_rows = 0usize;

    for (row_index, row) in dataset.rows.iter().enumerate() {
        let (record, row_issues) = compiler.compile_row(row_index, row);
        if record.is_none() {
            invalid_rows += 1;
        }
        issues.extend(row_issues);
    }

    let total_rows = dataset.rows.len();
    ValidationReport {
        total_rows,
        valid_rows: total_rows - invalid_rows,
        invalid_rows,
        issues,
        can_proceed: options.error_handling == ErrorHandling::Skip || invalid_rows == 0,
    }
}
