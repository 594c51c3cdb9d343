//! Shared row-to-record computation.
//!
//! Both the pre-flight validator and the executor compile rows through the
//! same `RowCompiler`, including its duplicate-key tracking, so a row that
//! fails validation fails identically in both passes.

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use super::fields::SystemField;
use super::imports_model::{ColumnMapping, ImportOptions, IssueSeverity, RowIssue};
use crate::licenses::LicenseStatus;

/// A license record candidate built from one file row, with option defaults
/// applied. Not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    pub license_key: Option<String>,
    pub external_user_id: Option<String>,
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub status: LicenseStatus,
    pub cost: Option<Decimal>,
    pub currency: String,
    pub seats: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub renewal_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// The key used to locate an existing record for a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifyingKey {
    LicenseKey(String),
    ExternalUserId(String),
}

impl CandidateRecord {
    /// Lookup preference: license key first, then external user id.
    pub fn identifying_key(&self) -> Option<IdentifyingKey> {
        if let Some(key) = &self.license_key {
            return Some(IdentifyingKey::LicenseKey(key.clone()));
        }
        self.external_user_id
            .as_ref()
            .map(|id| IdentifyingKey::ExternalUserId(id.clone()))
    }
}

/// Compiles raw dataset rows into candidate records.
///
/// Holds per-dataset state (the identifying keys already seen), so one
/// compiler instance must be driven over the rows of one dataset in file
/// order. Deterministic: the same rows in the same order always produce the
/// same records and issues.
pub struct RowCompiler<'a> {
    options: &'a ImportOptions,
    /// Column index per mapped field, precomputed from the mapping.
    field_columns: HashMap<SystemField, usize>,
    /// Normalized identifying keys seen so far in this dataset.
    seen_keys: HashSet<String>,
}

impl<'a> RowCompiler<'a> {
    pub fn new(mapping: &'a ColumnMapping, options: &'a ImportOptions) -> Self {
        let field_columns = mapping
            .entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.system_field.map(|field| (field, index)))
            .collect();
        Self {
            options,
            field_columns,
            seen_keys: HashSet::new(),
        }
    }

    /// Compiles one row into a candidate record.
    ///
    /// Returns `(None, issues)` when the row carries at least one
    /// error-severity issue; warnings alone do not invalidate a row.
    pub fn compile_row(
        &mut self,
        row_index: usize,
        row: &[String],
    ) -> (Option<CandidateRecord>, Vec<RowIssue>) {
        let mut issues: Vec<RowIssue> = Vec::new();

        let license_key = self.cell(row, SystemField::LicenseKey);
        let external_user_id = self.cell(row, SystemField::ExternalUserId);
        let full_name = self.cell(row, SystemField::FullName);
        let department = self.cell(row, SystemField::Department);
        let notes = self.cell(row, SystemField::Notes);

        // An identifying key is the one hard presence requirement.
        if license_key.is_none() && external_user_id.is_none() {
            let field = self.missing_key_field();
            issues.push(RowIssue::error(
                row_index,
                field,
                "Row has no license key or external user id",
            ));
        }

        let status = match self.cell(row, SystemField::Status) {
            Some(raw) => match LicenseStatus::from_str(&raw) {
                Ok(status) => status,
                Err(_) => {
                    issues.push(RowIssue::error(
                        row_index,
                        Some(SystemField::Status),
                        format!("Unrecognized status value '{}'", raw),
                    ));
                    self.options.default_status
                }
            },
            None => self.options.default_status,
        };

        let cost = match self.cell(row, SystemField::Cost) {
            Some(raw) => match parse_cost(&raw) {
                Some(value) => {
                    if value.is_sign_negative() {
                        issues.push(RowIssue::warning(
                            row_index,
                            Some(SystemField::Cost),
                            format!("Negative cost value '{}'", raw),
                        ));
                    }
                    Some(value)
                }
                None => {
                    issues.push(RowIssue::error(
                        row_index,
                        Some(SystemField::Cost),
                        format!("Cost value '{}' is not a number", raw),
                    ));
                    None
                }
            },
            None => None,
        };

        let currency = match self.cell(row, SystemField::Currency) {
            Some(raw) => {
                let code = raw.to_uppercase();
                if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
                    code
                } else {
                    issues.push(RowIssue::error(
                        row_index,
                        Some(SystemField::Currency),
                        format!("Currency '{}' is not a 3-letter code", raw),
                    ));
                    self.options.default_currency.clone()
                }
            }
            None => self.options.default_currency.clone(),
        };

        let seats = match self.cell(row, SystemField::Seats) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(value) => Some(value),
                Err(_) => {
                    issues.push(RowIssue::error(
                        row_index,
                        Some(SystemField::Seats),
                        format!("Seat count '{}' is not a whole number", raw),
                    ));
                    None
                }
            },
            None => None,
        };

        let start_date = self.parse_date(row, row_index, SystemField::StartDate, &mut issues);
        let renewal_date = self.parse_date(row, row_index, SystemField::RenewalDate, &mut issues);

        if let (Some(start), Some(renewal)) = (start_date, renewal_date) {
            if renewal < start {
                issues.push(RowIssue::warning(
                    row_index,
                    Some(SystemField::RenewalDate),
                    "Renewal date precedes start date",
                ));
            }
        }

        // Duplicate detection runs over every present key so that a later
        // row cannot collide with either key of an earlier one. Keys are
        // registered even when the row fails other checks, matching what the
        // operator sees: the first occurrence owns the key.
        let mut duplicate = false;
        for (kind, value, field) in [
            ("license_key", &license_key, SystemField::LicenseKey),
            (
                "external_user_id",
                &external_user_id,
                SystemField::ExternalUserId,
            ),
        ] {
            if let Some(value) = value {
                let tracked = format!("{}:{}", kind, value.to_lowercase());
                if !self.seen_keys.insert(tracked) && !duplicate {
                    duplicate = true;
                    issues.push(RowIssue::error(
                        row_index,
                        Some(field),
                        format!("Duplicate identifying key '{}' within this upload", value),
                    ));
                }
            }
        }

        let has_error = issues
            .iter()
            .any(|issue| issue.severity == IssueSeverity::Error);
        if has_error {
            return (None, issues);
        }

        let record = CandidateRecord {
            license_key,
            external_user_id,
            full_name,
            department,
            status,
            cost,
            currency,
            seats,
            start_date,
            renewal_date,
            notes,
        };
        (Some(record), issues)
    }

    /// Mapped, trimmed cell value; blank and unmapped cells are `None`.
    fn cell(&self, row: &[String], field: SystemField) -> Option<String> {
        let index = *self.field_columns.get(&field)?;
        let value = row.get(index)?.trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }

    fn parse_date(
        &self,
        row: &[String],
        row_index: usize,
        field: SystemField,
        issues: &mut Vec<RowIssue>,
    ) -> Option<NaiveDate> {
        let raw = self.cell(row, field)?;
        if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            return Some(date);
        }
        if let Ok(datetime) = DateTime::parse_from_rfc3339(&raw) {
            return Some(datetime.date_naive());
        }
        issues.push(RowIssue::error(
            row_index,
            Some(field),
            format!("Date '{}' is not YYYY-MM-DD or RFC 3339", raw),
        ));
        None
    }

    /// The field to report a missing identifying key against: the mapped key
    /// column when only one is mapped, otherwise no specific field.
    fn missing_key_field(&self) -> Option<SystemField> {
        let has_license = self.field_columns.contains_key(&SystemField::LicenseKey);
        let has_external = self
            .field_columns
            .contains_key(&SystemField::ExternalUserId);
        match (has_license, has_external) {
            (true, false) => Some(SystemField::LicenseKey),
            (false, true) => Some(SystemField::ExternalUserId),
            _ => None,
        }
    }
}

/// Parses a cost value, accepting plain and scientific decimal notation.
fn parse_cost(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::fields::suggest_mapping;
    use crate::imports::imports_model::IssueSeverity;
    use rust_decimal_macros::dec;

    fn mapping_for(columns: &[&str]) -> ColumnMapping {
        suggest_mapping(&columns.iter().map(|c| c.to_string()).collect::<Vec<_>>())
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_compile_row_builds_record_with_defaults() {
        let mapping = mapping_for(&["email", "full_name"]);
        let options = ImportOptions::default();
        let mut compiler = RowCompiler::new(&mapping, &options);

        let (record, issues) = compiler.compile_row(0, &row(&["ada@acme.io", "Ada"]));

        assert!(issues.is_empty());
        let record = record.unwrap();
        assert_eq!(record.external_user_id.as_deref(), Some("ada@acme.io"));
        assert_eq!(record.full_name.as_deref(), Some("Ada"));
        assert_eq!(record.status, LicenseStatus::Active);
        assert_eq!(record.currency, "USD");
    }

    #[test]
    fn test_compile_row_rejects_missing_identifying_key() {
        let mapping = mapping_for(&["email", "full_name"]);
        let options = ImportOptions::default();
        let mut compiler = RowCompiler::new(&mapping, &options);

        let (record, issues) = compiler.compile_row(2, &row(&["", "Bob"]));

        assert!(record.is_none());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].row_index, 2);
        assert_eq!(issues[0].severity, IssueSeverity::Error);
        assert_eq!(issues[0].field, Some(SystemField::ExternalUserId));
    }

    #[test]
    fn test_compile_row_parses_typed_fields() {
        let mapping = mapping_for(&["license_key", "cost", "currency", "seats", "start_date"]);
        let options = ImportOptions::default();
        let mut compiler = RowCompiler::new(&mapping, &options);

        let (record, issues) =
            compiler.compile_row(0, &row(&["K-1", "12.50", "eur", "5", "2026-01-15"]));

        assert!(issues.is_empty());
        let record = record.unwrap();
        assert_eq!(record.cost, Some(dec!(12.50)));
        assert_eq!(record.currency, "EUR");
        assert_eq!(record.seats, Some(5));
        assert_eq!(
            record.start_date,
            Some(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap())
        );
    }

    #[test]
    fn test_compile_row_rejects_malformed_values() {
        let mapping = mapping_for(&["license_key", "cost", "seats", "start_date", "status"]);
        let options = ImportOptions::default();
        let mut compiler = RowCompiler::new(&mapping, &options);

        let (record, issues) = compiler.compile_row(
            0,
            &row(&["K-1", "twelve", "4.5", "January 1st", "GONE"]),
        );

        assert!(record.is_none());
        let fields: Vec<_> = issues.iter().filter_map(|i| i.field).collect();
        assert!(fields.contains(&SystemField::Cost));
        assert!(fields.contains(&SystemField::Seats));
        assert!(fields.contains(&SystemField::StartDate));
        assert!(fields.contains(&SystemField::Status));
    }

    #[test]
    fn test_compile_row_accepts_rfc3339_dates() {
        let mapping = mapping_for(&["license_key", "renewal_date"]);
        let options = ImportOptions::default();
        let mut compiler = RowCompiler::new(&mapping, &options);

        let (record, issues) =
            compiler.compile_row(0, &row(&["K-1", "2026-03-01T09:30:00+00:00"]));

        assert!(issues.is_empty());
        assert_eq!(
            record.unwrap().renewal_date,
            Some(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
        );
    }

    #[test]
    fn test_compile_row_warns_without_invalidating() {
        let mapping = mapping_for(&["license_key", "cost", "start_date", "renewal_date"]);
        let options = ImportOptions::default();
        let mut compiler = RowCompiler::new(&mapping, &options);

        let (record, issues) =
            compiler.compile_row(0, &row(&["K-1", "-3", "2026-06-01", "2026-01-01"]));

        assert!(record.is_some());
        assert_eq!(issues.len(), 2);
        assert!(issues
            .iter()
            .all(|issue| issue.severity == IssueSeverity::Warning));
    }

    #[test]
    fn test_compile_row_flags_duplicate_keys_within_upload() {
        let mapping = mapping_for(&["email"]);
        let options = ImportOptions::default();
        let mut compiler = RowCompiler::new(&mapping, &options);

        let (first, _) = compiler.compile_row(0, &row(&["ada@acme.io"]));
        assert!(first.is_some());

        let (second, issues) = compiler.compile_row(1, &row(&["Ada@Acme.IO"]));
        assert!(second.is_none());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, Some(SystemField::ExternalUserId));
    }

    #[test]
    fn test_compile_row_flags_cross_key_duplicates() {
        // Row 0 carries both keys; row 1 reuses only the email.
        let mapping = mapping_for(&["license_key", "email"]);
        let options = ImportOptions::default();
        let mut compiler = RowCompiler::new(&mapping, &options);

        let (first, _) = compiler.compile_row(0, &row(&["K-1", "ada@acme.io"]));
        assert!(first.is_some());

        let (second, issues) = compiler.compile_row(1, &row(&["", "ada@acme.io"]));
        assert!(second.is_none());
        assert!(!issues.is_empty());
    }

    #[test]
    fn test_identifying_key_prefers_license_key() {
        let record = CandidateRecord {
            license_key: Some("K-1".to_string()),
            external_user_id: Some("ada@acme.io".to_string()),
            full_name: None,
            department: None,
            status: LicenseStatus::Active,
            cost: None,
            currency: "USD".to_string(),
            seats: None,
            start_date: None,
            renewal_date: None,
            notes: None,
        };
        assert_eq!(
            record.identifying_key(),
            Some(IdentifyingKey::LicenseKey("K-1".to_string()))
        );
    }
}
