//! Import template generation.

use super::fields::canonical_headers;
use crate::errors::ValidationError;
use crate::Result;

/// One plausible value per registry field, aligned with `canonical_headers`.
const SAMPLE_ROW: [&str; 11] = [
    "XYZ-4F7K-99",
    "ada@acme.io",
    "Ada Lovelace",
    "Research",
    "ACTIVE",
    "12.50",
    "USD",
    "1",
    "2026-01-01",
    "2027-01-01",
    "Annual plan",
];

/// Renders a CSV template of the known system fields, optionally with one
/// sample row the operator can overwrite.
pub fn render_template(with_sample_row: bool) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(canonical_headers())?;
    if with_sample_row {
        writer.write_record(SAMPLE_ROW)?;
    }
    writer
        .into_inner()
        .map_err(|e| ValidationError::InvalidInput(e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::csv_parser::parse_sheet;
    use crate::imports::fields::{suggest_mapping, SystemField};

    #[test]
    fn test_template_headers_match_registry() {
        let bytes = render_template(false).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("license_key,external_user_id,full_name"));
    }

    #[test]
    fn test_template_round_trips_through_inference() {
        // A file built from the template must auto-map every column.
        let bytes = render_template(true).unwrap();
        let sheet = parse_sheet(&bytes).unwrap();
        let mapping = suggest_mapping(&sheet.columns);

        assert_eq!(sheet.rows.len(), 1);
        assert!(mapping.entries.iter().all(|e| e.system_field.is_some()));
        assert_eq!(
            mapping.entries[0].system_field,
            Some(SystemField::LicenseKey)
        );
    }

    #[test]
    fn test_template_without_sample_row_has_header_only() {
        let bytes = render_template(false).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
