//! Known system fields, column inference, and mapping validation.
//!
//! Column inference proposes a mapping from arbitrary operator-named file
//! columns onto the closed set of license-record fields, using normalized
//! exact-then-alias matching over a static registry.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::imports_errors::ImportError;
use super::imports_model::{ColumnMapping, ColumnMappingEntry};

/// Fields of a license record that a file column can map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemField {
    LicenseKey,
    ExternalUserId,
    FullName,
    Department,
    Status,
    Cost,
    Currency,
    Seats,
    StartDate,
    RenewalDate,
    Notes,
}

impl SystemField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemField::LicenseKey => "license_key",
            SystemField::ExternalUserId => "external_user_id",
            SystemField::FullName => "full_name",
            SystemField::Department => "department",
            SystemField::Status => "status",
            SystemField::Cost => "cost",
            SystemField::Currency => "currency",
            SystemField::Seats => "seats",
            SystemField::StartDate => "start_date",
            SystemField::RenewalDate => "renewal_date",
            SystemField::Notes => "notes",
        }
    }

    /// True for fields that can locate an existing record on their own.
    pub fn is_identifying_key(&self) -> bool {
        matches!(self, SystemField::LicenseKey | SystemField::ExternalUserId)
    }
}

impl std::fmt::Display for SystemField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields that satisfy the "at least one identifying key" mapping gate.
pub const IDENTIFYING_FIELDS: [SystemField; 2] =
    [SystemField::LicenseKey, SystemField::ExternalUserId];

/// One registry entry: a field plus the spellings commonly seen in vendor
/// exports. Declaration order resolves inference ties.
struct FieldSpec {
    field: SystemField,
    aliases: &'static [&'static str],
}

const FIELD_REGISTRY: &[FieldSpec] = &[
    FieldSpec {
        field: SystemField::LicenseKey,
        aliases: &["key", "license", "license_number", "serial", "serial_number"],
    },
    FieldSpec {
        field: SystemField::ExternalUserId,
        aliases: &["email", "user_email", "user_id", "employee_email", "assignee"],
    },
    FieldSpec {
        field: SystemField::FullName,
        aliases: &["name", "employee_name", "user_name", "assignee_name"],
    },
    FieldSpec {
        field: SystemField::Department,
        aliases: &["dept", "team", "cost_center"],
    },
    FieldSpec {
        field: SystemField::Status,
        aliases: &["state", "license_status"],
    },
    FieldSpec {
        field: SystemField::Cost,
        aliases: &["price", "amount", "monthly_cost", "cost_per_seat"],
    },
    FieldSpec {
        field: SystemField::Currency,
        aliases: &["ccy", "cost_currency"],
    },
    FieldSpec {
        field: SystemField::Seats,
        aliases: &["seat_count", "quantity", "seat_quantity"],
    },
    FieldSpec {
        field: SystemField::StartDate,
        aliases: &["purchase_date", "purchased", "start", "valid_from"],
    },
    FieldSpec {
        field: SystemField::RenewalDate,
        aliases: &["renewal", "expiry", "expires", "expiration_date", "valid_until"],
    },
    FieldSpec {
        field: SystemField::Notes,
        aliases: &["comment", "comments", "description"],
    },
];

/// Canonical template headers, in registry order.
pub fn canonical_headers() -> Vec<&'static str> {
    FIELD_REGISTRY.iter().map(|spec| spec.field.as_str()).collect()
}

/// Lowercases a column name and strips everything except letters and digits,
/// so "License Key", "license-key" and "LICENSE_KEY" all compare equal.
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Proposes a mapping for the given header row.
///
/// Matching is exact-first (against the canonical field names), then by
/// alias, both over normalized names; ties resolve in registry declaration
/// order. A field claimed by an earlier column is never suggested again.
/// Columns with no match map to `None`. Pure and deterministic.
pub fn suggest_mapping(columns: &[String]) -> ColumnMapping {
    let mut claimed: HashSet<SystemField> = HashSet::new();

    let entries = columns
        .iter()
        .map(|column| {
            let suggestion = match_field(&normalize(column), &claimed);
            if let Some(field) = suggestion {
                claimed.insert(field);
            }
            ColumnMappingEntry {
                file_column: column.clone(),
                system_field: suggestion,
            }
        })
        .collect();

    ColumnMapping { entries }
}

fn match_field(normalized: &str, claimed: &HashSet<SystemField>) -> Option<SystemField> {
    if normalized.is_empty() {
        return None;
    }

    // Exact pass over canonical names
    for spec in FIELD_REGISTRY {
        if !claimed.contains(&spec.field) && normalize(spec.field.as_str()) == normalized {
            return Some(spec.field);
        }
    }

    // Alias pass, registry order
    for spec in FIELD_REGISTRY {
        if !claimed.contains(&spec.field)
            && spec.aliases.iter().any(|alias| normalize(alias) == normalized)
        {
            return Some(spec.field);
        }
    }

    None
}

/// Rejects mappings where two file columns target the same system field.
pub fn validate_mapping(mapping: &ColumnMapping) -> std::result::Result<(), ImportError> {
    let mut seen: HashMap<SystemField, &str> = HashMap::new();
    for entry in &mapping.entries {
        if let Some(field) = entry.system_field {
            if let Some(first) = seen.insert(field, entry.file_column.as_str()) {
                return Err(ImportError::DuplicateTarget {
                    first: first.to_string(),
                    second: entry.file_column.clone(),
                    field: field.as_str().to_string(),
                });
            }
        }
    }
    Ok(())
}

/// A mapping is usable iff at least one of `required_fields` is mapped.
pub fn is_usable(mapping: &ColumnMapping, required_fields: &[SystemField]) -> bool {
    mapping
        .entries
        .iter()
        .filter_map(|entry| entry.system_field)
        .any(|field| required_fields.contains(&field))
}
