//! License domain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::*;
use crate::errors::ValidationError;
use crate::Result;

/// License status for lifecycle management
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseStatus {
    #[default]
    Active, // Live, billed
    Inactive, // Held, not assigned
    Expired,  // Past renewal without renewal
    Pending,  // Ordered, not yet provisioned
}

impl LicenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseStatus::Active => LICENSE_STATUS_ACTIVE,
            LicenseStatus::Inactive => LICENSE_STATUS_INACTIVE,
            LicenseStatus::Expired => LICENSE_STATUS_EXPIRED,
            LicenseStatus::Pending => LICENSE_STATUS_PENDING,
        }
    }
}

impl FromStr for LicenseStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            LICENSE_STATUS_ACTIVE => Ok(LicenseStatus::Active),
            LICENSE_STATUS_INACTIVE => Ok(LicenseStatus::Inactive),
            LICENSE_STATUS_EXPIRED => Ok(LicenseStatus::Expired),
            LICENSE_STATUS_PENDING => Ok(LicenseStatus::Pending),
            other => Err(format!("Unknown license status: {}", other)),
        }
    }
}

/// Domain model representing one tracked license seat.
///
/// A record is located either by its vendor-issued license key or by the
/// external identity of the employee holding it (typically their email).
/// At least one of the two is always present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    // Identity
    pub id: String,
    pub provider_id: String,
    pub license_key: Option<String>,
    pub external_user_id: Option<String>,

    // Assignment
    pub full_name: Option<String>,
    pub department: Option<String>,

    // Lifecycle
    pub status: LicenseStatus,

    // Cost
    pub cost: Option<Decimal>,
    pub currency: String,
    pub seats: Option<u32>,

    // Timing
    pub start_date: Option<NaiveDate>,
    pub renewal_date: Option<NaiveDate>,

    // Metadata
    pub notes: Option<String>,

    // Audit
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input model for creating a new license record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLicenseRecord {
    pub id: Option<String>,
    pub provider_id: String,
    pub license_key: Option<String>,
    pub external_user_id: Option<String>,
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub status: Option<LicenseStatus>,
    pub cost: Option<Decimal>,
    pub currency: String,
    pub seats: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub renewal_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewLicenseRecord {
    /// Validates the new license record data
    pub fn validate(&self) -> Result<()> {
        if self.provider_id.trim().is_empty() {
            return Err(ValidationError::MissingField("provider_id".to_string()).into());
        }
        if !self.has_identifying_key() {
            return Err(ValidationError::InvalidInput(
                "License records require a license key or an external user id".to_string(),
            )
            .into());
        }
        if self.currency.trim().is_empty() {
            return Err(ValidationError::MissingField("currency".to_string()).into());
        }
        Ok(())
    }

    /// True when at least one identifying key is present and non-blank.
    pub fn has_identifying_key(&self) -> bool {
        self.license_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            || self
                .external_user_id
                .as_deref()
                .is_some_and(|k| !k.trim().is_empty())
    }
}

/// Input model for updating an existing license record.
///
/// `None` fields are left untouched by the repository; identifying keys are
/// never rewritten by an update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecordUpdate {
    pub id: String,
    pub provider_id: String,
    pub full_name: Option<String>,
    pub department: Option<String>,
    pub status: Option<LicenseStatus>,
    pub cost: Option<Decimal>,
    pub currency: Option<String>,
    pub seats: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub renewal_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl LicenseRecordUpdate {
    /// Validates the license update data
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::InvalidInput(
                "License ID is required for updates".to_string(),
            )
            .into());
        }
        if self.provider_id.trim().is_empty() {
            return Err(ValidationError::MissingField("provider_id".to_string()).into());
        }
        Ok(())
    }
}
