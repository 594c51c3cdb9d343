//! In-memory license repository.
//!
//! Records are held in a concurrent map keyed by record id, with secondary
//! indexes per identifying key so that executor lookups stay O(1) even for
//! large imports.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use licentia_core::errors::DatabaseError;
use licentia_core::licenses::{
    LicenseRecord, LicenseRecordUpdate, LicenseRepositoryTrait, NewLicenseRecord,
};
use licentia_core::Result;

/// Implementation of the license repository over concurrent in-memory maps.
#[derive(Default)]
pub struct MemoryLicenseRepository {
    records: DashMap<String, LicenseRecord>,
    /// provider-scoped license key -> record id
    key_index: DashMap<String, String>,
    /// provider-scoped external user id -> record id
    user_index: DashMap<String, String>,
}

impl MemoryLicenseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn key_slot(provider_id: &str, license_key: &str) -> String {
        format!("{}\u{1f}{}", provider_id, license_key.to_lowercase())
    }

    fn user_slot(provider_id: &str, external_user_id: &str) -> String {
        format!("{}\u{1f}{}", provider_id, external_user_id.to_lowercase())
    }

    fn index_record(&self, record: &LicenseRecord) {
        if let Some(key) = &record.license_key {
            self.key_index
                .insert(Self::key_slot(&record.provider_id, key), record.id.clone());
        }
        if let Some(user) = &record.external_user_id {
            self.user_index
                .insert(Self::user_slot(&record.provider_id, user), record.id.clone());
        }
    }
}

#[async_trait]
impl LicenseRepositoryTrait for MemoryLicenseRepository {
    fn get_license(&self, license_id: &str) -> Result<LicenseRecord> {
        self.records
            .get(license_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| DatabaseError::NotFound(format!("license {}", license_id)).into())
    }

    fn get_licenses(&self, provider_id: &str) -> Result<Vec<LicenseRecord>> {
        let mut records: Vec<LicenseRecord> = self
            .records
            .iter()
            .filter(|entry| entry.provider_id == provider_id)
            .map(|entry| entry.clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    fn count_licenses(&self, provider_id: &str) -> Result<usize> {
        Ok(self
            .records
            .iter()
            .filter(|entry| entry.provider_id == provider_id)
            .count())
    }

    fn find_by_license_key(
        &self,
        provider_id: &str,
        license_key: &str,
    ) -> Result<Option<LicenseRecord>> {
        match self.key_index.get(&Self::key_slot(provider_id, license_key)) {
            Some(id) => Ok(self.records.get(id.value()).map(|entry| entry.clone())),
            None => Ok(None),
        }
    }

    fn find_by_external_user_id(
        &self,
        provider_id: &str,
        external_user_id: &str,
    ) -> Result<Option<LicenseRecord>> {
        match self
            .user_index
            .get(&Self::user_slot(provider_id, external_user_id))
        {
            Some(id) => Ok(self.records.get(id.value()).map(|entry| entry.clone())),
            None => Ok(None),
        }
    }

    async fn create_license(&self, new_license: NewLicenseRecord) -> Result<LicenseRecord> {
        new_license.validate()?;

        if let Some(key) = &new_license.license_key {
            if self.find_by_license_key(&new_license.provider_id, key)?.is_some() {
                return Err(
                    DatabaseError::UniqueViolation(format!("license key {}", key)).into(),
                );
            }
        }
        if let Some(user) = &new_license.external_user_id {
            if self
                .find_by_external_user_id(&new_license.provider_id, user)?
                .is_some()
            {
                return Err(
                    DatabaseError::UniqueViolation(format!("external user {}", user)).into(),
                );
            }
        }

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

        self.index_record(&record);
        self.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn update_license(&self, update: LicenseRecordUpdate) -> Result<LicenseRecord> {
        update.validate()?;

        let mut entry = self
            .records
            .get_mut(&update.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("license {}", update.id)))?;
        if entry.provider_id != update.provider_id {
            return Err(DatabaseError::NotFound(format!("license {}", update.id)).into());
        }

        if let Some(full_name) = update.full_name {
            entry.full_name = Some(full_name);
        }
        if let Some(department) = update.department {
            entry.department = Some(department);
        }
        if let Some(status) = update.status {
            entry.status = status;
        }
        if let Some(cost) = update.cost {
            entry.cost = Some(cost);
        }
        if let Some(currency) = update.currency {
            entry.currency = currency;
        }
        if let Some(seats) = update.seats {
            entry.seats = Some(seats);
        }
        if let Some(start_date) = update.start_date {
            entry.start_date = Some(start_date);
        }
        if let Some(renewal_date) = update.renewal_date {
            entry.renewal_date = Some(renewal_date);
        }
        if let Some(notes) = update.notes {
            entry.notes = Some(notes);
        }
        entry.updated_at = Utc::now();

        Ok(entry.clone())
    }
}
