use async_trait::async_trait;

use super::licenses_model::*;
use crate::Result;

/// Trait defining the contract for license repository operations.
///
/// The import executor writes through this seam; lookups by identifying key
/// are always scoped to one provider.
#[async_trait]
pub trait LicenseRepositoryTrait: Send + Sync {
    fn get_license(&self, license_id: &str) -> Result<LicenseRecord>;
    fn get_licenses(&self, provider_id: &str) -> Result<Vec<LicenseRecord>>;
    fn count_licenses(&self, provider_id: &str) -> Result<usize>;

    /// Finds the record carrying the given vendor-issued license key, if any.
    fn find_by_license_key(
        &self,
        provider_id: &str,
        license_key: &str,
    ) -> Result<Option<LicenseRecord>>;

    /// Finds the record assigned to the given external user identity, if any.
    fn find_by_external_user_id(
        &self,
        provider_id: &str,
        external_user_id: &str,
    ) -> Result<Option<LicenseRecord>>;

    async fn create_license(&self, new_license: NewLicenseRecord) -> Result<LicenseRecord>;
    async fn update_license(&self, update: LicenseRecordUpdate) -> Result<LicenseRecord>;
}
