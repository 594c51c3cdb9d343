//! License domain - models and repository traits.

mod licenses_model;
mod licenses_traits;

pub use licenses_model::{
    LicenseRecord, LicenseRecordUpdate, LicenseStatus, NewLicenseRecord,
};
pub use licenses_traits::LicenseRepositoryTrait;
