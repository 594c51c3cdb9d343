//! License repository implementation.

mod repository;

pub use repository::MemoryLicenseRepository;
