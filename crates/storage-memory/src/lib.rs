//! In-memory storage implementation for Licentia.
//!
//! This crate implements the repository traits defined in `licentia-core`
//! with bounded in-memory maps. It is the only place where the backing
//! store's data structures exist; all other crates are storage-agnostic and
//! work with traits.
//!
//! ```text
//! core (domain, import pipeline)
//!               │
//!               ▼
//!      storage-memory (this crate)
//! ```
//!
//! License records live for the process lifetime; retained uploads expire
//! after a bounded retention window.

pub mod licenses;
pub mod uploads;

pub use licenses::MemoryLicenseRepository;
pub use uploads::MemoryUploadStore;

// Re-export from licentia-core for convenience
pub use licentia_core::errors::{DatabaseError, Error, Result};
