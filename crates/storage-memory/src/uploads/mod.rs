//! Retained-upload store implementation.

mod repository;

pub use repository::MemoryUploadStore;
