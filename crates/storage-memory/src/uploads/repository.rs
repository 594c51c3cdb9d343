//! In-memory retained-upload store.
//!
//! Datasets are immutable once stored and shared behind `Arc`, so the
//! pre-flight validator and a running executor can read the same upload
//! concurrently. Entries expire after a bounded retention window; expiry is
//! enforced on access as well as by the sweep, so a stale id can never be
//! read back even before a sweep runs.

use chrono::{Duration, Utc};
use dashmap::DashMap;
use log::debug;
use std::sync::Arc;

use licentia_core::imports::{ImportError, UploadStoreTrait, UploadedDataset};
use licentia_core::Result;

/// Implementation of the retained-upload store with TTL eviction.
pub struct MemoryUploadStore {
    datasets: DashMap<String, Arc<UploadedDataset>>,
    ttl: Duration,
}

impl MemoryUploadStore {
    /// Creates a store whose entries expire `ttl` after upload.
    pub fn new(ttl: Duration) -> Self {
        Self {
            datasets: DashMap::new(),
            ttl,
        }
    }

    fn is_expired(&self, dataset: &UploadedDataset) -> bool {
        Utc::now() - dataset.uploaded_at > self.ttl
    }
}

impl UploadStoreTrait for MemoryUploadStore {
    fn put(&self, dataset: UploadedDataset) -> Result<Arc<UploadedDataset>> {
        let stored = Arc::new(dataset);
        self.datasets
            .insert(stored.upload_id.clone(), stored.clone());
        Ok(stored)
    }

    fn get(&self, upload_id: &str) -> Result<Arc<UploadedDataset>> {
        let dataset = self
            .datasets
            .get(upload_id)
            .map(|entry| entry.clone())
            .ok_or_else(|| ImportError::UploadNotFound(upload_id.to_string()))?;

        if self.is_expired(&dataset) {
            self.datasets.remove(upload_id);
            return Err(ImportError::UploadNotFound(upload_id.to_string()).into());
        }
        Ok(dataset)
    }

    fn remove_expired(&self) -> usize {
        let before = self.datasets.len();
        self.datasets.retain(|_, dataset| !self.is_expired(dataset));
        let removed = before - self.datasets.len();
        if removed > 0 {
            debug!("Expired {} retained upload(s)", removed);
        }
        removed
    }
}
