//! Report Store Interface and Implementations
//!
//! The store is the single source of truth for reports. Everything the
//! client keeps in memory is rebuilt from `list_all`.

mod memory;
mod sqlite;

pub use memory::InMemoryReportStore;
pub use sqlite::SqliteReportStore;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::model::{Report, ReportPatch};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("report {0} not found")]
    NotFound(String),
    #[error("report {0} already exists")]
    Duplicate(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Bytes of an attached photo, as picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl PhotoUpload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    /// Content-addressed reference, identical for identical bytes.
    pub fn reference(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        format!("photo://{}", hex::encode(digest))
    }
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist a new report and return its id.
    async fn insert(&self, report: &Report) -> StoreResult<String>;

    /// Overwrite the mutable fields of a report and return the stored record.
    async fn update(&self, id: &str, patch: &ReportPatch) -> StoreResult<Report>;

    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// All reports, newest `created_at` first.
    async fn list_all(&self) -> StoreResult<Vec<Report>>;

    /// Store photo bytes and return a stable reference.
    async fn upload_photo(&self, photo: &PhotoUpload) -> StoreResult<String>;
}
