//! In-process report store, used by tests and the console client.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{PhotoUpload, ReportStore, StoreError, StoreResult};
use crate::model::{Report, ReportPatch};

#[derive(Default)]
pub struct InMemoryReportStore {
    reports: RwLock<HashMap<String, Report>>,
    photos: RwLock<HashMap<String, PhotoUpload>>,
    offline: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a network outage: every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful mutating calls, photo uploads included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn photo(&self, reference: &str) -> Option<PhotoUpload> {
        self.photos.read().await.get(reference).cloned()
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn insert(&self, report: &Report) -> StoreResult<String> {
        self.check_online()?;
        let mut reports = self.reports.write().await;
        if reports.contains_key(&report.id) {
            return Err(StoreError::Duplicate(report.id.clone()));
        }
        reports.insert(report.id.clone(), report.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(report.id.clone())
    }

    async fn update(&self, id: &str, patch: &ReportPatch) -> StoreResult<Report> {
        self.check_online()?;
        let mut reports = self.reports.write().await;
        let report = reports
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        patch.apply(report);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(report.clone())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.check_online()?;
        let removed = self.reports.write().await.remove(id);
        match removed {
            Some(_) => {
                self.writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn list_all(&self) -> StoreResult<Vec<Report>> {
        self.check_online()?;
        let mut all: Vec<Report> = self.reports.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn upload_photo(&self, photo: &PhotoUpload) -> StoreResult<String> {
        self.check_online()?;
        let reference = photo.reference();
        self.photos.write().await.insert(reference.clone(), photo.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(reference)
    }
}
