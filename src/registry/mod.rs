//! Marker Registry
//!
//! Derived, rebuildable cache of the report store: report id -> (record,
//! map marker). Records are the index; marker handles hang off them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::HazardResult;
use crate::events::{EventBus, HazardEvent};
use crate::map::{MapWidget, MarkerHandle};
use crate::model::{role_of, Principal, Report};
use crate::session::SessionObserver;
use crate::store::ReportStore;

struct Entry {
    report: Report,
    marker: MarkerHandle,
}

pub struct MarkerRegistry {
    store: Arc<dyn ReportStore>,
    map: Arc<dyn MapWidget>,
    entries: RwLock<HashMap<String, Entry>>,
    /// Bumped by `clear`, so a load that straddles a sign-out is dropped.
    generation: AtomicU64,
    events: EventBus,
}

impl MarkerRegistry {
    pub fn new(store: Arc<dyn ReportStore>, map: Arc<dyn MapWidget>, events: EventBus) -> Self {
        Self {
            store,
            map,
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
            events,
        }
    }

    /// Replace everything with the store's current contents. Safe to call
    /// any number of times; on failure the previous contents stay.
    #[instrument(skip_all, fields(role = %role_of(principal)))]
    pub async fn load(&self, principal: Option<&Principal>) -> HazardResult<usize> {
        let generation = self.generation.load(Ordering::SeqCst);
        let reports = self.store.list_all().await?;

        let mut entries = self.entries.write().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Registry was cleared while loading, dropping stale result");
            return Ok(entries.len());
        }

        for (_, old) in entries.drain() {
            self.map.remove_marker(old.marker);
        }
        for report in reports {
            if entries.contains_key(&report.id) {
                warn!("Store returned report {} twice, keeping the newest", report.id);
                continue;
            }
            let marker = self.map.place_marker(report.location, report.glyph());
            entries.insert(report.id.clone(), Entry { report, marker });
        }

        let count = entries.len();
        drop(entries);
        info!("Loaded {} reports", count);
        self.events.publish(HazardEvent::ReportsLoaded { count });
        Ok(count)
    }

    pub async fn upsert(&self, report: Report) {
        let mut entries = self.entries.write().await;
        match entries.get_mut(&report.id) {
            Some(entry) => {
                let moved = entry.report.location != report.location || entry.report.kind != report.kind;
                if moved {
                    self.map.remove_marker(entry.marker);
                    entry.marker = self.map.place_marker(report.location, report.glyph());
                }
                entry.report = report;
            }
            None => {
                let marker = self.map.place_marker(report.location, report.glyph());
                entries.insert(report.id.clone(), Entry { report, marker });
            }
        }
    }

    pub async fn evict(&self, report_id: &str) -> Option<Report> {
        let removed = self.entries.write().await.remove(report_id);
        removed.map(|entry| {
            self.map.remove_marker(entry.marker);
            entry.report
        })
    }

    /// Drop every record and marker. Used on sign-out and map teardown.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        for (_, entry) in entries.drain() {
            self.map.remove_marker(entry.marker);
        }
    }

    pub async fn get(&self, report_id: &str) -> Option<Report> {
        self.entries.read().await.get(report_id).map(|e| e.report.clone())
    }

    pub async fn marker_for(&self, report_id: &str) -> Option<MarkerHandle> {
        self.entries.read().await.get(report_id).map(|e| e.marker)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// The report list, newest first.
    pub async fn reports(&self) -> Vec<Report> {
        let mut reports: Vec<Report> = self.entries.read().await.values().map(|e| e.report.clone()).collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        reports
    }
}

#[async_trait]
impl SessionObserver for MarkerRegistry {
    async fn on_sign_out(&self) {
        self.clear().await;
    }
}
