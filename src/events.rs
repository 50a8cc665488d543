//! Client event bus
//!
//! Asynchronous pub/sub used to tell views (report list, status bar) that
//! something changed. One bus per `HazardApp`; nothing here is global.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{ReportKind, ReportStatus, Role};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum HazardEvent {
    SignedIn { principal_id: String, role: Role },
    SignedOut,
    ReportsLoaded { count: usize },
    DraftPlaced { draft_id: String, kind: ReportKind },
    DraftAbandoned { draft_id: String },
    ReportSubmitted { report_id: String, kind: ReportKind },
    StatusChanged { report_id: String, status: ReportStatus },
    ReportRemoved { report_id: String },
    PlacementModeChanged { mode: Option<ReportKind> },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HazardEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Publish an event to all subscribers. No subscribers is fine.
    pub fn publish(&self, event: HazardEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HazardEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
