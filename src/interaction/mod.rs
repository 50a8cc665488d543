//! Map Interaction Layer
//!
//! Turns gestures on the map into lifecycle calls. Owns the placement mode
//! and the "you are here" marker; both belong to the current session.

pub mod geo;

pub use geo::{Fix, GeoError, Geolocator, PositionRequest};

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{HazardError, HazardResult};
use crate::events::{EventBus, HazardEvent};
use crate::lifecycle::{Draft, ReportLifecycleController};
use crate::map::{MapWidget, MarkerHandle};
use crate::model::{role_of, Glyph, Location, ReportKind, ReportStatus, ReportView};
use crate::session::{SessionManager, SessionObserver};

pub const LOCATE_ZOOM: u8 = 18;
pub const GO_TO_ZOOM: u8 = 15;

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// No mode, or the viewer may not place reports.
    Ignored,
    /// A draft was placed and its submission form should open.
    DraftOpened(Draft),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageAction {
    Acknowledge,
    Complete,
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerRoute {
    Triage { view: ReportView, actions: Vec<TriageAction> },
    ReadOnly(ReportView),
}

pub struct MapInteractionLayer {
    session: Arc<SessionManager>,
    controller: Arc<ReportLifecycleController>,
    map: Arc<dyn MapWidget>,
    geolocator: Option<Arc<dyn Geolocator>>,
    mode: RwLock<Option<ReportKind>>,
    user_marker: Mutex<Option<MarkerHandle>>,
    events: EventBus,
}

impl MapInteractionLayer {
    pub fn new(
        session: Arc<SessionManager>,
        controller: Arc<ReportLifecycleController>,
        map: Arc<dyn MapWidget>,
        geolocator: Option<Arc<dyn Geolocator>>,
        events: EventBus,
    ) -> Self {
        Self {
            session,
            controller,
            map,
            geolocator,
            mode: RwLock::new(None),
            user_marker: Mutex::new(None),
            events,
        }
    }

    pub async fn mode(&self) -> Option<ReportKind> {
        *self.mode.read().await
    }

    /// Staff may pick a kind; anyone may clear the mode. Anything else is
    /// quietly ignored. Returns whether the mode changed hands.
    pub async fn set_mode(&self, mode: Option<ReportKind>) -> bool {
        let principal = self.session.current().await;
        if mode.is_some() && !role_of(principal.as_ref()).can_triage() {
            debug!("Ignoring placement mode for {}", role_of(principal.as_ref()));
            return false;
        }
        *self.mode.write().await = mode;
        self.events.publish(HazardEvent::PlacementModeChanged { mode });
        true
    }

    pub async fn on_map_click(&self, location: Location) -> HazardResult<ClickOutcome> {
        let Some(kind) = self.mode().await else {
            return Ok(ClickOutcome::Ignored);
        };
        let principal = self.session.current().await;
        if !role_of(principal.as_ref()).can_triage() {
            debug!("Map click at {} ignored for {}", location, role_of(principal.as_ref()));
            return Ok(ClickOutcome::Ignored);
        }
        let draft = self.controller.place(location, kind, principal.as_ref()).await?;
        Ok(ClickOutcome::DraftOpened(draft))
    }

    pub async fn on_marker_click(&self, report_id: &str) -> HazardResult<MarkerRoute> {
        let principal = self.session.current().await;
        let role = role_of(principal.as_ref());
        let view = self.controller.view(report_id, principal.as_ref()).await?;

        if !role.can_triage() {
            return Ok(MarkerRoute::ReadOnly(view));
        }
        let mut actions = match view.status() {
            ReportStatus::Pending => vec![TriageAction::Acknowledge, TriageAction::Complete],
            ReportStatus::InProgress => vec![TriageAction::Complete],
            ReportStatus::Completed => Vec::new(),
        };
        if role.can_remove() {
            actions.push(TriageAction::Remove);
        }
        Ok(MarkerRoute::Triage { view, actions })
    }

    /// Centre on the device position and mark it.
    pub async fn locate(&self) -> HazardResult<Fix> {
        let geolocator = self
            .geolocator
            .as_ref()
            .ok_or_else(|| HazardError::LocationUnavailable("geolocation is not supported".to_string()))?;
        let fix = geo::locate_with_fallback(geolocator.as_ref())
            .await
            .map_err(|e| HazardError::LocationUnavailable(e.to_string()))?;

        info!("Located at {} (±{:.0} m)", fix.location, fix.accuracy_m);
        self.map.set_view(fix.location, LOCATE_ZOOM);
        self.move_user_marker(fix.location).await;
        Ok(fix)
    }

    /// Jump to a known place, e.g. a search result.
    pub async fn go_to(&self, location: Location, label: &str) -> HazardResult<()> {
        if !location.is_valid() {
            return Err(HazardError::Validation(format!("{} is not a valid coordinate", location)));
        }
        debug!("Going to '{}' at {}", label, location);
        self.map.set_view(location, GO_TO_ZOOM);
        self.move_user_marker(location).await;
        Ok(())
    }

    pub async fn user_marker(&self) -> Option<MarkerHandle> {
        *self.user_marker.lock().await
    }

    async fn move_user_marker(&self, location: Location) {
        let mut marker = self.user_marker.lock().await;
        if let Some(old) = marker.take() {
            self.map.remove_marker(old);
        }
        *marker = Some(self.map.place_marker(location, Glyph::USER_LOCATION));
    }
}

#[async_trait]
impl SessionObserver for MapInteractionLayer {
    async fn on_sign_out(&self) {
        *self.mode.write().await = None;
        if let Some(marker) = self.user_marker.lock().await.take() {
            self.map.remove_marker(marker);
        }
    }
}
