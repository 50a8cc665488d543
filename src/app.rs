//! Application wiring
//!
//! `HazardApp` owns one map's worth of components and the order in which
//! they are reset on sign-out: interaction layer, drafts, then markers.

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::HazardConfig;
use crate::error::HazardResult;
use crate::events::EventBus;
use crate::identity::IdentityService;
use crate::interaction::{Geolocator, MapInteractionLayer};
use crate::lifecycle::ReportLifecycleController;
use crate::map::MapWidget;
use crate::model::{Location, Principal};
use crate::registry::MarkerRegistry;
use crate::session::{Credentials, SessionManager, SessionObserver, SessionTokenFile};
use crate::store::ReportStore;

pub struct HazardApp {
    events: EventBus,
    session: Arc<SessionManager>,
    registry: Arc<MarkerRegistry>,
    controller: Arc<ReportLifecycleController>,
    interaction: Arc<MapInteractionLayer>,
    map: Arc<dyn MapWidget>,
    center: Location,
    zoom: u8,
}

impl HazardApp {
    pub async fn new(
        config: &HazardConfig,
        identity: Arc<dyn IdentityService>,
        store: Arc<dyn ReportStore>,
        map: Arc<dyn MapWidget>,
        geolocator: Option<Arc<dyn Geolocator>>,
    ) -> Self {
        let events = EventBus::new();
        let token_file = SessionTokenFile::new(config.session_file.clone());
        let session = Arc::new(SessionManager::new(identity, Some(token_file), events.clone()));
        let registry = Arc::new(MarkerRegistry::new(store.clone(), map.clone(), events.clone()));
        let controller = Arc::new(ReportLifecycleController::new(
            session.clone(),
            store,
            registry.clone(),
            config.max_photo_bytes,
            events.clone(),
        ));
        let interaction = Arc::new(MapInteractionLayer::new(
            session.clone(),
            controller.clone(),
            map.clone(),
            geolocator,
            events.clone(),
        ));

        let observers: [Arc<dyn SessionObserver>; 3] = [interaction.clone(), controller.clone(), registry.clone()];
        for observer in &observers {
            session.register_observer(Arc::downgrade(observer)).await;
        }

        Self {
            events,
            session,
            registry,
            controller,
            interaction,
            map,
            center: config.map_center,
            zoom: config.map_zoom,
        }
    }

    /// Restore any remembered session, centre the map and load markers.
    pub async fn start(&self) -> HazardResult<Option<Principal>> {
        let principal = self.session.restore().await;
        self.map.set_view(self.center, self.zoom);
        self.registry.load(principal.as_ref()).await?;
        Ok(principal)
    }

    /// A failed marker load after a good sign-in is logged, not returned;
    /// `reload` recovers it.
    pub async fn sign_in(&self, credentials: &Credentials) -> HazardResult<Principal> {
        let principal = self.session.sign_in(credentials).await?;
        if let Err(e) = self.registry.load(Some(&principal)).await {
            warn!("Signed in but could not load reports: {}", e);
        }
        Ok(principal)
    }

    /// Tear the session down, then show the public map again.
    pub async fn sign_out(&self) {
        self.session.sign_out().await;
        if let Err(e) = self.registry.load(None).await {
            warn!("Could not reload the public map: {}", e);
        }
        info!("Back on the public map");
    }

    pub async fn reload(&self) -> HazardResult<usize> {
        let principal = self.session.current().await;
        self.registry.load(principal.as_ref()).await
    }

    pub async fn current(&self) -> Option<Principal> {
        self.session.current().await
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn registry(&self) -> &Arc<MarkerRegistry> {
        &self.registry
    }

    pub fn controller(&self) -> &Arc<ReportLifecycleController> {
        &self.controller
    }

    pub fn interaction(&self) -> &Arc<MapInteractionLayer> {
        &self.interaction
    }
}
