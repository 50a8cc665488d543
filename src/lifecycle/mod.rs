//! Report Lifecycle Controller
//!
//! Draft -> Pending -> InProgress -> Completed, or removed by an admin.
//! Every operation checks the acting principal first and touches nothing on
//! failure. Remote calls are made without holding any lock, and in-memory
//! state is only updated after the store has accepted the change.

mod draft;

pub use draft::{Draft, Submission};

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::{HazardError, HazardResult};
use crate::events::{EventBus, HazardEvent};
use crate::model::{role_of, Location, Principal, Report, ReportKind, ReportPatch, ReportStatus, ReportView};
use crate::registry::MarkerRegistry;
use crate::session::{SessionManager, SessionObserver};
use crate::store::{ReportStore, StoreError};

use draft::DraftState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Triage,
    Remove,
}

struct DraftSlot {
    draft: Draft,
    state: DraftState,
}

pub struct ReportLifecycleController {
    session: Arc<SessionManager>,
    store: Arc<dyn ReportStore>,
    registry: Arc<MarkerRegistry>,
    drafts: RwLock<HashMap<String, DraftSlot>>,
    max_photo_bytes: usize,
    events: EventBus,
}

impl ReportLifecycleController {
    pub fn new(
        session: Arc<SessionManager>,
        store: Arc<dyn ReportStore>,
        registry: Arc<MarkerRegistry>,
        max_photo_bytes: usize,
        events: EventBus,
    ) -> Self {
        Self {
            session,
            store,
            registry,
            drafts: RwLock::new(HashMap::new()),
            max_photo_bytes,
            events,
        }
    }

    async fn require(&self, acting: Option<&Principal>, gate: Gate) -> HazardResult<Principal> {
        self.session.check_acting(acting).await?;
        let role = role_of(acting);
        let allowed = match gate {
            Gate::Triage => role.can_triage(),
            Gate::Remove => role.can_remove(),
        };
        match (acting, allowed, gate) {
            (Some(principal), true, _) => Ok(principal.clone()),
            (_, _, Gate::Remove) => Err(HazardError::Forbidden(format!("{} may not remove reports", role))),
            (_, _, Gate::Triage) => Err(HazardError::Unauthorized(format!("{} may not triage reports", role))),
        }
    }

    /// Start a report at `location`. Only staff may place; the draft stays
    /// local until `submit`.
    #[instrument(skip(self, acting))]
    pub async fn place(&self, location: Location, kind: ReportKind, acting: Option<&Principal>) -> HazardResult<Draft> {
        let owner = self.require(acting, Gate::Triage).await?;
        if !location.is_valid() {
            return Err(HazardError::Validation(format!("{} is not a valid coordinate", location)));
        }

        let draft = Draft {
            id: Uuid::new_v4().to_string(),
            kind,
            location,
            owner,
            session_epoch: self.session.epoch(),
            placed_at: Utc::now(),
        };
        self.drafts.write().await.insert(
            draft.id.clone(),
            DraftSlot {
                draft: draft.clone(),
                state: DraftState::Open,
            },
        );

        debug!("Placed draft {} at {}", draft.id, location);
        self.events.publish(HazardEvent::DraftPlaced {
            draft_id: draft.id.clone(),
            kind,
        });
        Ok(draft)
    }

    /// Persist a draft as a pending report. On any failure the draft stays
    /// open so the user can retry.
    #[instrument(skip(self, submission))]
    pub async fn submit(&self, draft_id: &str, submission: Submission) -> HazardResult<Report> {
        let submission = submission.normalized(self.max_photo_bytes)?;
        let current = self.session.current().await;
        let epoch = self.session.epoch();

        let draft = {
            let mut drafts = self.drafts.write().await;
            let slot = drafts
                .get_mut(draft_id)
                .ok_or_else(|| HazardError::NotFound(format!("draft {}", draft_id)))?;
            if current.as_ref() != Some(&slot.draft.owner) || slot.draft.session_epoch != epoch {
                return Err(HazardError::Unauthorized(format!(
                    "draft {} belongs to another session",
                    draft_id
                )));
            }
            if slot.state == DraftState::Submitting {
                return Err(HazardError::Validation(format!("draft {} is already being submitted", draft_id)));
            }
            slot.state = DraftState::Submitting;
            slot.draft.clone()
        };

        match self.persist(&draft, submission).await {
            Ok(report) => {
                self.drafts.write().await.remove(&draft.id);
                if self.session.epoch() == epoch {
                    self.registry.upsert(report.clone()).await;
                }
                info!("Submitted report {} ({})", report.id, report.kind);
                self.events.publish(HazardEvent::ReportSubmitted {
                    report_id: report.id.clone(),
                    kind: report.kind,
                });
                Ok(report)
            }
            Err(e) => {
                if let Some(slot) = self.drafts.write().await.get_mut(&draft.id) {
                    slot.state = DraftState::Open;
                }
                warn!("Submit of draft {} failed: {}", draft.id, e);
                Err(e)
            }
        }
    }

    async fn persist(&self, draft: &Draft, submission: Submission) -> HazardResult<Report> {
        let photo_ref = match &submission.photo {
            Some(photo) => Some(self.store.upload_photo(photo).await?),
            None => None,
        };

        // The form may have been closed while the photo was uploading.
        if !self.drafts.read().await.contains_key(&draft.id) {
            info!("Draft {} was abandoned during upload, not persisting", draft.id);
            return Err(HazardError::NotFound(format!("draft {} was abandoned", draft.id)));
        }

        let report = Report {
            id: draft.id.clone(),
            kind: draft.kind,
            location: draft.location,
            status: ReportStatus::Pending,
            description: submission.description,
            priority: submission.priority,
            photo_ref,
            created_at: Utc::now(),
            created_by: draft.owner.id.clone(),
        };
        self.store.insert(&report).await?;
        Ok(report)
    }

    /// Close the form for a draft without submitting. Returns whether a
    /// draft was dropped.
    pub async fn abandon(&self, draft_id: &str) -> bool {
        let removed = self.drafts.write().await.remove(draft_id).is_some();
        if removed {
            debug!("Abandoned draft {}", draft_id);
            self.events.publish(HazardEvent::DraftAbandoned {
                draft_id: draft_id.to_string(),
            });
        }
        removed
    }

    pub async fn draft(&self, draft_id: &str) -> Option<Draft> {
        self.drafts.read().await.get(draft_id).map(|s| s.draft.clone())
    }

    pub async fn drafts(&self) -> Vec<Draft> {
        let mut drafts: Vec<Draft> = self.drafts.read().await.values().map(|s| s.draft.clone()).collect();
        drafts.sort_by(|a, b| a.placed_at.cmp(&b.placed_at));
        drafts
    }

    /// Pending -> InProgress.
    #[instrument(skip(self, acting))]
    pub async fn acknowledge(&self, report_id: &str, acting: Option<&Principal>) -> HazardResult<Report> {
        self.require(acting, Gate::Triage).await?;
        self.advance(report_id, ReportStatus::InProgress).await
    }

    /// Pending/InProgress -> Completed. Completing a completed report is a
    /// successful no-op.
    #[instrument(skip(self, acting))]
    pub async fn complete(&self, report_id: &str, acting: Option<&Principal>) -> HazardResult<Report> {
        self.require(acting, Gate::Triage).await?;
        self.advance(report_id, ReportStatus::Completed).await
    }

    async fn advance(&self, report_id: &str, target: ReportStatus) -> HazardResult<Report> {
        let epoch = self.session.epoch();
        let report = self
            .registry
            .get(report_id)
            .await
            .ok_or_else(|| HazardError::NotFound(format!("report {}", report_id)))?;

        if report.status == target {
            debug!("Report {} already {}", report_id, target);
            return Ok(report);
        }
        if !report.status.can_advance_to(target) {
            return Err(HazardError::InvalidTransition(format!(
                "{} -> {} for report {}",
                report.status, target, report_id
            )));
        }

        match self.store.update(report_id, &ReportPatch::status(target)).await {
            Ok(updated) => {
                if self.session.epoch() == epoch {
                    self.registry.upsert(updated.clone()).await;
                }
                info!("Report {} is now {}", report_id, updated.status);
                self.events.publish(HazardEvent::StatusChanged {
                    report_id: report_id.to_string(),
                    status: updated.status,
                });
                Ok(updated)
            }
            Err(StoreError::NotFound(id)) => {
                info!("Report {} is gone from the store, dropping it", id);
                self.registry.evict(&id).await;
                Err(HazardError::NotFound(format!("report {}", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Admin only. A report already gone from the store counts as removed.
    #[instrument(skip(self, acting))]
    pub async fn remove(&self, report_id: &str, acting: Option<&Principal>) -> HazardResult<()> {
        self.require(acting, Gate::Remove).await?;

        match self.store.delete(report_id).await {
            Ok(()) => info!("Removed report {}", report_id),
            Err(StoreError::NotFound(_)) => info!("Report {} was already removed", report_id),
            Err(e) => return Err(e.into()),
        }
        self.registry.evict(report_id).await;
        self.events.publish(HazardEvent::ReportRemoved {
            report_id: report_id.to_string(),
        });
        Ok(())
    }

    /// What `viewer` may see of a report.
    pub async fn view(&self, report_id: &str, viewer: Option<&Principal>) -> HazardResult<ReportView> {
        self.session.check_acting(viewer).await?;
        let report = self
            .registry
            .get(report_id)
            .await
            .ok_or_else(|| HazardError::NotFound(format!("report {}", report_id)))?;
        Ok(ReportView::for_role(&report, role_of(viewer)))
    }
}

#[async_trait]
impl SessionObserver for ReportLifecycleController {
    async fn on_sign_out(&self) {
        let dropped = {
            let mut drafts = self.drafts.write().await;
            let n = drafts.len();
            drafts.clear();
            n
        };
        if dropped > 0 {
            debug!("Dropped {} open drafts on sign-out", dropped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::InMemoryIdentityService;
    use crate::map::RecordingMap;
    use crate::model::Role;
    use crate::session::Credentials;
    use crate::store::{InMemoryReportStore, PhotoUpload};
    use chrono::Duration;

    struct Fixture {
        session: Arc<SessionManager>,
        store: Arc<InMemoryReportStore>,
        registry: Arc<MarkerRegistry>,
        controller: ReportLifecycleController,
    }

    async fn fixture() -> Fixture {
        let identity = Arc::new(InMemoryIdentityService::new(Duration::hours(1)));
        identity.register("ana", "pw", "Ana", Role::Admin).await;
        identity.register("joao", "pw", "João", Role::Employee).await;
        identity.register("cida", "pw", "Cida", Role::Citizen).await;
        let events = EventBus::new();
        let session = Arc::new(SessionManager::new(identity, None, events.clone()));
        let store = Arc::new(InMemoryReportStore::new());
        let map = Arc::new(RecordingMap::new());
        let registry = Arc::new(MarkerRegistry::new(store.clone(), map, events.clone()));
        let controller =
            ReportLifecycleController::new(session.clone(), store.clone(), registry.clone(), 1024, events);
        Fixture { session, store, registry, controller }
    }

    async fn sign_in(f: &Fixture, who: &str) -> Principal {
        f.session.sign_in(&Credentials::new(who, "pw")).await.unwrap()
    }

    fn here() -> Location {
        Location::new(-7.8375, -35.5781)
    }

    #[tokio::test]
    async fn test_citizen_and_anonymous_cannot_place() {
        let f = fixture().await;
        assert!(matches!(
            f.controller.place(here(), ReportKind::Unknown, None).await,
            Err(HazardError::Unauthorized(_))
        ));
        let cida = sign_in(&f, "cida").await;
        assert!(matches!(
            f.controller.place(here(), ReportKind::Unknown, Some(&cida)).await,
            Err(HazardError::Unauthorized(_))
        ));
        assert!(f.controller.drafts().await.is_empty());
        assert_eq!(f.store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_place_submit_pending() {
        let f = fixture().await;
        let joao = sign_in(&f, "joao").await;
        let draft = f.controller.place(here(), ReportKind::OrganicWaste, Some(&joao)).await.unwrap();

        let report = f
            .controller
            .submit(&draft.id, Submission::new("leaves").with_priority("low"))
            .await
            .unwrap();
        assert_eq!(report.id, draft.id);
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.created_by, "joao");
        assert!(f.controller.draft(&draft.id).await.is_none());
        assert_eq!(f.registry.get(&report.id).await, Some(report.clone()));
    }

    #[tokio::test]
    async fn test_submit_failure_keeps_draft_for_retry() {
        let f = fixture().await;
        let joao = sign_in(&f, "joao").await;
        let draft = f.controller.place(here(), ReportKind::DebrisRubble, Some(&joao)).await.unwrap();

        f.store.set_offline(true);
        let err = f.controller.submit(&draft.id, Submission::new("rubble")).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(f.controller.draft(&draft.id).await.is_some());
        assert!(f.registry.is_empty().await);

        f.store.set_offline(false);
        assert!(f.controller.submit(&draft.id, Submission::new("rubble")).await.is_ok());
    }

    #[tokio::test]
    async fn test_submit_with_photo_attaches_reference() {
        let f = fixture().await;
        let ana = sign_in(&f, "ana").await;
        let draft = f.controller.place(here(), ReportKind::DryVegetation, Some(&ana)).await.unwrap();
        let photo = PhotoUpload::new(vec![1, 2, 3, 4], "image/jpeg");

        let report = f
            .controller
            .submit(&draft.id, Submission::new("dry grass").with_photo(photo.clone()))
            .await
            .unwrap();
        let reference = report.photo_ref.clone().unwrap();
        assert_eq!(reference, photo.reference());
        assert_eq!(f.store.photo(&reference).await, Some(photo));
    }

    #[tokio::test]
    async fn test_validation_leaves_draft_open() {
        let f = fixture().await;
        let ana = sign_in(&f, "ana").await;
        let draft = f.controller.place(here(), ReportKind::Unknown, Some(&ana)).await.unwrap();
        assert!(matches!(
            f.controller.submit(&draft.id, Submission::new("")).await,
            Err(HazardError::Validation(_))
        ));
        assert!(f.controller.draft(&draft.id).await.is_some());
        assert_eq!(f.store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_complete_is_idempotent() {
        let f = fixture().await;
        let joao = sign_in(&f, "joao").await;
        let draft = f.controller.place(here(), ReportKind::Unknown, Some(&joao)).await.unwrap();
        let report = f.controller.submit(&draft.id, Submission::new("x")).await.unwrap();

        let first = f.controller.complete(&report.id, Some(&joao)).await.unwrap();
        let writes = f.store.write_count();
        let second = f.controller.complete(&report.id, Some(&joao)).await.unwrap();
        assert_eq!(first.status, ReportStatus::Completed);
        assert_eq!(second.status, ReportStatus::Completed);
        assert_eq!(f.store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_acknowledge_then_no_regression() {
        let f = fixture().await;
        let joao = sign_in(&f, "joao").await;
        let draft = f.controller.place(here(), ReportKind::Unknown, Some(&joao)).await.unwrap();
        let report = f.controller.submit(&draft.id, Submission::new("x")).await.unwrap();

        let acked = f.controller.acknowledge(&report.id, Some(&joao)).await.unwrap();
        assert_eq!(acked.status, ReportStatus::InProgress);
        f.controller.complete(&report.id, Some(&joao)).await.unwrap();
        assert!(matches!(
            f.controller.acknowledge(&report.id, Some(&joao)).await,
            Err(HazardError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn test_complete_failure_changes_nothing() {
        let f = fixture().await;
        let joao = sign_in(&f, "joao").await;
        let draft = f.controller.place(here(), ReportKind::Unknown, Some(&joao)).await.unwrap();
        let report = f.controller.submit(&draft.id, Submission::new("x")).await.unwrap();

        f.store.set_offline(true);
        assert!(f.controller.complete(&report.id, Some(&joao)).await.is_err());
        assert_eq!(f.registry.get(&report.id).await.unwrap().status, ReportStatus::Pending);
    }

    #[tokio::test]
    async fn test_employee_cannot_remove() {
        let f = fixture().await;
        let joao = sign_in(&f, "joao").await;
        let draft = f.controller.place(here(), ReportKind::Unknown, Some(&joao)).await.unwrap();
        let report = f.controller.submit(&draft.id, Submission::new("x")).await.unwrap();

        assert!(matches!(
            f.controller.remove(&report.id, Some(&joao)).await,
            Err(HazardError::Forbidden(_))
        ));
        assert!(matches!(
            f.controller.remove(&report.id, None).await,
            Err(HazardError::Forbidden(_))
        ));
        assert_eq!(f.store.list_all().await.unwrap().len(), 1);
        assert!(f.registry.get(&report.id).await.is_some());
    }

    #[tokio::test]
    async fn test_remove_of_vanished_report_succeeds() {
        let f = fixture().await;
        let ana = sign_in(&f, "ana").await;
        let draft = f.controller.place(here(), ReportKind::Unknown, Some(&ana)).await.unwrap();
        let report = f.controller.submit(&draft.id, Submission::new("x")).await.unwrap();

        f.store.delete(&report.id).await.unwrap();
        f.controller.remove(&report.id, Some(&ana)).await.unwrap();
        assert!(f.registry.get(&report.id).await.is_none());
    }

    #[tokio::test]
    async fn test_view_by_role() {
        let f = fixture().await;
        let ana = sign_in(&f, "ana").await;
        let draft = f.controller.place(here(), ReportKind::Unknown, Some(&ana)).await.unwrap();
        let report = f.controller.submit(&draft.id, Submission::new("secret details")).await.unwrap();

        assert!(f.controller.view(&report.id, Some(&ana)).await.unwrap().is_full());
        assert!(!f.controller.view(&report.id, None).await.unwrap().is_full());
        assert!(matches!(
            f.controller.view("missing", None).await,
            Err(HazardError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stale_principal_rejected_after_sign_out() {
        let f = fixture().await;
        let ana = sign_in(&f, "ana").await;
        f.session.sign_out().await;
        assert!(matches!(
            f.controller.place(here(), ReportKind::Unknown, Some(&ana)).await,
            Err(HazardError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_draft_from_previous_session_cannot_be_submitted() {
        let f = fixture().await;
        let ana = sign_in(&f, "ana").await;
        let draft = f.controller.place(here(), ReportKind::Unknown, Some(&ana)).await.unwrap();
        sign_in(&f, "joao").await;
        assert!(matches!(
            f.controller.submit(&draft.id, Submission::new("x")).await,
            Err(HazardError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_abandon_drops_draft() {
        let f = fixture().await;
        let ana = sign_in(&f, "ana").await;
        let draft = f.controller.place(here(), ReportKind::Unknown, Some(&ana)).await.unwrap();
        assert!(f.controller.abandon(&draft.id).await);
        assert!(!f.controller.abandon(&draft.id).await);
        assert!(matches!(
            f.controller.submit(&draft.id, Submission::new("x")).await,
            Err(HazardError::NotFound(_))
        ));
    }

    /// Which store call the gated store holds until released.
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Hold {
        Upload,
        Insert,
    }

    /// Wraps the in-memory store and parks one kind of call until the test
    /// calls `release`. `entered` fires as soon as the call arrives.
    struct GatedStore {
        inner: InMemoryReportStore,
        hold: Hold,
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    impl GatedStore {
        async fn park(&self, call: Hold) {
            if call == self.hold {
                self.entered.notify_one();
                self.release.notified().await;
            }
        }
    }

    #[async_trait]
    impl ReportStore for GatedStore {
        async fn insert(&self, report: &Report) -> crate::store::StoreResult<String> {
            self.park(Hold::Insert).await;
            self.inner.insert(report).await
        }

        async fn update(&self, id: &str, patch: &ReportPatch) -> crate::store::StoreResult<Report> {
            self.inner.update(id, patch).await
        }

        async fn delete(&self, id: &str) -> crate::store::StoreResult<()> {
            self.inner.delete(id).await
        }

        async fn list_all(&self) -> crate::store::StoreResult<Vec<Report>> {
            self.inner.list_all().await
        }

        async fn upload_photo(&self, photo: &PhotoUpload) -> crate::store::StoreResult<String> {
            self.park(Hold::Upload).await;
            self.inner.upload_photo(photo).await
        }
    }

    struct GatedFixture {
        session: Arc<SessionManager>,
        store: Arc<GatedStore>,
        registry: Arc<MarkerRegistry>,
        controller: Arc<ReportLifecycleController>,
        admin: Principal,
    }

    /// Controller and registry are registered for sign-out like the app does.
    async fn gated_fixture(hold: Hold) -> GatedFixture {
        let identity = Arc::new(InMemoryIdentityService::new(Duration::hours(1)));
        identity.register("ana", "pw", "Ana", Role::Admin).await;
        let events = EventBus::new();
        let session = Arc::new(SessionManager::new(identity, None, events.clone()));
        let store = Arc::new(GatedStore {
            inner: InMemoryReportStore::new(),
            hold,
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let registry = Arc::new(MarkerRegistry::new(store.clone(), Arc::new(RecordingMap::new()), events.clone()));
        let controller = Arc::new(ReportLifecycleController::new(
            session.clone(),
            store.clone(),
            registry.clone(),
            1024,
            events,
        ));
        let observers: [Arc<dyn SessionObserver>; 2] = [controller.clone(), registry.clone()];
        for observer in &observers {
            session.register_observer(Arc::downgrade(observer)).await;
        }
        let admin = session.sign_in(&Credentials::new("ana", "pw")).await.unwrap();
        GatedFixture { session, store, registry, controller, admin }
    }

    fn with_photo(description: &str) -> Submission {
        Submission::new(description).with_photo(PhotoUpload::new(vec![9; 8], "image/jpeg"))
    }

    #[tokio::test]
    async fn test_abandon_during_photo_upload_persists_nothing() {
        let f = gated_fixture(Hold::Upload).await;
        let draft = f.controller.place(here(), ReportKind::DebrisRubble, Some(&f.admin)).await.unwrap();

        let close_form = async {
            f.store.entered.notified().await;
            assert!(f.controller.abandon(&draft.id).await);
            f.store.release.notify_one();
        };
        let (result, ()) = tokio::join!(f.controller.submit(&draft.id, with_photo("telhas")), close_form);

        assert!(matches!(result, Err(HazardError::NotFound(_))));
        assert!(f.store.inner.list_all().await.unwrap().is_empty());
        assert!(f.registry.is_empty().await);
        assert!(f.controller.draft(&draft.id).await.is_none());
    }

    #[tokio::test]
    async fn test_second_submit_of_same_draft_is_rejected() {
        let f = gated_fixture(Hold::Upload).await;
        let draft = f.controller.place(here(), ReportKind::OrganicWaste, Some(&f.admin)).await.unwrap();

        let double_click = async {
            f.store.entered.notified().await;
            let second = f.controller.submit(&draft.id, Submission::new("again")).await;
            f.store.release.notify_one();
            second
        };
        let (first, second) = tokio::join!(f.controller.submit(&draft.id, with_photo("restos")), double_click);

        assert!(matches!(second, Err(HazardError::Validation(_))));
        let report = first.unwrap();
        assert_eq!(report.description, "restos");
        assert_eq!(f.store.inner.list_all().await.unwrap().len(), 1);
        assert_eq!(f.registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_submit_landing_after_sign_out_stays_off_the_map() {
        let f = gated_fixture(Hold::Insert).await;
        let draft = f.controller.place(here(), ReportKind::DryVegetation, Some(&f.admin)).await.unwrap();

        let sign_out = async {
            f.store.entered.notified().await;
            f.session.sign_out().await;
            f.store.release.notify_one();
        };
        let (result, ()) = tokio::join!(f.controller.submit(&draft.id, Submission::new("capim")), sign_out);

        let report = result.unwrap();
        assert_eq!(f.store.inner.list_all().await.unwrap().len(), 1);
        assert!(f.registry.get(&report.id).await.is_none());
        assert!(f.registry.is_empty().await);
    }
}
