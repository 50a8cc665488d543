//! Session Manager
//!
//! Holds the single current principal (or none). Every privileged operation
//! checks that the principal it was handed is still the current one, so a
//! principal captured before sign-out can never act afterwards.

mod token;

pub use token::{PersistedSession, SessionTokenFile};

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{HazardError, HazardResult};
use crate::events::{EventBus, HazardEvent};
use crate::identity::{IdentityService, SessionToken};
use crate::model::Principal;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
    /// Persist the session token so `restore` can pick it up next start.
    pub remember: bool,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
            remember: false,
        }
    }

    pub fn remembered(mut self) -> Self {
        self.remember = true;
        self
    }
}

/// Components holding per-session state. Called, in registration order,
/// before `sign_out` returns.
#[async_trait]
pub trait SessionObserver: Send + Sync {
    async fn on_sign_out(&self);
}

struct ActiveSession {
    principal: Principal,
    token: SessionToken,
}

pub struct SessionManager {
    identity: Arc<dyn IdentityService>,
    token_file: Option<SessionTokenFile>,
    current: RwLock<Option<ActiveSession>>,
    epoch: AtomicU64,
    observers: RwLock<Vec<Weak<dyn SessionObserver>>>,
    events: EventBus,
}

impl SessionManager {
    pub fn new(identity: Arc<dyn IdentityService>, token_file: Option<SessionTokenFile>, events: EventBus) -> Self {
        Self {
            identity,
            token_file,
            current: RwLock::new(None),
            epoch: AtomicU64::new(0),
            observers: RwLock::new(Vec::new()),
            events,
        }
    }

    pub async fn register_observer(&self, observer: Weak<dyn SessionObserver>) {
        self.observers.write().await.push(observer);
    }

    pub async fn current(&self) -> Option<Principal> {
        self.current.read().await.as_ref().map(|s| s.principal.clone())
    }

    /// Bumped on every sign-in, restore and sign-out.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// True only for the principal handed out by the active sign-in. The
    /// same account signed in again is a different session.
    pub async fn is_current(&self, principal: &Principal) -> bool {
        self.current
            .read()
            .await
            .as_ref()
            .is_some_and(|s| s.principal == *principal)
    }

    /// Reject principals left over from an earlier session. `None` (the
    /// anonymous viewer) is always acceptable here; role gates come later.
    pub async fn check_acting(&self, acting: Option<&Principal>) -> HazardResult<()> {
        match acting {
            Some(principal) if !self.is_current(principal).await => Err(HazardError::Unauthorized(format!(
                "session for '{}' is no longer active",
                principal.id
            ))),
            _ => Ok(()),
        }
    }

    /// Credentials are checked before anything else happens, so a failed
    /// attempt leaves the active session untouched. A successful one ends
    /// the previous session (observers included) before installing itself.
    pub async fn sign_in(&self, credentials: &Credentials) -> HazardResult<Principal> {
        let grant = match self.identity.sign_in(&credentials.identifier, &credentials.secret).await {
            Ok(grant) => grant,
            Err(e) => {
                warn!("Sign-in failed: {}", e);
                return Err(e.into());
            }
        };

        if self.current.read().await.is_some() {
            debug!("Replacing the active session");
            self.sign_out().await;
        }
        let principal = self.install(grant.principal, grant.token.clone()).await;

        if let Some(file) = &self.token_file {
            let persisted = if credentials.remember {
                file.save(&grant.token, &principal.id).await
            } else {
                file.clear().await
            };
            if let Err(e) = persisted {
                warn!("Could not update session file: {:#}", e);
            }
        }

        info!("Signed in as '{}' ({})", principal.id, principal.role);
        self.events.publish(HazardEvent::SignedIn {
            principal_id: principal.id.clone(),
            role: principal.role,
        });
        Ok(principal)
    }

    async fn install(&self, principal: Principal, token: SessionToken) -> Principal {
        let mut current = self.current.write().await;
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let principal = principal.in_session(epoch);
        *current = Some(ActiveSession {
            principal: principal.clone(),
            token,
        });
        principal
    }

    /// Resolve a persisted token into a principal. Never fails: a bad token
    /// is discarded, an unreachable backend just means "no session yet".
    pub async fn restore(&self) -> Option<Principal> {
        if let Some(principal) = self.current().await {
            return Some(principal);
        }
        let file = self.token_file.as_ref()?;

        let persisted = match file.load().await {
            Ok(Some(persisted)) => persisted,
            Ok(None) => return None,
            Err(e) => {
                warn!("Discarding unreadable session file: {:#}", e);
                self.discard_token(file).await;
                return None;
            }
        };

        match self.identity.restore_session(&persisted.token).await {
            Ok(Some(principal)) => {
                let principal = self.install(principal, persisted.token).await;
                info!("Restored session for '{}' ({})", principal.id, principal.role);
                self.events.publish(HazardEvent::SignedIn {
                    principal_id: principal.id.clone(),
                    role: principal.role,
                });
                Some(principal)
            }
            Ok(None) => {
                info!("Persisted session expired or revoked, discarding");
                self.discard_token(file).await;
                None
            }
            Err(e) => {
                warn!("Could not restore session, keeping token for later: {}", e);
                None
            }
        }
    }

    pub async fn sign_out(&self) {
        let previous = {
            let mut current = self.current.write().await;
            self.epoch.fetch_add(1, Ordering::SeqCst);
            current.take()
        };

        if let Some(session) = &previous {
            if let Err(e) = self.identity.sign_out(&session.token).await {
                warn!("Token revocation failed, dropping it locally anyway: {}", e);
            }
        }
        if let Some(file) = &self.token_file {
            self.discard_token(file).await;
        }

        let observers: Vec<Arc<dyn SessionObserver>> = {
            let mut observers = self.observers.write().await;
            observers.retain(|o| o.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };
        for observer in observers {
            observer.on_sign_out().await;
        }

        if let Some(session) = previous {
            info!("Signed out '{}'", session.principal.id);
            self.events.publish(HazardEvent::SignedOut);
        }
    }

    async fn discard_token(&self, file: &SessionTokenFile) {
        if let Err(e) = file.clear().await {
            warn!("Could not remove session file: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::InMemoryIdentityService;
    use crate::model::Role;
    use chrono::Duration;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    async fn identity() -> Arc<InMemoryIdentityService> {
        let svc = Arc::new(InMemoryIdentityService::new(Duration::hours(1)));
        svc.register("ana", "pw", "Ana", Role::Admin).await;
        svc.register("joao", "pw2", "João", Role::Employee).await;
        svc
    }

    struct CountingObserver(AtomicUsize);

    #[async_trait]
    impl SessionObserver for CountingObserver {
        async fn on_sign_out(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_sign_in_sign_out() {
        let manager = SessionManager::new(identity().await, None, EventBus::new());
        let observer = Arc::new(CountingObserver(AtomicUsize::new(0)));
        let weak: Weak<dyn SessionObserver> = Arc::downgrade(&(observer.clone() as Arc<dyn SessionObserver>));
        manager.register_observer(weak).await;

        let ana = manager.sign_in(&Credentials::new("ana", "pw")).await.unwrap();
        assert_eq!(ana.role, Role::Admin);
        assert!(manager.is_current(&ana).await);

        manager.sign_out().await;
        assert!(manager.current().await.is_none());
        assert!(!manager.is_current(&ana).await);
        assert_eq!(observer.0.load(Ordering::SeqCst), 1);
        assert!(matches!(
            manager.check_acting(Some(&ana)).await,
            Err(HazardError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_repeated_wrong_password_never_locks_out() {
        let manager = SessionManager::new(identity().await, None, EventBus::new());
        for _ in 0..3 {
            assert_eq!(
                manager.sign_in(&Credentials::new("ana", "wrong")).await,
                Err(HazardError::InvalidCredentials)
            );
        }
        assert!(manager.current().await.is_none());
        assert!(manager.sign_in(&Credentials::new("ana", "pw")).await.is_ok());
    }

    #[tokio::test]
    async fn test_second_sign_in_replaces_first() {
        let manager = SessionManager::new(identity().await, None, EventBus::new());
        let ana = manager.sign_in(&Credentials::new("ana", "pw")).await.unwrap();
        let before = manager.epoch();
        let joao = manager.sign_in(&Credentials::new("joao", "pw2")).await.unwrap();

        assert!(manager.epoch() > before);
        assert!(!manager.is_current(&ana).await);
        assert!(manager.is_current(&joao).await);
    }

    #[tokio::test]
    async fn test_failed_second_sign_in_keeps_active_session() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("session.json");
        let manager = SessionManager::new(identity().await, Some(SessionTokenFile::new(path.clone())), EventBus::new());
        let observer = Arc::new(CountingObserver(AtomicUsize::new(0)));
        let weak: Weak<dyn SessionObserver> = Arc::downgrade(&(observer.clone() as Arc<dyn SessionObserver>));
        manager.register_observer(weak).await;

        let joao = manager.sign_in(&Credentials::new("joao", "pw2").remembered()).await.unwrap();
        let epoch = manager.epoch();
        assert_eq!(
            manager.sign_in(&Credentials::new("ana", "WRONG")).await,
            Err(HazardError::InvalidCredentials)
        );

        assert_eq!(manager.current().await, Some(joao.clone()));
        assert!(manager.check_acting(Some(&joao)).await.is_ok());
        assert_eq!(manager.epoch(), epoch);
        assert_eq!(observer.0.load(Ordering::SeqCst), 0);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_same_account_sign_in_is_a_new_session() {
        let manager = SessionManager::new(identity().await, None, EventBus::new());
        let first = manager.sign_in(&Credentials::new("ana", "pw")).await.unwrap();
        manager.sign_out().await;
        let second = manager.sign_in(&Credentials::new("ana", "pw")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_ne!(first.session(), second.session());
        assert!(manager.is_current(&second).await);
        assert!(matches!(
            manager.check_acting(Some(&first)).await,
            Err(HazardError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_restore_from_remembered_token() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("session.json");
        let svc = identity().await;

        let first = SessionManager::new(svc.clone(), Some(SessionTokenFile::new(path.clone())), EventBus::new());
        first.sign_in(&Credentials::new("joao", "pw2").remembered()).await.unwrap();
        assert!(path.exists());

        // A fresh process with the same token file.
        let second = SessionManager::new(svc.clone(), Some(SessionTokenFile::new(path.clone())), EventBus::new());
        let restored = second.restore().await.unwrap();
        assert_eq!(restored.id, "joao");
    }

    #[tokio::test]
    async fn test_restore_discards_expired_token() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("session.json");
        let svc = identity().await;
        let file = SessionTokenFile::new(path.clone());
        let grant = svc.sign_in("ana", "pw").await.unwrap();
        file.save(&grant.token, "ana").await.unwrap();
        svc.expire(&grant.token).await;

        let manager = SessionManager::new(svc, Some(SessionTokenFile::new(path.clone())), EventBus::new());
        assert!(manager.restore().await.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_restore_keeps_token_when_backend_down() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("session.json");
        let svc = identity().await;
        let grant = svc.sign_in("ana", "pw").await.unwrap();
        SessionTokenFile::new(path.clone()).save(&grant.token, "ana").await.unwrap();

        svc.set_offline(true);
        let manager = SessionManager::new(svc.clone(), Some(SessionTokenFile::new(path.clone())), EventBus::new());
        assert!(manager.restore().await.is_none());
        assert!(path.exists());

        svc.set_offline(false);
        assert_eq!(manager.restore().await.unwrap().id, "ana");
    }

    #[tokio::test]
    async fn test_restore_discards_garbage_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("session.json");
        std::fs::write(&path, "garbage").unwrap();

        let manager = SessionManager::new(identity().await, Some(SessionTokenFile::new(path.clone())), EventBus::new());
        assert!(manager.restore().await.is_none());
        assert!(!path.exists());
    }
}
