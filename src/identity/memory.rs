//! In-process identity service with hashed secrets and expiring tokens.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{IdentityError, IdentityGrant, IdentityService, SessionToken};
use crate::model::{Principal, Role};

struct Account {
    principal: Principal,
    secret_hash: String,
}

struct IssuedToken {
    principal_id: String,
    expires_at: DateTime<Utc>,
}

pub struct InMemoryIdentityService {
    accounts: RwLock<HashMap<String, Account>>,
    tokens: RwLock<HashMap<SessionToken, IssuedToken>>,
    ttl: Duration,
    offline: AtomicBool,
}

impl InMemoryIdentityService {
    pub fn new(ttl: Duration) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
            ttl,
            offline: AtomicBool::new(false),
        }
    }

    /// Salt the hash with the identifier so equal secrets hash differently.
    fn hash_secret(identifier: &str, secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(identifier.as_bytes());
        hasher.update(b":");
        hasher.update(secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn register(&self, identifier: &str, secret: &str, display_name: &str, role: Role) -> Principal {
        let principal = Principal::new(identifier, display_name, role);
        let account = Account {
            principal: principal.clone(),
            secret_hash: Self::hash_secret(identifier, secret),
        };
        self.accounts.write().await.insert(identifier.to_string(), account);
        debug!("Registered {} account '{}'", role, identifier);
        principal
    }

    /// Parse `id:secret:role:Display Name;...` seed strings.
    pub async fn seed(&self, accounts: &str) -> usize {
        let mut count = 0;
        for entry in accounts.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let parts: Vec<&str> = entry.splitn(4, ':').collect();
            if parts.len() < 3 {
                tracing::warn!("Skipping malformed account seed '{}'", entry);
                continue;
            }
            let role = match parts[2].parse::<Role>() {
                Ok(role) => role,
                Err(e) => {
                    tracing::warn!("Skipping account seed '{}': {}", parts[0], e);
                    continue;
                }
            };
            let name = parts.get(3).copied().unwrap_or(parts[0]);
            self.register(parts[0], parts[1], name, role).await;
            count += 1;
        }
        count
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Test hook: make a token already expired.
    pub async fn expire(&self, token: &SessionToken) {
        if let Some(issued) = self.tokens.write().await.get_mut(token) {
            issued.expires_at = Utc::now() - Duration::seconds(1);
        }
    }

    fn check_online(&self) -> Result<(), IdentityError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(IdentityError::Unavailable("identity service is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<IdentityGrant, IdentityError> {
        self.check_online()?;
        let principal = {
            let accounts = self.accounts.read().await;
            match accounts.get(identifier.trim()) {
                Some(account) if account.secret_hash == Self::hash_secret(identifier.trim(), secret) => {
                    account.principal.clone()
                }
                // Unknown identifier and wrong secret look the same to the caller.
                _ => return Err(IdentityError::InvalidCredentials),
            }
        };

        let token = SessionToken(Uuid::new_v4().to_string());
        self.tokens.write().await.insert(
            token.clone(),
            IssuedToken {
                principal_id: principal.id.clone(),
                expires_at: Utc::now() + self.ttl,
            },
        );
        info!("Issued session for '{}' ({})", principal.id, principal.role);
        Ok(IdentityGrant { principal, token })
    }

    async fn restore_session(&self, token: &SessionToken) -> Result<Option<Principal>, IdentityError> {
        self.check_online()?;
        let principal_id = {
            let mut tokens = self.tokens.write().await;
            match tokens.get(token) {
                Some(issued) if issued.expires_at > Utc::now() => issued.principal_id.clone(),
                Some(_) => {
                    tokens.remove(token);
                    return Ok(None);
                }
                None => return Ok(None),
            }
        };
        let accounts = self.accounts.read().await;
        Ok(accounts.get(&principal_id).map(|a| a.principal.clone()))
    }

    async fn sign_out(&self, token: &SessionToken) -> Result<(), IdentityError> {
        self.check_online()?;
        self.tokens.write().await.remove(token);
        Ok(())
    }
}
