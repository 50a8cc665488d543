//! Identity Service boundary
//!
//! Authenticates principals and resolves session tokens. The client never
//! sees secrets after `sign_in` returns.

mod memory;

pub use memory::InMemoryIdentityService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Principal;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

/// Opaque bearer token issued at sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SessionToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityGrant {
    pub principal: Principal,
    pub token: SessionToken,
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn sign_in(&self, identifier: &str, secret: &str) -> Result<IdentityGrant, IdentityError>;

    /// `Ok(None)` when the token is unknown, revoked or expired.
    async fn restore_session(&self, token: &SessionToken) -> Result<Option<Principal>, IdentityError>;

    async fn sign_out(&self, token: &SessionToken) -> Result<(), IdentityError>;
}
