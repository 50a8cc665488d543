//! Session token persistence
//!
//! The only client-side state that survives a restart. Anything that fails to
//! parse is treated as "no token".

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;

use crate::identity::SessionToken;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedSession {
    pub token: SessionToken,
    pub principal_id: String,
    pub saved_at: DateTime<Utc>,
}

/// A single JSON file holding at most one remembered session.
pub struct SessionTokenFile {
    location: PathBuf,
}

impl SessionTokenFile {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self { location: location.into() }
    }

    /// Written to a sibling file first and renamed into place, so a crash
    /// mid-write never leaves half a token behind.
    pub async fn save(&self, token: &SessionToken, principal_id: &str) -> Result<()> {
        let record = PersistedSession {
            token: token.clone(),
            principal_id: principal_id.to_string(),
            saved_at: Utc::now(),
        };
        let body = serde_json::to_vec(&record).context("Encoding session token")?;

        let staging = self.location.with_extension("tmp");
        fs::write(&staging, body)
            .await
            .with_context(|| format!("Writing {}", staging.display()))?;
        fs::rename(&staging, &self.location)
            .await
            .with_context(|| format!("Replacing {}", self.location.display()))?;
        Ok(())
    }

    /// `Ok(None)` when there is no file. A file that exists but does not
    /// parse is an error so the caller can discard it.
    pub async fn load(&self) -> Result<Option<PersistedSession>> {
        let body = match fs::read(&self.location).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Reading {}", self.location.display())),
        };
        let record = serde_json::from_slice(&body)
            .with_context(|| format!("{} is not a session record", self.location.display()))?;
        Ok(Some(record))
    }

    /// Removing a file that is already gone is fine.
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.location).await {
            Err(e) if e.kind() != ErrorKind::NotFound => {
                Err(e).with_context(|| format!("Removing {}", self.location.display()))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn token_file() -> (TempDir, PathBuf, SessionTokenFile) {
        let dir = TempDir::new().unwrap();
        let location = dir.path().join("session.json");
        let file = SessionTokenFile::new(location.clone());
        (dir, location, file)
    }

    #[tokio::test]
    async fn test_remembered_token_lifecycle() {
        let (_dir, location, file) = token_file();
        assert_eq!(file.load().await.unwrap(), None);

        file.save(&SessionToken("tok-1".into()), "ana").await.unwrap();
        let record = file.load().await.unwrap().unwrap();
        assert_eq!(record.token, SessionToken("tok-1".into()));
        assert_eq!(record.principal_id, "ana");
        assert!(!location.with_extension("tmp").exists());

        file.save(&SessionToken("tok-2".into()), "joao").await.unwrap();
        assert_eq!(file.load().await.unwrap().unwrap().principal_id, "joao");

        file.clear().await.unwrap();
        file.clear().await.unwrap();
        assert!(!location.exists());
    }

    #[tokio::test]
    async fn test_unparseable_file_is_reported() {
        let (_dir, location, file) = token_file();
        std::fs::write(&location, "{not json").unwrap();
        assert!(file.load().await.is_err());
    }
}
