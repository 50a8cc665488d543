//! Drafts: placed on the map, not yet persisted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{HazardError, HazardResult};
use crate::model::{Location, Principal, ReportKind};
use crate::store::PhotoUpload;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Draft {
    pub id: String,
    pub kind: ReportKind,
    pub location: Location,
    pub owner: Principal,
    /// Session epoch the draft was placed in; drafts never cross sessions.
    pub session_epoch: u64,
    pub placed_at: DateTime<Utc>,
}

/// The form filled in for a draft.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub description: String,
    pub priority: Option<String>,
    pub photo: Option<PhotoUpload>,
}

impl Submission {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn with_photo(mut self, photo: PhotoUpload) -> Self {
        self.photo = Some(photo);
        self
    }

    /// Trim fields and reject what the store must never see.
    pub(crate) fn normalized(self, max_photo_bytes: usize) -> HazardResult<Submission> {
        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(HazardError::Validation("description is required".to_string()));
        }
        let priority = self
            .priority
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        if let Some(photo) = &self.photo {
            if photo.bytes.is_empty() {
                return Err(HazardError::Validation("photo is empty".to_string()));
            }
            if photo.bytes.len() > max_photo_bytes {
                return Err(HazardError::Validation(format!(
                    "photo is {} bytes, limit is {}",
                    photo.bytes.len(),
                    max_photo_bytes
                )));
            }
        }
        Ok(Submission {
            description,
            priority,
            photo: self.photo,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DraftState {
    Open,
    Submitting,
}
