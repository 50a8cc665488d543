//! Device geolocation boundary

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::model::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the device may return.
    pub maximum_age: Duration,
}

impl PositionRequest {
    /// GPS, never cached.
    pub const HIGH: PositionRequest = PositionRequest {
        high_accuracy: true,
        timeout: Duration::from_secs(15),
        maximum_age: Duration::ZERO,
    };

    /// Wi-Fi/cell, a minute-old fix is fine.
    pub const LOW: PositionRequest = PositionRequest {
        high_accuracy: false,
        timeout: Duration::from_secs(10),
        maximum_age: Duration::from_secs(60),
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub location: Location,
    /// Radius in metres.
    pub accuracy_m: f64,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeoError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("timed out")]
    Timeout,
}

#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self, request: PositionRequest) -> Result<Fix, GeoError>;
}

/// High accuracy first; only a timeout earns a second, low-accuracy try.
pub async fn locate_with_fallback(geolocator: &dyn Geolocator) -> Result<Fix, GeoError> {
    match geolocator.current_position(PositionRequest::HIGH).await {
        Err(GeoError::Timeout) => {
            warn!("High-accuracy fix timed out, retrying with reduced accuracy");
            geolocator.current_position(PositionRequest::LOW).await
        }
        other => other,
    }
}
