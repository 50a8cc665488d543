//! Hazard Map Client
//!
//! Field staff mark environmental hazards (debris, overgrowth, dumping) on a
//! map; staff triage and resolve them, everyone else sees a public map.
//! - Session management with persisted tokens
//! - Role-gated report lifecycle (draft, pending, in progress, completed)
//! - Marker registry rebuilt from the report store
//! - Map interaction (placement modes, marker routing, geolocation)

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod interaction;
pub mod lifecycle;
pub mod map;
pub mod model;
pub mod registry;
pub mod session;
pub mod store;
pub mod telemetry;

// Re-exports for convenience
pub use app::HazardApp;
pub use config::HazardConfig;
pub use error::{HazardError, HazardResult};
pub use model::{Location, Principal, Report, ReportKind, ReportStatus, ReportView, Role};
