//! Domain types shared by every layer

pub mod principal;
pub mod report;

pub use principal::{role_of, Principal, Role};
pub use report::{Glyph, Location, Report, ReportKind, ReportPatch, ReportStatus, ReportView};
