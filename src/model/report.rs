//! Report records, kinds and glyphs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Role;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    DebrisRubble,
    OrganicWaste,
    OvergrownVegetation,
    DryVegetation,
    Unknown,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::DebrisRubble,
        ReportKind::OrganicWaste,
        ReportKind::OvergrownVegetation,
        ReportKind::DryVegetation,
        ReportKind::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::DebrisRubble => "debris_rubble",
            ReportKind::OrganicWaste => "organic_waste",
            ReportKind::OvergrownVegetation => "overgrown_vegetation",
            ReportKind::DryVegetation => "dry_vegetation",
            ReportKind::Unknown => "unknown",
        }
    }

    /// The only place glyphs are decided. List and map both call this.
    pub const fn glyph(self) -> Glyph {
        match self {
            ReportKind::DebrisRubble => Glyph { color: "#8b5a2b", icon: "🧱", label: "Debris / rubble" },
            ReportKind::OrganicWaste => Glyph { color: "#2f855a", icon: "🍂", label: "Organic waste" },
            ReportKind::OvergrownVegetation => Glyph { color: "#38a169", icon: "🌿", label: "Overgrown vegetation" },
            ReportKind::DryVegetation => Glyph { color: "#d69e2e", icon: "🌾", label: "Dry vegetation" },
            ReportKind::Unknown => Glyph { color: "#718096", icon: "❓", label: "Unknown" },
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| format!("unknown report kind '{}'", s))
    }
}

/// Visual identity of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Glyph {
    pub color: &'static str,
    pub icon: &'static str,
    pub label: &'static str,
}

impl Glyph {
    /// The "you are here" marker, not tied to any report.
    pub const USER_LOCATION: Glyph = Glyph { color: "#48bb78", icon: "📍", label: "Your location" };
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    InProgress,
    Completed,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Completed => "completed",
        }
    }

    /// Forward-only. Staying put is allowed and handled as a no-op by callers.
    pub fn can_advance_to(self, next: ReportStatus) -> bool {
        next >= self
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(ReportStatus::Pending),
            "in_progress" => Ok(ReportStatus::InProgress),
            "completed" => Ok(ReportStatus::Completed),
            other => Err(format!("unknown report status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub id: String,
    pub kind: ReportKind,
    pub location: Location,
    pub status: ReportStatus,
    pub description: String,
    pub priority: Option<String>,
    pub photo_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl Report {
    pub fn glyph(&self) -> Glyph {
        self.kind.glyph()
    }
}

/// Mutable fields of a stored report. Kind and location are fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportPatch {
    pub status: Option<ReportStatus>,
}

impl ReportPatch {
    pub fn status(status: ReportStatus) -> Self {
        Self { status: Some(status) }
    }

    pub fn apply(&self, report: &mut Report) {
        if let Some(status) = self.status {
            report.status = status;
        }
    }
}

/// What a given viewer is allowed to see of a report.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ReportView {
    Public {
        id: String,
        kind: ReportKind,
        status: ReportStatus,
        created_at: DateTime<Utc>,
    },
    Full(Report),
}

impl ReportView {
    pub fn for_role(report: &Report, role: Role) -> Self {
        if role.sees_full_record() {
            ReportView::Full(report.clone())
        } else {
            ReportView::Public {
                id: report.id.clone(),
                kind: report.kind,
                status: report.status,
                created_at: report.created_at,
            }
        }
    }

    pub fn status(&self) -> ReportStatus {
        match self {
            ReportView::Public { status, .. } => *status,
            ReportView::Full(report) => report.status,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, ReportView::Full(_))
    }
}
