//! Principals and roles

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of roles. Unauthenticated viewers have no principal at all
/// and are treated as `Citizen`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    Employee,
    Admin,
}

impl Role {
    /// May place reports, set a placement mode, acknowledge and complete.
    pub fn can_triage(self) -> bool {
        match self {
            Role::Employee | Role::Admin => true,
            Role::Citizen => false,
        }
    }

    /// May delete reports.
    pub fn can_remove(self) -> bool {
        match self {
            Role::Admin => true,
            Role::Employee | Role::Citizen => false,
        }
    }

    /// May see description, priority and photo.
    pub fn sees_full_record(self) -> bool {
        self.can_triage()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Employee => "employee",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "citizen" => Ok(Role::Citizen),
            "employee" => Ok(Role::Employee),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// An authenticated identity. Immutable for the lifetime of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub display_name: String,
    pub role: Role,
    /// Sign-in this principal was issued for; 0 until a session installs it.
    #[serde(skip)]
    session: u64,
}

impl Principal {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            role,
            session: 0,
        }
    }

    pub(crate) fn in_session(mut self, session: u64) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> u64 {
        self.session
    }
}

/// Effective role of an optional principal.
pub fn role_of(principal: Option<&Principal>) -> Role {
    principal.map_or(Role::Citizen, |p| p.role)
}
