//! Team and membership domain model.
//!
//! # Responsibility
//! - Define team identity and the per-team role ladder.
//! - Provide stable string ids for role persistence.
//!
//! # Invariants
//! - Role privilege is totally ordered: `Member < Admin < SuperAdmin`.
//! - A role is scoped to one team and says nothing about any other team.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable team identifier.
pub type TeamId = Uuid;

/// Stable user (principal) identifier.
pub type UserId = Uuid;

/// Privilege level of one member within one team.
///
/// Variant order is the privilege order, so "at least admin" is a plain
/// `role >= TeamRole::Admin` comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Member,
    Admin,
    SuperAdmin,
}

/// Persisted string value for member role.
pub const TEAM_ROLE_MEMBER: &str = "member";
/// Persisted string value for admin role.
pub const TEAM_ROLE_ADMIN: &str = "admin";
/// Persisted string value for super-admin role.
pub const TEAM_ROLE_SUPER_ADMIN: &str = "super_admin";

impl TeamRole {
    /// Stable string id used in storage and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => TEAM_ROLE_MEMBER,
            Self::Admin => TEAM_ROLE_ADMIN,
            Self::SuperAdmin => TEAM_ROLE_SUPER_ADMIN,
        }
    }

    /// Returns whether this role grants at least `required` privilege.
    pub fn satisfies(self, required: TeamRole) -> bool {
        self >= required
    }
}

impl Display for TeamRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses one role from its persisted string value.
pub fn parse_team_role(value: &str) -> Result<TeamRole, TeamRoleParseError> {
    match value {
        TEAM_ROLE_MEMBER => Ok(TeamRole::Member),
        TEAM_ROLE_ADMIN => Ok(TeamRole::Admin),
        TEAM_ROLE_SUPER_ADMIN => Ok(TeamRole::SuperAdmin),
        other => Err(TeamRoleParseError(other.to_string())),
    }
}

/// Unknown role string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRoleParseError(pub String);

impl Display for TeamRoleParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported team role: {}", self.0)
    }
}

impl Error for TeamRoleParseError {}

/// Team read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
}

impl Team {
    /// Creates a team record with a generated id.
    pub fn new(name: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at,
        }
    }
}

/// One (team, user) membership with its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub team_id: TeamId,
    pub user_id: UserId,
    pub role: TeamRole,
}
