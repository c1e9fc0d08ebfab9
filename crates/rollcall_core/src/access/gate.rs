//! Role-based authorization gate for meeting actions.

use crate::model::team::{TeamId, TeamRole, UserId};
use crate::repo::membership_repo::{MembershipAuthority, MembershipRepoError};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller-initiated action guarded by a minimum team role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeetingAction {
    CreateMeeting,
    DeleteMeeting,
    StartMeeting,
    EndMeeting,
    StartAttendance,
    EndAttendance,
    ViewAttendance,
    ViewMeeting,
    ListMeetings,
    MarkAttendance,
}

impl MeetingAction {
    /// Stable string id used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateMeeting => "create_meeting",
            Self::DeleteMeeting => "delete_meeting",
            Self::StartMeeting => "start_meeting",
            Self::EndMeeting => "end_meeting",
            Self::StartAttendance => "start_attendance",
            Self::EndAttendance => "end_attendance",
            Self::ViewAttendance => "view_attendance",
            Self::ViewMeeting => "view_meeting",
            Self::ListMeetings => "list_meetings",
            Self::MarkAttendance => "mark_attendance",
        }
    }

    /// Lowest role allowed to perform this action.
    pub fn required_role(self) -> TeamRole {
        match self {
            Self::CreateMeeting | Self::DeleteMeeting => TeamRole::SuperAdmin,
            Self::StartMeeting
            | Self::EndMeeting
            | Self::StartAttendance
            | Self::EndAttendance
            | Self::ViewAttendance => TeamRole::Admin,
            Self::ViewMeeting | Self::ListMeetings | Self::MarkAttendance => TeamRole::Member,
        }
    }
}

impl Display for MeetingAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gate rejection: the caller lacks the role the action requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied {
    pub action: MeetingAction,
    pub team_id: TeamId,
    pub user_id: UserId,
    pub required: TeamRole,
    /// `None` when the caller is not a member of the team at all.
    pub actual: Option<TeamRole>,
}

impl Display for AccessDenied {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.actual {
            Some(actual) => write!(
                f,
                "{} requires role {} in team {}, caller has {}",
                self.action, self.required, self.team_id, actual
            ),
            None => write!(
                f,
                "{} requires role {} in team {}, caller is not a member",
                self.action, self.required, self.team_id
            ),
        }
    }
}

impl Error for AccessDenied {}

/// Gate evaluation failure.
#[derive(Debug)]
pub enum GateError {
    Denied(AccessDenied),
    /// Role lookup itself failed.
    Membership(MembershipRepoError),
}

impl Display for GateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denied(err) => write!(f, "{err}"),
            Self::Membership(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Denied(err) => Some(err),
            Self::Membership(err) => Some(err),
        }
    }
}

impl From<MembershipRepoError> for GateError {
    fn from(value: MembershipRepoError) -> Self {
        Self::Membership(value)
    }
}

/// Deny-by-default gate evaluated before any lifecycle operation.
///
/// The gate only answers "may this caller do this in this team"; it never
/// looks at meetings, and the engine behind it never looks at roles.
pub struct AuthorizationGate<M: MembershipAuthority> {
    membership: M,
}

impl<M: MembershipAuthority> AuthorizationGate<M> {
    pub fn new(membership: M) -> Self {
        Self { membership }
    }

    /// Resolves the caller's role and checks it against `action`.
    ///
    /// Returns the caller's role on success.
    pub fn authorize(
        &self,
        team_id: TeamId,
        user_id: UserId,
        action: MeetingAction,
    ) -> Result<TeamRole, GateError> {
        let required = action.required_role();
        let actual = self.membership.role_of(team_id, user_id)?;

        match actual {
            Some(role) if role.satisfies(required) => {
                debug!(
                    "event=access_granted module=access status=ok action={} team_id={} user_id={} role={}",
                    action, team_id, user_id, role
                );
                Ok(role)
            }
            _ => {
                warn!(
                    "event=access_denied module=access status=denied action={} team_id={} user_id={} required={} actual={}",
                    action,
                    team_id,
                    user_id,
                    required,
                    actual.map_or("none", TeamRole::as_str)
                );
                Err(GateError::Denied(AccessDenied {
                    action,
                    team_id,
                    user_id,
                    required,
                    actual,
                }))
            }
        }
    }
}
