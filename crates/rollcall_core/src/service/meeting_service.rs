//! Meeting lifecycle engine.
//!
//! # Responsibility
//! - Apply lifecycle transitions and the attendance-marking policy.
//! - Run every read-modify-write as one store unit of work.
//! - Announce new meetings to the owning team without failing creation.
//!
//! # Invariants
//! - Every meeting lookup is scoped by team; a meeting of another team is
//!   reported as not found.
//! - The engine never checks roles. Callers go through the gateway.
//! - A `(user, meeting)` attendance record is written at most once.

use crate::access::gate::{AccessDenied, GateError};
use crate::model::attendance::AttendanceRecord;
use crate::model::lifecycle::{MeetingState, TransitionError};
use crate::model::meeting::{Meeting, MeetingDraft, MeetingId, MeetingValidationError};
use crate::model::team::{TeamId, UserId};
use crate::notify::{MeetingNotice, MeetingNotifier};
use crate::repo::meeting_repo::{MeetingListQuery, MeetingRepoError, MeetingRepository};
use crate::repo::membership_repo::{MembershipAuthority, MembershipRepoError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type MeetingServiceResult<T> = Result<T, MeetingServiceError>;

/// Caller-facing error taxonomy of meeting operations.
#[derive(Debug)]
pub enum MeetingServiceError {
    /// Meeting is absent or belongs to another team.
    NotFound(MeetingId),
    /// Team referenced by a create request does not exist.
    TeamNotFound(TeamId),
    /// Lifecycle precondition failed.
    InvalidTransition(TransitionError),
    /// The user already has an attendance record for this meeting.
    DuplicateAttendance {
        user_id: UserId,
        meeting_id: MeetingId,
    },
    /// Caller's team role is below what the action requires.
    Unauthorized(AccessDenied),
    /// Malformed meeting input.
    Validation(MeetingValidationError),
    /// Meeting store failure.
    Repo(MeetingRepoError),
    /// Membership lookup failure.
    Membership(MembershipRepoError),
}

impl MeetingServiceError {
    /// Stable error code used in logs and by transports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "meeting_not_found",
            Self::TeamNotFound(_) => "team_not_found",
            Self::InvalidTransition(err) => err.code(),
            Self::DuplicateAttendance { .. } => "attendance_duplicate",
            Self::Unauthorized(_) => "unauthorized",
            Self::Validation(err) => err.code(),
            Self::Repo(_) => "meeting_store_error",
            Self::Membership(_) => "membership_lookup_error",
        }
    }
}

impl Display for MeetingServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "meeting not found: {id}"),
            Self::TeamNotFound(id) => write!(f, "team not found: {id}"),
            Self::InvalidTransition(err) => write!(f, "{err}"),
            Self::DuplicateAttendance {
                user_id,
                meeting_id,
            } => write!(
                f,
                "attendance already marked for user {user_id} in meeting {meeting_id}"
            ),
            Self::Unauthorized(err) => write!(f, "unauthorized: {err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Membership(err) => write!(f, "{err}"),
        }
    }
}

impl Error for MeetingServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidTransition(err) => Some(err),
            Self::Unauthorized(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Membership(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MeetingRepoError> for MeetingServiceError {
    fn from(value: MeetingRepoError) -> Self {
        match value {
            MeetingRepoError::MeetingNotFound(id) => Self::NotFound(id),
            MeetingRepoError::DuplicateAttendance {
                user_id,
                meeting_id,
            } => Self::DuplicateAttendance {
                user_id,
                meeting_id,
            },
            MeetingRepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<MembershipRepoError> for MeetingServiceError {
    fn from(value: MembershipRepoError) -> Self {
        match value {
            MembershipRepoError::TeamNotFound(id) => Self::TeamNotFound(id),
            other => Self::Membership(other),
        }
    }
}

impl From<GateError> for MeetingServiceError {
    fn from(value: GateError) -> Self {
        match value {
            GateError::Denied(denied) => Self::Unauthorized(denied),
            GateError::Membership(err) => Self::from(err),
        }
    }
}

impl From<TransitionError> for MeetingServiceError {
    fn from(value: TransitionError) -> Self {
        Self::InvalidTransition(value)
    }
}

impl From<MeetingValidationError> for MeetingServiceError {
    fn from(value: MeetingValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Stateless lifecycle engine over a meeting store, a membership authority
/// and a notifier.
pub struct MeetingService<R, M, N> {
    repo: R,
    membership: M,
    notifier: N,
}

impl<R, M, N> MeetingService<R, M, N>
where
    R: MeetingRepository,
    M: MembershipAuthority,
    N: MeetingNotifier,
{
    pub fn new(repo: R, membership: M, notifier: N) -> Self {
        Self {
            repo,
            membership,
            notifier,
        }
    }

    /// Validates and stores a new `Scheduled` meeting, then announces it.
    ///
    /// # Contract
    /// - `draft.start_time` must be strictly after `now`.
    /// - The announcement is best effort; its failure is logged only.
    pub fn create_meeting(
        &self,
        team_id: TeamId,
        draft: &MeetingDraft,
        now: i64,
    ) -> MeetingServiceResult<Meeting> {
        draft.validate(now)?;
        let candidate = Meeting::from_draft(team_id, draft, now);

        let (meeting, team_name) = self.repo.atomically(|repo| -> MeetingServiceResult<_> {
            let team = self
                .membership
                .team(team_id)?
                .ok_or(MeetingServiceError::TeamNotFound(team_id))?;
            let meeting = repo.create_meeting(&candidate)?;
            Ok((meeting, team.name))
        })?;

        info!(
            "event=meeting_create module=service status=ok meeting_id={} team_id={} start_time={}",
            meeting.id, meeting.team_id, meeting.start_time
        );
        self.announce(&meeting, team_name);
        Ok(meeting)
    }

    /// Loads one meeting of `team_id`.
    pub fn get_meeting(
        &self,
        team_id: TeamId,
        meeting_id: MeetingId,
    ) -> MeetingServiceResult<Meeting> {
        load_team_meeting(&self.repo, team_id, meeting_id)
    }

    pub fn list_meetings(&self, query: &MeetingListQuery) -> MeetingServiceResult<Vec<Meeting>> {
        Ok(self.repo.list_meetings(query)?)
    }

    pub fn start_meeting(
        &self,
        team_id: TeamId,
        meeting_id: MeetingId,
        now: i64,
    ) -> MeetingServiceResult<Meeting> {
        self.transition(team_id, meeting_id, now, "start_meeting", MeetingState::start_meeting)
    }

    /// Opens check-in. Reopening after `end_attendance` is allowed.
    pub fn start_attendance(
        &self,
        team_id: TeamId,
        meeting_id: MeetingId,
        now: i64,
    ) -> MeetingServiceResult<Meeting> {
        self.transition(
            team_id,
            meeting_id,
            now,
            "start_attendance",
            MeetingState::start_attendance,
        )
    }

    pub fn end_attendance(
        &self,
        team_id: TeamId,
        meeting_id: MeetingId,
        now: i64,
    ) -> MeetingServiceResult<Meeting> {
        self.transition(team_id, meeting_id, now, "end_attendance", |state| {
            Ok(state.end_attendance())
        })
    }

    pub fn end_meeting(
        &self,
        team_id: TeamId,
        meeting_id: MeetingId,
        now: i64,
    ) -> MeetingServiceResult<Meeting> {
        self.transition(team_id, meeting_id, now, "end_meeting", |state| Ok(state.end_meeting()))
    }

    /// Removes a meeting that was never started. Its attendance goes with it.
    pub fn delete_meeting(
        &self,
        team_id: TeamId,
        meeting_id: MeetingId,
    ) -> MeetingServiceResult<()> {
        let result: MeetingServiceResult<()> = self.repo.atomically(|repo| {
            let meeting = load_team_meeting(repo, team_id, meeting_id)?;
            meeting.state.ensure_deletable()?;
            repo.delete_meeting(meeting.id)?;
            Ok(())
        });

        match &result {
            Ok(()) => info!(
                "event=meeting_delete module=service status=ok meeting_id={} team_id={}",
                meeting_id, team_id
            ),
            Err(err) => log_rejection("delete_meeting", meeting_id, err),
        }
        result
    }

    /// Records one check-in of `user_id` at `now`.
    ///
    /// # Contract
    /// - Check-ins while attendance is open, or live but never closed, are
    ///   on time.
    /// - Check-ins after attendance closed are accepted as late.
    /// - A second check-in of the same user is `DuplicateAttendance`.
    pub fn mark_attendance(
        &self,
        user_id: UserId,
        meeting_id: MeetingId,
        team_id: TeamId,
        now: i64,
    ) -> MeetingServiceResult<AttendanceRecord> {
        let result: MeetingServiceResult<AttendanceRecord> = self.repo.atomically(|repo| {
            let meeting = load_team_meeting(repo, team_id, meeting_id)?;
            let check_in = meeting.state.check_in()?;
            if repo.get_attendance(user_id, meeting.id)?.is_some() {
                return Err(MeetingServiceError::DuplicateAttendance {
                    user_id,
                    meeting_id: meeting.id,
                });
            }
            let record = AttendanceRecord::new(user_id, meeting.id, now, check_in);
            repo.create_attendance(&record)?;
            Ok(record)
        });

        match &result {
            Ok(record) => info!(
                "event=attendance_mark module=service status=ok meeting_id={} user_id={} on_time={}",
                record.meeting_id, record.user_id, record.on_time
            ),
            Err(err) => log_rejection("mark_attendance", meeting_id, err),
        }
        result
    }

    /// Attendance of one meeting, optionally only on-time or only late.
    pub fn attendance_for_meeting(
        &self,
        team_id: TeamId,
        meeting_id: MeetingId,
        on_time: Option<bool>,
    ) -> MeetingServiceResult<Vec<AttendanceRecord>> {
        let meeting = load_team_meeting(&self.repo, team_id, meeting_id)?;
        Ok(self.repo.list_attendance_by_meeting(meeting.id, on_time)?)
    }

    /// Every check-in of one user, newest first.
    pub fn attendance_for_user(
        &self,
        user_id: UserId,
    ) -> MeetingServiceResult<Vec<AttendanceRecord>> {
        Ok(self.repo.list_attendance_by_user(user_id)?)
    }

    /// Meetings not yet over in every team `user_id` belongs to.
    pub fn upcoming_meetings_for_user(
        &self,
        user_id: UserId,
    ) -> MeetingServiceResult<Vec<Meeting>> {
        Ok(self.repo.list_upcoming_meetings_for_user(user_id)?)
    }

    fn transition<F>(
        &self,
        team_id: TeamId,
        meeting_id: MeetingId,
        now: i64,
        op: &'static str,
        step: F,
    ) -> MeetingServiceResult<Meeting>
    where
        F: FnOnce(MeetingState) -> Result<MeetingState, TransitionError>,
    {
        let result: MeetingServiceResult<(MeetingState, Meeting)> = self.repo.atomically(|repo| {
            let mut meeting = load_team_meeting(repo, team_id, meeting_id)?;
            let from = meeting.state;
            meeting.state = step(from)?;
            if meeting.state == from {
                return Ok((from, meeting));
            }
            meeting.updated_at = now;
            let updated = repo.update_meeting(&meeting)?;
            Ok((from, updated))
        });

        match result {
            Ok((from, meeting)) => {
                info!(
                    "event=meeting_transition module=service status=ok op={} meeting_id={} team_id={} from={} to={}",
                    op, meeting.id, meeting.team_id, from, meeting.state
                );
                Ok(meeting)
            }
            Err(err) => {
                log_rejection(op, meeting_id, &err);
                Err(err)
            }
        }
    }

    fn announce(&self, meeting: &Meeting, team_name: String) {
        let recipients = match self.membership.roster(meeting.team_id) {
            Ok(members) => members.into_iter().map(|member| member.user_id).collect(),
            Err(err) => {
                warn!(
                    "event=meeting_notify module=service status=error meeting_id={} error_code=roster_lookup_failed error={}",
                    meeting.id, err
                );
                return;
            }
        };

        let notice = MeetingNotice {
            meeting: meeting.clone(),
            team_name,
            recipients,
        };
        if let Err(err) = self.notifier.notify_meeting_created(notice) {
            warn!(
                "event=meeting_notify module=service status=error meeting_id={} error_code={}",
                meeting.id,
                err.code()
            );
        }
    }
}

fn load_team_meeting<R: MeetingRepository>(
    repo: &R,
    team_id: TeamId,
    meeting_id: MeetingId,
) -> MeetingServiceResult<Meeting> {
    match repo.get_meeting(meeting_id)? {
        Some(meeting) if meeting.belongs_to(team_id) => Ok(meeting),
        _ => Err(MeetingServiceError::NotFound(meeting_id)),
    }
}

fn log_rejection(op: &str, meeting_id: MeetingId, err: &MeetingServiceError) {
    match err {
        MeetingServiceError::Repo(_) | MeetingServiceError::Membership(_) => warn!(
            "event=meeting_op module=service status=error op={} meeting_id={} error_code={} error={}",
            op,
            meeting_id,
            err.code(),
            err
        ),
        _ => info!(
            "event=meeting_op module=service status=rejected op={} meeting_id={} error_code={}",
            op,
            meeting_id,
            err.code()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::MeetingServiceError;
    use crate::access::gate::{AccessDenied, GateError, MeetingAction};
    use crate::model::lifecycle::TransitionError;
    use crate::model::team::TeamRole;
    use crate::repo::meeting_repo::MeetingRepoError;
    use uuid::Uuid;

    #[test]
    fn repo_semantic_errors_map_to_caller_taxonomy() {
        let id = Uuid::new_v4();
        let err = MeetingServiceError::from(MeetingRepoError::MeetingNotFound(id));
        assert!(matches!(err, MeetingServiceError::NotFound(found) if found == id));

        let user = Uuid::new_v4();
        let err = MeetingServiceError::from(MeetingRepoError::DuplicateAttendance {
            user_id: user,
            meeting_id: id,
        });
        assert_eq!(err.code(), "attendance_duplicate");

        let err = MeetingServiceError::from(MeetingRepoError::InvalidData("bad".to_string()));
        assert_eq!(err.code(), "meeting_store_error");
    }

    #[test]
    fn gate_denial_becomes_unauthorized() {
        let denied = AccessDenied {
            action: MeetingAction::StartMeeting,
            team_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            required: TeamRole::Admin,
            actual: Some(TeamRole::Member),
        };
        let err = MeetingServiceError::from(GateError::Denied(denied));
        assert!(matches!(err, MeetingServiceError::Unauthorized(inner) if inner == denied));
        assert_eq!(err.code(), "unauthorized");
    }

    #[test]
    fn transition_codes_pass_through() {
        let err = MeetingServiceError::from(TransitionError::AlreadyEnded);
        assert_eq!(err.code(), "meeting_already_ended");
    }
}
