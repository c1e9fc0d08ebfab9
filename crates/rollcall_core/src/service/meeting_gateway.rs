//! Caller-facing meeting operations.
//!
//! # Responsibility
//! - Authorize every caller action before the lifecycle engine runs.
//! - Stamp clock-dependent operations with the current time.
//!
//! # Invariants
//! - No engine call happens for a denied caller.
//! - Self-scoped reads (`my_attendance`, `my_upcoming_meetings`) need no
//!   team role and only ever return the caller's own data.

use crate::access::gate::{AuthorizationGate, MeetingAction};
use crate::model::attendance::AttendanceRecord;
use crate::model::meeting::{now_epoch_ms, Meeting, MeetingDraft, MeetingId};
use crate::model::team::{TeamId, UserId};
use crate::notify::MeetingNotifier;
use crate::repo::meeting_repo::{MeetingListQuery, MeetingRepository};
use crate::repo::membership_repo::MembershipAuthority;
use crate::service::meeting_service::{MeetingService, MeetingServiceResult};

/// Source of epoch-ms timestamps.
pub type Clock = fn() -> i64;

/// Gate + engine composition exposed to transports.
pub struct MeetingGateway<R, M: MembershipAuthority, N> {
    gate: AuthorizationGate<M>,
    engine: MeetingService<R, M, N>,
    clock: Clock,
}

impl<R, M, N> MeetingGateway<R, M, N>
where
    R: MeetingRepository,
    M: MembershipAuthority + Clone,
    N: MeetingNotifier,
{
    /// Builds a gateway reading the wall clock.
    pub fn new(repo: R, membership: M, notifier: N) -> Self {
        Self {
            gate: AuthorizationGate::new(membership.clone()),
            engine: MeetingService::new(repo, membership, notifier),
            clock: now_epoch_ms,
        }
    }

    /// Replaces the clock used for every timestamp the gateway writes.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn create_meeting(
        &self,
        caller: UserId,
        team_id: TeamId,
        draft: &MeetingDraft,
    ) -> MeetingServiceResult<Meeting> {
        self.gate.authorize(team_id, caller, MeetingAction::CreateMeeting)?;
        self.engine.create_meeting(team_id, draft, (self.clock)())
    }

    pub fn get_meeting(
        &self,
        caller: UserId,
        team_id: TeamId,
        meeting_id: MeetingId,
    ) -> MeetingServiceResult<Meeting> {
        self.gate.authorize(team_id, caller, MeetingAction::ViewMeeting)?;
        self.engine.get_meeting(team_id, meeting_id)
    }

    pub fn list_meetings(
        &self,
        caller: UserId,
        query: &MeetingListQuery,
    ) -> MeetingServiceResult<Vec<Meeting>> {
        self.gate.authorize(query.team_id, caller, MeetingAction::ListMeetings)?;
        self.engine.list_meetings(query)
    }

    pub fn start_meeting(
        &self,
        caller: UserId,
        team_id: TeamId,
        meeting_id: MeetingId,
    ) -> MeetingServiceResult<Meeting> {
        self.gate.authorize(team_id, caller, MeetingAction::StartMeeting)?;
        self.engine.start_meeting(team_id, meeting_id, (self.clock)())
    }

    pub fn start_attendance(
        &self,
        caller: UserId,
        team_id: TeamId,
        meeting_id: MeetingId,
    ) -> MeetingServiceResult<Meeting> {
        self.gate.authorize(team_id, caller, MeetingAction::StartAttendance)?;
        self.engine.start_attendance(team_id, meeting_id, (self.clock)())
    }

    pub fn end_attendance(
        &self,
        caller: UserId,
        team_id: TeamId,
        meeting_id: MeetingId,
    ) -> MeetingServiceResult<Meeting> {
        self.gate.authorize(team_id, caller, MeetingAction::EndAttendance)?;
        self.engine.end_attendance(team_id, meeting_id, (self.clock)())
    }

    pub fn end_meeting(
        &self,
        caller: UserId,
        team_id: TeamId,
        meeting_id: MeetingId,
    ) -> MeetingServiceResult<Meeting> {
        self.gate.authorize(team_id, caller, MeetingAction::EndMeeting)?;
        self.engine.end_meeting(team_id, meeting_id, (self.clock)())
    }

    pub fn delete_meeting(
        &self,
        caller: UserId,
        team_id: TeamId,
        meeting_id: MeetingId,
    ) -> MeetingServiceResult<()> {
        self.gate.authorize(team_id, caller, MeetingAction::DeleteMeeting)?;
        self.engine.delete_meeting(team_id, meeting_id)
    }

    /// Checks the caller in to `meeting_id` at the current clock reading.
    pub fn mark_attendance(
        &self,
        caller: UserId,
        team_id: TeamId,
        meeting_id: MeetingId,
    ) -> MeetingServiceResult<AttendanceRecord> {
        self.gate.authorize(team_id, caller, MeetingAction::MarkAttendance)?;
        self.engine.mark_attendance(caller, meeting_id, team_id, (self.clock)())
    }

    pub fn attendance_for_meeting(
        &self,
        caller: UserId,
        team_id: TeamId,
        meeting_id: MeetingId,
        on_time: Option<bool>,
    ) -> MeetingServiceResult<Vec<AttendanceRecord>> {
        self.gate.authorize(team_id, caller, MeetingAction::ViewAttendance)?;
        self.engine.attendance_for_meeting(team_id, meeting_id, on_time)
    }

    pub fn my_attendance(&self, caller: UserId) -> MeetingServiceResult<Vec<AttendanceRecord>> {
        self.engine.attendance_for_user(caller)
    }

    pub fn my_upcoming_meetings(&self, caller: UserId) -> MeetingServiceResult<Vec<Meeting>> {
        self.engine.upcoming_meetings_for_user(caller)
    }
}
