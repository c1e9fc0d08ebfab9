//! Meeting lifecycle state machine.
//!
//! # Responsibility
//! - Model the legal lifecycle flag combinations as one tagged enum.
//! - Translate between the enum and the four persisted flags.
//! - Decide every transition and the on-time/late check-in classification.
//!
//! # Invariants
//! - `meeting_closed => !meeting_active`.
//! - `attendance_active => meeting_active && !meeting_closed`.
//! - `MeetingOver` is terminal; every transition out of it is either a
//!   no-op or a rejection.
//!
//! Transitions are pure functions. Persisting the result is the caller's job.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Persisted representation of a meeting lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LifecycleFlags {
    pub meeting_active: bool,
    pub attendance_active: bool,
    pub meeting_closed: bool,
    pub attendance_closed: bool,
}

impl LifecycleFlags {
    /// Builds flags in persisted column order.
    pub const fn new(
        meeting_active: bool,
        attendance_active: bool,
        meeting_closed: bool,
        attendance_closed: bool,
    ) -> Self {
        Self {
            meeting_active,
            attendance_active,
            meeting_closed,
            attendance_closed,
        }
    }

    /// Returns whether any flag has ever been raised.
    pub fn any_set(self) -> bool {
        self.meeting_active
            || self.attendance_active
            || self.meeting_closed
            || self.attendance_closed
    }
}

impl Display for LifecycleFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let bit = |value: bool| if value { 'T' } else { 'F' };
        write!(
            f,
            "({},{},{},{})",
            bit(self.meeting_active),
            bit(self.attendance_active),
            bit(self.meeting_closed),
            bit(self.attendance_closed)
        )
    }
}

/// Lifecycle state of one meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingState {
    /// Created, nothing started yet. The only deletable state.
    Scheduled,
    /// Attendance was ended before the meeting was ever started.
    AttendanceSealed,
    /// Meeting started, attendance never opened.
    MeetingLive,
    /// Meeting live and check-ins are on time.
    AttendanceOpen,
    /// Meeting live, attendance closed; check-ins are recorded as late.
    AttendanceClosed,
    /// Meeting ended. Terminal.
    MeetingOver,
}

impl MeetingState {
    /// Stable string id used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::AttendanceSealed => "attendance_sealed",
            Self::MeetingLive => "meeting_live",
            Self::AttendanceOpen => "attendance_open",
            Self::AttendanceClosed => "attendance_closed",
            Self::MeetingOver => "meeting_over",
        }
    }

    /// Converts persisted flags into a state.
    ///
    /// Returns `InvalidFlags` for combinations no transition can produce.
    pub fn from_flags(flags: LifecycleFlags) -> Result<Self, InvalidFlags> {
        let LifecycleFlags {
            meeting_active,
            attendance_active,
            meeting_closed,
            attendance_closed,
        } = flags;
        match (
            meeting_active,
            attendance_active,
            meeting_closed,
            attendance_closed,
        ) {
            (false, false, false, false) => Ok(Self::Scheduled),
            (false, false, false, true) => Ok(Self::AttendanceSealed),
            (true, false, false, false) => Ok(Self::MeetingLive),
            (true, true, false, false) => Ok(Self::AttendanceOpen),
            (true, false, false, true) => Ok(Self::AttendanceClosed),
            (false, false, true, true) => Ok(Self::MeetingOver),
            _ => Err(InvalidFlags(flags)),
        }
    }

    /// Converts the state into its persisted flags.
    pub fn flags(self) -> LifecycleFlags {
        match self {
            Self::Scheduled => LifecycleFlags::new(false, false, false, false),
            Self::AttendanceSealed => LifecycleFlags::new(false, false, false, true),
            Self::MeetingLive => LifecycleFlags::new(true, false, false, false),
            Self::AttendanceOpen => LifecycleFlags::new(true, true, false, false),
            Self::AttendanceClosed => LifecycleFlags::new(true, false, false, true),
            Self::MeetingOver => LifecycleFlags::new(false, false, true, true),
        }
    }

    /// `start_meeting`: requires the meeting not to have ended.
    ///
    /// Starting an already-live meeting succeeds and leaves the state as is.
    pub fn start_meeting(self) -> Result<Self, TransitionError> {
        match self {
            Self::MeetingOver => Err(TransitionError::AlreadyEnded),
            Self::Scheduled => Ok(Self::MeetingLive),
            Self::AttendanceSealed => Ok(Self::AttendanceClosed),
            live @ (Self::MeetingLive | Self::AttendanceOpen | Self::AttendanceClosed) => Ok(live),
        }
    }

    /// `start_attendance`: requires a live meeting. May reopen closed attendance.
    pub fn start_attendance(self) -> Result<Self, TransitionError> {
        match self {
            Self::MeetingOver => Err(TransitionError::AlreadyEnded),
            Self::Scheduled | Self::AttendanceSealed => Err(TransitionError::NotStarted),
            Self::MeetingLive | Self::AttendanceOpen | Self::AttendanceClosed => {
                Ok(Self::AttendanceOpen)
            }
        }
    }

    /// `end_attendance`: always permitted.
    pub fn end_attendance(self) -> Self {
        match self {
            Self::Scheduled | Self::AttendanceSealed => Self::AttendanceSealed,
            Self::MeetingLive | Self::AttendanceOpen | Self::AttendanceClosed => {
                Self::AttendanceClosed
            }
            Self::MeetingOver => Self::MeetingOver,
        }
    }

    /// `end_meeting`: always permitted, forces attendance closed as well.
    pub fn end_meeting(self) -> Self {
        Self::MeetingOver
    }

    /// Deletion guard: only untouched meetings may be removed.
    pub fn ensure_deletable(self) -> Result<(), TransitionError> {
        if self.flags().any_set() {
            return Err(TransitionError::NotDeletable);
        }
        Ok(())
    }

    /// Classifies a check-in made in this state.
    ///
    /// Late check-ins are accepted and flagged rather than rejected, so the
    /// attendance ledger stays complete.
    pub fn check_in(self) -> Result<CheckIn, TransitionError> {
        let flags = self.flags();
        if !flags.meeting_active || flags.meeting_closed {
            return Err(TransitionError::MeetingNotLive);
        }
        if !flags.attendance_active && !flags.attendance_closed {
            return Err(TransitionError::AttendanceNotStarted);
        }
        if flags.attendance_active || !flags.attendance_closed {
            Ok(CheckIn::OnTime)
        } else {
            Ok(CheckIn::Late)
        }
    }
}

impl Display for MeetingState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check-in classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckIn {
    OnTime,
    Late,
}

impl CheckIn {
    pub fn is_on_time(self) -> bool {
        matches!(self, Self::OnTime)
    }
}

/// Rejected lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The meeting has already ended.
    AlreadyEnded,
    /// The meeting has not been started.
    NotStarted,
    /// Check-in attempted while the meeting is not running.
    MeetingNotLive,
    /// Check-in attempted before attendance was ever opened.
    AttendanceNotStarted,
    /// Deletion attempted after the meeting left `Scheduled`.
    NotDeletable,
}

impl TransitionError {
    /// Stable error code used in logs.
    pub fn code(self) -> &'static str {
        match self {
            Self::AlreadyEnded => "meeting_already_ended",
            Self::NotStarted => "meeting_not_started",
            Self::MeetingNotLive => "meeting_not_started_or_over",
            Self::AttendanceNotStarted => "attendance_not_started",
            Self::NotDeletable => "meeting_not_deletable",
        }
    }
}

impl Display for TransitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyEnded => write!(f, "meeting has already ended"),
            Self::NotStarted => write!(f, "meeting has not started"),
            Self::MeetingNotLive => write!(f, "meeting not started or already over"),
            Self::AttendanceNotStarted => write!(f, "attendance has not started"),
            Self::NotDeletable => write!(f, "cannot delete a meeting after start or finish"),
        }
    }
}

impl Error for TransitionError {}

/// Persisted flag combination that violates lifecycle invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidFlags(pub LifecycleFlags);

impl Display for InvalidFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unreachable lifecycle flag combination {}", self.0)
    }
}

impl Error for InvalidFlags {}
