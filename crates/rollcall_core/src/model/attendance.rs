//! Attendance record model.
//!
//! # Invariants
//! - At most one record exists per (user, meeting).
//! - Records are immutable once written.

use crate::model::lifecycle::CheckIn;
use crate::model::meeting::MeetingId;
use crate::model::team::UserId;
use serde::{Deserialize, Serialize};

/// One check-in of one user at one meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub user_id: UserId,
    pub meeting_id: MeetingId,
    /// Epoch ms timestamp of the check-in.
    pub marked_at: i64,
    /// `false` when the check-in happened after attendance was closed.
    pub on_time: bool,
}

impl AttendanceRecord {
    pub fn new(user_id: UserId, meeting_id: MeetingId, marked_at: i64, check_in: CheckIn) -> Self {
        Self {
            user_id,
            meeting_id,
            marked_at,
            on_time: check_in.is_on_time(),
        }
    }
}
