//! Meeting domain model.
//!
//! # Responsibility
//! - Define the meeting record owned by exactly one team.
//! - Validate creation input before it reaches storage.
//!
//! # Invariants
//! - `title`, `description` and `venue` are non-empty after trim.
//! - `start_time` is strictly in the future when the meeting is created.
//! - Lifecycle is carried as one `MeetingState`, never as loose flags.

use crate::model::lifecycle::{LifecycleFlags, MeetingState};
use crate::model::team::TeamId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable meeting identifier.
pub type MeetingId = Uuid;

/// Geolocation of the venue. No range validation beyond presence.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// Caller input for scheduling a meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingDraft {
    pub title: String,
    pub description: String,
    pub venue: String,
    pub location: Location,
    /// Unix epoch milliseconds. Informational; the meeting starts manually.
    pub start_time: i64,
}

impl MeetingDraft {
    /// Validates creation input against the clock reading `now`.
    pub fn validate(&self, now: i64) -> Result<(), MeetingValidationError> {
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("venue", &self.venue),
        ] {
            if value.trim().is_empty() {
                return Err(MeetingValidationError::EmptyField(field));
            }
        }
        if self.start_time <= now {
            return Err(MeetingValidationError::StartTimeNotInFuture {
                start_time: self.start_time,
                now,
            });
        }
        Ok(())
    }
}

/// Scheduled gathering of one team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub team_id: TeamId,
    pub title: String,
    pub description: String,
    pub venue: String,
    pub location: Location,
    /// Unix epoch milliseconds.
    pub start_time: i64,
    pub state: MeetingState,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms timestamp of the last persisted change.
    pub updated_at: i64,
}

impl Meeting {
    /// Builds a fresh `Scheduled` meeting from validated input.
    ///
    /// Text fields are stored trimmed.
    pub fn from_draft(team_id: TeamId, draft: &MeetingDraft, now: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            team_id,
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            venue: draft.venue.trim().to_string(),
            location: draft.location,
            start_time: draft.start_time,
            state: MeetingState::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }

    /// Persisted four-flag view of `state`.
    pub fn flags(&self) -> LifecycleFlags {
        self.state.flags()
    }

    /// Returns whether this meeting belongs to `team_id`.
    pub fn belongs_to(&self, team_id: TeamId) -> bool {
        self.team_id == team_id
    }

    /// Checks field invariants that must hold for every stored meeting.
    pub fn validate(&self) -> Result<(), MeetingValidationError> {
        for (field, value) in [
            ("title", &self.title),
            ("description", &self.description),
            ("venue", &self.venue),
        ] {
            if value.trim().is_empty() {
                return Err(MeetingValidationError::EmptyField(field));
            }
        }
        Ok(())
    }
}

/// Malformed meeting input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingValidationError {
    /// A required text field is blank.
    EmptyField(&'static str),
    /// Start time is not after the creation clock reading.
    StartTimeNotInFuture { start_time: i64, now: i64 },
}

impl MeetingValidationError {
    /// Stable error code used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyField(_) => "meeting_field_empty",
            Self::StartTimeNotInFuture { .. } => "meeting_start_in_past",
        }
    }
}

impl Display for MeetingValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "meeting {field} must not be empty"),
            Self::StartTimeNotInFuture { start_time, now } => write!(
                f,
                "meeting start time {start_time} must be after current time {now}"
            ),
        }
    }
}

impl Error for MeetingValidationError {}

/// Returns the current wall-clock time in Unix epoch milliseconds.
///
/// Falls back to `0` if the system clock reads before the epoch.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{Location, Meeting, MeetingDraft, MeetingValidationError};
    use crate::model::lifecycle::MeetingState;
    use uuid::Uuid;

    fn draft(start_time: i64) -> MeetingDraft {
        MeetingDraft {
            title: "  Weekly sync ".to_string(),
            description: "status round".to_string(),
            venue: "Room 4".to_string(),
            location: Location {
                latitude: 12.97,
                longitude: 79.16,
                altitude: 0.0,
            },
            start_time,
        }
    }

    #[test]
    fn accepts_future_start_time() {
        draft(2_000).validate(1_000).expect("future meeting is valid");
    }

    #[test]
    fn rejects_past_or_current_start_time() {
        let err = draft(1_000).validate(1_000).expect_err("now is not future");
        assert_eq!(
            err,
            MeetingValidationError::StartTimeNotInFuture {
                start_time: 1_000,
                now: 1_000
            }
        );
        assert!(draft(10).validate(1_000).is_err());
    }

    #[test]
    fn rejects_blank_required_fields() {
        let mut input = draft(2_000);
        input.venue = "   ".to_string();
        assert_eq!(
            input.validate(1_000),
            Err(MeetingValidationError::EmptyField("venue"))
        );
    }

    #[test]
    fn from_draft_starts_scheduled_with_trimmed_text() {
        let team_id = Uuid::new_v4();
        let meeting = Meeting::from_draft(team_id, &draft(2_000), 1_000);
        assert_eq!(meeting.state, MeetingState::Scheduled);
        assert_eq!(meeting.title, "Weekly sync");
        assert!(meeting.belongs_to(team_id));
        assert!(!meeting.flags().any_set());
    }
}
