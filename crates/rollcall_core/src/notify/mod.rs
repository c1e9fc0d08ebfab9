//! Meeting notifications.
//!
//! # Responsibility
//! - Describe the "meeting created" notice sent to a team's roster.
//! - Define the non-blocking notifier seam used by the lifecycle engine.
//! - Define the delivery sink seam used by the background dispatcher.
//!
//! # Invariants
//! - Notification failures never reach the caller of the operation that
//!   triggered them; they are logged and dropped.
//! - Logged fields are metadata only (ids, counts, error codes).

pub mod dispatcher;

use crate::model::meeting::Meeting;
use crate::model::team::UserId;
use log::{debug, info};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use dispatcher::{DispatchStats, NotificationDispatcher};

/// Notice emitted after a meeting is scheduled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingNotice {
    pub meeting: Meeting,
    pub team_name: String,
    /// Every member of the owning team at creation time.
    pub recipients: Vec<UserId>,
}

impl MeetingNotice {
    /// Human-readable body for mail-like sinks.
    pub fn body(&self) -> String {
        format!(
            "A new meeting {} has been scheduled for the team {} at {} (epoch ms) in {}.",
            self.meeting.title, self.team_name, self.meeting.start_time, self.meeting.venue
        )
    }
}

/// Notification enqueue or delivery failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// The dispatcher has shut down and accepts no more notices.
    DispatcherClosed,
    /// The sink could not deliver the notice.
    Delivery(String),
}

impl NotificationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DispatcherClosed => "notify_dispatcher_closed",
            Self::Delivery(_) => "notify_delivery_failed",
        }
    }
}

impl Display for NotificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DispatcherClosed => write!(f, "notification dispatcher is closed"),
            Self::Delivery(message) => write!(f, "notification delivery failed: {message}"),
        }
    }
}

impl Error for NotificationError {}

/// Fire-and-forget hand-off used by the lifecycle engine.
///
/// Implementations must return promptly; delivery happens elsewhere.
pub trait MeetingNotifier {
    fn notify_meeting_created(&self, notice: MeetingNotice) -> Result<(), NotificationError>;
}

impl<N: MeetingNotifier + ?Sized> MeetingNotifier for &N {
    fn notify_meeting_created(&self, notice: MeetingNotice) -> Result<(), NotificationError> {
        (**self).notify_meeting_created(notice)
    }
}

impl<N: MeetingNotifier + ?Sized> MeetingNotifier for Box<N> {
    fn notify_meeting_created(&self, notice: MeetingNotice) -> Result<(), NotificationError> {
        (**self).notify_meeting_created(notice)
    }
}

/// Delivery backend run on the dispatcher thread.
pub trait NotificationSink: Send + 'static {
    fn deliver(&self, notice: &MeetingNotice) -> Result<(), NotificationError>;
}

/// Notifier used when notifications are switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

impl MeetingNotifier for DisabledNotifier {
    fn notify_meeting_created(&self, notice: MeetingNotice) -> Result<(), NotificationError> {
        debug!(
            "event=meeting_notify module=notify status=skipped meeting_id={} reason=disabled",
            notice.meeting.id
        );
        Ok(())
    }
}

/// Sink that records deliveries in the core log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn deliver(&self, notice: &MeetingNotice) -> Result<(), NotificationError> {
        info!(
            "event=meeting_notify module=notify status=ok meeting_id={} team_id={} recipients={}",
            notice.meeting.id,
            notice.meeting.team_id,
            notice.recipients.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DisabledNotifier, MeetingNotice, MeetingNotifier};
    use crate::model::meeting::{Location, Meeting, MeetingDraft};
    use uuid::Uuid;

    fn notice() -> MeetingNotice {
        let draft = MeetingDraft {
            title: "Sprint review".to_string(),
            description: "demo".to_string(),
            venue: "Hall B".to_string(),
            location: Location::default(),
            start_time: 5_000,
        };
        MeetingNotice {
            meeting: Meeting::from_draft(Uuid::new_v4(), &draft, 1_000),
            team_name: "Platform".to_string(),
            recipients: vec![Uuid::new_v4()],
        }
    }

    #[test]
    fn body_names_meeting_and_team() {
        let body = notice().body();
        assert!(
            body.starts_with("A new meeting Sprint review has been scheduled for the team Platform")
        );
        assert!(body.contains("5000"));
    }

    #[test]
    fn disabled_notifier_accepts_everything() {
        DisabledNotifier
            .notify_meeting_created(notice())
            .expect("disabled notifier never fails");
    }
}
