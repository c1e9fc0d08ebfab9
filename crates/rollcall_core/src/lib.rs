//! Core domain logic for Rollcall.
//! This crate is the single source of truth for meeting and attendance
//! invariants.

pub mod access;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use access::gate::{AccessDenied, AuthorizationGate, GateError, MeetingAction};
pub use config::{ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::attendance::AttendanceRecord;
pub use model::lifecycle::{CheckIn, LifecycleFlags, MeetingState, TransitionError};
pub use model::meeting::{
    now_epoch_ms, Location, Meeting, MeetingDraft, MeetingId, MeetingValidationError,
};
pub use model::team::{Team, TeamId, TeamMember, TeamRole, UserId};
pub use notify::{
    DisabledNotifier, DispatchStats, LogNotificationSink, MeetingNotice, MeetingNotifier,
    NotificationDispatcher, NotificationError, NotificationSink,
};
pub use repo::meeting_repo::{
    MeetingListQuery, MeetingOrder, MeetingRepoError, MeetingRepoResult, MeetingRepository,
    SqliteMeetingRepository,
};
pub use repo::membership_repo::{
    MembershipAuthority, MembershipRepoError, MembershipResult, SqliteMembershipRepository,
};
pub use service::meeting_gateway::MeetingGateway;
pub use service::meeting_service::{MeetingService, MeetingServiceError, MeetingServiceResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
