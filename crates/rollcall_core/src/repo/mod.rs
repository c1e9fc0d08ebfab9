//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the persistence and membership contracts the engine consumes.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`MeetingNotFound`,
//!   `DuplicateAttendance`) in addition to DB transport errors.
//! - Absence on lookups is `Ok(None)`, never an error.

pub mod meeting_repo;
pub mod membership_repo;

use uuid::Uuid;

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> Result<Uuid, String> {
    Uuid::parse_str(value).map_err(|_| format!("invalid uuid `{value}` in {column}"))
}

pub(crate) fn int_to_bool(value: i64, column: &'static str) -> Result<bool, String> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(format!("invalid boolean value `{other}` in {column}")),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
