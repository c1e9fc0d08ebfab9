//! Domain model for teams, meetings and attendance.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own the meeting lifecycle state machine as pure transitions.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Lifecycle flags only exist as `LifecycleFlags` at the storage boundary.

pub mod attendance;
pub mod lifecycle;
pub mod meeting;
pub mod team;
