//! Authorization for meeting actions.
//!
//! # Responsibility
//! - Map every caller-facing meeting action to a minimum team role.
//! - Reject callers below that role before any lifecycle code runs.
//!
//! # Invariants
//! - Deny by default: a caller with no membership is always rejected.
//! - Roles are per team; privileges never carry across teams.

pub mod gate;
