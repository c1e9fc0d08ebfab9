//! Core use-case services.
//!
//! # Responsibility
//! - `meeting_service`: lifecycle engine over the meeting store.
//! - `meeting_gateway`: authorized entry points for transports.
//!
//! Transports call the gateway; tests and trusted jobs may call the engine
//! directly.

pub mod meeting_gateway;
pub mod meeting_service;
