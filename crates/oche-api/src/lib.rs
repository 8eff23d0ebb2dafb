//! Protocol types for oche
//!
//! This crate defines the domain records and the stable API between oched
//! and its clients:
//! - Sessions, attendees, matches, and derived cost reports
//! - Commands (requests from clients)
//! - Responses
//! - Events (service -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
