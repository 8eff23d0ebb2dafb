//! Shared utilities for oche
//!
//! This crate provides:
//! - ID types (SessionId, AttendeeId, MatchId, PlayerId, GameModeId, ClientId)
//! - Money in integer cents
//! - Wall-clock helpers with debug mock time
//! - The closed error taxonomy shared by every layer
//! - Rate limiting helpers
//! - Default paths for socket, data, and config

mod error;
mod ids;
mod money;
mod paths;
mod rate_limit;
mod time;

pub use error::*;
pub use ids::*;
pub use money::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
