//! Training session engine for oched
//!
//! This crate is the heart of oched, containing:
//! - Session lifecycle (planned -> active -> completed, with a cancel escape)
//! - Roster management (automatic enrollment, guests, attendance)
//! - Round-robin match generation
//! - Match scoring and completion
//! - Cost allocation per attendee

mod costs;
mod engine;
mod events;
mod game;
mod pairing;
mod roster;
mod session;

#[cfg(test)]
mod test_support;

pub use costs::*;
pub use engine::*;
pub use events::*;
pub use game::*;
pub use pairing::*;
pub use session::*;
