//! The synth-match payloads
//!
//! This library supports telemetry event generation for the synth-match
//! project: the player to kart roster, the timestamp schedule and the events
//! themselves. Nothing in here performs I/O; every random draw comes from a
//! caller supplied [`rand::Rng`] so that seeded runs are reproducible.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::unwrap_used)]
#![deny(unused_extern_crates)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions)]

pub use event::{Event, KartState, Telemetry};
pub use roster::{Player, Roster};
pub use schedule::Schedule;

pub mod event;
pub mod roster;
pub mod schedule;

/// Errors related to payload generation
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Roster requested with an unsupported number of players
    #[error("player count must be between 1 and {max}, got {count}", max = roster::MAX_PLAYERS)]
    PlayerCount {
        /// The rejected count
        count: u8,
    },
    /// Timestamp could not be rendered
    #[error("Timestamp could not be formatted: {0}")]
    Format(#[from] time::error::Format),
    /// Schedule window extends beyond representable time
    #[error("Schedule window of {0:?} is not representable")]
    Window(std::time::Duration),
}
