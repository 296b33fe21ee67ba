//! Kart telemetry events.
//!
//! An [`Event`] is a flat record: who, where, when, how fast and which
//! controls were held. Events are generated one at a time, serialized as a
//! single JSON object and dropped once sent.

use std::ops::RangeInclusive;

use rand::{Rng, distr::StandardUniform, prelude::Distribution};
use time::OffsetDateTime;

use crate::{Error, Roster, schedule::format_timestamp};

/// Range of event codes emitted.
pub const EVENT_CODES: RangeInclusive<u8> = 4..=9;
/// The event code that carries a `metadata` field.
pub const METADATA_EVENT: u8 = 8;
/// Range of the integer carried in `metadata`.
pub const METADATA_VALUES: RangeInclusive<u8> = 1..=10;

const COORDINATE_BOUND: f64 = 100.0;
const MAX_SPEED: f64 = 120.0;

/// Round to two decimal places.
fn hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn coordinate<R>(rng: &mut R) -> f64
where
    R: Rng + ?Sized,
{
    hundredths(rng.random_range(-COORDINATE_BOUND..=COORDINATE_BOUND))
}

/// Position, heading, speed and control state of a kart at one instant.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct KartState {
    /// Location, x axis
    pub loc_x: f64,
    /// Location, y axis
    pub loc_y: f64,
    /// Location, z axis
    pub loc_z: f64,
    /// Facing vector, x axis
    pub face_x: f64,
    /// Facing vector, y axis
    pub face_y: f64,
    /// Facing vector, z axis
    pub face_z: f64,
    /// Speed, `0.0..=120.0`
    pub speed: f64,
    /// Accelerator held
    pub gas: bool,
    /// Brake held
    pub brake: bool,
    /// Nitro engaged
    pub nitro: bool,
    /// Skidding
    pub skid: bool,
    /// Reversing
    pub back: bool,
}

impl Distribution<KartState> for StandardUniform {
    fn sample<R>(&self, rng: &mut R) -> KartState
    where
        R: Rng + ?Sized,
    {
        KartState {
            loc_x: coordinate(rng),
            loc_y: coordinate(rng),
            loc_z: coordinate(rng),
            face_x: coordinate(rng),
            face_y: coordinate(rng),
            face_z: coordinate(rng),
            speed: hundredths(rng.random_range(0.0..=MAX_SPEED)),
            gas: rng.random(),
            brake: rng.random(),
            nitro: rng.random(),
            skid: rng.random(),
            back: rng.random(),
        }
    }
}

/// One telemetry record, ready for transmission.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Event<'a> {
    /// The reporting player
    pub player_id: &'a str,
    /// The match this event belongs to
    pub match_id: &'a str,
    /// The track the match is raced on
    pub track: u16,
    /// The kart bound to `player_id`
    pub kart: u16,
    /// `YYYY-MM-DD HH:MM:SS.mmm`, UTC
    pub timestamp: String,
    /// Kinematics and controls
    #[serde(flatten)]
    pub state: KartState,
    /// Event code, see [`EVENT_CODES`]
    pub event: u8,
    /// Present only when `event` is [`METADATA_EVENT`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

/// Generator of [`Event`] instances for a single match.
#[derive(Debug, Clone)]
pub struct Telemetry {
    roster: Roster,
    match_id: String,
    track: u16,
}

impl Telemetry {
    /// Create a new instance of `Telemetry`
    #[must_use]
    pub fn new(roster: Roster, match_id: String, track: u16) -> Self {
        Self {
            roster,
            match_id,
            track,
        }
    }

    /// The roster events are attributed to.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Generate one event stamped at `timestamp`.
    ///
    /// The player is chosen independently of the timestamp, so a player may
    /// report several times in a row or not at all.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if `timestamp` cannot be rendered.
    pub fn generate<R>(&self, rng: &mut R, timestamp: OffsetDateTime) -> Result<Event<'_>, Error>
    where
        R: Rng + ?Sized,
    {
        let player = self.roster.choose(rng);
        let state: KartState = rng.random();
        let event = rng.random_range(EVENT_CODES);
        let metadata =
            (event == METADATA_EVENT).then(|| rng.random_range(METADATA_VALUES).to_string());

        Ok(Event {
            player_id: &player.id,
            match_id: &self.match_id,
            track: self.track,
            kart: player.kart,
            timestamp: format_timestamp(timestamp)?,
            state,
            event,
            metadata,
        })
    }
}
