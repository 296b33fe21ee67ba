//! Validation of the positional command-line inputs.
//!
//! The binary accepts `<match_id>:<track> <total_events> <num_player_ids>`.
//! Parsing into integers is clap's job; whether those integers make sense is
//! decided here, before any configuration is read or any request is made.

use std::num::{IntErrorKind, NonZeroUsize};

use synth_match_payload::roster::MAX_PLAYERS;

/// The largest number of events a single run will schedule. At the default
/// pace this is roughly fourteen hours of sending.
pub const MAX_EVENTS: i64 = 1_000_000;

/// Errors produced by [`validate`]. Each is a usage error and fatal.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The combined argument has no `:` separator
    #[error("match_track argument must be in the format 'match_id:track'")]
    MissingSeparator,
    /// The track portion is not an integer
    #[error("track must be an integer")]
    TrackNotInteger,
    /// The track portion is an integer outside `u16`
    #[error("track must be an unsigned short integer (0 to 65535)")]
    TrackOutOfRange,
    /// The player count is outside `1..=8`
    #[error("num_player_ids must be between 1 and 8")]
    PlayerCount,
    /// The total event count is below one
    #[error("total_events must be at least 1")]
    TotalEvents,
    /// The total event count is above [`MAX_EVENTS`]
    #[error("total_events must be at most {max}, got {0}", max = MAX_EVENTS)]
    TooManyEvents(i64),
}

/// The validated shape of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Match identifier, any string
    pub match_id: String,
    /// Track identifier
    pub track: u16,
    /// Number of events to send
    pub total_events: NonZeroUsize,
    /// Number of players in the roster
    pub players: u8,
}

/// Split `match_track` at its first colon into match id and track.
///
/// # Errors
///
/// Returns [`Error::MissingSeparator`] when there is no colon, and
/// [`Error::TrackNotInteger`] or [`Error::TrackOutOfRange`] when the track
/// text is not a `u16`.
pub fn match_track(match_track: &str) -> Result<(String, u16), Error> {
    let (match_id, track) = match_track
        .split_once(':')
        .ok_or(Error::MissingSeparator)?;

    let track: i64 = track.trim().parse().map_err(|err: std::num::ParseIntError| {
        match err.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => Error::TrackOutOfRange,
            _ => Error::TrackNotInteger,
        }
    })?;
    let track = u16::try_from(track).map_err(|_| Error::TrackOutOfRange)?;

    Ok((match_id.to_string(), track))
}

/// Validate the three positional inputs into a [`Plan`].
///
/// Checks run in order: separator, track, player count, total events. The
/// first failure is returned.
///
/// # Errors
///
/// See [`Error`].
pub fn validate(match_track: &str, total_events: i64, num_player_ids: i64) -> Result<Plan, Error> {
    let (match_id, track) = self::match_track(match_track)?;

    let players = u8::try_from(num_player_ids)
        .ok()
        .filter(|p| (1..=MAX_PLAYERS).contains(p))
        .ok_or(Error::PlayerCount)?;

    if total_events < 1 {
        return Err(Error::TotalEvents);
    }
    if total_events > MAX_EVENTS {
        return Err(Error::TooManyEvents(total_events));
    }
    let total_events = usize::try_from(total_events)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or(Error::TooManyEvents(total_events))?;

    Ok(Plan {
        match_id,
        track,
        total_events,
        players,
    })
}
