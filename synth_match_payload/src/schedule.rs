//! Event timestamp schedule.
//!
//! Every run covers a fixed window of wall-clock time starting at the moment
//! the run begins. Events are stamped in chronological order across that
//! window even though everything else about them is independent.

use std::{num::NonZeroUsize, time::Duration};

use rand::Rng;
use time::{
    OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description,
};

use crate::Error;

/// The default span of a run, three minutes.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3 * 60);

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
);

/// The `[start, end]` window event timestamps are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

impl Schedule {
    /// Create a [`Schedule`] covering `window` from `start`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Window`] if `start + window` is not a representable
    /// instant.
    pub fn starting_at(start: OffsetDateTime, window: Duration) -> Result<Self, Error> {
        let span = time::Duration::try_from(window).map_err(|_| Error::Window(window))?;
        let end = start.checked_add(span).ok_or(Error::Window(window))?;
        Ok(Self { start, end })
    }

    /// Create a [`Schedule`] covering `window` from the current UTC instant.
    ///
    /// # Errors
    ///
    /// See [`Schedule::starting_at`].
    pub fn now(window: Duration) -> Result<Self, Error> {
        Self::starting_at(OffsetDateTime::now_utc(), window)
    }

    /// The first instant of the window.
    #[must_use]
    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    /// The last instant of the window.
    #[must_use]
    pub fn end(&self) -> OffsetDateTime {
        self.end
    }

    /// Produce `total` timestamps in non-decreasing order.
    ///
    /// A single event lands on the start of the window. Two or more events
    /// always include both the start and the end, with any remainder drawn
    /// uniformly from the window at nanosecond resolution.
    pub fn timestamps<R>(&self, rng: &mut R, total: NonZeroUsize) -> Vec<OffsetDateTime>
    where
        R: Rng + ?Sized,
    {
        let total = total.get();
        let mut stamps = Vec::with_capacity(total);
        stamps.push(self.start);
        if total == 1 {
            return stamps;
        }

        let span = (self.end - self.start).whole_nanoseconds().max(0);
        let span = i64::try_from(span).unwrap_or(i64::MAX);
        for _ in 0..total - 2 {
            let offset = rng.random_range(0..=span);
            let stamp = self
                .start
                .checked_add(time::Duration::nanoseconds(offset))
                .unwrap_or(self.end);
            stamps.push(stamp.min(self.end));
        }
        stamps.push(self.end);
        stamps.sort_unstable();
        stamps
    }
}

/// Render `timestamp` as `YYYY-MM-DD HH:MM:SS.mmm` in UTC.
///
/// The sub-second part is truncated, not rounded, to milliseconds.
///
/// # Errors
///
/// Returns [`Error::Format`] if the instant cannot be rendered, for instance a
/// year outside four digits.
pub fn format_timestamp(timestamp: OffsetDateTime) -> Result<String, Error> {
    Ok(timestamp
        .to_offset(UtcOffset::UTC)
        .format(TIMESTAMP_FORMAT)?)
}
