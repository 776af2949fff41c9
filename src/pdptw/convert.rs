//! Conversion of absolute simulation time into instance-relative solver units.

use std::cmp::max;
use std::fmt;
use tracing::*;

use crate::data::{Time, TimeWindow};

/// Rounding made `release` exceed `due` by more than one unit, which cannot be
/// explained by the opposite rounding directions and means the input window
/// was malformed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct WindowError {
    pub release: Time,
    pub due: Time,
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "window inverted by more than one unit after rounding: release {} > due {}",
            self.release, self.due
        )
    }
}

impl std::error::Error for WindowError {}

/// Pure converter from absolute domain time (`f64`, arbitrary unit) to
/// instance-relative integer solver time.
///
/// `unit` is the length of one solver time unit measured in domain units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeConverter {
    now: f64,
    unit: f64,
}

impl TimeConverter {
    pub fn new(now: f64, unit: f64) -> Self {
        debug_assert!(unit > 0.0);
        TimeConverter { now, unit }
    }

    /// One solver unit per domain unit, useful in tests and simple setups.
    pub fn identity(now: f64) -> Self {
        TimeConverter::new(now, 1.0)
    }

    #[inline]
    fn units(&self, t: f64) -> f64 {
        (t - self.now) / self.unit
    }

    pub fn relative_ceil(&self, t: f64) -> Time {
        self.units(t).ceil() as Time
    }

    pub fn relative_floor(&self, t: f64) -> Time {
        self.units(t).floor() as Time
    }

    /// Durations always round up: a travel or service time must never be
    /// under-promised to a solver.
    pub fn duration_ceil(&self, d: f64) -> Time {
        debug_assert!(d >= 0.0);
        (d / self.unit).ceil() as Time
    }

    /// Converts a solver time span back into domain units.
    pub fn to_domain(&self, t: Time) -> f64 {
        t as f64 * self.unit
    }

    /// Converts a domain window into `(release_date, due_date)`.
    ///
    /// Release rounds up and due rounds down; a window shorter than one unit can
    /// therefore invert by exactly one, in which case the two are swapped. Any
    /// larger inversion is rejected. Both ends are clamped at 0 afterwards, so a
    /// window that opened before `now` releases immediately.
    pub fn window(&self, tw: &TimeWindow) -> Result<(Time, Time), WindowError> {
        let release = self.relative_ceil(tw.begin);
        let due = self.relative_floor(tw.end);
        let (release, due) = if release > due {
            if release - due == 1 {
                trace!(release, due, "rounding inverted window, swapping");
                (due, release)
            } else {
                return Err(WindowError { release, due });
            }
        } else {
            (release, due)
        };
        return Ok((max(0, release), max(0, due)));
    }
}
