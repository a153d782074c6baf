//! Game clocks.
//!
//! [`ClockState`] holds authoritative remaining time, in milliseconds, and
//! can only be built from an authority push. [`DisplayClock`] is what a
//! front end shows between pushes; it is derived from a `ClockState` and
//! has no way back.

use std::time::Duration;

use crate::board::Color;

/// Authoritative remaining time per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClockState {
    white_ms: u64,
    black_ms: u64,
}

impl ClockState {
    /// Ingest clock values pushed in seconds.
    ///
    /// This is the single unit conversion point. Fractions are rounded to the
    /// nearest millisecond; negative or non-finite values clamp to zero.
    pub fn from_seconds(white: f64, black: f64) -> Self {
        Self {
            white_ms: seconds_to_ms(white),
            black_ms: seconds_to_ms(black),
        }
    }

    /// Remaining milliseconds for one side.
    pub fn remaining_ms(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_ms,
            Color::Black => self.black_ms,
        }
    }

    /// Project the clock forward for display, running only the side to move.
    pub fn interpolate(&self, active: Color, elapsed: Duration) -> DisplayClock {
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let run = |color: Color| {
            let remaining = self.remaining_ms(color);
            if color == active {
                remaining.saturating_sub(elapsed_ms)
            } else {
                remaining
            }
        };
        DisplayClock {
            white_ms: run(Color::White),
            black_ms: run(Color::Black),
        }
    }
}

fn seconds_to_ms(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    // Saturating float-to-int cast.
    (seconds * 1000.0).round() as u64
}

/// Interpolated clock for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayClock {
    white_ms: u64,
    black_ms: u64,
}

impl DisplayClock {
    /// Displayed milliseconds for one side.
    pub fn remaining_ms(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_ms,
            Color::Black => self.black_ms,
        }
    }

    /// `MM:SS`, rounding partial seconds up so a clock reads `00:00` only
    /// once it has actually run out.
    pub fn format(&self, color: Color) -> String {
        let secs = self.remaining_ms(color).div_ceil(1000);
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}
