use chrono::{DateTime, Duration, Utc};
use serde::*;

/// Default session length when a booking request omits the duration.
pub const DEFAULT_APPOINTMENT_MINUTES: i64 = 60;

/// A half-open time interval `[start, end)`.
///
/// Two slots conflict when their intervals have a non-empty intersection;
/// touching endpoints do not conflict, so back-to-back sessions are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    /// Create a slot from explicit bounds. Returns `None` unless `end > start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if end > start {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Create a slot from a start time and a strictly positive duration in
    /// minutes. Durations that chrono cannot represent, or that push the end
    /// past the representable time range, yield `None` rather than panicking
    /// on untrusted input.
    pub fn from_duration(start: DateTime<Utc>, minutes: i64) -> Option<Self> {
        if minutes <= 0 {
            return None;
        }
        let duration = Duration::try_minutes(minutes)?;
        let end = start.checked_add_signed(duration)?;
        Self::new(start, end)
    }

    /// Half-open overlap test: `self.start < other.end && self.end > other.start`.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Slot length.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}
