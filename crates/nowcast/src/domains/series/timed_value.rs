use serde::Serialize;
use time::OffsetDateTime;

/// A single value at a timezone-aware instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimedValue {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub value: f64,
}

impl TimedValue {
    pub fn new(timestamp: OffsetDateTime, value: f64) -> Self {
        TimedValue { timestamp, value }
    }
}

/// Round to one decimal place (half away from zero)
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
