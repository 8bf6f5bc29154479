use serde::Serialize;
use time::Duration;

use crate::TimedValue;

const MANDATORY_FROM: f64 = 60.0;
const FOLDABLE_FROM: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UmbrellaLevel {
    #[default]
    None,
    Foldable,
    Mandatory,
}

impl UmbrellaLevel {
    pub fn from_probability(max_probability: f64) -> Self {
        if max_probability >= MANDATORY_FROM {
            UmbrellaLevel::Mandatory
        } else if max_probability >= FOLDABLE_FROM {
            UmbrellaLevel::Foldable
        } else {
            UmbrellaLevel::None
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            UmbrellaLevel::None => 0,
            UmbrellaLevel::Foldable => 1,
            UmbrellaLevel::Mandatory => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UmbrellaLevel::None => "no umbrella needed",
            UmbrellaLevel::Foldable => "folding umbrella recommended",
            UmbrellaLevel::Mandatory => "umbrella required",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct UmbrellaVerdict {
    pub level_6h: UmbrellaLevel,
    pub max_probability_6h: f64,
    pub level_12h: UmbrellaLevel,
    pub max_probability_12h: f64,
}

// Highest value in [base, base + window]; 0 when nothing falls inside.
fn window_max(series: &[TimedValue], window: Duration) -> f64 {
    let base = series[0].timestamp;
    series
        .iter()
        .filter(|p| p.timestamp >= base && p.timestamp <= base + window)
        .map(|p| p.value)
        .fold(0.0, f64::max)
}

/// Umbrella advice for the next 6 and 12 hours of precipitation probability
///
/// Windows start at the first point of `series`, which is expected to be the
/// earliest.
pub fn judge(series: &[TimedValue]) -> UmbrellaVerdict {
    if series.is_empty() {
        return UmbrellaVerdict::default();
    }
    let max_probability_6h = window_max(series, Duration::hours(6));
    let max_probability_12h = window_max(series, Duration::hours(12));
    UmbrellaVerdict {
        level_6h: UmbrellaLevel::from_probability(max_probability_6h),
        max_probability_6h,
        level_12h: UmbrellaLevel::from_probability(max_probability_12h),
        max_probability_12h,
    }
}
