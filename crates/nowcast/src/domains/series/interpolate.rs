use time::{Duration, OffsetDateTime};

use crate::{round1, Kernel, ObservationSnapshot, TimedValue};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    #[error("insufficient data for interpolation: {available} point(s), need at least 2")]
    InsufficientData { available: usize },
}

/// What a series measures, which decides the kernel and post-processing
#[derive(Debug, Clone, Copy)]
pub enum InterpolationMode<'a> {
    /// Forecast temperature, anchored on true observations (any order).
    /// The resampled curve starts after the latest anchor.
    Temperature { anchors: &'a [TimedValue] },
    /// Precipitation probability in percent, clamped to [0, 100]
    Probability,
}

impl InterpolationMode<'_> {
    pub fn kernel(&self) -> Kernel {
        match self {
            InterpolationMode::Temperature { .. } => Kernel::Akima,
            InterpolationMode::Probability => Kernel::Pchip,
        }
    }

    fn value_range(&self) -> Option<(f64, f64)> {
        match self {
            InterpolationMode::Temperature { .. } => None,
            InterpolationMode::Probability => Some((0.0, 100.0)),
        }
    }
}

/// Temperatures of the `count` most recent snapshots, oldest first
pub fn recent_anchors(snapshots: &[ObservationSnapshot], count: usize) -> Vec<TimedValue> {
    let mut anchors: Vec<TimedValue> = snapshots.iter().map(|s| s.temperature_point()).collect();
    anchors.sort_by_key(|a| a.timestamp);
    let skip = anchors.len().saturating_sub(count);
    anchors.split_off(skip)
}

/// Resample sparse forecast points onto an hourly grid
///
/// The grid runs from the earliest to the latest sample (inclusive) in the
/// earliest sample's offset. Values are rounded to one decimal.
pub fn interpolate(
    points: &[TimedValue],
    mode: InterpolationMode<'_>,
) -> Result<Vec<TimedValue>, InterpolationError> {
    if points.len() < 2 {
        return Err(InterpolationError::InsufficientData {
            available: points.len(),
        });
    }

    let (samples, observed_until) = match mode {
        InterpolationMode::Temperature { anchors } => {
            let mut samples = anchors.to_vec();
            samples.sort_by_key(|a| a.timestamp);
            let observed_until = samples.last().map(|a| a.timestamp);
            samples.extend(
                points
                    .iter()
                    .filter(|p| observed_until.map_or(true, |until| p.timestamp > until)),
            );
            (samples, observed_until)
        }
        InterpolationMode::Probability => (points.to_vec(), None),
    };

    let samples = ordered_unique(samples);
    if samples.len() < 2 {
        return Err(InterpolationError::InsufficientData {
            available: samples.len(),
        });
    }

    let xs: Vec<f64> = samples
        .iter()
        .map(|s| s.timestamp.unix_timestamp() as f64)
        .collect();
    let ys: Vec<f64> = samples.iter().map(|s| s.value).collect();
    let spline = mode.kernel().fit(&xs, &ys);

    let first = samples[0].timestamp;
    let last = samples[samples.len() - 1].timestamp;
    let range = mode.value_range();

    Ok(hourly_grid(first, last)
        .into_iter()
        .filter(|t| observed_until.map_or(true, |until| *t > until))
        .map(|t| {
            let mut value = spline.evaluate(t.unix_timestamp() as f64);
            if let Some((lo, hi)) = range {
                value = value.clamp(lo, hi);
            }
            TimedValue::new(t, round1(value))
        })
        .collect())
}

// Sorted ascending; the first sample wins on a repeated instant.
fn ordered_unique(mut samples: Vec<TimedValue>) -> Vec<TimedValue> {
    samples.sort_by_key(|s| s.timestamp);
    samples.dedup_by(|later, earlier| later.timestamp == earlier.timestamp);
    samples
}

fn hourly_grid(first: OffsetDateTime, last: OffsetDateTime) -> Vec<OffsetDateTime> {
    let mut grid = Vec::new();
    let mut t = first;
    while t <= last {
        grid.push(t);
        t += Duration::HOUR;
    }
    grid
}
