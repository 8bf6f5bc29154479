use crate::{ObservationSnapshot, TimedValue};

/// Splice observed history onto the interpolated forecast
///
/// `past` is a collected window whose first entry is the off-grid "latest"
/// sample; it is left out because the interpolation already starts after it.
/// The remaining observations are emitted oldest first, followed by the
/// `future` points that lie strictly after the last observation.
pub fn merge_series(past: &[ObservationSnapshot], future: &[TimedValue]) -> Vec<TimedValue> {
    let mut merged: Vec<TimedValue> = past
        .iter()
        .skip(1)
        .map(ObservationSnapshot::temperature_point)
        .collect();
    merged.sort_by_key(|p| p.timestamp);
    merged.dedup_by(|later, earlier| later.timestamp == earlier.timestamp);

    let observed_until = merged.last().map(|p| p.timestamp);
    merged.extend(
        future
            .iter()
            .filter(|p| observed_until.map_or(true, |until| p.timestamp > until)),
    );
    merged
}
