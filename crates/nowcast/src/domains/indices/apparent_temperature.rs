use serde::Serialize;
use time::OffsetDateTime;

use crate::{round1, ObservationSnapshot, WindDirection};

/// Steadman apparent temperature in °C, rounded to one decimal
///
/// Vapour pressure comes from the Tetens approximation. Inputs are not
/// range-checked.
pub fn apparent_temp(temperature: f64, humidity: f64, wind_speed: f64) -> f64 {
    let saturation = 6.1078 * 10f64.powf(7.5 * temperature / (temperature + 237.3));
    let vapour = saturation * humidity / 100.0;
    round1(temperature + 0.33 * vapour - 0.70 * wind_speed - 4.00)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApparentReading {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub temperature: f64,
    pub apparent_temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: WindDirection,
    pub precipitation_1h: f64,
}

impl From<&ObservationSnapshot> for ApparentReading {
    fn from(snapshot: &ObservationSnapshot) -> Self {
        ApparentReading {
            timestamp: snapshot.timestamp,
            temperature: snapshot.temperature,
            apparent_temperature: apparent_temp(
                snapshot.temperature,
                snapshot.humidity,
                snapshot.wind_speed,
            ),
            humidity: snapshot.humidity,
            wind_speed: snapshot.wind_speed,
            wind_direction: snapshot.wind_direction,
            precipitation_1h: snapshot.precipitation_1h,
        }
    }
}

/// One reading per snapshot, in the same order
pub fn annotate_apparent(snapshots: &[ObservationSnapshot]) -> Vec<ApparentReading> {
    snapshots.iter().map(ApparentReading::from).collect()
}
