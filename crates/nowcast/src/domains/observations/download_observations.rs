use serde::Serialize;
use serde_json::Value;
use slog::{debug, error, warn, Logger};
use std::collections::HashMap;
use std::sync::Arc;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
};

use crate::{Fetcher, TimedValue};

/// Fields of one station in a snapshot document, e.g. `"temp": [21.4, 0]`.
/// The first entry is the value, the second the quality flag.
pub type StationRecord = HashMap<String, Vec<Value>>;

pub const FIELD_TEMPERATURE: &str = "temp";
pub const FIELD_HUMIDITY: &str = "humidity";
pub const FIELD_WIND_SPEED: &str = "wind";
pub const FIELD_WIND_DIRECTION: &str = "windDirection";
pub const FIELD_PRECIPITATION_1H: &str = "precipitation1h";

#[derive(thiserror::Error, Debug)]
pub enum ObservationError {
    #[error("failed to fetch {url}: {reason}")]
    Transport { url: String, reason: String },
    #[error("unrecognised observation time token: {0:?}")]
    BadTimestamp(String),
    #[error("failed to parse observation document: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("failed to format observation time: {0}")]
    TimeFormat(#[from] time::error::Format),
    #[error("invalid observation time component: {0}")]
    TimeRange(#[from] time::error::ComponentRange),
    #[error("station {0} not present in snapshot")]
    StationMissing(String),
    #[error("station {station}: field {field} missing or null")]
    FieldMissing { station: String, field: &'static str },
    #[error("station {station}: wind direction {value} is not a 0-16 sector")]
    BadWindDirection { station: String, value: f64 },
    #[error("latest observation time unavailable")]
    NoAnchor,
}

/// 16-point compass sector the wind blows from; 0 means calm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WindDirection(u8);

const COMPASS_POINTS: [&str; 17] = [
    "calm", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
    "NW", "NNW", "N",
];

impl WindDirection {
    pub fn new(code: u8) -> Option<Self> {
        (code <= 16).then_some(WindDirection(code))
    }

    fn from_raw(value: f64) -> Option<Self> {
        if value.fract() != 0.0 || !(0.0..=16.0).contains(&value) {
            return None;
        }
        Self::new(value as u8)
    }

    pub fn code(&self) -> u8 {
        self.0
    }

    pub fn compass(&self) -> &'static str {
        COMPASS_POINTS[self.0 as usize]
    }

    pub fn is_calm(&self) -> bool {
        self.0 == 0
    }

    /// Unit vector (east, north) pointing downwind, for arrow glyphs.
    /// Calm maps to the same vector as north; check `is_calm` first.
    pub fn flow_vector(&self) -> (f64, f64) {
        let angle = f64::from(self.0) * std::f64::consts::PI / 8.0;
        (-angle.sin(), -angle.cos())
    }
}

/// One station's complete reading at one instant
///
/// Every field is required, so a value of this type is never partial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationSnapshot {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_direction: WindDirection,
    pub wind_speed: f64,
    pub precipitation_1h: f64,
}

impl ObservationSnapshot {
    pub fn temperature_point(&self) -> TimedValue {
        TimedValue::new(self.timestamp, self.temperature)
    }

    /// Build a snapshot from a station record; all five fields must be present
    pub fn from_record(
        station_id: &str,
        timestamp: OffsetDateTime,
        record: &StationRecord,
    ) -> Result<Self, ObservationError> {
        let required = |field: &'static str| {
            extract_field(record, field).ok_or_else(|| ObservationError::FieldMissing {
                station: station_id.to_string(),
                field,
            })
        };

        let temperature = required(FIELD_TEMPERATURE)?;
        let humidity = required(FIELD_HUMIDITY)?;
        let wind_speed = required(FIELD_WIND_SPEED)?;
        let raw_direction = required(FIELD_WIND_DIRECTION)?;
        let precipitation_1h = required(FIELD_PRECIPITATION_1H)?;

        let wind_direction = WindDirection::from_raw(raw_direction).ok_or_else(|| {
            ObservationError::BadWindDirection {
                station: station_id.to_string(),
                value: raw_direction,
            }
        })?;

        Ok(ObservationSnapshot {
            timestamp,
            temperature,
            humidity,
            wind_direction,
            wind_speed,
            precipitation_1h,
        })
    }

    #[cfg(test)]
    pub(crate) fn sample(timestamp: OffsetDateTime, temperature: f64) -> Self {
        ObservationSnapshot {
            timestamp,
            temperature,
            humidity: 60.0,
            wind_direction: WindDirection(8),
            wind_speed: 2.0,
            precipitation_1h: 0.0,
        }
    }
}

/// Current value of `field`, or `None` when the field is absent, its array is
/// empty, or its first entry is null / not a number.
pub fn extract_field(record: &StationRecord, field: &str) -> Option<f64> {
    record.get(field)?.first()?.as_f64()
}

/// Parse the provider's latest-time token
///
/// Accepts RFC 3339 (`2024-06-01T17:40:00+09:00`) and the compact offset form
/// (`2024-06-01T17:40:00+0900`).
pub fn parse_latest_time(token: &str) -> Result<OffsetDateTime, ObservationError> {
    let token = token.trim();
    if let Ok(parsed) = OffsetDateTime::parse(token, &Rfc3339) {
        return Ok(parsed);
    }
    let compact = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
    );
    OffsetDateTime::parse(token, compact)
        .map_err(|_| ObservationError::BadTimestamp(token.to_string()))
}

/// Snapshot document key, `YYYYMMDDHHmm00` in the timestamp's own offset
pub fn snapshot_key(timestamp: OffsetDateTime) -> Result<String, ObservationError> {
    let key = format_description!("[year][month][day][hour][minute]00");
    Ok(timestamp.format(key)?)
}

pub struct ObservationService {
    pub logger: Logger,
    pub fetcher: Arc<dyn Fetcher>,
    base_url: String,
}

impl ObservationService {
    pub fn new(logger: Logger, fetcher: Arc<dyn Fetcher>, base_url: impl Into<String>) -> Self {
        ObservationService {
            logger,
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn latest_time_url(&self) -> String {
        format!("{}/latest_time.txt", self.base_url)
    }

    fn snapshot_url(&self, timestamp: OffsetDateTime) -> Result<String, ObservationError> {
        Ok(format!("{}/map/{}.json", self.base_url, snapshot_key(timestamp)?))
    }

    async fn fetch(&self, url: &str) -> Result<String, ObservationError> {
        self.fetcher
            .fetch_text(url)
            .await
            .map_err(|e| ObservationError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    pub async fn try_latest_observation_time(&self) -> Result<OffsetDateTime, ObservationError> {
        let token = self.fetch(&self.latest_time_url()).await?;
        parse_latest_time(&token)
    }

    /// Most recent observation time, or `None` (logged) when unavailable
    pub async fn latest_observation_time(&self) -> Option<OffsetDateTime> {
        match self.try_latest_observation_time().await {
            Ok(latest) => {
                debug!(self.logger, "latest observation time: {}", latest);
                Some(latest)
            }
            Err(e) => {
                error!(self.logger, "latest observation time unavailable: {}", e);
                None
            }
        }
    }

    pub async fn try_fetch_snapshot(
        &self,
        station_id: &str,
        timestamp: OffsetDateTime,
    ) -> Result<ObservationSnapshot, ObservationError> {
        let body = self.fetch(&self.snapshot_url(timestamp)?).await?;
        let document: Value = serde_json::from_str(&body)?;
        let station = document
            .get(station_id)
            .cloned()
            .ok_or_else(|| ObservationError::StationMissing(station_id.to_string()))?;
        let record: StationRecord = serde_json::from_value(station)?;
        ObservationSnapshot::from_record(station_id, timestamp, &record)
    }

    /// One station's snapshot at `timestamp`, or `None` (logged) when the
    /// document is unreachable or any required field is missing
    pub async fn fetch_snapshot(
        &self,
        station_id: &str,
        timestamp: OffsetDateTime,
    ) -> Option<ObservationSnapshot> {
        match self.try_fetch_snapshot(station_id, timestamp).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!(self.logger, "no snapshot for {} at {}: {}", station_id, timestamp, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{discard_logger, MockFetcher};
    use anyhow::anyhow;
    use serde_json::json;
    use time::macros::datetime;

    fn record(value: Value) -> StationRecord {
        serde_json::from_value(value).unwrap()
    }

    fn full_document() -> String {
        json!({
            "44132": {
                "temp": [21.4, 0],
                "humidity": [63, 0],
                "wind": [3.2, 0],
                "windDirection": [15, 0],
                "precipitation1h": [0.5, 0],
                "pressure": [1008.1, 0]
            },
            "11001": { "temp": [8.0, 0] }
        })
        .to_string()
    }

    fn service(fetcher: MockFetcher) -> ObservationService {
        ObservationService::new(discard_logger(), Arc::new(fetcher), "https://amedas.test/data/")
    }

    #[test]
    fn extract_field_absent_paths_all_return_none() {
        let rec = record(json!({
            "temp": [],
            "humidity": [null, 5],
            "wind": [2.5, 0]
        }));

        assert_eq!(extract_field(&rec, "precipitation1h"), None);
        assert_eq!(extract_field(&rec, "temp"), None);
        assert_eq!(extract_field(&rec, "humidity"), None);
        assert_eq!(extract_field(&rec, "wind"), Some(2.5));
        assert_eq!(extract_field(&rec, "precipitation1h").unwrap_or(-1.0), -1.0);
    }

    #[test]
    fn snapshot_requires_every_field() {
        let ts = datetime!(2024-06-01 17:00 +09:00);
        let rec = record(json!({
            "temp": [21.4, 0],
            "humidity": [63, 0],
            "wind": [3.2, 0],
            "windDirection": [15, 0],
            "precipitation1h": [null, 5]
        }));

        match ObservationSnapshot::from_record("44132", ts, &rec) {
            Err(ObservationError::FieldMissing { field, .. }) => {
                assert_eq!(field, FIELD_PRECIPITATION_1H)
            }
            other => panic!("expected missing field, got {:?}", other),
        }
    }

    #[test]
    fn wind_direction_must_be_a_sector() {
        let ts = datetime!(2024-06-01 17:00 +09:00);
        let rec = record(json!({
            "temp": [21.4, 0],
            "humidity": [63, 0],
            "wind": [3.2, 0],
            "windDirection": [17, 0],
            "precipitation1h": [0.0, 0]
        }));
        assert!(matches!(
            ObservationSnapshot::from_record("44132", ts, &rec),
            Err(ObservationError::BadWindDirection { .. })
        ));
    }

    #[test]
    fn wind_direction_labels_and_vectors() {
        // a north wind blows toward the south
        let north = WindDirection::new(16).unwrap();
        assert_eq!(north.compass(), "N");
        let (u, v) = north.flow_vector();
        assert!(u.abs() < 1e-9 && (v + 1.0).abs() < 1e-9);

        let east = WindDirection::new(4).unwrap();
        assert_eq!(east.compass(), "E");
        let (u, v) = east.flow_vector();
        assert!((u + 1.0).abs() < 1e-9 && v.abs() < 1e-9);

        assert!(WindDirection::new(0).unwrap().is_calm());
        assert!(WindDirection::new(17).is_none());
    }

    #[test]
    fn parses_both_offset_styles() {
        let expected = datetime!(2024-06-01 17:40 +09:00);
        assert_eq!(parse_latest_time("2024-06-01T17:40:00+09:00\n").unwrap(), expected);
        assert_eq!(parse_latest_time("2024-06-01T17:40:00+0900").unwrap(), expected);
        assert!(matches!(
            parse_latest_time("yesterday"),
            Err(ObservationError::BadTimestamp(_))
        ));
    }

    #[test]
    fn snapshot_key_is_minute_resolution() {
        let ts = datetime!(2024-06-01 07:05:42 +09:00);
        assert_eq!(snapshot_key(ts).unwrap(), "20240601070500");
    }

    #[tokio::test]
    async fn latest_time_failure_is_none() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch_text()
            .times(1)
            .returning(|_| Err(anyhow!("connection refused")));

        assert_eq!(service(fetcher).latest_observation_time().await, None);
    }

    #[tokio::test]
    async fn fetches_snapshot_for_station() {
        let mut fetcher = MockFetcher::new();
        fetcher.expect_fetch_text().times(1).returning(|url| {
            assert_eq!(url, "https://amedas.test/data/map/20240601170000.json");
            Ok(full_document())
        });

        let ts = datetime!(2024-06-01 17:00 +09:00);
        let snapshot = service(fetcher).fetch_snapshot("44132", ts).await.unwrap();
        assert_eq!(snapshot.timestamp, ts);
        assert_eq!(snapshot.temperature, 21.4);
        assert_eq!(snapshot.humidity, 63.0);
        assert_eq!(snapshot.wind_direction.compass(), "NNW");
        assert_eq!(snapshot.precipitation_1h, 0.5);
    }

    #[tokio::test]
    async fn incomplete_or_missing_station_is_none() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch_text()
            .times(2)
            .returning(|_| Ok(full_document()));
        let service = service(fetcher);
        let ts = datetime!(2024-06-01 17:00 +09:00);

        assert_eq!(service.fetch_snapshot("11001", ts).await, None);
        assert_eq!(service.fetch_snapshot("99999", ts).await, None);
    }

    #[tokio::test]
    async fn garbage_body_is_none() {
        let mut fetcher = MockFetcher::new();
        fetcher
            .expect_fetch_text()
            .returning(|_| Ok(String::from("<html>maintenance</html>")));

        let ts = datetime!(2024-06-01 17:00 +09:00);
        assert_eq!(service(fetcher).fetch_snapshot("44132", ts).await, None);
    }
}
