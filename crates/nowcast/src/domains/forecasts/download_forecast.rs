use serde::{Deserialize, Serialize};
use slog::{debug, info, warn, Logger};
use std::sync::Arc;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::{Fetcher, Location, TimedValue, WeatherCategory};

#[derive(thiserror::Error, Debug)]
pub enum ForecastError {
    #[error("failed to fetch {url}: {reason}")]
    Transport { url: String, reason: String },
    #[error("failed to parse forecast document: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("forecast document has no reports")]
    Empty,
    #[error("unparseable time define {0:?}")]
    BadTimeDefine(String),
}

// Provider document: an array of reports, nearest horizon first.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastReport {
    #[serde(default)]
    pub report_datetime: Option<String>,
    #[serde(default)]
    pub time_series: Vec<TimeSeriesBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesBlock {
    pub time_defines: Vec<String>,
    #[serde(default)]
    pub areas: Vec<AreaSeries>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaSeries {
    pub area: Area,
    pub weathers: Option<Vec<String>>,
    pub weather_codes: Option<Vec<String>>,
    pub pops: Option<Vec<String>>,
    pub temps: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct Area {
    #[serde(default)]
    pub name: String,
    pub code: String,
}

/// Forecast content for one location
///
/// Probabilities come from the local area, temperatures from the city; the
/// two are time-indexed independently.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ForecastBundle {
    pub location_name: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub report_datetime: Option<OffsetDateTime>,
    pub weather_descriptions: Vec<String>,
    pub weather_codes: Vec<String>,
    pub precipitation_probabilities: Vec<TimedValue>,
    pub temperatures: Vec<TimedValue>,
}

impl ForecastBundle {
    /// Category of the nearest forecast column
    pub fn current_category(&self) -> WeatherCategory {
        self.weather_codes
            .first()
            .map(|code| WeatherCategory::from_code(code))
            .unwrap_or(WeatherCategory::Unknown)
    }
}

fn parse_time_defines(defines: &[String]) -> Result<Vec<OffsetDateTime>, ForecastError> {
    defines
        .iter()
        .map(|t| {
            OffsetDateTime::parse(t, &Rfc3339).map_err(|_| ForecastError::BadTimeDefine(t.clone()))
        })
        .collect()
}

// Pair values with their column times; blank or non-numeric cells are dropped.
fn timed_values(times: &[OffsetDateTime], values: &[String]) -> Vec<TimedValue> {
    times
        .iter()
        .zip(values)
        .filter_map(|(t, v)| v.trim().parse::<f64>().ok().map(|v| TimedValue::new(*t, v)))
        .collect()
}

/// Build a bundle from the nearest-horizon report
pub fn extract_bundle(
    report: &ForecastReport,
    location: &Location,
) -> Result<ForecastBundle, ForecastError> {
    let mut bundle = ForecastBundle {
        location_name: location.name.clone(),
        report_datetime: report
            .report_datetime
            .as_deref()
            .and_then(|t| OffsetDateTime::parse(t, &Rfc3339).ok()),
        ..Default::default()
    };

    for block in &report.time_series {
        let times = parse_time_defines(&block.time_defines)?;
        for series in &block.areas {
            let code = series.area.code.as_str();
            if code != location.local_area_code && code != location.city_code {
                continue;
            }

            if let Some(weathers) = &series.weathers {
                bundle.weather_descriptions = weathers.clone();
            }
            if let Some(codes) = &series.weather_codes {
                bundle.weather_codes = codes.clone();
            }
            if code == location.local_area_code {
                if let Some(pops) = &series.pops {
                    bundle
                        .precipitation_probabilities
                        .extend(timed_values(&times, pops));
                }
            }
            if code == location.city_code {
                if let Some(temps) = &series.temps {
                    bundle.temperatures.extend(timed_values(&times, temps));
                }
            }
        }
    }
    Ok(bundle)
}

pub struct ForecastService {
    pub fetcher: Arc<dyn Fetcher>,
    pub logger: Logger,
    base_url: String,
}

impl ForecastService {
    pub fn new(logger: Logger, fetcher: Arc<dyn Fetcher>, base_url: impl Into<String>) -> Self {
        ForecastService {
            logger,
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn get_forecast(&self, location: &Location) -> Result<ForecastBundle, ForecastError> {
        let url = format!("{}/{}.json", self.base_url, location.meso_area_code);
        let body = self
            .fetcher
            .fetch_text(&url)
            .await
            .map_err(|e| ForecastError::Transport {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let reports: Vec<ForecastReport> = serde_json::from_str(&body)?;
        let nearest = reports.first().ok_or(ForecastError::Empty)?;
        let bundle = extract_bundle(nearest, location)?;

        if bundle.precipitation_probabilities.is_empty() {
            warn!(
                self.logger,
                "no precipitation probabilities for area {}", location.local_area_code
            );
        }
        if bundle.temperatures.is_empty() {
            warn!(self.logger, "no temperatures for city {}", location.city_code);
        }
        debug!(self.logger, "weather descriptions: {:?}", bundle.weather_descriptions);
        info!(
            self.logger,
            "forecast for {}: {} probability points, {} temperature points",
            bundle.location_name,
            bundle.precipitation_probabilities.len(),
            bundle.temperatures.len()
        );
        Ok(bundle)
    }
}
