use anyhow::Error;
use nowcast_core::ensure_parent_dir;
use serde::Serialize;
use slog::{error, info, warn, Logger};
use std::{fs, path::Path, sync::Arc, time::Duration};
use time::OffsetDateTime;

use crate::{
    annotate_apparent, interpolate, judge, merge_series, recent_anchors, ApparentReading, Cli,
    Fetcher, ForecastBundle, ForecastService, InterpolationMode, Location, ObservationError,
    ObservationService, ObservationSnapshot, TimedValue, UmbrellaVerdict, WeatherCategory,
};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("latest observation time unavailable")]
    NoAnchor,
    #[error("observation collection failed: {0}")]
    Observation(#[from] ObservationError),
    #[error("failed to serialise report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything one run needs, resolved from the merged configuration
#[derive(Clone, Debug)]
pub struct Settings {
    pub location: Location,
    pub forecast_base_url: String,
    pub amedas_base_url: String,
    pub fetch_delay: Duration,
    pub history_hours: u32,
    pub anchor_count: usize,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self, Error> {
        Ok(Settings {
            location: cli.location()?,
            forecast_base_url: cli.forecast_base_url(),
            amedas_base_url: cli.amedas_base_url(),
            fetch_delay: cli.fetch_delay(),
            history_hours: cli.history_hours(),
            anchor_count: cli.anchor_count(),
        })
    }
}

/// Headline conditions: the newest hourly observation plus the nearest
/// forecast column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentConditions {
    #[serde(flatten)]
    pub reading: ApparentReading,
    pub wind_compass: String,
    pub weather_description: Option<String>,
    pub category: WeatherCategory,
    pub icon: String,
}

impl CurrentConditions {
    fn new(reading: ApparentReading, forecast: &ForecastBundle) -> Self {
        let category = forecast.current_category();
        CurrentConditions {
            wind_compass: reading.wind_direction.compass().to_string(),
            weather_description: forecast.weather_descriptions.first().cloned(),
            category,
            icon: category.icon().to_string(),
            reading,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NowcastReport {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub observed_at: OffsetDateTime,
    pub location_name: String,
    pub station_id: String,
    pub current: Option<CurrentConditions>,
    pub forecast: ForecastBundle,
    /// Hourly history, oldest first, with apparent temperature
    pub observations: Vec<ApparentReading>,
    pub temperature_forecast: Vec<TimedValue>,
    pub precipitation_forecast: Vec<TimedValue>,
    /// Observed temperatures followed by the forecast curve
    pub temperature_series: Vec<TimedValue>,
    pub umbrella: UmbrellaVerdict,
}

fn interpolate_or_empty(
    logger: &Logger,
    what: &str,
    points: &[TimedValue],
    mode: InterpolationMode<'_>,
) -> Vec<TimedValue> {
    match interpolate(points, mode) {
        Ok(series) => series,
        Err(e) => {
            warn!(logger, "skipping {} interpolation: {}", what, e);
            Vec::new()
        }
    }
}

// Window entries after the off-grid latest one, ascending.
fn hourly_history(past: &[ObservationSnapshot]) -> Vec<ObservationSnapshot> {
    let mut history: Vec<ObservationSnapshot> = past.iter().skip(1).cloned().collect();
    history.sort_by_key(|s| s.timestamp);
    history.dedup_by(|later, earlier| later.timestamp == earlier.timestamp);
    history
}

/// One full nowcast: observations, forecast, interpolation, merge, indices
///
/// Only a missing anchor time is fatal. A failed forecast or an
/// interpolation without enough data leaves the affected series empty.
pub async fn run_pipeline(
    settings: &Settings,
    fetcher: Arc<dyn Fetcher>,
    logger: &Logger,
) -> Result<NowcastReport, PipelineError> {
    let location = &settings.location;
    let observation_service = ObservationService::new(
        logger.clone(),
        fetcher.clone(),
        settings.amedas_base_url.as_str(),
    );
    let forecast_service =
        ForecastService::new(logger.clone(), fetcher, settings.forecast_base_url.as_str());

    let anchor = observation_service
        .latest_observation_time()
        .await
        .ok_or(PipelineError::NoAnchor)?;

    let past = observation_service
        .collect_window_with_latest_at(
            &location.station_id,
            anchor,
            settings.history_hours,
            settings.fetch_delay,
        )
        .await?;

    let forecast = match forecast_service.get_forecast(location).await {
        Ok(bundle) => bundle,
        Err(e) => {
            error!(logger, "forecast unavailable, continuing without it: {}", e);
            ForecastBundle {
                location_name: location.name.clone(),
                ..Default::default()
            }
        }
    };

    let anchors = recent_anchors(&past, settings.anchor_count);
    let temperature_forecast = interpolate_or_empty(
        logger,
        "temperature",
        &forecast.temperatures,
        InterpolationMode::Temperature { anchors: &anchors },
    );
    let precipitation_forecast = interpolate_or_empty(
        logger,
        "precipitation probability",
        &forecast.precipitation_probabilities,
        InterpolationMode::Probability,
    );

    let temperature_series = merge_series(&past, &temperature_forecast);
    let observations = annotate_apparent(&hourly_history(&past));
    let current = observations
        .last()
        .map(|reading| CurrentConditions::new(reading.clone(), &forecast));
    let umbrella = judge(&precipitation_forecast);

    info!(
        logger,
        "nowcast for {}: {} observations, {} forecast hours, umbrella 6h={} 12h={}",
        location.name,
        past.len(),
        temperature_forecast.len(),
        umbrella.level_6h.label(),
        umbrella.level_12h.label()
    );

    Ok(NowcastReport {
        generated_at: OffsetDateTime::now_utc(),
        observed_at: anchor,
        location_name: location.name.clone(),
        station_id: location.station_id.clone(),
        current,
        forecast,
        observations,
        temperature_forecast,
        precipitation_forecast,
        temperature_series,
        umbrella,
    })
}

/// Write the report as JSON to `output`, or stdout when no path is set
pub fn write_report(
    report: &NowcastReport,
    output: Option<&Path>,
    logger: &Logger,
) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => {
            ensure_parent_dir(path)?;
            fs::write(path, json)?;
            info!(logger, "report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
