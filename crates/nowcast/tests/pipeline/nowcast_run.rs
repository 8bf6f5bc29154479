use crate::helpers::{
    forecast_document, forecast_url, latest_time_url, observed_afternoon, settings,
    snapshot_document, snapshot_url, ScriptedFetcher,
};
use nowcast::{
    discard_logger, run_pipeline, write_report, PipelineError, UmbrellaLevel, WeatherCategory,
};
use serde_json::Value;
use std::sync::Arc;
use time::macros::datetime;

#[tokio::test]
async fn full_run_blends_observations_and_forecast() {
    let fetcher = Arc::new(observed_afternoon().serve(forecast_url(), forecast_document()));

    let report = run_pipeline(&settings(), fetcher.clone(), &discard_logger())
        .await
        .unwrap();

    assert_eq!(report.observed_at, datetime!(2024-06-01 17:40 +09:00));
    assert_eq!(report.location_name, "Tokyo");

    // latest first, then whole hours back
    let requests = fetcher.requests();
    assert_eq!(requests[0], latest_time_url());
    assert_eq!(requests[1], snapshot_url("20240601174000"));
    assert_eq!(requests[2], snapshot_url("20240601170000"));
    assert_eq!(requests[5], snapshot_url("20240601140000"));
    assert_eq!(requests[6], forecast_url());
    assert_eq!(requests.len(), 7);

    // anchored curve starts after the latest observation
    let temps = &report.temperature_forecast;
    assert_eq!(temps.len(), 16);
    assert_eq!(temps[0].timestamp, datetime!(2024-06-01 18:00 +09:00));
    assert_eq!(temps[3].timestamp, datetime!(2024-06-01 21:00 +09:00));
    assert_eq!(temps[3].value, 19.0);
    assert_eq!(temps[15].timestamp, datetime!(2024-06-02 09:00 +09:00));
    assert_eq!(temps[15].value, 24.0);

    // 4 hourly observations then the forecast, strictly ascending
    let series = &report.temperature_series;
    assert_eq!(series.len(), 20);
    assert_eq!(series[0].timestamp, datetime!(2024-06-01 14:00 +09:00));
    assert_eq!(series[3].value, 21.5);
    assert_eq!(series[4].timestamp, datetime!(2024-06-01 18:00 +09:00));
    assert!(series.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    let pops = &report.precipitation_forecast;
    assert_eq!(pops.len(), 19);
    assert_eq!(pops[0].value, 20.0);
    assert!(pops.iter().all(|p| (0.0..=100.0).contains(&p.value)));

    assert_eq!(report.umbrella.max_probability_6h, 40.0);
    assert_eq!(report.umbrella.level_6h, UmbrellaLevel::Foldable);
    assert_eq!(report.umbrella.max_probability_12h, 70.0);
    assert_eq!(report.umbrella.level_12h, UmbrellaLevel::Mandatory);

    let current = report.current.as_ref().unwrap();
    assert_eq!(current.reading.timestamp, datetime!(2024-06-01 17:00 +09:00));
    assert_eq!(current.reading.temperature, 21.5);
    assert_eq!(current.wind_compass, "N");
    assert_eq!(current.category, WeatherCategory::Rain);
    assert_eq!(current.weather_description.as_deref(), Some("雨"));
    assert_eq!(report.observations.len(), 4);
}

#[tokio::test]
async fn forecast_outage_still_reports_observations() {
    let fetcher = Arc::new(observed_afternoon());

    let report = run_pipeline(&settings(), fetcher, &discard_logger())
        .await
        .unwrap();

    assert!(report.temperature_forecast.is_empty());
    assert!(report.precipitation_forecast.is_empty());
    assert_eq!(report.temperature_series.len(), 4);
    assert_eq!(report.umbrella.level_12h, UmbrellaLevel::None);
    assert_eq!(report.forecast.location_name, "Tokyo");
    assert_eq!(
        report.current.as_ref().unwrap().category,
        WeatherCategory::Unknown
    );
}

#[tokio::test]
async fn missing_hours_are_skipped() {
    let fetcher = Arc::new(
        ScriptedFetcher::new()
            .serve(latest_time_url(), "2024-06-01T17:40:00+0900")
            .serve(snapshot_url("20240601174000"), "{}")
            .serve(
                snapshot_url("20240601160000"),
                snapshot_document(22.0, 15),
            )
            .serve(forecast_url(), forecast_document()),
    );

    let report = run_pipeline(&settings(), fetcher, &discard_logger())
        .await
        .unwrap();

    // the only snapshot is treated as the latest and left out of the history
    assert!(report.observations.is_empty());
    assert!(report.current.is_none());
    // one anchor plus forecast is still enough to interpolate
    assert_eq!(
        report.temperature_forecast[0].timestamp,
        datetime!(2024-06-01 17:00 +09:00)
    );
}

#[tokio::test]
async fn unavailable_latest_time_is_fatal() {
    let fetcher = Arc::new(ScriptedFetcher::new().serve(forecast_url(), forecast_document()));

    let result = run_pipeline(&settings(), fetcher.clone(), &discard_logger()).await;

    assert!(matches!(result, Err(PipelineError::NoAnchor)));
    assert_eq!(fetcher.requests(), vec![latest_time_url()]);
}

#[tokio::test]
async fn report_is_written_as_json() {
    let fetcher = Arc::new(observed_afternoon().serve(forecast_url(), forecast_document()));
    let report = run_pipeline(&settings(), fetcher, &discard_logger())
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("nowcast.json");
    write_report(&report, Some(path.as_path()), &discard_logger()).unwrap();

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written["location_name"], "Tokyo");
    assert_eq!(written["umbrella"]["level_12h"], "mandatory");
    assert_eq!(written["observed_at"], "2024-06-01T17:40:00+09:00");
    assert_eq!(written["current"]["wind_direction"], 16);
    assert_eq!(written["forecast"]["weather_codes"][0], "300");
}
