use anyhow::{anyhow, Error};
use async_trait::async_trait;
use nowcast::{Fetcher, Location, Settings};
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Mutex, time::Duration};

pub const FORECAST_BASE: &str = "https://forecast.test/data/forecast";
pub const AMEDAS_BASE: &str = "https://amedas.test/data";
pub const STATION: &str = "44132";

/// Serves canned bodies by exact URL; anything else is a 404
pub struct ScriptedFetcher {
    responses: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        ScriptedFetcher {
            responses: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn serve(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.insert(url.into(), body.into());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, Error> {
        self.requests.lock().unwrap().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("error response from {}: 404 Not Found", url))
    }
}

pub fn settings() -> Settings {
    Settings {
        location: Location {
            name: String::from("Tokyo"),
            meso_area_code: String::from("130000"),
            local_area_code: String::from("130010"),
            city_code: String::from("44132"),
            station_id: String::from(STATION),
        },
        forecast_base_url: FORECAST_BASE.to_string(),
        amedas_base_url: AMEDAS_BASE.to_string(),
        fetch_delay: Duration::ZERO,
        // latest plus four whole hours
        history_hours: 5,
        anchor_count: 3,
    }
}

pub fn snapshot_url(key: &str) -> String {
    format!("{}/map/{}.json", AMEDAS_BASE, key)
}

pub fn latest_time_url() -> String {
    format!("{}/latest_time.txt", AMEDAS_BASE)
}

pub fn forecast_url() -> String {
    format!("{}/130000.json", FORECAST_BASE)
}

/// A map document with our station and a neighbour
pub fn snapshot_document(temp: f64, wind_direction: u8) -> String {
    let station: Value = json!({
        "pressure": [1006.4, 0],
        "normalPressure": [1009.8, 0],
        "temp": [temp, 0],
        "humidity": [68, 0],
        "visibility": [20000.0, 0],
        "snow": [null, 6],
        "sun10m": [0, 0],
        "sun1h": [0.1, 0],
        "precipitation10m": [0.0, 0],
        "precipitation1h": [0.0, 0],
        "precipitation3h": [0.0, 0],
        "precipitation24h": [0.0, 0],
        "windDirection": [wind_direction, 0],
        "wind": [3.4, 0]
    });
    json!({
        STATION: station,
        "44136": { "temp": [20.1, 0], "wind": [2.0, 0] }
    })
    .to_string()
}

pub fn forecast_document() -> String {
    json!([
        {
            "publishingOffice": "気象庁",
            "reportDatetime": "2024-06-01T17:00:00+09:00",
            "timeSeries": [
                {
                    "timeDefines": [
                        "2024-06-01T17:00:00+09:00",
                        "2024-06-02T00:00:00+09:00",
                        "2024-06-03T00:00:00+09:00"
                    ],
                    "areas": [
                        {
                            "area": { "name": "東京地方", "code": "130010" },
                            "weatherCodes": ["300", "313", "201"],
                            "weathers": ["雨", "雨　のち　くもり", "くもり　時々　晴れ"],
                            "winds": ["北の風", "北の風", "南の風"]
                        }
                    ]
                },
                {
                    "timeDefines": [
                        "2024-06-01T18:00:00+09:00",
                        "2024-06-02T00:00:00+09:00",
                        "2024-06-02T06:00:00+09:00",
                        "2024-06-02T12:00:00+09:00"
                    ],
                    "areas": [
                        {
                            "area": { "name": "東京地方", "code": "130010" },
                            "pops": ["20", "40", "70", "30"]
                        }
                    ]
                },
                {
                    "timeDefines": [
                        "2024-06-01T21:00:00+09:00",
                        "2024-06-02T00:00:00+09:00",
                        "2024-06-02T09:00:00+09:00"
                    ],
                    "areas": [
                        {
                            "area": { "name": "東京", "code": "44132" },
                            "temps": ["19", "17", "24"]
                        }
                    ]
                }
            ]
        },
        {
            "publishingOffice": "気象庁",
            "reportDatetime": "2024-06-01T17:00:00+09:00",
            "timeSeries": []
        }
    ])
    .to_string()
}

/// Latest time 17:40 plus the hourly snapshots back to 14:00
pub fn observed_afternoon() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .serve(latest_time_url(), "2024-06-01T17:40:00+09:00")
        .serve(snapshot_url("20240601174000"), snapshot_document(21.2, 16))
        .serve(snapshot_url("20240601170000"), snapshot_document(21.5, 16))
        .serve(snapshot_url("20240601160000"), snapshot_document(22.0, 15))
        .serve(snapshot_url("20240601150000"), snapshot_document(22.6, 15))
        .serve(snapshot_url("20240601140000"), snapshot_document(23.0, 14))
}
