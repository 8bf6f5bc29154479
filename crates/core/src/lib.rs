//! JMA Nowcast Core Library
//!
//! Shared utilities for the nowcast services:
//! - Configuration loading (XDG-compliant)
//! - File system utilities
//! - Provider endpoints and timing defaults

mod config;
pub mod fs;

pub use config::{find_config_file, load_config, ConfigSource};
pub use fs::ensure_parent_dir;

/// Application name used for XDG paths
pub const APP_NAME: &str = "jma-nowcast";

/// Forecast provider root; `{meso_area_code}.json` is appended
pub const DEFAULT_FORECAST_BASE_URL: &str = "https://www.jma.go.jp/bosai/forecast/data/forecast";

/// Observation provider root; `latest_time.txt` and `map/{key}.json` live under it
pub const DEFAULT_AMEDAS_BASE_URL: &str = "https://www.jma.go.jp/bosai/amedas/data";

/// Courtesy delay between successive observation fetches (milliseconds)
pub const DEFAULT_FETCH_DELAY_MS: u64 = 1000;

/// Hours of observation history collected per run
pub const DEFAULT_HISTORY_HOURS: u32 = 12;

/// Number of true observations that anchor the temperature interpolation
pub const DEFAULT_ANCHOR_COUNT: usize = 3;

/// HTTP timeout (seconds)
pub const DEFAULT_HTTP_TIMEOUT: u64 = 20;
