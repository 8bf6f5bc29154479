use anyhow::{anyhow, Error};
use async_trait::async_trait;
use clap::Parser;
use nowcast_core::{
    find_config_file, load_config, ConfigSource, DEFAULT_AMEDAS_BASE_URL, DEFAULT_ANCHOR_COUNT,
    DEFAULT_FETCH_DELAY_MS, DEFAULT_FORECAST_BASE_URL, DEFAULT_HISTORY_HOURS, DEFAULT_HTTP_TIMEOUT,
};
use reqwest::Client;
use slog::{debug, o, Drain, Level, Logger};
use std::{env, time::Duration};

#[cfg(test)]
use mockall::automock;

#[derive(Parser, Clone, Debug, serde::Deserialize, Default)]
#[command(
    author,
    version,
    about = "JMA Nowcast - hourly temperature and umbrella outlook for one AMeDAS station"
)]
pub struct Cli {
    /// Path to config file (TOML format)
    /// Searched in order: this flag, $NOWCAST_CONFIG, ./nowcast.toml,
    /// $XDG_CONFIG_HOME/jma-nowcast/nowcast.toml, /etc/jma-nowcast/nowcast.toml
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, env = "NOWCAST_LEVEL")]
    pub level: Option<String>,

    /// Display name of the location
    #[arg(long, env = "LOCATION_NAME")]
    pub location_name: Option<String>,

    /// Forecast office code, selects the forecast document (e.g. 130000)
    #[arg(long, env = "MESO_AREA_CODE")]
    pub meso_area_code: Option<String>,

    /// Broader area code, source of precipitation probability (e.g. 130010)
    #[arg(long, env = "LOCAL_AREA_CODE")]
    pub local_area_code: Option<String>,

    /// City-level code, source of temperature (e.g. 44132)
    #[arg(long, env = "CITY_CODE")]
    pub city_code: Option<String>,

    /// AMeDAS station id used for observations (e.g. 44132)
    #[arg(long, env = "AMEDAS_STATION_ID")]
    pub station_id: Option<String>,

    /// Forecast provider root URL
    #[arg(long, env = "NOWCAST_FORECAST_BASE_URL")]
    pub forecast_base_url: Option<String>,

    /// Observation provider root URL
    #[arg(long, env = "NOWCAST_AMEDAS_BASE_URL")]
    pub amedas_base_url: Option<String>,

    /// Delay between observation requests in milliseconds
    #[arg(long, env = "NOWCAST_FETCH_DELAY_MS")]
    pub fetch_delay_ms: Option<u64>,

    /// Hours of observation history to collect
    #[arg(long, env = "NOWCAST_HISTORY_HOURS")]
    pub history_hours: Option<u32>,

    /// Number of recent observations that anchor the temperature curve
    #[arg(long, env = "NOWCAST_ANCHOR_COUNT")]
    pub anchor_count: Option<usize>,

    /// HTTP timeout in seconds
    #[arg(long, env = "NOWCAST_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long, env = "NOWCAST_OUTPUT")]
    pub output: Option<String>,

    /// Re-run the pipeline every N seconds instead of once
    #[arg(long, env = "NOWCAST_REPEAT_INTERVAL")]
    pub repeat_interval: Option<u64>,

    /// HTTP User-Agent header for provider requests
    #[arg(long, env = "NOWCAST_USER_AGENT")]
    pub user_agent: Option<String>,
}

/// The single location a run is computed for
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub name: String,
    pub meso_area_code: String,
    pub local_area_code: String,
    pub city_code: String,
    pub station_id: String,
}

impl Cli {
    /// Required location settings; every missing key is named in the error
    pub fn location(&self) -> Result<Location, Error> {
        let fields = [
            ("LOCATION_NAME", &self.location_name),
            ("MESO_AREA_CODE", &self.meso_area_code),
            ("LOCAL_AREA_CODE", &self.local_area_code),
            ("CITY_CODE", &self.city_code),
            ("AMEDAS_STATION_ID", &self.station_id),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(anyhow!(
                "missing required location settings: {}",
                missing.join(", ")
            ));
        }

        Ok(Location {
            name: self.location_name.clone().unwrap_or_default(),
            meso_area_code: self.meso_area_code.clone().unwrap_or_default(),
            local_area_code: self.local_area_code.clone().unwrap_or_default(),
            city_code: self.city_code.clone().unwrap_or_default(),
            station_id: self.station_id.clone().unwrap_or_default(),
        })
    }

    pub fn forecast_base_url(&self) -> String {
        self.forecast_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_FORECAST_BASE_URL.to_string())
    }

    pub fn amedas_base_url(&self) -> String {
        self.amedas_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_AMEDAS_BASE_URL.to_string())
    }

    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms.unwrap_or(DEFAULT_FETCH_DELAY_MS))
    }

    pub fn history_hours(&self) -> u32 {
        self.history_hours.unwrap_or(DEFAULT_HISTORY_HOURS)
    }

    pub fn anchor_count(&self) -> usize {
        self.anchor_count.unwrap_or(DEFAULT_ANCHOR_COUNT)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT))
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("jma-nowcast/{}", env!("CARGO_PKG_VERSION")))
    }
}

/// Load configuration from CLI args, config file, and environment
pub fn get_config_info() -> Cli {
    let cli_args = Cli::parse();

    let source = if let Some(ref path) = cli_args.config {
        ConfigSource::Explicit(path.into())
    } else {
        find_config_file("NOWCAST_CONFIG", "nowcast.toml")
    };

    let file_config: Cli = load_config(&source).unwrap_or_default();
    merge_config(cli_args, file_config)
}

/// CLI args override file config (env vars are already folded in by clap)
pub fn merge_config(cli_args: Cli, file_config: Cli) -> Cli {
    Cli {
        config: cli_args.config,
        level: cli_args.level.or(file_config.level),
        location_name: cli_args.location_name.or(file_config.location_name),
        meso_area_code: cli_args.meso_area_code.or(file_config.meso_area_code),
        local_area_code: cli_args.local_area_code.or(file_config.local_area_code),
        city_code: cli_args.city_code.or(file_config.city_code),
        station_id: cli_args.station_id.or(file_config.station_id),
        forecast_base_url: cli_args.forecast_base_url.or(file_config.forecast_base_url),
        amedas_base_url: cli_args.amedas_base_url.or(file_config.amedas_base_url),
        fetch_delay_ms: cli_args.fetch_delay_ms.or(file_config.fetch_delay_ms),
        history_hours: cli_args.history_hours.or(file_config.history_hours),
        anchor_count: cli_args.anchor_count.or(file_config.anchor_count),
        timeout: cli_args.timeout.or(file_config.timeout),
        output: cli_args.output.or(file_config.output),
        repeat_interval: cli_args.repeat_interval.or(file_config.repeat_interval),
        user_agent: cli_args.user_agent.or(file_config.user_agent),
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::Trace,
        "debug" => Level::Debug,
        "info" => Level::Info,
        "warn" => Level::Warning,
        "error" => Level::Error,
        _ => Level::Info,
    }
}

pub fn setup_logger(cli: &Cli) -> Logger {
    let log_level = match cli.level.as_ref() {
        Some(level) => parse_level(level),
        None => parse_level(&env::var("RUST_LOG").unwrap_or_default()),
    };

    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(log_level).fuse();
    slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

/// Plain-text retrieval from the providers
///
/// Services only see this trait, so the network can be swapped for
/// scripted responses.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, Error>;
}

pub struct HttpFetcher {
    logger: Logger,
    client: Client,
}

impl HttpFetcher {
    pub fn new(logger: Logger, user_agent: &str, timeout: Duration) -> Result<HttpFetcher, Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("error building http client: {}", e))?;
        Ok(Self { logger, client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, Error> {
        debug!(self.logger, "requesting: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("error sending request: {}", e))?;
        if !response.status().is_success() {
            return Err(anyhow!(
                "error response from {}: {}",
                url,
                response.status()
            ));
        }
        match response.text().await {
            Ok(body) => Ok(body),
            Err(e) => Err(anyhow!("error reading body of request: {}", e)),
        }
    }
}

/// Logger that drops everything, for tests and library callers without one
pub fn discard_logger() -> Logger {
    Logger::root(slog::Discard, o!())
}
