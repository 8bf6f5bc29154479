use nowcast::{
    get_config_info, run_pipeline, setup_logger, write_report, Fetcher, HttpFetcher, Settings,
};
use slog::{error, info, Logger};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::time::interval;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), anyhow::Error> {
    let cli = get_config_info();
    let logger = setup_logger(&cli);

    let settings = match Settings::from_cli(&cli) {
        Ok(settings) => settings,
        Err(err) => {
            error!(logger, "Invalid configuration: {}", err);
            return Err(err);
        }
    };

    info!(logger, "JMA Nowcast starting...");
    info!(logger, "  Location: {}", settings.location.name);
    info!(logger, "  Station: {}", settings.location.station_id);
    info!(logger, "  History: {} hours", settings.history_hours);
    info!(logger, "  Fetch delay: {} ms", settings.fetch_delay.as_millis());

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
        logger.clone(),
        &cli.user_agent(),
        cli.timeout(),
    )?);
    let output = cli.output.clone().map(PathBuf::from);

    match cli.repeat_interval {
        Some(seconds) if seconds > 0 => {
            run_repeatedly(&settings, fetcher, output, &logger, seconds).await;
            Ok(())
        }
        _ => run_once(&settings, fetcher, output.as_ref(), &logger).await,
    }
}

async fn run_once(
    settings: &Settings,
    fetcher: Arc<dyn Fetcher>,
    output: Option<&PathBuf>,
    logger: &Logger,
) -> Result<(), anyhow::Error> {
    let report = run_pipeline(settings, fetcher, logger).await?;
    write_report(&report, output.map(PathBuf::as_path), logger)?;
    Ok(())
}

async fn run_repeatedly(
    settings: &Settings,
    fetcher: Arc<dyn Fetcher>,
    output: Option<PathBuf>,
    logger: &Logger,
    seconds: u64,
) {
    info!(logger, "Wait time between runs: {} seconds", seconds);

    let mut run_interval = interval(Duration::from_secs(seconds));
    loop {
        tokio::select! {
            _ = run_interval.tick() => {
                match run_once(settings, fetcher.clone(), output.as_ref(), logger).await {
                    Ok(_) => info!(logger, "Finished nowcast, waiting {} seconds for next run", seconds),
                    Err(err) => error!(logger, "Error running nowcast: {}", err),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!(logger, "Shutting down");
                break;
            }
        }
    }
}
