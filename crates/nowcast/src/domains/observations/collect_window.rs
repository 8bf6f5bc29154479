use slog::{error, info};
use std::time::Duration as StdDuration;
use time::{Duration, OffsetDateTime};
use tokio::time::sleep;

use super::{ObservationError, ObservationService, ObservationSnapshot};

/// Sleeps a fixed delay before every call but the first
struct Pacer {
    delay: StdDuration,
    started: bool,
}

impl Pacer {
    fn new(delay: StdDuration) -> Self {
        Pacer {
            delay,
            started: false,
        }
    }

    async fn wait(&mut self) {
        if self.started && !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.started = true;
    }
}

fn truncate_to_hour(timestamp: OffsetDateTime) -> Result<OffsetDateTime, ObservationError> {
    Ok(timestamp
        .replace_minute(0)?
        .replace_second(0)?
        .replace_nanosecond(0)?)
}

impl ObservationService {
    async fn anchor(&self) -> Result<OffsetDateTime, ObservationError> {
        match self.latest_observation_time().await {
            Some(latest) => Ok(latest),
            None => {
                error!(self.logger, "cannot collect observations without an anchor time");
                Err(ObservationError::NoAnchor)
            }
        }
    }

    /// Up to `hours` snapshots at the anchor and each whole hour back from
    /// it, newest first
    ///
    /// Steps run from `anchor - 0h` to `anchor - (hours - 1)h`, all on the
    /// anchor's own minute. Unavailable snapshots are skipped, never fatal.
    pub async fn collect_window(
        &self,
        station_id: &str,
        hours: u32,
        delay: StdDuration,
    ) -> Result<Vec<ObservationSnapshot>, ObservationError> {
        let anchor = self.anchor().await?;
        let mut pacer = Pacer::new(delay);
        let mut collected = Vec::new();

        for step in 0..i64::from(hours) {
            pacer.wait().await;
            let at = anchor - Duration::hours(step);
            if let Some(snapshot) = self.fetch_snapshot(station_id, at).await {
                collected.push(snapshot);
            }
        }

        info!(
            self.logger,
            "collected {} of {} snapshots for {} ending {}",
            collected.len(),
            hours,
            station_id,
            anchor
        );
        Ok(collected)
    }

    /// The latest snapshot, then hour-aligned snapshots going back, at most
    /// `hours` fetches in total
    ///
    /// Steps are `trunc_hour(anchor) - h` for `h = 0, 1, ...`. A step is
    /// skipped only when it coincides with the anchor itself, so an anchor
    /// that already sits on the hour is fetched once.
    pub async fn collect_window_with_latest(
        &self,
        station_id: &str,
        hours: u32,
        delay: StdDuration,
    ) -> Result<Vec<ObservationSnapshot>, ObservationError> {
        let anchor = self.anchor().await?;
        self.collect_window_with_latest_at(station_id, anchor, hours, delay)
            .await
    }

    /// As `collect_window_with_latest`, for an anchor the caller already holds
    pub async fn collect_window_with_latest_at(
        &self,
        station_id: &str,
        anchor: OffsetDateTime,
        hours: u32,
        delay: StdDuration,
    ) -> Result<Vec<ObservationSnapshot>, ObservationError> {
        let on_the_hour = truncate_to_hour(anchor)?;
        let mut pacer = Pacer::new(delay);
        let mut collected = Vec::new();
        if hours == 0 {
            return Ok(collected);
        }

        pacer.wait().await;
        if let Some(latest) = self.fetch_snapshot(station_id, anchor).await {
            collected.push(latest);
        }

        // the latest fetch takes the first of the `hours` slots
        let hourly_steps = (0_i64..)
            .map(|step| on_the_hour - Duration::hours(step))
            .filter(|at| *at != anchor)
            .take(hours as usize - 1);
        for at in hourly_steps {
            pacer.wait().await;
            if let Some(snapshot) = self.fetch_snapshot(station_id, at).await {
                collected.push(snapshot);
            }
        }

        info!(
            self.logger,
            "collected {} snapshots for {} (latest {}, {}h history)",
            collected.len(),
            station_id,
            anchor,
            hours
        );
        Ok(collected)
    }
}
