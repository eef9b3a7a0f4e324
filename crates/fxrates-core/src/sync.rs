//! Daily snapshot synchronization.
//!
//! A background task that, once a day at a fixed local time, pulls the
//! full snapshot from the feed and upserts it into the store. The request
//! path never depends on it; a failed run is logged and retried at the
//! next tick.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use time::macros::{offset, time};
use time::{OffsetDateTime, Time, UtcOffset};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use fxrates_store::{RateStore, RateUpsert, StoreError};

use crate::rate_source::{RateSource, SourceError};
use crate::RateDate;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Local wall-clock time of the daily run.
    pub fire_at: Time,
    /// Offset `fire_at` (and "today") are interpreted in.
    pub utc_offset: UtcOffset,
    /// Deadline on the snapshot fetch.
    pub fetch_timeout: Duration,
    /// Deadline the job waits for the store write.
    pub store_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fire_at: time!(10:00),
            utc_offset: offset!(+3),
            fetch_timeout: Duration::from_secs(10),
            store_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("snapshot fetch exceeded {0} ms")]
    FetchTimeout(u64),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("store write exceeded {0} ms")]
    StoreTimeout(u64),

    #[error("store write task aborted: {0}")]
    Aborted(String),
}

/// The daily refresh job. [`SnapshotSync::spawn`] runs it on a schedule;
/// [`SnapshotSync::run_once`] is the same refresh on demand.
pub struct SnapshotSync {
    store: RateStore,
    source: Arc<dyn RateSource>,
    config: SyncConfig,
}

impl SnapshotSync {
    pub fn new(store: RateStore, source: Arc<dyn RateSource>) -> Self {
        Self::with_config(store, source, SyncConfig::default())
    }

    pub fn with_config(
        store: RateStore,
        source: Arc<dyn RateSource>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
        }
    }

    /// Refresh today's snapshot, with "today" resolved at the configured
    /// offset. Returns the number of rates stored.
    pub async fn run_once(&self) -> Result<usize, SyncError> {
        let date = RateDate::today_at_offset(self.config.utc_offset);
        self.refresh(date).await
    }

    /// Fetch the snapshot for `date` and upsert it as one batch.
    pub async fn refresh(&self, date: RateDate) -> Result<usize, SyncError> {
        log::info!("refreshing daily snapshot for {date}");

        let fetched =
            tokio::time::timeout(self.config.fetch_timeout, self.source.daily_snapshot(date))
                .await;
        let snapshot = match fetched {
            Ok(result) => result?,
            Err(_) => {
                return Err(SyncError::FetchTimeout(
                    self.config.fetch_timeout.as_millis() as u64,
                ))
            }
        };

        let rows: Vec<RateUpsert> = snapshot
            .entries
            .iter()
            .map(|entry| RateUpsert {
                char_code: entry.code.as_str().to_owned(),
                nominal: entry.nominal,
                name: entry.name.clone(),
                value: entry.value.clone(),
            })
            .collect();
        let count = rows.len();

        let store = self.store.clone();
        let sql_date = date.sql();
        let write = tokio::task::spawn_blocking(move || store.save_snapshot(&rows, &sql_date));

        // An expired deadline stops the wait, not the write: the blocking
        // task keeps running and its transaction still commits or rolls
        // back on its own.
        match tokio::time::timeout(self.config.store_timeout, write).await {
            Ok(Ok(Ok(()))) => {
                log::info!("stored {count} rates for {date}");
                Ok(count)
            }
            Ok(Ok(Err(error))) => Err(SyncError::Store(error)),
            Ok(Err(join_error)) => Err(SyncError::Aborted(join_error.to_string())),
            Err(_) => Err(SyncError::StoreTimeout(
                self.config.store_timeout.as_millis() as u64,
            )),
        }
    }

    /// Run the job on its daily schedule until the handle asks it to stop.
    pub fn spawn(self) -> SyncHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            loop {
                let now = OffsetDateTime::now_utc();
                let target = next_occurrence(now, self.config.fire_at, self.config.utc_offset);
                log::info!("next snapshot sync at {target}");

                tokio::select! {
                    _ = tokio::time::sleep(delay_until(target, now)) => {
                        if let Err(error) = self.run_once().await {
                            log::error!("daily snapshot sync failed: {error}");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        log::info!("snapshot sync stopping");
                        return;
                    }
                }
            }
        });

        SyncHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Owner of the scheduled task. Dropping it without calling
/// [`SyncHandle::shutdown`] leaves the task running detached.
pub struct SyncHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Signal the task to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Next wall-clock moment the job should fire: today at `fire_at` in
/// `offset` if that is still ahead of `now`, otherwise tomorrow.
pub fn next_occurrence(now: OffsetDateTime, fire_at: Time, offset: UtcOffset) -> OffsetDateTime {
    let local = now.to_offset(offset);
    let mut date = local.date();
    if local.time() >= fire_at {
        date = date.next_day().unwrap_or(date);
    }
    date.with_time(fire_at).assume_offset(offset)
}

fn delay_until(target: OffsetDateTime, now: OffsetDateTime) -> Duration {
    let gap = target - now;
    if gap.is_negative() {
        Duration::ZERO
    } else {
        gap.unsigned_abs()
    }
}
