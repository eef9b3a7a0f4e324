//! Read-through rate lookups: cache first, live feed on a miss.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use time::macros::offset;
use time::UtcOffset;

use fxrates_store::{RateRecord, RateStore, RateUpsert, StoreError};

use crate::rate_source::{RateSource, SourceError};
use crate::singleflight::SingleFlight;
use crate::{CurrencyCode, RateDate, Snapshot, ValidationError};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Outer deadline on one live-feed fallback, request to decoded body.
    pub fetch_timeout: Duration,
    /// Offset the feed publishes in; "today" is resolved against it.
    pub feed_offset: UtcOffset,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            feed_offset: offset!(+3),
        }
    }
}

/// One answered lookup. Serializes in the response payload's field order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateQuote {
    pub name: String,
    pub char_code: CurrencyCode,
    pub date: RateDate,
    pub value: String,
    pub nominal: i64,
}

/// Failure of the live-feed fallback. `Clone` because every request
/// coalesced onto one fetch receives the same outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FallbackError {
    #[error("live fetch exceeded {0} ms")]
    TimedOut(u64),

    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    InvalidInput(#[from] ValidationError),

    /// Neither the cache nor the live feed knows the code for that date.
    #[error("no rate for {code} on {date}")]
    RateNotFound { code: CurrencyCode, date: RateDate },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Fetch(#[from] FallbackError),

    #[error("background task failed: {0}")]
    Task(String),
}

/// Read-through orchestrator over the cache and the live feed.
///
/// Lookup order is fixed: validate, point-read the store, and only on a
/// confirmed miss fetch the day's snapshot from the source. Concurrent
/// misses for the same date coalesce onto a single fetch, and a fetched
/// snapshot is written back best-effort so the next lookup is a hit.
pub struct RateService {
    store: RateStore,
    source: Arc<dyn RateSource>,
    fallback: SingleFlight<RateDate, Result<Snapshot, FallbackError>>,
    config: ServiceConfig,
}

impl RateService {
    pub fn new(store: RateStore, source: Arc<dyn RateSource>) -> Self {
        Self::with_config(store, source, ServiceConfig::default())
    }

    pub fn with_config(
        store: RateStore,
        source: Arc<dyn RateSource>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            store,
            source,
            fallback: SingleFlight::new(),
            config,
        }
    }

    /// Look up one currency's rate. `date` is the feed's `DD/MM/YYYY` form;
    /// `None` means today at the feed's offset.
    pub async fn get_rate(
        &self,
        code: &str,
        date: Option<&str>,
    ) -> Result<RateQuote, ServiceError> {
        let code = CurrencyCode::parse(code)?;
        let date = match date {
            Some(raw) => RateDate::parse(raw)?,
            None => RateDate::today_at_offset(self.config.feed_offset),
        };

        if let Some(record) = self.store_get(&code, date).await? {
            log::debug!("cache hit for {code} on {date}");
            return Ok(RateQuote {
                name: record.name,
                char_code: code,
                date,
                value: record.value,
                nominal: record.nominal,
            });
        }

        log::debug!("cache miss for {code} on {date}, querying the live feed");
        let snapshot = self.fetch_shared(date).await?;
        match snapshot.find(&code) {
            Some(entry) => Ok(RateQuote {
                name: entry.name.clone(),
                char_code: entry.code.clone(),
                date,
                value: entry.value.clone(),
                nominal: entry.nominal,
            }),
            None => Err(ServiceError::RateNotFound { code, date }),
        }
    }

    async fn store_get(
        &self,
        code: &CurrencyCode,
        date: RateDate,
    ) -> Result<Option<RateRecord>, ServiceError> {
        let store = self.store.clone();
        let code = code.as_str().to_owned();
        let date = date.sql();
        tokio::task::spawn_blocking(move || store.get(&code, &date))
            .await
            .map_err(|error| ServiceError::Task(error.to_string()))?
            .map_err(ServiceError::from)
    }

    /// One live fetch per date at a time: the first miss runs it, every
    /// concurrent miss for the same date waits for the shared outcome.
    /// The leader also writes the snapshot back before resolving, so
    /// waiters observe a warm cache afterwards.
    async fn fetch_shared(&self, date: RateDate) -> Result<Snapshot, FallbackError> {
        self.fallback
            .run(date, || async move {
                let budget = self.config.fetch_timeout;
                let fetched =
                    tokio::time::timeout(budget, self.source.daily_snapshot(date)).await;
                let snapshot = match fetched {
                    Ok(result) => result.map_err(FallbackError::Source)?,
                    Err(_) => return Err(FallbackError::TimedOut(budget.as_millis() as u64)),
                };
                self.write_back(&snapshot).await;
                Ok(snapshot)
            })
            .await
    }

    /// Best-effort persistence of a fallback snapshot. A failure here is
    /// logged and swallowed: the caller already holds fresh data, and the
    /// daily sync will repair the cache.
    async fn write_back(&self, snapshot: &Snapshot) {
        if snapshot.is_empty() {
            return;
        }

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
        let store = self.store.clone();
        let day = snapshot.date;
        let date = day.sql();

        match tokio::task::spawn_blocking(move || store.save_snapshot(&rows, &date)).await {
            Ok(Ok(())) => log::debug!("wrote back {} rates for {day}", snapshot.len()),
            Ok(Err(error)) => log::warn!("write-back for {day} failed: {error}"),
            Err(error) => log::warn!("write-back task for {day} failed: {error}"),
        }
    }
}
