//! Read-through currency exchange-rate cache.
//!
//! The crate wires four pieces together: a feed adapter that pulls the
//! central bank's daily XML snapshot ([`adapters::CbrAdapter`]), a
//! persistent DuckDB-backed cache (re-exported from `fxrates-store`), a
//! scheduled daily refresh ([`sync::SnapshotSync`]) and the read-through
//! lookup service ([`service::RateService`]) that answers per-currency
//! queries from the cache and falls back to the live feed on a miss.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod rate_source;
pub mod service;
pub mod singleflight;
pub mod sync;
pub mod xml;

pub use adapters::CbrAdapter;
pub use domain::{normalize_decimal, CurrencyCode, RateDate, RateEntry, Snapshot};
pub use error::ValidationError;
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};
pub use rate_source::{RateSource, SourceError, SourceErrorKind};
pub use service::{FallbackError, RateQuote, RateService, ServiceConfig, ServiceError};
pub use singleflight::SingleFlight;
pub use sync::{SnapshotSync, SyncConfig, SyncError, SyncHandle};

pub use fxrates_store::{RateRecord, RateStore, RateUpsert, StoreConfig, StoreError};
