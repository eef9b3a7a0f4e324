use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{RateDate, Snapshot};

/// Feed-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// Transport failure (network, DNS, TLS, timeout).
    Unavailable,
    /// The feed answered with a non-success status.
    UpstreamStatus,
    /// The body could not be transcoded or parsed.
    Decode,
    Internal,
}

/// Structured feed error. `Clone` so coalesced fallback waiters can share
/// the leader's failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn upstream_status(status: u16) -> Self {
        Self {
            kind: SourceErrorKind::UpstreamStatus,
            message: format!("feed returned status {status}"),
            retryable: true,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Decode,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "feed.unavailable",
            SourceErrorKind::UpstreamStatus => "feed.upstream_status",
            SourceErrorKind::Decode => "feed.decode",
            SourceErrorKind::Internal => "feed.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Feed adapter contract: one outbound call, one decoded snapshot. No
/// caching, no filtering, no retries here — callers own recovery policy.
pub trait RateSource: Send + Sync {
    fn daily_snapshot<'a>(
        &'a self,
        date: RateDate,
    ) -> Pin<Box<dyn Future<Output = Result<Snapshot, SourceError>> + Send + 'a>>;
}
