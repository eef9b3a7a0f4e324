use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::http_client::{HttpClient, HttpRequest};
use crate::rate_source::{RateSource, SourceError};
use crate::xml;
use crate::{RateDate, Snapshot};

const DEFAULT_BASE_URL: &str = "https://www.cbr.ru/scripts/XML_daily.asp";
// The feed rejects default library user agents.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X x.y; rv:42.0) Gecko/20100101 Firefox/42.0";

/// Adapter over the central bank's daily-rates endpoint. Pure protocol
/// translation: one GET per call, charset-aware XML decode, no caching.
#[derive(Clone)]
pub struct CbrAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    request_timeout_ms: u64,
}

impl CbrAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            base_url: String::from(DEFAULT_BASE_URL),
            request_timeout_ms: 10_000,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_request_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    fn request_url(&self, date: RateDate) -> String {
        format!(
            "{}?date_req={}",
            self.base_url,
            urlencoding::encode(&date.feed())
        )
    }
}

impl RateSource for CbrAdapter {
    fn daily_snapshot<'a>(
        &'a self,
        date: RateDate,
    ) -> Pin<Box<dyn Future<Output = Result<Snapshot, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let request = HttpRequest::get(self.request_url(date))
                .with_header("user-agent", USER_AGENT)
                .with_timeout_ms(self.request_timeout_ms);

            let response = self.http_client.execute(request).await.map_err(|error| {
                if error.retryable() {
                    SourceError::unavailable(format!("feed transport error: {}", error.message()))
                } else {
                    SourceError::internal(format!("feed transport error: {}", error.message()))
                }
            })?;

            if !response.is_success() {
                return Err(SourceError::upstream_status(response.status));
            }

            xml::decode_snapshot(&response.body, date)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::SourceErrorKind;
    use std::sync::Mutex;

    struct RecordingHttpClient {
        response: Result<HttpResponse, HttpError>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl RecordingHttpClient {
        fn with_response(response: Result<HttpResponse, HttpError>) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn recorded_requests(&self) -> Vec<HttpRequest> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .clone()
        }
    }

    impl HttpClient for RecordingHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests
                .lock()
                .expect("request store should not be poisoned")
                .push(request);
            let response = self.response.clone();
            Box::pin(async move { response })
        }

        fn is_mock(&self) -> bool {
            true
        }
    }

    const DOC: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
<ValCurs><Valute><CharCode>USD</CharCode><Nominal>1</Nominal>\
<Name>US Dollar</Name><Value>91,1234</Value></Valute></ValCurs>";

    fn day() -> RateDate {
        RateDate::parse("01/03/2024").expect("valid date")
    }

    #[tokio::test]
    async fn issues_one_get_with_date_and_user_agent() {
        let client = Arc::new(RecordingHttpClient::with_response(Ok(HttpResponse::ok(
            DOC.as_bytes().to_vec(),
        ))));
        let adapter = CbrAdapter::new(Arc::clone(&client) as Arc<dyn HttpClient>)
            .with_base_url("https://feed.test/daily");

        let snapshot = adapter.daily_snapshot(day()).await.expect("snapshot");
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.entries[0].value, "91.1234");

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url,
            "https://feed.test/daily?date_req=01%2F03%2F2024"
        );
        assert_eq!(
            requests[0].headers.get("user-agent").map(String::as_str),
            Some(USER_AGENT)
        );
    }

    #[tokio::test]
    async fn transport_failure_maps_to_unavailable() {
        let client = Arc::new(RecordingHttpClient::with_response(Err(HttpError::new(
            "connection refused",
        ))));
        let adapter = CbrAdapter::new(client as Arc<dyn HttpClient>);

        let error = adapter.daily_snapshot(day()).await.expect_err("should fail");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert!(error.retryable());
    }

    #[tokio::test]
    async fn non_success_status_maps_to_upstream_status() {
        let client = Arc::new(RecordingHttpClient::with_response(Ok(HttpResponse {
            status: 503,
            body: Vec::new(),
        })));
        let adapter = CbrAdapter::new(client as Arc<dyn HttpClient>);

        let error = adapter.daily_snapshot(day()).await.expect_err("should fail");
        assert_eq!(error.kind(), SourceErrorKind::UpstreamStatus);
        assert!(error.message().contains("503"));
    }

    #[tokio::test]
    async fn truncated_body_maps_to_decode() {
        let client = Arc::new(RecordingHttpClient::with_response(Ok(HttpResponse::ok(
            b"<ValCurs><Valute><CharCode>USD".to_vec(),
        ))));
        let adapter = CbrAdapter::new(client as Arc<dyn HttpClient>);

        let error = adapter.daily_snapshot(day()).await.expect_err("should fail");
        assert_eq!(error.kind(), SourceErrorKind::Decode);
    }
}
