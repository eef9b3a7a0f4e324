//! End-to-end flow over real components: the XML adapter against a stub
//! HTTP client, the DuckDB store on disk, the daily sync and the
//! read-through service.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fxrates_core::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};
use fxrates_core::{
    CbrAdapter, RateDate, RateService, RateSource, RateStore, ServiceError, SnapshotSync,
    StoreConfig,
};
use tempfile::tempdir;

const FEED_DOC: &str = "<?xml version=\"1.0\" encoding=\"windows-1251\"?>\
<ValCurs Date=\"01.03.2024\" name=\"Foreign Currency Market\">\
<Valute ID=\"R01235\">\
<NumCode>840</NumCode><CharCode>USD</CharCode><Nominal>1</Nominal>\
<Name>Доллар США</Name><Value>91,1234</Value>\
</Valute>\
<Valute ID=\"R01820\">\
<NumCode>392</NumCode><CharCode>JPY</CharCode><Nominal>100</Nominal>\
<Name>Японских иен</Name><Value>61,5050</Value>\
</Valute></ValCurs>";

struct FeedStub {
    body: Vec<u8>,
    requests: AtomicUsize,
}

impl FeedStub {
    fn new() -> Self {
        let (encoded, _, unmappable) = encoding_rs::WINDOWS_1251.encode(FEED_DOC);
        assert!(!unmappable);
        Self {
            body: encoded.into_owned(),
            requests: AtomicUsize::new(0),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl HttpClient for FeedStub {
    fn execute<'a>(
        &'a self,
        _request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let body = self.body.clone();
        Box::pin(async move {
            // Keep the request in flight long enough for concurrent
            // cache misses to pile onto it.
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(HttpResponse::ok(body))
        })
    }

    fn is_mock(&self) -> bool {
        true
    }
}

fn open_store(temp: &tempfile::TempDir) -> RateStore {
    RateStore::open(StoreConfig {
        db_path: temp.path().join("cache").join("rates.duckdb"),
        max_pool_size: 2,
    })
    .expect("store open")
}

#[tokio::test]
async fn daily_sync_then_lookups_served_from_the_store() {
    let temp = tempdir().expect("tempdir");
    let store = open_store(&temp);
    let feed = Arc::new(FeedStub::new());
    let adapter = Arc::new(CbrAdapter::new(
        Arc::clone(&feed) as Arc<dyn HttpClient>
    ));
    let date = RateDate::parse("01/03/2024").expect("valid date");

    let sync = SnapshotSync::new(
        store.clone(),
        Arc::clone(&adapter) as Arc<dyn RateSource>,
    );
    let stored = sync.refresh(date).await.expect("sync run");
    assert_eq!(stored, 2);
    assert_eq!(feed.request_count(), 1);

    let service = RateService::new(store, adapter as Arc<dyn RateSource>);

    let usd = service
        .get_rate("USD", Some("01/03/2024"))
        .await
        .expect("usd quote");
    assert_eq!(usd.name, "Доллар США");
    assert_eq!(usd.value, "91.1234");
    assert_eq!(usd.nominal, 1);

    let jpy = service
        .get_rate("jpy", Some("01/03/2024"))
        .await
        .expect("jpy quote");
    assert_eq!(jpy.nominal, 100);
    assert_eq!(jpy.value, "61.5050");

    // Both lookups were hits; the feed saw only the sync's fetch.
    assert_eq!(feed.request_count(), 1);
}

#[tokio::test]
async fn cold_miss_fetches_once_and_warms_the_store_for_later() {
    let temp = tempdir().expect("tempdir");
    let store = open_store(&temp);
    let feed = Arc::new(FeedStub::new());
    let adapter = Arc::new(CbrAdapter::new(
        Arc::clone(&feed) as Arc<dyn HttpClient>
    ));
    let service = RateService::new(store.clone(), adapter as Arc<dyn RateSource>);

    let quote = service
        .get_rate("USD", Some("01/03/2024"))
        .await
        .expect("quote");
    assert_eq!(quote.value, "91.1234");
    assert_eq!(feed.request_count(), 1);

    // The fallback's write-back persisted the whole snapshot, so a
    // different code for the same date is now a store hit.
    let jpy = service
        .get_rate("JPY", Some("01/03/2024"))
        .await
        .expect("quote");
    assert_eq!(jpy.nominal, 100);
    assert_eq!(feed.request_count(), 1);

    assert_eq!(store.count_for_date("2024-03-01").expect("count"), 2);
}

#[tokio::test]
async fn unknown_code_is_not_found_after_a_single_fetch() {
    let temp = tempdir().expect("tempdir");
    let feed = Arc::new(FeedStub::new());
    let adapter = Arc::new(CbrAdapter::new(
        Arc::clone(&feed) as Arc<dyn HttpClient>
    ));
    let service = RateService::new(open_store(&temp), adapter as Arc<dyn RateSource>);

    let error = service
        .get_rate("ZZZ", Some("01/03/2024"))
        .await
        .expect_err("should fail");
    assert!(matches!(error, ServiceError::RateNotFound { .. }));
    assert_eq!(feed.request_count(), 1);
}

#[tokio::test]
async fn concurrent_cold_lookups_coalesce_onto_one_feed_request() {
    let temp = tempdir().expect("tempdir");
    let feed = Arc::new(FeedStub::new());
    let adapter = Arc::new(CbrAdapter::new(
        Arc::clone(&feed) as Arc<dyn HttpClient>
    ));
    let service = Arc::new(RateService::new(
        open_store(&temp),
        adapter as Arc<dyn RateSource>,
    ));

    let mut handles = Vec::new();
    for code in ["USD", "JPY", "USD", "JPY", "USD"] {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.get_rate(code, Some("01/03/2024")).await
        }));
    }
    for handle in handles {
        handle.await.expect("task").expect("quote");
    }
    assert_eq!(feed.request_count(), 1);
}
