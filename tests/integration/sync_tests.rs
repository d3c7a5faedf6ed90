//! Inventory sync pipeline tests

use async_trait::async_trait;
use catalog_harvest::config::Config;
use catalog_harvest::crawler::Fetcher;
use catalog_harvest::events::{EventSink, SinkClosed, SyncEvent};
use catalog_harvest::sync::{
    sync_stream, ExportSink, FileExport, HttpExport, InventoryRow, SyncOutcome, Syncer,
};
use catalog_harvest::UploadError;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRODUCTS_PATH: &str = "/wp-json/wc/store/v1/products";

fn sync_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.fetcher.timeout_ms = 2_000;
    config.inventory.listing_url = format!("{}{}?per_page=100&page={{page}}", base_url, PRODUCTS_PATH);
    config.inventory.retries = 2;
    config.inventory.retry_wait_ms = 10;
    config.inventory.page_delay_ms = 0;
    config.export.retries = 3;
    config.export.retry_wait_ms = 10;
    config
}

fn fetcher_for(config: &Config) -> Fetcher {
    Fetcher::from_config(&config.fetcher, &config.user_agent).expect("Failed to build fetcher")
}

fn product(name: &str, quantity: u32) -> Value {
    json!({
        "id": 1,
        "name": name,
        "permalink": format!("https://store.example.com/product/{}/", name),
        "prices": {
            "price": "120000",
            "regular_price": "150000",
            "sale_price": "120000",
            "currency_symbol": "T"
        },
        "stock_availability": {"text": "In stock", "class": "in-stock"},
        "add_to_cart": {"maximum": quantity}
    })
}

async fn mount_inventory_page(server: &MockServer, page: u32, total_pages: u32, names: &[&str]) {
    let products: Vec<Value> = names.iter().map(|n| product(n, 5)).collect();
    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-WP-TotalPages", total_pages.to_string().as_str())
                .insert_header("X-WP-Total", "3")
                .set_body_json(Value::Array(products)),
        )
        .mount(server)
        .await;
}

fn statuses(events: &[SyncEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            SyncEvent::Status { msg } => Some(msg.clone()),
            _ => None,
        })
        .collect()
}

/// Fails the first `failures` updates, then succeeds
struct FlakyExport {
    failures: u32,
    calls: AtomicU32,
}

impl FlakyExport {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExportSink for FlakyExport {
    async fn update(&self, _rows: &[InventoryRow]) -> Result<String, UploadError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(UploadError::Rejected {
                target: "flaky".to_string(),
                message: format!("quota exceeded on call {}", call),
            });
        }
        Ok("https://sheets.example.com/inventory".to_string())
    }
}

#[tokio::test]
async fn test_sync_to_file_reports_location_then_done() {
    let server = MockServer::start().await;
    mount_inventory_page(&server, 1, 2, &["pad", "disc"]).await;
    mount_inventory_page(&server, 2, 2, &["filter"]).await;

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("inventory.json");
    let config = sync_config(&server.uri());
    let export = Arc::new(FileExport::new(&target));

    let mut syncer = Syncer::new(&fetcher_for(&config), &config, export, Vec::new());
    let outcome = syncer.run().await;
    let events = syncer.into_sink();

    let location = match outcome {
        SyncOutcome::Completed { rows, location } => {
            assert_eq!(rows, 3);
            location
        }
        other => panic!("expected Completed, got {:?}", other),
    };
    assert!(location.starts_with("file://"), "{}", location);
    assert!(location.ends_with("inventory.json"), "{}", location);

    let n = events.len();
    assert_eq!(events[n - 2], SyncEvent::SheetUrl { url: location });
    assert_eq!(events[n - 1], SyncEvent::Done);
    assert!(!events.iter().any(|e| matches!(e, SyncEvent::Error { .. })));

    let messages = statuses(&events);
    assert_eq!(messages[0], "Starting inventory sync");
    assert_eq!(messages[1], "Page 1 of 2 fetched (2 products)");
    assert_eq!(messages[2], "Page 2 of 2 fetched (3 products)");
    assert!(messages[3].starts_with("Fetched 3 rows in "), "{}", messages[3]);
    assert_eq!(messages[4], "Updating export sheet (attempt 1/3)");

    let written: Vec<InventoryRow> =
        serde_json::from_slice(&std::fs::read(&target).unwrap()).unwrap();
    assert_eq!(written.len(), 3);
    assert_eq!(written[0].name.as_deref(), Some("pad"));
    assert_eq!(written[0].quantity.as_deref(), Some("5"));
    assert_eq!(written[0].in_stock.as_deref(), Some("In stock"));
    assert_eq!(written[2].name.as_deref(), Some("filter"));
}

#[tokio::test]
async fn test_missing_page_header_means_single_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([product("pad", 1)])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let config = sync_config(&server.uri());
    let export = Arc::new(FlakyExport::new(0));
    let mut syncer = Syncer::new(&fetcher_for(&config), &config, export.clone(), Vec::new());

    let outcome = syncer.run().await;

    assert!(matches!(outcome, SyncOutcome::Completed { rows: 1, .. }));
    assert_eq!(export.calls(), 1);
}

#[tokio::test]
async fn test_page_total_comes_from_first_page() {
    let server = MockServer::start().await;
    mount_inventory_page(&server, 1, 3, &["pad"]).await;
    for (page, name) in [(2, "disc"), (3, "filter")] {
        Mock::given(method("GET"))
            .and(path(PRODUCTS_PATH))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([product(name, 2)])))
            .expect(1)
            .mount(&server)
            .await;
    }

    let config = sync_config(&server.uri());
    let export = Arc::new(FlakyExport::new(0));
    let mut syncer = Syncer::new(&fetcher_for(&config), &config, export.clone(), Vec::new());

    let outcome = syncer.run().await;
    let events = syncer.into_sink();

    assert!(matches!(outcome, SyncOutcome::Completed { rows: 3, .. }));
    let messages = statuses(&events);
    assert!(messages.contains(&"Page 2 of 3 fetched (2 products)".to_string()));
    assert!(messages.contains(&"Page 3 of 3 fetched (3 products)".to_string()));
    assert_eq!(export.calls(), 1);
}

/// Records events until a fixed count, then behaves like a dropped consumer
struct DisconnectAfter {
    limit: usize,
    events: Vec<SyncEvent>,
}

#[async_trait]
impl EventSink<SyncEvent> for DisconnectAfter {
    async fn send(&mut self, event: SyncEvent) -> Result<(), SinkClosed> {
        if self.is_closed() {
            return Err(SinkClosed);
        }
        self.events.push(event);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.events.len() >= self.limit
    }
}

#[tokio::test]
async fn test_disconnected_consumer_stops_further_requests() {
    let server = MockServer::start().await;
    mount_inventory_page(&server, 1, 2, &["pad"]).await;
    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([product("disc", 1)])))
        .expect(0)
        .mount(&server)
        .await;

    let config = sync_config(&server.uri());
    let export = Arc::new(FlakyExport::new(0));
    // Start status plus the first page status, then the consumer is gone
    let sink = DisconnectAfter {
        limit: 2,
        events: Vec::new(),
    };
    let mut syncer = Syncer::new(&fetcher_for(&config), &config, export.clone(), sink);

    let outcome = syncer.run().await;
    let events = syncer.into_sink().events;

    assert_eq!(outcome, SyncOutcome::Disconnected);
    assert_eq!(export.calls(), 0);
    assert_eq!(events.len(), 2);
    assert!(!events.iter().any(|e| matches!(
        e,
        SyncEvent::Error { .. } | SyncEvent::SheetUrl { .. } | SyncEvent::Done
    )));
}

#[tokio::test]
async fn test_upload_exhaustion_emits_one_error() {
    let server = MockServer::start().await;
    mount_inventory_page(&server, 1, 1, &["pad"]).await;

    let config = sync_config(&server.uri());
    let export = Arc::new(FlakyExport::new(u32::MAX));
    let mut syncer = Syncer::new(&fetcher_for(&config), &config, export.clone(), Vec::new());

    let outcome = syncer.run().await;
    let events = syncer.into_sink();

    assert_eq!(export.calls(), 3);
    match outcome {
        SyncOutcome::Failed { message } => {
            assert_eq!(message, "Failed to update export sheet after 3 attempts")
        }
        other => panic!("expected Failed, got {:?}", other),
    }

    let errors: Vec<&SyncEvent> = events
        .iter()
        .filter(|e| matches!(e, SyncEvent::Error { .. }))
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(events.last(), Some(errors[0]));
    match errors[0] {
        SyncEvent::Error {
            detail: Some(detail),
            ..
        } => {
            assert_eq!(detail.lines().count(), 3);
            assert!(detail.contains("attempt 1: "), "{}", detail);
            assert!(detail.contains("attempt 3: "), "{}", detail);
            assert!(detail.contains("quota exceeded on call 3"), "{}", detail);
        }
        other => panic!("expected ERROR with detail, got {:?}", other),
    }

    let messages = statuses(&events);
    assert!(messages.contains(&"Updating export sheet (attempt 3/3)".to_string()));
    assert_eq!(
        messages
            .iter()
            .filter(|m| m.starts_with("Attempt ") && m.contains("failed; retrying in"))
            .count(),
        2
    );
    assert!(!events.iter().any(|e| matches!(e, SyncEvent::SheetUrl { .. } | SyncEvent::Done)));
}

#[tokio::test]
async fn test_upload_recovers_on_retry() {
    let server = MockServer::start().await;
    mount_inventory_page(&server, 1, 1, &["pad", "disc"]).await;

    let config = sync_config(&server.uri());
    let export = Arc::new(FlakyExport::new(1));
    let mut syncer = Syncer::new(&fetcher_for(&config), &config, export.clone(), Vec::new());

    let outcome = syncer.run().await;
    let events = syncer.into_sink();

    assert_eq!(export.calls(), 2);
    assert_eq!(
        outcome,
        SyncOutcome::Completed {
            rows: 2,
            location: "https://sheets.example.com/inventory".to_string(),
        }
    );
    assert!(statuses(&events).contains(&"Updating export sheet (attempt 2/3)".to_string()));
    assert_eq!(events.last(), Some(&SyncEvent::Done));
}

#[tokio::test]
async fn test_page_failure_stops_before_upload() {
    let server = MockServer::start().await;
    mount_inventory_page(&server, 1, 2, &["pad"]).await;
    Mock::given(method("GET"))
        .and(path(PRODUCTS_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let config = sync_config(&server.uri());
    let export = Arc::new(FlakyExport::new(0));
    let mut syncer = Syncer::new(&fetcher_for(&config), &config, export.clone(), Vec::new());

    let outcome = syncer.run().await;
    let events = syncer.into_sink();

    assert_eq!(export.calls(), 0);
    assert!(matches!(outcome, SyncOutcome::Failed { .. }));
    match events.last() {
        Some(SyncEvent::Error { msg, detail }) => {
            assert_eq!(msg, "Failed to fetch inventory page 2");
            assert!(detail.as_deref().unwrap_or_default().contains("HTTP 500"));
        }
        other => panic!("expected ERROR, got {:?}", other),
    }
}

#[tokio::test]
async fn test_http_export_puts_table() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/sheets/inventory"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let export = HttpExport::new(
        reqwest::Client::new(),
        format!("{}/sheets/inventory", server.uri()),
        Some("https://sheets.example.com/view".to_string()),
    );
    let rows = vec![InventoryRow {
        name: Some("pad".to_string()),
        ..InventoryRow::default()
    }];

    let location = export.update(&rows).await.unwrap();
    assert_eq!(location, "https://sheets.example.com/view");

    let requests = server.received_requests().await.unwrap();
    let sent: Vec<InventoryRow> = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent, rows);
}

#[tokio::test]
async fn test_http_export_rejection_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500).set_body_string("sheet locked"))
        .mount(&server)
        .await;

    let endpoint = format!("{}/sheets/inventory", server.uri());
    let export = HttpExport::new(reqwest::Client::new(), endpoint.clone(), None);
    let rows = vec![InventoryRow::default()];

    match export.update(&rows).await {
        Err(UploadError::Rejected { target, message }) => {
            assert_eq!(target, endpoint);
            assert!(message.contains("500"), "{}", message);
            assert!(message.contains("sheet locked"), "{}", message);
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_sync_stream_ends_after_done() {
    let server = MockServer::start().await;
    mount_inventory_page(&server, 1, 1, &["pad"]).await;

    let config = sync_config(&server.uri());
    let fetcher = fetcher_for(&config);
    let export: Arc<dyn ExportSink> = Arc::new(FlakyExport::new(0));

    let events: Vec<SyncEvent> = sync_stream(fetcher, config, export).collect().await;

    assert_eq!(events.last(), Some(&SyncEvent::Done));
    assert!(matches!(
        events[events.len() - 2],
        SyncEvent::SheetUrl { .. }
    ));
}
