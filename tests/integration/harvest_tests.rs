//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the upstream API and a
//! recorded browser session to provide the captured request, and run the
//! full capture, history and per-order cycle end-to-end.

use chrono::Local;
use order_replay::capture::RecordedSession;
use order_replay::config::{Config, EndpointConfig, FetchSettings, OutputConfig, RateLimitConfig};
use order_replay::harvest::Harvester;
use order_replay::output::{JsonFileSink, COMBINED_ORDER_DATA};
use order_replay::{CaptureError, HarvestError};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing every endpoint at the mock server
fn create_test_config(base_url: &str, order_count: u32, attempts_limit: u32) -> Config {
    Config {
        rate_limit: RateLimitConfig {
            rps: 50,
            time_unit_ms: 1000,
            uniform_distribution: false,
        },
        fetch: FetchSettings {
            order_count,
            attempts_limit,
            request_timeout_secs: 5,
        },
        endpoints: EndpointConfig {
            browser_url: format!("{}/orders", base_url),
            order_history: format!("{}/v1/order_history", base_url),
            invoice_overview: format!("{}/v1/orders/{{order_number}}/invoices", base_url),
            invoice_detail: format!(
                "{}/v1/orders/{{order_number}}/invoices/{{invoice_id}}",
                base_url
            ),
            order_aggregations: format!("{}/v1/aggregations/{{order_number}}", base_url),
            fetch_invoice_details: true,
            fetch_aggregations: true,
        },
        output: OutputConfig {
            directory: "output".to_string(),
        },
    }
}

/// A recorded session whose navigation includes the order history call
fn create_session(base_url: &str, page_size: u32, status: u16, request_method: &str) -> RecordedSession {
    let recording = json!({
        "exchanges": [
            {"url": format!("{}/static/app.js", base_url)},
            {
                "url": format!(
                    "{}/v1/order_history?page_size={}&page_number=1&type=ALL",
                    base_url, page_size
                ),
                "method": request_method,
                "status": status,
                "headers": {
                    ":authority": "api.example.com",
                    "cookie": "session=abc",
                    "x-api-key": "key123"
                }
            }
        ]
    });

    RecordedSession::from_json(&recording.to_string()).expect("Failed to load recording")
}

fn create_order(number: &str) -> Value {
    json!({
        "order_number": number,
        "placed_date": "2024-08-17T12:58:39-05:00",
        "summary": {"grand_total": "13.19"},
        "order_lines": [{
            "order_line_id": format!("{}-1", number),
            "original_quantity": 1,
            "item": {"description": "Notebook", "tcin": "123"}
        }],
        "order_purchase_type": "ONLINE"
    })
}

async fn mount_history_page(server: &MockServer, page: u32, page_size: u32, numbers: &[&str]) {
    let orders: Vec<Value> = numbers.iter().map(|n| create_order(n)).collect();
    Mock::given(method("GET"))
        .and(path("/v1/order_history"))
        .and(query_param("page_number", page.to_string()))
        .and(header("cookie", "session=abc"))
        .and(header("x-api-key", "key123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request": {"page_number": page, "page_size": page_size},
            "orders": orders
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_aggregations(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/aggregations/[^/]+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total_items": 1})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_history_page(&mock_server, 1, 2, &["100", "101"]).await;
    mount_history_page(&mock_server, 2, 2, &["102"]).await;
    mount_aggregations(&mock_server).await;

    // Order 100 has one invoice
    Mock::given(method("GET"))
        .and(path("/v1/orders/100/invoices"))
        .and(header("cookie", "session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"invoices": [
            {"id": "inv-1", "date": "2024-08-18", "amount": 13.19, "type": "SHIPMENT"}
        ]})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/orders/100/invoices/inv-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "inv-1",
            "date": "2024-08-18",
            "type": "SHIPMENT",
            "total_amount": 13.19,
            "lines": [],
            "payments": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Order 101 has no invoices at all
    Mock::given(method("GET"))
        .and(path("/v1/orders/101/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 102})))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Order 102 fails once, then succeeds
    Mock::given(method("GET"))
        .and(path("/v1/orders/102/invoices"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/orders/102/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"invoices": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, 3, 3);
    let harvester = Harvester::new(config).expect("Failed to create harvester");
    let session = create_session(&base_url, 2, 200, "GET");

    let report = harvester.run(&session).await.expect("Harvest failed");

    assert_eq!(report.orders.len(), 3);
    assert_eq!(report.combined.len(), 3);
    assert!(report.dropped.is_empty());
    assert_eq!(report.attempts, 4);

    let numbers: Vec<&str> = report
        .combined
        .iter()
        .map(|c| c.order_number.as_str())
        .collect();
    assert_eq!(numbers, vec!["100", "101", "102"]);

    let first = &report.combined[0];
    assert_eq!(first.order_index, 0);
    assert_eq!(first.order_date, Some(1_723_917_519_000));
    assert_eq!(first.invoices.len(), 1);
    assert_eq!(first.invoices[0]["id"], "inv-1");
    assert_eq!(first.aggregations, Some(json!({"total_items": 1})));
    assert_eq!(first.order, create_order("100"));

    assert!(report.combined[1].invoices.is_empty());
    assert!(report.combined[2].invoices.is_empty());
}

#[tokio::test]
async fn test_exhausted_order_is_dropped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_history_page(&mock_server, 1, 10, &["200", "201"]).await;
    mount_aggregations(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/v1/orders/200/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"invoices": []})))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/orders/201/invoices"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url, 2, 2);
    config.endpoints.fetch_invoice_details = false;
    let harvester = Harvester::new(config).expect("Failed to create harvester");
    let session = create_session(&base_url, 10, 200, "GET");

    let report = harvester.run(&session).await.expect("Harvest failed");

    assert_eq!(report.orders.len(), 2);
    assert_eq!(report.combined.len(), 1);
    assert_eq!(report.combined[0].order_number, "200");
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].id, "201-1");
    assert_eq!(report.dropped[0].attempts, 2);
    assert_eq!(report.attempts, 3);
}

#[tokio::test]
async fn test_capture_not_ok_fails_before_replay() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let harvester = Harvester::new(create_test_config(&base_url, 5, 3)).unwrap();
    let session = create_session(&base_url, 10, 401, "GET");

    let result = harvester.run(&session).await;
    assert!(matches!(
        result,
        Err(HarvestError::Capture(CaptureError::NotOk { status: 401, .. }))
    ));
}

#[tokio::test]
async fn test_post_template_fails_before_replay() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let harvester = Harvester::new(create_test_config(&base_url, 5, 3)).unwrap();
    let session = create_session(&base_url, 10, 200, "POST");

    let result = harvester.run(&session).await;
    assert!(matches!(
        result,
        Err(HarvestError::Capture(CaptureError::UnsupportedMethod(m))) if m == "POST"
    ));
}

#[tokio::test]
async fn test_combined_output_document() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_history_page(&mock_server, 1, 10, &["300"]).await;
    Mock::given(method("GET"))
        .and(path("/v1/orders/300/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 102})))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url, 1, 3);
    config.endpoints.fetch_aggregations = false;
    let harvester = Harvester::new(config).unwrap();
    let session = create_session(&base_url, 10, 200, "GET");

    let report = harvester.run(&session).await.expect("Harvest failed");

    let temp_dir = TempDir::new().unwrap();
    let sink = JsonFileSink::new(temp_dir.path(), Local::now(), 1, 2);
    let path = sink
        .write(2, COMBINED_ORDER_DATA, &report.combined)
        .expect("Failed to write output");

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let combined = &written[COMBINED_ORDER_DATA][0];
    assert_eq!(combined["__orderIndex"], 0);
    assert_eq!(combined["_orderNumber"], "300");
    assert_eq!(combined["invoicesData"], json!([]));
    assert!(combined.get("aggregationsData").is_none());
    assert_eq!(combined["orderHistoryData"]["order_number"], "300");
    assert_eq!(written["_params"]["orderCount"], 1);
}

#[tokio::test]
async fn test_overview_error_code_is_retried_then_dropped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_history_page(&mock_server, 1, 10, &["400"]).await;
    mount_aggregations(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/v1/orders/400/invoices"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 500, "message": "Internal error"})),
        )
        .expect(3)
        .mount(&mock_server)
        .await;

    let harvester = Harvester::new(create_test_config(&base_url, 1, 3)).unwrap();
    let session = create_session(&base_url, 10, 200, "GET");

    let report = harvester.run(&session).await.expect("Harvest failed");

    assert!(report.combined.is_empty());
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].id, "400-0");
    assert_eq!(report.dropped[0].attempts, 3);
    assert!(report.dropped[0].last_error.contains("code 500"));
    assert_eq!(report.attempts, 3);
}

#[tokio::test]
async fn test_repeated_order_gets_distinct_ids() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // The history shifted between page requests, so order 500 is on both pages
    mount_history_page(&mock_server, 1, 2, &["499", "500"]).await;
    mount_history_page(&mock_server, 2, 2, &["500", "501"]).await;
    mount_aggregations(&mock_server).await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/orders/[^/]+/invoices$"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let harvester = Harvester::new(create_test_config(&base_url, 4, 1)).unwrap();
    let session = create_session(&base_url, 2, 200, "GET");

    let report = harvester.run(&session).await.expect("Harvest failed");

    let ids: Vec<&str> = report.dropped.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["499-0", "500-1", "500-2", "501-3"]);
}
