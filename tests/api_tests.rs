//! Integration tests for spgci-rs against a mock SPGCI server.
//!
//! Every test starts its own `wiremock` server, points the client's base
//! URL at it and asserts both the returned data and the exact number of
//! requests the server saw.
//!
//! Run with: cargo test --test api_tests

use std::sync::Once;
use std::time::Duration;

use rust_decimal_macros::dec;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spgci_rs::api::{CapacityQuery, PipelineFlowQuery, SymbolCurrentQuery};
use spgci_rs::client::{Paginator, Results, TotalPages};
use spgci_rs::error::RATE_LIMIT_REMAINING_DAY;
use spgci_rs::prelude::*;
use spgci_rs::RawResponse;

static INIT: Once = Once::new();

/// Initialize logging for tests
fn init_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

const DATA_PATH: &str = "/data/v1/items";

fn test_config(server: &MockServer) -> ClientConfig {
    ClientConfig::new("user", "secret")
        .with_base_url(server.uri())
        .with_retry(RetryConfig::default().with_throttle_backoff(Duration::from_millis(10)))
}

fn client_for(server: &MockServer) -> SpgciClient {
    init_logging();
    SpgciClient::new(test_config(server)).unwrap()
}

async fn mount_login(server: &MockServer, token: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/api"))
        .and(body_string_contains("username=user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "refresh_token": "unused",
        })))
        .expect(times)
        .mount(server)
        .await;
}

fn page_body(ids: &[i64], total_pages: u32) -> Value {
    json!({
        "metadata": {"count": ids.len(), "pageSize": ids.len(), "page": 1, "totalPages": total_pages},
        "results": ids.iter().map(|id| json!({"id": id})).collect::<Vec<_>>(),
    })
}

fn ids(table: &Table<Record>) -> Vec<i64> {
    table.iter().map(|row| row["id"].as_i64().unwrap()).collect()
}

fn request() -> DataRequest {
    DataRequest::new(DATA_PATH).page(1).page_size(2)
}

async fn fetch(client: &SpgciClient, request: DataRequest) -> Result<DataResponse<Record>> {
    client
        .get_data::<Record, _, _>(request, &Results, &TotalPages::default())
        .await
}

// ============================================================================
// Token Manager
// ============================================================================

#[tokio::test]
async fn test_token_is_cached_per_credentials() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[1], 1)))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    fetch(&client, request()).await.unwrap();
    fetch(&client, request()).await.unwrap();

    assert!(
        client
            .tokens()
            .is_cached(&client.config().credentials, &client.config().base_url)
            .await
    );
}

#[tokio::test]
async fn test_invalid_credentials_raise_authentication() {
    let server = MockServer::start().await;

    // initial attempt plus one authentication retry
    Mock::given(method("POST"))
        .and(path("/auth/api"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = fetch(&client, request()).await.unwrap_err();
    assert!(err.is_auth_error(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn test_token_exchange_retries_throttle_once() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/api"))
        .respond_with(ResponseTemplate::new(429).insert_header(RATE_LIMIT_REMAINING_DAY, "100"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_login(&server, "tok-1", 1).await;

    let client = client_for(&server);
    let token = client.token().await.unwrap();
    assert_eq!(token.expose_secret(), "tok-1");
}

#[tokio::test]
async fn test_token_override_skips_login() {
    let server = MockServer::start().await;
    mount_login(&server, "never", 0).await;

    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .and(header("authorization", "Bearer preissued"))
        .and(header("user-agent", format!("spgci-rs/{}", env!("CARGO_PKG_VERSION")).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[1], 1)))
        .expect(1)
        .mount(&server)
        .await;

    init_logging();
    let client = SpgciClient::new(test_config(&server).with_token("preissued")).unwrap();
    fetch(&client, request()).await.unwrap();
}

#[tokio::test]
async fn test_login_bad_request_is_authentication() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/api"))
        .respond_with(ResponseTemplate::new(400).set_body_string("nope"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.token().await.unwrap_err() {
        Error::Authentication(message) => {
            assert!(message.contains("(400)"), "unexpected message: {message}");
            assert!(message.contains("nope"));
        }
        other => panic!("Expected Authentication error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_daily_limit_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/api"))
        .respond_with(ResponseTemplate::new(429).insert_header(RATE_LIMIT_REMAINING_DAY, "0"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.token().await.unwrap_err();
    assert!(matches!(err, Error::DailyLimit));
}

#[tokio::test]
async fn test_concurrent_lookups_share_one_login() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/api"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "tok-1"}))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let other = client.clone();
    let (a, b) = tokio::join!(client.token(), other.token());
    assert_eq!(a.unwrap().expose_secret(), "tok-1");
    assert_eq!(b.unwrap().expose_secret(), "tok-1");
}

// ============================================================================
// Request Executor
// ============================================================================

#[tokio::test]
async fn test_rejected_token_is_evicted_and_retried_once() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 2).await;

    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = fetch(&client, request()).await.unwrap_err();

    assert!(matches!(err, Error::Authentication(_)));
    assert!(
        !client
            .tokens()
            .is_cached(&client.config().credentials, &client.config().base_url)
            .await
    );
}

#[tokio::test]
async fn test_expired_token_recovers_after_relogin() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 2).await;

    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[7], 1)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let table = fetch(&client, request()).await.unwrap().into_table().unwrap();
    assert_eq!(ids(&table), vec![7]);
}

#[tokio::test]
async fn test_per_second_limit_is_retried_until_success() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header(RATE_LIMIT_REMAINING_DAY, "5"))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[1, 2], 1)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let table = fetch(&client, request()).await.unwrap().into_table().unwrap();
    assert_eq!(ids(&table), vec![1, 2]);
}

#[tokio::test]
async fn test_daily_limit_is_not_retried() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header(RATE_LIMIT_REMAINING_DAY, "0"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = fetch(&client, request()).await.unwrap_err();
    assert!(matches!(err, Error::DailyLimit));
}

#[tokio::test]
async fn test_throttle_retry_cap() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header(RATE_LIMIT_REMAINING_DAY, "5"))
        .expect(3)
        .mount(&server)
        .await;

    init_logging();
    let config = test_config(&server).with_retry(
        RetryConfig::default()
            .with_throttle_backoff(Duration::from_millis(5))
            .with_max_throttle_retries(2),
    );
    let client = SpgciClient::new(config).unwrap();

    let err = fetch(&client, request()).await.unwrap_err();
    assert!(matches!(err, Error::PerSecondLimit));
}

#[tokio::test]
async fn test_other_status_is_api_error() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "upstream unavailable"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    match fetch(&client, request()).await.unwrap_err() {
        Error::Api { status, message, .. } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream unavailable");
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_throttle_then_daily_limit_stops() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header(RATE_LIMIT_REMAINING_DAY, "3"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header(RATE_LIMIT_REMAINING_DAY, "0"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = fetch(&client, request()).await.unwrap_err();
    assert!(matches!(err, Error::DailyLimit));
}

// ============================================================================
// Pagination Driver
// ============================================================================

async fn mount_pages(server: &MockServer, pages: &[&[i64]], expect: &[u64]) {
    let total = pages.len() as u32;
    for (i, rows) in pages.iter().enumerate() {
        Mock::given(method("GET"))
            .and(path(DATA_PATH))
            .and(query_param("page", (i + 1).to_string().as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(rows, total)))
            .expect(expect[i])
            .mount(server)
            .await;
    }
}

#[tokio::test]
async fn test_single_page_returns_first_batch() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;
    mount_pages(&server, &[&[1, 2]], &[1]).await;

    let client = client_for(&server);
    let response = fetch(&client, request().paginate(true)).await.unwrap();

    assert!(response.advisories().is_empty());
    let table = response.into_table().unwrap();
    assert_eq!(ids(&table), vec![1, 2]);
    assert!(table.is_complete());
}

#[tokio::test]
async fn test_paginate_fetches_every_page_in_order() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;
    mount_pages(&server, &[&[1, 2], &[3, 4], &[5]], &[1, 1, 1]).await;

    let client = client_for(&server);
    let table = fetch(&client, request().paginate(true))
        .await
        .unwrap()
        .into_table()
        .unwrap();

    assert_eq!(ids(&table), vec![1, 2, 3, 4, 5]);
    assert_eq!(table.pages_fetched(), 3);
    assert_eq!(table.total_pages(), 3);
    assert!(table.advisories().is_empty());
}

#[tokio::test]
async fn test_without_paginate_only_first_page_with_advisory() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;
    mount_pages(&server, &[&[1, 2], &[3, 4], &[5]], &[1, 0, 0]).await;

    let client = client_for(&server);
    let table = fetch(&client, request()).await.unwrap().into_table().unwrap();

    assert_eq!(ids(&table), vec![1, 2]);
    assert!(!table.is_complete());
    assert_eq!(
        table.advisories(),
        &[Advisory::MorePagesAvailable { total_pages: 3 }]
    );
}

#[tokio::test]
async fn test_large_fetch_advisory() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;
    mount_pages(&server, &[&[1], &[2], &[3]], &[1, 1, 1]).await;

    init_logging();
    let client =
        SpgciClient::new(test_config(&server).with_large_fetch_threshold(2)).unwrap();
    let table = fetch(&client, request().paginate(true))
        .await
        .unwrap()
        .into_table()
        .unwrap();

    assert_eq!(ids(&table), vec![1, 2, 3]);
    assert_eq!(table.advisories(), &[Advisory::LargeFetch { total_pages: 3 }]);
}

#[tokio::test]
async fn test_raw_with_paginate_returns_first_page_only() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;
    mount_pages(&server, &[&[1, 2], &[3, 4]], &[1, 0]).await;

    let client = client_for(&server);
    let response = fetch(&client, request().paginate(true).raw(true)).await.unwrap();

    assert_eq!(response.advisories(), &[Advisory::RawIgnoresPagination]);
    let raw = response.into_raw().unwrap();
    assert_eq!(raw.status(), 200);
    let body: Value = raw.json().unwrap();
    assert_eq!(body["metadata"]["totalPages"], 2);
}

#[tokio::test]
async fn test_error_on_later_page_discards_partial_rows() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;
    mount_pages(&server, &[&[1, 2]], &[1]).await;

    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .fetch_all::<Record, _, _>(
            DATA_PATH,
            QueryParams::new().with("page", 1),
            &Results,
            // force a second page regardless of the body
            &|_: &RawResponse| -> Result<Paginator> { Ok(Paginator::pages("page", 2)) },
            true,
        )
        .await;

    assert!(matches!(result, Err(Error::Api { status: 502, .. })));
}

#[tokio::test]
async fn test_rejected_token_on_later_page_relogs_and_completes() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 2).await;

    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[1, 2], 2)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(DATA_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_body(&[3], 2)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let table = fetch(&client, request().paginate(true))
        .await
        .unwrap()
        .into_table()
        .unwrap();

    assert_eq!(ids(&table), vec![1, 2, 3]);
    assert!(table.advisories().is_empty());
}

#[tokio::test]
async fn test_no_pagination_strategy() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/market-data/reference-data/v3/mdc"))
        .and(query_param("subscribed_only", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {"count": 2},
            "results": [{"mdc": "ET", "description": "Europe"}, {"mdc": "AG", "description": "Ag"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let table = client
        .market_data()
        .mdcs(true, false)
        .await
        .unwrap()
        .into_table()
        .unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.columns(), vec!["mdc", "description"]);
    assert!(table.advisories().is_empty());
}

// ============================================================================
// Dataset services
// ============================================================================

#[tokio::test]
async fn test_assessments_by_symbol_current() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;

    Mock::given(method("GET"))
        .and(path("/market-data/v3/value/current/symbol"))
        .and(query_param("filter", "symbol in (\"PCAAS00\",\"PCAAT00\")"))
        .and(query_param("field", "deltaPrice,deltaPercent,pValue,pDate"))
        .and(query_param("pageSize", "10000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {"count": 2, "pageSize": 10000, "page": 1, "totalPages": 1},
            "results": [
                {"symbol": "PCAAS00", "data": [
                    {"bate": "c", "value": 81.25, "assessDate": "2024-01-02T00:00:00",
                     "isCorrected": "N", "modDate": "2024-01-02T19:05:55",
                     "change": {"deltaPrice": 0.75, "deltaPercent": 0.93}}
                ]},
                {"symbol": "PCAAT00", "data": [
                    {"bate": "c", "value": 80.5, "assessDate": "2024-01-02T00:00:00"}
                ]}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let table = client
        .market_data()
        .assessments_by_symbol_current(&SymbolCurrentQuery::symbols(["PCAAS00", "PCAAT00"]))
        .await
        .unwrap()
        .into_table()
        .unwrap();

    let rows = table.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].symbol.as_str(), "PCAAS00");
    assert_eq!(rows[0].value, Some(dec!(81.25)));
    assert_eq!(rows[0].delta_price, Some(dec!(0.75)));
    assert_eq!(rows[1].symbol.as_str(), "PCAAT00");
    assert_eq!(rows[1].delta_price, None);
}

#[tokio::test]
async fn test_pipeline_flows_count_pagination() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;

    let flow_path = "/analytics/natural-gas/north-america/supply-demand/v1/pipeline-flow-data";
    for (page, ids) in [(1, vec![1, 2]), (2, vec![3])] {
        Mock::given(method("GET"))
            .and(path(flow_path))
            .and(query_param("page", page.to_string().as_str()))
            .and(query_param("filter", "pipelineId: 42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metadata": {"count": 3, "pageSize": 2},
                "results": ids.iter().map(|id| json!({"id": id})).collect::<Vec<_>>(),
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    let mut query = PipelineFlowQuery::pipeline(42);
    query.page_size = Some(2);
    query.paginate = true;

    let table = client
        .natural_gas()
        .pipeline_flows(&query)
        .await
        .unwrap()
        .into_table()
        .unwrap();
    assert_eq!(ids(&table), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_odata_capacity_uses_skip_offsets() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;

    let capacity_path = "/odata/refinery-data/v2.2/capacity";
    for (skip, ids) in [("0", vec![1, 2]), ("100", vec![3, 4]), ("200", vec![5])] {
        Mock::given(method("GET"))
            .and(path(capacity_path))
            .and(query_param("$skip", skip))
            .and(query_param("pageSize", "100"))
            .and(query_param("$count", "true"))
            .and(query_param("$filter", "Refinery/Country/Name eq 'Japan'"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "@odata.count": 250,
                "value": ids.iter().map(|id| json!({"id": id, "Owner@odata.navigationLink": "x"})).collect::<Vec<_>>(),
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    let query = CapacityQuery {
        country: vec!["Japan".to_string()],
        page_size: Some(100),
        paginate: true,
        ..Default::default()
    };

    let table = client
        .refinery_data()
        .capacity(&query)
        .await
        .unwrap()
        .into_table()
        .unwrap();

    assert_eq!(ids(&table), vec![1, 2, 3, 4, 5]);
    assert_eq!(table.columns(), vec!["id"]);

    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .filter(|r| r.url.path() == capacity_path)
        .all(|r| !r.url.query().unwrap_or_default().contains('+')));
}

#[tokio::test]
async fn test_odata_first_page_keeps_caller_skip() {
    let server = MockServer::start().await;
    mount_login(&server, "tok-1", 1).await;

    let capacity_path = "/odata/refinery-data/v2.2/capacity";
    for (skip, ids) in [("50", vec![1]), ("100", vec![2]), ("200", vec![3])] {
        Mock::given(method("GET"))
            .and(path(capacity_path))
            .and(query_param("$skip", skip))
            .and(query_param("pageSize", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "@odata.count": 250,
                "value": ids.iter().map(|id| json!({"id": id})).collect::<Vec<_>>(),
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client_for(&server);
    let query = CapacityQuery {
        skip: 50,
        page_size: Some(100),
        paginate: true,
        ..Default::default()
    };

    let table = client
        .refinery_data()
        .capacity(&query)
        .await
        .unwrap()
        .into_table()
        .unwrap();

    assert_eq!(ids(&table), vec![1, 2, 3]);
}
