use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use toko_backup::credentials::StaticToken;
use toko_backup::delay::RecordedDelay;
use toko_backup::domain::{FallbackReason, FetchOutcome};
use toko_backup::locator::{Locator, NearestHttpClient};

fn start_server(rt: &Runtime) -> MockServer {
    rt.block_on(MockServer::start())
}

fn client_for(server: &MockServer) -> NearestHttpClient {
    NearestHttpClient::with_endpoint(
        &format!("{}/stores/nearest", server.uri()),
        Duration::from_secs(5),
    )
    .expect("client construction should not fail")
}

#[test]
fn sends_expected_query_and_headers() {
    let rt = Runtime::new().unwrap();
    let server = start_server(&rt);

    let body = json!({
        "data": {
            "content": [
                {
                    "storeCode": "FWCL",
                    "storeName": "INDOMARET FWCL",
                    "storeType": "REGULAR",
                    "dcCode": "G301",
                    "address": "JL. DAGO NO. 1",
                    "openingHour": "07:00",
                    "closingHour": "22:00",
                    "distanceString": "0.4 km",
                    "latitude": -6.8935,
                    "longitude": 107.6133,
                    "status": "OPEN"
                }
            ]
        }
    });

    rt.block_on(
        Mock::given(method("GET"))
            .and(path("/stores/nearest"))
            .and(query_param("keyword", "FWCL"))
            .and(query_param("selectedStoreCode", "FWCL"))
            .and(query_param("page", "0"))
            .and(query_param("latitude", "-6.9173248"))
            .and(query_param("longitude", "107.610112"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("apps", "klikindomaret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .expect(1)
            .mount(&server),
    );

    let client = client_for(&server);
    let locator = Locator::new(client, StaticToken::new("test-token"), RecordedDelay::new());
    let outcome = locator.fetch_store("fwcl", None);

    match outcome {
        FetchOutcome::Found(detail) => {
            assert_eq!(detail.store_code, "FWCL");
            assert_eq!(detail.dc_code, "G301");
            assert_eq!(detail.distance, "0.4 km");
            assert_eq!(detail.latitude, Some(-6.8935));
        }
        other => panic!("expected store, got {other:?}"),
    }

    let requests = rt.block_on(server.received_requests()).unwrap();
    let correlation = requests[0]
        .headers
        .get("x-correlation-id")
        .expect("correlation id header");
    assert!(
        correlation
            .to_str()
            .unwrap()
            .chars()
            .all(|ch| ch.is_ascii_digit())
    );
}

#[test]
fn unauthorized_status_is_not_retried() {
    let rt = Runtime::new().unwrap();
    let server = start_server(&rt);

    rt.block_on(
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server),
    );

    let delay = RecordedDelay::new();
    let locator = Locator::new(client_for(&server), StaticToken::new("expired"), &delay);
    let outcome = locator.fetch_store("T001", None);

    assert_matches!(outcome, FetchOutcome::Fallback(ref f) if f.reason == FallbackReason::Unauthorized);
    assert!(delay.recorded().is_empty());
    rt.block_on(server.verify());
}

#[test]
fn server_errors_use_three_attempts() {
    let rt = Runtime::new().unwrap();
    let server = start_server(&rt);

    rt.block_on(
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server),
    );

    let delay = RecordedDelay::new();
    let locator = Locator::new(client_for(&server), StaticToken::new("token"), &delay);
    let outcome = locator.fetch_store("T001", None);

    assert_matches!(outcome, FetchOutcome::Fallback(ref f) if f.reason == FallbackReason::RetriesExhausted);
    assert_eq!(
        delay.recorded(),
        vec![Duration::from_millis(500), Duration::from_millis(1000)]
    );
    rt.block_on(server.verify());
}

#[test]
fn transport_failure_is_not_classified_by_the_requested_code() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = NearestHttpClient::with_endpoint(
        &format!("http://127.0.0.1:{port}/stores/nearest"),
        Duration::from_secs(5),
    )
    .unwrap();

    let delay = RecordedDelay::new();
    let locator = Locator::new(client, StaticToken::new("token"), &delay);
    let outcome = locator.fetch_store("DNSNETWORKTIMEOUT", None);

    assert_matches!(
        outcome,
        FetchOutcome::Fallback(ref f)
            if matches!(f.reason, FallbackReason::Transport(ref message) if !message.contains("DNSNETWORKTIMEOUT"))
    );
    assert!(delay.recorded().is_empty());
}
