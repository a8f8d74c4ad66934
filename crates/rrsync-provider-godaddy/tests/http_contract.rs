//! Contract Test: GoDaddy wire protocol
//!
//! Runs the store against a local mock server.
//!
//! Constraints verified:
//! - Requests hit the documented endpoints with `sso-key` authorization
//! - Request bodies omit fields the record type does not use
//! - Error replies surface the remote message verbatim
//! - Malformed replies, timeouts and cancellation map to distinct errors
//! - Dry-run mode never sends a write

use rrsync_core::{
    CancellationToken, DnsRecord, DnsUpdateRecord, Error, RecordStore, RecordType, Reconciler,
    StoreConfig, StoreMode, TokenBucket, UpdateOutcome,
};
use rrsync_provider_godaddy::GoDaddyStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const AUTH: &str = "sso-key test_key:test_secret";

fn store_for(server: &MockServer) -> GoDaddyStore {
    GoDaddyStore::new(&StoreConfig::new(server.uri(), "test_key", "test_secret")).unwrap()
}

#[tokio::test]
async fn get_decodes_records_with_auth_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/domains/example.com/records/CNAME/www"))
        .and(header("Authorization", AUTH))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"data": "target.example.net", "name": "www", "type": "CNAME", "ttl": 3600}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let records = assert_ok!(
        store_for(&server)
            .get_records("example.com", RecordType::Cname, "www", &CancellationToken::new())
            .await
    );

    assert_eq!(
        records,
        vec![DnsRecord::new(RecordType::Cname, "www", "target.example.net")]
    );
}

#[tokio::test]
async fn get_of_absent_set_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/domains/example.com/records/TXT/nothing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let records = assert_ok!(
        store_for(&server)
            .get_records("example.com", RecordType::Txt, "nothing", &CancellationToken::new())
            .await
    );
    assert!(records.is_empty());
}

#[tokio::test]
async fn malformed_reply_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = assert_err!(
        store_for(&server)
            .get_records("example.com", RecordType::A, "www", &CancellationToken::new())
            .await
    );
    assert!(matches!(err, Error::Decode(_)), "got {:?}", err);
}

#[tokio::test]
async fn error_reply_message_is_reported_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "code": "DUPLICATE_RECORD",
            "message": "Another record with the same attributes already exists"
        })))
        .mount(&server)
        .await;

    let rec = DnsRecord::new(RecordType::Cname, "www", "b.example.net");
    let err = assert_err!(
        store_for(&server)
            .add_records("example.com", &[rec], &CancellationToken::new())
            .await
    );

    match err {
        Error::RemoteApi {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 422);
            assert_eq!(code.as_deref(), Some("DUPLICATE_RECORD"));
            assert_eq!(message, "Another record with the same attributes already exists");
        }
        other => panic!("expected a remote API error, got {:?}", other),
    }
}

#[tokio::test]
async fn undecodable_error_reply_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = assert_err!(
        store_for(&server)
            .del_records("example.com", RecordType::Txt, "@", &CancellationToken::new())
            .await
    );

    assert!(matches!(err, Error::RemoteApi { status: 502, code: None, .. }));
    assert!(err.to_string().contains("bad http reply status"), "{}", err);
}

#[tokio::test]
async fn truncated_error_reply_is_a_transport_error() {
    // answers one request with a 500 whose body is cut short
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(
                b"HTTP/1.1 500 Internal Server Error\r\n\
                  Content-Type: application/json\r\n\
                  Content-Length: 200\r\n\r\n\
                  {\"code\": \"INTERNAL",
            )
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let config = StoreConfig::new(format!("http://{}", addr), "test_key", "test_secret");
    let store = GoDaddyStore::new(&config).unwrap();
    let err = assert_err!(
        store
            .del_records("example.com", RecordType::Txt, "@", &CancellationToken::new())
            .await
    );
    assert!(matches!(err, Error::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn set_replaces_whole_set() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/domains/example.com/records/MX/@"))
        .and(header("Authorization", AUTH))
        .and(body_json(json!([
            {"data": "mx1.example.net", "ttl": 3600, "priority": 10},
            {"data": "mx2.example.net", "ttl": 600, "priority": 20}
        ])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let records = [
        DnsUpdateRecord {
            data: "mx1.example.net".to_string(),
            ttl: 3600,
            priority: 10,
            ..Default::default()
        },
        DnsUpdateRecord {
            data: "mx2.example.net".to_string(),
            ttl: 600,
            priority: 20,
            ..Default::default()
        },
    ];
    assert_ok!(
        store_for(&server)
            .set_records("example.com", RecordType::Mx, "@", &records, &CancellationToken::new())
            .await
    );
}

#[tokio::test]
async fn add_patches_domain_records() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/domains/example.com/records"))
        .and(body_json(json!([
            {"data": "v=spf1 -all", "name": "@", "type": "TXT", "ttl": 600}
        ])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let rec = DnsRecord::new(RecordType::Txt, "@", "v=spf1 -all").with_ttl(600);
    assert_ok!(
        store_for(&server)
            .add_records("example.com", &[rec], &CancellationToken::new())
            .await
    );
}

#[tokio::test]
async fn dry_run_reads_but_never_writes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"data": "1.2.3.4", "name": "www", "type": "A", "ttl": 600}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let config = StoreConfig::new(server.uri(), "test_key", "test_secret")
        .with_mode(StoreMode::DryRun);
    let store = GoDaddyStore::new(&config).unwrap();
    let cancel = CancellationToken::new();

    let records = assert_ok!(store.get_records("example.com", RecordType::A, "www", &cancel).await);
    assert_eq!(records.len(), 1);

    let rec = DnsRecord::new(RecordType::A, "www", "5.6.7.8");
    assert_ok!(store.add_records("example.com", &[rec.clone()], &cancel).await);
    assert_ok!(
        store
            .set_records("example.com", RecordType::A, "www", &[rec.to_update_record()], &cancel)
            .await
    );
    assert_ok!(store.del_records("example.com", RecordType::A, "www", &cancel).await);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1, "only the GET may reach the server");
}

#[tokio::test]
async fn cancellation_abandons_slow_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let store = store_for(&server);
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = assert_err!(
        store
            .get_records("example.com", RecordType::A, "www", &cancel)
            .await
    );
    assert!(matches!(err, Error::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn timeout_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = StoreConfig::new(server.uri(), "test_key", "test_secret");
    config.http_timeout_secs = 1;
    let store = GoDaddyStore::new(&config).unwrap();

    let err = assert_err!(
        store
            .get_records("example.com", RecordType::A, "www", &CancellationToken::new())
            .await
    );
    assert!(matches!(err, Error::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn reconciler_update_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/domains/example.com/records/TXT/@"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"data": "keep-me", "name": "@", "type": "TXT", "ttl": 600},
            {"data": "old", "name": "@", "type": "TXT", "ttl": 3600}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v1/domains/example.com/records/TXT/@"))
        .and(body_json(json!([
            {"data": "keep-me", "ttl": 600},
            {"data": "new", "ttl": 3600}
        ])))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let limiter = Arc::new(TokenBucket::per_second(1, 60).unwrap());
    let reconciler = Reconciler::new(Arc::new(store_for(&server)), limiter);

    let old = DnsRecord::new(RecordType::Txt, "@", "old");
    let new = DnsRecord::new(RecordType::Txt, "@", "new");
    let outcome = assert_ok!(
        reconciler
            .update("example.com", &old, &new, &CancellationToken::new())
            .await
    );
    assert_eq!(outcome, UpdateOutcome::Replaced);
}
