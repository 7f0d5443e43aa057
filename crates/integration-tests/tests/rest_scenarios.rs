//! REST adapter over real TCP

mod common;

use common::Harness;

#[tokio::test]
async fn test_get_put_get_counter() {
    let h = Harness::start().await;

    let reply = h.rest("GET", "/Counter/value", "").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "42");

    let reply = h.rest("PUT", "/Counter/value", "7").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "OK");
    assert_eq!(h.counter.value(), 7);

    let reply = h.rest("GET", "/Counter/value", "").await;
    assert_eq!(reply.body, "7");

    h.bridge.shutdown().await;
}

#[tokio::test]
async fn test_response_headers() {
    let h = Harness::start().await;

    let reply = h.rest("GET", "/Device/name", "").await;

    assert_eq!(reply.body, "lamp");
    assert_eq!(reply.header("Connection"), Some("close"));
    assert_eq!(reply.header("Content-Length"), Some("4"));
    assert_eq!(
        reply.header("content-type"),
        Some("text/plain;charset=UTF-8")
    );
    assert!(reply.header("Server").unwrap().starts_with("PropBridge/"));
    assert!(reply.header("Date").unwrap().ends_with(" GMT"));

    h.bridge.shutdown().await;
}

#[tokio::test]
async fn test_unknown_class_and_property() {
    let h = Harness::start().await;

    let reply = h.rest("PUT", "/Unknown/value", "1").await;
    assert_eq!(reply.status, 404);
    assert_eq!(reply.body, "Not found");

    let reply = h.rest("GET", "/Counter/missing", "").await;
    assert_eq!(reply.status, 404);

    let reply = h.rest("GET", "/Counter", "").await;
    assert_eq!(reply.status, 404);

    h.bridge.shutdown().await;
}

#[tokio::test]
async fn test_other_methods_rejected_before_lookup() {
    let h = Harness::start().await;

    for method in ["POST", "DELETE", "PATCH"] {
        let reply = h.rest(method, "/Unknown/value", "").await;
        assert_eq!(reply.status, 405);
        assert_eq!(reply.body, "Method not allowed");
    }
    assert_eq!(h.counter.set_calls(), 0);

    h.bridge.shutdown().await;
}

#[tokio::test]
async fn test_unconvertible_put_is_bad_request() {
    let h = Harness::start().await;

    let reply = h.rest("PUT", "/Counter/value", "seven").await;

    assert_eq!(reply.status, 400);
    assert_eq!(reply.body, "Bad request");
    assert_eq!(h.counter.value(), 42);

    h.bridge.shutdown().await;
}

#[tokio::test]
async fn test_capability_quirks() {
    let h = Harness::start().await;

    // Write-only: readable nothing, still 200
    let reply = h.rest("GET", "/Device/secret", "").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "");

    // Read-only: write skipped, still OK
    let reply = h.rest("PUT", "/Device/name", "other").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, "OK");
    assert_eq!(h.device.name, "lamp");

    let reply = h.rest("PUT", "/Device/secret", "s3cret").await;
    assert_eq!(reply.status, 200);
    assert_eq!(h.device.secret(), "s3cret");

    h.bridge.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_clients() {
    let h = Harness::start().await;
    let addr = h.rest_addr();

    let requests: Vec<_> = (0..16)
        .map(|_| tokio::spawn(common::http(addr, "GET", "/Counter/value", "")))
        .collect();
    for request in requests {
        let reply = request.await.unwrap();
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, "42");
    }

    h.bridge.shutdown().await;
}
