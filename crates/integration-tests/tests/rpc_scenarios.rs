//! JSON-RPC adapter over a real WebSocket

mod common;

use common::{next_json, send_json, send_text, stays_quiet, Harness};
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn test_get_after_set() {
    let h = Harness::start().await;
    h.counter.set_value(7);
    let mut ws = h.ws_connect().await;

    send_json(
        &mut ws,
        json!({"jsonrpc": "2.0", "id": 1, "method": "Counter.value"}),
    )
    .await;

    assert_eq!(
        next_json(&mut ws).await,
        json!({"jsonrpc": "2.0", "id": 1, "result": 7})
    );

    h.bridge.shutdown().await;
}

#[tokio::test]
async fn test_wrong_version_is_invalid_request_without_id() {
    let h = Harness::start().await;
    let mut ws = h.ws_connect().await;

    send_json(
        &mut ws,
        json!({"jsonrpc": "1.0", "id": 1, "method": "Counter.value"}),
    )
    .await;

    let reply = next_json(&mut ws).await;
    assert_eq!(reply["jsonrpc"], json!("2.0"));
    assert_eq!(reply["error"]["code"], json!(-32600));
    assert!(reply.get("id").is_none());

    h.bridge.shutdown().await;
}

#[tokio::test]
async fn test_error_codes_on_one_connection() {
    let h = Harness::start().await;
    let mut ws = h.ws_connect().await;

    send_text(&mut ws, "{not json").await;
    assert_eq!(next_json(&mut ws).await["error"]["code"], json!(-32700));

    send_json(
        &mut ws,
        json!({"jsonrpc": "2.0", "id": 2, "method": "Nope.value"}),
    )
    .await;
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["error"]["code"], json!(-32601));
    assert_eq!(reply["id"], json!(2));

    send_json(
        &mut ws,
        json!({"jsonrpc": "2.0", "id": 3, "method": "Counter.value", "params": [1, 2]}),
    )
    .await;
    assert_eq!(next_json(&mut ws).await["error"]["code"], json!(-32602));

    send_json(
        &mut ws,
        json!({"jsonrpc": "2.0", "id": 4, "method": "Counter.value", "params": "seven"}),
    )
    .await;
    assert_eq!(next_json(&mut ws).await["error"]["code"], json!(-32603));

    // Connection survives every error
    send_json(
        &mut ws,
        json!({"jsonrpc": "2.0", "id": 5, "method": "Device.tags"}),
    )
    .await;
    assert_eq!(next_json(&mut ws).await["result"], json!(["a", 1]));

    h.bridge.shutdown().await;
}

#[tokio::test]
async fn test_object_change_reaches_every_client_once() {
    let h = Harness::start().await;
    let mut first = h.ws_connect().await;
    let mut second = h.ws_connect().await;

    h.device.toggle();

    let expected = json!({"jsonrpc": "2.0", "method": "Device.enabled", "params": true});
    assert_eq!(next_json(&mut first).await, expected);
    assert_eq!(next_json(&mut second).await, expected);
    assert!(stays_quiet(&mut first, Duration::from_millis(100)).await);
    assert!(stays_quiet(&mut second, Duration::from_millis(100)).await);

    h.bridge.shutdown().await;
}

#[tokio::test]
async fn test_disconnected_client_leaves_broadcast_set() {
    let h = Harness::start().await;
    let gone = h.ws_connect().await;
    let mut stays = h.ws_connect().await;

    drop(gone);
    h.wait_for_clients(1).await;

    h.counter.set_value(9);

    assert_eq!(
        next_json(&mut stays).await,
        json!({"jsonrpc": "2.0", "method": "Counter.value", "params": 9})
    );

    h.bridge.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_clients() {
    let h = Harness::start().await;
    let mut ws = h.ws_connect().await;

    h.bridge.shutdown().await;

    let closed = timeout(common::WAIT, async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}
