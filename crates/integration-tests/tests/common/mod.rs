//! Shared harness: a bridge on ephemeral ports with the mock objects registered
#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use propbridge::{Bridge, BridgeConfig};
use propbridge_core::port::exposed::mocks::{Bag, Counter, Device};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub const WAIT: Duration = Duration::from_secs(3);

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct Harness {
    pub bridge: Bridge,
    pub counter: Arc<Counter>,
    pub device: Arc<Device>,
    pub bag: Arc<Bag>,
}

impl Harness {
    pub async fn start() -> Self {
        let bridge = Bridge::start(BridgeConfig::ephemeral()).await.unwrap();
        let counter = Arc::new(Counter::default());
        let device = Arc::new(Device::new("lamp"));
        let bag = Arc::new(Bag::default());
        bridge.register(&counter);
        bridge.register(&device);
        bridge.register(&bag);
        Self {
            bridge,
            counter,
            device,
            bag,
        }
    }

    pub fn rest_addr(&self) -> SocketAddr {
        self.bridge.rest_addr().unwrap()
    }

    pub fn rpc_url(&self) -> String {
        format!("ws://{}", self.bridge.rpc_addr().unwrap())
    }

    /// Connect a raw WebSocket client and wait until the server has added it
    /// to the broadcast set.
    pub async fn ws_connect(&self) -> WsClient {
        let before = self.bridge.client_count();
        let (socket, _) = tokio_tungstenite::connect_async(self.rpc_url())
            .await
            .unwrap();
        self.wait_for_clients(before + 1).await;
        socket
    }

    pub async fn wait_for_clients(&self, count: usize) {
        timeout(WAIT, async {
            while self.bridge.client_count() != count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("expected {} connected clients", count));
    }

    pub async fn rest(&self, method: &str, path: &str, body: &str) -> HttpReply {
        http(self.rest_addr(), method, path, body).await
    }
}

#[derive(Debug)]
pub struct HttpReply {
    pub status: u16,
    pub head: String,
    pub body: String,
}

impl HttpReply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }
}

/// One request per connection; reads until the server closes.
pub async fn http(addr: SocketAddr, method: &str, path: &str, body: &str) -> HttpReply {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{} {} HTTP/1.1\r\nHost: {}\r\nContent-Length: {}\r\n\r\n{}",
        method,
        path,
        addr,
        body.len(),
        body
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    timeout(WAIT, stream.read_to_string(&mut raw))
        .await
        .unwrap()
        .unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    HttpReply {
        status,
        head: head.to_string(),
        body: body.to_string(),
    }
}

pub async fn send_json(socket: &mut WsClient, message: Value) {
    socket
        .send(Message::Text(message.to_string()))
        .await
        .unwrap();
}

pub async fn send_text(socket: &mut WsClient, text: &str) {
    socket.send(Message::Text(text.to_string())).await.unwrap();
}

/// Next text frame as JSON
pub async fn next_json(socket: &mut WsClient) -> Value {
    loop {
        match timeout(WAIT, socket.next()).await.unwrap() {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
            Some(Ok(_)) => continue,
            other => panic!("expected a text frame, got {:?}", other),
        }
    }
}

/// True if no text frame arrives within `window`
pub async fn stays_quiet(socket: &mut WsClient, window: Duration) -> bool {
    loop {
        match timeout(window, socket.next()).await {
            Err(_) => return true,
            Ok(Some(Ok(Message::Text(_)))) => return false,
            Ok(Some(Ok(_))) => continue,
            Ok(_) => return true,
        }
    }
}
