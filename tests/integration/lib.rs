//! Shared harness for gateway integration tests.
//!
//! Starts a real gateway on an ephemeral loopback port and drives it with
//! `tokio-tungstenite` clients.

use courier_core::Config;
use courier_gateway::{Claims, Gateway};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

pub const SECRET: &str = "integration-secret";

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Config with a known signing secret and default namespaces.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = Some(SECRET.to_string().into());
    config
}

/// Sign a one-hour token for `user` with `role`.
pub fn token(user: &str, role: &str) -> String {
    let claims = Claims::new(user, role, chrono::Duration::hours(1));
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("sign token")
}

/// A gateway serving on an ephemeral port.
pub struct TestGateway {
    pub gateway: Arc<Gateway>,
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestGateway {
    pub async fn start(config: Config) -> Self {
        let gateway = Arc::new(Gateway::from_config(&config).expect("gateway"));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        let serving = gateway.clone();
        let handle = tokio::spawn(async move {
            serving.serve(listener).await.expect("serve");
        });

        Self {
            gateway,
            addr,
            handle,
        }
    }

    /// `ws://` URL for a namespace path with an optional query string.
    pub fn url(&self, path: &str, query: &str) -> String {
        if query.is_empty() {
            format!("ws://{}{}", self.addr, path)
        } else {
            format!("ws://{}{}?{}", self.addr, path, query)
        }
    }

    /// Connect with a bearer token in the query string.
    pub async fn connect_as(&self, path: &str, user: &str, role: &str) -> WsClient {
        let query = format!("token={}", token(user, role));
        WsClient::connect(&self.url(path, &query))
            .await
            .expect("connect")
    }

    /// GET a JSON endpoint on the gateway; returns status code and decoded body.
    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let response = reqwest::get(format!("http://{}{}", self.addr, path))
            .await
            .expect("http get");
        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Poll until `check` holds or the frame timeout elapses.
    pub async fn eventually(&self, mut check: impl FnMut(&Gateway) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + FRAME_TIMEOUT;
        while tokio::time::Instant::now() < deadline {
            if check(self.gateway.as_ref()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        check(self.gateway.as_ref())
    }

    pub async fn stop(self) {
        self.gateway.shutdown();
        let _ = tokio::time::timeout(FRAME_TIMEOUT, self.handle).await;
    }
}

/// A connected WebSocket client speaking `{event, data}` frames.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(url: &str) -> Result<Self, tokio_tungstenite::tungstenite::Error> {
        let (stream, _) = connect_async(url).await?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, event: &str, data: Value) {
        let text = serde_json::json!({ "event": event, "data": data }).to_string();
        self.send_raw(&text).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string()))
            .await
            .expect("send frame");
    }

    /// Next text frame as `(event, data)`, or `None` on close or timeout.
    pub async fn next_frame_within(&mut self, wait: Duration) -> Option<(String, Value)> {
        loop {
            let msg = tokio::time::timeout(wait, self.stream.next()).await.ok()??;
            match msg.ok()? {
                Message::Text(text) => {
                    let frame: Value = serde_json::from_str(&text).ok()?;
                    let event = frame["event"].as_str()?.to_string();
                    return Some((event, frame["data"].clone()));
                }
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// Wait for a frame with the given event, failing on anything else.
    pub async fn expect(&mut self, event: &str) -> Value {
        match self.next_frame_within(FRAME_TIMEOUT).await {
            Some((got, data)) if got == event => data,
            Some((got, data)) => panic!("expected {}, got {} {}", event, got, data),
            None => panic!("expected {}, got nothing", event),
        }
    }

    /// Assert nothing arrives for a short while.
    pub async fn expect_silence(&mut self) {
        if let Some((event, data)) = self.next_frame_within(Duration::from_millis(300)).await {
            panic!("expected silence, got {} {}", event, data);
        }
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
