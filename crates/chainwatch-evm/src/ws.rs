//! `WsHeaderSource`: `eth_subscribe("newHeads")` over a WebSocket.
//!
//! Every call to `subscribe_new_headers` opens a fresh connection owned by a
//! background task. The task forwards parsed headers into the returned
//! stream; a socket error or close is forwarded as one `Err` item and then
//! the stream ends. Reconnecting is the block listener's job.

use std::time::Duration;

use async_trait::async_trait;
use chainwatch_core::{BlockHeader, HeaderSource, HeaderStream, WatchError};
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::block::parse_header;
use crate::request::{JsonRpcRequest, JsonRpcResponse, SubscriptionNotification};

const SUBSCRIBE_ID: u64 = 1;

/// New-header subscription over a JSON-RPC WebSocket endpoint.
pub struct WsHeaderSource {
    url: String,
    /// How long to wait for the node to acknowledge `eth_subscribe`.
    subscribe_timeout: Duration,
    buffer: usize,
}

impl WsHeaderSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            subscribe_timeout: Duration::from_secs(10),
            buffer: 64,
        }
    }

    pub fn with_subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.subscribe_timeout = timeout;
        self
    }
}

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

#[async_trait]
impl HeaderSource for WsHeaderSource {
    async fn subscribe_new_headers(&self) -> Result<HeaderStream, WatchError> {
        info!(url = %self.url, "connecting header subscription");
        let (mut ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| WatchError::WebSocket(format!("connect {}: {e}", self.url)))?;

        let req = JsonRpcRequest::new(SUBSCRIBE_ID, "eth_subscribe", vec![Value::String("newHeads".into())]);
        let msg = serde_json::to_string(&req).map_err(|e| WatchError::Subscription(e.to_string()))?;
        ws.send(Message::Text(msg.into()))
            .await
            .map_err(|e| WatchError::WebSocket(e.to_string()))?;

        let sub_id = tokio::time::timeout(self.subscribe_timeout, await_subscription_id(&mut ws))
            .await
            .map_err(|_| WatchError::Subscription("timed out waiting for eth_subscribe reply".into()))??;
        info!(subscription = %sub_id, "subscribed to newHeads");

        let (tx, rx) = mpsc::channel(self.buffer);
        tokio::spawn(forward_headers(ws, sub_id, tx));
        Ok(Box::pin(rx))
    }
}

/// Read until the reply to our `eth_subscribe` request arrives.
async fn await_subscription_id(ws: &mut WsStream) -> Result<String, WatchError> {
    while let Some(msg) = ws.next().await {
        let text = match msg.map_err(|e| WatchError::WebSocket(e.to_string()))? {
            Message::Text(text) => text,
            Message::Ping(data) => {
                let _ = ws.send(Message::Pong(data)).await;
                continue;
            }
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(resp) = serde_json::from_str::<JsonRpcResponse>(&text) else {
            continue;
        };
        let result = resp
            .into_result()
            .map_err(|e| WatchError::Subscription(e.to_string()))?;
        return result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WatchError::Subscription(format!("unexpected subscription id {result}")));
    }
    Err(WatchError::WebSocket("connection closed before subscription was acknowledged".into()))
}

// ─── Background forwarding loop ──────────────────────────────────────────────

async fn forward_headers(ws: WsStream, sub_id: String, mut tx: mpsc::Sender<Result<BlockHeader, WatchError>>) {
    let (mut write, mut read) = ws.split();

    while let Some(msg) = read.next().await {
        let item = match msg {
            Err(e) => Some(Err(WatchError::WebSocket(e.to_string()))),
            Ok(Message::Text(text)) => parse_notification(&text, &sub_id),
            Ok(Message::Ping(data)) => {
                let _ = write.send(Message::Pong(data)).await;
                None
            }
            Ok(Message::Close(frame)) => {
                let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                Some(Err(WatchError::WebSocket(format!("closed by server: {reason}"))))
            }
            Ok(_) => None,
        };

        let Some(item) = item else { continue };
        let terminal = item.is_err();
        if tx.send(item).await.is_err() {
            debug!("header stream dropped, closing websocket");
            let _ = write.send(Message::Close(None)).await;
            return;
        }
        if terminal {
            return;
        }
    }

    let _ = tx
        .send(Err(WatchError::WebSocket("connection ended".into())))
        .await;
}

/// A header, a malformed-header error, or `None` for unrelated messages.
fn parse_notification(text: &str, sub_id: &str) -> Option<Result<BlockHeader, WatchError>> {
    let note: SubscriptionNotification = serde_json::from_str(text).ok()?;
    if note.method != "eth_subscription" || note.params.subscription != sub_id {
        return None;
    }
    match parse_header(&note.params.result) {
        Ok(header) => Some(Ok(header)),
        Err(e) => {
            warn!(error = %e, "malformed newHeads notification");
            Some(Err(e))
        }
    }
}
