//! HTTP and WebSocket chain connections against local scripted nodes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chainwatch_core::{BlockFetcher, BlockHash, HeaderSource, WatchError};
use chainwatch_evm::{HttpClientConfig, HttpRpcClient, RetryConfig, WsHeaderSource};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

// ─── Scripted HTTP node ──────────────────────────────────────────────────────

/// Serve one canned `(status, body)` per connection, recording request bodies.
async fn http_node(responses: Vec<(u16, Value)>) -> (String, Arc<Mutex<Vec<Value>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let seen = Arc::new(Mutex::new(vec![]));
    let seen_task = Arc::clone(&seen);

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut sock, _) = listener.accept().await.unwrap();
            let request = read_http_body(&mut sock).await;
            seen_task.lock().unwrap().push(request);

            let body = body.to_string();
            let reply = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(reply.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
        }
    });

    (url, seen)
}

async fn read_http_body(sock: &mut tokio::net::TcpStream) -> Value {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = sock.read(&mut chunk).await.unwrap();
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(split) = text.find("\r\n\r\n") {
            let len = text[..split]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if buf.len() >= split + 4 + len {
                return serde_json::from_slice(&buf[split + 4..split + 4 + len]).unwrap_or(Value::Null);
            }
        }
        if n == 0 {
            return Value::Null;
        }
    }
}

fn client(url: &str, max_retries: u32) -> HttpRpcClient {
    HttpRpcClient::new(
        url,
        HttpClientConfig {
            retry: RetryConfig {
                max_retries,
                initial_backoff: Duration::from_millis(5),
                ..RetryConfig::default()
            },
            request_timeout: Duration::from_secs(5),
        },
    )
    .unwrap()
}

fn block_json() -> Value {
    json!({
        "hash": "0xb10c",
        "number": "0x2a",
        "transactions": [{
            "hash": "0x01",
            "type": "0x2",
            "chainId": "0x1",
            "nonce": "0x0",
            "to": "0x00000000000000000000000000000000000000AA",
            "value": "0x0",
            "input": "0x",
            "gas": "0x5208",
            "transactionIndex": "0x0"
        }]
    })
}

#[tokio::test]
async fn fetches_block_by_hash() {
    let (url, seen) = http_node(vec![(200, json!({"jsonrpc":"2.0","id":1,"result": block_json()}))]).await;

    let block = client(&url, 0).block_by_hash(&BlockHash::new("0xb10c")).await.unwrap();
    assert_eq!(block.number, 42);
    assert_eq!(block.transactions.len(), 1);
    assert_eq!(
        block.transactions[0].to.as_ref().unwrap().as_str(),
        "0x00000000000000000000000000000000000000aa"
    );

    let req = seen.lock().unwrap()[0].clone();
    assert_eq!(req["method"], "eth_getBlockByHash");
    assert_eq!(req["params"], json!(["0xb10c", true]));
}

#[tokio::test]
async fn null_block_is_not_found() {
    let (url, _) = http_node(vec![(200, json!({"jsonrpc":"2.0","id":1,"result": null}))]).await;
    let err = client(&url, 0).block_by_hash(&BlockHash::new("0xgone")).await.unwrap_err();
    assert!(matches!(err, WatchError::BlockNotFound { hash } if hash == "0xgone"));
}

#[tokio::test]
async fn default_client_fetches_block_at_most_once() {
    let (url, seen) = http_node(vec![
        (503, json!({"error": "busy"})),
        (200, json!({"jsonrpc":"2.0","id":1,"result": block_json()})),
    ])
    .await;

    let fetcher = HttpRpcClient::new(&url, HttpClientConfig::default()).unwrap();
    let err = fetcher.block_by_hash(&BlockHash::new("0xb10c")).await.unwrap_err();
    assert!(matches!(err, WatchError::Rpc(msg) if msg.contains("503")));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn opt_in_retry_recovers_transient_http_failure() {
    let (url, seen) = http_node(vec![
        (503, json!({"error": "busy"})),
        (200, json!({"jsonrpc":"2.0","id":1,"result": block_json()})),
    ])
    .await;

    let block = client(&url, 2).block_by_hash(&BlockHash::new("0xb10c")).await.unwrap();
    assert_eq!(block.number, 42);
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn node_error_is_not_retried() {
    let (url, seen) = http_node(vec![(
        200,
        json!({"jsonrpc":"2.0","id":1,"error":{"code":-32602,"message":"invalid argument"}}),
    )])
    .await;

    let err = client(&url, 3).block_by_hash(&BlockHash::new("0x1")).await.unwrap_err();
    assert!(matches!(err, WatchError::Rpc(msg) if msg.contains("invalid argument")));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

// ─── Scripted WebSocket node ─────────────────────────────────────────────────

#[tokio::test]
async fn streams_new_heads_then_reports_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (sock, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(sock).await.unwrap();

        let Some(Ok(Message::Text(text))) = ws.next().await else {
            panic!("expected eth_subscribe");
        };
        let req: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(req["method"], "eth_subscribe");
        assert_eq!(req["params"], json!(["newHeads"]));

        let ack = json!({"jsonrpc":"2.0","id": req["id"],"result":"0xsub"});
        ws.send(Message::Text(ack.to_string().into())).await.unwrap();
        for (n, h) in [("0x10", "0xaa"), ("0x11", "0xbb")] {
            let note = json!({
                "jsonrpc": "2.0",
                "method": "eth_subscription",
                "params": {"subscription": "0xsub", "result": {"number": n, "hash": h}}
            });
            ws.send(Message::Text(note.to_string().into())).await.unwrap();
        }
        ws.close(None).await.ok();
    });

    let mut stream = WsHeaderSource::new(url).subscribe_new_headers().await.unwrap();
    let first = stream.next().await.unwrap().unwrap();
    let second = stream.next().await.unwrap().unwrap();
    assert_eq!((first.height, first.hash.as_str()), (16, "0xaa"));
    assert_eq!((second.height, second.hash.as_str()), (17, "0xbb"));

    assert!(matches!(stream.next().await, Some(Err(WatchError::WebSocket(_)))));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn subscription_rejected_by_node() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (sock, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(sock).await.unwrap();
        let _ = ws.next().await;
        let err = json!({"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"notifications not supported"}});
        ws.send(Message::Text(err.to_string().into())).await.unwrap();
        // Keep the socket open until the client gives up.
        let _ = ws.next().await;
    });

    let err = WsHeaderSource::new(url).subscribe_new_headers().await.err().unwrap();
    assert!(matches!(err, WatchError::Subscription(msg) if msg.contains("not supported")));
}

#[tokio::test]
async fn silent_node_subscription_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (sock, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(sock).await.unwrap();
        // Read the subscribe request, never answer it.
        let _ = ws.next().await;
        let _ = ws.next().await;
    });

    let source = WsHeaderSource::new(url).with_subscribe_timeout(Duration::from_millis(50));
    let err = source.subscribe_new_headers().await.err().unwrap();
    assert!(matches!(err, WatchError::Subscription(msg) if msg.contains("timed out")));
}

#[tokio::test]
async fn unreachable_node_is_websocket_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = WsHeaderSource::new(url).subscribe_new_headers().await.err().unwrap();
    assert!(matches!(err, WatchError::WebSocket(msg) if msg.starts_with("connect ")));
}
