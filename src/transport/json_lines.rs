//! JSON-lines host bridge - tokio reader/writer tasks over any byte stream
//!
//! Wire format, one JSON object per line:
//!
//! ```text
//! → {"id":1,"method":"eth_requestAccounts"}
//! ← {"id":1,"result":["0x..."]}
//! ← {"id":2,"error":{"code":4001,"message":"User rejected"}}
//! ← {"event":"accountsChanged","data":["0x..."]}
//! ```
//!
//! Response ids may come back as numbers or numeric strings. A response
//! with a malformed `error` body fails its request with `Malformed`.

use super::{HostNotification, Provider, RpcRequest, TransportError};
use async_trait::async_trait;
use futures::channel::mpsc as notify;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, TransportError>>>>>;

#[derive(Serialize)]
struct Outgoing<'a> {
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Value>,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Number(u64),
    Text(String),
}

impl WireId {
    fn as_u64(&self) -> Option<u64> {
        match self {
            WireId::Number(id) => Some(*id),
            WireId::Text(id) => id.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Incoming {
    Response {
        id: WireId,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error: Option<Value>,
    },
    Notification(HostNotification),
}

fn response_outcome(result: Option<Value>, error: Option<Value>) -> Result<Value, TransportError> {
    match error {
        None | Some(Value::Null) => Ok(result.unwrap_or(Value::Null)),
        Some(raw) => match serde_json::from_value::<ErrorBody>(raw.clone()) {
            Ok(err) => Err(TransportError::Rpc { code: err.code, message: err.message }),
            Err(_) => Err(TransportError::Malformed(format!("error body: {}", raw))),
        },
    }
}

/// Request/response channel to the embedding host.
pub struct JsonLinesBridge {
    outgoing: mpsc::Sender<String>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl JsonLinesBridge {
    /// Spawn reader and writer tasks. Returns the bridge and the host's
    /// notification stream, which ends when the host closes its side.
    pub fn spawn<R, W>(reader: R, writer: W) -> (Self, notify::UnboundedReceiver<HostNotification>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out_tx, out_rx) = mpsc::channel::<String>(32);
        let (event_tx, event_rx) = notify::unbounded();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(write_loop(writer, out_rx, pending.clone(), closed.clone()));
        tokio::spawn(read_loop(reader, event_tx, pending.clone(), closed.clone()));

        let bridge = Self { outgoing: out_tx, pending, closed, next_id: AtomicU64::new(1) };
        (bridge, event_rx)
    }

    pub fn is_closed(&self) -> bool { self.closed.load(Ordering::SeqCst) }

    fn take_pending(&self, id: u64) {
        if let Ok(mut pending) = self.pending.lock() { pending.remove(&id); }
    }
}

#[async_trait]
impl Provider for JsonLinesBridge {
    async fn request(&self, request: RpcRequest) -> Result<Value, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let line = serde_json::to_string(&Outgoing { id, method: &request.method, params: request.params.as_ref() })
            .map_err(|e| TransportError::Malformed(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().map_err(|_| TransportError::Io("pending lock".into()))?.insert(id, tx);
        if self.is_closed() {
            self.take_pending(id);
            return Err(TransportError::Closed);
        }
        if self.outgoing.send(line).await.is_err() {
            self.take_pending(id);
            return Err(TransportError::Closed);
        }
        tracing::trace!(id, method = %request.method, "bridge request sent");
        rx.await.unwrap_or(Err(TransportError::Closed))
    }
}

fn fail_pending(pending: &Pending, closed: &AtomicBool) {
    closed.store(true, Ordering::SeqCst);
    if let Ok(mut pending) = pending.lock() {
        for (_, tx) in pending.drain() {
            let _ = tx.send(Err(TransportError::Closed));
        }
    }
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::Receiver<String>, pending: Pending, closed: Arc<AtomicBool>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(mut line) = rx.recv().await {
        line.push('\n');
        if let Err(e) = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        }
        .await
        {
            tracing::warn!("bridge write failed: {}", e);
            break;
        }
    }
    fail_pending(&pending, &closed);
}

async fn read_loop<R>(reader: R, events: notify::UnboundedSender<HostNotification>, pending: Pending, closed: Arc<AtomicBool>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("bridge read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Incoming>(&line) {
            Ok(Incoming::Response { id, result, error }) => {
                let Some(id) = id.as_u64() else {
                    tracing::warn!("bridge response with unroutable id: {}", line);
                    continue;
                };
                let outcome = response_outcome(result, error);
                let waiter = pending.lock().ok().and_then(|mut p| p.remove(&id));
                match waiter {
                    Some(tx) => { let _ = tx.send(outcome); }
                    None => tracing::debug!(id, "bridge response with no pending request"),
                }
            }
            Ok(Incoming::Notification(n)) => {
                tracing::debug!(event = %n.event, "bridge notification");
                let _ = events.unbounded_send(n);
            }
            Err(e) => tracing::warn!("bridge message ignored: {}", e),
        }
    }
    tracing::info!("bridge host closed");
    fail_pending(&pending, &closed);
}
