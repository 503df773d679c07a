//! Request/response connection to a debug adapter.
//!
//! Owns a writer task and a reader task over any async byte stream,
//! correlates responses to requests by `seq` through oneshot channels,
//! and forwards adapter events to an unbounded channel.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{timeout, Duration};

use crate::error::DapError;
use crate::protocol::{Event, Request, Response};
use crate::transport::{decode_message, encode_message};

/// Seconds a request may wait for its response unless overridden.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

type PendingRequests = Arc<Mutex<HashMap<i64, oneshot::Sender<Response>>>>;

/// A live connection to one debug adapter.
pub struct DapConnection {
    writer_tx: mpsc::Sender<Vec<u8>>,
    pending: PendingRequests,
    closed: Arc<AtomicBool>,
    next_seq: AtomicI64,
    request_timeout: Duration,
}

impl DapConnection {
    /// Start the reader and writer tasks for an adapter stream.
    ///
    /// Must be called from within a tokio runtime. The returned receiver
    /// yields every event the adapter sends, in order.
    pub fn spawn<R, W>(
        reader: R,
        writer: W,
        request_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Event>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (writer_tx, mut writer_rx) = mpsc::channel::<Vec<u8>>(64);
        tokio::spawn(async move {
            let mut writer = writer;
            while let Some(msg) = writer_rx.recv().await {
                if writer.write_all(&msg).await.is_err() {
                    break;
                }
                if writer.flush().await.is_err() {
                    break;
                }
            }
        });

        let pending: PendingRequests = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(read_loop(reader, pending.clone(), closed.clone(), event_tx));

        let connection = Self {
            writer_tx,
            pending,
            closed,
            next_seq: AtomicI64::new(1),
            request_timeout,
        };
        (connection, event_rx)
    }

    /// Whether the adapter stream has ended.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a request and wait for its response.
    ///
    /// A response with `success: false` becomes [`DapError::Rejected`]
    /// carrying the adapter's error text.
    pub async fn request(
        &self,
        command: &str,
        arguments: Option<serde_json::Value>,
    ) -> Result<Response, DapError> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let message = serde_json::to_value(Request::new(seq, command, arguments))
            .map_err(DapError::serialization)?;

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(seq, tx);
        if self.is_closed() {
            self.pending.lock().await.remove(&seq);
            return Err(connection_closed());
        }

        tracing::debug!(seq, command, "sending DAP request");
        if self.writer_tx.send(encode_message(&message)).await.is_err() {
            self.pending.lock().await.remove(&seq);
            return Err(connection_closed());
        }

        let response = match timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => return Err(connection_closed()),
            Err(_) => {
                self.pending.lock().await.remove(&seq);
                tracing::warn!(seq, command, "DAP request timed out");
                return Err(DapError::Timeout {
                    command: command.into(),
                });
            }
        };

        if !response.success {
            return Err(DapError::Rejected {
                command: command.into(),
                message: rejection_message(command, &response),
            });
        }
        Ok(response)
    }

    /// Send a request with typed arguments and parse its typed body.
    pub async fn request_with<A, T>(&self, command: &str, arguments: &A) -> Result<T, DapError>
    where
        A: Serialize,
        T: DeserializeOwned,
    {
        let arguments = serde_json::to_value(arguments).map_err(DapError::serialization)?;
        let response = self.request(command, Some(arguments)).await?;
        let body = response.body.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(body)
            .map_err(|e| DapError::InvalidResponse(format!("{command} body: {e}")))
    }
}

impl std::fmt::Debug for DapConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DapConnection")
            .field("closed", &self.is_closed())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn connection_closed() -> DapError {
    DapError::Transport("adapter connection closed".into())
}

/// Prefer the detailed `body.error.format` text, then `message`.
fn rejection_message(command: &str, response: &Response) -> String {
    response
        .body
        .as_ref()
        .and_then(|b| b.pointer("/error/format"))
        .and_then(|f| f.as_str())
        .or(response.message.as_deref())
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{command} request failed"))
}

async fn read_loop<R>(
    mut reader: R,
    pending: PendingRequests,
    closed: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<Event>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];

    'stream: loop {
        loop {
            match decode_message(&buf) {
                Ok(Some((value, consumed))) => {
                    buf.drain(..consumed);
                    route_message(value, &pending, &events).await;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("dropping adapter stream: {e}");
                    break 'stream;
                }
            }
        }

        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) => {
                tracing::warn!("adapter read failed: {e}");
                break;
            }
        }
    }

    closed.store(true, Ordering::SeqCst);
    // Dropping the senders wakes every waiting request.
    pending.lock().await.clear();
    tracing::debug!("adapter stream closed");
}

async fn route_message(
    value: serde_json::Value,
    pending: &PendingRequests,
    events: &mpsc::UnboundedSender<Event>,
) {
    let message_type = value
        .get("type")
        .and_then(|t| t.as_str())
        .map(str::to_owned);
    match message_type.as_deref() {
        Some("response") => match serde_json::from_value::<Response>(value) {
            Ok(response) => {
                let sender = pending.lock().await.remove(&response.request_seq);
                match sender {
                    // If the receiver was dropped, that's ok
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => tracing::warn!(
                        "received response for unknown request seq: {}",
                        response.request_seq
                    ),
                }
            }
            Err(e) => tracing::warn!("malformed adapter response: {e}"),
        },
        Some("event") => match serde_json::from_value::<Event>(value) {
            Ok(event) => {
                let _ = events.send(event);
            }
            Err(e) => tracing::warn!("malformed adapter event: {e}"),
        },
        Some("request") => tracing::debug!("ignoring reverse request from adapter"),
        other => tracing::warn!("unknown DAP message type: {:?}", other),
    }
}
