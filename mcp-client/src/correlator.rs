//! Request/response correlation.
//!
//! Every outbound request gets a fresh numeric id and a one-shot completion
//! slot. Inbound responses are matched to their slot by id, so responses may
//! arrive in any order. When the connection goes away every outstanding slot
//! is failed, and no new requests are accepted.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::{ConnectionError, McpError, McpResult, ProtocolError};
use crate::messages::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, RequestId};
use crate::transport::Transport;

type Responder = oneshot::Sender<McpResult<Value>>;

struct PendingRequest {
    method: String,
    responder: Responder,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    pending: HashMap<i64, PendingRequest>,
    closed: bool,
}

/// Tracks in-flight requests and routes responses back to their callers.
#[derive(Default)]
pub struct Correlator {
    inner: Mutex<Inner>,
}

impl Correlator {
    /// Create an empty correlator. The first request id is `0`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Send a request and wait for its result.
    ///
    /// The result is deserialized into `T`. If `cancel` fires first the
    /// pending entry is removed and the call fails with
    /// [`McpError::Aborted`]; a late response for that id is then reported
    /// as unknown.
    pub async fn request<T: DeserializeOwned>(
        &self,
        transport: &dyn Transport,
        method: &str,
        params: Option<Value>,
        cancel: Option<&CancellationToken>,
    ) -> McpResult<T> {
        if self.is_closed() {
            return Err(ConnectionError::Closed.into());
        }
        if cancel.is_some_and(|token| token.is_cancelled()) {
            return Err(McpError::aborted(format!("{} cancelled before sending", method)));
        }

        let (id, rx) = self.register(method)?;
        let mut pending = PendingGuard {
            correlator: self,
            id,
            armed: true,
        };
        let request = match params {
            Some(params) => JsonRpcRequest::new(id, method, params),
            None => JsonRpcRequest::without_params(id, method),
        };

        tracing::debug!("Sending request {} ({})", id, method);
        transport.send(&JsonRpcMessage::Request(request)).await?;

        let outcome = match cancel {
            Some(token) => tokio::select! {
                outcome = rx => outcome,
                _ = token.cancelled() => {
                    tracing::debug!("Request {} ({}) cancelled", id, method);
                    return Err(McpError::aborted(format!("{} cancelled", method)));
                }
            },
            None => rx.await,
        };
        pending.armed = false;

        let value = outcome.map_err(|_| McpError::from(ConnectionError::Closed))??;
        serde_json::from_value(value).map_err(|e| {
            ProtocolError::InvalidResult {
                method: method.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Send a notification. Nothing is registered since no reply is expected.
    pub async fn notification(
        &self,
        transport: &dyn Transport,
        method: &str,
        params: Option<Value>,
    ) -> McpResult<()> {
        if self.is_closed() {
            return Err(ConnectionError::Closed.into());
        }

        let notification = match params {
            Some(params) => JsonRpcNotification::new(method, params),
            None => JsonRpcNotification::without_params(method),
        };
        tracing::debug!("Sending notification {}", method);
        transport
            .send(&JsonRpcMessage::Notification(notification))
            .await
    }

    /// Allocate an id and a completion slot for a new request.
    pub fn register(&self, method: &str) -> McpResult<(i64, oneshot::Receiver<McpResult<Value>>)> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(ConnectionError::Closed.into());
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let (responder, rx) = oneshot::channel();
        inner.pending.insert(
            id,
            PendingRequest {
                method: method.to_string(),
                responder,
            },
        );
        Ok((id, rx))
    }

    /// Forget a pending request without completing it.
    pub fn remove(&self, id: i64) -> bool {
        self.lock().pending.remove(&id).is_some()
    }

    /// Route an inbound message to the request waiting for it.
    ///
    /// Returns an error for anything that cannot be delivered: server-initiated
    /// requests and notifications, responses with an unknown id, and error
    /// responses without an id. The caller decides how to report these.
    pub fn dispatch(&self, message: JsonRpcMessage) -> McpResult<()> {
        let (id, outcome) = match message {
            JsonRpcMessage::Response(response) => (response.id, Ok(response.result)),
            JsonRpcMessage::ErrorResponse(response) => match response.id {
                Some(id) => (id, Err(McpError::Request(response.error))),
                None => return Err(McpError::Request(response.error)),
            },
            JsonRpcMessage::Request(request) => {
                return Err(ProtocolError::UnsupportedMessage {
                    method: request.method,
                }
                .into())
            }
            JsonRpcMessage::Notification(notification) => {
                return Err(ProtocolError::UnsupportedMessage {
                    method: notification.method,
                }
                .into())
            }
        };

        let pending = match id.as_number() {
            Some(number) => self.lock().pending.remove(&number),
            None => None,
        };
        let Some(pending) = pending else {
            return Err(unknown_id(&id));
        };

        tracing::debug!("Completing request {} ({})", id, pending.method);
        if pending.responder.send(outcome).is_err() {
            tracing::debug!("Caller for request {} went away", id);
        }
        Ok(())
    }

    /// Fail every pending request with a connection-closed error and refuse
    /// new ones. Returns how many requests were failed.
    pub fn fail_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut inner = self.lock();
            inner.closed = true;
            inner.pending.drain().collect()
        };

        let count = drained.len();
        for (id, pending) in drained {
            tracing::debug!("Failing request {} ({}): connection closed", id, pending.method);
            let _ = pending.responder.send(Err(ConnectionError::Closed.into()));
        }
        count
    }

    /// Number of requests still waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Whether `fail_all` has run.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a registered request when its caller stops waiting, whether by
/// send failure, cancellation, or the future being dropped.
struct PendingGuard<'a> {
    correlator: &'a Correlator,
    id: i64,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.correlator.remove(self.id) {
            tracing::debug!("Dropped pending request {}", self.id);
        }
    }
}

fn unknown_id(id: &RequestId) -> McpError {
    ProtocolError::UnknownResponseId { id: id.to_string() }.into()
}
