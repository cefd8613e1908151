//! Scripted in-memory transport for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use crate::correlator::Correlator;
use crate::error::{ConnectionError, McpResult};
use crate::messages::{JsonRpcMessage, JsonRpcRequest, JsonRpcResponse};
use crate::transport::{EventSender, EventSink, Transport};

type Responder = dyn Fn(&JsonRpcRequest) -> Option<JsonRpcMessage> + Send + Sync;

/// Records everything sent and answers requests through a closure.
///
/// Replies are routed either straight into a [`Correlator`] (see
/// [`connect_to`](Self::connect_to)) or through the event channel given to
/// `start`.
pub(crate) struct MockTransport {
    responder: Box<Responder>,
    fail_sends: bool,
    started: AtomicBool,
    sent: Mutex<Vec<JsonRpcMessage>>,
    sent_notify: Notify,
    correlator: Mutex<Option<Arc<Correlator>>>,
    sink: EventSink,
    close_calls: Mutex<usize>,
}

impl MockTransport {
    /// Answer each request with `Some(result)` or leave it unanswered.
    pub(crate) fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&JsonRpcRequest) -> Option<Value> + Send + Sync + 'static,
    {
        Self::with_responder(move |request| {
            handler(request).map(|result| {
                JsonRpcMessage::Response(JsonRpcResponse::success(request.id.clone(), result))
            })
        })
    }

    /// Answer each request with an arbitrary message.
    pub(crate) fn with_responder<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&JsonRpcRequest) -> Option<JsonRpcMessage> + Send + Sync + 'static,
    {
        Arc::new(Self::build(Box::new(responder), false))
    }

    /// Reject every send.
    pub(crate) fn failing_sends() -> Arc<Self> {
        Arc::new(Self::build(Box::new(|_| None), true))
    }

    fn build(responder: Box<Responder>, fail_sends: bool) -> Self {
        Self {
            responder,
            fail_sends,
            started: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            sent_notify: Notify::new(),
            correlator: Mutex::new(None),
            sink: EventSink::default(),
            close_calls: Mutex::new(0),
        }
    }

    /// Deliver replies directly to `correlator` instead of the event channel.
    pub(crate) fn connect_to(&self, correlator: Arc<Correlator>) {
        *self.correlator.lock().unwrap() = Some(correlator);
    }

    /// Everything sent so far, in order.
    pub(crate) fn sent(&self) -> Vec<JsonRpcMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Methods of everything sent so far, in order.
    pub(crate) fn sent_methods(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|message| message.method().map(str::to_string))
            .collect()
    }

    /// How many times `close` was called.
    pub(crate) fn close_calls(&self) -> usize {
        *self.close_calls.lock().unwrap()
    }

    /// Push an inbound message as if the peer had sent it.
    pub(crate) fn inject(&self, message: JsonRpcMessage) {
        self.deliver(message);
    }

    /// Simulate the peer going away.
    pub(crate) fn drop_connection(&self) {
        self.sink.closed();
    }

    /// Wait until at least `count` requests have been sent.
    pub(crate) async fn wait_for_requests(&self, count: usize) {
        let wait = async {
            loop {
                let notified = self.sent_notify.notified();
                let requests = self
                    .sent
                    .lock()
                    .unwrap()
                    .iter()
                    .filter(|message| matches!(message, JsonRpcMessage::Request(_)))
                    .count();
                if requests >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("timed out waiting for requests");
    }

    fn deliver(&self, message: JsonRpcMessage) {
        let correlator = self.correlator.lock().unwrap().clone();
        match correlator {
            Some(correlator) => {
                let _ = correlator.dispatch(message);
            }
            None => self.sink.message(message),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn start(&self, events: EventSender) -> McpResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ConnectionError::AlreadyStarted {
                transport_type: "mock".to_string(),
            }
            .into());
        }
        self.sink.attach(events);
        Ok(())
    }

    async fn send(&self, message: &JsonRpcMessage) -> McpResult<()> {
        if self.fail_sends {
            return Err(ConnectionError::NotConnected {
                transport_type: "mock".to_string(),
            }
            .into());
        }

        self.sent.lock().unwrap().push(message.clone());
        self.sent_notify.notify_waiters();

        if let JsonRpcMessage::Request(request) = message {
            if let Some(reply) = (self.responder)(request) {
                self.deliver(reply);
            }
        }
        Ok(())
    }

    async fn close(&self) {
        *self.close_calls.lock().unwrap() += 1;
        self.sink.closed();
    }

    fn transport_type(&self) -> &'static str {
        "mock"
    }
}
