//! HTTP + Server-Sent Events transport.
//!
//! The connection has two phases:
//!
//! 1. A GET with `Accept: text/event-stream` opens the event stream.
//! 2. The server emits an `endpoint` event whose data is a URL, usually
//!    relative to the stream URL. Every outbound message is POSTed there.
//!
//! `start()` resolves only after the endpoint is known. When an endpoint
//! timeout is configured it bounds the whole connect phase. The endpoint must share
//! the stream URL's origin. Inbound JSON-RPC messages arrive as `message`
//! events. A message that fails to parse or a POST that fails is reported on
//! the event channel and the stream keeps running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};
use tokio::sync::{oneshot, OnceCell};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{EventSender, EventSink, SseConfig, Transport};
use crate::error::{ConfigError, ConnectionError, McpError, McpResult};
use crate::messages::JsonRpcMessage;

const TRANSPORT_TYPE: &str = "sse";

/// SSE transport for remote MCP servers.
pub struct SseTransport {
    config: SseConfig,
    client: Client,
    started: AtomicBool,
    connected: Arc<AtomicBool>,
    endpoint: Arc<OnceCell<Url>>,
    sink: EventSink,
    cancel: CancellationToken,
}

impl SseTransport {
    /// Create a new SSE transport. No connection is made until `start`.
    pub fn new(config: SseConfig) -> McpResult<Self> {
        let client = Self::build_http_client(&config)?;

        Ok(Self {
            config,
            client,
            started: AtomicBool::new(false),
            connected: Arc::new(AtomicBool::new(false)),
            endpoint: Arc::new(OnceCell::new()),
            sink: EventSink::default(),
            cancel: CancellationToken::new(),
        })
    }

    /// The endpoint announced by the server, once known.
    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.get()
    }

    /// Build the HTTP client with configured headers and connect timeout.
    ///
    /// No total request timeout is set: the event stream stays open for the
    /// whole session.
    fn build_http_client(config: &SseConfig) -> McpResult<Client> {
        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                ConfigError::InvalidValue {
                    parameter: "headers".to_string(),
                    value: key.clone(),
                    reason: e.to_string(),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidValue {
                parameter: format!("headers.{}", key),
                value: value.clone(),
                reason: e.to_string(),
            })?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                parameter: "http_client".to_string(),
                value: TRANSPORT_TYPE.to_string(),
                reason: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(client)
    }

    async fn connect(&self) -> McpResult<Url> {
        tracing::info!("Connecting SSE transport to {}", self.config.url);

        let request = self
            .client
            .get(self.config.url.clone())
            .header(ACCEPT, "text/event-stream")
            .send();

        let response = tokio::select! {
            response = request => response.map_err(network_error)?,
            _ = self.cancel.cancelled() => return Err(ConnectionError::Closed.into()),
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectionError::Http { status, body }.into());
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        tokio::spawn(run_event_stream(
            response,
            EventStreamContext {
                base: self.config.url.clone(),
                endpoint: self.endpoint.clone(),
                connected: self.connected.clone(),
                sink: self.sink.clone(),
                cancel: self.cancel.clone(),
            },
            ready_tx,
        ));

        let endpoint = tokio::select! {
            ready = ready_rx => ready.unwrap_or(Err(ConnectionError::StreamClosed))?,
            _ = self.cancel.cancelled() => return Err(ConnectionError::Closed.into()),
        };

        Ok(endpoint)
    }
}

#[async_trait]
impl Transport for SseTransport {
    async fn start(&self, events: EventSender) -> McpResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ConnectionError::AlreadyStarted {
                transport_type: TRANSPORT_TYPE.to_string(),
            }
            .into());
        }

        self.sink.attach(events);

        let connecting = self.connect();
        let outcome = match self.config.endpoint_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connecting)
                .await
                .unwrap_or_else(|_| Err(ConnectionError::EndpointTimeout { timeout }.into())),
            None => connecting.await,
        };

        match outcome {
            Ok(endpoint) => {
                tracing::info!("SSE transport connected, posting to {}", endpoint);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("SSE transport failed to start: {}", e);
                self.connected.store(false, Ordering::SeqCst);
                // Stops the stream task if it is still waiting for an endpoint.
                self.cancel.cancel();
                Err(e)
            }
        }
    }

    async fn send(&self, message: &JsonRpcMessage) -> McpResult<()> {
        let endpoint = match self.endpoint.get() {
            Some(endpoint) if self.connected.load(Ordering::SeqCst) => endpoint.clone(),
            _ => {
                return Err(ConnectionError::NotConnected {
                    transport_type: TRANSPORT_TYPE.to_string(),
                }
                .into())
            }
        };

        let body = serde_json::to_string(message)?;
        tracing::trace!("POST {}: {}", endpoint, body);

        let post = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send();

        let outcome = tokio::select! {
            response = post => response,
            _ = self.cancel.cancelled() => return Err(ConnectionError::Closed.into()),
        };

        let error = match outcome {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                ConnectionError::Http { status, body }
            }
            Err(e) => ConnectionError::Network {
                reason: e.to_string(),
            },
        };

        tracing::warn!("Failed to POST message to {}: {}", self.config.url, error);
        self.sink.error(error.clone());
        Err(error.into())
    }

    async fn close(&self) {
        if !self.cancel.is_cancelled() {
            tracing::info!("Closing SSE transport");
        }
        self.connected.store(false, Ordering::SeqCst);
        self.cancel.cancel();
        self.sink.closed();
    }

    fn transport_type(&self) -> &'static str {
        TRANSPORT_TYPE
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct EventStreamContext {
    base: Url,
    endpoint: Arc<OnceCell<Url>>,
    connected: Arc<AtomicBool>,
    sink: EventSink,
    cancel: CancellationToken,
}

async fn run_event_stream(
    response: Response,
    ctx: EventStreamContext,
    ready: oneshot::Sender<Result<Url, ConnectionError>>,
) {
    let mut ready = Some(ready);
    let mut stream = response.bytes_stream().eventsource();
    let mut event_count = 0u64;

    loop {
        let next = tokio::select! {
            next = stream.next() => next,
            _ = ctx.cancel.cancelled() => {
                tracing::debug!("SSE stream cancelled after {} events", event_count);
                return;
            }
        };

        match next {
            Some(Ok(event)) => {
                event_count += 1;
                match event.event.as_str() {
                    "endpoint" => match resolve_endpoint(&ctx.base, &event.data) {
                        Ok(url) => {
                            if ctx.endpoint.set(url.clone()).is_err() {
                                tracing::warn!("Ignoring repeated endpoint event: {}", event.data);
                                continue;
                            }
                            ctx.connected.store(true, Ordering::SeqCst);
                            tracing::debug!("SSE endpoint resolved to {}", url);
                            if let Some(ready) = ready.take() {
                                let _ = ready.send(Ok(url));
                            }
                        }
                        Err(e) => {
                            tracing::error!("Rejecting SSE endpoint: {}", e);
                            match ready.take() {
                                Some(ready) => {
                                    let _ = ready.send(Err(e));
                                }
                                None => ctx.sink.error(e),
                            }
                            return;
                        }
                    },
                    "message" | "" => match JsonRpcMessage::parse(&event.data) {
                        Ok(message) => {
                            tracing::trace!("Received SSE message: {:?}", message);
                            ctx.sink.message(message);
                        }
                        Err(e) => {
                            tracing::warn!("Failed to parse SSE message: {}", e);
                            ctx.sink.error(e);
                        }
                    },
                    other => tracing::debug!("Ignoring SSE event '{}'", other),
                }
            }
            Some(Err(e)) => {
                tracing::error!("SSE stream error after {} events: {}", event_count, e);
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Err(ConnectionError::Network {
                        reason: e.to_string(),
                    }));
                }
                break;
            }
            None => {
                tracing::debug!("SSE stream ended after {} events", event_count);
                break;
            }
        }
    }

    if ctx.connected.swap(false, Ordering::SeqCst) {
        tracing::warn!("SSE connection closed unexpectedly");
        ctx.sink.error(ConnectionError::StreamClosed);
        ctx.sink.closed();
    } else if let Some(ready) = ready.take() {
        let _ = ready.send(Err(ConnectionError::StreamClosed));
    }
}

/// Resolve the data of an `endpoint` event against the stream URL and check
/// that it stays on the same origin.
fn resolve_endpoint(base: &Url, data: &str) -> Result<Url, ConnectionError> {
    let endpoint = base
        .join(data.trim())
        .map_err(|e| ConnectionError::Network {
            reason: format!("Invalid endpoint URL '{}': {}", data, e),
        })?;

    if endpoint.origin() != base.origin() {
        return Err(ConnectionError::EndpointOriginMismatch {
            expected: base.origin().ascii_serialization(),
            actual: endpoint.origin().ascii_serialization(),
        });
    }

    Ok(endpoint)
}

fn network_error(err: reqwest::Error) -> McpError {
    ConnectionError::Network {
        reason: err.to_string(),
    }
    .into()
}
