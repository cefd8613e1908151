//! MCP transport layer abstraction and implementations.
//!
//! A transport owns exactly one physical connection and moves opaque
//! JSON-RPC messages across it:
//!
//! - **stdio**: spawns a child process and speaks newline-delimited JSON over
//!   its stdin/stdout
//! - **SSE**: listens on an HTTP Server-Sent-Events stream and POSTs outbound
//!   messages to the endpoint the server announces
//!
//! Inbound traffic is delivered through a single event channel handed to
//! [`Transport::start`]. Each event is a parsed message, an out-of-band error
//! (one bad line, a failed POST), or the final `Closed` signal, which a
//! transport emits at most once.
//!
//! # Examples
//!
//! ```rust,no_run
//! use mcp_client::transport::{TransportConfig, TransportEvent, TransportFactory};
//! use mcp_client::messages::{JsonRpcMessage, JsonRpcRequest};
//! use serde_json::json;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TransportConfig::stdio("python", &["server.py"]);
//!     let transport = TransportFactory::create(config)?;
//!
//!     let (events, mut inbound) = mpsc::unbounded_channel();
//!     transport.start(events).await?;
//!
//!     let request = JsonRpcRequest::new(0, "ping", json!({}));
//!     transport.send(&JsonRpcMessage::Request(request)).await?;
//!
//!     if let Some(TransportEvent::Message(message)) = inbound.recv().await {
//!         println!("Received: {:?}", message);
//!     }
//!
//!     transport.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod env;
pub mod factory;
pub mod read_buffer;

#[cfg(feature = "stdio")]
pub mod stdio;

#[cfg(feature = "sse")]
pub mod sse;

pub use config::*;
pub use factory::*;
pub use read_buffer::ReadBuffer;

#[cfg(feature = "stdio")]
pub use stdio::StdioTransport;

#[cfg(feature = "sse")]
pub use sse::SseTransport;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{McpError, McpResult};
use crate::messages::JsonRpcMessage;

/// Something that happened on a transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// A validated inbound message
    Message(JsonRpcMessage),
    /// A failure not tied to a specific outstanding request
    Error(McpError),
    /// The connection is gone; no further events follow
    Closed,
}

/// Sending half of a transport's event channel.
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Receiving half of a transport's event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Core transport trait for MCP communication.
///
/// All methods take `&self` so that overlapping requests can share one
/// transport; implementations keep their mutable state behind locks.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the physical connection and begin delivering events.
    ///
    /// A second call fails with [`ConnectionError::AlreadyStarted`](crate::error::ConnectionError::AlreadyStarted)
    /// rather than reconnecting.
    async fn start(&self, events: EventSender) -> McpResult<()>;

    /// Transmit one message.
    ///
    /// Messages go out in the order `send` is called. The future may stay
    /// pending until the underlying channel accepts the bytes.
    async fn send(&self, message: &JsonRpcMessage) -> McpResult<()>;

    /// Tear the connection down.
    ///
    /// Safe to call repeatedly. The `Closed` event is emitted exactly once,
    /// however many times this is called.
    async fn close(&self);

    /// Short name of the transport kind, used in logs and errors.
    fn transport_type(&self) -> &'static str;
}

/// Shared handle through which a transport's background tasks emit events.
///
/// Once `closed` has fired the sender is dropped, so later messages and
/// errors are discarded and `Closed` cannot be delivered twice.
#[derive(Clone, Default)]
pub(crate) struct EventSink {
    sender: Arc<Mutex<Option<EventSender>>>,
}

impl EventSink {
    pub(crate) fn attach(&self, events: EventSender) {
        *self.slot() = Some(events);
    }

    pub(crate) fn message(&self, message: JsonRpcMessage) {
        self.emit(TransportEvent::Message(message));
    }

    pub(crate) fn error(&self, error: impl Into<McpError>) {
        self.emit(TransportEvent::Error(error.into()));
    }

    /// Emit `Closed` if it has not been emitted yet.
    pub(crate) fn closed(&self) {
        if let Some(sender) = self.slot().take() {
            let _ = sender.send(TransportEvent::Closed);
        }
    }

    fn emit(&self, event: TransportEvent) {
        if let Some(sender) = self.slot().as_ref() {
            if sender.send(event).is_err() {
                tracing::debug!("Transport event receiver dropped");
            }
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<EventSender>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionError;

    #[test]
    fn test_event_sink_closes_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::default();
        sink.attach(tx);

        sink.error(ConnectionError::StreamClosed);
        sink.closed();
        sink.closed();
        sink.error(ConnectionError::StreamClosed);

        assert!(matches!(rx.try_recv(), Ok(TransportEvent::Error(_))));
        assert!(matches!(rx.try_recv(), Ok(TransportEvent::Closed)));
        // The sender was dropped after the first close.
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Disconnected)
        ));
    }

    #[test]
    fn test_unattached_sink_is_silent() {
        let sink = EventSink::default();
        sink.error(ConnectionError::Closed);
        sink.closed();
    }
}
