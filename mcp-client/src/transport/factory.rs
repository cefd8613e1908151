//! Transport factory for creating transport instances.

use std::sync::Arc;

use super::{Transport, TransportConfig};
use crate::error::McpResult;

#[cfg(feature = "stdio")]
use super::stdio::StdioTransport;

#[cfg(feature = "sse")]
use super::sse::SseTransport;

/// Factory for creating transport instances.
///
/// ```rust
/// use mcp_client::transport::{TransportConfig, TransportFactory};
///
/// let config = TransportConfig::stdio("python", &["server.py"]);
/// let transport = TransportFactory::create(config).unwrap();
/// assert_eq!(transport.transport_type(), "stdio");
/// ```
pub struct TransportFactory;

impl TransportFactory {
    /// Create a transport instance from configuration.
    ///
    /// The configuration is validated first. Nothing is spawned or connected
    /// until [`Transport::start`] is called.
    ///
    /// # Errors
    ///
    /// * `ConfigError` - If the configuration is invalid or the requested
    ///   transport was not compiled in
    pub fn create(config: TransportConfig) -> McpResult<Arc<dyn Transport>> {
        config.validate()?;

        match config {
            #[cfg(feature = "stdio")]
            TransportConfig::Stdio(stdio) => Ok(Arc::new(StdioTransport::new(stdio))),

            #[cfg(not(feature = "stdio"))]
            TransportConfig::Stdio(_) => Err(crate::error::ConfigError::InvalidValue {
                parameter: "type".to_string(),
                value: "stdio".to_string(),
                reason: "stdio transport support not compiled in (enable 'stdio' feature)"
                    .to_string(),
            }
            .into()),

            #[cfg(feature = "sse")]
            TransportConfig::Sse(sse) => Ok(Arc::new(SseTransport::new(sse)?)),

            #[cfg(not(feature = "sse"))]
            TransportConfig::Sse(_) => Err(crate::error::ConfigError::InvalidValue {
                parameter: "type".to_string(),
                value: "sse".to_string(),
                reason: "sse transport support not compiled in (enable 'sse' feature)"
                    .to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_validates_first() {
        let config = TransportConfig::stdio("", &[] as &[String]);
        assert!(TransportFactory::create(config).is_err());
    }

    #[cfg(feature = "sse")]
    #[test]
    fn test_factory_creates_sse() {
        let config = TransportConfig::sse("http://localhost:8080/sse").unwrap();
        let transport = TransportFactory::create(config).unwrap();
        assert_eq!(transport.transport_type(), "sse");
    }
}
