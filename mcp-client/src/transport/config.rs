//! Transport configuration for MCP clients.
//!
//! Configurations can be created programmatically or loaded from JSON, YAML or
//! TOML files. The `type` field selects the transport.
//!
//! # Examples
//!
//! ```rust
//! use mcp_client::transport::{SseConfig, StderrMode, StdioConfig, TransportConfig};
//! use std::time::Duration;
//!
//! // Stdio transport configuration
//! let stdio_config = TransportConfig::Stdio(
//!     StdioConfig::new("python")
//!         .arg("server.py")
//!         .env("LOG_LEVEL", "debug")
//!         .stderr(StderrMode::Piped),
//! );
//!
//! // SSE transport configuration
//! let sse_config = TransportConfig::Sse(
//!     SseConfig::new("https://api.example.com/sse".parse().unwrap())
//!         .endpoint_timeout(Duration::from_secs(10)),
//! );
//! # assert_eq!(stdio_config.transport_type(), "stdio");
//! # assert_eq!(sse_config.transport_type(), "sse");
//! ```

use crate::error::{ConfigError, McpResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Transport configuration for every supported transport kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Local child process speaking newline-delimited JSON on stdio
    Stdio(StdioConfig),

    /// Remote server speaking Server-Sent Events plus POST
    Sse(SseConfig),
}

impl TransportConfig {
    /// Create a new stdio transport configuration.
    ///
    /// ```rust
    /// use mcp_client::transport::TransportConfig;
    ///
    /// let config = TransportConfig::stdio("python", &["server.py"]);
    /// ```
    pub fn stdio(command: impl Into<String>, args: &[impl ToString]) -> Self {
        Self::Stdio(StdioConfig::new(command).args(args.iter().map(|s| s.to_string())))
    }

    /// Create a new SSE transport configuration.
    ///
    /// ```rust
    /// use mcp_client::transport::TransportConfig;
    ///
    /// let config = TransportConfig::sse("https://api.example.com/sse").unwrap();
    /// assert!(TransportConfig::sse("not a url").is_err());
    /// ```
    pub fn sse(url: impl AsRef<str>) -> McpResult<Self> {
        let parsed = url.as_ref().parse().map_err(|e| ConfigError::InvalidValue {
            parameter: "url".to_string(),
            value: url.as_ref().to_string(),
            reason: format!("Invalid URL: {}", e),
        })?;

        Ok(Self::Sse(SseConfig::new(parsed)))
    }

    /// Get a human-readable name for this transport type.
    pub fn transport_type(&self) -> &'static str {
        match self {
            Self::Stdio(_) => "stdio",
            Self::Sse(_) => "sse",
        }
    }

    /// Validate the configuration and return any errors.
    pub fn validate(&self) -> McpResult<()> {
        match self {
            Self::Stdio(config) => config.validate(),
            Self::Sse(config) => config.validate(),
        }
    }

    /// Load configuration from a file.
    ///
    /// Supports JSON, YAML, and TOML formats based on file extension. The
    /// loaded configuration is validated before it is returned.
    pub fn from_file(path: impl AsRef<Path>) -> McpResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_e| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let invalid = |reason: String| ConfigError::InvalidFormat {
            path: path.display().to_string(),
            reason,
        };

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| invalid(e.to_string()))?
            }
            Some("toml") => toml::from_str(&content).map_err(|e| invalid(e.to_string()))?,
            _ => {
                return Err(invalid(
                    "Unsupported file format. Use .json, .yaml, or .toml".to_string(),
                )
                .into())
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file, choosing the format by extension.
    pub fn to_file(&self, path: impl AsRef<Path>) -> McpResult<()> {
        let path = path.as_ref();
        let invalid = |reason: String| ConfigError::InvalidFormat {
            path: path.display().to_string(),
            reason,
        };

        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                serde_json::to_string_pretty(self).map_err(|e| invalid(e.to_string()))?
            }
            Some("yaml") | Some("yml") => {
                serde_yaml::to_string(self).map_err(|e| invalid(e.to_string()))?
            }
            Some("toml") => toml::to_string(self).map_err(|e| invalid(e.to_string()))?,
            _ => {
                return Err(invalid(
                    "Unsupported file format. Use .json, .yaml, or .toml".to_string(),
                )
                .into())
            }
        };

        std::fs::write(path, content)?;

        Ok(())
    }
}

/// Where a stdio child's stderr goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StderrMode {
    /// Share the parent's stderr
    #[default]
    Inherit,
    /// Capture stderr and forward each line to the log at warn level
    Piped,
    /// Discard stderr
    Null,
}

/// Configuration for the stdio (child process) transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdioConfig {
    /// Command to execute (e.g., "python", "/usr/bin/node")
    pub command: String,

    /// Arguments to pass to the command
    #[serde(default)]
    pub args: Vec<String>,

    /// Variables set on top of the inherited allow-list
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Working directory for the process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Routing of the child's stderr
    #[serde(default)]
    pub stderr: StderrMode,
}

impl StdioConfig {
    /// Create a new stdio configuration.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            stderr: StderrMode::default(),
        }
    }

    /// Add an argument to the command.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments to the command.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Add an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set stderr routing.
    pub fn stderr(mut self, mode: StderrMode) -> Self {
        self.stderr = mode;
        self
    }

    /// Validate the stdio configuration.
    pub fn validate(&self) -> McpResult<()> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::MissingParameter {
                parameter: "command".to_string(),
            }
            .into());
        }

        if let Some(ref dir) = self.cwd {
            if !dir.is_dir() {
                return Err(ConfigError::InvalidValue {
                    parameter: "cwd".to_string(),
                    value: dir.display().to_string(),
                    reason: "Directory does not exist".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Configuration for the SSE transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseConfig {
    /// URL of the event stream
    pub url: Url,

    /// Additional HTTP headers sent with the stream request and every POST
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Timeout for establishing TCP/TLS connections
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// How long to wait for the `endpoint` event before giving up
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub endpoint_timeout: Option<Duration>,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

impl SseConfig {
    /// Create a new SSE configuration.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            headers: HashMap::new(),
            connect_timeout: default_connect_timeout(),
            endpoint_timeout: None,
        }
    }

    /// Add an HTTP header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bound the wait for the `endpoint` event.
    pub fn endpoint_timeout(mut self, timeout: Duration) -> Self {
        self.endpoint_timeout = Some(timeout);
        self
    }

    /// Validate the SSE configuration.
    pub fn validate(&self) -> McpResult<()> {
        if self.url.scheme() != "http" && self.url.scheme() != "https" {
            return Err(ConfigError::InvalidValue {
                parameter: "url".to_string(),
                value: self.url.to_string(),
                reason: "URL must use http or https scheme".to_string(),
            }
            .into());
        }

        for (key, value) in &self.headers {
            if reqwest::header::HeaderName::from_bytes(key.as_bytes()).is_err() {
                return Err(ConfigError::InvalidValue {
                    parameter: "headers".to_string(),
                    value: key.clone(),
                    reason: "Invalid header name".to_string(),
                }
                .into());
            }
            if reqwest::header::HeaderValue::from_str(value).is_err() {
                return Err(ConfigError::InvalidValue {
                    parameter: format!("headers.{}", key),
                    value: value.clone(),
                    reason: "Invalid header value".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}
