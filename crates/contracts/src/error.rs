//! Layered error definitions
//!
//! Categorized by source: config / sensor api / context store / general

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum SyncError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Authentication =====
    /// Bad credentials or failed token exchange (sensor API or Keystone)
    #[error("authentication against {service} failed: {message}")]
    Authentication { service: String, message: String },

    // ===== Sensor API Errors =====
    /// Non-2xx from a sensor API read endpoint
    #[error("endpoint '{path}' returned {status}: {body}")]
    Endpoint {
        path: String,
        status: u16,
        body: String,
    },

    /// Event fetch failure, recovered locally by the client
    #[error("event fetch for spot '{pomid}' failed: {message}")]
    TransientFetch { pomid: String, message: String },

    // ===== Context Store Errors =====
    /// Store read/write failure after the retry budget is exhausted
    #[error("network fault on {url}: status {status}, body: {body}")]
    NetworkFault {
        url: String,
        status: u16,
        body: String,
    },

    // ===== Transport / Payload =====
    /// HTTP transport failure (connect, timeout, TLS)
    #[error("transport error on {url}: {message}")]
    Transport { url: String, message: String },

    /// Malformed payload
    #[error("failed to decode {context}: {message}")]
    Decode { context: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl SyncError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create authentication error
    pub fn authentication(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Authentication {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create sensor API endpoint error
    pub fn endpoint(path: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Endpoint {
            path: path.into(),
            status,
            body: body.into(),
        }
    }

    /// Create context store network fault
    pub fn network_fault(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::NetworkFault {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Create transport error
    pub fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create decode error
    pub fn decode(context: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error must abort the run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::TransientFetch { .. })
    }
}
