//! Error types for the IDE browser bridge.
//!
//! Nothing in the bridge is fatal: handlers log these errors and keep
//! going. They still flow through [`Result`] so host adapters, the
//! transport, and the decoders can report what went wrong.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::UnknownMessage`], [`Error::InvalidArgument`], [`Error::Protocol`] |
//! | Registry | [`Error::NotManaged`] |
//! | Host | [`Error::Host`], [`Error::Debugger`], [`Error::Storage`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::TabId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when [`BridgeConfig`](crate::BridgeConfig) is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// WebSocket connection closed while sending.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Envelope carried a discriminant the bridge does not know.
    #[error("Unsupported message: {tag}")]
    UnknownMessage {
        /// The unrecognized discriminant.
        tag: String,
    },

    /// Envelope field is missing or has the wrong type.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid field.
        message: String,
    },

    /// Envelope is not a well-formed message.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Registry Errors
    // ========================================================================
    /// Command targeted a tab the IDE never confirmed.
    #[error("Tab {tab_id} is not managed")]
    NotManaged {
        /// The targeted tab.
        tab_id: TabId,
    },

    // ========================================================================
    // Host Errors
    // ========================================================================
    /// Browser tab/window API failure.
    #[error("Host error ({operation}): {message}")]
    Host {
        /// Host operation that failed.
        operation: &'static str,
        /// Message reported by the host.
        message: String,
    },

    /// Remote-debugging interface failure.
    #[error("Debugger error: {message}")]
    Debugger {
        /// Message reported by the debugging interface.
        message: String,
    },

    /// Synced storage failure.
    #[error("Storage error (\"{operation}\" operation for \"{key}\"): {message}")]
    Storage {
        /// Storage operation that failed.
        operation: &'static str,
        /// Key involved.
        key: String,
        /// Message reported by the store.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// URL parse error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates an unknown message error.
    #[inline]
    pub fn unknown_message(tag: impl Into<String>) -> Self {
        Self::UnknownMessage { tag: tag.into() }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a not managed error.
    #[inline]
    pub fn not_managed(tab_id: TabId) -> Self {
        Self::NotManaged { tab_id }
    }

    /// Creates a host error.
    #[inline]
    pub fn host(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Host {
            operation,
            message: message.into(),
        }
    }

    /// Creates a debugger error.
    #[inline]
    pub fn debugger(message: impl Into<String>) -> Self {
        Self::Debugger {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(
        operation: &'static str,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Storage {
            operation,
            key: key.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if the inbound envelope itself was at fault.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownMessage { .. }
                | Self::InvalidArgument { .. }
                | Self::Protocol { .. }
                | Self::Json(_)
        )
    }

    /// Returns `true` if a browser API reported the failure.
    #[inline]
    #[must_use]
    pub fn is_host_error(&self) -> bool {
        matches!(
            self,
            Self::Host { .. } | Self::Debugger { .. } | Self::Storage { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
