//! Bridge configuration.
//!
//! Provides a type-safe interface for the few knobs the bridge has: where
//! the IDE listens, which version the extension reports, and timing.
//!
//! # Example
//!
//! ```ignore
//! use ide_browser_bridge::BridgeConfig;
//!
//! let config = BridgeConfig::new()
//!     .with_server_url("ws://127.0.0.1:62242/")
//!     .with_version("1.0")
//!     .with_debug(true);
//!
//! config.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Endpoint the IDE listens on.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:62242/";

/// Version the extension reports in `init` messages.
pub const DEFAULT_VERSION: &str = "1.0";

/// Remote debugging protocol version requested on attach.
pub const DEFAULT_DEBUGGER_PROTOCOL_VERSION: &str = "1.0";

/// Delay before deciding whether a debugger detach was a real one.
pub const DEFAULT_WARNING_RECHECK_DELAY: Duration = Duration::from_millis(100);

// ============================================================================
// BridgeConfig
// ============================================================================

/// Bridge configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// WebSocket URL of the IDE endpoint.
    pub server_url: String,

    /// Extension version reported in `init` messages.
    pub version: String,

    /// Logs every envelope sent and received.
    pub debug: bool,

    /// Whether the infobar surface is enabled (reported by `getState`).
    pub infobar: bool,

    /// Remote debugging protocol version requested on attach.
    pub debugger_protocol_version: String,

    /// Delay before re-checking a tab after an unexpected detach.
    pub warning_recheck_delay: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl BridgeConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            version: DEFAULT_VERSION.to_string(),
            debug: true,
            infobar: false,
            debugger_protocol_version: DEFAULT_DEBUGGER_PROTOCOL_VERSION.to_string(),
            warning_recheck_delay: DEFAULT_WARNING_RECHECK_DELAY,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl BridgeConfig {
    /// Sets the IDE WebSocket URL.
    #[inline]
    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    /// Sets the IDE port, keeping the loopback host.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.server_url = format!("ws://127.0.0.1:{port}/");
        self
    }

    /// Sets the reported extension version.
    #[inline]
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Enables or disables envelope logging.
    #[inline]
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Enables or disables the infobar surface.
    #[inline]
    #[must_use]
    pub fn with_infobar(mut self, infobar: bool) -> Self {
        self.infobar = infobar;
        self
    }

    /// Sets the remote debugging protocol version.
    #[inline]
    #[must_use]
    pub fn with_debugger_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.debugger_protocol_version = version.into();
        self
    }

    /// Sets the unexpected-detach recheck delay.
    #[inline]
    #[must_use]
    pub fn with_warning_recheck_delay(mut self, delay: Duration) -> Self {
        self.warning_recheck_delay = delay;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl BridgeConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the server URL does not parse
    /// - [`Error::Config`] if it is not a `ws`/`wss` URL or the version is empty
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.server_url)?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "server URL must use ws or wss, got: {}",
                url.scheme()
            )));
        }

        if url.host_str().is_none() {
            return Err(Error::config("server URL has no host"));
        }

        if self.version.trim().is_empty() {
            return Err(Error::config("extension version must not be empty"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
