//! IDE Browser Bridge - background core of an IDE/browser extension.
//!
//! This library keeps browser tabs and an IDE in sync over a local
//! WebSocket: the IDE learns which tabs it manages, reloads and closes
//! them, drives the browser's remote debugger, and resizes windows to
//! responsive-design presets.
//!
//! # Architecture
//!
//! ```text
//! browser runtime ──HostEvent──►┌──────────┐◄──LocalCall── extension pages
//!                               │  Bridge  │
//! host traits ◄──spawned calls──└────┬─────┘
//!                                    │ Transport (ws://127.0.0.1:62242/)
//!                                    ▼
//!                                   IDE
//! ```
//!
//! Key design principles:
//!
//! - One task owns all state; host calls complete back into it
//! - The browser is reached only through the [`host`] traits
//! - Envelopes are closed enums; unknown tags are logged and dropped
//! - Nothing is fatal: failures are logged and the bridge keeps going
//!
//! # Quick Start
//!
//! ```no_run
//! use ide_browser_bridge::{Bridge, BridgeConfig, HostEvent, Hosts, LocalCall, Result};
//! use tokio::sync::mpsc;
//!
//! async fn serve(hosts: Hosts) -> Result<()> {
//!     let bridge = Bridge::new(BridgeConfig::new(), hosts)?;
//!
//!     let (host_tx, host_rx) = mpsc::unbounded_channel::<HostEvent>();
//!     let (local_tx, local_rx) = mpsc::unbounded_channel::<LocalCall>();
//!
//!     // Browser notifications go to `host_tx`, page requests to `local_tx`
//!     # drop((host_tx, local_tx));
//!     bridge.run(host_rx, local_rx).await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | Event loop, routing, debugger session |
//! | [`config`] | [`BridgeConfig`] and defaults |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`host`] | Browser runtime interfaces |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`presets`] | Window presets and viewport |
//! | [`protocol`] | IDE and extension message types |
//! | [`registry`] | Tab management state machine |
//! | [`transport`] | WebSocket transport layer |
//! | [`warnings`] | User-visible warnings and flags |

// ============================================================================
// Modules
// ============================================================================

/// Bridge event loop.
///
/// [`Bridge`] is the single owner of all mutable state.
pub mod bridge;

/// Bridge configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Browser runtime interfaces.
///
/// Implement these traits to run the bridge against a real browser.
pub mod host;

/// Type-safe identifiers for browser entities.
pub mod identifiers;

/// Window presets and viewport measurement.
pub mod presets;

/// Message types.
///
/// IDE wire envelopes and intra-extension requests.
pub mod protocol;

/// Tab management lifecycle.
pub mod registry;

/// WebSocket transport layer.
///
/// Lazy connection to the IDE with an outbound queue.
pub mod transport;

/// Warning popups and persisted UI flags.
pub mod warnings;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{Bridge, DebuggerSession, PropertyChange};

// Configuration
pub use config::BridgeConfig;

// Error types
pub use error::{Error, Result};

// Host interfaces
pub use host::{
    DebuggerHost, DetachReason, HostEvent, Hosts, MemoryStorage, StorageHost, TabHost, TabInfo,
    WindowHost, WindowInfo,
};

// Identifier types
pub use identifiers::{TabId, WindowId};

// Protocol types
pub use protocol::{ExtensionMessage, IdeMessage, LocalCall, LocalRequest, LocalResponse};

// Registry types
pub use registry::{TabRegistry, TabStatus};
