//! WebSocket transport layer.
//!
//! This module handles communication between the bridge (extension
//! background) and the IDE, which listens on a fixed local port.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Bridge         │                              │  IDE            │
//! │                 │         WebSocket            │                 │
//! │  Transport      │─────────────────────────────►│  WebSocket      │
//! │  → Connector    │     127.0.0.1:62242          │  Server         │
//! │                 │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. First `Transport::send` starts a connection attempt and queues
//! 2. `TransportEvent::Opened` flushes the queue
//! 3. Inbound frames come back as `TransportEvent::Message`
//! 4. `TransportEvent::Closed` drops the socket, keeps the queue, and puts
//!    frames the socket never wrote back at its front
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | Lazy connection and outbound queue |
//! | `connection` | Socket loop and connector |

// ============================================================================
// Submodules
// ============================================================================

/// Lazy connection and outbound queue.
pub mod client;

/// WebSocket socket loop.
pub mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::Transport;
pub use connection::{Connector, TransportEvent, WsConnector};
