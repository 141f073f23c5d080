//! Wire and intra-extension message types.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Discriminant |
//! |--------------|-----------|--------------|
//! | [`IdeMessage`] | IDE → Extension | `message` |
//! | [`ExtensionMessage`] | Extension → IDE | `message` |
//! | [`LocalRequest`] | UI surface → Bridge | `type` |
//! | [`LocalResponse`] | Bridge → UI surface | none |
//!
//! IDE traffic is one JSON object per WebSocket text frame.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `inbound` | IDE-originated envelopes |
//! | `outbound` | IDE-bound envelopes |
//! | `local` | UI surface requests and responses |

// ============================================================================
// Submodules
// ============================================================================

/// IDE-originated envelopes.
pub mod inbound;

/// Intra-extension requests and responses.
pub mod local;

/// IDE-bound envelopes.
pub mod outbound;

// ============================================================================
// Re-exports
// ============================================================================

pub use inbound::{DebuggerCommand, IdeMessage, STATUS_ACCEPTED};
pub use local::{LocalCall, LocalRequest, LocalResponse, Responder, StateSnapshot};
pub use outbound::{DebuggerResponse, ExtensionMessage};
