//! Messages sent by the extension to the IDE.
//!
//! | `message` | Fields |
//! |-----------|--------|
//! | `ready` | `version` |
//! | `init` | `tabId`, `url`, `version` |
//! | `close` | `tabId` |
//! | `urlchange` | `tabId`, `url` |
//! | `load_resize_options` | |
//! | `save_resize_options` | `resizeOptions` |
//! | `selection_mode` | `selectionMode` |
//! | `inspect` | `tabId`, `url` |
//! | `resource_changed` | `resource`, `content` |
//! | `debugger_command_response` | `tabId`, `response` |
//! | `debugger_attached` | `tabId` |
//! | `debugger_detached` | `tabId` |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::TabId;

// ============================================================================
// ExtensionMessage
// ============================================================================

/// An envelope sent to the IDE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ExtensionMessage {
    /// Extension installed or updated.
    Ready {
        /// Manifest version.
        version: String,
    },

    /// Asks whether the IDE wants to manage a tab.
    Init {
        /// The tab.
        tab_id: TabId,
        /// Its current URL.
        url: String,
        /// Extension version.
        version: String,
    },

    /// A managed tab was closed.
    Close {
        /// The tab.
        tab_id: TabId,
    },

    /// A managed tab navigated.
    Urlchange {
        /// The tab.
        tab_id: TabId,
        /// New URL.
        url: String,
    },

    /// Requests the IDE-owned presets.
    LoadResizeOptions,

    /// Pushes edited presets to the IDE.
    SaveResizeOptions {
        /// Presets payload.
        resize_options: Value,
    },

    /// Element selection mode toggled in the browser.
    SelectionMode {
        /// New state.
        selection_mode: bool,
    },

    /// User asked to inspect a page in the IDE.
    Inspect {
        /// The tab.
        tab_id: TabId,
        /// Its URL.
        url: String,
    },

    /// A resource was edited in the browser's developer tools.
    ResourceChanged {
        /// Resource URL.
        resource: String,
        /// New content.
        content: String,
    },

    /// Debugger command result or unsolicited protocol event.
    DebuggerCommandResponse {
        /// Debugged tab.
        tab_id: TabId,
        /// Result, error, or event.
        response: DebuggerResponse,
    },

    /// Debugger attached and the `Debugger` domain is enabled.
    DebuggerAttached {
        /// The tab.
        tab_id: TabId,
    },

    /// Debugger detached by the browser.
    DebuggerDetached {
        /// The tab.
        tab_id: TabId,
    },
}

impl ExtensionMessage {
    /// Returns the wire discriminant.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::Init { .. } => "init",
            Self::Close { .. } => "close",
            Self::Urlchange { .. } => "urlchange",
            Self::LoadResizeOptions => "load_resize_options",
            Self::SaveResizeOptions { .. } => "save_resize_options",
            Self::SelectionMode { .. } => "selection_mode",
            Self::Inspect { .. } => "inspect",
            Self::ResourceChanged { .. } => "resource_changed",
            Self::DebuggerCommandResponse { .. } => "debugger_command_response",
            Self::DebuggerAttached { .. } => "debugger_attached",
            Self::DebuggerDetached { .. } => "debugger_detached",
        }
    }
}

// ============================================================================
// DebuggerResponse
// ============================================================================

/// Payload of `debugger_command_response`.
///
/// Responses carry the IDE's command id; events carry none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DebuggerResponse {
    /// Command succeeded.
    Result {
        /// Command id from the IDE.
        id: Value,
        /// Protocol result.
        result: Value,
    },
    /// Command failed.
    Error {
        /// Command id from the IDE.
        id: Value,
        /// Serialized host error.
        error: String,
    },
    /// Unsolicited protocol event.
    Event {
        /// Event name.
        method: String,
        /// Event parameters.
        params: Value,
    },
}

// ============================================================================
// Tests
// ============================================================================
