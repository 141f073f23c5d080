//! Messages sent by the IDE to the extension.
//!
//! Every envelope is a JSON object with a `message` discriminant.
//!
//! | `message` | Fields |
//! |-----------|--------|
//! | `init` | `tabId`, `status`, `version` |
//! | `reload` | `tabId`, `url?` |
//! | `close` | `tabId` |
//! | `attach_debugger` | `tabId` |
//! | `detach_debugger` | `tabId` |
//! | `debugger_command` | `tabId`, `command: {id, method, params}` |
//! | `load_resize_options` | `resizeOptions` |
//! | `save_resize_options` | `resizeOptions` |
//! | `pageInspectionPropertyChange` | `propertyName`, `propertyValue` |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::{TabId, lenient_tab_id};

// ============================================================================
// Constants
// ============================================================================

/// Discriminants the router understands.
pub const KNOWN_TAGS: [&str; 9] = [
    "init",
    "reload",
    "close",
    "attach_debugger",
    "detach_debugger",
    "debugger_command",
    "load_resize_options",
    "save_resize_options",
    "pageInspectionPropertyChange",
];

/// `status` value meaning the IDE wants to manage the tab.
pub const STATUS_ACCEPTED: &str = "accepted";

// ============================================================================
// IdeMessage
// ============================================================================

/// An envelope received from the IDE.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "message", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum IdeMessage {
    /// Answer to an `init` question about a tab.
    Init {
        /// Tab the answer is about.
        #[serde(deserialize_with = "lenient_tab_id")]
        tab_id: TabId,
        /// `"accepted"` or anything else.
        #[serde(default)]
        status: Option<String>,
        /// IDE version.
        #[serde(default)]
        version: Option<String>,
    },

    /// Reload a tab, or navigate it to `url`.
    Reload {
        /// Target tab.
        #[serde(deserialize_with = "lenient_tab_id")]
        tab_id: TabId,
        /// Optional new location.
        #[serde(default)]
        url: Option<String>,
    },

    /// Close a tab.
    Close {
        /// Target tab.
        #[serde(deserialize_with = "lenient_tab_id")]
        tab_id: TabId,
    },

    /// Attach the remote debugger to a tab.
    AttachDebugger {
        /// Target tab.
        #[serde(deserialize_with = "lenient_tab_id")]
        tab_id: TabId,
    },

    /// Detach the remote debugger from a tab.
    DetachDebugger {
        /// Target tab.
        #[serde(deserialize_with = "lenient_tab_id")]
        tab_id: TabId,
    },

    /// Forward a remote debugging protocol command.
    DebuggerCommand {
        /// Target tab.
        #[serde(deserialize_with = "lenient_tab_id")]
        tab_id: TabId,
        /// The protocol command.
        command: DebuggerCommand,
    },

    /// IDE-owned window presets.
    LoadResizeOptions {
        /// JSON-encoded list (or plain list) of presets.
        resize_options: Value,
    },

    /// Presets the IDE wants echoed back.
    SaveResizeOptions {
        /// Opaque presets payload.
        resize_options: Value,
    },

    /// Page inspection property changed on the IDE side.
    #[serde(rename = "pageInspectionPropertyChange")]
    PageInspectionPropertyChange {
        /// Property name (`selectionMode`, `synchronizeSelection`, ...).
        property_name: String,
        /// New value.
        #[serde(default)]
        property_value: Value,
    },
}

/// Remote debugging protocol command, relayed verbatim.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DebuggerCommand {
    /// IDE correlation id, echoed back in the response.
    pub id: Value,
    /// Protocol method, e.g. `Page.navigate`.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

impl IdeMessage {
    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the frame is not JSON
    /// - see [`IdeMessage::from_value`]
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decodes a parsed envelope.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if there is no `message` discriminant
    /// - [`Error::UnknownMessage`] if the discriminant is not recognized
    /// - [`Error::InvalidArgument`] if a field is missing or malformed
    pub fn from_value(value: Value) -> Result<Self> {
        let tag = value
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::protocol("envelope has no message discriminant"))?;

        if !KNOWN_TAGS.contains(&tag) {
            return Err(Error::unknown_message(tag));
        }

        serde_json::from_value(value).map_err(|e| Error::invalid_argument(e.to_string()))
    }

    /// Returns the wire discriminant.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Reload { .. } => "reload",
            Self::Close { .. } => "close",
            Self::AttachDebugger { .. } => "attach_debugger",
            Self::DetachDebugger { .. } => "detach_debugger",
            Self::DebuggerCommand { .. } => "debugger_command",
            Self::LoadResizeOptions { .. } => "load_resize_options",
            Self::SaveResizeOptions { .. } => "save_resize_options",
            Self::PageInspectionPropertyChange { .. } => "pageInspectionPropertyChange",
        }
    }

    /// Returns the targeted tab, if the message has one.
    #[must_use]
    pub const fn tab_id(&self) -> Option<TabId> {
        match self {
            Self::Init { tab_id, .. }
            | Self::Reload { tab_id, .. }
            | Self::Close { tab_id }
            | Self::AttachDebugger { tab_id }
            | Self::DetachDebugger { tab_id }
            | Self::DebuggerCommand { tab_id, .. } => Some(*tab_id),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
