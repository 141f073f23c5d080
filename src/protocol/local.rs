//! Intra-extension request/response messages.
//!
//! The popup, infobar, options, and warning pages (and the DevTools panel)
//! talk to the background bridge with `type`-tagged requests. Each request
//! gets exactly one [`LocalResponse`]; none of them reaches the IDE unless
//! the request's purpose is to emit an IDE-bound envelope.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::host::WindowInfo;
use crate::identifiers::{TabId, lenient_tab_id};
use crate::presets::{Preset, ViewPort};

// ============================================================================
// LocalRequest
// ============================================================================

/// A request from one of the extension's own surfaces.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum LocalRequest {
    /// Snapshot of bridge state.
    GetState,

    /// Current presets; `copy` forces a fresh mapping.
    GetPresets {
        /// Bypass the cache.
        #[serde(default)]
        copy: bool,
    },

    /// Replace presets (options page).
    SetPresets {
        /// Edited presets.
        presets: Vec<Preset>,
    },

    /// Toggle element selection mode.
    SetSelectionMode {
        /// New state.
        selection_mode: bool,
    },

    /// Maximize the last focused window.
    ResetPageSize,

    /// Resize to the preset at `preset`; `null` resets.
    ResizePage {
        /// Preset index, as a number or a numeric string.
        #[serde(default, deserialize_with = "lenient_preset_index")]
        preset: Option<usize>,
    },

    /// Measure the debugged page's viewport.
    DetectViewPort,

    /// Last focused window with its tabs.
    GetWindowInfo,

    /// Open the options page.
    ShowPresetCustomizer,

    /// Ask the IDE to inspect a page.
    SendInspectMessage {
        /// The tab.
        #[serde(deserialize_with = "lenient_tab_id")]
        tab_id: TabId,
        /// Its URL.
        url: String,
    },

    /// Popup's "debug in IDE" action.
    #[serde(rename = "attach_debugger")]
    AttachDebugger {
        /// The tab.
        #[serde(deserialize_with = "lenient_tab_id")]
        tab_id: TabId,
        /// Its URL.
        #[serde(default)]
        url: Option<String>,
    },

    /// Stop debugging a tab.
    #[serde(rename = "detach_debugger")]
    DetachDebugger {
        /// The tab.
        #[serde(deserialize_with = "lenient_tab_id")]
        tab_id: TabId,
    },

    /// Re-enable every suppressed warning.
    ResetWarnings,

    /// Enable or suppress one warning.
    EnableWarning {
        /// Warning identifier.
        ident: String,
        /// Whether it should be shown again.
        enabled: bool,
    },

    /// DevTools panel committed an edited resource.
    #[serde(rename = "onResourceContentCommitted")]
    ResourceContentCommitted {
        /// Resource URL.
        resource: String,
        /// New content.
        content: String,
    },

    /// DevTools panel asks whether edits are propagated.
    AreChangesPropagated,

    /// DevTools panel toggles edit propagation.
    SetChangesPropagated {
        /// New state.
        enabled: bool,
    },
}

impl LocalRequest {
    /// Decodes a request object.
    ///
    /// The DevTools panel tags its messages with `event` instead of `type`;
    /// both are accepted.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if there is no discriminant
    /// - [`Error::InvalidArgument`] if the request is unknown or malformed
    pub fn from_value(mut value: Value) -> Result<Self> {
        if value.get("type").is_none()
            && let Some(event) = value.get("event").cloned()
            && let Some(object) = value.as_object_mut()
        {
            object.insert("type".to_string(), event);
        }

        if value.get("type").and_then(Value::as_str).is_none() {
            return Err(Error::protocol("local request has no type"));
        }

        serde_json::from_value(value).map_err(|e| Error::invalid_argument(e.to_string()))
    }
}

/// Menus key presets by `for..in`, so the index usually arrives as a string.
fn lenient_preset_index<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|raw| usize::try_from(raw).ok())
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid preset index: {number}"))),
        Some(Value::String(text)) => text
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid preset index: {text:?}"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid preset index: {other}"
        ))),
    }
}

// ============================================================================
// LocalResponse
// ============================================================================

/// Reply to a [`LocalRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LocalResponse {
    /// Answer to `getState`.
    State(StateSnapshot),
    /// Answer to `getPresets`.
    Presets {
        /// Presets, or `null` before the IDE sent any.
        presets: Option<Vec<Preset>>,
    },
    /// Answer to `detectViewPort`.
    ViewPort {
        /// Measured viewport.
        #[serde(rename = "viewPort")]
        view_port: ViewPort,
    },
    /// Answer to `getWindowInfo`.
    Window {
        /// Last focused window.
        window: Option<WindowInfo>,
    },
    /// Answer to `areChangesPropagated`.
    ChangesPropagated {
        /// Whether DevTools edits reach the IDE.
        enabled: bool,
    },
    /// Plain acknowledgement.
    Ack {
        /// Whether the request was carried out.
        ok: bool,
    },
}

impl LocalResponse {
    /// Successful acknowledgement.
    #[inline]
    #[must_use]
    pub const fn ok() -> Self {
        Self::Ack { ok: true }
    }

    /// Failed acknowledgement.
    #[inline]
    #[must_use]
    pub const fn failed() -> Self {
        Self::Ack { ok: false }
    }
}

/// Bridge state as seen by the UI surfaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    /// Element selection mode.
    pub selection_mode: bool,
    /// Selection synchronization with the IDE.
    pub synchronize_selection: bool,
    /// Tab under the debugger.
    pub debugged_tab: Option<TabId>,
    /// Last IDE version reported in an accepted `init`.
    pub ide_version: Option<String>,
    /// Infobar surface enabled.
    #[serde(rename = "INFOBAR")]
    pub infobar: bool,
    /// IDE-owned presets.
    pub resize_options: Option<Vec<Preset>>,
    /// Last measured viewport.
    pub view_port: ViewPort,
}

// ============================================================================
// LocalCall
// ============================================================================

/// Channel end answering a local request.
pub type Responder = oneshot::Sender<LocalResponse>;

/// A local request paired with its reply channel.
#[derive(Debug)]
pub struct LocalCall {
    /// Raw request object.
    pub request: Value,
    /// Where the answer goes.
    pub responder: Responder,
}

impl LocalCall {
    /// Creates a call and the receiver for its answer.
    #[must_use]
    pub fn new(request: Value) -> (Self, oneshot::Receiver<LocalResponse>) {
        let (responder, rx) = oneshot::channel();
        (Self { request, responder }, rx)
    }
}

// ============================================================================
// Tests
// ============================================================================
