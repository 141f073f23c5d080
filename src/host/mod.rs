//! Browser host interfaces.
//!
//! The bridge never touches a browser directly. Everything it needs from
//! the extension runtime goes through these traits, and everything the
//! runtime reports comes back as a [`HostEvent`].
//!
//! # Interfaces
//!
//! | Trait | Browser API |
//! |-------|-------------|
//! | [`TabHost`] | `tabs.*` |
//! | [`WindowHost`] | `windows.*` |
//! | [`DebuggerHost`] | `debugger.*` |
//! | [`StorageHost`] | `storage.sync` |
//!
//! Every method is an independent asynchronous operation: the bridge
//! issues it and keeps handling events until the result comes back.

// ============================================================================
// Submodules
// ============================================================================

/// In-memory storage host.
pub mod memory;

#[cfg(test)]
pub(crate) mod fake;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{TabId, WindowId};

pub use memory::MemoryStorage;

// ============================================================================
// Data Types
// ============================================================================

/// A browser tab as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    /// Tab handle.
    pub id: TabId,
    /// Window containing the tab.
    pub window_id: WindowId,
    /// Current URL, absent while the tab has not loaded anything.
    #[serde(default)]
    pub url: Option<String>,
    /// Whether the tab is the active one in its window.
    #[serde(default)]
    pub active: bool,
}

impl TabInfo {
    /// Returns the URL if it is present and non-empty.
    #[inline]
    #[must_use]
    pub fn loaded_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Window display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    /// Normal, freely sized window.
    Normal,
    /// Minimized.
    Minimized,
    /// Maximized.
    Maximized,
    /// Fullscreen.
    Fullscreen,
}

/// A browser window as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    /// Window handle.
    pub id: WindowId,
    /// Display state.
    pub state: WindowState,
    /// Outer width.
    #[serde(default)]
    pub width: Option<u32>,
    /// Outer height.
    #[serde(default)]
    pub height: Option<u32>,
    /// Tabs in the window.
    #[serde(default)]
    pub tabs: Vec<TabInfo>,
}

/// Window geometry change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowUpdate {
    /// Target state.
    pub state: WindowState,
    /// Outer width.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Outer height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl WindowUpdate {
    /// Maximizes the window.
    #[inline]
    #[must_use]
    pub const fn maximized() -> Self {
        Self {
            state: WindowState::Maximized,
            width: None,
            height: None,
        }
    }

    /// Sets an explicit outer size.
    #[inline]
    #[must_use]
    pub const fn sized(width: u32, height: u32) -> Self {
        Self {
            state: WindowState::Normal,
            width: Some(width),
            height: Some(height),
        }
    }
}

/// A popup window to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopupSpec {
    /// Extension-relative page URL.
    pub url: String,
    /// Outer width.
    pub width: u32,
    /// Outer height.
    pub height: u32,
}

/// Why the host detached the debugger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetachReason {
    /// The tab went away.
    TargetClosed,
    /// The user dismissed the debugging infobar.
    CanceledByUser,
    /// The browser's own developer tools took over.
    ReplacedWithDevtools,
    /// Anything else the host reports.
    Other(String),
}

impl DetachReason {
    /// Parses the host's reason string.
    #[must_use]
    pub fn parse(reason: &str) -> Self {
        match reason {
            "target_closed" => Self::TargetClosed,
            "canceled_by_user" => Self::CanceledByUser,
            "replaced_with_devtools" => Self::ReplacedWithDevtools,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DetachReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetClosed => f.write_str("target_closed"),
            Self::CanceledByUser => f.write_str("canceled_by_user"),
            Self::ReplacedWithDevtools => f.write_str("replaced_with_devtools"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

// ============================================================================
// HostEvent
// ============================================================================

/// Notification from the browser runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Extension installed or updated.
    Installed {
        /// Manifest version.
        version: String,
    },
    /// Tab opened.
    TabCreated {
        /// The tab.
        tab_id: TabId,
    },
    /// Tab loaded or navigated.
    TabUpdated(TabInfo),
    /// Tab closed.
    TabRemoved {
        /// The tab.
        tab_id: TabId,
    },
    /// Tab moved to another window.
    TabAttached {
        /// The tab.
        tab_id: TabId,
        /// Its new window.
        new_window_id: WindowId,
    },
    /// The "select mode" context menu item was clicked.
    SelectionModeToggled,
    /// Window focus changed (`None` when no browser window has focus).
    WindowFocused {
        /// Focused window.
        window_id: Option<WindowId>,
    },
    /// Remote debugging protocol event.
    DebuggerEvent {
        /// Debugged tab.
        tab_id: TabId,
        /// Event name.
        method: String,
        /// Event parameters.
        params: Value,
    },
    /// The host detached the debugger.
    DebuggerDetached {
        /// The tab.
        tab_id: TabId,
        /// Reason reported by the host.
        reason: DetachReason,
    },
}

// ============================================================================
// Traits
// ============================================================================

/// Tab operations.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Looks up a tab; `None` if it no longer exists.
    async fn get(&self, tab_id: TabId) -> Result<Option<TabInfo>>;

    /// Lists every tab in every window.
    async fn query_all(&self) -> Result<Vec<TabInfo>>;

    /// Reloads a tab.
    async fn reload(&self, tab_id: TabId, bypass_cache: bool) -> Result<()>;

    /// Navigates a tab.
    async fn navigate(&self, tab_id: TabId, url: &str) -> Result<()>;

    /// Closes a tab.
    async fn remove(&self, tab_id: TabId) -> Result<()>;

    /// Opens a new tab.
    async fn create(&self, url: &str) -> Result<()>;
}

/// Window operations.
#[async_trait]
pub trait WindowHost: Send + Sync {
    /// Returns the last focused window, with its tabs.
    async fn last_focused(&self) -> Result<WindowInfo>;

    /// Changes window geometry.
    async fn update(&self, window_id: WindowId, update: WindowUpdate) -> Result<()>;

    /// Opens a popup window.
    async fn create_popup(&self, popup: PopupSpec) -> Result<()>;
}

/// Remote debugging interface.
#[async_trait]
pub trait DebuggerHost: Send + Sync {
    /// Attaches to a tab; fails if another client holds it.
    async fn attach(&self, tab_id: TabId, protocol_version: &str) -> Result<()>;

    /// Detaches from a tab.
    async fn detach(&self, tab_id: TabId) -> Result<()>;

    /// Sends a protocol command and returns its result.
    async fn send_command(&self, tab_id: TabId, method: &str, params: Value) -> Result<Value>;
}

/// Synced key-value storage.
#[async_trait]
pub trait StorageHost: Send + Sync {
    /// Reads a key.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Writes a key.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Deletes a key.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Lists every key.
    async fn keys(&self) -> Result<Vec<String>>;
}

// ============================================================================
// Hosts
// ============================================================================

/// The set of host interfaces the bridge runs against.
#[derive(Clone)]
pub struct Hosts {
    /// Tab API.
    pub tabs: Arc<dyn TabHost>,
    /// Window API.
    pub windows: Arc<dyn WindowHost>,
    /// Debugger API.
    pub debugger: Arc<dyn DebuggerHost>,
    /// Storage API.
    pub storage: Arc<dyn StorageHost>,
}

impl fmt::Debug for Hosts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hosts").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_detach_reason_roundtrip() {
        for raw in ["target_closed", "canceled_by_user", "replaced_with_devtools", "gone"] {
            assert_eq!(DetachReason::parse(raw).to_string(), raw);
        }
        assert_eq!(
            DetachReason::parse("replaced_with_devtools"),
            DetachReason::ReplacedWithDevtools
        );
    }

    #[test]
    fn test_loaded_url() {
        let mut tab = TabInfo {
            id: TabId::new(1),
            window_id: WindowId::new(1),
            url: Some(String::new()),
            active: false,
        };
        assert_eq!(tab.loaded_url(), None);
        tab.url = Some("https://x".into());
        assert_eq!(tab.loaded_url(), Some("https://x"));
    }

    #[test]
    fn test_window_info_shape() {
        let window = WindowInfo {
            id: WindowId::new(3),
            state: WindowState::Maximized,
            width: None,
            height: None,
            tabs: vec![TabInfo {
                id: TabId::new(1),
                window_id: WindowId::new(3),
                url: Some("https://x".into()),
                active: true,
            }],
        };
        let value = serde_json::to_value(&window).expect("ser");
        assert_eq!(value["state"], "maximized");
        assert_eq!(value["tabs"][0]["windowId"], 3);
        assert_eq!(value["tabs"][0]["active"], json!(true));
    }

    #[test]
    fn test_window_update_constructors() {
        assert_eq!(WindowUpdate::maximized().state, WindowState::Maximized);
        let sized = WindowUpdate::sized(800, 600);
        assert_eq!((sized.width, sized.height), (Some(800), Some(600)));
        assert_eq!(sized.state, WindowState::Normal);
    }
}
