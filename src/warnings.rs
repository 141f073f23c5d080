//! User-visible warnings and persisted UI flags.
//!
//! Each warning can be suppressed with "don't show again", stored as
//! `warning.<ident>.enabled = "false"` in synced storage. The DevTools
//! propagation toggle lives next to them.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use rustc_hash::FxHashSet;
use serde_json::Value;

use crate::presets::ViewPort;

// ============================================================================
// Constants
// ============================================================================

/// Prefix of every warning key.
pub const WARNING_KEY_PREFIX: &str = "warning.";

/// Key of the DevTools change-propagation toggle.
pub const PROPAGATE_CHANGES_KEY: &str = "devtools.changes.propagate";

/// Width of a warning popup.
pub const WARNING_POPUP_WIDTH: u32 = 550;

/// Window title bar height already included in the base heights.
const TITLE_BAR_ALLOWANCE: i32 = 60;

// ============================================================================
// WarningKind
// ============================================================================

/// Warnings the bridge can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// Debugger detached without the bridge asking.
    DisconnectedDebugger,
    /// Preset narrower than the platform's minimum window width.
    WindowTooSmall,
}

impl WarningKind {
    /// Identifier used in storage keys and the warning page fragment.
    #[must_use]
    pub const fn ident(&self) -> &'static str {
        match self {
            Self::DisconnectedDebugger => "disconnectedDebugger",
            Self::WindowTooSmall => "windowTooSmall",
        }
    }

    /// Popup content height.
    #[must_use]
    pub const fn base_height(&self) -> u32 {
        match self {
            Self::DisconnectedDebugger => 390,
            Self::WindowTooSmall => 230,
        }
    }

    /// Extension page showing this warning.
    #[must_use]
    pub fn page_url(&self) -> String {
        format!("html/warning.html#{}", self.ident())
    }

    /// Popup height, grown by however much the title bar exceeds the allowance.
    #[must_use]
    pub fn popup_height(&self, viewport: &ViewPort) -> u32 {
        let extra = (viewport.margin_height - TITLE_BAR_ALLOWANCE).max(0);
        self.base_height() + extra.unsigned_abs()
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ident())
    }
}

// ============================================================================
// Storage Keys
// ============================================================================

/// Storage key of a warning's enabled flag.
#[must_use]
pub fn enabled_key(ident: &str) -> String {
    format!("{WARNING_KEY_PREFIX}{ident}.enabled")
}

/// Returns `true` if a stored flag suppresses the warning.
#[must_use]
pub fn is_suppressed(stored: Option<&Value>) -> bool {
    matches!(stored, Some(Value::String(flag)) if flag == "false")
        || matches!(stored, Some(Value::Bool(false)))
}

/// Interprets the stored propagation toggle; defaults to enabled.
#[must_use]
pub fn changes_propagated(stored: Option<&Value>) -> bool {
    match stored {
        Some(Value::Bool(enabled)) => *enabled,
        Some(Value::String(flag)) => flag != "false",
        _ => true,
    }
}

// ============================================================================
// WarningGate
// ============================================================================

/// Keeps at most one display of each warning kind in flight.
#[derive(Debug, Default)]
pub struct WarningGate {
    showing: FxHashSet<WarningKind>,
}

impl WarningGate {
    /// Claims `kind`; returns `false` if it is already being shown.
    pub fn try_begin(&mut self, kind: WarningKind) -> bool {
        self.showing.insert(kind)
    }

    /// Releases `kind`.
    pub fn finish(&mut self, kind: WarningKind) {
        self.showing.remove(&kind);
    }

    /// Returns `true` if `kind` is in flight.
    #[inline]
    #[must_use]
    pub fn is_showing(&self, kind: WarningKind) -> bool {
        self.showing.contains(&kind)
    }
}

// ============================================================================
// Tests
// ============================================================================
