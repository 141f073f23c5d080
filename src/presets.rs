//! Window presets and viewport geometry.
//!
//! Presets (a.k.a. resize options) are owned by the IDE: it pushes them
//! with `load_resize_options` and receives edits back through
//! `save_resize_options`. The bridge only maps and caches them.
//!
//! # Example
//!
//! ```ignore
//! let mut presets = Presets::default();
//! presets.load(Presets::parse_resize_options(&json!(
//!     r#"[{"type":"DESKTOP","displayName":"Desktop","width":1280,"height":1024}]"#
//! ))?);
//! assert_eq!(presets.preset(0).map(|p| p.width), Some(1280));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{Error, Result};

// ============================================================================
// PresetType
// ============================================================================

/// Device class of a preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PresetType {
    /// Desktop monitor.
    #[default]
    Desktop,
    /// Small laptop.
    Netbook,
    /// Wide monitor.
    Widescreen,
    /// Tablet held horizontally.
    TabletLandscape,
    /// Tablet held vertically.
    TabletPortrait,
    /// Phone held horizontally.
    SmartphoneLandscape,
    /// Phone held vertically.
    SmartphonePortrait,
}

impl PresetType {
    /// Every preset type in display order.
    pub const ALL: [Self; 7] = [
        Self::Desktop,
        Self::Netbook,
        Self::Widescreen,
        Self::TabletLandscape,
        Self::TabletPortrait,
        Self::SmartphoneLandscape,
        Self::SmartphonePortrait,
    ];

    /// Returns the wire identifier.
    #[must_use]
    pub const fn ident(&self) -> &'static str {
        match self {
            Self::Desktop => "DESKTOP",
            Self::Netbook => "NETBOOK",
            Self::Widescreen => "WIDESCREEN",
            Self::TabletLandscape => "TABLET_LANDSCAPE",
            Self::TabletPortrait => "TABLET_PORTRAIT",
            Self::SmartphoneLandscape => "SMARTPHONE_LANDSCAPE",
            Self::SmartphonePortrait => "SMARTPHONE_PORTRAIT",
        }
    }

    /// Resolves a wire identifier, falling back to [`PresetType::Desktop`].
    #[must_use]
    pub fn from_ident(ident: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|kind| kind.ident() == ident)
            .unwrap_or_else(|| {
                error!(ident, "Type not found for ident");
                Self::Desktop
            })
    }
}

impl fmt::Display for PresetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ident())
    }
}

impl Serialize for PresetType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.ident())
    }
}

impl<'de> Deserialize<'de> for PresetType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let ident = String::deserialize(deserializer)?;
        Ok(Self::from_ident(&ident))
    }
}

// ============================================================================
// Preset
// ============================================================================

/// A named window width/height pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    /// Device class.
    #[serde(rename = "type", default)]
    pub preset_type: PresetType,
    /// Label shown in the menus.
    #[serde(default)]
    pub display_name: String,
    /// Page width in CSS pixels.
    #[serde(deserialize_with = "lenient_dimension")]
    pub width: u32,
    /// Page height in CSS pixels.
    #[serde(deserialize_with = "lenient_dimension")]
    pub height: u32,
    /// Listed in the toolbar menu.
    #[serde(default)]
    pub show_in_toolbar: bool,
    /// Selected by default.
    #[serde(default)]
    pub is_default: bool,
}

/// Dimensions come over the wire as numbers or numeric strings.
fn lenient_dimension<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|raw| u32::try_from(raw).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid dimension: {number}"))),
        Value::String(text) => text
            .trim()
            .parse::<u32>()
            .map_err(|_| serde::de::Error::custom(format!("invalid dimension: {text:?}"))),
        other => Err(serde::de::Error::custom(format!(
            "invalid dimension: {other}"
        ))),
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Preset manager.
///
/// `resize_options` is what the IDE last sent; `cached` is the mapping
/// handed to UI surfaces, rebuilt lazily.
#[derive(Debug, Clone, Default)]
pub struct Presets {
    resize_options: Option<Vec<Preset>>,
    cached: Option<Vec<Preset>>,
    selected: Option<Preset>,
}

impl Presets {
    /// Parses the `resizeOptions` field of a `load_resize_options` message.
    ///
    /// The IDE sends the list JSON-encoded inside a string; a plain array is
    /// accepted as well.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] when the payload is not a list of presets.
    pub fn parse_resize_options(value: &Value) -> Result<Vec<Preset>> {
        match value {
            Value::String(text) => Ok(serde_json::from_str(text)?),
            Value::Array(_) => Ok(serde_json::from_value(value.clone())?),
            other => Err(Error::invalid_argument(format!(
                "resizeOptions must be a list, got: {other}"
            ))),
        }
    }

    /// Returns `true` once the IDE has delivered presets.
    #[inline]
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.resize_options.is_some()
    }

    /// Replaces the IDE-owned options.
    pub fn load(&mut self, options: Vec<Preset>) {
        debug!(count = options.len(), "Resize options loaded");
        self.resize_options = Some(options);
        self.cached = None;
    }

    /// Returns the raw IDE-owned options.
    #[inline]
    #[must_use]
    pub fn resize_options(&self) -> Option<&[Preset]> {
        self.resize_options.as_deref()
    }

    /// Returns the presets, either cached or freshly mapped when `copy`.
    pub fn presets(&mut self, copy: bool) -> Option<Vec<Preset>> {
        if copy {
            return self.map_options();
        }
        if self.cached.is_none() {
            self.cached = self.map_options();
        }
        self.cached.clone()
    }

    /// Stores user-edited presets; the caller forwards them to the IDE.
    pub fn set(&mut self, presets: Vec<Preset>) {
        self.resize_options = Some(presets.clone());
        self.cached = Some(presets);
        debug!("Presets changed");
    }

    /// Selects and returns the preset at `index`.
    pub fn preset(&mut self, index: usize) -> Option<Preset> {
        let preset = self.presets(false)?.get(index).cloned()?;
        self.selected = Some(preset.clone());
        Some(preset)
    }

    /// Returns the last selected preset.
    #[inline]
    #[must_use]
    pub fn selected(&self) -> Option<&Preset> {
        self.selected.as_ref()
    }

    fn map_options(&self) -> Option<Vec<Preset>> {
        let options = self.resize_options.as_ref()?;
        debug!("Mapping window presets from IDE");
        Some(options.clone())
    }
}

// ============================================================================
// ViewPort
// ============================================================================

/// Page viewport and window chrome size, measured in the debugged page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPort {
    /// `window.innerWidth`.
    pub width: i32,
    /// `window.innerHeight`.
    pub height: i32,
    /// `outerWidth - innerWidth`.
    pub margin_width: i32,
    /// `outerHeight - innerHeight`.
    pub margin_height: i32,
    /// Whether the page runs on macOS.
    pub is_mac: bool,
}

impl Default for ViewPort {
    fn default() -> Self {
        Self {
            width: -1,
            height: -1,
            margin_width: 0,
            margin_height: 0,
            is_mac: false,
        }
    }
}

impl ViewPort {
    /// Script evaluated in the page to measure the viewport.
    pub const PROBE_EXPRESSION: &'static str = "({\
        width: window.innerWidth,\
        height: window.innerHeight,\
        marginWidth: window.outerWidth - window.innerWidth,\
        marginHeight: window.outerHeight - window.innerHeight,\
        isMac: navigator.platform.toUpperCase().indexOf('MAC') !== -1\
    })";

    /// Extracts a viewport from a `Runtime.evaluate` result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if `result.value` is missing or malformed.
    pub fn from_evaluate_result(result: &Value) -> Result<Self> {
        let value = result
            .pointer("/result/value")
            .ok_or_else(|| Error::protocol("Runtime.evaluate returned no value"))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Window size that gives the page the requested inner size.
    #[must_use]
    pub fn outer_size(&self, width: u32, height: u32) -> (u32, u32) {
        let grow = |inner: u32, margin: i32| (i64::from(inner) + i64::from(margin)).max(0) as u32;
        (
            grow(width, self.margin_width),
            grow(height, self.margin_height),
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
