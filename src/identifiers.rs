//! Type-safe identifiers for browser entities.
//!
//! Newtype wrappers keep tab and window handles from being mixed up.
//! Both are opaque integers handed out by the browser.
//!
//! | Type | Source |
//! |------|--------|
//! | [`TabId`] | `tabs.Tab.id` |
//! | [`WindowId`] | `windows.Window.id` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// TabId
// ============================================================================

/// Browser tab handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(u32);

impl TabId {
    /// Creates a tab ID from the raw browser value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw browser value.
    #[inline]
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Coerces a JSON value into a tab ID.
    ///
    /// The IDE sends tab ids either as numbers or as numeric strings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for anything else, including
    /// negative and fractional numbers.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Number(number) => number
                .as_u64()
                .and_then(|raw| u32::try_from(raw).ok())
                .map(Self)
                .ok_or_else(|| Error::invalid_argument(format!("tabId out of range: {number}"))),
            Value::String(text) => text
                .trim()
                .parse::<u32>()
                .map(Self)
                .map_err(|_| Error::invalid_argument(format!("tabId is not numeric: {text:?}"))),
            other => Err(Error::invalid_argument(format!(
                "missing or incorrect tabId: {other}"
            ))),
        }
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TabId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Deserializes a tab id leniently (number or numeric string).
///
/// Use with `#[serde(deserialize_with = "lenient_tab_id")]`.
pub fn lenient_tab_id<'de, D>(deserializer: D) -> std::result::Result<TabId, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    TabId::from_value(&value).map_err(serde::de::Error::custom)
}

// ============================================================================
// WindowId
// ============================================================================

/// Browser window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(u32);

impl WindowId {
    /// Creates a window ID from the raw browser value.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw browser value.
    #[inline]
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_tab_id_from_number() {
        let id = TabId::from_value(&json!(7)).expect("number");
        assert_eq!(id, TabId::new(7));
    }

    #[test]
    fn test_tab_id_from_numeric_string() {
        let id = TabId::from_value(&json!(" 42 ")).expect("string");
        assert_eq!(id.as_u32(), 42);
    }

    #[test]
    fn test_tab_id_rejects_garbage() {
        assert!(TabId::from_value(&json!("abc")).is_err());
        assert!(TabId::from_value(&json!(-1)).is_err());
        assert!(TabId::from_value(&json!(1.5)).is_err());
        assert!(TabId::from_value(&Value::Null).is_err());
        assert!(TabId::from_value(&json!({"id": 1})).is_err());
    }

    #[test]
    fn test_lenient_deserialize() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(rename = "tabId", deserialize_with = "lenient_tab_id")]
            tab_id: TabId,
        }

        let holder: Holder = serde_json::from_str(r#"{"tabId": "9"}"#).expect("parse");
        assert_eq!(holder.tab_id, TabId::new(9));
        assert!(serde_json::from_str::<Holder>(r#"{"tabId": true}"#).is_err());
    }

    #[test]
    fn test_tab_id_serializes_as_number() {
        assert_eq!(serde_json::to_value(TabId::new(3)).expect("ser"), json!(3));
    }

    proptest! {
        #[test]
        fn number_and_string_forms_agree(raw in any::<u32>()) {
            let from_number = TabId::from_value(&json!(raw)).expect("number");
            let from_string = TabId::from_value(&json!(raw.to_string())).expect("string");
            prop_assert_eq!(from_number, from_string);
            prop_assert_eq!(from_number.as_u32(), raw);
        }
    }
}
