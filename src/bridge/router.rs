//! IDE envelope dispatch.
//!
//! Tab-targeted commands (`reload`, `close`, and the debugger commands)
//! only run for MANAGED tabs; anything else is logged and dropped.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::TabId;
use crate::presets::Presets;
use crate::protocol::{ExtensionMessage, IdeMessage, STATUS_ACCEPTED};
use crate::registry::ConfirmationOutcome;

use super::{Bridge, Completion, PropertyChange};

// ============================================================================
// Constants
// ============================================================================

const SELECTION_MODE: &str = "selectionMode";
const SYNCHRONIZE_SELECTION: &str = "synchronizeSelection";

// ============================================================================
// Bridge - Routing
// ============================================================================

impl Bridge {
    /// Decodes and dispatches an inbound text frame.
    pub(crate) fn receive(&mut self, text: &str) {
        match IdeMessage::decode(text) {
            Ok(message) => self.dispatch(message),
            Err(Error::UnknownMessage { tag }) => {
                warn!(%tag, message = %text, "Unsupported message");
            }
            Err(e) => warn!(error = %e, message = %text, "Dropping malformed message"),
        }
    }

    /// Runs the handler for a decoded envelope.
    pub(crate) fn dispatch(&mut self, message: IdeMessage) {
        trace!(tag = message.tag(), "Dispatching message");

        match message {
            IdeMessage::Init {
                tab_id,
                status,
                version,
            } => {
                let accepted = status.as_deref() == Some(STATUS_ACCEPTED);
                self.process_init(tab_id, accepted, version);
            }

            IdeMessage::Reload { tab_id, url } => {
                if self.require_managed(tab_id, "reload") {
                    self.reload_tab(tab_id, url);
                }
            }

            IdeMessage::Close { tab_id } => {
                if self.require_managed(tab_id, "close") {
                    let tabs = Arc::clone(&self.hosts.tabs);
                    self.spawn_host(async move {
                        Completion::Done {
                            operation: "tabs.remove",
                            result: tabs.remove(tab_id).await,
                        }
                    });
                }
            }

            IdeMessage::AttachDebugger { tab_id } => {
                self.selection_mode = false;
                if self.require_managed(tab_id, "attach debugger") {
                    self.attach_debugger(tab_id);
                }
            }

            IdeMessage::DetachDebugger { tab_id } => {
                if self.require_managed(tab_id, "detach debugger") {
                    self.detach_debugger(tab_id);
                }
            }

            IdeMessage::DebuggerCommand { tab_id, command } => {
                if self.require_managed(tab_id, "send debugger command") {
                    self.send_debugger_command(tab_id, command);
                }
            }

            IdeMessage::LoadResizeOptions { resize_options } => {
                match Presets::parse_resize_options(&resize_options) {
                    Ok(options) => self.presets.load(options),
                    Err(e) => warn!(error = %e, "Ignoring malformed resize options"),
                }
            }

            IdeMessage::SaveResizeOptions { resize_options } => {
                self.send(ExtensionMessage::SaveResizeOptions { resize_options });
            }

            IdeMessage::PageInspectionPropertyChange {
                property_name,
                property_value,
            } => self.property_changed(property_name, property_value),
        }
    }

    fn require_managed(&self, tab_id: TabId, operation: &'static str) -> bool {
        if self.registry.is_managed(tab_id) {
            return true;
        }
        warn!(operation, error = %Error::not_managed(tab_id), "Refusing request");
        false
    }

    fn process_init(&mut self, tab_id: TabId, accepted: bool, version: Option<String>) {
        match self.registry.confirm(tab_id, accepted) {
            ConfirmationOutcome::Managed => {
                info!(tab_id = %tab_id, ide_version = ?version, "Tab managed by IDE");
                self.ide_version = version;
            }
            ConfirmationOutcome::ClosedWhileWaiting => {
                self.ide_version = version;
                self.send(ExtensionMessage::Close { tab_id });
            }
            ConfirmationOutcome::Rejected => {
                debug!(tab_id = %tab_id, "IDE declined tab");
            }
            ConfirmationOutcome::UnknownTab => {
                debug!(tab_id = %tab_id, "Ignoring init message for an unknown tab");
            }
            ConfirmationOutcome::NotRequested => {
                debug!(tab_id = %tab_id, "Ignoring init message that was not requested");
            }
        }
    }

    fn reload_tab(&mut self, tab_id: TabId, url: Option<String>) {
        let tabs = Arc::clone(&self.hosts.tabs);
        self.spawn_host(async move {
            let result: Result<()> = async {
                let Some(url) = url else {
                    return tabs.reload(tab_id, true).await;
                };
                match tabs.get(tab_id).await? {
                    Some(tab) if tab.url.as_deref() == Some(url.as_str()) => {
                        tabs.reload(tab_id, true).await
                    }
                    Some(_) => tabs.navigate(tab_id, &url).await,
                    None => Err(Error::host("tabs.get", format!("no tab with id {tab_id}"))),
                }
            }
            .await;

            Completion::Done {
                operation: "tabs.reload",
                result,
            }
        });
    }

    fn property_changed(&mut self, name: String, value: Value) {
        match name.as_str() {
            SELECTION_MODE => match value.as_bool() {
                Some(enabled) => self.selection_mode = enabled,
                None => warn!(%value, "Non-boolean selectionMode"),
            },
            SYNCHRONIZE_SELECTION => match value.as_bool() {
                Some(enabled) => self.synchronize_selection = enabled,
                None => warn!(%value, "Non-boolean synchronizeSelection"),
            },
            _ => {}
        }

        // No subscribers is fine
        let _ = self.property_tx.send(PropertyChange { name, value });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::bridge::harness::Harness;
    use crate::host::fake::HostCall;
    use crate::identifiers::TabId;
    use crate::registry::TabStatus;

    const TAB: TabId = TabId::new(7);

    #[tokio::test]
    async fn test_unknown_message_dropped() {
        let mut h = Harness::new().await;
        h.managed_tab(7, "https://x").await;

        h.ide(json!({"message": "teleport", "tabId": 7})).await;

        assert!(h.sent().is_empty());
        assert!(h.browser.calls().is_empty());
        assert_eq!(h.bridge.tab_status(TAB), TabStatus::Managed);
    }

    #[tokio::test]
    async fn test_malformed_frames_dropped() {
        let mut h = Harness::new().await;
        h.managed_tab(7, "https://x").await;

        h.connector.deliver("not json");
        h.ide(json!({"tabId": 7})).await;
        h.ide(json!({"message": "close", "tabId": "seven"})).await;
        h.ide(json!({"message": "close"})).await;

        assert!(h.sent().is_empty());
        assert!(h.browser.calls().is_empty());
    }

    #[tokio::test]
    async fn test_string_tab_id_accepted() {
        let mut h = Harness::new().await;
        h.managed_tab(7, "https://x").await;

        h.ide(json!({"message": "close", "tabId": "7"})).await;
        assert_eq!(h.browser.calls(), vec![HostCall::Remove(TAB)]);
    }

    #[tokio::test]
    async fn test_reload_without_url_bypasses_cache() {
        let mut h = Harness::new().await;
        h.managed_tab(7, "https://x").await;

        h.ide(json!({"message": "reload", "tabId": 7})).await;
        assert_eq!(
            h.browser.calls(),
            vec![HostCall::Reload {
                tab_id: TAB,
                bypass_cache: true
            }]
        );
    }

    #[tokio::test]
    async fn test_reload_same_url_reloads() {
        let mut h = Harness::new().await;
        h.managed_tab(7, "https://x").await;

        h.ide(json!({"message": "reload", "tabId": 7, "url": "https://x"}))
            .await;
        assert_eq!(
            h.browser.calls(),
            vec![HostCall::Reload {
                tab_id: TAB,
                bypass_cache: true
            }]
        );
    }

    #[tokio::test]
    async fn test_reload_other_url_navigates() {
        let mut h = Harness::new().await;
        h.managed_tab(7, "https://x").await;

        h.ide(json!({"message": "reload", "tabId": 7, "url": "https://y"}))
            .await;
        assert_eq!(
            h.browser.calls(),
            vec![HostCall::Navigate {
                tab_id: TAB,
                url: "https://y".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_commands_refused_for_unmanaged_tabs() {
        let mut h = Harness::new().await;
        h.open_tab(7, "https://x").await;
        h.sent();

        for message in [
            json!({"message": "reload", "tabId": 7}),
            json!({"message": "close", "tabId": 7}),
            json!({"message": "attach_debugger", "tabId": 7}),
            json!({"message": "detach_debugger", "tabId": 7}),
            json!({"message": "debugger_command", "tabId": 7,
                   "command": {"id": 1, "method": "Page.reload"}}),
            json!({"message": "close", "tabId": 99}),
        ] {
            h.ide(message).await;
        }

        assert!(h.browser.calls().is_empty());
        assert!(h.sent().is_empty());
        assert_eq!(h.bridge.debugged_tab(), None);
        assert_eq!(h.bridge.tab_status(TAB), TabStatus::Unconfirmed);
    }

    #[tokio::test]
    async fn test_init_for_unrequested_tab_ignored() {
        let mut h = Harness::new().await;
        h.managed_tab(7, "https://x").await;

        h.ide(json!({"message": "init", "tabId": 7, "status": "rejected"}))
            .await;
        h.ide(json!({"message": "init", "tabId": 42, "status": "accepted"}))
            .await;

        assert_eq!(h.bridge.tab_status(TAB), TabStatus::Managed);
        assert_eq!(h.bridge.tab_status(TabId::new(42)), TabStatus::NotManaged);
        assert!(h.sent().is_empty());
    }

    #[tokio::test]
    async fn test_save_resize_options_echoed() {
        let mut h = Harness::new().await;
        h.ide(json!({"message": "save_resize_options", "resizeOptions": "[{\"width\":1}]"}))
            .await;
        assert_eq!(
            h.sent(),
            vec![json!({"message": "save_resize_options", "resizeOptions": "[{\"width\":1}]"})]
        );
    }

    #[tokio::test]
    async fn test_load_resize_options_string_or_array() {
        let preset = json!({
            "type": "TABLET_PORTRAIT", "displayName": "Tablet",
            "width": 768, "height": 1024, "showInToolbar": true, "isDefault": false
        });

        let mut h = Harness::new().await;
        h.ide(json!({"message": "load_resize_options", "resizeOptions": [preset.clone()]}))
            .await;
        assert_eq!(h.bridge.presets().resize_options().map(<[_]>::len), Some(1));

        h.ide(json!({
            "message": "load_resize_options",
            "resizeOptions": json!([preset.clone(), preset]).to_string()
        }))
        .await;
        assert_eq!(h.bridge.presets().resize_options().map(<[_]>::len), Some(2));

        h.ide(json!({"message": "load_resize_options", "resizeOptions": 5}))
            .await;
        assert_eq!(h.bridge.presets().resize_options().map(<[_]>::len), Some(2));
    }

    #[tokio::test]
    async fn test_selection_mode_property() {
        let mut h = Harness::new().await;
        h.ide(json!({
            "message": "pageInspectionPropertyChange",
            "propertyName": "selectionMode",
            "propertyValue": true
        }))
        .await;
        assert!(h.bridge.selection_mode());
        assert!(h.sent().is_empty());
    }
}
