//! Remote debugger session.
//!
//! At most one tab is debugged at a time. Attaching to another tab
//! releases the previous one once the new attach succeeds.
//!
//! # Attach Sequence
//!
//! 1. Host attach (refusal is logged, nothing else happens)
//! 2. Previous tab detached, session recorded, window looked up
//! 3. Viewport probed
//! 4. `Debugger.enable` sent
//! 5. `debugger_attached` emitted

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::host::{DetachReason, TabInfo};
use crate::identifiers::TabId;
use crate::protocol::{DebuggerCommand, DebuggerResponse, ExtensionMessage};
use crate::warnings::WarningKind;

use super::viewport::AfterViewPort;
use super::{Bridge, Completion, DebuggerSession};

// ============================================================================
// Constants
// ============================================================================

/// Enabled on attach, before any IDE command is relayed.
const DEBUGGER_ENABLE: &str = "Debugger.enable";

// ============================================================================
// Bridge - Debugger
// ============================================================================

impl Bridge {
    pub(crate) fn attach_debugger(&mut self, tab_id: TabId) {
        debug!(tab_id = %tab_id, "Attaching debugger");
        let debugger = Arc::clone(&self.hosts.debugger);
        let version = self.config.debugger_protocol_version.clone();
        self.spawn_host(async move {
            let result = debugger.attach(tab_id, &version).await;
            Completion::Attached { tab_id, result }
        });
    }

    pub(crate) fn debugger_attached(&mut self, tab_id: TabId, result: Result<()>) {
        if let Err(e) = result {
            warn!(tab_id = %tab_id, error = %e, "Cannot debug this tab");
            return;
        }

        info!(tab_id = %tab_id, "Debugger attached");

        if let Some(previous) = self.session.take()
            && previous.tab_id != tab_id
        {
            debug!(tab_id = %previous.tab_id, "Releasing previously debugged tab");
            self.spawn_detach(previous.tab_id);
        }

        self.session = Some(DebuggerSession {
            tab_id,
            window_id: None,
        });

        let tabs = Arc::clone(&self.hosts.tabs);
        self.spawn_host(async move {
            let result = tabs.get(tab_id).await;
            Completion::SessionWindow { tab_id, result }
        });

        self.detect_viewport(AfterViewPort::EnableDebugger(tab_id));
    }

    pub(crate) fn session_window(&mut self, tab_id: TabId, result: Result<Option<TabInfo>>) {
        match result {
            Ok(Some(tab)) => {
                if let Some(session) = self.session.as_mut()
                    && session.tab_id == tab_id
                {
                    session.window_id = Some(tab.window_id);
                }
            }
            Ok(None) => debug!(tab_id = %tab_id, "Debugged tab vanished"),
            Err(e) => warn!(tab_id = %tab_id, error = %e, "Failed to look up debugged tab"),
        }
    }

    pub(crate) fn enable_debugger(&mut self, tab_id: TabId) {
        let debugger = Arc::clone(&self.hosts.debugger);
        self.spawn_host(async move {
            let result = debugger
                .send_command(tab_id, DEBUGGER_ENABLE, json!({}))
                .await;
            Completion::DebuggerEnabled { tab_id, result }
        });
    }

    pub(crate) fn debugger_enabled(&mut self, tab_id: TabId, result: Result<Value>) {
        if let Err(e) = result {
            warn!(tab_id = %tab_id, error = %e, "Failed to enable Debugger agent");
        }
        self.send(ExtensionMessage::DebuggerAttached { tab_id });
    }

    /// Explicit detach; the host reports no detach event for it.
    pub(crate) fn detach_debugger(&mut self, tab_id: TabId) {
        debug!(tab_id = %tab_id, "Detaching debugger");
        if self.debugged_tab() == Some(tab_id) {
            self.session = None;
        }
        self.spawn_detach(tab_id);
    }

    fn spawn_detach(&mut self, tab_id: TabId) {
        let debugger = Arc::clone(&self.hosts.debugger);
        self.spawn_host(async move {
            Completion::Done {
                operation: "debugger.detach",
                result: debugger.detach(tab_id).await,
            }
        });
    }

    pub(crate) fn send_debugger_command(&mut self, tab_id: TabId, command: DebuggerCommand) {
        let DebuggerCommand { id, method, params } = command;
        if self.config.debug {
            debug!(tab_id = %tab_id, %id, %method, "Sending debugger command");
        }

        let params = params.unwrap_or_else(|| json!({}));
        let debugger = Arc::clone(&self.hosts.debugger);
        self.spawn_host(async move {
            let result = debugger.send_command(tab_id, &method, params).await;
            Completion::CommandDone { tab_id, id, result }
        });
    }

    pub(crate) fn command_done(&mut self, tab_id: TabId, id: Value, result: Result<Value>) {
        let response = match result {
            Ok(result) => DebuggerResponse::Result { id, result },
            Err(e) => {
                warn!(tab_id = %tab_id, error = %e, "Debugger command failed");
                DebuggerResponse::Error {
                    id,
                    error: error_payload(&e),
                }
            }
        };
        self.send(ExtensionMessage::DebuggerCommandResponse { tab_id, response });
    }

    pub(crate) fn relay_debugger_event(&mut self, tab_id: TabId, method: String, params: Value) {
        self.send(ExtensionMessage::DebuggerCommandResponse {
            tab_id,
            response: DebuggerResponse::Event { method, params },
        });
    }

    /// The host dropped the debugger without being asked.
    pub(crate) fn host_detached(&mut self, tab_id: TabId, reason: DetachReason) {
        info!(tab_id = %tab_id, %reason, "Debugger detached by host");

        if self.debugged_tab() == Some(tab_id) {
            self.session = None;

            let tabs = Arc::clone(&self.hosts.tabs);
            let delay = self.config.warning_recheck_delay;
            self.spawn_host(async move {
                tokio::time::sleep(delay).await;
                let result = tabs.get(tab_id).await;
                Completion::DetachRecheck { tab_id, result }
            });
        }

        self.send(ExtensionMessage::DebuggerDetached { tab_id });
    }

    pub(crate) fn detach_recheck(&mut self, tab_id: TabId, result: Result<Option<TabInfo>>) {
        match result {
            Ok(Some(_)) => self.open_warning(WarningKind::DisconnectedDebugger),
            Ok(None) => debug!(tab_id = %tab_id, "Detached tab is gone, no warning"),
            Err(e) => debug!(tab_id = %tab_id, error = %e, "Detached tab lookup failed"),
        }
    }
}

/// Error text relayed to the IDE: the host's message as a JSON object.
fn error_payload(error: &Error) -> String {
    let message = match error {
        Error::Debugger { message } | Error::Host { message, .. } => message.clone(),
        other => other.to_string(),
    };
    json!({ "message": message }).to_string()
}

// ============================================================================
// Tests
// ============================================================================
