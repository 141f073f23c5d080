//! Requests from the extension's own pages.
//!
//! | Request | Answer |
//! |---------|--------|
//! | `getState` | state snapshot |
//! | `getPresets` | `{presets}` |
//! | `detectViewPort` | `{viewPort}` |
//! | `getWindowInfo` | `{window}` |
//! | `areChangesPropagated` | `{enabled}` |
//! | anything else | `{ok}` |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::{
    ExtensionMessage, LocalCall, LocalRequest, LocalResponse, Responder, StateSnapshot,
};
use crate::warnings::{PROPAGATE_CHANGES_KEY, WARNING_KEY_PREFIX, changes_propagated, enabled_key};

use super::viewport::{AfterViewPort, AfterWindow};
use super::{Bridge, Completion};

// ============================================================================
// Constants
// ============================================================================

/// Preset customizer page.
const OPTIONS_PAGE: &str = "html/options.html";

// ============================================================================
// Bridge - Local Requests
// ============================================================================

impl Bridge {
    /// Handles a request from an extension page.
    ///
    /// The responder always gets exactly one answer; malformed requests are
    /// answered with `{ok: false}`.
    pub fn handle_local(&mut self, call: LocalCall) {
        let LocalCall { request, responder } = call;
        match LocalRequest::from_value(request) {
            Ok(request) => self.local_request(request, responder),
            Err(e) => {
                warn!(error = %e, "Dropping local request");
                let _ = responder.send(LocalResponse::failed());
            }
        }
    }

    fn local_request(&mut self, request: LocalRequest, responder: Responder) {
        match request {
            LocalRequest::GetState => {
                let _ = responder.send(LocalResponse::State(self.state_snapshot()));
            }

            LocalRequest::GetPresets { copy } => {
                let presets = self.presets.presets(copy);
                let _ = responder.send(LocalResponse::Presets { presets });
            }

            LocalRequest::SetPresets { presets } => {
                let payload = serde_json::to_value(&presets);
                self.presets.set(presets);
                match payload {
                    Ok(resize_options) => {
                        debug!("Saving window presets back to IDE");
                        self.send(ExtensionMessage::SaveResizeOptions { resize_options });
                    }
                    Err(e) => warn!(error = %e, "Failed to encode presets"),
                }
                let _ = responder.send(LocalResponse::ok());
            }

            LocalRequest::SetSelectionMode { selection_mode } => {
                self.set_selection_mode(selection_mode);
                let _ = responder.send(LocalResponse::ok());
            }

            LocalRequest::ResetPageSize => {
                self.with_focused_window(AfterWindow::Maximize(responder));
            }

            LocalRequest::ResizePage { preset } => self.resize_page(preset, responder),

            LocalRequest::DetectViewPort => {
                self.detect_viewport(AfterViewPort::Respond(responder));
            }

            LocalRequest::GetWindowInfo => {
                self.with_focused_window(AfterWindow::Respond(responder));
            }

            LocalRequest::ShowPresetCustomizer => {
                let tabs = Arc::clone(&self.hosts.tabs);
                self.spawn_host(async move {
                    Completion::Done {
                        operation: "tabs.create",
                        result: tabs.create(OPTIONS_PAGE).await,
                    }
                });
                let _ = responder.send(LocalResponse::ok());
            }

            LocalRequest::SendInspectMessage { tab_id, url } => {
                self.send(ExtensionMessage::Inspect { tab_id, url });
                let _ = responder.send(LocalResponse::ok());
            }

            LocalRequest::AttachDebugger { tab_id, url } => {
                // The IDE decides whether to attach
                let url = url
                    .or_else(|| {
                        self.registry
                            .get(tab_id)
                            .and_then(|record| record.url())
                            .map(str::to_string)
                    })
                    .unwrap_or_default();
                self.send(ExtensionMessage::Inspect { tab_id, url });
                let _ = responder.send(LocalResponse::ok());
            }

            LocalRequest::DetachDebugger { tab_id } => {
                let managed = self.registry.is_managed(tab_id);
                if managed {
                    self.detach_debugger(tab_id);
                } else {
                    debug!(tab_id = %tab_id, "Ignoring detach for unmanaged tab");
                }
                let _ = responder.send(LocalResponse::Ack { ok: managed });
            }

            LocalRequest::ResetWarnings => {
                let storage = Arc::clone(&self.hosts.storage);
                self.spawn_host(async move {
                    let result: Result<()> = async {
                        for key in storage.keys().await? {
                            if key.starts_with(WARNING_KEY_PREFIX) {
                                storage.remove(&key).await?;
                            }
                        }
                        Ok(())
                    }
                    .await;
                    Completion::Done {
                        operation: "storage.reset",
                        result,
                    }
                });
                let _ = responder.send(LocalResponse::ok());
            }

            LocalRequest::EnableWarning { ident, enabled } => {
                let storage = Arc::clone(&self.hosts.storage);
                let key = enabled_key(&ident);
                self.spawn_host(async move {
                    let result = if enabled {
                        storage.remove(&key).await
                    } else {
                        storage.set(&key, json!("false")).await
                    };
                    Completion::Done {
                        operation: "storage.set",
                        result,
                    }
                });
                let _ = responder.send(LocalResponse::ok());
            }

            LocalRequest::ResourceContentCommitted { resource, content } => {
                let storage = Arc::clone(&self.hosts.storage);
                self.spawn_host(async move {
                    let result = storage.get(PROPAGATE_CHANGES_KEY).await;
                    Completion::PropagationFlag {
                        resource,
                        content,
                        result,
                    }
                });
                let _ = responder.send(LocalResponse::ok());
            }

            LocalRequest::AreChangesPropagated => {
                let storage = Arc::clone(&self.hosts.storage);
                self.spawn_host(async move {
                    let stored = storage
                        .get(PROPAGATE_CHANGES_KEY)
                        .await
                        .inspect_err(|e| warn!(error = %e, "Failed to read propagation flag"))
                        .ok()
                        .flatten();
                    Completion::Reply {
                        responder,
                        response: LocalResponse::ChangesPropagated {
                            enabled: changes_propagated(stored.as_ref()),
                        },
                    }
                });
            }

            LocalRequest::SetChangesPropagated { enabled } => {
                let storage = Arc::clone(&self.hosts.storage);
                self.spawn_host(async move {
                    Completion::Done {
                        operation: "storage.set",
                        result: storage.set(PROPAGATE_CHANGES_KEY, json!(enabled)).await,
                    }
                });
                let _ = responder.send(LocalResponse::ok());
            }
        }
    }

    pub(crate) fn propagation_flag(
        &mut self,
        resource: String,
        content: String,
        result: Result<Option<Value>>,
    ) {
        let stored = result
            .inspect_err(|e| warn!(error = %e, "Failed to read propagation flag"))
            .ok()
            .flatten();

        if changes_propagated(stored.as_ref()) {
            debug!(%resource, "Sending DevTools changes back to IDE");
            self.send(ExtensionMessage::ResourceChanged { resource, content });
        } else {
            debug!(%resource, "Change propagation disabled");
        }
    }

    /// Stores selection mode and tells the IDE.
    pub(crate) fn set_selection_mode(&mut self, selection_mode: bool) {
        self.selection_mode = selection_mode;
        self.send(ExtensionMessage::SelectionMode { selection_mode });
    }

    fn state_snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            selection_mode: self.selection_mode,
            synchronize_selection: self.synchronize_selection,
            debugged_tab: self.debugged_tab(),
            ide_version: self.ide_version.clone(),
            infobar: self.config.infobar,
            resize_options: self.presets.resize_options().map(<[_]>::to_vec),
            view_port: self.viewport,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
