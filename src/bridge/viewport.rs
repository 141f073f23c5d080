//! Viewport probing, window sizing, and warning popups.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, error, warn};

use crate::error::Result;
use crate::host::{PopupSpec, WindowInfo, WindowUpdate};
use crate::identifiers::TabId;
use crate::presets::ViewPort;
use crate::protocol::{LocalResponse, Responder};
use crate::warnings::{WARNING_POPUP_WIDTH, WarningKind, enabled_key, is_suppressed};

use super::{Bridge, Completion};

// ============================================================================
// Constants
// ============================================================================

/// macOS refuses to make windows narrower than this.
const MIN_MAC_WINDOW_WIDTH: u32 = 400;

// ============================================================================
// Continuations
// ============================================================================

/// What to do once the viewport is known.
pub(crate) enum AfterViewPort {
    /// Answer `detectViewPort`.
    Respond(Responder),
    /// Resize the focused window to a page size.
    Resize {
        width: u32,
        height: u32,
        responder: Responder,
    },
    /// Continue the attach sequence.
    EnableDebugger(TabId),
    /// Open a warning popup sized to the window chrome.
    OpenWarning(WarningKind),
}

/// What to do with the last focused window.
pub(crate) enum AfterWindow {
    /// Maximize it.
    Maximize(Responder),
    /// Set its outer size; `width` is the requested page width.
    Resize {
        width: u32,
        outer: (u32, u32),
        responder: Responder,
    },
    /// Answer `getWindowInfo`.
    Respond(Responder),
}

// ============================================================================
// Bridge - Viewport
// ============================================================================

impl Bridge {
    /// Measures the debugged page; continues immediately without one.
    pub(crate) fn detect_viewport(&mut self, then: AfterViewPort) {
        let Some(tab_id) = self.debugged_tab() else {
            debug!("No debugged tab, skipping viewport detection");
            self.after_viewport(then);
            return;
        };

        let debugger = Arc::clone(&self.hosts.debugger);
        self.spawn_host(async move {
            let params = json!({
                "expression": ViewPort::PROBE_EXPRESSION,
                "returnByValue": true,
            });
            let result = debugger
                .send_command(tab_id, "Runtime.evaluate", params)
                .await;
            Completion::ViewPortProbed { result, then }
        });
    }

    pub(crate) fn viewport_probed(&mut self, result: Result<Value>, then: AfterViewPort) {
        match result.and_then(|value| ViewPort::from_evaluate_result(&value)) {
            Ok(viewport) => {
                debug!(?viewport, "Viewport detected");
                self.viewport = viewport;
            }
            Err(e) => warn!(error = %e, "Viewport detection failed"),
        }
        self.after_viewport(then);
    }

    fn after_viewport(&mut self, then: AfterViewPort) {
        match then {
            AfterViewPort::Respond(responder) => {
                let _ = responder.send(LocalResponse::ViewPort {
                    view_port: self.viewport,
                });
            }
            AfterViewPort::Resize {
                width,
                height,
                responder,
            } => {
                let outer = self.viewport.outer_size(width, height);
                self.with_focused_window(AfterWindow::Resize {
                    width,
                    outer,
                    responder,
                });
            }
            AfterViewPort::EnableDebugger(tab_id) => self.enable_debugger(tab_id),
            AfterViewPort::OpenWarning(kind) => self.show_warning_popup(kind),
        }
    }

    /// Looks up the last focused window, then continues with `then`.
    pub(crate) fn with_focused_window(&mut self, then: AfterWindow) {
        let windows = Arc::clone(&self.hosts.windows);
        self.spawn_host(async move {
            let result = windows.last_focused().await;
            Completion::FocusedWindow { result, then }
        });
    }

    pub(crate) fn focused_window(&mut self, result: Result<WindowInfo>, then: AfterWindow) {
        match then {
            AfterWindow::Respond(responder) => {
                let window = result
                    .inspect_err(|e| warn!(error = %e, "Failed to get focused window"))
                    .ok();
                let _ = responder.send(LocalResponse::Window { window });
            }

            AfterWindow::Maximize(responder) => {
                let response = match result {
                    Ok(window) => {
                        self.update_window(window, WindowUpdate::maximized());
                        LocalResponse::ok()
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to get focused window");
                        LocalResponse::failed()
                    }
                };
                let _ = responder.send(response);
            }

            AfterWindow::Resize {
                width,
                outer: (outer_width, outer_height),
                responder,
            } => {
                let window = match result {
                    Ok(window) => window,
                    Err(e) => {
                        warn!(error = %e, "Failed to get focused window");
                        let _ = responder.send(LocalResponse::failed());
                        return;
                    }
                };

                self.update_window(window, WindowUpdate::sized(outer_width, outer_height));
                let _ = responder.send(LocalResponse::ok());

                if self.viewport.is_mac && width < MIN_MAC_WINDOW_WIDTH {
                    self.open_warning(WarningKind::WindowTooSmall);
                }
            }
        }
    }

    fn update_window(&mut self, window: WindowInfo, update: WindowUpdate) {
        let windows = Arc::clone(&self.hosts.windows);
        self.spawn_host(async move {
            Completion::Done {
                operation: "windows.update",
                result: windows.update(window.id, update).await,
            }
        });
    }

    /// Resizes the focused window so the page gets preset `index`'s size.
    pub(crate) fn resize_page(&mut self, index: Option<usize>, responder: Responder) {
        let Some(index) = index else {
            self.with_focused_window(AfterWindow::Maximize(responder));
            return;
        };

        let Some(preset) = self.presets.preset(index) else {
            error!(preset = index, "Preset not found");
            let _ = responder.send(LocalResponse::failed());
            return;
        };

        self.detect_viewport(AfterViewPort::Resize {
            width: preset.width,
            height: preset.height,
            responder,
        });
    }
}

// ============================================================================
// Bridge - Warnings
// ============================================================================

impl Bridge {
    /// Shows a warning unless suppressed or already on screen.
    pub(crate) fn open_warning(&mut self, kind: WarningKind) {
        if !self.warnings.try_begin(kind) {
            debug!(warning = %kind, "Warning already showing");
            return;
        }

        let storage = Arc::clone(&self.hosts.storage);
        self.spawn_host(async move {
            let result = storage.get(&enabled_key(kind.ident())).await;
            Completion::WarningFlag { kind, result }
        });
    }

    pub(crate) fn warning_flag(&mut self, kind: WarningKind, result: Result<Option<Value>>) {
        let stored = result
            .inspect_err(|e| warn!(warning = %kind, error = %e, "Failed to read warning flag"))
            .ok()
            .flatten();

        if is_suppressed(stored.as_ref()) {
            debug!(warning = %kind, "Warning suppressed");
            self.warnings.finish(kind);
            return;
        }

        self.detect_viewport(AfterViewPort::OpenWarning(kind));
    }

    fn show_warning_popup(&mut self, kind: WarningKind) {
        let popup = PopupSpec {
            url: kind.page_url(),
            width: WARNING_POPUP_WIDTH,
            height: kind.popup_height(&self.viewport),
        };
        let windows = Arc::clone(&self.hosts.windows);
        self.spawn_host(async move {
            let result = windows.create_popup(popup).await;
            Completion::PopupOpened { kind, result }
        });
    }

    pub(crate) fn popup_opened(&mut self, kind: WarningKind, result: Result<()>) {
        if let Err(e) = result {
            warn!(warning = %kind, error = %e, "Failed to open warning");
        }
        self.warnings.finish(kind);
    }
}

// ============================================================================
// Tests
// ============================================================================
