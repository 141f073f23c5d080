//! The bridge event loop.
//!
//! [`Bridge`] owns every piece of mutable state (tab registry, debugger
//! session, presets, viewport, transport) and is driven by one task.
//!
//! # Event Sources
//!
//! | Source | Handled by |
//! |--------|------------|
//! | Browser runtime | [`Bridge::handle_host_event`] |
//! | IDE socket | [`Bridge::handle_transport_event`] |
//! | Extension pages | [`Bridge::handle_local`] |
//! | Host call results | internal completion channel |
//!
//! Host calls never block the loop. Each one is spawned as its own task
//! and its result comes back as a completion, so any number of them can
//! be outstanding while events keep flowing.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `router` | IDE envelope dispatch |
//! | `tabs` | Tab lifecycle events |
//! | `debugger` | Remote debugger session |
//! | `viewport` | Viewport probing, window sizing, warnings |
//! | `local` | Extension page requests |

// ============================================================================
// Submodules
// ============================================================================

mod debugger;
mod local;
mod router;
mod tabs;
mod viewport;

#[cfg(test)]
mod harness;

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, trace, warn};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::host::{HostEvent, Hosts, TabInfo, WindowInfo};
use crate::identifiers::{TabId, WindowId};
use crate::presets::{Presets, ViewPort};
use crate::protocol::{ExtensionMessage, LocalCall, LocalResponse, Responder};
use crate::registry::{TabRegistry, TabStatus};
use crate::transport::{Connector, Transport, TransportEvent, WsConnector};
use crate::warnings::{WarningGate, WarningKind};

use self::viewport::{AfterViewPort, AfterWindow};

// ============================================================================
// Constants
// ============================================================================

/// Buffered page-inspection notifications per subscriber.
const PROPERTY_CHANNEL_CAPACITY: usize = 16;

// ============================================================================
// Types
// ============================================================================

/// Page inspection property pushed by the IDE.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    /// Property name.
    pub name: String,
    /// New value.
    pub value: Value,
}

/// The one tab under the remote debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebuggerSession {
    /// Debugged tab.
    pub tab_id: TabId,
    /// Window holding it, once known.
    pub window_id: Option<WindowId>,
}

/// Result of a spawned host call, delivered back to the loop.
pub(crate) enum Completion {
    /// Startup walk over the open tabs.
    TabsSeeded(Result<Vec<TabInfo>>),
    /// Call with no follow-up beyond logging.
    Done {
        operation: &'static str,
        result: Result<()>,
    },
    /// Local request answered off the loop.
    Reply {
        responder: Responder,
        response: LocalResponse,
    },
    Attached {
        tab_id: TabId,
        result: Result<()>,
    },
    SessionWindow {
        tab_id: TabId,
        result: Result<Option<TabInfo>>,
    },
    DebuggerEnabled {
        tab_id: TabId,
        result: Result<Value>,
    },
    CommandDone {
        tab_id: TabId,
        id: Value,
        result: Result<Value>,
    },
    DetachRecheck {
        tab_id: TabId,
        result: Result<Option<TabInfo>>,
    },
    ViewPortProbed {
        result: Result<Value>,
        then: AfterViewPort,
    },
    FocusedWindow {
        result: Result<WindowInfo>,
        then: AfterWindow,
    },
    WarningFlag {
        kind: WarningKind,
        result: Result<Option<Value>>,
    },
    PopupOpened {
        kind: WarningKind,
        result: Result<()>,
    },
    PropagationFlag {
        resource: String,
        content: String,
        result: Result<Option<Value>>,
    },
}

// ============================================================================
// Bridge
// ============================================================================

/// Background bridge between browser tabs and the IDE.
pub struct Bridge {
    config: BridgeConfig,
    hosts: Hosts,
    registry: TabRegistry,
    session: Option<DebuggerSession>,
    presets: Presets,
    viewport: ViewPort,
    selection_mode: bool,
    synchronize_selection: bool,
    ide_version: Option<String>,
    warnings: WarningGate,
    transport: Transport,
    transport_rx: mpsc::UnboundedReceiver<TransportEvent>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
    property_tx: broadcast::Sender<PropertyChange>,
}

// ============================================================================
// Bridge - Construction
// ============================================================================

impl Bridge {
    /// Creates a bridge that talks to the IDE over WebSocket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if `config` is invalid.
    pub fn new(config: BridgeConfig, hosts: Hosts) -> Result<Self> {
        Self::with_connector(config, hosts, Arc::new(WsConnector))
    }

    /// Creates a bridge with a custom socket connector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if `config` is invalid.
    pub fn with_connector(
        config: BridgeConfig,
        hosts: Hosts,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        config.validate()?;

        let (events_tx, transport_rx) = mpsc::unbounded_channel();
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (property_tx, _) = broadcast::channel(PROPERTY_CHANNEL_CAPACITY);
        let transport = Transport::new(
            config.server_url.clone(),
            connector,
            events_tx,
            config.debug,
        );

        Ok(Self {
            config,
            hosts,
            registry: TabRegistry::new(),
            session: None,
            presets: Presets::default(),
            viewport: ViewPort::default(),
            selection_mode: false,
            synchronize_selection: false,
            ide_version: None,
            warnings: WarningGate::default(),
            transport,
            transport_rx,
            completion_tx,
            completion_rx,
            in_flight: 0,
            property_tx,
        })
    }
}

// ============================================================================
// Bridge - Event Loop
// ============================================================================

impl Bridge {
    /// Connects to the IDE and walks the tabs that are already open.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        info!(url = %self.transport.url(), version = %self.config.version, "Bridge starting");
        self.transport.connect_if_needed();

        let tabs = Arc::clone(&self.hosts.tabs);
        self.spawn_host(async move { Completion::TabsSeeded(tabs.query_all().await) });
    }

    /// Runs the bridge until the host event channel closes.
    pub async fn run(
        mut self,
        mut host_rx: mpsc::UnboundedReceiver<HostEvent>,
        mut local_rx: mpsc::UnboundedReceiver<LocalCall>,
    ) {
        self.start();

        loop {
            tokio::select! {
                event = host_rx.recv() => {
                    let Some(event) = event else {
                        debug!("Host event channel closed");
                        break;
                    };
                    self.handle_host_event(event);
                }

                Some(event) = self.transport_rx.recv() => {
                    self.handle_transport_event(event);
                }

                Some(call) = local_rx.recv() => {
                    self.handle_local(call);
                }

                Some(completion) = self.completion_rx.recv() => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    self.handle_completion(completion);
                }
            }
        }

        info!("Bridge stopped");
    }

    /// Handles a browser runtime notification.
    pub fn handle_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::Installed { version } => {
                info!(%version, "Extension installed");
                self.send(ExtensionMessage::Ready { version });
            }
            HostEvent::TabCreated { tab_id } => self.tab_created(tab_id),
            HostEvent::TabUpdated(tab) => self.tab_updated(tab),
            HostEvent::TabRemoved { tab_id } => self.tab_removed(tab_id),
            HostEvent::TabAttached {
                tab_id,
                new_window_id,
            } => self.tab_attached(tab_id, new_window_id),
            HostEvent::SelectionModeToggled => self.set_selection_mode(!self.selection_mode),
            HostEvent::WindowFocused { window_id } => {
                trace!(?window_id, "Window focused");
            }
            HostEvent::DebuggerEvent {
                tab_id,
                method,
                params,
            } => self.relay_debugger_event(tab_id, method, params),
            HostEvent::DebuggerDetached { tab_id, reason } => self.host_detached(tab_id, reason),
        }
    }

    /// Handles a socket event.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        if let Some(text) = self.transport.handle_event(event) {
            self.receive(&text);
        }
    }

    /// Drives the bridge until no host call is outstanding.
    ///
    /// Socket events already delivered are handled first. Useful for
    /// embedders that step the bridge by hand instead of calling
    /// [`Bridge::run`].
    pub async fn settle(&mut self) {
        loop {
            while let Ok(event) = self.transport_rx.try_recv() {
                self.handle_transport_event(event);
            }
            if self.in_flight == 0 {
                break;
            }
            let Some(completion) = self.completion_rx.recv().await else {
                break;
            };
            self.in_flight -= 1;
            self.handle_completion(completion);
        }
    }

    /// Sends an envelope to the IDE, queueing it while disconnected.
    pub fn send(&mut self, message: ExtensionMessage) {
        trace!(tag = message.tag(), "Outbound message");
        self.transport.send(message);
    }

    /// Spawns a host call; its completion re-enters the loop.
    pub(crate) fn spawn_host<F>(&mut self, task: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let _ = completion_tx.send(task.await);
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::TabsSeeded(result) => self.tabs_seeded(result),
            Completion::Done { operation, result } => match result {
                Ok(()) => trace!(operation, "Host operation done"),
                Err(e) => warn!(operation, error = %e, "Host operation failed"),
            },
            Completion::Reply {
                responder,
                response,
            } => {
                let _ = responder.send(response);
            }
            Completion::Attached { tab_id, result } => self.debugger_attached(tab_id, result),
            Completion::SessionWindow { tab_id, result } => self.session_window(tab_id, result),
            Completion::DebuggerEnabled { tab_id, result } => {
                self.debugger_enabled(tab_id, result);
            }
            Completion::CommandDone { tab_id, id, result } => {
                self.command_done(tab_id, id, result);
            }
            Completion::DetachRecheck { tab_id, result } => self.detach_recheck(tab_id, result),
            Completion::ViewPortProbed { result, then } => self.viewport_probed(result, then),
            Completion::FocusedWindow { result, then } => self.focused_window(result, then),
            Completion::WarningFlag { kind, result } => self.warning_flag(kind, result),
            Completion::PopupOpened { kind, result } => self.popup_opened(kind, result),
            Completion::PropagationFlag {
                resource,
                content,
                result,
            } => self.propagation_flag(resource, content, result),
        }
    }
}

// ============================================================================
// Bridge - Accessors
// ============================================================================

impl Bridge {
    /// Management status of a tab.
    #[inline]
    #[must_use]
    pub fn tab_status(&self, tab_id: TabId) -> TabStatus {
        self.registry.status(tab_id)
    }

    /// The tab registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &TabRegistry {
        &self.registry
    }

    /// Current debugger session.
    #[inline]
    #[must_use]
    pub fn session(&self) -> Option<DebuggerSession> {
        self.session
    }

    /// Tab under the debugger.
    #[inline]
    #[must_use]
    pub fn debugged_tab(&self) -> Option<TabId> {
        self.session.map(|session| session.tab_id)
    }

    /// Element selection mode.
    #[inline]
    #[must_use]
    pub fn selection_mode(&self) -> bool {
        self.selection_mode
    }

    /// Selection synchronization with the IDE.
    #[inline]
    #[must_use]
    pub fn synchronize_selection(&self) -> bool {
        self.synchronize_selection
    }

    /// IDE version from the last accepted `init`.
    #[inline]
    #[must_use]
    pub fn ide_version(&self) -> Option<&str> {
        self.ide_version.as_deref()
    }

    /// Last measured viewport.
    #[inline]
    #[must_use]
    pub fn viewport(&self) -> ViewPort {
        self.viewport
    }

    /// Window presets.
    #[inline]
    #[must_use]
    pub fn presets(&self) -> &Presets {
        &self.presets
    }

    /// Returns `true` if the IDE socket is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_ready()
    }

    /// Envelopes waiting for the IDE socket.
    #[inline]
    #[must_use]
    pub fn pending_messages(&self) -> usize {
        self.transport.pending_len()
    }

    /// Subscribes to page inspection property changes.
    #[must_use]
    pub fn subscribe_property_changes(&self) -> broadcast::Receiver<PropertyChange> {
        self.property_tx.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;

    use super::harness::Harness;
    use crate::host::fake::FakeConnector;

    #[tokio::test]
    async fn test_install_sends_ready() {
        let mut h = Harness::new().await;
        h.host(HostEvent::Installed {
            version: "1.2".into(),
        })
        .await;
        assert_eq!(h.sent(), vec![json!({"message": "ready", "version": "1.2"})]);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let h = Harness::unstarted();
        let config = BridgeConfig::new().with_server_url("http://127.0.0.1:62242/");
        let result = Bridge::with_connector(config, h.hosts(), FakeConnector::new());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_messages_queue_until_connected() {
        let mut h = Harness::unstarted();
        h.bridge.start();
        h.bridge.settle().await;
        h.open_tab(7, "https://x").await;

        assert!(!h.bridge.is_connected());
        assert_eq!(h.bridge.pending_messages(), 2);

        h.connector.open();
        h.bridge.settle().await;

        let sent = h.sent();
        assert_eq!(sent[0]["message"], "init");
        assert_eq!(sent[1]["message"], "load_resize_options");
        assert_eq!(h.bridge.pending_messages(), 0);
    }

    #[tokio::test]
    async fn test_reconnect_after_close_flushes_backlog() {
        let mut h = Harness::new().await;
        h.managed_tab(7, "https://x").await;

        h.connector.close();
        h.bridge.settle().await;
        assert!(!h.bridge.is_connected());

        h.browser.add_tab(7, "https://y");
        h.host(HostEvent::TabUpdated(Harness::tab_info(7, "https://y"))).await;
        h.host(HostEvent::TabRemoved {
            tab_id: TabId::new(7),
        })
        .await;

        assert_eq!(h.connector.attempts(), vec![1, 2]);
        assert_eq!(h.bridge.pending_messages(), 2);

        h.connector.open();
        h.bridge.settle().await;
        assert_eq!(
            h.sent(),
            vec![
                json!({"message": "urlchange", "tabId": 7, "url": "https://y"}),
                json!({"message": "close", "tabId": 7}),
            ]
        );
    }

    #[tokio::test]
    async fn test_frames_survive_remote_hang_up() {
        let mut h = Harness::new().await;
        h.managed_tab(7, "https://x").await;

        // Written but never read by the socket before it went down
        h.ide(json!({"message": "save_resize_options", "resizeOptions": "[]"}))
            .await;
        h.connector.close();

        // The tab closes before the bridge has seen the hang-up
        h.bridge.handle_host_event(HostEvent::TabRemoved {
            tab_id: TabId::new(7),
        });
        assert_eq!(h.connector.attempts(), vec![1, 2]);

        h.bridge.settle().await;
        assert!(!h.bridge.is_connected());
        assert_eq!(h.bridge.pending_messages(), 2);

        h.connector.open();
        h.bridge.settle().await;
        assert_eq!(
            h.sent(),
            vec![
                json!({"message": "save_resize_options", "resizeOptions": "[]"}),
                json!({"message": "close", "tabId": 7}),
            ]
        );
    }

    #[tokio::test]
    async fn test_context_menu_toggles_selection_mode() {
        let mut h = Harness::new().await;

        h.host(HostEvent::SelectionModeToggled).await;
        assert!(h.bridge.selection_mode());
        h.host(HostEvent::SelectionModeToggled).await;
        assert!(!h.bridge.selection_mode());

        assert_eq!(
            h.sent(),
            vec![
                json!({"message": "selection_mode", "selectionMode": true}),
                json!({"message": "selection_mode", "selectionMode": false}),
            ]
        );
    }

    #[tokio::test]
    async fn test_property_change_broadcast() {
        let mut h = Harness::new().await;
        let mut changes = h.bridge.subscribe_property_changes();

        h.ide(json!({
            "message": "pageInspectionPropertyChange",
            "propertyName": "synchronizeSelection",
            "propertyValue": true
        }))
        .await;

        assert!(h.bridge.synchronize_selection());
        let change = changes.try_recv().expect("notified");
        assert_eq!(change.name, "synchronizeSelection");
        assert_eq!(change.value, json!(true));
    }

    #[tokio::test]
    async fn test_run_loop_end_to_end() {
        let h = Harness::unstarted();
        let connector = Arc::clone(&h.connector);
        let (host_tx, host_rx) = mpsc::unbounded_channel();
        let (local_tx, local_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(h.bridge.run(host_rx, local_rx));

        // Wait for the startup connection attempt
        for _ in 0..200 {
            if !connector.attempts().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        connector.open();

        host_tx
            .send(HostEvent::Installed {
                version: "3.0".into(),
            })
            .expect("loop alive");

        let (call, answer) = LocalCall::new(json!({"type": "getState"}));
        local_tx.send(call).expect("loop alive");
        let state = tokio::time::timeout(Duration::from_secs(5), answer)
            .await
            .expect("answered in time")
            .expect("answered");
        assert!(matches!(state, LocalResponse::State(_)));

        let mut sent = Vec::new();
        for _ in 0..200 {
            sent.extend(connector.take_sent());
            if !sent.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(sent, vec![json!({"message": "ready", "version": "3.0"})]);

        drop(host_tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop stops")
            .expect("loop task");
    }
}
