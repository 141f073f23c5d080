//! Scriptable host and connector doubles for bridge tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Value, json};
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::identifiers::{TabId, WindowId};
use crate::presets::ViewPort;
use crate::transport::{Connector, TransportEvent};

use super::{
    DebuggerHost, PopupSpec, TabHost, TabInfo, WindowHost, WindowInfo, WindowState, WindowUpdate,
};

// ============================================================================
// HostCall
// ============================================================================

/// A mutating host call, recorded in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HostCall {
    Reload { tab_id: TabId, bypass_cache: bool },
    Navigate { tab_id: TabId, url: String },
    Remove(TabId),
    CreateTab(String),
    UpdateWindow { window_id: WindowId, update: WindowUpdate },
    CreatePopup(PopupSpec),
    Attach(TabId),
    Detach(TabId),
    Command { tab_id: TabId, method: String, params: Value },
}

// ============================================================================
// FakeBrowser
// ============================================================================

#[derive(Default)]
struct BrowserState {
    tabs: FxHashMap<TabId, TabInfo>,
    calls: Vec<HostCall>,
    refuse_attach: FxHashSet<TabId>,
    responses: FxHashMap<String, std::result::Result<Value, String>>,
    viewport: Option<ViewPort>,
    focused: Option<WindowId>,
}

/// In-memory browser: tabs, windows, and a debugger that answers on cue.
#[derive(Default)]
pub(crate) struct FakeBrowser {
    state: Mutex<BrowserState>,
}

impl FakeBrowser {
    pub(crate) fn new() -> Self {
        let browser = Self::default();
        browser.state.lock().focused = Some(WindowId::new(1));
        browser
    }

    /// Adds or replaces a tab in window 1.
    pub(crate) fn add_tab(&self, tab: u32, url: &str) {
        self.add_tab_in(tab, 1, url);
    }

    pub(crate) fn add_tab_in(&self, tab: u32, window: u32, url: &str) {
        let info = TabInfo {
            id: TabId::new(tab),
            window_id: WindowId::new(window),
            url: (!url.is_empty()).then(|| url.to_string()),
            active: false,
        };
        self.state.lock().tabs.insert(info.id, info);
    }

    pub(crate) fn remove_tab(&self, tab: u32) {
        self.state.lock().tabs.remove(&TabId::new(tab));
    }

    pub(crate) fn refuse_attach(&self, tab: u32) {
        self.state.lock().refuse_attach.insert(TabId::new(tab));
    }

    /// Scripts the answer to a protocol method.
    pub(crate) fn respond(&self, method: &str, answer: std::result::Result<Value, &str>) {
        self.state
            .lock()
            .responses
            .insert(method.to_string(), answer.map_err(str::to_string));
    }

    pub(crate) fn set_viewport(&self, viewport: ViewPort) {
        self.state.lock().viewport = Some(viewport);
    }

    pub(crate) fn calls(&self) -> Vec<HostCall> {
        self.state.lock().calls.clone()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub(crate) fn attaches(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, HostCall::Attach(_)))
            .count()
    }

    fn record(&self, call: HostCall) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl TabHost for FakeBrowser {
    async fn get(&self, tab_id: TabId) -> Result<Option<TabInfo>> {
        Ok(self.state.lock().tabs.get(&tab_id).cloned())
    }

    async fn query_all(&self) -> Result<Vec<TabInfo>> {
        let mut tabs: Vec<TabInfo> = self.state.lock().tabs.values().cloned().collect();
        tabs.sort_by_key(|tab| tab.id);
        Ok(tabs)
    }

    async fn reload(&self, tab_id: TabId, bypass_cache: bool) -> Result<()> {
        self.record(HostCall::Reload {
            tab_id,
            bypass_cache,
        });
        Ok(())
    }

    async fn navigate(&self, tab_id: TabId, url: &str) -> Result<()> {
        self.record(HostCall::Navigate {
            tab_id,
            url: url.to_string(),
        });
        Ok(())
    }

    async fn remove(&self, tab_id: TabId) -> Result<()> {
        self.record(HostCall::Remove(tab_id));
        Ok(())
    }

    async fn create(&self, url: &str) -> Result<()> {
        self.record(HostCall::CreateTab(url.to_string()));
        Ok(())
    }
}

#[async_trait]
impl WindowHost for FakeBrowser {
    async fn last_focused(&self) -> Result<WindowInfo> {
        let state = self.state.lock();
        let id = state
            .focused
            .ok_or_else(|| Error::host("windows.getLastFocused", "no window"))?;
        let mut tabs: Vec<TabInfo> = state
            .tabs
            .values()
            .filter(|tab| tab.window_id == id)
            .cloned()
            .collect();
        tabs.sort_by_key(|tab| tab.id);
        Ok(WindowInfo {
            id,
            state: WindowState::Normal,
            width: Some(1280),
            height: Some(800),
            tabs,
        })
    }

    async fn update(&self, window_id: WindowId, update: WindowUpdate) -> Result<()> {
        self.record(HostCall::UpdateWindow { window_id, update });
        Ok(())
    }

    async fn create_popup(&self, popup: PopupSpec) -> Result<()> {
        self.record(HostCall::CreatePopup(popup));
        Ok(())
    }
}

#[async_trait]
impl DebuggerHost for FakeBrowser {
    async fn attach(&self, tab_id: TabId, _protocol_version: &str) -> Result<()> {
        self.record(HostCall::Attach(tab_id));
        if self.state.lock().refuse_attach.contains(&tab_id) {
            return Err(Error::debugger("Another debugger is already attached"));
        }
        Ok(())
    }

    async fn detach(&self, tab_id: TabId) -> Result<()> {
        self.record(HostCall::Detach(tab_id));
        Ok(())
    }

    async fn send_command(&self, tab_id: TabId, method: &str, params: Value) -> Result<Value> {
        self.record(HostCall::Command {
            tab_id,
            method: method.to_string(),
            params,
        });

        let state = self.state.lock();
        if let Some(answer) = state.responses.get(method) {
            return answer.clone().map_err(Error::debugger);
        }
        if method == "Runtime.evaluate" {
            let viewport = state.viewport.unwrap_or(ViewPort {
                width: 1024,
                height: 700,
                margin_width: 0,
                margin_height: 80,
                is_mac: false,
            });
            return Ok(json!({"result": {"type": "object", "value": viewport}}));
        }
        Ok(json!({}))
    }
}

// ============================================================================
// FakeConnector
// ============================================================================

#[derive(Default)]
struct ConnectorState {
    attempts: Vec<u64>,
    events: Option<mpsc::UnboundedSender<TransportEvent>>,
    frames: Option<mpsc::UnboundedReceiver<String>>,
}

/// Connector whose sockets open and close on command.
#[derive(Default)]
pub(crate) struct FakeConnector {
    state: Mutex<ConnectorState>,
}

impl Connector for FakeConnector {
    fn connect(&self, _url: &str, generation: u64, events: mpsc::UnboundedSender<TransportEvent>) {
        let mut state = self.state.lock();
        state.attempts.push(generation);
        state.events = Some(events);
    }
}

impl FakeConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn attempts(&self) -> Vec<u64> {
        self.state.lock().attempts.clone()
    }

    fn current(&self) -> Option<(u64, mpsc::UnboundedSender<TransportEvent>)> {
        let state = self.state.lock();
        Some((*state.attempts.last()?, state.events.clone()?))
    }

    /// Opens the latest attempt's socket.
    pub(crate) fn open(&self) {
        let Some((generation, events)) = self.current() else {
            return;
        };
        let (writer, frames) = mpsc::unbounded_channel();
        self.state.lock().frames = Some(frames);
        let _ = events.send(TransportEvent::Opened { generation, writer });
    }

    /// Delivers an inbound frame on the latest socket.
    pub(crate) fn deliver(&self, text: impl Into<String>) {
        if let Some((generation, events)) = self.current() {
            let _ = events.send(TransportEvent::Message {
                generation,
                text: text.into(),
            });
        }
    }

    /// Closes the latest socket; frames nobody read come back as unsent.
    pub(crate) fn close(&self) {
        let Some((generation, events)) = self.current() else {
            return;
        };
        let mut unsent = Vec::new();
        if let Some(mut frames) = self.state.lock().frames.take() {
            frames.close();
            while let Ok(text) = frames.try_recv() {
                unsent.push(text);
            }
        }
        let _ = events.send(TransportEvent::Closed {
            generation,
            reason: Some("connection reset".to_string()),
            unsent,
        });
    }

    /// Drains every frame written so far.
    pub(crate) fn take_sent(&self) -> Vec<Value> {
        let mut state = self.state.lock();
        let Some(frames) = state.frames.as_mut() else {
            return Vec::new();
        };
        let mut sent = Vec::new();
        while let Ok(text) = frames.try_recv() {
            sent.push(serde_json::from_str(&text).expect("outbound frame is JSON"));
        }
        sent
    }
}
