//! Deterministic bridge driver for tests.
//!
//! Every step hands one event to the bridge and then settles it, so all
//! spawned host calls have completed before the test looks at the fakes.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use crate::config::BridgeConfig;
use crate::host::fake::{FakeBrowser, FakeConnector};
use crate::host::{HostEvent, Hosts, MemoryStorage, TabInfo};
use crate::identifiers::{TabId, WindowId};
use crate::protocol::LocalCall;

use super::Bridge;

pub(crate) struct Harness {
    pub(crate) bridge: Bridge,
    pub(crate) browser: Arc<FakeBrowser>,
    pub(crate) storage: Arc<MemoryStorage>,
    pub(crate) connector: Arc<FakeConnector>,
}

impl Harness {
    /// Bridge built but not started; nothing connected.
    pub(crate) fn unstarted() -> Self {
        // RUST_LOG=ide_browser_bridge=trace to see the traffic
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let browser = Arc::new(FakeBrowser::new());
        let storage = Arc::new(MemoryStorage::new());
        let connector = FakeConnector::new();
        let hosts = Hosts {
            tabs: browser.clone(),
            windows: browser.clone(),
            debugger: browser.clone(),
            storage: storage.clone(),
        };
        let config = BridgeConfig::new().with_warning_recheck_delay(Duration::from_millis(5));
        let bridge = Bridge::with_connector(config, hosts, connector.clone()).expect("valid config");

        Self {
            bridge,
            browser,
            storage,
            connector,
        }
    }

    /// Started bridge with an open IDE socket.
    pub(crate) async fn new() -> Self {
        let mut harness = Self::unstarted();
        harness.start().await;
        harness
    }

    pub(crate) async fn start(&mut self) {
        self.bridge.start();
        self.connector.open();
        self.bridge.settle().await;
    }

    pub(crate) fn hosts(&self) -> Hosts {
        self.bridge.hosts.clone()
    }

    pub(crate) fn tab_info(tab: u32, url: &str) -> TabInfo {
        TabInfo {
            id: TabId::new(tab),
            window_id: WindowId::new(1),
            url: (!url.is_empty()).then(|| url.to_string()),
            active: true,
        }
    }

    pub(crate) async fn host(&mut self, event: HostEvent) {
        self.bridge.handle_host_event(event);
        self.bridge.settle().await;
    }

    /// Delivers an IDE envelope over the socket.
    pub(crate) async fn ide(&mut self, message: Value) {
        self.connector.deliver(message.to_string());
        self.bridge.settle().await;
    }

    /// Sends a local request and returns its JSON answer.
    pub(crate) async fn local(&mut self, request: Value) -> Value {
        let (call, answer) = LocalCall::new(request);
        self.bridge.handle_local(call);
        self.bridge.settle().await;
        let answer = answer.await.expect("local request answered");
        serde_json::to_value(answer).expect("answer serializes")
    }

    /// Frames sent to the IDE since the last call.
    pub(crate) fn sent(&self) -> Vec<Value> {
        self.connector.take_sent()
    }

    /// Opens a tab and lets it load `url`; the IDE has not answered yet.
    pub(crate) async fn open_tab(&mut self, tab: u32, url: &str) {
        self.browser.add_tab(tab, url);
        self.host(HostEvent::TabCreated {
            tab_id: TabId::new(tab),
        })
        .await;
        self.host(HostEvent::TabUpdated(Self::tab_info(tab, url)))
            .await;
    }

    /// A MANAGED tab, with the traffic that got it there discarded.
    pub(crate) async fn managed_tab(&mut self, tab: u32, url: &str) {
        self.open_tab(tab, url).await;
        self.ide(json!({"message": "init", "tabId": tab, "status": "accepted", "version": "2024.1"}))
            .await;
        self.sent();
        self.browser.clear_calls();
    }

    /// A MANAGED tab under the debugger, traffic discarded.
    pub(crate) async fn debugged_tab(&mut self, tab: u32, url: &str) {
        if !self.bridge.registry.is_managed(TabId::new(tab)) {
            self.managed_tab(tab, url).await;
        }
        self.ide(json!({"message": "attach_debugger", "tabId": tab}))
            .await;
        assert_eq!(self.bridge.debugged_tab(), Some(TabId::new(tab)));
        self.sent();
        self.browser.clear_calls();
    }
}
