//! Tab lifecycle events.
//!
//! Feeds browser tab notifications through the [`TabRegistry`] and turns
//! its outcomes into IDE envelopes.
//!
//! [`TabRegistry`]: crate::registry::TabRegistry

use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::host::TabInfo;
use crate::identifiers::{TabId, WindowId};
use crate::protocol::ExtensionMessage;
use crate::registry::{NavigationOutcome, RemovalOutcome};

use super::Bridge;

impl Bridge {
    pub(crate) fn tab_created(&mut self, tab_id: TabId) {
        self.registry.tab_created(tab_id);
    }

    pub(crate) fn tab_updated(&mut self, tab: TabInfo) {
        let Some(url) = tab.loaded_url() else {
            trace!(tab_id = %tab.id, "Tab has no URL yet");
            return;
        };

        match self.registry.tab_navigated(tab.id, url) {
            NavigationOutcome::AskIde { url } => {
                self.send(ExtensionMessage::Init {
                    tab_id: tab.id,
                    url,
                    version: self.config.version.clone(),
                });
                if !self.presets.is_loaded() {
                    self.send(ExtensionMessage::LoadResizeOptions);
                }
            }
            NavigationOutcome::UrlChanged { url } => {
                self.send(ExtensionMessage::Urlchange { tab_id: tab.id, url });
            }
            NavigationOutcome::AwaitingConfirmation => {
                debug!(tab_id = %tab.id, "Navigation in unconfirmed tab");
            }
            NavigationOutcome::Unchanged | NavigationOutcome::Untracked => {}
        }
    }

    pub(crate) fn tab_removed(&mut self, tab_id: TabId) {
        match self.registry.tab_removed(tab_id) {
            RemovalOutcome::NotifyIde => self.send(ExtensionMessage::Close { tab_id }),
            RemovalOutcome::Deferred => {
                debug!(tab_id = %tab_id, "Unconfirmed tab closed, waiting for the IDE");
            }
            RemovalOutcome::Forgotten => {}
        }
    }

    pub(crate) fn tab_attached(&mut self, tab_id: TabId, window_id: WindowId) {
        if let Some(session) = self.session.as_mut()
            && session.tab_id == tab_id
        {
            debug!(tab_id = %tab_id, window_id = %window_id, "Debugged tab moved");
            session.window_id = Some(window_id);
        }
    }

    /// Startup: tabs opened before the bridge are seeded as NEW.
    pub(crate) fn tabs_seeded(&mut self, result: Result<Vec<TabInfo>>) {
        let tabs = match result {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!(error = %e, "Failed to list open tabs");
                return;
            }
        };

        debug!(count = tabs.len(), "Seeding open tabs");
        for tab in tabs {
            if self.registry.get(tab.id).is_some() {
                continue;
            }
            self.registry.tab_created(tab.id);
            self.tab_updated(tab);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
