//! Tab registry and management lifecycle.
//!
//! # State Machine
//!
//! ```text
//!            load URL              init accepted
//!   NEW ───────────────► UNCONFIRMED ──────────────► MANAGED ──┐
//!    │                    │      │                      ▲      │ URL change
//!    │ close              │      │ init rejected        └──────┘ (urlchange)
//!    ▼                    │      ▼
//!  (gone)          close  │    (gone)
//!                         ▼
//!                 UNCONFIRMED+closed ── any init reply ──► (gone, `close` if accepted)
//! ```
//!
//! A record exists only for NEW, UNCONFIRMED, and MANAGED tabs. Absence
//! means NOT_MANAGED; [`TabRegistry::status`] is the only place that
//! mapping happens.
//!
//! Transitions return an outcome describing what the caller must tell the
//! IDE, so the registry itself stays free of I/O.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::identifiers::TabId;

// ============================================================================
// TabStatus
// ============================================================================

/// Management status of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabStatus {
    /// Opened, nothing loaded yet.
    New,
    /// The IDE has been asked, no answer yet.
    Unconfirmed,
    /// The IDE controls the tab.
    Managed,
    /// Unknown or refused.
    NotManaged,
}

// ============================================================================
// TabRecord
// ============================================================================

/// Registry entry for a tab that is not NOT_MANAGED.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabRecord {
    status: TabStatus,
    url: Option<String>,
    closed: bool,
}

impl TabRecord {
    fn new() -> Self {
        Self {
            status: TabStatus::New,
            url: None,
            closed: false,
        }
    }

    /// Lifecycle state.
    #[inline]
    #[must_use]
    pub fn status(&self) -> TabStatus {
        self.status
    }

    /// Last known URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Closed while waiting for the IDE's answer.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of a tab navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// NEW tab loaded a URL: ask the IDE about it.
    AskIde {
        /// The URL to report.
        url: String,
    },
    /// MANAGED tab moved to a different URL.
    UrlChanged {
        /// The new URL.
        url: String,
    },
    /// MANAGED tab reloaded the same URL.
    Unchanged,
    /// UNCONFIRMED tab navigated; the answer is still pending.
    AwaitingConfirmation,
    /// Tab is not tracked.
    Untracked,
}

/// Result of a tab closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalOutcome {
    /// MANAGED tab closed: tell the IDE.
    NotifyIde,
    /// UNCONFIRMED tab closed: record kept until the IDE answers.
    Deferred,
    /// Record dropped silently.
    Forgotten,
}

/// Result of the IDE answering an `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Tab is now MANAGED.
    Managed,
    /// Accepted, but the tab closed meanwhile: tell the IDE it is gone.
    ClosedWhileWaiting,
    /// Rejected: record dropped.
    Rejected,
    /// No record for the tab.
    UnknownTab,
    /// The tab was not waiting for an answer.
    NotRequested,
}

// ============================================================================
// TabRegistry
// ============================================================================

/// In-memory tab registry.
#[derive(Debug, Clone, Default)]
pub struct TabRegistry {
    tabs: FxHashMap<TabId, TabRecord>,
}

impl TabRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status of any tab; untracked tabs are NOT_MANAGED.
    #[must_use]
    pub fn status(&self, tab_id: TabId) -> TabStatus {
        self.tabs
            .get(&tab_id)
            .map_or(TabStatus::NotManaged, TabRecord::status)
    }

    /// Shorthand for `status(tab_id) == Managed`.
    #[inline]
    #[must_use]
    pub fn is_managed(&self, tab_id: TabId) -> bool {
        self.status(tab_id) == TabStatus::Managed
    }

    /// Returns the record of a tracked tab.
    #[inline]
    #[must_use]
    pub fn get(&self, tab_id: TabId) -> Option<&TabRecord> {
        self.tabs.get(&tab_id)
    }

    /// Number of tracked tabs.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    /// Returns `true` if no tab is tracked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Iterates over tracked tabs.
    pub fn iter(&self) -> impl Iterator<Item = (TabId, &TabRecord)> {
        self.tabs.iter().map(|(id, record)| (*id, record))
    }

    /// Tab opened: start tracking it as NEW.
    pub fn tab_created(&mut self, tab_id: TabId) {
        self.tabs.insert(tab_id, TabRecord::new());
        debug!(tab_id = %tab_id, "Tab tracked");
    }

    /// Tab loaded `url`.
    pub fn tab_navigated(&mut self, tab_id: TabId, url: &str) -> NavigationOutcome {
        let Some(record) = self.tabs.get_mut(&tab_id) else {
            return NavigationOutcome::Untracked;
        };

        match record.status {
            TabStatus::New => {
                record.status = TabStatus::Unconfirmed;
                record.url = Some(url.to_string());
                NavigationOutcome::AskIde {
                    url: url.to_string(),
                }
            }
            TabStatus::Unconfirmed => NavigationOutcome::AwaitingConfirmation,
            TabStatus::Managed => {
                if record.url.as_deref() == Some(url) {
                    NavigationOutcome::Unchanged
                } else {
                    record.url = Some(url.to_string());
                    NavigationOutcome::UrlChanged {
                        url: url.to_string(),
                    }
                }
            }
            TabStatus::NotManaged => NavigationOutcome::Untracked,
        }
    }

    /// Tab closed.
    pub fn tab_removed(&mut self, tab_id: TabId) -> RemovalOutcome {
        match self.status(tab_id) {
            TabStatus::Unconfirmed => {
                if let Some(record) = self.tabs.get_mut(&tab_id) {
                    record.closed = true;
                }
                RemovalOutcome::Deferred
            }
            TabStatus::Managed => {
                self.tabs.remove(&tab_id);
                RemovalOutcome::NotifyIde
            }
            TabStatus::New | TabStatus::NotManaged => {
                self.tabs.remove(&tab_id);
                RemovalOutcome::Forgotten
            }
        }
    }

    /// The IDE answered the `init` question for a tab.
    pub fn confirm(&mut self, tab_id: TabId, accepted: bool) -> ConfirmationOutcome {
        let Some(record) = self.tabs.get_mut(&tab_id) else {
            return ConfirmationOutcome::UnknownTab;
        };

        if record.status != TabStatus::Unconfirmed {
            return ConfirmationOutcome::NotRequested;
        }

        if !accepted {
            self.tabs.remove(&tab_id);
            return ConfirmationOutcome::Rejected;
        }

        if record.closed {
            self.tabs.remove(&tab_id);
            return ConfirmationOutcome::ClosedWhileWaiting;
        }

        record.status = TabStatus::Managed;
        ConfirmationOutcome::Managed
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    const TAB: TabId = TabId::new(7);

    fn managed(url: &str) -> TabRegistry {
        let mut registry = TabRegistry::new();
        registry.tab_created(TAB);
        registry.tab_navigated(TAB, url);
        assert_eq!(registry.confirm(TAB, true), ConfirmationOutcome::Managed);
        registry
    }

    #[test]
    fn test_untracked_is_not_managed() {
        let registry = TabRegistry::new();
        assert_eq!(registry.status(TAB), TabStatus::NotManaged);
        assert!(registry.get(TAB).is_none());
    }

    #[test]
    fn test_new_to_unconfirmed() {
        let mut registry = TabRegistry::new();
        registry.tab_created(TAB);
        assert_eq!(registry.status(TAB), TabStatus::New);

        let outcome = registry.tab_navigated(TAB, "https://x");
        assert_eq!(
            outcome,
            NavigationOutcome::AskIde {
                url: "https://x".into()
            }
        );
        assert_eq!(registry.status(TAB), TabStatus::Unconfirmed);
        assert_eq!(registry.get(TAB).and_then(TabRecord::url), Some("https://x"));
    }

    #[test]
    fn test_unconfirmed_navigation_waits() {
        let mut registry = TabRegistry::new();
        registry.tab_created(TAB);
        registry.tab_navigated(TAB, "https://x");
        assert_eq!(
            registry.tab_navigated(TAB, "https://y"),
            NavigationOutcome::AwaitingConfirmation
        );
        assert_eq!(registry.get(TAB).and_then(TabRecord::url), Some("https://x"));
    }

    #[test]
    fn test_accept_and_reject() {
        let registry = managed("https://x");
        assert!(registry.is_managed(TAB));

        let mut registry = TabRegistry::new();
        registry.tab_created(TAB);
        registry.tab_navigated(TAB, "https://x");
        assert_eq!(registry.confirm(TAB, false), ConfirmationOutcome::Rejected);
        assert_eq!(registry.status(TAB), TabStatus::NotManaged);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_confirm_unknown_or_unrequested() {
        let mut registry = TabRegistry::new();
        assert_eq!(registry.confirm(TAB, true), ConfirmationOutcome::UnknownTab);

        registry.tab_created(TAB);
        assert_eq!(registry.confirm(TAB, true), ConfirmationOutcome::NotRequested);
        assert_eq!(registry.status(TAB), TabStatus::New);

        let mut registry = managed("https://x");
        assert_eq!(registry.confirm(TAB, false), ConfirmationOutcome::NotRequested);
        assert!(registry.is_managed(TAB));
    }

    #[test]
    fn test_url_change_only_when_different() {
        let mut registry = managed("https://x");
        assert_eq!(
            registry.tab_navigated(TAB, "https://x"),
            NavigationOutcome::Unchanged
        );
        assert_eq!(
            registry.tab_navigated(TAB, "https://y"),
            NavigationOutcome::UrlChanged {
                url: "https://y".into()
            }
        );
        assert_eq!(
            registry.tab_navigated(TAB, "https://y"),
            NavigationOutcome::Unchanged
        );
    }

    #[test]
    fn test_managed_close() {
        let mut registry = managed("https://x");
        assert_eq!(registry.tab_removed(TAB), RemovalOutcome::NotifyIde);
        assert!(registry.get(TAB).is_none());
    }

    #[test]
    fn test_unconfirmed_close_then_accept() {
        let mut registry = TabRegistry::new();
        registry.tab_created(TAB);
        registry.tab_navigated(TAB, "https://x");

        assert_eq!(registry.tab_removed(TAB), RemovalOutcome::Deferred);
        assert!(registry.get(TAB).is_some_and(TabRecord::is_closed));

        assert_eq!(
            registry.confirm(TAB, true),
            ConfirmationOutcome::ClosedWhileWaiting
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unconfirmed_close_then_reject() {
        let mut registry = TabRegistry::new();
        registry.tab_created(TAB);
        registry.tab_navigated(TAB, "https://x");
        registry.tab_removed(TAB);

        assert_eq!(registry.confirm(TAB, false), ConfirmationOutcome::Rejected);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_new_close_is_silent() {
        let mut registry = TabRegistry::new();
        registry.tab_created(TAB);
        assert_eq!(registry.tab_removed(TAB), RemovalOutcome::Forgotten);
        assert_eq!(registry.tab_removed(TAB), RemovalOutcome::Forgotten);
        assert!(registry.is_empty());
    }

    #[derive(Debug, Clone)]
    enum Step {
        Create(u32),
        Navigate(u32, bool),
        Remove(u32),
        Confirm(u32, bool),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            (0u32..4).prop_map(Step::Create),
            (0u32..4, any::<bool>()).prop_map(|(t, b)| Step::Navigate(t, b)),
            (0u32..4).prop_map(Step::Remove),
            (0u32..4, any::<bool>()).prop_map(|(t, b)| Step::Confirm(t, b)),
        ]
    }

    proptest! {
        #[test]
        fn records_exist_only_for_tracked_states(steps in prop::collection::vec(step(), 0..64)) {
            let mut registry = TabRegistry::new();
            for step in steps {
                match step {
                    Step::Create(t) => registry.tab_created(TabId::new(t)),
                    Step::Navigate(t, b) => {
                        registry.tab_navigated(TabId::new(t), if b { "https://a" } else { "https://b" });
                    }
                    Step::Remove(t) => {
                        registry.tab_removed(TabId::new(t));
                    }
                    Step::Confirm(t, b) => {
                        registry.confirm(TabId::new(t), b);
                    }
                }

                for (tab_id, record) in registry.iter() {
                    prop_assert_ne!(record.status(), TabStatus::NotManaged);
                    prop_assert!(!(record.is_closed() && record.status() == TabStatus::Managed));
                    prop_assert_eq!(registry.status(tab_id), record.status());
                }
            }
        }
    }
}
