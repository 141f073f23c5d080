//! Lazily connected transport with an outbound queue.
//!
//! # Lifecycle
//!
//! 1. `send` while no socket exists starts a connection attempt and queues
//! 2. `send` while the attempt is pending queues
//! 3. `Opened` flushes the queue in FIFO order, exactly once
//! 4. `send` while open writes immediately
//! 5. `Closed` drops the socket; the queue survives for the next attempt
//!    and frames the socket never wrote go back to its front
//! 6. A write to a dead socket requeues the frame and reconnects

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::protocol::ExtensionMessage;

use super::connection::{Connector, TransportEvent};

// ============================================================================
// SocketState
// ============================================================================

/// Socket state.
enum SocketState {
    /// No socket.
    Idle,
    /// Attempt in progress.
    Connecting,
    /// Open; frames go to the writer.
    Ready(mpsc::UnboundedSender<String>),
}

// ============================================================================
// Transport
// ============================================================================

/// Single-socket transport to the IDE.
pub struct Transport {
    /// IDE endpoint.
    url: String,
    /// Opens sockets.
    connector: Arc<dyn Connector>,
    /// Handed to every attempt.
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    /// Current socket.
    socket: SocketState,
    /// Current attempt; events from older ones are ignored.
    generation: u64,
    /// Encoded envelopes waiting for a socket.
    pending: VecDeque<String>,
    /// Log every frame.
    debug: bool,
}

impl Transport {
    /// Creates a disconnected transport.
    pub fn new(
        url: impl Into<String>,
        connector: Arc<dyn Connector>,
        events_tx: mpsc::UnboundedSender<TransportEvent>,
        debug: bool,
    ) -> Self {
        Self {
            url: url.into(),
            connector,
            events_tx,
            socket: SocketState::Idle,
            generation: 0,
            pending: VecDeque::new(),
            debug,
        }
    }

    /// Starts a connection attempt if there is no socket.
    ///
    /// Returns whether the socket is ready right now.
    pub fn connect_if_needed(&mut self) -> bool {
        if matches!(self.socket, SocketState::Idle) {
            self.generation += 1;
            self.socket = SocketState::Connecting;
            debug!(url = %self.url, generation = self.generation, "Connecting to IDE");
            self.connector
                .connect(&self.url, self.generation, self.events_tx.clone());
        }
        self.is_ready()
    }

    /// Sends an envelope now, or queues it until the socket opens.
    pub fn send(&mut self, message: ExtensionMessage) {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, tag = message.tag(), "Failed to encode message");
                return;
            }
        };
        self.send_frame(text);
    }

    /// Applies a socket event; returns an inbound frame for the router.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<String> {
        match event {
            TransportEvent::Closed {
                generation,
                reason,
                unsent,
            } => {
                self.socket_closed(generation, reason, unsent);
                None
            }

            event if event.generation() != self.generation => {
                debug!(
                    generation = event.generation(),
                    current = self.generation,
                    "Ignoring event from stale socket"
                );
                None
            }

            TransportEvent::Opened { writer, .. } => {
                info!(url = %self.url, "Connected to IDE");
                self.socket = SocketState::Ready(writer);
                self.flush_pending();
                None
            }

            TransportEvent::Message { text, .. } => {
                if self.debug {
                    debug!(message = %text, "Received message");
                }
                Some(text)
            }
        }
    }

    /// Returns `true` if the socket is open.
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.socket, SocketState::Ready(_))
    }

    /// Number of queued envelopes.
    #[inline]
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Current connection attempt.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// IDE endpoint.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn send_frame(&mut self, text: String) {
        if self.connect_if_needed() {
            self.transmit(text);
        } else {
            self.pending.push_back(text);
        }
    }

    fn socket_closed(&mut self, generation: u64, reason: Option<String>, unsent: Vec<String>) {
        if generation == self.generation {
            match reason {
                Some(reason) => warn!(%reason, "Socket error!"),
                None => debug!("Socket closed"),
            }
            self.socket = SocketState::Idle;
        } else {
            debug!(generation, current = self.generation, "Stale socket closed");
        }

        if unsent.is_empty() {
            return;
        }
        warn!(generation, count = unsent.len(), "Requeueing frames the socket never wrote");

        if self.is_ready() {
            for text in unsent {
                self.transmit(text);
            }
        } else {
            for text in unsent.into_iter().rev() {
                self.pending.push_front(text);
            }
        }
    }

    fn flush_pending(&mut self) {
        let queued = std::mem::take(&mut self.pending);
        if !queued.is_empty() {
            debug!(count = queued.len(), "Sending pending messages");
        }
        for text in queued {
            self.send_frame(text);
        }
    }

    fn transmit(&mut self, text: String) {
        let SocketState::Ready(writer) = &self.socket else {
            self.pending.push_back(text);
            return;
        };

        if self.debug {
            debug!(message = %text, "Sent message");
        }

        if let Err(mpsc::error::SendError(text)) = writer.send(text) {
            warn!(error = %Error::ConnectionClosed, "Socket writer gone, reconnecting");
            self.socket = SocketState::Idle;
            self.pending.push_back(text);
            self.connect_if_needed();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
