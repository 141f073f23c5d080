//! WebSocket connection and socket loop.
//!
//! A [`Connector`] opens one socket per connection attempt and reports
//! everything that happens to it as [`TransportEvent`]s tagged with the
//! attempt's generation. The owner of the events decides what is stale.
//!
//! # Socket Loop
//!
//! [`WsConnector`] spawns a tokio task per attempt that handles:
//!
//! - Connecting to the IDE endpoint
//! - Incoming text frames (forwarded as [`TransportEvent::Message`])
//! - Outgoing frames written through the channel handed out on open
//! - Close and error reporting, handing back frames it never wrote

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};

use crate::error::Error;

// ============================================================================
// TransportEvent
// ============================================================================

/// Something that happened to a socket.
#[derive(Debug)]
pub enum TransportEvent {
    /// Socket is open; frames written to `writer` go to the IDE.
    Opened {
        /// Connection attempt.
        generation: u64,
        /// Outgoing frame channel.
        writer: mpsc::UnboundedSender<String>,
    },
    /// Text frame received.
    Message {
        /// Connection attempt.
        generation: u64,
        /// Frame payload.
        text: String,
    },
    /// Socket failed to open, errored, or closed.
    Closed {
        /// Connection attempt.
        generation: u64,
        /// Error description, if any.
        reason: Option<String>,
        /// Frames accepted by the writer but never written, oldest first.
        unsent: Vec<String>,
    },
}

impl TransportEvent {
    /// Connection attempt the event belongs to.
    #[inline]
    #[must_use]
    pub const fn generation(&self) -> u64 {
        match self {
            Self::Opened { generation, .. }
            | Self::Message { generation, .. }
            | Self::Closed { generation, .. } => *generation,
        }
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Opens sockets.
///
/// `connect` must return immediately; progress is reported on `events`.
pub trait Connector: Send + Sync {
    /// Starts connection attempt `generation` to `url`.
    fn connect(&self, url: &str, generation: u64, events: mpsc::UnboundedSender<TransportEvent>);
}

// ============================================================================
// WsConnector
// ============================================================================

/// [`Connector`] backed by `tokio-tungstenite`.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(&self, url: &str, generation: u64, events: mpsc::UnboundedSender<TransportEvent>) {
        tokio::spawn(run_socket_loop(url.to_string(), generation, events));
    }
}

/// Socket loop for one connection attempt.
async fn run_socket_loop(
    url: String,
    generation: u64,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let ws_stream = match connect_async(url.as_str()).await {
        Ok((stream, _)) => stream,
        Err(e) => {
            let error = Error::connection(e.to_string());
            debug!(%url, error = %error, "Socket error");
            let _ = events.send(TransportEvent::Closed {
                generation,
                reason: Some(error.to_string()),
                unsent: Vec::new(),
            });
            return;
        }
    };

    debug!(%url, generation, "WebSocket connection established");

    let (writer, mut outgoing) = mpsc::unbounded_channel::<String>();
    if events
        .send(TransportEvent::Opened { generation, writer })
        .is_err()
    {
        return;
    }

    let (mut ws_write, mut ws_read) = ws_stream.split();
    let mut unsent = Vec::new();

    let reason = loop {
        tokio::select! {
            // Incoming frames from the IDE
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let _ = events.send(TransportEvent::Message {
                            generation,
                            text: text.to_string(),
                        });
                    }

                    Some(Ok(Message::Close(_))) => {
                        debug!("WebSocket closed by remote");
                        break None;
                    }

                    Some(Err(e)) => {
                        let error = Error::from(e);
                        warn!(error = %error, "WebSocket error");
                        break Some(error.to_string());
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break None;
                    }

                    // Ignore Binary, Ping, Pong
                    _ => {}
                }
            }

            // Frames from the transport
            frame = outgoing.recv() => {
                match frame {
                    Some(text) => {
                        if let Err(e) = ws_write.send(Message::Text(text.clone().into())).await {
                            let error = Error::from(e);
                            warn!(error = %error, "Failed to send frame");
                            unsent.push(text);
                            break Some(error.to_string());
                        }
                        trace!(generation, "Frame sent");
                    }

                    None => {
                        debug!(generation, "Writer dropped, closing socket");
                        let _ = ws_write.close().await;
                        break None;
                    }
                }
            }
        }
    };

    // Writers fail from here on; whatever is buffered goes back to the owner
    outgoing.close();
    while let Ok(text) = outgoing.try_recv() {
        unsent.push(text);
    }
    if !unsent.is_empty() {
        debug!(generation, count = unsent.len(), "Returning unsent frames");
    }

    let _ = events.send(TransportEvent::Closed {
        generation,
        reason,
        unsent,
    });
    debug!(generation, "Socket loop terminated");
}

// ============================================================================
// Tests
// ============================================================================
