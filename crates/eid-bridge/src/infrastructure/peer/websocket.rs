//! WebSocket transport to a running AusweisApp2 instance.
//!
//! The desktop AusweisApp2 exposes the SDK protocol on a local WebSocket
//! endpoint (`ws://127.0.0.1:24727/eID-Kernel` by default).  Every text frame
//! sent is one command; every text frame received is one message.
//!
//! # Tasks
//!
//! ```text
//! WebSocketPeer::send ──► unbounded mpsc ──► writer task ──► WebSocket sink
//!
//! WebSocket stream ──► reader task (spawned by initialize) ──► PeerCallback
//! ```
//!
//! `send` never awaits: it only queues the string for the writer task, which
//! keeps the [`Peer`] contract synchronous.  Once the writer task has stopped,
//! `send` reports [`PeerError::Transport`] with the write error that stopped
//! it, or [`PeerError::Disconnected`] if the socket simply closed.

use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::domain::peer::{Peer, PeerCallback, PeerError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A [`Peer`] backed by a WebSocket connection to the eID SDK.
pub struct WebSocketPeer {
    outgoing: mpsc::UnboundedSender<String>,
    /// Read half, handed to the reader task on the first `initialize`.
    incoming: Mutex<Option<SplitStream<WsStream>>>,
    /// Set by the writer task when a write fails.
    write_error: Arc<Mutex<Option<String>>>,
    runtime: Handle,
}

impl WebSocketPeer {
    /// Connects to the SDK endpoint at `url` and starts the writer task.
    ///
    /// No messages are read until [`Peer::initialize`] registers a callback.
    ///
    /// # Errors
    ///
    /// Returns an error if the WebSocket handshake fails, typically because
    /// AusweisApp2 is not running.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use eid_bridge::infrastructure::peer::WebSocketPeer;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let peer = WebSocketPeer::connect("ws://127.0.0.1:24727/eID-Kernel").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (ws_stream, _response) = connect_async(url)
            .await
            .with_context(|| format!("failed to connect to eID SDK at {url}"))?;
        info!("connected to eID SDK at {url}");

        let (mut sink, stream) = ws_stream.split();
        let (outgoing, mut queue) = mpsc::unbounded_channel::<String>();
        let write_error = Arc::new(Mutex::new(None));

        let writer_error = Arc::clone(&write_error);
        tokio::spawn(async move {
            while let Some(wire) = queue.recv().await {
                if let Err(e) = sink.send(WsMessage::Text(wire)).await {
                    warn!("eID SDK WebSocket write failed: {e}");
                    *writer_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(e.to_string());
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("eID SDK writer task finished");
        });

        Ok(Self {
            outgoing,
            incoming: Mutex::new(Some(stream)),
            write_error,
            runtime: Handle::current(),
        })
    }
}

impl Peer for WebSocketPeer {
    fn initialize(&self, callback: PeerCallback) -> bool {
        let stream = self
            .incoming
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match stream {
            Some(stream) => {
                self.runtime.spawn(read_messages(stream, callback));
                true
            }
            None => {
                warn!("eID SDK WebSocket already has a message callback");
                false
            }
        }
    }

    fn send(&self, wire: &str) -> Result<(), PeerError> {
        self.outgoing.send(wire.to_string()).map_err(|_| {
            match self.write_error.lock().unwrap_or_else(PoisonError::into_inner).clone() {
                Some(reason) => PeerError::Transport(reason),
                None => PeerError::Disconnected,
            }
        })
    }
}

/// Forwards every text frame to `callback` until the socket closes.
async fn read_messages(mut stream: SplitStream<WsStream>, callback: PeerCallback) {
    loop {
        let frame = match stream.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                debug!("eID SDK WebSocket closed");
                break;
            }
            Some(Err(e)) => {
                warn!("eID SDK WebSocket error: {e}");
                break;
            }
            None => {
                debug!("eID SDK stream ended");
                break;
            }
        };

        match frame {
            WsMessage::Text(text) => callback(text),
            WsMessage::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => callback(text),
                Err(_) => warn!("ignoring non-UTF-8 binary frame from eID SDK"),
            },
            WsMessage::Close(_) => {
                debug!("eID SDK sent Close frame");
                break;
            }
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
