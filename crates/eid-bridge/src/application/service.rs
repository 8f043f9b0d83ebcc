//! The service facade: single entry point to the eID SDK.
//!
//! [`EidService`] owns the peer handle and the one callback registered with
//! it.  Collaborators receive the service (or its dispatcher) by reference;
//! there is no hidden global instance.
//!
//! # Threading model
//!
//! ```text
//! caller ──send_command──► encode ──► [send lock] ──► peer.send
//!
//! peer thread ──callback──► inbox (unbounded mpsc)
//!                               │
//!                               ▼
//!                      dispatch task (one per service)
//!                        decode → SessionTracker → watch<SessionState>
//!                                               → EventDispatcher::publish
//! ```
//!
//! The callback does nothing except enqueue the raw string, so it never
//! blocks the peer's thread.  The dispatch task is the only place the session
//! tracker is touched and the only place subscribers are invoked, so
//! concurrent callback deliveries and concurrent `send_command` calls cannot
//! race on either.
//!
//! The SDK protocol has no correlation identifiers.  Commands are therefore
//! issued one at a time under a mutex, in the order callers submit them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use eid_core::{decode_message, encode_command, Command, EncodeError, SessionState, SessionTracker};

use crate::application::dispatcher::EventDispatcher;
use crate::domain::config::BridgeConfig;
use crate::domain::peer::{Peer, PeerCallback, PeerError};

// ── Error types ───────────────────────────────────────────────────────────────

/// Failure to start the service.  The service stays usable; `start` may be
/// retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StartupError {
    /// `start` was called outside a Tokio runtime, so the dispatch task
    /// cannot be spawned.
    #[error("no Tokio runtime available for the dispatch task")]
    NoRuntime,

    /// The peer refused to register the message callback.
    #[error("eID SDK could not be initialized")]
    InitializationRejected,
}

/// Local failure while issuing a command.
///
/// Problems the SDK reports about a command (`BAD_STATE`, `INVALID`, ...)
/// arrive later as ordinary events, never as a `SendError`.
#[derive(Debug, Error, PartialEq)]
pub enum SendError {
    /// `send_command` was called before a successful `start`.
    #[error("service has not been started")]
    NotStarted,

    /// The command could not be serialized.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The peer did not accept the command string.
    #[error(transparent)]
    Peer(#[from] PeerError),
}

// ── Internals ─────────────────────────────────────────────────────────────────

/// Items processed by the dispatch task, in arrival order.
#[derive(Debug)]
enum Inbound {
    /// A raw message string from the peer.
    Message(String),
    /// A local request to return the session to `Idle`.
    Reset,
}

/// State shared between the facade and its dispatch task.
struct Shared<P> {
    peer: Arc<P>,
    dispatcher: Arc<EventDispatcher>,
    config: BridgeConfig,
    /// Held across encode + send so only one command is in flight.
    send_lock: Mutex<()>,
    state_tx: watch::Sender<SessionState>,
}

impl<P: Peer> Shared<P> {
    fn send(&self, command: &Command) -> Result<(), SendError> {
        let wire = encode_command(command).map_err(|e| {
            error!("failed to encode {}: {e}", command.discriminator());
            e
        })?;

        let _guard = self.send_lock.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(
            command = command.discriminator(),
            secret = command.carries_secret(),
            "sending command to eID SDK"
        );
        self.peer.send(&wire)?;
        Ok(())
    }

    fn handle_message(&self, tracker: &mut SessionTracker, raw: &str) {
        let event = match decode_message(raw) {
            Ok(event) => event,
            Err(e) => {
                warn!("dropping message from eID SDK: {e}");
                return;
            }
        };

        if event.kind.is_peer_error() {
            warn!(kind = %event.kind, state = ?tracker.state(), "eID SDK reported an error");
        } else {
            debug!(kind = %event.kind, "received message from eID SDK");
        }

        let transition = tracker.apply(&event);
        if transition.changed() {
            info!(
                from = ?transition.from,
                to = ?transition.to,
                attempt = ?tracker.attempt_id(),
                "session state changed"
            );
            self.state_tx.send_replace(transition.to);
        }

        // Published after the state update so subscribers observe the new state.
        self.dispatcher.publish(&event);
    }

    fn reset(&self, tracker: &mut SessionTracker) {
        let transition = tracker.reset();
        if transition.changed() {
            info!(from = ?transition.from, "session reset to Idle");
        }
        self.state_tx.send_replace(SessionState::Idle);
    }

    fn expire(&self, tracker: &mut SessionTracker) {
        warn!(
            state = ?tracker.state(),
            attempt = ?tracker.attempt_id(),
            "no message from eID SDK within {:?}; abandoning session",
            self.config.await_timeout
        );
        self.reset(tracker);

        if self.config.cancel_on_timeout {
            if let Err(e) = self.send(&Command::Cancel) {
                warn!("failed to cancel timed-out workflow: {e}");
            }
        }
    }
}

/// Processes peer messages and local resets until every sender is gone.
async fn run_dispatch_loop<P: Peer>(mut inbox: mpsc::UnboundedReceiver<Inbound>, shared: Arc<Shared<P>>) {
    let mut tracker = SessionTracker::new();

    loop {
        let bounded = !shared.config.await_timeout.is_zero();
        let next = if bounded && tracker.state().is_waiting() {
            // Bound the wait by the time already spent in this state, so
            // messages that do not move the state cannot extend it.
            let remaining = shared
                .config
                .await_timeout
                .saturating_sub(tracker.time_in_state());
            match timeout(remaining, inbox.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    shared.expire(&mut tracker);
                    continue;
                }
            }
        } else {
            inbox.recv().await
        };

        match next {
            Some(Inbound::Message(raw)) => shared.handle_message(&mut tracker, &raw),
            Some(Inbound::Reset) => shared.reset(&mut tracker),
            None => {
                debug!("service inbox closed; dispatch task exiting");
                break;
            }
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Coordinator between callers, the SDK peer, and event subscribers.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use eid_bridge::application::{EidService, EventDispatcher};
/// use eid_bridge::domain::BridgeConfig;
/// use eid_bridge::infrastructure::peer::ScriptedPeer;
/// use eid_core::Command;
///
/// # async fn example() -> anyhow::Result<()> {
/// let dispatcher = Arc::new(EventDispatcher::new());
/// let service = EidService::new(Arc::new(ScriptedPeer::new()), dispatcher, BridgeConfig::default());
/// service.start()?;
/// service.send_command(&Command::GetInfo)?;
/// # Ok(())
/// # }
/// ```
pub struct EidService<P> {
    shared: Arc<Shared<P>>,
    inbox_tx: mpsc::UnboundedSender<Inbound>,
    /// Present until a successful `start` hands it to the dispatch task.
    /// Also serialises concurrent `start` calls.
    inbox_rx: Mutex<Option<mpsc::UnboundedReceiver<Inbound>>>,
    started: AtomicBool,
}

impl<P: Peer + 'static> EidService<P> {
    /// Creates a service around `peer`.  Nothing is registered with the peer
    /// until [`start`](Self::start).
    pub fn new(peer: Arc<P>, dispatcher: Arc<EventDispatcher>, config: BridgeConfig) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            shared: Arc::new(Shared {
                peer,
                dispatcher,
                config,
                send_lock: Mutex::new(()),
                state_tx,
            }),
            inbox_tx,
            inbox_rx: Mutex::new(Some(inbox_rx)),
            started: AtomicBool::new(false),
        }
    }

    /// Registers the message callback with the peer and starts dispatching.
    ///
    /// Must be called from within a Tokio runtime.  Calling it again after a
    /// successful start does nothing.  If `api_level` is configured, a
    /// `SET_API_LEVEL` command is sent once the peer is ready.
    ///
    /// # Errors
    ///
    /// - [`StartupError::NoRuntime`] outside a Tokio runtime.
    /// - [`StartupError::InitializationRejected`] if the peer's
    ///   `initialize` returns `false`.
    ///
    /// In both cases the service remains usable and `start` can be retried.
    pub fn start(&self) -> Result<(), StartupError> {
        let mut inbox_rx = self.lock_inbox();
        if inbox_rx.is_none() {
            debug!("eID service already started");
            return Ok(());
        }

        let runtime = Handle::try_current().map_err(|_| StartupError::NoRuntime)?;

        let tx = self.inbox_tx.clone();
        let callback: PeerCallback = Box::new(move |raw| {
            // The receiver only disappears when the service is dropped.
            let _ = tx.send(Inbound::Message(raw));
        });

        if !self.shared.peer.initialize(callback) {
            error!("eID SDK could not be initialized");
            return Err(StartupError::InitializationRejected);
        }

        if let Some(rx) = inbox_rx.take() {
            runtime.spawn(run_dispatch_loop(rx, Arc::clone(&self.shared)));
        }
        drop(inbox_rx);
        self.started.store(true, Ordering::Release);
        info!("eID SDK is ready to receive commands");

        if let Some(level) = self.shared.config.api_level {
            if let Err(e) = self.send_command(&Command::SetApiLevel { level }) {
                warn!("failed to announce API level {level}: {e}");
            }
        }
        Ok(())
    }

    /// Encodes `command` and hands it to the peer.
    ///
    /// Fire-and-forget: any reply arrives later through the dispatcher.
    /// Sending [`Command::Cancel`] also returns the tracked session to `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] for local failures only.
    pub fn send_command(&self, command: &Command) -> Result<(), SendError> {
        if !self.is_started() {
            return Err(SendError::NotStarted);
        }

        self.shared.send(command)?;

        if matches!(command, Command::Cancel) {
            self.reset_session();
        }
        Ok(())
    }

    /// Returns the tracked session to `Idle` without contacting the peer.
    ///
    /// The reset is queued behind any messages already received.
    pub fn reset_session(&self) {
        let _ = self.inbox_tx.send(Inbound::Reset);
    }

    /// `true` after a successful [`start`](Self::start).
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// The session state as of the last processed message.
    pub fn session_state(&self) -> SessionState {
        *self.shared.state_tx.borrow()
    }

    /// A receiver that is notified on every session state change.
    pub fn watch_session(&self) -> watch::Receiver<SessionState> {
        self.shared.state_tx.subscribe()
    }

    /// The dispatcher decoded events are published to.
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.shared.dispatcher
    }

    /// The configuration the service was built with.
    pub fn config(&self) -> &BridgeConfig {
        &self.shared.config
    }

    fn lock_inbox(&self) -> MutexGuard<'_, Option<mpsc::UnboundedReceiver<Inbound>>> {
        self.inbox_rx.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
