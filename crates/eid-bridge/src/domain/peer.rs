//! The contract between the service and the SDK peer process.
//!
//! The peer is opaque.  It offers exactly two operations:
//!
//! - `initialize(callback)`: called once; the peer later invokes `callback`
//!   with every message string it emits, on a thread of its own choosing.
//! - `send(wire)`: hands one encoded command string to the peer.
//!
//! There is no request/response correlation: replies arrive through the
//! callback whenever the peer produces them.
//!
//! # Testability
//!
//! The [`Peer`] trait lets tests swap the real SDK for a scripted double
//! (see `infrastructure::peer::mock::ScriptedPeer`).

use thiserror::Error;

/// Receives raw message strings from the peer.
///
/// Invoked from a foreign thread; implementations must not block.
pub type PeerCallback = Box<dyn Fn(String) + Send + Sync + 'static>;

/// Local failures while handing a command to the peer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    /// The peer connection is gone (or was never established).
    #[error("peer connection is closed")]
    Disconnected,

    /// The transport failed while sending.
    #[error("peer transport error: {0}")]
    Transport(String),
}

/// An eID SDK instance the service can talk to.
#[cfg_attr(test, mockall::automock)]
pub trait Peer: Send + Sync {
    /// Registers the message callback.
    ///
    /// Returns `false` if the peer could not be initialised.
    fn initialize(&self, callback: PeerCallback) -> bool;

    /// Sends one encoded command string to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`PeerError`] if the command could not be handed over.  A
    /// successful return says nothing about how the peer will react.
    fn send(&self, wire: &str) -> Result<(), PeerError>;
}
