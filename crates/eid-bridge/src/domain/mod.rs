//! Domain layer for eid-bridge.
//!
//! Pure types with no I/O: the runtime configuration and the contract the
//! SDK peer has to fulfil.  No `tokio`, sockets, or file access in here.

pub mod config;
pub mod peer;

pub use config::BridgeConfig;
pub use peer::{Peer, PeerCallback, PeerError};
