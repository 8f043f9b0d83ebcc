//! [`Peer`](crate::domain::Peer) implementations.
//!
//! - [`WebSocketPeer`]: a running AusweisApp2 reached over its local WebSocket.
//! - [`ScriptedPeer`]: in-memory double with scripted replies, for tests.

pub mod mock;
pub mod websocket;

pub use mock::ScriptedPeer;
pub use websocket::WebSocketPeer;
