//! Infrastructure layer for eid-bridge.
//!
//! Everything that touches the outside world: the WebSocket connection to
//! AusweisApp2, the config file, and the terminal.
//!
//! # What does NOT belong here?
//!
//! - Session state or event fan-out (that is the application layer)
//! - Command and message encoding (that is `eid-core`)

pub mod peer;
pub mod prompt;
pub mod storage;

pub use prompt::TerminalPrompt;
