//! eid-bridge library crate.
//!
//! Connects applications to the AusweisApp2 eID SDK: commands go out as JSON
//! strings, messages come back on a thread the SDK chooses, and subscribers
//! receive them as typed events.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! UI / CLI / tests
//!         ↕  EventDispatcher (typed events), EidService::send_command
//! [eid-bridge]
//!   ├── domain/           BridgeConfig, the Peer contract
//!   ├── application/      EidService, EventDispatcher, AuthFlow
//!   └── infrastructure/
//!         ├── peer/       WebSocketPeer (tokio-tungstenite), ScriptedPeer
//!         ├── storage/    TOML config file
//!         └── prompt      terminal CredentialPrompt
//!         ↕  JSON strings
//! AusweisApp2 SDK (ws://127.0.0.1:24727/eID-Kernel)
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `eid-core`, plus `tokio` for its
//!   dispatch task and channels.
//! - `infrastructure` depends on all other layers.

/// Domain layer: configuration and the peer contract (no I/O).
pub mod domain;

/// Application layer: service facade, event fan-out, workflow driver.
pub mod application;

/// Infrastructure layer: WebSocket peer, config file, terminal prompt.
pub mod infrastructure;
