//! # eid-core
//!
//! Protocol core for talking to an eID SDK (such as the AusweisApp2 SDK)
//! over its JSON command/message interface.
//!
//! The SDK is an opaque peer: it accepts serialized command strings and emits
//! serialized message strings through a callback.  This crate owns the two
//! pure halves of that conversation and nothing else:
//!
//! - **`protocol`** – [`Command`] values are encoded into `{"cmd":...}` JSON
//!   strings; incoming `{"msg":...}` strings are decoded into typed
//!   [`DecodedEvent`]s.
//!
//! - **`domain`** – the [`SessionTracker`], which infers the authentication
//!   workflow step from the sequence of decoded events.
//!
//! Transports, threading and fan-out to subscribers live in `eid-bridge`.

pub mod domain;
pub mod protocol;

pub use domain::session::{SessionState, SessionTracker, StateTransition};
pub use protocol::codec::{decode_message, encode_command, DecodeError, EncodeError};
pub use protocol::commands::Command;
pub use protocol::messages::{DecodedEvent, MessageKind};
