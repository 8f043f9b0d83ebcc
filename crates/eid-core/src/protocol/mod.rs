//! Protocol module containing the command and message types and the JSON codec.

pub mod codec;
pub mod commands;
pub mod messages;

pub use codec::{decode_message, encode_command, DecodeError, EncodeError};
pub use commands::Command;
pub use messages::{DecodedEvent, MessageKind};
