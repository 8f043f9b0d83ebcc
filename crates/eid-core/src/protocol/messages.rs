//! Messages emitted by the eID SDK.
//!
//! The SDK answers commands (and reports spontaneous changes such as a card
//! reader being plugged in) with JSON objects carrying a `"msg"` discriminator:
//!
//! ```json
//! {"msg":"ENTER_PIN"}
//! {"msg":"AUTH"}
//! {"msg":"AUTH","result":{"major":"...ok"},"url":"https://service.example/result"}
//! ```
//!
//! # The `AUTH` message has two meanings
//!
//! A bare `AUTH` means "an authentication has started".  An `AUTH` carrying a
//! `url` field means "the authentication has finished; redirect here".  Both
//! arrive under the same discriminator, so [`DecodedEvent`] keeps the optional
//! URL next to the kind and the session tracker tells the two apart.

use std::fmt;
use std::str::FromStr;

/// The closed set of message kinds the SDK can emit.
///
/// Discriminators are matched exactly and case-sensitively.  A string that is
/// not in [`MessageKind::ALL`] is a decode failure, never a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// The running authentication requests access rights; answer with
    /// `ACCEPT` or `CANCEL` (optionally after `SET_ACCESS_RIGHTS`).
    AccessRights,
    /// Reply to `GET_API_LEVEL` / `SET_API_LEVEL`.
    ApiLevel,
    /// Authentication started (no URL) or finished (with URL).
    Auth,
    /// The previous command is not allowed in the current workflow state.
    BadState,
    /// Service provider certificate of the current authentication.
    Certificate,
    /// A change-PIN workflow started or finished.
    ChangePin,
    /// The card access number is required.
    EnterCan,
    /// The PIN is required.
    EnterPin,
    /// A new PIN is required.
    EnterNewPin,
    /// The PUK is required.
    EnterPuk,
    /// Information about the SDK installation.
    Info,
    /// A card must be placed on the reader.
    InsertCard,
    /// The SDK hit an internal error.
    InternalError,
    /// The previous command was not valid JSON.
    Invalid,
    /// A card reader was attached, detached or changed.
    Reader,
    /// Information about all connected readers.
    ReaderList,
    /// The previous command's `"cmd"` value is not known to the SDK.
    UnknownCommand,
}

impl MessageKind {
    /// Every message kind, in declaration order.
    pub const ALL: [MessageKind; 17] = [
        MessageKind::AccessRights,
        MessageKind::ApiLevel,
        MessageKind::Auth,
        MessageKind::BadState,
        MessageKind::Certificate,
        MessageKind::ChangePin,
        MessageKind::EnterCan,
        MessageKind::EnterPin,
        MessageKind::EnterNewPin,
        MessageKind::EnterPuk,
        MessageKind::Info,
        MessageKind::InsertCard,
        MessageKind::InternalError,
        MessageKind::Invalid,
        MessageKind::Reader,
        MessageKind::ReaderList,
        MessageKind::UnknownCommand,
    ];

    /// Returns the wire discriminator for this kind.
    pub fn as_wire(self) -> &'static str {
        match self {
            MessageKind::AccessRights => "ACCESS_RIGHTS",
            MessageKind::ApiLevel => "API_LEVEL",
            MessageKind::Auth => "AUTH",
            MessageKind::BadState => "BAD_STATE",
            MessageKind::Certificate => "CERTIFICATE",
            MessageKind::ChangePin => "CHANGE_PIN",
            MessageKind::EnterCan => "ENTER_CAN",
            MessageKind::EnterPin => "ENTER_PIN",
            MessageKind::EnterNewPin => "ENTER_NEW_PIN",
            MessageKind::EnterPuk => "ENTER_PUK",
            MessageKind::Info => "INFO",
            MessageKind::InsertCard => "INSERT_CARD",
            MessageKind::InternalError => "INTERNAL_ERROR",
            MessageKind::Invalid => "INVALID",
            MessageKind::Reader => "READER",
            MessageKind::ReaderList => "READER_LIST",
            MessageKind::UnknownCommand => "UNKNOWN_COMMAND",
        }
    }

    /// Exact-match lookup of a wire discriminator.
    pub fn from_wire(discriminator: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_wire() == discriminator)
    }

    /// Returns `true` for kinds through which the SDK reports a problem with
    /// a previous command or with itself.
    ///
    /// These are ordinary events, not errors of this layer.
    pub fn is_peer_error(self) -> bool {
        matches!(
            self,
            MessageKind::BadState
                | MessageKind::InternalError
                | MessageKind::Invalid
                | MessageKind::UnknownCommand
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

/// Error returned by [`MessageKind::from_str`] for unknown discriminators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMessageKind(pub String);

impl fmt::Display for UnknownMessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown message kind: {}", self.0)
    }
}

impl std::error::Error for UnknownMessageKind {}

impl FromStr for MessageKind {
    type Err = UnknownMessageKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s).ok_or_else(|| UnknownMessageKind(s.to_string()))
    }
}

/// A validated, typed message received from the SDK.
///
/// Only [`MessageKind::Auth`] ever carries a `result_url`.  Its presence marks
/// the successful end of an authentication; its absence marks the start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    /// Which message the SDK sent.
    pub kind: MessageKind,
    /// Redirect URL of a finished authentication.
    pub result_url: Option<String>,
}

impl DecodedEvent {
    /// Creates an event without a result URL.
    pub fn new(kind: MessageKind) -> Self {
        Self { kind, result_url: None }
    }

    /// Creates the terminal `AUTH` event carrying the redirect URL.
    pub fn auth_completed(result_url: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Auth,
            result_url: Some(result_url.into()),
        }
    }

    /// `true` for a bare `AUTH` (authentication started).
    pub fn is_auth_started(&self) -> bool {
        self.kind == MessageKind::Auth && self.result_url.is_none()
    }

    /// `true` for an `AUTH` carrying a result URL (authentication finished).
    pub fn is_auth_completed(&self) -> bool {
        self.kind == MessageKind::Auth && self.result_url.is_some()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
