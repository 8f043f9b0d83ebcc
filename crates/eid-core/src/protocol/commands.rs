//! Commands accepted by the eID SDK.
//!
//! Every command travels to the SDK as a single JSON object whose `"cmd"`
//! field names the command.  Commands that carry data add their own keys
//! next to the discriminator:
//!
//! ```json
//! {"cmd":"GET_INFO"}
//! {"cmd":"SET_API_LEVEL","level":2}
//! {"cmd":"RUN_AUTH","tcTokenURL":"https://service.example/tcToken"}
//! {"cmd":"SET_PIN","value":"123456"}
//! ```
//!
//! Serde's `#[serde(tag = "cmd")]` attribute produces exactly this shape: the
//! variant name becomes the `"cmd"` value and the variant's fields are
//! flattened into the same object.
//!
//! # Why an enum instead of a key/value map?
//!
//! The encoder matches exhaustively over [`Command`], so adding a command
//! without teaching the encoder about it is a compile-time error rather than a
//! silently empty request string.

use serde::Serialize;

/// One command that can be sent to the eID SDK.
///
/// Credential-carrying variants (`SetPin`, `SetNewPin`, `SetCan`, `SetPuk`)
/// hold secrets.  Log [`Command::discriminator`] instead of the `Debug` output
/// when tracing outgoing commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cmd", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Asks for information about the SDK installation.
    GetInfo,

    /// Asks for the current and supported API levels.
    GetApiLevel,

    /// Selects the API level this application speaks.
    SetApiLevel {
        /// Requested API level.
        level: u32,
    },

    /// Asks for information about one card reader.
    GetReader {
        /// Reader name as reported by a previous `READER` or `READER_LIST` message.
        name: String,
    },

    /// Asks for information about all connected card readers.
    GetReaderList,

    /// Starts an authentication workflow.
    RunAuth {
        /// TC token URL of the service provider.
        ///
        /// Supplied by the caller; the endpoint is environment-specific.
        #[serde(rename = "tcTokenURL")]
        tc_token_url: String,
    },

    /// Starts a change-PIN workflow.
    RunChangePin,

    /// Asks for the access rights requested by the current authentication.
    GetAccessRights,

    /// Restricts the effective access rights.
    ///
    /// An empty list disables every optional access right.
    SetAccessRights {
        /// Access right identifiers, in the order they should be sent.
        chat: Vec<String>,
    },

    /// Asks for the service provider certificate of the current authentication.
    GetCertificate,

    /// Aborts the running workflow.
    Cancel,

    /// Accepts the current workflow state (for example the requested access rights).
    Accept,

    /// Supplies the card PIN after an `ENTER_PIN` message.
    SetPin {
        #[serde(rename = "value")]
        pin: String,
    },

    /// Supplies the new PIN after an `ENTER_NEW_PIN` message.
    SetNewPin {
        #[serde(rename = "value")]
        pin: String,
    },

    /// Supplies the card access number after an `ENTER_CAN` message.
    SetCan {
        #[serde(rename = "value")]
        can: String,
    },

    /// Supplies the PUK after an `ENTER_PUK` message.
    SetPuk {
        #[serde(rename = "value")]
        puk: String,
    },
}

impl Command {
    /// Returns the wire discriminator written into the `"cmd"` field.
    ///
    /// Safe to log: it never contains command arguments.
    pub fn discriminator(&self) -> &'static str {
        match self {
            Command::GetInfo => "GET_INFO",
            Command::GetApiLevel => "GET_API_LEVEL",
            Command::SetApiLevel { .. } => "SET_API_LEVEL",
            Command::GetReader { .. } => "GET_READER",
            Command::GetReaderList => "GET_READER_LIST",
            Command::RunAuth { .. } => "RUN_AUTH",
            Command::RunChangePin => "RUN_CHANGE_PIN",
            Command::GetAccessRights => "GET_ACCESS_RIGHTS",
            Command::SetAccessRights { .. } => "SET_ACCESS_RIGHTS",
            Command::GetCertificate => "GET_CERTIFICATE",
            Command::Cancel => "CANCEL",
            Command::Accept => "ACCEPT",
            Command::SetPin { .. } => "SET_PIN",
            Command::SetNewPin { .. } => "SET_NEW_PIN",
            Command::SetCan { .. } => "SET_CAN",
            Command::SetPuk { .. } => "SET_PUK",
        }
    }

    /// Returns `true` for commands that carry a secret (PIN, new PIN, CAN, PUK).
    pub fn carries_secret(&self) -> bool {
        matches!(
            self,
            Command::SetPin { .. }
                | Command::SetNewPin { .. }
                | Command::SetCan { .. }
                | Command::SetPuk { .. }
        )
    }
}
