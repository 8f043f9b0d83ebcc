//! JSON codec for the eID SDK protocol.
//!
//! The protocol is asymmetric: commands go out, messages come in, and the two
//! directions share no types.
//!
//! ```text
//! Command  ──encode_command──►  {"cmd":"...", ...}   (to the SDK)
//! {"msg":"...", ...}  ──decode_message──►  DecodedEvent (from the SDK)
//! ```
//!
//! Decoding is forward-compatible: fields other than `msg` (and `url` under
//! `AUTH`) are ignored, so newer SDK versions adding payload keys never break
//! an older client.

use serde_json::Value;
use thiserror::Error;

use crate::protocol::commands::Command;
use crate::protocol::messages::{DecodedEvent, MessageKind};

/// Failure to serialize a [`Command`].
///
/// Unreachable for the commands defined in this crate; if it ever occurs it
/// indicates a programming defect, not bad input.
#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    #[error("failed to serialize command {command}: {reason}")]
    Serialization {
        command: &'static str,
        reason: String,
    },
}

/// Failure to turn an incoming wire string into a [`DecodedEvent`].
///
/// Both variants are recoverable: the offending message is logged and dropped.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    /// The text is not a JSON object, or its `msg` field is missing or not a string.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The `msg` field holds a discriminator outside the known message table.
    #[error("unknown message discriminator: {0:?}")]
    UnknownDiscriminator(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Command`] into its UTF-8 JSON wire string.
///
/// # Errors
///
/// Returns [`EncodeError::Serialization`] if serde fails to serialize the command.
///
/// # Examples
///
/// ```rust
/// use eid_core::protocol::{encode_command, Command};
///
/// let wire = encode_command(&Command::SetPin { pin: "1234".to_string() }).unwrap();
/// let json: serde_json::Value = serde_json::from_str(&wire).unwrap();
/// assert_eq!(json["cmd"], "SET_PIN");
/// assert_eq!(json["value"], "1234");
/// ```
pub fn encode_command(command: &Command) -> Result<String, EncodeError> {
    serde_json::to_string(command).map_err(|e| EncodeError::Serialization {
        command: command.discriminator(),
        reason: e.to_string(),
    })
}

/// Decodes one SDK message from its wire string.
///
/// # Errors
///
/// - [`DecodeError::MalformedPayload`] if `wire` is not a JSON object or has no
///   string `msg` field.
/// - [`DecodeError::UnknownDiscriminator`] if `msg` is not a known message kind.
///
/// # Examples
///
/// ```rust
/// use eid_core::protocol::{decode_message, MessageKind};
///
/// let started = decode_message(r#"{"msg":"AUTH"}"#).unwrap();
/// assert_eq!(started.kind, MessageKind::Auth);
/// assert_eq!(started.result_url, None);
///
/// let done = decode_message(r#"{"msg":"AUTH","url":"https://x"}"#).unwrap();
/// assert_eq!(done.result_url.as_deref(), Some("https://x"));
/// ```
pub fn decode_message(wire: &str) -> Result<DecodedEvent, DecodeError> {
    let value: Value = serde_json::from_str(wire)
        .map_err(|e| DecodeError::MalformedPayload(format!("invalid JSON: {e}")))?;

    let object = match value {
        Value::Object(map) => map,
        other => {
            return Err(DecodeError::MalformedPayload(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            )))
        }
    };

    let discriminator = match object.get("msg") {
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            return Err(DecodeError::MalformedPayload(format!(
                "\"msg\" must be a string, got {}",
                json_type_name(other)
            )))
        }
        None => {
            return Err(DecodeError::MalformedPayload(
                "missing \"msg\" field".to_string(),
            ))
        }
    };

    let kind = MessageKind::from_wire(discriminator)
        .ok_or_else(|| DecodeError::UnknownDiscriminator(discriminator.to_string()))?;

    // Only AUTH gives `url` a meaning; a non-string `url` is treated as absent.
    let result_url = match kind {
        MessageKind::Auth => object
            .get("url")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };

    Ok(DecodedEvent { kind, result_url })
}

/// Short JSON type name used in error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_to_value(cmd: &Command) -> Value {
        let wire = encode_command(cmd).expect("encode must succeed");
        serde_json::from_str(&wire).expect("encoder must emit valid JSON")
    }

    // ── encode_command ────────────────────────────────────────────────────────

    #[test]
    fn test_encode_set_pin_produces_cmd_and_value() {
        // Arrange
        let cmd = Command::SetPin { pin: "1234".to_string() };

        // Act
        let json = encode_to_value(&cmd);

        // Assert: exactly {"cmd":"SET_PIN","value":"1234"}
        assert_eq!(json, serde_json::json!({"cmd": "SET_PIN", "value": "1234"}));
    }

    #[test]
    fn test_encode_unit_command_has_only_cmd_key() {
        let json = encode_to_value(&Command::GetInfo);
        assert_eq!(json, serde_json::json!({"cmd": "GET_INFO"}));
    }

    #[test]
    fn test_encode_set_api_level_emits_integer_level() {
        let json = encode_to_value(&Command::SetApiLevel { level: 2 });
        assert_eq!(json, serde_json::json!({"cmd": "SET_API_LEVEL", "level": 2}));
    }

    #[test]
    fn test_encode_get_reader_emits_name() {
        let json = encode_to_value(&Command::GetReader {
            name: "REINER SCT cyberJack RFID basis".to_string(),
        });
        assert_eq!(json["cmd"], "GET_READER");
        assert_eq!(json["name"], "REINER SCT cyberJack RFID basis");
    }

    #[test]
    fn test_encode_run_auth_uses_caller_supplied_tc_token_url() {
        let json = encode_to_value(&Command::RunAuth {
            tc_token_url: "https://service.example/tcToken?x=1".to_string(),
        });
        assert_eq!(
            json,
            serde_json::json!({
                "cmd": "RUN_AUTH",
                "tcTokenURL": "https://service.example/tcToken?x=1"
            })
        );
    }

    #[test]
    fn test_encode_set_access_rights_preserves_order() {
        let json = encode_to_value(&Command::SetAccessRights {
            chat: vec!["FamilyName".to_string(), "GivenNames".to_string(), "DateOfBirth".to_string()],
        });
        assert_eq!(json["cmd"], "SET_ACCESS_RIGHTS");
        assert_eq!(
            json["chat"],
            serde_json::json!(["FamilyName", "GivenNames", "DateOfBirth"])
        );
    }

    #[test]
    fn test_encode_empty_access_rights_is_empty_array() {
        let json = encode_to_value(&Command::SetAccessRights { chat: vec![] });
        assert_eq!(json["chat"], serde_json::json!([]));
    }

    #[test]
    fn test_encode_credentials_use_value_key() {
        assert_eq!(
            encode_to_value(&Command::SetNewPin { pin: "654321".to_string() }),
            serde_json::json!({"cmd": "SET_NEW_PIN", "value": "654321"})
        );
        assert_eq!(
            encode_to_value(&Command::SetCan { can: "112233".to_string() }),
            serde_json::json!({"cmd": "SET_CAN", "value": "112233"})
        );
        assert_eq!(
            encode_to_value(&Command::SetPuk { puk: "0987654321".to_string() }),
            serde_json::json!({"cmd": "SET_PUK", "value": "0987654321"})
        );
    }

    #[test]
    fn test_encode_escapes_special_characters() {
        // A reader name with quotes must still produce valid JSON.
        let json = encode_to_value(&Command::GetReader {
            name: "reader \"A\"\n".to_string(),
        });
        assert_eq!(json["name"], "reader \"A\"\n");
    }

    // ── decode_message ────────────────────────────────────────────────────────

    #[test]
    fn test_decode_bare_auth_has_no_result_url() {
        let event = decode_message(r#"{"msg":"AUTH"}"#).unwrap();
        assert_eq!(event, DecodedEvent::new(MessageKind::Auth));
    }

    #[test]
    fn test_decode_auth_with_url_populates_result_url() {
        let event = decode_message(r#"{"msg":"AUTH","url":"https://x"}"#).unwrap();
        assert_eq!(event, DecodedEvent::auth_completed("https://x"));
    }

    #[test]
    fn test_decode_auth_with_non_string_url_treats_url_as_absent() {
        let event = decode_message(r#"{"msg":"AUTH","url":42}"#).unwrap();
        assert_eq!(event.result_url, None);
    }

    #[test]
    fn test_decode_ignores_url_outside_auth() {
        // Only AUTH gives `url` meaning.
        let event = decode_message(r#"{"msg":"ENTER_PIN","url":"https://x"}"#).unwrap();
        assert_eq!(event, DecodedEvent::new(MessageKind::EnterPin));
    }

    #[test]
    fn test_decode_ignores_unknown_extra_fields() {
        let wire = r#"{"msg":"READER","name":"NFC","attached":true,"card":{"retryCounter":3}}"#;
        let event = decode_message(wire).unwrap();
        assert_eq!(event.kind, MessageKind::Reader);
    }

    #[test]
    fn test_decode_every_known_discriminator() {
        for kind in MessageKind::ALL {
            let wire = format!(r#"{{"msg":"{}"}}"#, kind.as_wire());
            assert_eq!(decode_message(&wire).unwrap().kind, kind);
        }
    }

    #[test]
    fn test_decode_unknown_discriminator_is_error() {
        let result = decode_message(r#"{"msg":"STATUS"}"#);
        assert_eq!(
            result,
            Err(DecodeError::UnknownDiscriminator("STATUS".to_string()))
        );
    }

    #[test]
    fn test_decode_lowercase_discriminator_is_unknown() {
        assert!(matches!(
            decode_message(r#"{"msg":"auth"}"#),
            Err(DecodeError::UnknownDiscriminator(_))
        ));
    }

    #[test]
    fn test_decode_non_json_is_malformed() {
        assert!(matches!(
            decode_message("not json at all"),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_decode_json_array_is_malformed() {
        assert!(matches!(
            decode_message(r#"["AUTH"]"#),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_decode_json_string_is_malformed() {
        assert!(matches!(
            decode_message(r#""AUTH""#),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_decode_missing_msg_is_malformed() {
        assert!(matches!(
            decode_message(r#"{"cmd":"AUTH"}"#),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_decode_non_string_msg_is_malformed() {
        assert!(matches!(
            decode_message(r#"{"msg":7}"#),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_decode_empty_input_is_malformed() {
        assert!(matches!(
            decode_message(""),
            Err(DecodeError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_encode_error_display_names_command() {
        let err = EncodeError::Serialization {
            command: "SET_PIN",
            reason: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "failed to serialize command SET_PIN: boom");
    }
}
