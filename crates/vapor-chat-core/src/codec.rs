//! Wire codec
//!
//! Frames are flat JSON objects carried one per WebSocket text message:
//!
//! - identity (client to server): `{"username": "..."}`
//! - chat (client to server): `{"message": "..."}`
//! - chat (server to client): `{"username": "...", "message": "..."}`
//!
//! Decoding never fails loudly. Anything that is not a well-formed inbound
//! chat frame is dropped by the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::Result;

/// Identity announcement, sent once per connection
#[derive(Debug, Serialize)]
struct IdentityFrame<'a> {
    username: &'a str,
}

/// Outbound chat text
#[derive(Debug, Serialize)]
struct ChatFrame<'a> {
    message: &'a str,
}

/// A chat line received from the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundFrame {
    /// Display name of the remote sender
    pub username: String,
    /// Chat text
    pub message: String,
}

/// Why an inbound payload was not a chat frame
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing or non-string field `{0}`")]
    MissingField(&'static str),
}

/// Encode the identity announcement for `username`
pub fn encode_identity(username: &str) -> Result<String> {
    to_frame(&IdentityFrame { username })
}

/// Encode a chat frame carrying `text`
pub fn encode_chat(text: &str) -> Result<String> {
    to_frame(&ChatFrame { message: text })
}

fn to_frame<T: Serialize>(frame: &T) -> Result<String> {
    Ok(serde_json::to_string(frame)?)
}

/// Decode an inbound payload, returning `None` for anything malformed
pub fn decode(bytes: &[u8]) -> Option<InboundFrame> {
    match parse(bytes) {
        Ok(frame) => Some(frame),
        Err(e) => {
            tracing::debug!("Dropping inbound frame: {}", e);
            None
        }
    }
}

/// Parse an inbound payload into a chat frame
pub fn parse(bytes: &[u8]) -> std::result::Result<InboundFrame, FrameError> {
    let text = std::str::from_utf8(bytes).map_err(|_| FrameError::InvalidUtf8)?;
    let value: Value =
        serde_json::from_str(text).map_err(|e| FrameError::InvalidJson(e.to_string()))?;
    let object = value.as_object().ok_or(FrameError::NotAnObject)?;

    let username = string_field(object, "username")?;
    let message = string_field(object, "message")?;

    Ok(InboundFrame { username, message })
}

fn string_field(
    object: &serde_json::Map<String, Value>,
    field: &'static str,
) -> std::result::Result<String, FrameError> {
    object
        .get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or(FrameError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_identity() {
        assert_eq!(encode_identity("alice").unwrap(), r#"{"username":"alice"}"#);
    }

    #[test]
    fn test_encode_chat() {
        assert_eq!(encode_chat("hello").unwrap(), r#"{"message":"hello"}"#);
    }

    #[test]
    fn test_encode_escapes_json_metacharacters() {
        let frame = encode_identity(r#"ali"ce\"#).unwrap();
        assert_eq!(frame, r#"{"username":"ali\"ce\\"}"#);

        let value: Value = serde_json::from_str(&encode_chat("line\nbreak").unwrap()).unwrap();
        assert_eq!(value["message"], "line\nbreak");
        assert_eq!(value.as_object().unwrap().len(), 1);
    }

    #[test]
    fn test_identity_frame_is_not_a_chat_frame() {
        for name in ["alice", "", "null", "bob smith", "ünïcødé"] {
            assert_eq!(decode(encode_identity(name).unwrap().as_bytes()), None);
        }
    }

    #[test]
    fn test_chat_frame_with_server_username() {
        for text in ["hi", "", "null", "{\"nested\": true}", "emoji 🎉"] {
            let wire = server_chat_frame("bob", text);
            assert_eq!(
                decode(&wire),
                Some(InboundFrame {
                    username: "bob".to_string(),
                    message: text.to_string(),
                })
            );
        }
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let frame = decode(br#"{"username":"bob","message":"hi","room":"lobby"}"#);
        assert_eq!(frame.map(|f| f.message), Some("hi".to_string()));
    }

    #[test]
    fn test_decode_rejects_wrong_shapes() {
        let inputs: &[&[u8]] = &[
            b"",
            b"not json",
            br#"{"username":"bob","message":"hi""#,
            br#"{"foo":"bar"}"#,
            b"[]",
            br#"["bob","hi"]"#,
            br#""string""#,
            b"42",
            b"null",
            br#"{"username":"bob"}"#,
            br#"{"message":"hi"}"#,
            br#"{"username":7,"message":"hi"}"#,
            br#"{"username":"bob","message":null}"#,
        ];
        for input in inputs {
            assert_eq!(decode(input), None, "input: {:?}", String::from_utf8_lossy(input));
        }
    }

    #[test]
    fn test_decode_invalid_utf8() {
        assert_eq!(decode(&[0xff, 0xfe, b'{', b'}']), None);
        assert_eq!(parse(&[0xc3, 0x28]), Err(FrameError::InvalidUtf8));
    }

    fn server_chat_frame(username: &str, text: &str) -> Vec<u8> {
        let mut value: Value = serde_json::from_str(&encode_chat(text).unwrap()).unwrap();
        value["username"] = Value::String(username.to_string());
        serde_json::to_vec(&value).unwrap()
    }

    proptest! {
        #[test]
        fn prop_identity_never_decodes_as_chat(username in any::<String>()) {
            let frame = encode_identity(&username).unwrap();
            prop_assert_eq!(decode(frame.as_bytes()), None);
        }

        #[test]
        fn prop_chat_round_trips_with_server_username(
            username in any::<String>(),
            text in any::<String>(),
        ) {
            let wire = server_chat_frame(&username, &text);
            prop_assert_eq!(decode(&wire), Some(InboundFrame { username, message: text }));
        }

        #[test]
        fn prop_decode_accepts_arbitrary_bytes(
            bytes in prop::collection::vec(any::<u8>(), 0..512),
        ) {
            if decode(&bytes).is_some() {
                prop_assert!(std::str::from_utf8(&bytes).is_ok());
            }
        }

        #[test]
        fn prop_decode_accepts_arbitrary_json_text(text in r#"[\[\]{}":,0-9a-z ]{0,64}"#) {
            // Brace/quote soup reaches the JSON parser instead of failing on UTF-8.
            let _ = decode(text.as_bytes());
        }
    }

    #[test]
    fn test_parse_reasons() {
        assert!(matches!(parse(b"{"), Err(FrameError::InvalidJson(_))));
        assert_eq!(parse(b"[]"), Err(FrameError::NotAnObject));
        assert_eq!(
            parse(br#"{"message":"hi"}"#),
            Err(FrameError::MissingField("username"))
        );
        assert_eq!(
            parse(br#"{"username":"bob"}"#),
            Err(FrameError::MissingField("message"))
        );
    }
}
