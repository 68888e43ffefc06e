//! SockJS wire frames.
//!
//! Every message a SockJS server sends is one frame whose first byte names
//! its type. The remainder, if any, is a JSON payload.
//!
//! # Frame Types
//!
//! | Tag | Frame | Payload |
//! |-----|-------|---------|
//! | `o` | [`Frame::Open`] | none |
//! | `h` | [`Frame::Heartbeat`] | none |
//! | `a` | [`Frame::Array`] | JSON array of messages |
//! | `c` | [`Frame::Close`] | `[code, "reason"]` |
//!
//! An array frame is unpacked into one entry per logical message. Each entry
//! keeps the exact JSON text of its array element, so a server message
//! `a["hello",{"n":1}]` yields `"hello"` and `{"n":1}`.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::json;
use serde_json::value::RawValue;
use tracing::warn;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

const OPEN: u8 = b'o';
const HEARTBEAT: u8 = b'h';
const ARRAY: u8 = b'a';
const CLOSE: u8 = b'c';

// ============================================================================
// CloseReason
// ============================================================================

/// Code and reason carried by a close frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    /// Close code (e.g. 3000 for "Go away!").
    pub code: u32,
    /// Human-readable reason.
    pub reason: String,
}

// ============================================================================
// Frame
// ============================================================================

/// A decoded SockJS frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Session opened. Must be the first frame on a physical connection.
    Open,
    /// Keep-alive. Only resets the liveness timer.
    Heartbeat,
    /// Application messages, one raw JSON value per entry.
    Array(Vec<String>),
    /// Session closed by the server. `None` if the payload was malformed.
    Close(Option<CloseReason>),
}

impl Frame {
    /// Decodes one frame.
    ///
    /// A single trailing newline is ignored (XHR responses end with `\n`).
    /// Empty input yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFrame`] for an unknown type byte and
    /// [`Error::Protocol`] for a malformed array payload. A malformed close payload is logged and still decodes
    /// to [`Frame::Close`].
    pub fn decode(raw: &[u8]) -> Result<Option<Self>> {
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);

        let Some((&tag, payload)) = raw.split_first() else {
            return Ok(None);
        };

        let frame = match tag {
            OPEN => Self::Open,
            HEARTBEAT => Self::Heartbeat,
            ARRAY => Self::Array(decode_array(payload)?),
            CLOSE => Self::Close(decode_close(payload)),
            other => return Err(Error::unknown_frame(other)),
        };

        Ok(Some(frame))
    }

    /// Encodes the frame in wire format.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Open => "o".to_string(),
            Self::Heartbeat => "h".to_string(),
            Self::Array(messages) => format!("a[{}]", messages.join(",")),
            Self::Close(Some(CloseReason { code, reason })) => {
                format!("c{}", json!([code, reason]))
            }
            Self::Close(None) => "c[]".to_string(),
        }
    }

    /// Returns the frame type name, for logging.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Heartbeat => "heartbeat",
            Self::Array(_) => "array",
            Self::Close(_) => "close",
        }
    }
}

// ============================================================================
// Outbound Payloads
// ============================================================================

/// Serializes client messages into the JSON array a SockJS server expects.
///
/// # Errors
///
/// Returns [`Error::Json`] if a message cannot be serialized.
pub fn encode_messages<T: Serialize>(messages: &[T]) -> Result<String> {
    Ok(serde_json::to_string(messages)?)
}

// ============================================================================
// Helpers
// ============================================================================

fn decode_array(payload: &[u8]) -> Result<Vec<String>> {
    let values: Vec<Box<RawValue>> = serde_json::from_slice(payload)
        .map_err(|e| Error::protocol(format!("malformed array frame: {e}")))?;

    Ok(values.into_iter().map(|v| v.get().to_owned()).collect())
}

fn decode_close(payload: &[u8]) -> Option<CloseReason> {
    match serde_json::from_slice::<(u32, String)>(payload) {
        Ok((code, reason)) => Some(CloseReason { code, reason }),
        Err(e) => {
            warn!(error = %e, "Malformed close frame payload");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_empty_is_ignored() {
        assert_eq!(Frame::decode(b"").unwrap(), None);
        assert_eq!(Frame::decode(b"\n").unwrap(), None);
    }

    #[test]
    fn test_decode_open_and_heartbeat() {
        assert_eq!(Frame::decode(b"o").unwrap(), Some(Frame::Open));
        assert_eq!(Frame::decode(b"o\n").unwrap(), Some(Frame::Open));
        assert_eq!(Frame::decode(b"h").unwrap(), Some(Frame::Heartbeat));
    }

    #[test]
    fn test_decode_array_unpacks_messages() {
        let frame = Frame::decode(br#"a["hello",{"n":1},[1, 2]]"#).unwrap();
        assert_eq!(
            frame,
            Some(Frame::Array(vec![
                r#""hello""#.to_string(),
                r#"{"n":1}"#.to_string(),
                "[1, 2]".to_string(),
            ]))
        );
    }

    #[test]
    fn test_decode_empty_array() {
        assert_eq!(Frame::decode(b"a[]").unwrap(), Some(Frame::Array(vec![])));
    }

    #[test]
    fn test_decode_malformed_array_fails() {
        let err = Frame::decode(b"a{not json").unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }

    #[test]
    fn test_decode_close() {
        let frame = Frame::decode(br#"c[3000,"Go away!"]"#).unwrap();
        assert_eq!(
            frame,
            Some(Frame::Close(Some(CloseReason {
                code: 3000,
                reason: "Go away!".to_string(),
            })))
        );
    }

    #[test]
    fn test_decode_malformed_close_still_closes() {
        assert_eq!(Frame::decode(b"c").unwrap(), Some(Frame::Close(None)));
        assert_eq!(
            Frame::decode(br#"c["x"]"#).unwrap(),
            Some(Frame::Close(None))
        );
    }

    #[test]
    fn test_decode_unknown_type_fails() {
        let err = Frame::decode(b"x[]").unwrap_err();
        assert!(matches!(err, Error::UnknownFrame { tag: 'x' }));
        assert!(err.to_string().contains("unknown frame type 'x'"));
    }

    #[test]
    fn test_encode() {
        assert_eq!(Frame::Open.encode(), "o");
        assert_eq!(Frame::Heartbeat.encode(), "h");
        assert_eq!(
            Frame::Array(vec![r#""a""#.into(), "2".into()]).encode(),
            r#"a["a",2]"#
        );
        assert_eq!(
            Frame::Close(Some(CloseReason {
                code: 3000,
                reason: "Go away!".into(),
            }))
            .encode(),
            r#"c[3000,"Go away!"]"#
        );
    }

    #[test]
    fn test_encode_messages() {
        assert_eq!(encode_messages(&["hi"]).unwrap(), r#"["hi"]"#);
        assert_eq!(
            encode_messages(&[json!({"op": "join"}), json!(3)]).unwrap(),
            r#"[{"op":"join"},3]"#
        );
    }

    #[test]
    fn test_frame_names() {
        assert_eq!(Frame::Open.name(), "open");
        assert_eq!(Frame::Close(None).name(), "close");
    }
}
