//! Opaque pagination cursors
//!
//! A cursor is the store's "last evaluated key" of a sorted index query,
//! serialized as a version byte followed by the JSON of the ordered key map,
//! then encoded with the URL-safe base64 alphabet (no padding) so it can sit
//! in a query string unescaped. Callers never look inside; they only pass the
//! token back.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use thiserror::Error;

use crate::attribute::Item;

/// Current cursor layout version
const CURSOR_VERSION: u8 = 1;

/// Errors raised while encoding or decoding a cursor
#[derive(Error, Debug)]
pub enum CursorError {
    /// The token is empty; callers must treat "" as "no cursor"
    #[error("empty cursor")]
    Empty,

    /// The token is not valid base64url text
    #[error("failed to decode cursor: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The token was produced by an incompatible cursor layout
    #[error("unsupported cursor version {0}")]
    Version(u8),

    /// The decoded bytes are not a key mapping
    #[error("failed to unmarshal decoded cursor: {0}")]
    Payload(String),

    /// The key mapping could not be serialized
    #[error("failed to marshal cursor key: {0}")]
    Serialization(String),
}

/// Encode a last evaluated key into an opaque, URL-safe token
pub fn encode_cursor(key: &Item) -> Result<String, CursorError> {
    let payload =
        serde_json::to_vec(key).map_err(|e| CursorError::Serialization(e.to_string()))?;

    let mut bytes = Vec::with_capacity(payload.len() + 1);
    bytes.push(CURSOR_VERSION);
    bytes.extend_from_slice(&payload);

    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Decode a token produced by [`encode_cursor`] back into its key
pub fn decode_cursor(token: &str) -> Result<Item, CursorError> {
    if token.is_empty() {
        return Err(CursorError::Empty);
    }

    let bytes = URL_SAFE_NO_PAD.decode(token)?;
    let (version, payload) = bytes.split_first().ok_or(CursorError::Empty)?;
    if *version != CURSOR_VERSION {
        return Err(CursorError::Version(*version));
    }

    serde_json::from_slice(payload).map_err(|e| CursorError::Payload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeValue;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn failure_key(task_id: &str) -> Item {
        let mut key = Item::new();
        key.insert("State".to_string(), AttributeValue::s("FAILURE"));
        key.insert("TaskUUID".to_string(), AttributeValue::s(task_id));
        key
    }

    #[test]
    fn test_cursor_round_trip() {
        let key = failure_key("3");
        let token = encode_cursor(&key).unwrap();
        assert_eq!(decode_cursor(&token).unwrap(), key);
    }

    #[test]
    fn test_cursor_is_url_safe() {
        // Long binary-ish payloads exercise the characters that differ
        // between the standard and URL-safe alphabets.
        let mut key = failure_key("??>>~~");
        key.insert("Blob".to_string(), AttributeValue::B(vec![0xfb, 0xff, 0xfe, 0x3f]));
        let token = encode_cursor(&key).unwrap();

        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_cursor("not-base64!!"),
            Err(CursorError::Encoding(_))
        ));
    }

    #[test]
    fn test_decode_rejects_empty() {
        assert!(matches!(decode_cursor(""), Err(CursorError::Empty)));
    }

    #[test]
    fn test_decode_rejects_non_key_payload() {
        let mut bytes = vec![CURSOR_VERSION];
        bytes.extend_from_slice(b"[1,2,3]");
        let token = URL_SAFE_NO_PAD.encode(bytes);
        assert!(matches!(decode_cursor(&token), Err(CursorError::Payload(_))));
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let mut bytes = vec![9u8];
        bytes.extend_from_slice(br#"{"TaskUUID":{"S":"1"}}"#);
        let token = URL_SAFE_NO_PAD.encode(bytes);
        assert!(matches!(decode_cursor(&token), Err(CursorError::Version(9))));
    }

    fn arb_scalar() -> impl Strategy<Value = AttributeValue> {
        prop_oneof![
            ".*".prop_map(AttributeValue::S),
            any::<i64>().prop_map(AttributeValue::n),
            proptest::collection::vec(any::<u8>(), 0..16).prop_map(AttributeValue::B),
        ]
    }

    proptest! {
        #[test]
        fn prop_cursor_round_trip(
            key in proptest::collection::btree_map("[A-Za-z][A-Za-z0-9_]{0,12}", arb_scalar(), 1..4)
        ) {
            let token = encode_cursor(&key).unwrap();
            prop_assert_eq!(decode_cursor(&token).unwrap(), key);
        }
    }
}
