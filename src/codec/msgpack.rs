//! MsgPack body codec (rmp-serde).
//!
//! Structs go out as maps (`to_vec_named`) so the server can match fields
//! by name; decoding accepts both the map and the array form.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// MessagePack codec for structured bodies.
///
/// ```
/// use gamewire_client::codec::MsgPackCodec;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, PartialEq, Debug)]
/// struct CreateRole {
///     name: String,
///     class_id: u32,
/// }
///
/// let req = CreateRole { name: "wanderer".to_string(), class_id: 3 };
/// let body = MsgPackCodec::encode(&req).unwrap();
/// assert_eq!(MsgPackCodec::decode::<CreateRole>(&body).unwrap(), req);
/// ```
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Serialize `value` into an outbound body.
    pub fn encode<T: Serialize>(value: &T) -> Result<Bytes> {
        Ok(Bytes::from(rmp_serde::to_vec_named(value)?))
    }

    /// Deserialize an inbound body.
    pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct LoginResult {
        success: bool,
        token: String,
        role_ids: Vec<u64>,
    }

    #[derive(Serialize)]
    struct LoginResultPositional(bool, String, Vec<u64>);

    #[test]
    fn test_login_result() {
        let original = LoginResult {
            success: true,
            token: "abc123".to_string(),
            role_ids: vec![10, 11],
        };
        let body = MsgPackCodec::encode(&original).unwrap();
        // fixmap, 3 entries
        assert_eq!(body[0], 0x83);
        assert_eq!(MsgPackCodec::decode::<LoginResult>(&body).unwrap(), original);
    }

    #[test]
    fn test_accepts_array_form() {
        let body = rmp_serde::to_vec(&LoginResultPositional(false, "t".into(), vec![1])).unwrap();
        let decoded: LoginResult = MsgPackCodec::decode(&body).unwrap();
        assert!(!decoded.success);
        assert_eq!(decoded.role_ids, vec![1]);
    }

    #[test]
    fn test_string_body() {
        let body = MsgPackCodec::encode(&"hello").unwrap();
        assert_eq!(MsgPackCodec::decode::<String>(&body).unwrap(), "hello");
    }

    #[test]
    fn test_garbage_and_empty_bodies_fail() {
        assert!(matches!(
            MsgPackCodec::decode::<LoginResult>(b"\xc1"),
            Err(TransportError::MsgPackDecode(_))
        ));
        assert!(MsgPackCodec::decode::<LoginResult>(b"").is_err());
    }
}
