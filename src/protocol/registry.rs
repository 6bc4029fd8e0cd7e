//! Protocol registry: protocol id to body decoder and display name.
//!
//! The registry is assembled once with [`RegistryBuilder`] and is immutable
//! afterwards, so the receive task can share it through an `Arc` without
//! any locking.
//!
//! # Example
//!
//! ```
//! use gamewire_client::protocol::{Envelope, ProtocolRegistry};
//! use bytes::Bytes;
//!
//! let registry = ProtocolRegistry::builder()
//!     .inbound_raw(1, "S2C_LoginResult")
//!     .outbound(1, "C2S_Login")
//!     .build();
//!
//! let msg = registry
//!     .decode(Envelope { protocol_id: 1, body: Bytes::from_static(b"ok") })
//!     .unwrap();
//! assert_eq!(msg.downcast_ref::<Bytes>().unwrap(), &Bytes::from_static(b"ok"));
//! ```

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::Envelope;
use crate::codec::{MsgPackCodec, RawCodec};
use crate::error::{Result, TransportError};

/// Body decoder stored per protocol id.
type BoxDecoder = Box<dyn Fn(Bytes) -> std::result::Result<Box<dyn Any + Send>, String> + Send + Sync>;

/// A decoded domain message.
///
/// The concrete type is whatever the registered decoder produced:
/// `Bytes` for raw entries, `T` for MsgPack entries.
pub struct Message {
    protocol_id: u16,
    value: Box<dyn Any + Send>,
}

impl Message {
    /// Wrap an already-decoded value.
    pub fn new<T: Any + Send>(protocol_id: u16, value: T) -> Self {
        Self {
            protocol_id,
            value: Box::new(value),
        }
    }

    /// Protocol id this message was received under.
    #[inline]
    pub fn protocol_id(&self) -> u16 {
        self.protocol_id
    }

    /// Check the decoded type.
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Borrow the decoded value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Take the decoded value as `T`, handing the message back on mismatch.
    pub fn downcast<T: Any>(self) -> std::result::Result<T, Self> {
        let protocol_id = self.protocol_id;
        self.value
            .downcast::<T>()
            .map(|b| *b)
            .map_err(|value| Self { protocol_id, value })
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("protocol_id", &self.protocol_id)
            .finish_non_exhaustive()
    }
}

struct InboundEntry {
    name: String,
    decode: BoxDecoder,
}

/// Immutable mapping from protocol id to decoder and name.
pub struct ProtocolRegistry {
    inbound: HashMap<u16, InboundEntry>,
    outbound: HashMap<u16, String>,
}

impl ProtocolRegistry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// A registry with no entries. Every inbound message is dropped.
    pub fn empty() -> Self {
        RegistryBuilder::new().build()
    }

    /// Decode an envelope body into a domain message.
    ///
    /// # Errors
    ///
    /// `UnknownProtocolId` if nothing is registered for the id, `Decode` if
    /// the registered decoder rejects the body.
    pub fn decode(&self, envelope: Envelope) -> Result<Message> {
        let protocol_id = envelope.protocol_id;
        let entry = self
            .inbound
            .get(&protocol_id)
            .ok_or(TransportError::UnknownProtocolId(protocol_id))?;

        let value = (entry.decode)(envelope.body)
            .map_err(|reason| TransportError::Decode { protocol_id, reason })?;

        Ok(Message { protocol_id, value })
    }

    /// Whether an inbound decoder exists for `protocol_id`.
    pub fn contains(&self, protocol_id: u16) -> bool {
        self.inbound.contains_key(&protocol_id)
    }

    /// Name of an inbound (server to client) protocol id.
    pub fn inbound_name(&self, protocol_id: u16) -> Cow<'_, str> {
        match self.inbound.get(&protocol_id) {
            Some(entry) => Cow::Borrowed(entry.name.as_str()),
            None => Cow::Owned(format!("Unknown({protocol_id})")),
        }
    }

    /// Name of an outbound (client to server) protocol id.
    pub fn outbound_name(&self, protocol_id: u16) -> Cow<'_, str> {
        match self.outbound.get(&protocol_id) {
            Some(name) => Cow::Borrowed(name.as_str()),
            None => Cow::Owned(format!("Unknown({protocol_id})")),
        }
    }

    /// Number of inbound decoders.
    pub fn len(&self) -> usize {
        self.inbound.len()
    }

    /// Whether no inbound decoders are registered.
    pub fn is_empty(&self) -> bool {
        self.inbound.is_empty()
    }
}

impl Default for ProtocolRegistry {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut inbound: Vec<_> = self.inbound.iter().map(|(id, e)| (*id, &e.name)).collect();
        inbound.sort_by_key(|(id, _)| *id);
        f.debug_struct("ProtocolRegistry")
            .field("inbound", &inbound)
            .field("outbound", &self.outbound.len())
            .finish()
    }
}

/// Builder for [`ProtocolRegistry`].
///
/// Registering the same id twice replaces the earlier entry.
pub struct RegistryBuilder {
    inbound: HashMap<u16, InboundEntry>,
    outbound: HashMap<u16, String>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            inbound: HashMap::new(),
            outbound: HashMap::new(),
        }
    }

    /// Register an inbound id whose body is delivered as raw `Bytes`.
    pub fn inbound_raw(self, protocol_id: u16, name: &str) -> Self {
        self.inbound_with(protocol_id, name, |body: Bytes| {
            Ok::<_, TransportError>(RawCodec::decode(body))
        })
    }

    /// Register an inbound id whose body is UTF-8 text, delivered as `String`.
    pub fn inbound_text(self, protocol_id: u16, name: &str) -> Self {
        self.inbound_with(protocol_id, name, RawCodec::decode_text)
    }

    /// Register an inbound id whose body is MsgPack-encoded `T`.
    pub fn inbound_msgpack<T>(self, protocol_id: u16, name: &str) -> Self
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.inbound_with(protocol_id, name, |body: Bytes| MsgPackCodec::decode::<T>(&body))
    }

    /// Register an inbound id with a custom body decoder.
    ///
    /// Use this for body formats the crate has no codec for (protobuf etc).
    pub fn inbound_with<T, E, F>(mut self, protocol_id: u16, name: &str, decoder: F) -> Self
    where
        T: Any + Send,
        E: fmt::Display,
        F: Fn(Bytes) -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        let decode: BoxDecoder = Box::new(move |body| {
            decoder(body)
                .map(|v| Box::new(v) as Box<dyn Any + Send>)
                .map_err(|e| e.to_string())
        });
        self.inbound.insert(
            protocol_id,
            InboundEntry {
                name: name.to_string(),
                decode,
            },
        );
        self
    }

    /// Name an outbound id (used in send logging only).
    pub fn outbound(mut self, protocol_id: u16, name: &str) -> Self {
        self.outbound.insert(protocol_id, name.to_string());
        self
    }

    /// Freeze into an immutable registry.
    pub fn build(self) -> ProtocolRegistry {
        ProtocolRegistry {
            inbound: self.inbound,
            outbound: self.outbound,
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
