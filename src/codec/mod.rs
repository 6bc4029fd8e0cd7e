//! Body codecs.
//!
//! The transport never looks inside a body; the
//! [`ProtocolRegistry`](crate::protocol::ProtocolRegistry) picks a codec per
//! protocol id. Formats without a codec here go through
//! [`RegistryBuilder::inbound_with`](crate::protocol::RegistryBuilder::inbound_with).

mod msgpack;
mod raw;

pub use msgpack::MsgPackCodec;
pub use raw::RawCodec;
