//! Protocol module - wire format, framing, envelopes, and the registry.
//!
//! This module implements the binary protocol spoken over the TCP stream:
//! - 4-byte length prefix + type + flags framing
//! - ClientData envelope (protocol id + opaque body)
//! - Frame buffer for accumulating partial reads
//! - Registry mapping protocol ids to body decoders

mod envelope;
mod frame;
mod frame_buffer;
mod registry;
mod stream;
mod wire_format;

pub use envelope::{decode_envelope, encode_envelope, Envelope, PROTOCOL_ID_SIZE};
pub use frame::{Frame, HEARTBEAT_PAYLOAD};
pub use frame_buffer::FrameBuffer;
pub use registry::{Message, ProtocolRegistry, RegistryBuilder};
pub use stream::read_frame;
pub use wire_format::{
    decode_length, encode_frame, encode_header, flags, FrameType, FRAME_META_SIZE, HEADER_SIZE,
    LENGTH_PREFIX_SIZE, MAX_FRAME_BODY, MAX_PAYLOAD_SIZE,
};
