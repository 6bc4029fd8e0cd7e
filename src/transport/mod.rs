//! Transport module - TCP connection setup.

mod tcp;

pub use tcp::{connect, validate_target};
