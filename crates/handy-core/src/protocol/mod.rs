//! Protocol module containing message types and the JSON codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_message, encode_response, ProtocolError, MAX_MESSAGE_SIZE};
pub use messages::*;
