//! GalacticBuf wire codec
//!
//! Binary envelope used for request/response bodies: one version byte,
//! one field-count byte, a size-prefixed header, then typed fields.
//! v1 uses 2-byte string/list lengths; v2 uses 4-byte lengths and adds
//! a `bytes` value type. The decoder dispatches on the first byte;
//! this crate only ever *encodes* v1 (mirroring the reference codec,
//! which never emits v2 either).

mod codec;
mod value;

pub use codec::{decode_message, encode_message, WireError};
pub use value::{object, Message, Value};
