//! Encode/decode for the GalacticBuf envelope.
//!
//! v1 uses a 4-byte header (version, field count, 2-byte total length)
//! and 2-byte string/list length prefixes; v2 uses a 6-byte header
//! (4-byte total length) and 4-byte prefixes, plus a `bytes` value type.
//! This crate only emits v1; both are decodable.

use super::value::{Message, Value};

const TYPE_INT: u8 = 0x01;
const TYPE_STRING: u8 = 0x02;
const TYPE_LIST: u8 = 0x03;
const TYPE_OBJECT: u8 = 0x04;
const TYPE_BYTES: u8 = 0x05;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WireError {
    #[error("empty message")]
    Empty,
    #[error("unsupported GalacticBuf version: {0}")]
    UnsupportedVersion(u8),
    #[error("truncated message: {0}")]
    Truncated(&'static str),
    #[error("invalid field name length")]
    InvalidFieldNameLength,
    #[error("too many fields")]
    TooManyFields,
    #[error("string too long for this version")]
    StringTooLong,
    #[error("list too long for this version")]
    ListTooLong,
    #[error("message too large for this version")]
    MessageTooLarge,
    #[error("mixed-type lists are not supported")]
    MixedListType,
    #[error("unsupported value type for field {0:?}")]
    UnsupportedFieldType(String),
    #[error("type id {0} is not implemented for this version")]
    UnsupportedTypeId(u8),
}

// ---------------------------------------------------------------------
// Encoding (always v1, matching the reference encoder)
// ---------------------------------------------------------------------

pub fn encode_message(msg: &Message) -> Result<Vec<u8>, WireError> {
    let mut field_bytes = Vec::new();

    for (name, value) in msg.iter() {
        encode_field_name(&mut field_bytes, name)?;
        encode_value_v1(&mut field_bytes, value)?;
    }

    let field_count = msg.len();
    if field_count > 0xFF {
        return Err(WireError::TooManyFields);
    }

    let total_length = 4 + field_bytes.len();
    if total_length > 0xFFFF {
        return Err(WireError::MessageTooLarge);
    }

    let mut out = Vec::with_capacity(total_length);
    out.push(0x01);
    out.push(field_count as u8);
    out.extend_from_slice(&(total_length as u16).to_be_bytes());
    out.extend_from_slice(&field_bytes);
    Ok(out)
}

fn encode_field_name(out: &mut Vec<u8>, name: &str) -> Result<(), WireError> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > 0xFF {
        return Err(WireError::InvalidFieldNameLength);
    }
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
    Ok(())
}

fn encode_value_v1(out: &mut Vec<u8>, value: &Value) -> Result<(), WireError> {
    match value {
        Value::Int(v) => {
            out.push(TYPE_INT);
            out.extend_from_slice(&v.to_be_bytes());
        }
        Value::Str(s) => {
            out.push(TYPE_STRING);
            encode_string_v1(out, s)?;
        }
        Value::List(items) => {
            out.push(TYPE_LIST);
            encode_list_v1(out, items)?;
        }
        Value::Object(obj) => {
            out.push(TYPE_OBJECT);
            encode_object_v1(out, obj)?;
        }
        Value::Bytes(_) => {
            return Err(WireError::UnsupportedFieldType("bytes (v1 encoder)".into()));
        }
    }
    Ok(())
}

fn encode_string_v1(out: &mut Vec<u8>, s: &str) -> Result<(), WireError> {
    let data = s.as_bytes();
    if data.len() > 0xFFFF {
        return Err(WireError::StringTooLong);
    }
    out.extend_from_slice(&(data.len() as u16).to_be_bytes());
    out.extend_from_slice(data);
    Ok(())
}

fn encode_object_v1(out: &mut Vec<u8>, obj: &Message) -> Result<(), WireError> {
    let mut field_bytes = Vec::new();
    let mut field_count = 0u32;

    for (name, value) in obj.iter() {
        encode_field_name(&mut field_bytes, name)?;
        match value {
            Value::Int(v) => {
                field_bytes.push(TYPE_INT);
                field_bytes.extend_from_slice(&v.to_be_bytes());
            }
            Value::Str(s) => {
                field_bytes.push(TYPE_STRING);
                encode_string_v1(&mut field_bytes, s)?;
            }
            other => {
                return Err(WireError::UnsupportedFieldType(format!(
                    "{:?} inside nested object ({})",
                    other, name
                )));
            }
        }
        field_count += 1;
    }

    if field_count > 0xFF {
        return Err(WireError::TooManyFields);
    }
    out.push(field_count as u8);
    out.extend_from_slice(&field_bytes);
    Ok(())
}

fn encode_list_v1(out: &mut Vec<u8>, items: &[Value]) -> Result<(), WireError> {
    if items.len() > 0xFFFF {
        return Err(WireError::ListTooLong);
    }

    let elem_type = if items.iter().all(|v| matches!(v, Value::Int(_))) {
        TYPE_INT
    } else if items.iter().all(|v| matches!(v, Value::Str(_))) {
        TYPE_STRING
    } else if items.iter().all(|v| matches!(v, Value::Object(_))) {
        TYPE_OBJECT
    } else {
        return Err(WireError::MixedListType);
    };

    out.push(elem_type);
    out.extend_from_slice(&(items.len() as u16).to_be_bytes());

    match elem_type {
        TYPE_INT => {
            for v in items {
                out.extend_from_slice(&v.as_i64().unwrap().to_be_bytes());
            }
        }
        TYPE_STRING => {
            for v in items {
                encode_string_v1(out, v.as_str().unwrap())?;
            }
        }
        TYPE_OBJECT => {
            for v in items {
                encode_object_v1(out, v.as_object().unwrap())?;
            }
        }
        _ => unreachable!(),
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Decoding (v1 and v2)
// ---------------------------------------------------------------------

/// Bounds-checked cursor over the wire buffer.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    fn u8(&mut self, ctx: &'static str) -> Result<u8, WireError> {
        let b = *self.data.get(self.pos).ok_or(WireError::Truncated(ctx))?;
        self.pos += 1;
        Ok(b)
    }

    fn bytes(&mut self, n: usize, ctx: &'static str) -> Result<&'a [u8], WireError> {
        let end = self.pos.checked_add(n).ok_or(WireError::Truncated(ctx))?;
        let slice = self.data.get(self.pos..end).ok_or(WireError::Truncated(ctx))?;
        self.pos = end;
        Ok(slice)
    }

    fn i64(&mut self, ctx: &'static str) -> Result<i64, WireError> {
        let b = self.bytes(8, ctx)?;
        Ok(i64::from_be_bytes(b.try_into().unwrap()))
    }

    fn u16(&mut self, ctx: &'static str) -> Result<u16, WireError> {
        let b = self.bytes(2, ctx)?;
        Ok(u16::from_be_bytes(b.try_into().unwrap()))
    }

    fn u32(&mut self, ctx: &'static str) -> Result<u32, WireError> {
        let b = self.bytes(4, ctx)?;
        Ok(u32::from_be_bytes(b.try_into().unwrap()))
    }

    fn string(&mut self, len: usize, ctx: &'static str) -> Result<String, WireError> {
        let b = self.bytes(len, ctx)?;
        String::from_utf8(b.to_vec()).map_err(|_| WireError::Truncated(ctx))
    }
}

/// Length-prefix width for v1 (2 bytes) vs v2 (4 bytes).
#[derive(Clone, Copy)]
enum Width {
    Two,
    Four,
}

impl Width {
    fn read_len(self, c: &mut Cursor, ctx: &'static str) -> Result<usize, WireError> {
        match self {
            Width::Two => c.u16(ctx).map(|v| v as usize),
            Width::Four => c.u32(ctx).map(|v| v as usize),
        }
    }
}

pub fn decode_message(data: &[u8]) -> Result<Message, WireError> {
    if data.is_empty() {
        return Err(WireError::Empty);
    }
    match data[0] {
        0x01 => decode_v1(data),
        0x02 => decode_v2(data),
        v => Err(WireError::UnsupportedVersion(v)),
    }
}

fn decode_v1(data: &[u8]) -> Result<Message, WireError> {
    if data.len() < 4 {
        return Err(WireError::Truncated("v1 header"));
    }
    let mut c = Cursor::new(data, 0);
    let _version = c.u8("v1 version")?;
    let field_count = c.u8("v1 field count")?;
    let _total_len = c.u16("v1 total length")?;

    let mut msg = Message::new();
    for _ in 0..field_count {
        let (name, value) = decode_field(&mut c, Width::Two)?;
        msg.push(name, value);
    }
    Ok(msg)
}

fn decode_v2(data: &[u8]) -> Result<Message, WireError> {
    if data.len() < 6 {
        return Err(WireError::Truncated("v2 header"));
    }
    let mut c = Cursor::new(data, 0);
    let _version = c.u8("v2 version")?;
    let field_count = c.u8("v2 field count")?;
    let _total_len = c.u32("v2 total length")?;

    let mut msg = Message::new();
    for _ in 0..field_count {
        let (name, value) = decode_field(&mut c, Width::Four)?;
        msg.push(name, value);
    }
    Ok(msg)
}

fn decode_field(c: &mut Cursor, width: Width) -> Result<(String, Value), WireError> {
    let name_len = c.u8("field name length")? as usize;
    let name = c.string(name_len, "field name")?;
    let type_id = c.u8("field type id")?;
    let value = decode_value(c, type_id, width)?;
    Ok((name, value))
}

fn decode_value(c: &mut Cursor, type_id: u8, width: Width) -> Result<Value, WireError> {
    match type_id {
        TYPE_INT => Ok(Value::Int(c.i64("int value")?)),
        TYPE_STRING => {
            let len = width.read_len(c, "string length")?;
            Ok(Value::Str(c.string(len, "string data")?))
        }
        TYPE_BYTES => {
            let len = width.read_len(c, "bytes length")?;
            Ok(Value::Bytes(c.bytes(len, "bytes data")?.to_vec()))
        }
        TYPE_LIST => {
            let elem_type = c.u8("list element type")?;
            let count = width.read_len(c, "list count")?;
            let mut items = Vec::with_capacity(count.min(1 << 16));
            for _ in 0..count {
                items.push(decode_value(c, elem_type, width)?);
            }
            Ok(Value::List(items))
        }
        TYPE_OBJECT => Ok(Value::Object(decode_object(c, width)?)),
        other => Err(WireError::UnsupportedTypeId(other)),
    }
}

fn decode_object(c: &mut Cursor, width: Width) -> Result<Message, WireError> {
    let field_count = c.u8("object field count")?;
    let mut obj = Message::new();
    for _ in 0..field_count {
        let name_len = c.u8("object field name length")? as usize;
        let name = c.string(name_len, "object field name")?;
        let type_id = c.u8("object field type id")?;
        // Objects only carry scalar fields (int/string/bytes), matching the
        // reference decoder which never nests lists/objects inside objects.
        let value = match type_id {
            TYPE_INT => Value::Int(c.i64("object int value")?),
            TYPE_STRING => {
                let len = width.read_len(c, "object string length")?;
                Value::Str(c.string(len, "object string data")?)
            }
            TYPE_BYTES => {
                let len = width.read_len(c, "object bytes length")?;
                Value::Bytes(c.bytes(len, "object bytes data")?.to_vec())
            }
            other => return Err(WireError::UnsupportedTypeId(other)),
        };
        obj.push(name, value);
    }
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_scalars() {
        let msg = Message::new()
            .set("user_id", 1001i64)
            .set("name", "Alice");
        let encoded = encode_message(&msg).unwrap();
        let decoded = decode_message(&encoded).unwrap();
        assert_eq!(decoded.get_i64("user_id"), Some(1001));
        assert_eq!(decoded.get_str("name"), Some("Alice"));
    }

    #[test]
    fn roundtrip_int_list() {
        let msg = Message::new().set(
            "scores",
            Value::List(vec![Value::Int(100), Value::Int(200), Value::Int(300)]),
        );
        let encoded = encode_message(&msg).unwrap();
        let decoded = decode_message(&encoded).unwrap();
        let list = decoded.get_list("scores").unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[1].as_i64(), Some(200));
    }

    #[test]
    fn roundtrip_object_list() {
        let order = Value::Object(
            Message::new()
                .set("order_id", "abc")
                .set("price", 100i64)
                .set("quantity", 5i64),
        );
        let msg = Message::new().set("bids", Value::List(vec![order.clone()]));
        let encoded = encode_message(&msg).unwrap();
        let decoded = decode_message(&encoded).unwrap();
        let bids = decoded.get_list("bids").unwrap();
        let obj = bids[0].as_object().unwrap();
        assert_eq!(obj.get_str("order_id"), Some("abc"));
        assert_eq!(obj.get_i64("price"), Some(100));
    }

    #[test]
    fn header_is_version_one() {
        let msg = Message::new().set("a", 1i64);
        let encoded = encode_message(&msg).unwrap();
        assert_eq!(encoded[0], 0x01);
        assert_eq!(encoded[1], 1); // field count
    }

    #[test]
    fn decode_rejects_unknown_version() {
        let err = decode_message(&[0x09, 0, 0, 0]).unwrap_err();
        assert_eq!(err, WireError::UnsupportedVersion(0x09));
    }

    #[test]
    fn decode_rejects_empty_input() {
        assert_eq!(decode_message(&[]).unwrap_err(), WireError::Empty);
    }

    #[test]
    fn decode_rejects_truncated_message() {
        // version + field_count=1 but no field bytes follow
        let err = decode_message(&[0x01, 0x01, 0x00, 0x04]).unwrap_err();
        assert!(matches!(err, WireError::Truncated(_)));
    }

    #[test]
    fn v2_decodes_bytes_type() {
        // Hand-build a minimal v2 message with one bytes field "blob" = [1,2,3]
        let mut body = Vec::new();
        body.push(4u8); // name len
        body.extend_from_slice(b"blob");
        body.push(TYPE_BYTES);
        body.extend_from_slice(&3u32.to_be_bytes());
        body.extend_from_slice(&[1, 2, 3]);

        let mut out = Vec::new();
        out.push(0x02);
        out.push(1); // field count
        out.extend_from_slice(&((6 + body.len()) as u32).to_be_bytes());
        out.extend_from_slice(&body);

        let decoded = decode_message(&out).unwrap();
        assert_eq!(decoded.get("blob").unwrap().as_bytes(), Some(&[1u8, 2, 3][..]));
    }
}
