use bytes::{BufMut, Bytes, BytesMut};

use crate::value::Value;

/// Encodes a value to canonical bencoding.
///
/// - Integers: `i<number>e`
/// - Byte strings: `<length>:<data>`
/// - Lists: `l<items>e`
/// - Dictionaries: `d<key><value>...e`, keys in lexicographic order
///
/// Dictionary keys come out sorted because [`Value::Dict`] is a
/// [`BTreeMap`](std::collections::BTreeMap), so `encode(decode(x).to_value())`
/// reproduces `x` byte-for-byte whenever `x` itself is canonical.
///
/// # Examples
///
/// ```
/// use rbenc::{encode, Value};
///
/// assert_eq!(encode(&Value::Integer(42)), &b"i42e"[..]);
/// assert_eq!(encode(&Value::string("hello")), &b"5:hello"[..]);
///
/// let list = Value::List(vec![Value::Integer(1), Value::string("two")]);
/// assert_eq!(encode(&list), &b"li1e3:twoe"[..]);
/// ```
pub fn encode(value: &Value) -> Bytes {
    let mut buf = BytesMut::new();
    encode_value(value, &mut buf);
    buf.freeze()
}

fn encode_value(value: &Value, buf: &mut BytesMut) {
    match value {
        Value::Integer(i) => {
            buf.put_u8(b'i');
            buf.put_slice(i.to_string().as_bytes());
            buf.put_u8(b'e');
        }
        Value::Bytes(b) => {
            buf.put_slice(b.len().to_string().as_bytes());
            buf.put_u8(b':');
            buf.put_slice(b);
        }
        Value::List(items) => {
            buf.put_u8(b'l');
            for item in items {
                encode_value(item, buf);
            }
            buf.put_u8(b'e');
        }
        Value::Dict(dict) => {
            buf.put_u8(b'd');
            for (key, val) in dict {
                buf.put_slice(key.len().to_string().as_bytes());
                buf.put_u8(b':');
                buf.put_slice(key);
                encode_value(val, buf);
            }
            buf.put_u8(b'e');
        }
    }
}
