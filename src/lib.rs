//! Token-based bencode decoding and encoding ([BEP-3]).
//!
//! Bencode is the serialization format used throughout BitTorrent for
//! `.torrent` files, tracker responses, and extension messages.
//!
//! # Data Types
//!
//! Bencode supports four data types:
//!
//! | Type | Format | Example |
//! |------|--------|---------|
//! | Integer | `i<number>e` | `i42e` → 42 |
//! | Byte String | `<length>:<data>` | `4:spam` → "spam" |
//! | List | `l<items>e` | `l4:spami42ee` → ["spam", 42] |
//! | Dictionary | `d<key><value>...e` | `d3:foo3:bare` → {"foo": "bar"} |
//!
//! # Decoding
//!
//! [`decode`] makes a single pass over the input and builds a flat stream
//! of fixed-size tokens instead of an object tree. The returned [`Node`] is
//! a cheap handle over that stream: navigating into dictionaries and lists
//! yields more handles, string values come back as zero-copy slices of the
//! input buffer, and the same key can be looked up any number of times
//! without re-parsing.
//!
//! ```
//! use rbenc::decode;
//!
//! let root = decode(&b"d1:ad1:bi1e1:c4:abcde1:di3ee"[..]).unwrap();
//!
//! let a = root.dict_find(b"a").unwrap();
//! assert_eq!(a.dict_find_int(b"b"), Some(1));
//! assert_eq!(a.dict_find_str(b"c"), Some("abcd"));
//! assert_eq!(root.dict_find_int(b"d"), Some(3));
//!
//! // exact source bytes of a sub-document, without copying
//! assert_eq!(a.raw_bytes(), &b"d1:bi1e1:c4:abcde"[..]);
//! ```
//!
//! Decoding is a pure, bounded function of the input: nesting depth and
//! token count are limited (see [`decode_with_limits`]), so malformed or
//! hostile buffers fail fast with a [`DecodeError`] carrying the error kind
//! and byte offset. Truncating a buffer at any point yields an error, never
//! a crash or an out-of-bounds read.
//!
//! # Encoding
//!
//! The owned [`Value`] tree and [`encode`] cover the write side. A decoded
//! node can be materialized with [`Node::to_value`].
//!
//! ```
//! use rbenc::{decode, encode, Value};
//! use bytes::Bytes;
//! use std::collections::BTreeMap;
//!
//! let mut dict = BTreeMap::new();
//! dict.insert(Bytes::from_static(b"name"), Value::string("example.txt"));
//! dict.insert(Bytes::from_static(b"length"), Value::Integer(1024));
//!
//! let encoded = encode(&Value::Dict(dict));
//! assert_eq!(encoded, &b"d6:lengthi1024e4:name11:example.txte"[..]);
//!
//! let root = decode(encoded).unwrap();
//! assert_eq!(root.dict_find_int(b"length"), Some(1024));
//! ```
//!
//! # Error Handling
//!
//! Decode failures are values, never panics:
//!
//! - [`ErrorKind::UnexpectedEof`] - input ended mid-value
//! - [`ErrorKind::ExpectedDigit`] - malformed length prefix, integer, or
//!   dictionary key
//! - [`ErrorKind::ExpectedColon`] - string length prefix without `:`
//! - [`ErrorKind::ExpectedValue`] - a value opener was required
//! - [`ErrorKind::DepthExceeded`] / [`ErrorKind::LimitExceeded`] - resource
//!   limits crossed
//! - [`ErrorKind::Overflow`] - integer outside the `i64` range
//!
//! Type-mismatched access on a [`Node`] (for example [`Node::as_int`] on a
//! string) returns `None` rather than a made-up default.
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod decode;
mod encode;
mod error;
mod node;
mod token;
mod value;

pub use decode::{decode, decode_with_limits, DEFAULT_DEPTH_LIMIT, DEFAULT_TOKEN_LIMIT};
pub use encode::encode;
pub use error::{DecodeError, ErrorKind};
pub use node::{DictEntries, ListItems, Node, NodeKind};
pub use value::Value;
