use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Write};
use std::ops::Range;
use std::sync::Arc;

use bytes::Bytes;

use crate::token::{Token, TokenKind};
use crate::value::Value;

/// The type of a decoded node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A signed 64-bit integer.
    Integer,
    /// A byte string (may or may not be valid UTF-8).
    Bytes,
    /// An ordered list of values.
    List,
    /// A dictionary with byte string keys.
    Dict,
}

/// A read-only view into a decoded document.
///
/// A node is a handle over the token stream produced by [`decode`]: it
/// carries no data of its own, and every string accessor returns a slice of
/// the original input buffer. Nodes returned by container traversal share
/// the token stream and buffer by reference count, so they are cheap to
/// clone and may outlive each other in any order.
///
/// Element counts and indexed lookups are cached per node: counting is done
/// once, and accessing indices in non-decreasing order resumes from the
/// last visited element instead of rescanning from the front. The caches
/// never change what a query returns. They live in [`Cell`]s, which makes
/// `Node` `Send` but not `Sync`; to traverse from several threads, give
/// each thread its own clone.
///
/// # Examples
///
/// ```
/// use rbenc::{decode, NodeKind};
///
/// let root = decode(&b"d4:spaml1:a1:bee"[..]).unwrap();
/// assert_eq!(root.kind(), NodeKind::Dict);
///
/// let spam = root.dict_find(b"spam").unwrap();
/// assert_eq!(spam.list_len(), Some(2));
/// assert_eq!(spam.list_at(0).unwrap().as_str(), Some("a"));
/// ```
///
/// [`decode`]: crate::decode
#[derive(Clone)]
pub struct Node {
    tokens: Arc<[Token]>,
    buf: Bytes,
    idx: usize,
    /// Element count, computed on first use.
    size: Cell<Option<usize>>,
    /// Last (element index, token index) visited by indexed access.
    last: Cell<Option<(usize, usize)>>,
}

impl Node {
    pub(crate) fn root(tokens: Arc<[Token]>, buf: Bytes) -> Self {
        Node::at(tokens, buf, 0)
    }

    fn at(tokens: Arc<[Token]>, buf: Bytes, idx: usize) -> Self {
        debug_assert!(tokens[idx].kind() != TokenKind::End);
        Node {
            tokens,
            buf,
            idx,
            size: Cell::new(None),
            last: Cell::new(None),
        }
    }

    fn derive(&self, idx: usize) -> Node {
        Node::at(self.tokens.clone(), self.buf.clone(), idx)
    }

    fn token(&self) -> Token {
        self.tokens[self.idx]
    }

    /// Byte range of a string token's payload. The payload ends where the
    /// next sibling begins, so the length prefix never needs re-parsing.
    fn str_range(&self, idx: usize) -> Range<usize> {
        let t = self.tokens[idx];
        debug_assert_eq!(t.kind(), TokenKind::Str);
        let start = t.offset() + t.header_len();
        start..self.tokens[idx + t.next_item()].offset()
    }

    /// Re-parses a validated integer literal. The decoder has already
    /// checked the syntax and range, so plain accumulation cannot overflow.
    fn int_at_token(&self, idx: usize) -> i64 {
        let t = self.tokens[idx];
        let end = self.tokens[idx + t.next_item()].offset() - 1;
        let literal = &self.buf[t.offset() + 1..end];
        let (digits, negative) = match literal.split_first() {
            Some((&b'-', rest)) => (rest, true),
            _ => (literal, false),
        };
        let mut val: i64 = 0;
        for &d in digits {
            val = val * 10 - i64::from(d - b'0');
        }
        if negative {
            val
        } else {
            -val
        }
    }

    /// Returns this node's type.
    pub fn kind(&self) -> NodeKind {
        match self.token().kind() {
            TokenKind::Dict => NodeKind::Dict,
            TokenKind::List => NodeKind::List,
            TokenKind::Str => NodeKind::Bytes,
            TokenKind::Int => NodeKind::Integer,
            // nodes are never created over end markers
            TokenKind::End => unreachable!(),
        }
    }

    /// Returns the integer value, if this node is an integer.
    pub fn as_int(&self) -> Option<i64> {
        if self.token().kind() != TokenKind::Int {
            return None;
        }
        Some(self.int_at_token(self.idx))
    }

    /// Returns the string payload as a zero-copy slice of the input buffer,
    /// if this node is a string.
    pub fn as_bytes(&self) -> Option<Bytes> {
        if self.token().kind() != TokenKind::Str {
            return None;
        }
        Some(self.buf.slice(self.str_range(self.idx)))
    }

    /// Returns the string payload as UTF-8, if this node is a string and
    /// the bytes are valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        if self.token().kind() != TokenKind::Str {
            return None;
        }
        std::str::from_utf8(&self.buf[self.str_range(self.idx)]).ok()
    }

    /// Returns the number of elements, if this node is a list.
    ///
    /// The count is computed on first call and cached; repeated calls are
    /// O(1) regardless of traversal order.
    pub fn list_len(&self) -> Option<usize> {
        if self.token().kind() != TokenKind::List {
            return None;
        }
        Some(self.len_cached())
    }

    /// Returns the `i`-th list element, or `None` if this node is not a
    /// list or `i` is out of range.
    pub fn list_at(&self, i: usize) -> Option<Node> {
        if self.token().kind() != TokenKind::List {
            return None;
        }
        self.seek(i, 1).map(|idx| self.derive(idx))
    }

    /// Returns the number of key-value pairs, if this node is a dictionary.
    pub fn dict_len(&self) -> Option<usize> {
        if self.token().kind() != TokenKind::Dict {
            return None;
        }
        Some(self.len_cached())
    }

    /// Returns the `i`-th key-value pair in source order, or `None` if this
    /// node is not a dictionary or `i` is out of range. The key is a
    /// zero-copy slice of the input buffer.
    pub fn dict_at(&self, i: usize) -> Option<(Bytes, Node)> {
        if self.token().kind() != TokenKind::Dict {
            return None;
        }
        let key_idx = self.seek(i, 2)?;
        let key = self.buf.slice(self.str_range(key_idx));
        let value_idx = key_idx + self.tokens[key_idx].next_item();
        Some((key, self.derive(value_idx)))
    }

    /// Looks up a key, returning the value node of the first matching pair.
    ///
    /// Returns `None` if this node is not a dictionary or the key is
    /// absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbenc::decode;
    ///
    /// let root = decode(&b"d3:fooi7ee"[..]).unwrap();
    /// assert_eq!(root.dict_find(b"foo").and_then(|n| n.as_int()), Some(7));
    /// assert!(root.dict_find(b"bar").is_none());
    /// ```
    pub fn dict_find(&self, key: &[u8]) -> Option<Node> {
        self.dict_find_token(key).map(|idx| self.derive(idx))
    }

    /// Looks up a key and returns its integer value. `None` on absence or
    /// if the value is not an integer.
    pub fn dict_find_int(&self, key: &[u8]) -> Option<i64> {
        let idx = self.dict_find_token(key)?;
        if self.tokens[idx].kind() != TokenKind::Int {
            return None;
        }
        Some(self.int_at_token(idx))
    }

    /// Looks up a key and returns its string value as a zero-copy slice.
    /// `None` on absence or if the value is not a string.
    pub fn dict_find_bytes(&self, key: &[u8]) -> Option<Bytes> {
        let idx = self.dict_find_token(key)?;
        if self.tokens[idx].kind() != TokenKind::Str {
            return None;
        }
        Some(self.buf.slice(self.str_range(idx)))
    }

    /// Looks up a key and returns its string value as UTF-8. `None` on
    /// absence, type mismatch, or invalid UTF-8.
    pub fn dict_find_str(&self, key: &[u8]) -> Option<&str> {
        let idx = self.dict_find_token(key)?;
        if self.tokens[idx].kind() != TokenKind::Str {
            return None;
        }
        std::str::from_utf8(&self.buf[self.str_range(idx)]).ok()
    }

    /// Looks up a key whose value is a list.
    pub fn dict_find_list(&self, key: &[u8]) -> Option<Node> {
        self.dict_find(key).filter(|n| n.kind() == NodeKind::List)
    }

    /// Looks up a key whose value is a dictionary.
    pub fn dict_find_dict(&self, key: &[u8]) -> Option<Node> {
        self.dict_find(key).filter(|n| n.kind() == NodeKind::Dict)
    }

    /// Returns the `(offset, length)` of this node's exact source
    /// representation within the input buffer.
    pub fn span(&self) -> (usize, usize) {
        let t = self.token();
        let next = self.tokens[self.idx + t.next_item()];
        (t.offset(), next.offset() - t.offset())
    }

    /// Returns this node's exact source bytes, without copying.
    ///
    /// Useful for re-serializing a sub-document verbatim, for example to
    /// hash a torrent's info dictionary.
    ///
    /// # Examples
    ///
    /// ```
    /// use rbenc::decode;
    ///
    /// let root = decode(&b"d4:infod4:name4:teste1:xi1ee"[..]).unwrap();
    /// let info = root.dict_find(b"info").unwrap();
    /// assert_eq!(info.raw_bytes(), &b"d4:name4:teste"[..]);
    /// ```
    pub fn raw_bytes(&self) -> Bytes {
        let (offset, len) = self.span();
        self.buf.slice(offset..offset + len)
    }

    /// Iterates over list elements. `None` if this node is not a list.
    pub fn items(&self) -> Option<ListItems> {
        if self.token().kind() != TokenKind::List {
            return None;
        }
        Some(ListItems {
            tokens: self.tokens.clone(),
            buf: self.buf.clone(),
            idx: self.idx + 1,
        })
    }

    /// Iterates over key-value pairs in source order. `None` if this node
    /// is not a dictionary.
    pub fn entries(&self) -> Option<DictEntries> {
        if self.token().kind() != TokenKind::Dict {
            return None;
        }
        Some(DictEntries {
            tokens: self.tokens.clone(),
            buf: self.buf.clone(),
            idx: self.idx + 1,
        })
    }

    /// Materializes this node as an owned [`Value`] tree.
    ///
    /// String payloads are zero-copy slices of the input buffer. When a
    /// dictionary holds duplicate keys, the first occurrence wins, matching
    /// [`Node::dict_find`]. Recursion depth is proportional to the
    /// document's nesting depth, which the decoder bounds.
    pub fn to_value(&self) -> Value {
        match self.kind() {
            NodeKind::Integer => Value::Integer(self.int_at_token(self.idx)),
            NodeKind::Bytes => Value::Bytes(self.buf.slice(self.str_range(self.idx))),
            NodeKind::List => Value::List(
                self.items()
                    .into_iter()
                    .flatten()
                    .map(|item| item.to_value())
                    .collect(),
            ),
            NodeKind::Dict => {
                let mut dict = BTreeMap::new();
                for (key, value) in self.entries().into_iter().flatten() {
                    dict.entry(key).or_insert_with(|| value.to_value());
                }
                Value::Dict(dict)
            }
        }
    }

    fn dict_find_token(&self, key: &[u8]) -> Option<usize> {
        if self.token().kind() != TokenKind::Dict {
            return None;
        }
        let mut idx = self.idx + 1;
        while self.tokens[idx].kind() != TokenKind::End {
            // keys are always strings; the decoder enforces it
            let range = self.str_range(idx);
            let value_idx = idx + self.tokens[idx].next_item();
            if &self.buf[range] == key {
                return Some(value_idx);
            }
            idx = value_idx + self.tokens[value_idx].next_item();
        }
        None
    }

    fn len_cached(&self) -> usize {
        if let Some(n) = self.size.get() {
            return n;
        }
        let mut idx = self.idx + 1;
        let mut count = 0;
        while self.tokens[idx].kind() != TokenKind::End {
            count += 1;
            idx += self.tokens[idx].next_item();
        }
        let count = if self.token().kind() == TokenKind::Dict {
            count / 2
        } else {
            count
        };
        self.size.set(Some(count));
        count
    }

    /// Walks to element `i`, resuming from the last visited position when
    /// access is non-decreasing; backward access restarts from the first
    /// element. `links` is the number of sibling links per element: one for
    /// list items, two for dictionary pairs.
    fn seek(&self, i: usize, links: usize) -> Option<usize> {
        let (mut item, mut idx) = match self.last.get() {
            Some(cached) if cached.0 <= i => cached,
            _ => (0, self.idx + 1),
        };
        if self.tokens[idx].kind() == TokenKind::End {
            return None;
        }
        while item < i {
            for _ in 0..links {
                idx += self.tokens[idx].next_item();
            }
            if self.tokens[idx].kind() == TokenKind::End {
                return None;
            }
            item += 1;
        }
        self.last.set(Some((item, idx)));
        Some(idx)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Integer => write!(f, "{}", self.int_at_token(self.idx)),
            NodeKind::Bytes => ByteStr(&self.buf[self.str_range(self.idx)]).fmt(f),
            NodeKind::List => f
                .debug_list()
                .entries(self.items().into_iter().flatten())
                .finish(),
            NodeKind::Dict => f
                .debug_map()
                .entries(
                    self.entries()
                        .into_iter()
                        .flatten()
                        .map(|(key, value)| (OwnedByteStr(key), value)),
                )
                .finish(),
        }
    }
}

/// Renders a byte string with printable ASCII verbatim and everything else
/// hex-escaped.
struct ByteStr<'a>(&'a [u8]);

impl fmt::Debug for ByteStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for &b in self.0 {
            if (0x20..0x7f).contains(&b) && b != b'"' && b != b'\\' {
                f.write_char(b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        f.write_char('"')
    }
}

struct OwnedByteStr(Bytes);

impl fmt::Debug for OwnedByteStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ByteStr(&self.0).fmt(f)
    }
}

/// Iterator over the elements of a list node.
pub struct ListItems {
    tokens: Arc<[Token]>,
    buf: Bytes,
    idx: usize,
}

impl Iterator for ListItems {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        if self.tokens[self.idx].kind() == TokenKind::End {
            return None;
        }
        let node = Node::at(self.tokens.clone(), self.buf.clone(), self.idx);
        self.idx += self.tokens[self.idx].next_item();
        Some(node)
    }
}

/// Iterator over the key-value pairs of a dictionary node, in source order.
pub struct DictEntries {
    tokens: Arc<[Token]>,
    buf: Bytes,
    idx: usize,
}

impl Iterator for DictEntries {
    type Item = (Bytes, Node);

    fn next(&mut self) -> Option<(Bytes, Node)> {
        if self.tokens[self.idx].kind() == TokenKind::End {
            return None;
        }
        let key_tok = self.tokens[self.idx];
        let value_idx = self.idx + key_tok.next_item();
        let key_start = key_tok.offset() + key_tok.header_len();
        let key = self.buf.slice(key_start..self.tokens[value_idx].offset());
        let node = Node::at(self.tokens.clone(), self.buf.clone(), value_idx);
        self.idx = value_idx + self.tokens[value_idx].next_item();
        Some((key, node))
    }
}
