use std::sync::Arc;

use bytes::Bytes;

use crate::error::{DecodeError, ErrorKind};
use crate::node::Node;
use crate::token::{Token, TokenKind, MAX_NEXT_ITEM, MAX_OFFSET};

/// Default maximum nesting depth.
pub const DEFAULT_DEPTH_LIMIT: usize = 1000;

/// Default maximum number of tokens emitted for a single document.
pub const DEFAULT_TOKEN_LIMIT: usize = 1_000_000;

/// Maximum number of digits in a string length prefix, bounded by the
/// header field of [`Token`].
const MAX_LENGTH_DIGITS: usize = 8;

/// One open container during the scan. For dictionaries, `expecting_value`
/// tracks whether the element parsed next is a key or a value.
struct Frame {
    token: usize,
    expecting_value: bool,
}

/// Decodes one bencoded value with the default depth and token limits.
///
/// The returned [`Node`] is the root of the decoded document and shares the
/// input buffer; string and raw-byte accessors return slices of it without
/// copying. Trailing bytes after the first complete value are not an error;
/// [`Node::span`] on the root reports how many bytes were consumed.
///
/// # Errors
///
/// Returns a [`DecodeError`] carrying the error kind and the byte offset
/// where the failure was detected. Nothing is decoded partially.
///
/// # Examples
///
/// ```
/// use rbenc::decode;
///
/// let root = decode(&b"d3:cow3:moo4:spam4:eggse"[..]).unwrap();
/// assert_eq!(root.dict_find_str(b"cow"), Some("moo"));
/// assert_eq!(root.dict_find_str(b"spam"), Some("eggs"));
/// ```
pub fn decode(data: impl Into<Bytes>) -> Result<Node, DecodeError> {
    decode_with_limits(data, DEFAULT_DEPTH_LIMIT, DEFAULT_TOKEN_LIMIT)
}

/// Decodes one bencoded value with explicit limits.
///
/// `depth_limit` bounds how many containers may be open at once; a document
/// nesting `depth_limit + 1` containers fails with
/// [`ErrorKind::DepthExceeded`]. `token_limit` bounds the total number of
/// tokens emitted, counting container end markers; exceeding it fails with
/// [`ErrorKind::LimitExceeded`]. Both limits exist to bound CPU and memory
/// spent on untrusted input.
///
/// # Errors
///
/// Returns a [`DecodeError`] carrying the error kind and byte offset.
///
/// # Examples
///
/// ```
/// use rbenc::{decode_with_limits, ErrorKind};
///
/// let err = decode_with_limits(&b"lllleeee"[..], 3, 1000).unwrap_err();
/// assert_eq!(err.kind, ErrorKind::DepthExceeded);
/// ```
pub fn decode_with_limits(
    data: impl Into<Bytes>,
    depth_limit: usize,
    token_limit: usize,
) -> Result<Node, DecodeError> {
    let buf = data.into();
    let tokens = scan(&buf, depth_limit, token_limit)?;
    Ok(Node::root(Arc::from(tokens), buf))
}

fn scan(buf: &[u8], depth_limit: usize, token_limit: usize) -> Result<Vec<Token>, DecodeError> {
    if buf.len() > MAX_OFFSET {
        return Err(DecodeError::new(ErrorKind::LimitExceeded, 0));
    }
    // next_item distances are bounded by the stream length, so clamping the
    // token limit keeps every back-patch within its bit-field
    let token_limit = token_limit.min(MAX_NEXT_ITEM);

    let mut tokens: Vec<Token> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut pos = 0;

    loop {
        if pos >= buf.len() {
            return Err(DecodeError::new(ErrorKind::UnexpectedEof, pos));
        }
        let c = buf[pos];

        // dictionary keys must be strings; at a key position only a length
        // prefix or the closing 'e' may appear
        if let Some(frame) = stack.last() {
            if tokens[frame.token].kind() == TokenKind::Dict
                && !frame.expecting_value
                && !c.is_ascii_digit()
                && c != b'e'
            {
                return Err(DecodeError::new(ErrorKind::ExpectedDigit, pos));
            }
        }

        let depth_before = stack.len();

        match c {
            b'd' | b'l' => {
                if stack.len() + 1 > depth_limit {
                    return Err(DecodeError::new(ErrorKind::DepthExceeded, pos));
                }
                let kind = if c == b'd' { TokenKind::Dict } else { TokenKind::List };
                stack.push(Frame {
                    token: tokens.len(),
                    expecting_value: false,
                });
                push_token(&mut tokens, Token::new(pos, kind, 0, 0), token_limit, pos)?;
                pos += 1;
            }
            b'e' => {
                let Some(frame) = stack.pop() else {
                    return Err(DecodeError::new(ErrorKind::UnexpectedEof, pos));
                };
                if tokens[frame.token].kind() == TokenKind::Dict && frame.expecting_value {
                    // a key with no value
                    return Err(DecodeError::new(ErrorKind::ExpectedValue, pos));
                }
                push_token(
                    &mut tokens,
                    Token::new(pos, TokenKind::End, 1, 0),
                    token_limit,
                    pos,
                )?;
                // point the container one past its end marker
                let skip = tokens.len() - frame.token;
                tokens[frame.token].set_next_item(skip);
                pos += 1;
            }
            b'i' => {
                let end = check_integer(buf, pos + 1)?;
                push_token(
                    &mut tokens,
                    Token::new(pos, TokenKind::Int, 1, 1),
                    token_limit,
                    pos,
                )?;
                // skip the terminating 'e'
                pos = end + 1;
            }
            b'0'..=b'9' => {
                let (payload_len, header_len) = scan_string_header(buf, pos)?;
                if header_len - 1 > MAX_LENGTH_DIGITS {
                    return Err(DecodeError::new(ErrorKind::LimitExceeded, pos));
                }
                push_token(
                    &mut tokens,
                    Token::new(pos, TokenKind::Str, 1, header_len),
                    token_limit,
                    pos,
                )?;
                pos += header_len + payload_len;
            }
            _ => {
                return Err(DecodeError::new(ErrorKind::ExpectedValue, pos));
            }
        }

        // Alternate the enclosing dictionary between key and value
        // positions. A container opened as a dictionary value already
        // toggled its parent when it was opened, so closing it must not
        // toggle again; the depth comparison rules that case out.
        if depth_before > 0 && depth_before <= stack.len() {
            let frame = &mut stack[depth_before - 1];
            if tokens[frame.token].kind() == TokenKind::Dict {
                frame.expecting_value = !frame.expecting_value;
            }
        }

        if stack.is_empty() {
            break;
        }
    }

    // the logical end of the document, one past everything parsed
    push_token(
        &mut tokens,
        Token::new(pos, TokenKind::End, 0, 0),
        token_limit,
        pos,
    )?;
    Ok(tokens)
}

fn push_token(
    tokens: &mut Vec<Token>,
    token: Token,
    token_limit: usize,
    pos: usize,
) -> Result<(), DecodeError> {
    if tokens.len() >= token_limit {
        return Err(DecodeError::new(ErrorKind::LimitExceeded, pos));
    }
    tokens.push(token);
    Ok(())
}

/// Validates an integer literal starting right after the `i` marker and
/// returns the index of the terminating `e`. The value is range-checked
/// here but not stored; accessors re-parse it from the buffer.
fn check_integer(buf: &[u8], start: usize) -> Result<usize, DecodeError> {
    let mut pos = start;
    if pos >= buf.len() {
        return Err(DecodeError::new(ErrorKind::UnexpectedEof, pos));
    }
    let negative = buf[pos] == b'-';
    if negative {
        pos += 1;
        if pos >= buf.len() {
            return Err(DecodeError::new(ErrorKind::UnexpectedEof, pos));
        }
    }
    if !buf[pos].is_ascii_digit() {
        return Err(DecodeError::new(ErrorKind::ExpectedDigit, pos));
    }
    let first_digit = pos;
    let zero_led = buf[pos] == b'0';
    // accumulate in the negative domain so that i64::MIN is representable
    let mut val = -i64::from(buf[pos] - b'0');
    pos += 1;
    loop {
        if pos >= buf.len() {
            return Err(DecodeError::new(ErrorKind::UnexpectedEof, pos));
        }
        let c = buf[pos];
        if c == b'e' {
            break;
        }
        if !c.is_ascii_digit() {
            return Err(DecodeError::new(ErrorKind::ExpectedDigit, pos));
        }
        if zero_led {
            // only the literal `0` may start with a zero
            return Err(DecodeError::new(ErrorKind::ExpectedDigit, pos));
        }
        val = val
            .checked_mul(10)
            .and_then(|v| v.checked_sub(i64::from(c - b'0')))
            .ok_or(DecodeError::new(ErrorKind::Overflow, pos))?;
        pos += 1;
    }
    if negative && val == 0 {
        return Err(DecodeError::new(ErrorKind::ExpectedDigit, first_digit));
    }
    if !negative && val == i64::MIN {
        return Err(DecodeError::new(ErrorKind::Overflow, pos - 1));
    }
    Ok(pos)
}

/// Parses a string length prefix starting at `start` (a digit) and returns
/// `(payload length, header length)`, the header covering the digits and
/// the colon.
fn scan_string_header(buf: &[u8], start: usize) -> Result<(usize, usize), DecodeError> {
    let mut pos = start;
    let mut len: i64 = 0;
    while pos < buf.len() && buf[pos] != b':' {
        let c = buf[pos];
        if !c.is_ascii_digit() {
            return Err(DecodeError::new(ErrorKind::ExpectedDigit, pos));
        }
        len = len
            .checked_mul(10)
            .and_then(|v| v.checked_add(i64::from(c - b'0')))
            .ok_or(DecodeError::new(ErrorKind::Overflow, pos))?;
        pos += 1;
    }
    if pos >= buf.len() {
        return Err(DecodeError::new(ErrorKind::ExpectedColon, pos));
    }
    let remaining = buf.len() - pos - 1;
    if len as u64 > remaining as u64 {
        // reported at the length prefix, which is what overclaims
        return Err(DecodeError::new(ErrorKind::UnexpectedEof, start));
    }
    Ok((len as usize, pos - start + 1))
}
