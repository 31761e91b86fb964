//! Minimal Solidity ABI codec.
//!
//! Covers the parameter types the ledger and registry contracts use:
//! `address`, `uint256` (bounded to `u64`), `bool`, `string` and `uint256[]`.
//! Function selectors are fixed constants supplied by the caller.

use crate::types::Address;

const WORD: usize = 32;

/// ABI codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AbiError {
    #[error("data too short: need {needed} bytes at offset {offset}, have {len}")]
    OutOfBounds {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("uint256 value does not fit in 64 bits")]
    Overflow,

    #[error("invalid bool word")]
    InvalidBool,

    #[error("string is not valid UTF-8")]
    InvalidUtf8,
}

/// A value passed to or returned from a contract function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(u64),
    Bool(bool),
    String(String),
    UintArray(Vec<u64>),
}

impl Token {
    pub fn into_address(self) -> Option<Address> {
        match self {
            Token::Address(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_uint(self) -> Option<u64> {
        match self {
            Token::Uint(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_bool(self) -> Option<bool> {
        match self {
            Token::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_uint_array(self) -> Option<Vec<u64>> {
        match self {
            Token::UintArray(v) => Some(v),
            _ => None,
        }
    }
}

/// Expected type of a returned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Uint,
    Bool,
    String,
    UintArray,
}

fn uint_word(value: u64) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}

fn padded(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    let rem = out.len() % WORD;
    if rem != 0 {
        out.resize(out.len() + WORD - rem, 0);
    }
    out
}

/// Head word of a static token; `None` for dynamic tokens.
fn static_word(token: &Token) -> Option<[u8; WORD]> {
    match token {
        Token::Address(a) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(a.as_bytes());
            Some(word)
        }
        Token::Uint(v) => Some(uint_word(*v)),
        Token::Bool(b) => Some(uint_word(u64::from(*b))),
        Token::String(_) | Token::UintArray(_) => None,
    }
}

fn encode_tail(token: &Token) -> Vec<u8> {
    match token {
        Token::String(s) => {
            let mut out = uint_word(s.len() as u64).to_vec();
            out.extend(padded(s.as_bytes()));
            out
        }
        Token::UintArray(values) => {
            let mut out = uint_word(values.len() as u64).to_vec();
            for v in values {
                out.extend_from_slice(&uint_word(*v));
            }
            out
        }
        _ => Vec::new(),
    }
}

/// Encode a parameter list with head/tail layout.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match static_word(token) {
            Some(word) => head.extend_from_slice(&word),
            None => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
                tail.extend(encode_tail(token));
            }
        }
    }

    head.extend(tail);
    head
}

/// Encode a call: 4-byte selector followed by the encoded arguments.
pub fn encode_call(selector: [u8; 4], args: &[Token]) -> Vec<u8> {
    let mut data = selector.to_vec();
    data.extend(encode(args));
    data
}

/// `len` bytes starting at `offset`, with offsets taken from untrusted data.
fn slice_at(data: &[u8], offset: usize, len: usize) -> Result<&[u8], AbiError> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(AbiError::OutOfBounds {
            offset,
            needed: len,
            len: data.len(),
        })
}

fn word_at(data: &[u8], offset: usize) -> Result<&[u8], AbiError> {
    slice_at(data, offset, WORD)
}

fn out_of_bounds(offset: usize, data: &[u8]) -> AbiError {
    AbiError::OutOfBounds {
        offset,
        needed: WORD,
        len: data.len(),
    }
}

fn read_uint(data: &[u8], offset: usize) -> Result<u64, AbiError> {
    let word = word_at(data, offset)?;
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(AbiError::Overflow);
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[WORD - 8..]);
    Ok(u64::from_be_bytes(buf))
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, AbiError> {
    usize::try_from(read_uint(data, offset)?).map_err(|_| AbiError::Overflow)
}

fn decode_one(data: &[u8], head_offset: usize, kind: ParamType) -> Result<Token, AbiError> {
    match kind {
        ParamType::Address => {
            let word = word_at(data, head_offset)?;
            let mut bytes = [0u8; 20];
            bytes.copy_from_slice(&word[12..]);
            Ok(Token::Address(Address::from_bytes(bytes)))
        }
        ParamType::Uint => read_uint(data, head_offset).map(Token::Uint),
        ParamType::Bool => match read_uint(data, head_offset) {
            Ok(0) => Ok(Token::Bool(false)),
            Ok(1) => Ok(Token::Bool(true)),
            Ok(_) | Err(AbiError::Overflow) => Err(AbiError::InvalidBool),
            Err(e) => Err(e),
        },
        ParamType::String => {
            let start = read_usize(data, head_offset)?;
            let len = read_usize(data, start)?;
            let body = start
                .checked_add(WORD)
                .ok_or_else(|| out_of_bounds(start, data))?;
            let bytes = slice_at(data, body, len)?;
            String::from_utf8(bytes.to_vec())
                .map(Token::String)
                .map_err(|_| AbiError::InvalidUtf8)
        }
        ParamType::UintArray => {
            let start = read_usize(data, head_offset)?;
            let len = read_usize(data, start)?;
            let mut values = Vec::with_capacity(len.min(1024));
            for i in 0..len {
                let offset = i
                    .checked_add(1)
                    .and_then(|n| n.checked_mul(WORD))
                    .and_then(|n| n.checked_add(start))
                    .ok_or_else(|| out_of_bounds(start, data))?;
                values.push(read_uint(data, offset)?);
            }
            Ok(Token::UintArray(values))
        }
    }
}

/// Decode return data laid out as a flat parameter list.
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    types
        .iter()
        .enumerate()
        .map(|(i, kind)| decode_one(data, i * WORD, *kind))
        .collect()
}

/// Decode a multi-field record returned either as a flat parameter list or
/// as a single struct (a dynamic tuple behind one leading offset word).
///
/// A flat list of two or more fields never starts with the offset `32`: a
/// dynamic first field points past the whole head. Single values must go
/// through [`decode`], since a lone dynamic return always starts with `32`.
pub fn decode_record(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, AbiError> {
    let has_dynamic = types
        .iter()
        .any(|t| matches!(t, ParamType::String | ParamType::UintArray));
    if types.len() > 1 && has_dynamic && read_uint(data, 0)? == WORD as u64 {
        return decode(types, &data[WORD..]);
    }
    decode(types, data)
}
