//! Prefix (front) coding of sorted keys
//!
//! Each record is:
//!
//! ```text
//! varint shared_prefix_len | varint suffix_len | suffix bytes
//! ```
//!
//! where `shared_prefix_len` counts the leading bytes shared with the
//! previous key. Varints are unsigned LEB128.

use super::errors::DecodeError;

const VARINT_MAX_BYTES: usize = 10;

pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Reads a varint from the front of `input`, returning it and the bytes consumed
pub fn read_varint(input: &[u8]) -> Result<(u64, usize), DecodeError> {
    let mut value: u64 = 0;
    for (i, byte) in input.iter().enumerate() {
        if i == VARINT_MAX_BYTES {
            return Err(DecodeError::MalformedVarint);
        }
        let low = u64::from(byte & 0x7F);
        if i == VARINT_MAX_BYTES - 1 && low > 1 {
            return Err(DecodeError::MalformedVarint);
        }
        value |= low << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    Err(DecodeError::UnexpectedEof)
}

/// Appends prefix-coded keys to a buffer
#[derive(Debug, Default)]
pub struct PrefixEncoder {
    previous: Vec<u8>,
    buf: Vec<u8>,
    max_key_length: usize,
}

impl PrefixEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(&mut self, key: &[u8]) {
        let shared = self
            .previous
            .iter()
            .zip(key)
            .take_while(|(a, b)| a == b)
            .count();
        let suffix = &key[shared..];

        write_varint(&mut self.buf, shared as u64);
        write_varint(&mut self.buf, suffix.len() as u64);
        self.buf.extend_from_slice(suffix);

        self.max_key_length = self.max_key_length.max(key.len());
        self.previous.clear();
        self.previous.extend_from_slice(key);
    }

    /// Longest key encoded so far
    pub fn max_key_length(&self) -> usize {
        self.max_key_length
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads prefix-coded keys back, one at a time
#[derive(Debug)]
pub struct PrefixDecoder<'a> {
    input: &'a [u8],
    pos: usize,
    previous: Vec<u8>,
    max_key_length: usize,
}

impl<'a> PrefixDecoder<'a> {
    pub fn new(input: &'a [u8], max_key_length: usize) -> Self {
        Self {
            input,
            pos: 0,
            // The stored maximum is untrusted; no key outgrows the input
            previous: Vec::with_capacity(max_key_length.min(input.len())),
            max_key_length,
        }
    }

    /// Decodes the next key; `Ok(None)` at a clean end of input
    pub fn next_key(&mut self) -> Result<Option<&[u8]>, DecodeError> {
        if self.pos == self.input.len() {
            return Ok(None);
        }

        let prefix = self.read_len()?;
        let suffix_len = self.read_len()?;

        if prefix > self.previous.len() {
            return Err(DecodeError::PrefixOutOfRange {
                prefix,
                previous: self.previous.len(),
            });
        }
        let len = prefix.saturating_add(suffix_len);
        if len > self.max_key_length {
            return Err(DecodeError::KeyTooLong {
                len,
                max: self.max_key_length,
            });
        }
        let end = self
            .pos
            .checked_add(suffix_len)
            .filter(|end| *end <= self.input.len())
            .ok_or(DecodeError::UnexpectedEof)?;

        self.previous.truncate(prefix);
        self.previous.extend_from_slice(&self.input[self.pos..end]);
        self.pos = end;

        Ok(Some(self.previous.as_slice()))
    }

    fn read_len(&mut self) -> Result<usize, DecodeError> {
        let (value, consumed) = read_varint(&self.input[self.pos..])?;
        self.pos += consumed;
        usize::try_from(value).map_err(|_| DecodeError::MalformedVarint)
    }
}
