//! Primitive readers and writers shared by the frame and envelope layouts
//!
//! Strings are `u32` little-endian length-prefixed UTF-8. String arrays are a
//! `u32` little-endian count followed by that many strings. Every read is
//! bounds-checked against the remaining input so a truncated or inconsistent
//! stream fails with [`DecodeError`] instead of panicking.

use crate::constants::{MAX_ARRAY_LENGTH, MAX_STRING_LENGTH};
use crate::error::{DecodeError, Result};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use std::io::Write;

/// Append a length-prefixed string
pub fn write_string(buffer: &mut Vec<u8>, s: &str) -> std::io::Result<()> {
    buffer.write_u32::<LittleEndian>(s.len() as u32)?;
    buffer.write_all(s.as_bytes())
}

/// Append a counted array of length-prefixed strings
pub fn write_string_array<S: AsRef<str>>(buffer: &mut Vec<u8>, items: &[S]) -> std::io::Result<()> {
    buffer.write_u32::<LittleEndian>(items.len() as u32)?;
    for item in items {
        write_string(buffer, item.as_ref())?;
    }
    Ok(())
}

/// Bounds-checked cursor over a received byte slice
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Take exactly `n` bytes
    pub fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(DecodeError::truncated(field, self.pos, n, self.remaining()));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8> {
        Ok(self.take(1, field)?[0])
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4, field)?))
    }

    pub fn read_string(&mut self, field: &'static str) -> Result<String> {
        let len = self.read_u32(field)? as usize;
        if len > MAX_STRING_LENGTH {
            return Err(DecodeError::length_out_of_range(field, len, MAX_STRING_LENGTH));
        }
        let start = self.pos;
        let bytes = self.take(len, field)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| DecodeError::InvalidUtf8 {
            field,
            offset: start,
            reason: e.to_string(),
        })
    }

    pub fn read_string_array(&mut self, field: &'static str) -> Result<Vec<String>> {
        let count = self.read_u32(field)? as usize;
        if count > MAX_ARRAY_LENGTH {
            return Err(DecodeError::length_out_of_range(field, count, MAX_ARRAY_LENGTH));
        }
        // Each element needs at least its 4-byte length prefix
        if count * 4 > self.remaining() {
            return Err(DecodeError::truncated(field, self.pos, count * 4, self.remaining()));
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(self.read_string(field)?);
        }
        Ok(items)
    }

    /// Fail if any input is left unread
    pub fn finish(self, context: &'static str) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(DecodeError::TrailingBytes { extra, context }),
        }
    }
}
