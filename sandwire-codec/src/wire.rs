//! Wire primitives.
//!
//! Unsigned integers are LEB128 varints (at most 10 bytes, canonical form
//! only). Signed integers are zig-zag mapped first. Floats are
//! little-endian IEEE-754. Strings and byte arrays are length-prefixed.
//! Every read failure is reported as [`SerializationError::CorruptDecoder`].

use crate::error::{SerializationError, SerializationResult};

/// Maximum bytes needed to encode a u64 as a varint.
pub const MAX_VARINT_LEN: usize = 10;

#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(u8::from(value));
    }

    pub fn write_varint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buf.push((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
        self.buf.push(value as u8);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_varint(zigzag_encode(value));
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_i64(i64::from(value));
    }

    pub fn write_len(&mut self, len: usize) {
        self.write_varint(len as u64);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Length-prefixed bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_len(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Bytes with no length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> SerializationResult<u8> {
        let byte = *self
            .buf
            .get(self.pos)
            .ok_or_else(|| self.eof(1))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bool(&mut self) -> SerializationResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(SerializationError::corrupt(format!(
                "invalid bool byte 0x{other:02x} at offset {}",
                self.pos - 1
            ))),
        }
    }

    pub fn read_varint(&mut self) -> SerializationResult<u64> {
        let start = self.pos;
        let mut result: u64 = 0;
        let mut shift = 0;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.read_u8()?;
            if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
                return Err(SerializationError::corrupt(format!(
                    "varint overflows u64 at offset {start}"
                )));
            }
            result |= u64::from(byte & 0x7F) << shift;
            if byte < 0x80 {
                if byte == 0 && i > 0 {
                    return Err(SerializationError::corrupt(format!(
                        "non-canonical varint at offset {start}"
                    )));
                }
                return Ok(result);
            }
            shift += 7;
        }
        Err(SerializationError::corrupt(format!(
            "varint too long at offset {start}"
        )))
    }

    pub fn read_i64(&mut self) -> SerializationResult<i64> {
        Ok(zigzag_decode(self.read_varint()?))
    }

    pub fn read_i32(&mut self) -> SerializationResult<i32> {
        let start = self.pos;
        let value = self.read_i64()?;
        i32::try_from(value).map_err(|_| {
            SerializationError::corrupt(format!("int out of range at offset {start}: {value}"))
        })
    }

    /// Reads a length or element count. Every encoded element takes at
    /// least one byte, so a count larger than the remaining input is
    /// corrupt.
    pub fn read_len(&mut self) -> SerializationResult<usize> {
        let start = self.pos;
        let len = self.read_varint()?;
        match usize::try_from(len) {
            Ok(len) if len <= self.remaining() => Ok(len),
            _ => Err(SerializationError::corrupt(format!(
                "length {len} at offset {start} exceeds remaining {} bytes",
                self.remaining()
            ))),
        }
    }

    pub fn read_f32(&mut self) -> SerializationResult<f32> {
        let bytes = self.read_array::<4>()?;
        Ok(f32::from_le_bytes(bytes))
    }

    pub fn read_f64(&mut self) -> SerializationResult<f64> {
        let bytes = self.read_array::<8>()?;
        Ok(f64::from_le_bytes(bytes))
    }

    /// Length-prefixed bytes.
    pub fn read_bytes(&mut self) -> SerializationResult<&'a [u8]> {
        let len = self.read_len()?;
        self.read_raw(len)
    }

    pub fn read_str(&mut self) -> SerializationResult<&'a str> {
        let start = self.pos;
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes).map_err(|e| {
            SerializationError::corrupt(format!("invalid UTF-8 in string at offset {start}: {e}"))
        })
    }

    /// Exactly `len` bytes with no length prefix.
    pub fn read_raw(&mut self, len: usize) -> SerializationResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.eof(len));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> SerializationResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_raw(N)?);
        Ok(out)
    }

    /// Fails if any input is left over.
    pub fn finish(&self) -> SerializationResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(SerializationError::corrupt(format!(
                "{} trailing bytes after offset {}",
                self.remaining(),
                self.pos
            )))
        }
    }

    fn eof(&self, needed: usize) -> SerializationError {
        SerializationError::corrupt(format!(
            "unexpected end of input at offset {}: needed {needed}, available {}",
            self.pos,
            self.remaining()
        ))
    }
}

fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
