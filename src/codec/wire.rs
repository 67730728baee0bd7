//! Marker-tagged binary value format.
//!
//! Every value starts with a one-byte marker that names its kind and, for
//! small values, carries the value or length inline. Multi-byte payloads are
//! big-endian. The layout:
//!
//! ```text
//! 0x00-0x7f  positive fixint           0xca  f32 (4 bytes)
//! 0x80-0x8f  fixmap  (len in nibble)   0xcb  f64 (8 bytes)
//! 0x90-0x9f  fixarray (len in nibble)  0xcc-0xcf  u8/u16/u32/u64
//! 0xa0-0xbf  fixstr  (len in 5 bits)   0xd0-0xd3  i8/i16/i32/i64
//! 0xc0       nil                       0xd9-0xdb  str8/str16/str32
//! 0xc2/0xc3  false/true                0xdc/0xdd  array16/array32
//! 0xc4-0xc6  bin8/bin16/bin32          0xde/0xdf  map16/map32
//! 0xe0-0xff  negative fixint
//! ```
//!
//! Floats are always written at their declared width so `f32` components
//! round-trip bit-for-bit.

use crate::core::*;

/// Append-only writer for the value format.
#[derive(Debug, Default, Clone)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Create a writer with preallocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Number of bytes written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the writer and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Write the null marker.
    pub fn write_nil(&mut self) {
        self.buf.push(MARKER_NIL);
    }

    /// Write a boolean.
    pub fn write_bool(&mut self, value: bool) {
        self.buf
            .push(if value { MARKER_TRUE } else { MARKER_FALSE });
    }

    /// Write an unsigned integer in its smallest representation.
    pub fn write_u64(&mut self, value: u64) {
        if value <= MARKER_POS_FIXINT_MAX as u64 {
            self.buf.push(value as u8);
        } else if value <= u8::MAX as u64 {
            self.buf.push(MARKER_U8);
            self.buf.push(value as u8);
        } else if value <= u16::MAX as u64 {
            self.buf.push(MARKER_U16);
            self.buf.extend_from_slice(&(value as u16).to_be_bytes());
        } else if value <= u32::MAX as u64 {
            self.buf.push(MARKER_U32);
            self.buf.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.buf.push(MARKER_U64);
            self.buf.extend_from_slice(&value.to_be_bytes());
        }
    }

    /// Write a signed integer in its smallest representation.
    pub fn write_i64(&mut self, value: i64) {
        if value >= 0 {
            self.write_u64(value as u64);
        } else if value >= -32 {
            self.buf.push(value as i8 as u8);
        } else if value >= i8::MIN as i64 {
            self.buf.push(MARKER_I8);
            self.buf.push(value as i8 as u8);
        } else if value >= i16::MIN as i64 {
            self.buf.push(MARKER_I16);
            self.buf.extend_from_slice(&(value as i16).to_be_bytes());
        } else if value >= i32::MIN as i64 {
            self.buf.push(MARKER_I32);
            self.buf.extend_from_slice(&(value as i32).to_be_bytes());
        } else {
            self.buf.push(MARKER_I64);
            self.buf.extend_from_slice(&value.to_be_bytes());
        }
    }

    /// Write a 32-bit float.
    pub fn write_f32(&mut self, value: f32) {
        self.buf.push(MARKER_F32);
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a 64-bit float.
    pub fn write_f64(&mut self, value: f64) {
        self.buf.push(MARKER_F64);
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a UTF-8 string.
    pub fn write_str(&mut self, value: &str) {
        let len = value.len();
        if len < 32 {
            self.buf.push(MARKER_FIXSTR | len as u8);
        } else if len <= u8::MAX as usize {
            self.buf.push(MARKER_STR8);
            self.buf.push(len as u8);
        } else if len <= u16::MAX as usize {
            self.buf.push(MARKER_STR16);
            self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            self.buf.push(MARKER_STR32);
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Write an opaque byte blob.
    pub fn write_bin(&mut self, value: &[u8]) {
        let len = value.len();
        if len <= u8::MAX as usize {
            self.buf.push(MARKER_BIN8);
            self.buf.push(len as u8);
        } else if len <= u16::MAX as usize {
            self.buf.push(MARKER_BIN16);
            self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            self.buf.push(MARKER_BIN32);
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
        self.buf.extend_from_slice(value);
    }

    /// Write an array header; `len` elements must follow.
    pub fn write_array_len(&mut self, len: usize) {
        if len < 16 {
            self.buf.push(MARKER_FIXARRAY | len as u8);
        } else if len <= u16::MAX as usize {
            self.buf.push(MARKER_ARRAY16);
            self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            self.buf.push(MARKER_ARRAY32);
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
    }

    /// Write a map header; `len` key/value pairs must follow.
    pub fn write_map_len(&mut self, len: usize) {
        if len < 16 {
            self.buf.push(MARKER_FIXMAP | len as u8);
        } else if len <= u16::MAX as usize {
            self.buf.push(MARKER_MAP16);
            self.buf.extend_from_slice(&(len as u16).to_be_bytes());
        } else {
            self.buf.push(MARKER_MAP32);
            self.buf.extend_from_slice(&(len as u32).to_be_bytes());
        }
    }
}

/// Cursor over an encoded buffer.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Start reading at the beginning of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True if every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Look at the next marker without consuming it.
    pub fn peek_marker(&self) -> Result<u8, DecodeError> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof)
    }

    /// True if the next value is the null marker.
    pub fn is_nil(&self) -> bool {
        self.peek_marker() == Ok(MARKER_NIL)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Consume the null marker.
    pub fn read_nil(&mut self) -> Result<(), DecodeError> {
        match self.peek_marker()? {
            MARKER_NIL => {
                self.pos += 1;
                Ok(())
            }
            found => Err(DecodeError::UnexpectedMarker {
                expected: "nil",
                found,
            }),
        }
    }

    /// Read a boolean.
    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.peek_marker()? {
            MARKER_TRUE => {
                self.pos += 1;
                Ok(true)
            }
            MARKER_FALSE => {
                self.pos += 1;
                Ok(false)
            }
            found => Err(DecodeError::UnexpectedMarker {
                expected: "bool",
                found,
            }),
        }
    }

    /// Read any integer representation as `i128`, leaving range checks to
    /// the caller.
    fn read_integer(&mut self) -> Result<i128, DecodeError> {
        let marker = self.peek_marker()?;
        let value = match marker {
            0x00..=MARKER_POS_FIXINT_MAX => {
                self.pos += 1;
                marker as i128
            }
            MARKER_NEG_FIXINT_MIN..=0xff => {
                self.pos += 1;
                marker as i8 as i128
            }
            MARKER_U8 => {
                self.pos += 1;
                self.take_array::<1>()?[0] as i128
            }
            MARKER_U16 => {
                self.pos += 1;
                u16::from_be_bytes(self.take_array()?) as i128
            }
            MARKER_U32 => {
                self.pos += 1;
                u32::from_be_bytes(self.take_array()?) as i128
            }
            MARKER_U64 => {
                self.pos += 1;
                u64::from_be_bytes(self.take_array()?) as i128
            }
            MARKER_I8 => {
                self.pos += 1;
                self.take_array::<1>()?[0] as i8 as i128
            }
            MARKER_I16 => {
                self.pos += 1;
                i16::from_be_bytes(self.take_array()?) as i128
            }
            MARKER_I32 => {
                self.pos += 1;
                i32::from_be_bytes(self.take_array()?) as i128
            }
            MARKER_I64 => {
                self.pos += 1;
                i64::from_be_bytes(self.take_array()?) as i128
            }
            found => {
                return Err(DecodeError::UnexpectedMarker {
                    expected: "integer",
                    found,
                });
            }
        };
        Ok(value)
    }

    /// Read an unsigned integer.
    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let value = self.read_integer()?;
        u64::try_from(value).map_err(|_| DecodeError::IntegerOutOfRange { type_name: "u64" })
    }

    /// Read a signed integer.
    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        let value = self.read_integer()?;
        i64::try_from(value).map_err(|_| DecodeError::IntegerOutOfRange { type_name: "i64" })
    }

    /// Read a 32-bit float. Wider floats and integers are narrowed.
    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        match self.peek_marker()? {
            MARKER_F32 => {
                self.pos += 1;
                Ok(f32::from_be_bytes(self.take_array()?))
            }
            MARKER_F64 => {
                self.pos += 1;
                Ok(f64::from_be_bytes(self.take_array()?) as f32)
            }
            _ => self.read_integer().map(|v| v as f32).map_err(|e| match e {
                DecodeError::UnexpectedMarker { found, .. } => DecodeError::UnexpectedMarker {
                    expected: "f32",
                    found,
                },
                other => other,
            }),
        }
    }

    /// Read a 64-bit float. Narrower floats and integers are widened.
    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        match self.peek_marker()? {
            MARKER_F64 => {
                self.pos += 1;
                Ok(f64::from_be_bytes(self.take_array()?))
            }
            MARKER_F32 => {
                self.pos += 1;
                Ok(f32::from_be_bytes(self.take_array()?) as f64)
            }
            _ => self.read_integer().map(|v| v as f64).map_err(|e| match e {
                DecodeError::UnexpectedMarker { found, .. } => DecodeError::UnexpectedMarker {
                    expected: "f64",
                    found,
                },
                other => other,
            }),
        }
    }

    fn read_len(&mut self, marker: u8) -> Result<usize, DecodeError> {
        let len = match marker {
            MARKER_STR8 | MARKER_BIN8 => self.take_array::<1>()?[0] as usize,
            MARKER_STR16 | MARKER_BIN16 | MARKER_ARRAY16 | MARKER_MAP16 => {
                u16::from_be_bytes(self.take_array()?) as usize
            }
            _ => u32::from_be_bytes(self.take_array()?) as usize,
        };
        Ok(len)
    }

    /// Read a string, borrowing from the input.
    pub fn read_str(&mut self) -> Result<&'a str, DecodeError> {
        let marker = self.peek_marker()?;
        let len = match marker {
            MARKER_FIXSTR..=0xbf => {
                self.pos += 1;
                (marker & 0x1f) as usize
            }
            MARKER_STR8 | MARKER_STR16 | MARKER_STR32 => {
                self.pos += 1;
                self.read_len(marker)?
            }
            found => {
                return Err(DecodeError::UnexpectedMarker {
                    expected: "string",
                    found,
                });
            }
        };
        std::str::from_utf8(self.take(len)?).map_err(|_| DecodeError::InvalidUtf8)
    }

    /// Read a byte blob, borrowing from the input.
    pub fn read_bin(&mut self) -> Result<&'a [u8], DecodeError> {
        let marker = self.peek_marker()?;
        match marker {
            MARKER_BIN8 | MARKER_BIN16 | MARKER_BIN32 => {
                self.pos += 1;
                let len = self.read_len(marker)?;
                self.take(len)
            }
            found => Err(DecodeError::UnexpectedMarker {
                expected: "binary",
                found,
            }),
        }
    }

    /// Read an array header and return the element count.
    pub fn read_array_len(&mut self) -> Result<usize, DecodeError> {
        let marker = self.peek_marker()?;
        match marker {
            MARKER_FIXARRAY..=0x9f => {
                self.pos += 1;
                Ok((marker & 0x0f) as usize)
            }
            MARKER_ARRAY16 | MARKER_ARRAY32 => {
                self.pos += 1;
                self.read_len(marker)
            }
            found => Err(DecodeError::UnexpectedMarker {
                expected: "array",
                found,
            }),
        }
    }

    /// Read a map header and return the entry count.
    pub fn read_map_len(&mut self) -> Result<usize, DecodeError> {
        let marker = self.peek_marker()?;
        match marker {
            MARKER_FIXMAP..=0x8f => {
                self.pos += 1;
                Ok((marker & 0x0f) as usize)
            }
            MARKER_MAP16 | MARKER_MAP32 => {
                self.pos += 1;
                self.read_len(marker)
            }
            found => Err(DecodeError::UnexpectedMarker {
                expected: "map",
                found,
            }),
        }
    }

    /// Skip over one complete value of any kind.
    pub fn skip(&mut self) -> Result<(), DecodeError> {
        self.skip_nested(0)
    }

    fn skip_nested(&mut self, depth: usize) -> Result<(), DecodeError> {
        if depth > MAX_SKIP_DEPTH {
            return Err(DecodeError::DepthExceeded(MAX_SKIP_DEPTH));
        }
        let marker = self.peek_marker()?;
        match marker {
            MARKER_NIL | MARKER_TRUE | MARKER_FALSE => {
                self.pos += 1;
            }
            MARKER_F32 => {
                self.pos += 1;
                self.take(4)?;
            }
            MARKER_F64 => {
                self.pos += 1;
                self.take(8)?;
            }
            MARKER_FIXSTR..=0xbf | MARKER_STR8 | MARKER_STR16 | MARKER_STR32 => {
                self.read_str()?;
            }
            MARKER_BIN8 | MARKER_BIN16 | MARKER_BIN32 => {
                self.read_bin()?;
            }
            MARKER_FIXARRAY..=0x9f | MARKER_ARRAY16 | MARKER_ARRAY32 => {
                let len = self.read_array_len()?;
                for _ in 0..len {
                    self.skip_nested(depth + 1)?;
                }
            }
            MARKER_FIXMAP..=0x8f | MARKER_MAP16 | MARKER_MAP32 => {
                let len = self.read_map_len()?;
                for _ in 0..len {
                    self.skip_nested(depth + 1)?;
                    self.skip_nested(depth + 1)?;
                }
            }
            _ => {
                self.read_integer()?;
            }
        }
        Ok(())
    }
}
