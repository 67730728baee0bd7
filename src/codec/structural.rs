//! Structural (schema-driven) encoding and the resolver contexts.
//!
//! [`Encoder::value`] and [`Decoder::value`] are the single entry points for
//! every value, top-level or nested. They consult the [`FormatterRegistry`]
//! first and fall back to the type's [`Wire`] implementation second.
//!
//! Structures are encoded as an array of their fields in declared order.
//! Decoders accept shorter arrays (trailing fields fall back to their
//! default where the type allows it) and longer arrays (extra elements are
//! skipped), so a schema can grow at the end without breaking old peers.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::str::FromStr;

use crate::core::*;

use super::formatter::FormatterRegistry;
use super::wire::{WireReader, WireWriter};

/// Structural encoding for a type.
///
/// The default methods report [`CodecError::FormatterMissing`]: a type that
/// implements `Wire` without overriding them can only be encoded through a
/// registered formatter (structural fallback is disabled for it).
pub trait Wire: Sized + 'static {
    /// Encode `self` field by field.
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        let _ = enc;
        Err(CodecError::formatter_missing::<Self>())
    }

    /// Decode a value written by [`Wire::encode_structural`].
    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let _ = dec;
        Err(CodecError::formatter_missing::<Self>())
    }
}

/// Encoding context: output buffer plus the formatter table.
#[derive(Debug)]
pub struct Encoder<'a> {
    registry: &'a FormatterRegistry,
    writer: WireWriter,
}

impl<'a> Encoder<'a> {
    /// Create an encoder over an empty buffer.
    pub fn new(registry: &'a FormatterRegistry) -> Self {
        Self {
            registry,
            writer: WireWriter::with_capacity(256),
        }
    }

    /// Encode `value` through the resolver chain.
    pub fn value<T: Wire>(&mut self, value: &T) -> Result<(), CodecError> {
        let registry = self.registry;
        match registry.get::<T>() {
            Some(entry) => entry.encode(value, self),
            None => value.encode_structural(self),
        }
    }

    /// Start a structure with `fields` fields; exactly that many
    /// [`Encoder::value`] calls must follow.
    pub fn begin_struct(&mut self, fields: usize) {
        self.writer.write_array_len(fields);
    }

    /// Write an enum-like identifier by its stable name.
    pub fn name(&mut self, name: &str) {
        self.writer.write_str(name);
    }

    /// Raw access to the underlying writer.
    pub fn writer(&mut self) -> &mut WireWriter {
        &mut self.writer
    }

    /// The formatter table in use.
    pub fn registry(&self) -> &'a FormatterRegistry {
        self.registry
    }

    /// Finish encoding and return the bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_bytes()
    }
}

/// Decoding context: input cursor plus the formatter table.
#[derive(Debug)]
pub struct Decoder<'a> {
    registry: &'a FormatterRegistry,
    reader: WireReader<'a>,
}

impl<'a> Decoder<'a> {
    /// Create a decoder over `data`.
    pub fn new(registry: &'a FormatterRegistry, data: &'a [u8]) -> Self {
        Self {
            registry,
            reader: WireReader::new(data),
        }
    }

    /// Decode a `T` through the resolver chain.
    pub fn value<T: Wire>(&mut self) -> Result<T, CodecError> {
        let registry = self.registry;
        match registry.get::<T>() {
            Some(entry) => entry.decode::<T>(self),
            None => T::decode_structural(self),
        }
    }

    /// Open a structure of type `T`.
    ///
    /// The null marker is rejected here: structures are never nullable
    /// unless wrapped in `Option`.
    pub fn begin_struct<T>(&mut self) -> Result<StructReader<'_, 'a>, CodecError> {
        let type_name = std::any::type_name::<T>();
        if self.reader.is_nil() {
            return Err(DecodeError::NullValue { type_name }.into());
        }
        let len = self.reader.read_array_len()?;
        Ok(StructReader {
            dec: self,
            type_name,
            len,
            index: 0,
        })
    }

    /// Read an enum-like identifier by its stable name.
    pub fn name<T: FromStr>(&mut self) -> Result<T, CodecError> {
        let name = self.reader.read_str()?;
        name.parse().map_err(|_| {
            DecodeError::UnknownVariant {
                type_name: std::any::type_name::<T>(),
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Raw access to the underlying reader.
    pub fn reader(&mut self) -> &mut WireReader<'a> {
        &mut self.reader
    }

    /// The formatter table in use.
    pub fn registry(&self) -> &'a FormatterRegistry {
        self.registry
    }

    /// Ensure the whole input was consumed.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.reader.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

/// Positional field reader returned by [`Decoder::begin_struct`].
#[derive(Debug)]
pub struct StructReader<'d, 'a> {
    dec: &'d mut Decoder<'a>,
    type_name: &'static str,
    len: usize,
    index: usize,
}

impl StructReader<'_, '_> {
    /// Number of fields present on the wire.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the wire structure carries no fields.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the next field; it must be present.
    pub fn field<F: Wire>(&mut self) -> Result<F, CodecError> {
        if self.index >= self.len {
            return Err(DecodeError::MissingField {
                type_name: self.type_name,
                index: self.index,
            }
            .into());
        }
        self.index += 1;
        self.dec.value()
    }

    /// Read the next field, or its default if the sender's schema ended
    /// before it.
    pub fn field_or_default<F: Wire + Default>(&mut self) -> Result<F, CodecError> {
        if self.index >= self.len {
            self.index += 1;
            return Ok(F::default());
        }
        self.field()
    }

    /// Skip any fields this build does not know about.
    pub fn finish(mut self) -> Result<(), CodecError> {
        for _ in self.index.min(self.len)..self.len {
            self.dec.reader().skip()?;
        }
        Ok(())
    }
}

// =============================================================================
// PRIMITIVE IMPLEMENTATIONS
// =============================================================================

macro_rules! wire_unsigned {
    ($($t:ty),*) => {
        $(
            impl Wire for $t {
                fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
                    enc.writer().write_u64(*self as u64);
                    Ok(())
                }

                fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
                    let value = dec.reader().read_u64()?;
                    <$t>::try_from(value).map_err(|_| {
                        DecodeError::IntegerOutOfRange { type_name: stringify!($t) }.into()
                    })
                }
            }
        )*
    };
}

macro_rules! wire_signed {
    ($($t:ty),*) => {
        $(
            impl Wire for $t {
                fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
                    enc.writer().write_i64(*self as i64);
                    Ok(())
                }

                fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
                    let value = dec.reader().read_i64()?;
                    <$t>::try_from(value).map_err(|_| {
                        DecodeError::IntegerOutOfRange { type_name: stringify!($t) }.into()
                    })
                }
            }
        )*
    };
}

wire_unsigned!(u8, u16, u32, u64);
wire_signed!(i8, i16, i32, i64);

impl Wire for bool {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.writer().write_bool(*self);
        Ok(())
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(dec.reader().read_bool()?)
    }
}

impl Wire for f32 {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.writer().write_f32(*self);
        Ok(())
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(dec.reader().read_f32()?)
    }
}

impl Wire for f64 {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.writer().write_f64(*self);
        Ok(())
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(dec.reader().read_f64()?)
    }
}

impl Wire for String {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.writer().write_str(self);
        Ok(())
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        Ok(dec.reader().read_str()?.to_string())
    }
}

impl<T: Wire> Wire for Option<T> {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        match self {
            Some(value) => enc.value(value),
            None => {
                enc.writer().write_nil();
                Ok(())
            }
        }
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        if dec.reader().is_nil() {
            dec.reader().read_nil()?;
            return Ok(None);
        }
        dec.value().map(Some)
    }
}

impl<T: Wire> Wire for Vec<T> {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.writer().write_array_len(self.len());
        for item in self {
            enc.value(item)?;
        }
        Ok(())
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let len = dec.reader().read_array_len()?;
        // Each element needs at least one byte; don't trust the header for capacity.
        let mut items = Vec::with_capacity(len.min(dec.reader().remaining()));
        for _ in 0..len {
            items.push(dec.value()?);
        }
        Ok(items)
    }
}

impl<K: Wire + Ord, V: Wire> Wire for BTreeMap<K, V> {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.writer().write_map_len(self.len());
        for (key, value) in self {
            enc.value(key)?;
            enc.value(value)?;
        }
        Ok(())
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let len = dec.reader().read_map_len()?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let key = dec.value()?;
            let value = dec.value()?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<K: Wire + Eq + Hash, V: Wire> Wire for HashMap<K, V> {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.writer().write_map_len(self.len());
        for (key, value) in self {
            enc.value(key)?;
            enc.value(value)?;
        }
        Ok(())
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let len = dec.reader().read_map_len()?;
        let mut map = HashMap::with_capacity(len.min(dec.reader().remaining() / 2));
        for _ in 0..len {
            let key = dec.value()?;
            let value = dec.value()?;
            map.insert(key, value);
        }
        Ok(map)
    }
}
