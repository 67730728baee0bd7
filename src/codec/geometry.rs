//! Geometric value types and their formatters.
//!
//! Vectors, rotations and colors travel as fixed-size arrays of 32-bit
//! floats in declared field order. Decoders read positionally: slots missing
//! from a shorter array stay zero, slots beyond the declared count are
//! skipped.
//!
//! These types have no structural encoding; they must be registered in the
//! [`FormatterRegistry`](super::FormatterRegistry).

use std::fmt;

use crate::core::*;

use super::formatter::Formatter;
use super::structural::{Decoder, Encoder, Wire};

/// A 3-component vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vector3 {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Create a vector.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A rotation quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quaternion {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
    /// W (scalar) component.
    pub w: f32,
}

impl Quaternion {
    /// The identity rotation.
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Create a quaternion.
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }
}

/// An RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    /// Create a color.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// An item/technology identifier, carried by its stable name.
///
/// The set of names is open: peers built against different content versions
/// still interoperate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TechType(String);

impl TechType {
    /// Create an identifier from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The stable name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TechType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TechType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Wire for Vector3 {}
impl Wire for Quaternion {}
impl Wire for Color {}
impl Wire for TechType {}

fn write_slots(enc: &mut Encoder<'_>, slots: &[f32]) {
    let writer = enc.writer();
    writer.write_array_len(slots.len());
    for slot in slots {
        writer.write_f32(*slot);
    }
}

fn read_slots<T, const N: usize>(dec: &mut Decoder<'_>) -> Result<[f32; N], CodecError> {
    let reader = dec.reader();
    if reader.is_nil() {
        return Err(DecodeError::NullValue {
            type_name: std::any::type_name::<T>(),
        }
        .into());
    }
    let len = reader.read_array_len()?;
    let mut slots = [0.0f32; N];
    for i in 0..len {
        match slots.get_mut(i) {
            Some(slot) => *slot = reader.read_f32()?,
            None => reader.skip()?,
        }
    }
    Ok(slots)
}

/// Formatter for [`Vector3`]: `[x, y, z]`.
pub struct Vector3Formatter;

impl Formatter<Vector3> for Vector3Formatter {
    fn serialize(value: &Vector3, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        write_slots(enc, &[value.x, value.y, value.z]);
        Ok(())
    }

    fn deserialize(dec: &mut Decoder<'_>) -> Result<Vector3, CodecError> {
        let [x, y, z] = read_slots::<Vector3, 3>(dec)?;
        Ok(Vector3::new(x, y, z))
    }
}

/// Formatter for [`Quaternion`]: `[x, y, z, w]`.
pub struct QuaternionFormatter;

impl Formatter<Quaternion> for QuaternionFormatter {
    fn serialize(value: &Quaternion, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        write_slots(enc, &[value.x, value.y, value.z, value.w]);
        Ok(())
    }

    fn deserialize(dec: &mut Decoder<'_>) -> Result<Quaternion, CodecError> {
        let [x, y, z, w] = read_slots::<Quaternion, 4>(dec)?;
        Ok(Quaternion::new(x, y, z, w))
    }
}

/// Formatter for [`Color`]: `[r, g, b, a]`.
pub struct ColorFormatter;

impl Formatter<Color> for ColorFormatter {
    fn serialize(value: &Color, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        write_slots(enc, &[value.r, value.g, value.b, value.a]);
        Ok(())
    }

    fn deserialize(dec: &mut Decoder<'_>) -> Result<Color, CodecError> {
        let [r, g, b, a] = read_slots::<Color, 4>(dec)?;
        Ok(Color::new(r, g, b, a))
    }
}

/// Formatter for [`TechType`]: the name as a string.
pub struct TechTypeFormatter;

impl Formatter<TechType> for TechTypeFormatter {
    fn serialize(value: &TechType, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.name(value.name());
        Ok(())
    }

    fn deserialize(dec: &mut Decoder<'_>) -> Result<TechType, CodecError> {
        let reader = dec.reader();
        if reader.is_nil() {
            return Err(DecodeError::NullValue {
                type_name: std::any::type_name::<TechType>(),
            }
            .into());
        }
        Ok(TechType::new(reader.read_str()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FormatterRegistry;

    fn encode<T: Wire>(value: &T) -> Vec<u8> {
        let registry = FormatterRegistry::standard();
        let mut enc = Encoder::new(&registry);
        enc.value(value).unwrap();
        enc.into_bytes()
    }

    fn decode<T: Wire>(bytes: &[u8]) -> Result<T, CodecError> {
        let registry = FormatterRegistry::standard();
        let mut dec = Decoder::new(&registry, bytes);
        let value = dec.value()?;
        dec.finish()?;
        Ok(value)
    }

    fn floats(values: &[f32]) -> Vec<u8> {
        let registry = FormatterRegistry::empty();
        let mut enc = Encoder::new(&registry);
        enc.writer().write_array_len(values.len());
        for v in values {
            enc.writer().write_f32(*v);
        }
        enc.into_bytes()
    }

    #[test]
    fn test_identity_rotation_roundtrip() {
        let bytes = encode(&Quaternion::IDENTITY);
        let decoded: Quaternion = decode(&bytes).unwrap();
        assert_eq!(decoded.x.to_bits(), 0.0f32.to_bits());
        assert_eq!(decoded.y.to_bits(), 0.0f32.to_bits());
        assert_eq!(decoded.z.to_bits(), 0.0f32.to_bits());
        assert_eq!(decoded.w.to_bits(), 1.0f32.to_bits());
    }

    #[test]
    fn test_vector_wire_layout() {
        let bytes = encode(&Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(
            hex::encode(&bytes),
            "93ca3f800000ca40000000ca40400000"
        );
    }

    #[test]
    fn test_bit_exact_components() {
        let v = Vector3::new(f32::MIN_POSITIVE, -0.0, 1.0e-7);
        let decoded: Vector3 = decode(&encode(&v)).unwrap();
        assert_eq!(decoded.x.to_bits(), v.x.to_bits());
        assert_eq!(decoded.y.to_bits(), v.y.to_bits());
        assert_eq!(decoded.z.to_bits(), v.z.to_bits());
    }

    #[test]
    fn test_short_array_zero_defaults() {
        let decoded: Quaternion = decode(&floats(&[0.5, 0.25])).unwrap();
        assert_eq!(decoded, Quaternion::new(0.5, 0.25, 0.0, 0.0));

        let decoded: Vector3 = decode(&floats(&[])).unwrap();
        assert_eq!(decoded, Vector3::ZERO);
    }

    #[test]
    fn test_long_array_extras_ignored() {
        let decoded: Vector3 = decode(&floats(&[1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
        assert_eq!(decoded, Vector3::new(1.0, 2.0, 3.0));

        let decoded: Color = decode(&floats(&[0.1, 0.2, 0.3, 0.4, 9.0])).unwrap();
        assert_eq!(decoded, Color::new(0.1, 0.2, 0.3, 0.4));
    }

    #[test]
    fn test_null_geometry_rejected() {
        let err = decode::<Color>(&[MARKER_NIL]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(DecodeError::NullValue { .. })));

        let err = decode::<TechType>(&[MARKER_NIL]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(DecodeError::NullValue { .. })));
    }

    #[test]
    fn test_geometry_requires_formatter() {
        let registry = FormatterRegistry::empty();
        let mut enc = Encoder::new(&registry);
        let err = enc.value(&Vector3::ZERO).unwrap_err();
        assert!(matches!(err, CodecError::FormatterMissing { .. }));

        let bytes = floats(&[1.0, 2.0, 3.0]);
        let mut dec = Decoder::new(&registry, &bytes);
        let err = dec.value::<Vector3>().unwrap_err();
        assert!(matches!(err, CodecError::FormatterMissing { .. }));
    }

    #[test]
    fn test_tech_type_as_name() {
        let bytes = encode(&TechType::new("Seamoth"));
        assert_eq!(&bytes[1..], b"Seamoth");
        let decoded: TechType = decode(&bytes).unwrap();
        assert_eq!(decoded.name(), "Seamoth");
    }
}
