//! Custom per-type formatters and the registration table.
//!
//! The table is assembled once with [`FormatterRegistryBuilder`] and is
//! immutable afterwards; share it behind an `Arc`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use log::{debug, warn};

use crate::core::*;

use super::geometry::{ColorFormatter, QuaternionFormatter, TechTypeFormatter, Vector3Formatter};
use super::geometry::{Color, Quaternion, TechType, Vector3};
use super::structural::{Decoder, Encoder};

/// A type-specific encode/decode pair.
///
/// Formatters take precedence over a type's structural encoding.
pub trait Formatter<T>: 'static {
    /// Write `value`.
    fn serialize(value: &T, enc: &mut Encoder<'_>) -> Result<(), CodecError>;

    /// Read a value written by [`Formatter::serialize`].
    fn deserialize(dec: &mut Decoder<'_>) -> Result<T, CodecError>;
}

struct TypedFormatter<T> {
    encode: fn(&T, &mut Encoder<'_>) -> Result<(), CodecError>,
    decode: fn(&mut Decoder<'_>) -> Result<T, CodecError>,
}

/// A registered formatter, type-erased.
pub struct FormatterEntry {
    type_name: &'static str,
    formatter_name: &'static str,
    typed: Box<dyn Any + Send + Sync>,
}

impl FormatterEntry {
    fn new<T: 'static, F: Formatter<T>>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            formatter_name: std::any::type_name::<F>(),
            typed: Box::new(TypedFormatter::<T> {
                encode: F::serialize,
                decode: F::deserialize,
            }),
        }
    }

    /// Name of the formatted type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Name of the formatter implementation.
    pub fn formatter_name(&self) -> &'static str {
        self.formatter_name
    }

    /// Encode `value` with this formatter.
    pub fn encode<T: 'static>(&self, value: &T, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        match self.typed.downcast_ref::<TypedFormatter<T>>() {
            Some(typed) => (typed.encode)(value, enc),
            None => Err(CodecError::formatter_missing::<T>()),
        }
    }

    /// Decode a `T` with this formatter.
    pub fn decode<T: 'static>(&self, dec: &mut Decoder<'_>) -> Result<T, CodecError> {
        match self.typed.downcast_ref::<TypedFormatter<T>>() {
            Some(typed) => (typed.decode)(dec),
            None => Err(CodecError::formatter_missing::<T>()),
        }
    }
}

impl fmt::Debug for FormatterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatterEntry")
            .field("type_name", &self.type_name)
            .field("formatter_name", &self.formatter_name)
            .finish()
    }
}

/// Immutable mapping from type identity to formatter.
pub struct FormatterRegistry {
    entries: HashMap<TypeId, FormatterEntry>,
}

impl FormatterRegistry {
    /// Start building a registry.
    pub fn builder() -> FormatterRegistryBuilder {
        FormatterRegistryBuilder::new()
    }

    /// A registry with no custom formatters; everything is structural.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The default table: geometric types and tech identifiers.
    pub fn standard() -> Self {
        let entries = [
            (TypeId::of::<Vector3>(), FormatterEntry::new::<Vector3, Vector3Formatter>()),
            (TypeId::of::<Quaternion>(), FormatterEntry::new::<Quaternion, QuaternionFormatter>()),
            (TypeId::of::<Color>(), FormatterEntry::new::<Color, ColorFormatter>()),
            (TypeId::of::<TechType>(), FormatterEntry::new::<TechType, TechTypeFormatter>()),
        ];
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Look up the formatter for `T`.
    pub fn get<T: 'static>(&self) -> Option<&FormatterEntry> {
        self.entries.get(&TypeId::of::<T>())
    }

    /// True if `T` has a custom formatter.
    pub fn contains<T: 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered formatters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no formatter is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over registered formatters in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = &FormatterEntry> {
        self.entries.values()
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for FormatterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        f.debug_struct("FormatterRegistry")
            .field("types", &names)
            .finish()
    }
}

/// Composition-time builder for [`FormatterRegistry`].
#[derive(Default)]
pub struct FormatterRegistryBuilder {
    entries: HashMap<TypeId, FormatterEntry>,
}

impl FormatterRegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `F` as the formatter for `T`.
    ///
    /// Fails with `DuplicateFormatter` if `T` already has one.
    pub fn register<T: 'static, F: Formatter<T>>(self) -> Result<Self, CodecError> {
        self.insert(TypeId::of::<T>(), FormatterEntry::new::<T, F>())
    }

    /// Register the geometric and tech-type formatters.
    pub fn with_standard(self) -> Result<Self, CodecError> {
        FormatterRegistry::standard()
            .entries
            .into_iter()
            .try_fold(self, |builder, (id, entry)| builder.insert(id, entry))
    }

    fn insert(mut self, id: TypeId, entry: FormatterEntry) -> Result<Self, CodecError> {
        if let Some(existing) = self.entries.get(&id) {
            warn!(
                "Rejected formatter {} for type {}: {} already registered",
                entry.formatter_name, entry.type_name, existing.formatter_name
            );
            return Err(CodecError::DuplicateFormatter {
                type_name: entry.type_name,
            });
        }
        debug!(
            "Added formatter {} for type {}",
            entry.formatter_name, entry.type_name
        );
        self.entries.insert(id, entry);
        Ok(self)
    }

    /// Freeze the table.
    pub fn build(self) -> FormatterRegistry {
        FormatterRegistry {
            entries: self.entries,
        }
    }
}
