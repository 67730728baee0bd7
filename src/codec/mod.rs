//! worldsync - Wire Codec
//!
//! Type-directed binary encoding for packets:
//!
//! - **Value format**: [`WireWriter`] / [`WireReader`], marker-tagged values
//! - **Resolver chain**: [`Encoder`] / [`Decoder`] try the
//!   [`FormatterRegistry`] first and the type's [`Wire`] impl second
//! - **Geometry**: [`Vector3`], [`Quaternion`], [`Color`], [`TechType`] and
//!   their positional formatters
//! - **Framing**: [`Compressor`] wraps whole messages, [`PacketCodec`]
//!   produces [`Message`]s tagged with a [`DeliveryMethod`]
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │   Packet value (WorldSnapshot, ...)      │
//! ├──────────────────────────────────────────┤
//! │   Resolver: formatter → structural       │
//! ├──────────────────────────────────────────┤
//! │   Value markers (WireWriter)             │
//! ├──────────────────────────────────────────┤
//! │   Frame: flag + optional zstd            │
//! └──────────────────────────────────────────┘
//! ```

mod compression;
mod formatter;
mod geometry;
mod packet;
mod structural;
mod wire;

pub use compression::*;
pub use formatter::*;
pub use geometry::*;
pub use packet::*;
pub use structural::*;
pub use wire::*;
