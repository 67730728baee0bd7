//! # worldsync
//!
//! Initial world-state synchronization for a client joining an
//! authoritative server. Two pieces:
//!
//! - **Codec**: type-directed binary encoding with a formatter registry,
//!   structural fallback, positional geometric formatters, whole-message
//!   compression and a per-packet delivery tag
//! - **Scheduler**: applies one decoded snapshot to many interdependent
//!   sync units in dependency waves, reports progress, detects deadlocks and
//!   acknowledges completion
//!
//! ## Feature Flags
//!
//! - `compression` (default): zstd message compression
//! - `transport` (default): tokio channel-backed [`transport::ChannelSender`]
//!   and yielding to the runtime between waves
//!
//! ## Modules
//!
//! - [`core`]: Constants, error types and the [`Packet`] trait
//! - [`codec`]: Wire format, formatters, packet codec
//! - [`sync`]: Units, wave scheduler, progress, finalization
//! - [`transport`]: Outbound sender seam and the session outbox
//! - [`packets`]: Snapshot and acknowledgement packets
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use worldsync::prelude::*;
//!
//! let codec = PacketCodec::new(Arc::new(FormatterRegistry::standard()));
//!
//! let snapshot = WorldSnapshot {
//!     player_name: "ryley".to_string(),
//!     spawn_rotation: Quaternion::IDENTITY,
//!     ..Default::default()
//! };
//! let message = codec.encode(&snapshot)?;
//! assert_eq!(message.delivery(), DeliveryMethod::ReliableOrdered);
//! assert_eq!(codec.decode::<WorldSnapshot>(&message)?, snapshot);
//!
//! let mut units = UnitRegistry::<WorldSnapshot>::new();
//! units.register(StagedUnit::new("player").step(
//!     "spawn",
//!     |snapshot: &WorldSnapshot, _ctx: &mut SyncContext<'_>| {
//!         assert_eq!(snapshot.spawn_rotation, Quaternion::IDENTITY);
//!         Ok(())
//!     },
//! ))?;
//! units.register(StagedUnit::new("story").depends_on("player"))?;
//! assert!(units.unresolved_dependencies().is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

pub mod codec;
pub mod packets;
pub mod sync;
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::codec::*;
    pub use crate::core::*;
    pub use crate::packets::*;
    pub use crate::sync::*;
    pub use crate::transport::*;
}

// Re-export commonly used items at crate root
pub use crate::codec::{DeliveryMethod, FormatterRegistry, Message, PacketCodec, Wire};
pub use crate::core::{CodecError, DecodeError, Packet, SyncError};
pub use crate::sync::{InitialSyncReceiver, SyncUnit, UnitId, UnitRegistry};
