//! worldsync - Transport Layer
//!
//! The transport itself (sockets, retransmission) is owned by the host.
//! This module is the seam the core talks through:
//!
//! - **Senders**: [`PacketSender`] trait, [`ChannelSender`] for tokio channels
//! - **Outbox**: [`Outbox`] encodes packets and drops suppressed types
//! - **Suppression**: [`PacketSuppressor`] / [`SuppressionGuard`], scoped to
//!   one sync session
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Sync units / finalizer          │
//! ├─────────────────────────────────────────┤
//! │   Outbox: suppression + PacketCodec     │  ← This module
//! ├─────────────────────────────────────────┤
//! │   PacketSender (host socket, channel)   │
//! └─────────────────────────────────────────┘
//! ```

mod outbox;
mod sender;

pub use outbox::*;
pub use sender::*;

#[cfg(test)]
pub(crate) use sender::RecordingSender;
