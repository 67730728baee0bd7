//! Session outbox with packet suppression.
//!
//! While a snapshot is being applied, units mutate local state that would
//! normally broadcast change events back to the server. A unit takes a
//! [`SuppressionGuard`] for those event packets; until the guard drops, the
//! [`Outbox`] silently discards them. The suppressor belongs to one session
//! and dies with it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::trace;

use crate::codec::PacketCodec;
use crate::core::*;

use super::sender::PacketSender;

#[derive(Debug, Default)]
struct SuppressorState {
    active: HashMap<&'static str, usize>,
    dropped: u64,
}

/// Set of packet types currently being suppressed.
#[derive(Debug, Clone, Default)]
pub struct PacketSuppressor {
    state: Arc<Mutex<SuppressorState>>,
}

impl PacketSuppressor {
    /// Create an empty suppressor.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SuppressorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Suppress packets of type `P` until the guard is dropped.
    pub fn suppress<P: Packet>(&self) -> SuppressionGuard {
        self.suppress_type(P::PACKET_TYPE)
    }

    /// Suppress packets with the given type name until the guard is dropped.
    ///
    /// Guards nest: the type stays suppressed until every guard is gone.
    pub fn suppress_type(&self, packet_type: &'static str) -> SuppressionGuard {
        *self.lock().active.entry(packet_type).or_insert(0) += 1;
        SuppressionGuard {
            state: Arc::clone(&self.state),
            packet_type,
        }
    }

    /// True while at least one guard for `packet_type` is alive.
    pub fn is_suppressed(&self, packet_type: &str) -> bool {
        self.lock().active.contains_key(packet_type)
    }

    /// Number of packets discarded so far.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    fn record_drop(&self) {
        self.lock().dropped += 1;
    }
}

/// RAII guard returned by [`PacketSuppressor::suppress`].
#[derive(Debug)]
#[must_use = "suppression ends when the guard is dropped"]
pub struct SuppressionGuard {
    state: Arc<Mutex<SuppressorState>>,
    packet_type: &'static str,
}

impl SuppressionGuard {
    /// The suppressed packet type.
    pub fn packet_type(&self) -> &'static str {
        self.packet_type
    }
}

impl Drop for SuppressionGuard {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = state.active.get_mut(self.packet_type) {
            *count -= 1;
            if *count == 0 {
                state.active.remove(self.packet_type);
            }
        }
    }
}

/// What happened to a packet handed to the [`Outbox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Encoded and passed to the transport.
    Sent,
    /// Discarded because its type is suppressed.
    Suppressed,
}

/// Encodes packets and sends them, honoring suppression.
#[derive(Clone)]
pub struct Outbox {
    codec: PacketCodec,
    sender: Arc<dyn PacketSender>,
    suppressor: PacketSuppressor,
}

impl Outbox {
    /// Create an outbox with a fresh suppressor.
    pub fn new(codec: PacketCodec, sender: Arc<dyn PacketSender>) -> Self {
        Self::with_suppressor(codec, sender, PacketSuppressor::new())
    }

    /// Create an outbox sharing an existing suppressor.
    pub fn with_suppressor(
        codec: PacketCodec,
        sender: Arc<dyn PacketSender>,
        suppressor: PacketSuppressor,
    ) -> Self {
        Self {
            codec,
            sender,
            suppressor,
        }
    }

    /// The suppressor consulted on every send.
    pub fn suppressor(&self) -> &PacketSuppressor {
        &self.suppressor
    }

    /// The codec used for outbound packets.
    pub fn codec(&self) -> &PacketCodec {
        &self.codec
    }

    /// Encode and send `packet` unless its type is suppressed.
    pub fn send<P: Packet>(&self, packet: &P) -> Result<SendOutcome, SyncError> {
        if self.suppressor.is_suppressed(P::PACKET_TYPE) {
            self.suppressor.record_drop();
            trace!("Suppressed outbound {} packet", P::PACKET_TYPE);
            return Ok(SendOutcome::Suppressed);
        }

        let message = self.codec.encode(packet)?;
        trace!(
            "Sending {} packet ({} bytes, {})",
            P::PACKET_TYPE,
            message.len(),
            message.delivery()
        );
        self.sender.send(message)?;
        Ok(SendOutcome::Sent)
    }
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("codec", &self.codec)
            .field("suppressor", &self.suppressor)
            .finish_non_exhaustive()
    }
}
