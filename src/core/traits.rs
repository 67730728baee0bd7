//! Core traits for worldsync.
//!
//! These traits define what a payload must provide to travel through the
//! packet codec.

use crate::codec::{DeliveryMethod, Wire};

/// A top-level payload that can be sent as a [`Message`](crate::codec::Message).
///
/// The packet type name is written into the root envelope so the receiver
/// can route the message and reject a decode against the wrong type.
///
/// # Example
///
/// ```ignore
/// struct PlayerMoved { position: Vector3 }
///
/// impl Packet for PlayerMoved {
///     const PACKET_TYPE: &'static str = "player_moved";
///     const DELIVERY: DeliveryMethod = DeliveryMethod::UnreliableSequenced;
/// }
/// ```
pub trait Packet: Wire {
    /// Stable packet type name (e.g. "world_snapshot").
    const PACKET_TYPE: &'static str;

    /// Delivery semantics for every message carrying this packet type.
    const DELIVERY: DeliveryMethod = DeliveryMethod::ReliableOrdered;

    /// Delivery semantics for this particular value.
    ///
    /// Defaults to [`Packet::DELIVERY`]; override when the choice depends on
    /// the payload contents.
    fn delivery(&self) -> DeliveryMethod {
        Self::DELIVERY
    }
}
