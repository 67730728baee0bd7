//! Per-unit execution context.
//!
//! Everything a unit may touch besides the snapshot comes through here:
//! the progress handle, the session outbox and its suppressor. Units hold
//! no other shared state.

use crate::core::*;
use crate::transport::{Outbox, SendOutcome, SuppressionGuard};

use super::progress::ProgressSink;
use super::unit::UnitId;

/// Handle given to a unit while it runs.
pub struct SyncContext<'a> {
    unit: UnitId,
    wave: usize,
    progress: &'a mut dyn ProgressSink,
    outbox: &'a Outbox,
}

impl<'a> SyncContext<'a> {
    pub(crate) fn new(
        unit: UnitId,
        wave: usize,
        progress: &'a mut dyn ProgressSink,
        outbox: &'a Outbox,
    ) -> Self {
        Self {
            unit,
            wave,
            progress,
            outbox,
        }
    }

    /// Identity of the running unit.
    pub fn unit(&self) -> &UnitId {
        &self.unit
    }

    /// One-based index of the current wave.
    pub fn wave(&self) -> usize {
        self.wave
    }

    /// Report progress of the running unit. Clamped to `[0, 1]`.
    pub fn report(&mut self, fraction: f32) {
        self.progress
            .unit_progress(&self.unit, fraction.clamp(0.0, 1.0));
    }

    /// Drop outbound packets of type `P` until the guard is released.
    ///
    /// Use this around bulk mutations that would otherwise echo change
    /// events back to the server.
    pub fn suppress<P: Packet>(&self) -> SuppressionGuard {
        self.outbox.suppressor().suppress::<P>()
    }

    /// Send a packet through the session outbox.
    pub fn send<P: Packet>(&self, packet: &P) -> Result<SendOutcome, SyncError> {
        self.outbox.send(packet)
    }

    /// The session outbox.
    pub fn outbox(&self) -> &Outbox {
        self.outbox
    }
}

impl std::fmt::Debug for SyncContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("unit", &self.unit)
            .field("wave", &self.wave)
            .finish_non_exhaustive()
    }
}
