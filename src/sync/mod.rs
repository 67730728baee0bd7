//! worldsync - Sync Layer
//!
//! Applies one world snapshot to a set of interdependent client subsystems:
//!
//! - **Units**: [`SyncUnit`]s with declared dependencies, kept in a
//!   [`UnitRegistry`] in registration order
//! - **Scheduling**: [`SyncSession`] runs dependency waves until
//!   `Complete`, or fails with a deadlock or unit failure
//! - **Progress**: [`ProgressSink`] receives session and unit progress
//! - **Finalization**: [`SessionFinalizer`] sets the [`ReadyFlag`] and
//!   acknowledges completion
//! - **Entry point**: [`InitialSyncReceiver`] ties decode, session and
//!   finalization together and enforces one active session

mod context;
mod finalizer;
mod progress;
mod receiver;
mod scheduler;
mod unit;

pub use context::*;
pub use finalizer::*;
pub use progress::*;
pub use receiver::*;
pub use scheduler::*;
pub use unit::*;
