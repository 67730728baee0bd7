//! Session finalization: the ready flag and the completion acknowledgement.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, info, warn};

use crate::core::*;
use crate::packets::PlayerSyncFinished;
use crate::transport::Outbox;

/// Externally visible "world ready" flag. Set at most once.
#[derive(Debug, Clone, Default)]
pub struct ReadyFlag(Arc<AtomicBool>);

impl ReadyFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the world is synchronized.
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Set the flag. Returns false if it was already set.
    pub(crate) fn set(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Runs once a session reaches `Complete`.
#[derive(Debug)]
pub struct SessionFinalizer<'a> {
    ready: &'a ReadyFlag,
    outbox: &'a Outbox,
    finalized: bool,
}

impl<'a> SessionFinalizer<'a> {
    /// Create a finalizer for one session.
    pub fn new(ready: &'a ReadyFlag, outbox: &'a Outbox) -> Self {
        Self {
            ready,
            outbox,
            finalized: false,
        }
    }

    /// True after a successful [`SessionFinalizer::finalize`].
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Set the ready flag and acknowledge completion to the server.
    ///
    /// A second call is a no-op. Fails with `AlreadySynchronized` if another
    /// session already set the flag.
    ///
    /// The flag is set before the acknowledgement goes out, so the units are
    /// never applied twice. If the send fails the world stays ready and the
    /// error is `AcknowledgementFailed`; the host resends with
    /// [`acknowledge`] instead of retrying the sync.
    pub fn finalize(&mut self) -> Result<(), SyncError> {
        if self.finalized {
            warn!("Session already finalized");
            return Ok(());
        }
        if !self.ready.set() {
            return Err(SyncError::AlreadySynchronized);
        }
        self.finalized = true;
        info!("World ready");

        acknowledge(self.outbox)
    }
}

/// Send the completion acknowledgement.
///
/// A send failure is wrapped in `AcknowledgementFailed`.
pub fn acknowledge(outbox: &Outbox) -> Result<(), SyncError> {
    match outbox.send(&PlayerSyncFinished) {
        Ok(_) => {
            info!("Completion acknowledged");
            Ok(())
        }
        Err(err) => {
            error!("World ready but acknowledgement failed: {}", err);
            Err(SyncError::AcknowledgementFailed {
                source: Box::new(err),
            })
        }
    }
}
