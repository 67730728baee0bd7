//! Client-side entry point for the initial sync burst.
//!
//! Decodes the snapshot message, runs a [`SyncSession`] over the registered
//! units and finalizes it. One session may be active at a time; a second
//! one is rejected, never queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, warn};

use crate::codec::{Message, PacketCodec};
use crate::core::*;
use crate::transport::{Outbox, PacketSender};

use super::finalizer::{self, ReadyFlag, SessionFinalizer};
use super::progress::ProgressSink;
use super::scheduler::{SyncConfig, SyncReport, SyncSession};
use super::unit::UnitRegistry;

/// Applies initial-sync snapshots of type `S`.
pub struct InitialSyncReceiver<S> {
    codec: PacketCodec,
    registry: UnitRegistry<S>,
    sender: Arc<dyn PacketSender>,
    config: SyncConfig,
    ready: ReadyFlag,
    active: AtomicBool,
}

/// Clears the active flag when the session ends, however it ends.
struct ActiveSession<'a>(&'a AtomicBool);

impl Drop for ActiveSession<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: Packet + Send + Sync> InitialSyncReceiver<S> {
    /// Create a receiver over a complete unit registry.
    pub fn new(codec: PacketCodec, registry: UnitRegistry<S>, sender: Arc<dyn PacketSender>) -> Self {
        for (unit, dependency) in registry.unresolved_dependencies() {
            warn!(
                "Sync unit {} depends on unregistered unit {}; it will never run",
                unit, dependency
            );
        }

        Self {
            codec,
            registry,
            sender,
            config: SyncConfig::default(),
            ready: ReadyFlag::new(),
            active: AtomicBool::new(false),
        }
    }

    /// Replace the scheduler configuration.
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Use an externally owned ready flag.
    pub fn with_ready_flag(mut self, ready: ReadyFlag) -> Self {
        self.ready = ready;
        self
    }

    /// The "world ready" flag.
    pub fn ready_flag(&self) -> &ReadyFlag {
        &self.ready
    }

    /// True once a session completed.
    pub fn is_ready(&self) -> bool {
        self.ready.is_set()
    }

    /// True while a session is running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// The registered units.
    pub fn registry(&self) -> &UnitRegistry<S> {
        &self.registry
    }

    /// The codec used for snapshots and acknowledgements.
    pub fn codec(&self) -> &PacketCodec {
        &self.codec
    }

    /// Decode `message` as an `S` snapshot and apply it.
    ///
    /// An `AcknowledgementFailed` error means the world is ready; resend with
    /// [`InitialSyncReceiver::acknowledge`].
    pub async fn process(
        &self,
        message: &Message,
        progress: &mut dyn ProgressSink,
    ) -> Result<SyncReport, SyncError> {
        let _session = self.begin()?;
        let snapshot = self.codec.decode::<S>(message).inspect_err(|e| {
            error!("Rejected {} snapshot: {}", S::PACKET_TYPE, e);
        })?;
        self.run_session(snapshot, progress).await
    }

    /// Apply an already decoded snapshot.
    pub async fn apply(
        &self,
        snapshot: S,
        progress: &mut dyn ProgressSink,
    ) -> Result<SyncReport, SyncError> {
        let _session = self.begin()?;
        self.run_session(snapshot, progress).await
    }

    /// Resend the completion acknowledgement.
    ///
    /// Returns `Ok(false)` without sending anything while the world is not
    /// ready.
    pub fn acknowledge(&self) -> Result<bool, SyncError> {
        if !self.ready.is_set() {
            warn!("Acknowledgement requested before the world is ready");
            return Ok(false);
        }
        let outbox = Outbox::new(self.codec.clone(), Arc::clone(&self.sender));
        finalizer::acknowledge(&outbox)?;
        Ok(true)
    }

    fn begin(&self) -> Result<ActiveSession<'_>, SyncError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SyncError::SessionActive);
        }
        let session = ActiveSession(&self.active);

        if self.ready.is_set() {
            return Err(SyncError::AlreadySynchronized);
        }
        Ok(session)
    }

    async fn run_session(
        &self,
        snapshot: S,
        progress: &mut dyn ProgressSink,
    ) -> Result<SyncReport, SyncError> {
        // Fresh outbox per session: suppression never outlives it.
        let outbox = Outbox::new(self.codec.clone(), Arc::clone(&self.sender));

        let report = SyncSession::new(snapshot, &self.registry, &outbox, &self.config)
            .run(progress)
            .await?;

        SessionFinalizer::new(&self.ready, &outbox).finalize()?;
        Ok(report)
    }
}

impl<S> std::fmt::Debug for InitialSyncReceiver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitialSyncReceiver")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("ready", &self.ready)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::codec::{DeliveryMethod, FormatterRegistry};
    use crate::packets::{PlayerSyncFinished, WorldSnapshot};
    use crate::sync::{ProgressRecorder, StagedUnit, SyncContext, SyncUnit, UnitId};
    use crate::transport::RecordingSender;

    struct Gate(Arc<Notify>);

    #[async_trait]
    impl SyncUnit<WorldSnapshot> for Gate {
        fn id(&self) -> UnitId {
            UnitId::new("gate")
        }

        async fn run(
            &self,
            _snapshot: &WorldSnapshot,
            _ctx: &mut SyncContext<'_>,
        ) -> Result<(), UnitError> {
            self.0.notified().await;
            Ok(())
        }
    }

    fn codec() -> PacketCodec {
        PacketCodec::new(Arc::new(FormatterRegistry::standard()))
    }

    fn receiver(
        registry: UnitRegistry<WorldSnapshot>,
    ) -> (InitialSyncReceiver<WorldSnapshot>, RecordingSender) {
        let sender = RecordingSender::default();
        (
            InitialSyncReceiver::new(codec(), registry, Arc::new(sender.clone())),
            sender,
        )
    }

    #[tokio::test]
    async fn test_process_sets_ready_and_acks() {
        let registry = UnitRegistry::new()
            .with(StagedUnit::new("player").step("name", |snapshot: &WorldSnapshot, _ctx: &mut SyncContext<'_>| {
                if snapshot.player_name.is_empty() {
                    return Err("missing player name".into());
                }
                Ok(())
            }))
            .unwrap();
        let (receiver, sender) = receiver(registry);
        let message = codec()
            .encode(&WorldSnapshot {
                player_name: "ryley".to_string(),
                ..Default::default()
            })
            .unwrap();

        let mut progress = ProgressRecorder::new();
        let report = receiver.process(&message, &mut progress).await.unwrap();

        assert_eq!(report.executed, vec![UnitId::new("player")]);
        assert!(receiver.is_ready());
        assert!(!receiver.is_active());

        let sent = sender.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].delivery(), DeliveryMethod::ReliableOrdered);
        codec().decode::<PlayerSyncFinished>(&sent[0]).unwrap();

        let again = receiver.process(&message, &mut progress).await.unwrap_err();
        assert!(matches!(again, SyncError::AlreadySynchronized));
    }

    #[tokio::test]
    async fn test_overlapping_session_rejected() {
        let notify = Arc::new(Notify::new());
        let registry = UnitRegistry::new().with(Gate(Arc::clone(&notify))).unwrap();
        let (receiver, _sender) = receiver(registry);
        let message = codec().encode(&WorldSnapshot::default()).unwrap();

        let mut first_progress = ProgressRecorder::new();
        let mut second_progress = ProgressRecorder::new();
        let (first, second, ()) = tokio::join!(
            receiver.process(&message, &mut first_progress),
            receiver.process(&message, &mut second_progress),
            async { notify.notify_one() },
        );

        assert!(first.is_ok());
        assert!(matches!(second, Err(SyncError::SessionActive)));
        assert!(second_progress.events().is_empty());
    }

    #[tokio::test]
    async fn test_failed_session_can_retry() {
        let registry = UnitRegistry::new()
            .with(StagedUnit::new("player"))
            .unwrap();
        let (receiver, sender) = receiver(registry);
        let mut progress = ProgressRecorder::new();

        let wrong = codec().encode(&PlayerSyncFinished).unwrap();
        let err = receiver.process(&wrong, &mut progress).await.unwrap_err();
        assert!(err.is_decode_error());
        assert!(!receiver.is_active());
        assert!(!receiver.is_ready());
        assert!(sender.take().is_empty());

        receiver
            .apply(WorldSnapshot::default(), &mut progress)
            .await
            .unwrap();
        assert!(receiver.is_ready());
    }

    #[tokio::test]
    async fn test_deadlock_leaves_world_not_ready() {
        let registry = UnitRegistry::new()
            .with(StagedUnit::new("a").depends_on("b"))
            .unwrap()
            .with(StagedUnit::new("b").depends_on("a"))
            .unwrap();
        let (receiver, sender) = receiver(registry);
        let mut progress = ProgressRecorder::new();

        let err = receiver
            .apply(WorldSnapshot::default(), &mut progress)
            .await
            .unwrap_err();
        assert_eq!(
            err.pending_units().unwrap(),
            &[UnitId::new("a"), UnitId::new("b")]
        );
        assert!(!receiver.is_ready());
        assert!(sender.take().is_empty());
    }

    #[tokio::test]
    async fn test_lost_ack_is_resent_not_resynced() {
        let registry = UnitRegistry::new()
            .with(StagedUnit::new("player"))
            .unwrap();
        let (receiver, sender) = receiver(registry);
        let mut progress = ProgressRecorder::new();

        assert!(!receiver.acknowledge().unwrap());

        sender.close();
        let err = receiver
            .apply(WorldSnapshot::default(), &mut progress)
            .await
            .unwrap_err();
        assert!(err.is_world_ready());
        assert!(receiver.is_ready());

        sender.reopen();
        assert!(receiver.acknowledge().unwrap());
        let sent = sender.take();
        assert_eq!(sent.len(), 1);
        codec().decode::<PlayerSyncFinished>(&sent[0]).unwrap();
        assert_eq!(progress.started_units(), vec![UnitId::new("player")]);
    }
}
