//! Wave scheduler.
//!
//! A wave is one pass over the registry in registration order, running
//! every pending unit whose dependencies have all run. Because the pass is
//! sequential, a unit can become eligible within the same wave that ran its
//! last dependency. Waves repeat until every unit ran (`Complete`) or a wave
//! ran nothing (`Stalled`). No global topological sort is computed.
//!
//! ```text
//!            wave ran ≥ 1, units remain
//!           ┌──────────┐
//!           ▼          │
//!       ┌─────────┐────┘   all ran    ┌──────────┐
//!  ───▶ │ Pending │ ───────────────▶  │ Complete │
//!       └─────────┘                   └──────────┘
//!          │    │ wave ran 0          ┌──────────┐
//!          │    └──────────────────▶  │ Stalled  │
//!          │ unit failed              └──────────┘
//!          │                          ┌──────────┐
//!          └───────────────────────▶  │ Aborted  │
//!                                     └──────────┘
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, error, info};

use crate::core::*;
use crate::transport::Outbox;

use super::context::SyncContext;
use super::progress::ProgressSink;
use super::unit::{UnitId, UnitRegistry};

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Label attached to session progress events.
    pub progress_label: String,
    /// Yield to the runtime between waves. Needs the `transport` feature
    /// (tokio); without it waves run back to back.
    pub yield_between_waves: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            progress_label: DEFAULT_PROGRESS_LABEL.to_string(),
            yield_between_waves: true,
        }
    }
}

impl SyncConfig {
    /// Set the progress label.
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = label.into();
        self
    }

    /// Enable or disable yielding between waves.
    pub fn with_yield_between_waves(mut self, enabled: bool) -> Self {
        self.yield_between_waves = enabled;
        self
    }
}

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Units remain and the last wave made progress.
    Pending,
    /// A wave ran nothing while units remain. Terminal.
    Stalled,
    /// Every unit ran. Terminal.
    Complete,
    /// A unit failed. Terminal.
    Aborted,
}

impl SchedulerState {
    /// True for states the session can not leave.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SchedulerState::Pending)
    }
}

/// Units run by one wave, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveReport {
    /// One-based wave index.
    pub index: usize,
    /// Units executed in this wave.
    pub executed: Vec<UnitId>,
}

/// Outcome of a completed session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Waves that ran at least one unit.
    pub waves: Vec<WaveReport>,
    /// Every unit in execution order.
    pub executed: Vec<UnitId>,
}

impl SyncReport {
    /// Number of waves.
    pub fn wave_count(&self) -> usize {
        self.waves.len()
    }

    /// Position of `unit` in the overall execution order.
    pub fn position(&self, unit: &UnitId) -> Option<usize> {
        self.executed.iter().position(|id| id == unit)
    }
}

/// One synchronization attempt over a decoded snapshot.
///
/// The session owns the snapshot and its bookkeeping exclusively; units run
/// one at a time.
pub struct SyncSession<'a, S> {
    snapshot: S,
    registry: &'a UnitRegistry<S>,
    outbox: &'a Outbox,
    config: &'a SyncConfig,
    executed: HashSet<UnitId>,
    report: SyncReport,
    state: SchedulerState,
    failure: Option<(UnitId, SharedUnitError)>,
}

impl<'a, S: Send + Sync> SyncSession<'a, S> {
    /// Create a session. Nothing runs until [`SyncSession::run`] or
    /// [`SyncSession::step_wave`].
    pub fn new(
        snapshot: S,
        registry: &'a UnitRegistry<S>,
        outbox: &'a Outbox,
        config: &'a SyncConfig,
    ) -> Self {
        Self {
            snapshot,
            registry,
            outbox,
            config,
            executed: HashSet::with_capacity(registry.len()),
            report: SyncReport::default(),
            state: SchedulerState::Pending,
            failure: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Number of registered units.
    pub fn total(&self) -> usize {
        self.registry.len()
    }

    /// Number of units executed so far.
    pub fn executed_count(&self) -> usize {
        self.executed.len()
    }

    /// True if `unit` has run in this session.
    pub fn is_executed(&self, unit: &UnitId) -> bool {
        self.executed.contains(unit)
    }

    /// Units not yet executed, in registration order.
    pub fn pending(&self) -> Vec<UnitId> {
        self.registry
            .ids()
            .filter(|id| !self.executed.contains(*id))
            .cloned()
            .collect()
    }

    /// Progress so far.
    pub fn report(&self) -> &SyncReport {
        &self.report
    }

    /// The decoded snapshot.
    pub fn snapshot(&self) -> &S {
        &self.snapshot
    }

    /// The unit failure that aborted this session, if any.
    pub fn failure(&self) -> Option<SyncError> {
        self.failure.as_ref().map(|(unit, source)| SyncError::UnitStepFailure {
            unit: unit.clone(),
            source: Arc::clone(source),
        })
    }

    /// The error a terminal session ends with: the stored unit failure, or
    /// the deadlock over whatever is still pending.
    fn terminal_error(&self) -> SyncError {
        self.failure().unwrap_or_else(|| SyncError::DependencyDeadlock {
            pending: self.pending(),
        })
    }

    #[cfg(feature = "transport")]
    async fn yield_between_waves(&self) {
        if self.config.yield_between_waves {
            tokio::task::yield_now().await;
        }
    }

    #[cfg(not(feature = "transport"))]
    async fn yield_between_waves(&self) {}

    /// Run waves until the session reaches a terminal state.
    pub async fn run(mut self, progress: &mut dyn ProgressSink) -> Result<SyncReport, SyncError> {
        info!(
            "Starting initial sync over {} units",
            self.registry.len()
        );

        loop {
            match self.step_wave(progress).await? {
                SchedulerState::Pending => self.yield_between_waves().await,
                SchedulerState::Complete => {
                    info!(
                        "Initial sync complete: {} units in {} waves",
                        self.report.executed.len(),
                        self.report.wave_count()
                    );
                    return Ok(self.report);
                }
                SchedulerState::Stalled | SchedulerState::Aborted => {
                    return Err(self.terminal_error());
                }
            }
        }
    }

    /// Run a single wave and return the resulting state.
    ///
    /// Entering `Stalled` or `Aborted` is reported as an error. Calling this
    /// on a terminal session does nothing; [`SyncSession::run`] on one
    /// returns the error it ended with.
    pub async fn step_wave(
        &mut self,
        progress: &mut dyn ProgressSink,
    ) -> Result<SchedulerState, SyncError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        let registry = self.registry;
        let total = registry.len();
        if total == 0 {
            progress.session_progress(&self.config.progress_label, 1.0);
            self.state = SchedulerState::Complete;
            return Ok(self.state);
        }

        let index = self.report.waves.len() + 1;
        let mut ran = Vec::new();

        for entry in registry.units() {
            let id = entry.id();
            if self.executed.contains(id) {
                continue;
            }
            if !entry.dependencies().iter().all(|dep| self.executed.contains(dep)) {
                continue;
            }

            info!("Running sync unit {} (wave {})", id, index);
            progress.unit_started(id, index);
            let result = {
                let mut ctx = SyncContext::new(id.clone(), index, &mut *progress, self.outbox);
                entry.unit().run(&self.snapshot, &mut ctx).await
            };

            if let Err(source) = result {
                error!("Sync unit {} failed, aborting session: {}", id, source);
                self.state = SchedulerState::Aborted;
                self.failure = Some((id.clone(), Arc::from(source)));
                return Err(self.terminal_error());
            }

            self.executed.insert(id.clone());
            self.report.executed.push(id.clone());
            ran.push(id.clone());
            progress.session_progress(
                &self.config.progress_label,
                self.executed.len() as f32 / total as f32,
            );
        }

        if ran.is_empty() {
            let pending = self.pending();
            error!(
                "Initial sync stalled in wave {} with {} pending units: {:?}",
                index,
                pending.len(),
                pending
            );
            self.state = SchedulerState::Stalled;
            return Err(SyncError::DependencyDeadlock { pending });
        }

        debug!("Wave {} ran {} units: {:?}", index, ran.len(), ran);
        self.report.waves.push(WaveReport {
            index,
            executed: ran,
        });

        if self.executed.len() == total {
            self.state = SchedulerState::Complete;
        }
        Ok(self.state)
    }
}

impl<S> std::fmt::Debug for SyncSession<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("state", &self.state)
            .field("executed", &self.report.executed)
            .field("waves", &self.report.waves.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::codec::{FormatterRegistry, PacketCodec};
    use crate::sync::{ProgressEvent, ProgressRecorder, StagedUnit, SyncUnit};
    use crate::transport::RecordingSender;

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recording {
        id: &'static str,
        deps: Vec<&'static str>,
        log: Log,
        fail: bool,
    }

    impl Recording {
        fn new(id: &'static str, deps: &[&'static str], log: &Log) -> Self {
            Self {
                id,
                deps: deps.to_vec(),
                log: Arc::clone(log),
                fail: false,
            }
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    #[async_trait]
    impl SyncUnit<u32> for Recording {
        fn id(&self) -> UnitId {
            UnitId::new(self.id)
        }

        fn dependencies(&self) -> Vec<UnitId> {
            self.deps.iter().map(|dep| UnitId::new(*dep)).collect()
        }

        async fn run(&self, _snapshot: &u32, _ctx: &mut SyncContext<'_>) -> Result<(), UnitError> {
            tokio::task::yield_now().await;
            self.log.lock().unwrap().push(self.id.to_string());
            if self.fail {
                return Err(format!("{} exploded", self.id).into());
            }
            Ok(())
        }
    }

    fn outbox() -> Outbox {
        Outbox::new(
            PacketCodec::new(Arc::new(FormatterRegistry::standard())),
            Arc::new(RecordingSender::default()),
        )
    }

    fn ids(names: &[&'static str]) -> Vec<UnitId> {
        names.iter().map(|name| UnitId::new(*name)).collect()
    }

    #[tokio::test]
    async fn test_registration_order_waves() {
        let log = Log::default();
        let registry = UnitRegistry::new()
            .with(Recording::new("C", &["A", "B"], &log))
            .unwrap()
            .with(Recording::new("A", &[], &log))
            .unwrap()
            .with(Recording::new("B", &["A"], &log))
            .unwrap();
        let (outbox, config) = (outbox(), SyncConfig::default());
        let mut progress = ProgressRecorder::new();

        let report = SyncSession::new(7, &registry, &outbox, &config)
            .run(&mut progress)
            .await
            .unwrap();

        assert_eq!(report.wave_count(), 2);
        assert_eq!(report.waves[0].executed, ids(&["A", "B"]));
        assert_eq!(report.waves[1].executed, ids(&["C"]));
        assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C"]);

        let fractions = progress.session_fractions();
        assert_eq!(fractions.len(), 3);
        assert!(fractions.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(fractions.last(), Some(&1.0));
    }

    #[tokio::test]
    async fn test_mutual_dependency_stalls() {
        let log = Log::default();
        let registry = UnitRegistry::new()
            .with(Recording::new("root", &[], &log))
            .unwrap()
            .with(Recording::new("A", &["B"], &log))
            .unwrap()
            .with(Recording::new("B", &["A"], &log))
            .unwrap()
            .with(Recording::new("D", &["A"], &log))
            .unwrap();
        let (outbox, config) = (outbox(), SyncConfig::default());
        let mut progress = ProgressRecorder::new();
        let mut session = SyncSession::new(0, &registry, &outbox, &config);

        assert_eq!(
            session.step_wave(&mut progress).await.unwrap(),
            SchedulerState::Pending
        );
        let err = session.step_wave(&mut progress).await.unwrap_err();
        assert_eq!(session.state(), SchedulerState::Stalled);
        assert_eq!(err.pending_units().unwrap(), ids(&["A", "B", "D"]).as_slice());

        // Terminal sessions stay put.
        assert_eq!(
            session.step_wave(&mut progress).await.unwrap(),
            SchedulerState::Stalled
        );
        assert_eq!(*log.lock().unwrap(), vec!["root"]);
    }

    #[tokio::test]
    async fn test_unit_failure_aborts() {
        let log = Log::default();
        let registry = UnitRegistry::new()
            .with(Recording::new("A", &[], &log))
            .unwrap()
            .with(Recording::new("B", &["A"], &log).failing())
            .unwrap()
            .with(Recording::new("C", &[], &log))
            .unwrap()
            .with(Recording::new("D", &["B"], &log))
            .unwrap();
        let (outbox, config) = (outbox(), SyncConfig::default());
        let mut progress = ProgressRecorder::new();
        let mut session = SyncSession::new(0, &registry, &outbox, &config);

        let err = session.step_wave(&mut progress).await.unwrap_err();
        assert!(matches!(&err, SyncError::UnitStepFailure { unit, .. } if unit.as_str() == "B"));
        assert_eq!(session.state(), SchedulerState::Aborted);

        // Nothing after the failing unit ran, and it is not counted.
        assert_eq!(*log.lock().unwrap(), vec!["A", "B"]);
        assert_eq!(session.executed_count(), 1);
        assert_eq!(progress.session_fractions(), vec![0.25]);
    }

    #[tokio::test]
    async fn test_empty_registry_completes() {
        let registry: UnitRegistry<u32> = UnitRegistry::new();
        let (outbox, config) = (outbox(), SyncConfig::default());
        let mut progress = ProgressRecorder::new();

        let report = SyncSession::new(0, &registry, &outbox, &config)
            .run(&mut progress)
            .await
            .unwrap();

        assert_eq!(report, SyncReport::default());
        assert_eq!(progress.session_fractions(), vec![1.0]);
    }

    #[tokio::test]
    async fn test_staged_unit_sub_progress() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::clone(&seen);
        let second = Arc::clone(&seen);

        let registry = UnitRegistry::new()
            .with(
                StagedUnit::new("story")
                    .step("goals", move |snapshot: &u32, _ctx: &mut SyncContext<'_>| {
                        first.lock().unwrap().push(*snapshot);
                        Ok(())
                    })
                    .step("radio", move |snapshot: &u32, ctx: &mut SyncContext<'_>| {
                        second.lock().unwrap().push(*snapshot + ctx.wave() as u32);
                        Ok(())
                    }),
            )
            .unwrap();
        let config = SyncConfig::default().with_progress_label("story_sync");
        let outbox = outbox();
        let mut progress = ProgressRecorder::new();

        SyncSession::new(40, &registry, &outbox, &config)
            .run(&mut progress)
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![40, 41]);
        assert_eq!(progress.unit_fractions(&UnitId::new("story")), vec![0.5, 1.0]);
        assert!(matches!(
            progress.events().last(),
            Some(ProgressEvent::Session { label, fraction })
                if label == "story_sync" && *fraction == 1.0
        ));
    }

    #[tokio::test]
    async fn test_silent_units_announced() {
        let registry = UnitRegistry::new()
            .with(StagedUnit::new("player"))
            .unwrap()
            .with(StagedUnit::new("story").depends_on("player"))
            .unwrap();
        let (outbox, config) = (outbox(), SyncConfig::default());
        let mut progress = ProgressRecorder::new();

        SyncSession::new(0u32, &registry, &outbox, &config)
            .run(&mut progress)
            .await
            .unwrap();

        assert_eq!(progress.started_units(), ids(&["player", "story"]));
        assert_eq!(
            progress.events()[..2],
            [
                ProgressEvent::Started {
                    unit: UnitId::new("player"),
                    wave: 1
                },
                ProgressEvent::Session {
                    label: DEFAULT_PROGRESS_LABEL.to_string(),
                    fraction: 0.5
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_run_after_abort_keeps_cause() {
        let log = Log::default();
        let registry = UnitRegistry::new()
            .with(Recording::new("base", &[], &log).failing())
            .unwrap();
        let (outbox, config) = (outbox(), SyncConfig::default());
        let mut progress = ProgressRecorder::new();
        let mut session = SyncSession::new(0, &registry, &outbox, &config);

        let first = session.step_wave(&mut progress).await.unwrap_err();
        assert_eq!(first.to_string(), "unit base failed: base exploded");

        let again = session.run(&mut progress).await.unwrap_err();
        assert_eq!(again.to_string(), "unit base failed: base exploded");
        assert_eq!(*log.lock().unwrap(), vec!["base"]);
    }
}
