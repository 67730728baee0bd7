//! Progress reporting bridge.
//!
//! The scheduler announces each unit before it runs and pushes session
//! progress (`executed / total`) after it; units push their own sub-progress
//! through
//! [`SyncContext::report`](super::SyncContext::report). Rendering is the
//! host's business.

use log::{debug, info};

use super::unit::UnitId;

/// Receiver of progress updates.
pub trait ProgressSink: Send {
    /// Session-wide progress in `[0, 1]`, non-decreasing within a session.
    fn session_progress(&mut self, label: &str, fraction: f32);

    /// `unit` is about to run in `wave`. Its id doubles as the step label.
    fn unit_started(&mut self, unit: &UnitId, wave: usize) {
        let _ = (unit, wave);
    }

    /// Progress of a single unit in `[0, 1]`.
    fn unit_progress(&mut self, unit: &UnitId, fraction: f32) {
        let _ = (unit, fraction);
    }
}

/// A recorded progress update.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Session-wide update.
    Session {
        /// Label of the progress bar.
        label: String,
        /// Fraction complete.
        fraction: f32,
    },
    /// A unit is about to run.
    Started {
        /// Unit being run.
        unit: UnitId,
        /// One-based wave index.
        wave: usize,
    },
    /// Unit-level update.
    Unit {
        /// Reporting unit.
        unit: UnitId,
        /// Fraction of the unit complete.
        fraction: f32,
    },
}

/// Sink that keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct ProgressRecorder {
    events: Vec<ProgressEvent>,
}

impl ProgressRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in arrival order.
    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    /// Session fractions in arrival order.
    pub fn session_fractions(&self) -> Vec<f32> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Session { fraction, .. } => Some(*fraction),
                _ => None,
            })
            .collect()
    }

    /// Unit fractions reported by `unit`, in arrival order.
    pub fn unit_fractions(&self, unit: &UnitId) -> Vec<f32> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Unit { unit: u, fraction } if u == unit => Some(*fraction),
                _ => None,
            })
            .collect()
    }

    /// Units announced as started, in order.
    pub fn started_units(&self) -> Vec<UnitId> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Started { unit, .. } => Some(unit.clone()),
                _ => None,
            })
            .collect()
    }

    /// Last session fraction, if any.
    pub fn last_session_fraction(&self) -> Option<f32> {
        self.session_fractions().last().copied()
    }

    /// Forget recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl ProgressSink for ProgressRecorder {
    fn session_progress(&mut self, label: &str, fraction: f32) {
        self.events.push(ProgressEvent::Session {
            label: label.to_string(),
            fraction,
        });
    }

    fn unit_started(&mut self, unit: &UnitId, wave: usize) {
        self.events.push(ProgressEvent::Started {
            unit: unit.clone(),
            wave,
        });
    }

    fn unit_progress(&mut self, unit: &UnitId, fraction: f32) {
        self.events.push(ProgressEvent::Unit {
            unit: unit.clone(),
            fraction,
        });
    }
}

/// Sink that writes progress to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn session_progress(&mut self, label: &str, fraction: f32) {
        info!("{}: {:.0}%", label, fraction * 100.0);
    }

    fn unit_started(&mut self, unit: &UnitId, wave: usize) {
        debug!("{} started (wave {})", unit, wave);
    }

    fn unit_progress(&mut self, unit: &UnitId, fraction: f32) {
        debug!("{}: {:.0}%", unit, fraction * 100.0);
    }
}
