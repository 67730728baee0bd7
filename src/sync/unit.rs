//! Sync units and their registry.
//!
//! A unit is one named initialization step applied to the decoded snapshot.
//! It declares the units it depends on; nothing else about ordering is
//! known up front.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use log::debug;

use crate::core::*;

use super::context::SyncContext;

/// Stable identity of a sync unit. Doubles as its log label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(Cow<'static, str>);

impl UnitId {
    /// Create an identity.
    pub fn new(id: impl Into<Cow<'static, str>>) -> Self {
        Self(id.into())
    }

    /// The identity as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for UnitId {
    fn from(id: &'static str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UnitId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// One dependency-bearing initialization step.
///
/// `run` may await external work, but it must finish before the scheduler
/// looks at the next unit. A unit runs at most once per session.
#[async_trait]
pub trait SyncUnit<S>: Send + Sync {
    /// Stable identity.
    fn id(&self) -> UnitId;

    /// Units that must have run before this one.
    fn dependencies(&self) -> Vec<UnitId> {
        Vec::new()
    }

    /// Apply the snapshot.
    async fn run(&self, snapshot: &S, ctx: &mut SyncContext<'_>) -> Result<(), UnitError>;
}

type StepFn<S> = Box<dyn Fn(&S, &mut SyncContext<'_>) -> Result<(), UnitError> + Send + Sync>;

/// A unit built from an ordered list of named synchronous steps.
///
/// Each finished step reports `i / n` as unit progress.
pub struct StagedUnit<S> {
    id: UnitId,
    dependencies: Vec<UnitId>,
    steps: Vec<(String, StepFn<S>)>,
}

impl<S: Send + Sync + 'static> StagedUnit<S> {
    /// Create a unit with no steps and no dependencies.
    pub fn new(id: impl Into<UnitId>) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Add a dependency.
    pub fn depends_on(mut self, id: impl Into<UnitId>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    /// Append a named step.
    pub fn step<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&S, &mut SyncContext<'_>) -> Result<(), UnitError> + Send + Sync + 'static,
    {
        self.steps.push((name.into(), Box::new(f)));
        self
    }

    /// Number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

#[async_trait]
impl<S: Send + Sync + 'static> SyncUnit<S> for StagedUnit<S> {
    fn id(&self) -> UnitId {
        self.id.clone()
    }

    fn dependencies(&self) -> Vec<UnitId> {
        self.dependencies.clone()
    }

    async fn run(&self, snapshot: &S, ctx: &mut SyncContext<'_>) -> Result<(), UnitError> {
        let total = self.steps.len();
        for (done, (name, step)) in self.steps.iter().enumerate() {
            debug!("{}: step {}/{} {}", self.id, done + 1, total, name);
            step(snapshot, ctx)?;
            ctx.report((done + 1) as f32 / total as f32);
        }
        Ok(())
    }
}

impl<S> fmt::Debug for StagedUnit<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.steps.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("StagedUnit")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("steps", &names)
            .finish()
    }
}

/// A unit plus its identity and dependencies, captured at registration.
pub struct RegisteredUnit<S> {
    id: UnitId,
    dependencies: Vec<UnitId>,
    unit: Box<dyn SyncUnit<S>>,
}

impl<S: Send + Sync> RegisteredUnit<S> {
    /// Unit identity.
    pub fn id(&self) -> &UnitId {
        &self.id
    }

    /// Declared dependencies.
    pub fn dependencies(&self) -> &[UnitId] {
        &self.dependencies
    }

    /// The unit itself.
    pub fn unit(&self) -> &dyn SyncUnit<S> {
        self.unit.as_ref()
    }
}

/// Units in registration order. Registration order is the tie-break order
/// within a wave.
pub struct UnitRegistry<S> {
    units: Vec<RegisteredUnit<S>>,
    ids: HashSet<UnitId>,
}

impl<S: Send + Sync> UnitRegistry<S> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            units: Vec::new(),
            ids: HashSet::new(),
        }
    }

    /// Register a unit. Identities must be unique.
    pub fn register<U: SyncUnit<S> + 'static>(&mut self, unit: U) -> Result<&mut Self, SyncError> {
        self.register_boxed(Box::new(unit))
    }

    /// Register an already boxed unit.
    pub fn register_boxed(&mut self, unit: Box<dyn SyncUnit<S>>) -> Result<&mut Self, SyncError> {
        let id = unit.id();
        if !self.ids.insert(id.clone()) {
            return Err(SyncError::DuplicateUnit(id));
        }

        let dependencies = unit.dependencies();
        debug!("Registered sync unit {} (depends on {:?})", id, dependencies);
        self.units.push(RegisteredUnit {
            id,
            dependencies,
            unit,
        });
        Ok(self)
    }

    /// Builder-style [`UnitRegistry::register`].
    pub fn with<U: SyncUnit<S> + 'static>(mut self, unit: U) -> Result<Self, SyncError> {
        self.register(unit)?;
        Ok(self)
    }

    /// Registered units in registration order.
    pub fn units(&self) -> &[RegisteredUnit<S>] {
        &self.units
    }

    /// Identities in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &UnitId> {
        self.units.iter().map(RegisteredUnit::id)
    }

    /// True if a unit with `id` is registered.
    pub fn contains(&self, id: &UnitId) -> bool {
        self.ids.contains(id)
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// True if no unit is registered.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// `(unit, dependency)` pairs whose dependency names no registered unit.
    ///
    /// Such units can never run; a session containing them stalls.
    pub fn unresolved_dependencies(&self) -> Vec<(UnitId, UnitId)> {
        self.units
            .iter()
            .flat_map(|entry| {
                entry
                    .dependencies
                    .iter()
                    .filter(|dep| !self.ids.contains(*dep))
                    .map(|dep| (entry.id.clone(), dep.clone()))
            })
            .collect()
    }
}

impl<S: Send + Sync> Default for UnitRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for UnitRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.units.iter().map(|entry| &entry.id))
            .finish()
    }
}
