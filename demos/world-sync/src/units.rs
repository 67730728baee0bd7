//! Client subsystems bootstrapped from the snapshot.
//!
//! Registered in a deliberately scrambled order; the scheduler sorts it out.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use worldsync::prelude::*;

/// Local world state the units populate.
#[derive(Debug, Default)]
pub struct ClientWorld {
    pub player: Option<String>,
    pub position: Vector3,
    pub mode: GameMode,
    pub known_tech: BTreeSet<String>,
    pub goals: Vec<String>,
    pub containers: BTreeMap<String, usize>,
    pub base: Option<String>,
}

type World = Arc<Mutex<ClientWorld>>;

struct PlayerUnit(World);

#[async_trait]
impl SyncUnit<WorldSnapshot> for PlayerUnit {
    fn id(&self) -> UnitId {
        UnitId::new("player")
    }

    async fn run(&self, snapshot: &WorldSnapshot, _ctx: &mut SyncContext<'_>) -> Result<(), UnitError> {
        let mut world = self.0.lock().await;
        world.player = Some(snapshot.player_name.clone());
        world.position = snapshot.spawn_position;
        world.mode = snapshot.game_mode;
        Ok(())
    }
}

struct TechUnit(World);

#[async_trait]
impl SyncUnit<WorldSnapshot> for TechUnit {
    fn id(&self) -> UnitId {
        UnitId::new("tech")
    }

    fn dependencies(&self) -> Vec<UnitId> {
        vec![UnitId::new("player")]
    }

    async fn run(&self, snapshot: &WorldSnapshot, ctx: &mut SyncContext<'_>) -> Result<(), UnitError> {
        let total = snapshot.unlocked_tech.len().max(1);
        for (done, tech) in snapshot.unlocked_tech.iter().enumerate() {
            self.0.lock().await.known_tech.insert(tech.name().to_string());
            ctx.report((done + 1) as f32 / total as f32);
        }
        Ok(())
    }
}

struct StoryUnit(World);

#[async_trait]
impl SyncUnit<WorldSnapshot> for StoryUnit {
    fn id(&self) -> UnitId {
        UnitId::new("story")
    }

    fn dependencies(&self) -> Vec<UnitId> {
        vec![UnitId::new("tech")]
    }

    async fn run(&self, snapshot: &WorldSnapshot, ctx: &mut SyncContext<'_>) -> Result<(), UnitError> {
        // Replaying a goal fires the same event a live completion would;
        // the server already knows about these.
        let _quiet = ctx.suppress::<StoryGoalExecuted>();
        for goal in &snapshot.story_goals.completed_goals {
            self.0.lock().await.goals.push(goal.clone());
            ctx.send(&StoryGoalExecuted::new(goal.clone()))?;
        }
        Ok(())
    }
}

fn inventory_unit(world: World) -> StagedUnit<WorldSnapshot> {
    let containers = Arc::clone(&world);
    StagedUnit::new("inventory")
        .depends_on("player")
        .step("validate", |snapshot: &WorldSnapshot, _ctx: &mut SyncContext<'_>| {
            match snapshot.inventory.iter().find(|item| item.container_id.is_empty()) {
                Some(item) => Err(format!("item {} has no container", item.item_id).into()),
                None => Ok(()),
            }
        })
        .step("containers", move |snapshot: &WorldSnapshot, _ctx: &mut SyncContext<'_>| {
            let mut world = containers
                .try_lock()
                .map_err(|_| "client world is busy")?;
            for item in &snapshot.inventory {
                *world.containers.entry(item.container_id.clone()).or_insert(0) += 1;
            }
            Ok(())
        })
}

struct BaseUnit(World);

#[async_trait]
impl SyncUnit<WorldSnapshot> for BaseUnit {
    fn id(&self) -> UnitId {
        UnitId::new("spawn_base")
    }

    fn dependencies(&self) -> Vec<UnitId> {
        vec![UnitId::new("player"), UnitId::new("inventory")]
    }

    async fn run(&self, snapshot: &WorldSnapshot, _ctx: &mut SyncContext<'_>) -> Result<(), UnitError> {
        self.0.lock().await.base = snapshot.spawn_base.clone();
        Ok(())
    }
}

/// Every unit, registered out of dependency order.
pub fn registry(world: &World) -> Result<UnitRegistry<WorldSnapshot>, SyncError> {
    UnitRegistry::new()
        .with(StoryUnit(Arc::clone(world)))?
        .with(BaseUnit(Arc::clone(world)))?
        .with(inventory_unit(Arc::clone(world)))?
        .with(TechUnit(Arc::clone(world)))?
        .with(PlayerUnit(Arc::clone(world)))
}
