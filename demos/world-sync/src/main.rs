//! worldsync demo
//!
//! Plays both sides of an initial sync in one process: the "server" encodes
//! a world snapshot, the "client" applies it through a set of sync units
//! registered out of dependency order, then the server reads the
//! acknowledgement.
//!
//! Environment variables:
//! - WORLDSYNC_LOG: trace|debug|info|warn|error (default info)
//! - WORLDSYNC_COMPRESSION_LEVEL: zstd level 1-22 (default 3)

mod units;

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::Mutex;
use worldsync::prelude::*;

use crate::units::ClientWorld;

fn codec_config_from_env() -> CodecConfig {
    let mut config = CodecConfig::default();
    if let Ok(level) = std::env::var("WORLDSYNC_COMPRESSION_LEVEL") {
        match level.parse::<i32>() {
            Ok(level) => config.compression.level = level.clamp(1, 22),
            Err(_) => warn!("Ignoring invalid WORLDSYNC_COMPRESSION_LEVEL {:?}", level),
        }
    }
    config
}

fn server_snapshot() -> WorldSnapshot {
    WorldSnapshot {
        player_id: 1,
        player_name: "ryley".to_string(),
        spawn_position: Vector3::new(-112.5, 0.25, 48.0),
        spawn_rotation: Quaternion::IDENTITY,
        player_color: Color::new(0.9, 0.55, 0.1, 1.0),
        game_mode: GameMode::Survival,
        unlocked_tech: ["Seaglide", "Scanner", "Welder", "Habitat"]
            .into_iter()
            .map(TechType::new)
            .collect(),
        story_goals: StoryGoalData {
            completed_goals: vec!["Goal_Lifepod".to_string(), "Goal_Aurora".to_string()],
            radio_queue: vec!["RadioSecondOfficer".to_string()],
            personal_goals: BTreeMap::from([("Goal_FirstScan".to_string(), 93.0)]),
        },
        inventory: vec![
            InventoryItem {
                item_id: "item-1".to_string(),
                container_id: "player".to_string(),
                tech_type: TechType::new("Titanium"),
            },
            InventoryItem {
                item_id: "item-2".to_string(),
                container_id: "player".to_string(),
                tech_type: TechType::new("Titanium"),
            },
            InventoryItem {
                item_id: "item-3".to_string(),
                container_id: "locker-4".to_string(),
                tech_type: TechType::new("Quartz"),
            },
        ],
        spawn_base: Some("base-7".to_string()),
        world_time: 4812.5,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("WORLDSYNC_LOG", "info"))
        .init();

    let codec = PacketCodec::with_config(
        Arc::new(FormatterRegistry::standard()),
        codec_config_from_env(),
    );

    // Server side: one message carrying the whole world.
    let message = codec.encode(&server_snapshot())?;
    info!(
        "Server sent {} ({} bytes, {})",
        codec.peek_type(&message)?,
        message.len(),
        message.delivery()
    );

    // Client side.
    let (sender, mut server_inbox) = ChannelSender::pair();
    let world = Arc::new(Mutex::new(ClientWorld::default()));
    let receiver = InitialSyncReceiver::new(codec.clone(), units::registry(&world)?, Arc::new(sender));

    let report = receiver.process(&message, &mut LogProgress).await?;
    for wave in &report.waves {
        let names: Vec<&str> = wave.executed.iter().map(UnitId::as_str).collect();
        info!("Wave {}: {}", wave.index, names.join(", "));
    }
    info!("Client world: {:?}", *world.lock().await);

    // Server side again: only the acknowledgement arrives.
    while let Ok(reply) = server_inbox.try_recv() {
        info!(
            "Server received {} ({})",
            codec.peek_type(&reply)?,
            reply.delivery()
        );
    }
    info!("World ready: {}", receiver.is_ready());

    Ok(())
}
