//! Concrete packets exchanged during initial sync.
//!
//! - [`WorldSnapshot`]: server → client, everything a joining client needs
//! - [`PlayerSyncFinished`]: client → server, completion acknowledgement
//! - [`StoryGoalExecuted`]: client → server, a story event that sync units
//!   suppress while replaying already-completed goals

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::codec::{Color, Decoder, Encoder, Quaternion, TechType, Vector3, Wire};
use crate::core::*;

/// Game rules the world runs under. Travels by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameMode {
    /// Standard survival.
    #[default]
    Survival,
    /// No hunger or thirst.
    Freedom,
    /// Permanent death.
    Hardcore,
    /// Unlimited resources.
    Creative,
}

impl GameMode {
    /// Stable wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Survival => "survival",
            GameMode::Freedom => "freedom",
            GameMode::Hardcore => "hardcore",
            GameMode::Creative => "creative",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "survival" => Ok(GameMode::Survival),
            "freedom" => Ok(GameMode::Freedom),
            "hardcore" => Ok(GameMode::Hardcore),
            "creative" => Ok(GameMode::Creative),
            _ => Err(()),
        }
    }
}

impl Wire for GameMode {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.name(self.as_str());
        Ok(())
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        dec.name()
    }
}

/// Story progression.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoryGoalData {
    /// Goals already completed, by key.
    pub completed_goals: Vec<String>,
    /// Radio messages still queued.
    pub radio_queue: Vec<String>,
    /// Personal goals and the world time they fired at.
    pub personal_goals: BTreeMap<String, f32>,
}

impl Wire for StoryGoalData {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.begin_struct(3);
        enc.value(&self.completed_goals)?;
        enc.value(&self.radio_queue)?;
        enc.value(&self.personal_goals)
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let mut s = dec.begin_struct::<Self>()?;
        let value = Self {
            completed_goals: s.field()?,
            radio_queue: s.field_or_default()?,
            personal_goals: s.field_or_default()?,
        };
        s.finish()?;
        Ok(value)
    }
}

/// An item stored in a container.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InventoryItem {
    /// Unique item id.
    pub item_id: String,
    /// Container holding the item.
    pub container_id: String,
    /// Item kind.
    pub tech_type: TechType,
}

impl Wire for InventoryItem {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.begin_struct(3);
        enc.value(&self.item_id)?;
        enc.value(&self.container_id)?;
        enc.value(&self.tech_type)
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let mut s = dec.begin_struct::<Self>()?;
        let value = Self {
            item_id: s.field()?,
            container_id: s.field()?,
            tech_type: s.field()?,
        };
        s.finish()?;
        Ok(value)
    }
}

/// The initial world snapshot sent to a joining client.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorldSnapshot {
    /// Server-assigned player id.
    pub player_id: u16,
    /// Display name.
    pub player_name: String,
    /// Spawn position.
    pub spawn_position: Vector3,
    /// Spawn rotation.
    pub spawn_rotation: Quaternion,
    /// Player color.
    pub player_color: Color,
    /// Active game mode.
    pub game_mode: GameMode,
    /// Unlocked blueprints.
    pub unlocked_tech: Vec<TechType>,
    /// Story state.
    pub story_goals: StoryGoalData,
    /// Inventory contents.
    pub inventory: Vec<InventoryItem>,
    /// Base the player spawns inside, if any.
    pub spawn_base: Option<String>,
    /// Elapsed world time in seconds.
    pub world_time: f64,
}

impl Wire for WorldSnapshot {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.begin_struct(11);
        enc.value(&self.player_id)?;
        enc.value(&self.player_name)?;
        enc.value(&self.spawn_position)?;
        enc.value(&self.spawn_rotation)?;
        enc.value(&self.player_color)?;
        enc.value(&self.game_mode)?;
        enc.value(&self.unlocked_tech)?;
        enc.value(&self.story_goals)?;
        enc.value(&self.inventory)?;
        enc.value(&self.spawn_base)?;
        enc.value(&self.world_time)
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let mut s = dec.begin_struct::<Self>()?;
        let value = Self {
            player_id: s.field()?,
            player_name: s.field()?,
            spawn_position: s.field()?,
            spawn_rotation: s.field()?,
            player_color: s.field()?,
            game_mode: s.field()?,
            unlocked_tech: s.field()?,
            story_goals: s.field()?,
            inventory: s.field()?,
            // Added after the first protocol release.
            spawn_base: s.field_or_default()?,
            world_time: s.field_or_default()?,
        };
        s.finish()?;
        Ok(value)
    }
}

impl Packet for WorldSnapshot {
    const PACKET_TYPE: &'static str = "world_snapshot";
}

/// Completion acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerSyncFinished;

impl Wire for PlayerSyncFinished {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.begin_struct(0);
        Ok(())
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        dec.begin_struct::<Self>()?.finish()?;
        Ok(PlayerSyncFinished)
    }
}

impl Packet for PlayerSyncFinished {
    const PACKET_TYPE: &'static str = "player_sync_finished";
}

/// A story goal fired on this client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoryGoalExecuted {
    /// Goal key.
    pub key: String,
}

impl StoryGoalExecuted {
    /// Create the event for `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Wire for StoryGoalExecuted {
    fn encode_structural(&self, enc: &mut Encoder<'_>) -> Result<(), CodecError> {
        enc.begin_struct(1);
        enc.value(&self.key)
    }

    fn decode_structural(dec: &mut Decoder<'_>) -> Result<Self, CodecError> {
        let mut s = dec.begin_struct::<Self>()?;
        let value = Self { key: s.field()? };
        s.finish()?;
        Ok(value)
    }
}

impl Packet for StoryGoalExecuted {
    const PACKET_TYPE: &'static str = "story_goal_executed";
}
