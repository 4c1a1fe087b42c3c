//! What the tools can ask of the bot

use async_trait::async_trait;
use minecraft_mcp_core::{BlockPos, Direction, FaceDirection, GameMode, McpError, Result, Vec3};
use minecraft_mcp_server::{ConnectionManager, Connector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A stack in an inventory or container slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Slot number as stored in NBT (hotbar 0-8, main 9-35, armor 100-103,
    /// offhand -106; furnace 0 input, 1 fuel, 2 output)
    pub slot: i32,
    /// Item id without the `minecraft:` namespace
    pub name: String,
    pub count: u32,
}

/// Nearest entity found around the bot
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInfo {
    pub name: String,
    pub position: Vec3,
}

/// Where an item can be equipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EquipDestination {
    Hand,
    OffHand,
    Head,
    Torso,
    Legs,
    Feet,
}

impl EquipDestination {
    pub fn as_str(self) -> &'static str {
        match self {
            EquipDestination::Hand => "hand",
            EquipDestination::OffHand => "off-hand",
            EquipDestination::Head => "head",
            EquipDestination::Torso => "torso",
            EquipDestination::Legs => "legs",
            EquipDestination::Feet => "feet",
        }
    }
}

impl fmt::Display for EquipDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Furnace-like blocks that smelt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FurnaceKind {
    Furnace,
    BlastFurnace,
    Smoker,
}

impl FurnaceKind {
    pub const ALL: [FurnaceKind; 3] = [
        FurnaceKind::Furnace,
        FurnaceKind::BlastFurnace,
        FurnaceKind::Smoker,
    ];

    pub fn block_id(self) -> &'static str {
        match self {
            FurnaceKind::Furnace => "minecraft:furnace",
            FurnaceKind::BlastFurnace => "minecraft:blast_furnace",
            FurnaceKind::Smoker => "minecraft:smoker",
        }
    }
}

/// Furnace container slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FurnaceSlot {
    Input,
    Fuel,
    Output,
}

impl FurnaceSlot {
    pub fn index(self) -> i32 {
        match self {
            FurnaceSlot::Input => 0,
            FurnaceSlot::Fuel => 1,
            FurnaceSlot::Output => 2,
        }
    }
}

/// The in-world capabilities behind every tool
#[async_trait]
pub trait Bot: Send + Sync {
    fn username(&self) -> &str;

    async fn position(&self) -> Result<Vec3>;

    async fn game_mode(&self) -> Result<GameMode>;

    async fn look_at(&self, target: Vec3) -> Result<()>;

    async fn jump(&self) -> Result<()>;

    /// Walk in `direction` relative to facing for `duration`
    async fn walk(&self, direction: Direction, duration: Duration) -> Result<()>;

    /// Move until within `range` of `target`; interrupted by [`Bot::stop_moving`]
    async fn goto(&self, target: Vec3, range: f64) -> Result<()>;

    async fn stop_moving(&self);

    /// Fly to `target`; interrupted by [`Bot::stop_flying`]
    async fn fly_to(&self, target: Vec3) -> Result<()>;

    async fn stop_flying(&self);

    async fn chat(&self, message: &str) -> Result<()>;

    async fn inventory(&self) -> Result<Vec<ItemStack>>;

    /// Move the stack in inventory `slot` to `destination`
    async fn equip(&self, slot: i32, destination: EquipDestination) -> Result<()>;

    /// Whether the block at `pos` matches a block id or `#tag`
    async fn test_block(&self, pos: BlockPos, predicate: &str) -> Result<bool>;

    async fn is_air(&self, pos: BlockPos) -> Result<bool> {
        self.test_block(pos, "#minecraft:air").await
    }

    /// Place the held block at `pos`, against the neighbour on `face`
    async fn place_block(&self, pos: BlockPos, face: FaceDirection) -> Result<()>;

    async fn dig_block(&self, pos: BlockPos) -> Result<()>;

    /// Nearest entity matching `kind` ("" for any, "player", "mob" or an
    /// entity id) within `max_distance`
    async fn nearest_entity(&self, kind: &str, max_distance: f64) -> Result<Option<EntityInfo>>;

    async fn furnace_contents(&self, pos: BlockPos) -> Result<Vec<ItemStack>>;

    /// Move `count` items from inventory `from_slot` into a furnace slot
    async fn put_in_furnace(
        &self,
        pos: BlockPos,
        slot: FurnaceSlot,
        from_slot: i32,
        count: u32,
    ) -> Result<()>;

    /// Move the output stack into the inventory
    async fn take_furnace_output(&self, pos: BlockPos) -> Result<Option<ItemStack>>;

    /// Run a raw server command, returning its output
    async fn run_command(&self, command: &str) -> Result<String>;
}

/// Hands tools the bot of the current session
pub trait BotProvider: Send + Sync {
    fn bot(&self) -> Result<Arc<dyn Bot>>;
}

impl<B: Bot + 'static> BotProvider for Arc<B> {
    fn bot(&self) -> Result<Arc<dyn Bot>> {
        Ok(self.clone())
    }
}

/// Tools reach the bot of whichever session is current
impl<C> BotProvider for ConnectionManager<C>
where
    C: Connector,
    C::Handle: Bot,
{
    fn bot(&self) -> Result<Arc<dyn Bot>> {
        let handle = self.current().ok_or(McpError::NotConnected)?;
        Ok(handle)
    }
}
