//! [`Bot`] over vanilla commands
//!
//! Movement is a series of short teleports, one per tick of
//! [`MOTION_TICK`]; a generation counter stops a movement loop when bumped.

use crate::bot::{Bot, EntityInfo, EquipDestination, FurnaceSlot, ItemStack};
use crate::reply::{parse_entity, parse_int, parse_items, parse_position};
use crate::session::{Console, RconBot};
use async_trait::async_trait;
use minecraft_mcp_core::{BlockPos, Direction, FaceDirection, GameMode, McpError, Result, Vec3};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

pub const MOTION_TICK: Duration = Duration::from_millis(100);

/// Blocks per tick; roughly walking, sprinting and creative flight speed
const WALK_STEP: f64 = 0.43;
const GOTO_STEP: f64 = 0.56;
const FLY_STEP: f64 = 1.09;

/// Closer than this counts as arrived when flying
const FLY_ARRIVAL: f64 = 0.5;

/// Entity types that never count as mobs
const NOT_MOBS: &[&str] = &[
    "player",
    "item",
    "experience_orb",
    "arrow",
    "spectral_arrow",
    "trident",
    "snowball",
    "egg",
    "ender_pearl",
    "fireball",
    "small_fireball",
    "falling_block",
    "tnt",
    "item_frame",
    "glow_item_frame",
    "painting",
    "armor_stand",
    "marker",
    "interaction",
    "block_display",
    "item_display",
    "text_display",
    "area_effect_cloud",
    "lightning_bolt",
    "boat",
    "minecart",
];

/// `item replace` slot name of an inventory NBT slot number
fn slot_name(slot: i32) -> Option<String> {
    match slot {
        0..=8 => Some(format!("hotbar.{}", slot)),
        9..=35 => Some(format!("inventory.{}", slot - 9)),
        100 => Some("armor.feet".to_string()),
        101 => Some("armor.legs".to_string()),
        102 => Some("armor.chest".to_string()),
        103 => Some("armor.head".to_string()),
        -106 => Some("weapon.offhand".to_string()),
        _ => None,
    }
}

fn destination_slot(destination: EquipDestination) -> &'static str {
    match destination {
        EquipDestination::Hand => "weapon.mainhand",
        EquipDestination::OffHand => "weapon.offhand",
        EquipDestination::Head => "armor.head",
        EquipDestination::Torso => "armor.chest",
        EquipDestination::Legs => "armor.legs",
        EquipDestination::Feet => "armor.feet",
    }
}

/// Local `^left ^ ^forward` offset for one step
fn local_offset(direction: Direction, step: f64) -> (f64, f64) {
    match direction {
        Direction::Forward => (0.0, step),
        Direction::Back => (0.0, -step),
        Direction::Left => (step, 0.0),
        Direction::Right => (-step, 0.0),
    }
}

/// Selector filter for an entity kind
fn entity_filter(kind: &str) -> Result<String> {
    let kind = kind.trim().trim_start_matches("minecraft:").to_lowercase();
    if !kind
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(McpError::InvalidParams(format!("Invalid entity type: {}", kind)));
    }
    Ok(match kind.as_str() {
        "" => String::new(),
        "mob" => NOT_MOBS
            .iter()
            .map(|t| format!(",type=!minecraft:{}", t))
            .collect(),
        other => format!(",type=minecraft:{}", other),
    })
}

fn block_args(pos: BlockPos) -> String {
    format!("{} {} {}", pos.x, pos.y, pos.z)
}

fn changed(reply: &str) -> bool {
    reply.starts_with("Changed the block")
}

impl<C: Console> RconBot<C> {
    pub(crate) async fn say(&self, message: &str) -> Result<()> {
        let text = serde_json::json!({ "text": format!("<{}> {}", self.username, message) });
        self.command(&format!("tellraw @a {}", text)).await?;
        Ok(())
    }

    async fn selected_slot(&self) -> Result<i32> {
        for path in ["SelectedItemSlot", "selected_slot"] {
            let reply = self
                .command(&format!("data get entity {} {}", self.username, path))
                .await?;
            if let Some(slot) = parse_int(&reply) {
                return Ok(slot as i32);
            }
        }
        Err(McpError::game("Could not read the selected hotbar slot"))
    }

    async fn slot_occupied(&self, slot: &str) -> Result<bool> {
        let reply = self
            .command(&format!("execute if items entity {} {} *", self.username, slot))
            .await?;
        Ok(reply.contains("passed"))
    }

    /// Teleport toward `target` each tick until `arrived` or the generation
    /// changes
    async fn travel(
        &self,
        generation: &AtomicU64,
        target: Vec3,
        step: f64,
        arrived: f64,
        stopped: &str,
    ) -> Result<()> {
        let started = generation.load(Ordering::SeqCst);
        loop {
            if generation.load(Ordering::SeqCst) != started {
                return Err(McpError::game(stopped));
            }
            let position = self.position().await?;
            if position.distance_to(&target) <= arrived {
                return Ok(());
            }
            let next = position.step_toward(&target, step);
            self.command(&format!(
                "tp {} {} {} {}",
                self.username, next.x, next.y, next.z
            ))
            .await?;
            sleep(MOTION_TICK).await;
        }
    }

    fn stack_at(items: &[ItemStack], slot: i32) -> Result<ItemStack> {
        items
            .iter()
            .find(|i| i.slot == slot)
            .cloned()
            .ok_or_else(|| McpError::game(format!("Inventory slot {} is empty", slot)))
    }
}

#[async_trait]
impl<C: Console> Bot for RconBot<C> {
    fn username(&self) -> &str {
        &self.username
    }

    async fn position(&self) -> Result<Vec3> {
        let reply = self
            .command(&format!("data get entity {} Pos", self.username))
            .await?;
        parse_position(&reply)
            .ok_or_else(|| McpError::game(format!("Could not read bot position: {}", reply)))
    }

    async fn game_mode(&self) -> Result<GameMode> {
        let reply = self
            .command(&format!("data get entity {} playerGameType", self.username))
            .await?;
        parse_int(&reply)
            .and_then(GameMode::from_id)
            .ok_or_else(|| McpError::game(format!("Could not read game mode: {}", reply)))
    }

    async fn look_at(&self, target: Vec3) -> Result<()> {
        self.command(&format!(
            "execute as {} at @s run tp @s ~ ~ ~ facing {} {} {}",
            self.username, target.x, target.y, target.z
        ))
        .await?;
        Ok(())
    }

    async fn jump(&self) -> Result<()> {
        self.command(&format!(
            "execute as {} at @s run tp @s ~ ~1.25 ~",
            self.username
        ))
        .await?;
        Ok(())
    }

    async fn walk(&self, direction: Direction, duration: Duration) -> Result<()> {
        let started = self.motion.load(Ordering::SeqCst);
        let ticks = (duration.as_millis() / MOTION_TICK.as_millis()).max(1);
        let (left, forward) = local_offset(direction, WALK_STEP);

        for _ in 0..ticks {
            if self.motion.load(Ordering::SeqCst) != started {
                break;
            }
            // Feet and head space must both be free
            self.command(&format!(
                "execute as {} at @s positioned ^{} ^ ^{} \
                 if block ~ ~ ~ #minecraft:replaceable \
                 if block ~ ~1 ~ #minecraft:replaceable run tp @s ~ ~ ~",
                self.username, left, forward
            ))
            .await?;
            sleep(MOTION_TICK).await;
        }
        Ok(())
    }

    async fn goto(&self, target: Vec3, range: f64) -> Result<()> {
        self.travel(&self.motion, target, GOTO_STEP, range, "Movement stopped")
            .await
    }

    async fn stop_moving(&self) {
        self.motion.fetch_add(1, Ordering::SeqCst);
    }

    async fn fly_to(&self, target: Vec3) -> Result<()> {
        self.travel(&self.flight, target, FLY_STEP, FLY_ARRIVAL, "Flight stopped")
            .await?;
        self.command(&format!(
            "tp {} {} {} {}",
            self.username, target.x, target.y, target.z
        ))
        .await?;
        Ok(())
    }

    async fn stop_flying(&self) {
        self.flight.fetch_add(1, Ordering::SeqCst);
    }

    async fn chat(&self, message: &str) -> Result<()> {
        self.say(message).await
    }

    async fn inventory(&self) -> Result<Vec<ItemStack>> {
        let reply = self
            .command(&format!("data get entity {} Inventory", self.username))
            .await?;
        Ok(parse_items(&reply))
    }

    async fn equip(&self, slot: i32, destination: EquipDestination) -> Result<()> {
        let source = slot_name(slot)
            .ok_or_else(|| McpError::game(format!("Cannot equip from slot {}", slot)))?;
        let target = destination_slot(destination);
        if source == target {
            return Ok(());
        }
        let user = &self.username;

        if self.slot_occupied(target).await? {
            // Swap through a free slot
            let items = self.inventory().await?;
            let free = (0..36)
                .find(|s| !items.iter().any(|i| i.slot == *s))
                .and_then(slot_name)
                .ok_or_else(|| McpError::game("No free inventory slot to swap through"))?;
            for command in [
                format!("item replace entity {user} {free} from entity {user} {target}"),
                format!("item replace entity {user} {target} from entity {user} {source}"),
                format!("item replace entity {user} {source} from entity {user} {free}"),
                format!("item replace entity {user} {free} with minecraft:air"),
            ] {
                self.command(&command).await?;
            }
        } else {
            self.command(&format!(
                "item replace entity {user} {target} from entity {user} {source}"
            ))
            .await?;
            self.command(&format!("item replace entity {user} {source} with minecraft:air"))
                .await?;
        }
        Ok(())
    }

    async fn test_block(&self, pos: BlockPos, predicate: &str) -> Result<bool> {
        let reply = self
            .command(&format!("execute if block {} {}", block_args(pos), predicate))
            .await?;
        if reply.contains("Test passed") {
            Ok(true)
        } else if reply.contains("Test failed") {
            Ok(false)
        } else {
            Err(McpError::game(reply))
        }
    }

    async fn place_block(&self, pos: BlockPos, face: FaceDirection) -> Result<()> {
        let selected = self.selected_slot().await?;
        let held = self
            .inventory()
            .await?
            .into_iter()
            .find(|i| i.slot == selected)
            .ok_or_else(|| McpError::game("No block in hand. Equip a block first"))?;
        debug!("Placing {} at {} against {}", held.name, pos, face.as_str());

        let reply = self
            .command(&format!(
                "setblock {} minecraft:{} keep",
                block_args(pos),
                held.name
            ))
            .await?;
        if !changed(&reply) {
            return Err(McpError::game(reply));
        }

        if self.game_mode().await? != GameMode::Creative {
            self.command(&format!("clear {} minecraft:{} 1", self.username, held.name))
                .await?;
        }
        Ok(())
    }

    async fn dig_block(&self, pos: BlockPos) -> Result<()> {
        let reply = self
            .command(&format!("setblock {} minecraft:air destroy", block_args(pos)))
            .await?;
        if changed(&reply) {
            Ok(())
        } else {
            Err(McpError::game(reply))
        }
    }

    async fn nearest_entity(&self, kind: &str, max_distance: f64) -> Result<Option<EntityInfo>> {
        let filter = entity_filter(kind)?;
        let reply = self
            .command(&format!(
                "execute at {user} run data get entity \
                 @e[distance=..{max_distance}{filter},name=!{user},sort=nearest,limit=1] Pos",
                user = self.username
            ))
            .await?;
        Ok(parse_entity(&reply))
    }

    async fn furnace_contents(&self, pos: BlockPos) -> Result<Vec<ItemStack>> {
        let reply = self
            .command(&format!("data get block {} Items", block_args(pos)))
            .await?;
        if reply.contains("data:") {
            Ok(parse_items(&reply))
        } else if reply.starts_with("Found no elements") {
            Ok(Vec::new())
        } else {
            Err(McpError::game(reply))
        }
    }

    async fn put_in_furnace(
        &self,
        pos: BlockPos,
        slot: FurnaceSlot,
        from_slot: i32,
        count: u32,
    ) -> Result<()> {
        let source = slot_name(from_slot)
            .ok_or_else(|| McpError::game(format!("Cannot take items from slot {}", from_slot)))?;
        let stack = Self::stack_at(&self.inventory().await?, from_slot)?;
        let count = count.min(stack.count);
        let block = block_args(pos);
        let index = slot.index();
        // A same-item stack already in the slot keeps its items
        let already = self
            .furnace_contents(pos)
            .await?
            .into_iter()
            .find(|i| i.slot == index && i.name == stack.name)
            .map_or(0, |i| i.count);
        let total = already + count;

        self.command(&format!(
            "item replace block {block} container.{index} from entity {} {source}",
            self.username
        ))
        .await?;
        self.command(&format!(
            "data modify block {block} Items[{{Slot:{index}b}}].count set value {total}"
        ))
        .await?;
        self.command(&format!(
            "clear {} minecraft:{} {}",
            self.username, stack.name, count
        ))
        .await?;
        Ok(())
    }

    async fn take_furnace_output(&self, pos: BlockPos) -> Result<Option<ItemStack>> {
        let output = FurnaceSlot::Output.index();
        let Some(stack) = self
            .furnace_contents(pos)
            .await?
            .into_iter()
            .find(|i| i.slot == output)
        else {
            return Ok(None);
        };

        self.command(&format!(
            "give {} minecraft:{} {}",
            self.username, stack.name, stack.count
        ))
        .await?;
        self.command(&format!(
            "item replace block {} container.{} with minecraft:air",
            block_args(pos),
            output
        ))
        .await?;
        Ok(Some(stack))
    }

    async fn run_command(&self, command: &str) -> Result<String> {
        self.command(command.trim_start_matches('/')).await
    }
}
