//! In-memory bot and an always-ready dispatcher for tool tests

use crate::bot::{Bot, BotProvider, EntityInfo, EquipDestination, FurnaceSlot, ItemStack};
use crate::chat::MessageStore;
use async_trait::async_trait;
use minecraft_mcp_core::{
    BlockPos, Direction, FaceDirection, GameMode, McpError, Result, ToolResponse, Vec3,
};
use minecraft_mcp_server::{Dispatcher, Readiness, ReadinessGate};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub(crate) struct MockState {
    pub position: Vec3,
    pub game_mode: GameMode,
    pub inventory: Vec<ItemStack>,
    /// Non-air blocks by position
    pub blocks: HashMap<BlockPos, String>,
    pub entity: Option<EntityInfo>,
    pub furnace: Vec<ItemStack>,
    /// Output stack appearing once the furnace has been read this many times
    pub output: Option<(usize, ItemStack)>,
    pub furnace_reads: usize,
    pub replies: HashMap<String, String>,
    pub hang_movement: bool,
    pub fail_place: bool,
    /// Every mutating call, in order
    pub actions: Vec<String>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.5, 64.0, 0.5),
            game_mode: GameMode::Survival,
            inventory: Vec::new(),
            blocks: HashMap::new(),
            entity: None,
            furnace: Vec::new(),
            output: None,
            furnace_reads: 0,
            replies: HashMap::new(),
            hang_movement: false,
            fail_place: false,
            actions: Vec::new(),
        }
    }
}

#[derive(Default)]
pub(crate) struct MockBot {
    state: Mutex<MockState>,
    motion: AtomicU64,
    flight: AtomicU64,
}

impl MockBot {
    pub fn new(configure: impl FnOnce(&mut MockState)) -> Arc<Self> {
        let bot = Self::default();
        configure(&mut bot.state());
        Arc::new(bot)
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn actions(&self) -> Vec<String> {
        self.state().actions.clone()
    }

    fn act(&self, action: String) {
        self.state().actions.push(action);
    }

    /// Block until the generation moves on
    async fn hang(generation: &AtomicU64, stopped: &str) -> Result<()> {
        let started = generation.load(Ordering::SeqCst);
        while generation.load(Ordering::SeqCst) == started {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        Err(McpError::game(stopped))
    }
}

pub(crate) fn item(slot: i32, name: &str, count: u32) -> ItemStack {
    ItemStack {
        slot,
        name: name.to_string(),
        count,
    }
}

#[async_trait]
impl Bot for MockBot {
    fn username(&self) -> &str {
        "LLMBot"
    }

    async fn position(&self) -> Result<Vec3> {
        Ok(self.state().position)
    }

    async fn game_mode(&self) -> Result<GameMode> {
        Ok(self.state().game_mode)
    }

    async fn look_at(&self, target: Vec3) -> Result<()> {
        self.act(format!("look {} {} {}", target.x, target.y, target.z));
        Ok(())
    }

    async fn jump(&self) -> Result<()> {
        self.act("jump".to_string());
        Ok(())
    }

    async fn walk(&self, direction: Direction, duration: Duration) -> Result<()> {
        self.act(format!("walk {} {}", direction.as_str(), duration.as_millis()));
        Ok(())
    }

    async fn goto(&self, target: Vec3, range: f64) -> Result<()> {
        self.act(format!("goto {} {} {} {}", target.x, target.y, target.z, range));
        if self.state().hang_movement {
            return Self::hang(&self.motion, "Movement stopped").await;
        }
        self.state().position = target;
        Ok(())
    }

    async fn stop_moving(&self) {
        self.act("stop moving".to_string());
        self.motion.fetch_add(1, Ordering::SeqCst);
    }

    async fn fly_to(&self, target: Vec3) -> Result<()> {
        if self.state().hang_movement {
            // Drift partway before stalling
            self.state().position = Vec3::new(target.x / 2.0, target.y, target.z / 2.0);
            return Self::hang(&self.flight, "Flight stopped").await;
        }
        self.state().position = target;
        Ok(())
    }

    async fn stop_flying(&self) {
        self.act("stop flying".to_string());
        self.flight.fetch_add(1, Ordering::SeqCst);
    }

    async fn chat(&self, message: &str) -> Result<()> {
        self.act(format!("chat {}", message));
        Ok(())
    }

    async fn inventory(&self) -> Result<Vec<ItemStack>> {
        Ok(self.state().inventory.clone())
    }

    async fn equip(&self, slot: i32, destination: EquipDestination) -> Result<()> {
        self.act(format!("equip {} {}", slot, destination));
        Ok(())
    }

    async fn test_block(&self, pos: BlockPos, predicate: &str) -> Result<bool> {
        let state = self.state();
        let block = state.blocks.get(&pos);
        Ok(match predicate {
            "#minecraft:air" => block.is_none(),
            id => block.is_some_and(|b| *b == id.trim_start_matches("minecraft:")),
        })
    }

    async fn place_block(&self, pos: BlockPos, face: FaceDirection) -> Result<()> {
        let mut state = self.state();
        if state.fail_place {
            return Err(McpError::game("Could not set the block"));
        }
        let held = state
            .inventory
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| McpError::game("No block in hand. Equip a block first"))?;
        state.blocks.insert(pos, held);
        state.actions.push(format!("place {} {}", pos, face.as_str()));
        Ok(())
    }

    async fn dig_block(&self, pos: BlockPos) -> Result<()> {
        let mut state = self.state();
        state.blocks.remove(&pos);
        state.actions.push(format!("dig {}", pos));
        Ok(())
    }

    async fn nearest_entity(&self, kind: &str, max_distance: f64) -> Result<Option<EntityInfo>> {
        let state = self.state();
        Ok(state.entity.clone().filter(|e| {
            e.position.distance_to(&state.position) <= max_distance
                && (kind.is_empty() || e.name.to_lowercase().contains(&kind.to_lowercase()))
        }))
    }

    async fn furnace_contents(&self, _pos: BlockPos) -> Result<Vec<ItemStack>> {
        let mut state = self.state();
        state.furnace_reads += 1;
        let reads = state.furnace_reads;
        let mut contents = state.furnace.clone();
        if let Some((after, stack)) = &state.output {
            if reads >= *after {
                contents.push(stack.clone());
            }
        }
        Ok(contents)
    }

    async fn put_in_furnace(
        &self,
        _pos: BlockPos,
        slot: FurnaceSlot,
        from_slot: i32,
        count: u32,
    ) -> Result<()> {
        self.act(format!("put {:?} from {} x{}", slot, from_slot, count));
        Ok(())
    }

    async fn take_furnace_output(&self, _pos: BlockPos) -> Result<Option<ItemStack>> {
        let output = self.state().output.take().map(|(_, stack)| stack);
        Ok(output)
    }

    async fn run_command(&self, command: &str) -> Result<String> {
        let command = command.trim_start_matches('/');
        self.act(format!("run {}", command));
        self.state()
            .replies
            .get(command)
            .cloned()
            .ok_or_else(|| McpError::game(format!("Unknown or incomplete command: {}", command)))
    }
}

struct AlwaysReady;

#[async_trait]
impl ReadinessGate for AlwaysReady {
    async fn check_readiness(&self) -> Readiness {
        Readiness::Ready
    }
}

/// A dispatcher with every tool registered against `bot`
pub(crate) fn dispatcher(bot: Arc<MockBot>) -> Dispatcher {
    dispatcher_with_messages(bot, Arc::new(MessageStore::new()))
}

pub(crate) fn dispatcher_with_messages(
    bot: Arc<MockBot>,
    messages: Arc<MessageStore>,
) -> Dispatcher {
    let mut dispatcher = Dispatcher::new(Arc::new(AlwaysReady));
    let bots: Arc<dyn BotProvider> = Arc::new(bot);
    super::register_tools(&mut dispatcher, bots, messages);
    dispatcher
}

/// Call a known tool
pub(crate) async fn call(dispatcher: &Dispatcher, name: &str, args: Value) -> ToolResponse {
    dispatcher.call(name, args).await.unwrap()
}
