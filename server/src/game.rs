//! The authoritative game: players, fruit, the lane layout and one enemy
//! engine, advanced together by [`GameCoordinator::tick`].
//!
//! Every tick runs the same pipeline under the world lock: enemy snapshot,
//! player steps, enemy hits, fruit pickups, ceiling and water hazards, the
//! celebration countdown, then objective detection. Events are collected
//! while the lock is held and delivered to observers after it is released.

use crate::config::GameConfig;
use crate::engine::{EnemyEngine, EngineError};
use crate::entity::Entity;
use crate::observer::{Observer, SubscriptionId, Subscribers};
use crate::player::{InputBuffer, Player};
use crate::scheduler::Tickable;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    CelebrationView, Direction, EnemyId, EnemySnapshot, EnemyView, FruitId, FruitView, GameEvent,
    GameStateView, HitCause, LaneError, LaneRegistry, PlayerId, PlayerState,
};
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Remaining celebration time at or below this counts as expired.
const TIMER_EPSILON: f32 = 1e-4;

/// Rejections from the administrative operations. `Display` is the message
/// shown to an operator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdminError {
    #[error("the game is full ({max} players)")]
    GameFull { max: usize },
    #[error("player {0} is already in the game")]
    DuplicatePlayer(PlayerId),
    #[error("player {0} is not in the game")]
    UnknownPlayer(PlayerId),
    #[error("invalid lane {lane}, must be between 0 and {last}")]
    UnknownLane { lane: usize, last: usize },
    #[error("invalid y {y:.1} for lane {lane}, must be between {min:.1} and {max:.1}")]
    OutOfRange { lane: usize, y: f32, min: f32, max: f32 },
    #[error("a fruit already sits at lane {lane}, y={existing:.1}; fruit must be at least {spacing:.0} units apart")]
    FruitTooClose { lane: usize, existing: f32, spacing: f32 },
    #[error("points must be greater than 0")]
    NonPositivePoints,
    #[error("no fruit at lane {lane}, y={y:.1}")]
    FruitNotFound { lane: usize, y: f32 },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fruit {
    pub id: FruitId,
    pub lane: usize,
    pub y: f32,
    pub points: u32,
    pub collected: bool,
}

impl Fruit {
    pub fn view(&self) -> FruitView {
        FruitView {
            id: self.id,
            lane: self.lane,
            y: self.y,
            points: self.points,
        }
    }
}

impl Entity for Fruit {
    type Id = FruitId;

    fn id(&self) -> FruitId {
        self.id
    }

    fn lane(&self) -> Option<usize> {
        Some(self.lane)
    }

    fn y(&self) -> f32 {
        self.y
    }
}

#[derive(Debug, Default)]
struct Celebration {
    pending: bool,
    remaining: f32,
}

#[derive(Debug, Default)]
struct World {
    players: BTreeMap<PlayerId, Player>,
    fruits: Vec<Fruit>,
    next_fruit_id: FruitId,
    tick: u64,
    paused: bool,
    celebration: Celebration,
}

pub struct GameCoordinator {
    config: GameConfig,
    lanes: LaneRegistry,
    engine: Arc<EnemyEngine>,
    world: Mutex<World>,
    inputs: RwLock<HashMap<PlayerId, Arc<InputBuffer>>>,
    subscribers: Subscribers,
    rng: Mutex<StdRng>,
}

impl GameCoordinator {
    pub fn new(config: GameConfig) -> Result<Self, LaneError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Same as [`GameCoordinator::new`] with a reproducible random source.
    pub fn with_seed(config: GameConfig, seed: u64) -> Result<Self, LaneError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: GameConfig, rng: StdRng) -> Result<Self, LaneError> {
        let world = &config.world;
        let lanes = LaneRegistry::uniform(world.lane_count, world.lane_min_y, world.lane_max_y)?;

        let engine = EnemyEngine::new(config.enemy_tick, config.engine_stop_grace);
        for lane in lanes.iter() {
            engine.register_lane(lane.clone());
        }

        Ok(Self {
            config,
            lanes,
            engine: Arc::new(engine),
            world: Mutex::new(World {
                next_fruit_id: 1,
                ..World::default()
            }),
            inputs: RwLock::new(HashMap::new()),
            subscribers: Subscribers::new(),
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn lanes(&self) -> &LaneRegistry {
        &self.lanes
    }

    pub fn engine(&self) -> &Arc<EnemyEngine> {
        &self.engine
    }

    pub fn tick_count(&self) -> u64 {
        self.world.lock().tick
    }

    /// Advances the game by `dt` seconds and notifies observers.
    pub fn tick(&self, dt: f32) {
        let mut events = Vec::new();
        {
            let mut world = self.world.lock();
            world.tick += 1;
            if !world.paused {
                self.advance(&mut world, dt, &mut events);
            }
        }

        for event in &events {
            self.subscribers.notify(Some(event));
        }
        self.subscribers.notify(None);
    }

    fn advance(&self, world: &mut World, dt: f32, events: &mut Vec<GameEvent>) {
        let enemies: Vec<EnemySnapshot> = self
            .engine
            .snapshot()
            .enemies
            .into_iter()
            .filter(EnemySnapshot::is_active)
            .collect();
        let inputs = self.inputs.read();
        let World {
            players,
            fruits,
            celebration,
            ..
        } = world;
        let tuning = &self.config.player;
        let layout = &self.config.world;

        // Every buffer is drained, even for players that cannot move
        for player in players.values_mut() {
            let flags = inputs
                .get(&player.id)
                .map(|buffer| buffer.consume())
                .unwrap_or_default();
            if player.active && !player.is_celebrating() {
                player.step(flags, dt, tuning, layout, &self.lanes);
            }
        }

        for player in players.values_mut().filter(|p| in_play(p)) {
            let hit = enemies
                .iter()
                .find(|enemy| player.is_near(*enemy, self.config.hit_radius));
            if let Some(enemy) = hit {
                self.apply_hit(player, HitCause::Enemy(enemy.id), events);
            }
        }

        for fruit in fruits.iter_mut() {
            let taker = players
                .values_mut()
                .filter(|p| in_play(p))
                .find(|p| p.is_near(&*fruit, self.config.pickup_radius));
            if let Some(player) = taker {
                player.add_score(fruit.points);
                fruit.collected = true;
                debug!("player {} took fruit {}", player.id, fruit.id);
                events.push(GameEvent::FruitTaken {
                    player_id: player.id,
                    points: fruit.points,
                });
            }
        }
        fruits.retain(|fruit| !fruit.collected);

        for player in players.values_mut().filter(|p| in_play(p)) {
            if player.y < layout.ceiling_y {
                self.apply_hit(player, HitCause::Abyss, events);
            } else if player.y > layout.water_y {
                self.apply_hit(player, HitCause::Water, events);
            }
        }

        if celebration.pending {
            celebration.remaining -= dt;
            for player in players.values_mut().filter(|p| p.is_celebrating()) {
                player.tick_celebration(dt);
            }
            if celebration.remaining <= TIMER_EPSILON {
                self.finish_celebration(players, celebration);
            }
        }

        if !celebration.pending {
            let winner = players.values_mut().find(|p| {
                in_play(p)
                    && p.lane() == Some(layout.objective_lane)
                    && p.y <= layout.objective_y
            });
            if let Some(player) = winner {
                info!("Player {} reached the objective", player.id);
                player.celebrate(self.config.celebration_seconds);
                celebration.pending = true;
                celebration.remaining = self.config.celebration_seconds;
                events.push(GameEvent::PlayerWin {
                    player_id: player.id,
                });
            }
        }

        for player in players.values() {
            if let Some(buffer) = inputs.get(&player.id) {
                buffer.set_accepting(player.accepts_input());
            }
        }
    }

    fn apply_hit(&self, player: &mut Player, cause: HitCause, events: &mut Vec<GameEvent>) {
        events.push(GameEvent::PlayerHit {
            player_id: player.id,
            cause,
        });

        if player.lose_life() {
            info!(
                "Player {} hit by {}, {} lives left",
                player.id, cause, player.lives
            );
            player.respawn(&self.config.world);
        } else {
            info!("Player {} eliminated by {}", player.id, cause);
            player.active = false;
            events.push(GameEvent::PlayerEliminated {
                player_id: player.id,
            });
        }
    }

    fn finish_celebration(
        &self,
        players: &mut BTreeMap<PlayerId, Player>,
        celebration: &mut Celebration,
    ) {
        celebration.pending = false;
        celebration.remaining = 0.0;

        for player in players.values_mut().filter(|p| p.lives > 0) {
            player.active = true;
            player.respawn(&self.config.world);
        }

        match self.engine.increase_difficulty(self.config.difficulty_step) {
            Ok(factor) => info!("Round complete, difficulty now x{:.2}", factor),
            Err(e) => warn!("Could not raise difficulty: {}", e),
        }
    }

    pub fn add_player(&self, id: PlayerId) -> Result<(), AdminError> {
        {
            let mut world = self.world.lock();
            if world.players.contains_key(&id) {
                return Err(self.reject(AdminError::DuplicatePlayer(id)));
            }
            if world.players.len() >= self.config.max_players {
                return Err(self.reject(AdminError::GameFull {
                    max: self.config.max_players,
                }));
            }

            let player = Player::new(id, &self.config.world, &self.config.player);
            info!("Added player {} at ({}, {})", id, player.x, player.y);
            world.players.insert(id, player);
            self.inputs.write().insert(id, Arc::new(InputBuffer::new()));
        }

        self.subscribers.notify(None);
        Ok(())
    }

    pub fn remove_player(&self, id: PlayerId) -> Result<(), AdminError> {
        {
            let mut world = self.world.lock();
            if world.players.remove(&id).is_none() {
                return Err(AdminError::UnknownPlayer(id));
            }
            self.inputs.write().remove(&id);
            if world.players.is_empty() {
                world.celebration = Celebration::default();
            }
            info!("Removed player {}", id);
        }

        self.subscribers.notify(None);
        Ok(())
    }

    /// Buffers a raw action for the next tick. False for unknown players,
    /// unknown actions, or players that cannot act right now.
    pub fn register_input(&self, id: PlayerId, action: &str) -> bool {
        let buffer = self.inputs.read().get(&id).cloned();
        match buffer {
            Some(buffer) => buffer.register_str(action),
            None => false,
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.world.lock().paused = paused;
        info!("Game {}", if paused { "paused" } else { "resumed" });
        self.subscribers.notify(None);
    }

    pub fn is_paused(&self) -> bool {
        self.world.lock().paused
    }

    /// Adds a patrolling crocodile with a random starting direction.
    pub fn add_red_enemy(&self, lane: usize, y: f32) -> Result<EnemyId, AdminError> {
        self.validate_position(lane, y)?;
        let direction = if self.rng.lock().gen_bool(0.5) {
            Direction::Up
        } else {
            Direction::Down
        };

        let id = self
            .engine
            .create_patrol(lane, y, self.config.red_enemy_speed, direction)?;
        info!("Red enemy {} queued on lane {} at y={:.1}", id, lane, y);
        self.subscribers.notify(None);
        Ok(id)
    }

    /// Adds a falling crocodile that leaves at the bottom of its lane.
    pub fn add_blue_enemy(&self, lane: usize, y: f32) -> Result<EnemyId, AdminError> {
        self.validate_position(lane, y)?;
        let id = self
            .engine
            .create_faller(lane, y, self.config.blue_enemy_speed)?;
        info!("Blue enemy {} queued on lane {} at y={:.1}", id, lane, y);
        self.subscribers.notify(None);
        Ok(id)
    }

    pub fn remove_enemy(&self, id: EnemyId) {
        self.engine.remove(id);
        self.subscribers.notify(None);
    }

    pub fn add_fruit(&self, lane: usize, y: f32, points: i64) -> Result<FruitId, AdminError> {
        self.validate_position(lane, y)?;

        let id = {
            let mut world = self.world.lock();
            let spacing = self.config.fruit_min_spacing;
            if let Some(existing) = world
                .fruits
                .iter()
                .find(|fruit| fruit.lane == lane && (fruit.y - y).abs() < spacing)
            {
                return Err(self.reject(AdminError::FruitTooClose {
                    lane,
                    existing: existing.y,
                    spacing,
                }));
            }
            let points = match u32::try_from(points) {
                Ok(points) if points > 0 => points,
                _ => return Err(self.reject(AdminError::NonPositivePoints)),
            };

            let id = world.next_fruit_id;
            world.next_fruit_id += 1;
            world.fruits.push(Fruit {
                id,
                lane,
                y,
                points,
                collected: false,
            });
            info!("Fruit {} placed on lane {} at y={:.1} ({} points)", id, lane, y, points);
            id
        };

        self.subscribers.notify(None);
        Ok(id)
    }

    /// Removes the fruit on `lane` within half a unit of `y`.
    pub fn remove_fruit(&self, lane: usize, y: f32) -> Result<FruitId, AdminError> {
        let id = {
            let mut world = self.world.lock();
            let index = world
                .fruits
                .iter()
                .position(|fruit| fruit.lane == lane && (fruit.y - y).abs() < 0.5)
                .ok_or(AdminError::FruitNotFound { lane, y })?;
            let fruit = world.fruits.remove(index);
            info!("Fruit {} removed from lane {}", fruit.id, lane);
            fruit.id
        };

        self.subscribers.notify(None);
        Ok(id)
    }

    /// Populates a fresh board: two patrolling crocodiles and 2 to 4 fruit.
    pub fn seed_world(&self) {
        let patrols = [(0, 150.0, 60.0, Direction::Up), (2, 300.0, 70.0, Direction::Down)];
        for (lane, y, speed, direction) in patrols {
            if let Err(e) = self.engine.create_patrol(lane, y, speed, direction) {
                warn!("Skipping initial enemy on lane {}: {}", lane, e);
            }
        }

        let last_lane = self.lanes.last_index().unwrap_or(0).min(3);
        let placements: Vec<(usize, f32)> = {
            let mut rng = self.rng.lock();
            let count = rng.gen_range(2..=4);
            (0..count)
                .map(|_| (rng.gen_range(0..=last_lane), rng.gen_range(150.0..400.0)))
                .collect()
        };

        for (lane, y) in placements {
            if let Err(e) = self.add_fruit(lane, y, self.config.fruit_points as i64) {
                debug!("Skipping initial fruit: {}", e);
            }
        }
        info!("World seeded");
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer>) -> SubscriptionId {
        self.subscribers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    pub fn game_state(&self) -> GameStateView {
        let engine = self.engine.snapshot();
        let world = self.world.lock();

        GameStateView {
            tick: world.tick,
            paused: world.paused,
            difficulty: engine.difficulty,
            players: world.players.values().map(Player::view).collect(),
            enemies: engine.active().map(EnemyView::from).collect(),
            fruits: world.fruits.iter().map(Fruit::view).collect(),
            celebration: CelebrationView {
                pending: world.celebration.pending,
                remaining: world.celebration.remaining.max(0.0),
            },
        }
    }

    /// Human-readable listing for the admin console.
    pub fn list_entities(&self) -> String {
        let state = self.game_state();
        let mut out = String::from("=== GAME ENTITIES ===\n");

        let _ = writeln!(out, "Players: {}", state.players.len());
        for p in &state.players {
            let lane = p.lane.map_or_else(|| "-".to_string(), |lane| lane.to_string());
            let _ = writeln!(
                out,
                "  - {} (lane={}, x={:.2}, y={:.2}, state={:?}, lives={}, score={})",
                p.id, lane, p.x, p.y, p.state, p.lives, p.score
            );
        }

        let _ = writeln!(out, "Enemies: {}", state.enemies.len());
        for e in &state.enemies {
            let _ = writeln!(out, "  - {} ({}, lane={}, y={:.2})", e.id, e.kind, e.lane, e.y);
        }

        let _ = writeln!(out, "Fruit: {}", state.fruits.len());
        for f in &state.fruits {
            let _ = writeln!(
                out,
                "  - {} (lane={}, y={:.2}, points={})",
                f.id, f.lane, f.y, f.points
            );
        }
        out
    }

    fn validate_position(&self, lane: usize, y: f32) -> Result<(), AdminError> {
        let Some((min, max)) = self.lanes.range_of(lane) else {
            return Err(self.reject(AdminError::UnknownLane {
                lane,
                last: self.lanes.last_index().unwrap_or(0),
            }));
        };
        if !(y >= min && y <= max) {
            return Err(self.reject(AdminError::OutOfRange { lane, y, min, max }));
        }
        Ok(())
    }

    fn reject(&self, error: AdminError) -> AdminError {
        warn!("{}", error);
        error
    }
}

fn in_play(player: &Player) -> bool {
    player.active && !matches!(player.state, PlayerState::Dead | PlayerState::Celebrating)
}

impl Tickable for GameCoordinator {
    type Error = Infallible;

    fn name(&self) -> &str {
        "game"
    }

    fn tick(&self, dt: Duration) -> Result<(), Infallible> {
        GameCoordinator::tick(self, dt.as_secs_f32());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::InputAction;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    const DT: f32 = 0.05;

    fn coordinator() -> GameCoordinator {
        GameCoordinator::with_seed(GameConfig::default(), 7).unwrap()
    }

    fn listen(game: &GameCoordinator) -> UnboundedReceiver<Option<GameEvent>> {
        let (tx, rx) = mpsc::unbounded_channel::<Option<GameEvent>>();
        game.subscribe(Arc::new(tx));
        rx
    }

    fn events(rx: &mut UnboundedReceiver<Option<GameEvent>>) -> Vec<GameEvent> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            out.extend(update);
        }
        out
    }

    fn with_player<R>(game: &GameCoordinator, id: PlayerId, f: impl FnOnce(&mut Player) -> R) -> R {
        let mut world = game.world.lock();
        f(world.players.get_mut(&id).unwrap())
    }

    #[test]
    fn test_add_player_limits() {
        let game = coordinator();
        assert!(game.add_player(1).is_ok());
        assert_eq!(game.add_player(1), Err(AdminError::DuplicatePlayer(1)));
        assert!(game.add_player(2).is_ok());
        assert_eq!(game.add_player(3), Err(AdminError::GameFull { max: 2 }));
        assert_eq!(game.game_state().players.len(), 2);
    }

    #[test]
    fn test_register_input() {
        let game = coordinator();
        game.add_player(1).unwrap();

        assert!(game.register_input(1, "jump"));
        assert!(!game.register_input(1, "TELEPORT"));
        assert!(!game.register_input(9, "JUMP"));
    }

    #[test]
    fn test_repeated_input_applies_once() {
        let game = coordinator();
        game.add_player(1).unwrap();
        for _ in 0..3 {
            assert!(game.register_input(1, "JUMP"));
        }

        game.tick(0.1);
        let vy = game.game_state().players[0].vy;
        assert_approx_eq!(vy, -168.0, 1e-3);

        game.tick(0.1);
        let state = game.game_state();
        assert_approx_eq!(state.players[0].vy, -116.0, 1e-3);
    }

    #[test]
    fn test_enemy_hit_respawns_player() {
        let game = coordinator();
        let mut rx = listen(&game);
        game.add_player(1).unwrap();

        let enemy = game.engine().create_patrol(1, 490.0, 0.0, Direction::Up).unwrap();
        game.engine().force_tick(0.0);
        game.tick(DT);

        let events = events(&mut rx);
        assert_eq!(
            events,
            vec![GameEvent::PlayerHit {
                player_id: 1,
                cause: HitCause::Enemy(enemy),
            }]
        );

        let state = game.game_state();
        let player = &state.players[0];
        assert_eq!(player.lives, 2);
        assert_eq!(player.state, PlayerState::Ground);
        assert_approx_eq!(player.y, 475.0);
    }

    #[test]
    fn test_enemy_on_other_lane_does_not_hit() {
        let game = coordinator();
        game.add_player(1).unwrap();
        game.engine().create_patrol(2, 475.0, 0.0, Direction::Up).unwrap();
        game.engine().force_tick(0.0);
        game.tick(DT);

        assert_eq!(game.game_state().players[0].lives, 3);
    }

    #[test]
    fn test_last_life_eliminates() {
        let game = coordinator();
        let mut rx = listen(&game);
        game.add_player(1).unwrap();
        with_player(&game, 1, |p| p.lives = 1);

        game.engine().create_patrol(1, 475.0, 0.0, Direction::Up).unwrap();
        game.engine().force_tick(0.0);
        game.tick(DT);

        let events = events(&mut rx);
        assert!(events.contains(&GameEvent::PlayerEliminated { player_id: 1 }));

        let state = game.game_state();
        let player = &state.players[0];
        assert_eq!(player.state, PlayerState::Dead);
        assert_eq!(player.lives, 0);
        assert!(!game.register_input(1, "LEFT"));

        // No further hits on a dead player
        game.tick(DT);
        assert!(events_after_tick_are_empty(&mut rx));
    }

    fn events_after_tick_are_empty(rx: &mut UnboundedReceiver<Option<GameEvent>>) -> bool {
        events(rx).is_empty()
    }

    #[test]
    fn test_fruit_goes_to_one_player() {
        let game = coordinator();
        let mut rx = listen(&game);
        game.add_player(1).unwrap();
        game.add_player(2).unwrap();
        game.add_fruit(1, 470.0, 25).unwrap();

        game.tick(DT);

        let taken: Vec<_> = events(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, GameEvent::FruitTaken { .. }))
            .collect();
        assert_eq!(
            taken,
            vec![GameEvent::FruitTaken {
                player_id: 1,
                points: 25,
            }]
        );

        let state = game.game_state();
        assert_eq!(state.players[0].score, 25);
        assert_eq!(state.players[1].score, 0);
        assert!(state.fruits.is_empty());
    }

    #[test]
    fn test_water_and_abyss() {
        let game = coordinator();
        let mut rx = listen(&game);
        game.add_player(1).unwrap();
        game.add_player(2).unwrap();

        with_player(&game, 1, |p| {
            p.state = PlayerState::Jumping;
            p.x = 5.0;
            p.y = 484.0;
            p.vy = 100.0;
        });
        with_player(&game, 2, |p| {
            p.state = PlayerState::Jumping;
            p.x = 5.0;
            p.y = 2.0;
            p.vy = -200.0;
        });
        game.tick(DT);

        let hits: Vec<_> = events(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::PlayerHit { player_id, cause } => Some((player_id, cause)),
                _ => None,
            })
            .collect();
        assert_eq!(hits, vec![(1, HitCause::Water), (2, HitCause::Abyss)]);
    }

    #[test]
    fn test_celebration_example() {
        let game = coordinator();
        let mut rx = listen(&game);
        game.add_player(1).unwrap();
        with_player(&game, 1, |p| {
            p.state = PlayerState::OnRope;
            p.lane_id = Some(7);
            p.x = 7.0;
            p.y = 60.0;
        });

        game.tick(DT);
        assert!(events(&mut rx).contains(&GameEvent::PlayerWin { player_id: 1 }));
        let state = game.game_state();
        assert_eq!(state.players[0].state, PlayerState::Celebrating);
        assert!(state.celebration.pending);
        assert!(!game.register_input(1, "UP"));

        let mut elapsed = 0.0;
        while game.game_state().celebration.pending {
            game.tick(DT);
            elapsed += DT;
            assert!(elapsed < 2.0, "celebration never ended");
        }

        assert!(elapsed >= 1.5 - 1e-3);
        let state = game.game_state();
        let player = &state.players[0];
        assert_eq!(player.state, PlayerState::Ground);
        assert_approx_eq!(player.x, 1.0);
        assert_approx_eq!(player.y, 475.0);
        assert_approx_eq!(state.difficulty, 1.1);
        assert!(game.register_input(1, "UP"));
    }

    #[test]
    fn test_paused_tick_only_counts() {
        let game = coordinator();
        let mut rx = listen(&game);
        game.add_player(1).unwrap();
        game.set_paused(true);
        assert!(game.register_input(1, "JUMP"));
        while rx.try_recv().is_ok() {}

        game.tick(DT);
        assert_eq!(game.tick_count(), 1);
        assert_eq!(game.game_state().players[0].state, PlayerState::Ground);
        assert_eq!(rx.try_recv().unwrap(), None);

        // Buffered input survives the pause
        game.set_paused(false);
        game.tick(DT);
        assert_eq!(game.game_state().players[0].state, PlayerState::Jumping);
    }

    #[test]
    fn test_admin_validation() {
        let game = coordinator();

        let err = game.add_red_enemy(8, 100.0).unwrap_err();
        assert_eq!(err.to_string(), "invalid lane 8, must be between 0 and 7");
        assert!(matches!(
            game.add_blue_enemy(0, 600.0),
            Err(AdminError::OutOfRange { .. })
        ));
        assert_eq!(
            game.add_fruit(0, 100.0, 0),
            Err(AdminError::NonPositivePoints)
        );
        assert_eq!(
            game.add_fruit(0, 100.0, -5),
            Err(AdminError::NonPositivePoints)
        );

        game.add_fruit(0, 100.0, 10).unwrap();
        assert!(matches!(
            game.add_fruit(0, 105.0, 10),
            Err(AdminError::FruitTooClose { .. })
        ));
        assert!(game.add_fruit(0, 110.0, 10).is_ok());
        assert!(game.add_fruit(1, 105.0, 10).is_ok());

        assert!(game.remove_fruit(0, 100.4).is_ok());
        assert!(matches!(
            game.remove_fruit(0, 100.0),
            Err(AdminError::FruitNotFound { .. })
        ));
        assert_eq!(game.game_state().fruits.len(), 2);
    }

    #[test]
    fn test_admin_enemies_reach_the_engine() {
        let game = coordinator();
        let red = game.add_red_enemy(3, 200.0).unwrap();
        let blue = game.add_blue_enemy(4, 10.0).unwrap();
        game.engine().force_tick(0.0);

        let snapshot = game.engine().snapshot();
        assert_eq!(snapshot.get(red).unwrap().base_speed, 60.0);
        assert_eq!(snapshot.get(blue).unwrap().base_speed, 50.0);

        game.remove_enemy(red);
        game.engine().force_tick(0.0);
        assert_eq!(game.game_state().enemies.len(), 1);
    }

    #[test]
    fn test_removing_last_player_clears_celebration() {
        let game = coordinator();
        game.add_player(1).unwrap();
        with_player(&game, 1, |p| {
            p.state = PlayerState::OnRope;
            p.lane_id = Some(7);
            p.x = 7.0;
            p.y = 10.0;
        });
        game.tick(DT);
        assert!(game.game_state().celebration.pending);

        game.remove_player(1).unwrap();
        assert!(!game.game_state().celebration.pending);
        assert_eq!(game.remove_player(1), Err(AdminError::UnknownPlayer(1)));
    }

    #[test]
    fn test_seed_world() {
        let game = coordinator();
        game.seed_world();
        game.engine().force_tick(0.0);

        let state = game.game_state();
        assert_eq!(state.enemies.len(), 2);
        assert!(!state.fruits.is_empty() && state.fruits.len() <= 4);
        assert!(state.fruits.iter().all(|f| f.lane <= 3 && f.y >= 150.0 && f.y < 400.0));
    }

    #[test]
    fn test_game_state_json() {
        let game = coordinator();
        game.add_player(4).unwrap();
        game.add_fruit(2, 200.0, 10).unwrap();
        game.tick(DT);

        let json = serde_json::to_value(game.game_state()).unwrap();
        assert_eq!(json["tick"], 1);
        assert_eq!(json["paused"], false);
        assert_eq!(json["players"][0]["id"], 4);
        assert_eq!(json["players"][0]["state"], "GROUND");
        assert_eq!(json["players"][0]["facing"], "RIGHT");
        assert_eq!(json["fruits"][0]["lane"], 2);
        assert_eq!(json["celebration"]["pending"], false);
    }

    #[test]
    fn test_list_entities() {
        let game = coordinator();
        game.add_player(1).unwrap();
        game.add_fruit(2, 200.0, 10).unwrap();
        let text = game.list_entities();
        assert!(text.contains("Players: 1"));
        assert!(text.contains("Fruit: 1"));
    }

    #[test]
    fn test_input_action_names() {
        // Every action name the transport sends is accepted
        let game = coordinator();
        game.add_player(1).unwrap();
        for action in [
            InputAction::Left,
            InputAction::Right,
            InputAction::Up,
            InputAction::Down,
            InputAction::Jump,
            InputAction::Grab,
        ] {
            let name = serde_json::to_value(action).unwrap();
            assert!(game.register_input(1, name.as_str().unwrap()));
        }
    }
}
