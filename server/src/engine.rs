//! The crocodile engine: owns every enemy and advances them on its own clock.
//!
//! Callers never touch enemies directly. Creation and removal go through an
//! unbounded command queue that only the engine tick drains, and reads go
//! through [`EnemyEngine::snapshot`], which copies state under a short lock.
//!
//! Creation is eventually consistent: `create_*` validates against the lane
//! registry and returns the reserved id at once, but the enemy only shows up
//! in snapshots after the next tick has drained the queue.

use crate::enemy::Enemy;
use crate::scheduler::{SchedulerError, StopOutcome, TickScheduler, Tickable};
use crate::telemetry::EngineTelemetry;
use crate::utils::get_timestamp;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use shared::{Direction, EnemyId, EngineSnapshot, Lane, LaneRegistry};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("lane {0} does not exist")]
    UnknownLane(usize),
    #[error("y {y} is outside lane {lane} range [{min}, {max}]")]
    OutOfRange { lane: usize, y: f32, min: f32, max: f32 },
    #[error("speed must be a finite, non-negative number (got {0})")]
    InvalidSpeed(f32),
    #[error("threshold must be a finite number (got {0})")]
    InvalidThreshold(f32),
    #[error("difficulty multiplier must be greater than 1.0 (got {0})")]
    InvalidMultiplier(f32),
    #[error("enemy {0} already exists")]
    DuplicateId(EnemyId),
    #[error("engine command queue is closed")]
    QueueClosed,
}

#[derive(Debug)]
enum Command {
    Spawn(Enemy),
    Remove(EnemyId),
}

#[derive(Debug)]
struct EngineState {
    enemies: BTreeMap<EnemyId, Enemy>,
    tick: u64,
    difficulty: f32,
    removed_total: u64,
}

impl EngineState {
    fn apply(&mut self, command: Command) -> Result<Option<EnemyId>, EngineError> {
        match command {
            Command::Spawn(enemy) => {
                if self.enemies.contains_key(&enemy.id) {
                    return Err(EngineError::DuplicateId(enemy.id));
                }
                let id = enemy.id;
                self.enemies.insert(id, enemy);
                Ok(Some(id))
            }
            Command::Remove(id) => {
                match self.enemies.get_mut(&id) {
                    Some(enemy) => enemy.mark_removed(),
                    None => debug!("remove for unknown enemy {} ignored", id),
                }
                Ok(None)
            }
        }
    }
}

/// Engine state shared between the public handle and its tick loop.
pub struct EngineCore {
    lanes: RwLock<LaneRegistry>,
    state: Mutex<EngineState>,
    commands_tx: UnboundedSender<Command>,
    commands_rx: Mutex<UnboundedReceiver<Command>>,
    next_id: AtomicU64,
    telemetry: EngineTelemetry,
}

impl EngineCore {
    /// Applies every queued command in arrival order. A failing command is
    /// logged and skipped. Returns how many were skipped.
    fn apply_pending(&self, state: &mut EngineState) -> usize {
        let mut rx = self.commands_rx.lock();
        let mut skipped = 0;
        while let Ok(command) = rx.try_recv() {
            match state.apply(command) {
                Ok(Some(id)) => {
                    self.telemetry.record_created();
                    debug!("enemy {} spawned", id);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("enemy command skipped: {}", e);
                    skipped += 1;
                }
            }
        }
        skipped
    }

    /// One full pipeline step. `scaled` applies the difficulty factor to `dt`.
    fn step(&self, dt: f32, scaled: bool) {
        let started = Instant::now();

        // Drained under the state lock so overlapping steps keep queue order
        let mut state = self.state.lock();
        self.apply_pending(&mut state);

        let dt = if scaled { dt * state.difficulty } else { dt };
        for enemy in state.enemies.values_mut() {
            if enemy.advance(dt) {
                debug!("enemy {} fell past its threshold", enemy.id);
            }
        }

        let before = state.enemies.len();
        state.enemies.retain(|_, enemy| enemy.is_active());
        let purged = (before - state.enemies.len()) as u64;
        state.removed_total += purged;
        state.tick += 1;
        let tick = state.tick;
        drop(state);

        if purged > 0 {
            self.telemetry.record_removed(purged);
        }
        if self.telemetry.record_tick(started.elapsed()) {
            debug!("enemy tick {} overran its period", tick);
        }
    }
}

impl Tickable for EngineCore {
    type Error = EngineError;

    fn name(&self) -> &str {
        "enemy engine"
    }

    fn tick(&self, dt: Duration) -> Result<(), EngineError> {
        self.step(dt.as_secs_f32(), true);
        Ok(())
    }
}

/// Public handle to the enemy engine.
pub struct EnemyEngine {
    core: Arc<EngineCore>,
    scheduler: TickScheduler<EngineCore>,
}

impl EnemyEngine {
    /// Creates an engine with no lanes. `period` is the scheduled tick
    /// interval and `stop_grace` bounds how long `stop` waits.
    pub fn new(period: Duration, stop_grace: Duration) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let core = Arc::new(EngineCore {
            lanes: RwLock::new(LaneRegistry::new()),
            state: Mutex::new(EngineState {
                enemies: BTreeMap::new(),
                tick: 0,
                difficulty: 1.0,
                removed_total: 0,
            }),
            commands_tx,
            commands_rx: Mutex::new(commands_rx),
            next_id: AtomicU64::new(1),
            telemetry: EngineTelemetry::new(period),
        });
        let scheduler = TickScheduler::new(Arc::clone(&core), period, stop_grace);

        Self { core, scheduler }
    }

    pub fn register_lane(&self, lane: Lane) {
        self.core.lanes.write().register(lane);
    }

    /// Queues a patrolling enemy bounded by its lane's range.
    pub fn create_patrol(
        &self,
        lane: usize,
        y: f32,
        base_speed: f32,
        direction: Direction,
    ) -> Result<EnemyId, EngineError> {
        validate_speed(base_speed)?;
        let (min, max) = self.lane_range(lane)?;
        if !(y >= min && y <= max) {
            return Err(EngineError::OutOfRange { lane, y, min, max });
        }

        let id = self.next_id();
        let enemy = Enemy::patrol(id, lane, y, base_speed, direction, (min, max), get_timestamp());
        self.enqueue(Command::Spawn(enemy))?;
        Ok(id)
    }

    /// Queues a falling enemy that leaves once it reaches the bottom of its lane.
    pub fn create_faller(&self, lane: usize, y: f32, base_speed: f32) -> Result<EnemyId, EngineError> {
        let (_, max) = self.lane_range(lane)?;
        self.create_faller_with_threshold(lane, y, base_speed, max)
    }

    pub fn create_faller_with_threshold(
        &self,
        lane: usize,
        y: f32,
        base_speed: f32,
        threshold: f32,
    ) -> Result<EnemyId, EngineError> {
        validate_speed(base_speed)?;
        if !threshold.is_finite() {
            return Err(EngineError::InvalidThreshold(threshold));
        }
        self.lane_range(lane)?;

        let id = self.next_id();
        let enemy = Enemy::faller(id, lane, y, base_speed, threshold, get_timestamp());
        self.enqueue(Command::Spawn(enemy))?;
        Ok(id)
    }

    /// Queues removal. Unknown ids are ignored when the command runs.
    pub fn remove(&self, id: EnemyId) {
        if self.enqueue(Command::Remove(id)).is_err() {
            warn!("could not queue removal of enemy {}", id);
        }
    }

    /// Multiplies the difficulty factor and returns the new value.
    pub fn increase_difficulty(&self, multiplier: f32) -> Result<f32, EngineError> {
        if !(multiplier.is_finite() && multiplier > 1.0) {
            return Err(EngineError::InvalidMultiplier(multiplier));
        }

        let mut state = self.core.state.lock();
        state.difficulty *= multiplier;
        info!("Enemy difficulty raised to {:.3}", state.difficulty);
        Ok(state.difficulty)
    }

    pub fn difficulty(&self) -> f32 {
        self.core.state.lock().difficulty
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let state = self.core.state.lock();
        let enemies: Vec<_> = state.enemies.values().map(Enemy::snapshot).collect();
        let active_count = enemies.iter().filter(|enemy| enemy.is_active()).count();

        EngineSnapshot {
            enemies,
            active_count,
            removed_total: state.removed_total,
            tick: state.tick,
            difficulty: state.difficulty,
            taken_at_ms: get_timestamp(),
        }
    }

    /// Runs one step with `dt` used as-is, ignoring the difficulty factor.
    pub fn force_tick(&self, dt: f32) {
        self.core.step(dt, false);
    }

    pub fn start(&self) -> Result<bool, SchedulerError> {
        self.scheduler.start()
    }

    pub async fn stop(&self) -> StopOutcome {
        self.scheduler.stop().await
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn period(&self) -> Duration {
        self.scheduler.period()
    }

    pub fn telemetry(&self) -> &EngineTelemetry {
        &self.core.telemetry
    }

    fn next_id(&self) -> EnemyId {
        self.core.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn lane_range(&self, lane: usize) -> Result<(f32, f32), EngineError> {
        self.core
            .lanes
            .read()
            .range_of(lane)
            .ok_or(EngineError::UnknownLane(lane))
    }

    fn enqueue(&self, command: Command) -> Result<(), EngineError> {
        self.core
            .commands_tx
            .send(command)
            .map_err(|_| EngineError::QueueClosed)
    }
}

fn validate_speed(speed: f32) -> Result<(), EngineError> {
    if speed.is_finite() && speed >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidSpeed(speed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::{EnemyKind, Lifecycle};

    fn engine_with_lane() -> EnemyEngine {
        let engine = EnemyEngine::new(Duration::from_millis(100), Duration::from_secs(1));
        engine.register_lane(Lane::new(0, 0.0, 500.0).unwrap());
        engine
    }

    #[test]
    fn test_creation_is_visible_after_next_tick() {
        let engine = engine_with_lane();
        let id = engine
            .create_patrol(0, 250.0, 60.0, Direction::Up)
            .unwrap();

        assert!(engine.snapshot().get(id).is_none());
        engine.force_tick(0.0);

        let snapshot = engine.snapshot();
        let enemy = snapshot.get(id).unwrap();
        assert_eq!(enemy.kind, EnemyKind::Patrol);
        assert_eq!(snapshot.active_count, 1);
        assert_eq!(engine.telemetry().created(), 1);
    }

    #[test]
    fn test_patrol_example() {
        let engine = engine_with_lane();
        let id = engine.create_patrol(0, 250.0, 60.0, Direction::Up).unwrap();

        engine.force_tick(1.0);
        let snapshot = engine.snapshot();
        assert_approx_eq!(snapshot.get(id).unwrap().y, 190.0);

        let mut flipped_at = None;
        for _ in 0..10 {
            engine.force_tick(1.0);
            let snapshot = engine.snapshot();
            let enemy = snapshot.get(id).unwrap();
            assert!(enemy.y >= 0.0);
            if enemy.direction == Direction::Down {
                assert_approx_eq!(enemy.y, 0.0);
                flipped_at = Some(snapshot.tick);
                break;
            }
        }
        // 190 -> 130 -> 70 -> 10 -> 0
        assert_eq!(flipped_at, Some(5));
    }

    #[test]
    fn test_rejects_unknown_lane_and_out_of_range() {
        let engine = engine_with_lane();
        assert_eq!(
            engine.create_patrol(4, 10.0, 60.0, Direction::Up),
            Err(EngineError::UnknownLane(4))
        );
        assert!(matches!(
            engine.create_patrol(0, 501.0, 60.0, Direction::Up),
            Err(EngineError::OutOfRange { .. })
        ));
        assert_eq!(
            engine.create_faller(9, 10.0, 50.0),
            Err(EngineError::UnknownLane(9))
        );
        assert!(matches!(
            engine.create_patrol(0, 10.0, -1.0, Direction::Up),
            Err(EngineError::InvalidSpeed(_))
        ));
    }

    #[test]
    fn test_faller_leaves_at_lane_bottom() {
        let engine = engine_with_lane();
        let id = engine.create_faller(0, 300.0, 100.0).unwrap();

        engine.force_tick(1.0);
        let snapshot = engine.snapshot();
        assert_approx_eq!(snapshot.get(id).unwrap().y, 400.0);

        engine.force_tick(1.0);
        let snapshot = engine.snapshot();
        assert!(snapshot.get(id).is_none());
        assert_eq!(snapshot.removed_total, 1);
        assert_eq!(engine.telemetry().removed(), 1);
    }

    #[test]
    fn test_faller_outside_range_is_accepted() {
        let engine = engine_with_lane();
        let id = engine.create_faller(0, -40.0, 50.0).unwrap();
        engine.force_tick(0.5);
        let snapshot = engine.snapshot();
        assert_approx_eq!(snapshot.get(id).unwrap().y, -15.0);
    }

    #[test]
    fn test_remove_is_deferred_and_idempotent() {
        let engine = engine_with_lane();
        let id = engine.create_patrol(0, 100.0, 60.0, Direction::Down).unwrap();
        engine.force_tick(0.1);

        engine.remove(id);
        engine.remove(id);
        engine.remove(12345);
        assert!(engine.snapshot().get(id).is_some());

        engine.force_tick(0.1);
        let snapshot = engine.snapshot();
        assert!(snapshot.get(id).is_none());
        assert_eq!(snapshot.removed_total, 1);
    }

    #[test]
    fn test_create_then_remove_in_same_batch() {
        let engine = engine_with_lane();
        let id = engine.create_faller(0, 10.0, 50.0).unwrap();
        engine.remove(id);
        engine.force_tick(0.1);

        let snapshot = engine.snapshot();
        assert!(snapshot.enemies.is_empty());
        assert_eq!(snapshot.removed_total, 1);
    }

    #[test]
    fn test_failed_command_does_not_block_the_rest() {
        let engine = engine_with_lane();
        let first = engine.create_patrol(0, 100.0, 60.0, Direction::Down).unwrap();
        let clash = Enemy::patrol(first, 0, 300.0, 60.0, Direction::Up, (0.0, 500.0), 0);
        engine.enqueue(Command::Spawn(clash)).unwrap();
        let second = engine.create_faller(0, 50.0, 10.0).unwrap();
        engine.remove(first);

        {
            let mut state = engine.core.state.lock();
            assert_eq!(engine.core.apply_pending(&mut state), 1);
            let kept = &state.enemies[&first];
            assert_approx_eq!(kept.y, 100.0);
            assert!(!kept.is_active());
            assert!(state.enemies[&second].is_active());
        }

        engine.force_tick(0.0);
        let snapshot = engine.snapshot();
        let ids: Vec<_> = snapshot.enemies.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![second]);
        assert_eq!(snapshot.removed_total, 1);
        assert_eq!(engine.telemetry().created(), 2);
    }

    #[test]
    fn test_overlapping_ticks_keep_command_order() {
        use std::sync::atomic::AtomicBool;
        use std::thread;

        let engine = Arc::new(engine_with_lane());
        let done = Arc::new(AtomicBool::new(false));
        let tickers: Vec<_> = (0..3)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    while !done.load(Ordering::SeqCst) {
                        engine.force_tick(0.0);
                    }
                })
            })
            .collect();

        let pairs = 20_000;
        for _ in 0..pairs {
            let id = engine.create_faller(0, 10.0, 0.0).unwrap();
            engine.remove(id);
        }
        done.store(true, Ordering::SeqCst);
        for ticker in tickers {
            ticker.join().unwrap();
        }

        engine.force_tick(0.0);
        let snapshot = engine.snapshot();
        assert!(snapshot.enemies.is_empty());
        assert_eq!(snapshot.removed_total, pairs);
    }

    #[test]
    fn test_difficulty_compounds() {
        let engine = engine_with_lane();
        engine.increase_difficulty(1.5).unwrap();
        let factor = engine.increase_difficulty(1.2).unwrap();
        assert_approx_eq!(factor, 1.8);

        assert_eq!(
            engine.increase_difficulty(1.0),
            Err(EngineError::InvalidMultiplier(1.0))
        );
        assert!(engine.increase_difficulty(0.5).is_err());
        assert!(engine.increase_difficulty(f32::NAN).is_err());
        assert_approx_eq!(engine.difficulty(), 1.8);
    }

    #[test]
    fn test_force_tick_ignores_difficulty() {
        let engine = engine_with_lane();
        engine.increase_difficulty(2.0).unwrap();
        let id = engine.create_patrol(0, 250.0, 60.0, Direction::Up).unwrap();
        engine.force_tick(1.0);
        let snapshot = engine.snapshot();
        assert_approx_eq!(snapshot.get(id).unwrap().y, 190.0);
    }

    #[test]
    fn test_scheduled_tick_scales_by_difficulty() {
        let engine = engine_with_lane();
        engine.increase_difficulty(2.0).unwrap();
        let id = engine.create_patrol(0, 250.0, 60.0, Direction::Up).unwrap();

        // 60 units/s * 0.1 s * 2.0
        engine.core.tick(Duration::from_millis(100)).unwrap();
        let snapshot = engine.snapshot();
        assert_approx_eq!(snapshot.get(id).unwrap().y, 238.0, 1e-3);
    }

    #[test]
    fn test_ids_are_unique_per_engine() {
        let a = engine_with_lane();
        let b = engine_with_lane();
        let first = a.create_faller(0, 0.0, 1.0).unwrap();
        let second = a.create_faller(0, 0.0, 1.0).unwrap();
        assert_ne!(first, second);
        assert_eq!(b.create_faller(0, 0.0, 1.0).unwrap(), first);
    }

    #[test]
    fn test_snapshot_is_sorted_and_detached() {
        let engine = engine_with_lane();
        for y in [300.0, 100.0, 200.0] {
            engine.create_patrol(0, y, 10.0, Direction::Down).unwrap();
        }
        engine.force_tick(0.0);

        let before = engine.snapshot();
        let ids: Vec<_> = before.enemies.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(before.enemies.iter().all(|e| e.lifecycle == Lifecycle::Active));

        engine.force_tick(1.0);
        assert_approx_eq!(before.enemies[0].y, 300.0);
        let after = engine.snapshot();
        assert_approx_eq!(after.enemies[0].y, 310.0);
    }

    #[tokio::test]
    async fn test_engine_loop_start_stop() {
        let engine = EnemyEngine::new(Duration::from_millis(10), Duration::from_secs(1));
        engine.register_lane(Lane::new(0, 0.0, 500.0).unwrap());
        engine.create_patrol(0, 250.0, 60.0, Direction::Up).unwrap();

        assert!(engine.start().unwrap());
        assert!(!engine.start().unwrap());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(engine.stop().await, StopOutcome::Graceful);

        let snapshot = engine.snapshot();
        assert!(snapshot.tick >= 2);
        assert_eq!(snapshot.active_count, 1);
        assert!(snapshot.enemies[0].y < 250.0);
        assert_eq!(engine.stop().await, StopOutcome::NotRunning);
    }
}
