//! Tuning values for the simulation, grouped by the component that reads them.
//!
//! Defaults come from the constants in `shared`; the binary overrides a few
//! of them from the command line.

use shared::{
    AIR_CONTROL, BLUE_ENEMY_SPEED, CEILING_Y, CELEBRATION_SECONDS, CLIMB_SPEED, DIFFICULTY_STEP,
    ENEMY_HIT_RADIUS, ENEMY_TICK_MS, FRICTION, FRUIT_MIN_SPACING, FRUIT_PICKUP_RADIUS,
    FRUIT_POINTS, GRAB_BUFFER, GRAB_DISTANCE, GRAVITY, GROUND_MAX_X, GROUND_MIN_X, GROUND_Y,
    HORIZONTAL_ACCELERATION, INITIAL_LIVES, JUMP_VELOCITY, LANE_CHANGE_COOLDOWN, LANE_COUNT,
    LANE_MAX_Y, LANE_MIN_Y, MAX_HORIZONTAL_SPEED, MAX_PLAYERS, OBJECTIVE_LANE, OBJECTIVE_Y,
    RED_ENEMY_SPEED, ROPE_JUMP_VELOCITY, SPAWN_LANE, SPAWN_Y, TICK_RATE, WATER_Y,
};
use std::time::Duration;

/// Per-player physics and input tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerTuning {
    pub gravity: f32,
    pub jump_speed: f32,
    pub rope_jump_speed: f32,
    pub climb_speed: f32,
    /// Lanes per second.
    pub max_speed: f32,
    pub acceleration: f32,
    pub friction: f32,
    /// Multiplier on acceleration and friction while airborne.
    pub air_control: f32,
    /// Horizontal reach, in lanes, for grabbing a rope.
    pub grab_distance: f32,
    /// Seconds a grab request stays armed.
    pub grab_buffer: f32,
    pub lane_change_cooldown: f32,
    pub initial_lives: u32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            jump_speed: JUMP_VELOCITY,
            rope_jump_speed: ROPE_JUMP_VELOCITY,
            climb_speed: CLIMB_SPEED,
            max_speed: MAX_HORIZONTAL_SPEED,
            acceleration: HORIZONTAL_ACCELERATION,
            friction: FRICTION,
            air_control: AIR_CONTROL,
            grab_distance: GRAB_DISTANCE,
            grab_buffer: GRAB_BUFFER,
            lane_change_cooldown: LANE_CHANGE_COOLDOWN,
            initial_lives: INITIAL_LIVES,
        }
    }
}

/// Static geometry of the board.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldLayout {
    pub lane_count: usize,
    pub lane_min_y: f32,
    pub lane_max_y: f32,
    /// Anything above this height falls into the abyss.
    pub ceiling_y: f32,
    pub ground_y: f32,
    pub water_y: f32,
    /// Horizontal extent of the ground platform, in lanes.
    pub ground_min_x: f32,
    pub ground_max_x: f32,
    pub spawn_lane: usize,
    pub spawn_y: f32,
    pub objective_lane: usize,
    pub objective_y: f32,
}

impl WorldLayout {
    pub fn is_over_ground(&self, x: f32) -> bool {
        x >= self.ground_min_x && x <= self.ground_max_x
    }
}

impl Default for WorldLayout {
    fn default() -> Self {
        Self {
            lane_count: LANE_COUNT,
            lane_min_y: LANE_MIN_Y,
            lane_max_y: LANE_MAX_Y,
            ceiling_y: CEILING_Y,
            ground_y: GROUND_Y,
            water_y: WATER_Y,
            ground_min_x: GROUND_MIN_X,
            ground_max_x: GROUND_MAX_X,
            spawn_lane: SPAWN_LANE,
            spawn_y: SPAWN_Y,
            objective_lane: OBJECTIVE_LANE,
            objective_y: OBJECTIVE_Y,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub tick_rate: u32,
    pub enemy_tick: Duration,
    /// Grace period for the coordinator loop on shutdown.
    pub stop_grace: Duration,
    /// Grace period for the enemy loop on shutdown.
    pub engine_stop_grace: Duration,
    pub max_players: usize,
    pub hit_radius: f32,
    pub pickup_radius: f32,
    pub fruit_min_spacing: f32,
    pub fruit_points: u32,
    pub red_enemy_speed: f32,
    pub blue_enemy_speed: f32,
    pub celebration_seconds: f32,
    pub difficulty_step: f32,
    pub player: PlayerTuning,
    pub world: WorldLayout,
}

impl GameConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            enemy_tick: Duration::from_millis(ENEMY_TICK_MS),
            stop_grace: Duration::from_secs(2),
            engine_stop_grace: Duration::from_secs(5),
            max_players: MAX_PLAYERS,
            hit_radius: ENEMY_HIT_RADIUS,
            pickup_radius: FRUIT_PICKUP_RADIUS,
            fruit_min_spacing: FRUIT_MIN_SPACING,
            fruit_points: FRUIT_POINTS,
            red_enemy_speed: RED_ENEMY_SPEED,
            blue_enemy_speed: BLUE_ENEMY_SPEED,
            celebration_seconds: CELEBRATION_SECONDS,
            difficulty_step: DIFFICULTY_STEP,
            player: PlayerTuning::default(),
            world: WorldLayout::default(),
        }
    }
}
