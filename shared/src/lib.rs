use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

mod lane;
mod view;

pub use lane::{Lane, LaneError, LaneRegistry};
pub use view::{
    CelebrationView, EnemySnapshot, EngineSnapshot, EnemyView, FruitView, GameEvent,
    GameStateView, HitCause, PlayerView,
};

pub type PlayerId = u32;
pub type EnemyId = u64;
pub type FruitId = u32;

pub const TICK_RATE: u32 = 20;
pub const ENEMY_TICK_MS: u64 = 100;

pub const GRAVITY: f32 = 520.0;
pub const JUMP_VELOCITY: f32 = 220.0;
pub const ROPE_JUMP_VELOCITY: f32 = 220.0;
pub const CLIMB_SPEED: f32 = 180.0;
pub const MAX_HORIZONTAL_SPEED: f32 = 1.5;
pub const HORIZONTAL_ACCELERATION: f32 = 12.0;
pub const FRICTION: f32 = 10.0;
pub const AIR_CONTROL: f32 = 0.6;
pub const GRAB_DISTANCE: f32 = 0.35;
pub const GRAB_BUFFER: f32 = 0.30;
pub const LANE_CHANGE_COOLDOWN: f32 = 0.25;
pub const INITIAL_LIVES: u32 = 3;

pub const LANE_COUNT: usize = 8;
pub const LANE_MIN_Y: f32 = 0.0;
pub const LANE_MAX_Y: f32 = 500.0;
pub const CEILING_Y: f32 = 0.0;
pub const GROUND_Y: f32 = 475.0;
pub const WATER_Y: f32 = 485.0;
pub const GROUND_MIN_X: f32 = 0.0;
pub const GROUND_MAX_X: f32 = 2.5;
pub const SPAWN_LANE: usize = 1;
pub const SPAWN_Y: f32 = GROUND_Y;
pub const OBJECTIVE_LANE: usize = 7;
pub const OBJECTIVE_Y: f32 = 60.0;

pub const ENEMY_HIT_RADIUS: f32 = 30.0;
pub const FRUIT_PICKUP_RADIUS: f32 = 24.0;
pub const FRUIT_MIN_SPACING: f32 = 10.0;
pub const FRUIT_POINTS: u32 = 10;
pub const CELEBRATION_SECONDS: f32 = 1.5;
pub const DIFFICULTY_STEP: f32 = 1.10;
pub const RED_ENEMY_SPEED: f32 = 60.0;
pub const BLUE_ENEMY_SPEED: f32 = 50.0;
pub const MAX_PLAYERS: usize = 2;

/// A single button press as delivered by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputAction {
    Left,
    Right,
    Up,
    Down,
    Jump,
    Grab,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized action {0:?}")]
pub struct ActionParseError(pub String);

impl FromStr for InputAction {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = s.trim();
        let parsed = [
            ("LEFT", InputAction::Left),
            ("RIGHT", InputAction::Right),
            ("UP", InputAction::Up),
            ("MOVE_UP", InputAction::Up),
            ("DOWN", InputAction::Down),
            ("MOVE_DOWN", InputAction::Down),
            ("JUMP", InputAction::Jump),
            ("GRAB", InputAction::Grab),
        ]
        .into_iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(action))
        .map(|(_, parsed)| parsed);

        parsed.ok_or_else(|| ActionParseError(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerState {
    Ground,
    OnRope,
    Jumping,
    Dead,
    Celebrating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Facing {
    Left,
    #[default]
    Right,
}

/// Vertical travel direction. Y grows downward, so `Up` decreases `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn sign(self) -> f32 {
        match self {
            Direction::Up => -1.0,
            Direction::Down => 1.0,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnemyKind {
    Patrol,
    Faller,
}

impl fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnemyKind::Patrol => write!(f, "PATROL"),
            EnemyKind::Faller => write!(f, "FALLER"),
        }
    }
}

/// Movement rule of an enemy, chosen once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Behavior {
    /// Oscillates inside `[min, max]`, reversing at either bound.
    Patrol { min: f32, max: f32 },
    /// Moves down until `y >= threshold`, then leaves the board.
    Fall { threshold: f32 },
}

impl Behavior {
    pub fn kind(&self) -> EnemyKind {
        match self {
            Behavior::Patrol { .. } => EnemyKind::Patrol,
            Behavior::Fall { .. } => EnemyKind::Faller,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Lifecycle {
    Active,
    Removed,
}
