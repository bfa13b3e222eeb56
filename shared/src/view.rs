//! Read-only copies of simulation state handed across threads and to the
//! transport layer. Nothing here is mutated after construction.

use crate::{
    Behavior, Direction, EnemyId, EnemyKind, Facing, FruitId, Lifecycle, PlayerId, PlayerState,
};
use serde::{Serialize, Serializer};
use std::fmt;

/// Point-in-time copy of one enemy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnemySnapshot {
    pub id: EnemyId,
    pub kind: EnemyKind,
    pub lane: usize,
    pub y: f32,
    pub base_speed: f32,
    pub direction: Direction,
    pub lifecycle: Lifecycle,
    pub behavior: Behavior,
    pub created_at_ms: u64,
}

impl EnemySnapshot {
    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }
}

/// Point-in-time copy of the whole enemy engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    /// Sorted by id.
    pub enemies: Vec<EnemySnapshot>,
    pub active_count: usize,
    pub removed_total: u64,
    pub tick: u64,
    pub difficulty: f32,
    pub taken_at_ms: u64,
}

impl EngineSnapshot {
    pub fn get(&self, id: EnemyId) -> Option<&EnemySnapshot> {
        self.enemies
            .binary_search_by_key(&id, |enemy| enemy.id)
            .ok()
            .map(|index| &self.enemies[index])
    }

    pub fn active(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.enemies.iter().filter(|enemy| enemy.is_active())
    }
}

/// Why a player lost a life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitCause {
    Enemy(EnemyId),
    /// Left the top of the board.
    Abyss,
    /// Fell below the water line.
    Water,
}

impl fmt::Display for HitCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HitCause::Enemy(id) => write!(f, "{}", id),
            HitCause::Abyss => write!(f, "ABYSS"),
            HitCause::Water => write!(f, "WATER"),
        }
    }
}

// Enemy causes go out as the bare id, hazards as their name.
impl Serialize for HitCause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HitCause::Enemy(id) => serializer.serialize_u64(*id),
            HitCause::Abyss => serializer.serialize_str("ABYSS"),
            HitCause::Water => serializer.serialize_str("WATER"),
        }
    }
}

/// Discrete events raised by a coordinator tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEvent {
    FruitTaken { player_id: PlayerId, points: u32 },
    PlayerHit { player_id: PlayerId, cause: HitCause },
    PlayerEliminated { player_id: PlayerId },
    PlayerWin { player_id: PlayerId },
}

impl GameEvent {
    pub fn player_id(&self) -> PlayerId {
        match self {
            GameEvent::FruitTaken { player_id, .. }
            | GameEvent::PlayerHit { player_id, .. }
            | GameEvent::PlayerEliminated { player_id }
            | GameEvent::PlayerWin { player_id } => *player_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub lane: Option<usize>,
    pub state: PlayerState,
    pub facing: Facing,
    pub lives: u32,
    pub score: u32,
    pub celebrating: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnemyView {
    pub id: EnemyId,
    pub kind: EnemyKind,
    pub lane: usize,
    pub y: f32,
}

impl From<&EnemySnapshot> for EnemyView {
    fn from(snapshot: &EnemySnapshot) -> Self {
        Self {
            id: snapshot.id,
            kind: snapshot.kind,
            lane: snapshot.lane,
            y: snapshot.y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FruitView {
    pub id: FruitId,
    pub lane: usize,
    pub y: f32,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CelebrationView {
    pub pending: bool,
    pub remaining: f32,
}

/// Full game state as pulled by the transport on a state-changed signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameStateView {
    pub tick: u64,
    pub paused: bool,
    pub difficulty: f32,
    pub players: Vec<PlayerView>,
    pub enemies: Vec<EnemyView>,
    pub fruits: Vec<FruitView>,
    pub celebration: CelebrationView,
}
