//! Crocodile entities and their per-tick movement rules.

use crate::entity::Entity;
use shared::{Behavior, Direction, EnemyId, EnemyKind, EnemySnapshot, Lifecycle};

/// One enemy as owned by the engine. Only the engine tick mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct Enemy {
    pub id: EnemyId,
    pub lane: usize,
    pub y: f32,
    pub base_speed: f32,
    pub direction: Direction,
    pub lifecycle: Lifecycle,
    pub behavior: Behavior,
    pub created_at_ms: u64,
}

impl Enemy {
    pub fn patrol(
        id: EnemyId,
        lane: usize,
        y: f32,
        base_speed: f32,
        direction: Direction,
        bounds: (f32, f32),
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            lane,
            y,
            base_speed,
            direction,
            lifecycle: Lifecycle::Active,
            behavior: Behavior::Patrol {
                min: bounds.0,
                max: bounds.1,
            },
            created_at_ms,
        }
    }

    /// Fallers always travel down (increasing `y`).
    pub fn faller(
        id: EnemyId,
        lane: usize,
        y: f32,
        base_speed: f32,
        threshold: f32,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            lane,
            y,
            base_speed,
            direction: Direction::Down,
            lifecycle: Lifecycle::Active,
            behavior: Behavior::Fall { threshold },
            created_at_ms,
        }
    }

    pub fn kind(&self) -> EnemyKind {
        self.behavior.kind()
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    pub fn mark_removed(&mut self) {
        self.lifecycle = Lifecycle::Removed;
    }

    /// Moves the enemy by `base_speed * dt`. Returns true when this call
    /// retired the enemy.
    pub fn advance(&mut self, dt: f32) -> bool {
        if !self.is_active() {
            return false;
        }

        let step = self.base_speed * dt;
        match self.behavior {
            Behavior::Patrol { min, max } => {
                let next = self.y + self.direction.sign() * step;
                let bound = match self.direction {
                    Direction::Up => min,
                    Direction::Down => max,
                };
                // Only a real move onto or past the bound it heads for turns it
                let reached = step > 0.0 && (next - bound) * self.direction.sign() >= 0.0;
                if reached {
                    self.y = bound;
                    self.direction = self.direction.reversed();
                } else {
                    self.y = next.clamp(min, max);
                }
                false
            }
            Behavior::Fall { threshold } => {
                let next = self.y + step;
                if next >= threshold {
                    self.y = threshold.max(self.y);
                    self.lifecycle = Lifecycle::Removed;
                    true
                } else {
                    self.y = next;
                    false
                }
            }
        }
    }

    pub fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            kind: self.kind(),
            lane: self.lane,
            y: self.y,
            base_speed: self.base_speed,
            direction: self.direction,
            lifecycle: self.lifecycle,
            behavior: self.behavior,
            created_at_ms: self.created_at_ms,
        }
    }
}

impl Entity for Enemy {
    type Id = EnemyId;

    fn id(&self) -> EnemyId {
        self.id
    }

    fn lane(&self) -> Option<usize> {
        Some(self.lane)
    }

    fn y(&self) -> f32 {
        self.y
    }
}
