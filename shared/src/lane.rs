use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LaneError {
    #[error("lane {index}: min ({min}) must be below max ({max})")]
    InvalidRange { index: usize, min: f32, max: f32 },
}

/// A vertical track with an inclusive height range. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    id: String,
    index: usize,
    min: f32,
    max: f32,
}

impl Lane {
    pub fn new(index: usize, min: f32, max: f32) -> Result<Self, LaneError> {
        // Written so NaN bounds fail too
        if !(min < max) {
            return Err(LaneError::InvalidRange { index, min, max });
        }

        Ok(Self {
            id: format!("L_{}", index),
            index,
            min,
            max,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn contains_y(&self, y: f32) -> bool {
        y >= self.min && y <= self.max
    }

    pub fn clamp_y(&self, y: f32) -> f32 {
        y.clamp(self.min, self.max)
    }
}

/// Static lane geometry keyed by lane index.
///
/// Lookups on unknown indices never fail loudly: callers that care check
/// [`LaneRegistry::contains`] first.
#[derive(Debug, Clone, Default)]
pub struct LaneRegistry {
    lanes: BTreeMap<usize, Lane>,
}

impl LaneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds `count` lanes indexed `0..count`, all sharing one height range.
    pub fn uniform(count: usize, min: f32, max: f32) -> Result<Self, LaneError> {
        let mut registry = Self::new();
        for index in 0..count {
            registry.register(Lane::new(index, min, max)?);
        }
        Ok(registry)
    }

    /// Registers a lane, replacing any lane already stored under its index.
    pub fn register(&mut self, lane: Lane) {
        self.lanes.insert(lane.index(), lane);
    }

    pub fn contains(&self, index: usize) -> bool {
        self.lanes.contains_key(&index)
    }

    pub fn get(&self, index: usize) -> Option<&Lane> {
        self.lanes.get(&index)
    }

    pub fn range_of(&self, index: usize) -> Option<(f32, f32)> {
        self.lanes.get(&index).map(|lane| (lane.min(), lane.max()))
    }

    pub fn is_within_range(&self, index: usize, y: f32) -> bool {
        self.lanes
            .get(&index)
            .map_or(false, |lane| lane.contains_y(y))
    }

    /// Clamps `y` into the lane's range; unknown lanes leave `y` untouched.
    pub fn clamp(&self, index: usize, y: f32) -> f32 {
        self.lanes.get(&index).map_or(y, |lane| lane.clamp_y(y))
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Highest registered index, used as the right edge of the world.
    pub fn last_index(&self) -> Option<usize> {
        self.lanes.keys().next_back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }
}
