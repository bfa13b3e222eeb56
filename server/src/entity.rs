use shared::EnemySnapshot;

// Anything that lives on a lane and can touch something else on it
pub trait Entity {
    type Id: Copy;

    fn id(&self) -> Self::Id;

    /// Lane the entity currently occupies, if it is on one.
    fn lane(&self) -> Option<usize>;

    fn y(&self) -> f32;

    // Same lane and vertically within `radius` (inclusive)
    fn is_near<E: Entity + ?Sized>(&self, other: &E, radius: f32) -> bool {
        match (self.lane(), other.lane()) {
            (Some(a), Some(b)) if a == b => (self.y() - other.y()).abs() <= radius,
            _ => false,
        }
    }
}

impl Entity for EnemySnapshot {
    type Id = shared::EnemyId;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn lane(&self) -> Option<usize> {
        Some(self.lane)
    }

    fn y(&self) -> f32 {
        self.y
    }
}
