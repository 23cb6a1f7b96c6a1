use crate::error::EngineError;
use crate::geometry::Position;
use crate::model::EntityId;
use std::collections::HashMap;

/// Live positions of every mounted entity, fed by whichever layer does layout.
#[derive(Clone, Debug, Default)]
pub(crate) struct HitRegistry {
    positions: HashMap<EntityId, Position>,
}

impl HitRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Mounts `id`, or refreshes it if already mounted.
    pub(crate) fn register(&mut self, id: EntityId, position: Position) {
        self.positions.insert(id, position);
    }

    pub(crate) fn unregister(&mut self, id: &EntityId) -> bool {
        self.positions.remove(id).is_some()
    }

    /// Moves an entity that is already mounted. Moving an unmounted entity
    /// does not mount it.
    pub(crate) fn move_to(&mut self, id: &EntityId, position: Position) -> Result<(), EngineError> {
        match self.positions.get_mut(id) {
            Some(p) => {
                *p = position;
                Ok(())
            }
            None => Err(EngineError::EntityNotFound(id.clone())),
        }
    }

    pub(crate) fn position_of(&self, id: &EntityId) -> Result<Position, EngineError> {
        lookup(&self.positions, id)
    }

    pub(crate) fn contains(&self, id: &EntityId) -> bool {
        self.positions.contains_key(id)
    }

    /// Frozen copy used for one round of collision checks.
    pub(crate) fn snapshot(&self) -> PositionSnapshot {
        PositionSnapshot {
            positions: self.positions.clone(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.positions.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.positions.len()
    }
}

pub(crate) struct PositionSnapshot {
    positions: HashMap<EntityId, Position>,
}

impl PositionSnapshot {
    pub(crate) fn position_of(&self, id: &EntityId) -> Result<Position, EngineError> {
        lookup(&self.positions, id)
    }
}

fn lookup(positions: &HashMap<EntityId, Position>, id: &EntityId) -> Result<Position, EngineError> {
    positions
        .get(id)
        .copied()
        .ok_or_else(|| EngineError::EntityNotFound(id.clone()))
}
