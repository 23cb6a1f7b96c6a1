use serde::{Deserialize, Serialize};

/// Top-left anchor of an entity in scene coordinates.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct Position {
    pub(crate) left: f32,
    pub(crate) top: f32,
}

impl Position {
    pub(crate) fn new(left: f32, top: f32) -> Self {
        Self { left, top }
    }

    pub(crate) fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.left + dx, self.top + dy)
    }
}

/// Collidable rectangle, as offsets from the owning entity's position.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct HitBox {
    pub(crate) left: f32,
    pub(crate) top: f32,
    pub(crate) width: f32,
    pub(crate) height: f32,
}

impl Default for HitBox {
    fn default() -> Self {
        // Body of a 210x185 sprite tile.
        Self {
            left: 50.0,
            top: 22.5,
            width: 95.0,
            height: 145.0,
        }
    }
}

/// Whether `item`'s anchor lies inside `hit_box` placed at `creature`.
/// All four bounds are inclusive.
pub(crate) fn intersects(creature: Position, hit_box: &HitBox, item: Position) -> bool {
    let left = creature.left + hit_box.left;
    let top = creature.top + hit_box.top;
    let right = left + hit_box.width;
    let bottom = top + hit_box.height;

    item.top >= top && item.top <= bottom && item.left >= left && item.left <= right
}
