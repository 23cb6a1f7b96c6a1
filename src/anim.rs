/// Sprite-sheet rows of the creature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AnimationState {
    Idle,
    Walk,
    // Reserved: no trigger leads here yet.
    #[allow(dead_code)]
    Jump,
    Hurt,
}

impl AnimationState {
    pub(crate) fn sprite_row(self) -> usize {
        match self {
            AnimationState::Idle => 0,
            AnimationState::Walk => 1,
            AnimationState::Jump => 2,
            AnimationState::Hurt => 3,
        }
    }
}

/// Dragging always wins; otherwise health above `hurt_threshold` idles.
pub(crate) fn derive_animation(dragging: bool, health: i32, hurt_threshold: i32) -> AnimationState {
    if dragging {
        AnimationState::Walk
    } else if health > hurt_threshold {
        AnimationState::Idle
    } else {
        AnimationState::Hurt
    }
}

#[derive(Clone, Debug)]
pub(crate) struct AnimationStateMachine {
    dragging: bool,
    health: i32,
    hurt_threshold: i32,
    state: AnimationState,
}

impl AnimationStateMachine {
    pub(crate) fn new(health: i32, hurt_threshold: i32) -> Self {
        Self {
            dragging: false,
            health,
            hurt_threshold,
            state: derive_animation(false, health, hurt_threshold),
        }
    }

    pub(crate) fn state(&self) -> AnimationState {
        self.state
    }

    /// Returns the new state when it changed.
    pub(crate) fn set_dragging(&mut self, dragging: bool) -> Option<AnimationState> {
        self.dragging = dragging;
        self.recompute()
    }

    pub(crate) fn set_health(&mut self, health: i32) -> Option<AnimationState> {
        self.health = health;
        self.recompute()
    }

    fn recompute(&mut self) -> Option<AnimationState> {
        let next = derive_animation(self.dragging, self.health, self.hurt_threshold);
        if next == self.state {
            return None;
        }
        self.state = next;
        Some(next)
    }
}
