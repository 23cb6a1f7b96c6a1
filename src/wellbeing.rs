use crate::error::EngineError;
use crate::model::{DeltaKey, PetStats, Stat, StatDelta};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Stamp that identifies one particular `apply_delta` call.
pub(crate) type Generation = u64;

/// Passive need decay applied per tick. Off unless the host turns it on.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct DecayConfig {
    pub(crate) enabled: bool,
    pub(crate) interval_ms: u64,
    pub(crate) mood: i32,
    pub(crate) hunger: i32,
    pub(crate) health: i32,
    /// Decay never pushes a stat below this.
    pub(crate) floor: i32,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: 10_000,
            mood: 2,
            hunger: 4,
            health: 1,
            floor: 0,
        }
    }
}

#[derive(Clone, Debug)]
struct PendingDelta {
    delta: StatDelta,
    generation: Generation,
}

/// Canonical stats plus the optimistic deltas currently on display.
///
/// `display()` is always `canonical + Σ pending`. A pending delta leaves the
/// map only through `reconcile` with its own generation, or `discard_pending`.
#[derive(Clone, Debug)]
pub(crate) struct WellbeingStore {
    canonical: PetStats,
    pending: BTreeMap<DeltaKey, PendingDelta>,
    next_generation: Generation,
}

impl WellbeingStore {
    pub(crate) fn new(canonical: PetStats) -> Self {
        Self {
            canonical,
            pending: BTreeMap::new(),
            next_generation: 1,
        }
    }

    pub(crate) fn canonical(&self) -> PetStats {
        self.canonical
    }

    pub(crate) fn display(&self) -> PetStats {
        self.pending
            .values()
            .fold(self.canonical, |acc, p| acc.with(&p.delta))
    }

    /// Records `delta` under `key`, replacing whatever was there.
    pub(crate) fn apply_delta(&mut self, key: DeltaKey, delta: StatDelta) -> Generation {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.pending.insert(key, PendingDelta { delta, generation });
        generation
    }

    pub(crate) fn pending_delta(&self, key: &DeltaKey) -> Option<&StatDelta> {
        self.pending.get(key).map(|p| &p.delta)
    }

    pub(crate) fn outstanding(&self) -> usize {
        self.pending.len()
    }

    /// Folds the delta recorded by `generation` into canonical stats and
    /// returns it. Fails if the key was cleared or re-applied since.
    pub(crate) fn reconcile(
        &mut self,
        key: &DeltaKey,
        generation: Generation,
    ) -> Result<StatDelta, EngineError> {
        match self.pending.entry(key.clone()) {
            Entry::Occupied(e) if e.get().generation == generation => {
                let p = e.remove();
                self.canonical.apply(&p.delta);
                Ok(p.delta)
            }
            _ => Err(EngineError::StaleReconciliation { key: key.clone() }),
        }
    }

    /// Changes that are final the moment they happen (step accrual).
    pub(crate) fn commit(&mut self, delta: &StatDelta) {
        self.canonical.apply(delta);
    }

    /// Applies one decay step to canonical stats and returns what was
    /// actually subtracted after flooring.
    pub(crate) fn decay_tick(&mut self, config: &DecayConfig) -> StatDelta {
        let mut applied = StatDelta::new();
        for (stat, amount) in [
            (Stat::Mood, config.mood),
            (Stat::Hunger, config.hunger),
            (Stat::Health, config.health),
        ] {
            let current = self.canonical.get(stat);
            let target = current.saturating_sub(amount).max(config.floor.min(current));
            if target != current {
                applied.add(stat, target - current);
            }
        }
        self.canonical.apply(&applied);
        applied
    }

    /// Drops every optimistic delta without committing it.
    pub(crate) fn discard_pending(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }
}
