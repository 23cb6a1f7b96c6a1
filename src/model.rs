use crate::error::EngineError;
use crate::geometry::Position;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub(crate) enum Stat {
    Mood,
    Hunger,
    Health,
    PawPoints,
}

impl Stat {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Stat::Mood => "Mood",
            Stat::Hunger => "Hunger",
            Stat::Health => "Health",
            Stat::PawPoints => "Paw points",
        }
    }
}

/// Wellbeing attributes of the pet. Values are not clamped here; callers that
/// need a floor (decay) apply it themselves.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PetStats {
    pub(crate) mood: i32,
    pub(crate) hunger: i32,
    pub(crate) health: i32,
    pub(crate) paw_points: i32,
}

impl Default for PetStats {
    fn default() -> Self {
        Self {
            mood: 70,
            hunger: 70,
            health: 80,
            paw_points: 0,
        }
    }
}

impl PetStats {
    pub(crate) fn get(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Mood => self.mood,
            Stat::Hunger => self.hunger,
            Stat::Health => self.health,
            Stat::PawPoints => self.paw_points,
        }
    }

    fn get_mut(&mut self, stat: Stat) -> &mut i32 {
        match stat {
            Stat::Mood => &mut self.mood,
            Stat::Hunger => &mut self.hunger,
            Stat::Health => &mut self.health,
            Stat::PawPoints => &mut self.paw_points,
        }
    }

    pub(crate) fn apply(&mut self, delta: &StatDelta) {
        for (stat, change) in delta.iter() {
            let v = self.get_mut(stat);
            *v = v.saturating_add(change);
        }
    }

    pub(crate) fn with(mut self, delta: &StatDelta) -> Self {
        self.apply(delta);
        self
    }
}

/// Signed per-stat change. Stats absent from the map are unchanged.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub(crate) struct StatDelta(BTreeMap<Stat, i32>);

impl StatDelta {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(mut self, stat: Stat, change: i32) -> Self {
        self.add(stat, change);
        self
    }

    pub(crate) fn add(&mut self, stat: Stat, change: i32) {
        let v = self.0.entry(stat).or_insert(0);
        *v = v.saturating_add(change);
    }

    pub(crate) fn get(&self, stat: Stat) -> i32 {
        self.0.get(&stat).copied().unwrap_or(0)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Stat, i32)> + '_ {
        self.0.iter().map(|(s, v)| (*s, *v))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.values().all(|v| *v == 0)
    }
}

/// Identity under which an optimistic delta is tracked.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub(crate) enum DeltaKey {
    Item(String),
    CashIn,
}

impl fmt::Display for DeltaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaKey::Item(id) => write!(f, "item:{id}"),
            DeltaKey::CashIn => f.write_str("cash-in"),
        }
    }
}

/// Anything with a position in the interaction scene.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum EntityId {
    Creature,
    Item(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Creature => f.write_str("creature"),
            EntityId::Item(id) => write!(f, "item:{id}"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct BackpackItem {
    pub(crate) id: String,
    /// Merchandise kind, used to look up the item's effect.
    pub(crate) key: String,
    /// `None` while the item is stored in the backpack.
    pub(crate) location: Option<Position>,
}

impl BackpackItem {
    pub(crate) fn is_placed(&self) -> bool {
        self.location.is_some()
    }

    pub(crate) fn entity(&self) -> EntityId {
        EntityId::Item(self.id.clone())
    }
}

/// Effect table for consumable merchandise, keyed by item kind.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub(crate) struct ItemCatalog(BTreeMap<String, StatDelta>);

impl Default for ItemCatalog {
    fn default() -> Self {
        let mut items = BTreeMap::new();
        items.insert(
            "apple".to_string(),
            StatDelta::new().with(Stat::Hunger, 15).with(Stat::Health, 2),
        );
        items.insert(
            "bone".to_string(),
            StatDelta::new().with(Stat::Mood, 10).with(Stat::Hunger, 5),
        );
        items.insert(
            "ball".to_string(),
            StatDelta::new().with(Stat::Mood, 12).with(Stat::Hunger, -3),
        );
        items.insert(
            "medicine".to_string(),
            StatDelta::new().with(Stat::Health, 20).with(Stat::Mood, -5),
        );
        Self(items)
    }
}

impl ItemCatalog {
    pub(crate) fn effect_of(&self, key: &str) -> Option<&StatDelta> {
        self.0.get(key)
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, key: &str, effect: StatDelta) {
        self.0.insert(key.to_string(), effect);
    }
}

/// Payload from the step sensor: `{"value": n}` or `{"error": "..."}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub(crate) enum StepEvent {
    Reading { value: u64 },
    Failure { error: String },
}

impl StepEvent {
    /// Unreadable payloads become a `Failure` so they take the sensor-error path.
    pub(crate) fn from_json(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|e| StepEvent::Failure {
            error: format!("malformed step event: {e}"),
        })
    }

    pub(crate) fn into_steps(self) -> Result<u64, EngineError> {
        match self {
            StepEvent::Reading { value } => Ok(value),
            StepEvent::Failure { error } => Err(EngineError::Sensor(error)),
        }
    }
}
