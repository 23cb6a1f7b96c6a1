use crate::anim::{AnimationState, AnimationStateMachine};
use crate::cash_in::{CashInFlow, CashInSnapshot, CashInState};
use crate::error::EngineError;
use crate::geometry::{intersects, HitBox, Position};
use crate::model::{BackpackItem, DeltaKey, EntityId, ItemCatalog, PetStats, Stat, StatDelta, StepEvent};
use crate::reconcile::StatReconciler;
use crate::registry::{HitRegistry, PositionSnapshot};
use crate::wellbeing::{DecayConfig, WellbeingStore};
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Clone, Debug)]
pub(crate) struct EngineConfig {
    pub(crate) reconcile_delay: Duration,
    pub(crate) hurt_threshold: i32,
    pub(crate) creature_hit_box: HitBox,
    pub(crate) steps_per_paw_point: u32,
    pub(crate) catalog: ItemCatalog,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reconcile_delay: Duration::from_millis(2200),
            hurt_threshold: 50,
            creature_hit_box: HitBox::default(),
            steps_per_paw_point: 1,
            catalog: ItemCatalog::default(),
        }
    }
}

/// Calls into the surrounding state layer, drained by the host.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Effect {
    ConsumeItem(BackpackItem),
    ResetChangeStats { key: DeltaKey, stats: StatDelta },
    CashInSteps(CashInSnapshot),
    UpdateStepCount(u64),
    UpdateWellbeingStats(StatDelta),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DragTarget {
    Creature,
    Item(String),
}

impl DragTarget {
    pub(crate) fn entity(&self) -> EntityId {
        match self {
            DragTarget::Creature => EntityId::Creature,
            DragTarget::Item(id) => EntityId::Item(id.clone()),
        }
    }
}

/// The interaction scene: stats, timers, geometry and the cash-in modal.
///
/// Single-threaded. The host feeds input, step events and elapsed time, and
/// drains `Effect`s after each call.
pub(crate) struct Engine {
    config: EngineConfig,
    store: WellbeingStore,
    reconciler: StatReconciler,
    registry: HitRegistry,
    animation: AnimationStateMachine,
    cash_in: CashInFlow,
    placed: Vec<BackpackItem>,
    // Eaten items the host's backpack may still list as placed.
    consumed: HashSet<String>,
    steps: u64,
    step_carry: u64,
    drag: Option<DragTarget>,
    scene: Option<CancellationToken>,
    outbox: Vec<Effect>,
}

impl Engine {
    pub(crate) fn new(config: EngineConfig, stats: PetStats, steps: u64) -> Self {
        let animation = AnimationStateMachine::new(stats.health, config.hurt_threshold);
        Self {
            reconciler: StatReconciler::new(config.reconcile_delay),
            store: WellbeingStore::new(stats),
            registry: HitRegistry::new(),
            animation,
            cash_in: CashInFlow::default(),
            placed: Vec::new(),
            consumed: HashSet::new(),
            steps,
            step_carry: 0,
            drag: None,
            scene: None,
            outbox: Vec::new(),
            config,
        }
    }

    /* -----------------------------
       Scene lifecycle
    ------------------------------ */

    /// Mounts the scene and returns its cancellation token. A live scene is
    /// never torn down implicitly, since unmounting drops unsettled deltas.
    pub(crate) fn mount(
        &mut self,
        creature: Position,
        backpack: &[BackpackItem],
    ) -> Result<CancellationToken, EngineError> {
        if self.scene.is_some() {
            return Err(EngineError::AlreadyMounted);
        }
        let token = CancellationToken::new();
        self.scene = Some(token.clone());
        self.registry.register(EntityId::Creature, creature);
        self.set_backpack(backpack);
        info!(entities = self.registry.len(), "scene mounted");
        Ok(token)
    }

    pub(crate) fn is_mounted(&self) -> bool {
        self.scene.is_some()
    }

    /// Token for the step-count subscription; cancelled on unmount.
    pub(crate) fn subscription_token(&self) -> Option<CancellationToken> {
        self.scene.as_ref().map(|t| t.child_token())
    }

    pub(crate) fn unmount(&mut self) {
        let Some(scene) = self.scene.take() else {
            return;
        };
        scene.cancel();
        self.reconciler.cancel_all();
        let dropped = self.store.discard_pending();
        self.registry.clear();
        self.placed.clear();
        self.consumed.clear();
        self.drag = None;
        let _ = self.cash_in.decline();
        self.animation.set_dragging(false);
        self.sync_health();
        info!(dropped_deltas = dropped, "scene unmounted");
    }

    /// Re-syncs mounted items with the backpack. Stored items and items that
    /// disappeared are unmounted; newly placed ones are mounted at their
    /// location. Items already mounted keep their live position. Consumed
    /// items stay out until the backpack stops listing them.
    pub(crate) fn set_backpack(&mut self, backpack: &[BackpackItem]) {
        if self.scene.is_none() {
            return;
        }
        self.consumed.retain(|id| backpack.iter().any(|i| &i.id == id));
        let placed: Vec<BackpackItem> = backpack
            .iter()
            .filter(|i| i.is_placed() && !self.consumed.contains(&i.id))
            .cloned()
            .collect();

        for old in &self.placed {
            if !placed.iter().any(|i| i.id == old.id) {
                self.registry.unregister(&old.entity());
            }
        }
        for item in &placed {
            let id = item.entity();
            if !self.registry.contains(&id) {
                if let Some(location) = item.location {
                    self.registry.register(id, location);
                }
            }
        }
        let drag_lost = match &self.drag {
            Some(DragTarget::Item(id)) => !placed.iter().any(|i| &i.id == id),
            _ => false,
        };
        if drag_lost {
            self.drag = None;
        }
        self.placed = placed;
    }

    pub(crate) fn placed_items(&self) -> &[BackpackItem] {
        &self.placed
    }

    /* -----------------------------
       Drag & collision
    ------------------------------ */

    /// Layout update for a mounted entity.
    pub(crate) fn move_entity(&mut self, id: &EntityId, position: Position) {
        if let Err(e) = self.registry.move_to(id, position) {
            debug!("move ignored: {e}");
        }
    }

    pub(crate) fn position_of(&self, id: &EntityId) -> Option<Position> {
        self.registry.position_of(id).ok()
    }

    pub(crate) fn begin_drag(&mut self, target: DragTarget) {
        if !self.registry.contains(&target.entity()) {
            debug!(entity = %target.entity(), "drag of unmounted entity ignored");
            return;
        }
        if target == DragTarget::Creature {
            self.animation.set_dragging(true);
        }
        self.drag = Some(target);
    }

    pub(crate) fn dragging(&self) -> Option<&DragTarget> {
        self.drag.as_ref()
    }

    /// Completes the gesture: one round of collision checks against a single
    /// snapshot, then the creature stops walking.
    pub(crate) fn end_drag(&mut self) {
        let Some(target) = self.drag.take() else {
            return;
        };
        let snapshot = self.registry.snapshot();
        let candidates: Vec<BackpackItem> = match &target {
            DragTarget::Creature => self.placed.clone(),
            DragTarget::Item(id) => self.placed.iter().filter(|i| &i.id == id).cloned().collect(),
        };
        let hits: Vec<BackpackItem> = candidates
            .into_iter()
            .filter(|item| self.collides(&snapshot, item))
            .collect();
        for item in hits {
            self.consume(item);
        }
        self.animation.set_dragging(false);
        self.sync_health();
    }

    fn collides(&self, snapshot: &PositionSnapshot, item: &BackpackItem) -> bool {
        let positions = snapshot
            .position_of(&EntityId::Creature)
            .and_then(|c| snapshot.position_of(&item.entity()).map(|i| (c, i)));
        match positions {
            Ok((creature, at)) => intersects(creature, &self.config.creature_hit_box, at),
            Err(e) => {
                debug!("no collision: {e}");
                false
            }
        }
    }

    fn consume(&mut self, item: BackpackItem) {
        let Some(scene) = self.scene.clone() else {
            return;
        };
        let effect = match self.config.catalog.effect_of(&item.key) {
            Some(e) => e.clone(),
            None => {
                warn!(kind = %item.key, "no effect registered for item kind");
                StatDelta::new()
            }
        };
        let key = DeltaKey::Item(item.id.clone());
        let generation = self.store.apply_delta(key.clone(), effect);
        self.reconciler.schedule(key, generation, &scene);

        self.registry.unregister(&item.entity());
        self.placed.retain(|i| i.id != item.id);
        self.consumed.insert(item.id.clone());
        info!(id = %item.id, kind = %item.key, "item consumed");
        self.outbox.push(Effect::ConsumeItem(item));
    }

    /* -----------------------------
       Time, steps, decay
    ------------------------------ */

    /// Moves engine time forward and folds in every delta that came due.
    pub(crate) fn advance(&mut self, elapsed: Duration) {
        for due in self.reconciler.advance(elapsed) {
            match self.store.reconcile(&due.key, due.generation) {
                Ok(stats) => {
                    debug!(key = %due.key, "delta reconciled");
                    self.outbox.push(Effect::ResetChangeStats {
                        key: due.key,
                        stats,
                    });
                }
                Err(e) => debug!("skipped: {e}"),
            }
        }
        self.sync_health();
    }

    pub(crate) fn on_step_event(&mut self, event: StepEvent) {
        if self.scene.is_none() {
            debug!("step event after unmount ignored");
            return;
        }
        let value = match event.into_steps() {
            Ok(v) => v,
            Err(e) => {
                warn!("{e}");
                return;
            }
        };
        self.steps = self.steps.saturating_add(value);

        let per = u64::from(self.config.steps_per_paw_point.max(1));
        let total = self.step_carry.saturating_add(value);
        let earned = total / per;
        self.step_carry = total % per;
        if earned > 0 {
            let earned = i32::try_from(earned).unwrap_or(i32::MAX);
            self.store.commit(&StatDelta::new().with(Stat::PawPoints, earned));
        }
        self.outbox.push(Effect::UpdateStepCount(value));
    }

    /// One passive decay step. The host decides whether and how often.
    pub(crate) fn decay_tick(&mut self, config: &DecayConfig) {
        if self.scene.is_none() {
            debug!("decay tick after unmount ignored");
            return;
        }
        let applied = self.store.decay_tick(config);
        if applied.is_empty() {
            return;
        }
        self.sync_health();
        self.outbox.push(Effect::UpdateWellbeingStats(applied));
    }

    /* -----------------------------
       Cash-in
    ------------------------------ */

    pub(crate) fn open_cash_in(&mut self) {
        let snapshot = CashInSnapshot {
            steps: self.steps,
            paw_points: self.store.display().paw_points,
        };
        if let Err(e) = self.cash_in.open(snapshot) {
            debug!("{e}");
        }
    }

    pub(crate) fn decline_cash_in(&mut self) {
        if let Err(e) = self.cash_in.decline() {
            debug!("{e}");
        }
    }

    /// Hands the confirmed balances to the state layer and shows paw points
    /// dropping by the credited amount until the reset reconciles.
    pub(crate) fn accept_cash_in(&mut self) {
        let snapshot = match self.cash_in.accept() {
            Ok(s) => s,
            Err(e) => {
                debug!("{e}");
                return;
            }
        };
        self.outbox.push(Effect::CashInSteps(snapshot));
        self.steps = self.steps.saturating_sub(snapshot.steps);

        let Some(scene) = self.scene.clone() else {
            return;
        };
        // Display drops by exactly what was credited, on top of any reset
        // still in flight.
        let in_flight = self
            .store
            .pending_delta(&DeltaKey::CashIn)
            .map_or(0, |d| d.get(Stat::PawPoints));
        let reset = StatDelta::new().with(
            Stat::PawPoints,
            in_flight.saturating_sub(snapshot.paw_points),
        );
        let generation = self.store.apply_delta(DeltaKey::CashIn, reset);
        self.reconciler.schedule(DeltaKey::CashIn, generation, &scene);
        info!(steps = snapshot.steps, paw_points = snapshot.paw_points, "cashed in");
    }

    pub(crate) fn cash_in_state(&self) -> CashInState {
        self.cash_in.state()
    }

    /* -----------------------------
       Read side
    ------------------------------ */

    pub(crate) fn display_stats(&self) -> PetStats {
        self.store.display()
    }

    pub(crate) fn canonical_stats(&self) -> PetStats {
        self.store.canonical()
    }

    pub(crate) fn pending_delta(&self, key: &DeltaKey) -> Option<&StatDelta> {
        self.store.pending_delta(key)
    }

    pub(crate) fn outstanding_deltas(&self) -> usize {
        self.store.outstanding()
    }

    pub(crate) fn pending_reconciles(&self) -> usize {
        self.reconciler.pending()
    }

    pub(crate) fn animation(&self) -> AnimationState {
        self.animation.state()
    }

    pub(crate) fn steps(&self) -> u64 {
        self.steps
    }

    pub(crate) fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.outbox)
    }

    fn sync_health(&mut self) {
        if let Some(next) = self.animation.set_health(self.store.display().health) {
            debug!(state = ?next, "animation changed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(2200);

    fn stats(mood: i32, hunger: i32, health: i32, paw_points: i32) -> PetStats {
        PetStats {
            mood,
            hunger,
            health,
            paw_points,
        }
    }

    fn config() -> EngineConfig {
        let mut catalog = ItemCatalog::default();
        catalog.insert("treat", StatDelta::new().with(Stat::Mood, 10));
        catalog.insert("tonic", StatDelta::new().with(Stat::Health, 5));
        EngineConfig {
            catalog,
            ..EngineConfig::default()
        }
    }

    // Creature at the origin with the default hit box covers
    // left 50..=145, top 22.5..=167.5.
    fn inside() -> Position {
        Position::new(100.0, 100.0)
    }

    fn outside() -> Position {
        Position::new(300.0, 300.0)
    }

    fn item(id: &str, key: &str, at: Option<Position>) -> BackpackItem {
        BackpackItem {
            id: id.to_string(),
            key: key.to_string(),
            location: at,
        }
    }

    fn mounted(stats: PetStats, backpack: &[BackpackItem]) -> Engine {
        let mut e = Engine::new(config(), stats, 0);
        e.mount(Position::new(0.0, 0.0), backpack).unwrap();
        e
    }

    fn drag_creature(e: &mut Engine) {
        e.begin_drag(DragTarget::Creature);
        e.end_drag();
    }

    #[test]
    fn consuming_item_shows_then_reconciles() {
        let mut e = mounted(stats(50, 50, 80, 0), &[item("t1", "treat", Some(inside()))]);
        drag_creature(&mut e);

        assert_eq!(e.display_stats().mood, 60);
        assert_eq!(e.canonical_stats().mood, 50);
        assert!(e.placed_items().is_empty());

        e.advance(Duration::from_millis(2199));
        assert_eq!(e.canonical_stats().mood, 50);
        e.advance(Duration::from_millis(1));
        assert_eq!(e.canonical_stats(), stats(60, 50, 80, 0));
        assert_eq!(e.display_stats(), e.canonical_stats());
        assert_eq!(e.outstanding_deltas(), 0);

        let effects = e.drain_effects();
        assert_eq!(
            effects,
            vec![
                Effect::ConsumeItem(item("t1", "treat", Some(inside()))),
                Effect::ResetChangeStats {
                    key: DeltaKey::Item("t1".to_string()),
                    stats: StatDelta::new().with(Stat::Mood, 10),
                },
            ]
        );
    }

    #[test]
    fn only_colliding_placed_items_are_consumed() {
        let backpack = [
            item("near", "treat", Some(inside())),
            item("far", "treat", Some(outside())),
            item("stored", "treat", None),
        ];
        let mut e = mounted(stats(50, 50, 80, 0), &backpack);
        drag_creature(&mut e);

        let ids: Vec<_> = e.placed_items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["far"]);
        assert_eq!(e.display_stats().mood, 60);
    }

    #[test]
    fn several_items_in_one_gesture_reconcile_independently() {
        let backpack = [
            item("a", "treat", Some(inside())),
            item("b", "tonic", Some(Position::new(50.0, 22.5))),
        ];
        let mut e = mounted(stats(50, 50, 80, 0), &backpack);
        drag_creature(&mut e);

        assert_eq!(e.display_stats(), stats(60, 50, 85, 0));
        assert_eq!(e.pending_reconciles(), 2);
        e.advance(DELAY);
        assert_eq!(e.canonical_stats(), stats(60, 50, 85, 0));
    }

    #[test]
    fn item_gesture_checks_only_that_item() {
        let backpack = [
            item("dragged", "treat", Some(outside())),
            item("bystander", "tonic", Some(inside())),
        ];
        let mut e = mounted(stats(50, 50, 80, 0), &backpack);

        e.begin_drag(DragTarget::Item("dragged".to_string()));
        assert_eq!(e.animation(), AnimationState::Idle);
        e.move_entity(&EntityId::Item("dragged".to_string()), Position::new(60.0, 30.0));
        e.end_drag();

        let ids: Vec<_> = e.placed_items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["bystander"]);
        assert_eq!(e.display_stats().mood, 60);
        assert_eq!(e.display_stats().health, 80);
    }

    #[test]
    fn consumed_item_cannot_be_consumed_twice() {
        let mut e = mounted(stats(50, 50, 80, 0), &[item("t1", "treat", Some(inside()))]);
        drag_creature(&mut e);
        drag_creature(&mut e);
        assert_eq!(e.display_stats().mood, 60);
        assert_eq!(e.pending_reconciles(), 1);
    }

    #[test]
    fn retrigger_before_reconcile_overwrites() {
        let mut e = mounted(stats(50, 50, 80, 0), &[item("t1", "treat", Some(inside()))]);
        drag_creature(&mut e);
        e.advance(Duration::from_millis(1000));

        // The state layer drops the item, then places it again with a
        // different effect.
        e.config.catalog.insert("treat", StatDelta::new().with(Stat::Mood, 3));
        e.set_backpack(&[]);
        e.set_backpack(&[item("t1", "treat", Some(inside()))]);
        drag_creature(&mut e);
        assert_eq!(e.display_stats().mood, 53);

        // Old deadline passes: the first delta is never applied.
        e.advance(Duration::from_millis(1300));
        assert_eq!(e.canonical_stats().mood, 50);
        assert_eq!(e.display_stats().mood, 53);

        e.advance(Duration::from_millis(900));
        assert_eq!(e.canonical_stats().mood, 53);
        assert_eq!(e.outstanding_deltas(), 0);
    }

    #[test]
    fn stale_backpack_does_not_bring_back_a_consumed_item() {
        let t1 = item("t1", "treat", Some(inside()));
        let mut e = mounted(stats(50, 50, 80, 0), &[t1.clone()]);
        drag_creature(&mut e);

        // Host has not mirrored the ConsumeItem effect yet.
        e.set_backpack(&[t1.clone(), item("t2", "treat", Some(outside()))]);
        let ids: Vec<_> = e.placed_items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["t2"]);
        assert_eq!(e.position_of(&EntityId::Item("t1".to_string())), None);
        drag_creature(&mut e);
        assert_eq!(e.display_stats().mood, 60);
        assert_eq!(e.pending_reconciles(), 1);

        // Once the backpack forgets it, the id may be placed again.
        e.set_backpack(&[]);
        e.set_backpack(&[t1]);
        assert_eq!(e.placed_items().len(), 1);
    }

    #[test]
    fn unknown_item_kind_is_consumed_without_effect() {
        let mut e = mounted(stats(50, 50, 80, 0), &[item("x", "mystery", Some(inside()))]);
        drag_creature(&mut e);
        assert!(e.placed_items().is_empty());
        assert_eq!(e.display_stats(), stats(50, 50, 80, 0));
    }

    #[test]
    fn missing_creature_means_no_collision() {
        let mut e = mounted(stats(50, 50, 80, 0), &[item("t1", "treat", Some(inside()))]);
        e.begin_drag(DragTarget::Item("t1".to_string()));
        e.registry.unregister(&EntityId::Creature);
        e.end_drag();
        assert_eq!(e.placed_items().len(), 1);
        assert_eq!(e.outstanding_deltas(), 0);
    }

    #[test]
    fn animation_follows_drag_and_health() {
        let mut e = mounted(stats(50, 50, 80, 0), &[]);
        assert_eq!(e.animation(), AnimationState::Idle);

        e.begin_drag(DragTarget::Creature);
        assert_eq!(e.animation(), AnimationState::Walk);

        e.store.commit(&StatDelta::new().with(Stat::Health, -40));
        e.advance(Duration::ZERO);
        assert_eq!(e.animation(), AnimationState::Walk);

        e.end_drag();
        assert_eq!(e.animation(), AnimationState::Hurt);
    }

    #[test]
    fn decay_tick_reports_applied_delta() {
        let mut e = mounted(stats(50, 50, 52, 0), &[]);
        e.decay_tick(&DecayConfig {
            health: 3,
            ..DecayConfig::default()
        });
        assert_eq!(e.canonical_stats(), stats(48, 46, 49, 0));
        assert_eq!(e.animation(), AnimationState::Hurt);
        assert_eq!(
            e.drain_effects(),
            vec![Effect::UpdateWellbeingStats(
                StatDelta::new()
                    .with(Stat::Mood, -2)
                    .with(Stat::Hunger, -4)
                    .with(Stat::Health, -3)
            )]
        );
    }

    #[test]
    fn steps_accrue_paw_points() {
        let mut cfg = config();
        cfg.steps_per_paw_point = 10;
        let mut e = Engine::new(cfg, stats(50, 50, 80, 0), 0);
        e.mount(Position::new(0.0, 0.0), &[]).unwrap();

        e.on_step_event(StepEvent::Reading { value: 25 });
        e.on_step_event(StepEvent::Reading { value: 7 });
        assert_eq!(e.steps(), 32);
        assert_eq!(e.canonical_stats().paw_points, 3);
        assert_eq!(
            e.drain_effects(),
            vec![Effect::UpdateStepCount(25), Effect::UpdateStepCount(7)]
        );
    }

    #[test]
    fn sensor_error_changes_nothing() {
        let mut e = mounted(stats(50, 50, 80, 0), &[]);
        e.on_step_event(StepEvent::Reading { value: 40 });
        e.drain_effects();

        e.on_step_event(StepEvent::from_json(r#"{"error":"disconnected"}"#));
        assert_eq!(e.steps(), 40);
        assert_eq!(e.canonical_stats().paw_points, 40);
        assert!(e.drain_effects().is_empty());
    }

    #[test]
    fn cash_in_accept_resets_paw_points_after_delay() {
        let mut e = mounted(stats(50, 50, 80, 120), &[]);
        e.open_cash_in();
        assert_eq!(
            e.cash_in_state(),
            CashInState::Confirming(CashInSnapshot {
                steps: 0,
                paw_points: 120
            })
        );
        e.accept_cash_in();
        assert_eq!(e.cash_in_state(), CashInState::Hidden);
        assert_eq!(e.display_stats().paw_points, 0);
        assert_eq!(e.canonical_stats().paw_points, 120);

        e.advance(DELAY);
        assert_eq!(e.canonical_stats().paw_points, 0);
        assert_eq!(
            e.drain_effects(),
            vec![
                Effect::CashInSteps(CashInSnapshot {
                    steps: 0,
                    paw_points: 120
                }),
                Effect::ResetChangeStats {
                    key: DeltaKey::CashIn,
                    stats: StatDelta::new().with(Stat::PawPoints, -120),
                },
            ]
        );
    }

    #[test]
    fn cash_in_credits_pending_points_exactly_once() {
        let mut cfg = config();
        cfg.catalog.insert("coin", StatDelta::new().with(Stat::PawPoints, 5));
        let mut e = Engine::new(cfg, stats(50, 50, 80, 120), 0);
        e.mount(Position::new(0.0, 0.0), &[item("c1", "coin", Some(inside()))])
            .unwrap();
        drag_creature(&mut e);
        assert_eq!(e.display_stats().paw_points, 125);

        e.open_cash_in();
        e.accept_cash_in();
        let credited: i32 = e
            .drain_effects()
            .into_iter()
            .filter_map(|fx| match fx {
                Effect::CashInSteps(s) => Some(s.paw_points),
                _ => None,
            })
            .sum();
        assert_eq!(credited, 125);
        assert_eq!(e.display_stats().paw_points, 0);

        e.advance(DELAY);
        assert_eq!(e.outstanding_deltas(), 0);
        assert_eq!(credited + e.canonical_stats().paw_points, 125);
    }

    #[test]
    fn cash_in_decline_leaves_paw_points() {
        let mut e = mounted(stats(50, 50, 80, 120), &[]);
        e.open_cash_in();
        e.decline_cash_in();
        e.advance(DELAY);
        assert_eq!(e.cash_in_state(), CashInState::Hidden);
        assert_eq!(e.canonical_stats().paw_points, 120);
        assert!(e.drain_effects().is_empty());
    }

    #[test]
    fn accept_while_hidden_is_a_no_op() {
        let mut e = mounted(stats(50, 50, 80, 120), &[]);
        e.accept_cash_in();
        e.decline_cash_in();
        e.advance(DELAY);
        assert_eq!(e.canonical_stats().paw_points, 120);
        assert!(e.drain_effects().is_empty());
    }

    #[test]
    fn repeated_cash_in_does_not_lose_the_reset() {
        let mut e = mounted(stats(50, 50, 80, 120), &[]);
        e.open_cash_in();
        e.accept_cash_in();
        e.advance(Duration::from_millis(500));
        e.open_cash_in();
        e.accept_cash_in();
        e.advance(DELAY);
        assert_eq!(e.canonical_stats().paw_points, 0);
    }

    #[test]
    fn steps_during_cash_in_survive_the_reset() {
        let mut e = mounted(stats(50, 50, 80, 0), &[]);
        e.on_step_event(StepEvent::Reading { value: 120 });
        e.open_cash_in();
        e.accept_cash_in();
        assert_eq!(e.steps(), 0);

        e.on_step_event(StepEvent::Reading { value: 15 });
        e.advance(DELAY);
        assert_eq!(e.canonical_stats().paw_points, 15);
        assert_eq!(e.steps(), 15);
    }

    #[test]
    fn unmount_cancels_pending_work() {
        let mut e = mounted(stats(50, 50, 80, 0), &[item("t1", "treat", Some(inside()))]);
        let sub = e.subscription_token().unwrap();
        drag_creature(&mut e);
        assert_eq!(e.pending_reconciles(), 1);

        e.unmount();
        assert!(sub.is_cancelled());
        assert!(!e.is_mounted());
        assert_eq!(e.pending_reconciles(), 0);
        assert_eq!(e.display_stats(), stats(50, 50, 80, 0));

        e.advance(DELAY);
        e.on_step_event(StepEvent::Reading { value: 10 });
        e.decay_tick(&DecayConfig::default());
        assert_eq!(e.canonical_stats(), stats(50, 50, 80, 0));
        assert!(e.drain_effects().iter().all(|fx| matches!(fx, Effect::ConsumeItem(_))));
        assert_eq!(e.steps(), 0);
        assert_eq!(e.position_of(&EntityId::Creature), None);
    }

    #[test]
    fn mounting_a_live_scene_is_refused() {
        let mut e = mounted(stats(50, 50, 80, 0), &[item("t1", "treat", Some(inside()))]);
        drag_creature(&mut e);

        assert!(matches!(
            e.mount(Position::new(0.0, 0.0), &[]),
            Err(EngineError::AlreadyMounted)
        ));
        assert_eq!(e.display_stats().mood, 60);
        assert_eq!(e.pending_reconciles(), 1);

        e.unmount();
        assert!(e.mount(Position::new(0.0, 0.0), &[]).is_ok());
    }

    #[test]
    fn backpack_sync_keeps_live_positions() {
        let mut e = mounted(stats(50, 50, 80, 0), &[item("a", "treat", Some(outside()))]);
        let a = EntityId::Item("a".to_string());
        e.move_entity(&a, Position::new(1.0, 1.0));

        e.set_backpack(&[
            item("a", "treat", Some(outside())),
            item("b", "treat", Some(inside())),
        ]);
        assert_eq!(e.position_of(&a), Some(Position::new(1.0, 1.0)));
        assert_eq!(e.placed_items().len(), 2);

        e.set_backpack(&[item("a", "treat", None), item("b", "treat", Some(inside()))]);
        assert_eq!(e.position_of(&a), None);
        assert_eq!(e.placed_items().len(), 1);
    }

    #[test]
    fn stowed_dragged_item_ends_the_drag() {
        let mut e = mounted(stats(50, 50, 80, 0), &[item("a", "treat", Some(inside()))]);
        e.begin_drag(DragTarget::Item("a".to_string()));
        e.set_backpack(&[item("a", "treat", None)]);
        assert_eq!(e.dragging(), None);
        e.end_drag();
        assert_eq!(e.outstanding_deltas(), 0);
    }
}
