use crate::model::DeltaKey;
use crate::wellbeing::Generation;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A reconciliation that came due.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DueReconcile {
    pub(crate) key: DeltaKey,
    pub(crate) generation: Generation,
}

struct Entry {
    due: Duration,
    seq: u64,
    task: DueReconcile,
    token: CancellationToken,
}

/// Deferred merges of display deltas, driven by an explicit clock.
///
/// Each task carries a child of the scene's cancellation token, so tearing
/// the scene down cancels every pending task. Scheduling a key again cancels
/// the task it supersedes.
pub(crate) struct StatReconciler {
    delay: Duration,
    now: Duration,
    next_seq: u64,
    entries: Vec<Entry>,
    latest: HashMap<DeltaKey, (u64, CancellationToken)>,
}

impl StatReconciler {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            now: Duration::ZERO,
            next_seq: 0,
            entries: Vec::new(),
            latest: HashMap::new(),
        }
    }

    /// Schedules `key` to reconcile after the configured delay.
    pub(crate) fn schedule(
        &mut self,
        key: DeltaKey,
        generation: Generation,
        scene: &CancellationToken,
    ) -> CancellationToken {
        self.schedule_in(key, generation, self.delay, scene)
    }

    pub(crate) fn schedule_in(
        &mut self,
        key: DeltaKey,
        generation: Generation,
        delay: Duration,
        scene: &CancellationToken,
    ) -> CancellationToken {
        let token = scene.child_token();
        let seq = self.next_seq;
        self.next_seq += 1;

        if let Some((_, superseded)) = self.latest.insert(key.clone(), (seq, token.clone())) {
            superseded.cancel();
        }
        self.entries.push(Entry {
            due: self.now + delay,
            seq,
            task: DueReconcile { key, generation },
            token: token.clone(),
        });
        token
    }

    /// Moves the clock forward and returns tasks that came due, earliest
    /// first, ties in scheduling order. Cancelled tasks are dropped.
    pub(crate) fn advance(&mut self, elapsed: Duration) -> Vec<DueReconcile> {
        self.now = self.now.saturating_add(elapsed);
        let now = self.now;

        let (mut due, rest): (Vec<Entry>, Vec<Entry>) = std::mem::take(&mut self.entries)
            .into_iter()
            .filter(|e| !e.token.is_cancelled())
            .partition(|e| e.due <= now);
        self.entries = rest;

        due.sort_by_key(|e| (e.due, e.seq));
        due.into_iter()
            .map(|e| {
                if self.latest.get(&e.task.key).map(|(s, _)| *s) == Some(e.seq) {
                    self.latest.remove(&e.task.key);
                }
                e.task
            })
            .collect()
    }

    /// Live tasks not yet fired.
    pub(crate) fn pending(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| !e.token.is_cancelled())
            .count()
    }

    pub(crate) fn cancel_all(&mut self) {
        for e in self.entries.drain(..) {
            e.token.cancel();
        }
        self.latest.clear();
    }
}
