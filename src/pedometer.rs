//! Stand-in for the platform step counter. Emits the same JSON payloads a
//! native bridge would, on a fixed interval, until its token is cancelled.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const MAX_STEPS_PER_READING: u64 = 40;
const DROPOUT_CHANCE: f64 = 0.05;

pub(crate) struct Pedometer {
    rng: StdRng,
}

impl Pedometer {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Next raw payload, occasionally a dropout.
    pub(crate) fn next_payload(&mut self) -> String {
        if self.rng.gen_bool(DROPOUT_CHANCE) {
            return serde_json::json!({ "error": "disconnected" }).to_string();
        }
        let value = self.rng.gen_range(0..=MAX_STEPS_PER_READING);
        serde_json::json!({ "value": value }).to_string()
    }
}

/// Subscribes: payloads go to `tx` until `token` is cancelled or the
/// receiver is dropped.
pub(crate) fn spawn(
    tx: mpsc::Sender<String>,
    every: Duration,
    seed: u64,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut pedometer = Pedometer::new(seed);
        let mut t = tokio::time::interval(every);
        t.tick().await;
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("pedometer subscription cancelled");
                    break;
                }
                _ = t.tick() => {
                    if tx.send(pedometer.next_payload()).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}
