use crate::model::{DeltaKey, EntityId};
use thiserror::Error;

/// Conditions the engine absorbs locally. Only `AlreadyMounted` reaches the
/// host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum EngineError {
    /// Collision or move against an entity that is not mounted.
    #[error("entity {0} is not registered in the scene")]
    EntityNotFound(EntityId),
    /// A reconciliation fired for a delta that was replaced or cleared.
    #[error("stale reconciliation for {key}")]
    StaleReconciliation { key: DeltaKey },
    /// Cash-in action that does not apply to the current modal state.
    #[error("cannot {action} while cash-in is {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
    /// The step sensor reported an error or sent an unreadable payload.
    #[error("step sensor: {0}")]
    Sensor(String),
    /// `mount` on a live scene; the host must unmount (and save) first.
    #[error("scene is already mounted")]
    AlreadyMounted,
}
