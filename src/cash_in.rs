use crate::error::EngineError;

/// Balances shown to the player when the confirmation opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CashInSnapshot {
    pub(crate) steps: u64,
    pub(crate) paw_points: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CashInState {
    Hidden,
    Confirming(CashInSnapshot),
}

impl CashInState {
    fn name(&self) -> &'static str {
        match self {
            CashInState::Hidden => "hidden",
            CashInState::Confirming(_) => "confirming",
        }
    }
}

/// Modal that asks the player to confirm converting steps.
#[derive(Clone, Debug)]
pub(crate) struct CashInFlow {
    state: CashInState,
}

impl Default for CashInFlow {
    fn default() -> Self {
        Self {
            state: CashInState::Hidden,
        }
    }
}

impl CashInFlow {
    pub(crate) fn state(&self) -> CashInState {
        self.state
    }

    pub(crate) fn open(&mut self, snapshot: CashInSnapshot) -> Result<(), EngineError> {
        match self.state {
            CashInState::Hidden => {
                self.state = CashInState::Confirming(snapshot);
                Ok(())
            }
            CashInState::Confirming(_) => Err(self.invalid("open")),
        }
    }

    pub(crate) fn decline(&mut self) -> Result<(), EngineError> {
        match self.state {
            CashInState::Confirming(_) => {
                self.state = CashInState::Hidden;
                Ok(())
            }
            CashInState::Hidden => Err(self.invalid("decline")),
        }
    }

    /// Closes the modal and hands back what the player agreed to.
    pub(crate) fn accept(&mut self) -> Result<CashInSnapshot, EngineError> {
        match self.state {
            CashInState::Confirming(snapshot) => {
                self.state = CashInState::Hidden;
                Ok(snapshot)
            }
            CashInState::Hidden => Err(self.invalid("accept")),
        }
    }

    fn invalid(&self, action: &'static str) -> EngineError {
        EngineError::InvalidTransition {
            from: self.state.name(),
            action,
        }
    }
}
