use std::sync::Arc;

use log::{debug, info};
use types::phase0::{containers::Checkpoint, primitives::Slot};

use crate::{
    error::Error,
    misc::{CheckpointWithHex, JustifiedBalances},
};

/// Current slot and checkpoints as seen by fork choice.
///
/// Checkpoints are replaced wholesale. Balances are replaced together with the checkpoint they
/// belong to.
#[derive(Clone, Debug)]
pub struct ForkChoiceStore {
    current_slot: Slot,
    justified: CheckpointWithHex,
    justified_balances: JustifiedBalances,
    finalized: CheckpointWithHex,
    best_justified: CheckpointWithHex,
    best_justified_balances: JustifiedBalances,
}

impl ForkChoiceStore {
    #[must_use]
    pub fn new(
        current_slot: Slot,
        justified: Checkpoint,
        finalized: Checkpoint,
        justified_balances: JustifiedBalances,
    ) -> Self {
        Self {
            current_slot,
            justified: justified.into(),
            justified_balances: Arc::clone(&justified_balances),
            finalized: finalized.into(),
            best_justified: justified.into(),
            best_justified_balances: justified_balances,
        }
    }

    /// Rebuilds a store from its parts without logging any changes.
    #[must_use]
    pub fn from_parts(
        current_slot: Slot,
        justified: (Checkpoint, JustifiedBalances),
        finalized: Checkpoint,
        best_justified: (Checkpoint, JustifiedBalances),
    ) -> Self {
        let (justified, justified_balances) = justified;
        let (best_justified, best_justified_balances) = best_justified;

        Self {
            current_slot,
            justified: justified.into(),
            justified_balances,
            finalized: finalized.into(),
            best_justified: best_justified.into(),
            best_justified_balances,
        }
    }

    #[must_use]
    pub const fn current_slot(&self) -> Slot {
        self.current_slot
    }

    pub fn set_current_slot(&mut self, current_slot: Slot) {
        self.current_slot = current_slot;
    }

    #[must_use]
    pub const fn justified_checkpoint(&self) -> &CheckpointWithHex {
        &self.justified
    }

    #[must_use]
    pub const fn finalized_checkpoint(&self) -> &CheckpointWithHex {
        &self.finalized
    }

    #[must_use]
    pub const fn best_justified_checkpoint(&self) -> &CheckpointWithHex {
        &self.best_justified
    }

    #[must_use]
    pub const fn justified_balances(&self) -> &JustifiedBalances {
        &self.justified_balances
    }

    #[must_use]
    pub const fn best_justified_balances(&self) -> &JustifiedBalances {
        &self.best_justified_balances
    }

    /// Returns the replaced checkpoint.
    pub fn set_justified(
        &mut self,
        checkpoint: Checkpoint,
        balances: JustifiedBalances,
    ) -> CheckpointWithHex {
        let new = CheckpointWithHex::from(checkpoint);

        info!(
            "justified checkpoint updated (epoch: {}, root: {}, previous epoch: {})",
            new.epoch(),
            new.root_hex(),
            self.justified.epoch(),
        );

        self.justified_balances = balances;
        core::mem::replace(&mut self.justified, new)
    }

    /// Returns the replaced checkpoint.
    ///
    /// Finalization is irreversible, so a checkpoint with a lower epoch is rejected.
    pub fn set_finalized(&mut self, checkpoint: Checkpoint) -> Result<CheckpointWithHex, Error> {
        if checkpoint.epoch < self.finalized.epoch() {
            return Err(Error::FinalizedCheckpointRegression {
                current: self.finalized.checkpoint(),
                new: checkpoint,
            });
        }

        let new = CheckpointWithHex::from(checkpoint);

        info!(
            "finalized checkpoint updated (epoch: {}, root: {}, previous epoch: {})",
            new.epoch(),
            new.root_hex(),
            self.finalized.epoch(),
        );

        Ok(core::mem::replace(&mut self.finalized, new))
    }

    /// Returns the replaced checkpoint.
    pub fn set_best_justified(
        &mut self,
        checkpoint: Checkpoint,
        balances: JustifiedBalances,
    ) -> CheckpointWithHex {
        let new = CheckpointWithHex::from(checkpoint);

        debug!(
            "best justified checkpoint updated (epoch: {}, root: {})",
            new.epoch(),
            new.root_hex(),
        );

        self.best_justified_balances = balances;
        core::mem::replace(&mut self.best_justified, new)
    }
}
