use core::time::Duration;

use fork_choice_store::JustifiedBalances;
use types::{
    config::Config as ChainConfig,
    nonstandard::ExecutionStatus,
    phase0::{
        containers::Checkpoint,
        primitives::{Slot, UnixSeconds, H256},
    },
};

/// The parts of a post-state that fork choice reads when importing a block.
///
/// The state transition is run outside of fork choice, so this is all fork choice ever sees of
/// `BeaconState`.
pub trait PostState {
    fn slot(&self) -> Slot;

    fn current_justified_checkpoint(&self) -> Checkpoint;

    fn finalized_checkpoint(&self) -> Checkpoint;

    fn genesis_time(&self) -> UnixSeconds;

    /// Returns `None` if `slot` is not covered by the state's block roots.
    fn block_root_at_slot(&self, slot: Slot) -> Option<H256>;
}

impl<S: PostState + ?Sized> PostState for &S {
    fn slot(&self) -> Slot {
        (**self).slot()
    }

    fn current_justified_checkpoint(&self) -> Checkpoint {
        (**self).current_justified_checkpoint()
    }

    fn finalized_checkpoint(&self) -> Checkpoint {
        (**self).finalized_checkpoint()
    }

    fn genesis_time(&self) -> UnixSeconds {
        (**self).genesis_time()
    }

    fn block_root_at_slot(&self, slot: Slot) -> Option<H256> {
        (**self).block_root_at_slot(slot)
    }
}

/// Values computed by the caller while processing a block.
#[derive(Clone, Debug)]
pub struct BlockPrecomputed {
    pub block_root: H256,
    /// Time between the start of the block's slot and its arrival.
    pub block_delay: Duration,
    /// Balances from the state of the justified checkpoint in the post-state.
    ///
    /// Only needed if the post-state has newer checkpoints than fork choice.
    pub justified_balances: Option<JustifiedBalances>,
    pub execution_status: ExecutionStatus,
}

impl BlockPrecomputed {
    /// Computes `block_delay` from the time the block was received.
    ///
    /// `arrival_time` is measured from the Unix epoch.
    #[must_use]
    pub fn with_arrival_time(
        chain_config: &ChainConfig,
        post_state: &impl PostState,
        block_root: H256,
        arrival_time: Duration,
        justified_balances: Option<JustifiedBalances>,
        execution_status: ExecutionStatus,
    ) -> Self {
        let block_delay = clock::block_delay(
            chain_config,
            post_state.genesis_time(),
            post_state.slot(),
            arrival_time,
        );

        Self {
            block_root,
            block_delay,
            justified_balances,
            execution_status,
        }
    }
}
