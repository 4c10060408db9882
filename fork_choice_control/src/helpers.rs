use core::{ops::Range, time::Duration};
use std::{collections::BTreeMap, sync::Arc};

use execution_engine::{ExecutionEngine, NullExecutionEngine};
use fork_choice_store::{JustifiedBalances, StoreConfig};
use helper_functions::misc;
use proto_array::ProtoBlock;
use types::{
    bellatrix::containers::{BeaconBlock, ExecutionPayloadHeader},
    config::Config as ChainConfig,
    nonstandard::ExecutionStatus,
    phase0::{
        containers::{AttestationData, Checkpoint, IndexedAttestation},
        primitives::{Epoch, Gwei, Slot, UnixSeconds, ValidatorIndex, H256},
    },
    preset::Minimal,
};

use crate::{
    error::Error,
    fork_choice::ForkChoice,
    misc::{BlockPrecomputed, PostState},
};

pub const GENESIS_ROOT: H256 = H256::repeat_byte(0xee);
pub const VALIDATOR_COUNT: usize = 64;
pub const BALANCE: Gwei = 32;

/// Root of a test block. Lower numbers sort lower.
pub fn root(number: u64) -> H256 {
    H256::from_low_u64_be(number)
}

pub fn start_of_epoch(epoch: Epoch) -> Slot {
    misc::compute_start_slot_at_epoch::<Minimal>(epoch)
}

pub fn epoch_at_slot(slot: Slot) -> Epoch {
    misc::compute_epoch_at_slot::<Minimal>(slot)
}

pub fn balances(count: usize) -> JustifiedBalances {
    core::iter::repeat_n(BALANCE, count).collect()
}

pub fn checkpoint(epoch: Epoch, root: H256) -> Checkpoint {
    Checkpoint { epoch, root }
}

pub const fn anchor() -> ProtoBlock {
    ProtoBlock {
        slot: 0,
        root: GENESIS_ROOT,
        parent_root: None,
        state_root: H256::zero(),
        target_root: GENESIS_ROOT,
        justified_checkpoint: Checkpoint {
            epoch: 0,
            root: H256::zero(),
        },
        finalized_checkpoint: Checkpoint {
            epoch: 0,
            root: H256::zero(),
        },
        execution_status: ExecutionStatus::PreMerge,
        execution_payload_block_hash: None,
    }
}

/// Just enough of a beacon state to import blocks with.
#[derive(Clone, Default, Debug)]
pub struct TestState {
    pub slot: Slot,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    pub block_roots: BTreeMap<Slot, H256>,
}

impl PostState for TestState {
    fn slot(&self) -> Slot {
        self.slot
    }

    fn current_justified_checkpoint(&self) -> Checkpoint {
        self.current_justified_checkpoint
    }

    fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    fn genesis_time(&self) -> UnixSeconds {
        0
    }

    fn block_root_at_slot(&self, slot: Slot) -> Option<H256> {
        self.block_roots.get(&slot).copied()
    }
}

pub struct Context {
    fork_choice: ForkChoice<Minimal>,
    states: BTreeMap<H256, TestState>,
    balances: JustifiedBalances,
}

impl Context {
    pub fn minimal() -> Self {
        Self::with_store_config(StoreConfig::default())
    }

    pub fn with_store_config(store_config: StoreConfig) -> Self {
        Self::new(Arc::new(ChainConfig::minimal()), store_config)
    }

    pub fn new(chain_config: Arc<ChainConfig>, store_config: StoreConfig) -> Self {
        let balances = balances(VALIDATOR_COUNT);

        let fork_choice =
            ForkChoice::new(chain_config, store_config, anchor(), 0, Arc::clone(&balances))
                .expect("anchor is always a valid head");

        let genesis_state = TestState {
            current_justified_checkpoint: checkpoint(0, GENESIS_ROOT),
            finalized_checkpoint: checkpoint(0, GENESIS_ROOT),
            ..TestState::default()
        };

        Self {
            fork_choice,
            states: BTreeMap::from([(GENESIS_ROOT, genesis_state)]),
            balances,
        }
    }

    pub const fn fork_choice(&self) -> &ForkChoice<Minimal> {
        &self.fork_choice
    }

    pub const fn fork_choice_mut(&mut self) -> &mut ForkChoice<Minimal> {
        &mut self.fork_choice
    }

    pub fn on_slot(&mut self, slot: Slot) -> Result<(), Error> {
        self.fork_choice.update_time(slot)?;
        Ok(())
    }

    pub fn head(&mut self) -> Result<H256, Error> {
        Ok(self.fork_choice.update_head()?.root)
    }

    /// State of a block at `slot` built on top of `parent_root`.
    ///
    /// Checkpoints are inherited from the parent.
    pub fn child_state(&self, parent_root: H256, slot: Slot) -> TestState {
        let Some(parent_state) = self.states.get(&parent_root) else {
            return TestState {
                slot,
                ..TestState::default()
            };
        };

        let mut block_roots = parent_state.block_roots.clone();
        block_roots.extend((parent_state.slot..slot).map(|skipped| (skipped, parent_root)));

        TestState {
            slot,
            block_roots,
            ..parent_state.clone()
        }
    }

    pub fn block(parent_root: H256, slot: Slot, block_root: H256) -> BeaconBlock {
        BeaconBlock {
            slot,
            parent_root,
            state_root: block_root,
            ..BeaconBlock::default()
        }
    }

    pub fn precomputed(&self, block_root: H256, block_delay: Duration) -> BlockPrecomputed {
        BlockPrecomputed {
            block_root,
            block_delay,
            justified_balances: Some(Arc::clone(&self.balances)),
            execution_status: ExecutionStatus::PreMerge,
        }
    }

    /// Imports a timely block whose checkpoints are the same as its parent's.
    pub fn import(
        &mut self,
        parent_root: H256,
        slot: Slot,
        block_root: H256,
    ) -> Result<ProtoBlock, Error> {
        let state = self.child_state(parent_root, slot);
        let precomputed = self.precomputed(block_root, Duration::ZERO);
        let block = Self::block(parent_root, slot, block_root);
        self.import_with(&block, state, precomputed, NullExecutionEngine)
    }

    pub fn import_with_checkpoints(
        &mut self,
        parent_root: H256,
        slot: Slot,
        block_root: H256,
        justified: Checkpoint,
        finalized: Checkpoint,
    ) -> Result<ProtoBlock, Error> {
        let state = TestState {
            current_justified_checkpoint: justified,
            finalized_checkpoint: finalized,
            ..self.child_state(parent_root, slot)
        };

        let block = Self::block(parent_root, slot, block_root);
        let precomputed = self.precomputed(block_root, Duration::ZERO);

        self.import_with(&block, state, precomputed, NullExecutionEngine)
    }

    pub fn import_with(
        &mut self,
        block: &BeaconBlock,
        state: TestState,
        precomputed: BlockPrecomputed,
        execution_engine: impl ExecutionEngine,
    ) -> Result<ProtoBlock, Error> {
        let block_root = precomputed.block_root;

        let proto_block =
            self.fork_choice
                .on_block(block, &state, precomputed, execution_engine)?;

        self.states.insert(block_root, state);

        Ok(proto_block)
    }

    /// Imports a block in every slot of `slots` and returns the root of the last one.
    ///
    /// The block in slot `n` has the root `root(block_number_offset + n)`.
    pub fn import_chain(
        &mut self,
        mut parent_root: H256,
        slots: Range<Slot>,
        block_number_offset: u64,
    ) -> Result<H256, Error> {
        for slot in slots {
            let block_root = root(block_number_offset + slot);
            self.import(parent_root, slot, block_root)?;
            parent_root = block_root;
        }

        Ok(parent_root)
    }

    /// Builds a well-formed attestation for `block_root` in `slot`.
    pub fn attestation(
        &self,
        validators: Range<ValidatorIndex>,
        slot: Slot,
        block_root: H256,
    ) -> IndexedAttestation {
        let target_epoch = epoch_at_slot(slot);

        let target_root = self
            .fork_choice
            .ancestor(block_root, start_of_epoch(target_epoch))
            .ok()
            .flatten()
            .unwrap_or(block_root);

        IndexedAttestation {
            attesting_indices: validators.collect(),
            data: AttestationData {
                slot,
                index: 0,
                beacon_block_root: block_root,
                source: self.fork_choice.justified_checkpoint().checkpoint(),
                target: checkpoint(target_epoch, target_root),
            },
        }
    }

    pub fn attest(
        &mut self,
        validators: Range<ValidatorIndex>,
        slot: Slot,
        block_root: H256,
    ) -> Result<(), Error> {
        let attestation = self.attestation(validators, slot, block_root);
        self.fork_choice.on_attestation(&attestation, false)
    }
}

pub fn merge_block(parent_root: H256, slot: Slot, block_root: H256) -> BeaconBlock {
    BeaconBlock {
        execution_payload: ExecutionPayloadHeader {
            parent_hash: H256::repeat_byte(0xaa),
            block_hash: H256::repeat_byte(0xcc),
            ..ExecutionPayloadHeader::default()
        },
        ..Context::block(parent_root, slot, block_root)
    }
}
