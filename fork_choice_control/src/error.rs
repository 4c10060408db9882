use thiserror::Error;
use types::{
    bellatrix::{containers::PowBlock, primitives::Difficulty},
    phase0::primitives::{Epoch, ExecutionBlockHash, Slot, ValidatorIndex, H256},
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    InvalidBlock(#[from] InvalidBlock),
    #[error(transparent)]
    InvalidAttestation(#[from] InvalidAttestation),
    #[error(
        "attempted to revert justification \
         (justified slot: {justified_slot}, block slot: {block_slot})"
    )]
    AttemptToRevertJustification {
        justified_slot: Slot,
        block_slot: Slot,
    },
    #[error("time went backwards or skipped a slot (previous slot: {previous_slot}, slot: {slot})")]
    InconsistentOnTick { previous_slot: Slot, slot: Slot },
    #[error("block is missing from proto-array: {root:?}")]
    MissingProtoArrayBlock { root: H256 },
    #[error("post-state has no block root for the first slot of the block's epoch: {slot}")]
    MissingTargetRoot { slot: Slot },
    #[error("no validator balances supplied for justified checkpoint: {root:?}")]
    UnableToSetJustifiedCheckpoint { root: H256 },
    #[error(transparent)]
    Config(#[from] types::config::Error),
    #[error(transparent)]
    ProtoArray(#[from] proto_array::Error),
    #[error(transparent)]
    Store(#[from] fork_choice_store::Error),
    #[error(transparent)]
    ExecutionEngine(anyhow::Error),
}

impl Error {
    /// Returns `true` if the error was caused by a broken invariant rather than by invalid input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        !matches!(self, Self::InvalidBlock(_) | Self::InvalidAttestation(_))
    }
}

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum InvalidBlock {
    #[error("parent of block is unknown (root: {root:?}, parent root: {parent_root:?})")]
    UnknownParent { root: H256, parent_root: H256 },
    #[error("block is from a future slot (block slot: {block_slot}, current slot: {current_slot})")]
    FutureSlot {
        block_slot: Slot,
        current_slot: Slot,
    },
    #[error(
        "block is not later than finalized block \
         (block slot: {block_slot}, finalized slot: {finalized_slot})"
    )]
    FinalizedSlot {
        block_slot: Slot,
        finalized_slot: Slot,
    },
    #[error(
        "block does not descend from finalized block \
         (finalized root: {finalized_root:?}, ancestor at finalized slot: {ancestor:?})"
    )]
    NotFinalizedDescendant {
        finalized_root: H256,
        ancestor: Option<H256>,
    },
    #[error(
        "merge block proposed before activation epoch \
         (epoch: {epoch}, activation epoch: {activation_epoch})"
    )]
    MergeBlockBeforeActivationEpoch { epoch: Epoch, activation_epoch: Epoch },
    #[error(
        "terminal PoW block has incorrect hash \
         (expected: {expected:?}, actual: {actual:?})"
    )]
    TerminalBlockHashMismatch {
        expected: ExecutionBlockHash,
        actual: ExecutionBlockHash,
    },
    #[error(
        "terminal PoW block did not reach terminal total difficulty \
         (pow_block: {pow_block:?}, terminal total difficulty: {terminal_total_difficulty})"
    )]
    TerminalTotalDifficultyNotReached {
        pow_block: Box<PowBlock>,
        terminal_total_difficulty: Difficulty,
    },
    #[error(
        "parent of terminal PoW block reached terminal total difficulty \
         (pow_block: {pow_block:?}, parent: {parent:?})"
    )]
    TerminalTotalDifficultyReachedByParent {
        pow_block: Box<PowBlock>,
        parent: Box<PowBlock>,
    },
    #[error("PoW block is not available from execution engine: {block_hash:?}")]
    PowBlockUnavailable { block_hash: ExecutionBlockHash },
}

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum InvalidAttestation {
    #[error("attestation has no attesting indices")]
    EmptyAggregationBitfield,
    #[error("attestation votes for an unknown block: {beacon_block_root:?}")]
    UnknownHeadBlock { beacon_block_root: H256 },
    #[error("attestation targets an unknown block: {target_root:?}")]
    UnknownTargetRoot { target_root: H256 },
    #[error(
        "attestation target epoch does not match its slot \
         (target epoch: {target_epoch}, slot epoch: {slot_epoch})"
    )]
    BadTargetEpoch {
        target_epoch: Epoch,
        slot_epoch: Epoch,
    },
    #[error(
        "attestation targets a future epoch \
         (target epoch: {target_epoch}, current epoch: {current_epoch})"
    )]
    FutureEpoch {
        target_epoch: Epoch,
        current_epoch: Epoch,
    },
    #[error(
        "attestation targets an epoch that is too old \
         (target epoch: {target_epoch}, current epoch: {current_epoch})"
    )]
    PastEpoch {
        target_epoch: Epoch,
        current_epoch: Epoch,
    },
    #[error(
        "attestation target is inconsistent with its LMD GHOST vote \
         (attestation target: {attestation_target:?}, expected target: {expected_target:?})"
    )]
    InvalidTarget {
        attestation_target: H256,
        expected_target: H256,
    },
    #[error(
        "attestation includes an unknown validator \
         (validator index: {validator_index}, validator count: {validator_count})"
    )]
    UnknownValidator {
        validator_index: ValidatorIndex,
        validator_count: usize,
    },
    #[error(
        "attestation votes for a block from the future \
         (block slot: {block_slot}, attestation slot: {attestation_slot})"
    )]
    AttestsToFutureBlock {
        block_slot: Slot,
        attestation_slot: Slot,
    },
}
