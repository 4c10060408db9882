use serde::{Deserialize, Serialize};

use crate::{
    bellatrix::primitives::Difficulty,
    phase0::primitives::{ExecutionBlockHash, Slot, UnixSeconds, ValidatorIndex, H256},
};

/// A beacon block as seen by fork choice.
///
/// Blocks from before the merge carry a default [`ExecutionPayloadHeader`].
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BeaconBlock {
    pub slot: Slot,
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub execution_payload: ExecutionPayloadHeader,
}

impl BeaconBlock {
    /// Returns `None` if the block does not contain a real execution payload.
    #[must_use]
    pub fn execution_block_hash(&self) -> Option<ExecutionBlockHash> {
        let block_hash = self.execution_payload.block_hash;
        (!block_hash.is_zero()).then_some(block_hash)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionPayloadHeader {
    pub parent_hash: ExecutionBlockHash,
    pub block_hash: ExecutionBlockHash,
    pub block_number: u64,
    pub timestamp: UnixSeconds,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PowBlock {
    pub block_hash: ExecutionBlockHash,
    pub parent_hash: ExecutionBlockHash,
    pub total_difficulty: Difficulty,
}
