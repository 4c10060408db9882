use types::{bellatrix::containers::BeaconBlock, nonstandard::ExecutionStatus};

/// [`is_merge_transition_block`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/bellatrix/beacon-chain.md#is_merge_transition_block)
///
/// Fork choice has no access to the post-state, so whether the merge transition is complete is
/// judged from the execution status of the parent block instead.
#[must_use]
pub fn is_merge_transition_block(parent_status: ExecutionStatus, block: &BeaconBlock) -> bool {
    parent_status.is_pre_merge() && is_execution_block(block)
}

#[must_use]
pub fn is_execution_block(block: &BeaconBlock) -> bool {
    block.execution_block_hash().is_some()
}
