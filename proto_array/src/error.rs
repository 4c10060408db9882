use static_assertions::assert_impl_all;
use thiserror::Error;
use types::{
    nonstandard::ExecutionStatus,
    phase0::primitives::{ValidatorIndex, H256},
};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("delta overflowed weight of node {index}")]
    DeltaOverflow { index: usize },
    #[error("finalized block is not in proto-array: {root:?}")]
    FinalizedNodeUnknown { root: H256 },
    #[error("head found in proto-array is not viable: {root:?}")]
    InvalidBestNode { root: H256 },
    #[error("number of deltas ({deltas}) does not match number of nodes ({nodes})")]
    InvalidDeltaLen { deltas: usize, nodes: usize },
    #[error(
        "execution status of block cannot change \
         (root: {root:?}, from: {from}, to: {to})"
    )]
    InvalidExecutionStatusTransition {
        root: H256,
        from: ExecutionStatus,
        to: ExecutionStatus,
    },
    #[error("node index is out of bounds: {index}")]
    InvalidNodeIndex { index: usize },
    #[error("delta underflowed weight of node {index}")]
    InvalidNodeDelta { index: usize },
    #[error("justified block is not in proto-array: {root:?}")]
    JustifiedNodeUnknown { root: H256 },
    #[error("block is not in proto-array: {root:?}")]
    NodeUnknown { root: H256 },
    #[error("validator index does not fit in usize: {validator_index}")]
    ValidatorIndexOutOfBounds { validator_index: ValidatorIndex },
}

assert_impl_all!(Error: Send, Sync);
