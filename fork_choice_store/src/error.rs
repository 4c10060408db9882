use static_assertions::assert_eq_size;
use thiserror::Error;
use types::phase0::containers::Checkpoint;

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum Error {
    #[error("finalized checkpoint cannot move backwards (current: {current:?}, new: {new:?})")]
    FinalizedCheckpointRegression { current: Checkpoint, new: Checkpoint },
}

assert_eq_size!(Error, [u64; 10]);
