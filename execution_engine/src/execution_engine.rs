#![expect(clippy::module_name_repetitions)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::{ensure, Result};
use thiserror::Error;
use types::{bellatrix::containers::PowBlock, phase0::primitives::ExecutionBlockHash};

/// The parts of an execution engine that fork choice consults when importing blocks.
///
/// Payload validity itself is determined outside of fork choice and passed in as an
/// [`ExecutionStatus`](types::nonstandard::ExecutionStatus).
pub trait ExecutionEngine {
    const IS_NULL: bool;

    fn allow_optimistic_merge_block_validation(&self) -> bool;

    /// [`get_pow_block`](https://github.com/ethereum/consensus-specs/blob/1bfefe301da592375e2e02f65849a96aadec1936/specs/bellatrix/fork-choice.md#get_pow_block)
    ///
    /// Returns `Ok(None)` if the execution engine does not know about the block.
    fn pow_block(&self, block_hash: ExecutionBlockHash) -> Result<Option<PowBlock>>;
}

impl<E: ExecutionEngine> ExecutionEngine for &E {
    const IS_NULL: bool = E::IS_NULL;

    fn allow_optimistic_merge_block_validation(&self) -> bool {
        (*self).allow_optimistic_merge_block_validation()
    }

    fn pow_block(&self, block_hash: ExecutionBlockHash) -> Result<Option<PowBlock>> {
        (*self).pow_block(block_hash)
    }
}

impl<E: ExecutionEngine> ExecutionEngine for Arc<E> {
    const IS_NULL: bool = E::IS_NULL;

    fn allow_optimistic_merge_block_validation(&self) -> bool {
        self.as_ref().allow_optimistic_merge_block_validation()
    }

    fn pow_block(&self, block_hash: ExecutionBlockHash) -> Result<Option<PowBlock>> {
        self.as_ref().pow_block(block_hash)
    }
}

impl<E: ExecutionEngine> ExecutionEngine for Mutex<E> {
    const IS_NULL: bool = E::IS_NULL;

    fn allow_optimistic_merge_block_validation(&self) -> bool {
        self.lock()
            .expect("execution engine mutex is poisoned")
            .allow_optimistic_merge_block_validation()
    }

    fn pow_block(&self, block_hash: ExecutionBlockHash) -> Result<Option<PowBlock>> {
        self.lock()
            .expect("execution engine mutex is poisoned")
            .pow_block(block_hash)
    }
}

#[derive(Clone, Copy)]
pub struct NullExecutionEngine;

impl ExecutionEngine for NullExecutionEngine {
    const IS_NULL: bool = true;

    fn allow_optimistic_merge_block_validation(&self) -> bool {
        false
    }

    fn pow_block(&self, _block_hash: ExecutionBlockHash) -> Result<Option<PowBlock>> {
        Ok(None)
    }
}

pub struct MockExecutionEngine {
    reachable: bool,
    optimistic_merge_block_validation: bool,
    pow_blocks: HashMap<ExecutionBlockHash, PowBlock>,
}

impl ExecutionEngine for MockExecutionEngine {
    const IS_NULL: bool = false;

    fn allow_optimistic_merge_block_validation(&self) -> bool {
        self.optimistic_merge_block_validation
    }

    fn pow_block(&self, block_hash: ExecutionBlockHash) -> Result<Option<PowBlock>> {
        ensure!(self.reachable, Error::Unreachable);
        Ok(self.pow_blocks.get(&block_hash).copied())
    }
}

impl MockExecutionEngine {
    #[must_use]
    pub fn new(reachable: bool, optimistic_merge_block_validation: bool) -> Self {
        Self {
            reachable,
            optimistic_merge_block_validation,
            pow_blocks: HashMap::new(),
        }
    }

    pub fn insert_pow_block(&mut self, pow_block: PowBlock) {
        self.pow_blocks.insert(pow_block.block_hash, pow_block);
    }
}

#[derive(Debug, Error)]
enum Error {
    #[error("execution engine is unreachable")]
    Unreachable,
}

#[cfg(test)]
mod tests {
    use types::phase0::primitives::H256;

    use super::*;

    fn pow_block(byte: u8, total_difficulty: u64) -> PowBlock {
        PowBlock {
            block_hash: H256::repeat_byte(byte),
            parent_hash: H256::repeat_byte(byte.wrapping_sub(1)),
            total_difficulty: total_difficulty.into(),
        }
    }

    #[test]
    fn null_execution_engine_knows_no_pow_blocks() -> Result<()> {
        assert!(NullExecutionEngine::IS_NULL);
        assert!(!NullExecutionEngine.allow_optimistic_merge_block_validation());
        assert_eq!(NullExecutionEngine.pow_block(H256::repeat_byte(1))?, None);
        Ok(())
    }

    #[test]
    fn mock_execution_engine_returns_inserted_pow_blocks() -> Result<()> {
        let mut execution_engine = MockExecutionEngine::new(true, false);
        execution_engine.insert_pow_block(pow_block(2, 100));

        assert_eq!(
            execution_engine.pow_block(H256::repeat_byte(2))?,
            Some(pow_block(2, 100)),
        );
        assert_eq!(execution_engine.pow_block(H256::repeat_byte(3))?, None);

        Ok(())
    }

    #[test]
    fn unreachable_mock_execution_engine_fails() {
        let execution_engine = MockExecutionEngine::new(false, true);

        assert!(execution_engine.allow_optimistic_merge_block_validation());
        assert!(execution_engine.pow_block(H256::zero()).is_err());
    }

    #[test]
    fn wrappers_delegate_to_inner_execution_engine() -> Result<()> {
        let mut execution_engine = MockExecutionEngine::new(true, true);
        execution_engine.insert_pow_block(pow_block(5, 7));

        let shared = Arc::new(Mutex::new(execution_engine));

        assert!(!<Arc<Mutex<MockExecutionEngine>>>::IS_NULL);
        assert!(shared.allow_optimistic_merge_block_validation());
        assert_eq!(shared.pow_block(H256::repeat_byte(5))?, Some(pow_block(5, 7)));

        Ok(())
    }
}
