use execution_engine::ExecutionEngine;
use helper_functions::misc;
use types::{
    bellatrix::containers::{BeaconBlock, PowBlock},
    config::Config as ChainConfig,
    phase0::primitives::ExecutionBlockHash,
    preset::Preset,
};

use crate::error::{Error, InvalidBlock};

/// [`validate_merge_block`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/bellatrix/fork-choice.md#validate_merge_block)
///
/// > Check the parent PoW block of execution payload is a valid terminal PoW block.
/// >
/// > Note: Unavailable PoW block(s) may later become available,
/// > and a client software MAY delay a call to ``validate_merge_block``
/// > until the PoW block(s) become available.
pub fn validate_merge_block<P: Preset, E: ExecutionEngine>(
    chain_config: &ChainConfig,
    block: &BeaconBlock,
    execution_engine: E,
) -> Result<(), Error> {
    let parent_hash = block.execution_payload.parent_hash;

    if let Some(terminal_block_hash) = chain_config.terminal_block_hash_override() {
        let epoch = misc::compute_epoch_at_slot::<P>(block.slot);
        let activation_epoch = chain_config.terminal_block_hash_activation_epoch;

        // > If `TERMINAL_BLOCK_HASH` is used as an override,
        // > the activation epoch must be reached.
        if epoch < activation_epoch {
            return Err(InvalidBlock::MergeBlockBeforeActivationEpoch {
                epoch,
                activation_epoch,
            }
            .into());
        }

        if parent_hash != terminal_block_hash {
            return Err(InvalidBlock::TerminalBlockHashMismatch {
                expected: terminal_block_hash,
                actual: parent_hash,
            }
            .into());
        }

        return Ok(());
    }

    if E::IS_NULL {
        return Ok(());
    }

    let optimistic = execution_engine.allow_optimistic_merge_block_validation();

    // > Check if `pow_block` is available
    let Some(pow_block) = fetch_pow_block(&execution_engine, parent_hash)? else {
        return pow_block_missing(parent_hash, optimistic);
    };

    // > Check if `pow_parent` is available
    let Some(pow_parent) = fetch_pow_block(&execution_engine, pow_block.parent_hash)? else {
        return pow_block_missing(pow_block.parent_hash, optimistic);
    };

    // > Check if `pow_block` is a valid terminal PoW block
    validate_terminal_pow_block(chain_config, pow_block, pow_parent)
}

/// [`is_valid_terminal_pow_block`](https://github.com/ethereum/consensus-specs/blob/v1.3.0/specs/bellatrix/fork-choice.md#is_valid_terminal_pow_block)
fn validate_terminal_pow_block(
    chain_config: &ChainConfig,
    pow_block: PowBlock,
    parent: PowBlock,
) -> Result<(), Error> {
    let terminal_total_difficulty = chain_config.terminal_total_difficulty;

    if pow_block.total_difficulty < terminal_total_difficulty {
        return Err(InvalidBlock::TerminalTotalDifficultyNotReached {
            pow_block: Box::new(pow_block),
            terminal_total_difficulty,
        }
        .into());
    }

    if parent.total_difficulty >= terminal_total_difficulty {
        return Err(InvalidBlock::TerminalTotalDifficultyReachedByParent {
            pow_block: Box::new(pow_block),
            parent: Box::new(parent),
        }
        .into());
    }

    Ok(())
}

fn fetch_pow_block(
    execution_engine: impl ExecutionEngine,
    block_hash: ExecutionBlockHash,
) -> Result<Option<PowBlock>, Error> {
    execution_engine
        .pow_block(block_hash)
        .map_err(Error::ExecutionEngine)
}

// In case the PoW block is not found (the execution engine may not be synced),
// fork choice may optimistically accept the beacon block.
fn pow_block_missing(block_hash: ExecutionBlockHash, optimistic: bool) -> Result<(), Error> {
    if optimistic {
        return Ok(());
    }

    Err(InvalidBlock::PowBlockUnavailable { block_hash }.into())
}
