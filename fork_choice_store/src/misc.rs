use std::sync::Arc;

use serde::{Deserialize, Serialize};
use types::phase0::{
    containers::Checkpoint,
    primitives::{Epoch, Gwei, Slot, ValidatorIndex, H256},
};

/// Effective balances of validators active in the justified state, indexed by validator index.
///
/// Inactive validators have a balance of 0.
pub type JustifiedBalances = Arc<[Gwei]>;

/// A [`Checkpoint`] along with its root formatted as a `0x`-prefixed hex string.
///
/// The string is used as a key by external consumers, so it is computed once when the checkpoint
/// is created rather than on every lookup.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(from = "Checkpoint", into = "Checkpoint")]
pub struct CheckpointWithHex {
    checkpoint: Checkpoint,
    root_hex: String,
}

impl From<Checkpoint> for CheckpointWithHex {
    fn from(checkpoint: Checkpoint) -> Self {
        Self {
            checkpoint,
            root_hex: format!("{:#x}", checkpoint.root),
        }
    }
}

impl From<CheckpointWithHex> for Checkpoint {
    fn from(checkpoint_with_hex: CheckpointWithHex) -> Self {
        checkpoint_with_hex.checkpoint
    }
}

impl CheckpointWithHex {
    #[must_use]
    pub const fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        self.checkpoint.epoch
    }

    #[must_use]
    pub const fn root(&self) -> H256 {
        self.checkpoint.root
    }

    #[must_use]
    pub fn root_hex(&self) -> &str {
        &self.root_hex
    }
}

/// An attestation for the current slot or later that cannot affect fork choice yet.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueuedAttestation {
    pub slot: Slot,
    pub attesting_indices: Vec<ValidatorIndex>,
    pub block_root: H256,
    pub target_epoch: Epoch,
}
