use hash_hasher::HashedMap;
use serde::{Deserialize, Serialize};
use types::phase0::primitives::{Epoch, Gwei, ValidatorIndex, H256};

use crate::error::Error;

/// The latest message of a single validator.
///
/// `current_root` is the root the validator's balance is currently counted towards.
/// `next_root` is the root it will be moved to the next time deltas are computed.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct VoteTracker {
    pub current_root: H256,
    pub next_root: H256,
    pub next_epoch: Epoch,
}

impl VoteTracker {
    fn is_unused(&self) -> bool {
        *self == Self::default()
    }
}

/// Votes indexed by validator index.
///
/// The table grows to fit any validator index it is asked to store, so indices should be
/// checked against the validator registry before they get here.
#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct VoteTable(Vec<VoteTracker>);

impl VoteTable {
    /// Records a vote unless the validator already voted in the same or a later epoch.
    ///
    /// Returns `true` if the vote was recorded.
    pub fn process_attestation(
        &mut self,
        validator_index: ValidatorIndex,
        block_root: H256,
        target_epoch: Epoch,
    ) -> Result<bool, Error> {
        let vote = self.get_or_insert_mut(validator_index)?;

        if target_epoch > vote.next_epoch || vote.is_unused() {
            vote.next_root = block_root;
            vote.next_epoch = target_epoch;
            return Ok(true);
        }

        Ok(false)
    }

    #[must_use]
    pub fn get(&self, validator_index: ValidatorIndex) -> Option<&VoteTracker> {
        let index = usize::try_from(validator_index).ok()?;
        self.0.get(index).filter(|vote| !vote.is_unused())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn get_or_insert_mut(
        &mut self,
        validator_index: ValidatorIndex,
    ) -> Result<&mut VoteTracker, Error> {
        let index = usize::try_from(validator_index)
            .map_err(|_| Error::ValidatorIndexOutOfBounds { validator_index })?;

        if self.0.len() <= index {
            self.0.resize_with(index + 1, VoteTracker::default);
        }

        self.0
            .get_mut(index)
            .ok_or(Error::ValidatorIndexOutOfBounds { validator_index })
    }
}

/// Converts changes in votes and balances into per-node weight deltas.
///
/// The returned deltas are indexed like the nodes in `indices`. Every vote is moved from
/// `current_root` to `next_root` in the process. Votes for roots missing from `indices` (pruned
/// blocks or the zero hash) do not affect any node. Validators missing from a list of balances are
/// treated as having a balance of 0.
pub fn compute_deltas(
    indices: &HashedMap<H256, usize>,
    votes: &mut VoteTable,
    old_balances: &[Gwei],
    new_balances: &[Gwei],
) -> Result<Vec<i64>, Error> {
    let mut deltas = vec![0_i64; indices.len()];

    for (validator_index, vote) in votes.0.iter_mut().enumerate() {
        // Validators that never voted have nothing to move.
        if vote.current_root.is_zero() && vote.next_root.is_zero() {
            continue;
        }

        let old_balance = old_balances.get(validator_index).copied().unwrap_or_default();
        let new_balance = new_balances.get(validator_index).copied().unwrap_or_default();

        if vote.current_root == vote.next_root && old_balance == new_balance {
            continue;
        }

        if let Some(index) = indices.get(&vote.current_root).copied() {
            let delta = deltas
                .get_mut(index)
                .ok_or(Error::InvalidNodeIndex { index })?;

            *delta = i64::try_from(old_balance)
                .ok()
                .and_then(|balance| delta.checked_sub(balance))
                .ok_or(Error::DeltaOverflow { index })?;
        }

        if let Some(index) = indices.get(&vote.next_root).copied() {
            let delta = deltas
                .get_mut(index)
                .ok_or(Error::InvalidNodeIndex { index })?;

            *delta = i64::try_from(new_balance)
                .ok()
                .and_then(|balance| delta.checked_add(balance))
                .ok_or(Error::DeltaOverflow { index })?;
        }

        vote.current_root = vote.next_root;
    }

    Ok(deltas)
}
