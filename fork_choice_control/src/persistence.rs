use fork_choice_store::{JustifiedBalances, QueuedAttestation};
use proto_array::{ProtoArray, VoteTable};
use serde::{Deserialize, Serialize};
use types::phase0::{
    containers::Checkpoint,
    primitives::{Slot, H256},
};

/// Everything needed to resume fork choice after a restart.
///
/// Indices into the proto-array are not stored. They are rebuilt from the nodes when
/// deserializing.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedForkChoice {
    pub proto_array: ProtoArray,
    pub votes: VoteTable,
    pub queued_attestations: Vec<QueuedAttestation>,
    pub justified: Checkpoint,
    pub finalized: Checkpoint,
    pub best_justified: Checkpoint,
    pub justified_balances: JustifiedBalances,
    pub best_justified_balances: JustifiedBalances,
    /// Balances the weights in `proto_array` were computed with.
    pub applied_balances: JustifiedBalances,
    pub current_slot: Slot,
    pub proposer_boost_root: Option<H256>,
}
