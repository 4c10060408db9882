use core::{marker::PhantomData, mem};
use std::{
    collections::HashSet,
    sync::{Arc, OnceLock},
};

use execution_engine::ExecutionEngine;
use fork_choice_store::{
    CheckpointWithHex, ForkChoiceStore, JustifiedBalances, QueuedAttestation, StoreConfig,
};
use helper_functions::{misc, predicates};
use log::{debug, warn};
use proto_array::{
    ProposerBoost, ProtoArray, ProtoBlock, ProtoNode, ScoreChanges, VoteTable, VoteTracker,
};
use typenum::Unsigned as _;
use types::{
    bellatrix::containers::BeaconBlock,
    config::Config as ChainConfig,
    phase0::{
        containers::{AttestationData, Checkpoint, IndexedAttestation},
        primitives::{Epoch, Gwei, Slot, ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::{
    error::{Error, InvalidAttestation, InvalidBlock},
    misc::{BlockPrecomputed, PostState},
    persistence::PersistedForkChoice,
    validations,
};

/// LMD GHOST fork choice with justification and finalization tracking.
///
/// Weights are only recomputed in [`ForkChoice::update_head`]. Every other mutation merely marks
/// the instance as out of sync, so importing many attestations in a row stays cheap.
#[derive(Clone, Debug)]
pub struct ForkChoice<P: Preset> {
    chain_config: Arc<ChainConfig>,
    store_config: StoreConfig,
    store: ForkChoiceStore,
    proto_array: ProtoArray,
    votes: VoteTable,
    queued_attestations: Vec<QueuedAttestation>,
    // Cleared at every call to `ForkChoice::update_time`.
    validated_attestation_data: HashSet<AttestationData>,
    proposer_boost_root: Option<H256>,
    // The balances node weights in `proto_array` were last computed with.
    // They lag behind `store.justified_balances()` until the next call to `update_head`.
    applied_balances: JustifiedBalances,
    // Derived from `applied_balances`.
    proposer_boost_score: OnceLock<Gwei>,
    synced: bool,
    head: ProtoNode,
    phantom: PhantomData<P>,
}

impl<P: Preset> ForkChoice<P> {
    /// Starts fork choice from a trusted anchor block.
    ///
    /// The anchor is treated as both justified and finalized in the epoch of its slot.
    pub fn new(
        chain_config: Arc<ChainConfig>,
        store_config: StoreConfig,
        mut anchor: ProtoBlock,
        current_slot: Slot,
        justified_balances: JustifiedBalances,
    ) -> Result<Self, Error> {
        let anchor_checkpoint = Checkpoint {
            epoch: misc::compute_epoch_at_slot::<P>(anchor.slot),
            root: anchor.root,
        };

        anchor.justified_checkpoint = anchor_checkpoint;
        anchor.finalized_checkpoint = anchor_checkpoint;

        let store = ForkChoiceStore::new(
            current_slot,
            anchor_checkpoint,
            anchor_checkpoint,
            Arc::clone(&justified_balances),
        );

        let mut proto_array = ProtoArray::new(
            store_config.prune_threshold,
            anchor_checkpoint.epoch,
            anchor_checkpoint.epoch,
        );

        proto_array.on_block(anchor);

        Self::from_parts(
            chain_config,
            store_config,
            store,
            proto_array,
            VoteTable::default(),
            vec![],
            None,
            justified_balances,
        )
    }

    /// Restores fork choice from a snapshot taken with [`ForkChoice::to_persisted`].
    pub fn from_persisted(
        chain_config: Arc<ChainConfig>,
        store_config: StoreConfig,
        persisted: PersistedForkChoice,
    ) -> Result<Self, Error> {
        let PersistedForkChoice {
            proto_array,
            votes,
            queued_attestations,
            justified,
            finalized,
            best_justified,
            justified_balances,
            best_justified_balances,
            applied_balances,
            current_slot,
            proposer_boost_root,
        } = persisted;

        let store = ForkChoiceStore::from_parts(
            current_slot,
            (justified, justified_balances),
            finalized,
            (best_justified, best_justified_balances),
        );

        Self::from_parts(
            chain_config,
            store_config,
            store,
            proto_array,
            votes,
            queued_attestations,
            proposer_boost_root,
            applied_balances,
        )
    }

    #[must_use]
    pub fn to_persisted(&self) -> PersistedForkChoice {
        PersistedForkChoice {
            proto_array: self.proto_array.clone(),
            votes: self.votes.clone(),
            queued_attestations: self.queued_attestations.clone(),
            justified: self.store.justified_checkpoint().checkpoint(),
            finalized: self.store.finalized_checkpoint().checkpoint(),
            best_justified: self.store.best_justified_checkpoint().checkpoint(),
            justified_balances: Arc::clone(self.store.justified_balances()),
            best_justified_balances: Arc::clone(self.store.best_justified_balances()),
            applied_balances: Arc::clone(&self.applied_balances),
            current_slot: self.store.current_slot(),
            proposer_boost_root: self.proposer_boost_root,
        }
    }

    /// Imports a block whose state transition has already been run.
    ///
    /// Nothing is changed if the block is rejected.
    pub fn on_block(
        &mut self,
        block: &BeaconBlock,
        post_state: &impl PostState,
        precomputed: BlockPrecomputed,
        execution_engine: impl ExecutionEngine,
    ) -> Result<ProtoBlock, Error> {
        let BlockPrecomputed {
            block_root,
            block_delay,
            justified_balances,
            execution_status,
        } = precomputed;

        let current_slot = self.store.current_slot();
        let finalized = self.store.finalized_checkpoint().checkpoint();
        let finalized_slot = misc::compute_start_slot_at_epoch::<P>(finalized.epoch);

        let Some(parent) = self.proto_array.node(block.parent_root).copied() else {
            return Err(InvalidBlock::UnknownParent {
                root: block_root,
                parent_root: block.parent_root,
            }
            .into());
        };

        if block.slot > current_slot {
            return Err(InvalidBlock::FutureSlot {
                block_slot: block.slot,
                current_slot,
            }
            .into());
        }

        if block.slot <= finalized_slot {
            return Err(InvalidBlock::FinalizedSlot {
                block_slot: block.slot,
                finalized_slot,
            }
            .into());
        }

        let ancestor = self.ancestor(block.parent_root, finalized_slot)?;

        if ancestor != Some(finalized.root) {
            return Err(InvalidBlock::NotFinalizedDescendant {
                finalized_root: finalized.root,
                ancestor,
            }
            .into());
        }

        if predicates::is_merge_transition_block(parent.execution_status, block) {
            validations::validate_merge_block::<P, _>(&self.chain_config, block, execution_engine)?;
        }

        let target_root = target_root::<P>(block.slot, block_root, post_state)?;

        let state_justified = post_state.current_justified_checkpoint();
        let state_finalized = post_state.finalized_checkpoint();

        let justification_advanced =
            state_justified.epoch > self.store.justified_checkpoint().epoch();

        let finalization_advanced = state_finalized.epoch > finalized.epoch;

        // Validate everything before mutating anything.
        let checkpoint_update = if justification_advanced || finalization_advanced {
            let balances = justified_balances.ok_or(Error::UnableToSetJustifiedCheckpoint {
                root: state_justified.root,
            })?;

            let update_justified =
                finalization_advanced || self.should_update_justified_checkpoint(post_state)?;

            Some((balances, update_justified))
        } else {
            None
        };

        if let Some((balances, update_justified)) = checkpoint_update {
            if justification_advanced
                && state_justified.epoch > self.store.best_justified_checkpoint().epoch()
            {
                self.store
                    .set_best_justified(state_justified, Arc::clone(&balances));
            }

            // A new finalized checkpoint always brings the justified checkpoint along with it.
            if finalization_advanced {
                self.store.set_finalized(state_finalized)?;
            }

            if update_justified {
                self.store.set_justified(state_justified, balances);
            }
        }

        let timely = block_delay < self.store_config.timely_threshold(&self.chain_config);

        // Only the first timely block in a slot is boosted.
        if self.store_config.proposer_boost_enabled
            && block.slot == current_slot
            && timely
            && self.proposer_boost_root.is_none()
        {
            self.proposer_boost_root = Some(block_root);
        }

        let proto_block = ProtoBlock {
            slot: block.slot,
            root: block_root,
            parent_root: Some(block.parent_root),
            state_root: block.state_root,
            target_root,
            justified_checkpoint: state_justified,
            finalized_checkpoint: state_finalized,
            execution_status,
            execution_payload_block_hash: block.execution_block_hash(),
        };

        self.proto_array.on_block(proto_block);
        self.synced = false;

        Ok(proto_block)
    }

    /// Imports an attestation whose signature has already been verified.
    ///
    /// Attestations for the current slot or later are queued until their slot is in the past.
    /// Attestations contained in blocks may be older than the previous epoch.
    pub fn on_attestation(
        &mut self,
        attestation: &IndexedAttestation,
        is_from_block: bool,
    ) -> Result<(), Error> {
        let data = attestation.data;

        // Votes for the zero hash cannot be told apart from the absence of a vote.
        if data.beacon_block_root.is_zero() {
            return Ok(());
        }

        self.validate_on_attestation(attestation, is_from_block)?;

        // Every validator that can attest is in the registry of the justified state.
        let validator_count = self.store.justified_balances().len();

        if let Some(validator_index) = attestation
            .attesting_indices
            .iter()
            .copied()
            .find(|index| !usize::try_from(*index).is_ok_and(|index| index < validator_count))
        {
            return Err(InvalidAttestation::UnknownValidator {
                validator_index,
                validator_count,
            }
            .into());
        }

        if data.slot < self.store.current_slot() {
            for validator_index in attestation.attesting_indices.iter().copied() {
                self.add_latest_message(
                    validator_index,
                    data.target.epoch,
                    data.beacon_block_root,
                )?;
            }
        } else {
            self.queued_attestations.push(QueuedAttestation {
                slot: data.slot,
                attesting_indices: attestation.attesting_indices.clone(),
                block_root: data.beacon_block_root,
                target_epoch: data.target.epoch,
            });
        }

        Ok(())
    }

    /// Records a vote unless the validator has already voted in the same or a later epoch.
    ///
    /// `validator_index` must already have been checked against a validator registry.
    /// The vote table grows to fit it.
    pub fn add_latest_message(
        &mut self,
        validator_index: ValidatorIndex,
        next_epoch: Epoch,
        next_root: H256,
    ) -> Result<(), Error> {
        if self
            .votes
            .process_attestation(validator_index, next_root, next_epoch)?
        {
            self.synced = false;
        }

        Ok(())
    }

    /// Recomputes weights if anything changed since the last call and returns the new head.
    pub fn update_head(&mut self) -> Result<ProtoNode, Error> {
        if !self.synced {
            let justified_balances = Arc::clone(self.store.justified_balances());

            let deltas = proto_array::compute_deltas(
                self.proto_array.indices(),
                &mut self.votes,
                &self.applied_balances,
                &justified_balances,
            )?;

            if !Arc::ptr_eq(&self.applied_balances, &justified_balances) {
                self.applied_balances = justified_balances;
                self.proposer_boost_score = OnceLock::new();
            }

            let proposer_boost = match self.proposer_boost_root {
                Some(root) if self.store_config.proposer_boost_enabled => {
                    Some(ProposerBoost::new(root, self.proposer_boost_score()))
                }
                _ => None,
            };

            self.proto_array.apply_score_changes(ScoreChanges {
                deltas,
                proposer_boost,
                justified_epoch: self.store.justified_checkpoint().epoch(),
                finalized_epoch: self.store.finalized_checkpoint().epoch(),
            })?;

            self.synced = true;
        }

        let justified_root = self.store.justified_checkpoint().root();

        let head_root = self
            .proto_array
            .find_head(justified_root)
            .map_err(missing_block)?;

        let head = self
            .proto_array
            .node(head_root)
            .copied()
            .ok_or(Error::MissingProtoArrayBlock { root: head_root })?;

        if head.root != self.head.root {
            debug!(
                "head changed (slot: {}, root: {:?}, previous root: {:?})",
                head.slot, head.root, self.head.root,
            );
        }

        self.head = head;

        Ok(head)
    }

    /// Advances the current slot one slot at a time and replays queued attestations that are no
    /// longer from the current slot.
    ///
    /// A slot earlier than the current one is ignored. Returns the current slot.
    pub fn update_time(&mut self, slot: Slot) -> Result<Slot, Error> {
        while self.store.current_slot() < slot {
            self.on_tick(self.store.current_slot() + 1)?;
        }

        self.process_attestation_queue()?;
        self.validated_attestation_data.clear();

        Ok(self.store.current_slot())
    }

    /// Advances the current slot by at most one.
    ///
    /// Fails if `slot` is earlier than the current slot or more than one slot after it.
    pub fn on_tick(&mut self, slot: Slot) -> Result<(), Error> {
        let previous_slot = self.store.current_slot();

        if slot < previous_slot || slot > previous_slot.saturating_add(1) {
            return Err(Error::InconsistentOnTick {
                previous_slot,
                slot,
            });
        }

        self.store.set_current_slot(slot);

        if self.proposer_boost_root.take().is_some() {
            self.synced = false;
        }

        if !misc::is_epoch_start::<P>(slot) {
            return Ok(());
        }

        let best_justified = self.store.best_justified_checkpoint().checkpoint();

        if best_justified.epoch <= self.store.justified_checkpoint().epoch() {
            return Ok(());
        }

        let finalized = self.store.finalized_checkpoint().checkpoint();
        let finalized_slot = misc::compute_start_slot_at_epoch::<P>(finalized.epoch);

        if self.ancestor(best_justified.root, finalized_slot)? == Some(finalized.root) {
            let balances = Arc::clone(self.store.best_justified_balances());
            self.store.set_justified(best_justified, balances);
            self.synced = false;
        }

        Ok(())
    }

    /// Removes blocks before the finalized block if there are enough of them.
    ///
    /// Returns the removed blocks so that callers can evict them from their own caches.
    pub fn prune(&mut self, finalized_root: H256) -> Result<Vec<ProtoNode>, Error> {
        Ok(self.proto_array.maybe_prune(finalized_root)?)
    }

    pub fn set_prune_threshold(&mut self, prune_threshold: usize) {
        self.proto_array.set_prune_threshold(prune_threshold);
    }

    pub fn on_valid_execution_payload(&mut self, block_root: H256) -> Result<(), Error> {
        self.proto_array
            .validate_execution_status(block_root)
            .map_err(missing_block)
    }

    /// Marks the block and its descendants as invalid and returns their roots.
    pub fn on_invalid_execution_payload(&mut self, block_root: H256) -> Result<Vec<H256>, Error> {
        let invalidated = self
            .proto_array
            .invalidate_execution_status(block_root)
            .map_err(missing_block)?;

        if !invalidated.is_empty() {
            self.synced = false;
        }

        Ok(invalidated)
    }

    /// Returns the head computed by the last call to [`ForkChoice::update_head`].
    #[must_use]
    pub const fn head(&self) -> &ProtoNode {
        &self.head
    }

    #[must_use]
    pub const fn head_root(&self) -> H256 {
        self.head.root
    }

    #[must_use]
    pub const fn head_slot(&self) -> Slot {
        self.head.slot
    }

    #[must_use]
    pub const fn current_slot(&self) -> Slot {
        self.store.current_slot()
    }

    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.synced
    }

    #[must_use]
    pub const fn justified_checkpoint(&self) -> &CheckpointWithHex {
        self.store.justified_checkpoint()
    }

    #[must_use]
    pub const fn finalized_checkpoint(&self) -> &CheckpointWithHex {
        self.store.finalized_checkpoint()
    }

    #[must_use]
    pub const fn best_justified_checkpoint(&self) -> &CheckpointWithHex {
        self.store.best_justified_checkpoint()
    }

    #[must_use]
    pub const fn justified_balances(&self) -> &JustifiedBalances {
        self.store.justified_balances()
    }

    pub fn justified_block(&self) -> Result<&ProtoNode, Error> {
        let root = self.store.justified_checkpoint().root();

        self.proto_array
            .node(root)
            .ok_or(Error::MissingProtoArrayBlock { root })
    }

    pub fn finalized_block(&self) -> Result<&ProtoNode, Error> {
        let root = self.store.finalized_checkpoint().root();

        self.proto_array
            .node(root)
            .ok_or(Error::MissingProtoArrayBlock { root })
    }

    /// Returns `true` if the block is known and descends from the finalized block.
    ///
    /// Blocks on pruned-away or conflicting forks may linger in the proto-array until the next
    /// call to [`ForkChoice::prune`], but are not reported.
    #[must_use]
    pub fn contains_block(&self, block_root: H256) -> bool {
        self.proto_array.contains(block_root) && self.is_descendant_of_finalized(block_root)
    }

    #[must_use]
    pub fn block(&self, block_root: H256) -> Option<&ProtoNode> {
        self.proto_array
            .node(block_root)
            .filter(|node| self.is_descendant_of_finalized(node.root))
    }

    #[must_use]
    pub fn is_descendant_of_finalized(&self, block_root: H256) -> bool {
        let finalized_root = self.store.finalized_checkpoint().root();
        self.proto_array.is_descendant(finalized_root, block_root)
    }

    /// Returns the root of the ancestor of the block at `slot` or the most recent block before it.
    pub fn ancestor(&self, block_root: H256, slot: Slot) -> Result<Option<H256>, Error> {
        self.proto_array
            .ancestor(block_root, slot)
            .map_err(missing_block)
    }

    #[must_use]
    pub fn is_descendant(&self, ancestor_root: H256, descendant_root: H256) -> bool {
        self.proto_array
            .is_descendant(ancestor_root, descendant_root)
    }

    #[must_use]
    pub fn common_ancestor(&self, root_a: H256, root_b: H256) -> Option<H256> {
        self.proto_array.common_ancestor(root_a, root_b)
    }

    /// Returns the block in the canonical chain at exactly `slot`.
    ///
    /// Returns `None` for skipped slots.
    #[must_use]
    pub fn canonical_block_at_slot(&self, slot: Slot) -> Option<&ProtoNode> {
        self.proto_array
            .iter_nodes(self.head.root)
            .find(|node| node.slot <= slot)
            .filter(|node| node.slot == slot)
    }

    #[must_use]
    pub fn latest_message(&self, validator_index: ValidatorIndex) -> Option<VoteTracker> {
        self.votes.get(validator_index).copied()
    }

    #[must_use]
    pub fn weight(&self, block_root: H256) -> Option<Gwei> {
        self.proto_array.weight(block_root)
    }

    #[must_use]
    pub fn is_optimistic_block(&self, block_root: H256) -> bool {
        self.proto_array
            .node(block_root)
            .is_some_and(|node| node.execution_status.is_optimistic())
    }

    #[must_use]
    pub fn queued_attestations(&self) -> &[QueuedAttestation] {
        &self.queued_attestations
    }

    #[must_use]
    pub const fn proposer_boost_root(&self) -> Option<H256> {
        self.proposer_boost_root
    }

    #[must_use]
    pub fn proto_array_len(&self) -> usize {
        self.proto_array.len()
    }

    #[must_use]
    pub const fn proto_array(&self) -> &ProtoArray {
        &self.proto_array
    }

    #[expect(clippy::too_many_arguments)]
    fn from_parts(
        chain_config: Arc<ChainConfig>,
        store_config: StoreConfig,
        store: ForkChoiceStore,
        proto_array: ProtoArray,
        votes: VoteTable,
        queued_attestations: Vec<QueuedAttestation>,
        proposer_boost_root: Option<H256>,
        applied_balances: JustifiedBalances,
    ) -> Result<Self, Error> {
        chain_config.validate()?;

        let justified_root = store.justified_checkpoint().root();

        // Replaced by the call to `update_head` below.
        let head = proto_array
            .node(justified_root)
            .copied()
            .ok_or(Error::MissingProtoArrayBlock {
                root: justified_root,
            })?;

        let mut fork_choice = Self {
            chain_config,
            store_config,
            store,
            proto_array,
            votes,
            queued_attestations,
            validated_attestation_data: HashSet::new(),
            proposer_boost_root,
            applied_balances,
            proposer_boost_score: OnceLock::new(),
            synced: false,
            head,
            phantom: PhantomData,
        };

        fork_choice.update_head()?;

        Ok(fork_choice)
    }

    // <https://github.com/ethereum/consensus-specs/blob/v1.1.0/specs/phase0/fork-choice.md#should_update_justified_checkpoint>
    fn should_update_justified_checkpoint(
        &self,
        post_state: &impl PostState,
    ) -> Result<bool, Error> {
        let current_slot = self.store.current_slot();

        if misc::slots_since_epoch_start::<P>(current_slot)
            < self.chain_config.safe_slots_to_update_justified
        {
            return Ok(true);
        }

        let justified = self.store.justified_checkpoint();
        let justified_slot = misc::compute_start_slot_at_epoch::<P>(justified.epoch());
        let state_slot = post_state.slot();

        if justified_slot >= state_slot {
            warn!(
                "block attempted to revert justification \
                 (justified slot: {justified_slot}, block slot: {state_slot})",
            );

            return Err(Error::AttemptToRevertJustification {
                justified_slot,
                block_slot: state_slot,
            });
        }

        let state_epoch = misc::compute_epoch_at_slot::<P>(state_slot);
        let current_epoch = misc::compute_epoch_at_slot::<P>(current_slot);

        // Blocks from previous epochs are imported while syncing.
        // Their justification cannot conflict with the current epoch.
        if state_epoch < current_epoch {
            return Ok(true);
        }

        let new_justified_root = post_state.current_justified_checkpoint().root;

        Ok(self.ancestor(new_justified_root, justified_slot)? == Some(justified.root()))
    }

    fn validate_on_attestation(
        &mut self,
        attestation: &IndexedAttestation,
        is_from_block: bool,
    ) -> Result<(), Error> {
        if attestation.attesting_indices.is_empty() {
            return Err(InvalidAttestation::EmptyAggregationBitfield.into());
        }

        if self.validated_attestation_data.contains(&attestation.data) {
            return Ok(());
        }

        self.validate_attestation_data(attestation.data, is_from_block)?;
        self.validated_attestation_data.insert(attestation.data);

        Ok(())
    }

    fn validate_attestation_data(
        &self,
        data: AttestationData,
        is_from_block: bool,
    ) -> Result<(), InvalidAttestation> {
        let current_epoch = misc::compute_epoch_at_slot::<P>(self.store.current_slot());
        let target_epoch = data.target.epoch;

        if target_epoch > current_epoch {
            return Err(InvalidAttestation::FutureEpoch {
                target_epoch,
                current_epoch,
            });
        }

        if !is_from_block && target_epoch.saturating_add(1) < current_epoch {
            return Err(InvalidAttestation::PastEpoch {
                target_epoch,
                current_epoch,
            });
        }

        let slot_epoch = misc::compute_epoch_at_slot::<P>(data.slot);

        if target_epoch != slot_epoch {
            return Err(InvalidAttestation::BadTargetEpoch {
                target_epoch,
                slot_epoch,
            });
        }

        if !self.proto_array.contains(data.target.root) {
            return Err(InvalidAttestation::UnknownTargetRoot {
                target_root: data.target.root,
            });
        }

        let Some(block) = self.proto_array.node(data.beacon_block_root) else {
            return Err(InvalidAttestation::UnknownHeadBlock {
                beacon_block_root: data.beacon_block_root,
            });
        };

        // A block from an earlier epoch is its own target in later epochs.
        let expected_target = if target_epoch > misc::compute_epoch_at_slot::<P>(block.slot) {
            data.beacon_block_root
        } else {
            block.target_root
        };

        if expected_target != data.target.root {
            return Err(InvalidAttestation::InvalidTarget {
                attestation_target: data.target.root,
                expected_target,
            });
        }

        if block.slot > data.slot {
            return Err(InvalidAttestation::AttestsToFutureBlock {
                block_slot: block.slot,
                attestation_slot: data.slot,
            });
        }

        Ok(())
    }

    fn process_attestation_queue(&mut self) -> Result<(), Error> {
        let current_slot = self.store.current_slot();

        let (ready, pending) = mem::take(&mut self.queued_attestations)
            .into_iter()
            .partition::<Vec<_>, _>(|attestation| attestation.slot < current_slot);

        self.queued_attestations = pending;

        for attestation in ready {
            for validator_index in attestation.attesting_indices {
                self.add_latest_message(
                    validator_index,
                    attestation.target_epoch,
                    attestation.block_root,
                )?;
            }
        }

        Ok(())
    }

    fn proposer_boost_score(&self) -> Gwei {
        if let Some(score) = self.store_config.proposer_boost_score_override {
            return score;
        }

        *self.proposer_boost_score.get_or_init(|| {
            compute_proposer_boost_score::<P>(
                &self.applied_balances,
                self.chain_config.proposer_score_boost,
            )
        })
    }
}

fn target_root<P: Preset>(
    block_slot: Slot,
    block_root: H256,
    post_state: &impl PostState,
) -> Result<H256, Error> {
    let epoch = misc::compute_epoch_at_slot::<P>(block_slot);
    let epoch_start_slot = misc::compute_start_slot_at_epoch::<P>(epoch);

    if block_slot == epoch_start_slot {
        return Ok(block_root);
    }

    post_state
        .block_root_at_slot(epoch_start_slot)
        .ok_or(Error::MissingTargetRoot {
            slot: epoch_start_slot,
        })
}

// The score a single committee would add if every member voted for the boosted block, scaled by
// `PROPOSER_SCORE_BOOST` percent.
fn compute_proposer_boost_score<P: Preset>(balances: &[Gwei], proposer_score_boost: u64) -> Gwei {
    let (total_balance, active_validators) = balances
        .iter()
        .copied()
        .filter(|balance| *balance > 0)
        .fold((0_u64, 0_u64), |(total, count), balance| {
            (total.saturating_add(balance), count + 1)
        });

    if active_validators == 0 {
        return 0;
    }

    let average_balance = total_balance / active_validators;
    let committee_size = active_validators / P::SlotsPerEpoch::U64;

    committee_size
        .saturating_mul(average_balance)
        .saturating_mul(proposer_score_boost)
        / 100
}

fn missing_block(error: proto_array::Error) -> Error {
    match error {
        proto_array::Error::NodeUnknown { root }
        | proto_array::Error::JustifiedNodeUnknown { root } => Error::MissingProtoArrayBlock { root },
        other => other.into(),
    }
}
