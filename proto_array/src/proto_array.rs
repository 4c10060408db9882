use core::{cmp::Ordering, iter};

use derive_more::Constructor;
use hash_hasher::HashedMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use types::{
    nonstandard::ExecutionStatus,
    phase0::{
        consts::GENESIS_EPOCH,
        containers::Checkpoint,
        primitives::{Epoch, ExecutionBlockHash, Gwei, Slot, H256},
    },
};

use crate::error::Error;

/// A block as passed to [`ProtoArray::on_block`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ProtoBlock {
    pub slot: Slot,
    pub root: H256,
    /// `None` for the anchor block.
    pub parent_root: Option<H256>,
    pub state_root: H256,
    pub target_root: H256,
    pub justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    pub execution_status: ExecutionStatus,
    pub execution_payload_block_hash: Option<ExecutionBlockHash>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct ProtoNode {
    pub slot: Slot,
    pub root: H256,
    pub parent_root: Option<H256>,
    pub parent: Option<usize>,
    pub state_root: H256,
    pub target_root: H256,
    pub justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    pub weight: Gwei,
    pub best_child: Option<usize>,
    pub best_descendant: Option<usize>,
    pub execution_status: ExecutionStatus,
    pub execution_payload_block_hash: Option<ExecutionBlockHash>,
}

impl ProtoNode {
    const fn new(block: ProtoBlock, parent: Option<usize>) -> Self {
        let ProtoBlock {
            slot,
            root,
            parent_root,
            state_root,
            target_root,
            justified_checkpoint,
            finalized_checkpoint,
            execution_status,
            execution_payload_block_hash,
        } = block;

        Self {
            slot,
            root,
            parent_root,
            parent,
            state_root,
            target_root,
            justified_checkpoint,
            finalized_checkpoint,
            weight: 0,
            best_child: None,
            best_descendant: None,
            execution_status,
            execution_payload_block_hash,
        }
    }
}

/// Extra weight given to a timely block for a single call to [`ProtoArray::apply_score_changes`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Constructor, Deserialize, Serialize)]
pub struct ProposerBoost {
    pub root: H256,
    pub score: Gwei,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ScoreChanges {
    /// Indexed like the nodes in the [`ProtoArray`].
    pub deltas: Vec<i64>,
    pub proposer_boost: Option<ProposerBoost>,
    pub justified_epoch: Epoch,
    pub finalized_epoch: Epoch,
}

#[derive(Clone, Default, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawProtoArray")]
pub struct ProtoArray {
    prune_threshold: usize,
    justified_epoch: Epoch,
    finalized_epoch: Epoch,
    previous_proposer_boost: Option<ProposerBoost>,
    nodes: Vec<ProtoNode>,
    #[serde(skip_serializing)]
    indices: HashedMap<H256, usize>,
}

impl ProtoArray {
    #[must_use]
    pub fn new(prune_threshold: usize, justified_epoch: Epoch, finalized_epoch: Epoch) -> Self {
        Self {
            prune_threshold,
            justified_epoch,
            finalized_epoch,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn nodes(&self) -> &[ProtoNode] {
        &self.nodes
    }

    #[must_use]
    pub const fn indices(&self) -> &HashedMap<H256, usize> {
        &self.indices
    }

    #[must_use]
    pub const fn prune_threshold(&self) -> usize {
        self.prune_threshold
    }

    pub fn set_prune_threshold(&mut self, prune_threshold: usize) {
        self.prune_threshold = prune_threshold;
    }

    #[must_use]
    pub const fn justified_epoch(&self) -> Epoch {
        self.justified_epoch
    }

    #[must_use]
    pub const fn finalized_epoch(&self) -> Epoch {
        self.finalized_epoch
    }

    #[must_use]
    pub const fn previous_proposer_boost(&self) -> Option<ProposerBoost> {
        self.previous_proposer_boost
    }

    #[must_use]
    pub fn contains(&self, root: H256) -> bool {
        self.indices.contains_key(&root)
    }

    #[must_use]
    pub fn node(&self, root: H256) -> Option<&ProtoNode> {
        let index = self.indices.get(&root).copied()?;
        self.nodes.get(index)
    }

    #[must_use]
    pub fn weight(&self, root: H256) -> Option<Gwei> {
        self.node(root).map(|node| node.weight)
    }

    /// Appends a block.
    ///
    /// Blocks that are already present are ignored. Weights and best descendants are not updated
    /// until the next call to [`ProtoArray::apply_score_changes`].
    pub fn on_block(&mut self, block: ProtoBlock) {
        if self.contains(block.root) {
            return;
        }

        let index = self.nodes.len();

        let parent = block
            .parent_root
            .and_then(|parent_root| self.indices.get(&parent_root).copied());

        self.nodes.push(ProtoNode::new(block, parent));
        self.indices.insert(block.root, index);
    }

    /// Applies `changes` to node weights and recomputes the best child and best descendant of
    /// every node.
    ///
    /// The proposer boost applied by the previous call is removed in the process.
    pub fn apply_score_changes(&mut self, changes: ScoreChanges) -> Result<(), Error> {
        let ScoreChanges {
            mut deltas,
            proposer_boost,
            justified_epoch,
            finalized_epoch,
        } = changes;

        if deltas.len() != self.nodes.len() {
            return Err(Error::InvalidDeltaLen {
                deltas: deltas.len(),
                nodes: self.nodes.len(),
            });
        }

        self.justified_epoch = justified_epoch;
        self.finalized_epoch = finalized_epoch;

        // Parents always precede their children,
        // so iterating backwards propagates deltas all the way up in a single pass.
        for index in (0..self.nodes.len()).rev() {
            let node = self
                .nodes
                .get_mut(index)
                .ok_or(Error::InvalidNodeIndex { index })?;

            let mut node_delta = deltas
                .get(index)
                .copied()
                .ok_or(Error::InvalidNodeIndex { index })?;

            if let Some(boost) = proposer_boost.filter(|boost| boost.root == node.root) {
                node_delta = i64::try_from(boost.score)
                    .ok()
                    .and_then(|score| node_delta.checked_add(score))
                    .ok_or(Error::DeltaOverflow { index })?;
            }

            if let Some(boost) = self
                .previous_proposer_boost
                .filter(|boost| boost.root == node.root)
            {
                node_delta = i64::try_from(boost.score)
                    .ok()
                    .and_then(|score| node_delta.checked_sub(score))
                    .ok_or(Error::DeltaOverflow { index })?;
            }

            node.weight = match node.weight.checked_add_signed(node_delta) {
                Some(weight) => weight,
                None if node_delta < 0 => return Err(Error::InvalidNodeDelta { index }),
                None => return Err(Error::DeltaOverflow { index }),
            };

            if let Some(parent_index) = node.parent {
                let parent_delta = deltas
                    .get_mut(parent_index)
                    .ok_or(Error::InvalidNodeIndex { index: parent_index })?;

                *parent_delta = parent_delta
                    .checked_add(node_delta)
                    .ok_or(Error::DeltaOverflow { index: parent_index })?;
            }
        }

        // Best children must be chosen after all weights are final.
        // Comparing a node against a sibling with a stale weight could pick the wrong child.
        for index in (0..self.nodes.len()).rev() {
            let parent = self
                .nodes
                .get(index)
                .ok_or(Error::InvalidNodeIndex { index })?
                .parent;

            if let Some(parent_index) = parent {
                self.maybe_update_best_child_and_descendant(parent_index, index)?;
            }
        }

        self.previous_proposer_boost = proposer_boost;

        Ok(())
    }

    /// Returns the root of the best descendant of the justified block.
    ///
    /// The result is only meaningful after [`ProtoArray::apply_score_changes`].
    pub fn find_head(&self, justified_root: H256) -> Result<H256, Error> {
        let justified_index = self
            .indices
            .get(&justified_root)
            .copied()
            .ok_or(Error::JustifiedNodeUnknown {
                root: justified_root,
            })?;

        let justified_node = self.node_at(justified_index)?;
        let best_descendant_index = justified_node.best_descendant.unwrap_or(justified_index);
        let best_node = self.node_at(best_descendant_index)?;

        if !self.node_is_viable_for_head(best_node) {
            return Err(Error::InvalidBestNode {
                root: best_node.root,
            });
        }

        Ok(best_node.root)
    }

    /// Removes all blocks before the finalized block if there are at least
    /// [`ProtoArray::prune_threshold`] of them.
    ///
    /// Returns the removed nodes.
    pub fn maybe_prune(&mut self, finalized_root: H256) -> Result<Vec<ProtoNode>, Error> {
        let finalized_index = self
            .indices
            .get(&finalized_root)
            .copied()
            .ok_or(Error::FinalizedNodeUnknown {
                root: finalized_root,
            })?;

        if finalized_index < self.prune_threshold {
            return Ok(vec![]);
        }

        let kept = self.nodes.split_off(finalized_index);
        let removed = core::mem::replace(&mut self.nodes, kept);

        for node in &removed {
            self.indices.remove(&node.root);
        }

        for index in self.indices.values_mut() {
            *index = index
                .checked_sub(finalized_index)
                .ok_or(Error::InvalidNodeIndex { index: *index })?;
        }

        for node in &mut self.nodes {
            // Blocks that do not descend from the finalized block lose their parent here.
            node.parent = node
                .parent
                .and_then(|parent| parent.checked_sub(finalized_index));

            if let Some(best_child) = node.best_child {
                node.best_child = Some(
                    best_child
                        .checked_sub(finalized_index)
                        .ok_or(Error::InvalidNodeIndex { index: best_child })?,
                );
            }

            if let Some(best_descendant) = node.best_descendant {
                node.best_descendant = Some(
                    best_descendant
                        .checked_sub(finalized_index)
                        .ok_or(Error::InvalidNodeIndex {
                            index: best_descendant,
                        })?,
                );
            }
        }

        if !removed.is_empty() {
            debug!(
                "pruned {} blocks from proto-array (finalized root: {finalized_root:?})",
                removed.len(),
            );
        }

        Ok(removed)
    }

    /// Iterates over the block with `root` and its ancestors, newest first.
    pub fn iter_nodes(&self, root: H256) -> impl Iterator<Item = &ProtoNode> {
        iter::successors(self.node(root), |node| self.parent(node))
    }

    /// Returns the root of the ancestor of `root` at `slot`.
    ///
    /// Skipped slots resolve to the most recent block before them.
    /// Returns `None` if the chain is pruned before `slot`.
    pub fn ancestor(&self, root: H256, slot: Slot) -> Result<Option<H256>, Error> {
        if !self.contains(root) {
            return Err(Error::NodeUnknown { root });
        }

        Ok(self
            .iter_nodes(root)
            .find(|node| node.slot <= slot)
            .map(|node| node.root))
    }

    /// Returns `true` if `descendant_root` is `ancestor_root` or one of its descendants.
    #[must_use]
    pub fn is_descendant(&self, ancestor_root: H256, descendant_root: H256) -> bool {
        let Some(ancestor) = self.node(ancestor_root) else {
            return false;
        };

        self.iter_nodes(descendant_root)
            .take_while(|node| node.slot >= ancestor.slot)
            .any(|node| node.root == ancestor_root)
    }

    #[must_use]
    pub fn common_ancestor(&self, root_a: H256, root_b: H256) -> Option<H256> {
        let mut node_a = self.node(root_a)?;
        let mut node_b = self.node(root_b)?;

        loop {
            if node_a.root == node_b.root {
                return Some(node_a.root);
            }

            match node_a.slot.cmp(&node_b.slot) {
                Ordering::Greater => node_a = self.parent(node_a)?,
                Ordering::Less => node_b = self.parent(node_b)?,
                Ordering::Equal => {
                    node_a = self.parent(node_a)?;
                    node_b = self.parent(node_b)?;
                }
            }
        }
    }

    /// Marks the block with `root` and all of its optimistically imported ancestors as valid.
    pub fn validate_execution_status(&mut self, root: H256) -> Result<(), Error> {
        let mut index = self.index_of(root)?;

        loop {
            let node = self.node_at_mut(index)?;

            match node.execution_status {
                ExecutionStatus::Syncing => node.execution_status = ExecutionStatus::Valid,
                ExecutionStatus::Valid | ExecutionStatus::PreMerge => break,
                ExecutionStatus::Invalid => {
                    return Err(Error::InvalidExecutionStatusTransition {
                        root: node.root,
                        from: ExecutionStatus::Invalid,
                        to: ExecutionStatus::Valid,
                    })
                }
            }

            match node.parent {
                Some(parent_index) => index = parent_index,
                None => break,
            }
        }

        Ok(())
    }

    /// Marks the block with `root` and all of its descendants as invalid.
    ///
    /// Invalid blocks are never viable for head.
    /// Returns the roots of the blocks that were invalidated.
    pub fn invalidate_execution_status(&mut self, root: H256) -> Result<Vec<H256>, Error> {
        let start_index = self.index_of(root)?;
        let start_node = self.node_at_mut(start_index)?;

        match start_node.execution_status {
            ExecutionStatus::Syncing => start_node.execution_status = ExecutionStatus::Invalid,
            ExecutionStatus::Invalid => return Ok(vec![]),
            from @ (ExecutionStatus::Valid | ExecutionStatus::PreMerge) => {
                return Err(Error::InvalidExecutionStatusTransition {
                    root,
                    from,
                    to: ExecutionStatus::Invalid,
                })
            }
        }

        let mut invalidated = vec![root];

        for index in start_index + 1..self.nodes.len() {
            let node = self.node_at(index)?;

            let Some(parent_index) = node.parent else {
                continue;
            };

            if parent_index < start_index {
                continue;
            }

            if !self.node_at(parent_index)?.execution_status.is_invalid() {
                continue;
            }

            let node = self.node_at_mut(index)?;

            match node.execution_status {
                ExecutionStatus::Syncing => {
                    node.execution_status = ExecutionStatus::Invalid;
                    invalidated.push(node.root);
                }
                ExecutionStatus::Invalid => {}
                from @ (ExecutionStatus::Valid | ExecutionStatus::PreMerge) => {
                    return Err(Error::InvalidExecutionStatusTransition {
                        root: node.root,
                        from,
                        to: ExecutionStatus::Invalid,
                    })
                }
            }
        }

        warn!(
            "invalidated {} blocks descending from {root:?}",
            invalidated.len(),
        );

        Ok(invalidated)
    }

    fn maybe_update_best_child_and_descendant(
        &mut self,
        parent_index: usize,
        child_index: usize,
    ) -> Result<(), Error> {
        let child = self.node_at(child_index)?;
        let parent = self.node_at(parent_index)?;

        let child_leads_to_viable_head = self.node_leads_to_viable_head(child)?;

        let change_to_none = (None, None);
        let change_to_child = (
            Some(child_index),
            Some(child.best_descendant.unwrap_or(child_index)),
        );
        let no_change = (parent.best_child, parent.best_descendant);

        let (best_child, best_descendant) = match parent.best_child {
            Some(best_child_index) if best_child_index == child_index => {
                if child_leads_to_viable_head {
                    change_to_child
                } else {
                    change_to_none
                }
            }
            Some(best_child_index) => {
                let best_child = self.node_at(best_child_index)?;
                let best_child_leads_to_viable_head = self.node_leads_to_viable_head(best_child)?;

                match (child_leads_to_viable_head, best_child_leads_to_viable_head) {
                    (true, false) => change_to_child,
                    (false, true) => no_change,
                    _ => match child.weight.cmp(&best_child.weight) {
                        // Ties are broken in favor of the greater root.
                        // `H256` compares bytes, which matches comparing lowercase hex strings.
                        Ordering::Equal if child.root >= best_child.root => change_to_child,
                        Ordering::Greater => change_to_child,
                        Ordering::Equal | Ordering::Less => no_change,
                    },
                }
            }
            None if child_leads_to_viable_head => change_to_child,
            None => no_change,
        };

        let parent = self.node_at_mut(parent_index)?;

        parent.best_child = best_child;
        parent.best_descendant = best_descendant;

        Ok(())
    }

    fn node_leads_to_viable_head(&self, node: &ProtoNode) -> Result<bool, Error> {
        let best_descendant_is_viable_for_head = match node.best_descendant {
            Some(index) => self.node_is_viable_for_head(self.node_at(index)?),
            None => false,
        };

        Ok(best_descendant_is_viable_for_head || self.node_is_viable_for_head(node))
    }

    fn node_is_viable_for_head(&self, node: &ProtoNode) -> bool {
        if node.execution_status.is_invalid() {
            return false;
        }

        let justified_matches = node.justified_checkpoint.epoch == self.justified_epoch
            || self.justified_epoch == GENESIS_EPOCH;

        let finalized_matches = node.finalized_checkpoint.epoch == self.finalized_epoch
            || self.finalized_epoch == GENESIS_EPOCH;

        justified_matches && finalized_matches
    }

    fn parent(&self, node: &ProtoNode) -> Option<&ProtoNode> {
        self.nodes.get(node.parent?)
    }

    fn index_of(&self, root: H256) -> Result<usize, Error> {
        self.indices
            .get(&root)
            .copied()
            .ok_or(Error::NodeUnknown { root })
    }

    fn node_at(&self, index: usize) -> Result<&ProtoNode, Error> {
        self.nodes.get(index).ok_or(Error::InvalidNodeIndex { index })
    }

    fn node_at_mut(&mut self, index: usize) -> Result<&mut ProtoNode, Error> {
        self.nodes
            .get_mut(index)
            .ok_or(Error::InvalidNodeIndex { index })
    }
}

// `indices` is derived from `nodes` and is not serialized.
#[derive(Deserialize)]
struct RawProtoArray {
    prune_threshold: usize,
    justified_epoch: Epoch,
    finalized_epoch: Epoch,
    previous_proposer_boost: Option<ProposerBoost>,
    nodes: Vec<ProtoNode>,
}

impl TryFrom<RawProtoArray> for ProtoArray {
    type Error = Error;

    fn try_from(raw: RawProtoArray) -> Result<Self, Self::Error> {
        let RawProtoArray {
            prune_threshold,
            justified_epoch,
            finalized_epoch,
            previous_proposer_boost,
            nodes,
        } = raw;

        let mut indices = HashedMap::default();

        for (index, node) in nodes.iter().enumerate() {
            let links = [node.parent, node.best_child, node.best_descendant];

            let out_of_bounds = links.into_iter().flatten().find(|link| *link >= nodes.len());

            if let Some(invalid_index) = out_of_bounds {
                return Err(Error::InvalidNodeIndex {
                    index: invalid_index,
                });
            }

            if node.parent.is_some_and(|parent| parent >= index) {
                return Err(Error::InvalidNodeIndex { index });
            }

            indices.insert(node.root, index);
        }

        Ok(Self {
            prune_threshold,
            justified_epoch,
            finalized_epoch,
            previous_proposer_boost,
            nodes,
            indices,
        })
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn root(byte: u8) -> H256 {
        H256::repeat_byte(byte)
    }

    fn checkpoint(epoch: Epoch) -> Checkpoint {
        Checkpoint {
            epoch,
            root: root(0),
        }
    }

    fn block(slot: Slot, block_root: H256, parent_root: Option<H256>) -> ProtoBlock {
        block_with_checkpoints(slot, block_root, parent_root, 1, 1)
    }

    fn block_with_checkpoints(
        slot: Slot,
        block_root: H256,
        parent_root: Option<H256>,
        justified_epoch: Epoch,
        finalized_epoch: Epoch,
    ) -> ProtoBlock {
        ProtoBlock {
            slot,
            root: block_root,
            parent_root,
            state_root: H256::zero(),
            target_root: block_root,
            justified_checkpoint: checkpoint(justified_epoch),
            finalized_checkpoint: checkpoint(finalized_epoch),
            execution_status: ExecutionStatus::Syncing,
            execution_payload_block_hash: Some(block_root),
        }
    }

    // Anchor at slot 32 with checkpoints in epoch 1 so that viability is actually checked.
    fn proto_array_with_anchor(prune_threshold: usize) -> ProtoArray {
        let mut proto_array = ProtoArray::new(prune_threshold, 1, 1);
        proto_array.on_block(block(32, root(1), None));
        proto_array
    }

    fn apply(proto_array: &mut ProtoArray, deltas: Vec<i64>) -> Result<(), Error> {
        apply_with_boost(proto_array, deltas, None)
    }

    fn apply_with_boost(
        proto_array: &mut ProtoArray,
        deltas: Vec<i64>,
        proposer_boost: Option<ProposerBoost>,
    ) -> Result<(), Error> {
        proto_array.apply_score_changes(ScoreChanges {
            deltas,
            proposer_boost,
            justified_epoch: 1,
            finalized_epoch: 1,
        })
    }

    fn zero_deltas(proto_array: &ProtoArray) -> Vec<i64> {
        vec![0; proto_array.len()]
    }

    #[test]
    fn find_head_of_anchor_only() -> Result<(), Error> {
        let mut proto_array = proto_array_with_anchor(0);

        apply(&mut proto_array, vec![0])?;

        assert_eq!(proto_array.find_head(root(1))?, root(1));

        Ok(())
    }

    #[test]
    fn new_block_becomes_head_after_score_changes() -> Result<(), Error> {
        let mut proto_array = proto_array_with_anchor(0);

        proto_array.on_block(block(33, root(2), Some(root(1))));

        // No work is done on insertion.
        assert_eq!(proto_array.node(root(1)).and_then(|node| node.best_child), None);

        let deltas = zero_deltas(&proto_array);
        apply(&mut proto_array, deltas)?;

        assert_eq!(proto_array.find_head(root(1))?, root(2));

        Ok(())
    }

    #[test]
    fn duplicate_blocks_are_ignored() {
        let mut proto_array = proto_array_with_anchor(0);

        proto_array.on_block(block(33, root(2), Some(root(1))));
        proto_array.on_block(block(34, root(2), Some(root(1))));

        assert_eq!(proto_array.len(), 2);
        assert_eq!(proto_array.node(root(2)).map(|node| node.slot), Some(33));
    }

    // Equal weights are resolved in favor of the greater root regardless of insertion order.
    #[test_case(root(2), root(3) => root(3))]
    #[test_case(root(3), root(2) => root(3))]
    #[test_case(root(0xa0), root(0x0a) => root(0xa0))]
    fn tie_break_prefers_greater_root(first: H256, second: H256) -> H256 {
        let mut proto_array = proto_array_with_anchor(0);

        proto_array.on_block(block(33, first, Some(root(1))));
        proto_array.on_block(block(33, second, Some(root(1))));

        apply(&mut proto_array, vec![0, 5, 5]).expect("deltas are valid");

        proto_array.find_head(root(1)).expect("anchor is viable")
    }

    #[test]
    fn heavier_branch_wins_and_weights_propagate() -> Result<(), Error> {
        let mut proto_array = proto_array_with_anchor(0);

        // 1 ← 2 ← 4
        //   ↖ 3
        proto_array.on_block(block(33, root(2), Some(root(1))));
        proto_array.on_block(block(33, root(3), Some(root(1))));
        proto_array.on_block(block(34, root(4), Some(root(2))));

        apply(&mut proto_array, vec![0, 0, 5, 7])?;

        assert_eq!(proto_array.find_head(root(1))?, root(4));
        assert_eq!(proto_array.weight(root(4)), Some(7));
        assert_eq!(proto_array.weight(root(2)), Some(7));
        assert_eq!(proto_array.weight(root(3)), Some(5));
        assert_eq!(proto_array.weight(root(1)), Some(12));

        apply(&mut proto_array, vec![0, 0, 0, 4])?;

        assert_eq!(proto_array.find_head(root(1))?, root(4));
        assert_eq!(proto_array.weight(root(2)), Some(11));
        assert_eq!(proto_array.weight(root(1)), Some(16));

        apply(&mut proto_array, vec![0, 0, 2, -11])?;

        assert_eq!(proto_array.find_head(root(1))?, root(3));
        assert_eq!(proto_array.weight(root(2)), Some(0));

        Ok(())
    }

    #[test]
    fn best_child_is_chosen_from_final_weights() -> Result<(), Error> {
        let mut proto_array = proto_array_with_anchor(0);

        proto_array.on_block(block(33, root(2), Some(root(1))));
        proto_array.on_block(block(33, root(3), Some(root(1))));

        apply(&mut proto_array, vec![0, 10, 5])?;

        assert_eq!(proto_array.find_head(root(1))?, root(2));

        // Block 3 is visited before block 2 loses its weight.
        apply(&mut proto_array, vec![0, -10, 0])?;

        assert_eq!(proto_array.find_head(root(1))?, root(3));

        Ok(())
    }

    #[test]
    fn weight_of_each_node_equals_sum_of_subtree_deltas() -> Result<(), Error> {
        let mut proto_array = proto_array_with_anchor(0);

        proto_array.on_block(block(33, root(2), Some(root(1))));
        proto_array.on_block(block(34, root(3), Some(root(2))));
        proto_array.on_block(block(34, root(4), Some(root(2))));
        proto_array.on_block(block(35, root(5), Some(root(4))));

        apply(&mut proto_array, vec![1, 2, 3, 4, 5])?;

        for node in proto_array.nodes() {
            let children_weight = proto_array
                .nodes()
                .iter()
                .filter(|child| child.parent_root == Some(node.root))
                .map(|child| child.weight)
                .sum::<Gwei>();

            let own_delta = Gwei::from(node.root.as_bytes()[0]);

            assert_eq!(node.weight, own_delta + children_weight);
        }

        Ok(())
    }

    #[test]
    fn nodes_with_mismatched_checkpoints_are_not_viable() -> Result<(), Error> {
        let mut proto_array = proto_array_with_anchor(0);

        proto_array.on_block(block_with_checkpoints(33, root(2), Some(root(1)), 0, 0));
        proto_array.on_block(block(33, root(3), Some(root(1))));

        apply(&mut proto_array, vec![0, 100, 1])?;

        assert_eq!(proto_array.find_head(root(1))?, root(3));

        // Nodes remain in the tree.
        assert_eq!(proto_array.weight(root(2)), Some(100));

        Ok(())
    }

    #[test]
    fn any_node_is_viable_while_checkpoints_are_in_genesis_epoch() -> Result<(), Error> {
        let mut proto_array = ProtoArray::new(0, 0, 0);

        proto_array.on_block(block_with_checkpoints(0, root(1), None, 0, 0));
        proto_array.on_block(block_with_checkpoints(1, root(2), Some(root(1)), 5, 3));

        proto_array.apply_score_changes(ScoreChanges {
            deltas: vec![0, 0],
            proposer_boost: None,
            justified_epoch: GENESIS_EPOCH,
            finalized_epoch: GENESIS_EPOCH,
        })?;

        assert_eq!(proto_array.find_head(root(1))?, root(2));

        Ok(())
    }

    #[test]
    fn find_head_fails_if_justified_node_is_not_viable() {
        let mut proto_array = ProtoArray::new(0, 2, 1);

        proto_array.on_block(block(32, root(1), None));

        let result = proto_array.apply_score_changes(ScoreChanges {
            deltas: vec![0],
            proposer_boost: None,
            justified_epoch: 2,
            finalized_epoch: 1,
        });

        assert_eq!(result, Ok(()));
        assert_eq!(
            proto_array.find_head(root(1)),
            Err(Error::InvalidBestNode { root: root(1) }),
        );
        assert_eq!(
            proto_array.find_head(root(9)),
            Err(Error::JustifiedNodeUnknown { root: root(9) }),
        );
    }

    #[test]
    fn proposer_boost_lasts_for_one_pass() -> Result<(), Error> {
        let mut proto_array = proto_array_with_anchor(0);

        proto_array.on_block(block(33, root(2), Some(root(1))));
        proto_array.on_block(block(33, root(3), Some(root(1))));

        apply(&mut proto_array, vec![0, 10, 0])?;

        assert_eq!(proto_array.find_head(root(1))?, root(2));

        let boost = ProposerBoost::new(root(3), 50);

        apply_with_boost(&mut proto_array, vec![0, 0, 0], Some(boost))?;

        assert_eq!(proto_array.find_head(root(1))?, root(3));
        assert_eq!(proto_array.weight(root(3)), Some(50));
        assert_eq!(proto_array.weight(root(1)), Some(60));
        assert_eq!(proto_array.previous_proposer_boost(), Some(boost));

        apply(&mut proto_array, vec![0, 0, 0])?;

        assert_eq!(proto_array.find_head(root(1))?, root(2));
        assert_eq!(proto_array.weight(root(3)), Some(0));
        assert_eq!(proto_array.weight(root(1)), Some(10));
        assert_eq!(proto_array.previous_proposer_boost(), None);

        Ok(())
    }

    #[test]
    fn invalid_delta_len_is_rejected() {
        let mut proto_array = proto_array_with_anchor(0);

        assert_eq!(
            apply(&mut proto_array, vec![0, 0]),
            Err(Error::InvalidDeltaLen {
                deltas: 2,
                nodes: 1,
            }),
        );
    }

    #[test]
    fn negative_weight_is_rejected() {
        let mut proto_array = proto_array_with_anchor(0);

        assert_eq!(
            apply(&mut proto_array, vec![-1]),
            Err(Error::InvalidNodeDelta { index: 0 }),
        );
    }

    fn chain_of(length: u8) -> ProtoArray {
        let mut proto_array = proto_array_with_anchor(0);

        for byte in 2..=length {
            proto_array.on_block(block(
                31 + u64::from(byte),
                root(byte),
                Some(root(byte - 1)),
            ));
        }

        proto_array
    }

    #[test]
    fn maybe_prune_respects_threshold() -> Result<(), Error> {
        let mut proto_array = chain_of(5);

        proto_array.set_prune_threshold(4);

        assert_eq!(proto_array.maybe_prune(root(4))?, vec![]);
        assert_eq!(proto_array.len(), 5);

        proto_array.set_prune_threshold(3);

        let removed = proto_array.maybe_prune(root(4))?;

        assert_eq!(
            removed.iter().map(|node| node.root).collect::<Vec<_>>(),
            [root(1), root(2), root(3)],
        );
        assert_eq!(proto_array.len(), 2);
        assert!(!proto_array.contains(root(3)));

        Ok(())
    }

    #[test]
    fn maybe_prune_remaps_indices() -> Result<(), Error> {
        let mut proto_array = chain_of(4);

        // Branch off the soon to be pruned block 2.
        proto_array.on_block(block(34, root(9), Some(root(2))));

        apply(&mut proto_array, vec![0, 0, 0, 3, 1])?;

        assert_eq!(proto_array.find_head(root(1))?, root(4));

        proto_array.maybe_prune(root(3))?;

        assert_eq!(proto_array.len(), 3);
        assert_eq!(proto_array.indices().get(&root(3)), Some(&0));
        assert_eq!(proto_array.indices().get(&root(4)), Some(&1));
        assert_eq!(proto_array.indices().get(&root(9)), Some(&2));

        let node_3 = proto_array.node(root(3)).copied();
        let node_4 = proto_array.node(root(4)).copied();
        let node_9 = proto_array.node(root(9)).copied();

        assert_eq!(node_3.map(|node| node.parent), Some(None));
        assert_eq!(node_3.and_then(|node| node.best_child), Some(1));
        assert_eq!(node_3.and_then(|node| node.best_descendant), Some(1));
        assert_eq!(node_4.and_then(|node| node.parent), Some(0));
        assert_eq!(node_9.map(|node| node.parent), Some(None));

        assert_eq!(proto_array.find_head(root(3))?, root(4));

        // Weights keep working after remapping.
        apply(&mut proto_array, vec![0, 2, 0])?;

        assert_eq!(proto_array.weight(root(3)), Some(5));

        Ok(())
    }

    #[test]
    fn maybe_prune_is_idempotent() -> Result<(), Error> {
        let mut proto_array = chain_of(5);

        let first = proto_array.maybe_prune(root(3))?;
        let nodes_after_first = proto_array.nodes().to_vec();
        let second = proto_array.maybe_prune(root(3))?;

        assert_eq!(first.len(), 2);
        assert_eq!(second, vec![]);
        assert_eq!(proto_array.nodes(), nodes_after_first);

        Ok(())
    }

    #[test]
    fn maybe_prune_fails_with_unknown_finalized_root() {
        let mut proto_array = chain_of(3);

        assert_eq!(
            proto_array.maybe_prune(root(7)),
            Err(Error::FinalizedNodeUnknown { root: root(7) }),
        );
    }

    // 1 (32) ← 2 (33) ← 3 (35) ← 4 (36)
    //        ↖ 5 (34)
    fn forked_proto_array() -> ProtoArray {
        let mut proto_array = proto_array_with_anchor(0);

        proto_array.on_block(block(33, root(2), Some(root(1))));
        proto_array.on_block(block(35, root(3), Some(root(2))));
        proto_array.on_block(block(36, root(4), Some(root(3))));
        proto_array.on_block(block(34, root(5), Some(root(1))));

        proto_array
    }

    #[test_case(root(4), 36 => Some(root(4)))]
    #[test_case(root(4), 35 => Some(root(3)))]
    #[test_case(root(4), 34 => Some(root(2)); "skipped slot resolves to previous block")]
    #[test_case(root(4), 32 => Some(root(1)))]
    #[test_case(root(4), 31 => None; "before anchor")]
    #[test_case(root(5), 100 => Some(root(5)); "slot after block")]
    fn ancestor(root: H256, slot: Slot) -> Option<H256> {
        forked_proto_array()
            .ancestor(root, slot)
            .expect("block is present")
    }

    #[test]
    fn ancestor_of_unknown_block_fails() {
        assert_eq!(
            forked_proto_array().ancestor(root(8), 0),
            Err(Error::NodeUnknown { root: root(8) }),
        );
    }

    #[test_case(root(1), root(4) => true)]
    #[test_case(root(2), root(4) => true)]
    #[test_case(root(4), root(4) => true; "block is its own descendant")]
    #[test_case(root(4), root(2) => false)]
    #[test_case(root(5), root(4) => false)]
    #[test_case(root(8), root(4) => false; "unknown ancestor")]
    #[test_case(root(1), root(8) => false; "unknown descendant")]
    fn is_descendant(ancestor_root: H256, descendant_root: H256) -> bool {
        forked_proto_array().is_descendant(ancestor_root, descendant_root)
    }

    #[test_case(root(4), root(5) => Some(root(1)))]
    #[test_case(root(4), root(3) => Some(root(3)))]
    #[test_case(root(3), root(4) => Some(root(3)))]
    #[test_case(root(4), root(4) => Some(root(4)))]
    #[test_case(root(4), root(8) => None)]
    fn common_ancestor(root_a: H256, root_b: H256) -> Option<H256> {
        forked_proto_array().common_ancestor(root_a, root_b)
    }

    #[test]
    fn iter_nodes_walks_to_anchor() {
        let proto_array = forked_proto_array();

        let roots = proto_array
            .iter_nodes(root(4))
            .map(|node| node.root)
            .collect::<Vec<_>>();

        assert_eq!(roots, [root(4), root(3), root(2), root(1)]);
    }

    #[test]
    fn validate_execution_status_marks_ancestors_valid() -> Result<(), Error> {
        let mut proto_array = forked_proto_array();

        proto_array.validate_execution_status(root(3))?;

        let status = |byte| proto_array.node(root(byte)).map(|node| node.execution_status);

        assert_eq!(status(1), Some(ExecutionStatus::Valid));
        assert_eq!(status(2), Some(ExecutionStatus::Valid));
        assert_eq!(status(3), Some(ExecutionStatus::Valid));
        assert_eq!(status(4), Some(ExecutionStatus::Syncing));
        assert_eq!(status(5), Some(ExecutionStatus::Syncing));

        Ok(())
    }

    #[test]
    fn invalidated_branch_loses_head() -> Result<(), Error> {
        let mut proto_array = forked_proto_array();

        apply(&mut proto_array, vec![0, 0, 0, 10, 1])?;

        assert_eq!(proto_array.find_head(root(1))?, root(4));

        let invalidated = proto_array.invalidate_execution_status(root(3))?;

        assert_eq!(invalidated, [root(3), root(4)]);

        let deltas = zero_deltas(&proto_array);
        apply(&mut proto_array, deltas)?;

        // Block 2 keeps the weight of its invalidated subtree but becomes a leaf.
        assert_eq!(proto_array.find_head(root(1))?, root(2));

        assert_eq!(
            proto_array.validate_execution_status(root(4)),
            Err(Error::InvalidExecutionStatusTransition {
                root: root(4),
                from: ExecutionStatus::Invalid,
                to: ExecutionStatus::Valid,
            }),
        );

        Ok(())
    }

    #[test]
    fn valid_blocks_cannot_be_invalidated() -> Result<(), Error> {
        let mut proto_array = forked_proto_array();

        proto_array.validate_execution_status(root(2))?;

        assert_eq!(
            proto_array.invalidate_execution_status(root(2)),
            Err(Error::InvalidExecutionStatusTransition {
                root: root(2),
                from: ExecutionStatus::Valid,
                to: ExecutionStatus::Invalid,
            }),
        );

        Ok(())
    }

    #[test]
    fn deserialization_rebuilds_indices() -> Result<(), Box<dyn core::error::Error>> {
        let mut proto_array = forked_proto_array();

        apply(&mut proto_array, vec![0, 0, 0, 10, 1])?;

        let json = serde_json::to_string(&proto_array)?;

        assert!(!json.contains("indices"));

        let restored = serde_json::from_str::<ProtoArray>(&json)?;

        assert_eq!(restored.nodes(), proto_array.nodes());
        assert_eq!(restored.indices(), proto_array.indices());
        assert_eq!(restored.find_head(root(1))?, root(4));

        Ok(())
    }

    #[test]
    fn deserialization_rejects_dangling_links() -> Result<(), serde_json::Error> {
        let mut proto_array = chain_of(2);

        proto_array.on_block(block(40, root(3), Some(root(2))));

        let mut json = serde_json::to_value(&proto_array)?;

        json["nodes"][2]["parent"] = serde_json::json!(7);

        assert!(serde_json::from_value::<ProtoArray>(json).is_err());

        Ok(())
    }
}
