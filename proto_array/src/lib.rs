//! A proto-array implementation of LMD-GHOST.
//!
//! Blocks are stored in a flat [`Vec`] in insertion order. Parents always precede their children,
//! so weights can be propagated to ancestors with a single backward scan instead of a tree walk.
//! Votes are tracked separately in a [`VoteTable`] and turned into per-node deltas by
//! [`compute_deltas`].

pub use crate::{
    error::Error,
    proto_array::{ProposerBoost, ProtoArray, ProtoBlock, ProtoNode, ScoreChanges},
    votes::{compute_deltas, VoteTable, VoteTracker},
};

mod error;
mod proto_array;
mod votes;
