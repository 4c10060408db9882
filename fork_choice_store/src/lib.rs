//! Checkpoint and time bookkeeping for fork choice.
//!
//! [`ForkChoiceStore`] is the only place where the justified, finalized and best justified
//! checkpoints can change. Every setter returns the checkpoint it replaced so that callers can
//! react to the change (invalidate cached weights, notify subscribers) exactly once.
//!
//! The store knows nothing about blocks or votes. Those live in `proto_array` and are combined with
//! the store by `fork_choice_control`.

pub use crate::{
    error::Error,
    misc::{CheckpointWithHex, JustifiedBalances, QueuedAttestation},
    store::ForkChoiceStore,
    store_config::{StoreConfig, DEFAULT_PRUNE_THRESHOLD},
};

mod error;
mod misc;
mod store;
mod store_config;
