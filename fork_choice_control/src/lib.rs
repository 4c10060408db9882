//! Fork choice for the beacon chain.
//!
//! [`ForkChoice`] ties together the [proto-array](proto_array), the vote table and the
//! [store](fork_choice_store). It validates blocks and attestations before passing them on and
//! decides when the justified checkpoint may change.
//!
//! State transitions and signature verification happen elsewhere. Fork choice only sees the
//! parts of a post-state described by [`PostState`].

pub use crate::{
    error::{Error, InvalidAttestation, InvalidBlock},
    fork_choice::ForkChoice,
    misc::{BlockPrecomputed, PostState},
    persistence::PersistedForkChoice,
    validations::validate_merge_block,
};

mod error;
mod fork_choice;
mod misc;
mod persistence;
mod validations;

#[cfg(test)]
mod helpers;
