//! Conversion between wall clock time and beacon chain time.
//!
//! Fork choice is driven by slots, but proposer boost depends on when a block arrives within its
//! slot. A slot is divided into [`INTERVALS_PER_SLOT`] intervals.

use core::time::Duration;

use helper_functions::misc;
use types::{
    config::Config,
    phase0::{
        consts::INTERVALS_PER_SLOT,
        primitives::{Slot, UnixSeconds},
    },
};

/// Time elapsed between the start of `slot` and `arrival_time`.
///
/// Blocks that arrive before their slot starts have a delay of zero.
#[must_use]
pub fn block_delay(
    config: &Config,
    genesis_time: UnixSeconds,
    slot: Slot,
    arrival_time: Duration,
) -> Duration {
    let slot_start = misc::compute_timestamp_at_slot(config, genesis_time, slot);
    arrival_time.saturating_sub(Duration::from_secs(slot_start))
}

/// Length of the interval at the start of each slot in which blocks are considered timely.
#[must_use]
pub fn interval_duration(config: &Config) -> Duration {
    slot_duration(config) / interval_count()
}

#[must_use]
pub const fn slot_duration(config: &Config) -> Duration {
    Duration::from_secs(config.seconds_per_slot.get())
}

fn interval_count() -> u32 {
    INTERVALS_PER_SLOT
        .get()
        .try_into()
        .expect("number of intervals per slot fits in u32")
}
