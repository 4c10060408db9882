use core::time::Duration;

use types::{config::Config as ChainConfig, phase0::primitives::Gwei};

pub const DEFAULT_PRUNE_THRESHOLD: usize = 256;

/// Node-local fork choice settings.
///
/// Unlike [`ChainConfig`], these do not have to agree across the network.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct StoreConfig {
    /// Minimum number of blocks before the finalized block needed to trigger pruning.
    pub prune_threshold: usize,
    pub proposer_boost_enabled: bool,
    /// Blocks that arrive later than this into their slot are not boosted.
    /// Defaults to the first interval of a slot.
    pub proposer_boost_timely_threshold: Option<Duration>,
    /// Replaces the score derived from justified balances.
    pub proposer_boost_score_override: Option<Gwei>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            proposer_boost_enabled: true,
            proposer_boost_timely_threshold: None,
            proposer_boost_score_override: None,
        }
    }
}

impl StoreConfig {
    /// Settings that make every block eligible for pruning as soon as it is finalized.
    #[must_use]
    pub fn aggressive_pruning() -> Self {
        Self {
            prune_threshold: 0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn timely_threshold(&self, chain_config: &ChainConfig) -> Duration {
        self.proposer_boost_timely_threshold
            .unwrap_or_else(|| clock::interval_duration(chain_config))
    }
}
