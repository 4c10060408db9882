use core::num::NonZeroU64;
use std::borrow::Cow;

use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use thiserror::Error;

use crate::{
    bellatrix::primitives::Difficulty,
    phase0::primitives::{Epoch, ExecutionBlockHash, H256},
    preset::PresetName,
};

/// Configuration variables customizable at runtime.
///
/// See [configurations in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/aac851f860fa384916f62027b2dbe3318a354c5b/configs).
///
/// Integers may be written either natively or as strings, as they are in the YAML files
/// published with `consensus-specs`.
#[expect(
    clippy::unsafe_derive_deserialize,
    reason = "A false positive triggered by `nonzero!`. \
              `Config` has no invariants. It is intended to be deserialized from user input. \
              The `unsafe` block in `nonzero!` only operates on the literal passed to it."
)]
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,
    pub preset_base: PresetName,

    // Time parameters
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub seconds_per_slot: NonZeroU64,

    // Fork choice
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub proposer_score_boost: u64,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub safe_slots_to_update_justified: u64,

    // Transition
    #[serde(with = "decimal_difficulty")]
    pub terminal_total_difficulty: Difficulty,
    pub terminal_block_hash: ExecutionBlockHash,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub terminal_block_hash_activation_epoch: Epoch,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Meta
            //
            // Use `default` as the default `config_name` and override it in `Config::mainnet`.
            // This way custom network data will be kept separate from mainnet data if a user
            // forgets to specify a custom `CONFIG_NAME`.
            config_name: Cow::Borrowed("default"),
            preset_base: PresetName::Mainnet,

            // Time parameters
            seconds_per_slot: nonzero!(12_u64),

            // Fork choice
            proposer_score_boost: 40,
            safe_slots_to_update_justified: 8,

            // Transition
            terminal_total_difficulty: Difficulty::MAX - Difficulty::from(1023),
            terminal_block_hash: H256::zero(),
            terminal_block_hash_activation_epoch: Epoch::MAX,
        }
    }
}

impl Config {
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            // Meta
            config_name: Cow::Borrowed("mainnet"),

            // Transition
            terminal_total_difficulty: Difficulty::from(58_750_000_000_000_000_000_000_u128),

            ..Self::default()
        }
    }

    #[must_use]
    pub fn minimal() -> Self {
        Self {
            // Meta
            config_name: Cow::Borrowed("minimal"),
            preset_base: PresetName::Minimal,

            // Time parameters
            seconds_per_slot: nonzero!(6_u64),

            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.config_name.is_empty() {
            return Err(Error::NameEmpty);
        }

        // See <https://github.com/ethereum/consensus-specs/blob/aac851f860fa384916f62027b2dbe3318a354c5b/configs/mainnet.yaml#L10>.
        for character in self.config_name.chars() {
            if !matches!(character, 'a'..='z' | '0'..='9' | '-') {
                return Err(Error::NameContainsIllegalCharacters);
            }
        }

        if self.proposer_score_boost > 100 {
            return Err(Error::ProposerScoreBoostTooLarge {
                proposer_score_boost: self.proposer_score_boost,
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn terminal_block_hash_override(&self) -> Option<ExecutionBlockHash> {
        (!self.terminal_block_hash.is_zero()).then_some(self.terminal_block_hash)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration name is empty")]
    NameEmpty,
    #[error("configuration name contains illegal characters")]
    NameContainsIllegalCharacters,
    #[error("PROPOSER_SCORE_BOOST is a percentage and cannot exceed 100: {proposer_score_boost}")]
    ProposerScoreBoostTooLarge { proposer_score_boost: u64 },
}

// `ethereum_types::U256` implements `FromStr` with hexadecimal digits,
// but total difficulties are written in decimal in configuration files.
mod decimal_difficulty {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use crate::bellatrix::primitives::Difficulty;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNative {
        Native(u64),
        String(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Difficulty, D::Error> {
        match StringOrNative::deserialize(deserializer)? {
            StringOrNative::Native(number) => Ok(number.into()),
            StringOrNative::String(string) => {
                Difficulty::from_dec_str(&string).map_err(D::Error::custom)
            }
        }
    }

    pub fn serialize<S: Serializer>(
        difficulty: &Difficulty,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_str(difficulty)
    }
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Refactoring worsens readability, which is more important in tests."
)]
