use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Execution layer validity of a block as known to fork choice.
///
/// Blocks from before the merge are [`ExecutionStatus::PreMerge`].
/// Blocks imported optimistically are [`ExecutionStatus::Syncing`] until the execution engine
/// reports on them.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Debug, AsRefStr, Display, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionStatus {
    PreMerge,
    Syncing,
    Valid,
    Invalid,
}

impl ExecutionStatus {
    #[must_use]
    pub const fn is_pre_merge(self) -> bool {
        matches!(self, Self::PreMerge)
    }

    #[must_use]
    pub const fn is_optimistic(self) -> bool {
        matches!(self, Self::Syncing)
    }

    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }

    #[must_use]
    pub const fn is_invalid(self) -> bool {
        matches!(self, Self::Invalid)
    }
}
