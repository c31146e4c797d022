use subreward_chain::{AccountName, Asset, ChainError};

/// Owner fees at or below this many thousandths are not worth a transfer.
pub const OWNER_FEE_THRESHOLD_MILLI: u64 = 1;

/// Errors that can occur while planning or paying out.
#[derive(Debug, thiserror::Error)]
pub enum PayoutError {
    #[error("no eligible subscribers")]
    NoSubscribers,

    #[error("reward pool {pool} is too small to pay {subscribers} subscribers")]
    FeeTooSmall { pool: Asset, subscribers: usize },

    #[error("transfer to {to} failed after {completed} successful transfers: {source}")]
    Transfer {
        to: AccountName,
        completed: usize,
        source: ChainError,
    },

    #[error("report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PayoutError {
    /// The remote error behind a failed transfer, if any.
    pub fn chain_error(&self) -> Option<&ChainError> {
        match self {
            PayoutError::Transfer { source, .. } => Some(source),
            _ => None,
        }
    }
}
