use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use subreward_chain::{AccountName, BroadcastMode, ChainError};

/// Immutable facts fixed at the start of a run and shared by every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Chain head time when the run started.
    pub server_time: DateTime<Utc>,
    /// Activity older than this does not count as recent.
    pub horizon: DateTime<Utc>,
    pub mode: BroadcastMode,
}

impl RunContext {
    pub fn new(server_time: DateTime<Utc>, lookback_days: u32, mode: BroadcastMode) -> Self {
        Self {
            server_time,
            horizon: server_time - Duration::days(i64::from(lookback_days)),
            mode,
        }
    }
}

/// Why a subscriber was not paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The name matched a blacklist pattern.
    Blacklisted { pattern: String },
    /// Reputation score below the configured floor.
    LowReputation { score: f64 },
    /// No vote, reblog (or, when enabled, post) within the horizon.
    Inactive,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Blacklisted { pattern } => write!(f, "blacklisted by {pattern:?}"),
            RejectReason::LowReputation { score } => write!(f, "low reputation {score:.2}"),
            RejectReason::Inactive => write!(f, "inactive"),
        }
    }
}

/// Outcome of the gate sequence for one account.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Eligible,
    Rejected(RejectReason),
}

/// Result of filtering the whole subscriber list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOutcome {
    /// Accounts that passed every gate, in sorted traversal order.
    pub eligible: Vec<AccountName>,
    pub rejected: Vec<(AccountName, RejectReason)>,
}

/// Errors that abort eligibility evaluation for the whole run.
#[derive(Debug, thiserror::Error)]
pub enum EligibilityError {
    #[error(transparent)]
    Chain(#[from] ChainError),
}
