/// Default subscriber share of the balance, in percent.
pub const DEFAULT_PERCENTAGE: u32 = 80;

/// Default recency horizon, in days.
pub const DEFAULT_ACTIVITY_DAYS: u32 = 7;

/// Default custom-data id under which the run report is published.
pub const DEFAULT_REPORT_ID: &str = "subscriber_reward";

/// Configuration load or validation error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("account must not be empty")]
    EmptyAccount,

    #[error("percentage ({percentage}) + owner_percentage ({owner_percentage}) must be <= 100")]
    InvalidPercentage {
        percentage: u32,
        owner_percentage: u32,
    },

    #[error("owner_percentage is {0} but no owner account is configured")]
    MissingOwner(u32),

    #[error("activity_days must be > 0")]
    ZeroActivityDays,

    #[error("blacklist pattern at index {index} is empty")]
    EmptyBlacklistPattern { index: usize },

    #[error("signing key is required in broadcast mode")]
    MissingSigningKey,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
