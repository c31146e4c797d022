use std::path::Path;

use subreward_chain::{AccountName, SigningKey};

use crate::types::*;

/// Everything a reward run needs to know up front.
///
/// Field aliases accept the key names of the historical `config.json`
/// (`wif`, `minrep`, `message`, `websocket`).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RewardConfig {
    /// Account whose followers are rewarded and whose balance is paid out.
    pub account: AccountName,
    /// Active key handed to the signing gateway. Only needed to broadcast.
    #[serde(default, alias = "wif")]
    pub signing_key: Option<SigningKey>,
    /// Share of the balance split among eligible subscribers.
    #[serde(default = "default_percentage")]
    pub percentage: u32,
    /// Share of the balance paid to `owner`.
    #[serde(default)]
    pub owner_percentage: u32,
    #[serde(default)]
    pub owner: Option<AccountName>,
    /// Reputation floor on the human scale (25 is a fresh account).
    #[serde(default, alias = "minrep")]
    pub min_reputation: f64,
    /// Account name patterns that are never paid (`*` and `?` wildcards).
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Memo attached to every transfer.
    #[serde(default, alias = "message")]
    pub memo: String,
    /// Chain node URL.
    #[serde(alias = "websocket")]
    pub endpoint: String,
    /// Signing gateway URL; defaults to `endpoint`.
    #[serde(default)]
    pub broadcast_endpoint: Option<String>,
    #[serde(default = "default_activity_days")]
    pub activity_days: u32,
    /// Count the subscriber's own posts and comments as activity.
    #[serde(default)]
    pub count_authored_posts: bool,
    #[serde(default = "default_report_id")]
    pub report_id: String,
}

fn default_percentage() -> u32 {
    DEFAULT_PERCENTAGE
}

fn default_activity_days() -> u32 {
    DEFAULT_ACTIVITY_DAYS
}

fn default_report_id() -> String {
    DEFAULT_REPORT_ID.to_string()
}

impl RewardConfig {
    /// Load a config file. `.toml` files are read as TOML, anything else as JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let config = if is_toml {
            toml::from_str(&contents)?
        } else {
            serde_json::from_str(&contents)?
        };
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Check the invariants that must hold before any remote call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account.trim().is_empty() {
            return Err(ConfigError::EmptyAccount);
        }

        if self.percentage.saturating_add(self.owner_percentage) > 100 {
            return Err(ConfigError::InvalidPercentage {
                percentage: self.percentage,
                owner_percentage: self.owner_percentage,
            });
        }

        let has_owner = self.owner.as_deref().is_some_and(|o| !o.trim().is_empty());
        if self.owner_percentage > 0 && !has_owner {
            return Err(ConfigError::MissingOwner(self.owner_percentage));
        }

        if self.activity_days == 0 {
            return Err(ConfigError::ZeroActivityDays);
        }

        if let Some(index) = self.blacklist.iter().position(|p| p.trim().is_empty()) {
            return Err(ConfigError::EmptyBlacklistPattern { index });
        }

        Ok(())
    }

    /// Additional checks for live mode.
    pub fn validate_for_broadcast(&self) -> Result<(), ConfigError> {
        self.validate()?;
        match &self.signing_key {
            Some(key) if !key.is_empty() => Ok(()),
            _ => Err(ConfigError::MissingSigningKey),
        }
    }

    /// Where broadcasts go.
    pub fn broadcast_endpoint(&self) -> &str {
        self.broadcast_endpoint.as_deref().unwrap_or(&self.endpoint)
    }

    /// A minimal valid configuration for `account`, used by tests and tooling.
    pub fn for_account(account: &str, endpoint: &str) -> Self {
        Self {
            account: account.to_string(),
            signing_key: None,
            percentage: DEFAULT_PERCENTAGE,
            owner_percentage: 0,
            owner: None,
            min_reputation: 0.0,
            blacklist: Vec::new(),
            memo: String::new(),
            endpoint: endpoint.to_string(),
            broadcast_endpoint: None,
            activity_days: DEFAULT_ACTIVITY_DAYS,
            count_authored_posts: false,
            report_id: DEFAULT_REPORT_ID.to_string(),
        }
    }
}
