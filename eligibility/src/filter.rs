use subreward_chain::{Account, AccountName, ChainApi};
use subreward_config::RewardConfig;

use crate::blacklist::Blacklist;
use crate::reputation;
use crate::scanner::{scan_history, ActivityRules, ActivityScanner, SCAN_WINDOW};
use crate::types::*;

/// Accounts per `get_accounts` request.
pub const ACCOUNT_BATCH_SIZE: usize = 7;

/// The gates a subscriber must pass, in evaluation order.
#[derive(Debug, Clone)]
pub struct EligibilityPolicy {
    pub blacklist: Blacklist,
    pub min_reputation: f64,
    pub rules: ActivityRules,
    /// History page size for the activity scan.
    pub scan_window: u32,
}

impl EligibilityPolicy {
    pub fn from_config(config: &RewardConfig) -> Self {
        Self {
            blacklist: Blacklist::new(config.blacklist.iter().cloned()),
            min_reputation: config.min_reputation,
            rules: ActivityRules {
                count_authored_posts: config.count_authored_posts,
            },
            scan_window: SCAN_WINDOW,
        }
    }
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self {
            blacklist: Blacklist::default(),
            min_reputation: 0.0,
            rules: ActivityRules::default(),
            scan_window: SCAN_WINDOW,
        }
    }
}

/// Reduces the subscriber list to the accounts that qualify for a payout.
///
/// Accounts are looked up in batches and checked strictly one at a time;
/// nothing runs concurrently, so request volume stays predictable.
pub struct EligibilityFilter<'a, C: ?Sized> {
    chain: &'a C,
    ctx: &'a RunContext,
    policy: EligibilityPolicy,
}

impl<'a, C> EligibilityFilter<'a, C>
where
    C: ChainApi + ?Sized,
{
    pub fn new(chain: &'a C, ctx: &'a RunContext, policy: EligibilityPolicy) -> Self {
        Self { chain, ctx, policy }
    }

    /// Filter `subscribers`. The input is sorted and deduplicated first, and
    /// eligible accounts keep that order.
    pub async fn filter(&self, subscribers: &[AccountName]) -> Result<FilterOutcome, EligibilityError> {
        let mut ordered = subscribers.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut outcome = FilterOutcome::default();
        for batch in ordered.chunks(ACCOUNT_BATCH_SIZE) {
            let accounts = self.chain.accounts(batch).await?;
            if accounts.len() != batch.len() {
                tracing::debug!(
                    requested = batch.len(),
                    returned = accounts.len(),
                    "some subscribers were not found"
                );
            }
            for account in &accounts {
                match self.check_account(account).await? {
                    Decision::Eligible => outcome.eligible.push(account.name.clone()),
                    Decision::Rejected(reason) => {
                        outcome.rejected.push((account.name.clone(), reason))
                    }
                }
            }
        }

        tracing::info!(
            checked = ordered.len(),
            eligible = outcome.eligible.len(),
            rejected = outcome.rejected.len(),
            "subscriber filtering done"
        );
        Ok(outcome)
    }

    /// Run the gates for one account, stopping at the first rejection.
    pub async fn check_account(&self, account: &Account) -> Result<Decision, EligibilityError> {
        let name = account.name.as_str();

        if let Some(pattern) = self.policy.blacklist.matching_pattern(name) {
            tracing::info!(account = %name, %pattern, "BLACKLIST");
            return Ok(Decision::Rejected(RejectReason::Blacklisted {
                pattern: pattern.to_string(),
            }));
        }

        // Accounts without a reputation value have no score and pass the floor.
        if let Some(score) = reputation::score(account.reputation.as_deref()) {
            if score < self.policy.min_reputation {
                tracing::info!(account = %name, score = %format!("{score:.2}"), "LOWREP");
                return Ok(Decision::Rejected(RejectReason::LowReputation { score }));
            }
        }

        let scanner = ActivityScanner::new(name, self.ctx.horizon, self.policy.rules);
        let scan = scan_history(self.chain, &scanner, self.policy.scan_window).await?;
        if !scan.found() {
            tracing::info!(account = %name, aborted = scan.aborted, "NOACTIVITY");
            return Ok(Decision::Rejected(RejectReason::Inactive));
        }

        tracing::debug!(account = %name, pages = scan.pages, "eligible");
        Ok(Decision::Eligible)
    }
}
