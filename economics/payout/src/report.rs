use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subreward_chain::{AccountName, BroadcastMode, Broadcaster, CustomDataOperation};

use crate::plan::PayoutPlan;
use crate::retry::{retry_fixed, RetryPolicy};
use crate::types::*;

/// Fields of a report covered by its digest.
#[derive(Serialize)]
struct ReportBody<'a> {
    balance: &'a str,
    reward: &'a str,
    owner_fee: &'a str,
    subscribers: usize,
    fee: &'a str,
}

/// The record written once per run after the transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutReport {
    pub balance: String,
    /// Reward pool with its percentage, e.g. `80.000 GBG (80%)`.
    pub reward: String,
    /// Owner fee with its percentage, e.g. `5.000 GBG (5%)`.
    pub owner_fee: String,
    pub subscribers: usize,
    /// Amount paid to each subscriber.
    pub fee: String,
    /// Hex SHA-256 of the canonical JSON of the fields above.
    pub digest: String,
}

impl PayoutReport {
    pub fn from_plan(plan: &PayoutPlan) -> Result<Self, PayoutError> {
        let balance = plan.balance.to_string();
        let reward = format!("{} ({}%)", plan.reward_pool, plan.split.percentage());
        let owner_fee = format!("{} ({}%)", plan.owner_fee, plan.split.owner_percentage());
        let fee = plan.per_subscriber_fee.to_string();

        let body = ReportBody {
            balance: &balance,
            reward: &reward,
            owner_fee: &owner_fee,
            subscribers: plan.subscriber_count,
            fee: &fee,
        };
        let digest = hex::encode(Sha256::digest(serde_json::to_vec(&body)?));

        Ok(Self {
            balance,
            reward,
            owner_fee,
            subscribers: plan.subscriber_count,
            fee,
            digest,
        })
    }

    pub fn to_json(&self) -> Result<String, PayoutError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Submitted { attempts: u32 },
    /// Dry-run mode: the report was only logged.
    Skipped,
    GaveUp { attempts: u32 },
}

/// Writes the report as a custom-data operation signed by the target account.
///
/// Submission failures are retried per the policy and then dropped; they
/// never affect transfers already made.
pub struct ReportPersister<'a, B: ?Sized> {
    broadcaster: &'a B,
    account: AccountName,
    report_id: String,
    policy: RetryPolicy,
    mode: BroadcastMode,
}

impl<'a, B> ReportPersister<'a, B>
where
    B: Broadcaster + ?Sized,
{
    pub fn new(
        broadcaster: &'a B,
        account: impl Into<AccountName>,
        report_id: impl Into<String>,
        mode: BroadcastMode,
    ) -> Self {
        Self {
            broadcaster,
            account: account.into(),
            report_id: report_id.into(),
            policy: RetryPolicy::report(),
            mode,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn persist(&self, report: &PayoutReport) -> Result<PersistOutcome, PayoutError> {
        let json = report.to_json()?;
        if !self.mode.is_live() {
            tracing::info!(id = %self.report_id, digest = %report.digest, %json, "no broadcast, report");
            return Ok(PersistOutcome::Skipped);
        }

        let op = CustomDataOperation {
            required_auths: Vec::new(),
            required_posting_auths: vec![self.account.clone()],
            id: self.report_id.clone(),
            json,
        };

        match retry_fixed(self.policy, "report", || self.broadcaster.custom_json(&op)).await {
            Ok(((), attempts)) => {
                tracing::info!(id = %self.report_id, digest = %report.digest, attempts, "report saved");
                Ok(PersistOutcome::Submitted { attempts })
            }
            Err(exhausted) => {
                tracing::warn!(
                    id = %self.report_id,
                    attempts = exhausted.attempts,
                    error = %exhausted.last_error.cause(),
                    "could not save report, giving up"
                );
                Ok(PersistOutcome::GaveUp {
                    attempts: exhausted.attempts,
                })
            }
        }
    }
}
