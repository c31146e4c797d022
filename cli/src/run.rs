//! One reward run, from the chain head snapshot to the persisted report.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use subreward_chain::{AccountName, BroadcastMode, Broadcaster, ChainApi, ChainError};
use subreward_config::{ConfigError, RewardConfig};
use subreward_eligibility::{
    collect_followers, EligibilityError, EligibilityFilter, EligibilityPolicy, RunContext,
};
use subreward_payout::{
    plan_transfers, Distribution, FeeDistributor, PayoutError, PayoutPlan, PayoutReport,
    PayoutSplit, PersistOutcome, ReportPersister, RetryPolicy,
};

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub mode: BroadcastMode,
    /// Skip the confirmation gate.
    pub assume_yes: bool,
    pub report_retry: RetryPolicy,
}

impl RunOptions {
    pub fn new(mode: BroadcastMode, assume_yes: bool) -> Self {
        Self {
            mode,
            assume_yes,
            report_retry: RetryPolicy::report(),
        }
    }
}

/// The operator's last chance to stop a run before any side effect.
#[async_trait]
pub trait Confirm: Send + Sync {
    /// Show `banner` and wait for an answer. `false` aborts the run.
    async fn confirm(&self, banner: &str) -> Result<bool, std::io::Error>;
}

/// Waits for one line on standard input. End of input aborts.
pub struct StdinConfirm;

#[async_trait]
impl Confirm for StdinConfirm {
    async fn confirm(&self, banner: &str) -> Result<bool, std::io::Error> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{banner}\npress enter to continue, ctrl-d to abort\n").as_bytes())
            .await?;
        stdout.flush().await?;

        let mut line = String::new();
        let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
        Ok(read > 0)
    }
}

#[derive(Debug)]
pub enum RunOutcome {
    /// Nobody qualified; nothing was sent.
    NoSubscribers,
    /// The operator declined at the confirmation gate.
    Aborted { plan: PayoutPlan },
    Completed {
        plan: PayoutPlan,
        distribution: Distribution,
        report: PayoutReport,
        persisted: PersistOutcome,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Eligibility(#[from] EligibilityError),

    #[error(transparent)]
    Payout(#[from] PayoutError),

    #[error("account {0} not found")]
    AccountNotFound(AccountName),

    #[error("confirmation prompt failed: {0}")]
    Prompt(#[from] std::io::Error),
}

impl RunError {
    /// Whether the run failed on its configuration, before any remote call.
    pub fn is_config(&self) -> bool {
        matches!(self, RunError::Config(_))
    }

    /// Short human-readable cause, with remote error messages trimmed.
    pub fn cause(&self) -> String {
        let chain = match self {
            RunError::Chain(err) | RunError::Eligibility(EligibilityError::Chain(err)) => Some(err),
            RunError::Payout(err) => err.chain_error(),
            _ => None,
        };
        match chain {
            Some(err) => err.cause(),
            None => self.to_string(),
        }
    }
}

/// Level used when `RUST_LOG` is not set.
pub fn log_level(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Pay the eligible followers of `config.account`.
pub async fn execute<C, B, P>(
    config: &RewardConfig,
    chain: &C,
    broadcaster: &B,
    confirm: &P,
    options: RunOptions,
) -> Result<RunOutcome, RunError>
where
    C: ChainApi + ?Sized,
    B: Broadcaster + ?Sized,
    P: Confirm + ?Sized,
{
    config.validate()?;
    let split = PayoutSplit::new(config.percentage, config.owner_percentage);

    let props = chain.dynamic_global_properties().await?;
    let ctx = RunContext::new(props.time, config.activity_days, options.mode);

    let account = chain
        .accounts(std::slice::from_ref(&config.account))
        .await?
        .into_iter()
        .find(|a| a.name == config.account)
        .ok_or_else(|| RunError::AccountNotFound(config.account.clone()))?;
    let balance = account.sbd_balance;

    tracing::info!(
        account = %config.account,
        endpoint = %config.endpoint,
        mode = ?ctx.mode,
        server_time = %ctx.server_time,
        horizon = %ctx.horizon,
        %balance,
        "starting reward run"
    );
    if !ctx.mode.is_live() {
        tracing::info!("dry run, nothing will be broadcast");
    }

    let mut followers = collect_followers(chain, &config.account).await?;
    followers.sort();
    tracing::info!(count = followers.len(), "followers collected");

    let filter = EligibilityFilter::new(chain, &ctx, EligibilityPolicy::from_config(config));
    let outcome = filter.filter(&followers).await?;
    if outcome.eligible.is_empty() {
        tracing::info!("no subscribers, no transfer");
        return Ok(RunOutcome::NoSubscribers);
    }

    let plan = PayoutPlan::compute(&balance, split, outcome.eligible.len())?;
    tracing::info!(%plan, "payout plan");

    if !options.assume_yes && !confirm.confirm(&plan.to_string()).await? {
        tracing::info!("aborted by operator");
        return Ok(RunOutcome::Aborted { plan });
    }

    let transfers = plan_transfers(
        &plan,
        &config.account,
        &outcome.eligible,
        &config.memo,
        config.owner.as_deref(),
    );
    let distribution = FeeDistributor::new(broadcaster, ctx.mode)
        .distribute(transfers)
        .await?;

    let report = PayoutReport::from_plan(&plan)?;
    let persisted = ReportPersister::new(
        broadcaster,
        config.account.clone(),
        config.report_id.clone(),
        ctx.mode,
    )
    .with_policy(options.report_retry)
    .persist(&report)
    .await?;

    Ok(RunOutcome::Completed {
        plan,
        distribution,
        report,
        persisted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_flags_select_level() {
        assert_eq!(log_level(0, false), "info");
        assert_eq!(log_level(1, false), "debug");
        assert_eq!(log_level(3, false), "trace");
        assert_eq!(log_level(2, true), "warn");
    }

    #[test]
    fn config_failures_are_classified() {
        assert!(RunError::from(ConfigError::ZeroActivityDays).is_config());
        assert!(!RunError::from(PayoutError::NoSubscribers).is_config());
        assert!(!RunError::AccountNotFound("x".to_string()).is_config());
    }

    #[test]
    fn cause_trims_remote_messages() {
        let err = RunError::from(ChainError::Rpc {
            code: 10,
            message: "assert_exception\n\nmissing authority\nstack line 1\nstack line 2".to_string(),
        });
        assert_eq!(err.cause(), "assert_exception: missing authority: stack line 1");
        assert_eq!(
            RunError::AccountNotFound("ghost".to_string()).cause(),
            "account ghost not found"
        );
    }
}
