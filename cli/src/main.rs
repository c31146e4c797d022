use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};

use subreward_chain::{
    BroadcastMode, Broadcaster, DisabledBroadcaster, GatewayBroadcaster, RpcChainClient,
};
use subreward_cli::{execute, log_level, RunError, RunOptions, RunOutcome, StdinConfirm};
use subreward_config::{ConfigError, RewardConfig};
use subreward_payout::PersistOutcome;

/// Pays a share of an account's GBG balance to its active followers
#[derive(Parser)]
#[command(name = "subreward", version, about = "Golos subscriber reward distributor")]
struct Args {
    /// Path to the run configuration (JSON, or TOML by extension)
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Sign and broadcast transfers instead of only planning them
    #[arg(long)]
    broadcast: bool,

    /// Do not wait for confirmation before paying out
    #[arg(long)]
    yes: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = log_level(args.verbose, args.quiet);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let mode = BroadcastMode::from_flag(args.broadcast);
    let config = match load_config(&args.config, mode) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(path = %args.config.display(), error = %err, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    match run(&config, RunOptions::new(mode, args.yes)).await {
        Ok(outcome) => {
            summarize(&outcome);
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, cause = %err.cause(), "run failed");
            if err.is_config() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn load_config(path: &Path, mode: BroadcastMode) -> Result<RewardConfig, ConfigError> {
    let config = RewardConfig::from_file(path)?;
    if mode.is_live() {
        config.validate_for_broadcast()?;
    } else {
        config.validate()?;
    }
    Ok(config)
}

async fn run(config: &RewardConfig, options: RunOptions) -> Result<RunOutcome, RunError> {
    let chain = RpcChainClient::connect(&config.endpoint).await?;

    let broadcaster: Box<dyn Broadcaster> = match (&config.signing_key, options.mode) {
        (Some(key), BroadcastMode::Live) => {
            Box::new(GatewayBroadcaster::connect(config.broadcast_endpoint(), key.clone()).await?)
        }
        _ => Box::new(DisabledBroadcaster),
    };

    execute(config, &chain, broadcaster.as_ref(), &StdinConfirm, options).await
}

fn summarize(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::NoSubscribers => {}
        RunOutcome::Aborted { .. } => println!("Aborted, nothing was sent"),
        RunOutcome::Completed {
            plan,
            distribution,
            report,
            persisted,
        } => {
            println!("Reward run finished");
            println!("  Subscribers: {}", plan.subscriber_count);
            println!("  Fee each: {}", plan.per_subscriber_fee);
            println!("  Transfers: {}/{}", distribution.broadcast, distribution.planned.len());
            println!("  Report digest: {}", report.digest);
            match persisted {
                PersistOutcome::Submitted { attempts } => {
                    println!("  Report: saved after {attempts} attempt(s)")
                }
                PersistOutcome::Skipped => println!("  Report: not broadcast (dry run)"),
                PersistOutcome::GaveUp { attempts } => {
                    println!("  Report: not saved, gave up after {attempts} attempts")
                }
            }
        }
    }
}
