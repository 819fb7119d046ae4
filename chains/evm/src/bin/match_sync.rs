use anyhow::{Context, Result};
use arena_evm::config::SyncConfig;
use arena_evm::{MatchHistoryContract, MatchSyncer, UserSyncContract};
use clap::Parser;
use core_logic::{setup_logger, ChainConfig, PollRunner};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Copies arena matches to the user-sync chain", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/sync.toml")]
    config: String,
    /// Run a single sync pass and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let _log_guard = setup_logger("match-sync");

    let args = Args::parse();
    let config = SyncConfig::load(&args.config)?;
    info!("Loaded sync config: {:?}", config);

    let history = MatchHistoryContract::connect(
        ChainConfig::from_env(&config.history_chain).context("history chain config")?,
    )
    .await?;
    let target = UserSyncContract::connect(
        ChainConfig::from_env_with_signer(&config.sync_chain).context("sync chain config")?,
    )
    .await?;

    let mut syncer = MatchSyncer::new(Arc::new(history), Arc::new(target))
        .with_batch_size(config.batch_size);

    if let Some(chain) = &config.rewards_chain {
        match ChainConfig::from_env_with_signer(chain) {
            Ok(cfg) => {
                let rewards = UserSyncContract::connect(cfg).await?;
                syncer = syncer.with_rewards(Arc::new(rewards));
            }
            Err(e) => warn!("Rewards chain {} disabled: {}", chain, e),
        }
    }

    let mut runner = PollRunner::new("match-sync", Duration::from_secs(config.interval_secs));
    if args.once {
        runner = runner.with_max_updates(1);
    }

    let syncer = Arc::new(syncer);
    runner
        .run(PollRunner::shutdown_on_ctrl_c(), |_| {
            let syncer = syncer.clone();
            async move {
                let report = syncer.sync_once().await?;
                info!(
                    "Sync pass: {} new (last synced {}), {} users credited",
                    report.synced,
                    report.latest_match_id.unwrap_or(report.last_synced),
                    report.rewarded_users.len()
                );
                Ok(())
            }
        })
        .await;

    Ok(())
}
