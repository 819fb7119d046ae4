use anyhow::Result;
use arena_bot::recorders::build_registry;
use arena_bot::{AddressBot, BotConfig, TwitterClient};
use clap::Parser;
use core_logic::{setup_logger, PollRunner};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Links tweeted Ethereum addresses to Twitter users", long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/arena.toml")]
    config: String,
    /// Write links to the registry instead of only logging them
    #[arg(long)]
    live: bool,
    /// Run a single scan and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let _log_guard = setup_logger("address-bot");

    let args = Args::parse();
    let config = BotConfig::load(&args.config)?;
    let settings = &config.address_bot;

    let registry = if args.live {
        Some(build_registry(&settings.registry).await?)
    } else {
        info!("Dry-run mode: addresses will only be logged (use --live to write)");
        None
    };

    let bot = Arc::new(AddressBot::new(
        Arc::new(TwitterClient::from_env()?),
        registry,
        config.handle.clone(),
        settings.search_limit,
        settings.processed_tweets_file.clone(),
    ));

    let mut runner = PollRunner::new(
        "address-bot",
        Duration::from_secs(settings.poll_interval_secs),
    );
    if args.once {
        runner = runner.with_max_updates(1);
    }

    runner
        .run(PollRunner::shutdown_on_ctrl_c(), |_| {
            let bot = bot.clone();
            async move {
                bot.scan_once().await?;
                Ok(())
            }
        })
        .await;

    Ok(())
}
