use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use core_logic::env_opt;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    /// Bot account handle, without `@`. Falls back to `TWITTER_HANDLE`.
    pub handle: String,
    pub poll_interval_secs: u64,
    pub max_tweet_age_secs: i64,
    /// Updates to wait between picking up a duel and judging it.
    pub judge_after_polls: u64,
    pub search_limit: usize,

    pub processed_tweets_file: PathBuf,
    pub replies_file: PathBuf,
    pub pfp_dir: PathBuf,
    pub images_dir: PathBuf,

    pub emperor_model: String,
    pub vision_model: String,
    pub image_model: String,
    pub image_size: String,
    pub image_quality: String,
    pub use_image_analysis: bool,

    /// Where finished matches are written. `flow-cli` selects the Flow CLI,
    /// any other entry names an EVM chain configured through the environment.
    pub recorders: Vec<String>,

    pub address_bot: AddressBotConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AddressBotConfig {
    pub poll_interval_secs: u64,
    pub search_limit: usize,
    pub processed_tweets_file: PathBuf,
    /// `flow-cli` or an EVM chain running the user-sync contract.
    pub registry: String,
}

impl BotConfig {
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .set_default("handle", "")?
            .set_default("poll_interval_secs", 60)?
            .set_default("max_tweet_age_secs", 12 * 60 * 60)?
            .set_default("judge_after_polls", 1)?
            .set_default("search_limit", 100)?
            .set_default("processed_tweets_file", "processedTweets.json")?
            .set_default("replies_file", "tweetReplies.json")?
            .set_default("pfp_dir", "pfp")?
            .set_default("images_dir", "images")?
            .set_default("emperor_model", "gpt-4.1-nano-2025-04-14")?
            .set_default("vision_model", "gpt-4o")?
            .set_default("image_model", "dall-e-3")?
            .set_default("image_size", "1024x1024")?
            .set_default("image_quality", "standard")?
            .set_default("use_image_analysis", true)?
            .set_default("recorders", vec!["saga"])?
            .set_default("address_bot.poll_interval_secs", 30)?
            .set_default("address_bot.search_limit", 50)?
            .set_default(
                "address_bot.processed_tweets_file",
                "processedAddressTweets.json",
            )?
            .set_default("address_bot.registry", "flow")?
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("ARENA")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("recorders")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read bot config {}", path))?;

        let mut config: BotConfig = settings
            .try_deserialize()
            .context("Invalid bot configuration")?;

        if config.handle.trim().is_empty() {
            config.handle = env_opt("TWITTER_HANDLE").unwrap_or_default();
        }
        config.handle = core_logic::text::normalize_twitter_handle(config.handle.trim()).to_string();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !core_logic::text::is_valid_twitter_handle(&self.handle) {
            bail!(
                "Bot handle '{}' is missing or invalid (set `handle` or TWITTER_HANDLE)",
                self.handle
            );
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be greater than 0");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// `@handle -from:handle`: mentions of the bot not written by it.
    pub fn mention_query(&self) -> String {
        crate::challenge::search_query(&self.handle)
    }
}
