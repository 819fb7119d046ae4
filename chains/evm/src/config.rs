use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Settings for the `match-sync` service. Chain endpoints and keys come from
/// the environment under each chain name (`RPC_URL_SAGA`, ...).
#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    pub interval_secs: u64,
    pub batch_size: u64,
    pub history_chain: String,
    pub sync_chain: String,
    #[serde(default)]
    pub rewards_chain: Option<String>,
}

impl SyncConfig {
    pub fn load(path: &str) -> Result<Self> {
        let settings = Config::builder()
            .set_default("interval_secs", 120)?
            .set_default("batch_size", 100)?
            .set_default("history_chain", "saga")?
            .set_default("sync_chain", "flow")?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("ARENA_SYNC").separator("__"))
            .build()
            .with_context(|| format!("Failed to read sync config {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid sync configuration")
    }
}
