use crate::cadence;
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{env_opt, AddressRegistry, ChainError, MatchRecord, MatchRecorder, RecordReceipt};
use std::io::Write;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub contract_address: String,
    pub network: String,
    pub signer: String,
    /// Directory holding `flow.json`; commands run from here.
    pub flow_dir: PathBuf,
    pub cli: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            contract_address: "0x2c1ac42d77578075".to_string(),
            network: "testnet".to_string(),
            signer: "2c1ac42d77578075".to_string(),
            flow_dir: PathBuf::from("flow").join("accounts"),
            cli: "flow".to_string(),
        }
    }
}

impl FlowConfig {
    /// Defaults overridden by `FLOW_CONTRACT_ADDRESS`, `FLOW_NETWORK`,
    /// `FLOW_SIGNER`, `FLOW_DIR` and `FLOW_CLI`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            contract_address: env_opt("FLOW_CONTRACT_ADDRESS").unwrap_or(defaults.contract_address),
            network: env_opt("FLOW_NETWORK").unwrap_or(defaults.network),
            signer: env_opt("FLOW_SIGNER").unwrap_or(defaults.signer),
            flow_dir: env_opt("FLOW_DIR").map(PathBuf::from).unwrap_or(defaults.flow_dir),
            cli: env_opt("FLOW_CLI").unwrap_or(defaults.cli),
        }
    }
}

/// Appends `--config-path flow.json` unless the caller already passed a
/// config flag.
pub fn with_config_path(mut args: Vec<String>) -> Vec<String> {
    if !args.iter().any(|a| a.starts_with("--config")) {
        args.push("--config-path".to_string());
        args.push("flow.json".to_string());
    }
    args
}

pub struct FlowCliClient {
    config: FlowConfig,
}

impl FlowCliClient {
    pub fn new(config: FlowConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Runs the CLI with `args` from the account directory and returns stdout.
    pub async fn execute(&self, args: Vec<String>) -> Result<String> {
        let args = with_config_path(args);
        let command = format!("{} {}", self.config.cli, args.join(" "));
        debug!("Executing: {} (in {})", command, self.config.flow_dir.display());

        let output = Command::new(&self.config.cli)
            .args(&args)
            .current_dir(&self.config.flow_dir)
            .output()
            .await
            .with_context(|| format!("Failed to spawn `{}`", self.config.cli))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ChainError::CommandFailed {
                command,
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            }
            .into());
        }

        if !stderr.trim().is_empty() {
            warn!("Flow CLI stderr: {}", stderr.trim());
        }
        debug!("Flow CLI output: {}", stdout.trim());
        Ok(stdout)
    }

    /// Writes `code` to a temporary `.cdc` file in the account directory and
    /// runs `flow <kind...> <file> ... --args-json <args>`. The file is
    /// removed when the call returns, whatever the outcome.
    async fn run_cadence(&self, kind: &[&str], stem: &str, code: &str, args: &[&str]) -> Result<String> {
        std::fs::create_dir_all(&self.config.flow_dir).with_context(|| {
            format!("Failed to create {}", self.config.flow_dir.display())
        })?;
        let mut file = tempfile::Builder::new()
            .prefix(&format!("temp_{}_", stem))
            .suffix(".cdc")
            .tempfile_in(&self.config.flow_dir)
            .context("Failed to create Cadence file")?;
        file.write_all(code.as_bytes())
            .context("Failed to write Cadence file")?;

        let file_name = file
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut cli_args: Vec<String> = kind.iter().map(|s| s.to_string()).collect();
        cli_args.push(file_name);
        if kind.first() == Some(&"transactions") {
            cli_args.extend(["--signer".to_string(), self.config.signer.clone()]);
        }
        cli_args.extend([
            "--network".to_string(),
            self.config.network.clone(),
            "--args-json".to_string(),
            cadence::string_args(args),
        ]);

        let result = self.execute(cli_args).await;
        drop(file);
        result
    }

    async fn send_transaction(&self, function: &str, params: &[&str], args: &[&str]) -> Result<String> {
        let code = cadence::transaction(&self.config.contract_address, function, params);
        self.run_cadence(&["transactions", "send"], function, &code, args)
            .await
    }

    async fn run_script(&self, function: &str, param: &str, return_type: &str, arg: &str) -> Result<String> {
        let code = cadence::script(&self.config.contract_address, function, param, return_type);
        self.run_cadence(&["scripts", "execute"], function, &code, &[arg])
            .await
    }

    pub async fn create_user(&self, user_id: &str, eth_address: Option<&str>) -> Result<String> {
        let address = eth_address.map(str::to_lowercase).unwrap_or_default();
        let out = self
            .send_transaction("createUser", &["userId", "ethereumAddress"], &[user_id, &address])
            .await?;
        info!("✅ Flow user {} created", user_id);
        Ok(out)
    }

    pub async fn update_ethereum_address(&self, user_id: &str, address: &str) -> Result<String> {
        let address = address.to_lowercase();
        let out = self
            .send_transaction("updateEthereumAddress", &["userId", "newAddress"], &[user_id, &address])
            .await?;
        info!("✅ Flow address updated for {}", user_id);
        Ok(out)
    }

    pub async fn record_match(&self, user_id: &str, match_id: &str) -> Result<String> {
        self.send_transaction("recordMatch", &["userId", "matchId"], &[user_id, match_id])
            .await
    }

    pub async fn record_win(&self, user_id: &str, match_id: &str) -> Result<String> {
        self.send_transaction("recordWin", &["userId", "matchId"], &[user_id, match_id])
            .await
    }

    pub async fn get_stats(&self, user_id: &str) -> Result<String> {
        self.run_script("getStats", "userId", "{contract}.UserStats", user_id)
            .await
    }

    pub async fn get_matches(&self, user_id: &str) -> Result<String> {
        self.run_script("getMatches", "userId", "[String]", user_id).await
    }

    pub async fn get_wins(&self, user_id: &str) -> Result<String> {
        self.run_script("getWins", "userId", "[String]", user_id).await
    }

    pub async fn get_ethereum_address(&self, user_id: &str) -> Result<String> {
        self.run_script("getEthereumAddress", "userId", "String?", user_id)
            .await
    }

    pub async fn get_user_id_by_ethereum_address(&self, address: &str) -> Result<String> {
        let address = address.to_lowercase();
        let out = self
            .run_script("getUserIdByAddress", "ethereumAddress", "String", &address)
            .await?;
        Ok(out.trim().to_string())
    }

    /// A user exists when the address lookup script succeeds.
    pub async fn user_exists(&self, user_id: &str) -> bool {
        self.get_ethereum_address(user_id).await.is_ok()
    }

    pub async fn check_cli(&self) -> bool {
        match self.execute(vec!["version".to_string()]).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Flow CLI not usable ({}): {:#}", self.config.cli, e);
                false
            }
        }
    }

    pub async fn check_account(&self) -> bool {
        let args = vec![
            "accounts".to_string(),
            "get".to_string(),
            self.config.signer.clone(),
            "--network".to_string(),
            self.config.network.clone(),
        ];
        match self.execute(args).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Flow account {} not usable: {:#}", self.config.signer, e);
                false
            }
        }
    }
}

#[async_trait]
impl MatchRecorder for FlowCliClient {
    fn name(&self) -> &str {
        "flow"
    }

    /// Creates missing users, then records participation for both sides and
    /// the win for the winner. The match ID is the recording time in ms.
    async fn record_match(&self, record: &MatchRecord) -> Result<RecordReceipt> {
        let match_id = chrono::Utc::now().timestamp_millis().to_string();

        for user_id in record.participant_ids() {
            if !self.user_exists(user_id).await {
                self.create_user(user_id, None).await?;
            }
            FlowCliClient::record_match(self, user_id, &match_id).await?;
        }
        if let Some(winner) = record.winner_user_id() {
            self.record_win(winner, &match_id).await?;
        }

        info!("[flow] match {} recorded", match_id);
        Ok(RecordReceipt {
            recorder: "flow".to_string(),
            tx_hash: None,
            detail: format!("match {}", match_id),
        })
    }
}

#[async_trait]
impl AddressRegistry for FlowCliClient {
    fn name(&self) -> &str {
        "flow"
    }

    async fn link_address(&self, user_id: &str, address: &str) -> Result<RecordReceipt> {
        if self.user_exists(user_id).await {
            self.update_ethereum_address(user_id, address).await?;
        } else {
            self.create_user(user_id, Some(address)).await?;
        }
        Ok(RecordReceipt {
            recorder: "flow".to_string(),
            tx_hash: None,
            detail: format!("{} -> {}", user_id, address.to_lowercase()),
        })
    }
}
