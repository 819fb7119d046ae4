//! Builds the chain backends named in the bot configuration.

use anyhow::{Context, Result};
use arena_evm::{MatchHistoryContract, UserSyncContract};
use arena_flow::{FlowCliClient, FlowConfig};
use core_logic::{AddressRegistry, ChainConfig, MatchRecord, MatchRecorder, RecordReceipt};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Recorder name selecting the Flow CLI instead of an EVM chain.
pub const FLOW_CLI: &str = "flow-cli";

async fn flow_cli() -> FlowCliClient {
    let client = FlowCliClient::new(FlowConfig::from_env());
    if !client.check_cli().await {
        warn!("Flow CLI is not installed or not in PATH; Flow writes will fail");
    }
    client
}

pub async fn build_recorders(names: &[String]) -> Result<Vec<Arc<dyn MatchRecorder>>> {
    let mut recorders: Vec<Arc<dyn MatchRecorder>> = Vec::with_capacity(names.len());
    for name in names {
        if name == FLOW_CLI {
            recorders.push(Arc::new(flow_cli().await));
        } else {
            let config = ChainConfig::from_env_with_signer(name)
                .with_context(|| format!("Recorder '{}' is not configured", name))?;
            recorders.push(Arc::new(MatchHistoryContract::connect(config).await?));
        }
        info!("Match recorder enabled: {}", name);
    }
    Ok(recorders)
}

pub async fn build_registry(name: &str) -> Result<Arc<dyn AddressRegistry>> {
    if name == FLOW_CLI {
        return Ok(Arc::new(flow_cli().await));
    }
    let config = ChainConfig::from_env_with_signer(name)
        .with_context(|| format!("Address registry '{}' is not configured", name))?;
    Ok(Arc::new(UserSyncContract::connect(config).await?))
}

/// Writes `record` to every recorder. A failing recorder is logged and does
/// not stop the others.
pub async fn record_everywhere(
    recorders: &[Arc<dyn MatchRecorder>],
    record: &MatchRecord,
) -> Vec<RecordReceipt> {
    let mut receipts = Vec::new();
    for recorder in recorders {
        match recorder.record_match(record).await {
            Ok(receipt) => {
                info!(
                    "✅ SUCCESS match recorded on {}: {}",
                    receipt.recorder,
                    receipt.tx_hash.as_deref().unwrap_or(&receipt.detail)
                );
                receipts.push(receipt);
            }
            Err(e) => error!("Recording on {} FAILED: {:#}", recorder.name(), e),
        }
    }
    receipts
}
