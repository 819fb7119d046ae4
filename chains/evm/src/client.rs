use anyhow::{Context, Result};
use core_logic::{with_retry, ChainConfig, ChainError, RetryConfig};
use ethers::abi::{Abi, Detokenize};
use ethers::contract::ContractCall;
use ethers::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Provider plus optional signer for one contract deployment.
pub struct ChainClient {
    config: ChainConfig,
    address: Address,
    provider: Provider<Http>,
    signer: Option<Arc<SignerClient>>,
}

impl ChainClient {
    pub async fn connect(config: ChainConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        let url = reqwest::Url::parse(&config.rpc_url).map_err(|_| {
            core_logic::ConfigError::InvalidRpcUrl {
                url: config.rpc_url.clone(),
            }
        })?;
        let provider = Provider::new(Http::new_with_client(url, http));

        let address: Address =
            config
                .contract_address
                .parse()
                .map_err(|_| ChainError::InvalidAddress {
                    address: config.contract_address.clone(),
                })?;

        let signer = match config.private_key.as_deref() {
            Some(key) => {
                let chain_id = match config.chain_id {
                    Some(id) => id,
                    None => provider
                        .get_chainid()
                        .await
                        .with_context(|| format!("[{}] eth_chainId failed", config.name))?
                        .as_u64(),
                };
                let wallet = key
                    .trim_start_matches("0x")
                    .parse::<LocalWallet>()
                    .with_context(|| format!("[{}] invalid private key", config.name))?
                    .with_chain_id(chain_id);
                info!(
                    "[{}] signer {:?} on chain {}",
                    config.name,
                    wallet.address(),
                    chain_id
                );
                Some(Arc::new(SignerMiddleware::new(provider.clone(), wallet)))
            }
            None => None,
        };

        Ok(Self {
            config,
            address,
            provider,
            signer,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn can_write(&self) -> bool {
        self.signer.is_some()
    }

    pub fn reader(&self, abi: &Abi) -> Contract<Provider<Http>> {
        Contract::new(self.address, abi.clone(), Arc::new(self.provider.clone()))
    }

    pub fn writer(&self, abi: &Abi) -> Result<Contract<SignerClient>, ChainError> {
        let signer = self.signer.clone().ok_or_else(|| ChainError::ReadOnly {
            chain: self.config.name.clone(),
        })?;
        Ok(Contract::new(self.address, abi.clone(), signer))
    }

    /// Sends a prepared call and waits for one confirmation. Returns the
    /// transaction hash of a successful receipt.
    pub async fn send<D: Detokenize>(
        &self,
        call: ContractCall<SignerClient, D>,
        label: &str,
    ) -> Result<String> {
        let call = if self.config.legacy {
            call.legacy()
        } else {
            call
        };

        // Only the submission is retried; once broadcast the hash is final.
        let submit_retry = RetryConfig::new(2, 1500).transient_only();
        let pending = with_retry(submit_retry, label, || async { Ok(call.send().await?) })
            .await
            .with_context(|| format!("[{}] {} submission failed", self.config.name, label))?;
        let tx_hash = format!("{:?}", pending.tx_hash());
        debug!("[{}] {} submitted: {}", self.config.name, label, tx_hash);

        let receipt = pending
            .await
            .with_context(|| format!("[{}] {} confirmation failed", self.config.name, label))?
            .ok_or_else(|| ChainError::Dropped {
                chain: self.config.name.clone(),
            })?;

        if receipt.status != Some(U64::from(1)) {
            return Err(ChainError::Reverted {
                chain: self.config.name.clone(),
                tx_hash,
            }
            .into());
        }

        Ok(format!("{:?}", receipt.transaction_hash))
    }
}

/// Saturating conversion for on-chain counters.
pub fn u256_to_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.low_u64()
    }
}
