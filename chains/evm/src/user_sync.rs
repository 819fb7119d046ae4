use crate::client::{u256_to_u64, ChainClient};
use crate::contracts::{parse_abi, USER_SYNC_ABI};
use crate::match_history::to_raw;
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{
    text::normalize_eth_address, with_retry, AddressRegistry, ChainConfig, RecordReceipt, RetryConfig,
    StoredMatch,
};
use ethers::abi::Abi;
use ethers::prelude::*;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub twitter_handle: String,
    pub eth_address: String,
    pub match_count: u64,
    pub win_count: u64,
    pub unclaimed_tokens: u64,
}

type RawProfile = (String, String, Address, U256, U256, U256);

impl From<RawProfile> for UserProfile {
    fn from(raw: RawProfile) -> Self {
        let (user_id, twitter_handle, eth_address, matches, wins, unclaimed) = raw;
        Self {
            user_id,
            twitter_handle,
            eth_address: format!("{:?}", eth_address),
            match_count: u256_to_u64(matches),
            win_count: u256_to_u64(wins),
            unclaimed_tokens: u256_to_u64(unclaimed),
        }
    }
}

/// Client for the user-sync contract, also used for the rewards chain.
pub struct UserSyncContract {
    client: ChainClient,
    abi: Abi,
}

impl UserSyncContract {
    pub async fn connect(config: ChainConfig) -> Result<Self> {
        Ok(Self {
            client: ChainClient::connect(config).await?,
            abi: parse_abi(USER_SYNC_ABI)?,
        })
    }

    pub fn client(&self) -> &ChainClient {
        &self.client
    }

    pub async fn sync_matches(&self, matches: &[StoredMatch], latest_match_id: u64) -> Result<String> {
        let contract = self.client.writer(&self.abi)?;
        let raw: Vec<_> = matches.iter().map(to_raw).collect();
        let call = contract.method::<_, ()>("syncMatches", (raw, U256::from(latest_match_id)))?;
        self.client.send(call, "syncMatches").await
    }

    pub async fn update_ethereum_address(&self, user_id: &str, address: &str) -> Result<String> {
        let normalized = normalize_eth_address(address)?;
        let parsed: Address = normalized
            .parse()
            .map_err(|_| core_logic::ChainError::InvalidAddress { address: normalized.clone() })?;
        let contract = self.client.writer(&self.abi)?;
        let call =
            contract.method::<_, ()>("updateEthereumAddress", (user_id.to_string(), parsed))?;
        self.client.send(call, "updateEthereumAddress").await
    }

    pub async fn last_synced_match_id(&self) -> Result<u64> {
        let contract = self.client.reader(&self.abi);
        let id = with_retry(RetryConfig::new(3, 1000).transient_only(), "lastSyncedMatchId", || async {
            contract
                .method::<_, U256>("lastSyncedMatchId", ())?
                .call()
                .await
                .context("lastSyncedMatchId call failed")
        })
        .await?;
        Ok(u256_to_u64(id))
    }

    pub async fn get_user_profile(&self, user_id: &str) -> Result<UserProfile> {
        let contract = self.client.reader(&self.abi);
        let raw = contract
            .method::<_, RawProfile>("getUserProfile", user_id.to_string())?
            .call()
            .await
            .with_context(|| format!("getUserProfile({}) failed", user_id))?;
        Ok(raw.into())
    }

    pub async fn get_user_matches(&self, user_id: &str) -> Result<Vec<u64>> {
        self.id_list("getUserMatches", user_id).await
    }

    pub async fn get_user_wins(&self, user_id: &str) -> Result<Vec<u64>> {
        self.id_list("getUserWins", user_id).await
    }

    async fn id_list(&self, method: &str, user_id: &str) -> Result<Vec<u64>> {
        let contract = self.client.reader(&self.abi);
        let ids = contract
            .method::<_, Vec<U256>>(method, user_id.to_string())?
            .call()
            .await
            .with_context(|| format!("{}({}) failed", method, user_id))?;
        Ok(ids.into_iter().map(u256_to_u64).collect())
    }

    pub async fn batch_increment_unclaimed_tokens(&self, user_ids: &[String]) -> Result<String> {
        let contract = self.client.writer(&self.abi)?;
        let call = contract.method::<_, ()>("batchIncrementUnclaimedTokens", user_ids.to_vec())?;
        self.client.send(call, "batchIncrementUnclaimedTokens").await
    }
}

#[async_trait]
impl AddressRegistry for UserSyncContract {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn link_address(&self, user_id: &str, address: &str) -> Result<RecordReceipt> {
        let tx_hash = self.update_ethereum_address(user_id, address).await?;
        info!("[{}] linked {} -> {}", self.name(), user_id, address);
        Ok(RecordReceipt {
            recorder: self.name().to_string(),
            tx_hash: Some(tx_hash),
            detail: format!("{} -> {}", user_id, address.to_lowercase()),
        })
    }
}
