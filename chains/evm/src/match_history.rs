use crate::client::{u256_to_u64, ChainClient};
use crate::contracts::{parse_abi, MATCH_HISTORY_ABI};
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::{with_retry, ChainConfig, MatchRecord, MatchRecorder, RecordReceipt, RetryConfig, StoredMatch};
use ethers::abi::Abi;
use ethers::prelude::*;
use tracing::info;

/// `(matchId, challengerName, challengerUserId, opponentName, opponentUserId, matchWinner, aiPrompt)`
pub(crate) type RawMatch = (U256, String, String, String, String, String, String);

pub(crate) fn from_raw(raw: RawMatch) -> StoredMatch {
    let (id, challenger_name, challenger_user_id, opponent_name, opponent_user_id, match_winner, ai_prompt) =
        raw;
    StoredMatch {
        match_id: u256_to_u64(id),
        record: MatchRecord {
            challenger_name,
            challenger_user_id,
            opponent_name,
            opponent_user_id,
            match_winner,
            ai_prompt,
        },
    }
}

pub(crate) fn to_raw(stored: &StoredMatch) -> RawMatch {
    let r = &stored.record;
    (
        U256::from(stored.match_id),
        r.challenger_name.clone(),
        r.challenger_user_id.clone(),
        r.opponent_name.clone(),
        r.opponent_user_id.clone(),
        r.match_winner.clone(),
        r.ai_prompt.clone(),
    )
}

fn read_retry() -> RetryConfig {
    RetryConfig::new(3, 1000).transient_only()
}

pub struct MatchHistoryContract {
    client: ChainClient,
    abi: Abi,
}

impl MatchHistoryContract {
    pub async fn connect(config: ChainConfig) -> Result<Self> {
        Ok(Self {
            client: ChainClient::connect(config).await?,
            abi: parse_abi(MATCH_HISTORY_ABI)?,
        })
    }

    pub fn client(&self) -> &ChainClient {
        &self.client
    }

    /// Appends a match and returns the transaction hash once mined.
    pub async fn add_match(&self, record: &MatchRecord) -> Result<String> {
        let contract = self.client.writer(&self.abi)?;
        let call = contract.method::<_, ()>(
            "addMatch",
            (
                record.challenger_name.clone(),
                record.challenger_user_id.clone(),
                record.opponent_name.clone(),
                record.opponent_user_id.clone(),
                record.match_winner.clone(),
                record.ai_prompt.clone(),
            ),
        )?;
        self.client.send(call, "addMatch").await
    }

    /// The `count` most recent matches, newest first.
    pub async fn get_recent_matches(&self, count: u64) -> Result<Vec<StoredMatch>> {
        let contract = self.client.reader(&self.abi);
        let raw = with_retry(read_retry(), "getRecentMatches", || async {
            contract
                .method::<_, Vec<RawMatch>>("getRecentMatches", U256::from(count))?
                .call()
                .await
                .context("getRecentMatches call failed")
        })
        .await?;
        Ok(raw.into_iter().map(from_raw).collect())
    }

    pub async fn get_match(&self, match_id: u64) -> Result<StoredMatch> {
        let contract = self.client.reader(&self.abi);
        let raw = contract
            .method::<_, RawMatch>("getMatch", U256::from(match_id))?
            .call()
            .await
            .with_context(|| format!("getMatch({}) failed", match_id))?;
        Ok(from_raw(raw))
    }

    pub async fn match_count(&self) -> Result<u64> {
        let contract = self.client.reader(&self.abi);
        let count = contract
            .method::<_, U256>("matchCount", ())?
            .call()
            .await
            .context("matchCount call failed")?;
        Ok(u256_to_u64(count))
    }
}

#[async_trait]
impl MatchRecorder for MatchHistoryContract {
    fn name(&self) -> &str {
        self.client.name()
    }

    async fn record_match(&self, record: &MatchRecord) -> Result<RecordReceipt> {
        let tx_hash = self.add_match(record).await?;
        info!("[{}] match recorded: {}", self.name(), tx_hash);
        Ok(RecordReceipt {
            recorder: self.name().to_string(),
            tx_hash: Some(tx_hash),
            detail: format!(
                "{} vs {}, winner {}",
                record.challenger_name, record.opponent_name, record.match_winner
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_tuple_maps_fields_in_abi_order() {
        let raw: RawMatch = (
            U256::from(7u64),
            "maximus".into(),
            "11".into(),
            "lucius".into(),
            "22".into(),
            "lucius".into(),
            "prompt".into(),
        );
        let stored = from_raw(raw.clone());
        assert_eq!(stored.match_id, 7);
        assert_eq!(stored.record.opponent_user_id, "22");
        assert_eq!(stored.record.ai_prompt, "prompt");
        assert_eq!(to_raw(&stored), raw);
    }
}
