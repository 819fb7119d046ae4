use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Persisted outcome of a duel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub challenger_name: String,
    pub challenger_user_id: String,
    pub opponent_name: String,
    pub opponent_user_id: String,
    pub match_winner: String,
    pub ai_prompt: String,
}

impl MatchRecord {
    /// User ID of the winner, if the winner is one of the two participants
    /// and their ID is known.
    pub fn winner_user_id(&self) -> Option<&str> {
        let id = if self.match_winner.eq_ignore_ascii_case(&self.challenger_name) {
            &self.challenger_user_id
        } else if self.match_winner.eq_ignore_ascii_case(&self.opponent_name) {
            &self.opponent_user_id
        } else {
            return None;
        };
        (!id.is_empty()).then_some(id.as_str())
    }

    /// Non-empty participant IDs, challenger first, without duplicates.
    pub fn participant_ids(&self) -> Vec<&str> {
        let mut ids = Vec::with_capacity(2);
        for id in [&self.challenger_user_id, &self.opponent_user_id] {
            if !id.is_empty() && !ids.contains(&id.as_str()) {
                ids.push(id.as_str());
            }
        }
        ids
    }
}

/// A match record as read back from chain, with its assigned ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMatch {
    pub match_id: u64,
    pub record: MatchRecord,
}

#[derive(Debug, Clone)]
pub struct RecordReceipt {
    pub recorder: String,
    pub tx_hash: Option<String>,
    pub detail: String,
}

/// A backend that can persist a match record (contract, CLI, ...).
#[async_trait]
pub trait MatchRecorder: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Persists the match and returns once the write is confirmed
    async fn record_match(&self, record: &MatchRecord) -> Result<RecordReceipt>;
}

/// A backend that maps Twitter user IDs to Ethereum addresses.
#[async_trait]
pub trait AddressRegistry: Send + Sync {
    fn name(&self) -> &str;

    async fn link_address(&self, user_id: &str, address: &str) -> Result<RecordReceipt>;
}
