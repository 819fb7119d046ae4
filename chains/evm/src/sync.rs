//! Copies new match records from the history chain to the user-sync chain
//! and credits the participants on the rewards chain.

use crate::match_history::MatchHistoryContract;
use crate::user_sync::UserSyncContract;
use anyhow::{Context, Result};
use async_trait::async_trait;
use core_logic::StoredMatch;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

pub const DEFAULT_BATCH_SIZE: u64 = 100;

#[async_trait]
pub trait MatchSource: Send + Sync {
    /// The `count` most recent matches, newest first.
    async fn recent_matches(&self, count: u64) -> Result<Vec<StoredMatch>>;
}

#[async_trait]
pub trait SyncTarget: Send + Sync {
    async fn last_synced_match_id(&self) -> Result<u64>;
    async fn sync_matches(&self, matches: &[StoredMatch], latest_match_id: u64) -> Result<String>;
}

#[async_trait]
pub trait RewardsLedger: Send + Sync {
    async fn increment_unclaimed(&self, user_ids: &[String]) -> Result<String>;
}

#[async_trait]
impl MatchSource for MatchHistoryContract {
    async fn recent_matches(&self, count: u64) -> Result<Vec<StoredMatch>> {
        self.get_recent_matches(count).await
    }
}

#[async_trait]
impl SyncTarget for UserSyncContract {
    async fn last_synced_match_id(&self) -> Result<u64> {
        UserSyncContract::last_synced_match_id(self).await
    }

    async fn sync_matches(&self, matches: &[StoredMatch], latest_match_id: u64) -> Result<String> {
        UserSyncContract::sync_matches(self, matches, latest_match_id).await
    }
}

#[async_trait]
impl RewardsLedger for UserSyncContract {
    async fn increment_unclaimed(&self, user_ids: &[String]) -> Result<String> {
        self.batch_increment_unclaimed_tokens(user_ids).await
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub last_synced: u64,
    pub synced: usize,
    pub latest_match_id: Option<u64>,
    pub sync_tx: Option<String>,
    pub rewarded_users: Vec<String>,
    pub rewards_tx: Option<String>,
}

pub struct MatchSyncer {
    source: Arc<dyn MatchSource>,
    target: Arc<dyn SyncTarget>,
    rewards: Option<Arc<dyn RewardsLedger>>,
    batch_size: u64,
}

impl MatchSyncer {
    pub fn new(source: Arc<dyn MatchSource>, target: Arc<dyn SyncTarget>) -> Self {
        Self {
            source,
            target,
            rewards: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_rewards(mut self, rewards: Arc<dyn RewardsLedger>) -> Self {
        self.rewards = Some(rewards);
        self
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub async fn sync_once(&self) -> Result<SyncReport> {
        let last = self
            .target
            .last_synced_match_id()
            .await
            .context("Failed to read last synced match ID")?;
        info!("Last synced match ID: {}", last);

        let new_matches = self.collect_new_matches(last).await?;
        let mut report = SyncReport {
            last_synced: last,
            ..Default::default()
        };

        let Some(latest) = new_matches.last().map(|m| m.match_id) else {
            info!("No new matches to sync");
            return Ok(report);
        };

        info!(
            "Syncing {} matches ({}..={})",
            new_matches.len(),
            new_matches[0].match_id,
            latest
        );
        let tx = self
            .target
            .sync_matches(&new_matches, latest)
            .await
            .context("syncMatches failed")?;
        info!("✅ SUCCESS synced {} matches: {}", new_matches.len(), tx);

        report.synced = new_matches.len();
        report.latest_match_id = Some(latest);
        report.sync_tx = Some(tx);
        report.rewarded_users = collect_user_ids(&new_matches);

        if let Some(rewards) = &self.rewards {
            if !report.rewarded_users.is_empty() {
                match rewards.increment_unclaimed(&report.rewarded_users).await {
                    Ok(tx) => {
                        info!(
                            "Credited {} users on rewards chain: {}",
                            report.rewarded_users.len(),
                            tx
                        );
                        report.rewards_tx = Some(tx);
                    }
                    Err(e) => error!("Rewards increment FAILED: {:#}", e),
                }
            }
        }

        Ok(report)
    }

    /// Pages backwards through recent matches until the already-synced
    /// region is reached. Result is ascending by match ID.
    async fn collect_new_matches(&self, last: u64) -> Result<Vec<StoredMatch>> {
        let mut found: BTreeMap<u64, StoredMatch> = BTreeMap::new();
        let mut requested = self.batch_size;

        loop {
            let page = self
                .source
                .recent_matches(requested)
                .await
                .with_context(|| format!("getRecentMatches({}) failed", requested))?;

            let exhausted = (page.len() as u64) < requested;
            let reached_synced = page.iter().any(|m| m.match_id <= last);
            let before = found.len();
            select_new_matches(page, last, &mut found);

            if exhausted || reached_synced || found.len() == before {
                break;
            }
            requested += self.batch_size;
        }

        Ok(found.into_values().collect())
    }
}

/// Adds matches newer than `last` to `found`, keyed by match ID.
pub fn select_new_matches(
    page: Vec<StoredMatch>,
    last: u64,
    found: &mut BTreeMap<u64, StoredMatch>,
) {
    for m in page.into_iter().rev() {
        if m.match_id > last {
            found.entry(m.match_id).or_insert(m);
        }
    }
}

/// Distinct non-empty participant IDs, in first-seen order.
pub fn collect_user_ids(matches: &[StoredMatch]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for m in matches {
        for id in m.record.participant_ids() {
            if !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
    }
    ids
}
