//! Links Twitter accounts to the Ethereum addresses they tweet at the bot.

use crate::challenge::search_query;
use crate::twitter::{SocialPlatform, Tweet};
use anyhow::Result;
use core_logic::text::extract_and_normalize_eth_addresses;
use core_logic::{AddressRegistry, ProcessedTweetStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AddressScanSummary {
    pub found: usize,
    pub skipped: usize,
    pub processed: usize,
    pub addresses: usize,
    /// Account writes: one per address on a resolved profile, or one for a
    /// resolved author who tweeted no address.
    pub profiles: usize,
}

pub struct AddressBot {
    platform: Arc<dyn SocialPlatform>,
    /// `None` runs in dry-run mode and only logs what would be written.
    registry: Option<Arc<dyn AddressRegistry>>,
    handle: String,
    search_limit: usize,
    processed: ProcessedTweetStore,
}

impl AddressBot {
    pub fn new(
        platform: Arc<dyn SocialPlatform>,
        registry: Option<Arc<dyn AddressRegistry>>,
        handle: impl Into<String>,
        search_limit: usize,
        processed_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            platform,
            registry,
            handle: handle.into(),
            search_limit,
            processed: ProcessedTweetStore::new(processed_file),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.registry.is_none()
    }

    async fn mentions(&self) -> Result<Vec<Tweet>> {
        let tweets = self
            .platform
            .search_tweets(&search_query(&self.handle), self.search_limit)
            .await?;
        if !tweets.is_empty() {
            return Ok(tweets);
        }

        debug!("No results, trying plain '@{}' search", self.handle);
        let tweets = self
            .platform
            .search_tweets(&format!("@{}", self.handle), self.search_limit)
            .await?;
        Ok(tweets
            .into_iter()
            .filter(|t| !t.username.eq_ignore_ascii_case(&self.handle))
            .collect())
    }

    pub async fn scan_once(&self) -> Result<AddressScanSummary> {
        let tweets = self.mentions().await?;
        let already = self.processed.load();
        let mut summary = AddressScanSummary {
            found: tweets.len(),
            ..Default::default()
        };
        let mut newly_processed = Vec::new();

        for tweet in &tweets {
            if already.contains(&tweet.id) {
                summary.skipped += 1;
                continue;
            }

            let addresses = extract_and_normalize_eth_addresses(&tweet.text);
            info!(
                "New mention {} from @{} with {} address(es)",
                tweet.id,
                tweet.username,
                addresses.len()
            );
            summary.addresses += addresses.len();

            match self.platform.get_profile(&tweet.username).await {
                Ok(profile) if !profile.user_id.is_empty() => {
                    summary.profiles += addresses.len().max(1);
                    for address in &addresses {
                        self.link(&profile.user_id, &tweet.username, address).await;
                    }
                }
                Ok(_) => warn!("Profile for @{} has no user ID", tweet.username),
                Err(e) => warn!("Could not fetch profile for @{}: {:#}", tweet.username, e),
            }

            newly_processed.push(tweet.id.clone());
            summary.processed += 1;
        }

        if !newly_processed.is_empty() {
            self.processed.merge_save(newly_processed)?;
        }

        info!(
            "Address scan: {} found, {} skipped, {} processed, {} addresses, {} account(s)",
            summary.found, summary.skipped, summary.processed, summary.addresses, summary.profiles
        );
        Ok(summary)
    }

    async fn link(&self, user_id: &str, handle: &str, address: &str) {
        let Some(registry) = &self.registry else {
            info!(
                "[dry-run] would link user {} (@{}) to {}",
                user_id, handle, address
            );
            return;
        };

        match registry.link_address(user_id, address).await {
            Ok(receipt) => info!(
                "✅ SUCCESS linked user {} to {} on {} ({})",
                user_id,
                address,
                receipt.recorder,
                receipt.tx_hash.as_deref().unwrap_or(&receipt.detail)
            ),
            Err(e) => error!(
                "Linking user {} to {} on {} FAILED: {:#}",
                user_id,
                address,
                registry.name(),
                e
            ),
        }
    }
}
