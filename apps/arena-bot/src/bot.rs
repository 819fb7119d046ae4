//! The duel loop: one call to [`ArenaBot::poll_once`] per update.

use crate::challenge::{
    group_replies_by_conversation, is_stale, reply_records, result_text, unprocessed_main_tweets,
};
use crate::config::BotConfig;
use crate::duel::{DuelSchedule, PendingDuel};
use crate::emperor::Judge;
use crate::image::{challenger_pfp_path, opponent_pfp_path, ImageMaker};
use crate::recorders::record_everywhere;
use crate::twitter::SocialPlatform;
use anyhow::Result;
use core_logic::text::find_opponent;
use core_logic::{MatchRecord, MatchRecorder, ProcessedTweetStore, RecordReceipt, ReplyStore};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Challenge tweet picked up and scheduled this update.
    pub scheduled: Option<String>,
    /// Challenge tweet dropped for being too old.
    pub stale: Option<String>,
    pub judged: Vec<DuelResult>,
}

#[derive(Debug)]
pub struct DuelResult {
    pub conversation_id: String,
    pub winner: String,
    pub fallback: bool,
    pub image: Option<PathBuf>,
    pub tweet_id: Option<String>,
    pub receipts: Vec<RecordReceipt>,
}

pub struct ArenaBot {
    config: BotConfig,
    platform: Arc<dyn SocialPlatform>,
    judge: Arc<dyn Judge>,
    images: Arc<dyn ImageMaker>,
    recorders: Vec<Arc<dyn MatchRecorder>>,
    processed: ProcessedTweetStore,
    replies: ReplyStore,
    schedule: Mutex<DuelSchedule>,
}

impl ArenaBot {
    pub fn new(
        config: BotConfig,
        platform: Arc<dyn SocialPlatform>,
        judge: Arc<dyn Judge>,
        images: Arc<dyn ImageMaker>,
        recorders: Vec<Arc<dyn MatchRecorder>>,
    ) -> Self {
        Self {
            processed: ProcessedTweetStore::new(&config.processed_tweets_file),
            replies: ReplyStore::new(&config.replies_file),
            config,
            platform,
            judge,
            images,
            recorders,
            schedule: Mutex::new(DuelSchedule::new()),
        }
    }

    pub fn pending_duels(&self) -> usize {
        self.schedule.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn with_schedule<T>(&self, f: impl FnOnce(&mut DuelSchedule) -> T) -> T {
        let mut guard = match self.schedule.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub async fn poll(&self, update_index: u64) -> Result<UpdateReport> {
        self.poll_once(update_index, chrono::Utc::now().timestamp())
            .await
    }

    /// One update: pick up at most one new challenge, then judge every duel
    /// that has come due.
    pub async fn poll_once(&self, update_index: u64, now: i64) -> Result<UpdateReport> {
        let query = self.config.mention_query();
        let tweets = self
            .platform
            .search_tweets(&query, self.config.search_limit)
            .await?;
        info!("Fetched {} tweets for '{}'", tweets.len(), query);

        let processed = self.processed.load();
        let main_tweets = unprocessed_main_tweets(&tweets, &processed);
        let replies_by_conv = group_replies_by_conversation(&tweets);
        let mut report = UpdateReport::default();

        if let Some(tweet) = main_tweets.first() {
            if is_stale(tweet, now, self.config.max_tweet_age_secs) {
                info!("Skipping tweet {} (older than {}s)", tweet.id, self.config.max_tweet_age_secs);
                self.processed.merge_save([tweet.id.as_str()])?;
                report.stale = Some(tweet.id.clone());
            } else if let Some(opponent) = find_opponent(&tweet.text, &self.config.handle) {
                let challenger = tweet.username.as_str();
                let conversation_id = tweet.id.as_str();
                info!(
                    "⚔️ New duel {}: @{} challenges @{}",
                    conversation_id, challenger, opponent
                );

                let challenger_user_id = self
                    .fetch_avatar(
                        challenger,
                        &challenger_pfp_path(&self.config.pfp_dir, challenger, conversation_id),
                    )
                    .await;
                let opponent_user_id = self
                    .fetch_avatar(
                        opponent,
                        &opponent_pfp_path(&self.config.pfp_dir, opponent, conversation_id),
                    )
                    .await;

                let thread = replies_by_conv
                    .get(conversation_id)
                    .map(|r| reply_records(r))
                    .unwrap_or_default();
                self.replies.replace_thread(conversation_id, thread)?;
                self.processed.merge_save([conversation_id])?;

                let duel = PendingDuel {
                    due_index: update_index + self.config.judge_after_polls,
                    conversation_id: conversation_id.to_string(),
                    challenger: challenger.to_string(),
                    opponent: opponent.to_string(),
                    challenger_user_id,
                    opponent_user_id,
                };
                info!("Duel {} will be judged at update {}", duel.conversation_id, duel.due_index);
                self.with_schedule(|s| s.schedule(duel));
                report.scheduled = Some(conversation_id.to_string());
            } else {
                info!("No opponent found in tweet {}; leaving it for later", tweet.id);
            }
        }

        let due = self.with_schedule(|s| s.take_due(update_index));
        for duel in due {
            report.judged.push(self.resolve(duel).await);
        }
        Ok(report)
    }

    /// Looks up `handle` and saves its avatar to `path`. Returns the user ID,
    /// or an empty string when the profile could not be fetched.
    async fn fetch_avatar(&self, handle: &str, path: &Path) -> String {
        let profile = match self.platform.get_profile(handle).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Could not fetch profile for @{}: {:#}", handle, e);
                return String::new();
            }
        };

        if let Some(avatar) = &profile.avatar {
            match self.platform.download_to_file(avatar, path).await {
                Ok(()) => info!("Saved @{} profile picture to {}", handle, path.display()),
                Err(e) => warn!("Could not download @{} profile picture: {:#}", handle, e),
            }
        }
        profile.user_id
    }

    async fn resolve(&self, duel: PendingDuel) -> DuelResult {
        let conv = duel.conversation_id.as_str();

        let replies = match self
            .platform
            .search_tweets(&self.config.mention_query(), self.config.search_limit)
            .await
        {
            Ok(tweets) => {
                let groups = group_replies_by_conversation(&tweets);
                let thread = groups.get(conv).map(|r| reply_records(r)).unwrap_or_default();
                if let Err(e) = self.replies.replace_thread(conv, thread.clone()) {
                    warn!("Could not save replies for {}: {}", conv, e);
                }
                thread
            }
            Err(e) => {
                warn!("Reply refresh for {} failed, using saved thread: {:#}", conv, e);
                self.replies.thread(conv)
            }
        };
        info!("Judging duel {} with {} replies", conv, replies.len());

        let verdict = self.judge.judge(&duel.challenger, &duel.opponent, &replies).await;
        info!(
            target: "duel_result",
            "🏆 @{} WON duel {} (@{} vs @{}){}",
            verdict.winner,
            conv,
            duel.challenger,
            duel.opponent,
            if verdict.fallback { " [random fallback]" } else { "" }
        );

        let image = self
            .images
            .generate_winner_image(&verdict.winner, &duel.challenger, &duel.opponent, conv)
            .await;

        let text = result_text(&duel.challenger, &duel.opponent, &verdict.winner);
        let tweet_id = match self.platform.post_reply(&text, conv, image.as_deref()).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Posting result for {} FAILED: {:#}", conv, e);
                None
            }
        };

        let record = MatchRecord {
            challenger_name: duel.challenger.clone(),
            challenger_user_id: duel.challenger_user_id.clone(),
            opponent_name: duel.opponent.clone(),
            opponent_user_id: duel.opponent_user_id.clone(),
            match_winner: verdict.winner.clone(),
            ai_prompt: verdict.prompt.clone(),
        };
        let receipts = record_everywhere(&self.recorders, &record).await;

        DuelResult {
            conversation_id: duel.conversation_id,
            winner: verdict.winner,
            fallback: verdict.fallback,
            image,
            tweet_id,
            receipts,
        }
    }
}
