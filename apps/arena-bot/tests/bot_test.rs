mod common;

use anyhow::{bail, Result};
use arena_bot::emperor::Verdict;
use arena_bot::image::{challenger_pfp_path, opponent_pfp_path};
use arena_bot::{ArenaBot, BotConfig, ImageMaker, Judge};
use async_trait::async_trait;
use common::{main_tweet, reply, FakePlatform, NOW};
use core_logic::{MatchRecord, MatchRecorder, ProcessedTweetStore, RecordReceipt, ReplyRecord, ReplyStore};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Picks whoever has more replies mentioning them; records what it saw.
#[derive(Default)]
struct CountingJudge {
    seen: Mutex<Vec<(String, String, usize)>>,
}

#[async_trait]
impl Judge for CountingJudge {
    async fn judge(&self, challenger: &str, opponent: &str, replies: &[ReplyRecord]) -> Verdict {
        self.seen
            .lock()
            .unwrap()
            .push((challenger.into(), opponent.into(), replies.len()));
        let votes = |name: &str| replies.iter().filter(|r| r.text.contains(name)).count();
        let winner = if votes(opponent) > votes(challenger) { opponent } else { challenger };
        Verdict {
            winner: winner.to_string(),
            prompt: format!("judge {} vs {}", challenger, opponent),
            scores: None,
            fallback: false,
        }
    }
}

struct FixedImage(Option<PathBuf>);

#[async_trait]
impl ImageMaker for FixedImage {
    async fn generate_winner_image(&self, _: &str, _: &str, _: &str, _: &str) -> Option<PathBuf> {
        self.0.clone()
    }
}

struct Recorder {
    name: &'static str,
    fail: bool,
    records: Mutex<Vec<MatchRecord>>,
}

impl Recorder {
    fn new(name: &'static str, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            fail,
            records: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl MatchRecorder for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    async fn record_match(&self, record: &MatchRecord) -> Result<RecordReceipt> {
        if self.fail {
            bail!("execution reverted");
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(RecordReceipt {
            recorder: self.name.to_string(),
            tx_hash: Some("0xabc".into()),
            detail: String::new(),
        })
    }
}

fn config(dir: &TempDir) -> BotConfig {
    let path = dir.path().join("arena.toml");
    let root = dir.path().display().to_string();
    std::fs::write(
        &path,
        format!(
            r#"
handle = "@ArenaBot"
judge_after_polls = 1
processed_tweets_file = "{root}/processed.json"
replies_file = "{root}/replies.json"
pfp_dir = "{root}/pfp"
images_dir = "{root}/images"
"#
        ),
    )
    .unwrap();
    BotConfig::load(path.to_str().unwrap()).unwrap()
}

struct Harness {
    dir: TempDir,
    platform: Arc<FakePlatform>,
    judge: Arc<CountingJudge>,
    good: Arc<Recorder>,
    bad: Arc<Recorder>,
    bot: ArenaBot,
}

fn harness(platform: FakePlatform, image: Option<PathBuf>) -> Harness {
    let dir = TempDir::new().unwrap();
    let platform = Arc::new(platform);
    let judge = Arc::new(CountingJudge::default());
    let good = Recorder::new("saga", false);
    let bad = Recorder::new("flow-cli", true);
    let bot = ArenaBot::new(
        config(&dir),
        platform.clone(),
        judge.clone(),
        Arc::new(FixedImage(image)),
        vec![bad.clone(), good.clone()],
    );
    Harness { dir, platform, judge, good, bad, bot }
}

#[tokio::test]
async fn test_challenge_is_scheduled_then_judged_next_update() {
    let h = harness(
        FakePlatform::with_profiles(&[("maximus", "11"), ("lucius", "22")]),
        Some(PathBuf::from("winner.png")),
    );
    h.platform.set_tweets(vec![
        main_tweet("100", "maximus", "@ArenaBot I challenge @lucius", NOW - 60),
        reply("101", "100", "fan1", "go lucius", 3),
    ]);

    let first = h.bot.poll_once(0, NOW).await.unwrap();
    assert_eq!(first.scheduled.as_deref(), Some("100"));
    assert!(first.judged.is_empty());
    assert_eq!(h.bot.pending_duels(), 1);

    let processed = ProcessedTweetStore::new(h.dir.path().join("processed.json"));
    assert!(processed.contains("100"));
    let pfp_dir = h.dir.path().join("pfp");
    assert!(challenger_pfp_path(&pfp_dir, "maximus", "100").exists());
    assert!(opponent_pfp_path(&pfp_dir, "lucius", "100").exists());

    // More replies arrive before judging; the thread is refreshed.
    h.platform.set_tweets(vec![
        main_tweet("100", "maximus", "@ArenaBot I challenge @lucius", NOW - 60),
        reply("101", "100", "fan1", "go lucius", 3),
        reply("102", "100", "fan2", "lucius all the way", 1),
    ]);

    let second = h.bot.poll_once(1, NOW).await.unwrap();
    assert!(second.scheduled.is_none());
    assert_eq!(second.judged.len(), 1);
    assert_eq!(h.bot.pending_duels(), 0);

    let duel = &second.judged[0];
    assert_eq!(duel.winner, "lucius");
    assert_eq!(duel.tweet_id.as_deref(), Some("post-1"));
    assert_eq!(duel.receipts.len(), 1);

    assert_eq!(
        h.judge.seen.lock().unwrap().as_slice(),
        &[("maximus".to_string(), "lucius".to_string(), 2)]
    );

    let replies = ReplyStore::new(h.dir.path().join("replies.json"));
    assert_eq!(replies.thread("100").len(), 2);

    let posts = h.platform.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].1, "100");
    assert!(posts[0].0.contains("@lucius!"));
    assert_eq!(posts[0].2, Some(PathBuf::from("winner.png")));

    let records = h.good.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].challenger_user_id, "11");
    assert_eq!(records[0].opponent_user_id, "22");
    assert_eq!(records[0].match_winner, "lucius");
    assert_eq!(records[0].ai_prompt, "judge maximus vs lucius");
    assert!(h.bad.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stale_challenge_is_marked_processed_without_duel() {
    let h = harness(FakePlatform::with_profiles(&[]), None);
    h.platform.set_tweets(vec![main_tweet(
        "200",
        "maximus",
        "@ArenaBot vs @lucius",
        NOW - 13 * 60 * 60,
    )]);

    let report = h.bot.poll_once(0, NOW).await.unwrap();
    assert_eq!(report.stale.as_deref(), Some("200"));
    assert!(report.scheduled.is_none());
    assert_eq!(h.bot.pending_duels(), 0);
    assert!(ProcessedTweetStore::new(h.dir.path().join("processed.json")).contains("200"));
}

#[tokio::test]
async fn test_challenge_without_opponent_stays_unprocessed() {
    let h = harness(FakePlatform::with_profiles(&[]), None);
    h.platform
        .set_tweets(vec![main_tweet("300", "maximus", "hello @arenabot", NOW - 5)]);

    let report = h.bot.poll_once(0, NOW).await.unwrap();
    assert!(report.scheduled.is_none());
    assert!(report.stale.is_none());
    assert!(!ProcessedTweetStore::new(h.dir.path().join("processed.json")).contains("300"));
}

#[tokio::test]
async fn test_only_oldest_challenge_is_taken_per_update() {
    let h = harness(FakePlatform::with_profiles(&[]), None);
    h.platform.set_tweets(vec![
        main_tweet("402", "b", "@ArenaBot vs @c", NOW - 5),
        main_tweet("401", "a", "@ArenaBot vs @b", NOW - 50),
    ]);

    let first = h.bot.poll_once(0, NOW).await.unwrap();
    assert_eq!(first.scheduled.as_deref(), Some("401"));
    let second = h.bot.poll_once(1, NOW).await.unwrap();
    assert_eq!(second.scheduled.as_deref(), Some("402"));
    assert_eq!(second.judged.len(), 1);
    assert_eq!(second.judged[0].conversation_id, "401");
}

#[tokio::test]
async fn test_failed_post_and_missing_profiles_still_record() {
    let platform = FakePlatform {
        fail_post: true,
        ..Default::default()
    };
    let h = harness(platform, None);
    h.platform
        .set_tweets(vec![main_tweet("500", "maximus", "@ArenaBot vs @lucius", NOW - 5)]);

    h.bot.poll_once(0, NOW).await.unwrap();
    let report = h.bot.poll_once(1, NOW).await.unwrap();

    let duel = &report.judged[0];
    assert!(duel.tweet_id.is_none());
    assert!(duel.image.is_none());
    let records = h.good.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].challenger_user_id, "");
    assert_eq!(records[0].opponent_user_id, "");
}

#[tokio::test]
async fn test_failed_search_keeps_due_duel_pending() {
    let h = harness(FakePlatform::with_profiles(&[]), None);
    h.platform.set_tweets(vec![
        main_tweet("600", "maximus", "@ArenaBot vs @lucius", NOW - 5),
        reply("601", "600", "fan", "maximus!", 0),
    ]);
    h.bot.poll_once(0, NOW).await.unwrap();

    // The update's own search fails, so the due duel waits.
    *h.platform.fail_search.lock().unwrap() = true;
    assert!(h.bot.poll_once(1, NOW).await.is_err());
    assert_eq!(h.bot.pending_duels(), 1);

    *h.platform.fail_search.lock().unwrap() = false;
    let report = h.bot.poll_once(2, NOW).await.unwrap();
    assert_eq!(report.judged.len(), 1);
    assert_eq!(report.judged[0].winner, "maximus");
}
