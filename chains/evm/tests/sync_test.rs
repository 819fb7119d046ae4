use anyhow::Result;
use arena_evm::{MatchSource, MatchSyncer, RewardsLedger, SyncTarget};
use async_trait::async_trait;
use core_logic::{MatchRecord, StoredMatch};
use std::sync::{Arc, Mutex};

/// History chain holding matches 1..=total.
struct FakeHistory {
    total: u64,
    requests: Mutex<Vec<u64>>,
}

#[async_trait]
impl MatchSource for FakeHistory {
    async fn recent_matches(&self, count: u64) -> Result<Vec<StoredMatch>> {
        self.requests.lock().unwrap().push(count);
        let oldest = self.total.saturating_sub(count) + 1;
        Ok((oldest..=self.total)
            .rev()
            .map(|id| StoredMatch {
                match_id: id,
                record: MatchRecord {
                    challenger_user_id: format!("u{}", id % 3),
                    opponent_user_id: format!("u{}", (id + 1) % 3),
                    ..Default::default()
                },
            })
            .collect())
    }
}

#[derive(Default)]
struct FakeTarget {
    last: u64,
    synced: Mutex<Vec<(Vec<u64>, u64)>>,
}

#[async_trait]
impl SyncTarget for FakeTarget {
    async fn last_synced_match_id(&self) -> Result<u64> {
        Ok(self.last)
    }

    async fn sync_matches(&self, matches: &[StoredMatch], latest: u64) -> Result<String> {
        let ids = matches.iter().map(|m| m.match_id).collect();
        self.synced.lock().unwrap().push((ids, latest));
        Ok("0xsync".to_string())
    }
}

struct FailingRewards;

#[async_trait]
impl RewardsLedger for FailingRewards {
    async fn increment_unclaimed(&self, _user_ids: &[String]) -> Result<String> {
        anyhow::bail!("execution reverted")
    }
}

#[derive(Default)]
struct RecordingRewards {
    calls: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl RewardsLedger for RecordingRewards {
    async fn increment_unclaimed(&self, user_ids: &[String]) -> Result<String> {
        self.calls.lock().unwrap().push(user_ids.to_vec());
        Ok("0xrewards".to_string())
    }
}

fn history(total: u64) -> Arc<FakeHistory> {
    Arc::new(FakeHistory {
        total,
        requests: Mutex::new(Vec::new()),
    })
}

#[tokio::test]
async fn test_syncs_only_matches_after_last_synced() {
    let source = history(10);
    let target = Arc::new(FakeTarget {
        last: 7,
        ..Default::default()
    });
    let rewards = Arc::new(RecordingRewards::default());

    let report = MatchSyncer::new(source.clone(), target.clone())
        .with_rewards(rewards.clone())
        .sync_once()
        .await
        .unwrap();

    assert_eq!(report.synced, 3);
    assert_eq!(report.latest_match_id, Some(10));
    assert_eq!(report.rewards_tx.as_deref(), Some("0xrewards"));
    assert_eq!(
        target.synced.lock().unwrap().as_slice(),
        &[(vec![8, 9, 10], 10)]
    );
    assert_eq!(source.requests.lock().unwrap().as_slice(), &[100]);
    assert_eq!(rewards.calls.lock().unwrap()[0], vec!["u2", "u0", "u1"]);
}

#[tokio::test]
async fn test_pages_until_synced_region_reached() {
    let source = history(250);
    let target = Arc::new(FakeTarget {
        last: 20,
        ..Default::default()
    });

    let report = MatchSyncer::new(source.clone(), target.clone())
        .with_batch_size(100)
        .sync_once()
        .await
        .unwrap();

    assert_eq!(report.synced, 230);
    assert_eq!(source.requests.lock().unwrap().as_slice(), &[100, 200, 300]);
    let synced = target.synced.lock().unwrap();
    let (ids, latest) = &synced[0];
    assert_eq!(ids.first(), Some(&21));
    assert_eq!(ids.last(), Some(&250));
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*latest, 250);
}

#[tokio::test]
async fn test_nothing_new_skips_writes() {
    let source = history(5);
    let target = Arc::new(FakeTarget {
        last: 5,
        ..Default::default()
    });
    let rewards = Arc::new(RecordingRewards::default());

    let report = MatchSyncer::new(source, target.clone())
        .with_rewards(rewards.clone())
        .sync_once()
        .await
        .unwrap();

    assert_eq!(report.synced, 0);
    assert!(report.sync_tx.is_none());
    assert!(target.synced.lock().unwrap().is_empty());
    assert!(rewards.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rewards_failure_does_not_fail_sync() {
    let target = Arc::new(FakeTarget {
        last: 0,
        ..Default::default()
    });

    let report = MatchSyncer::new(history(3), target)
        .with_rewards(Arc::new(FailingRewards))
        .sync_once()
        .await
        .unwrap();

    assert_eq!(report.synced, 3);
    assert_eq!(report.sync_tx.as_deref(), Some("0xsync"));
    assert!(report.rewards_tx.is_none());
}
