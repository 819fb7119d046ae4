//! Picking challenge tweets out of a mention search.

use crate::twitter::Tweet;
use core_logic::ReplyRecord;
use std::collections::{BTreeSet, HashMap};

/// Mentions of `handle` that the account itself did not write.
pub fn search_query(handle: &str) -> String {
    format!("@{handle} -from:{handle}")
}

/// Root (non-reply) tweets not yet processed, oldest first.
pub fn unprocessed_main_tweets<'a>(tweets: &'a [Tweet], processed: &BTreeSet<String>) -> Vec<&'a Tweet> {
    let mut main: Vec<&Tweet> = tweets
        .iter()
        .filter(|t| !t.is_reply && !processed.contains(&t.id))
        .collect();
    main.sort_by_key(|t| t.timestamp);
    main
}

/// Reply tweets grouped by the conversation they belong to.
pub fn group_replies_by_conversation(tweets: &[Tweet]) -> HashMap<String, Vec<&Tweet>> {
    let mut groups: HashMap<String, Vec<&Tweet>> = HashMap::new();
    for t in tweets.iter().filter(|t| t.is_reply) {
        if let Some(conv) = &t.conversation_id {
            groups.entry(conv.clone()).or_default().push(t);
        }
    }
    groups
}

pub fn is_stale(tweet: &Tweet, now: i64, max_age_secs: i64) -> bool {
    now - tweet.timestamp > max_age_secs
}

pub fn reply_records(replies: &[&Tweet]) -> Vec<ReplyRecord> {
    replies
        .iter()
        .map(|r| ReplyRecord {
            conversation_id: r.conversation_id.clone(),
            likes: Some(r.likes),
            name: r.name.clone(),
            permanent_url: Some(r.permanent_url.clone()),
            text: r.text.clone(),
            username: r.username.clone(),
            is_reply: r.is_reply,
            timestamp: Some(r.timestamp),
        })
        .collect()
}

pub fn result_text(challenger: &str, opponent: &str, winner: &str) -> String {
    format!(
        "🏆 The winner of the duel between @{} and @{} is @{}!",
        challenger, opponent, winner
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tweet(id: &str, ts: i64, reply_to: Option<&str>) -> Tweet {
        Tweet {
            id: id.into(),
            timestamp: ts,
            is_reply: reply_to.is_some(),
            in_reply_to_status_id: reply_to.map(Into::into),
            conversation_id: Some(reply_to.unwrap_or(id).to_string()),
            username: format!("user{}", id),
            likes: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_unprocessed_main_tweets_oldest_first() {
        let tweets = vec![
            tweet("3", 300, None),
            tweet("1", 100, None),
            tweet("2", 200, None),
            tweet("4", 50, Some("1")),
        ];
        let processed: BTreeSet<String> = ["1".to_string()].into();

        let ids: Vec<&str> = unprocessed_main_tweets(&tweets, &processed)
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[test]
    fn test_group_replies_by_conversation() {
        let tweets = vec![
            tweet("1", 100, None),
            tweet("2", 110, Some("1")),
            tweet("3", 120, Some("1")),
            tweet("5", 130, Some("4")),
        ];
        let groups = group_replies_by_conversation(&tweets);
        assert_eq!(groups["1"].len(), 2);
        assert_eq!(groups["4"].len(), 1);
        assert!(!groups.contains_key("5"));
    }

    #[test]
    fn test_is_stale_after_twelve_hours() {
        let t = tweet("1", 1_000, None);
        assert!(!is_stale(&t, 1_000 + 43_200, 43_200));
        assert!(is_stale(&t, 1_000 + 43_201, 43_200));
    }

    #[test]
    fn test_reply_records_keep_judge_fields() {
        let t = tweet("2", 110, Some("1"));
        let records = reply_records(&[&t]);
        assert_eq!(records[0].username, "user2");
        assert_eq!(records[0].likes, Some(2));
        assert_eq!(records[0].conversation_id.as_deref(), Some("1"));
        assert!(records[0].is_reply);
    }

    #[test]
    fn test_result_text() {
        assert_eq!(
            result_text("maximus", "lucius", "lucius"),
            "🏆 The winner of the duel between @maximus and @lucius is @lucius!"
        );
        assert_eq!(search_query("gamemakertest"), "@gamemakertest -from:gamemakertest");
    }
}
