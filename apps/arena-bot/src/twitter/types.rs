//! Twitter API v2 wire types and the trimmed domain types built from them.

use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub username: String,
    pub name: Option<String>,
    pub author_id: Option<String>,
    pub conversation_id: Option<String>,
    pub in_reply_to_status_id: Option<String>,
    pub is_reply: bool,
    pub likes: u64,
    /// Unix seconds; 0 when the API did not report a creation time.
    pub timestamp: i64,
    pub permanent_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub user_id: String,
    pub username: String,
    pub name: String,
    pub avatar: Option<String>,
    pub followers_count: u64,
    pub following_count: u64,
    pub tweets_count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub data: Option<Vec<ApiTweet>>,
    pub includes: Option<Includes>,
    pub meta: Option<SearchMeta>,
    pub errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiTweet {
    pub id: String,
    pub text: String,
    pub author_id: Option<String>,
    pub conversation_id: Option<String>,
    pub created_at: Option<String>,
    pub referenced_tweets: Option<Vec<ReferencedTweet>>,
    pub public_metrics: Option<TweetMetrics>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReferencedTweet {
    #[serde(rename = "type")]
    pub ref_type: String,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TweetMetrics {
    #[serde(default)]
    pub like_count: u64,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct Includes {
    #[serde(default)]
    pub users: Vec<ApiUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUser {
    pub id: String,
    pub username: String,
    pub name: String,
    pub profile_image_url: Option<String>,
    pub public_metrics: Option<UserMetrics>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserMetrics {
    #[serde(default)]
    pub followers_count: u64,
    #[serde(default)]
    pub following_count: u64,
    #[serde(default)]
    pub tweet_count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchMeta {
    pub next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiError {
    pub fn describe(&self) -> String {
        self.detail
            .as_deref()
            .or(self.message.as_deref())
            .or(self.title.as_deref())
            .unwrap_or("unknown error")
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserResponse {
    pub data: Option<ApiUser>,
    pub errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostTweetResponse {
    pub data: Option<PostedTweet>,
    pub errors: Option<Vec<ApiError>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostedTweet {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MediaUploadResponse {
    pub media_id_string: String,
}

/// Swaps the 48px `_normal` avatar for the 400px variant.
pub fn full_size_avatar(url: &str) -> String {
    url.replace("_normal.", "_400x400.")
}

impl From<ApiUser> for Profile {
    fn from(user: ApiUser) -> Self {
        let metrics = user.public_metrics;
        Self {
            user_id: user.id,
            username: user.username,
            name: user.name,
            avatar: user.profile_image_url.as_deref().map(full_size_avatar),
            followers_count: metrics.as_ref().map_or(0, |m| m.followers_count),
            following_count: metrics.as_ref().map_or(0, |m| m.following_count),
            tweets_count: metrics.as_ref().map_or(0, |m| m.tweet_count),
        }
    }
}

pub(crate) fn convert_tweet(raw: ApiTweet, users: &HashMap<String, (String, String)>) -> Tweet {
    let author = raw.author_id.as_ref().and_then(|id| users.get(id));
    let username = author.map(|(u, _)| u.clone()).unwrap_or_default();
    let in_reply_to_status_id = raw
        .referenced_tweets
        .as_ref()
        .and_then(|refs| refs.iter().find(|r| r.ref_type == "replied_to"))
        .map(|r| r.id.clone());
    let timestamp = raw
        .created_at
        .as_deref()
        .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
        .map_or(0, |t| t.timestamp());

    Tweet {
        permanent_url: format!("https://x.com/{}/status/{}", username, raw.id),
        is_reply: in_reply_to_status_id.is_some(),
        in_reply_to_status_id,
        name: author.map(|(_, n)| n.clone()),
        likes: raw.public_metrics.map_or(0, |m| m.like_count),
        id: raw.id,
        text: raw.text,
        username,
        author_id: raw.author_id,
        conversation_id: raw.conversation_id,
        timestamp,
    }
}
