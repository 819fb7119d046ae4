//! Twitter API v2 client.
//!
//! Reads (search, profile lookup) use the app-only bearer token. Writes
//! (tweets, media upload) are signed with the bot account's OAuth 1.0a
//! user credentials.

pub mod oauth;
pub mod types;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use core_logic::{env_required, with_retry, NetworkError, RetryConfig};
use oauth::{authorization_header, OAuthCredentials};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};
use types::{
    convert_tweet, MediaUploadResponse, PostTweetResponse, SearchResponse, UserResponse,
};

pub use types::{Profile, Tweet};

const API_BASE: &str = "https://api.twitter.com/2";
const MEDIA_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";
const TWEET_FIELDS: &str = "author_id,conversation_id,created_at,referenced_tweets,public_metrics";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// What the duel and address loops need from a social network.
#[async_trait]
pub trait SocialPlatform: Send + Sync {
    /// Recent tweets matching `query`, newest first, at most `max`.
    async fn search_tweets(&self, query: &str, max: usize) -> Result<Vec<Tweet>>;

    async fn get_profile(&self, handle: &str) -> Result<Profile>;

    async fn download_to_file(&self, url: &str, path: &Path) -> Result<()>;

    /// Posts `text` as a reply to `reply_to`, attaching the image at `image`
    /// when given. Returns the new tweet ID.
    async fn post_reply(&self, text: &str, reply_to: &str, image: Option<&Path>) -> Result<String>;
}

#[derive(Clone)]
pub struct TwitterCredentials {
    pub bearer_token: String,
    pub oauth: OAuthCredentials,
}

impl TwitterCredentials {
    /// Reads `TWITTER_BEARER_TOKEN`, `TWITTER_CONSUMER_KEY`,
    /// `TWITTER_CONSUMER_SECRET`, `TWITTER_ACCESS_TOKEN` and
    /// `TWITTER_ACCESS_TOKEN_SECRET`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bearer_token: env_required("TWITTER_BEARER_TOKEN")?,
            oauth: OAuthCredentials {
                consumer_key: env_required("TWITTER_CONSUMER_KEY")?,
                consumer_secret: env_required("TWITTER_CONSUMER_SECRET")?,
                access_token: env_required("TWITTER_ACCESS_TOKEN")?,
                access_token_secret: env_required("TWITTER_ACCESS_TOKEN_SECRET")?,
            },
        })
    }
}

pub struct TwitterClient {
    http: Client,
    credentials: TwitterCredentials,
    api_base: String,
    retry: RetryConfig,
}

impl TwitterClient {
    pub fn new(credentials: TwitterCredentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            credentials,
            api_base: API_BASE.to_string(),
            retry: RetryConfig::new(3, 2000).transient_only(),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(TwitterCredentials::from_env()?)
    }

    async fn check_status(response: Response, endpoint: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok())
                .map(|reset| (reset - chrono::Utc::now().timestamp()).max(0) as u64)
                .unwrap_or(60);
            return Err(NetworkError::RateLimited {
                endpoint: endpoint.to_string(),
                retry_after,
            }
            .into());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NetworkError::HttpError {
            status_code: status.as_u16(),
            endpoint: endpoint.to_string(),
            body,
        }
        .into())
    }

    async fn search_page(
        &self,
        query: &str,
        page_size: usize,
        next_token: Option<&str>,
    ) -> Result<SearchResponse> {
        let url = format!("{}/tweets/search/recent", self.api_base);
        let page_size = page_size.to_string();
        let mut params = vec![
            ("query", query),
            ("max_results", page_size.as_str()),
            ("tweet.fields", TWEET_FIELDS),
            ("expansions", "author_id"),
            ("user.fields", "username,name"),
        ];
        if let Some(token) = next_token {
            params.push(("next_token", token));
        }

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.credentials.bearer_token)
            .query(&params)
            .send()
            .await
            .context("Twitter search request failed")?;

        Self::check_status(response, "tweets/search/recent")
            .await?
            .json::<SearchResponse>()
            .await
            .context("Could not parse Twitter search response")
    }

    async fn upload_media(&self, bytes: Vec<u8>, mime: &str) -> Result<String> {
        let auth = authorization_header("POST", MEDIA_UPLOAD_URL, &self.credentials.oauth, &[]);
        let part = Part::bytes(bytes)
            .file_name("media")
            .mime_str(mime)
            .context("Invalid media MIME type")?;

        let response = self
            .http
            .post(MEDIA_UPLOAD_URL)
            .header("Authorization", auth)
            .multipart(Form::new().part("media", part))
            .send()
            .await
            .context("Media upload request failed")?;

        let uploaded: MediaUploadResponse = Self::check_status(response, "media/upload")
            .await?
            .json()
            .await
            .context("Could not parse media upload response")?;
        debug!("Uploaded media {}", uploaded.media_id_string);
        Ok(uploaded.media_id_string)
    }

    pub async fn send_tweet(
        &self,
        text: &str,
        reply_to: Option<&str>,
        media_ids: &[String],
    ) -> Result<String> {
        let url = format!("{}/tweets", self.api_base);
        let mut body = json!({ "text": text });
        if let Some(id) = reply_to {
            body["reply"] = json!({ "in_reply_to_tweet_id": id });
        }
        if !media_ids.is_empty() {
            body["media"] = json!({ "media_ids": media_ids });
        }

        let auth = authorization_header("POST", &url, &self.credentials.oauth, &[]);
        let response = self
            .http
            .post(&url)
            .header("Authorization", auth)
            .json(&body)
            .send()
            .await
            .context("Post tweet request failed")?;

        let posted: PostTweetResponse = Self::check_status(response, "tweets")
            .await?
            .json()
            .await
            .context("Could not parse post tweet response")?;

        if let Some(errors) = posted.errors.filter(|e| !e.is_empty()) {
            bail!("Twitter rejected tweet: {}", errors[0].describe());
        }
        posted
            .data
            .map(|d| d.id)
            .ok_or_else(|| anyhow::anyhow!("Twitter returned no tweet data"))
    }
}

#[async_trait]
impl SocialPlatform for TwitterClient {
    async fn search_tweets(&self, query: &str, max: usize) -> Result<Vec<Tweet>> {
        let mut tweets = Vec::new();
        let mut next_token: Option<String> = None;

        while tweets.len() < max {
            // The endpoint accepts 10..=100 results per page.
            let page_size = (max - tweets.len()).clamp(10, 100);
            let token = next_token.clone();
            let page = with_retry(self.retry.clone(), "twitter search", || {
                self.search_page(query, page_size, token.as_deref())
            })
            .await?;

            if let Some(errors) = page.errors.as_ref().filter(|e| !e.is_empty()) {
                if page.data.is_none() {
                    bail!("Twitter search failed: {}", errors[0].describe());
                }
                warn!("Twitter search returned partial errors: {}", errors[0].describe());
            }

            let users: HashMap<String, (String, String)> = page
                .includes
                .unwrap_or_default()
                .users
                .into_iter()
                .map(|u| (u.id, (u.username, u.name)))
                .collect();

            let data = page.data.unwrap_or_default();
            if data.is_empty() {
                break;
            }
            tweets.extend(data.into_iter().map(|t| convert_tweet(t, &users)));

            next_token = page.meta.and_then(|m| m.next_token);
            if next_token.is_none() {
                break;
            }
        }

        tweets.truncate(max);
        debug!("Search '{}' returned {} tweets", query, tweets.len());
        Ok(tweets)
    }

    async fn get_profile(&self, handle: &str) -> Result<Profile> {
        let handle = core_logic::text::normalize_twitter_handle(handle);
        let url = format!("{}/users/by/username/{}", self.api_base, handle);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.credentials.bearer_token)
            .query(&[("user.fields", "profile_image_url,public_metrics")])
            .send()
            .await
            .with_context(|| format!("Profile request for @{} failed", handle))?;

        let user: UserResponse = Self::check_status(response, "users/by/username")
            .await?
            .json()
            .await
            .context("Could not parse profile response")?;

        match user.data {
            Some(data) => Ok(data.into()),
            None => {
                let reason = user
                    .errors
                    .and_then(|e| e.into_iter().next())
                    .map(|e| e.describe())
                    .unwrap_or_else(|| "no user data".to_string());
                bail!("Profile @{} not found: {}", handle, reason)
            }
        }
    }

    async fn download_to_file(&self, url: &str, path: &Path) -> Result<()> {
        let result: Result<()> = async {
            let response = self
                .http
                .get(url)
                .timeout(DOWNLOAD_TIMEOUT)
                .send()
                .await
                .with_context(|| format!("Download of {} failed", url))?;
            if response.status() != StatusCode::OK {
                bail!("Failed to get '{}' ({})", url, response.status());
            }
            let bytes = response.bytes().await.context("Download interrupted")?;

            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(path, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(())
        }
        .await;

        if result.is_err() && path.exists() {
            tokio::fs::remove_file(path).await.ok();
        }
        result
    }

    async fn post_reply(&self, text: &str, reply_to: &str, image: Option<&Path>) -> Result<String> {
        let mut media_ids = Vec::new();
        if let Some(path) = image {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            media_ids.push(self.upload_media(bytes, mime_for(path)).await?);
        }

        let id = self.send_tweet(text, Some(reply_to), &media_ids).await?;
        info!("Posted tweet {} in reply to {}", id, reply_to);
        Ok(id)
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}
