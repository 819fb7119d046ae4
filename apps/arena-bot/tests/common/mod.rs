#![allow(dead_code)]

use anyhow::{bail, Result};
use arena_bot::{Profile, SocialPlatform, Tweet};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const NOW: i64 = 1_750_000_000;

pub fn main_tweet(id: &str, author: &str, text: &str, timestamp: i64) -> Tweet {
    Tweet {
        id: id.into(),
        text: text.into(),
        username: author.into(),
        conversation_id: Some(id.into()),
        timestamp,
        permanent_url: format!("https://x.com/{}/status/{}", author, id),
        ..Default::default()
    }
}

pub fn reply(id: &str, conversation: &str, author: &str, text: &str, likes: u64) -> Tweet {
    Tweet {
        id: id.into(),
        text: text.into(),
        username: author.into(),
        conversation_id: Some(conversation.into()),
        in_reply_to_status_id: Some(conversation.into()),
        is_reply: true,
        likes,
        timestamp: NOW - 10,
        permanent_url: format!("https://x.com/{}/status/{}", author, id),
        ..Default::default()
    }
}

pub fn profile(handle: &str, user_id: &str) -> Profile {
    Profile {
        user_id: user_id.into(),
        username: handle.into(),
        name: handle.to_uppercase(),
        avatar: Some(format!("https://pbs.twimg.com/{}.jpg", handle)),
        ..Default::default()
    }
}

#[derive(Default)]
pub struct FakePlatform {
    pub tweets: Mutex<Vec<Tweet>>,
    /// Returned instead of `tweets` when the query has no `-from:` filter.
    pub plain_tweets: Mutex<Vec<Tweet>>,
    pub profiles: HashMap<String, Profile>,
    pub queries: Mutex<Vec<String>>,
    pub posts: Mutex<Vec<(String, String, Option<PathBuf>)>>,
    pub fail_search: Mutex<bool>,
    pub fail_post: bool,
}

impl FakePlatform {
    pub fn with_profiles(profiles: &[(&str, &str)]) -> Self {
        Self {
            profiles: profiles
                .iter()
                .map(|(h, id)| (h.to_string(), profile(h, id)))
                .collect(),
            ..Default::default()
        }
    }

    pub fn set_tweets(&self, tweets: Vec<Tweet>) {
        *self.tweets.lock().unwrap() = tweets;
    }

    pub fn posts(&self) -> Vec<(String, String, Option<PathBuf>)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl SocialPlatform for FakePlatform {
    async fn search_tweets(&self, query: &str, max: usize) -> Result<Vec<Tweet>> {
        self.queries.lock().unwrap().push(query.to_string());
        if *self.fail_search.lock().unwrap() {
            bail!("HTTP error 503: service unavailable");
        }
        let source = if query.contains("-from:") {
            &self.tweets
        } else {
            &self.plain_tweets
        };
        Ok(source.lock().unwrap().iter().take(max).cloned().collect())
    }

    async fn get_profile(&self, handle: &str) -> Result<Profile> {
        match self.profiles.get(handle) {
            Some(p) => Ok(p.clone()),
            None => bail!("user @{} not found", handle),
        }
    }

    async fn download_to_file(&self, _url: &str, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"avatar")?;
        Ok(())
    }

    async fn post_reply(&self, text: &str, reply_to: &str, image: Option<&Path>) -> Result<String> {
        if self.fail_post {
            bail!("HTTP error 403: forbidden");
        }
        let mut posts = self.posts.lock().unwrap();
        posts.push((text.to_string(), reply_to.to_string(), image.map(Path::to_path_buf)));
        Ok(format!("post-{}", posts.len()))
    }
}
