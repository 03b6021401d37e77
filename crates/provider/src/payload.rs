use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The typed raw payload a `Provider::fetch` call yields, one variant
/// per platform. The `Normalizer` dispatches on this tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "snake_case")]
pub enum RawPayload {
    Github(GithubRaw),
    Bluesky(BlueskyRaw),
    Youtube(YoutubeRaw),
    Reddit(RedditRaw),
    Twitter(TwitterRaw),
    Linear(LinearRaw),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubRaw {
    pub username: String,
    pub repos: HashMap<String, GithubRepoActivity>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GithubRepoActivity {
    pub commits: Vec<GithubCommit>,
    pub pull_requests: Vec<GithubPullRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubCommit {
    pub sha: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub branch: String,
    pub additions: u32,
    pub deletions: u32,
    pub files_changed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GithubPullRequestState {
    Open,
    Closed,
    Merged,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubPullRequest {
    pub number: u64,
    pub title: String,
    pub state: GithubPullRequestState,
    pub commit_shas: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueskyRaw {
    pub posts: Vec<BlueskyPost>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueskyPost {
    pub uri: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_handle: String,
    pub reply_count: u32,
    pub repost_count: u32,
    pub like_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YoutubeRaw {
    pub videos: Vec<YoutubeVideo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YoutubeVideo {
    pub video_id: String,
    pub title: String,
    pub published_at: DateTime<Utc>,
    pub channel_title: String,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditRaw {
    pub submissions: Vec<RedditSubmission>,
    pub comments: Vec<RedditComment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditMeta {
    pub karma: i64,
    pub active_subreddits: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditSubmission {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub created_utc: DateTime<Utc>,
    pub permalink: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditComment {
    pub id: String,
    pub subreddit: String,
    pub body: String,
    pub created_utc: DateTime<Utc>,
    pub permalink: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwitterRaw {
    pub tweets: Vec<Tweet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author_handle: String,
    pub reply_count: u32,
    pub retweet_count: u32,
    pub like_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRaw {
    pub issues: Vec<LinearIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearIssue {
    pub id: String,
    pub identifier: String,
    pub title: String,
    pub team: String,
    pub status: String,
    pub updated_at: DateTime<Utc>,
    pub url: String,
}
