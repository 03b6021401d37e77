//! Turns a platform's [`RawPayload`] into the flat [`TimelineItem`]
//! vocabulary the grouper and materializer operate on.
//!
//! Every function here is a pure, deterministic mapping: same input,
//! same output, every time. IDs are built as
//! `{platform}:{item-kind}:{stable-key}` so re-normalizing the same raw
//! snapshot twice produces byte-identical items.

use timeline_core::{ItemKind, ItemPayload, Platform, PullRequestState as CorePrState, TimelineError, TimelineItem, truncate_title};
use timeline_provider::{GithubPullRequestState, RawPayload};

/// Commit titles: first line of the commit message, truncated to ≤72 chars.
const COMMIT_TITLE_MAX_CHARS: usize = 72;
/// Post/body-derived titles (Bluesky, Reddit, Twitter, and the
/// PR/video/task titles that share the same bound): ≤100 chars.
const POST_TITLE_MAX_CHARS: usize = 100;

/// Normalizes a raw payload into the flat item list for one account.
/// Dispatches purely on the payload's platform tag.
pub fn normalize(raw: &RawPayload) -> Result<Vec<TimelineItem>, TimelineError> {
    match raw {
        RawPayload::Github(g) => Ok(normalize_github(g)),
        RawPayload::Bluesky(b) => Ok(normalize_bluesky(b)),
        RawPayload::Youtube(y) => Ok(normalize_youtube(y)),
        RawPayload::Reddit(r) => Ok(normalize_reddit(r)),
        RawPayload::Twitter(t) => Ok(normalize_twitter(t)),
        RawPayload::Linear(l) => Ok(normalize_linear(l)),
    }
}

fn normalize_github(raw: &timeline_provider::GithubRaw) -> Vec<TimelineItem> {
    let mut items = Vec::new();
    for (repo, activity) in &raw.repos {
        for commit in &activity.commits {
            let short_sha: String = commit.sha.chars().take(7).collect();
            let id = format!("{}:{}:{}:{}", Platform::Github.as_str(), ItemKind::Commit.as_str(), repo, short_sha);
            items.push(TimelineItem {
                id,
                platform: Platform::Github,
                kind: ItemKind::Commit,
                timestamp: commit.timestamp,
                title: truncate_title(&commit.message, COMMIT_TITLE_MAX_CHARS),
                url: None,
                payload: ItemPayload::Commit {
                    repo: repo.clone(),
                    branch: commit.branch.clone(),
                    sha: commit.sha.clone(),
                    additions: commit.additions,
                    deletions: commit.deletions,
                    files_changed: commit.files_changed,
                },
            });
        }
        for pr in &activity.pull_requests {
            let id = format!("{}:{}:{}:{}", Platform::Github.as_str(), ItemKind::PullRequest.as_str(), repo, pr.number);
            items.push(TimelineItem {
                id,
                platform: Platform::Github,
                kind: ItemKind::PullRequest,
                timestamp: pr.updated_at,
                title: truncate_title(&pr.title, POST_TITLE_MAX_CHARS),
                url: Some(pr.url.clone()),
                payload: ItemPayload::PullRequest {
                    repo: repo.clone(),
                    number: pr.number,
                    state: map_pr_state(pr.state),
                    commit_shas: pr.commit_shas.clone(),
                },
            });
        }
    }
    items
}

fn map_pr_state(state: GithubPullRequestState) -> CorePrState {
    match state {
        GithubPullRequestState::Open => CorePrState::Open,
        GithubPullRequestState::Closed => CorePrState::Closed,
        GithubPullRequestState::Merged => CorePrState::Merged,
    }
}

fn normalize_bluesky(raw: &timeline_provider::BlueskyRaw) -> Vec<TimelineItem> {
    raw.posts
        .iter()
        .map(|p| TimelineItem {
            id: format!("{}:{}:{}", Platform::Bluesky.as_str(), ItemKind::Post.as_str(), p.uri),
            platform: Platform::Bluesky,
            kind: ItemKind::Post,
            timestamp: p.created_at,
            title: truncate_title(&p.text, POST_TITLE_MAX_CHARS),
            url: Some(p.uri.clone()),
            payload: ItemPayload::Post {
                author_handle: p.author_handle.clone(),
                reply_count: p.reply_count,
                repost_count: p.repost_count,
                like_count: p.like_count,
            },
        })
        .collect()
}

fn normalize_youtube(raw: &timeline_provider::YoutubeRaw) -> Vec<TimelineItem> {
    raw.videos
        .iter()
        .map(|v| TimelineItem {
            id: format!("{}:{}:{}", Platform::Youtube.as_str(), ItemKind::Video.as_str(), v.video_id),
            platform: Platform::Youtube,
            kind: ItemKind::Video,
            timestamp: v.published_at,
            title: truncate_title(&v.title, POST_TITLE_MAX_CHARS),
            url: Some(format!("https://www.youtube.com/watch?v={}", v.video_id)),
            payload: ItemPayload::Video {
                video_id: v.video_id.clone(),
                channel_title: v.channel_title.clone(),
                thumbnail_url: v.thumbnail_url.clone(),
            },
        })
        .collect()
}

fn normalize_reddit(raw: &timeline_provider::RedditRaw) -> Vec<TimelineItem> {
    let mut items = Vec::new();
    for s in &raw.submissions {
        items.push(TimelineItem {
            id: format!("{}:{}:{}", Platform::Reddit.as_str(), ItemKind::Post.as_str(), s.id),
            platform: Platform::Reddit,
            kind: ItemKind::Post,
            timestamp: s.created_utc,
            title: truncate_title(&s.title, POST_TITLE_MAX_CHARS),
            url: Some(format!("https://reddit.com{}", s.permalink)),
            payload: ItemPayload::Post {
                author_handle: s.subreddit.clone(),
                reply_count: 0,
                repost_count: 0,
                like_count: 0,
            },
        });
    }
    for c in &raw.comments {
        items.push(TimelineItem {
            id: format!("{}:{}:{}", Platform::Reddit.as_str(), ItemKind::Comment.as_str(), c.id),
            platform: Platform::Reddit,
            kind: ItemKind::Comment,
            timestamp: c.created_utc,
            title: truncate_title(&c.body, POST_TITLE_MAX_CHARS),
            url: Some(format!("https://reddit.com{}", c.permalink)),
            payload: ItemPayload::Comment { author_handle: c.subreddit.clone(), parent_id: c.parent_id.clone() },
        });
    }
    items
}

fn normalize_twitter(raw: &timeline_provider::TwitterRaw) -> Vec<TimelineItem> {
    raw.tweets
        .iter()
        .map(|t| TimelineItem {
            id: format!("{}:{}:{}", Platform::Twitter.as_str(), ItemKind::Post.as_str(), t.id),
            platform: Platform::Twitter,
            kind: ItemKind::Post,
            timestamp: t.created_at,
            title: truncate_title(&t.text, POST_TITLE_MAX_CHARS),
            url: Some(format!("https://twitter.com/{}/status/{}", t.author_handle, t.id)),
            payload: ItemPayload::Post {
                author_handle: t.author_handle.clone(),
                reply_count: t.reply_count,
                repost_count: t.retweet_count,
                like_count: t.like_count,
            },
        })
        .collect()
}

fn normalize_linear(raw: &timeline_provider::LinearRaw) -> Vec<TimelineItem> {
    raw.issues
        .iter()
        .map(|i| TimelineItem {
            id: format!("{}:{}:{}", Platform::Linear.as_str(), ItemKind::Task.as_str(), i.identifier),
            platform: Platform::Linear,
            kind: ItemKind::Task,
            timestamp: i.updated_at,
            title: truncate_title(&i.title, POST_TITLE_MAX_CHARS),
            url: Some(i.url.clone()),
            payload: ItemPayload::Task { task_id: i.identifier.clone(), team: i.team.clone(), status: i.status.clone() },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use timeline_provider::{GithubCommit, GithubPullRequest, GithubRaw, GithubRepoActivity};

    fn ts(s: &str) -> chrono::DateTime<Utc> {
        chrono::DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn github_commit_ids_are_stable_and_deterministic() {
        let mut repos = HashMap::new();
        repos.insert(
            "acme/widgets".to_string(),
            GithubRepoActivity {
                commits: vec![GithubCommit {
                    sha: "abc123".into(),
                    message: "fix bug".into(),
                    timestamp: ts("2024-01-15T10:00:00Z"),
                    branch: "main".into(),
                    additions: 1,
                    deletions: 1,
                    files_changed: 1,
                }],
                pull_requests: vec![],
            },
        );
        let raw = RawPayload::Github(GithubRaw { username: "alice".into(), repos });
        let items = normalize(&raw).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "github:commit:acme/widgets:abc123");
        let again = normalize(&raw).unwrap();
        assert_eq!(items[0].id, again[0].id);
    }

    #[test]
    fn github_pull_request_maps_merged_state() {
        let mut repos = HashMap::new();
        repos.insert(
            "acme/widgets".into(),
            GithubRepoActivity {
                commits: vec![],
                pull_requests: vec![GithubPullRequest {
                    number: 7,
                    title: "Add feature".into(),
                    state: GithubPullRequestState::Merged,
                    commit_shas: vec!["abc123".into()],
                    updated_at: ts("2024-01-16T10:00:00Z"),
                    url: "https://github.com/acme/widgets/pull/7".into(),
                }],
            },
        );
        let raw = RawPayload::Github(GithubRaw { username: "alice".into(), repos });
        let items = normalize(&raw).unwrap();
        assert_eq!(items.len(), 1);
        match &items[0].payload {
            ItemPayload::PullRequest { state, .. } => assert_eq!(*state, CorePrState::Merged),
            _ => panic!("expected pull request payload"),
        }
    }

    #[test]
    fn long_titles_are_truncated() {
        let raw = RawPayload::Bluesky(timeline_provider::BlueskyRaw {
            posts: vec![timeline_provider::BlueskyPost {
                uri: "at://did:plc:x/app.bsky.feed.post/1".into(),
                text: "a".repeat(500),
                created_at: ts("2024-01-15T10:00:00Z"),
                author_handle: "alice.bsky.social".into(),
                reply_count: 0,
                repost_count: 0,
                like_count: 0,
            }],
        });
        let items = normalize(&raw).unwrap();
        assert!(items[0].title.chars().count() <= POST_TITLE_MAX_CHARS);
        assert!(items[0].title.ends_with('\u{2026}'));
    }
}
