use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::{ItemKind, Platform};

/// A normalized activity record, the common output of every platform's
/// `Normalizer`.
///
/// `id` is `{platform}:{type}:{stable-key}` where stable-key is the
/// platform's own immutable identifier — see each `ItemPayload` variant
/// for what that key is derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineItem {
    pub id: String,
    pub platform: Platform,
    pub kind: ItemKind,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub url: Option<String>,
    pub payload: ItemPayload,
}

impl TimelineItem {
    /// Sort/tie-break key used by the grouper: `(platform, kind, id)`
    /// lexicographic order, applied only when timestamps are equal.
    #[must_use]
    pub fn tie_break_key(&self) -> (Platform, ItemKind, &str) {
        (self.platform, self.kind, self.id.as_str())
    }
}

/// Truncates `s` to at most `max_chars` characters, appending an
/// ellipsis when truncation occurs. Operates on chars, not bytes, so it
/// never splits a multi-byte codepoint.
#[must_use]
pub fn truncate_title(s: &str, max_chars: usize) -> String {
    let first_line = s.lines().next().unwrap_or("").trim();
    let char_count = first_line.chars().count();
    if char_count <= max_chars {
        return first_line.to_string();
    }
    let truncated: String = first_line.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{truncated}…")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemPayload {
    Commit {
        repo: String,
        branch: String,
        sha: String,
        additions: u32,
        deletions: u32,
        files_changed: u32,
    },
    PullRequest {
        repo: String,
        number: u64,
        state: PullRequestState,
        commit_shas: Vec<String>,
    },
    Post {
        author_handle: String,
        reply_count: u32,
        repost_count: u32,
        like_count: u32,
    },
    Comment {
        author_handle: String,
        parent_id: Option<String>,
    },
    Video {
        video_id: String,
        channel_title: String,
        thumbnail_url: Option<String>,
    },
    Task {
        task_id: String,
        team: String,
        status: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_leaves_short_titles_untouched() {
        assert_eq!(truncate_title("fix bug", 72), "fix bug");
    }

    #[test]
    fn truncate_uses_first_line_only() {
        assert_eq!(truncate_title("first\nsecond", 72), "first");
    }

    #[test]
    fn truncate_appends_ellipsis_when_over_limit() {
        let long = "a".repeat(100);
        let truncated = truncate_title(&long, 72);
        assert_eq!(truncated.chars().count(), 72);
        assert!(truncated.ends_with('…'));
    }
}
