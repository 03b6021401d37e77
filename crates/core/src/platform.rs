use serde::{Deserialize, Serialize};

/// The external services this pipeline knows how to fetch from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Github,
    Bluesky,
    Youtube,
    Reddit,
    Twitter,
    Linear,
}

impl Platform {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Github => "github",
            Platform::Bluesky => "bluesky",
            Platform::Youtube => "youtube",
            Platform::Reddit => "reddit",
            Platform::Twitter => "twitter",
            Platform::Linear => "linear",
        }
    }

    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "github" => Some(Platform::Github),
            "bluesky" => Some(Platform::Bluesky),
            "youtube" => Some(Platform::Youtube),
            "reddit" => Some(Platform::Reddit),
            "twitter" => Some(Platform::Twitter),
            "linear" => Some(Platform::Linear),
            _ => None,
        }
    }

    #[must_use]
    pub fn all() -> &'static [Platform] {
        &[
            Platform::Github,
            Platform::Bluesky,
            Platform::Youtube,
            Platform::Reddit,
            Platform::Twitter,
            Platform::Linear,
        ]
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = crate::error::TimelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::from_str_opt(s)
            .ok_or_else(|| crate::error::TimelineError::Validation(format!("unknown platform: {s}")))
    }
}

/// Kinds of normalized activity a `TimelineItem` can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Commit,
    PullRequest,
    Post,
    Comment,
    Video,
    Task,
}

impl ItemKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Commit => "commit",
            ItemKind::PullRequest => "pull_request",
            ItemKind::Post => "post",
            ItemKind::Comment => "comment",
            ItemKind::Video => "video",
            ItemKind::Task => "task",
        }
    }
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
