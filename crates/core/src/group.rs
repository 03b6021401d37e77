use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::timeline_item::TimelineItem;

/// Same-repo, same-branch, same-date commits folded into one entry.
///
/// Produced by the grouper; one per `(repo, branch, date)` partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitGroup {
    pub repo: String,
    pub branch: String,
    pub date: NaiveDate,
    pub commits: Vec<TimelineItem>,
    pub total_additions: u32,
    pub total_deletions: u32,
    pub total_files_changed: u32,
}

impl CommitGroup {
    /// A group's timestamp for sort purposes: its newest commit's
    /// timestamp, falling back to midnight UTC on the group's date if
    /// somehow empty.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.commits
            .iter()
            .map(|c| c.timestamp)
            .max()
            .unwrap_or_else(|| self.date.and_hms_opt(0, 0, 0).unwrap().and_utc())
    }
}

/// Either a standalone normalized item or a folded commit group, the
/// two kinds of entry a `DateGroup` can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry_kind", rename_all = "snake_case")]
pub enum TimelineEntry {
    Item(TimelineItem),
    CommitGroup(CommitGroup),
}

impl TimelineEntry {
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TimelineEntry::Item(item) => item.timestamp,
            TimelineEntry::CommitGroup(group) => group.timestamp(),
        }
    }

    /// Tie-break key for entries with equal timestamps: items sort by
    /// `(platform, kind, id)`; commit groups sort after by their own
    /// `(repo, branch, date)` since they have no single platform/kind/id.
    #[must_use]
    pub fn tie_break_key(&self) -> String {
        match self {
            TimelineEntry::Item(item) => format!("{}:{}:{}", item.platform, item.kind, item.id),
            TimelineEntry::CommitGroup(group) => {
                format!("commit_group:{}:{}:{}", group.repo, group.branch, group.date)
            }
        }
    }
}

/// The top-level bucket in a `TimelineSnapshot`: all entries that fall
/// on one calendar date, UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateGroup {
    pub date: NaiveDate,
    pub entries: Vec<TimelineEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ItemKind, Platform};
    use crate::timeline_item::ItemPayload;

    fn commit_item(sha: &str, ts: DateTime<Utc>) -> TimelineItem {
        TimelineItem {
            id: format!("github:commit:{sha}"),
            platform: Platform::Github,
            kind: ItemKind::Commit,
            timestamp: ts,
            title: "fix".into(),
            url: None,
            payload: ItemPayload::Commit {
                repo: "alice/x".into(),
                branch: "main".into(),
                sha: sha.into(),
                additions: 1,
                deletions: 0,
                files_changed: 1,
            },
        }
    }

    #[test]
    fn commit_group_timestamp_is_newest_commit() {
        let older = Utc::now() - chrono::Duration::hours(2);
        let newer = Utc::now();
        let group = CommitGroup {
            repo: "alice/x".into(),
            branch: "main".into(),
            date: newer.date_naive(),
            commits: vec![commit_item("aaaaaaa", older), commit_item("bbbbbbb", newer)],
            total_additions: 2,
            total_deletions: 0,
            total_files_changed: 2,
        };
        assert_eq!(group.timestamp(), newer);
    }
}
