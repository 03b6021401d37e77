//! Folds a flat [`TimelineItem`] list into date-bucketed, commit-grouped
//! entries.
//!
//! Two passes: first, standalone commits whose sha already appears in a
//! merged pull request are dropped (the PR already tells that story);
//! then the remaining commits are folded into one [`CommitGroup`] per
//! `(repo, branch, date)` triple. Everything else passes through as a
//! standalone [`TimelineEntry::Item`]. Entries within a day sort newest
//! first, breaking ties on `(platform, kind, id)` so output order is
//! stable across re-runs with identical input.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use timeline_core::{CommitGroup, DateGroup, ItemKind, ItemPayload, TimelineEntry, TimelineItem};

/// Groups a flat item list into newest-first [`DateGroup`]s.
#[must_use]
pub fn group(items: Vec<TimelineItem>) -> Vec<DateGroup> {
    let merged_commit_shas = merged_pr_commit_shas(&items);

    let mut commit_buckets: HashMap<(String, String, NaiveDate), Vec<TimelineItem>> = HashMap::new();
    let mut passthrough: Vec<TimelineItem> = Vec::new();

    for item in items {
        if item.kind == ItemKind::Commit {
            if let ItemPayload::Commit { ref repo, ref branch, ref sha, .. } = item.payload {
                if merged_commit_shas.contains(sha) {
                    continue;
                }
                let date = item.timestamp.date_naive();
                commit_buckets.entry((repo.clone(), branch.clone(), date)).or_default().push(item);
                continue;
            }
        }
        passthrough.push(item);
    }

    let mut entries_by_date: HashMap<NaiveDate, Vec<TimelineEntry>> = HashMap::new();

    for ((repo, branch, date), mut commits) in commit_buckets {
        commits.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.tie_break_key().cmp(&b.tie_break_key())));
        let (total_additions, total_deletions, total_files_changed) = commits.iter().fold((0u32, 0u32, 0u32), |acc, c| {
            if let ItemPayload::Commit { additions, deletions, files_changed, .. } = &c.payload {
                (acc.0 + additions, acc.1 + deletions, acc.2 + files_changed)
            } else {
                acc
            }
        });
        let group = CommitGroup { repo, branch, date, commits, total_additions, total_deletions, total_files_changed };
        entries_by_date.entry(date).or_default().push(TimelineEntry::CommitGroup(group));
    }

    for item in passthrough {
        let date = item.timestamp.date_naive();
        entries_by_date.entry(date).or_default().push(TimelineEntry::Item(item));
    }

    let mut date_groups: Vec<DateGroup> = entries_by_date
        .into_iter()
        .map(|(date, mut entries)| {
            entries.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()).then_with(|| a.tie_break_key().cmp(&b.tie_break_key())));
            DateGroup { date, entries }
        })
        .collect();

    date_groups.sort_by(|a, b| b.date.cmp(&a.date));
    date_groups
}

fn merged_pr_commit_shas(items: &[TimelineItem]) -> HashSet<String> {
    items
        .iter()
        .filter_map(|item| match &item.payload {
            ItemPayload::PullRequest { state, commit_shas, .. } if *state == timeline_core::PullRequestState::Merged => {
                Some(commit_shas.iter().cloned())
            }
            _ => None,
        })
        .flatten()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use timeline_core::{Platform, PullRequestState};

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn commit(sha: &str, repo: &str, branch: &str, at: &str) -> TimelineItem {
        TimelineItem {
            id: format!("github:commit:{repo}:{sha}"),
            platform: Platform::Github,
            kind: ItemKind::Commit,
            timestamp: ts(at),
            title: "msg".into(),
            url: None,
            payload: ItemPayload::Commit {
                repo: repo.into(),
                branch: branch.into(),
                sha: sha.into(),
                additions: 1,
                deletions: 1,
                files_changed: 1,
            },
        }
    }

    fn pull_request(number: u64, repo: &str, state: PullRequestState, shas: &[&str], at: &str) -> TimelineItem {
        TimelineItem {
            id: format!("github:pull_request:{repo}:{number}"),
            platform: Platform::Github,
            kind: ItemKind::PullRequest,
            timestamp: ts(at),
            title: "pr".into(),
            url: None,
            payload: ItemPayload::PullRequest {
                repo: repo.into(),
                number,
                state,
                commit_shas: shas.iter().map(|s| (*s).to_string()).collect(),
            },
        }
    }

    #[test]
    fn commits_in_same_repo_branch_date_fold_together() {
        let items = vec![
            commit("aaa", "acme/x", "main", "2024-01-15T09:00:00Z"),
            commit("bbb", "acme/x", "main", "2024-01-15T14:00:00Z"),
        ];
        let groups = group(items);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].entries.len(), 1);
        match &groups[0].entries[0] {
            TimelineEntry::CommitGroup(g) => assert_eq!(g.commits.len(), 2),
            _ => panic!("expected commit group"),
        }
    }

    #[test]
    fn commit_already_in_merged_pr_is_dropped_as_standalone() {
        let items = vec![
            commit("aaa", "acme/x", "main", "2024-01-15T09:00:00Z"),
            pull_request(1, "acme/x", PullRequestState::Merged, &["aaa"], "2024-01-15T10:00:00Z"),
        ];
        let groups = group(items);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].entries.len(), 1);
        assert!(matches!(groups[0].entries[0], TimelineEntry::Item(_)));
    }

    #[test]
    fn open_pr_commits_are_not_deduped() {
        let items = vec![
            commit("aaa", "acme/x", "main", "2024-01-15T09:00:00Z"),
            pull_request(1, "acme/x", PullRequestState::Open, &["aaa"], "2024-01-15T10:00:00Z"),
        ];
        let groups = group(items);
        assert_eq!(groups[0].entries.len(), 2);
    }

    #[test]
    fn date_groups_sort_newest_first() {
        let items = vec![commit("aaa", "acme/x", "main", "2024-01-10T09:00:00Z"), commit("bbb", "acme/x", "main", "2024-01-20T09:00:00Z")];
        let groups = group(items);
        assert_eq!(groups.len(), 2);
        assert!(groups[0].date > groups[1].date);
    }
}
