use serde::{Deserialize, Serialize};

use crate::group::DateGroup;
use crate::snapshot::SnapshotMeta;

/// The materialized per-user timeline: the payload stored at
/// `timeline/{user_id}` in the Snapshot Store, newest date first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineSnapshot {
    pub meta: SnapshotMeta,
    pub date_groups: Vec<DateGroup>,
}

impl TimelineSnapshot {
    /// The date-bounded view used by `GET /timeline/{user_id}?from=&to=`.
    #[must_use]
    pub fn filter_date_range(
        &self,
        from: Option<chrono::NaiveDate>,
        to: Option<chrono::NaiveDate>,
    ) -> Vec<&DateGroup> {
        self.date_groups
            .iter()
            .filter(|g| from.is_none_or(|f| g.date >= f) && to.is_none_or(|t| g.date <= t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotMeta;
    use chrono::{NaiveDate, Utc};

    fn snapshot_with_dates(dates: &[&str]) -> TimelineSnapshot {
        TimelineSnapshot {
            meta: SnapshotMeta {
                store_id: "timeline/u1".into(),
                version: 1,
                created_at: Utc::now(),
                content_hash: "deadbeef".into(),
                parents: vec![],
                tags: vec![],
            },
            date_groups: dates
                .iter()
                .map(|d| DateGroup {
                    date: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
                    entries: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn filters_inclusive_range() {
        let snap = snapshot_with_dates(&["2024-01-10", "2024-01-15", "2024-01-25"]);
        let from = NaiveDate::parse_from_str("2024-01-10", "%Y-%m-%d").unwrap();
        let to = NaiveDate::parse_from_str("2024-01-20", "%Y-%m-%d").unwrap();
        let filtered = snap.filter_date_range(Some(from), Some(to));
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn no_bounds_returns_everything() {
        let snap = snapshot_with_dates(&["2024-01-10", "2024-01-15"]);
        assert_eq!(snap.filter_date_range(None, None).len(), 2);
    }
}
