//! Employment date intervals

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A `[start, end)` employment interval; `end == None` means still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
}

impl DateInterval {
    pub fn new(start: NaiveDate, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Whether `other` intersects this interval.
    ///
    /// The two are disjoint only when `other` finished before this one
    /// started, or this one finished before `other` started. An open end
    /// never rules out an overlap on its own.
    pub fn overlaps(&self, other: &DateInterval) -> bool {
        let other_ended_before = matches!(other.end, Some(end) if end < self.start);
        let other_starts_after = matches!(self.end, Some(end) if other.start > end);
        !other_ended_before && !other_starts_after
    }

    /// Still running: no end date
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}
