//! Journal data model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One journal entry as persisted by an entry store.
///
/// Entries are immutable once stored and are never deleted by Timescribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub user_id: String,
    pub text: String,
    /// Day the entry was logged (process-local clock).
    pub timestamp: NaiveDate,
}

impl MemoryEntry {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>, timestamp: NaiveDate) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            timestamp,
        }
    }
}

/// Mapping from a user to the hosted agent that keeps their long-term memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentHandle {
    pub user_id: String,
    pub agent_id: String,
}

impl AgentHandle {
    pub fn new(user_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            agent_id: agent_id.into(),
        }
    }
}

/// Inclusive day range used for entry queries.
///
/// A range whose end precedes its start is empty: it matches no entry and
/// is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Range covering a single day.
    pub fn day(date: NaiveDate) -> Self {
        Self::new(date, date)
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 5));
        assert!(range.contains(date(2024, 3, 1)));
        assert!(range.contains(date(2024, 3, 5)));
        assert!(!range.contains(date(2024, 2, 29)));
        assert!(!range.contains(date(2024, 3, 6)));
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let range = DateRange::new(date(2024, 3, 5), date(2024, 3, 1));
        assert!(range.is_empty());
        assert!(!range.contains(date(2024, 3, 3)));
        assert!(!DateRange::day(date(2024, 3, 1)).is_empty());
    }

    #[test]
    fn test_entry_serializes_iso_date() {
        let entry = MemoryEntry::new("sid", "Went for a 5k run", date(2024, 3, 1));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["timestamp"], "2024-03-01");
        assert_eq!(json["text"], "Went for a 5k run");
    }
}
