//! Time-of-day speed schedule.
//!
//! A schedule maps `HH:MM` start times to a global rate limit in bytes per
//! second. The limit in force at a given time is the one of the latest entry
//! at or before it; before the first entry of the day the last entry of the
//! previous day still applies.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveTime;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid schedule time '{0}' (expected HH:MM)")]
    InvalidTime(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeedSchedule {
    entries: BTreeMap<NaiveTime, u64>,
}

impl SpeedSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `"HH:MM" -> bytes/sec` map.
    pub fn from_map(map: &HashMap<String, u64>) -> Result<Self, ScheduleError> {
        let mut entries = BTreeMap::new();
        for (time, limit) in map {
            let parsed = NaiveTime::parse_from_str(time.trim(), "%H:%M")
                .map_err(|_| ScheduleError::InvalidTime(time.clone()))?;
            entries.insert(parsed, *limit);
        }
        Ok(Self { entries })
    }

    pub fn with_entry(mut self, start: NaiveTime, bytes_per_sec: u64) -> Self {
        self.entries.insert(start, bytes_per_sec);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The scheduled limit at `time`, or `None` for an empty schedule.
    pub fn limit_at(&self, time: NaiveTime) -> Option<u64> {
        self.entries
            .range(..=time)
            .next_back()
            .or_else(|| self.entries.iter().next_back())
            .map(|(_, limit)| *limit)
    }

    /// The scheduled limit at `time`, falling back to a static limit.
    pub fn effective_limit(&self, time: NaiveTime, fallback: u64) -> u64 {
        self.limit_at(time).unwrap_or(fallback)
    }
}
