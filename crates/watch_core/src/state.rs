use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::Recency;

/// Window size used when configuration does not name one.
pub const DEFAULT_WINDOW_CAPACITY: usize = 50;

/// The persisted memory of which portal items were already announced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenState {
    pub last_check_time: Option<DateTime<Utc>>,
    pub seen_ids: HashSet<String>,
    pub window_capacity: usize,
    pub total_checked: u64,
}

impl SeenState {
    /// The state used on first run and whenever the stored copy is unusable.
    pub fn new(window_capacity: usize) -> Self {
        Self {
            last_check_time: None,
            seen_ids: HashSet::new(),
            window_capacity,
            total_checked: 0,
        }
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    /// Seen ids ordered newest first; ties fall back to text order.
    pub fn ids_by_recency(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.seen_ids.iter().cloned().collect();
        ids.sort_by(|a, b| {
            Recency::of(b)
                .cmp(&Recency::of(a))
                .then_with(|| a.cmp(b))
        });
        ids
    }

    pub fn stats(&self) -> SeenStats {
        SeenStats {
            total_seen: self.seen_ids.len(),
            window_capacity: self.window_capacity,
            last_check: self.last_check_time,
            total_checked: self.total_checked,
        }
    }
}

/// Summary of a [`SeenState`] for operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeenStats {
    pub total_seen: usize,
    pub window_capacity: usize,
    pub last_check: Option<DateTime<Utc>>,
    pub total_checked: u64,
}
