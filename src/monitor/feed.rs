//! Bounded packet feed, newest first

use serde::Serialize;
use std::collections::VecDeque;

use crate::api::StreamPacket;

/// Number of packets retained, and the most a feed will ever hold
pub const DEFAULT_FEED_CAPACITY: usize = 20;

/// One streamed packet with its display sequence number
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedEntry {
    pub sequence: u64,
    #[serde(flatten)]
    pub packet: StreamPacket,
}

#[derive(Debug, Clone)]
pub struct Feed {
    entries: VecDeque<FeedEntry>,
    capacity: usize,
}

impl Feed {
    /// Capacity is clamped to `1..=DEFAULT_FEED_CAPACITY`
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, DEFAULT_FEED_CAPACITY);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert at the head and drop whatever falls past capacity
    pub fn push(&mut self, packet: StreamPacket) -> FeedEntry {
        let sequence = self.entries.front().map(|e| e.sequence + 1).unwrap_or(1);
        let entry = FeedEntry { sequence, packet };

        self.entries.push_front(entry.clone());
        self.entries.truncate(self.capacity);
        entry
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<FeedEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for Feed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}
