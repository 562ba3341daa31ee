use serde::Serialize;

use crate::config::HISTORY_INTERVAL_S;
use crate::fix::{FilteredFix, RawFix, Timestamp};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub timestamp: Timestamp,
    pub raw: RawFix,
    pub filtered: FilteredFix,
}

impl HistoryEntry {
    pub fn new(raw: RawFix, filtered: FilteredFix) -> Self {
        Self {
            timestamp: raw.timestamp,
            raw,
            filtered,
        }
    }
}

/// Fixed-capacity circular buffer. Writes at `head`; once full, each write
/// overwrites the oldest entry.
pub struct HistoryBuffer<const N: usize> {
    buf: [HistoryEntry; N],
    head: usize,
    count: usize,
}

impl<const N: usize> Default for HistoryBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> HistoryBuffer<N> {
    pub fn new() -> Self {
        Self {
            buf: [HistoryEntry::default(); N],
            head: 0,
            count: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if N == 0 {
            return;
        }
        self.buf[self.head] = entry;
        self.head = (self.head + 1) % N;
        self.count = (self.count + 1).min(N);
    }

    /// Most recently inserted entry.
    pub fn latest(&self) -> Option<&HistoryEntry> {
        (self.count > 0).then(|| &self.buf[(self.head + N - 1) % N])
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> + '_ {
        let start = (self.head + N - self.count) % N.max(1);
        (0..self.count).map(move |i| &self.buf[(start + i) % N])
    }

    /// Every entry with a timestamp strictly after `cursor`, oldest first.
    pub fn since(&self, cursor: Timestamp) -> Vec<HistoryEntry> {
        self.iter().filter(|e| e.timestamp > cursor).copied().collect()
    }
}

/// Decides when the next history sample is due, measured in fix time rather
/// than loop iterations so a slow or fast loop never stores the same fix twice.
#[derive(Clone, Copy, Debug)]
pub struct SampleGate {
    interval: f64,
    last: Option<Timestamp>,
}

impl Default for SampleGate {
    fn default() -> Self {
        Self::new(HISTORY_INTERVAL_S)
    }
}

impl SampleGate {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True when `timestamp` is at least one interval past the last accepted
    /// sample; the sample is then recorded as taken.
    pub fn ready(&mut self, timestamp: Timestamp) -> bool {
        let due = match self.last {
            None => true,
            Some(last) => timestamp > last && timestamp - last >= self.interval,
        };
        if due {
            self.last = Some(timestamp);
        }
        due
    }
}
