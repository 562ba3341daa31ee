//! State shared between the producer (serial reader) and the consumer loops.
//!
//! Each slot has its own lock and holds a `Copy` value. Readers copy the value
//! out and release the lock before doing anything else; nobody holds two locks
//! at once. Since every write replaces a slot whole, a poisoned lock still
//! holds a consistent value and is simply recovered.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::HISTORY_CAPACITY;
use crate::error::Result;
use crate::fix::{FilteredFix, RawFix, Timestamp};
use crate::history::{HistoryBuffer, HistoryEntry};
use crate::navigation::{Target, Targets};

pub type History = HistoryBuffer<HISTORY_CAPACITY>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An `Option<f64>` that can be read and written without a lock.
struct HeadingCell(AtomicU64);

impl HeadingCell {
    const NONE: u64 = u64::MAX;

    fn new() -> Self {
        Self(AtomicU64::new(Self::NONE))
    }

    fn store(&self, value: Option<f64>) {
        let bits = value.map_or(Self::NONE, f64::to_bits);
        self.0.store(bits, Ordering::Release);
    }

    fn load(&self) -> Option<f64> {
        match self.0.load(Ordering::Acquire) {
            Self::NONE => None,
            bits => Some(f64::from_bits(bits)),
        }
    }
}

pub struct SharedState {
    raw: Mutex<RawFix>,
    filtered: Mutex<FilteredFix>,
    history: Mutex<History>,
    /// Whether the most recent sentence carried a valid fix.
    has_fix: AtomicBool,
    targets: Targets,
    last_tack_heading: HeadingCell,
}

impl SharedState {
    pub fn new(marks: &[Target]) -> Result<Self> {
        Ok(Self {
            raw: Mutex::new(RawFix::default()),
            filtered: Mutex::new(FilteredFix::default()),
            history: Mutex::new(History::new()),
            has_fix: AtomicBool::new(false),
            targets: Targets::new(marks)?,
            last_tack_heading: HeadingCell::new(),
        })
    }

    // Producer side

    pub fn publish_raw(&self, fix: RawFix) {
        *lock(&self.raw) = fix;
        self.has_fix.store(fix.valid, Ordering::Release);
    }

    pub fn publish_filtered(&self, fix: FilteredFix) {
        *lock(&self.filtered) = fix;
    }

    /// The latest sentence was void. Published fixes are left as they are.
    pub fn mark_no_fix(&self) {
        self.has_fix.store(false, Ordering::Release);
    }

    pub fn record_history(&self, entry: HistoryEntry) {
        lock(&self.history).push(entry);
    }

    // Consumer side

    pub fn raw_fix(&self) -> RawFix {
        *lock(&self.raw)
    }

    pub fn filtered_fix(&self) -> FilteredFix {
        *lock(&self.filtered)
    }

    pub fn has_fix(&self) -> bool {
        self.has_fix.load(Ordering::Acquire)
    }

    pub fn history_since(&self, cursor: Timestamp) -> Vec<HistoryEntry> {
        lock(&self.history).since(cursor)
    }

    pub fn history_len(&self) -> usize {
        lock(&self.history).len()
    }

    pub fn latest_history(&self) -> Option<HistoryEntry> {
        lock(&self.history).latest().copied()
    }

    // Waypoints and tack

    pub fn targets(&self) -> &Targets {
        &self.targets
    }

    pub fn current_target(&self) -> Target {
        self.targets.current()
    }

    pub fn cycle_target(&self) -> Target {
        self.targets.cycle()
    }

    /// Bearing from the last known good filtered position to the current mark.
    pub fn current_target_bearing(&self) -> Option<f64> {
        let fix = self.filtered_fix();
        fix.valid
            .then(|| fix.position().bearing_to(&self.current_target().position()))
    }

    pub fn publish_last_tack_heading(&self, heading: Option<f64>) {
        self.last_tack_heading.store(heading);
    }

    pub fn last_tack_heading(&self) -> Option<f64> {
        self.last_tack_heading.load()
    }
}
