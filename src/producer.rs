//! Producer side of the pipeline: bytes in, published fixes out.
//!
//! Runs on the serial reader thread. Everything here is bounded per byte; no
//! I/O and no locks held for longer than one struct copy.

use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::config::MAX_PREDICT_GAP_S;
use crate::error::SentenceError;
use crate::filter::{FilterStatus, PositionFilter};
use crate::fix::{RawFix, Timestamp};
use crate::nmea::{ChecksumPolicy, SentenceParser};
use crate::shared::SharedState;

/// What happened to one framed sentence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FeedOutcome {
    Published(FilterStatus),
    NoFix,
    Dropped(SentenceError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProducerStats {
    pub published: usize,
    pub void: usize,
    pub dropped: usize,
}

pub struct FixProducer {
    parser: SentenceParser,
    filter: PositionFilter,
    shared: Arc<SharedState>,
    last_update: Option<Timestamp>,
    had_fix: bool,
    stats: ProducerStats,
}

impl FixProducer {
    pub fn new(shared: Arc<SharedState>, policy: ChecksumPolicy) -> Self {
        Self::with_filter(shared, policy, PositionFilter::default())
    }

    pub fn with_filter(shared: Arc<SharedState>, policy: ChecksumPolicy, filter: PositionFilter) -> Self {
        Self {
            parser: SentenceParser::new(policy),
            filter,
            shared,
            last_update: None,
            had_fix: false,
            stats: ProducerStats::default(),
        }
    }

    pub fn stats(&self) -> ProducerStats {
        self.stats
    }

    /// Sentences abandoned because they overran the parser buffer.
    pub fn overflows(&self) -> usize {
        self.parser.overflows()
    }

    pub fn feed(&mut self, byte: u8) -> Option<FeedOutcome> {
        let result = self.parser.feed(byte)?;
        Some(match result {
            Ok(fix) if fix.valid => FeedOutcome::Published(self.publish(fix)),
            Ok(_) => {
                self.void();
                FeedOutcome::NoFix
            }
            Err(e) => {
                debug!("dropped sentence: {}", e);
                self.stats.dropped += 1;
                FeedOutcome::Dropped(e)
            }
        })
    }

    /// Feed a chunk of bytes; returns the outcome of the last sentence completed
    /// inside it, if any.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Option<FeedOutcome> {
        bytes.iter().fold(None, |last, &b| self.feed(b).or(last))
    }

    fn publish(&mut self, fix: RawFix) -> FilterStatus {
        self.shared.publish_raw(fix);
        if !self.had_fix {
            info!("fix acquired: {}", fix);
            self.had_fix = true;
        }

        if let Some(last) = self.last_update {
            let dt = fix.timestamp - last;
            if dt > 0.0 && dt <= MAX_PREDICT_GAP_S {
                self.filter.predict(dt);
            }
        }

        let status = self.filter.update(fix.latitude, fix.longitude, fix.speed, fix.course);
        trace!("filter {:?}", status);
        if status != FilterStatus::SingularMatrix {
            self.last_update = Some(fix.timestamp);
        }
        if let Some(filtered) = self.filter.estimate(fix.timestamp) {
            self.shared.publish_filtered(filtered);
        }

        self.stats.published += 1;
        status
    }

    fn void(&mut self) {
        self.shared.mark_no_fix();
        if self.had_fix {
            info!("fix lost");
            self.had_fix = false;
        }
        self.stats.void += 1;
    }
}
