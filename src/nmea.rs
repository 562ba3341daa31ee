//! Byte-level framing and decoding of the RMC (recommended minimum) sentence.
//!
//! Bytes are fed one at a time, the way they arrive off the UART. A `$`
//! always starts a new sentence; CR or LF ends it. Only sentences whose tag is
//! in [`SENTENCE_TAGS`] are decoded, everything else is framed and discarded.
//!
//! Example: `$GNRMC,092204.999,A,5321.6802,N,00630.3372,W,0.06,31.66,280511,,,A*43`

use chrono::NaiveDate;
use tinyvec::ArrayVec;
use tracing::{debug, trace};

use crate::config::{CHECKSUM_POLICY, SENTENCE_BUFFER_SIZE, SENTENCE_TAGS};
use crate::error::SentenceError;
use crate::fix::{RawFix, Timestamp};
use crate::position::normalize_degrees;

type SentenceBuf = ArrayVec<[u8; SENTENCE_BUFFER_SIZE]>;

/// Fields after the tag we care about: time, status, lat, N/S, lon, E/W, speed, course, date.
const MIN_FIELDS: usize = 10;
const MAX_FIELDS: usize = 24;

const FIELD_TIME: usize = 1;
const FIELD_STATUS: usize = 2;
const FIELD_LAT: usize = 3;
const FIELD_LAT_HEMI: usize = 4;
const FIELD_LON: usize = 5;
const FIELD_LON_HEMI: usize = 6;
const FIELD_SPEED: usize = 7;
const FIELD_COURSE: usize = 8;
const FIELD_DATE: usize = 9;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ChecksumPolicy {
    /// Ignore the `*hh` suffix.
    #[default]
    Lenient,
    /// Reject sentences whose `*hh` suffix does not match their content.
    Strict,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ParserState {
    Idle,
    Accumulating,
}

pub struct SentenceParser {
    state: ParserState,
    buf: SentenceBuf,
    policy: ChecksumPolicy,
    overflows: usize,
}

impl Default for SentenceParser {
    fn default() -> Self {
        Self::new(CHECKSUM_POLICY)
    }
}

impl SentenceParser {
    pub fn new(policy: ChecksumPolicy) -> Self {
        Self {
            state: ParserState::Idle,
            buf: SentenceBuf::new(),
            policy,
            overflows: 0,
        }
    }

    /// Number of sentences abandoned because they outgrew the buffer.
    pub fn overflows(&self) -> usize {
        self.overflows
    }

    /// Feed one byte. Returns `Some` when a recognised sentence was terminated.
    pub fn feed(&mut self, b: u8) -> Option<Result<RawFix, SentenceError>> {
        match (self.state, b) {
            (_, b'$') => {
                self.buf.clear();
                self.buf.push(b);
                self.state = ParserState::Accumulating;
                None
            }
            (ParserState::Idle, _) => None,
            (ParserState::Accumulating, b'\r' | b'\n') => {
                self.state = ParserState::Idle;
                let sentence = self.buf.as_slice();
                if SENTENCE_TAGS.iter().any(|tag| sentence.starts_with(tag)) {
                    Some(parse_sentence(sentence, self.policy))
                } else {
                    trace!("skipping sentence {:?}", String::from_utf8_lossy(sentence));
                    None
                }
            }
            (ParserState::Accumulating, _) => {
                if self.buf.try_push(b).is_some() {
                    // Full before the terminator: forget this sentence entirely.
                    self.overflows += 1;
                    self.buf.clear();
                    self.state = ParserState::Idle;
                    debug!("sentence overflowed {} bytes, dropped", SENTENCE_BUFFER_SIZE);
                }
                None
            }
        }
    }
}

/// XOR of every byte between `$` and `*`.
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0, |acc, b| acc ^ b)
}

/// `ddmm.mmmm` / `dddmm.mmmm` to signed decimal degrees.
pub fn to_decimal_degrees(raw: f64, hemisphere: char) -> f64 {
    let degrees = (raw / 100.0).floor();
    let minutes = raw - degrees * 100.0;
    let decimal = degrees + minutes / 60.0;
    match hemisphere {
        'S' | 'W' => -decimal,
        _ => decimal,
    }
}

/// Combine `ddmmyy` and `hhmmss.sss` into a UTC timestamp. Years are 2000 + yy.
pub fn utc_timestamp(date: &str, time: f64) -> Result<Timestamp, SentenceError> {
    if date.len() != 6 || !date.bytes().all(|b| b.is_ascii_digit()) || time < 0.0 {
        return Err(SentenceError::BadDateTime);
    }
    let two_digits = |i: usize| date[i..i + 2].parse::<u32>().map_err(|_| SentenceError::BadDateTime);
    let (day, month, year) = (two_digits(0)?, two_digits(2)?, two_digits(4)?);

    let whole = time.trunc() as u32;
    let millis = ((time.fract() * 1000.0).round() as u32).min(999);

    NaiveDate::from_ymd_opt(2000 + year as i32, month, day)
        .and_then(|d| d.and_hms_milli_opt(whole / 10_000, whole / 100 % 100, whole % 100, millis))
        .map(|dt| dt.and_utc().timestamp_millis() as f64 / 1000.0)
        .ok_or(SentenceError::BadDateTime)
}

/// Rust's float parser takes `nan`, `inf` and overflowing exponents; none of
/// them is a measurement.
fn parse_field(field: &str, index: usize) -> Result<f64, SentenceError> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or(SentenceError::BadField { index })
}

/// Speed and course are left blank by many receivers when stationary.
fn parse_optional(field: &str, index: usize) -> Result<f64, SentenceError> {
    if field.is_empty() {
        Ok(0.0)
    } else {
        parse_field(field, index)
    }
}

fn parse_coordinate(
    value: &str,
    hemi: &str,
    index: usize,
    allowed: [char; 2],
    limit: f64,
) -> Result<f64, SentenceError> {
    let raw = parse_field(value, index)?;
    let hemisphere = hemi
        .chars()
        .next()
        .filter(|c| allowed.contains(c))
        .ok_or(SentenceError::BadField { index: index + 1 })?;
    let decimal = to_decimal_degrees(raw, hemisphere);
    if raw < 0.0 || decimal.abs() > limit {
        return Err(SentenceError::BadField { index });
    }
    Ok(decimal)
}

/// Decode a complete, framed sentence (without CR/LF).
pub fn parse_sentence(sentence: &[u8], policy: ChecksumPolicy) -> Result<RawFix, SentenceError> {
    let text = std::str::from_utf8(sentence).map_err(|_| SentenceError::BadField { index: 0 })?;

    let body = match text.rsplit_once('*') {
        Some((body, suffix)) => {
            if policy == ChecksumPolicy::Strict {
                let expected = u8::from_str_radix(suffix.trim(), 16).map_err(|_| {
                    SentenceError::BadChecksum {
                        expected: 0,
                        found: checksum(&body.as_bytes()[1..]),
                    }
                })?;
                let found = checksum(&body.as_bytes()[1..]);
                if expected != found {
                    return Err(SentenceError::BadChecksum { expected, found });
                }
            }
            body
        }
        None => text,
    };

    let mut fields = ArrayVec::<[&str; MAX_FIELDS]>::new();
    for field in body.split(',').take(MAX_FIELDS) {
        fields.push(field);
    }
    if fields.len() < MIN_FIELDS {
        return Err(SentenceError::TooFewFields(fields.len()));
    }

    let timestamp =
        parse_field(fields[FIELD_TIME], FIELD_TIME).and_then(|time| utc_timestamp(fields[FIELD_DATE], time));

    // Receivers without a lock often leave time and date blank too.
    if fields[FIELD_STATUS] != "A" {
        return Ok(RawFix {
            timestamp: timestamp.unwrap_or_default(),
            valid: false,
            ..RawFix::default()
        });
    }
    let timestamp = timestamp?;

    let latitude = parse_coordinate(
        fields[FIELD_LAT],
        fields[FIELD_LAT_HEMI],
        FIELD_LAT,
        ['N', 'S'],
        90.0,
    )?;
    let longitude = parse_coordinate(
        fields[FIELD_LON],
        fields[FIELD_LON_HEMI],
        FIELD_LON,
        ['E', 'W'],
        180.0,
    )?;

    let speed = parse_optional(fields[FIELD_SPEED], FIELD_SPEED)?;
    if speed < 0.0 {
        return Err(SentenceError::BadField { index: FIELD_SPEED });
    }
    let course = normalize_degrees(parse_optional(fields[FIELD_COURSE], FIELD_COURSE)?);

    Ok(RawFix::new(latitude, longitude, speed, course, timestamp))
}
