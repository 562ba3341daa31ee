use thiserror::Error;

/// Reasons a framed sentence did not produce a fix. Never fatal: the producer
/// drops the sentence and keeps the previously published fix.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SentenceError {
    #[error("sentence has {0} fields, need at least 10")]
    TooFewFields(usize),

    #[error("checksum mismatch: expected {expected:02X}, computed {found:02X}")]
    BadChecksum { expected: u8, found: u8 },

    #[error("field {index} is not parseable")]
    BadField { index: usize },

    #[error("date/time fields do not form a valid UTC instant")]
    BadDateTime,
}

#[derive(Debug, Error)]
pub enum NavError {
    #[error("target index {index} out of range (have {len} targets)")]
    TargetOutOfRange { index: usize, len: usize },

    #[error("target list is empty")]
    NoTargets,

    #[error("serial port: {0}")]
    Serial(#[from] rppal::uart::Error),

    #[error("gpio: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NavError>;
