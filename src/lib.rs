pub mod button;
pub mod compass;
pub mod config;
pub mod consumer;
pub mod error;
pub mod export;
pub mod filter;
pub mod fix;
pub mod history;
pub mod logging;
pub mod navigation;
pub mod nmea;
pub mod position;
pub mod producer;
pub mod serial;
pub mod shared;
pub mod sim;
pub mod tack;

// Re-export commonly used types
pub use consumer::{NavReport, NavigationLoop};
pub use error::{NavError, SentenceError};
pub use filter::PositionFilter;
pub use fix::{FilteredFix, Fix, RawFix, Timestamp};
pub use history::{HistoryBuffer, HistoryEntry};
pub use navigation::{Target, Targets};
pub use nmea::SentenceParser;
pub use position::Position;
pub use producer::FixProducer;
pub use shared::SharedState;
pub use tack::TackDetector;

#[cfg(test)]
pub(crate) mod mocks;
