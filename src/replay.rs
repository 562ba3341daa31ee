use std::error::Error;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use speed_cube::config::{CHECKSUM_POLICY, HISTORY_INTERVAL_S, MARKS, WIND_DIRECTION_DEG};
use speed_cube::export::{CsvLogger, write_history_json};
use speed_cube::history::SampleGate;
use speed_cube::logging::init_logging;
use speed_cube::nmea::ChecksumPolicy;
use speed_cube::producer::FeedOutcome;
use speed_cube::sim::{SimulatedBoat, rmc_sentence};
use speed_cube::tack::{TackConfig, TackDetector};
use speed_cube::{FixProducer, NavigationLoop, Position, SharedState};

/// Feeds recorded (or simulated) receiver output through the full pipeline
/// and prints the resulting history as JSON.
#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay an NMEA log through the navigation pipeline")]
#[command(version)]
struct Args {
    /// NMEA log file (raw receiver output)
    #[arg(required_unless_present = "simulate")]
    input: Option<PathBuf>,

    /// Generate this many seconds of a simulated beat instead of reading a file
    #[arg(long)]
    simulate: Option<u32>,

    /// Seconds per leg of the simulated beat
    #[arg(long, default_value_t = 120.0)]
    leg: f64,

    /// Seconds between simulated fixes
    #[arg(long, default_value_t = 1.0)]
    fix_interval: f64,

    /// Upwind direction in degrees true
    #[arg(long, default_value_t = WIND_DIRECTION_DEG)]
    wind: f64,

    /// Fix-time spacing of history samples, seconds
    #[arg(long, default_value_t = HISTORY_INTERVAL_S)]
    interval: f64,

    /// Also write the sampled history as CSV
    #[arg(long)]
    csv: Option<PathBuf>,

    #[arg(long)]
    strict_checksum: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn simulated_log(seconds: u32, fix_interval: f64, wind: f64, leg: f64) -> Vec<u8> {
    let start = MARKS[0].position();
    // Start a cable off the club so the first leg has room.
    let start = Position::new(start.latitude + 0.002, start.longitude + 0.002);
    let fixes = (f64::from(seconds) / fix_interval).floor() as usize;
    SimulatedBoat::beating(start, 1_700_000_000.0, wind, leg)
        .with_interval(fix_interval)
        .take(fixes)
        .flat_map(|fix| rmc_sentence(&fix).into_bytes())
        .collect()
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    if !args.fix_interval.is_finite() || args.fix_interval <= 0.0 {
        return Err("--fix-interval must be positive".into());
    }
    let bytes = match (&args.input, args.simulate) {
        (_, Some(seconds)) => simulated_log(seconds, args.fix_interval, args.wind, args.leg),
        (Some(path), None) => fs::read(path)?,
        (None, None) => return Err("no input".into()),
    };

    let shared = Arc::new(SharedState::new(&MARKS)?);
    let policy = if args.strict_checksum {
        ChecksumPolicy::Strict
    } else {
        CHECKSUM_POLICY
    };
    let mut producer = FixProducer::new(Arc::clone(&shared), policy);
    let detector = TackDetector::new(TackConfig {
        wind_direction: args.wind,
        ..TackConfig::default()
    });
    let mut nav =
        NavigationLoop::new(Arc::clone(&shared), detector).with_history(SampleGate::new(args.interval));

    let mut csv = match &args.csv {
        Some(path) => Some(CsvLogger::create(path)?),
        None => None,
    };

    let mut tacks = 0;
    for &b in &bytes {
        if let Some(FeedOutcome::Published(_)) = producer.feed(b) {
            let report = nav.tick();
            if let Some(tack) = report.tack {
                tacks += 1;
                info!("tack {} at {:.0}: {} from {:.0}°", tacks, tack.timestamp, tack.side, tack.heading);
            }
        }
    }

    let history = shared.history_since(0.0);
    if let Some(logger) = csv.as_mut() {
        for entry in &history {
            logger.log_entry(entry)?;
        }
    }

    let stats = producer.stats();
    info!(
        "{} fixes, {} void, {} dropped, {} overflowed; {} tacks; {} history entries",
        stats.published,
        stats.void,
        stats.dropped,
        producer.overflows(),
        tacks,
        history.len()
    );

    write_history_json(io::stdout().lock(), &history)?;
    println!();
    Ok(())
}
