use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info, warn};

use speed_cube::button::CycleButton;
use speed_cube::config::{
    CHECKSUM_POLICY, MARKS, NAV_LOOP_PERIOD_MS, SERIAL_BAUD, SERIAL_PATH,
    STATUS_UPDATE_INTERVAL_SECS, WIND_DIRECTION_DEG,
};
use speed_cube::export::CsvLogger;
use speed_cube::history::SampleGate;
use speed_cube::logging::init_logging;
use speed_cube::nmea::ChecksumPolicy;
use speed_cube::serial::GpsSerial;
use speed_cube::tack::{TackConfig, TackDetector};
use speed_cube::{FixProducer, NavigationLoop, SharedState, Timestamp};

#[derive(Parser, Debug)]
#[command(name = "speed-cube")]
#[command(about = "GPS sailing instrument: filtered fix, bearing and VMG to the mark, tack detection")]
#[command(version)]
struct Args {
    /// UART device of the GPS receiver
    #[arg(long, default_value = SERIAL_PATH)]
    serial: String,

    #[arg(long, default_value_t = SERIAL_BAUD)]
    baud: u32,

    /// Upwind direction in degrees true
    #[arg(long, default_value_t = WIND_DIRECTION_DEG)]
    wind: f64,

    /// Append history samples to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Reject sentences whose checksum does not match
    #[arg(long)]
    strict_checksum: bool,

    /// Run without the target cycling button
    #[arg(long)]
    no_button: bool,

    #[arg(short, long)]
    verbose: bool,
}

// Threads:
//  serial reader: UART bytes → parser → filter → shared fixes
//  button:        each press moves to the next mark
//  main:          navigation loop, history sampling, status output, CSV log
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    info!("starting speed-cube");

    let shared = Arc::new(SharedState::new(&MARKS)?);
    let stop = Arc::new(AtomicBool::new(false));

    let policy = if args.strict_checksum {
        ChecksumPolicy::Strict
    } else {
        CHECKSUM_POLICY
    };

    let mut serial = GpsSerial::open(&args.serial, args.baud)?;
    let mut producer = FixProducer::new(Arc::clone(&shared), policy);
    let serial_stop = Arc::clone(&stop);
    thread::spawn(move || serial.run(&mut producer, &serial_stop));

    if args.no_button {
        info!("target button disabled");
    } else {
        match CycleButton::new() {
            Ok(mut button) => {
                let button_shared = Arc::clone(&shared);
                let button_stop = Arc::clone(&stop);
                thread::spawn(move || button.run(&button_shared, &button_stop));
            }
            Err(e) => warn!("target button unavailable: {}", e),
        }
    }

    let mut csv = match &args.csv {
        Some(path) => Some(CsvLogger::create(path)?),
        None => None,
    };

    let detector = TackDetector::new(TackConfig {
        wind_direction: args.wind,
        ..TackConfig::default()
    });
    let mut nav = NavigationLoop::new(Arc::clone(&shared), detector).with_history(SampleGate::default());

    info!("target {}, waiting for GPS fix...", shared.current_target());

    let status_interval = Duration::from_secs(STATUS_UPDATE_INTERVAL_SECS);
    let mut last_status = Instant::now();
    let mut logged_until: Timestamp = 0.0;

    nav.run(Duration::from_millis(NAV_LOOP_PERIOD_MS), &stop, |report| {
        if let Some(tack) = report.tack {
            println!("↺ Tack onto {} (was sailing {:.0}°)", tack.side, tack.heading);
        }

        if last_status.elapsed() >= status_interval {
            println!("{}", report);
            last_status = Instant::now();
        }

        if let Some(logger) = csv.as_mut() {
            for entry in shared.history_since(logged_until) {
                if let Err(e) = logger.log_entry(&entry) {
                    error!("csv log write failed: {}", e);
                }
                logged_until = entry.timestamp;
            }
        }
    });

    Ok(())
}
