use crate::navigation::Target;
use crate::nmea::ChecksumPolicy;

// ** SERIAL CONFIGURATION ** //

/// UART device the GPS receiver is wired to.
pub const SERIAL_PATH: &str = "/dev/serial0";
pub const SERIAL_BAUD: u32 = 9600;
/// Read timeout for the UART. Short enough that the reader thread never stalls.
pub const SERIAL_READ_TIMEOUT_MS: u64 = 100;

// ** PARSER CONFIGURATION ** //

/// Longest NMEA-0183 sentence (82 chars) plus one.
pub const SENTENCE_BUFFER_SIZE: usize = 83;
/// Sentence tags carrying the recommended minimum position/velocity fix.
pub const SENTENCE_TAGS: [&[u8]; 2] = [b"$GNRMC", b"$GPRMC"];
pub const CHECKSUM_POLICY: ChecksumPolicy = ChecksumPolicy::Lenient;

// ** FILTER CONFIGURATION ** //

/// Diagonal of the covariance right after the first measurement.
pub const FILTER_INITIAL_COVARIANCE: f64 = 0.1;
/// Process noise: [lat (deg²), lon (deg²), speed (kn²), cos(course), sin(course)]
pub const FILTER_PROCESS_NOISE: [f64; 5] = [1e-9, 1e-9, 0.5, 0.02, 0.02];
/// Measurement noise, same layout. Course is the noisiest channel at low speed.
pub const FILTER_MEASUREMENT_NOISE: [f64; 5] = [1e-9, 1e-9, 0.1, 0.05, 0.05];
/// Normalized innovation above which the process noise is inflated for one step.
pub const FILTER_INNOVATION_THRESHOLD: f64 = 2.0;
pub const FILTER_ADAPTIVE_FACTOR: f64 = 5.0;
/// Gaps longer than this are not dead-reckoned (receiver outage).
pub const MAX_PREDICT_GAP_S: f64 = 10.0;

// ** GEOMETRY ** //

/// Earth's radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const KNOTS_TO_MPS: f64 = 0.514_444;

// ** HISTORY CONFIGURATION ** //

pub const HISTORY_CAPACITY: usize = 100;
/// Minimum fix-time spacing between two history samples.
pub const HISTORY_INTERVAL_S: f64 = 5.0;

// ** TACK DETECTION ** //

/// Assumed upwind direction (degrees true).
pub const WIND_DIRECTION_DEG: f64 = 270.0;
pub const MIN_SPEED_FOR_TACK_KN: f64 = 1.0;
pub const TACK_DEBOUNCE_S: f64 = 10.0;
pub const TACK_ANGLE_THRESHOLD_DEG: f64 = 45.0;
pub const TACK_MIN_DISTANCE_M: f64 = 50.0;
pub const HEADING_WINDOW: usize = 10;
pub const HEADING_STABILITY_DEG: f64 = 10.0;

// ** GPIO CONFIGURATION ** //

/// Push button that cycles to the next mark (active low).
pub const GPIO_CYCLE_BUTTON: u8 = 23;
/// Presses closer together than this are contact bounce.
pub const BUTTON_DEBOUNCE_MS: u64 = 200;

// ** MAIN CONFIGURATION ** //

pub const NAV_LOOP_PERIOD_MS: u64 = 200;
pub const BUTTON_POLL_PERIOD_MS: u64 = 20;
pub const STATUS_UPDATE_INTERVAL_SECS: u64 = 5;

// ** MARKS ** //

/// Racing marks, San Francisco Bay.
pub const MARKS: [Target; 8] = [
    Target::new("SBYC", 37.77797371, -122.3852661),
    Target::new("SC1", 37.77555, -122.3658167),
    Target::new("NAS1", 37.77725, -122.3412833),
    Target::new("NAS2", 37.774183, -122.3410167),
    Target::new("YB", 37.79951667, -122.3605167),
    Target::new("AS1", 37.771383, -122.3830167),
    Target::new("34", 37.75835, -122.3685333),
    Target::new("33", 37.801, -122.3477333),
];
