// Physical constants and default timeouts for the drive base

/// Wheel diameter in millimeters.
pub const WHEEL_DIAMETER_MM: f64 = 100.0;

/// Distance from the robot center to each wheel, in millimeters.
/// Wheel separation is twice this.
pub const ROBOT_RADIUS_MM: f64 = 250.0;

/// Encoder counts per full wheel revolution.
pub const ENCODER_COUNTS_PER_TURN: f64 = 980.0;

/// Linear approximation of one speed unit in mm/s.
///
/// Measured empirically; the real response flattens near the extremes of
/// the speed range, so conversions through this factor are approximate.
pub const SPEED_TO_MM_PER_SECOND: f64 = 6.25;

/// Default timeout for a transport send, in milliseconds.
pub const SEND_TIMEOUT_MS: u64 = 500;

/// Default timeout for a transport receive, in milliseconds.
pub const RECEIVE_TIMEOUT_MS: u64 = 500;
