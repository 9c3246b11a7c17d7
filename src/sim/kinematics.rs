// Forward kinematics for a differential-drive base.
//
// Wheel speeds are mm/s, time is seconds, positions are millimeters and
// headings degrees. Callers holding milliseconds divide by 1000 at the
// boundary; the integrator itself never sees milliseconds.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::config::SPEED_TO_MM_PER_SECOND;
use crate::motor::protocol::Mode;
use crate::units::unsigned_to_signed;

/// Wheel speeds below this difference are treated as straight-line motion.
const STRAIGHT_EPSILON: f64 = 1e-9;

/// Robot pose: position in millimeters, heading in degrees [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub angle: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, angle: f64) -> Self {
        Self {
            x,
            y,
            angle: normalize_degrees(angle),
        }
    }
}

/// Reduce an angle in degrees to [0, 360).
pub fn normalize_degrees(angle: f64) -> f64 {
    let reduced = angle % 360.0;
    if reduced < 0.0 { reduced + 360.0 } else { reduced }
}

/// Advance `pose` in place by `dt_secs` under wheel speeds `v1`, `v2`
/// (mm/s) for a base of the given robot radius (half the wheel
/// separation, mm).
///
/// Near-equal speeds integrate as a straight segment along the heading.
/// Otherwise the pose rotates about the instantaneous center of rotation
/// by `omega * dt`.
pub fn integrate(pose: &mut Pose, v1: f64, v2: f64, dt_secs: f64, robot_radius: f64) {
    let theta = pose.angle * PI / 180.0;

    if (v1 - v2).abs() < STRAIGHT_EPSILON {
        pose.x += v1 * theta.cos() * dt_secs;
        pose.y += v1 * theta.sin() * dt_secs;
        return;
    }

    let wheel_separation = 2.0 * robot_radius;
    let turn_radius = (wheel_separation / 2.0) * (v1 + v2) / (v2 - v1);
    let omega = (v2 - v1) / wheel_separation;

    let icc_x = pose.x - turn_radius * theta.sin();
    let icc_y = pose.y + turn_radius * theta.cos();

    let sweep = omega * dt_secs;
    let (sin_s, cos_s) = sweep.sin_cos();
    let dx = pose.x - icc_x;
    let dy = pose.y - icc_y;

    pose.x = icc_x + dx * cos_s - dy * sin_s;
    pose.y = icc_y + dx * sin_s + dy * cos_s;
    pose.angle = normalize_degrees(pose.angle + sweep * 180.0 / PI);
}

/// Decompose raw speed-register bytes into real wheel speeds in mm/s
/// according to the drive mode.
pub fn wheel_speeds_from_registers(mode: Mode, raw1: u8, raw2: u8) -> (f64, f64) {
    let (speed1, speed2) = match mode {
        // 128 is stop; lower is backward, higher forward
        Mode::Unsigned => (raw1 as f64 - 128.0, raw2 as f64 - 128.0),
        Mode::Signed => (
            unsigned_to_signed(raw1) as f64,
            unsigned_to_signed(raw2) as f64,
        ),
        // raw1 is combined drive, raw2 a turn differential
        Mode::UnsignedCombined => {
            let drive = raw1 as f64 - 128.0;
            let turn = raw2 as f64 - 128.0;
            (saturate(drive - turn), saturate(drive + turn))
        }
        Mode::SignedCombined => {
            let drive = unsigned_to_signed(raw1) as f64;
            let turn = unsigned_to_signed(raw2) as f64;
            (saturate(drive - turn), saturate(drive + turn))
        }
    };
    (
        speed1 * SPEED_TO_MM_PER_SECOND,
        speed2 * SPEED_TO_MM_PER_SECOND,
    )
}

fn saturate(speed: f64) -> f64 {
    speed.clamp(-128.0, 127.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ROBOT_RADIUS_MM;

    const TOL: f64 = 1e-6;

    #[test]
    fn test_straight_motion_cardinal_headings() {
        // Equal speeds: delta = (v t cos, v t sin), heading unchanged
        let cases = [
            (0.0, (250.0, 0.0)),
            (90.0, (0.0, 250.0)),
            (180.0, (-250.0, 0.0)),
            (270.0, (0.0, -250.0)),
        ];
        for (heading, (dx, dy)) in cases {
            let mut pose = Pose::new(10.0, -5.0, heading);
            integrate(&mut pose, 125.0, 125.0, 2.0, ROBOT_RADIUS_MM);
            assert!((pose.x - (10.0 + dx)).abs() < TOL, "heading {heading}");
            assert!((pose.y - (-5.0 + dy)).abs() < TOL, "heading {heading}");
            assert!((pose.angle - heading).abs() < TOL);
        }
    }

    #[test]
    fn test_pure_spin_keeps_position() {
        // v1 = 20, v2 = -20 about R = 250: position fixed, heading sweeps
        let (v1, v2) = (20.0, -20.0);
        let radius = 250.0;
        let omega = (v2 - v1) / (2.0 * radius);

        for t in [0.1, 1.0, 7.5, 60.0] {
            let mut pose = Pose::new(100.0, 200.0, 45.0);
            integrate(&mut pose, v1, v2, t, radius);
            assert!((pose.x - 100.0).abs() < TOL, "t = {t}");
            assert!((pose.y - 200.0).abs() < TOL, "t = {t}");
            let expected = normalize_degrees(45.0 + omega * t * 180.0 / PI);
            assert!((pose.angle - expected).abs() < TOL, "t = {t}");
        }
    }

    #[test]
    fn test_arc_returns_to_start_after_full_circle() {
        // One full sweep about the ICC lands back on the starting pose
        let (v1, v2) = (100.0, 50.0);
        let radius = 250.0;
        let omega: f64 = (v2 - v1) / (2.0 * radius);
        let period = 2.0 * PI / omega.abs();

        let mut pose = Pose::new(0.0, 0.0, 30.0);
        integrate(&mut pose, v1, v2, period, radius);
        assert!(pose.x.abs() < 1e-6);
        assert!(pose.y.abs() < 1e-6);
        assert!((pose.angle - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_angle_normalization() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(725.0), 5.0);
        assert_eq!(Pose::new(0.0, 0.0, -45.0).angle, 315.0);
    }

    #[test]
    fn test_register_decomposition_mode0() {
        let (v1, v2) = wheel_speeds_from_registers(Mode::Unsigned, 148, 108);
        assert_eq!(v1, 125.0);
        assert_eq!(v2, -125.0);
    }

    #[test]
    fn test_register_decomposition_mode1() {
        // Bytes reinterpreted as signed: 236 = -20
        let (v1, v2) = wheel_speeds_from_registers(Mode::Signed, 20, 236);
        assert_eq!(v1, 125.0);
        assert_eq!(v2, -125.0);
    }

    #[test]
    fn test_register_decomposition_combined_modes() {
        // Pure drive: turn differential at rest
        let (v1, v2) = wheel_speeds_from_registers(Mode::UnsignedCombined, 148, 128);
        assert_eq!(v1, 125.0);
        assert_eq!(v2, 125.0);

        // Drive plus turn saturates at the byte range
        let (v1, v2) = wheel_speeds_from_registers(Mode::UnsignedCombined, 255, 255);
        assert_eq!(v1, 0.0);
        assert_eq!(v2, 127.0 * SPEED_TO_MM_PER_SECOND);

        let (v1, v2) = wheel_speeds_from_registers(Mode::SignedCombined, 100, 236);
        // drive 100, turn -20
        assert_eq!(v1, 120.0 * SPEED_TO_MM_PER_SECOND);
        assert_eq!(v2, 80.0 * SPEED_TO_MM_PER_SECOND);
    }
}
