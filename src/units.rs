// Unit conversions between speed units, millimeters, encoder counts and
// the byte representations used on the wire.

use std::f64::consts::PI;

use crate::config::{ENCODER_COUNTS_PER_TURN, SPEED_TO_MM_PER_SECOND, WHEEL_DIAMETER_MM};

/// Convert a drive speed unit to mm/s.
///
/// Linear approximation; see [`SPEED_TO_MM_PER_SECOND`] for the caveat.
pub fn speed_to_mm_per_second(speed: f64) -> f64 {
    speed * SPEED_TO_MM_PER_SECOND
}

/// Convert mm/s to a drive speed unit, truncating toward zero.
pub fn mm_per_second_to_speed(mm_per_second: f64) -> f64 {
    (mm_per_second / SPEED_TO_MM_PER_SECOND).trunc()
}

/// Millimeters traveled per single encoder count.
pub fn mm_per_encoder_count() -> f64 {
    WHEEL_DIAMETER_MM * PI / ENCODER_COUNTS_PER_TURN
}

/// Convert a linear distance in millimeters to whole encoder counts.
pub fn distance_to_encoder_count(distance_mm: f64) -> i64 {
    (distance_mm / mm_per_encoder_count()).trunc() as i64
}

/// Reinterpret a signed byte as its unsigned wire representation.
pub fn signed_to_unsigned(value: i8) -> u8 {
    value as u8
}

/// Reinterpret an unsigned wire byte as a signed value.
pub fn unsigned_to_signed(value: u8) -> i8 {
    value as i8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_round_trip() {
        for s in i8::MIN..=i8::MAX {
            assert_eq!(unsigned_to_signed(signed_to_unsigned(s)), s);
        }
        for u in u8::MIN..=u8::MAX {
            assert_eq!(signed_to_unsigned(unsigned_to_signed(u)), u);
        }
    }

    #[test]
    fn test_byte_known_values() {
        assert_eq!(signed_to_unsigned(-20), 236);
        assert_eq!(signed_to_unsigned(-128), 128);
        assert_eq!(signed_to_unsigned(127), 127);
        assert_eq!(unsigned_to_signed(236), -20);
        assert_eq!(unsigned_to_signed(255), -1);
    }

    #[test]
    fn test_speed_conversion() {
        assert_eq!(speed_to_mm_per_second(20.0), 125.0);
        assert_eq!(speed_to_mm_per_second(-20.0), -125.0);
        // Truncation toward zero, not rounding
        assert_eq!(mm_per_second_to_speed(124.9), 19.0);
        assert_eq!(mm_per_second_to_speed(-124.9), -19.0);
        assert_eq!(mm_per_second_to_speed(125.0), 20.0);
    }

    #[test]
    fn test_encoder_count_zero_and_monotonic() {
        assert_eq!(distance_to_encoder_count(0.0), 0);

        let mut previous = 0;
        for step in 1..200 {
            let count = distance_to_encoder_count(step as f64 * 7.3);
            assert!(count >= previous);
            previous = count;
        }
    }

    #[test]
    fn test_encoder_count_known_distance() {
        // 100 mm over a 100 mm wheel: 100 / (100 * pi / 980) = 311.94
        assert_eq!(distance_to_encoder_count(100.0), 311);
        // Half a circumference is comfortably clear of a count boundary
        let half_turn = WHEEL_DIAMETER_MM * PI / 2.0 + 0.01;
        assert_eq!(
            distance_to_encoder_count(half_turn),
            ENCODER_COUNTS_PER_TURN as i64 / 2
        );
    }
}
